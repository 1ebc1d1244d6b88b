use crate::models::{AppointmentError, AppointmentStatus};

use AppointmentStatus::*;

/// Allowed transitions out of each status. Terminal statuses (ATTENDED,
/// NO_SHOW, CANCELLED) have no entry. This table is the single source of
/// truth for every state change, rescheduling included.
const TRANSITIONS: &[(AppointmentStatus, &[AppointmentStatus])] = &[
    (New, &[Scheduled, Cancelled]),
    (Scheduled, &[Confirmed, Cancelled, Rescheduled]),
    (Confirmed, &[Attended, NoShow, Cancelled]),
    (Rescheduled, &[Scheduled, Cancelled]),
];

pub fn can_transition(current: AppointmentStatus, target: AppointmentStatus) -> bool {
    TRANSITIONS
        .iter()
        .find(|(from, _)| *from == current)
        .is_some_and(|(_, allowed)| allowed.contains(&target))
}

pub fn validate_transition(
    current: AppointmentStatus,
    target: AppointmentStatus,
) -> Result<(), AppointmentError> {
    if can_transition(current, target) {
        Ok(())
    } else {
        Err(AppointmentError::InvalidStatusTransition {
            from: current,
            to: target,
        })
    }
}
