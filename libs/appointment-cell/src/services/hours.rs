use chrono::{Datelike, NaiveDate, Weekday};

use crate::models::AppointmentError;

/// Clinic opening rules: closed Sundays, Saturdays until 12:00, weekdays
/// until 20:00. Closing times are exclusive.
pub fn validate_business_hours(date: NaiveDate, time: &str) -> Result<(), AppointmentError> {
    let (hour, minute) = parse_time(time)?;
    let minutes = hour * 60 + minute;

    match date.weekday() {
        Weekday::Sun => Err(AppointmentError::OutsideBusinessHours(
            "The clinic is not open on Sundays".to_string(),
        )),
        Weekday::Sat if minutes >= 12 * 60 => Err(AppointmentError::OutsideBusinessHours(
            "Saturday hours end at 12:00".to_string(),
        )),
        Weekday::Sat => Ok(()),
        _ if minutes >= 20 * 60 => Err(AppointmentError::OutsideBusinessHours(
            "Weekday hours end at 20:00".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Parses zero-padded 24-hour "HH:MM".
fn parse_time(time: &str) -> Result<(u32, u32), AppointmentError> {
    let bytes = time.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(AppointmentError::InvalidTimeFormat);
    }
    let hour: u32 = time[..2]
        .parse()
        .map_err(|_| AppointmentError::InvalidTimeFormat)?;
    let minute: u32 = time[3..]
        .parse()
        .map_err(|_| AppointmentError::InvalidTimeFormat)?;
    if hour > 23 || minute > 59 {
        return Err(AppointmentError::InvalidTimeFormat);
    }
    Ok((hour, minute))
}
