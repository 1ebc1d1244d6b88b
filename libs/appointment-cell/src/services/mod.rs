pub mod hours;
pub mod lifecycle;
pub mod scheduling;

pub use hours::validate_business_hours;
pub use lifecycle::{can_transition, validate_transition};
pub use scheduling::AppointmentSchedulingService;
