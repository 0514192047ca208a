pub mod doctor;
pub mod availability;

pub use doctor::DoctorService;
pub use availability::{is_within_availability, WeeklyAvailability};
