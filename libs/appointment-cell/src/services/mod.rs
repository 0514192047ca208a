pub mod booking;
pub mod lookup;
pub mod validator;

pub use booking::AppointmentBookingService;
pub use lookup::{AppointmentLedger, DoctorDirectory};
pub use validator::{available_slots, has_conflict, validate_appointment};
