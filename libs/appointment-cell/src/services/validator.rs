use chrono::{Duration, NaiveDate, NaiveDateTime};
use uuid::Uuid;

use doctor_cell::models::Doctor;
use doctor_cell::services::availability::is_within_availability;

use crate::models::{Accepted, AppointmentCandidate, BookedSlot, BookingRejection, DaySlot};

/// True when `existing` already holds an appointment for `doctor_id` at
/// exactly `at`. Appointments carry no duration, so only identical
/// timestamps collide.
pub fn has_conflict(doctor_id: Uuid, at: NaiveDateTime, existing: &[BookedSlot]) -> bool {
    existing
        .iter()
        .any(|slot| slot.doctor_id == doctor_id && slot.date == at)
}

/// Decide whether `candidate` may be booked against a snapshot of the
/// doctor and their existing appointments. The window is checked first, so a
/// degenerate doctor record always reports `OutsideAvailability`.
pub fn validate_appointment(
    candidate: &AppointmentCandidate,
    doctor: &Doctor,
    existing: &[BookedSlot],
) -> Result<Accepted, BookingRejection> {
    if !is_within_availability(doctor, candidate.date) {
        return Err(BookingRejection::OutsideAvailability);
    }

    if has_conflict(candidate.doctor_id, candidate.date, existing) {
        return Err(BookingRejection::DoubleBooked);
    }

    Ok(Accepted)
}

/// Start times on `date` at `step` intervals inside the doctor's window,
/// each flagged free or taken against `booked`.
pub fn available_slots(
    doctor: &Doctor,
    date: NaiveDate,
    step: Duration,
    booked: &[BookedSlot],
) -> Vec<DaySlot> {
    doctor
        .availability()
        .slots_on(date, step)
        .into_iter()
        .map(|start| DaySlot {
            start,
            available: !has_conflict(doctor.id, start, booked),
        })
        .collect()
}
