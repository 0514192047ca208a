use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use doctor_cell::models::Doctor;

use crate::models::{
    Accepted, Appointment, AppointmentError, AppointmentListQuery, BookAppointmentRequest,
    DaySlotsResponse,
};
use crate::services::lookup::{
    AppointmentLedger, DoctorDirectory, SupabaseAppointmentLedger, SupabaseDoctorDirectory,
};
use crate::services::validator::{available_slots, validate_appointment};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Books appointments against a doctor snapshot and the doctor's appointments
/// for the candidate's day. The storage uniqueness constraint on
/// `(doctor_id, date)` closes the race between concurrent bookings.
pub struct AppointmentBookingService<D = SupabaseDoctorDirectory, L = SupabaseAppointmentLedger> {
    doctors: D,
    ledger: L,
    slot_step_minutes: u32,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_lookups(
            SupabaseDoctorDirectory::new(config),
            SupabaseAppointmentLedger::new(config),
            config.slot_step_minutes,
        )
    }
}

impl<D: DoctorDirectory, L: AppointmentLedger> AppointmentBookingService<D, L> {
    pub fn with_lookups(doctors: D, ledger: L, slot_step_minutes: u32) -> Self {
        Self {
            doctors,
            ledger,
            slot_step_minutes,
        }
    }

    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Booking doctor {} for patient {} at {}",
            request.doctor_id, request.patient_id, request.date
        );

        self.check_appointment(&request, auth_token).await?;

        let appointment = self.ledger.insert_appointment(&request, auth_token).await?;

        info!(
            "Appointment {} booked with doctor {} at {}",
            appointment.id, appointment.doctor_id, appointment.date
        );
        Ok(appointment)
    }

    /// Run every booking check without writing anything.
    pub async fn check_appointment(
        &self,
        request: &BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Accepted, AppointmentError> {
        // Storage keeps whole seconds; a finer candidate would be checked
        // against a different time than the one inserted.
        if request.date.nanosecond() != 0 {
            return Err(AppointmentError::ValidationError(
                "Appointment date must not have fractional seconds".to_string(),
            ));
        }

        let (day_start, day_end) = day_bounds(request.date.date())?;
        let doctor = self.clinic_doctor(request.doctor_id, request.clinic_id, auth_token).await?;

        let existing = self
            .ledger
            .appointments_for_doctor(request.doctor_id, day_start, day_end, auth_token)
            .await?;

        validate_appointment(request, &doctor, &existing).map_err(|rejection| {
            warn!(
                "Booking for doctor {} at {} rejected: {}",
                request.doctor_id, request.date, rejection
            );
            AppointmentError::Rejected(rejection)
        })
    }

    pub async fn list_appointments(
        &self,
        query: &AppointmentListQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Listing appointments for clinic {}", query.clinic_id);
        self.ledger.list_appointments(query, auth_token).await
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.ledger
            .find_appointment(appointment_id, auth_token)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        debug!("Cancelling appointment: {}", appointment_id);

        if !self.ledger.delete_appointment(appointment_id, auth_token).await? {
            return Err(AppointmentError::NotFound);
        }

        Ok(())
    }

    /// Slot grid for one doctor and day. `step_minutes` falls back to the
    /// configured step and must stay within a single day.
    pub async fn day_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        step_minutes: Option<u32>,
        auth_token: &str,
    ) -> Result<DaySlotsResponse, AppointmentError> {
        let step_minutes = step_minutes.unwrap_or(self.slot_step_minutes);
        if step_minutes == 0 || step_minutes > MINUTES_PER_DAY {
            return Err(AppointmentError::ValidationError(format!(
                "step_minutes must be between 1 and {}",
                MINUTES_PER_DAY
            )));
        }

        let (day_start, day_end) = day_bounds(date)?;
        let doctor = self
            .doctors
            .find_doctor(doctor_id, auth_token)
            .await?
            .ok_or(AppointmentError::DoctorNotFound)?;

        let booked = self
            .ledger
            .appointments_for_doctor(doctor_id, day_start, day_end, auth_token)
            .await?;

        Ok(DaySlotsResponse {
            doctor_id,
            date,
            step_minutes,
            slots: available_slots(&doctor, date, Duration::minutes(i64::from(step_minutes)), &booked),
        })
    }

    async fn clinic_doctor(
        &self,
        doctor_id: Uuid,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<Doctor, AppointmentError> {
        let doctor = self
            .doctors
            .find_doctor(doctor_id, auth_token)
            .await?
            .ok_or(AppointmentError::DoctorNotFound)?;

        if doctor.clinic_id != clinic_id {
            warn!("Doctor {} is not part of clinic {}", doctor_id, clinic_id);
            return Err(AppointmentError::ClinicMismatch(clinic_id));
        }

        Ok(doctor)
    }
}

/// `[midnight, next midnight)` for `date`. Fails on the last representable
/// day, which has no following midnight.
fn day_bounds(date: NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime), AppointmentError> {
    let next = date.succ_opt().ok_or_else(|| {
        AppointmentError::ValidationError(format!("Date {} is out of range", date))
    })?;
    Ok((date.and_time(NaiveTime::MIN), next.and_time(NaiveTime::MIN)))
}
