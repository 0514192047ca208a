use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentError, AppointmentListQuery, BookAppointmentRequest, BookedSlot,
    BookingRejection,
};
use appointment_cell::services::booking::AppointmentBookingService;
use appointment_cell::services::lookup::{AppointmentLedger, DoctorDirectory};
use doctor_cell::models::Doctor;

const TOKEN: &str = "test-token";

struct FixedDirectory {
    doctors: Vec<Doctor>,
}

#[async_trait]
impl DoctorDirectory for FixedDirectory {
    async fn find_doctor(
        &self,
        doctor_id: Uuid,
        _auth_token: &str,
    ) -> Result<Option<Doctor>, AppointmentError> {
        Ok(self.doctors.iter().find(|d| d.id == doctor_id).cloned())
    }
}

/// In-memory ledger that enforces `(doctor_id, date)` uniqueness on insert,
/// like the storage constraint does.
#[derive(Clone, Default)]
struct MemoryLedger {
    rows: Arc<Mutex<Vec<Appointment>>>,
}

impl MemoryLedger {
    fn with_rows(rows: Vec<Appointment>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
        }
    }

    fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl AppointmentLedger for MemoryLedger {
    async fn appointments_for_doctor(
        &self,
        doctor_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
        _auth_token: &str,
    ) -> Result<Vec<BookedSlot>, AppointmentError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.doctor_id == doctor_id && a.date >= from && a.date < to)
            .map(Appointment::slot)
            .collect())
    }

    async fn insert_appointment(
        &self,
        request: &BookAppointmentRequest,
        _auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|a| a.doctor_id == request.doctor_id && a.date == request.date) {
            return Err(BookingRejection::DoubleBooked.into());
        }

        let appointment = appointment_for(request);
        rows.push(appointment.clone());
        Ok(appointment)
    }

    async fn find_appointment(
        &self,
        appointment_id: Uuid,
        _auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.rows.lock().unwrap().iter().find(|a| a.id == appointment_id).cloned())
    }

    async fn list_appointments(
        &self,
        query: &AppointmentListQuery,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.clinic_id == query.clinic_id)
            .filter(|a| query.doctor_id.map_or(true, |id| a.doctor_id == id))
            .cloned()
            .collect())
    }

    async fn delete_appointment(
        &self,
        appointment_id: Uuid,
        _auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|a| a.id != appointment_id);
        Ok(rows.len() != before)
    }
}

/// Ledger whose day query never sees anything, standing in for a booking
/// that committed between the read and the insert.
struct StaleReadLedger {
    inner: MemoryLedger,
}

#[async_trait]
impl AppointmentLedger for StaleReadLedger {
    async fn appointments_for_doctor(
        &self,
        _doctor_id: Uuid,
        _from: NaiveDateTime,
        _to: NaiveDateTime,
        _auth_token: &str,
    ) -> Result<Vec<BookedSlot>, AppointmentError> {
        Ok(Vec::new())
    }

    async fn insert_appointment(
        &self,
        request: &BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.inner.insert_appointment(request, auth_token).await
    }

    async fn find_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError> {
        self.inner.find_appointment(appointment_id, auth_token).await
    }

    async fn list_appointments(
        &self,
        query: &AppointmentListQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.inner.list_appointments(query, auth_token).await
    }

    async fn delete_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        self.inner.delete_appointment(appointment_id, auth_token).await
    }
}

fn appointment_for(request: &BookAppointmentRequest) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        date: request.date,
        clinic_id: request.clinic_id,
        patient_id: request.patient_id,
        doctor_id: request.doctor_id,
        created_at: Utc::now(),
        updated_at: Some(Utc::now()),
    }
}

/// Mon-Fri, 08:00-18:00.
fn weekday_doctor() -> Doctor {
    Doctor {
        id: Uuid::new_v4(),
        clinic_id: Uuid::new_v4(),
        name: "Dr. Paulo Mendes".to_string(),
        avatar_image_url: None,
        specialty: "Pediatria".to_string(),
        available_from_week_day: 1,
        available_to_week_day: 5,
        available_from_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        available_to_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        appointment_price_in_cents: 20000,
        created_at: Utc::now(),
        updated_at: None,
    }
}

// 2025-01-08 is a Wednesday.
fn wednesday(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 8)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn request(doctor: &Doctor, date: NaiveDateTime) -> BookAppointmentRequest {
    BookAppointmentRequest {
        clinic_id: doctor.clinic_id,
        doctor_id: doctor.id,
        patient_id: Uuid::new_v4(),
        date,
    }
}

fn service_for<L: AppointmentLedger>(
    doctor: &Doctor,
    ledger: L,
) -> AppointmentBookingService<FixedDirectory, L> {
    AppointmentBookingService::with_lookups(
        FixedDirectory { doctors: vec![doctor.clone()] },
        ledger,
        30,
    )
}

#[tokio::test]
async fn test_book_then_rebook_same_time() {
    let doctor = weekday_doctor();
    let ledger = MemoryLedger::default();
    let service = service_for(&doctor, ledger.clone());

    let booked = service.book_appointment(request(&doctor, wednesday(10, 0)), TOKEN).await.unwrap();
    assert_eq!(booked.date, wednesday(10, 0));

    let result = service.book_appointment(request(&doctor, wednesday(10, 0)), TOKEN).await;
    assert_matches!(result, Err(AppointmentError::Rejected(BookingRejection::DoubleBooked)));
    assert_eq!(ledger.len(), 1);
}

#[tokio::test]
async fn test_outside_window_is_not_inserted() {
    let doctor = weekday_doctor();
    let ledger = MemoryLedger::default();
    let service = service_for(&doctor, ledger.clone());

    let result = service.book_appointment(request(&doctor, wednesday(18, 0)), TOKEN).await;

    assert_matches!(result, Err(AppointmentError::Rejected(BookingRejection::OutsideAvailability)));
    assert_eq!(ledger.len(), 0);
}

#[tokio::test]
async fn test_unknown_doctor() {
    let doctor = weekday_doctor();
    let service = service_for(&doctor, MemoryLedger::default());
    let stranger = weekday_doctor();

    let result = service.book_appointment(request(&stranger, wednesday(10, 0)), TOKEN).await;

    assert_matches!(result, Err(AppointmentError::DoctorNotFound));
}

#[tokio::test]
async fn test_doctor_from_another_clinic() {
    let doctor = weekday_doctor();
    let service = service_for(&doctor, MemoryLedger::default());
    let other_clinic = Uuid::new_v4();

    let mut booking = request(&doctor, wednesday(10, 0));
    booking.clinic_id = other_clinic;

    let result = service.check_appointment(&booking, TOKEN).await;
    assert_matches!(result, Err(AppointmentError::ClinicMismatch(id)) if id == other_clinic);
}

#[tokio::test]
async fn test_insert_conflict_surfaces_as_double_booked() {
    let doctor = weekday_doctor();
    let existing = appointment_for(&request(&doctor, wednesday(9, 30)));
    let ledger = StaleReadLedger {
        inner: MemoryLedger::with_rows(vec![existing]),
    };
    let service = service_for(&doctor, ledger);

    assert!(service.check_appointment(&request(&doctor, wednesday(9, 30)), TOKEN).await.is_ok());

    let result = service.book_appointment(request(&doctor, wednesday(9, 30)), TOKEN).await;
    assert_matches!(result, Err(AppointmentError::Rejected(BookingRejection::DoubleBooked)));
}

#[tokio::test]
async fn test_check_does_not_write() {
    let doctor = weekday_doctor();
    let ledger = MemoryLedger::default();
    let service = service_for(&doctor, ledger.clone());

    service.check_appointment(&request(&doctor, wednesday(11, 0)), TOKEN).await.unwrap();

    assert_eq!(ledger.len(), 0);
}

#[tokio::test]
async fn test_cancel_frees_the_slot() {
    let doctor = weekday_doctor();
    let ledger = MemoryLedger::default();
    let service = service_for(&doctor, ledger.clone());

    let booked = service.book_appointment(request(&doctor, wednesday(15, 0)), TOKEN).await.unwrap();
    service.cancel_appointment(booked.id, TOKEN).await.unwrap();

    assert_matches!(
        service.cancel_appointment(booked.id, TOKEN).await,
        Err(AppointmentError::NotFound)
    );
    assert!(service.book_appointment(request(&doctor, wednesday(15, 0)), TOKEN).await.is_ok());
}

#[tokio::test]
async fn test_get_missing_appointment() {
    let doctor = weekday_doctor();
    let service = service_for(&doctor, MemoryLedger::default());

    assert_matches!(
        service.get_appointment(Uuid::new_v4(), TOKEN).await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn test_day_slots_use_configured_step() {
    let doctor = weekday_doctor();
    let ledger = MemoryLedger::default();
    let service = service_for(&doctor, ledger.clone());

    service.book_appointment(request(&doctor, wednesday(8, 30)), TOKEN).await.unwrap();

    let response = service.day_slots(doctor.id, wednesday(0, 0).date(), None, TOKEN).await.unwrap();

    assert_eq!(response.step_minutes, 30);
    assert_eq!(response.slots.len(), 20);
    assert_eq!(response.slots[0].start, wednesday(8, 0));
    assert!(response.slots[0].available);
    assert!(!response.slots[1].available);
    assert_eq!(response.slots.last().unwrap().start, wednesday(17, 30));
}

#[tokio::test]
async fn test_day_slots_reject_zero_step() {
    let doctor = weekday_doctor();
    let service = service_for(&doctor, MemoryLedger::default());

    let result = service.day_slots(doctor.id, wednesday(0, 0).date(), Some(0), TOKEN).await;

    assert_matches!(result, Err(AppointmentError::ValidationError(_)));
}

#[tokio::test]
async fn test_last_representable_day_is_rejected_not_panicking() {
    let mut doctor = weekday_doctor();
    doctor.available_from_week_day = 0;
    doctor.available_to_week_day = 6;
    let ledger = MemoryLedger::default();
    let service = service_for(&doctor, ledger.clone());
    let far_future = NaiveDate::MAX.and_hms_opt(10, 0, 0).unwrap();

    assert_matches!(
        service.check_appointment(&request(&doctor, far_future), TOKEN).await,
        Err(AppointmentError::ValidationError(_))
    );
    assert_matches!(
        service.book_appointment(request(&doctor, far_future), TOKEN).await,
        Err(AppointmentError::ValidationError(_))
    );
    assert_matches!(
        service.day_slots(doctor.id, NaiveDate::MAX, None, TOKEN).await,
        Err(AppointmentError::ValidationError(_))
    );
    assert_eq!(ledger.len(), 0);
}

#[tokio::test]
async fn test_fractional_seconds_are_rejected_before_insert() {
    let doctor = weekday_doctor();
    let ledger = MemoryLedger::default();
    let service = service_for(&doctor, ledger.clone());

    service.book_appointment(request(&doctor, wednesday(10, 0)), TOKEN).await.unwrap();

    // Stored as 10:00:00, this would collide with the booking above.
    let half_past = wednesday(10, 0) + Duration::milliseconds(500);

    assert_matches!(
        service.check_appointment(&request(&doctor, half_past), TOKEN).await,
        Err(AppointmentError::ValidationError(_))
    );
    assert_matches!(
        service.book_appointment(request(&doctor, half_past), TOKEN).await,
        Err(AppointmentError::ValidationError(_))
    );
    assert_eq!(ledger.len(), 1);
}

#[tokio::test]
async fn test_list_filters_by_doctor() {
    let doctor = weekday_doctor();
    let ledger = MemoryLedger::default();
    let service = service_for(&doctor, ledger.clone());

    service.book_appointment(request(&doctor, wednesday(8, 0)), TOKEN).await.unwrap();
    service.book_appointment(request(&doctor, wednesday(9, 0)), TOKEN).await.unwrap();

    let query = AppointmentListQuery {
        clinic_id: doctor.clinic_id,
        doctor_id: Some(doctor.id),
        patient_id: None,
    };
    assert_eq!(service.list_appointments(&query, TOKEN).await.unwrap().len(), 2);

    let other = AppointmentListQuery {
        clinic_id: doctor.clinic_id,
        doctor_id: Some(Uuid::new_v4()),
        patient_id: None,
    };
    assert!(service.list_appointments(&other, TOKEN).await.unwrap().is_empty());
}
