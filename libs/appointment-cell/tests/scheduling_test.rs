use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentError, AppointmentFilters, AppointmentListQuery, AppointmentStatus,
    CreateAppointmentRequest, Shift,
};
use appointment_cell::services::AppointmentSchedulingService;
use appointment_cell::store::AppointmentStore;
use package_cell::models::{PackageStatus, TreatmentPackage};
use package_cell::store::PackageStore;
use patient_cell::models::Patient;
use patient_cell::store::PatientStore;
use shared_models::error::AppError;

const TOKEN: &str = "test-token";

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn sample_patient() -> Patient {
    Patient {
        id: Uuid::new_v4(),
        code: "P-00001".to_string(),
        full_name: "Maria Lopez".to_string(),
        document_id: "10203040".to_string(),
        date_of_birth: date("1990-04-12"),
        phone: "555-0101".to_string(),
        address: String::new(),
        created_by: Uuid::new_v4(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn sample_package(patient_id: Uuid, total: i32, completed: i32) -> TreatmentPackage {
    TreatmentPackage {
        id: Uuid::new_v4(),
        patient_id,
        treatment_type: "Physiotherapy".to_string(),
        total_sessions: total,
        completed_sessions: completed,
        status: PackageStatus::Active,
        notes: String::new(),
        created_by: Uuid::new_v4(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

struct FakePatientStore {
    patients: Mutex<HashMap<Uuid, Patient>>,
}

impl FakePatientStore {
    fn with(patients: Vec<Patient>) -> Arc<Self> {
        Arc::new(Self {
            patients: Mutex::new(patients.into_iter().map(|p| (p.id, p)).collect()),
        })
    }
}

#[async_trait]
impl PatientStore for FakePatientStore {
    async fn get_by_id(&self, id: Uuid, _auth_token: &str) -> Result<Option<Patient>, AppError> {
        Ok(self.patients.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_document(
        &self,
        _document_id: &str,
        _auth_token: &str,
    ) -> Result<Option<Patient>, AppError> {
        Ok(None)
    }

    async fn create(&self, patient: &Patient, _auth_token: &str) -> Result<Patient, AppError> {
        self.patients
            .lock()
            .unwrap()
            .insert(patient.id, patient.clone());
        Ok(patient.clone())
    }

    async fn list(
        &self,
        _offset: i64,
        _limit: i64,
        _auth_token: &str,
    ) -> Result<(Vec<Patient>, i64), AppError> {
        Ok((Vec::new(), 0))
    }

    async fn search(
        &self,
        _query: &str,
        _offset: i64,
        _limit: i64,
        _auth_token: &str,
    ) -> Result<(Vec<Patient>, i64), AppError> {
        Ok((Vec::new(), 0))
    }

    async fn update(&self, patient: &Patient, _auth_token: &str) -> Result<Patient, AppError> {
        Ok(patient.clone())
    }

    async fn next_code(&self, _auth_token: &str) -> Result<String, AppError> {
        Ok("P-00002".to_string())
    }
}

struct FakePackageStore {
    packages: Mutex<HashMap<Uuid, TreatmentPackage>>,
    fail_increment: AtomicBool,
    increments: Mutex<Vec<Uuid>>,
}

impl FakePackageStore {
    fn with(packages: Vec<TreatmentPackage>) -> Arc<Self> {
        Arc::new(Self {
            packages: Mutex::new(packages.into_iter().map(|p| (p.id, p)).collect()),
            fail_increment: AtomicBool::new(false),
            increments: Mutex::new(Vec::new()),
        })
    }

    fn get(&self, id: Uuid) -> TreatmentPackage {
        self.packages.lock().unwrap().get(&id).cloned().unwrap()
    }
}

#[async_trait]
impl PackageStore for FakePackageStore {
    async fn get_by_id(
        &self,
        id: Uuid,
        _auth_token: &str,
    ) -> Result<Option<TreatmentPackage>, AppError> {
        Ok(self.packages.lock().unwrap().get(&id).cloned())
    }

    async fn create(
        &self,
        package: &TreatmentPackage,
        _auth_token: &str,
    ) -> Result<TreatmentPackage, AppError> {
        self.packages
            .lock()
            .unwrap()
            .insert(package.id, package.clone());
        Ok(package.clone())
    }

    async fn list_by_patient(
        &self,
        _patient_id: Uuid,
        _auth_token: &str,
    ) -> Result<Vec<TreatmentPackage>, AppError> {
        Ok(Vec::new())
    }

    async fn list_active_by_patient(
        &self,
        _patient_id: Uuid,
        _auth_token: &str,
    ) -> Result<Vec<TreatmentPackage>, AppError> {
        Ok(Vec::new())
    }

    async fn increment_sessions(
        &self,
        id: Uuid,
        _auth_token: &str,
    ) -> Result<TreatmentPackage, AppError> {
        if self.fail_increment.load(Ordering::SeqCst) {
            return Err(AppError::Database("increment failed".to_string()));
        }
        self.increments.lock().unwrap().push(id);
        let mut packages = self.packages.lock().unwrap();
        let package = packages
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Treatment package not found".to_string()))?;
        package.completed_sessions += 1;
        if package.completed_sessions >= package.total_sessions {
            package.status = PackageStatus::Completed;
        }
        Ok(package.clone())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: PackageStatus,
        _auth_token: &str,
    ) -> Result<(), AppError> {
        if let Some(package) = self.packages.lock().unwrap().get_mut(&id) {
            package.status = status;
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeAppointmentStore {
    appointments: Mutex<HashMap<Uuid, Appointment>>,
}

impl FakeAppointmentStore {
    fn with(appointments: Vec<Appointment>) -> Arc<Self> {
        Arc::new(Self {
            appointments: Mutex::new(appointments.into_iter().map(|a| (a.id, a)).collect()),
        })
    }

    fn get(&self, id: Uuid) -> Appointment {
        self.appointments.lock().unwrap().get(&id).cloned().unwrap()
    }
}

#[async_trait]
impl AppointmentStore for FakeAppointmentStore {
    async fn create(
        &self,
        appointment: &Appointment,
        _auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.appointments
            .lock()
            .unwrap()
            .insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn get_by_id(
        &self,
        id: Uuid,
        _auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.appointments.lock().unwrap().get(&id).cloned())
    }

    async fn list_filtered(
        &self,
        offset: i64,
        limit: i64,
        filters: &AppointmentFilters,
        _auth_token: &str,
    ) -> Result<(Vec<Appointment>, i64), AppointmentError> {
        let mut items: Vec<Appointment> = self
            .appointments
            .lock()
            .unwrap()
            .values()
            .filter(|a| filters.date.map_or(true, |d| a.date == d))
            .filter(|a| filters.shift.map_or(true, |s| a.shift == s))
            .filter(|a| filters.status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.date.cmp(&a.date).then(b.time.cmp(&a.time)));
        let total = items.len() as i64;
        let page: Vec<Appointment> = items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
        _auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.lock().unwrap();
        let appointment = appointments.get_mut(&id).ok_or(AppointmentError::NotFound)?;
        appointment.status = status;
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }

    async fn reschedule(
        &self,
        id: Uuid,
        date: NaiveDate,
        time: &str,
        shift: Shift,
        _auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.lock().unwrap();
        let appointment = appointments.get_mut(&id).ok_or(AppointmentError::NotFound)?;
        appointment.status = AppointmentStatus::Rescheduled;
        appointment.date = date;
        appointment.time = time.to_string();
        appointment.shift = shift;
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }

    async fn exists_at_slot(
        &self,
        date: NaiveDate,
        time: &str,
        exclude_id: Option<Uuid>,
        _auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        Ok(self.appointments.lock().unwrap().values().any(|a| {
            a.date == date
                && a.time == time
                && a.status.blocks_slot()
                && exclude_id != Some(a.id)
        }))
    }
}

struct Fixture {
    service: AppointmentSchedulingService,
    appointments: Arc<FakeAppointmentStore>,
    packages: Arc<FakePackageStore>,
    patient: Patient,
}

fn fixture_with(
    appointments: Vec<Appointment>,
    packages: Vec<TreatmentPackage>,
) -> Fixture {
    let patient = sample_patient();
    let appointment_store = FakeAppointmentStore::with(appointments);
    let package_store = FakePackageStore::with(packages);
    let patient_store = FakePatientStore::with(vec![patient.clone()]);
    let service = AppointmentSchedulingService::with_stores(
        appointment_store.clone(),
        patient_store,
        package_store.clone(),
    );
    Fixture {
        service,
        appointments: appointment_store,
        packages: package_store,
        patient,
    }
}

fn fixture() -> Fixture {
    fixture_with(Vec::new(), Vec::new())
}

fn create_request(patient_id: Uuid, date: &str, time: &str) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        patient_id,
        date: date.to_string(),
        time: time.to_string(),
        treatment_type: "Physiotherapy".to_string(),
        shift: Shift::Am,
        notes: String::new(),
        package_id: None,
    }
}

fn stored_appointment(
    patient_id: Uuid,
    date_str: &str,
    time: &str,
    status: AppointmentStatus,
) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        patient_id,
        date: date(date_str),
        time: time.to_string(),
        treatment_type: "Physiotherapy".to_string(),
        status,
        shift: Shift::Am,
        notes: String::new(),
        package_id: None,
        created_by: Uuid::new_v4(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// 2026-09-02 is a Wednesday throughout these tests.

#[tokio::test]
async fn create_persists_with_status_new() {
    let fx = fixture();

    let appointment = fx
        .service
        .create_appointment(
            create_request(fx.patient.id, "2026-09-02", "10:00"),
            Uuid::new_v4(),
            TOKEN,
        )
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::New);
    assert_eq!(appointment.date, date("2026-09-02"));
    assert_eq!(fx.appointments.get(appointment.id).time, "10:00");
}

#[tokio::test]
async fn create_rejects_unknown_patient() {
    let fx = fixture();

    let err = fx
        .service
        .create_appointment(
            create_request(Uuid::new_v4(), "2026-09-02", "10:00"),
            Uuid::new_v4(),
            TOKEN,
        )
        .await
        .unwrap_err();

    assert_matches!(err, AppointmentError::PatientNotFound);
}

#[tokio::test]
async fn create_distinguishes_date_and_time_format_errors() {
    let fx = fixture();

    let err = fx
        .service
        .create_appointment(
            create_request(fx.patient.id, "02/09/2026", "10:00"),
            Uuid::new_v4(),
            TOKEN,
        )
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::InvalidDateFormat);

    let err = fx
        .service
        .create_appointment(
            create_request(fx.patient.id, "2026-09-02", "10am"),
            Uuid::new_v4(),
            TOKEN,
        )
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::InvalidTimeFormat);
}

#[tokio::test]
async fn create_rejects_sunday() {
    let fx = fixture();

    let err = fx
        .service
        .create_appointment(
            create_request(fx.patient.id, "2026-09-06", "10:00"),
            Uuid::new_v4(),
            TOKEN,
        )
        .await
        .unwrap_err();

    assert_matches!(err, AppointmentError::OutsideBusinessHours(_));
}

#[tokio::test]
async fn create_conflicts_with_active_appointment_at_same_slot() {
    for blocking in [
        AppointmentStatus::New,
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
    ] {
        let fx = fixture_with(
            vec![stored_appointment(Uuid::new_v4(), "2026-09-02", "10:00", blocking)],
            Vec::new(),
        );

        let err = fx
            .service
            .create_appointment(
                create_request(fx.patient.id, "2026-09-02", "10:00"),
                Uuid::new_v4(),
                TOKEN,
            )
            .await
            .unwrap_err();
        assert_matches!(err, AppointmentError::SlotTaken);
    }
}

#[tokio::test]
async fn cancelled_and_rescheduled_slots_are_free_for_reuse() {
    for freed in [AppointmentStatus::Cancelled, AppointmentStatus::Rescheduled] {
        let fx = fixture_with(
            vec![stored_appointment(Uuid::new_v4(), "2026-09-02", "10:00", freed)],
            Vec::new(),
        );

        let result = fx
            .service
            .create_appointment(
                create_request(fx.patient.id, "2026-09-02", "10:00"),
                Uuid::new_v4(),
                TOKEN,
            )
            .await;
        assert!(result.is_ok(), "slot held by {freed} should be free");
    }
}

#[tokio::test]
async fn create_validates_package_linkage() {
    let fx = fixture();
    let mut request = create_request(fx.patient.id, "2026-09-02", "10:00");
    request.package_id = Some(Uuid::new_v4());
    let err = fx
        .service
        .create_appointment(request, Uuid::new_v4(), TOKEN)
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::PackageNotFound);

    // Package owned by a different patient.
    let other_package = sample_package(Uuid::new_v4(), 5, 0);
    let fx = fixture_with(Vec::new(), vec![other_package.clone()]);
    let mut request = create_request(fx.patient.id, "2026-09-02", "10:00");
    request.package_id = Some(other_package.id);
    let err = fx
        .service
        .create_appointment(request, Uuid::new_v4(), TOKEN)
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::PackageOwnershipMismatch);
}

#[tokio::test]
async fn create_rejects_inactive_package() {
    let patient = sample_patient();
    let mut package = sample_package(patient.id, 3, 3);
    package.status = PackageStatus::Completed;
    let package_id = package.id;

    let appointment_store = FakeAppointmentStore::with(Vec::new());
    let package_store = FakePackageStore::with(vec![package]);
    let patient_store = FakePatientStore::with(vec![patient.clone()]);
    let service = AppointmentSchedulingService::with_stores(
        appointment_store,
        patient_store,
        package_store,
    );

    let mut request = create_request(patient.id, "2026-09-02", "10:00");
    request.package_id = Some(package_id);
    let err = service
        .create_appointment(request, Uuid::new_v4(), TOKEN)
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::PackageNotActive);
}

#[tokio::test]
async fn list_orders_by_date_then_time_descending() {
    let patient_id = Uuid::new_v4();
    let fx = fixture_with(
        vec![
            stored_appointment(patient_id, "2026-09-01", "09:00", AppointmentStatus::New),
            stored_appointment(patient_id, "2026-09-02", "08:00", AppointmentStatus::New),
            stored_appointment(patient_id, "2026-09-02", "16:00", AppointmentStatus::New),
        ],
        Vec::new(),
    );

    let (items, total, page, per_page) = fx
        .service
        .list_appointments(&AppointmentListQuery::default(), TOKEN)
        .await
        .unwrap();

    assert_eq!(total, 3);
    assert_eq!(page, 1);
    assert_eq!(per_page, 20);
    let slots: Vec<(NaiveDate, String)> =
        items.into_iter().map(|a| (a.date, a.time)).collect();
    assert_eq!(
        slots,
        vec![
            (date("2026-09-02"), "16:00".to_string()),
            (date("2026-09-02"), "08:00".to_string()),
            (date("2026-09-01"), "09:00".to_string()),
        ]
    );
}

#[tokio::test]
async fn list_normalizes_out_of_range_pagination() {
    let fx = fixture();

    let query = AppointmentListQuery {
        page: Some(0),
        per_page: Some(500),
        ..Default::default()
    };
    let (_, _, page, per_page) = fx.service.list_appointments(&query, TOKEN).await.unwrap();

    assert_eq!(page, 1);
    assert_eq!(per_page, 20);
}

#[tokio::test]
async fn list_applies_conjunctive_filters() {
    let patient_id = Uuid::new_v4();
    let mut pm = stored_appointment(patient_id, "2026-09-02", "15:00", AppointmentStatus::Scheduled);
    pm.shift = Shift::Pm;
    let fx = fixture_with(
        vec![
            stored_appointment(patient_id, "2026-09-02", "09:00", AppointmentStatus::Scheduled),
            stored_appointment(patient_id, "2026-09-03", "09:00", AppointmentStatus::Scheduled),
            pm,
        ],
        Vec::new(),
    );

    let query = AppointmentListQuery {
        date: Some("2026-09-02".to_string()),
        shift: Some(Shift::Am),
        status: Some(AppointmentStatus::Scheduled),
        ..Default::default()
    };
    let (items, total, _, _) = fx.service.list_appointments(&query, TOKEN).await.unwrap();

    assert_eq!(total, 1);
    assert_eq!(items[0].time, "09:00");
}

#[tokio::test]
async fn update_status_enforces_transition_table() {
    let appointment =
        stored_appointment(Uuid::new_v4(), "2026-09-02", "10:00", AppointmentStatus::New);
    let id = appointment.id;
    let fx = fixture_with(vec![appointment], Vec::new());

    let err = fx
        .service
        .update_status(id, AppointmentStatus::Attended, TOKEN)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        AppointmentError::InvalidStatusTransition {
            from: AppointmentStatus::New,
            to: AppointmentStatus::Attended,
        }
    );

    let updated = fx
        .service
        .update_status(id, AppointmentStatus::Scheduled, TOKEN)
        .await
        .unwrap();
    assert_eq!(updated.status, AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn update_status_rejects_unknown_appointment() {
    let fx = fixture();

    let err = fx
        .service
        .update_status(Uuid::new_v4(), AppointmentStatus::Scheduled, TOKEN)
        .await
        .unwrap_err();

    assert_matches!(err, AppointmentError::NotFound);
}

#[tokio::test]
async fn update_status_refuses_rescheduled_without_slot() {
    let appointment = stored_appointment(
        Uuid::new_v4(),
        "2026-09-02",
        "10:00",
        AppointmentStatus::Scheduled,
    );
    let id = appointment.id;
    let fx = fixture_with(vec![appointment], Vec::new());

    let err = fx
        .service
        .update_status(id, AppointmentStatus::Rescheduled, TOKEN)
        .await
        .unwrap_err();

    assert_matches!(err, AppointmentError::RescheduleRequiresSlot);
}

#[tokio::test]
async fn attended_increments_linked_package_and_completes_it() {
    let patient_id = Uuid::new_v4();
    let package = sample_package(patient_id, 3, 2);
    let package_id = package.id;
    let mut appointment = stored_appointment(
        patient_id,
        "2026-09-02",
        "10:00",
        AppointmentStatus::Confirmed,
    );
    appointment.package_id = Some(package_id);
    let id = appointment.id;
    let fx = fixture_with(vec![appointment], vec![package]);

    let updated = fx
        .service
        .update_status(id, AppointmentStatus::Attended, TOKEN)
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Attended);
    let package = fx.packages.get(package_id);
    assert_eq!(package.completed_sessions, 3);
    assert_eq!(package.status, PackageStatus::Completed);
}

#[tokio::test]
async fn attended_without_package_touches_no_counter() {
    let appointment = stored_appointment(
        Uuid::new_v4(),
        "2026-09-02",
        "10:00",
        AppointmentStatus::Confirmed,
    );
    let id = appointment.id;
    let fx = fixture_with(vec![appointment], Vec::new());

    fx.service
        .update_status(id, AppointmentStatus::Attended, TOKEN)
        .await
        .unwrap();

    assert!(fx.packages.increments.lock().unwrap().is_empty());
}

#[tokio::test]
async fn counter_failure_does_not_roll_back_attended() {
    let patient_id = Uuid::new_v4();
    let package = sample_package(patient_id, 3, 0);
    let mut appointment = stored_appointment(
        patient_id,
        "2026-09-02",
        "10:00",
        AppointmentStatus::Confirmed,
    );
    appointment.package_id = Some(package.id);
    let id = appointment.id;
    let fx = fixture_with(vec![appointment], vec![package]);
    fx.packages.fail_increment.store(true, Ordering::SeqCst);

    let updated = fx
        .service
        .update_status(id, AppointmentStatus::Attended, TOKEN)
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Attended);
    assert_eq!(fx.appointments.get(id).status, AppointmentStatus::Attended);
}

#[tokio::test]
async fn reschedule_only_allowed_from_scheduled() {
    let appointment = stored_appointment(
        Uuid::new_v4(),
        "2026-09-02",
        "10:00",
        AppointmentStatus::Confirmed,
    );
    let id = appointment.id;
    let fx = fixture_with(vec![appointment], Vec::new());

    let err = fx
        .service
        .reschedule(id, "2026-09-03", "11:00", Shift::Am, TOKEN)
        .await
        .unwrap_err();

    assert_matches!(
        err,
        AppointmentError::InvalidStatusTransition {
            from: AppointmentStatus::Confirmed,
            to: AppointmentStatus::Rescheduled,
        }
    );
}

#[tokio::test]
async fn reschedule_rejects_conflicting_target_slot() {
    let appointment = stored_appointment(
        Uuid::new_v4(),
        "2026-09-02",
        "10:00",
        AppointmentStatus::Scheduled,
    );
    let id = appointment.id;
    let fx = fixture_with(
        vec![
            appointment,
            stored_appointment(Uuid::new_v4(), "2026-09-03", "11:00", AppointmentStatus::Confirmed),
        ],
        Vec::new(),
    );

    let err = fx
        .service
        .reschedule(id, "2026-09-03", "11:00", Shift::Am, TOKEN)
        .await
        .unwrap_err();

    assert_matches!(err, AppointmentError::SlotTaken);
}

#[tokio::test]
async fn reschedule_ignores_own_slot_in_conflict_check() {
    let appointment = stored_appointment(
        Uuid::new_v4(),
        "2026-09-02",
        "10:00",
        AppointmentStatus::Scheduled,
    );
    let id = appointment.id;
    let fx = fixture_with(vec![appointment], Vec::new());

    // Same slot, different shift label. The row's own id is excluded.
    let result = fx
        .service
        .reschedule(id, "2026-09-02", "10:00", Shift::Pm, TOKEN)
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn reschedule_updates_status_and_slot_together() {
    let appointment = stored_appointment(
        Uuid::new_v4(),
        "2026-09-02",
        "10:00",
        AppointmentStatus::Scheduled,
    );
    let id = appointment.id;
    let fx = fixture_with(vec![appointment], Vec::new());

    let updated = fx
        .service
        .reschedule(id, "2026-09-04", "09:30", Shift::Am, TOKEN)
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Rescheduled);
    assert_eq!(updated.date, date("2026-09-04"));
    assert_eq!(updated.time, "09:30");
    let stored = fx.appointments.get(id);
    assert_eq!(stored.status, AppointmentStatus::Rescheduled);
    assert_eq!(stored.date, date("2026-09-04"));
    assert_eq!(stored.time, "09:30");
}

#[tokio::test]
async fn reschedule_validates_business_hours_on_new_slot() {
    let appointment = stored_appointment(
        Uuid::new_v4(),
        "2026-09-02",
        "10:00",
        AppointmentStatus::Scheduled,
    );
    let id = appointment.id;
    let fx = fixture_with(vec![appointment], Vec::new());

    // 2026-09-05 is a Saturday; noon is past closing.
    let err = fx
        .service
        .reschedule(id, "2026-09-05", "12:00", Shift::Pm, TOKEN)
        .await
        .unwrap_err();

    assert_matches!(err, AppointmentError::OutsideBusinessHours(_));
}

#[tokio::test]
async fn completed_package_cannot_back_a_new_appointment() {
    // Attend the last session, then try to reuse the package.
    let patient = sample_patient();
    let package = sample_package(patient.id, 3, 2);
    let package_id = package.id;
    let mut appointment = stored_appointment(
        patient.id,
        "2026-09-02",
        "10:00",
        AppointmentStatus::Confirmed,
    );
    appointment.package_id = Some(package_id);
    let id = appointment.id;

    let appointment_store = FakeAppointmentStore::with(vec![appointment]);
    let package_store = FakePackageStore::with(vec![package]);
    let patient_store = FakePatientStore::with(vec![patient.clone()]);
    let service = AppointmentSchedulingService::with_stores(
        appointment_store,
        patient_store,
        package_store.clone(),
    );

    service
        .update_status(id, AppointmentStatus::Attended, TOKEN)
        .await
        .unwrap();
    assert_eq!(package_store.get(package_id).status, PackageStatus::Completed);

    let mut request = create_request(patient.id, "2026-09-03", "10:00");
    request.package_id = Some(package_id);
    let err = service
        .create_appointment(request, Uuid::new_v4(), TOKEN)
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::PackageNotActive);
}
