//! End-to-end scenarios against a real Postgres.
//!
//! Run with `DATABASE_URL=postgres://... cargo test --test pipeline_tests -- --ignored`.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use pretty_assertions::assert_eq;
use serial_test::serial;
use uuid::Uuid;

use guardops::AppError;
use guardops::LogNotificationSender;
use guardops::database::init_database;
use guardops::database::models::{
    AttendanceStatus, BankAccountInput, CreateBatchInput, GeneratePlanInput, GuardInput,
    Installation, InstallationInput, ManualMarkInput, MarkDirection, MarkRequest, OvertimeQuery,
    OvertimeShiftInput, OvertimeStatus, PaymentBatchStatus, PaymentItemStatus, PlanMonthQuery,
    PlanUpsertItem, Post, PostInput,
};
use guardops::services::notifications::{PgNotificationStore, sweep_due};
use guardops::services::{
    attendance, credentials, guards, installations, marcacion, overtime, staff_plan,
};

mod common;

async fn setup() -> Uuid {
    common::setup_test_env();
    let config = common::test_config();
    init_database(&config.database_url, config.database_max_connections)
        .await
        .expect("DATABASE_URL must point at a reachable Postgres");
    Uuid::new_v4()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn amount(raw: &str) -> BigDecimal {
    BigDecimal::from_str(raw).unwrap()
}

async fn installation(tenant_id: Uuid) -> Installation {
    installations::create_installation(
        tenant_id,
        InstallationInput {
            name: "Bodega Central".to_string(),
            address: Some("Av. Matta 1000, Santiago".to_string()),
            latitude: Some(-33.45),
            longitude: Some(-70.66),
            geofence_radius_m: Some(100.0),
        },
    )
    .await
    .unwrap()
}

async fn post(tenant_id: Uuid, installation_id: Uuid, weekdays: &[&str]) -> Post {
    installations::create_post(
        tenant_id,
        PostInput {
            installation_id,
            name: "Portería".to_string(),
            shift_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            shift_end: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            active_weekdays: weekdays.iter().map(|d| d.to_string()).collect(),
            required_guards: Some(1),
            overtime_rate: amount("5000"),
        },
    )
    .await
    .unwrap()
}

async fn guard(tenant_id: Uuid, rut: &str) -> Uuid {
    guards::create_guard(
        tenant_id,
        GuardInput {
            rut: rut.to_string(),
            first_name: FirstName().fake(),
            last_name: LastName().fake(),
            email: Some("guardia@example.com".to_string()),
            phone: None,
            installation_id: None,
            bank_account: Some(BankAccountInput {
                bank_name: "Banco Estado".to_string(),
                account_type: "cuenta_rut".to_string(),
                account_number: "12345678".to_string(),
            }),
        },
    )
    .await
    .unwrap()
    .guard
    .id
}

#[actix_web::test]
#[serial]
#[ignore]
async fn test_plan_generation_is_idempotent_without_overwrite() {
    let tenant_id = setup().await;
    let site = installation(tenant_id).await;
    post(tenant_id, site.id, &["monday", "wednesday"]).await;

    let input = GeneratePlanInput {
        installation_id: site.id,
        year: 2025,
        month: 6,
        overwrite: false,
        default_guard_id: None,
    };

    let first = staff_plan::generate(tenant_id, input.clone())
        .await
        .unwrap();
    assert_eq!(first.created, 9);

    let second = staff_plan::generate(tenant_id, input).await.unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 9);
}

fn june_plan(
    installation_id: Uuid,
    overwrite: bool,
    default_guard_id: Option<Uuid>,
) -> GeneratePlanInput {
    GeneratePlanInput {
        installation_id,
        year: 2025,
        month: 6,
        overwrite,
        default_guard_id,
    }
}

async fn june_entries(
    tenant_id: Uuid,
    installation_id: Uuid,
) -> Vec<guardops::database::models::PlanEntry> {
    staff_plan::list_month(
        tenant_id,
        PlanMonthQuery {
            installation_id,
            year: 2025,
            month: 6,
        },
    )
    .await
    .unwrap()
}

#[actix_web::test]
#[serial]
#[ignore]
async fn test_overwrite_replaces_edited_rows() {
    let tenant_id = setup().await;
    let site = installation(tenant_id).await;
    let site_post = post(tenant_id, site.id, &["monday", "wednesday"]).await;
    let guard_id = guard(tenant_id, "11.111.111-1").await;

    staff_plan::generate(tenant_id, june_plan(site.id, false, None))
        .await
        .unwrap();
    staff_plan::bulk_upsert(
        tenant_id,
        vec![PlanUpsertItem {
            post_id: site_post.id,
            date: date(2025, 6, 2),
            guard_id: Some(guard_id),
            status: None,
            notes: Some("Cubre licencia".to_string()),
        }],
    )
    .await
    .unwrap();

    let result = staff_plan::generate(tenant_id, june_plan(site.id, true, None))
        .await
        .unwrap();
    assert_eq!(result.deleted, 9);
    assert_eq!(result.created, 9);
    assert_eq!(result.skipped, 0);

    let entries = june_entries(tenant_id, site.id).await;
    assert_eq!(entries.len(), 9);
    let monday = entries.iter().find(|e| e.date == date(2025, 6, 2)).unwrap();
    assert_eq!(monday.guard_id, None);
    assert_eq!(monday.notes, None);
}

#[actix_web::test]
#[serial]
#[ignore]
async fn test_unassignable_default_guard_writes_nothing() {
    let tenant_id = setup().await;
    let site = installation(tenant_id).await;
    post(tenant_id, site.id, &["monday"]).await;

    let blacklisted = guard(tenant_id, "11.111.111-1").await;
    guards::set_flags(tenant_id, blacklisted, true, true)
        .await
        .unwrap();
    let inactive = guard(tenant_id, "22.222.222-2").await;
    guards::set_flags(tenant_id, inactive, false, false)
        .await
        .unwrap();

    for guard_id in [blacklisted, inactive] {
        assert!(matches!(
            staff_plan::generate(tenant_id, june_plan(site.id, false, Some(guard_id))).await,
            Err(AppError::Validation(_))
        ));
    }
    assert!(june_entries(tenant_id, site.id).await.is_empty());
}

#[actix_web::test]
#[serial]
#[ignore]
async fn test_bulk_upsert_with_foreign_post_writes_nothing() {
    let tenant_id = setup().await;
    let site = installation(tenant_id).await;
    let own_post = post(tenant_id, site.id, &["monday"]).await;

    let other_tenant = Uuid::new_v4();
    let other_site = installation(other_tenant).await;
    let foreign_post = post(other_tenant, other_site.id, &["monday"]).await;

    let items = [own_post.id, foreign_post.id]
        .into_iter()
        .map(|post_id| PlanUpsertItem {
            post_id,
            date: date(2025, 6, 2),
            guard_id: None,
            status: None,
            notes: None,
        })
        .collect();

    assert!(matches!(
        staff_plan::bulk_upsert(tenant_id, items).await,
        Err(AppError::NotFound(_))
    ));
    assert!(june_entries(tenant_id, site.id).await.is_empty());
    assert!(june_entries(other_tenant, other_site.id).await.is_empty());
}

#[actix_web::test]
#[serial]
#[ignore]
async fn test_late_evening_marking_lands_on_local_day() {
    let tenant_id = setup().await;
    let site = installation(tenant_id).await;
    post(tenant_id, site.id, &["monday"]).await;
    let guard_id = guard(tenant_id, "33.333.333-3").await;

    staff_plan::generate(tenant_id, june_plan(site.id, false, Some(guard_id)))
        .await
        .unwrap();

    // 21:00 on Monday 2 June in Santiago.
    let marked_at = Utc.with_ymd_and_hms(2025, 6, 3, 1, 0, 0).unwrap();
    marcacion::manual_mark(
        tenant_id,
        Uuid::new_v4(),
        ManualMarkInput {
            guard_id,
            installation_id: site.id,
            direction: MarkDirection::In,
            marked_at: Some(marked_at),
            lat: None,
            lng: None,
            note: None,
        },
    )
    .await
    .unwrap();

    let monday = attendance::list_day(tenant_id, site.id, date(2025, 6, 2))
        .await
        .unwrap();
    assert_eq!(monday.len(), 1);
    assert_eq!(monday[0].row.record.status, AttendanceStatus::Attended);
    assert_eq!(monday[0].row.record.check_in_at, Some(marked_at));

    let tuesday = attendance::list_day(tenant_id, site.id, date(2025, 6, 3))
        .await
        .unwrap();
    assert!(tuesday.is_empty());
}

#[actix_web::test]
#[serial]
#[ignore]
async fn test_attendance_day_is_seeded_once() {
    let tenant_id = setup().await;
    let site = installation(tenant_id).await;
    post(tenant_id, site.id, &["monday"]).await;

    staff_plan::generate(
        tenant_id,
        GeneratePlanInput {
            installation_id: site.id,
            year: 2025,
            month: 6,
            overwrite: false,
            default_guard_id: None,
        },
    )
    .await
    .unwrap();

    let monday = date(2025, 6, 2);
    assert_eq!(
        attendance::ensure_day(tenant_id, site.id, monday)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        attendance::ensure_day(tenant_id, site.id, monday)
            .await
            .unwrap(),
        0
    );

    let open = attendance::list_open_posts(tenant_id, monday, Some(site.id))
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].record.status, AttendanceStatus::OpenPost);
}

#[actix_web::test]
#[serial]
#[ignore]
async fn test_pin_reset_invalidates_old_pin() {
    let tenant_id = setup().await;
    let guard_id = guard(tenant_id, "11.111.111-1").await;

    let first = credentials::issue_or_reset_pin(tenant_id, guard_id)
        .await
        .unwrap();
    assert!(credentials::verify_pin(guard_id, &first.pin).await.unwrap());

    let second = credentials::issue_or_reset_pin(tenant_id, guard_id)
        .await
        .unwrap();
    assert!(
        credentials::verify_pin(guard_id, &second.pin)
            .await
            .unwrap()
    );
    assert!(!credentials::verify_pin(guard_id, &first.pin).await.unwrap());

    let status = credentials::pin_status(tenant_id, guard_id).await.unwrap();
    assert!(status.has_pin);
}

#[actix_web::test]
#[serial]
#[ignore]
async fn test_marking_outside_geofence_is_stored_unvalidated() {
    let tenant_id = setup().await;
    let site = installation(tenant_id).await;
    let guard_id = guard(tenant_id, "22.222.222-2").await;
    let pin = credentials::issue_or_reset_pin(tenant_id, guard_id)
        .await
        .unwrap()
        .pin;

    // ~150 m due north of the installation
    let summary = marcacion::mark(MarkRequest {
        code: site.code.clone(),
        rut: "22222222-2".to_string(),
        pin: pin.clone(),
        direction: MarkDirection::In,
        lat: Some(-33.45 + 150.0 / 111_195.0),
        lng: Some(-70.66),
    })
    .await
    .unwrap();

    assert!(!summary.geo_validated);
    let distance = summary.geo_distance_m.unwrap();
    assert!((distance - 150.0).abs() < 1.0, "distance was {}", distance);

    let report = marcacion::verify_event(tenant_id, summary.id)
        .await
        .unwrap();
    assert!(report.valid);

    let wrong_pin = if pin == "0000" { "1111" } else { "0000" };
    let rejected = marcacion::mark(MarkRequest {
        code: site.code.clone(),
        rut: "22222222-2".to_string(),
        pin: wrong_pin.to_string(),
        direction: MarkDirection::Out,
        lat: None,
        lng: None,
    })
    .await;
    assert!(matches!(rejected, Err(AppError::InvalidCredentials)));
}

#[actix_web::test]
#[serial]
#[ignore]
async fn test_reset_manual_mark_cancels_its_notification() {
    let tenant_id = setup().await;
    let site = installation(tenant_id).await;
    let guard_id = guard(tenant_id, "33.333.333-3").await;

    let event = marcacion::manual_mark(
        tenant_id,
        Uuid::new_v4(),
        ManualMarkInput {
            guard_id,
            installation_id: site.id,
            direction: MarkDirection::In,
            marked_at: None,
            lat: None,
            lng: None,
            note: Some("Olvidó marcar".to_string()),
        },
    )
    .await
    .unwrap();

    marcacion::reset_manual_mark(tenant_id, event.id)
        .await
        .unwrap();

    let report = sweep_due(&PgNotificationStore, &LogNotificationSender, Utc::now())
        .await
        .unwrap();
    assert!(report.skipped >= 1);
    assert!(matches!(
        marcacion::verify_event(tenant_id, event.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[actix_web::test]
#[serial]
#[ignore]
async fn test_batch_paid_cascades_to_items_and_shifts() {
    let tenant_id = setup().await;
    let supervisor = Uuid::new_v4();
    let site = installation(tenant_id).await;
    let site_post = post(tenant_id, site.id, &["monday", "tuesday", "wednesday"]).await;
    let guard_id = guard(tenant_id, "44.444.444-4").await;

    for day in [2, 3, 4] {
        let shift = overtime::create_shift(
            tenant_id,
            supervisor,
            OvertimeShiftInput {
                guard_id,
                post_id: site_post.id,
                date: date(2025, 6, day),
                amount: amount("42000"),
                notes: None,
            },
        )
        .await
        .unwrap();
        overtime::approve(tenant_id, shift.id).await.unwrap();
    }

    let week = CreateBatchInput {
        week_start: date(2025, 6, 2),
        week_end: date(2025, 6, 8),
    };
    let detail = overtime::create_batch(tenant_id, supervisor, week.clone())
        .await
        .unwrap();
    assert_eq!(detail.batch.code, "HE-2025-W23");
    assert_eq!(detail.batch.total_amount, amount("126000"));
    assert_eq!(detail.items.len(), 3);

    // Every approved shift is already linked.
    assert!(matches!(
        overtime::create_batch(tenant_id, supervisor, week).await,
        Err(AppError::Conflict(_))
    ));

    let (code, csv) = overtime::export_bank_file(tenant_id, detail.batch.id)
        .await
        .unwrap();
    assert_eq!(code, "HE-2025-W23");
    assert_eq!(csv.lines().count(), 4);

    let paid = overtime::mark_paid(tenant_id, detail.batch.id)
        .await
        .unwrap();
    assert_eq!(paid.batch.status, PaymentBatchStatus::Paid);
    assert!(
        paid.items
            .iter()
            .all(|i| i.status == PaymentItemStatus::Paid)
    );

    let shifts = overtime::list_shifts(
        tenant_id,
        OvertimeQuery {
            status: Some(OvertimeStatus::Paid),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(shifts.len(), 3);

    assert!(matches!(
        overtime::approve(tenant_id, shifts[0].id).await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        overtime::reject(tenant_id, shifts[0].id, Some("Turno duplicado".to_string())).await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        overtime::mark_paid(tenant_id, detail.batch.id).await,
        Err(AppError::Conflict(_))
    ));
}
