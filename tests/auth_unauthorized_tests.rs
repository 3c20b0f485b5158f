use actix_web::{App, http::StatusCode, test};
use guardops::database::models::Role;
use guardops::handlers::shared::ApiResponse;
use guardops::routes;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use serial_test::serial;

mod common;

// Requests rejected here never reach the database, so no pool is needed.
macro_rules! test_unauthorized {
    ($test_name:ident, $method:ident, $uri:expr) => {
        #[actix_web::test]
        #[serial]
        async fn $test_name() {
            common::setup_test_env();
            let app = test::init_service(
                App::new()
                    .app_data(common::config_data())
                    .app_data(common::sender_data())
                    .configure(routes::configure),
            )
            .await;

            let req = test::TestRequest::$method().uri($uri).to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            let body: ApiResponse<Value> = test::read_body_json(resp).await;
            assert!(!body.success);
        }
    };
}

macro_rules! test_forbidden {
    ($test_name:ident, $role:expr, $method:ident, $uri:expr, $body:expr) => {
        #[actix_web::test]
        #[serial]
        async fn $test_name() {
            common::setup_test_env();
            let app = test::init_service(
                App::new()
                    .app_data(common::config_data())
                    .app_data(common::sender_data())
                    .configure(routes::configure),
            )
            .await;

            let req = test::TestRequest::$method()
                .uri($uri)
                .insert_header(("Authorization", common::bearer($role)))
                .set_json($body)
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        }
    };
}

const SOME_ID: &str = "6f1c2a3e-9a0b-4c5d-8e7f-001122334455";

test_unauthorized!(test_list_guards_requires_token, get, "/api/v1/guards");
test_unauthorized!(test_plan_generate_requires_token, post, "/api/v1/plan/generate");
test_unauthorized!(
    test_attendance_requires_token,
    get,
    "/api/v1/attendance?installationId=6f1c2a3e-9a0b-4c5d-8e7f-001122334455&date=2025-06-02"
);
test_unauthorized!(test_manual_mark_requires_token, post, "/api/v1/marcacion/manual");
test_unauthorized!(test_overtime_requires_token, get, "/api/v1/overtime");
test_unauthorized!(test_batches_require_token, get, "/api/v1/payment-batches");
test_unauthorized!(test_settings_require_token, get, "/api/v1/settings");
test_unauthorized!(test_sweep_requires_token, post, "/api/v1/notifications/sweep");

test_forbidden!(
    test_viewer_cannot_list_guards,
    Role::Viewer,
    get,
    "/api/v1/guards",
    json!({})
);
test_forbidden!(
    test_viewer_cannot_approve_overtime,
    Role::Viewer,
    post,
    &format!("/api/v1/overtime/{}/approve", SOME_ID),
    json!({})
);
test_forbidden!(
    test_viewer_cannot_mark_batch_paid,
    Role::Viewer,
    post,
    &format!("/api/v1/payment-batches/{}/paid", SOME_ID),
    json!({})
);
test_forbidden!(
    test_supervisor_cannot_update_settings,
    Role::Supervisor,
    put,
    "/api/v1/settings",
    json!({ "allowReplacements": false })
);
test_forbidden!(
    test_supervisor_cannot_run_sweep,
    Role::Supervisor,
    post,
    "/api/v1/notifications/sweep",
    json!({})
);
test_forbidden!(
    test_supervisor_cannot_create_guard,
    Role::Supervisor,
    post,
    "/api/v1/guards",
    json!({ "rut": "12.345.678-5", "firstName": "Ana", "lastName": "Soto" })
);

#[actix_web::test]
#[serial]
async fn test_token_signed_with_other_secret_is_rejected() {
    common::setup_test_env();
    let app = test::init_service(
        App::new()
            .app_data(common::config_data())
            .configure(routes::configure),
    )
    .await;

    let token = guardops::services::auth::issue_token(
        "some-other-secret",
        uuid::Uuid::new_v4(),
        uuid::Uuid::new_v4(),
        Role::Admin,
        chrono::Duration::hours(1),
    )
    .unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/settings")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
