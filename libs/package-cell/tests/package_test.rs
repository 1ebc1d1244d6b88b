use axum::body::{to_bytes, Body};
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use package_cell::router::package_routes;
use shared_utils::test_utils::{JwtTestUtils, MockDataApiRows, TestConfig, TestUser};

async fn setup() -> (MockServer, axum::Router, TestConfig) {
    let server = MockServer::start().await;
    let config = TestConfig {
        supabase_url: server.uri(),
        ..TestConfig::default()
    };
    let router = package_routes(config.to_arc());
    (server, router, config)
}

fn bearer(config: &TestConfig, user: &TestUser) -> String {
    format!(
        "Bearer {}",
        JwtTestUtils::create_test_token(user, &config.jwt_secret, None)
    )
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn mount_patient(server: &MockServer, patient_id: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{patient_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockDataApiRows::patient_row(patient_id, "Maria Lopez")
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn create_package_starts_active_with_zero_sessions() {
    let (server, router, config) = setup().await;
    let patient_id = Uuid::new_v4().to_string();
    let package_id = Uuid::new_v4().to_string();

    mount_patient(&server, &patient_id).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/treatment_packages"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockDataApiRows::package_row(&package_id, &patient_id, 10, 0, "ACTIVE")
        ])))
        .mount(&server)
        .await;

    let user = TestUser::clinician("clinician@clinic.test");
    let request = Request::builder()
        .method("POST")
        .uri(format!("/patients/{patient_id}/packages"))
        .header("Authorization", bearer(&config, &user))
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({ "treatment_type": "laser hair removal", "total_sessions": 10 }).to_string(),
        ))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ACTIVE");
    assert_eq!(body["completed_sessions"], 0);
}

#[tokio::test]
async fn create_package_requires_at_least_one_session() {
    let (server, router, config) = setup().await;
    let patient_id = Uuid::new_v4().to_string();
    mount_patient(&server, &patient_id).await;

    let user = TestUser::clinician("clinician@clinic.test");
    let request = Request::builder()
        .method("POST")
        .uri(format!("/patients/{patient_id}/packages"))
        .header("Authorization", bearer(&config, &user))
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({ "treatment_type": "laser hair removal", "total_sessions": 0 }).to_string(),
        ))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("at least 1"));
}

#[tokio::test]
async fn create_package_rejects_unknown_patient() {
    let (server, router, config) = setup().await;
    let patient_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let user = TestUser::admin("admin@clinic.test");
    let request = Request::builder()
        .method("POST")
        .uri(format!("/patients/{patient_id}/packages"))
        .header("Authorization", bearer(&config, &user))
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({ "treatment_type": "laser hair removal", "total_sessions": 5 }).to_string(),
        ))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_package_only_when_active() {
    let (server, router, config) = setup().await;
    let patient_id = Uuid::new_v4().to_string();
    let package_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/treatment_packages"))
        .and(query_param("id", format!("eq.{package_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockDataApiRows::package_row(&package_id, &patient_id, 10, 10, "COMPLETED")
        ])))
        .mount(&server)
        .await;

    let user = TestUser::clinician("clinician@clinic.test");
    let request = Request::builder()
        .method("POST")
        .uri(format!("/packages/{package_id}/cancel"))
        .header("Authorization", bearer(&config, &user))
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Only active packages"));
}

#[tokio::test]
async fn cancel_active_package_succeeds() {
    let (server, router, config) = setup().await;
    let patient_id = Uuid::new_v4().to_string();
    let package_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/treatment_packages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockDataApiRows::package_row(&package_id, &patient_id, 10, 2, "ACTIVE")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/treatment_packages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockDataApiRows::package_row(&package_id, &patient_id, 10, 2, "CANCELLED")
        ])))
        .mount(&server)
        .await;

    let user = TestUser::admin("admin@clinic.test");
    let request = Request::builder()
        .method("POST")
        .uri(format!("/packages/{package_id}/cancel"))
        .header("Authorization", bearer(&config, &user))
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn assistants_can_read_but_not_cancel() {
    let (server, router, config) = setup().await;
    let patient_id = Uuid::new_v4().to_string();

    mount_patient(&server, &patient_id).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/treatment_packages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let user = TestUser::assistant("assistant@clinic.test");
    let request = Request::builder()
        .method("GET")
        .uri(format!("/patients/{patient_id}/packages/active"))
        .header("Authorization", bearer(&config, &user))
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .method("POST")
        .uri(format!("/packages/{}/cancel", Uuid::new_v4()))
        .header("Authorization", bearer(&config, &user))
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
