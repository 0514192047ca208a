use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_partial_json, method, path, query_param};

use doctor_cell::router::doctor_routes;
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils, MockSupabaseResponses};

fn create_test_app(mock_server: &MockServer) -> Router {
    doctor_routes(TestConfig::with_url(mock_server.uri()).to_arc())
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_routes_require_bearer_token() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(&mock_server);

    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}", Uuid::new_v4()))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_doctor_returns_row() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let clinic_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&doctor_id, &clinic_id)
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}", doctor_id))
        .header("Authorization", JwtTestUtils::bearer(&TestUser::default()))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = read_json(response).await;
    assert_eq!(json_response["id"], doctor_id);
    assert_eq!(json_response["available_from_week_day"], 1);
}

#[tokio::test]
async fn test_get_missing_doctor_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}", Uuid::new_v4()))
        .header("Authorization", JwtTestUtils::bearer(&TestUser::default()))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_doctor_rejects_invalid_week_day() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(&mock_server);

    let body = json!({
        "clinic_id": Uuid::new_v4(),
        "name": "Dr. House",
        "specialty": "Diagnostics",
        "available_from_week_day": 1,
        "available_to_week_day": 7,
        "available_from_time": "08:00:00",
        "available_to_time": "18:00:00",
        "appointment_price_in_cents": 20000
    });

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Authorization", JwtTestUtils::bearer(&TestUser::default()))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing may reach storage when validation fails.
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_doctor_success() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4().to_string();
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&doctor_id, &clinic_id)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let body = json!({
        "clinic_id": clinic_id,
        "name": "Dra. Ana Souza",
        "specialty": "Cardiology",
        "available_from_week_day": 1,
        "available_to_week_day": 5,
        "available_from_time": "08:00:00",
        "available_to_time": "18:00:00",
        "appointment_price_in_cents": 15000
    });

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Authorization", JwtTestUtils::bearer(&TestUser::default()))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json_response = read_json(response).await;
    assert_eq!(json_response["id"], doctor_id);
}

#[tokio::test]
async fn test_availability_check_reports_window() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let clinic_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&doctor_id, &clinic_id)
        ])))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::bearer(&TestUser::default());

    // 2025-01-08 is a Wednesday, 2025-01-11 a Saturday.
    for (at, expected) in [
        ("2025-01-08T10:00:00", true),
        ("2025-01-08T18:00:00", false),
        ("2025-01-11T10:00:00", false),
    ] {
        let app = create_test_app(&mock_server);
        let request = Request::builder()
            .method("GET")
            .uri(format!("/{}/availability?at={}", doctor_id, at))
            .header("Authorization", token.clone())
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json_response = read_json(response).await;
        assert_eq!(json_response["available"], expected, "at {}", at);
        assert_eq!(json_response["window"]["to_time"], "18:00:00");
    }
}

#[tokio::test]
async fn test_update_doctor_with_null_avatar_clears_it() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let clinic_id = Uuid::new_v4().to_string();

    let mut current = MockSupabaseResponses::doctor_response(&doctor_id, &clinic_id);
    current["avatar_image_url"] = json!("https://cdn.example.com/house.png");

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([current])))
        .mount(&mock_server)
        .await;

    let mut cleared = MockSupabaseResponses::doctor_response(&doctor_id, &clinic_id);
    cleared["avatar_image_url"] = Value::Null;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctors"))
        .and(body_partial_json(json!({ "avatar_image_url": null })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([cleared])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/{}", doctor_id))
        .header("Authorization", JwtTestUtils::bearer(&TestUser::default()))
        .header("Content-Type", "application/json")
        .body(Body::from(json!({ "avatar_image_url": null }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = read_json(response).await;
    assert!(json_response["avatar_image_url"].is_null());
}

#[tokio::test]
async fn test_update_doctor_without_avatar_leaves_it_untouched() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let clinic_id = Uuid::new_v4().to_string();
    let row = MockSupabaseResponses::doctor_response(&doctor_id, &clinic_id);

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row.clone()])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/{}", doctor_id))
        .header("Authorization", JwtTestUtils::bearer(&TestUser::default()))
        .header("Content-Type", "application/json")
        .body(Body::from(json!({ "name": "Dr. Gregory House" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let requests = mock_server.received_requests().await.unwrap();
    let patch = requests
        .iter()
        .find(|r| r.method.as_str() == "PATCH")
        .unwrap();
    let sent: Value = serde_json::from_slice(&patch.body).unwrap();
    assert_eq!(sent["name"], "Dr. Gregory House");
    assert!(sent.get("avatar_image_url").is_none());
}
