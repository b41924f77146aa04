mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{app, assert_error, create_table, create_user, get, post, send};

#[tokio::test]
async fn created_tables_start_available() {
    let app = app();

    let (status, body) = post(&app, "/tables", json!({ "name": "Window", "capacity": 4 })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Window");
    assert_eq!(body["capacity"], 4);
    assert_eq!(body["isAvailable"], true);

    let (status, list) = get(&app, "/tables").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_name_or_capacity() {
    let app = app();

    let (status, body) = post(&app, "/tables", json!({ "name": "  ", "capacity": 4 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, StatusCode::BAD_REQUEST, "Invalid name");

    let (status, body) = post(&app, "/tables", json!({ "name": "Window", "capacity": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, StatusCode::BAD_REQUEST, "Invalid capacity");

    let (status, body) = post(&app, "/tables", json!({ "name": "Window" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, StatusCode::BAD_REQUEST, "Invalid capacity");
}

#[tokio::test]
async fn patch_requires_a_field() {
    let app = app();
    let id = create_table(&app, "Window", 4).await;

    let (status, body) = send(&app, Method::PATCH, &format!("/tables/{id}"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, StatusCode::BAD_REQUEST, "No valid fields to update");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/tables/{id}"),
        Some(json!({ "capacity": 6, "isAvailable": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["capacity"], 6);
    assert_eq!(body["isAvailable"], false);
    assert_eq!(body["name"], "Window");

    let body = json!({ "name": "Corner" });
    let (status, _) = send(&app, Method::PATCH, "/tables/999", Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_table_is_404() {
    let app = app();

    let (status, body) = get(&app, "/tables/7").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error(&body, StatusCode::NOT_FOUND, "Table not found");

    let (status, _) = send(&app, Method::DELETE, "/tables/7", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_booked_table_unbinds_the_reservation() {
    let app = app();
    let user_id = create_user(&app, "ana").await;
    let table_id = create_table(&app, "Window", 4).await;
    let (_, booked) = post(
        &app,
        "/reservations",
        json!({ "date": "2025-06-15", "time": "19:00", "people": 2, "userId": user_id }),
    )
    .await;

    let (status, _) = send(&app, Method::DELETE, &format!("/tables/{table_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, reservation) = get(&app, &format!("/reservations/{}", booked["id"])).await;
    assert!(reservation["tableId"].is_null());
    assert!(reservation["table"].is_null());
}
