//! Integration tests for meta-axum.

#![allow(clippy::unwrap_used)]

use axum::{
    Json, Router,
    body::Body,
    http::{Request, StatusCode, header},
    routing::{get, post},
};
use meta::{Decoder, Int64, Meta, SchemaBuilder, SchemaError, Text, TextSlice};
use meta_axum::Decoded;
use serde::Serialize;
use serde_json::{Value, json};
use tower::ServiceExt;

#[derive(Debug, Default, Serialize)]
struct Contact {
    name: Text,
    age: Int64,
    tags: TextSlice,
}

impl Meta for Contact {
    fn describe(schema: &mut SchemaBuilder<'_, Self>) -> Result<(), SchemaError> {
        schema
            .scalar("name", r#"meta_required:"true""#, |c| &mut c.name)?
            .scalar("age", r#"meta_min:"0""#, |c| &mut c.age)?
            .scalar("tags", "", |c| &mut c.tags)?;
        Ok(())
    }
}

async fn echo(Decoded(contact): Decoded<Contact>) -> Json<Contact> {
    Json(contact)
}

fn app() -> Router {
    Router::new()
        .route("/contacts", post(echo))
        .route("/search", get(echo))
        .with_state(Decoder::<Contact>::new().unwrap())
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_decoded_json_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/contacts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name": "Ada", "age": 36, "tags": ["math", "engines"]}"#))
        .unwrap();

    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"name": "Ada", "age": 36, "tags": ["math", "engines"]}));
}

#[tokio::test]
async fn test_decoded_json_body_over_query() {
    let request = Request::builder()
        .method("POST")
        .uri("/contacts?name=Query&age=7")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name": "Body"}"#))
        .unwrap();

    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Body");
    assert_eq!(body["age"], 7);
}

#[tokio::test]
async fn test_decoded_form_body_over_query() {
    let request = Request::builder()
        .method("POST")
        .uri("/contacts?name=Query&tags=a,b")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("name=Form&age=12"))
        .unwrap();

    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"name": "Form", "age": 12, "tags": ["a", "b"]}));
}

#[tokio::test]
async fn test_decoded_query_only() {
    let request = Request::builder()
        .method("GET")
        .uri("/search?name=Grace&age=85")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Grace");
    assert_eq!(body["age"], 85);
}

#[tokio::test]
async fn test_decoded_field_errors() {
    let request = Request::builder()
        .method("POST")
        .uri("/contacts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"age": -1}"#))
        .unwrap();

    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body, json!({"name": "required", "age": "min"}));
}

#[tokio::test]
async fn test_decoded_malformed_json() {
    let request = Request::builder()
        .method("POST")
        .uri("/contacts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name": "Ada""#))
        .unwrap();

    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "malformed_json"}));
}

#[tokio::test]
async fn test_decoded_unsupported_media_type() {
    let request = Request::builder()
        .method("POST")
        .uri("/contacts?name=Ada")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("name=Ada"))
        .unwrap();

    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body, json!({"error": "unsupported content type 'text/plain'"}));
}

#[tokio::test]
async fn test_decoded_missing_content_type_with_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/contacts")
        .body(Body::from(r#"{"name": "Ada"}"#))
        .unwrap();

    let (status, _) = send(request).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_decoded_invalid_utf8_query() {
    let request = Request::builder()
        .method("GET")
        .uri("/search?name=%FF%FE&age=3")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body, json!({"name": "utf8"}));
}
