use axum::{
    Json, Router,
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::info;

use meta::{Decoder, DecoderOptions, SchemaError};
use meta_axum::Decoded;

use crate::forms::{Category, Signup};

#[derive(Clone, Debug)]
pub struct AppState {
    signup: Decoder<Signup>,
    categories: Decoder<Category>,
}

impl AppState {
    pub fn new(options: &DecoderOptions) -> Result<Self, SchemaError> {
        Ok(Self {
            signup: Decoder::<Signup>::builder().options(options.clone()).build()?,
            categories: Decoder::<Category>::builder().options(options.clone()).build()?,
        })
    }
}

impl FromRef<AppState> for Decoder<Signup> {
    fn from_ref(state: &AppState) -> Self {
        state.signup.clone()
    }
}

impl FromRef<AppState> for Decoder<Category> {
    fn from_ref(state: &AppState) -> Self {
        state.categories.clone()
    }
}

/// Decode a signup form
async fn create_signup(Decoded(signup): Decoded<Signup>) -> impl IntoResponse {
    info!(
        signup.email = signup.email.get().unwrap_or_default(),
        signup.tag_count = signup.tags.val.len(),
        signup.extra_count = signup.extras.len(),
        "signup decoded"
    );
    (StatusCode::CREATED, Json(signup))
}

/// Decode a category tree
async fn create_category(Decoded(category): Decoded<Category>) -> impl IntoResponse {
    info!(
        category.name = category.name.get().unwrap_or_default(),
        category.child_count = category.children.len(),
        "category decoded"
    );
    (StatusCode::CREATED, Json(category))
}

/// List the signup field descriptors
async fn signup_fields(State(state): State<AppState>) -> impl IntoResponse {
    let fields: Vec<_> = state.signup.fields().collect();
    Json(serde_json::to_value(fields).unwrap_or_default())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/signup", post(create_signup))
        .route("/signup/fields", get(signup_fields))
        .route("/categories", post(create_category))
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        create_router(AppState::new(&DecoderOptions::default()).unwrap())
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_signup() {
        let (status, body) = send(post_json(
            "/signup",
            r#"{
                "email": "grace@example.com",
                "age": 40,
                "newsletter": "true",
                "address": {"street": "1 Navy Yard", "city": "Arlington"},
                "tags": ["cobol", "compilers"],
                "referrer": "conference"
            }"#,
        ))
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["email"], "grace@example.com");
        assert_eq!(body["age"], 40);
        assert_eq!(body["plan"], "free");
        assert_eq!(body["newsletter"], true);
        assert_eq!(body["address"]["city"], "Arlington");
        assert_eq!(body["billing"], Value::Null);
        assert_eq!(body["tags"], json!(["cobol", "compilers"]));
        assert_eq!(body["extras"]["referrer"], "conference");
    }

    #[tokio::test]
    async fn test_create_signup_from_form() {
        let request = Request::builder()
            .method("POST")
            .uri("/signup?plan=pro")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(
                "email=alan%40example.com&address.street=Sherborne&address.city=Dorset&phones.0=123",
            ))
            .unwrap();

        let (status, body) = send(request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["email"], "alan@example.com");
        assert_eq!(body["plan"], "pro");
        assert_eq!(body["phones"], json!(["123"]));
    }

    #[tokio::test]
    async fn test_create_signup_invalid() {
        let (status, body) = send(post_json(
            "/signup",
            r#"{"email": "x@example.com", "tags": "a,b,c,d,e,f", "address": {"city": "Paris"}}"#,
        ))
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({"tags": "max_length", "address": {"street": "required"}})
        );
    }

    #[tokio::test]
    async fn test_create_category() {
        let (status, body) = send(post_json(
            "/categories",
            r#"{"name": "root", "children": [{"name": "books", "children": [{"name": "poetry"}]}]}"#,
        ))
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["children"][0]["children"][0]["name"], "poetry");
    }

    #[tokio::test]
    async fn test_create_category_invalid() {
        let (status, body) = send(post_json(
            "/categories",
            r#"{"name": "root", "children": [{"name": "a", "children": [{"slug": "fiction"}]}]}"#,
        ))
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({"children": [{"children": [{"name": "required"}]}]})
        );
    }

    #[tokio::test]
    async fn test_signup_fields() {
        let request = Request::builder()
            .method("GET")
            .uri("/signup/fields")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(request).await;

        assert_eq!(status, StatusCode::OK);
        let fields = body.as_array().unwrap();
        assert_eq!(fields.len(), 14);
        assert_eq!(fields[0]["name"], "email");
        assert_eq!(fields[0]["required"], true);
        assert_eq!(fields[0]["doc"], "Contact address");
        assert_eq!(fields[13]["category"], "catch_all");
    }
}
