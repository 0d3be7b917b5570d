//! Axum integration for `meta` decoders.
//!
//! [`Decoded<T>`] decodes the query string of a request together with its
//! body, using the [`Decoder<T>`] found in the router state.
//!
//! ```ignore
//! use axum::{Router, routing::post};
//! use meta::Decoder;
//! use meta_axum::Decoded;
//!
//! async fn signup(Decoded(form): Decoded<Signup>) -> String {
//!     form.email.get().unwrap_or_default().to_string()
//! }
//!
//! let app = Router::new()
//!     .route("/signup", post(signup))
//!     .with_state(Decoder::<Signup>::new()?);
//! ```

use axum::{
    Json,
    body::Bytes,
    extract::{FromRef, FromRequest, Request, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, warn};

use meta::{Decoder, ErrorMap, FormValues, Meta};

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A value decoded from the query string and the body of a request.
///
/// JSON bodies take precedence over query values, as do urlencoded bodies.
/// A request without a supported content type may only carry query values.
#[derive(Debug, Clone, Default)]
pub struct Decoded<T>(pub T);

#[derive(Debug, thiserror::Error)]
pub enum DecodeRejection {
    #[error("failed to read request body: {0}")]
    Body(#[from] BytesRejection),
    #[error("unsupported content type '{0}'")]
    UnsupportedMediaType(String),
    #[error("malformed request")]
    Malformed,
    #[error("{} invalid field(s)", .0.len())]
    Invalid(ErrorMap),
}

impl DecodeRejection {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Body(_) | Self::Malformed => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl From<ErrorMap> for DecodeRejection {
    fn from(errors: ErrorMap) -> Self {
        if errors.is_malformed() {
            Self::Malformed
        } else {
            Self::Invalid(errors)
        }
    }
}

impl IntoResponse for DecodeRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Body(ref e) => {
                warn!(error = %e, "request body rejected");
                (status, Json(json!({ "error": self.to_string() }))).into_response()
            }
            Self::UnsupportedMediaType(ref content_type) => {
                warn!(content_type = %content_type, "request content type rejected");
                (status, Json(json!({ "error": self.to_string() }))).into_response()
            }
            Self::Malformed => {
                debug!("malformed request rejected");
                (status, Json(ErrorMap::malformed())).into_response()
            }
            Self::Invalid(errors) => {
                debug!(fields = errors.len(), "invalid request rejected");
                (status, Json(errors)).into_response()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Other(String),
    Missing,
}

impl BodyKind {
    fn from_headers(headers: &HeaderMap) -> Self {
        let Some(value) = headers.get(header::CONTENT_TYPE) else {
            return Self::Missing;
        };
        let Ok(value) = value.to_str() else {
            return Self::Other(String::new());
        };

        let essence = value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if essence == JSON_CONTENT_TYPE
            || (essence.starts_with("application/") && essence.ends_with("+json"))
        {
            Self::Json
        } else if essence == FORM_CONTENT_TYPE {
            Self::Form
        } else {
            Self::Other(essence)
        }
    }
}

impl<T, S> FromRequest<S> for Decoded<T>
where
    T: Meta,
    S: Send + Sync,
    Decoder<T>: FromRef<S>,
{
    type Rejection = DecodeRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let query = req.uri().query().map(FormValues::parse).unwrap_or_default();
        let kind = BodyKind::from_headers(req.headers());
        let body = Bytes::from_request(req, state).await?;

        let decoder = Decoder::<T>::from_ref(state);
        let mut dest = T::default();
        match kind {
            BodyKind::Json => decoder.decode(&mut dest, &query, &body)?,
            BodyKind::Form => {
                let mut values = FormValues::parse(&body);
                values.merge(&query);
                decoder.decode_values(&mut dest, &values)?;
            }
            BodyKind::Other(_) | BodyKind::Missing if body.is_empty() => {
                decoder.decode_values(&mut dest, &query)?;
            }
            BodyKind::Other(content_type) => {
                return Err(DecodeRejection::UnsupportedMediaType(content_type));
            }
            BodyKind::Missing => {
                return Err(DecodeRejection::UnsupportedMediaType(String::new()));
            }
        }

        Ok(Self(dest))
    }
}
