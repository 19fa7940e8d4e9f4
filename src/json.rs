//! A JSON body extractor that reports malformed bodies as validation errors.

use axum::extract::{FromRequest, rejection::JsonRejection};

use crate::Error;

/// Extracts a JSON request body like [axum::Json], but rejects with
/// [Error::Validation] so clients always get the app's JSON error shape.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("rejected request body: {}", rejection.body_text());
        Error::validation("body", rejection.body_text())
    }
}
