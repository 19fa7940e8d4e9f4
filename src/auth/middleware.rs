//! Authentication middleware that checks the bearer access token on protected routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};

use crate::{
    Error,
    auth::token::{TokenConfig, TokenType},
};

/// Middleware function that checks for a valid access token in the `Authorization` header.
///
/// The user ID is placed into the request extensions and the request executed
/// normally if the token is valid, otherwise a 401 response is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
pub async fn auth_guard(
    State(token_config): State<TokenConfig>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Response {
    let TypedHeader(Authorization(bearer)) = match bearer {
        Ok(header) => header,
        Err(rejection) => {
            tracing::debug!("missing or malformed authorization header: {rejection}");
            return Error::Unauthenticated.into_response();
        }
    };

    match token_config.verify(bearer.token(), TokenType::Access) {
        Ok(user_id) => {
            request.extensions_mut().insert(user_id);
            next.run(request).await
        }
        Err(error) => error.into_response(),
    }
}
