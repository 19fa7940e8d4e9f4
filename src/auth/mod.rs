//! User registration, log in, profiles and the JSON web tokens that authenticate API requests.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::AppState;

mod log_in;
mod middleware;
mod password;
mod profile;
mod register;
mod token;

pub use log_in::{log_in_endpoint, obtain_token_endpoint, refresh_token_endpoint};
pub use middleware::auth_guard;
pub use password::{PasswordHash, ValidatedPassword};
pub use profile::{get_profile_endpoint, update_profile_endpoint};
pub use register::register_endpoint;
pub use token::{
    DEFAULT_ACCESS_TOKEN_DURATION, DEFAULT_REFRESH_TOKEN_DURATION, TokenConfig, TokenPair,
    TokenType,
};

/// The state needed by the registration, log in and profile endpoints.
#[derive(Clone)]
pub struct AuthState {
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The keys and lifetimes for issuing tokens.
    pub token_config: TokenConfig,
    /// The bcrypt cost used when hashing new passwords.
    pub password_hash_cost: u32,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            token_config: state.token_config.clone(),
            password_hash_cost: state.password_hash_cost,
        }
    }
}
