//! JSON web tokens for authenticating API requests.
//!
//! Logging in gives the client a short-lived access token, which is sent as a
//! bearer token with every request, and a longer-lived refresh token, which
//! can only be exchanged for a new access token.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use time::{Duration, OffsetDateTime};

use crate::{Error, user::UserID};

/// How long access tokens are valid for by default.
pub const DEFAULT_ACCESS_TOKEN_DURATION: Duration = Duration::minutes(5);
/// How long refresh tokens are valid for by default.
pub const DEFAULT_REFRESH_TOKEN_DURATION: Duration = Duration::days(1);

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Authenticates API requests.
    Access,
    /// Can only be exchanged for a new access token.
    Refresh,
}

/// The contents of a JSON web token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// The user the token was issued to.
    pub user_id: UserID,
    /// What the token may be used for.
    pub token_type: TokenType,
    /// When the token was issued, in seconds since the Unix epoch.
    pub iat: i64,
    /// When the token expires, in seconds since the Unix epoch.
    pub exp: i64,
}

/// An access and refresh token issued together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenPair {
    /// The refresh token.
    pub refresh: String,
    /// The access token.
    pub access: String,
}

/// The keys and lifetimes used to issue and verify tokens.
#[derive(Clone)]
pub struct TokenConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// How long access tokens are valid for.
    pub access_token_duration: Duration,
    /// How long refresh tokens are valid for.
    pub refresh_token_duration: Duration,
}

impl TokenConfig {
    /// Create a token config that signs tokens with a key derived from `secret`.
    pub fn new(secret: &str) -> Self {
        let hash = Sha512::digest(secret);

        Self {
            encoding_key: EncodingKey::from_secret(&hash),
            decoding_key: DecodingKey::from_secret(&hash),
            access_token_duration: DEFAULT_ACCESS_TOKEN_DURATION,
            refresh_token_duration: DEFAULT_REFRESH_TOKEN_DURATION,
        }
    }

    /// Set how long new tokens are valid for.
    pub fn with_durations(mut self, access: Duration, refresh: Duration) -> Self {
        self.access_token_duration = access;
        self.refresh_token_duration = refresh;
        self
    }

    /// Issue a new access and refresh token for `user_id`.
    ///
    /// # Errors
    /// Returns [Error::TokenCreation] if a token could not be signed.
    pub fn issue_tokens(&self, user_id: UserID) -> Result<TokenPair, Error> {
        Ok(TokenPair {
            refresh: self.issue(user_id, TokenType::Refresh)?,
            access: self.issue(user_id, TokenType::Access)?,
        })
    }

    /// Issue a new token of `token_type` for `user_id`.
    ///
    /// # Errors
    /// Returns [Error::TokenCreation] if the token could not be signed.
    pub fn issue(&self, user_id: UserID, token_type: TokenType) -> Result<String, Error> {
        let now = OffsetDateTime::now_utc();
        let duration = match token_type {
            TokenType::Access => self.access_token_duration,
            TokenType::Refresh => self.refresh_token_duration,
        };

        self.sign(&Claims {
            user_id,
            token_type,
            iat: now.unix_timestamp(),
            exp: (now + duration).unix_timestamp(),
        })
    }

    /// Check that `token` is a valid, unexpired token of `expected_type` and get the user it was issued to.
    ///
    /// # Errors
    /// Returns [Error::Unauthenticated] if the token is malformed, has a bad
    /// signature, has expired, or is the wrong type of token.
    pub fn verify(&self, token: &str, expected_type: TokenType) -> Result<UserID, Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|error| {
                tracing::debug!("rejected token: {error}");
                Error::Unauthenticated
            })?
            .claims;

        if claims.token_type != expected_type {
            tracing::debug!(
                "rejected {:?} token where a {:?} token was expected",
                claims.token_type,
                expected_type
            );
            return Err(Error::Unauthenticated);
        }

        Ok(claims.user_id)
    }

    fn sign(&self, claims: &Claims) -> Result<String, Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|error| {
            tracing::error!("could not sign token: {error}");
            Error::TokenCreation(error.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use crate::{Error, user::UserID};

    use super::{Claims, TokenConfig, TokenType};

    fn config() -> TokenConfig {
        TokenConfig::new("foobar")
    }

    #[test]
    fn access_token_verifies_as_access() {
        let config = config();
        let user_id = UserID::new(42);

        let tokens = config.issue_tokens(user_id).unwrap();

        assert_eq!(config.verify(&tokens.access, TokenType::Access), Ok(user_id));
        assert_eq!(config.verify(&tokens.refresh, TokenType::Refresh), Ok(user_id));
    }

    #[test]
    fn tokens_cannot_be_used_as_the_other_type() {
        let config = config();
        let tokens = config.issue_tokens(UserID::new(1)).unwrap();

        assert_eq!(
            config.verify(&tokens.refresh, TokenType::Access),
            Err(Error::Unauthenticated)
        );
        assert_eq!(
            config.verify(&tokens.access, TokenType::Refresh),
            Err(Error::Unauthenticated)
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = config();
        let issued = OffsetDateTime::now_utc() - Duration::hours(1);
        let token = config
            .sign(&Claims {
                user_id: UserID::new(1),
                token_type: TokenType::Access,
                iat: issued.unix_timestamp(),
                exp: (issued + Duration::minutes(5)).unix_timestamp(),
            })
            .unwrap();

        assert_eq!(
            config.verify(&token, TokenType::Access),
            Err(Error::Unauthenticated)
        );
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = TokenConfig::new("other secret")
            .issue(UserID::new(1), TokenType::Access)
            .unwrap();

        assert_eq!(
            config().verify(&token, TokenType::Access),
            Err(Error::Unauthenticated)
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(
            config().verify("not.a.jwt", TokenType::Access),
            Err(Error::Unauthenticated)
        );
        assert_eq!(config().verify("", TokenType::Access), Err(Error::Unauthenticated));
    }
}
