//! Bearer-token authentication.
//!
//! Customers sign in with the hosted auth provider, which issues HS256 tokens signed with the project's JWT secret.
//! The server validates those with the same secret. Admins log in against this server, which issues tokens of the same
//! shape carrying the `admin` role.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpMessage, HttpRequest};
use chrono::Duration;
use hmac::{Hmac, Mac};
use jwt_compact::{
    alg::{Hs256, Hs256Key},
    prelude::*,
};
use log::*;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sf_common::Secret;
use sha2::Sha256;
use storefront_engine::db_types::Role;

use crate::{config::AuthConfig, errors::AuthError};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id assigned by the auth provider. For admins, the admin username.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Tokens without roles belong to customers.
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl JwtClaims {
    pub fn customer<S: Into<String>>(user_id: S, email: Option<String>) -> Self {
        Self { sub: user_id.into(), email, roles: vec![Role::Customer] }
    }

    pub fn admin<S: Into<String>>(username: S) -> Self {
        Self { sub: username.into(), email: None, roles: vec![Role::Admin] }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    pub fn has_roles(&self, required: &[Role]) -> bool {
        required.iter().all(|r| match r {
            // Every signed-in user is a customer
            Role::Customer => true,
            Role::Admin => self.is_admin(),
        })
    }
}

pub struct TokenIssuer {
    key: Hs256Key,
    time_options: TimeOptions,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let key = Hs256Key::new(config.jwt_secret.reveal().as_bytes());
        Self { key, time_options: TimeOptions::default(), lifetime: config.token_lifetime }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue_token(&self, claims: JwtClaims) -> Result<String, AuthError> {
        let claims = Claims::new(claims).set_duration_and_issuance(&self.time_options, self.lifetime);
        let header = Header::empty().with_token_type("JWT");
        Hs256.token(&header, &claims, &self.key).map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Checks the token's signature and expiry, returning the claims it carries.
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let untrusted = UntrustedToken::new(token).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let token: Token<JwtClaims> = Hs256
            .validator::<JwtClaims>(&self.key)
            .validate(&untrusted)
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;
        token.claims().validate_expiration(&self.time_options).map_err(|e| AuthError::ValidationError(e.to_string()))?;
        Ok(token.into_parts().1.custom)
    }
}

/// The admin login, compared in constant time.
#[derive(Clone)]
pub struct AdminCredentials {
    username: String,
    password: Secret<String>,
    key: [u8; 32],
}

impl AdminCredentials {
    pub fn new(config: &AuthConfig) -> Self {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self { username: config.admin_username.clone(), password: config.admin_password.clone(), key }
    }

    pub fn is_enabled(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    pub fn check(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if !self.is_enabled() {
            return Err(AuthError::AdminLoginDisabled);
        }
        let user_ok = self.matches(self.username.as_bytes(), username.as_bytes());
        let pass_ok = self.matches(self.password.reveal().as_bytes(), password.as_bytes());
        if user_ok & pass_ok {
            Ok(())
        } else {
            warn!("🔐️ Failed admin login attempt for '{username}'");
            Err(AuthError::InvalidCredentials)
        }
    }

    // Both sides are hashed first so the comparison does not leak the length of the secret.
    fn matches(&self, expected: &[u8], candidate: &[u8]) -> bool {
        let tag = match HmacSha256::new_from_slice(&self.key) {
            Ok(mut mac) => {
                mac.update(expected);
                mac.finalize().into_bytes()
            },
            Err(_) => return false,
        };
        match HmacSha256::new_from_slice(&self.key) {
            Ok(mut mac) => {
                mac.update(candidate);
                mac.verify_slice(&tag).is_ok()
            },
            Err(_) => false,
        }
    }
}

pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Fetches the caller's claims. The JWT middleware leaves them in the request extensions; outside its scope the bearer
/// header is validated directly.
pub fn claims_from_request(req: &HttpRequest) -> Result<JwtClaims, AuthError> {
    if let Some(claims) = req.extensions().get::<JwtClaims>() {
        return Ok(claims.clone());
    }
    let token = bearer_token(req).ok_or(AuthError::MissingToken)?;
    let issuer = req.app_data::<web::Data<TokenIssuer>>().ok_or_else(|| {
        error!("🔐️ No token issuer has been registered with the server");
        AuthError::ValidationError("Token validation is not available".into())
    })?;
    issuer.validate_token(token)
}

/// Claims for routes that serve guests and signed-in users alike. A token that is present but invalid is still an
/// error, so a customer with an expired session is not silently treated as a guest.
pub fn optional_claims(req: &HttpRequest) -> Result<Option<JwtClaims>, AuthError> {
    match claims_from_request(req) {
        Ok(claims) => Ok(Some(claims)),
        Err(AuthError::MissingToken) => Ok(None),
        Err(e) => Err(e),
    }
}

impl FromRequest for JwtClaims {
    type Error = crate::errors::ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from_request(req).map_err(Into::into))
    }
}
