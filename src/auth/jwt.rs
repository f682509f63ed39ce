use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::{
        claims::{Claims, TokenKind},
        repo_types::User,
    },
    config::JwtConfig,
    error::AppError,
    state::AppState,
};

/// Why a token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token signature does not match")]
    InvalidSignature,

    #[error("token is malformed")]
    Malformed,

    #[error("expected a {expected:?} token")]
    WrongKind { expected: TokenKind },

    #[error("token is invalid: {0}")]
    Invalid(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => TokenError::Malformed,
            _ => TokenError::Invalid(e.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(msg) => AppError::Internal(anyhow::anyhow!(msg)),
            TokenError::Expired => AppError::Unauthorized("Token has expired".into()),
            _ => AppError::Unauthorized("Invalid token".into()),
        }
    }
}

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Signing material for both token kinds. Access and refresh tokens are
/// signed with separate secrets.
#[derive(Clone)]
pub struct JwtKeys {
    access: KeyPair,
    refresh: KeyPair,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

fn ttl_from_minutes(minutes: i64) -> Duration {
    Duration::from_secs(minutes.max(1).unsigned_abs().saturating_mul(60))
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            access: KeyPair::from_secret(&cfg.access_secret),
            refresh: KeyPair::from_secret(&cfg.refresh_secret),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: ttl_from_minutes(cfg.ttl_minutes),
            refresh_ttl: ttl_from_minutes(cfg.refresh_ttl_minutes),
        }
    }

    fn keys_for(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn claims_for(&self, user_id: Uuid, kind: TokenKind) -> Result<Claims, TokenError> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(TimeDuration::seconds(secs)))
            .ok_or_else(|| TokenError::Signing(format!("{kind:?} token lifetime out of range")))?;
        Ok(Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
            jti: Uuid::new_v4(),
            email: None,
            username: None,
        })
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, TokenError> {
        let key = &self.keys_for(claims.kind).encoding;
        let token = encode(&Header::default(), claims, key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        debug!(user_id = %claims.sub, kind = ?claims.kind, "jwt signed");
        Ok(token)
    }

    /// Short-lived token carrying the user's identity.
    pub fn sign_access(&self, user: &User) -> Result<String, TokenError> {
        let mut claims = self.claims_for(user.id, TokenKind::Access)?;
        claims.email = Some(user.email.clone());
        claims.username = Some(user.username.clone());
        self.encode_claims(&claims)
    }

    /// Long-lived token used only to mint new access tokens.
    pub fn sign_refresh(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.encode_claims(&self.claims_for(user_id, TokenKind::Refresh)?)
    }

    fn verify_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.keys_for(expected).decoding, &validation)?;
        if data.claims.kind != expected {
            return Err(TokenError::WrongKind { expected });
        }
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_kind(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_kind(token, TokenKind::Refresh)
    }
}
