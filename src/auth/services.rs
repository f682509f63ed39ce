use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::{
    auth::{
        dto::RegisterRequest,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::{UserStore, EMAIL_TAKEN},
        repo_types::{NewUser, User},
    },
    error::AppError,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static email regex");
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trimmed non-empty value of a required field.
pub(crate) fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("{field} is required"))),
    }
}

/// Validate, hash and insert a new user.
///
/// The lookup before the insert only produces a friendlier early exit; two
/// racing registrations are still told apart by the UNIQUE constraint on
/// `users.email`, which the store reports as a conflict.
pub async fn register_user(
    store: &dyn UserStore,
    input: RegisterRequest,
) -> Result<User, AppError> {
    let username = required(input.username, "username")?;
    let email = normalize_email(&required(input.email, "email")?);
    // Passwords are taken verbatim; only emptiness is checked.
    let password = match input.password {
        Some(p) if !p.is_empty() => p,
        _ => return Err(AppError::Validation("password is required".into())),
    };

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    if store.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict(EMAIL_TAKEN.into()));
    }

    let password_hash = hash_password(&password).context("hash password")?;
    let user = store
        .create(NewUser {
            username,
            email,
            password_hash,
        })
        .await?;
    Ok(user)
}

/// True iff `plain` is the password the user registered with.
pub fn verify_user_password(user: &User, plain: &str) -> Result<bool, AppError> {
    let ok = verify_password(plain, &user.password_hash).context("verify password hash")?;
    Ok(ok)
}

/// Look up by email and check the password. Unknown email and wrong password
/// produce the same error.
pub async fn authenticate(
    store: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let email = normalize_email(email);
    let Some(user) = store.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthorized("Invalid user credentials".into()));
    };

    if !verify_user_password(&user, password)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid user credentials".into()));
    }
    Ok(user)
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issue both tokens and store the refresh token on the user record.
/// Any failure here is internal; the caller must not emit cookies.
pub async fn establish_session(
    store: &dyn UserStore,
    keys: &JwtKeys,
    user: &User,
) -> Result<TokenPair, AppError> {
    const FAILED: &str = "Something went wrong while generating refresh and access token";

    let access_token = keys.sign_access(user).context(FAILED)?;
    let refresh_token = keys.sign_refresh(user.id).context(FAILED)?;

    store
        .set_refresh_token(user.id, &refresh_token)
        .await
        .context(FAILED)?;

    debug!(user_id = %user.id, "session established");
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}
