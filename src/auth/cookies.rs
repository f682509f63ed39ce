//! Session cookies for the token pair.
//!
//! Both cookies are `HttpOnly` and `Secure` and carry no `Max-Age`, so the
//! browser drops them at the end of the session.

use anyhow::Context;
use axum::http::{
    header::{AUTHORIZATION, COOKIE, SET_COOKIE},
    HeaderMap, HeaderName, HeaderValue,
};

use crate::{auth::services::TokenPair, error::AppError};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

pub fn session_cookie(name: &str, value: &str) -> Result<HeaderValue, AppError> {
    let cookie = format!("{name}={value}; Path=/; HttpOnly; Secure");
    let header = HeaderValue::from_str(&cookie).context("build session cookie")?;
    Ok(header)
}

/// `Set-Cookie` headers for both tokens, access first.
pub fn session_cookies(pair: &TokenPair) -> Result<[(HeaderName, HeaderValue); 2], AppError> {
    Ok([
        (SET_COOKIE, session_cookie(ACCESS_COOKIE, &pair.access_token)?),
        (SET_COOKIE, session_cookie(REFRESH_COOKIE, &pair.refresh_token)?),
    ])
}

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let Some((key, val)) = pair.trim().split_once('=') else {
                continue;
            };
            if key.trim() == name && !val.trim().is_empty() {
                return Some(val.trim().to_string());
            }
        }
    }
    None
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
