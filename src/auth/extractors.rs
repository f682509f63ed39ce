use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts, Request},
    http::{header::CONTENT_TYPE, request::Parts},
    Form, Json,
};
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::{
        cookies::{bearer_token, read_cookie, ACCESS_COOKIE},
        jwt::{JwtKeys, TokenError},
    },
    error::AppError,
};

/// Authenticated user id, taken from a Bearer header or the `accessToken`
/// cookie.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| read_cookie(&parts.headers, ACCESS_COOKIE))
            .ok_or_else(|| AppError::Unauthorized("Unauthorized request".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_access(&token).map_err(|e| {
            warn!(error = %e, "access token rejected");
            match e {
                TokenError::Expired => AppError::Unauthorized("Access token has expired".into()),
                _ => AppError::Unauthorized("Invalid access token".into()),
            }
        })?;

        Ok(AuthUser(claims.sub))
    }
}

/// Request body given either as JSON or as an urlencoded form, picked by
/// `Content-Type`. Anything that is not a form is parsed as JSON.
pub struct JsonOrForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state).await?;
            Ok(JsonOrForm(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state).await?;
            Ok(JsonOrForm(value))
        }
    }
}
