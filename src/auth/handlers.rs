use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::{header::SET_COOKIE, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        cookies::{read_cookie, session_cookie, session_cookies, ACCESS_COOKIE, REFRESH_COOKIE},
        dto::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest},
        extractors::{AuthUser, JsonOrForm},
        jwt::JwtKeys,
        repo_types::User,
        services::{authenticate, establish_session, register_user},
    },
    error::AppError,
    response::ApiResponse,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/login", post(login))
        .route("/user/refresh-token", post(refresh_access_token))
        .route("/user/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonOrForm(payload): JsonOrForm<RegisterRequest>,
) -> Result<ApiResponse<User>, AppError> {
    let user = register_user(state.users.as_ref(), payload).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(ApiResponse::ok(user, "User created successfully"))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonOrForm(payload): JsonOrForm<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Err(AppError::Validation("All fields are required".into()));
    };
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::Validation("All fields are required".into()));
    }

    let user = authenticate(state.users.as_ref(), &email, &password).await?;

    let keys = JwtKeys::from_ref(&state);
    let tokens = establish_session(state.users.as_ref(), &keys, &user).await?;
    let cookies = session_cookies(&tokens)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((
        AppendHeaders(cookies),
        ApiResponse::ok(
            LoginResponse {
                user,
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

/// Mint a new access token from the refresh token stored at last login.
/// The stored refresh token itself is left unchanged.
#[instrument(skip(state, headers, body))]
pub async fn refresh_access_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let from_body = match body {
        Ok(Json(b)) => b.refresh_token,
        // Cookie-only requests send no JSON body.
        Err(JsonRejection::MissingJsonContentType(_)) => None,
        Err(e) => return Err(e.into()),
    };
    let presented = read_cookie(&headers, REFRESH_COOKIE)
        .or(from_body)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Unauthorized request".into()))?;

    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&presented).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        e
    })?;

    let Some(user) = state.users.find_by_id(claims.sub).await? else {
        warn!(user_id = %claims.sub, "refresh token for unknown user");
        return Err(AppError::Unauthorized("Invalid refresh token".into()));
    };

    if user.refresh_token.as_deref() != Some(presented.as_str()) {
        warn!(user_id = %user.id, "refresh token does not match the stored one");
        return Err(AppError::Unauthorized("Refresh token is expired or used".into()));
    }

    let access_token = keys.sign_access(&user)?;
    let cookie = session_cookie(ACCESS_COOKIE, &access_token)?;

    info!(user_id = %user.id, "access token refreshed");
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        ApiResponse::ok(
            RefreshResponse {
                access_token,
                refresh_token: presented,
            },
            "Access token refreshed",
        ),
    ))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<User>, AppError> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    Ok(ApiResponse::ok(user, "Current user fetched successfully"))
}
