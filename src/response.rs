use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Success envelope: `{statusCode, data, message, success}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: status.as_u16() < 400,
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_uses_camel_case_keys() {
        let json = serde_json::to_value(ApiResponse::ok(vec![1, 2], "done")).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert_eq!(json["message"], "done");
        assert_eq!(json["success"], true);
    }

    #[test]
    fn created_status_is_still_success() {
        let res = ApiResponse::new(StatusCode::CREATED, "x", "made");
        assert!(res.success);
        assert_eq!(res.status_code, 201);
    }
}
