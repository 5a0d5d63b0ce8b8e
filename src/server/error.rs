//! HTTPエラー応答
//!
//! エラーはすべて`{"error": message}`形式のJSONで返す。

use serde::Serialize;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Rejection, Reply};

use crate::errors::VoiceupError;

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// JSONエラー応答を作成
pub fn json_error(status: StatusCode, message: &str) -> Response {
    warp::reply::with_status(warp::reply::json(&ErrorBody { error: message }), status)
        .into_response()
}

/// エラー種別に対応するHTTPステータス
pub fn status_for(error: &VoiceupError) -> StatusCode {
    match error {
        VoiceupError::Validation(_) => StatusCode::BAD_REQUEST,
        VoiceupError::NotFound { .. } | VoiceupError::NoData => StatusCode::NOT_FOUND,
        VoiceupError::Classifier(_) => StatusCode::SERVICE_UNAVAILABLE,
        VoiceupError::Database(_)
        | VoiceupError::Configuration(_)
        | VoiceupError::Json(_)
        | VoiceupError::General(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// サービスエラーをJSON応答に変換
pub fn error_reply(error: &VoiceupError) -> Response {
    let status = status_for(error);
    if error.is_client_error() {
        tracing::debug!(status = status.as_u16(), "Request rejected: {}", error);
    } else {
        tracing::error!(status = status.as_u16(), "❌ Request failed: {}", error);
    }
    json_error(status, &error.to_string())
}

/// warpのリジェクションをJSON応答に変換
pub async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", e))
    } else if rejection.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::BAD_REQUEST,
            "Invalid JSON or missing Content-Type header".to_string(),
        )
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_string())
    } else if rejection.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length required".to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        tracing::error!("Unhandled rejection: {:?}", rejection);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(json_error(status, &message))
}
