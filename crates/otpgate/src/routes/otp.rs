//! Challenge issuance and verification endpoints.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use otpgate_common::{IssueResponse, OtpError, VerifyResponse};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct IssueRequest {
    /// Phone number to challenge
    identifier: String,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    identifier: String,
    /// Code as received by the user
    code: String,
}

/// Error body for rejected requests
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// `OtpError` rendered as an HTTP response
pub struct ApiError(OtpError);

impl From<OtpError> for ApiError {
    fn from(e: OtpError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Internal details stay in the log
        let message = match &self.0 {
            OtpError::InvalidIdentifier(_) => self.0.to_string(),
            other => {
                tracing::error!(error = %other, "Request failed");
                "Unable to process request".to_string()
            }
        };

        (
            status,
            Json(ErrorBody {
                error: self.0.code(),
                message,
            }),
        )
            .into_response()
    }
}

/// Issue a new challenge for an identifier
pub async fn issue_challenge(
    State(state): State<AppState>,
    Json(payload): Json<IssueRequest>,
) -> Result<Json<IssueResponse>, ApiError> {
    Ok(Json(state.otp.issue_challenge(&payload.identifier).await?))
}

/// Replace the current challenge with a fresh code
pub async fn resend_challenge(
    State(state): State<AppState>,
    Json(payload): Json<IssueRequest>,
) -> Result<Json<IssueResponse>, ApiError> {
    Ok(Json(state.otp.resend_challenge(&payload.identifier).await?))
}

/// Verify a submitted code
///
/// Every verification outcome is a 200; the body says whether it passed.
pub async fn verify_challenge(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let response = state
        .otp
        .verify_challenge(&payload.identifier, &payload.code)
        .await?;

    Ok(Json(response))
}
