use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::deletion::report::DeletionReport;
use crate::store::StoreError;

/// Error type for the account deletion workflow.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, DeletionError>`.
#[derive(Debug, Error)]
pub enum DeletionError {
    /// The privileged identity service key is missing. Nothing was mutated.
    #[error("identity admin credentials are not configured")]
    Unconfigured,

    #[error("{0}")]
    BadRequest(String),

    /// A read failed before any destructive step ran.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// One or more cleanup steps failed. The report lists, per organization,
    /// what was removed and what was not. Identity deletion was skipped so
    /// the caller can retry.
    #[error("account cleanup incomplete")]
    CleanupFailed { report: DeletionReport },

    /// Resource cleanup succeeded but the identity record could not be
    /// deleted: the user's data is gone while the account remains.
    #[error("identity deletion failed: {detail}")]
    IdentityFailed {
        detail: String,
        report: DeletionReport,
    },
}

impl IntoResponse for DeletionError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            DeletionError::Unconfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": "Account deletion service is not configured",
                    "details": "IDENTITY_SERVICE_KEY is not set",
                }),
            ),
            DeletionError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            DeletionError::Store(e) => {
                tracing::error!("Store error during account deletion: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "Failed to delete user account",
                        "details": e.to_string(),
                    }),
                )
            }
            DeletionError::CleanupFailed { report } => {
                tracing::error!(
                    "Account cleanup incomplete for user {}: {} organization(s) affected",
                    report.user_id,
                    report.failed_organizations()
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "Failed to delete user account",
                        "details": {
                            "message": "Some resources could not be removed; the identity record was kept so the request can be retried",
                            "report": report,
                        },
                    }),
                )
            }
            DeletionError::IdentityFailed { detail, report } => {
                tracing::error!(
                    "Identity deletion failed for user {} after resource cleanup: {detail}",
                    report.user_id
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "Failed to delete user account",
                        "details": {
                            "message": "Organization data was already removed but the identity record remains; manual remediation is required",
                            "identity_error": detail,
                            "report": report,
                        },
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
