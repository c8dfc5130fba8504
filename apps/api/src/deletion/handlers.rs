use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::deletion::report::DeletionReport;
use crate::errors::DeletionError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    /// Accepted as `userId` to match the web client's payload.
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteAccountResponse {
    pub message: String,
    pub report: DeletionReport,
}

/// POST /api/delete-account
pub async fn handle_delete_account(
    State(state): State<AppState>,
    Json(req): Json<DeleteAccountRequest>,
) -> Result<Json<DeleteAccountResponse>, DeletionError> {
    let user_id = req.user_id.unwrap_or_default();
    let report = state.deleter.delete_account(&user_id).await?;
    Ok(Json(DeleteAccountResponse {
        message: "Account deleted successfully".to_string(),
        report,
    }))
}
