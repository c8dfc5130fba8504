//! Identity admin client: the single point of entry for calls to the
//! identity-management service that require the privileged service key.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::{IdentityError, IdentityStore};

const MAX_RETRIES: u32 = 3;

/// HTTP client for the identity-management admin API.
/// Retries transient failures (429 and 5xx) with exponential backoff.
pub struct IdentityAdminClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl IdentityAdminClient {
    pub fn new(base_url: String, service_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        }
    }

    fn user_url(&self, user_id: Uuid) -> String {
        format!("{}/admin/users/{}", self.base_url, user_id)
    }
}

#[async_trait]
impl IdentityStore for IdentityAdminClient {
    async fn delete_user(&self, user_id: Uuid) -> Result<(), IdentityError> {
        let url = self.user_url(user_id);
        let mut last_error: Option<IdentityError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Identity deletion attempt {attempt} failed, retrying after {}ms...",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .delete(&url)
                .bearer_auth(&self.service_key)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(IdentityError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            // An already-deleted identity is a successful outcome for replays.
            if status == StatusCode::NOT_FOUND {
                debug!("Identity record for user {user_id} was already absent");
                return Ok(());
            }

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Identity API returned {status}: {body}");
                last_error = Some(IdentityError::Api {
                    status: status.as_u16(),
                    message: extract_error_message(&body),
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(IdentityError::Api {
                    status: status.as_u16(),
                    message: extract_error_message(&body),
                });
            }

            debug!("Identity record for user {user_id} deleted");
            return Ok(());
        }

        Err(last_error.unwrap_or(IdentityError::Api {
            status: 0,
            message: format!("gave up after {MAX_RETRIES} attempts"),
        }))
    }
}

/// Pulls a human-readable message out of an identity API error body, falling
/// back to the raw body when it is not the expected JSON shape.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("msg")
                .or_else(|| v.get("message"))
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}
