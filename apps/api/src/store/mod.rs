//! Storage layer: trait seams over the relational store and the
//! identity-management service. The deletion workflow only sees these
//! traits, so it runs against Postgres in production and the in-memory
//! backend in tests.

pub mod identity;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::org::MembershipRow;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("identity API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Read and delete operations over the hiring resources.
///
/// Deletes are delete-if-exists: removing rows that are already absent
/// succeeds and reports zero rows affected, so an interrupted workflow can
/// be replayed safely.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// All memberships in which the user holds the `owner` role.
    async fn owner_memberships(&self, user_id: Uuid) -> Result<Vec<MembershipRow>, StoreError>;

    /// Number of active `owner` memberships in the organization held by
    /// anyone other than the given user.
    async fn count_other_active_owners(
        &self,
        organization_id: Uuid,
        excluding_user: Uuid,
    ) -> Result<u64, StoreError>;

    /// Identifiers of all job listings scoped to the organization.
    async fn job_listing_ids(&self, organization_id: Uuid) -> Result<Vec<Uuid>, StoreError>;

    async fn delete_candidates(&self, organization_id: Uuid) -> Result<u64, StoreError>;

    async fn delete_applications_for_listing(&self, job_id: Uuid) -> Result<u64, StoreError>;

    async fn delete_job_listings(&self, organization_id: Uuid) -> Result<u64, StoreError>;

    async fn delete_memberships_for_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<u64, StoreError>;

    async fn delete_organization(&self, organization_id: Uuid) -> Result<u64, StoreError>;

    /// Removes every remaining membership held by the user, across all
    /// organizations.
    async fn delete_memberships_for_user(&self, user_id: Uuid) -> Result<u64, StoreError>;
}

/// Identity-management operations that require the privileged service key.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Deletes the user's identity record. Deleting an unknown user is a
    /// no-op so replays of an interrupted workflow stay safe.
    async fn delete_user(&self, user_id: Uuid) -> Result<(), IdentityError>;
}
