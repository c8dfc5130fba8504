use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::org::{MembershipRow, ROLE_OWNER, STATUS_ACTIVE};
use crate::store::{ResourceStore, StoreError};

/// Postgres-backed resource store used in production.
pub struct PgResourceStore {
    pool: PgPool,
}

impl PgResourceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResourceStore for PgResourceStore {
    async fn owner_memberships(&self, user_id: Uuid) -> Result<Vec<MembershipRow>, StoreError> {
        Ok(sqlx::query_as::<_, MembershipRow>(
            "SELECT * FROM organization_memberships WHERE user_id = $1 AND role = $2",
        )
        .bind(user_id)
        .bind(ROLE_OWNER)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn count_other_active_owners(
        &self,
        organization_id: Uuid,
        excluding_user: Uuid,
    ) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM organization_memberships
            WHERE organization_id = $1 AND user_id <> $2 AND role = $3 AND status = $4
            "#,
        )
        .bind(organization_id)
        .bind(excluding_user)
        .bind(ROLE_OWNER)
        .bind(STATUS_ACTIVE)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn job_listing_ids(&self, organization_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM job_listings WHERE organization_id = $1")
                .bind(organization_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }

    async fn delete_candidates(&self, organization_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM candidates WHERE organization_id = $1")
            .bind(organization_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_applications_for_listing(&self, job_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM job_applications WHERE job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_job_listings(&self, organization_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM job_listings WHERE organization_id = $1")
            .bind(organization_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_memberships_for_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<u64, StoreError> {
        let result =
            sqlx::query("DELETE FROM organization_memberships WHERE organization_id = $1")
                .bind(organization_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn delete_organization(&self, organization_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(organization_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_memberships_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM organization_memberships WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
