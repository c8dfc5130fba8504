#![allow(dead_code)]

//! In-memory store backends. The workflow tests run against these; the
//! production wiring always uses Postgres and the identity admin client.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::hiring::{CandidateRow, JobApplicationRow, JobListingRow};
use crate::models::org::{MembershipRow, OrganizationRow, ROLE_OWNER, STATUS_ACTIVE};
use crate::store::{IdentityError, IdentityStore, ResourceStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    organizations: Vec<OrganizationRow>,
    memberships: Vec<MembershipRow>,
    job_listings: Vec<JobListingRow>,
    job_applications: Vec<JobApplicationRow>,
    candidates: Vec<CandidateRow>,
}

/// In-memory `ResourceStore`. Records every operation in arrival order and
/// can be told to fail specific operations, either by name
/// (`"delete_candidates"`) or pinned to one argument
/// (`"delete_candidates:<uuid>"`). Injected failures happen before the
/// mutation, matching a remote write that never reached the store.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    fail_ops: Mutex<HashSet<String>>,
    op_log: Mutex<Vec<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_organization(&self, row: OrganizationRow) {
        self.tables().organizations.push(row);
    }

    pub fn seed_membership(&self, row: MembershipRow) {
        self.tables().memberships.push(row);
    }

    pub fn seed_job_listing(&self, row: JobListingRow) {
        self.tables().job_listings.push(row);
    }

    pub fn seed_job_application(&self, row: JobApplicationRow) {
        self.tables().job_applications.push(row);
    }

    pub fn seed_candidate(&self, row: CandidateRow) {
        self.tables().candidates.push(row);
    }

    /// Makes the named operation fail with an injected backend error.
    pub fn fail_on(&self, op: &str) {
        self.fail_ops
            .lock()
            .expect("store mutex poisoned")
            .insert(op.to_string());
    }

    /// Operations observed so far, in call order, as `"name:argument"` entries.
    pub fn operations(&self) -> Vec<String> {
        self.op_log.lock().expect("store mutex poisoned").clone()
    }

    pub fn organization_exists(&self, id: Uuid) -> bool {
        self.tables().organizations.iter().any(|o| o.id == id)
    }

    pub fn membership_count(&self) -> usize {
        self.tables().memberships.len()
    }

    pub fn membership_count_for_user(&self, user_id: Uuid) -> usize {
        self.tables()
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .count()
    }

    pub fn job_listing_count(&self) -> usize {
        self.tables().job_listings.len()
    }

    pub fn job_application_count(&self) -> usize {
        self.tables().job_applications.len()
    }

    pub fn candidate_count(&self) -> usize {
        self.tables().candidates.len()
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("store mutex poisoned")
    }

    fn record(&self, op: &str, arg: Uuid) -> Result<(), StoreError> {
        let entry = format!("{op}:{arg}");
        self.op_log
            .lock()
            .expect("store mutex poisoned")
            .push(entry.clone());
        let fails = self.fail_ops.lock().expect("store mutex poisoned");
        if fails.contains(op) || fails.contains(&entry) {
            return Err(StoreError::Backend(format!("injected failure: {op}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn owner_memberships(&self, user_id: Uuid) -> Result<Vec<MembershipRow>, StoreError> {
        self.record("owner_memberships", user_id)?;
        Ok(self
            .tables()
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id && m.role == ROLE_OWNER)
            .cloned()
            .collect())
    }

    async fn count_other_active_owners(
        &self,
        organization_id: Uuid,
        excluding_user: Uuid,
    ) -> Result<u64, StoreError> {
        self.record("count_other_active_owners", organization_id)?;
        Ok(self
            .tables()
            .memberships
            .iter()
            .filter(|m| {
                m.organization_id == organization_id
                    && m.user_id != excluding_user
                    && m.role == ROLE_OWNER
                    && m.status == STATUS_ACTIVE
            })
            .count() as u64)
    }

    async fn job_listing_ids(&self, organization_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        self.record("job_listing_ids", organization_id)?;
        Ok(self
            .tables()
            .job_listings
            .iter()
            .filter(|l| l.organization_id == organization_id)
            .map(|l| l.id)
            .collect())
    }

    async fn delete_candidates(&self, organization_id: Uuid) -> Result<u64, StoreError> {
        self.record("delete_candidates", organization_id)?;
        let mut tables = self.tables();
        let before = tables.candidates.len();
        tables
            .candidates
            .retain(|c| c.organization_id != organization_id);
        Ok((before - tables.candidates.len()) as u64)
    }

    async fn delete_applications_for_listing(&self, job_id: Uuid) -> Result<u64, StoreError> {
        self.record("delete_applications_for_listing", job_id)?;
        let mut tables = self.tables();
        let before = tables.job_applications.len();
        tables.job_applications.retain(|a| a.job_id != job_id);
        Ok((before - tables.job_applications.len()) as u64)
    }

    async fn delete_job_listings(&self, organization_id: Uuid) -> Result<u64, StoreError> {
        self.record("delete_job_listings", organization_id)?;
        let mut tables = self.tables();
        let before = tables.job_listings.len();
        tables
            .job_listings
            .retain(|l| l.organization_id != organization_id);
        Ok((before - tables.job_listings.len()) as u64)
    }

    async fn delete_memberships_for_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<u64, StoreError> {
        self.record("delete_memberships_for_organization", organization_id)?;
        let mut tables = self.tables();
        let before = tables.memberships.len();
        tables
            .memberships
            .retain(|m| m.organization_id != organization_id);
        Ok((before - tables.memberships.len()) as u64)
    }

    async fn delete_organization(&self, organization_id: Uuid) -> Result<u64, StoreError> {
        self.record("delete_organization", organization_id)?;
        let mut tables = self.tables();
        let before = tables.organizations.len();
        tables.organizations.retain(|o| o.id != organization_id);
        Ok((before - tables.organizations.len()) as u64)
    }

    async fn delete_memberships_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        self.record("delete_memberships_for_user", user_id)?;
        let mut tables = self.tables();
        let before = tables.memberships.len();
        tables.memberships.retain(|m| m.user_id != user_id);
        Ok((before - tables.memberships.len()) as u64)
    }
}

/// In-memory `IdentityStore` that records deletions instead of calling the
/// admin API.
#[derive(Default)]
pub struct InMemoryIdentity {
    deleted: Mutex<Vec<Uuid>>,
    fail: AtomicBool,
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn deleted_users(&self) -> Vec<Uuid> {
        self.deleted.lock().expect("identity mutex poisoned").clone()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentity {
    async fn delete_user(&self, user_id: Uuid) -> Result<(), IdentityError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(IdentityError::Api {
                status: 500,
                message: "injected identity failure".to_string(),
            });
        }
        self.deleted
            .lock()
            .expect("identity mutex poisoned")
            .push(user_id);
        Ok(())
    }
}
