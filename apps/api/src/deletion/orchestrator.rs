//! Account deletion orchestrator.
//!
//! Deleting an account removes, in order: every organization the user is the
//! sole active owner of (candidates, then job applications, then job
//! listings, then memberships, then the organization row), the user's
//! remaining memberships, and finally the identity record. Each remote write
//! is independent; the store offers no transaction here and nothing is
//! rolled back. A failed step therefore surfaces a report of exactly what
//! was and was not removed, and the identity record is kept so the caller
//! can retry; every delete is a no-op for rows that are already gone.
//!
//! Concurrent deletions are not serialized. Two co-owners deleting at the
//! same time can each observe the other as a surviving owner and leave the
//! organization with no owner at all.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::deletion::report::{
    DeletedCounts, DeletionReport, DeletionStage, OrganizationOutcome, OrganizationReport,
};
use crate::errors::DeletionError;
use crate::store::{IdentityStore, ResourceStore, StoreError};

/// Orchestrates the cascading account-deletion workflow.
pub struct AccountDeleter {
    store: Arc<dyn ResourceStore>,
    /// Absent when the privileged service key is not configured; every
    /// deletion request then fails fast without touching data.
    identity: Option<Arc<dyn IdentityStore>>,
}

impl AccountDeleter {
    pub fn new(store: Arc<dyn ResourceStore>, identity: Option<Arc<dyn IdentityStore>>) -> Self {
        Self { store, identity }
    }

    /// Deletes the organizations the user solely owns, the user's remaining
    /// memberships, and the identity record.
    ///
    /// The caller is responsible for having authenticated the request; the
    /// identifier is taken at face value here.
    pub async fn delete_account(&self, user_id: &str) -> Result<DeletionReport, DeletionError> {
        let identity = self.identity.as_ref().ok_or(DeletionError::Unconfigured)?;
        let user_id = parse_user_id(user_id)?;

        let owned = self.store.owner_memberships(user_id).await?;
        info!(
            "Deleting account {user_id}: owner of {} organization(s)",
            owned.len()
        );

        let mut report = DeletionReport::new(user_id);

        for membership in &owned {
            let organization_id = membership.organization_id;
            let outcome = match self
                .store
                .count_other_active_owners(organization_id, user_id)
                .await
            {
                Ok(0) => self.cascade_delete_organization(organization_id).await,
                Ok(other_owners) => {
                    info!(
                        "Organization {organization_id} retained: {other_owners} other active owner(s)"
                    );
                    OrganizationOutcome::Retained { other_owners }
                }
                Err(e) => {
                    warn!("Owner check failed for organization {organization_id}: {e}");
                    OrganizationOutcome::Failed {
                        stage: DeletionStage::OwnerCheck,
                        error: e.to_string(),
                        removed: DeletedCounts::default(),
                    }
                }
            };
            report.organizations.push(OrganizationReport {
                organization_id,
                outcome,
            });
        }

        if report.has_failures() {
            // Leave the remaining memberships and the identity record alone:
            // the failed organizations still need their owner on retry.
            return Err(DeletionError::CleanupFailed { report });
        }

        // Memberships in organizations that survived, or that the user never
        // owned.
        match self.store.delete_memberships_for_user(user_id).await {
            Ok(removed) => report.memberships_removed = removed,
            Err(e) => {
                warn!("Membership cleanup failed for user {user_id}: {e}");
                report.membership_error = Some(e.to_string());
                return Err(DeletionError::CleanupFailed { report });
            }
        }

        if let Err(e) = identity.delete_user(user_id).await {
            error!("Identity deletion failed for user {user_id}: {e}");
            return Err(DeletionError::IdentityFailed {
                detail: e.to_string(),
                report,
            });
        }
        report.identity_deleted = true;

        info!(
            "Account {user_id} deleted: {} organization(s) removed, {} membership(s) cleaned up",
            report
                .organizations
                .iter()
                .filter(|o| matches!(o.outcome, OrganizationOutcome::Deleted { .. }))
                .count(),
            report.memberships_removed
        );
        Ok(report)
    }

    /// Removes everything scoped to one organization, leaves first:
    /// candidates, job applications per listing, job listings, memberships,
    /// then the organization row. Stops at the first failed step and reports
    /// what had already been removed.
    async fn cascade_delete_organization(&self, organization_id: Uuid) -> OrganizationOutcome {
        let mut removed = DeletedCounts::default();

        match self.store.delete_candidates(organization_id).await {
            Ok(n) => removed.candidates = n,
            Err(e) => {
                return cascade_failed(organization_id, DeletionStage::Candidates, e, removed)
            }
        }

        // Applications reference their listing, so they go first.
        let listing_ids = match self.store.job_listing_ids(organization_id).await {
            Ok(ids) => ids,
            Err(e) => {
                return cascade_failed(organization_id, DeletionStage::JobApplications, e, removed)
            }
        };
        for job_id in listing_ids {
            match self.store.delete_applications_for_listing(job_id).await {
                Ok(n) => removed.job_applications += n,
                Err(e) => {
                    return cascade_failed(
                        organization_id,
                        DeletionStage::JobApplications,
                        e,
                        removed,
                    )
                }
            }
        }

        match self.store.delete_job_listings(organization_id).await {
            Ok(n) => removed.job_listings = n,
            Err(e) => {
                return cascade_failed(organization_id, DeletionStage::JobListings, e, removed)
            }
        }

        match self
            .store
            .delete_memberships_for_organization(organization_id)
            .await
        {
            Ok(n) => removed.memberships = n,
            Err(e) => {
                return cascade_failed(organization_id, DeletionStage::Memberships, e, removed)
            }
        }

        match self.store.delete_organization(organization_id).await {
            Ok(_) => {
                info!(
                    "Organization {organization_id} deleted: {} candidate(s), {} application(s), {} listing(s), {} membership(s)",
                    removed.candidates,
                    removed.job_applications,
                    removed.job_listings,
                    removed.memberships
                );
                OrganizationOutcome::Deleted { removed }
            }
            Err(e) => cascade_failed(organization_id, DeletionStage::Organization, e, removed),
        }
    }
}

fn cascade_failed(
    organization_id: Uuid,
    stage: DeletionStage,
    error: StoreError,
    removed: DeletedCounts,
) -> OrganizationOutcome {
    warn!("Cascade for organization {organization_id} stopped at {stage:?}: {error}");
    OrganizationOutcome::Failed {
        stage,
        error: error.to_string(),
        removed,
    }
}

fn parse_user_id(raw: &str) -> Result<Uuid, DeletionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DeletionError::BadRequest("User ID is required".to_string()));
    }
    Uuid::parse_str(trimmed)
        .map_err(|_| DeletionError::BadRequest("User ID must be a valid UUID".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::hiring::{CandidateRow, JobApplicationRow, JobListingRow};
    use crate::models::org::{MembershipRow, OrganizationRow};
    use crate::store::memory::{InMemoryIdentity, InMemoryStore};

    fn setup() -> (Arc<InMemoryStore>, Arc<InMemoryIdentity>, AccountDeleter) {
        let store = Arc::new(InMemoryStore::new());
        let identity = Arc::new(InMemoryIdentity::new());
        let deleter = AccountDeleter::new(
            store.clone(),
            Some(identity.clone() as Arc<dyn IdentityStore>),
        );
        (store, identity, deleter)
    }

    fn org(id: Uuid) -> OrganizationRow {
        OrganizationRow {
            id,
            name: "Acme Hiring".to_string(),
            created_at: Utc::now(),
        }
    }

    fn membership(organization_id: Uuid, user_id: Uuid, role: &str, status: &str) -> MembershipRow {
        MembershipRow {
            id: Uuid::new_v4(),
            organization_id,
            user_id,
            role: role.to_string(),
            status: status.to_string(),
            created_at: Utc::now(),
        }
    }

    fn listing(id: Uuid, organization_id: Uuid) -> JobListingRow {
        JobListingRow {
            id,
            organization_id,
            title: "Backend Engineer".to_string(),
            created_at: Utc::now(),
        }
    }

    fn application(job_id: Uuid) -> JobApplicationRow {
        JobApplicationRow {
            id: Uuid::new_v4(),
            job_id,
            candidate_id: Uuid::new_v4(),
            status: "pending".to_string(),
            created_at: Utc::now(),
        }
    }

    fn candidate(organization_id: Uuid) -> CandidateRow {
        CandidateRow {
            id: Uuid::new_v4(),
            organization_id,
            full_name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            created_at: Utc::now(),
        }
    }

    /// Organization solely owned by `user_id`: one extra member, two
    /// listings (one with 3 applications), 5 candidates.
    fn seed_sole_owner_org(store: &InMemoryStore, user_id: Uuid) -> Uuid {
        let org_id = Uuid::new_v4();
        store.seed_organization(org(org_id));
        store.seed_membership(membership(org_id, user_id, "owner", "active"));
        store.seed_membership(membership(org_id, Uuid::new_v4(), "member", "active"));
        let listing_a = Uuid::new_v4();
        let listing_b = Uuid::new_v4();
        store.seed_job_listing(listing(listing_a, org_id));
        store.seed_job_listing(listing(listing_b, org_id));
        for _ in 0..3 {
            store.seed_job_application(application(listing_a));
        }
        for _ in 0..5 {
            store.seed_candidate(candidate(org_id));
        }
        org_id
    }

    fn positions(ops: &[String], name: &str) -> Vec<usize> {
        let prefix = format!("{name}:");
        ops.iter()
            .enumerate()
            .filter(|(_, op)| op.starts_with(&prefix))
            .map(|(i, _)| i)
            .collect()
    }

    #[tokio::test]
    async fn test_sole_owner_full_cascade() {
        let (store, identity, deleter) = setup();
        let user_id = Uuid::new_v4();
        let org_id = seed_sole_owner_org(&store, user_id);

        let report = deleter.delete_account(&user_id.to_string()).await.unwrap();

        assert_eq!(report.organizations.len(), 1);
        assert_eq!(report.organizations[0].organization_id, org_id);
        assert_eq!(
            report.organizations[0].outcome,
            OrganizationOutcome::Deleted {
                removed: DeletedCounts {
                    candidates: 5,
                    job_applications: 3,
                    job_listings: 2,
                    memberships: 2,
                }
            }
        );
        assert_eq!(report.memberships_removed, 0);
        assert!(report.identity_deleted);

        assert!(!store.organization_exists(org_id));
        assert_eq!(store.candidate_count(), 0);
        assert_eq!(store.job_application_count(), 0);
        assert_eq!(store.job_listing_count(), 0);
        assert_eq!(store.membership_count(), 0);
        assert_eq!(identity.deleted_users(), vec![user_id]);
    }

    #[tokio::test]
    async fn test_co_owner_organization_retained() {
        let (store, identity, deleter) = setup();
        let user_x = Uuid::new_v4();
        let user_y = Uuid::new_v4();
        let org_id = Uuid::new_v4();
        store.seed_organization(org(org_id));
        store.seed_membership(membership(org_id, user_x, "owner", "active"));
        store.seed_membership(membership(org_id, user_y, "owner", "active"));
        store.seed_job_listing(listing(Uuid::new_v4(), org_id));
        store.seed_candidate(candidate(org_id));

        let report = deleter.delete_account(&user_x.to_string()).await.unwrap();

        assert_eq!(
            report.organizations[0].outcome,
            OrganizationOutcome::Retained { other_owners: 1 }
        );
        assert_eq!(report.memberships_removed, 1);
        assert!(report.identity_deleted);

        assert!(store.organization_exists(org_id));
        assert_eq!(store.job_listing_count(), 1);
        assert_eq!(store.candidate_count(), 1);
        assert_eq!(store.membership_count_for_user(user_y), 1);
        assert_eq!(store.membership_count_for_user(user_x), 0);
        assert_eq!(identity.deleted_users(), vec![user_x]);
    }

    #[tokio::test]
    async fn test_identity_failure_after_cleanup_is_surfaced() {
        let (store, identity, deleter) = setup();
        let user_id = Uuid::new_v4();
        let org_id = seed_sole_owner_org(&store, user_id);
        identity.set_fail(true);

        let err = deleter
            .delete_account(&user_id.to_string())
            .await
            .unwrap_err();

        match err {
            DeletionError::IdentityFailed { detail, report } => {
                assert!(detail.contains("injected identity failure"));
                assert!(!report.identity_deleted);
                assert!(matches!(
                    report.organizations[0].outcome,
                    OrganizationOutcome::Deleted { .. }
                ));
            }
            other => panic!("expected IdentityFailed, got {other:?}"),
        }

        // No rollback: the organization data is gone while the account remains.
        assert!(!store.organization_exists(org_id));
        assert_eq!(store.candidate_count(), 0);
        assert!(identity.deleted_users().is_empty());
    }

    #[tokio::test]
    async fn test_second_deletion_is_clean_noop() {
        let (store, _identity, deleter) = setup();
        let user_id = Uuid::new_v4();
        seed_sole_owner_org(&store, user_id);

        deleter.delete_account(&user_id.to_string()).await.unwrap();
        let report = deleter.delete_account(&user_id.to_string()).await.unwrap();

        assert!(report.organizations.is_empty());
        assert_eq!(report.memberships_removed, 0);
        assert!(report.identity_deleted);
    }

    #[tokio::test]
    async fn test_missing_service_key_fails_fast() {
        let store = Arc::new(InMemoryStore::new());
        let deleter = AccountDeleter::new(store.clone(), None);
        let user_id = Uuid::new_v4();
        seed_sole_owner_org(&store, user_id);

        let err = deleter
            .delete_account(&user_id.to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, DeletionError::Unconfigured));
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn test_empty_user_id_rejected_without_touching_data() {
        let (store, identity, deleter) = setup();

        for raw in ["", "   "] {
            let err = deleter.delete_account(raw).await.unwrap_err();
            match err {
                DeletionError::BadRequest(msg) => assert_eq!(msg, "User ID is required"),
                other => panic!("expected BadRequest, got {other:?}"),
            }
        }
        assert!(store.operations().is_empty());
        assert!(identity.deleted_users().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_user_id_rejected() {
        let (store, _identity, deleter) = setup();

        let err = deleter.delete_account("not-a-uuid").await.unwrap_err();
        assert!(matches!(err, DeletionError::BadRequest(_)));
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn test_cascade_order_leaves_first() {
        let (store, _identity, deleter) = setup();
        let user_id = Uuid::new_v4();
        seed_sole_owner_org(&store, user_id);

        deleter.delete_account(&user_id.to_string()).await.unwrap();

        let ops = store.operations();
        let candidates = positions(&ops, "delete_candidates");
        let applications = positions(&ops, "delete_applications_for_listing");
        let listings = positions(&ops, "delete_job_listings");
        let org_memberships = positions(&ops, "delete_memberships_for_organization");
        let organization = positions(&ops, "delete_organization");
        let user_memberships = positions(&ops, "delete_memberships_for_user");

        assert_eq!(candidates.len(), 1);
        assert_eq!(applications.len(), 2); // one per listing
        assert_eq!(listings.len(), 1);
        assert_eq!(organization.len(), 1);

        for app in &applications {
            assert!(candidates[0] < *app);
            assert!(*app < listings[0]);
        }
        assert!(listings[0] < org_memberships[0]);
        assert!(org_memberships[0] < organization[0]);
        assert!(organization[0] < user_memberships[0]);
    }

    #[tokio::test]
    async fn test_owner_check_failure_keeps_everything() {
        let (store, identity, deleter) = setup();
        let user_id = Uuid::new_v4();
        let org_id = seed_sole_owner_org(&store, user_id);
        store.fail_on("count_other_active_owners");

        let err = deleter
            .delete_account(&user_id.to_string())
            .await
            .unwrap_err();

        match err {
            DeletionError::CleanupFailed { report } => {
                assert_eq!(report.failed_organizations(), 1);
                assert!(matches!(
                    report.organizations[0].outcome,
                    OrganizationOutcome::Failed {
                        stage: DeletionStage::OwnerCheck,
                        ..
                    }
                ));
            }
            other => panic!("expected CleanupFailed, got {other:?}"),
        }

        assert!(store.organization_exists(org_id));
        assert_eq!(store.candidate_count(), 5);
        assert!(!store
            .operations()
            .iter()
            .any(|op| op.starts_with("delete_")));
        assert!(identity.deleted_users().is_empty());
    }

    #[tokio::test]
    async fn test_mid_cascade_failure_stops_and_reports_partial_counts() {
        let (store, identity, deleter) = setup();
        let user_id = Uuid::new_v4();
        let org_id = seed_sole_owner_org(&store, user_id);
        store.fail_on("delete_job_listings");

        let err = deleter
            .delete_account(&user_id.to_string())
            .await
            .unwrap_err();

        match err {
            DeletionError::CleanupFailed { report } => match &report.organizations[0].outcome {
                OrganizationOutcome::Failed {
                    stage,
                    removed,
                    ..
                } => {
                    assert_eq!(*stage, DeletionStage::JobListings);
                    assert_eq!(removed.candidates, 5);
                    assert_eq!(removed.job_applications, 3);
                    assert_eq!(removed.job_listings, 0);
                }
                other => panic!("expected Failed outcome, got {other:?}"),
            },
            other => panic!("expected CleanupFailed, got {other:?}"),
        }

        // The cascade stopped: the organization, its memberships, and the
        // listings survive, and neither user-wide membership cleanup nor
        // identity deletion ran.
        assert!(store.organization_exists(org_id));
        assert_eq!(store.job_listing_count(), 2);
        assert_eq!(store.membership_count(), 2);
        assert_eq!(store.candidate_count(), 0); // partial, no rollback
        assert!(positions(&store.operations(), "delete_memberships_for_user").is_empty());
        assert!(identity.deleted_users().is_empty());
    }

    #[tokio::test]
    async fn test_membership_cleanup_failure_keeps_identity() {
        let (store, identity, deleter) = setup();
        let user_id = Uuid::new_v4();
        let org_id = Uuid::new_v4();
        store.seed_organization(org(org_id));
        store.seed_membership(membership(org_id, user_id, "owner", "active"));
        store.seed_membership(membership(org_id, Uuid::new_v4(), "owner", "active"));
        store.fail_on("delete_memberships_for_user");

        let err = deleter
            .delete_account(&user_id.to_string())
            .await
            .unwrap_err();

        match err {
            DeletionError::CleanupFailed { report } => {
                assert!(report.membership_error.is_some());
                assert_eq!(report.failed_organizations(), 0);
            }
            other => panic!("expected CleanupFailed, got {other:?}"),
        }
        assert!(identity.deleted_users().is_empty());
    }

    #[tokio::test]
    async fn test_no_owned_organizations_skips_cascade() {
        let (store, identity, deleter) = setup();
        let user_id = Uuid::new_v4();
        let org_id = Uuid::new_v4();
        store.seed_organization(org(org_id));
        store.seed_membership(membership(org_id, Uuid::new_v4(), "owner", "active"));
        store.seed_membership(membership(org_id, user_id, "member", "active"));

        let report = deleter.delete_account(&user_id.to_string()).await.unwrap();

        assert!(report.organizations.is_empty());
        assert_eq!(report.memberships_removed, 1);
        assert!(store.organization_exists(org_id));
        assert_eq!(identity.deleted_users(), vec![user_id]);
    }

    #[tokio::test]
    async fn test_organization_without_listings() {
        let (store, _identity, deleter) = setup();
        let user_id = Uuid::new_v4();
        let org_id = Uuid::new_v4();
        store.seed_organization(org(org_id));
        store.seed_membership(membership(org_id, user_id, "owner", "active"));
        store.seed_candidate(candidate(org_id));

        let report = deleter.delete_account(&user_id.to_string()).await.unwrap();

        assert_eq!(
            report.organizations[0].outcome,
            OrganizationOutcome::Deleted {
                removed: DeletedCounts {
                    candidates: 1,
                    job_applications: 0,
                    job_listings: 0,
                    memberships: 1,
                }
            }
        );
        assert!(!store.organization_exists(org_id));
    }

    #[tokio::test]
    async fn test_failure_in_one_organization_does_not_stop_the_others() {
        let (store, identity, deleter) = setup();
        let user_id = Uuid::new_v4();
        let org_a = seed_sole_owner_org(&store, user_id);
        let org_b = Uuid::new_v4();
        store.seed_organization(org(org_b));
        store.seed_membership(membership(org_b, user_id, "owner", "active"));
        store.fail_on(&format!("delete_candidates:{org_a}"));

        let err = deleter
            .delete_account(&user_id.to_string())
            .await
            .unwrap_err();

        match err {
            DeletionError::CleanupFailed { report } => {
                assert_eq!(report.organizations.len(), 2);
                assert!(matches!(
                    report.organizations[0].outcome,
                    OrganizationOutcome::Failed {
                        stage: DeletionStage::Candidates,
                        ..
                    }
                ));
                assert!(matches!(
                    report.organizations[1].outcome,
                    OrganizationOutcome::Deleted { .. }
                ));
            }
            other => panic!("expected CleanupFailed, got {other:?}"),
        }

        assert!(store.organization_exists(org_a));
        assert!(!store.organization_exists(org_b));
        assert!(identity.deleted_users().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_co_owner_does_not_block_cascade() {
        let (store, _identity, deleter) = setup();
        let user_id = Uuid::new_v4();
        let org_id = Uuid::new_v4();
        store.seed_organization(org(org_id));
        store.seed_membership(membership(org_id, user_id, "owner", "active"));
        store.seed_membership(membership(org_id, Uuid::new_v4(), "owner", "invited"));

        let report = deleter.delete_account(&user_id.to_string()).await.unwrap();

        assert!(matches!(
            report.organizations[0].outcome,
            OrganizationOutcome::Deleted { .. }
        ));
        assert!(!store.organization_exists(org_id));
    }
}
