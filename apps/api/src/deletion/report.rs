use serde::Serialize;
use uuid::Uuid;

/// Stage of the per-organization cascade at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStage {
    OwnerCheck,
    Candidates,
    JobApplications,
    JobListings,
    Memberships,
    Organization,
}

/// Rows removed for one organization, by resource kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletedCounts {
    pub candidates: u64,
    pub job_applications: u64,
    pub job_listings: u64,
    pub memberships: u64,
}

/// What happened to one organization the user owned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrganizationOutcome {
    /// The user was the only active owner; the organization and everything
    /// scoped to it were removed.
    Deleted { removed: DeletedCounts },
    /// At least one other active owner remains; nothing was touched.
    Retained { other_owners: u64 },
    /// The cascade stopped at `stage`. `removed` is what had already been
    /// deleted when it stopped; there is no rollback.
    Failed {
        stage: DeletionStage,
        error: String,
        removed: DeletedCounts,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationReport {
    pub organization_id: Uuid,
    #[serde(flatten)]
    pub outcome: OrganizationOutcome,
}

/// Structured account-deletion result: per-organization outcomes in
/// processing order, plus the user-wide cleanup steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub user_id: Uuid,
    pub organizations: Vec<OrganizationReport>,
    /// Memberships removed outside the deleted organizations.
    pub memberships_removed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership_error: Option<String>,
    pub identity_deleted: bool,
}

impl DeletionReport {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            organizations: Vec::new(),
            memberships_removed: 0,
            membership_error: None,
            identity_deleted: false,
        }
    }

    /// True when any per-organization cascade or the membership cleanup failed.
    pub fn has_failures(&self) -> bool {
        self.membership_error.is_some()
            || self
                .organizations
                .iter()
                .any(|o| matches!(o.outcome, OrganizationOutcome::Failed { .. }))
    }

    pub fn failed_organizations(&self) -> usize {
        self.organizations
            .iter()
            .filter(|o| matches!(o.outcome, OrganizationOutcome::Failed { .. }))
            .count()
    }
}
