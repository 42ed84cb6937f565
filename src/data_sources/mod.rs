//! Read-only data sources.
//!
//! Unlike resources, a missing object is an error here: a lookup that finds
//! nothing cannot produce a usable value.

mod actions;
mod collaborators;
mod git;
mod labels;
mod meta;
mod organization;
mod repositories;
mod teams;
mod users;

pub use actions::{ActionsPublicKeyDataSource, ActionsPublicKeyModel};
pub use collaborators::{CollaboratorEntry, CollaboratorsDataSource, CollaboratorsListModel};
pub use git::{BranchDataSource, BranchLookupModel, RefDataSource, RefModel};
pub use labels::{IssueLabelsDataSource, IssueLabelsListModel, LabelEntry};
pub use meta::{IpRangesDataSource, IpRangesModel};
pub use organization::{OrganizationDataSource, OrganizationModel};
pub use repositories::{
    RepositoriesDataSource, RepositoriesModel, RepositoryDataSource, RepositoryLookupModel,
};
pub use teams::{
    OrganizationTeamEntry, OrganizationTeamsDataSource, OrganizationTeamsModel, TeamDataSource,
    TeamLookupModel,
};
pub use users::{UserDataSource, UserModel};

use crate::errors::{GitHubError, ProviderError};
use crate::provider::DynDataSource;
use std::sync::Arc;

/// Every data source type, for registration.
pub fn all() -> Vec<Arc<dyn DynDataSource>> {
    vec![
        Arc::new(RepositoryDataSource),
        Arc::new(RepositoriesDataSource),
        Arc::new(UserDataSource),
        Arc::new(TeamDataSource),
        Arc::new(OrganizationTeamsDataSource),
        Arc::new(OrganizationDataSource),
        Arc::new(CollaboratorsDataSource),
        Arc::new(ActionsPublicKeyDataSource),
        Arc::new(BranchDataSource),
        Arc::new(RefDataSource),
        Arc::new(IpRangesDataSource),
        Arc::new(IssueLabelsDataSource),
    ]
}

/// Error for a lookup that matched nothing.
pub(crate) fn not_found(type_name: &str, what: &str) -> ProviderError {
    ProviderError::Api(GitHubError::not_found(format!(
        "{}: {} not found",
        type_name, what
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_not_found() {
        let err = not_found("github_repository", "acme/missing");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("acme/missing"));
    }
}
