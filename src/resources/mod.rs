//! Managed resource types.

mod autolinks;
mod branches;
mod collaborators;
mod environments;
mod files;
mod issues;
mod keys;
mod membership;
mod repository;
mod secrets;
mod teams;
mod variables;
mod webhooks;

pub use autolinks::{AutolinkReferenceModel, AutolinkReferenceResource};
pub use branches::{
    BranchDefaultModel, BranchDefaultResource, BranchModel, BranchProtectionModel,
    BranchProtectionResource, BranchResource, RequiredReviewsModel, RequiredStatusChecksModel,
    RestrictionsModel,
};
pub use collaborators::{
    CollaboratorModel, CollaboratorResource, CollaboratorsModel, CollaboratorsResource, TeamAccess,
    UserAccess,
};
pub use environments::{
    DeploymentBranchPolicyModel, EnvironmentModel, EnvironmentResource, EnvironmentReviewersModel,
};
pub use files::{RepositoryFileModel, RepositoryFileResource};
pub use issues::{
    IssueLabelModel, IssueLabelResource, IssueLabelsModel, IssueLabelsResource, IssueModel,
    IssueResource, LabelModel, MilestoneModel, MilestoneResource,
};
pub use keys::{DeployKeyModel, DeployKeyResource, UserSshKeyModel, UserSshKeyResource};
pub use membership::{MembershipModel, MembershipResource};
pub use repository::{
    RepositoryModel, RepositoryResource, RepositoryTopicsModel, RepositoryTopicsResource,
    TemplateModel,
};
pub use secrets::{
    ActionsOrganizationSecretResource, ActionsSecretResource, DependabotSecretResource,
    OrganizationSecretModel, SecretModel,
};
pub use teams::{
    TeamMemberModel, TeamMembersModel, TeamMembersResource, TeamMembershipModel,
    TeamMembershipResource, TeamModel, TeamRepositoryModel, TeamRepositoryResource, TeamResource,
};
pub use variables::{
    ActionsOrganizationVariableResource, ActionsVariableResource, OrganizationVariableModel,
    VariableModel,
};
pub use webhooks::{
    OrganizationWebhookResource, RepositoryWebhookResource, WebhookConfigModel, WebhookModel,
};

use crate::errors::{ProviderError, ProviderResult};
use crate::provider::DynResource;
use std::sync::Arc;

/// Every resource type, for registration.
pub fn all() -> Vec<Arc<dyn DynResource>> {
    vec![
        Arc::new(RepositoryResource),
        Arc::new(RepositoryTopicsResource),
        Arc::new(CollaboratorResource),
        Arc::new(CollaboratorsResource),
        Arc::new(TeamResource),
        Arc::new(TeamMembershipResource),
        Arc::new(TeamMembersResource),
        Arc::new(TeamRepositoryResource),
        Arc::new(MembershipResource),
        Arc::new(BranchResource),
        Arc::new(BranchDefaultResource),
        Arc::new(BranchProtectionResource),
        Arc::new(IssueLabelResource),
        Arc::new(IssueLabelsResource),
        Arc::new(IssueResource),
        Arc::new(MilestoneResource),
        Arc::new(RepositoryFileResource),
        Arc::new(RepositoryWebhookResource),
        Arc::new(OrganizationWebhookResource),
        Arc::new(ActionsSecretResource),
        Arc::new(ActionsOrganizationSecretResource),
        Arc::new(DependabotSecretResource),
        Arc::new(ActionsVariableResource),
        Arc::new(ActionsOrganizationVariableResource),
        Arc::new(DeployKeyResource),
        Arc::new(UserSshKeyResource),
        Arc::new(EnvironmentResource),
        Arc::new(AutolinkReferenceResource),
    ]
}

/// Unwraps an attribute the schema marks required.
pub(crate) fn required<'m>(
    value: &'m Option<String>,
    attribute: &'static str,
) -> ProviderResult<&'m str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProviderError::Configuration(format!("{:?} must be set", attribute)))
}

/// Error for an object that cannot be read back right after a write.
pub(crate) fn vanished(type_name: &str, id: &str) -> ProviderError {
    ProviderError::Conflict(format!(
        "{} {:?} was not found after it was written",
        type_name, id
    ))
}

/// Compares two optional string lists as sets.
pub(crate) fn same_set(a: &Option<Vec<String>>, b: &Option<Vec<String>>) -> bool {
    let norm = |v: &Option<Vec<String>>| {
        let mut v = v.clone().unwrap_or_default();
        v.sort();
        v.dedup();
        v
    };
    norm(a) == norm(b)
}

/// Owner handle for unit tests that never reach the network.
#[cfg(test)]
pub(crate) fn offline_owner() -> crate::provider::Owner {
    let config = crate::config::ProviderConfig::builder()
        .token("test-token")
        .build()
        .unwrap();
    let auth = crate::auth::AuthMethod::token("test-token");
    let client = crate::client::GitHubClient::new(config, auth).unwrap();
    crate::provider::Owner::new(Arc::new(client), Some("acme".into()), Some(1), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        assert_eq!(required(&Some("x".into()), "name").unwrap(), "x");
        assert!(required(&Some(String::new()), "name").is_err());
        assert!(required(&None, "name").is_err());
    }

    #[test]
    fn test_same_set() {
        let a = Some(vec!["b".to_string(), "a".to_string()]);
        let b = Some(vec!["a".to_string(), "b".to_string()]);
        assert!(same_set(&a, &b));
        assert!(same_set(&None, &Some(vec![])));
        assert!(!same_set(&a, &None));
    }
}
