//! GitHub API wire types.
//!
//! Responses are deserialized leniently: fields GitHub omits for some
//! endpoints or plans default instead of failing the request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_true() -> bool {
    true
}

/// GitHub user or organization account (minimal representation).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: u64,
    /// Username (login).
    pub login: String,
    /// Node ID.
    #[serde(default)]
    pub node_id: String,
    /// Avatar URL.
    #[serde(default)]
    pub avatar_url: String,
    /// Account type (User, Organization, Bot).
    #[serde(rename = "type", default)]
    pub user_type: String,
    /// Site admin flag.
    #[serde(default)]
    pub site_admin: bool,
    /// Profile URL.
    #[serde(default)]
    pub html_url: String,
}

/// Full user profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID.
    pub id: u64,
    /// Username (login).
    pub login: String,
    /// Node ID.
    #[serde(default)]
    pub node_id: String,
    /// Display name.
    pub name: Option<String>,
    /// Public email.
    pub email: Option<String>,
    /// Company.
    pub company: Option<String>,
    /// Blog URL.
    pub blog: Option<String>,
    /// Location.
    pub location: Option<String>,
    /// Biography.
    pub bio: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub avatar_url: String,
    /// Profile URL.
    #[serde(default)]
    pub html_url: String,
    /// Gravatar ID.
    #[serde(default)]
    pub gravatar_id: Option<String>,
    /// Site admin flag.
    #[serde(default)]
    pub site_admin: bool,
    /// Public repository count.
    #[serde(default)]
    pub public_repos: u64,
    /// Public gist count.
    #[serde(default)]
    pub public_gists: u64,
    /// Follower count.
    #[serde(default)]
    pub followers: u64,
    /// Following count.
    #[serde(default)]
    pub following: u64,
    /// Creation time (RFC 3339).
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update time (RFC 3339).
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// GitHub organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Organization {
    /// Organization ID.
    pub id: u64,
    /// Login.
    pub login: String,
    /// Node ID.
    #[serde(default)]
    pub node_id: String,
    /// Display name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Profile URL.
    #[serde(default)]
    pub html_url: String,
    /// Plan information (admins only).
    pub plan: Option<OrganizationPlan>,
    /// Default permission for members.
    pub default_repository_permission: Option<String>,
    /// Whether members can create repositories.
    pub members_can_create_repositories: Option<bool>,
    /// Whether two-factor authentication is required.
    pub two_factor_requirement_enabled: Option<bool>,
}

/// Organization plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationPlan {
    /// Plan name.
    pub name: String,
}

/// Repository permissions of the authenticated user, a collaborator or a team.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permissions {
    /// Admin access.
    #[serde(default)]
    pub admin: bool,
    /// Maintain access.
    #[serde(default)]
    pub maintain: bool,
    /// Write access.
    #[serde(default)]
    pub push: bool,
    /// Triage access.
    #[serde(default)]
    pub triage: bool,
    /// Read access.
    #[serde(default)]
    pub pull: bool,
}

impl Permissions {
    /// Highest permission held, in the names the API accepts on write.
    pub fn highest(&self) -> &'static str {
        if self.admin {
            "admin"
        } else if self.maintain {
            "maintain"
        } else if self.push {
            "push"
        } else if self.triage {
            "triage"
        } else {
            "pull"
        }
    }
}

/// GitHub repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Repository {
    /// Repository ID.
    pub id: u64,
    /// Node ID.
    #[serde(default)]
    pub node_id: String,
    /// Repository name.
    pub name: String,
    /// Full name (owner/repo).
    #[serde(default)]
    pub full_name: String,
    /// Owner information.
    #[serde(default)]
    pub owner: User,
    /// Whether the repository is private.
    #[serde(default)]
    pub private: bool,
    /// Visibility (public, private, internal).
    pub visibility: Option<String>,
    /// Repository description.
    pub description: Option<String>,
    /// Homepage URL.
    pub homepage: Option<String>,
    /// Whether the repository is a fork.
    #[serde(default)]
    pub fork: bool,
    /// HTML URL.
    #[serde(default)]
    pub html_url: String,
    /// Clone URL.
    #[serde(default)]
    pub clone_url: String,
    /// SSH URL.
    #[serde(default)]
    pub ssh_url: String,
    /// Git protocol URL.
    #[serde(default)]
    pub git_url: String,
    /// Subversion URL.
    #[serde(default)]
    pub svn_url: String,
    /// Default branch.
    #[serde(default)]
    pub default_branch: String,
    /// Topics.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Whether issues are enabled.
    #[serde(default = "default_true")]
    pub has_issues: bool,
    /// Whether discussions are enabled.
    #[serde(default)]
    pub has_discussions: bool,
    /// Whether projects are enabled.
    #[serde(default = "default_true")]
    pub has_projects: bool,
    /// Whether wiki is enabled.
    #[serde(default = "default_true")]
    pub has_wiki: bool,
    /// Whether downloads are enabled.
    #[serde(default = "default_true")]
    pub has_downloads: bool,
    /// Whether the repository is a template.
    #[serde(default)]
    pub is_template: bool,
    /// Whether merge commits are allowed.
    #[serde(default = "default_true")]
    pub allow_merge_commit: bool,
    /// Whether squash merges are allowed.
    #[serde(default = "default_true")]
    pub allow_squash_merge: bool,
    /// Whether rebase merges are allowed.
    #[serde(default = "default_true")]
    pub allow_rebase_merge: bool,
    /// Whether auto-merge is allowed.
    #[serde(default)]
    pub allow_auto_merge: bool,
    /// Whether head branches are deleted after merge.
    #[serde(default)]
    pub delete_branch_on_merge: bool,
    /// Whether the repository is archived.
    #[serde(default)]
    pub archived: bool,
    /// Whether the repository is disabled.
    #[serde(default)]
    pub disabled: bool,
    /// Template the repository was generated from.
    pub template_repository: Option<Box<Repository>>,
    /// Permissions of the authenticated user.
    pub permissions: Option<Permissions>,
}

/// Repository topic list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topics {
    /// Topic names.
    #[serde(default)]
    pub names: Vec<String>,
}

/// GitHub branch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name.
    pub name: String,
    /// Commit reference.
    #[serde(default)]
    pub commit: BranchCommit,
    /// Whether branch is protected.
    #[serde(default)]
    pub protected: bool,
}

/// Branch commit reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchCommit {
    /// Commit SHA.
    pub sha: String,
    /// Commit URL.
    #[serde(default)]
    pub url: String,
}

/// Git reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitRef {
    /// Fully qualified ref name (`refs/heads/main`).
    #[serde(rename = "ref")]
    pub ref_name: String,
    /// Node ID.
    #[serde(default)]
    pub node_id: String,
    /// Referenced object.
    pub object: GitObject,
}

/// Object a git reference points at.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitObject {
    /// Object SHA.
    pub sha: String,
    /// Object type (commit, tag).
    #[serde(rename = "type", default)]
    pub object_type: String,
}

/// File content returned by the contents API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    /// Content type (file, dir, symlink, submodule).
    #[serde(rename = "type", default)]
    pub content_type: String,
    /// Encoding (usually base64).
    pub encoding: Option<String>,
    /// File size in bytes.
    #[serde(default)]
    pub size: u64,
    /// File name.
    #[serde(default)]
    pub name: String,
    /// Path in the repository.
    #[serde(default)]
    pub path: String,
    /// Encoded content.
    pub content: Option<String>,
    /// Blob SHA.
    pub sha: String,
}

/// Commit information returned by file writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileCommit {
    /// Commit SHA.
    pub sha: String,
    /// Commit message.
    #[serde(default)]
    pub message: String,
    /// Author.
    pub author: Option<CommitAuthor>,
    /// Committer.
    pub committer: Option<CommitAuthor>,
}

/// Response from file commit operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileCommitResponse {
    /// The committed content (absent on delete).
    pub content: Option<Content>,
    /// The commit.
    pub commit: FileCommit,
}

/// Commit author information.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitAuthor {
    /// Author name.
    pub name: String,
    /// Author email.
    pub email: String,
}

/// Repository collaborator with permissions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collaborator {
    /// User ID.
    pub id: u64,
    /// Login.
    pub login: String,
    /// Permissions held.
    #[serde(default)]
    pub permissions: Permissions,
    /// Role name (read, triage, write, maintain, admin or a custom role).
    pub role_name: Option<String>,
}

impl Collaborator {
    /// Permission in the names used on write.
    pub fn permission(&self) -> String {
        match self.role_name.as_deref() {
            Some(role) => normalize_permission(role),
            None => self.permissions.highest().to_string(),
        }
    }
}

/// Maps role names (`read`, `write`) onto permission names (`pull`, `push`).
pub fn normalize_permission(permission: &str) -> String {
    match permission {
        "read" => "pull".to_string(),
        "write" => "push".to_string(),
        other => other.to_string(),
    }
}

/// Pending repository invitation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryInvitation {
    /// Invitation ID.
    pub id: u64,
    /// Invited user.
    pub invitee: Option<User>,
    /// Permission offered (read, write, ...).
    #[serde(default)]
    pub permissions: String,
    /// Repository.
    pub repository: Option<Box<Repository>>,
}

/// GitHub team.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Team {
    /// Team ID.
    pub id: u64,
    /// Node ID.
    #[serde(default)]
    pub node_id: String,
    /// Team name.
    pub name: String,
    /// Team slug.
    pub slug: String,
    /// Description.
    pub description: Option<String>,
    /// Privacy (secret, closed).
    pub privacy: Option<String>,
    /// Default permission.
    pub permission: Option<String>,
    /// Parent team.
    pub parent: Option<Box<Team>>,
    /// Members URL.
    #[serde(default)]
    pub members_url: String,
    /// Permissions on a repository (only on team/repo endpoints).
    pub permissions: Option<Permissions>,
}

/// Team membership.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamMembership {
    /// Role (member, maintainer).
    pub role: String,
    /// State (active, pending).
    pub state: String,
}

/// Organization membership.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgMembership {
    /// Role (member, admin).
    pub role: String,
    /// State (active, pending).
    pub state: String,
    /// Member.
    pub user: Option<User>,
}

/// GitHub label.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Label {
    /// Label ID.
    #[serde(default)]
    pub id: u64,
    /// Node ID.
    #[serde(default)]
    pub node_id: String,
    /// Label name.
    pub name: String,
    /// Label description.
    pub description: Option<String>,
    /// Label color (hex).
    #[serde(default)]
    pub color: String,
    /// API URL.
    #[serde(default)]
    pub url: String,
}

/// GitHub issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Issue {
    /// Issue ID.
    pub id: u64,
    /// Issue number.
    pub number: u64,
    /// Issue title.
    pub title: String,
    /// Issue body.
    pub body: Option<String>,
    /// State (open, closed).
    #[serde(default)]
    pub state: String,
    /// Labels.
    #[serde(default)]
    pub labels: Vec<Label>,
    /// Assignees.
    #[serde(default)]
    pub assignees: Vec<User>,
    /// Milestone.
    pub milestone: Option<Milestone>,
}

/// Repository milestone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Milestone {
    /// Milestone ID.
    #[serde(default)]
    pub id: u64,
    /// Milestone number.
    pub number: u64,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// State (open, closed).
    #[serde(default)]
    pub state: String,
    /// Due date (RFC 3339).
    pub due_on: Option<String>,
}

/// Webhook (repository or organization).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hook {
    /// Hook ID.
    pub id: u64,
    /// Hook name (always "web").
    #[serde(default)]
    pub name: String,
    /// Whether the hook is active.
    #[serde(default)]
    pub active: bool,
    /// Subscribed events.
    #[serde(default)]
    pub events: Vec<String>,
    /// Delivery configuration.
    #[serde(default)]
    pub config: HookConfig,
    /// API URL.
    #[serde(default)]
    pub url: String,
}

/// Webhook delivery configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookConfig {
    /// Payload URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Content type (json, form).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Shared secret (masked as `********` on read).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// "1" to skip TLS verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure_ssl: Option<String>,
}

/// Public key used to encrypt Actions and Dependabot secrets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicKey {
    /// Key ID, sent back with the encrypted value.
    pub key_id: String,
    /// Base64-encoded X25519 public key.
    pub key: String,
}

/// Secret metadata (values are never returned).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Secret {
    /// Secret name.
    pub name: String,
    /// Creation time.
    #[serde(default)]
    pub created_at: String,
    /// Last update time.
    #[serde(default)]
    pub updated_at: String,
    /// Visibility for organization secrets.
    pub visibility: Option<String>,
}

/// Actions variable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Variable {
    /// Variable name.
    pub name: String,
    /// Value.
    #[serde(default)]
    pub value: String,
    /// Visibility for organization variables.
    pub visibility: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created_at: String,
    /// Last update time.
    #[serde(default)]
    pub updated_at: String,
}

/// SSH key (deploy key or user key).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Key {
    /// Key ID.
    pub id: u64,
    /// Public key.
    pub key: String,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Read-only flag (deploy keys).
    #[serde(default)]
    pub read_only: bool,
    /// API URL.
    #[serde(default)]
    pub url: String,
}

/// Deployment environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    /// Environment ID.
    #[serde(default)]
    pub id: u64,
    /// Name.
    pub name: String,
    /// Whether admins can bypass protection rules.
    #[serde(default = "default_true")]
    pub can_admins_bypass: bool,
    /// Protection rules.
    #[serde(default)]
    pub protection_rules: Vec<ProtectionRule>,
    /// Deployment branch policy.
    pub deployment_branch_policy: Option<BranchPolicy>,
}

/// Environment protection rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtectionRule {
    /// Rule type (wait_timer, required_reviewers, branch_policy).
    #[serde(rename = "type", default)]
    pub rule_type: String,
    /// Wait timer in minutes.
    pub wait_timer: Option<u64>,
    /// Whether the deployer may not approve.
    pub prevent_self_review: Option<bool>,
    /// Required reviewers.
    #[serde(default)]
    pub reviewers: Vec<EnvironmentReviewer>,
}

/// Required environment reviewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentReviewer {
    /// Reviewer type (User, Team).
    #[serde(rename = "type", default)]
    pub reviewer_type: String,
    /// The reviewer (user or team); only the id is used.
    pub reviewer: Option<ReviewerRef>,
}

/// Reference to a user or team reviewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewerRef {
    /// Account or team ID.
    pub id: u64,
}

/// Deployment branch policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BranchPolicy {
    /// Only protected branches may deploy.
    pub protected_branches: bool,
    /// Custom branch patterns may deploy.
    pub custom_branch_policies: bool,
}

/// Autolink reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Autolink {
    /// Autolink ID.
    pub id: u64,
    /// Key prefix.
    pub key_prefix: String,
    /// URL template containing `<num>`.
    pub url_template: String,
    /// Whether references are alphanumeric.
    #[serde(default = "default_true")]
    pub is_alphanumeric: bool,
}

/// Branch protection (REST v3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchProtection {
    /// Required status checks.
    pub required_status_checks: Option<RequiredStatusChecks>,
    /// Required pull request reviews.
    pub required_pull_request_reviews: Option<RequiredReviews>,
    /// Enforce for admins.
    pub enforce_admins: Option<EnabledSetting>,
    /// Push restrictions.
    pub restrictions: Option<BranchRestrictions>,
    /// Required signatures.
    pub required_signatures: Option<EnabledSetting>,
    /// Required linear history.
    pub required_linear_history: Option<EnabledSetting>,
    /// Required conversation resolution.
    pub required_conversation_resolution: Option<EnabledSetting>,
}

/// `{ "enabled": bool }` wrapper used by branch protection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnabledSetting {
    /// Enabled flag.
    #[serde(default)]
    pub enabled: bool,
}

/// Required status checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequiredStatusChecks {
    /// Require branches to be up to date.
    #[serde(default)]
    pub strict: bool,
    /// Status check contexts.
    #[serde(default)]
    pub contexts: Vec<String>,
}

/// Required pull request reviews.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequiredReviews {
    /// Dismiss stale reviews on push.
    #[serde(default)]
    pub dismiss_stale_reviews: bool,
    /// Require code owner review.
    #[serde(default)]
    pub require_code_owner_reviews: bool,
    /// Required approving review count.
    #[serde(default)]
    pub required_approving_review_count: u64,
    /// Require approval of the most recent push.
    #[serde(default)]
    pub require_last_push_approval: bool,
}

/// Push restrictions as returned on read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchRestrictions {
    /// Users allowed to push.
    #[serde(default)]
    pub users: Vec<User>,
    /// Teams allowed to push.
    #[serde(default)]
    pub teams: Vec<Team>,
    /// Apps allowed to push.
    #[serde(default)]
    pub apps: Vec<App>,
}

/// GitHub App (slug only).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct App {
    /// App slug.
    #[serde(default)]
    pub slug: String,
}

/// `GET /meta` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    /// Webhook delivery addresses.
    #[serde(default)]
    pub hooks: Vec<String>,
    /// Web addresses.
    #[serde(default)]
    pub web: Vec<String>,
    /// API addresses.
    #[serde(default)]
    pub api: Vec<String>,
    /// Git addresses.
    #[serde(default)]
    pub git: Vec<String>,
    /// Pages addresses.
    #[serde(default)]
    pub pages: Vec<String>,
    /// Importer addresses.
    #[serde(default)]
    pub importer: Vec<String>,
    /// Actions runner addresses.
    #[serde(default)]
    pub actions: Vec<String>,
    /// Dependabot addresses.
    #[serde(default)]
    pub dependabot: Vec<String>,
    /// SSH host key fingerprints.
    #[serde(default)]
    pub ssh_key_fingerprints: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_repository_lenient_deserialize() {
        let repo: Repository = serde_json::from_value(json!({
            "id": 1,
            "name": "hello",
            "full_name": "acme/hello",
        }))
        .unwrap();

        assert_eq!(repo.name, "hello");
        assert!(repo.has_issues);
        assert!(repo.allow_merge_commit);
        assert!(!repo.archived);
        assert!(repo.topics.is_empty());
    }

    #[test]
    fn test_collaborator_permission() {
        let c: Collaborator = serde_json::from_value(json!({
            "id": 1,
            "login": "octocat",
            "permissions": {
                "admin": false,
                "maintain": false,
                "push": true,
                "triage": true,
                "pull": true
            },
        }))
        .unwrap();
        assert_eq!(c.permission(), "push");

        let c: Collaborator = serde_json::from_value(json!({
            "id": 1,
            "login": "octocat",
            "role_name": "read",
        }))
        .unwrap();
        assert_eq!(c.permission(), "pull");
    }

    #[test]
    fn test_normalize_permission() {
        assert_eq!(normalize_permission("write"), "push");
        assert_eq!(normalize_permission("read"), "pull");
        assert_eq!(normalize_permission("maintain"), "maintain");
    }

    #[test]
    fn test_git_ref_deserialize() {
        let r: GitRef = serde_json::from_value(json!({
            "ref": "refs/heads/main",
            "object": {"sha": "abc", "type": "commit"}
        }))
        .unwrap();
        assert_eq!(r.ref_name, "refs/heads/main");
        assert_eq!(r.object.sha, "abc");
    }
}
