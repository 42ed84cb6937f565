//! `github_team` and `github_organization_teams`.

use super::not_found;
use crate::errors::ProviderResult;
use crate::provider::{DataSource, Owner};
use crate::schema::{Attribute, AttributeType, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Output of `github_team`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamLookupModel {
    /// Team ID.
    pub id: Option<String>,
    /// Team slug.
    pub slug: Option<String>,
    /// Name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Privacy (secret, closed).
    pub privacy: Option<String>,
    /// Default repository permission.
    pub permission: Option<String>,
    /// GraphQL node ID.
    pub node_id: Option<String>,
    /// Member logins.
    pub members: Option<Vec<String>>,
    /// Repository names.
    pub repositories: Option<Vec<String>>,
}

/// `github_team`: a team of the owner organization, by slug.
pub struct TeamDataSource;

#[async_trait]
impl DataSource for TeamDataSource {
    type Model = TeamLookupModel;
    const TYPE_NAME: &'static str = "github_team";

    fn schema(&self) -> Schema {
        Schema::data_source("A team of the organization.")
            .with_attribute("slug", Attribute::required(AttributeType::String))
            .with_attribute("name", Attribute::computed(AttributeType::String))
            .with_attribute("description", Attribute::computed(AttributeType::String))
            .with_attribute("privacy", Attribute::computed(AttributeType::String))
            .with_attribute("permission", Attribute::computed(AttributeType::String))
            .with_attribute("node_id", Attribute::computed(AttributeType::String))
            .with_attribute("members", Attribute::computed(AttributeType::string_list()))
            .with_attribute("repositories", Attribute::computed(AttributeType::string_list()))
    }

    async fn read(
        &self,
        owner: &Owner,
        config: TeamLookupModel,
    ) -> ProviderResult<TeamLookupModel> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let org_id = owner.org_id(Self::TYPE_NAME)?;
        let slug = config.slug.clone().unwrap_or_default();
        let orgs = owner.client().organizations();

        let team = orgs
            .get_team_by_slug(org, &slug)
            .await?
            .ok_or_else(|| not_found(Self::TYPE_NAME, &slug))?;
        let members = orgs
            .list_team_members(org_id, team.id, None)
            .await?
            .into_iter()
            .map(|u| u.login)
            .collect();
        let repositories = orgs
            .list_team_repos(org_id, team.id)
            .await?
            .into_iter()
            .map(|r| r.name)
            .collect();

        Ok(TeamLookupModel {
            id: Some(team.id.to_string()),
            slug: Some(team.slug),
            name: Some(team.name),
            description: team.description,
            privacy: team.privacy,
            permission: team.permission,
            node_id: Some(team.node_id),
            members: Some(members),
            repositories: Some(repositories),
        })
    }
}

const ORGANIZATION_TEAMS_QUERY: &str = r#"
query($login: String!, $first: Int!, $after: String, $rootTeamsOnly: Boolean!) {
  organization(login: $login) {
    teams(first: $first, after: $after, rootTeamsOnly: $rootTeamsOnly) {
      nodes {
        databaseId
        id
        slug
        name
        description
        privacy
        parentTeam { databaseId slug }
        members(first: 100, membership: IMMEDIATE) { nodes { login } }
        repositories(first: 100) { nodes { name } }
      }
      pageInfo { hasNextPage endCursor }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamNode {
    database_id: u64,
    id: String,
    slug: String,
    name: String,
    description: Option<String>,
    privacy: String,
    parent_team: Option<ParentNode>,
    #[serde(default)]
    members: NodeList<LoginNode>,
    #[serde(default)]
    repositories: NodeList<NameNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParentNode {
    database_id: u64,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct NodeList<T> {
    nodes: Vec<T>,
}

impl<T> Default for NodeList<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

#[derive(Debug, Deserialize)]
struct LoginNode {
    login: String,
}

#[derive(Debug, Deserialize)]
struct NameNode {
    name: String,
}

/// GraphQL reports privacy as `VISIBLE`/`SECRET`; REST calls the former
/// `closed`.
fn rest_privacy(graphql: &str) -> String {
    match graphql {
        "VISIBLE" => "closed".to_string(),
        other => other.to_ascii_lowercase(),
    }
}

/// A team entry of `github_organization_teams`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationTeamEntry {
    /// Team ID.
    pub id: u64,
    /// GraphQL node ID.
    pub node_id: String,
    /// Team slug.
    pub slug: String,
    /// Name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Privacy (secret, closed).
    pub privacy: String,
    /// Parent team ID.
    pub parent_team_id: Option<u64>,
    /// Parent team slug.
    pub parent_team_slug: Option<String>,
    /// Member logins.
    pub members: Vec<String>,
    /// Repository names.
    pub repositories: Vec<String>,
}

impl From<TeamNode> for OrganizationTeamEntry {
    fn from(node: TeamNode) -> Self {
        Self {
            id: node.database_id,
            node_id: node.id,
            slug: node.slug,
            name: node.name,
            description: node.description.filter(|d| !d.is_empty()),
            privacy: rest_privacy(&node.privacy),
            parent_team_id: node.parent_team.as_ref().map(|p| p.database_id),
            parent_team_slug: node.parent_team.map(|p| p.slug),
            members: node.members.nodes.into_iter().map(|m| m.login).collect(),
            repositories: node.repositories.nodes.into_iter().map(|r| r.name).collect(),
        }
    }
}

/// Output of `github_organization_teams`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationTeamsModel {
    /// Data source ID.
    pub id: Option<String>,
    /// Only list teams without a parent.
    pub root_teams_only: Option<bool>,
    /// Teams found.
    pub teams: Option<Vec<OrganizationTeamEntry>>,
}

/// `github_organization_teams`: every team of the organization, read through
/// GraphQL.
pub struct OrganizationTeamsDataSource;

#[async_trait]
impl DataSource for OrganizationTeamsDataSource {
    type Model = OrganizationTeamsModel;
    const TYPE_NAME: &'static str = "github_organization_teams";

    fn schema(&self) -> Schema {
        Schema::data_source("All teams of the organization.")
            .with_attribute(
                "root_teams_only",
                Attribute::optional(AttributeType::Bool).default_value(json!(false)),
            )
            .with_attribute(
                "teams",
                Attribute::computed(AttributeType::List(Box::new(AttributeType::object([
                    ("id", Attribute::computed(AttributeType::Int)),
                    ("node_id", Attribute::computed(AttributeType::String)),
                    ("slug", Attribute::computed(AttributeType::String)),
                    ("name", Attribute::computed(AttributeType::String)),
                    ("description", Attribute::computed(AttributeType::String)),
                    ("privacy", Attribute::computed(AttributeType::String)),
                    ("parent_team_id", Attribute::computed(AttributeType::Int)),
                    ("parent_team_slug", Attribute::computed(AttributeType::String)),
                    ("members", Attribute::computed(AttributeType::string_list())),
                    ("repositories", Attribute::computed(AttributeType::string_list())),
                ])))),
            )
    }

    async fn read(
        &self,
        owner: &Owner,
        config: OrganizationTeamsModel,
    ) -> ProviderResult<OrganizationTeamsModel> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let root_teams_only = config.root_teams_only.unwrap_or(false);

        let nodes: Vec<TeamNode> = owner
            .client()
            .graphql()
            .query_all_nodes(
                ORGANIZATION_TEAMS_QUERY,
                json!({ "login": org, "rootTeamsOnly": root_teams_only }),
                "/organization/teams",
            )
            .await?;
        tracing::debug!(org = %org, count = nodes.len(), "Read organization teams");

        Ok(OrganizationTeamsModel {
            id: Some(org.to_string()),
            root_teams_only: Some(root_teams_only),
            teams: Some(nodes.into_iter().map(OrganizationTeamEntry::from).collect()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("VISIBLE", "closed")]
    #[test_case("SECRET", "secret")]
    fn test_rest_privacy(input: &str, expected: &str) {
        assert_eq!(rest_privacy(input), expected);
    }

    #[test]
    fn test_team_node_conversion() {
        let node: TeamNode = serde_json::from_value(json!({
            "databaseId": 7,
            "id": "T_kwDO",
            "slug": "platform",
            "name": "Platform",
            "description": "",
            "privacy": "VISIBLE",
            "parentTeam": { "databaseId": 1, "slug": "engineering" },
            "members": { "nodes": [{ "login": "alice" }] },
            "repositories": { "nodes": [{ "name": "api" }] }
        }))
        .unwrap();

        let entry = OrganizationTeamEntry::from(node);
        assert_eq!(entry.id, 7);
        assert_eq!(entry.description, None);
        assert_eq!(entry.parent_team_slug.as_deref(), Some("engineering"));
        assert_eq!(entry.members, vec!["alice".to_string()]);
        assert_eq!(entry.repositories, vec!["api".to_string()]);
    }
}
