//! `github_ip_ranges`.

use crate::errors::ProviderResult;
use crate::provider::{DataSource, Owner};
use crate::schema::{Attribute, AttributeType, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Output of `github_ip_ranges`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpRangesModel {
    /// Data source ID.
    pub id: Option<String>,
    /// Webhook source ranges.
    pub hooks: Option<Vec<String>>,
    /// Webhook source ranges (IPv4).
    pub hooks_ipv4: Option<Vec<String>>,
    /// Webhook source ranges (IPv6).
    pub hooks_ipv6: Option<Vec<String>>,
    /// `web` ranges.
    pub web: Option<Vec<String>>,
    /// `api` ranges.
    pub api: Option<Vec<String>>,
    /// `git` ranges.
    pub git: Option<Vec<String>>,
    /// `git` ranges (IPv4).
    pub git_ipv4: Option<Vec<String>>,
    /// `git` ranges (IPv6).
    pub git_ipv6: Option<Vec<String>>,
    /// `pages` ranges.
    pub pages: Option<Vec<String>>,
    /// `importer` ranges.
    pub importer: Option<Vec<String>>,
    /// `actions` ranges.
    pub actions: Option<Vec<String>>,
    /// `actions` ranges (IPv4).
    pub actions_ipv4: Option<Vec<String>>,
    /// `actions` ranges (IPv6).
    pub actions_ipv6: Option<Vec<String>>,
    /// `dependabot` ranges.
    pub dependabot: Option<Vec<String>>,
}

/// Splits CIDR ranges into IPv4 and IPv6 lists.
fn split_families(ranges: &[String]) -> (Vec<String>, Vec<String>) {
    ranges.iter().cloned().partition(|r| !r.contains(':'))
}

/// `github_ip_ranges`: GitHub's published address ranges.
pub struct IpRangesDataSource;

#[async_trait]
impl DataSource for IpRangesDataSource {
    type Model = IpRangesModel;
    const TYPE_NAME: &'static str = "github_ip_ranges";

    fn schema(&self) -> Schema {
        let mut schema = Schema::data_source("GitHub's IP address ranges.");
        for name in [
            "hooks",
            "hooks_ipv4",
            "hooks_ipv6",
            "web",
            "api",
            "git",
            "git_ipv4",
            "git_ipv6",
            "pages",
            "importer",
            "actions",
            "actions_ipv4",
            "actions_ipv6",
            "dependabot",
        ] {
            schema = schema.with_attribute(name, Attribute::computed(AttributeType::string_list()));
        }
        schema
    }

    async fn read(&self, owner: &Owner, _config: IpRangesModel) -> ProviderResult<IpRangesModel> {
        let meta = owner.client().search().meta().await?;

        let (hooks_ipv4, hooks_ipv6) = split_families(&meta.hooks);
        let (git_ipv4, git_ipv6) = split_families(&meta.git);
        let (actions_ipv4, actions_ipv6) = split_families(&meta.actions);

        Ok(IpRangesModel {
            id: Some("github-ip-ranges".to_string()),
            hooks: Some(meta.hooks),
            hooks_ipv4: Some(hooks_ipv4),
            hooks_ipv6: Some(hooks_ipv6),
            web: Some(meta.web),
            api: Some(meta.api),
            git: Some(meta.git),
            git_ipv4: Some(git_ipv4),
            git_ipv6: Some(git_ipv6),
            pages: Some(meta.pages),
            importer: Some(meta.importer),
            actions: Some(meta.actions),
            actions_ipv4: Some(actions_ipv4),
            actions_ipv6: Some(actions_ipv6),
            dependabot: Some(meta.dependabot),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_families() {
        let ranges = vec![
            "192.30.252.0/22".to_string(),
            "2a0a:a440::/29".to_string(),
            "140.82.112.0/20".to_string(),
        ];
        let (v4, v6) = split_families(&ranges);
        assert_eq!(v4, vec!["192.30.252.0/22", "140.82.112.0/20"]);
        assert_eq!(v6, vec!["2a0a:a440::/29"]);
    }
}
