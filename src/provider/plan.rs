//! Plan computation: prior state + configuration → planned state.

use crate::errors::Diagnostic;
use crate::schema::{Attribute, Schema};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// What applying a plan will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    /// Nothing changes.
    NoOp,
    /// The object will be created.
    Create,
    /// The object will be updated in place.
    Update,
    /// The object will be destroyed and created again.
    Replace,
    /// The object will be destroyed.
    Delete,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoOp => "no-op",
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// A single attribute difference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeChange {
    /// Attribute name.
    pub path: String,
    /// Prior value.
    pub before: Value,
    /// Planned value (`null` when unknown).
    pub after: Value,
    /// The change forces replacement.
    pub requires_replace: bool,
    /// Values must not be shown.
    pub sensitive: bool,
}

impl fmt::Display for AttributeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sensitive {
            write!(f, "{}: (sensitive value)", self.path)?;
        } else {
            write!(f, "{}: {} -> {}", self.path, self.before, self.after)?;
        }
        if self.requires_replace {
            write!(f, " # forces replacement")?;
        }
        Ok(())
    }
}

/// Result of planning a resource change.
#[derive(Debug, Clone, Serialize)]
pub struct PlanResult {
    /// Planned action.
    pub action: PlanAction,
    /// State expected after apply. Unknown computed values are `null`.
    pub planned_state: Value,
    /// Attribute differences.
    pub changes: Vec<AttributeChange>,
    /// Computed attributes whose value is known only after apply.
    pub unknown: Vec<String>,
    /// Validation warnings.
    #[serde(skip)]
    pub diagnostics: Vec<Diagnostic>,
}

impl PlanResult {
    /// True when any change forces replacement.
    pub fn requires_replace(&self) -> bool {
        self.changes.iter().any(|c| c.requires_replace)
    }
}

fn present(value: Option<&Value>) -> bool {
    value.map_or(false, |v| !v.is_null())
}

/// Computes the plan for one resource.
///
/// `config == None` (or `null`) destroys the resource.
pub fn plan(schema: &Schema, prior: Option<&Value>, config: Option<&Value>) -> PlanResult {
    let prior = prior.filter(|p| !p.is_null());
    let config = config.filter(|c| !c.is_null());

    let config = match config {
        Some(config) => schema.apply_defaults(config),
        None => {
            let action = if prior.is_some() { PlanAction::Delete } else { PlanAction::NoOp };
            return PlanResult {
                action,
                planned_state: Value::Null,
                changes: Vec::new(),
                unknown: Vec::new(),
                diagnostics: Vec::new(),
            };
        }
    };

    let prior_value = |name: &str| {
        prior
            .and_then(|p| p.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    };

    // Configured and optional-computed attributes first; read-only computed
    // attributes depend on whether anything else changed.
    let mut planned = Map::new();
    let mut changes = Vec::new();
    let mut read_only: Vec<(&String, &Attribute)> = Vec::new();

    for (name, attr) in &schema.attributes {
        if attr.is_read_only() {
            read_only.push((name, attr));
            continue;
        }

        let configured = config.get(name).cloned().unwrap_or(Value::Null);
        let value = if configured.is_null() && attr.computed {
            prior_value(name)
        } else {
            configured
        };

        let before = prior_value(name);
        if prior.is_some() && !attr.attr_type.values_equal(&before, &value) {
            changes.push(AttributeChange {
                path: name.clone(),
                before,
                after: value.clone(),
                requires_replace: attr.requires_replace(),
                sensitive: attr.sensitive,
            });
        }
        planned.insert(name.clone(), value);
    }

    let replacing = changes.iter().any(|c| c.requires_replace);
    let mut unknown = Vec::new();
    for (name, attr) in read_only {
        let before = prior_value(name);
        let keep = match prior {
            None => false,
            Some(_) if replacing => false,
            Some(_) => attr.keeps_state_for_unknown() || changes.is_empty(),
        };
        if keep && present(Some(&before)) {
            planned.insert(name.clone(), before);
        } else {
            unknown.push(name.clone());
            planned.insert(name.clone(), Value::Null);
        }
    }

    let action = match prior {
        None => PlanAction::Create,
        Some(_) if replacing => PlanAction::Replace,
        Some(_) if changes.is_empty() => PlanAction::NoOp,
        Some(_) => PlanAction::Update,
    };

    if action == PlanAction::Create {
        changes = planned
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(name, v)| AttributeChange {
                path: name.clone(),
                before: Value::Null,
                after: v.clone(),
                requires_replace: false,
                sensitive: schema.attribute(name).map_or(false, |a| a.sensitive),
            })
            .collect();
    }

    PlanResult {
        action,
        planned_state: Value::Object(planned),
        changes,
        unknown,
        diagnostics: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeType, Schema};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::resource("test")
            .with_attribute("name", Attribute::required(AttributeType::String).force_new())
            .with_attribute("description", Attribute::optional(AttributeType::String))
            .with_attribute(
                "visibility",
                Attribute::optional(AttributeType::String).default_value(json!("public")),
            )
            .with_attribute("topics", Attribute::optional(AttributeType::string_set()))
            .with_attribute("etag", Attribute::computed(AttributeType::String))
            .with_attribute(
                "node_id",
                Attribute::computed(AttributeType::String).use_state_for_unknown(),
            )
    }

    fn prior() -> Value {
        json!({
            "id": "repo",
            "name": "repo",
            "description": "old",
            "visibility": "public",
            "topics": ["a", "b"],
            "etag": "W/1",
            "node_id": "R_1",
        })
    }

    #[test]
    fn test_create_applies_defaults_and_marks_unknown() {
        let result = plan(&schema(), None, Some(&json!({"name": "repo"})));

        assert_eq!(result.action, PlanAction::Create);
        assert_eq!(result.planned_state["visibility"], json!("public"));
        assert_eq!(result.planned_state["id"], Value::Null);
        assert_eq!(result.unknown, vec!["etag", "id", "node_id"]);
        assert!(result.changes.iter().any(|c| c.path == "name"));
    }

    #[test]
    fn test_no_changes_is_noop_and_keeps_computed() {
        let config = json!({"name": "repo", "description": "old", "topics": ["b", "a"]});
        let result = plan(&schema(), Some(&prior()), Some(&config));

        assert_eq!(result.action, PlanAction::NoOp);
        assert!(result.unknown.is_empty());
        assert_eq!(result.planned_state["etag"], json!("W/1"));
    }

    #[test]
    fn test_update_uses_state_for_unknown() {
        let config = json!({"name": "repo", "description": "new", "topics": ["a", "b"]});
        let result = plan(&schema(), Some(&prior()), Some(&config));

        assert_eq!(result.action, PlanAction::Update);
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].path, "description");
        assert_eq!(result.planned_state["node_id"], json!("R_1"));
        assert_eq!(result.planned_state["id"], json!("repo"));
        assert_eq!(result.unknown, vec!["etag"]);
    }

    #[test]
    fn test_force_new_attribute_replaces() {
        let config = json!({"name": "other", "description": "old", "topics": ["a", "b"]});
        let result = plan(&schema(), Some(&prior()), Some(&config));

        assert_eq!(result.action, PlanAction::Replace);
        assert!(result.requires_replace());
        assert_eq!(result.planned_state["id"], Value::Null);
    }

    #[test]
    fn test_nested_computed_field_does_not_diff() {
        let schema = Schema::resource("labels").with_attribute(
            "label",
            Attribute::optional(AttributeType::Set(Box::new(AttributeType::object([
                ("name", Attribute::required(AttributeType::String)),
                ("url", Attribute::computed(AttributeType::String)),
            ])))),
        );
        let prior = json!({
            "id": "widgets",
            "label": [{"name": "bug", "url": "https://example.com/bug"}]
        });
        let result = plan(&schema, Some(&prior), Some(&json!({"label": [{"name": "bug"}]})));

        assert_eq!(result.action, PlanAction::NoOp);
        assert!(result.changes.is_empty());
    }

    #[test]
    fn test_removed_config_deletes() {
        let result = plan(&schema(), Some(&prior()), None);
        assert_eq!(result.action, PlanAction::Delete);
        assert_eq!(result.planned_state, Value::Null);

        let result = plan(&schema(), None, Some(&Value::Null));
        assert_eq!(result.action, PlanAction::NoOp);
    }

    #[test]
    fn test_sensitive_change_display() {
        let change = AttributeChange {
            path: "plaintext_value".into(),
            before: json!("a"),
            after: json!("b"),
            requires_replace: true,
            sensitive: true,
        };
        assert_eq!(change.to_string(), "plaintext_value: (sensitive value) # forces replacement");
    }
}
