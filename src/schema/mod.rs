//! Resource, data source and provider schemas.
//!
//! A schema is a tree of typed attributes. It validates configuration,
//! supplies defaults and tells the planner which attributes force
//! replacement or carry computed values forward.

use crate::errors::Diagnostic;
use serde_json::Value;
use std::collections::BTreeMap;

/// Attribute value type.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    /// UTF-8 string.
    String,
    /// Integer.
    Int,
    /// Boolean.
    Bool,
    /// Ordered list.
    List(Box<AttributeType>),
    /// Unordered collection of unique elements.
    Set(Box<AttributeType>),
    /// String-keyed map.
    Map(Box<AttributeType>),
    /// Nested block with named fields.
    Object(BTreeMap<String, Attribute>),
}

impl AttributeType {
    /// `List(String)`.
    pub fn string_list() -> Self {
        Self::List(Box::new(Self::String))
    }

    /// `Set(String)`.
    pub fn string_set() -> Self {
        Self::Set(Box::new(Self::String))
    }

    /// `Set(Int)`.
    pub fn int_set() -> Self {
        Self::Set(Box::new(Self::Int))
    }

    /// `Map(String)`.
    pub fn string_map() -> Self {
        Self::Map(Box::new(Self::String))
    }

    /// Nested object from `(name, attribute)` pairs.
    pub fn object<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Attribute)>,
    {
        Self::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "number",
            Self::Bool => "bool",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
        }
    }

    /// Compares two values under this type. Sets ignore element order; null
    /// and an empty collection are equal.
    pub fn values_equal(&self, a: &Value, b: &Value) -> bool {
        match self {
            Self::List(elem) => {
                let (a, b) = (as_items(a), as_items(b));
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| elem.values_equal(x, y))
            }
            Self::Set(elem) => {
                let (a, b) = (as_items(a), as_items(b));
                a.len() == b.len()
                    && a.iter().all(|x| b.iter().any(|y| elem.values_equal(x, y)))
                    && b.iter().all(|y| a.iter().any(|x| elem.values_equal(x, y)))
            }
            Self::Map(elem) => {
                let empty = serde_json::Map::new();
                let a = a.as_object().unwrap_or(&empty);
                let b = b.as_object().unwrap_or(&empty);
                a.len() == b.len()
                    && a.iter().all(|(k, x)| b.get(k).map_or(false, |y| elem.values_equal(x, y)))
            }
            Self::Object(fields) => {
                if a.is_null() || b.is_null() {
                    return a.is_null() && b.is_null();
                }
                fields.iter().all(|(name, attr)| {
                    let x = a.get(name).unwrap_or(&Value::Null);
                    let y = b.get(name).unwrap_or(&Value::Null);
                    // Nested computed values are unknown until apply.
                    (attr.computed && (x.is_null() || y.is_null()))
                        || attr.attr_type.values_equal(x, y)
                })
            }
            _ => a == b,
        }
    }

    fn check(&self, path: &str, value: &Value, diags: &mut Vec<Diagnostic>) {
        if value.is_null() {
            return;
        }

        let matches = match self {
            Self::String => value.is_string(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Bool => value.is_boolean(),
            Self::List(_) | Self::Set(_) => value.is_array(),
            Self::Map(_) | Self::Object(_) => value.is_object(),
        };
        if !matches {
            diags.push(
                Diagnostic::error("Incorrect attribute value type")
                    .with_detail(format!("expected {}", self.name()))
                    .with_attribute(path),
            );
            return;
        }

        match self {
            Self::List(elem) | Self::Set(elem) => {
                for (i, item) in as_items(value).iter().enumerate() {
                    elem.check(&format!("{}[{}]", path, i), item, diags);
                }
            }
            Self::Map(elem) => {
                if let Some(map) = value.as_object() {
                    for (k, v) in map {
                        elem.check(&format!("{}.{}", path, k), v, diags);
                    }
                }
            }
            Self::Object(fields) => validate_object(fields, path, value, diags),
            _ => {}
        }
    }
}

fn as_items(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or(&[])
}

/// Value check applied to configured attribute values.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    /// String must be one of the listed values.
    OneOf(Vec<&'static str>),
    /// String must match the pattern.
    Regex {
        /// Regular expression.
        pattern: &'static str,
        /// Error shown when the value does not match.
        message: &'static str,
    },
    /// String length (in characters) must be within the inclusive range.
    LengthBetween(usize, usize),
    /// Integer must be within the inclusive range.
    IntBetween(i64, i64),
    /// String must not start with the prefix, compared case-insensitively.
    NotPrefix(&'static str),
}

impl Validator {
    /// Checks `value`, returning an error diagnostic on failure. Values of the
    /// wrong type are left to the type check.
    pub fn check(&self, path: &str, value: &Value) -> Option<Diagnostic> {
        let failure = match (self, value) {
            (Self::OneOf(allowed), Value::String(s)) if !allowed.contains(&s.as_str()) => {
                Some(format!("expected one of {:?}, got {:?}", allowed, s))
            }
            (Self::Regex { pattern, message }, Value::String(s)) => {
                match regex::Regex::new(pattern) {
                    Ok(re) if re.is_match(s) => None,
                    Ok(_) => Some(message.to_string()),
                    Err(e) => Some(format!("invalid pattern {:?}: {}", pattern, e)),
                }
            }
            (Self::LengthBetween(min, max), Value::String(s)) => {
                let len = s.chars().count();
                (len < *min || len > *max)
                    .then(|| format!("length must be between {} and {}, got {}", min, max, len))
            }
            (Self::IntBetween(min, max), Value::Number(n)) => match n.as_i64() {
                Some(v) if v >= *min && v <= *max => None,
                _ => Some(format!("must be between {} and {}, got {}", min, max, n)),
            },
            (Self::NotPrefix(prefix), Value::String(s))
                if s.to_ascii_uppercase().starts_with(&prefix.to_ascii_uppercase()) =>
            {
                Some(format!("must not start with {:?}", prefix))
            }
            _ => None,
        };

        failure.map(|detail| {
            Diagnostic::error("Invalid attribute value")
                .with_detail(detail)
                .with_attribute(path)
        })
    }
}

/// Planning behaviour attached to an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanModifier {
    /// Any change to the attribute destroys and recreates the resource.
    RequiresReplace,
    /// An unknown computed value keeps its prior state value.
    UseStateForUnknown,
}

/// A single schema attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Value type.
    pub attr_type: AttributeType,
    /// Must be set in configuration.
    pub required: bool,
    /// May be set in configuration.
    pub optional: bool,
    /// Set by the provider.
    pub computed: bool,
    /// Hidden from plan output.
    pub sensitive: bool,
    /// Human readable description.
    pub description: String,
    /// Deprecation message, if deprecated.
    pub deprecation: Option<String>,
    /// Value used when configuration leaves the attribute unset.
    pub default: Option<Value>,
    /// Value checks.
    pub validators: Vec<Validator>,
    /// Planning behaviour.
    pub plan_modifiers: Vec<PlanModifier>,
    /// Sibling attributes that may not be set together with this one.
    pub conflicts_with: Vec<&'static str>,
}

impl Attribute {
    fn base(attr_type: AttributeType, required: bool, optional: bool, computed: bool) -> Self {
        Self {
            attr_type,
            required,
            optional,
            computed,
            sensitive: false,
            description: String::new(),
            deprecation: None,
            default: None,
            validators: Vec::new(),
            plan_modifiers: Vec::new(),
            conflicts_with: Vec::new(),
        }
    }

    /// Required attribute.
    pub fn required(attr_type: AttributeType) -> Self {
        Self::base(attr_type, true, false, false)
    }

    /// Optional attribute.
    pub fn optional(attr_type: AttributeType) -> Self {
        Self::base(attr_type, false, true, false)
    }

    /// Read-only attribute set by the provider.
    pub fn computed(attr_type: AttributeType) -> Self {
        Self::base(attr_type, false, false, true)
    }

    /// Optional attribute the provider fills in when unset.
    pub fn optional_computed(attr_type: AttributeType) -> Self {
        Self::base(attr_type, false, true, true)
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Masks the value in plan output.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Warns with `message` whenever the attribute is configured.
    pub fn deprecated(mut self, message: impl Into<String>) -> Self {
        self.deprecation = Some(message.into());
        self
    }

    /// Sets a default. Attributes with a default are computed so the planned
    /// value can differ from configuration.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self.computed = true;
        self
    }

    /// Adds a check on configured values.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Marks the attribute as forcing replacement.
    pub fn force_new(mut self) -> Self {
        self.plan_modifiers.push(PlanModifier::RequiresReplace);
        self
    }

    /// Plans the prior state value instead of unknown.
    pub fn use_state_for_unknown(mut self) -> Self {
        self.plan_modifiers.push(PlanModifier::UseStateForUnknown);
        self
    }

    /// Rejects configuration setting this attribute together with any of `names`.
    pub fn conflicts_with(mut self, names: &[&'static str]) -> Self {
        self.conflicts_with.extend_from_slice(names);
        self
    }

    /// True when changing this attribute replaces the resource.
    pub fn requires_replace(&self) -> bool {
        self.plan_modifiers.contains(&PlanModifier::RequiresReplace)
    }

    /// True when an unknown computed value keeps the prior state value.
    pub fn keeps_state_for_unknown(&self) -> bool {
        self.plan_modifiers.contains(&PlanModifier::UseStateForUnknown)
    }

    /// True when configuration may not set this attribute.
    pub fn is_read_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// Schema of a resource, data source or the provider block.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Human readable description.
    pub description: String,
    /// Top-level attributes.
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Creates a schema with the computed `id` every resource carries.
    pub fn resource(description: impl Into<String>) -> Self {
        Self::new(description).with_attribute(
            "id",
            Attribute::computed(AttributeType::String)
                .description("Resource identifier.")
                .use_state_for_unknown(),
        )
    }

    /// Creates a schema with a computed `id` for data sources.
    pub fn data_source(description: impl Into<String>) -> Self {
        Self::new(description).with_attribute(
            "id",
            Attribute::computed(AttributeType::String).description("Data source identifier."),
        )
    }

    /// Adds or replaces an attribute.
    pub fn with_attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    /// Looks up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Validates a configuration object.
    pub fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        if !config.is_object() && !config.is_null() {
            diags.push(Diagnostic::error("Configuration must be an object"));
            return diags;
        }
        validate_object(&self.attributes, "", config, &mut diags);
        diags
    }

    /// Fills unset attributes that have defaults, including inside nested
    /// blocks.
    pub fn apply_defaults(&self, config: &Value) -> Value {
        apply_defaults(&self.attributes, config)
    }
}

fn apply_defaults(attributes: &BTreeMap<String, Attribute>, value: &Value) -> Value {
    let mut out = match value {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    for (name, attr) in attributes {
        match out.get_mut(name) {
            Some(current) if !current.is_null() => match &attr.attr_type {
                AttributeType::Object(fields) => *current = apply_defaults(fields, current),
                AttributeType::List(elem) | AttributeType::Set(elem) => {
                    if let (AttributeType::Object(fields), Value::Array(items)) =
                        (elem.as_ref(), current)
                    {
                        for item in items.iter_mut() {
                            *item = apply_defaults(fields, item);
                        }
                    }
                }
                _ => {}
            },
            _ => {
                if let Some(ref default) = attr.default {
                    out.insert(name.clone(), default.clone());
                }
            }
        }
    }
    Value::Object(out)
}

fn validate_object(
    attributes: &BTreeMap<String, Attribute>,
    prefix: &str,
    value: &Value,
    diags: &mut Vec<Diagnostic>,
) {
    let path = |name: &str| {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        }
    };
    let empty = serde_json::Map::new();
    let map = value.as_object().unwrap_or(&empty);

    for key in map.keys() {
        if !attributes.contains_key(key) {
            diags.push(
                Diagnostic::error("Unsupported argument")
                    .with_detail(format!("an argument named {:?} is not expected here", key))
                    .with_attribute(path(key)),
            );
        }
    }

    for (name, attr) in attributes {
        let value = map.get(name).unwrap_or(&Value::Null);
        let attr_path = path(name);

        if value.is_null() {
            if attr.required {
                diags.push(
                    Diagnostic::error("Missing required argument")
                        .with_detail(format!("the argument {:?} is required", name))
                        .with_attribute(attr_path),
                );
            }
            continue;
        }

        if attr.is_read_only() {
            diags.push(
                Diagnostic::error("Value for unconfigurable attribute")
                    .with_detail(format!("{:?} is computed and cannot be set", name))
                    .with_attribute(attr_path),
            );
            continue;
        }

        if let Some(ref message) = attr.deprecation {
            diags.push(
                Diagnostic::warning("Argument is deprecated")
                    .with_detail(message.clone())
                    .with_attribute(attr_path.clone()),
            );
        }

        for other in &attr.conflicts_with {
            if map.get(*other).map_or(false, |v| !v.is_null()) {
                diags.push(
                    Diagnostic::error("Conflicting configuration arguments")
                        .with_detail(format!(
                            "{:?} cannot be specified when {:?} is specified",
                            name, other
                        ))
                        .with_attribute(attr_path.clone()),
                );
            }
        }

        let before = diags.len();
        attr.attr_type.check(&attr_path, value, diags);
        if diags.len() != before {
            continue;
        }

        for validator in &attr.validators {
            let targets: Vec<(String, &Value)> = match &attr.attr_type {
                AttributeType::List(_) | AttributeType::Set(_) => as_items(value)
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (format!("{}[{}]", attr_path, i), v))
                    .collect(),
                _ => vec![(attr_path.clone(), value)],
            };
            diags.extend(targets.into_iter().filter_map(|(p, v)| validator.check(&p, v)));
        }
    }
}

/// Full provider schema: the provider block plus every registered type.
#[derive(Debug, Clone)]
pub struct ProviderSchema {
    /// Provider configuration block.
    pub provider: Schema,
    /// Resource schemas by type name.
    pub resources: BTreeMap<String, Schema>,
    /// Data source schemas by type name.
    pub data_sources: BTreeMap<String, Schema>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn schema() -> Schema {
        Schema::resource("test")
            .with_attribute("name", Attribute::required(AttributeType::String).force_new())
            .with_attribute(
                "permission",
                Attribute::optional(AttributeType::String)
                    .default_value(json!("push"))
                    .validator(Validator::OneOf(vec!["pull", "push", "admin"])),
            )
            .with_attribute("topics", Attribute::optional(AttributeType::string_set()))
            .with_attribute(
                "plaintext_value",
                Attribute::optional(AttributeType::String)
                    .sensitive()
                    .conflicts_with(&["encrypted_value"]),
            )
            .with_attribute("encrypted_value", Attribute::optional(AttributeType::String))
            .with_attribute("node_id", Attribute::computed(AttributeType::String))
            .with_attribute(
                "reviewers",
                Attribute::optional(AttributeType::object([
                    ("users", Attribute::optional(AttributeType::int_set())),
                    (
                        "count",
                        Attribute::optional(AttributeType::Int)
                            .validator(Validator::IntBetween(0, 6)),
                    ),
                ])),
            )
    }

    #[test]
    fn test_valid_config() {
        let diags =
            schema().validate(&json!({"name": "repo", "permission": "pull", "topics": ["a"]}));
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test_case(json!({}), "Missing required argument" ; "missing required")]
    #[test_case(json!({"name": "r", "bogus": 1}), "Unsupported argument" ; "unknown attribute")]
    #[test_case(json!({"name": 5}), "Incorrect attribute value type" ; "type mismatch")]
    #[test_case(json!({"name": "r", "permission": "owner"}), "Invalid attribute value" ; "one of")]
    #[test_case(json!({"name": "r", "node_id": "x"}), "Value for unconfigurable attribute" ; "computed set")]
    #[test_case(json!({"name": "r", "plaintext_value": "a", "encrypted_value": "b"}), "Conflicting configuration arguments" ; "conflicts")]
    #[test_case(json!({"name": "r", "reviewers": {"count": 9}}), "Invalid attribute value" ; "nested validator")]
    #[test_case(json!({"name": "r", "reviewers": {"users": ["x"]}}), "Incorrect attribute value type" ; "nested type")]
    fn test_invalid_config(config: Value, summary: &str) {
        let diags = schema().validate(&config);
        assert!(diags.iter().any(|d| d.summary == summary), "{:?}", diags);
    }

    #[test]
    fn test_regex_and_prefix_validators() {
        let name = Validator::Regex {
            pattern: "^[A-Za-z0-9_]+$",
            message: "only alphanumeric characters or underscores",
        };
        assert!(name.check("n", &json!("MY_SECRET")).is_none());
        assert!(name.check("n", &json!("my-secret")).is_some());

        let prefix = Validator::NotPrefix("GITHUB_");
        assert!(prefix.check("n", &json!("github_token")).is_some());
        assert!(prefix.check("n", &json!("TOKEN")).is_none());

        let len = Validator::LengthBetween(1, 3);
        assert!(len.check("n", &json!("")).is_some());
        assert!(len.check("n", &json!("abc")).is_none());
    }

    #[test]
    fn test_apply_defaults() {
        let config = schema().apply_defaults(&json!({"name": "r"}));
        assert_eq!(config["permission"], json!("push"));
        assert_eq!(config["name"], json!("r"));
    }

    #[test]
    fn test_apply_defaults_nested() {
        let schema = Schema::new("x").with_attribute(
            "user",
            Attribute::optional(AttributeType::Set(Box::new(AttributeType::object([
                ("username", Attribute::required(AttributeType::String)),
                (
                    "permission",
                    Attribute::optional(AttributeType::String).default_value(json!("push")),
                ),
            ])))),
        );
        let config = schema.apply_defaults(&json!({
            "user": [{"username": "a"}, {"username": "b", "permission": "pull"}]
        }));
        assert_eq!(config["user"][0]["permission"], json!("push"));
        assert_eq!(config["user"][1]["permission"], json!("pull"));
    }

    #[test]
    fn test_set_equality_ignores_order() {
        let ty = AttributeType::string_set();
        assert!(ty.values_equal(&json!(["a", "b"]), &json!(["b", "a"])));
        assert!(ty.values_equal(&json!([]), &Value::Null));
        assert!(!ty.values_equal(&json!(["a"]), &json!(["a", "b"])));

        let list = AttributeType::string_list();
        assert!(!list.values_equal(&json!(["a", "b"]), &json!(["b", "a"])));
    }

    #[test]
    fn test_object_equality_skips_unknown_computed_fields() {
        let ty = AttributeType::Set(Box::new(AttributeType::object([
            ("name", Attribute::required(AttributeType::String)),
            ("description", Attribute::optional(AttributeType::String)),
            ("url", Attribute::computed(AttributeType::String)),
        ])));
        let state = json!([{"name": "bug", "description": null, "url": "https://example.com/bug"}]);

        assert!(ty.values_equal(&state, &json!([{"name": "bug"}])));
        assert!(!ty.values_equal(&state, &json!([{"name": "bug", "description": "x"}])));
        let moved = json!([{"name": "bug", "url": "https://example.com/other"}]);
        assert!(!ty.values_equal(&state, &moved));
    }

    #[test]
    fn test_resource_schema_has_id() {
        let schema = Schema::resource("x");
        let id = schema.attribute("id").unwrap();
        assert!(id.is_read_only());
        assert!(id.keeps_state_for_unknown());
    }
}
