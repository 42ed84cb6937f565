//! # GitHub Terraform Provider
//!
//! Manages GitHub organizations, repositories, teams and their settings as
//! declarative resources:
//! - Resource and data source schemas with validators and plan modifiers
//! - CRUD and import over the REST v3 and GraphQL v4 APIs
//! - Set reconciliation for collaborators, team members and labels
//! - Sealed-box encryption of Actions and Dependabot secrets
//! - Retries on a configurable status allowlist and write throttling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use terraform_provider_github::Provider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     terraform_provider_github::observability::init_logging();
//!
//!     let provider = Provider::new();
//!     provider
//!         .configure(&json!({"token": "ghp_xxxxxxxxxxxx", "owner": "acme"}))
//!         .await?;
//!
//!     let state = provider
//!         .read_data_source("github_repository", &json!({"name": "widgets"}))
//!         .await?;
//!     println!("{}", state["full_name"]);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod types;

// Authentication
pub mod auth;

// HTTP client and transport
pub mod client;

// Pagination handling
pub mod pagination;

// API Services
pub mod services;

// Resilience patterns
pub mod resilience;

// Observability
pub mod observability;

// Provider framework
pub mod encryption;
pub mod ids;
pub mod provider;
pub mod reconcile;
pub mod schema;

// Resource and data source implementations
pub mod data_sources;
pub mod resources;

// Re-exports for convenience
pub use auth::{AuthMethod, TokenSource};
pub use client::GitHubClient;
pub use config::{ProviderConfig, ProviderConfigBuilder, RetryConfig, ThrottleConfig};
pub use errors::{
    Diagnostic, GitHubError, GitHubErrorKind, GitHubResult, ProviderError, ProviderResult,
};
pub use provider::{DataSource, Owner, PlanAction, PlanResult, Provider, Resource};
pub use schema::{Attribute, AttributeType, Schema, Validator};
