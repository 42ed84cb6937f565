//! GitHub API service implementations.

mod actions;
mod collaborators;
mod environments;
mod git_data;
mod graphql;
mod hooks;
mod issues;
mod organizations;
mod repositories;
mod search;
mod users;

pub use actions::*;
pub use collaborators::*;
pub use environments::*;
pub use git_data::*;
pub use graphql::*;
pub use hooks::*;
pub use issues::*;
pub use organizations::*;
pub use repositories::*;
pub use search::*;
pub use users::*;
