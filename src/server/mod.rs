pub mod accounts;
pub mod dto;
pub mod post_relations;
pub mod posts;
pub mod project_github;
pub mod project_relations;
pub mod projects;
pub mod response;
mod router;
pub mod tags;
pub mod tech_stack;
pub mod validation;

pub use router::{AppState, create_router};
