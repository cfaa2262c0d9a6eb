//! GitHub REST API client and repository synchronization.

mod client;
mod error;
mod sync;
mod types;

pub use client::{GitHubApi, GitHubClient};
pub use error::{GitHubError, SyncError};
pub use sync::{ProjectDraft, SyncService, owner_and_name};
pub use types::{LanguageBreakdown, RemoteRepository};
