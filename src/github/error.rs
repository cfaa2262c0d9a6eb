use thiserror::Error;

/// Errors from talking to the GitHub REST API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// The access token was rejected when the client connected.
    #[error("GitHub rejected the access token (HTTP {status})")]
    Authentication { status: u16 },

    /// The API answered with a non-success status.
    #[error("GitHub API returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("GitHub request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Errors from the synchronization service.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] GitHubError),

    /// Repository data could not be fetched during a project sync.
    #[error("failed to fetch repository data: {0}")]
    Fetch(String),

    #[error("repository URL '{0}' has no owner/name path")]
    MalformedRepoUrl(String),

    #[error(transparent)]
    Store(#[from] crate::error::Error),
}
