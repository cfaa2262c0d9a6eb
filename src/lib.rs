//! # Atelier
//!
//! A self-hostable portfolio CMS backend: projects, blog posts, tags,
//! tech-stack entries, and user auth, with optional synchronization of
//! projects against the owner's GitHub repositories.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! atelier = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use atelier::server::{AppState, create_router};
//! use atelier::store::SqliteStore;
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/atelier.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState {
//!     store: Arc::new(store),
//!     github: None,
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the server binary's CLI. Disable with
//!   `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod github;
pub mod server;
pub mod store;
pub mod types;
