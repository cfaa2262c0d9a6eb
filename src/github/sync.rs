use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::client::GitHubApi;
use super::error::SyncError;
use super::types::RemoteRepository;
use crate::store::Store;
use crate::types::{Project, ProjectStatus, Tag, TechStack};

/// Initial field set for a project created from a remote repository.
/// Handed to the regular creation path; the sync service never persists
/// projects itself.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    pub status: ProjectStatus,
    pub repo_url: String,
    pub date_created: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

/// Reconciles local projects against the owner's GitHub repositories.
pub struct SyncService {
    github: Arc<dyn GitHubApi>,
    store: Arc<dyn Store>,
}

impl SyncService {
    pub fn new(github: Arc<dyn GitHubApi>, store: Arc<dyn Store>) -> Self {
        Self { github, store }
    }

    /// Remote repositories that no persisted project tracks yet, in the
    /// order the remote listing returned them.
    pub async fn available_repositories(&self) -> Result<Vec<RemoteRepository>, SyncError> {
        let remote = self.github.list_repositories().await?;
        let tracked: HashSet<String> = self.store.list_project_repo_urls()?.into_iter().collect();

        Ok(remote
            .into_iter()
            .filter(|repo| !tracked.contains(&repo.html_url))
            .collect())
    }

    /// Fetches one repository and maps it to a creation payload. A null
    /// remote description collapses to an empty string.
    pub async fn prepare_creation_data(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<ProjectDraft, SyncError> {
        let repo = self.github.get_repository(owner, name).await?;
        Ok(draft_from_remote(repo))
    }

    /// Refreshes a project's title, description, and last-update timestamp
    /// from the remote repository and persists the result. `repo_url`,
    /// `date_created`, the owning user, and `status` stay as they were.
    pub async fn sync_project(&self, mut project: Project) -> Result<Project, SyncError> {
        let (owner, name) = owner_and_name(&project.repo_url)?;

        let repo = self
            .github
            .get_repository(&owner, &name)
            .await
            .map_err(|e| SyncError::Fetch(e.to_string()))?;

        project.title = repo.name;
        project.description = repo.description.unwrap_or_default();
        project.last_update = repo.updated_at;

        self.store.update_project(&project)?;
        Ok(project)
    }

    /// Ensures a TechStack association for every language the remote
    /// reports. Existing associations are never removed.
    pub async fn sync_languages(&self, project: &Project) -> Result<Vec<TechStack>, SyncError> {
        let (owner, name) = owner_and_name(&project.repo_url)?;
        let languages = self.github.get_languages(&owner, &name).await?;

        let mut linked = Vec::with_capacity(languages.len());
        for language in languages.keys() {
            let tech = self.get_or_create_tech(language)?;
            self.store.add_project_tech(&project.id, &tech.id)?;
            linked.push(tech);
        }
        Ok(linked)
    }

    /// Ensures a Tag association for every topic on the remote repository.
    /// Topic strings are used verbatim as tag names. Additive only.
    pub async fn sync_topics(&self, project: &Project) -> Result<Vec<Tag>, SyncError> {
        let (owner, name) = owner_and_name(&project.repo_url)?;
        let repo = self.github.get_repository(&owner, &name).await?;

        let mut linked = Vec::with_capacity(repo.topics.len());
        for topic in &repo.topics {
            let tag = self.get_or_create_tag(topic)?;
            self.store.add_project_tag(&project.id, &tag.id)?;
            linked.push(tag);
        }
        Ok(linked)
    }

    fn get_or_create_tag(&self, name: &str) -> Result<Tag, crate::error::Error> {
        if let Some(tag) = self.store.get_tag_by_name(name)? {
            return Ok(tag);
        }

        let tag = Tag {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        match self.store.create_tag(&tag) {
            Ok(()) => Ok(tag),
            // Lost a create race; the row exists now.
            Err(crate::error::Error::AlreadyExists) => Ok(self
                .store
                .get_tag_by_name(name)?
                .ok_or(crate::error::Error::NotFound)?),
            Err(e) => Err(e),
        }
    }

    fn get_or_create_tech(&self, name: &str) -> Result<TechStack, crate::error::Error> {
        if let Some(tech) = self.store.get_tech_stack_by_name(name)? {
            return Ok(tech);
        }

        let tech = TechStack {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        match self.store.create_tech_stack(&tech) {
            Ok(()) => Ok(tech),
            Err(crate::error::Error::AlreadyExists) => Ok(self
                .store
                .get_tech_stack_by_name(name)?
                .ok_or(crate::error::Error::NotFound)?),
            Err(e) => Err(e),
        }
    }
}

fn draft_from_remote(repo: RemoteRepository) -> ProjectDraft {
    ProjectDraft {
        title: repo.name,
        description: repo.description.unwrap_or_default(),
        status: ProjectStatus::InDevelopment,
        repo_url: repo.html_url,
        date_created: repo.created_at,
        last_update: repo.updated_at,
    }
}

/// Derives (owner, name) from a repository URL: the last two `/`-separated
/// segments, ignoring any trailing slash.
pub fn owner_and_name(repo_url: &str) -> Result<(String, String), SyncError> {
    let trimmed = repo_url.trim_end_matches('/');
    let mut segments = trimmed.rsplit('/');

    match (segments.next(), segments.next()) {
        (Some(name), Some(owner)) if !name.is_empty() && !owner.is_empty() => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(SyncError::MalformedRepoUrl(repo_url.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    use crate::github::{GitHubError, LanguageBreakdown};
    use crate::types::User;

    struct FakeGitHub {
        repositories: Vec<RemoteRepository>,
        languages: LanguageBreakdown,
        fail: bool,
    }

    impl FakeGitHub {
        fn with_repositories(repositories: Vec<RemoteRepository>) -> Self {
            Self {
                repositories,
                languages: BTreeMap::new(),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                repositories: Vec::new(),
                languages: BTreeMap::new(),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl GitHubApi for FakeGitHub {
        async fn list_repositories(&self) -> Result<Vec<RemoteRepository>, GitHubError> {
            if self.fail {
                return Err(GitHubError::Status {
                    status: 500,
                    url: "https://api.github.com/user/repos".to_string(),
                });
            }
            Ok(self.repositories.clone())
        }

        async fn get_repository(
            &self,
            _owner: &str,
            name: &str,
        ) -> Result<RemoteRepository, GitHubError> {
            if self.fail {
                return Err(GitHubError::Status {
                    status: 500,
                    url: format!("https://api.github.com/repos/_/{name}"),
                });
            }
            self.repositories
                .iter()
                .find(|r| r.name == name)
                .cloned()
                .ok_or(GitHubError::Status {
                    status: 404,
                    url: format!("https://api.github.com/repos/_/{name}"),
                })
        }

        async fn get_languages(
            &self,
            _owner: &str,
            _name: &str,
        ) -> Result<LanguageBreakdown, GitHubError> {
            if self.fail {
                return Err(GitHubError::Status {
                    status: 500,
                    url: "https://api.github.com/repos/_/_/languages".to_string(),
                });
            }
            Ok(self.languages.clone())
        }
    }

    fn remote_repo(name: &str, url: &str) -> RemoteRepository {
        RemoteRepository {
            name: name.to_string(),
            description: Some(format!("{name} description")),
            html_url: url.to_string(),
            language: Some("Rust".to_string()),
            topics: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_setup() -> (TempDir, Arc<SqliteStore>, User) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();

        let user = User {
            id: "user-1".to_string(),
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "$argon2id$fake".to_string(),
            date_joined: Utc::now(),
            last_login: None,
        };
        store.create_user(&user).unwrap();

        (temp, Arc::new(store), user)
    }

    fn tracked_project(store: &SqliteStore, user: &User, repo_url: &str) -> Project {
        let project = Project {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            title: "Old title".to_string(),
            description: "Old description".to_string(),
            status: ProjectStatus::Completed,
            repo_url: repo_url.to_string(),
            deploy_url: None,
            date_created: Utc::now() - chrono::Duration::days(90),
            last_update: Utc::now() - chrono::Duration::days(30),
        };
        store.create_project(&project).unwrap();
        project
    }

    #[test]
    fn test_owner_and_name_from_url() {
        let (owner, name) = owner_and_name("https://github.com/jdoe/portfolio").unwrap();
        assert_eq!(owner, "jdoe");
        assert_eq!(name, "portfolio");

        let (owner, name) = owner_and_name("https://github.com/jdoe/portfolio/").unwrap();
        assert_eq!(owner, "jdoe");
        assert_eq!(name, "portfolio");

        assert!(owner_and_name("no-slashes").is_err());
    }

    #[tokio::test]
    async fn test_available_repositories_filters_tracked() {
        let (_temp, store, user) = test_setup();
        tracked_project(&store, &user, "https://github.com/jdoe/repo-a");

        let github = FakeGitHub::with_repositories(vec![
            remote_repo("repo-a", "https://github.com/jdoe/repo-a"),
            remote_repo("repo-b", "https://github.com/jdoe/repo-b"),
            remote_repo("repo-c", "https://github.com/jdoe/repo-c"),
        ]);
        let service = SyncService::new(Arc::new(github), store);

        let available = service.available_repositories().await.unwrap();
        let names: Vec<&str> = available.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["repo-b", "repo-c"]);
    }

    #[tokio::test]
    async fn test_prepare_creation_data_collapses_null_description() {
        let (_temp, store, _user) = test_setup();

        let mut repo = remote_repo("fresh", "https://github.com/jdoe/fresh");
        repo.description = None;
        let service = SyncService::new(Arc::new(FakeGitHub::with_repositories(vec![repo])), store);

        let draft = service.prepare_creation_data("jdoe", "fresh").await.unwrap();
        assert_eq!(draft.title, "fresh");
        assert_eq!(draft.description, "");
        assert_eq!(draft.status, ProjectStatus::InDevelopment);
        assert_eq!(draft.repo_url, "https://github.com/jdoe/fresh");
    }

    #[tokio::test]
    async fn test_sync_project_preserves_identity_fields() {
        let (_temp, store, user) = test_setup();
        let project = tracked_project(&store, &user, "https://github.com/jdoe/portfolio");
        let original_created = project.date_created;

        let remote = remote_repo("portfolio", "https://github.com/jdoe/portfolio");
        let remote_updated = remote.updated_at;
        let service = SyncService::new(
            Arc::new(FakeGitHub::with_repositories(vec![remote])),
            store.clone(),
        );

        let synced = service.sync_project(project.clone()).await.unwrap();
        assert_eq!(synced.title, "portfolio");
        assert_eq!(synced.description, "portfolio description");
        assert_eq!(synced.last_update, remote_updated);

        let persisted = store.get_project(&project.id).unwrap().unwrap();
        assert_eq!(persisted.status, ProjectStatus::Completed);
        assert_eq!(persisted.repo_url, "https://github.com/jdoe/portfolio");
        assert_eq!(persisted.user_id, user.id);
        assert_eq!(
            persisted.date_created.timestamp(),
            original_created.timestamp()
        );
        assert_eq!(persisted.title, "portfolio");
    }

    #[tokio::test]
    async fn test_sync_project_wraps_remote_failure() {
        let (_temp, store, user) = test_setup();
        let project = tracked_project(&store, &user, "https://github.com/jdoe/portfolio");

        let service = SyncService::new(Arc::new(FakeGitHub::failing()), store);

        let err = service.sync_project(project).await.unwrap_err();
        assert!(matches!(err, SyncError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_available_repositories_propagates_remote_failure() {
        let (_temp, store, _user) = test_setup();
        let service = SyncService::new(Arc::new(FakeGitHub::failing()), store);

        let err = service.available_repositories().await.unwrap_err();
        assert!(matches!(err, SyncError::Remote(_)));
    }

    #[tokio::test]
    async fn test_sync_languages_idempotent() {
        let (_temp, store, user) = test_setup();
        let project = tracked_project(&store, &user, "https://github.com/jdoe/portfolio");

        let mut github = FakeGitHub::with_repositories(vec![remote_repo(
            "portfolio",
            "https://github.com/jdoe/portfolio",
        )]);
        github.languages = BTreeMap::from([
            ("Python".to_string(), 33495u64),
            ("JavaScript".to_string(), 5000u64),
        ]);
        let service = SyncService::new(Arc::new(github), store.clone());

        service.sync_languages(&project).await.unwrap();
        service.sync_languages(&project).await.unwrap();

        let tech = store.list_project_tech(&project.id).unwrap();
        let names: Vec<&str> = tech.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["JavaScript", "Python"]);
    }

    #[tokio::test]
    async fn test_sync_topics_additive() {
        let (_temp, store, user) = test_setup();
        let project = tracked_project(&store, &user, "https://github.com/jdoe/portfolio");

        // Pre-existing association unrelated to the remote topic list
        let manual = Tag {
            id: "tag-manual".to_string(),
            name: "hand-picked".to_string(),
        };
        store.create_tag(&manual).unwrap();
        store.add_project_tag(&project.id, &manual.id).unwrap();

        let mut remote = remote_repo("portfolio", "https://github.com/jdoe/portfolio");
        remote.topics = vec!["django".to_string(), "portfolio".to_string()];
        let service = SyncService::new(
            Arc::new(FakeGitHub::with_repositories(vec![remote])),
            store.clone(),
        );

        service.sync_topics(&project).await.unwrap();

        let tags = store.list_project_tags(&project.id).unwrap();
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["django", "hand-picked", "portfolio"]);
    }
}
