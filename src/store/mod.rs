mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn update_user_last_login(&self, id: &str) -> Result<()>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Project operations
    fn create_project(&self, project: &Project) -> Result<()>;
    fn get_project(&self, id: &str) -> Result<Option<Project>>;
    fn get_project_by_repo_url(&self, repo_url: &str) -> Result<Option<Project>>;
    fn list_projects(&self, cursor: &str, limit: i32) -> Result<Vec<Project>>;
    fn list_project_repo_urls(&self) -> Result<Vec<String>>;
    fn update_project(&self, project: &Project) -> Result<()>;
    fn delete_project(&self, id: &str) -> Result<bool>;

    // Tag operations
    fn create_tag(&self, tag: &Tag) -> Result<()>;
    fn get_tag(&self, id: &str) -> Result<Option<Tag>>;
    fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>>;
    fn list_tags(&self, cursor: &str, limit: i32) -> Result<Vec<Tag>>;
    fn update_tag(&self, tag: &Tag) -> Result<()>;
    fn delete_tag(&self, id: &str) -> Result<bool>;
    fn count_tag_usage(&self, id: &str) -> Result<i32>;

    // TechStack operations
    fn create_tech_stack(&self, tech: &TechStack) -> Result<()>;
    fn get_tech_stack(&self, id: &str) -> Result<Option<TechStack>>;
    fn get_tech_stack_by_name(&self, name: &str) -> Result<Option<TechStack>>;
    fn list_tech_stack(&self, cursor: &str, limit: i32) -> Result<Vec<TechStack>>;
    fn update_tech_stack(&self, tech: &TechStack) -> Result<()>;
    fn delete_tech_stack(&self, id: &str) -> Result<bool>;
    fn count_tech_stack_usage(&self, id: &str) -> Result<i32>;

    // Project-Tag M2M operations
    fn add_project_tag(&self, project_id: &str, tag_id: &str) -> Result<()>;
    fn remove_project_tag(&self, project_id: &str, tag_id: &str) -> Result<bool>;
    fn toggle_project_tag(&self, project_id: &str, tag_id: &str) -> Result<bool>;
    fn set_project_tags(&self, project_id: &str, tag_ids: &[String]) -> Result<()>;
    fn list_project_tags(&self, project_id: &str) -> Result<Vec<Tag>>;

    // Project-TechStack M2M operations
    fn add_project_tech(&self, project_id: &str, tech_id: &str) -> Result<()>;
    fn remove_project_tech(&self, project_id: &str, tech_id: &str) -> Result<bool>;
    fn toggle_project_tech(&self, project_id: &str, tech_id: &str) -> Result<bool>;
    fn set_project_tech(&self, project_id: &str, tech_ids: &[String]) -> Result<()>;
    fn list_project_tech(&self, project_id: &str) -> Result<Vec<TechStack>>;

    // Post operations
    fn create_post(&self, post: &Post) -> Result<()>;
    fn get_post(&self, id: &str) -> Result<Option<Post>>;
    fn list_posts(&self, cursor: &str, limit: i32) -> Result<Vec<Post>>;
    fn update_post(&self, post: &Post) -> Result<()>;
    fn delete_post(&self, id: &str) -> Result<bool>;

    // Post-Project M2M operations
    fn add_post_project(&self, post_id: &str, project_id: &str) -> Result<()>;
    fn remove_post_project(&self, post_id: &str, project_id: &str) -> Result<bool>;
    fn toggle_post_project(&self, post_id: &str, project_id: &str) -> Result<bool>;
    fn set_post_projects(&self, post_id: &str, project_ids: &[String]) -> Result<()>;
    fn list_post_projects(&self, post_id: &str) -> Result<Vec<Project>>;

    // Post-Tag M2M operations
    fn add_post_tag(&self, post_id: &str, tag_id: &str) -> Result<()>;
    fn remove_post_tag(&self, post_id: &str, tag_id: &str) -> Result<bool>;
    fn toggle_post_tag(&self, post_id: &str, tag_id: &str) -> Result<bool>;
    fn set_post_tags(&self, post_id: &str, tag_ids: &[String]) -> Result<()>;
    fn list_post_tags(&self, post_id: &str) -> Result<Vec<Tag>>;

    // Post-TechStack M2M operations
    fn add_post_tech(&self, post_id: &str, tech_id: &str) -> Result<()>;
    fn remove_post_tech(&self, post_id: &str, tech_id: &str) -> Result<bool>;
    fn toggle_post_tech(&self, post_id: &str, tech_id: &str) -> Result<bool>;
    fn set_post_tech(&self, post_id: &str, tech_ids: &[String]) -> Result<()>;
    fn list_post_tech(&self, post_id: &str) -> Result<Vec<TechStack>>;

    fn close(&self) -> Result<()>;
}
