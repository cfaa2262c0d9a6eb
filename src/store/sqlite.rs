use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_status(s: &str) -> ProjectStatus {
    ProjectStatus::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid project status in database: '{}'", s);
        ProjectStatus::default()
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        password_hash: row.get(5)?,
        date_joined: parse_datetime(&row.get::<_, String>(6)?),
        last_login: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        user_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        expires_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: parse_status(&row.get::<_, String>(4)?),
        repo_url: row.get(5)?,
        deploy_url: row.get(6)?,
        date_created: parse_datetime(&row.get::<_, String>(7)?),
        last_update: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        date_created: parse_datetime(&row.get::<_, String>(4)?),
        last_update: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password_hash, date_joined, last_login";
const TOKEN_COLUMNS: &str =
    "id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at";
const PROJECT_COLUMNS: &str =
    "id, user_id, title, description, status, repo_url, deploy_url, date_created, last_update";
const POST_COLUMNS: &str = "id, user_id, title, content, date_created, last_update";

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (id, username, email, first_name, last_name, password_hash, date_joined, last_login)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id,
                user.username,
                user.email,
                user.first_name,
                user.last_name,
                user.password_hash,
                format_datetime(&user.date_joined),
                user.last_login.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_user_last_login(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::TokenLookupCollision)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_lookup = ?1"),
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Project operations

    fn create_project(&self, project: &Project) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO projects (id, user_id, title, description, status, repo_url, deploy_url, date_created, last_update)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                project.id,
                project.user_id,
                project.title,
                project.description,
                project.status.as_str(),
                project.repo_url,
                project.deploy_url,
                format_datetime(&project.date_created),
                format_datetime(&project.last_update),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
            params![id],
            project_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_project_by_repo_url(&self, repo_url: &str) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE repo_url = ?1"),
            params![repo_url],
            project_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_projects(&self, cursor: &str, limit: i32) -> Result<Vec<Project>> {
        // Newest first; cursor is the date_created of the last row seen.
        let conn = self.conn();
        let mut stmt = if cursor.is_empty() {
            conn.prepare(&format!(
                "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY date_created DESC LIMIT ?1"
            ))?
        } else {
            conn.prepare(&format!(
                "SELECT {PROJECT_COLUMNS} FROM projects WHERE date_created < ?2
                 ORDER BY date_created DESC LIMIT ?1"
            ))?
        };

        let rows = if cursor.is_empty() {
            stmt.query_map(params![limit], project_from_row)?
        } else {
            stmt.query_map(params![limit, cursor], project_from_row)?
        };

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_project_repo_urls(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT repo_url FROM projects")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_project(&self, project: &Project) -> Result<()> {
        // repo_url, user_id and date_created are immutable once created.
        let rows = self.conn().execute(
            "UPDATE projects SET title = ?1, description = ?2, status = ?3, deploy_url = ?4, last_update = ?5
             WHERE id = ?6",
            params![
                project.title,
                project.description,
                project.status.as_str(),
                project.deploy_url,
                format_datetime(&project.last_update),
                project.id
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_project(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Tag operations

    fn create_tag(&self, tag: &Tag) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tags (id, name) VALUES (?1, ?2)",
            params![tag.id, tag.name],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_tag(&self, id: &str) -> Result<Option<Tag>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name FROM tags WHERE id = ?1",
            params![id],
            |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name FROM tags WHERE name = ?1",
            params![name],
            |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tags(&self, cursor: &str, limit: i32) -> Result<Vec<Tag>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, name FROM tags WHERE name > ?1 ORDER BY name LIMIT ?2")?;

        let rows = stmt.query_map(params![cursor, limit], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_tag(&self, tag: &Tag) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE tags SET name = ?1 WHERE id = ?2",
            params![tag.name, tag.id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_tag(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tags WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn count_tag_usage(&self, id: &str) -> Result<i32> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM project_tags WHERE tag_id = ?1)
                  + (SELECT COUNT(*) FROM post_tags WHERE tag_id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // TechStack operations

    fn create_tech_stack(&self, tech: &TechStack) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tech_stack (id, name) VALUES (?1, ?2)",
            params![tech.id, tech.name],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_tech_stack(&self, id: &str) -> Result<Option<TechStack>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name FROM tech_stack WHERE id = ?1",
            params![id],
            |row| {
                Ok(TechStack {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_tech_stack_by_name(&self, name: &str) -> Result<Option<TechStack>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name FROM tech_stack WHERE name = ?1",
            params![name],
            |row| {
                Ok(TechStack {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tech_stack(&self, cursor: &str, limit: i32) -> Result<Vec<TechStack>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, name FROM tech_stack WHERE name > ?1 ORDER BY name LIMIT ?2")?;

        let rows = stmt.query_map(params![cursor, limit], |row| {
            Ok(TechStack {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_tech_stack(&self, tech: &TechStack) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE tech_stack SET name = ?1 WHERE id = ?2",
            params![tech.name, tech.id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_tech_stack(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tech_stack WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn count_tech_stack_usage(&self, id: &str) -> Result<i32> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM project_tech_stack WHERE tech_stack_id = ?1)
                  + (SELECT COUNT(*) FROM post_tech_stack WHERE tech_stack_id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // Project-Tag M2M operations

    fn add_project_tag(&self, project_id: &str, tag_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO project_tags (project_id, tag_id) VALUES (?1, ?2)",
            params![project_id, tag_id],
        )?;
        Ok(())
    }

    fn remove_project_tag(&self, project_id: &str, tag_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM project_tags WHERE project_id = ?1 AND tag_id = ?2",
            params![project_id, tag_id],
        )?;
        Ok(rows > 0)
    }

    fn toggle_project_tag(&self, project_id: &str, tag_id: &str) -> Result<bool> {
        toggle_link(
            &mut self.conn(),
            "project_tags",
            "project_id",
            "tag_id",
            project_id,
            tag_id,
        )
    }

    fn set_project_tags(&self, project_id: &str, tag_ids: &[String]) -> Result<()> {
        replace_links(
            &mut self.conn(),
            "project_tags",
            "project_id",
            "tag_id",
            project_id,
            tag_ids,
        )
    }

    fn list_project_tags(&self, project_id: &str) -> Result<Vec<Tag>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name
             FROM tags t
             JOIN project_tags pt ON t.id = pt.tag_id
             WHERE pt.project_id = ?1
             ORDER BY t.name",
        )?;

        let rows = stmt.query_map(params![project_id], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Project-TechStack M2M operations

    fn add_project_tech(&self, project_id: &str, tech_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO project_tech_stack (project_id, tech_stack_id) VALUES (?1, ?2)",
            params![project_id, tech_id],
        )?;
        Ok(())
    }

    fn remove_project_tech(&self, project_id: &str, tech_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM project_tech_stack WHERE project_id = ?1 AND tech_stack_id = ?2",
            params![project_id, tech_id],
        )?;
        Ok(rows > 0)
    }

    fn toggle_project_tech(&self, project_id: &str, tech_id: &str) -> Result<bool> {
        toggle_link(
            &mut self.conn(),
            "project_tech_stack",
            "project_id",
            "tech_stack_id",
            project_id,
            tech_id,
        )
    }

    fn set_project_tech(&self, project_id: &str, tech_ids: &[String]) -> Result<()> {
        replace_links(
            &mut self.conn(),
            "project_tech_stack",
            "project_id",
            "tech_stack_id",
            project_id,
            tech_ids,
        )
    }

    fn list_project_tech(&self, project_id: &str) -> Result<Vec<TechStack>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name
             FROM tech_stack t
             JOIN project_tech_stack pt ON t.id = pt.tech_stack_id
             WHERE pt.project_id = ?1
             ORDER BY t.name",
        )?;

        let rows = stmt.query_map(params![project_id], |row| {
            Ok(TechStack {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Post operations

    fn create_post(&self, post: &Post) -> Result<()> {
        self.conn().execute(
            "INSERT INTO posts (id, user_id, title, content, date_created, last_update)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                post.id,
                post.user_id,
                post.title,
                post.content,
                format_datetime(&post.date_created),
                format_datetime(&post.last_update),
            ],
        )?;
        Ok(())
    }

    fn get_post(&self, id: &str) -> Result<Option<Post>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
            params![id],
            post_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_posts(&self, cursor: &str, limit: i32) -> Result<Vec<Post>> {
        let conn = self.conn();
        let mut stmt = if cursor.is_empty() {
            conn.prepare(&format!(
                "SELECT {POST_COLUMNS} FROM posts ORDER BY date_created DESC LIMIT ?1"
            ))?
        } else {
            conn.prepare(&format!(
                "SELECT {POST_COLUMNS} FROM posts WHERE date_created < ?2
                 ORDER BY date_created DESC LIMIT ?1"
            ))?
        };

        let rows = if cursor.is_empty() {
            stmt.query_map(params![limit], post_from_row)?
        } else {
            stmt.query_map(params![limit, cursor], post_from_row)?
        };

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_post(&self, post: &Post) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE posts SET title = ?1, content = ?2, last_update = ?3 WHERE id = ?4",
            params![
                post.title,
                post.content,
                format_datetime(&post.last_update),
                post.id
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_post(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Post-Project M2M operations

    fn add_post_project(&self, post_id: &str, project_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO post_projects (post_id, project_id) VALUES (?1, ?2)",
            params![post_id, project_id],
        )?;
        Ok(())
    }

    fn remove_post_project(&self, post_id: &str, project_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM post_projects WHERE post_id = ?1 AND project_id = ?2",
            params![post_id, project_id],
        )?;
        Ok(rows > 0)
    }

    fn toggle_post_project(&self, post_id: &str, project_id: &str) -> Result<bool> {
        toggle_link(
            &mut self.conn(),
            "post_projects",
            "post_id",
            "project_id",
            post_id,
            project_id,
        )
    }

    fn set_post_projects(&self, post_id: &str, project_ids: &[String]) -> Result<()> {
        replace_links(
            &mut self.conn(),
            "post_projects",
            "post_id",
            "project_id",
            post_id,
            project_ids,
        )
    }

    fn list_post_projects(&self, post_id: &str) -> Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.user_id, p.title, p.description, p.status, p.repo_url, p.deploy_url, p.date_created, p.last_update
             FROM projects p
             JOIN post_projects pp ON p.id = pp.project_id
             WHERE pp.post_id = ?1
             ORDER BY p.date_created DESC",
        )?;

        let rows = stmt.query_map(params![post_id], project_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Post-Tag M2M operations

    fn add_post_tag(&self, post_id: &str, tag_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?1, ?2)",
            params![post_id, tag_id],
        )?;
        Ok(())
    }

    fn remove_post_tag(&self, post_id: &str, tag_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM post_tags WHERE post_id = ?1 AND tag_id = ?2",
            params![post_id, tag_id],
        )?;
        Ok(rows > 0)
    }

    fn toggle_post_tag(&self, post_id: &str, tag_id: &str) -> Result<bool> {
        toggle_link(
            &mut self.conn(),
            "post_tags",
            "post_id",
            "tag_id",
            post_id,
            tag_id,
        )
    }

    fn set_post_tags(&self, post_id: &str, tag_ids: &[String]) -> Result<()> {
        replace_links(
            &mut self.conn(),
            "post_tags",
            "post_id",
            "tag_id",
            post_id,
            tag_ids,
        )
    }

    fn list_post_tags(&self, post_id: &str) -> Result<Vec<Tag>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name
             FROM tags t
             JOIN post_tags pt ON t.id = pt.tag_id
             WHERE pt.post_id = ?1
             ORDER BY t.name",
        )?;

        let rows = stmt.query_map(params![post_id], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Post-TechStack M2M operations

    fn add_post_tech(&self, post_id: &str, tech_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO post_tech_stack (post_id, tech_stack_id) VALUES (?1, ?2)",
            params![post_id, tech_id],
        )?;
        Ok(())
    }

    fn remove_post_tech(&self, post_id: &str, tech_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM post_tech_stack WHERE post_id = ?1 AND tech_stack_id = ?2",
            params![post_id, tech_id],
        )?;
        Ok(rows > 0)
    }

    fn toggle_post_tech(&self, post_id: &str, tech_id: &str) -> Result<bool> {
        toggle_link(
            &mut self.conn(),
            "post_tech_stack",
            "post_id",
            "tech_stack_id",
            post_id,
            tech_id,
        )
    }

    fn set_post_tech(&self, post_id: &str, tech_ids: &[String]) -> Result<()> {
        replace_links(
            &mut self.conn(),
            "post_tech_stack",
            "post_id",
            "tech_stack_id",
            post_id,
            tech_ids,
        )
    }

    fn list_post_tech(&self, post_id: &str) -> Result<Vec<TechStack>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name
             FROM tech_stack t
             JOIN post_tech_stack pt ON t.id = pt.tech_stack_id
             WHERE pt.post_id = ?1
             ORDER BY t.name",
        )?;

        let rows = stmt.query_map(params![post_id], |row| {
            Ok(TechStack {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Flips one association row: removes it when present, inserts it otherwise.
/// Returns whether the link exists after the call.
fn toggle_link(
    conn: &mut Connection,
    table: &str,
    left_col: &str,
    right_col: &str,
    left_id: &str,
    right_id: &str,
) -> Result<bool> {
    let tx = conn.transaction()?;

    let exists: Option<i64> = tx
        .query_row(
            &format!("SELECT 1 FROM {table} WHERE {left_col} = ?1 AND {right_col} = ?2"),
            params![left_id, right_id],
            |row| row.get(0),
        )
        .optional()?;

    let linked = if exists.is_some() {
        tx.execute(
            &format!("DELETE FROM {table} WHERE {left_col} = ?1 AND {right_col} = ?2"),
            params![left_id, right_id],
        )?;
        false
    } else {
        tx.execute(
            &format!("INSERT INTO {table} ({left_col}, {right_col}) VALUES (?1, ?2)"),
            params![left_id, right_id],
        )?;
        true
    };

    tx.commit()?;
    Ok(linked)
}

/// Replaces all association rows for `left_id` with the given set.
fn replace_links(
    conn: &mut Connection,
    table: &str,
    left_col: &str,
    right_col: &str,
    left_id: &str,
    right_ids: &[String],
) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute(
        &format!("DELETE FROM {table} WHERE {left_col} = ?1"),
        params![left_id],
    )?;

    for right_id in right_ids {
        tx.execute(
            &format!("INSERT OR IGNORE INTO {table} ({left_col}, {right_col}) VALUES (?1, ?2)"),
            params![left_id, right_id],
        )?;
    }

    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn test_user(store: &SqliteStore) -> User {
        let user = User {
            id: "user-1".to_string(),
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            password_hash: "$argon2id$fake".to_string(),
            date_joined: Utc::now(),
            last_login: None,
        };
        store.create_user(&user).unwrap();
        user
    }

    fn test_project(store: &SqliteStore, user: &User, id: &str, repo_url: &str) -> Project {
        let project = Project {
            id: id.to_string(),
            user_id: user.id.clone(),
            title: format!("Project {id}"),
            description: "A project".to_string(),
            status: ProjectStatus::InDevelopment,
            repo_url: repo_url.to_string(),
            deploy_url: None,
            date_created: Utc::now(),
            last_update: Utc::now(),
        };
        store.create_project(&project).unwrap();
        project
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = test_store();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"tokens".to_string()));
        assert!(tables.contains(&"projects".to_string()));
        assert!(tables.contains(&"tags".to_string()));
        assert!(tables.contains(&"tech_stack".to_string()));
        assert!(tables.contains(&"project_tags".to_string()));
        assert!(tables.contains(&"project_tech_stack".to_string()));
        assert!(tables.contains(&"posts".to_string()));
        assert!(tables.contains(&"post_projects".to_string()));
        assert!(tables.contains(&"post_tags".to_string()));
        assert!(tables.contains(&"post_tech_stack".to_string()));
    }

    #[test]
    fn test_user_crud() {
        let (_temp, store) = test_store();
        let user = test_user(&store);

        let fetched = store.get_user(&user.id).unwrap().unwrap();
        assert_eq!(fetched.username, "jdoe");

        let by_name = store.get_user_by_username("jdoe").unwrap().unwrap();
        assert_eq!(by_name.id, user.id);

        store.update_user_last_login(&user.id).unwrap();
        let fetched = store.get_user(&user.id).unwrap().unwrap();
        assert!(fetched.last_login.is_some());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let (_temp, store) = test_store();
        test_user(&store);

        let dup = User {
            id: "user-2".to_string(),
            username: "jdoe".to_string(),
            email: "other@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "$argon2id$fake".to_string(),
            date_joined: Utc::now(),
            last_login: None,
        };
        assert!(matches!(
            store.create_user(&dup),
            Err(Error::AlreadyExists)
        ));
    }

    #[test]
    fn test_token_lookup_collision() {
        let (_temp, store) = test_store();
        let user = test_user(&store);

        let token1 = Token {
            id: "token-1".to_string(),
            token_hash: "hash1".to_string(),
            token_lookup: "lookup123".to_string(),
            user_id: user.id.clone(),
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };
        store.create_token(&token1).unwrap();

        let token2 = Token {
            id: "token-2".to_string(),
            token_hash: "hash2".to_string(),
            token_lookup: "lookup123".to_string(), // Same lookup
            user_id: user.id,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };

        let result = store.create_token(&token2);
        assert!(matches!(result, Err(Error::TokenLookupCollision)));
    }

    #[test]
    fn test_project_crud_and_repo_url_unique() {
        let (_temp, store) = test_store();
        let user = test_user(&store);
        let project = test_project(&store, &user, "p-1", "https://github.com/jdoe/one");

        let fetched = store.get_project("p-1").unwrap().unwrap();
        assert_eq!(fetched.repo_url, "https://github.com/jdoe/one");
        assert_eq!(fetched.status, ProjectStatus::InDevelopment);

        let by_url = store
            .get_project_by_repo_url("https://github.com/jdoe/one")
            .unwrap()
            .unwrap();
        assert_eq!(by_url.id, "p-1");

        // Same repo_url must be rejected
        let dup = Project {
            id: "p-2".to_string(),
            ..project.clone()
        };
        assert!(matches!(
            store.create_project(&dup),
            Err(Error::AlreadyExists)
        ));

        let urls = store.list_project_repo_urls().unwrap();
        assert_eq!(urls, vec!["https://github.com/jdoe/one".to_string()]);

        assert!(store.delete_project("p-1").unwrap());
        assert!(store.get_project("p-1").unwrap().is_none());
    }

    #[test]
    fn test_update_project_leaves_identity_fields() {
        let (_temp, store) = test_store();
        let user = test_user(&store);
        let mut project = test_project(&store, &user, "p-1", "https://github.com/jdoe/one");

        // A caller may scribble on these fields; the store ignores them.
        project.title = "Renamed".to_string();
        project.repo_url = "https://github.com/other/somewhere".to_string();
        project.user_id = "someone-else".to_string();
        store.update_project(&project).unwrap();

        let fetched = store.get_project("p-1").unwrap().unwrap();
        assert_eq!(fetched.title, "Renamed");
        assert_eq!(fetched.repo_url, "https://github.com/jdoe/one");
        assert_eq!(fetched.user_id, user.id);
    }

    #[test]
    fn test_project_tag_links_additive_and_idempotent() {
        let (_temp, store) = test_store();
        let user = test_user(&store);
        let project = test_project(&store, &user, "p-1", "https://github.com/jdoe/one");

        let tag = Tag {
            id: "tag-1".to_string(),
            name: "django".to_string(),
        };
        store.create_tag(&tag).unwrap();

        store.add_project_tag(&project.id, &tag.id).unwrap();
        store.add_project_tag(&project.id, &tag.id).unwrap(); // no duplicate

        let tags = store.list_project_tags(&project.id).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "django");
    }

    #[test]
    fn test_toggle_project_tag() {
        let (_temp, store) = test_store();
        let user = test_user(&store);
        let project = test_project(&store, &user, "p-1", "https://github.com/jdoe/one");

        let tag = Tag {
            id: "tag-1".to_string(),
            name: "rust".to_string(),
        };
        store.create_tag(&tag).unwrap();

        assert!(store.toggle_project_tag(&project.id, &tag.id).unwrap());
        assert_eq!(store.list_project_tags(&project.id).unwrap().len(), 1);

        assert!(!store.toggle_project_tag(&project.id, &tag.id).unwrap());
        assert!(store.list_project_tags(&project.id).unwrap().is_empty());
    }

    #[test]
    fn test_set_project_tech_replaces() {
        let (_temp, store) = test_store();
        let user = test_user(&store);
        let project = test_project(&store, &user, "p-1", "https://github.com/jdoe/one");

        for (id, name) in [("t-1", "Python"), ("t-2", "JavaScript"), ("t-3", "HTML")] {
            store
                .create_tech_stack(&TechStack {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .unwrap();
        }

        store.add_project_tech(&project.id, "t-1").unwrap();
        store.add_project_tech(&project.id, "t-2").unwrap();

        store
            .set_project_tech(&project.id, &["t-3".to_string()])
            .unwrap();

        let tech = store.list_project_tech(&project.id).unwrap();
        assert_eq!(tech.len(), 1);
        assert_eq!(tech[0].name, "HTML");
    }

    #[test]
    fn test_list_projects_newest_first_with_cursor() {
        let (_temp, store) = test_store();
        let user = test_user(&store);

        for (i, offset) in [(1, 30), (2, 20), (3, 10)] {
            let project = Project {
                id: format!("p-{i}"),
                user_id: user.id.clone(),
                title: format!("Project {i}"),
                description: String::new(),
                status: ProjectStatus::InDevelopment,
                repo_url: format!("https://github.com/jdoe/repo-{i}"),
                deploy_url: None,
                date_created: Utc::now() - chrono::Duration::days(offset),
                last_update: Utc::now(),
            };
            store.create_project(&project).unwrap();
        }

        let page = store.list_projects("", 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "p-3");
        assert_eq!(page[1].id, "p-2");

        let cursor = page[1].date_created.to_rfc3339();
        let rest = store.list_projects(&cursor, 2).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, "p-1");
    }

    #[test]
    fn test_post_crud_and_links() {
        let (_temp, store) = test_store();
        let user = test_user(&store);
        let project = test_project(&store, &user, "p-1", "https://github.com/jdoe/one");

        let post = Post {
            id: "post-1".to_string(),
            user_id: user.id.clone(),
            title: "Building the portfolio".to_string(),
            content: "Long-form notes.".to_string(),
            date_created: Utc::now(),
            last_update: Utc::now(),
        };
        store.create_post(&post).unwrap();

        store.add_post_project(&post.id, &project.id).unwrap();
        let linked = store.list_post_projects(&post.id).unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id, "p-1");

        // Deleting the project cascades to the link table
        store.delete_project(&project.id).unwrap();
        assert!(store.list_post_projects(&post.id).unwrap().is_empty());

        assert!(store.delete_post(&post.id).unwrap());
    }

    #[test]
    fn test_tag_usage_counts_projects_and_posts() {
        let (_temp, store) = test_store();
        let user = test_user(&store);
        let project = test_project(&store, &user, "p-1", "https://github.com/jdoe/one");

        let post = Post {
            id: "post-1".to_string(),
            user_id: user.id.clone(),
            title: "Post".to_string(),
            content: String::new(),
            date_created: Utc::now(),
            last_update: Utc::now(),
        };
        store.create_post(&post).unwrap();

        let tag = Tag {
            id: "tag-1".to_string(),
            name: "portfolio".to_string(),
        };
        store.create_tag(&tag).unwrap();

        store.add_project_tag(&project.id, &tag.id).unwrap();
        store.add_post_tag(&post.id, &tag.id).unwrap();

        assert_eq!(store.count_tag_usage(&tag.id).unwrap(), 2);
    }
}
