pub const SCHEMA: &str = r#"
-- Users own all portfolio content; tokens are their auth credentials
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL,
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    password_hash TEXT NOT NULL,      -- argon2id hash with embedded salt
    date_joined TEXT DEFAULT (datetime('now')),
    last_login TEXT
);

CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- clear-text prefix for row lookup
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,                   -- NULL = never
    last_used_at TEXT
);

-- Portfolio projects, each backed by exactly one remote repository
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',

    -- CMS-managed lifecycle; never written by GitHub sync
    status TEXT NOT NULL DEFAULT 'in_development',

    repo_url TEXT NOT NULL UNIQUE,
    deploy_url TEXT,

    date_created TEXT DEFAULT (datetime('now')),
    last_update TEXT DEFAULT (datetime('now'))
);

-- Topic labels; created lazily when GitHub topic sync first sees a name
CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

-- Detected languages; created lazily when GitHub language sync first sees one
CREATE TABLE IF NOT EXISTS tech_stack (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS project_tags (
    project_id TEXT REFERENCES projects(id) ON DELETE CASCADE,
    tag_id TEXT REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (project_id, tag_id)
);

CREATE TABLE IF NOT EXISTS project_tech_stack (
    project_id TEXT REFERENCES projects(id) ON DELETE CASCADE,
    tech_stack_id TEXT REFERENCES tech_stack(id) ON DELETE CASCADE,
    PRIMARY KEY (project_id, tech_stack_id)
);

-- Blog posts, optionally linked to projects and labeled like them
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    date_created TEXT DEFAULT (datetime('now')),
    last_update TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS post_projects (
    post_id TEXT REFERENCES posts(id) ON DELETE CASCADE,
    project_id TEXT REFERENCES projects(id) ON DELETE CASCADE,
    PRIMARY KEY (post_id, project_id)
);

CREATE TABLE IF NOT EXISTS post_tags (
    post_id TEXT REFERENCES posts(id) ON DELETE CASCADE,
    tag_id TEXT REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (post_id, tag_id)
);

CREATE TABLE IF NOT EXISTS post_tech_stack (
    post_id TEXT REFERENCES posts(id) ON DELETE CASCADE,
    tech_stack_id TEXT REFERENCES tech_stack(id) ON DELETE CASCADE,
    PRIMARY KEY (post_id, tech_stack_id)
);

-- Create indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
CREATE INDEX IF NOT EXISTS idx_projects_user ON projects(user_id);
CREATE INDEX IF NOT EXISTS idx_projects_created ON projects(date_created);
CREATE INDEX IF NOT EXISTS idx_posts_user ON posts(user_id);
CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(date_created);
"#;
