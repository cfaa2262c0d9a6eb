use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use super::{
    accounts, post_relations, posts, project_github, project_relations, projects, tags, tech_stack,
};
use crate::github::SyncService;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Present only when a GitHub access token was configured.
    pub github: Option<Arc<SyncService>>,
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Accounts
        .route("/auth/register", post(accounts::register))
        .route("/auth/login", post(accounts::login))
        .route("/auth/logout", post(accounts::logout))
        .route("/auth/me", get(accounts::me))
        // Projects
        .route("/projects", get(projects::list_projects))
        .route("/projects", post(projects::create_project))
        // GitHub integration (registered before the {id} routes so the
        // literal segment wins)
        .route("/projects/github", get(project_github::list_available))
        .route("/projects/github", post(project_github::create_from_github))
        .route("/projects/{id}", get(projects::get_project))
        .route("/projects/{id}", patch(projects::update_project))
        .route("/projects/{id}", delete(projects::delete_project))
        .route("/projects/{id}/github/sync", post(project_github::sync))
        .route(
            "/projects/{id}/github/languages",
            post(project_github::sync_languages),
        )
        .route(
            "/projects/{id}/github/topics",
            post(project_github::sync_topics),
        )
        // Project tags (many-to-many)
        .route("/projects/{id}/tags", get(project_relations::list_tags))
        .route("/projects/{id}/tags", post(project_relations::add_tags))
        .route("/projects/{id}/tags", put(project_relations::set_tags))
        .route(
            "/projects/{id}/tags/toggle",
            post(project_relations::toggle_tag),
        )
        .route(
            "/projects/{id}/tags/{tag_id}",
            delete(project_relations::remove_tag),
        )
        // Project tech stack (many-to-many)
        .route("/projects/{id}/tech-stack", get(project_relations::list_tech))
        .route("/projects/{id}/tech-stack", post(project_relations::add_tech))
        .route("/projects/{id}/tech-stack", put(project_relations::set_tech))
        .route(
            "/projects/{id}/tech-stack/toggle",
            post(project_relations::toggle_tech),
        )
        .route(
            "/projects/{id}/tech-stack/{tech_id}",
            delete(project_relations::remove_tech),
        )
        // Posts
        .route("/posts", get(posts::list_posts))
        .route("/posts", post(posts::create_post))
        .route("/posts/{id}", get(posts::get_post))
        .route("/posts/{id}", patch(posts::update_post))
        .route("/posts/{id}", delete(posts::delete_post))
        // Post projects (many-to-many)
        .route("/posts/{id}/projects", get(post_relations::list_projects))
        .route("/posts/{id}/projects", post(post_relations::add_projects))
        .route("/posts/{id}/projects", put(post_relations::set_projects))
        .route(
            "/posts/{id}/projects/toggle",
            post(post_relations::toggle_project),
        )
        .route(
            "/posts/{id}/projects/{project_id}",
            delete(post_relations::remove_project),
        )
        // Post tags (many-to-many)
        .route("/posts/{id}/tags", get(post_relations::list_tags))
        .route("/posts/{id}/tags", post(post_relations::add_tags))
        .route("/posts/{id}/tags", put(post_relations::set_tags))
        .route("/posts/{id}/tags/toggle", post(post_relations::toggle_tag))
        .route(
            "/posts/{id}/tags/{tag_id}",
            delete(post_relations::remove_tag),
        )
        // Post tech stack (many-to-many)
        .route("/posts/{id}/tech-stack", get(post_relations::list_tech))
        .route("/posts/{id}/tech-stack", post(post_relations::add_tech))
        .route("/posts/{id}/tech-stack", put(post_relations::set_tech))
        .route(
            "/posts/{id}/tech-stack/toggle",
            post(post_relations::toggle_tech),
        )
        .route(
            "/posts/{id}/tech-stack/{tech_id}",
            delete(post_relations::remove_tech),
        )
        // Tags
        .route("/tags", get(tags::list_tags))
        .route("/tags", post(tags::create_tag))
        .route("/tags/{id}", get(tags::get_tag))
        .route("/tags/{id}", patch(tags::update_tag))
        .route("/tags/{id}", delete(tags::delete_tag))
        // Tech stack
        .route("/tech-stack", get(tech_stack::list_tech_stack))
        .route("/tech-stack", post(tech_stack::create_tech_stack))
        .route("/tech-stack/{id}", get(tech_stack::get_tech_stack))
        .route("/tech-stack/{id}", patch(tech_stack::update_tech_stack))
        .route("/tech-stack/{id}", delete(tech_stack::delete_tech_stack))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
