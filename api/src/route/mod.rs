use axum::Router;
use registry::AppRegistry;

pub mod event;
pub mod health;

pub fn routes() -> Router<AppRegistry> {
    Router::new()
        .merge(health::build_health_check_routers())
        .merge(event::build_event_routers())
}
