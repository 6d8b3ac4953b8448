use axum::{
    routing::{get, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::event::{
    create_event, delete_event, register_event, show_event, show_event_list, unregister_event,
    update_event,
};

pub fn build_event_routers() -> Router<AppRegistry> {
    Router::new()
        .route("/events", get(show_event_list).post(create_event))
        .route(
            "/events/:event_id",
            get(show_event).put(update_event).delete(delete_event),
        )
        .route("/events/:event_id/register", post(register_event))
        .route("/events/:event_id/unregister", post(unregister_event))
}
