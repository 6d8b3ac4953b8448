use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use garde::Validate;
use kernel::model::{
    event::command::{DeleteEvent, RegisterParticipant, UnregisterParticipant},
    id::EventId,
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::event::{
        CreateEventRequest, EventListQuery, EventResponse, UpdateEventRequest,
        UpdateEventRequestWithIds,
    },
};

// 作成・更新・削除の権限チェック。ペイロードや存在確認より先に行う
fn ensure_can_manage_events(user: &AuthorizedUser, action: &str) -> AppResult<()> {
    if user.can_manage_events() {
        return Ok(());
    }
    tracing::debug!(
        user_id = %user.id(),
        email = %user.user.email,
        role = user.role().as_ref(),
        action,
        "event management denied"
    );
    Err(AppError::ForbiddenOperation(format!(
        "Only admins and teachers can {action} events"
    )))
}

fn into_payload<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(req)| req)
        .map_err(|rejection| AppError::UnprocessableEntity(rejection.body_text()))
}

// axum 標準のリジェクション（400 / text/plain）ではなく 422 / JSON に揃える
fn into_event_id(path: Result<Path<EventId>, PathRejection>) -> AppResult<EventId> {
    path
        .map(|Path(event_id)| event_id)
        .map_err(|rejection| AppError::UnprocessableEntity(rejection.body_text()))
}

fn into_query<T>(query: Result<Query<T>, QueryRejection>) -> AppResult<T> {
    query
        .map(|Query(query)| query)
        .map_err(|rejection| AppError::UnprocessableEntity(rejection.body_text()))
}

pub async fn show_event_list(
    query: Result<Query<EventListQuery>, QueryRejection>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<Vec<EventResponse>>> {
    let query = into_query(query)?;
    query.validate(&())?;

    registry
        .event_repository()
        .find_all(query.into())
        .await
        .map(|events| events.into_iter().map(EventResponse::from).collect::<Vec<_>>())
        .map(Json)
}

pub async fn show_event(
    event_id: Result<Path<EventId>, PathRejection>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventResponse>> {
    let event_id = into_event_id(event_id)?;
    registry
        .event_repository()
        .find_by_id(event_id)
        .await
        .and_then(|event| match event {
            Some(event) => Ok(Json(event.into())),
            None => Err(AppError::EntityNotFound("Event not found".into())),
        })
}

pub async fn create_event(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> AppResult<Json<EventResponse>> {
    ensure_can_manage_events(&user, "create")?;
    let req = into_payload(payload)?;
    req.validate(&())?;

    registry
        .event_repository()
        .create(req.into())
        .await
        .map(EventResponse::from)
        .map(Json)
}

pub async fn update_event(
    user: AuthorizedUser,
    event_id: Result<Path<EventId>, PathRejection>,
    State(registry): State<AppRegistry>,
    payload: Result<Json<UpdateEventRequest>, JsonRejection>,
) -> AppResult<Json<EventResponse>> {
    ensure_can_manage_events(&user, "update")?;
    let event_id = into_event_id(event_id)?;
    let req = into_payload(payload)?;
    req.validate(&())?;

    let update_event = UpdateEventRequestWithIds::new(event_id, req);
    registry
        .event_repository()
        .update(update_event.into())
        .await
        .map(EventResponse::from)
        .map(Json)
}

pub async fn delete_event(
    user: AuthorizedUser,
    event_id: Result<Path<EventId>, PathRejection>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    ensure_can_manage_events(&user, "delete")?;
    let event_id = into_event_id(event_id)?;

    registry
        .event_repository()
        .delete(DeleteEvent::new(event_id))
        .await
        .map(|_| StatusCode::NO_CONTENT)
}

pub async fn register_event(
    user: AuthorizedUser,
    event_id: Result<Path<EventId>, PathRejection>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventResponse>> {
    let event_id = into_event_id(event_id)?;
    registry
        .event_repository()
        .register(RegisterParticipant::new(event_id, user.id()))
        .await
        .map(EventResponse::from)
        .map(Json)
}

pub async fn unregister_event(
    user: AuthorizedUser,
    event_id: Result<Path<EventId>, PathRejection>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventResponse>> {
    let event_id = into_event_id(event_id)?;
    registry
        .event_repository()
        .unregister(UnregisterParticipant::new(event_id, user.id()))
        .await
        .map(EventResponse::from)
        .map(Json)
}
