use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{
    event::{
        command::{CreateEvent, DeleteEvent, RegisterParticipant, UnregisterParticipant, UpdateEvent},
        Event, EventListOptions,
    },
    id::EventId,
};

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: CreateEvent) -> AppResult<Event>;
    async fn find_all(&self, options: EventListOptions) -> AppResult<Vec<Event>>;
    async fn find_by_id(&self, event_id: EventId) -> AppResult<Option<Event>>;
    // 対象が無ければ EntityNotFound
    async fn update(&self, event: UpdateEvent) -> AppResult<Event>;
    async fn delete(&self, event: DeleteEvent) -> AppResult<()>;
    // 重複登録・満員・未登録は Conflict
    async fn register(&self, event: RegisterParticipant) -> AppResult<Event>;
    async fn unregister(&self, event: UnregisterParticipant) -> AppResult<Event>;
}
