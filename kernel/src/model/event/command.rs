use crate::model::id::{EventId, UserId};
use chrono::{DateTime, Utc};
use derive_new::new;

#[derive(Debug, new)]
pub struct CreateEvent {
    pub title: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub max_participants: i32,
}

// 全項目を上書きする（部分更新ではない）
#[derive(Debug, new)]
pub struct UpdateEvent {
    pub event_id: EventId,
    pub title: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub max_participants: i32,
}

#[derive(Debug, new)]
pub struct DeleteEvent {
    pub event_id: EventId,
}

#[derive(Debug, new)]
pub struct RegisterParticipant {
    pub event_id: EventId,
    pub user_id: UserId,
}

#[derive(Debug, new)]
pub struct UnregisterParticipant {
    pub event_id: EventId,
    pub user_id: UserId,
}
