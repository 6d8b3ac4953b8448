use chrono::{DateTime, Utc};
use derive_new::new;
use garde::Validate;
use kernel::model::{
    event::{
        command::{CreateEvent, UpdateEvent},
        Event, EventListOptions,
    },
    id::EventId,
};
use serde::{Deserialize, Serialize};

use super::user::EventParticipantResponse;

const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Deserialize, Validate)]
pub struct EventListQuery {
    #[garde(range(min = 0))]
    #[serde(default)]
    pub skip: i64,
    #[garde(range(min = 0))]
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl From<EventListQuery> for EventListOptions {
    fn from(value: EventListQuery) -> Self {
        let EventListQuery { skip, limit } = value;
        Self { skip, limit }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[garde(length(min = 1, max = 255))]
    pub title: String,
    #[garde(skip)]
    #[serde(default)]
    pub description: String,
    #[garde(skip)]
    pub scheduled_at: DateTime<Utc>,
    #[garde(range(min = 1))]
    pub max_participants: i32,
}

impl From<CreateEventRequest> for CreateEvent {
    fn from(value: CreateEventRequest) -> Self {
        let CreateEventRequest {
            title,
            description,
            scheduled_at,
            max_participants,
        } = value;
        CreateEvent {
            title,
            description,
            scheduled_at,
            max_participants,
        }
    }
}

// 更新は全項目の置き換えなので、作成時と同じ項目をすべて必須にする
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[garde(length(min = 1, max = 255))]
    pub title: String,
    #[garde(skip)]
    #[serde(default)]
    pub description: String,
    #[garde(skip)]
    pub scheduled_at: DateTime<Utc>,
    #[garde(range(min = 1))]
    pub max_participants: i32,
}

#[derive(new)]
pub struct UpdateEventRequestWithIds(EventId, UpdateEventRequest);

impl From<UpdateEventRequestWithIds> for UpdateEvent {
    fn from(value: UpdateEventRequestWithIds) -> Self {
        let UpdateEventRequestWithIds(
            event_id,
            UpdateEventRequest {
                title,
                description,
                scheduled_at,
                max_participants,
            },
        ) = value;
        UpdateEvent {
            event_id,
            title,
            description,
            scheduled_at,
            max_participants,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub max_participants: i32,
    pub participants: Vec<EventParticipantResponse>,
}

impl From<Event> for EventResponse {
    fn from(value: Event) -> Self {
        let Event {
            event_id,
            title,
            description,
            scheduled_at,
            max_participants,
            participants,
        } = value;
        Self {
            id: event_id,
            title,
            description,
            scheduled_at,
            max_participants,
            participants: participants
                .into_iter()
                .map(EventParticipantResponse::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_defaults() {
        let query: EventListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.skip, 0);
        assert_eq!(query.limit, 100);
    }

    #[test]
    fn rejects_empty_title_and_zero_capacity() {
        let req: CreateEventRequest = serde_json::from_value(serde_json::json!({
            "title": "",
            "description": "d",
            "scheduled_at": "2025-05-01T10:00:00Z",
            "max_participants": 0
        }))
        .unwrap();
        assert!(req.validate(&()).is_err());
    }

    #[test]
    fn negative_paging_is_invalid() {
        let query = EventListQuery { skip: -1, limit: 10 };
        assert!(query.validate(&()).is_err());
    }
}
