use chrono::{DateTime, Utc};
use kernel::model::{
    event::Event,
    id::{EventId, UserId},
    user::EventParticipant,
};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct EventRow {
    pub event_id: EventId,
    pub title: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub max_participants: i32,
}

// 参加者は別クエリで取得するので、From ではなく引数をとる into_event を使う
impl EventRow {
    pub fn into_event(self, participants: Vec<EventParticipant>) -> Event {
        let EventRow {
            event_id,
            title,
            description,
            scheduled_at,
            max_participants,
        } = self;
        Event {
            event_id,
            title,
            description,
            scheduled_at,
            max_participants,
            participants,
        }
    }
}

// event_participants と users を JOIN した行
#[derive(Debug, FromRow)]
pub struct EventParticipantRow {
    pub event_id: EventId,
    pub user_id: UserId,
    pub user_name: String,
}

impl From<EventParticipantRow> for EventParticipant {
    fn from(value: EventParticipantRow) -> Self {
        let EventParticipantRow {
            event_id: _,
            user_id,
            user_name,
        } = value;
        EventParticipant { user_id, user_name }
    }
}
