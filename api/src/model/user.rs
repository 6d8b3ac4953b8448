use kernel::model::{id::UserId, user::EventParticipant};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct EventParticipantResponse {
    pub user_id: UserId,
    pub user_name: String,
}

impl From<EventParticipant> for EventParticipantResponse {
    fn from(value: EventParticipant) -> Self {
        let EventParticipant { user_id, user_name } = value;
        Self { user_id, user_name }
    }
}
