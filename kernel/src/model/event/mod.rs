use crate::model::{
    id::{EventId, UserId},
    user::EventParticipant,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_id: EventId,
    pub title: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub max_participants: i32,
    pub participants: Vec<EventParticipant>,
}

/// Reasons a registration change is refused for an existing event.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("User already registered for this event")]
    AlreadyRegistered,
    #[error("Event is already full")]
    EventFull,
    #[error("User is not registered for this event")]
    NotRegistered,
}

impl Event {
    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() as i64 >= i64::from(self.max_participants)
    }

    // 重複登録のチェックを定員チェックより先に行う
    pub fn ensure_can_register(&self, user_id: UserId) -> Result<(), RegistrationError> {
        if self.is_participant(user_id) {
            return Err(RegistrationError::AlreadyRegistered);
        }
        if self.is_full() {
            return Err(RegistrationError::EventFull);
        }
        Ok(())
    }

    pub fn ensure_can_unregister(&self, user_id: UserId) -> Result<(), RegistrationError> {
        if !self.is_participant(user_id) {
            return Err(RegistrationError::NotRegistered);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EventListOptions {
    pub skip: i64,
    pub limit: i64,
}
