pub mod event;
pub mod health;
