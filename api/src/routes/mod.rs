pub mod ai;
pub mod analysis;
pub mod chat;
pub mod health;
pub mod knowledge;
