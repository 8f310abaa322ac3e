pub mod analysis;
pub mod availability;
pub mod chat;
pub mod error;
pub mod intent;
pub mod knowledge;
pub mod render;
pub mod template;
