pub mod ai;
pub mod assistant;
pub mod health;
pub mod kb;
