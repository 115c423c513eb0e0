pub mod chat;
pub mod extract;
pub mod health;
pub mod history;
pub mod image;
pub mod multimodal;
