pub mod ask;
pub mod chat;
pub mod info;
pub mod onboard;
mod render;
mod runtime;
