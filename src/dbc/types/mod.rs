pub mod color;
pub mod errors;
pub mod file;
pub mod message;
pub mod message_id;
pub mod signal;
