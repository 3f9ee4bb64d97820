//! Database-backed models.

mod message;

pub use message::{Message, SqlMessageStore};
