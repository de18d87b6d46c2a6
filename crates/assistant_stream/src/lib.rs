mod client;
mod debounce;
mod error;
mod framing;
mod sanitize;

pub use client::ConversationClient;
pub use debounce::{DebounceState, Debouncer};
pub use error::StreamError;
pub use framing::{LineFramer, content_from_line};
pub use sanitize::sanitize_content;
