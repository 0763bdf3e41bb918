//! Chat transport surface.
//!
//! The runtime only sees [`InboundEvent`]s and [`OutboundMessage`]s;
//! platform adapters implement [`ChatTransport`].

pub mod telegram;
pub mod traits;
pub mod types;

pub use telegram::TelegramTransport;
pub use traits::ChatTransport;
pub use types::{
    ChatId, InboundEvent, InboundKind, InlineButton, InlineKeyboard, MessageId, OutboundMessage,
};
