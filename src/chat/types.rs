//! Transport-neutral chat events and effects.

use crate::task::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat (conversation) identity on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform message identity within a chat, used for in-place edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

/// Inbound event received from the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub user: UserId,
    pub chat: ChatId,
    pub kind: InboundKind,
}

/// Payload of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    /// A text message; commands are text starting with `/`.
    Text(String),
    /// An inline button press.
    Callback {
        /// Message carrying the pressed keyboard, when the platform reports it.
        message: Option<MessageId>,
        /// Opaque button payload.
        data: String,
    },
}

impl InboundEvent {
    /// Text message event.
    #[must_use]
    pub fn text(user: UserId, chat: ChatId, text: impl Into<String>) -> Self {
        Self {
            user,
            chat,
            kind: InboundKind::Text(text.into()),
        }
    }

    /// Button press event.
    #[must_use]
    pub fn callback(
        user: UserId,
        chat: ChatId,
        message: Option<MessageId>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            user,
            chat,
            kind: InboundKind::Callback {
                message,
                data: data.into(),
            },
        }
    }
}

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub label: String,
    pub payload: String,
}

impl InlineButton {
    #[must_use]
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// Grid of inline buttons attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    /// Keyboard with a single row.
    #[must_use]
    pub fn row(buttons: Vec<InlineButton>) -> Self {
        Self {
            rows: vec![buttons],
        }
    }

    /// Keyboard with one button per row.
    #[must_use]
    pub fn column(buttons: Vec<InlineButton>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    /// Iterate over every button payload.
    pub fn payloads(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(|b| b.payload.as_str())
    }
}

/// Outbound message sent back through the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat: ChatId,
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
    /// When set, replace this existing message instead of sending a new one.
    pub edit: Option<MessageId>,
}

impl OutboundMessage {
    /// Plain text message.
    #[must_use]
    pub fn text(chat: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat,
            text: text.into(),
            keyboard: None,
            edit: None,
        }
    }

    /// Attach an inline keyboard.
    #[must_use]
    pub fn with_keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Edit `message` in place when present, otherwise send a new message.
    #[must_use]
    pub fn editing(mut self, message: Option<MessageId>) -> Self {
        self.edit = message;
        self
    }
}
