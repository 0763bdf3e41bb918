use crate::chat::traits::ChatTransport;
use crate::chat::types::{ChatId, InboundEvent, InlineKeyboard, MessageId, OutboundMessage};
use crate::config::TelegramConfig;
use crate::task::UserId;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

/// Extra seconds on top of the long-poll timeout before the HTTP request gives up.
const POLL_GRACE_SECS: u64 = 10;

/// Telegram channel adapter using Bot API long polling.
pub struct TelegramTransport {
    api_root: Url,
    poll_timeout_secs: u64,
    allowed_user_ids: Vec<i64>,
    client: reqwest::Client,
}

impl TelegramTransport {
    pub fn new(config: &TelegramConfig) -> anyhow::Result<Self> {
        let token = config.effective_token();
        if token.is_empty() {
            anyhow::bail!("telegram bot token is empty");
        }
        let mut base = Url::parse(&config.api_base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let api_root = base.join(&format!("bot{token}/"))?;
        Ok(Self {
            api_root,
            poll_timeout_secs: config.poll_timeout_secs,
            allowed_user_ids: config.allowed_user_ids.clone(),
            client: reqwest::Client::new(),
        })
    }

    fn is_user_allowed(&self, user_id: i64) -> bool {
        self.allowed_user_ids.is_empty() || self.allowed_user_ids.contains(&user_id)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> anyhow::Result<T> {
        let url = self.api_root.join(method)?;
        let response = self
            .client
            .post(url)
            .timeout(std::time::Duration::from_secs(
                self.poll_timeout_secs + POLL_GRACE_SECS,
            ))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await?;
        if !envelope.ok {
            anyhow::bail!(
                "telegram {method} failed ({status}): {}",
                envelope.description.unwrap_or_default()
            );
        }
        envelope
            .result
            .ok_or_else(|| anyhow::anyhow!("telegram {method} returned no result"))
    }

    async fn poll_once(&self, offset: i64) -> anyhow::Result<Vec<Update>> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": self.poll_timeout_secs,
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }

    /// Convert an update into an inbound event, acknowledging button presses.
    async fn convert_update(&self, update: Update) -> Option<InboundEvent> {
        if let Some(message) = update.message {
            let from = message.from?;
            let text = message.text?;
            if !self.is_user_allowed(from.id) {
                debug!("ignoring telegram message from non-allowlisted user {}", from.id);
                return None;
            }
            return Some(InboundEvent::text(
                UserId(from.id),
                ChatId(message.chat.id),
                text,
            ));
        }

        let query = update.callback_query?;
        // Stop the client-side spinner even when the press is ignored.
        if let Err(err) = self
            .call::<Value>("answerCallbackQuery", json!({ "callback_query_id": query.id }))
            .await
        {
            warn!("failed to answer telegram callback query: {err}");
        }
        if !self.is_user_allowed(query.from.id) {
            debug!("ignoring telegram callback from non-allowlisted user {}", query.from.id);
            return None;
        }
        let message = query.message?;
        Some(InboundEvent::callback(
            UserId(query.from.id),
            ChatId(message.chat.id),
            Some(MessageId(message.message_id)),
            query.data.unwrap_or_default(),
        ))
    }
}

fn reply_markup(keyboard: &InlineKeyboard) -> Value {
    let rows: Vec<Vec<Value>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| json!({ "text": b.label, "callback_data": b.payload }))
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    fn id(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()> {
        let mut body = json!({
            "chat_id": message.chat.0,
            "text": message.text,
        });
        if let Some(keyboard) = &message.keyboard {
            body["reply_markup"] = reply_markup(keyboard);
        }
        let method = match message.edit {
            Some(MessageId(id)) => {
                body["message_id"] = json!(id);
                "editMessageText"
            }
            None => "sendMessage",
        };
        self.call::<Value>(method, body).await?;
        Ok(())
    }

    async fn run(&self, inbound_tx: mpsc::Sender<InboundEvent>) -> anyhow::Result<()> {
        let mut offset = 0_i64;
        let mut backoff_secs = 1_u64;

        loop {
            let updates = match self.poll_once(offset).await {
                Ok(updates) => {
                    backoff_secs = 1;
                    updates
                }
                Err(err) => {
                    warn!("telegram polling failed, retrying in {backoff_secs}s: {err}");
                    tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs.saturating_mul(2)).min(60);
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(event) = self.convert_update(update).await else {
                    continue;
                };
                if inbound_tx.send(event).await.is_err() {
                    debug!("inbound channel closed, stopping telegram polling");
                    return Ok(());
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
    from: Option<User>,
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    from: User,
    message: Option<Message>,
    data: Option<String>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::chat::types::{InboundKind, InlineButton};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(server: &MockServer, allowed: Vec<i64>) -> TelegramTransport {
        let config = TelegramConfig {
            bot_token: "TEST".to_owned(),
            api_base: server.uri(),
            poll_timeout_secs: 0,
            allowed_user_ids: allowed,
        };
        TelegramTransport::new(&config).unwrap()
    }

    fn ok(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": result }))
    }

    #[tokio::test]
    async fn send_posts_message_with_inline_keyboard() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/sendMessage"))
            .and(body_partial_json(json!({
                "chat_id": 10,
                "text": "Select the task priority:",
                "reply_markup": { "inline_keyboard": [[
                    { "text": "High", "callback_data": "priority_high" }
                ]] }
            })))
            .respond_with(ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server, Vec::new());
        let message = OutboundMessage::text(ChatId(10), "Select the task priority:")
            .with_keyboard(InlineKeyboard::row(vec![InlineButton::new(
                "High",
                "priority_high",
            )]));
        transport.send(message).await.unwrap();
    }

    #[tokio::test]
    async fn send_with_edit_target_uses_edit_message_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/editMessageText"))
            .and(body_partial_json(json!({ "chat_id": 10, "message_id": 77 })))
            .respond_with(ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server, Vec::new());
        let message =
            OutboundMessage::text(ChatId(10), "Date set to 2024-03-01").editing(Some(MessageId(77)));
        transport.send(message).await.unwrap();
    }

    #[tokio::test]
    async fn api_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/sendMessage"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let transport = transport_for(&server, Vec::new());
        let err = transport
            .send(OutboundMessage::text(ChatId(1), "hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("chat not found"));
    }

    #[tokio::test]
    async fn updates_become_inbound_events() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/getUpdates"))
            .respond_with(ok(json!([
                {
                    "update_id": 5,
                    "message": {
                        "message_id": 1,
                        "from": { "id": 42 },
                        "chat": { "id": 100 },
                        "text": "/newtask"
                    }
                },
                {
                    "update_id": 6,
                    "callback_query": {
                        "id": "cb-1",
                        "from": { "id": 42 },
                        "message": { "message_id": 9, "chat": { "id": 100 } },
                        "data": "mark_completed_3"
                    }
                }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/botTEST/answerCallbackQuery"))
            .and(body_partial_json(json!({ "callback_query_id": "cb-1" })))
            .respond_with(ok(json!(true)))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server, Vec::new());
        let updates = transport.poll_once(0).await.unwrap();
        assert_eq!(updates.len(), 2);

        let mut events = Vec::new();
        for update in updates {
            events.push(transport.convert_update(update).await.unwrap());
        }
        assert_eq!(
            events[0],
            InboundEvent::text(UserId(42), ChatId(100), "/newtask")
        );
        assert_eq!(
            events[1].kind,
            InboundKind::Callback {
                message: Some(MessageId(9)),
                data: "mark_completed_3".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn non_allowlisted_users_are_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/getUpdates"))
            .respond_with(ok(json!([{
                "update_id": 1,
                "message": {
                    "message_id": 1,
                    "from": { "id": 7 },
                    "chat": { "id": 7 },
                    "text": "hello"
                }
            }])))
            .mount(&server)
            .await;

        let transport = transport_for(&server, vec![42]);
        let update = transport.poll_once(0).await.unwrap().pop().unwrap();
        assert!(transport.convert_update(update).await.is_none());
    }

    #[test]
    fn empty_token_is_rejected() {
        let config = TelegramConfig {
            bot_token: String::new(),
            ..TelegramConfig::default()
        };
        if std::env::var(crate::config::TOKEN_ENV_VAR).is_err() {
            assert!(TelegramTransport::new(&config).is_err());
        }
    }
}
