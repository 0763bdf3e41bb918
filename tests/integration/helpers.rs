//! Shared harness: router, engine, scheduler and store wired together with
//! an in-memory store and a manual clock.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use taskbot::chat::{ChatId, InboundEvent, MessageId, OutboundMessage};
use taskbot::dialog::ConversationEngine;
use taskbot::{CommandRouter, ManualClock, ReminderScheduler, SqliteTaskStore, UserId};
use tokio::sync::mpsc;

pub const USER: UserId = UserId(42);
pub const CHAT: ChatId = ChatId(4200);

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 20, 8, 30, 0).unwrap()
}

pub struct Harness {
    pub router: CommandRouter,
    pub store: Arc<SqliteTaskStore>,
    pub scheduler: ReminderScheduler,
    pub clock: Arc<ManualClock>,
    pub reminders: mpsc::UnboundedReceiver<OutboundMessage>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(SqliteTaskStore::open_in_memory().unwrap());
        let clock = Arc::new(ManualClock::new(t0()));
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = ReminderScheduler::new(store.clone(), clock.clone(), tx);
        let engine = ConversationEngine::new(store.clone(), scheduler.clone(), clock.clone());
        Self {
            router: CommandRouter::new(engine, store.clone()),
            store,
            scheduler,
            clock,
            reminders: rx,
        }
    }

    /// Send a text message as [`USER`] and return the reply texts.
    pub fn say(&mut self, text: &str) -> Vec<String> {
        texts(self.router.handle(&InboundEvent::text(USER, CHAT, text)))
    }

    /// Press a button as [`USER`] and return the reply texts.
    pub fn press(&mut self, data: &str) -> Vec<String> {
        texts(
            self.router
                .handle(&InboundEvent::callback(USER, CHAT, Some(MessageId(1)), data)),
        )
    }

    /// Picker token `cal_<tag>_<suffix>` for the picker the dialogue shows.
    pub fn picker_token(&self, suffix: &str) -> String {
        let tag = self
            .router
            .engine()
            .session(USER)
            .and_then(|s| s.picker)
            .expect("no picker shown");
        format!("cal_{tag}_{suffix}")
    }

    /// Press a button of the picker the dialogue shows.
    pub fn pick(&mut self, suffix: &str) -> Vec<String> {
        let token = self.picker_token(suffix);
        self.press(&token)
    }

    /// Drain every reminder delivered so far.
    pub fn delivered(&mut self) -> Vec<OutboundMessage> {
        std::iter::from_fn(|| self.reminders.try_recv().ok()).collect()
    }
}

fn texts(out: Vec<OutboundMessage>) -> Vec<String> {
    out.into_iter().map(|m| m.text).collect()
}
