//! Bot runtime: wires the store, scheduler, router and chat transport.
//!
//! Inbound events are handled one at a time on the runtime loop, so a user's
//! dialogue never sees two events concurrently. The reminder scheduler runs
//! on its own task and shares only the store and the outbox with the loop.

use crate::chat::traits::ChatTransport;
use crate::chat::types::{InboundEvent, OutboundMessage};
use crate::chat::TelegramTransport;
use crate::calendar::DatePicker;
use crate::clock::{Clock, SystemClock};
use crate::config::BotConfig;
use crate::dialog::ConversationEngine;
use crate::router::CommandRouter;
use crate::scheduler::ReminderScheduler;
use crate::task::{SqliteTaskStore, TaskStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Capacity of the inbound event channel.
const INBOUND_CAPACITY: usize = 256;

/// Long-running bot process.
pub struct BotRuntime {
    config: BotConfig,
    cancel: CancellationToken,
}

impl BotRuntime {
    pub fn new(config: BotConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the runtime when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Open the configured store and run against the Telegram Bot API.
    pub async fn run(self) -> anyhow::Result<()> {
        let transport = Arc::new(TelegramTransport::new(&self.config.telegram)?);
        let store = Arc::new(SqliteTaskStore::open(&self.config.store.database_path)?);
        info!(
            "task store opened at {}",
            self.config.store.database_path.display()
        );
        self.run_with(transport, store, Arc::new(SystemClock)).await
    }

    /// Run with explicit collaborators until cancelled or the transport
    /// closes its inbound channel.
    pub async fn run_with(
        self,
        transport: Arc<dyn ChatTransport>,
        store: Arc<dyn TaskStore>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<()> {
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let (inbound_tx, mut inbound_rx) = mpsc::channel::<InboundEvent>(INBOUND_CAPACITY);

        let mut scheduler = ReminderScheduler::new(store.clone(), clock.clone(), outbox_tx.clone())
            .with_tick_interval(Duration::from_millis(self.config.scheduler.tick_interval_ms));
        if let Some(path) = &self.config.scheduler.state_path {
            scheduler = scheduler.with_state_path(path.clone());
            let loaded = scheduler.load_state();
            info!("restored {loaded} pending reminders");
        }

        let engine = ConversationEngine::new(store.clone(), scheduler.clone(), clock)
            .with_picker(DatePicker::new(self.config.dialog.picker_year_span))
            .with_max_title_chars(self.config.dialog.max_title_chars);
        let mut router = CommandRouter::new(engine, store);

        let scheduler_handle = scheduler.run(self.cancel.child_token());
        let pump_handle = tokio::spawn(run_outbox_pump(
            transport.clone(),
            outbox_rx,
            self.cancel.child_token(),
        ));
        let transport_handle = {
            let transport = transport.clone();
            tokio::spawn(async move {
                if let Err(e) = transport.run(inbound_tx).await {
                    error!("{} transport stopped: {e}", transport.id());
                }
            })
        };

        info!("taskbot running on {}", transport.id());
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                event = inbound_rx.recv() => {
                    let Some(event) = event else {
                        warn!("inbound channel closed");
                        break;
                    };
                    for message in router.handle(&event) {
                        if outbox_tx.send(message).is_err() {
                            warn!("outbox closed, dropping reply");
                        }
                    }
                }
            }
        }

        self.cancel.cancel();
        transport_handle.abort();
        if let Err(e) = scheduler_handle.await {
            warn!("scheduler task ended abnormally: {e}");
        }
        if let Err(e) = pump_handle.await {
            warn!("outbox task ended abnormally: {e}");
        }
        info!("taskbot stopped");
        Ok(())
    }
}

/// Forward outbound messages to the transport until cancelled, then flush
/// what is already queued.
async fn run_outbox_pump(
    transport: Arc<dyn ChatTransport>,
    mut outbox_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            message = outbox_rx.recv() => {
                let Some(message) = message else { return };
                deliver(transport.as_ref(), message).await;
            }
        }
    }
    while let Ok(message) = outbox_rx.try_recv() {
        deliver(transport.as_ref(), message).await;
    }
}

async fn deliver(transport: &dyn ChatTransport, message: OutboundMessage) {
    let chat = message.chat;
    match transport.send(message).await {
        Ok(()) => debug!("sent message to chat {chat}"),
        Err(e) => warn!("failed to send message to chat {chat}: {e}"),
    }
}
