//! The cloneable handle that puts text on a player's screen.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{SessionError, TerminalState};

/// One queued write.
#[derive(Debug)]
pub(crate) enum Outbound {
    /// Game output; reflowed to the viewport before sending.
    Text(String),
    /// Keystroke echo; sent as-is.
    Raw(String),
}

impl Outbound {
    fn into_string(self) -> String {
        match self {
            Outbound::Text(s) | Outbound::Raw(s) => s,
        }
    }
}

/// Sender side of a session's outbound queue.
///
/// The queue is bounded: when a player's connection is slow enough that
/// the writer falls `outbound_capacity` messages behind, `send` waits.
/// Each character's outbox is cloned into broadcasts, so only the
/// broadcaster and that player are slowed; other recipients are sent to
/// independently.
///
/// The session's writer exits once every clone has been dropped.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::Sender<Outbound>,
    prompt: Arc<str>,
    terminal: Arc<TerminalState>,
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("closed", &self.tx.is_closed())
            .finish_non_exhaustive()
    }
}

impl Outbox {
    pub(crate) fn new(
        tx: mpsc::Sender<Outbound>,
        prompt: Arc<str>,
        terminal: Arc<TerminalState>,
    ) -> Self {
        Self {
            tx,
            prompt,
            terminal,
        }
    }

    /// An outbox wired to an in-memory receiver instead of a connection.
    ///
    /// Used by tests and by tooling that drives characters without a
    /// network.
    pub fn detached(capacity: usize, prompt: &str) -> (Self, OutboxReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let outbox = Self::new(tx, Arc::from(prompt), Arc::new(TerminalState::default()));
        (outbox, OutboxReceiver { rx })
    }

    /// Queues `text` for the writer.
    ///
    /// # Errors
    /// [`SessionError::Closed`] if the writer is gone.
    pub async fn send(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.tx
            .send(Outbound::Text(text.into()))
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Queues the prompt.
    pub async fn prompt(&self) -> Result<(), SessionError> {
        self.send(self.prompt.as_ref()).await
    }

    /// Queues `text` followed by the prompt.
    pub async fn send_with_prompt(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.send(text).await?;
        self.prompt().await
    }

    pub(crate) async fn echo(&self, text: String) -> Result<(), SessionError> {
        self.tx
            .send(Outbound::Raw(text))
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub fn terminal(&self) -> &TerminalState {
        &self.terminal
    }

    /// True once the writer has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// True if both handles feed the same writer.
    pub fn same_channel(&self, other: &Outbox) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

/// The reading end of a [`detached`](Outbox::detached) outbox.
#[derive(Debug)]
pub struct OutboxReceiver {
    rx: mpsc::Receiver<Outbound>,
}

impl OutboxReceiver {
    /// Next queued message; `None` once every outbox clone is dropped.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await.map(Outbound::into_string)
    }

    /// Everything queued right now, without waiting.
    pub fn drain(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg.into_string());
        }
        out
    }
}
