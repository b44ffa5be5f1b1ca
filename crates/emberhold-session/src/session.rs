//! The per-connection I/O pipeline.
//!
//! Every accepted connection gets two tasks:
//!
//! ```text
//!             ┌────────── reader ──────────┐
//! conn.recv → │ UTF-8 decode → LineEditor  │ → lines ──→ login / input loop
//!             └──────┬─────────────┬───────┘
//!                    │ echo        │ signals (Interrupted, Closed, ReadFailed)
//!                    ▼             ▼
//! Outbox ──→ outbound queue ──→ writer ──→ wrap_text ──→ conn.send
//!                                  │
//!                                  └──→ signals (WriteFailed)
//! ```
//!
//! The reader is the only producer on the line queue, so when it exits the
//! queue closes exactly once and whoever is reading lines sees `None`: that
//! is how the game learns the player is gone. A small supervisor waits on
//! the signal queue and fires the session's cancellation token on the
//! first fatal signal.

use std::sync::Arc;
use std::time::Duration;

use emberhold_protocol::{wrap_text, Edit, LineEditor, Utf8Decoder};
use emberhold_transport::{Connection, ConnectionId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::outbox::Outbound;
use crate::{Outbox, SessionConfig, TerminalState};

/// Sent when an input line outgrows the line editor.
pub const INPUT_TOO_LONG: &str = "\r\nInput too long, discarded.\r\n";

/// Why a pipeline task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// The player pressed the interrupt key.
    Interrupted,
    /// The peer closed the connection.
    Closed,
    /// Reading from the transport failed.
    ReadFailed,
    /// Writing to the transport failed.
    WriteFailed,
}

/// A live connection with its reader and writer running.
pub struct Session<C: Connection> {
    id: ConnectionId,
    conn: Arc<C>,
    outbox: Outbox,
    lines: mpsc::Receiver<String>,
    terminal: Arc<TerminalState>,
    cancel: CancellationToken,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    flush_timeout: Duration,
    /// Dropped without `close` (the handler bailed out): at least stop
    /// reading so the tasks wind down.
    _hangup_on_drop: DropGuard,
}

impl<C: Connection> Session<C> {
    /// Spawns the reader, writer, and supervisor for `conn`.
    pub fn start(conn: C, config: &SessionConfig) -> Self {
        let conn = Arc::new(conn);
        let id = conn.id();
        let terminal = Arc::new(TerminalState::new(
            config.default_width,
            config.default_height,
        ));

        let (out_tx, out_rx) = mpsc::channel(config.outbound_capacity.max(1));
        let (line_tx, line_rx) = mpsc::channel(config.inbound_capacity.max(1));
        let (sig_tx, sig_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let outbox = Outbox::new(
            out_tx,
            Arc::from(config.prompt.as_str()),
            terminal.clone(),
        );

        let reader = tokio::spawn(read_loop(
            conn.clone(),
            ReaderParts {
                lines: line_tx,
                echo: outbox.clone(),
                signals: sig_tx.clone(),
                cancel: cancel.clone(),
                editor: LineEditor::new(config.max_line_len, config.interrupt),
            },
        ));
        let writer = tokio::spawn(write_loop(
            conn.clone(),
            out_rx,
            terminal.clone(),
            sig_tx,
        ));
        tokio::spawn(supervise(id, sig_rx, cancel.clone()));

        info!(%id, "session started");

        Self {
            id,
            conn,
            outbox,
            lines: line_rx,
            terminal,
            _hangup_on_drop: cancel.clone().drop_guard(),
            cancel,
            reader,
            writer,
            flush_timeout: Duration::from_millis(config.flush_timeout_ms),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// A handle for queueing output to this player.
    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    /// The queue of completed input lines. Yields `None` once the player
    /// is gone.
    pub fn lines(&mut self) -> &mut mpsc::Receiver<String> {
        &mut self.lines
    }

    /// Next completed input line, or `None` on disconnect.
    pub async fn read_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    pub fn terminal(&self) -> &Arc<TerminalState> {
        &self.terminal
    }

    /// Turns keystroke echo on or off (off while typing a password).
    pub fn set_echo(&self, on: bool) {
        self.terminal.set_echo(on);
    }

    /// Cancelling this token hangs the session up: the reader stops and
    /// the line queue closes.
    pub fn hangup_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stops reading, lets queued output drain, and closes the connection.
    ///
    /// Every other [`Outbox`] clone for this session should be dropped
    /// first; the writer only finishes once nobody can queue more output.
    /// The reader and the writer each get the flush timeout before they
    /// are aborted.
    pub async fn close(self) {
        let Session {
            id,
            conn,
            outbox,
            lines,
            cancel,
            mut reader,
            mut writer,
            flush_timeout,
            ..
        } = self;

        cancel.cancel();
        match tokio::time::timeout(flush_timeout, &mut reader).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(%id, error = %e, "reader task failed"),
            Err(_) => {
                warn!(%id, "reader did not stop in time, aborting it");
                reader.abort();
            }
        }
        drop(lines);

        drop(outbox);
        match tokio::time::timeout(flush_timeout, &mut writer).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(%id, error = %e, "writer task failed"),
            Err(_) => {
                warn!(%id, "output did not drain in time, dropping it");
                writer.abort();
            }
        }

        if let Err(e) = conn.close().await {
            debug!(%id, error = %e, "close after session end");
        }
        info!(%id, "session closed");
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

struct ReaderParts {
    lines: mpsc::Sender<String>,
    echo: Outbox,
    signals: mpsc::UnboundedSender<SessionSignal>,
    cancel: CancellationToken,
    editor: LineEditor,
}

async fn read_loop<C: Connection>(conn: Arc<C>, parts: ReaderParts) {
    let ReaderParts {
        lines,
        echo,
        signals,
        cancel,
        mut editor,
    } = parts;
    let id = conn.id();
    let mut decoder = Utf8Decoder::new();
    let mut decoded = String::new();

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(%id, "reader cancelled");
                return;
            }
            r = conn.recv() => r,
        };
        let bytes = match received {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(%id, "peer closed connection");
                let _ = signals.send(SessionSignal::Closed);
                return;
            }
            Err(e) => {
                warn!(%id, error = %e, "read failed");
                let _ = signals.send(SessionSignal::ReadFailed);
                return;
            }
        };

        if let Some((w, h)) = conn.window_size() {
            echo.terminal().resize(w, h);
        }

        decoded.clear();
        decoder.decode_into(&bytes, &mut decoded);

        let mut echoed = String::new();
        for c in decoded.chars() {
            let edit = editor.push(c);
            if echo.terminal().echo() {
                edit.echo_into(&mut echoed);
            }
            match edit {
                Edit::Line(line) => {
                    if !flush_echo(&echo, &mut echoed, &cancel).await {
                        return;
                    }
                    let sent = tokio::select! {
                        _ = cancel.cancelled() => return,
                        r = lines.send(line) => r,
                    };
                    if sent.is_err() {
                        // Nobody is reading lines any more.
                        return;
                    }
                }
                Edit::Overflow => {
                    if !flush_echo(&echo, &mut echoed, &cancel).await {
                        return;
                    }
                    warn!(%id, limit = editor.max_len(), "input line too long, discarded");
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = echo.send(INPUT_TOO_LONG) => {}
                    }
                }
                Edit::Interrupt => {
                    info!(%id, "interrupt received");
                    let _ = signals.send(SessionSignal::Interrupted);
                    return;
                }
                Edit::Ignored | Edit::Append(_) | Edit::Erase | Edit::Blank => {}
            }
        }
        if !flush_echo(&echo, &mut echoed, &cancel).await {
            return;
        }
    }
}

/// Queues pending echo. Returns `false` if the session was hung up while
/// waiting for room in the queue.
async fn flush_echo(outbox: &Outbox, echoed: &mut String, cancel: &CancellationToken) -> bool {
    if echoed.is_empty() {
        return true;
    }
    let text = std::mem::take(echoed);
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = outbox.echo(text) => true,
    }
}

async fn write_loop<C: Connection>(
    conn: Arc<C>,
    mut rx: mpsc::Receiver<Outbound>,
    terminal: Arc<TerminalState>,
    signals: mpsc::UnboundedSender<SessionSignal>,
) {
    let id = conn.id();
    while let Some(msg) = rx.recv().await {
        let text = match msg {
            Outbound::Text(text) => wrap_text(&text, usize::from(terminal.width())),
            Outbound::Raw(raw) => raw,
        };
        if let Err(e) = conn.send(text.as_bytes()).await {
            warn!(%id, error = %e, "write failed");
            let _ = signals.send(SessionSignal::WriteFailed);
            return;
        }
    }
    debug!(%id, "writer drained");
}

async fn supervise(
    id: ConnectionId,
    mut signals: mpsc::UnboundedReceiver<SessionSignal>,
    cancel: CancellationToken,
) {
    tokio::select! {
        signal = signals.recv() => {
            if let Some(signal) = signal {
                debug!(%id, ?signal, "session ending");
            }
            cancel.cancel();
        }
        _ = cancel.cancelled() => {}
    }
}
