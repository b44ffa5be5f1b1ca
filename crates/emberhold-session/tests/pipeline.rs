//! Integration tests for the session I/O pipeline.
//!
//! A scripted in-memory connection stands in for the network: the test
//! pushes keystroke chunks in and collects everything the writer sent.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use emberhold_session::{Session, SessionConfig, INPUT_TOO_LONG};
use emberhold_transport::{Connection, ConnectionId, TransportError};
use tokio::sync::{mpsc, Mutex};

// =========================================================================
// Scripted connection
// =========================================================================

struct ScriptedConnection {
    id: ConnectionId,
    input: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    output: mpsc::UnboundedSender<Vec<u8>>,
    window: Arc<AtomicU32>,
    fail_writes: Arc<AtomicBool>,
    stall_writes: Arc<AtomicBool>,
}

impl Connection for ScriptedConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(TransportError::ConnectionClosed("scripted failure".into()));
        }
        if self.stall_writes.load(Ordering::Relaxed) {
            // A peer that stopped reading: the socket never drains.
            std::future::pending::<()>().await;
        }
        self.output
            .send(data.to_vec())
            .map_err(|_| TransportError::ConnectionClosed("test dropped output".into()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.input.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn window_size(&self) -> Option<(u16, u16)> {
        match self.window.load(Ordering::Relaxed) {
            0 => None,
            packed => Some(((packed >> 16) as u16, packed as u16)),
        }
    }
}

/// The test's side of the connection.
struct Peer {
    keys: Option<mpsc::UnboundedSender<Vec<u8>>>,
    screen: mpsc::UnboundedReceiver<Vec<u8>>,
    window: Arc<AtomicU32>,
    fail_writes: Arc<AtomicBool>,
    stall_writes: Arc<AtomicBool>,
}

impl Peer {
    fn type_keys(&self, s: &str) {
        if let Some(keys) = &self.keys {
            keys.send(s.as_bytes().to_vec()).unwrap();
        }
    }

    fn hang_up(&mut self) {
        self.keys = None;
    }

    /// Reads screen output until it contains `needle`.
    async fn expect(&mut self, needle: &str) -> String {
        let mut seen = String::new();
        let wait = async {
            while !seen.contains(needle) {
                match self.screen.recv().await {
                    Some(bytes) => seen.push_str(&String::from_utf8_lossy(&bytes)),
                    None => break,
                }
            }
        };
        let _ = tokio::time::timeout(Duration::from_secs(5), wait).await;
        assert!(seen.contains(needle), "expected {needle:?} in {seen:?}");
        seen
    }

    /// Everything written so far.
    fn drain(&mut self) -> String {
        let mut seen = String::new();
        while let Ok(bytes) = self.screen.try_recv() {
            seen.push_str(&String::from_utf8_lossy(&bytes));
        }
        seen
    }
}

fn start(config: SessionConfig) -> (Session<ScriptedConnection>, Peer) {
    let (key_tx, key_rx) = mpsc::unbounded_channel();
    let (screen_tx, screen_rx) = mpsc::unbounded_channel();
    let window = Arc::new(AtomicU32::new(0));
    let fail_writes = Arc::new(AtomicBool::new(false));
    let stall_writes = Arc::new(AtomicBool::new(false));
    let conn = ScriptedConnection {
        id: ConnectionId::new(1),
        input: Mutex::new(key_rx),
        output: screen_tx,
        window: window.clone(),
        fail_writes: fail_writes.clone(),
        stall_writes: stall_writes.clone(),
    };
    let peer = Peer {
        keys: Some(key_tx),
        screen: screen_rx,
        window,
        fail_writes,
        stall_writes,
    };
    (Session::start(conn, &config), peer)
}

// =========================================================================
// Reader
// =========================================================================

#[tokio::test]
async fn test_keystrokes_become_lines() {
    let (mut session, peer) = start(SessionConfig::default());
    peer.type_keys("lo");
    peer.type_keys("ok\r\n");
    peer.type_keys("say hello\n");

    assert_eq!(session.read_line().await.as_deref(), Some("look"));
    assert_eq!(session.read_line().await.as_deref(), Some("say hello"));
}

#[tokio::test]
async fn test_typed_characters_are_echoed() {
    let (mut session, mut peer) = start(SessionConfig::default());
    peer.type_keys("wha\u{7f}o\r\n");

    assert_eq!(session.read_line().await.as_deref(), Some("who"));
    peer.expect("wha\u{8} \u{8}o\r\n").await;
}

#[tokio::test]
async fn test_echo_off_hides_input() {
    let (mut session, mut peer) = start(SessionConfig::default());
    session.set_echo(false);
    peer.type_keys("hunter2\r");

    assert_eq!(session.read_line().await.as_deref(), Some("hunter2"));
    session.outbox().send("marker").await.unwrap();
    let screen = peer.expect("marker").await;
    assert!(!screen.contains("hunter2"));
}

#[tokio::test]
async fn test_long_line_is_discarded_with_notice() {
    let (mut session, mut peer) = start(SessionConfig {
        max_line_len: 8,
        ..SessionConfig::default()
    });
    session.set_echo(false);
    peer.type_keys("abcdefghijk\r");
    peer.type_keys("go\r");

    peer.expect(INPUT_TOO_LONG).await;
    // The key that overflowed is dropped with the rest; typing after it
    // starts a fresh line.
    assert_eq!(session.read_line().await.as_deref(), Some("jk"));
    assert_eq!(session.read_line().await.as_deref(), Some("go"));
}

#[tokio::test]
async fn test_split_utf8_sequence_is_reassembled() {
    let (mut session, peer) = start(SessionConfig::default());
    let bytes = "say café\r".as_bytes();
    let split = bytes.len() - 2; // inside the é
    peer.keys.as_ref().unwrap().send(bytes[..split].to_vec()).unwrap();
    peer.keys.as_ref().unwrap().send(bytes[split..].to_vec()).unwrap();

    assert_eq!(session.read_line().await.as_deref(), Some("say café"));
}

#[tokio::test]
async fn test_interrupt_closes_line_queue() {
    let (mut session, peer) = start(SessionConfig::default());
    peer.type_keys("half a comm\u{3}and\r");

    assert_eq!(session.read_line().await, None);
}

#[tokio::test]
async fn test_peer_hangup_closes_line_queue() {
    let (mut session, mut peer) = start(SessionConfig::default());
    peer.type_keys("look\r");
    peer.hang_up();

    assert_eq!(session.read_line().await.as_deref(), Some("look"));
    assert_eq!(session.read_line().await, None);
}

#[tokio::test]
async fn test_hangup_token_closes_line_queue() {
    let (mut session, _peer) = start(SessionConfig::default());
    session.hangup_token().cancel();
    assert_eq!(session.read_line().await, None);
}

#[tokio::test]
async fn test_window_report_updates_terminal() {
    let (mut session, peer) = start(SessionConfig::default());
    peer.window.store((100 << 16) | 30, Ordering::Relaxed);
    peer.type_keys("x\r");

    session.read_line().await;
    assert_eq!(session.terminal().width(), 100);
    assert_eq!(session.terminal().height(), 30);
}

// =========================================================================
// Writer
// =========================================================================

#[tokio::test]
async fn test_output_is_wrapped_to_width() {
    let (session, mut peer) = start(SessionConfig {
        default_width: 20,
        ..SessionConfig::default()
    });
    session
        .outbox()
        .send("A narrow alley winds between leaning houses.\n")
        .await
        .unwrap();

    let screen = peer.expect("houses.\r\n").await;
    assert_eq!(screen, "A narrow alley winds\r\nbetween leaning\r\nhouses.\r\n");
}

#[tokio::test]
async fn test_messages_arrive_in_order() {
    let (session, mut peer) = start(SessionConfig::default());
    let outbox = session.outbox();
    for i in 0..10 {
        outbox.send(format!("line {i}\n")).await.unwrap();
    }
    outbox.prompt().await.unwrap();

    let screen = peer.expect("> ").await;
    let expected: String = (0..10).map(|i| format!("line {i}\r\n")).collect::<String>() + "> ";
    assert_eq!(screen, expected);
}

#[tokio::test]
async fn test_write_failure_hangs_up() {
    let (mut session, peer) = start(SessionConfig::default());
    peer.fail_writes.store(true, Ordering::Relaxed);
    session.outbox().send("into the void").await.unwrap();

    assert_eq!(session.read_line().await, None);
}

#[tokio::test]
async fn test_close_flushes_queued_output() {
    let (session, mut peer) = start(SessionConfig::default());
    session.outbox().send("Goodbye.\n").await.unwrap();
    session.close().await;

    assert!(peer.drain().contains("Goodbye.\r\n"));
}

#[tokio::test(start_paused = true)]
async fn test_close_gives_up_on_stuck_writer() {
    let (session, _peer) = start(SessionConfig {
        flush_timeout_ms: 100,
        ..SessionConfig::default()
    });
    // A stray clone keeps the writer's queue open forever.
    let leaked = session.outbox();
    tokio::time::timeout(Duration::from_secs(5), session.close())
        .await
        .expect("close must not hang on a leaked outbox");
    drop(leaked);
}

#[tokio::test(start_paused = true)]
async fn test_close_does_not_hang_on_reader_stuck_behind_full_queue() {
    let (session, peer) = start(SessionConfig {
        outbound_capacity: 1,
        flush_timeout_ms: 100,
        ..SessionConfig::default()
    });
    peer.stall_writes.store(true, Ordering::Relaxed);
    // The writer blocks on the first echo, the queue takes the second and
    // the reader is left waiting to queue the rest.
    for keys in ["a", "b", "c", "d"] {
        peer.type_keys(keys);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    tokio::time::timeout(Duration::from_secs(5), session.close())
        .await
        .expect("close must not wait on a reader blocked by a stalled peer");
}

#[tokio::test(start_paused = true)]
async fn test_overflow_notice_does_not_block_hangup() {
    let (mut session, peer) = start(SessionConfig {
        outbound_capacity: 1,
        max_line_len: 2,
        ..SessionConfig::default()
    });
    session.set_echo(false);
    peer.stall_writes.store(true, Ordering::Relaxed);
    session.outbox().send("fills the writer").await.unwrap();
    session.outbox().send("fills the queue").await.unwrap();
    peer.type_keys("abc");
    tokio::time::sleep(Duration::from_millis(10)).await;

    session.hangup_token().cancel();
    let ended = tokio::time::timeout(Duration::from_secs(5), session.read_line()).await;
    assert_eq!(ended.expect("reader must notice the hangup"), None);
}

