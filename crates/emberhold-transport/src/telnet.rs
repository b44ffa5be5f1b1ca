//! Telnet-over-TCP transport.
//!
//! Classic MUD clients speak raw TCP with in-band telnet commands. The
//! transport strips every `IAC` sequence before handing bytes to the
//! session, answers option negotiation, and tracks the window size the
//! client reports through NAWS (RFC 1073).
//!
//! On accept the server announces `WILL ECHO` and `WILL SGA` (we echo
//! input ourselves, character at a time) and asks `DO NAWS`. Any other
//! option the client proposes is refused.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, Transport, TransportError};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const OPT_ECHO: u8 = 1;
const OPT_SGA: u8 = 3;
const OPT_NAWS: u8 = 31;

const READ_CHUNK: usize = 1024;

/// Payload bytes kept from a subnegotiation. NAWS needs four; everything
/// past that, and every other option's payload, is discarded.
const NAWS_LEN: usize = 4;

// ---------------------------------------------------------------------------
// IAC parser
// ---------------------------------------------------------------------------

/// Output of one [`IacParser::parse`] call.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Parsed {
    /// The stream with every telnet command removed.
    pub data: Vec<u8>,
    /// Negotiation replies to write back to the peer.
    pub replies: Vec<u8>,
    /// The last complete NAWS report in this chunk, if any.
    pub window: Option<(u16, u16)>,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Data,
    Iac,
    Negotiate(u8),
    Subneg {
        opt: Option<u8>,
        iac_seen: bool,
        buf: Vec<u8>,
    },
}

/// Streaming telnet command stripper.
///
/// Sequences may be split across reads; the parser keeps its state between
/// calls.
#[derive(Debug, Default)]
pub struct IacParser {
    state: State,
}

impl IacParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes the server sends right after accepting a connection.
    pub fn greeting() -> [u8; 9] {
        [IAC, WILL, OPT_ECHO, IAC, WILL, OPT_SGA, IAC, DO, OPT_NAWS]
    }

    pub fn parse(&mut self, chunk: &[u8]) -> Parsed {
        let mut out = Parsed {
            data: Vec::with_capacity(chunk.len()),
            ..Parsed::default()
        };

        for &b in chunk {
            match &mut self.state {
                State::Data => {
                    if b == IAC {
                        self.state = State::Iac;
                    } else {
                        out.data.push(b);
                    }
                }
                State::Iac => {
                    self.state = match b {
                        IAC => {
                            out.data.push(IAC);
                            State::Data
                        }
                        DO | DONT | WILL | WONT => State::Negotiate(b),
                        SB => State::Subneg {
                            opt: None,
                            iac_seen: false,
                            buf: Vec::new(),
                        },
                        // NOP, GA, AYT and friends carry no payload.
                        _ => State::Data,
                    };
                }
                State::Negotiate(cmd) => {
                    match (*cmd, b) {
                        // Acknowledgements of what we offered in the greeting.
                        (DO, OPT_ECHO | OPT_SGA) | (WILL, OPT_NAWS) => {}
                        (DO, opt) => out.replies.extend_from_slice(&[IAC, WONT, opt]),
                        (WILL, opt) => out.replies.extend_from_slice(&[IAC, DONT, opt]),
                        // DONT/WONT need no answer; replying would loop.
                        _ => {}
                    }
                    self.state = State::Data;
                }
                State::Subneg { opt, iac_seen, buf } => {
                    if opt.is_none() {
                        *opt = Some(b);
                        continue;
                    }
                    if *iac_seen {
                        *iac_seen = false;
                        match b {
                            SE => {
                                if *opt == Some(OPT_NAWS) && buf.len() >= 4 {
                                    let w = u16::from_be_bytes([buf[0], buf[1]]);
                                    let h = u16::from_be_bytes([buf[2], buf[3]]);
                                    out.window = Some((w, h));
                                }
                                self.state = State::Data;
                            }
                            IAC => keep_naws_byte(*opt, buf, IAC),
                            _ => {}
                        }
                        continue;
                    }
                    if b == IAC {
                        *iac_seen = true;
                    } else {
                        keep_naws_byte(*opt, buf, b);
                    }
                }
            }
        }

        out
    }
}

fn keep_naws_byte(opt: Option<u8>, buf: &mut Vec<u8>, b: u8) {
    if opt == Some(OPT_NAWS) && buf.len() < NAWS_LEN {
        buf.push(b);
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// A raw TCP [`Transport`] speaking telnet.
pub struct TelnetTransport {
    listener: TcpListener,
}

impl TelnetTransport {
    /// Binds a new telnet transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "telnet transport listening");
        Ok(Self { listener })
    }
}

impl Transport for TelnetTransport {
    type Connection = TelnetConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        // Prompts and echoes are tiny writes; don't let Nagle sit on them.
        stream.set_nodelay(true).map_err(TransportError::AcceptFailed)?;

        let id = ConnectionId::next();
        tracing::debug!(%id, %addr, "accepted telnet connection");

        let (reader, mut writer) = stream.into_split();
        writer
            .write_all(&IacParser::greeting())
            .await
            .map_err(TransportError::AcceptFailed)?;

        Ok(TelnetConnection {
            id,
            reader: Mutex::new((reader, IacParser::new())),
            writer: Mutex::new(writer),
            window: AtomicU32::new(0),
        })
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }
}

/// A single telnet connection.
pub struct TelnetConnection {
    id: ConnectionId,
    reader: Mutex<(OwnedReadHalf, IacParser)>,
    writer: Mutex<OwnedWriteHalf>,
    /// `width << 16 | height`; zero until the client reports NAWS.
    window: AtomicU32,
}

impl Connection for TelnetConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        // A literal 0xff in the payload must be doubled on the wire.
        let escaped;
        let bytes = if data.contains(&IAC) {
            escaped = data
                .iter()
                .flat_map(|&b| if b == IAC { vec![IAC, IAC] } else { vec![b] })
                .collect::<Vec<u8>>();
            &escaped[..]
        } else {
            data
        };
        self.writer
            .lock()
            .await
            .write_all(bytes)
            .await
            .map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut guard = self.reader.lock().await;
        let (reader, parser) = &mut *guard;
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = reader
                .read(&mut buf)
                .await
                .map_err(TransportError::ReceiveFailed)?;
            if n == 0 {
                return Ok(None);
            }

            let parsed = parser.parse(&buf[..n]);
            if let Some((w, h)) = parsed.window {
                tracing::trace!(id = %self.id, w, h, "NAWS");
                self.window
                    .store((u32::from(w) << 16) | u32::from(h), Ordering::Relaxed);
            }
            if !parsed.replies.is_empty() {
                self.writer
                    .lock()
                    .await
                    .write_all(&parsed.replies)
                    .await
                    .map_err(TransportError::SendFailed)?;
            }
            // A chunk that was pure negotiation carries nothing for the
            // session; keep reading.
            if !parsed.data.is_empty() {
                return Ok(Some(parsed.data));
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_data_passes_through() {
        let mut p = IacParser::new();
        let parsed = p.parse(b"look\r\n");
        assert_eq!(parsed.data, b"look\r\n");
        assert!(parsed.replies.is_empty());
        assert_eq!(parsed.window, None);
    }

    #[test]
    fn test_escaped_iac_is_literal() {
        let mut p = IacParser::new();
        assert_eq!(p.parse(&[IAC, IAC, b'a']).data, vec![IAC, b'a']);
    }

    #[test]
    fn test_acknowledgements_of_our_offers_are_silent() {
        let mut p = IacParser::new();
        let parsed = p.parse(&[IAC, DO, OPT_ECHO, IAC, DO, OPT_SGA, IAC, WILL, OPT_NAWS]);
        assert!(parsed.data.is_empty());
        assert!(parsed.replies.is_empty());
    }

    #[test]
    fn test_unknown_options_are_refused() {
        let mut p = IacParser::new();
        // DO TTYPE(24), WILL LINEMODE(34)
        let parsed = p.parse(&[IAC, DO, 24, IAC, WILL, 34, b'x']);
        assert_eq!(parsed.data, vec![b'x']);
        assert_eq!(parsed.replies, vec![IAC, WONT, 24, IAC, DONT, 34]);
    }

    #[test]
    fn test_dont_and_wont_get_no_reply() {
        let mut p = IacParser::new();
        let parsed = p.parse(&[IAC, DONT, OPT_ECHO, IAC, WONT, OPT_NAWS]);
        assert!(parsed.replies.is_empty());
    }

    #[test]
    fn test_naws_is_reported() {
        let mut p = IacParser::new();
        // IAC SB NAWS 0 120 0 40 IAC SE
        let parsed = p.parse(&[IAC, SB, OPT_NAWS, 0, 120, 0, 40, IAC, SE, b'n']);
        assert_eq!(parsed.window, Some((120, 40)));
        assert_eq!(parsed.data, vec![b'n']);
    }

    #[test]
    fn test_naws_split_across_reads() {
        let mut p = IacParser::new();
        let first = p.parse(&[IAC, SB, OPT_NAWS, 0]);
        assert_eq!(first.window, None);
        let second = p.parse(&[100, 0, 30, IAC, SE]);
        assert_eq!(second.window, Some((100, 30)));
    }

    #[test]
    fn test_naws_with_escaped_255_width() {
        let mut p = IacParser::new();
        let parsed = p.parse(&[IAC, SB, OPT_NAWS, 0, IAC, IAC, 0, 50, IAC, SE]);
        assert_eq!(parsed.window, Some((255, 50)));
    }

    #[test]
    fn test_other_subnegotiation_is_stripped() {
        let mut p = IacParser::new();
        let parsed = p.parse(&[b'a', IAC, SB, 24, b'x', IAC, SE, b'b']);
        assert_eq!(parsed.data, vec![b'a', b'b']);
        assert_eq!(parsed.window, None);
    }

    #[test]
    fn test_unterminated_subnegotiation_is_not_buffered() {
        let mut p = IacParser::new();
        p.parse(&[IAC, SB, 24]);
        let junk = vec![b'x'; 1 << 20];
        for _ in 0..8 {
            let parsed = p.parse(&junk);
            assert!(parsed.data.is_empty());
        }
        match &p.state {
            State::Subneg { buf, .. } => assert!(buf.is_empty()),
            other => panic!("expected to still be inside the subnegotiation, got {other:?}"),
        }
        let parsed = p.parse(&[IAC, SE, b'k']);
        assert_eq!(parsed.data, vec![b'k']);
    }

    #[test]
    fn test_oversized_naws_keeps_first_four_bytes() {
        let mut p = IacParser::new();
        let mut chunk = vec![IAC, SB, OPT_NAWS, 0, 80, 0, 24];
        chunk.extend(std::iter::repeat_n(7u8, 4096));
        p.parse(&chunk);
        match &p.state {
            State::Subneg { buf, .. } => assert_eq!(buf.len(), NAWS_LEN),
            other => panic!("expected to still be inside the subnegotiation, got {other:?}"),
        }
        assert_eq!(p.parse(&[IAC, SE]).window, Some((80, 24)));
    }
}
