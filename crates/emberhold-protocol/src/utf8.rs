//! Streaming UTF-8 decoding.
//!
//! A transport hands over bytes in whatever chunks the network produced, so
//! a multi-byte character can arrive split across two reads. The decoder
//! holds back an incomplete tail until the rest shows up. Bytes that can
//! never form valid UTF-8 become U+FFFD instead of failing the session.

/// Incremental decoder from byte chunks to code points.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// At most three bytes of an unfinished sequence.
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `chunk`, appending every completed character to `out`.
    pub fn decode_into(&mut self, chunk: &[u8], out: &mut String) {
        let joined;
        let mut input: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(chunk);
            joined = buf;
            &joined
        };

        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    return;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    // `valid_up_to` guarantees this prefix is UTF-8.
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        // Truncated sequence at the end: wait for more bytes.
                        None => {
                            self.pending.extend_from_slice(rest);
                            return;
                        }
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[bad..];
                        }
                    }
                }
            }
        }
    }

    /// Convenience wrapper around [`decode_into`](Self::decode_into).
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut out = String::with_capacity(chunk.len());
        self.decode_into(chunk, &mut out);
        out
    }

    /// True if bytes of an unfinished character are being held back.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
