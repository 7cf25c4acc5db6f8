//! Wire codec for the camera's TCP API.
//!
//! Requests are single JSON records with no terminator. A single socket
//! read may carry several reply records separated by NUL bytes, some of
//! them unsolicited notifications listed in [`SKIP_LIST`].

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::X7Error;
use crate::message::{Reply, Request};

/// Separator between concatenated reply records.
pub const REPLY_SEPARATOR: u8 = 0;

/// Largest chunk pulled from the socket in one read.
pub const MAX_READ_SIZE: usize = 65556;

/// `(field, value)` pairs of unsolicited replies that never answer a request.
pub const SKIP_LIST: &[(&str, &str)] = &[("msg_id", "16777217")];

/// Returns `true` if the reply matches an entry of [`SKIP_LIST`].
pub fn is_skipped(reply: &Reply) -> bool {
    SKIP_LIST
        .iter()
        .any(|(field, value)| reply.field_text(field).as_deref() == Some(*value))
}

// ── ReplyBatch ───────────────────────────────────────────────────

/// The non-skipped replies found in one socket read.
#[derive(Debug, Default)]
pub struct ReplyBatch {
    replies: Vec<Reply>,
    skipped: usize,
}

impl ReplyBatch {
    pub fn len(&self) -> usize {
        self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }

    /// Number of records dropped by the skip list.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Pick "the" answer of the batch.
    ///
    /// `Ok(None)` means everything was skipped and the caller has to read
    /// again. More than one answer means the stream is out of sync.
    pub fn resolve(mut self) -> Result<Option<Reply>, X7Error> {
        match self.replies.len() {
            0 => Ok(None),
            1 => Ok(self.replies.pop()),
            n => Err(X7Error::Protocol(format!("too many replies ({n})"))),
        }
    }
}

// ── CameraCodec ──────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct CameraCodec;

impl Decoder for CameraCodec {
    type Item = ReplyBatch;
    type Error = X7Error;

    /// Consumes everything buffered as one batch.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let chunk = src.split();
        let mut batch = ReplyBatch::default();
        for fragment in chunk[..].split(|b| *b == REPLY_SEPARATOR) {
            let text = std::str::from_utf8(fragment)
                .map_err(|e| X7Error::Protocol(format!("reply is not utf-8: {e}")))?
                .trim();
            if text.is_empty() {
                continue;
            }

            let reply = Reply::parse(text)?;
            if is_skipped(&reply) {
                batch.skipped += 1;
            } else {
                batch.replies.push(reply);
            }
        }
        Ok(Some(batch))
    }
}

impl Encoder<&Request> for CameraCodec {
    type Error = X7Error;

    fn encode(&mut self, item: &Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = serde_json::to_vec(item)?;
        dst.extend_from_slice(&payload);
        Ok(())
    }
}
