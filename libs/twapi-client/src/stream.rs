//! Streaming decoder.
//!
//! A stream response body is a sequence of JSON values with no outer array
//! and nothing but whitespace between them. Values may be split across
//! transport chunks or packed several to a chunk. Each value is decoded into
//! a [`Reply`] and handed to the caller's callback, in arrival order, until
//! one of:
//!
//! - the server closes the body cleanly (no error),
//! - the callback returns [`StopStreaming`] (no error),
//! - the caller cancels (no error),
//! - a message is malformed or the body read fails (error),
//! - the callback returns any other error (error, tagged "callback").
//!
//! The body is closed exactly once whichever way the loop ends.

use bytes::{Buf, Bytes, BytesMut};
use futures::StreamExt;
use serde::de::IgnoredAny;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::body::BodyStream;
use crate::error::{BoxError, Error, Result};
use crate::log::{Diagnostics, TAG_STREAM_BODY};
use crate::reply::Reply;

/// Sentinel a stream callback returns to end the stream without error.
///
/// ```
/// # use twapi_client::{BoxError, Reply, StopStreaming};
/// let mut seen = 0;
/// let mut callback = |_reply: Reply| -> Result<(), BoxError> {
///     seen += 1;
///     if seen == 3 {
///         return Err(StopStreaming.into());
///     }
///     Ok(())
/// };
/// # let _ = callback(Reply::default());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Error)]
#[error("stop streaming")]
pub struct StopStreaming;

/// Report whether a callback error is the [`StopStreaming`] sentinel
#[must_use]
pub fn is_stop_streaming(err: &BoxError) -> bool {
    err.is::<StopStreaming>()
}

/// Why a stream ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamEnd {
    /// The server closed the body with no partial message pending
    Closed,
    /// The callback returned [`StopStreaming`]
    Stopped,
    /// The cancellation token fired
    Cancelled,
}

/// Owns the open response body; closing is idempotent and also happens on drop.
pub(crate) struct StreamBody {
    body: Option<BodyStream>,
}

impl StreamBody {
    pub(crate) fn new(body: BodyStream) -> Self {
        Self { body: Some(body) }
    }

    async fn next_chunk(&mut self) -> Option<Result<Bytes>> {
        match self.body.as_mut() {
            Some(body) => body.next().await,
            None => None,
        }
    }

    /// Release the body. Returns `false` if it was already closed.
    pub(crate) fn close(&mut self) -> bool {
        let was_open = self.body.take().is_some();
        if was_open {
            tracing::trace!("stream body closed");
        }
        was_open
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.body.is_none()
    }
}

impl Drop for StreamBody {
    fn drop(&mut self) {
        self.close();
    }
}

fn is_json_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Splits buffered body bytes into complete top-level JSON values.
///
/// Boundaries are found by a resumable scan, so bytes of a message split
/// across many chunks are only looked at once before the value is parsed.
#[derive(Debug, Default)]
struct MessageBuffer {
    buf: BytesMut,
    scan: Scan,
}

/// Progress through the value at the front of the buffer
#[derive(Debug, Default)]
struct Scan {
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl MessageBuffer {
    fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Take the next complete value, or `None` if more input is needed.
    ///
    /// With `at_eof` set, any pending non-whitespace that is not a complete
    /// value is a decode error.
    fn next_message(&mut self, at_eof: bool) -> Result<Option<Bytes>> {
        if self.scan.pos == 0 {
            let Some(start) = self.buf.iter().position(|b| !is_json_whitespace(*b)) else {
                self.buf.clear();
                return Ok(None);
            };
            self.buf.advance(start);
        }

        let end = match self.buf[0] {
            b'{' | b'[' | b'"' => self.scan_delimited(),
            _ => self.scan_scalar(),
        };
        let end = match end {
            Some(end) => end,
            None if at_eof => self.buf.len(),
            None => return Ok(None),
        };

        self.scan = Scan::default();
        let message = self.buf.split_to(end).freeze();
        match serde_json::from_slice::<IgnoredAny>(&message) {
            Ok(_) => Ok(Some(message)),
            Err(e) => Err(Error::decode("decoding message from stream", message, e)),
        }
    }

    /// End of an object, array or string starting at the front of the buffer
    fn scan_delimited(&mut self) -> Option<usize> {
        let string_only = self.buf[0] == b'"';
        let scan = &mut self.scan;
        for (i, b) in self.buf.iter().enumerate().skip(scan.pos) {
            if scan.in_string {
                if scan.escaped {
                    scan.escaped = false;
                } else if *b == b'\\' {
                    scan.escaped = true;
                } else if *b == b'"' {
                    scan.in_string = false;
                    if string_only {
                        return Some(i + 1);
                    }
                }
                continue;
            }
            match b {
                b'"' => scan.in_string = true,
                b'{' | b'[' => scan.depth += 1,
                b'}' | b']' => {
                    scan.depth = scan.depth.saturating_sub(1);
                    if scan.depth == 0 {
                        return Some(i + 1);
                    }
                }
                _ => {}
            }
        }
        scan.pos = self.buf.len();
        None
    }

    /// End of a bare number or literal. One ending at the buffer edge may
    /// continue in the next chunk.
    fn scan_scalar(&mut self) -> Option<usize> {
        let from = self.scan.pos.max(1);
        let end = self.buf[from..]
            .iter()
            .position(|b| {
                is_json_whitespace(*b) || matches!(b, b'{' | b'}' | b'[' | b']' | b'"' | b',' | b':')
            })
            .map(|offset| from + offset);
        if end.is_none() {
            self.scan.pos = self.buf.len();
        }
        end
    }
}

enum Read {
    Message(Bytes),
    End,
    Cancelled,
}

/// Reads whole messages off a [`StreamBody`], racing each read against
/// cancellation.
struct MessageReader {
    body: StreamBody,
    buffer: MessageBuffer,
}

impl MessageReader {
    fn new(body: StreamBody) -> Self {
        Self {
            body,
            buffer: MessageBuffer::default(),
        }
    }

    async fn next(&mut self, cancel: &CancellationToken) -> Result<Read> {
        loop {
            if cancel.is_cancelled() {
                self.body.close();
                return Ok(Read::Cancelled);
            }
            if let Some(message) = self.buffer.next_message(self.body.is_closed())? {
                return Ok(Read::Message(message));
            }
            if self.body.is_closed() {
                return Ok(Read::End);
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    // Closing the body drops the connection; the pending read
                    // is abandoned rather than failed.
                    self.body.close();
                    return Ok(Read::Cancelled);
                }
                chunk = self.body.next_chunk() => match chunk {
                    Some(Ok(bytes)) => self.buffer.push(&bytes),
                    Some(Err(e)) => return Err(e),
                    None => {
                        self.body.close();
                    }
                },
            }
        }
    }
}

/// Drive `callback` with every message of `body` until the stream ends.
pub(crate) async fn run<F>(
    cancel: &CancellationToken,
    body: BodyStream,
    diag: &Diagnostics,
    mut callback: F,
) -> Result<StreamEnd>
where
    F: FnMut(Reply) -> Result<(), BoxError>,
{
    let mut reader = MessageReader::new(StreamBody::new(body));
    let mut delivered = 0_u64;
    let outcome = pump(&mut reader, cancel, diag, &mut callback, &mut delivered).await;
    reader.body.close();

    match &outcome {
        Ok(end) => tracing::debug!(?end, delivered, "stream ended"),
        Err(e) => tracing::warn!(error = %e, delivered, "stream failed"),
    }
    outcome
}

async fn pump<F>(
    reader: &mut MessageReader,
    cancel: &CancellationToken,
    diag: &Diagnostics,
    callback: &mut F,
    delivered: &mut u64,
) -> Result<StreamEnd>
where
    F: FnMut(Reply) -> Result<(), BoxError>,
{
    loop {
        let message = match reader.next(cancel).await? {
            Read::Message(message) => message,
            Read::End => return Ok(StreamEnd::Closed),
            Read::Cancelled => return Ok(StreamEnd::Cancelled),
        };
        diag.emit_bytes(TAG_STREAM_BODY, &message);

        let reply = Reply::from_slice(&message, "decoding stream response")?;
        *delivered += 1;
        match callback(reply) {
            Ok(()) => {}
            Err(e) if is_stop_streaming(&e) => return Ok(StreamEnd::Stopped),
            Err(e) => return Err(Error::callback(e)),
        }
    }
}
