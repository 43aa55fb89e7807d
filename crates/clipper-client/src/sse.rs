//! Server-Sent Events decoding.
//!
//! Frames are `field: value` lines terminated by a blank line. Lines starting
//! with `:` are comments (heartbeats). Several `data:` lines in one frame are
//! joined with `\n`. Line endings may be `\n` or `\r\n`, and a line can be
//! split across network chunks.

use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::stream::{self, Stream, StreamExt};

use crate::error::{ClientError, ClientResult};

/// Boxed stream of decoded events.
pub type EventStream = Pin<Box<dyn Stream<Item = ClientResult<SseEvent>> + Send>>;

/// One dispatched SSE frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name, `message` when the frame had no `event:` line
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

/// Longest line kept while waiting for its terminator.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Incremental SSE frame decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no newline.
    scanned: usize,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every frame it completes.
    ///
    /// Fails when a line grows past [`MAX_LINE_BYTES`] without a newline;
    /// the partial line is discarded.
    pub fn feed(&mut self, chunk: &[u8]) -> ClientResult<Vec<SseEvent>> {
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut line_start = 0;
        let mut scan_from = self.scanned;
        while let Some(offset) = buffer[scan_from..].iter().position(|&b| b == b'\n') {
            let line_end = scan_from + offset;
            let mut line = &buffer[line_start..line_end];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }

            if let Some(event) = self.process_line(&String::from_utf8_lossy(line)) {
                events.push(event);
            }
            line_start = line_end + 1;
            scan_from = line_start;
        }

        buffer.drain(..line_start);
        if buffer.len() > MAX_LINE_BYTES {
            self.scanned = 0;
            return Err(ClientError::Protocol(format!(
                "Event stream line exceeds {} bytes",
                MAX_LINE_BYTES
            )));
        }

        self.scanned = buffer.len();
        self.buffer = buffer;
        Ok(events)
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            // retry and unknown fields
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        let data = std::mem::take(&mut self.data);
        let id = self.id.take();

        if event.is_none() && data.is_empty() {
            return None;
        }

        Some(SseEvent {
            event: event
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "message".to_string()),
            data: data.join("\n"),
            id,
        })
    }
}

/// Decode a byte stream into SSE frames.
///
/// The returned stream ends when the body ends; a partial frame at the end
/// is discarded.
pub fn event_stream<S, B, E>(body: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ClientError> + Send + 'static,
{
    let state = (Box::pin(body), SseDecoder::new(), VecDeque::<SseEvent>::new());

    let events = stream::unfold(state, |(mut body, mut decoder, mut pending)| async move {
        loop {
            if let Some(event) = pending.pop_front() {
                return Some((Ok(event), (body, decoder, pending)));
            }

            match body.next().await {
                Some(Ok(chunk)) => match decoder.feed(chunk.as_ref()) {
                    Ok(events) => pending.extend(events),
                    Err(error) => return Some((Err(error), (body, decoder, pending))),
                },
                Some(Err(e)) => {
                    let error: ClientError = e.into();
                    return Some((Err(error), (body, decoder, pending)));
                }
                None => return None,
            }
        }
    });

    Box::pin(events)
}
