use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};

use crate::error::RelayError;

const SSE_DELIMITER: &str = "\n\n";

/// Turns a streaming HTTP response into parsed SSE payloads.
///
/// `parser` sees each complete event (delimiter included) and may drop it
/// by returning `Ok(None)`.
pub(crate) fn create_sse_stream<F>(
    response: reqwest::Response,
    parser: F,
) -> Pin<Box<dyn Stream<Item = Result<String, RelayError>> + Send>>
where
    F: Fn(&str) -> Result<Option<String>, RelayError> + Send + 'static,
{
    let stream = response
        .bytes_stream()
        .scan(SseDecoder::default(), move |decoder, chunk| {
            let results = handle_chunk(decoder, chunk, &parser);
            async move { Some(results) }
        })
        .flat_map(futures::stream::iter);

    Box::pin(stream)
}

fn handle_chunk<F>(
    decoder: &mut SseDecoder,
    chunk: Result<Bytes, reqwest::Error>,
    parser: &F,
) -> Vec<Result<String, RelayError>>
where
    F: Fn(&str) -> Result<Option<String>, RelayError>,
{
    let bytes = match chunk {
        Ok(bytes) => bytes,
        Err(err) => return vec![Err(RelayError::ProviderUnavailable(err.to_string()))],
    };

    decoder.push_bytes(&bytes);
    let mut results = Vec::new();
    while let Some(event) = decoder.next_event() {
        match parser(&event) {
            Ok(Some(content)) => results.push(Ok(content)),
            Ok(None) => {}
            Err(err) => results.push(Err(err)),
        }
    }
    results
}

/// Incremental event-stream decoder.
///
/// Bytes may arrive split anywhere, including inside a multi-byte UTF-8
/// sequence or inside an event. Only complete events are handed out; the
/// incomplete tail stays buffered until more bytes arrive.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
    utf8_buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.utf8_buffer.extend_from_slice(bytes);
        loop {
            match std::str::from_utf8(&self.utf8_buffer) {
                Ok(text) => {
                    push_normalized(&mut self.buffer, text);
                    self.utf8_buffer.clear();
                    return;
                }
                Err(err) => {
                    self.consume_valid_prefix(err.valid_up_to());
                    // `None` means an incomplete tail: wait for more bytes.
                    let Some(invalid) = err.error_len() else {
                        return;
                    };
                    log::warn!("replacing {invalid} invalid UTF-8 byte(s) in event stream");
                    self.buffer.push(char::REPLACEMENT_CHARACTER);
                    self.utf8_buffer.drain(..invalid);
                }
            }
        }
    }

    fn consume_valid_prefix(&mut self, valid_up_to: usize) {
        if valid_up_to == 0 {
            return;
        }

        let valid = String::from_utf8_lossy(&self.utf8_buffer[..valid_up_to]);
        push_normalized(&mut self.buffer, &valid);
        self.utf8_buffer.drain(..valid_up_to);
    }

    /// Pops the next complete event, delimiter included.
    pub fn next_event(&mut self) -> Option<String> {
        let pos = self.buffer.find(SSE_DELIMITER)?;
        let end = pos + SSE_DELIMITER.len();
        let event = self.buffer[..end].to_string();
        self.buffer.drain(..end);
        Some(event)
    }

    /// Text received after the last complete event.
    pub fn remainder(&self) -> &str {
        &self.buffer
    }
}

// CR never appears unescaped inside a JSON payload, so CRLF framing can be
// folded to LF even when the pair is split across reads.
fn push_normalized(buffer: &mut String, text: &str) {
    buffer.extend(text.chars().filter(|c| *c != '\r'));
}

/// Joined `data:` payload of one event, or `None` for comment-only events.
pub fn event_data(event: &str) -> Option<String> {
    let mut data: Option<String> = None;
    for line in event.lines() {
        let Some(value) = line.strip_prefix("data:") else {
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match data.as_mut() {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }
    data
}

#[cfg(test)]
#[path = "sse_tests.rs"]
pub(crate) mod tests;
