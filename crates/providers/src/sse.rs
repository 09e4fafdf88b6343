//! Wire decoding for the upstream completion stream.
//!
//! The upstream delivers `\n\n`-delimited records; `data:` lines carry
//! payload, everything else (`event:`, `id:`, keep-alive blanks) is
//! protocol noise. Decoding is split so the event loop is testable
//! without a network: [`decode_sse_events`] turns any chunk source plus
//! a payload parser into a [`BoxStream`] of events, and
//! [`sse_response_stream`] is the thin reqwest adapter over it.

use crate::util::from_reqwest;
use cr_domain::error::Result;
use cr_domain::stream::{BoxStream, StreamEvent};
use futures_core::Stream;
use futures_util::StreamExt;

/// Pull every complete `data:` payload out of the buffer.
///
/// Consumed records are removed in place; a trailing partial record is
/// left for the next chunk. vLLM emits `data:{...}` with no space after
/// the colon and OpenAI emits `data: {...}`, so the payload is trimmed.
pub(crate) fn drain_data_payloads(buffer: &mut String) -> Vec<String> {
    let mut payloads = Vec::new();

    while let Some(end) = buffer.find("\n\n") {
        let record: String = buffer.drain(..end + 2).collect();
        for line in record.lines() {
            if let Some(payload) = line.trim_start().strip_prefix("data:") {
                let payload = payload.trim();
                if !payload.is_empty() {
                    payloads.push(payload.to_string());
                }
            }
        }
    }

    payloads
}

/// Decode a chunked byte source into stream events.
///
/// Termination rules:
/// - a parsed [`StreamEvent::StreamEnd`] short-circuits the loop; nothing
///   after the sentinel is decoded
/// - the first transport or parse error is yielded once and ends the
///   stream
/// - a source that closes without a sentinel has its partial tail flushed
///   and gets a synthetic `StreamEnd`
pub(crate) fn decode_sse_events<C, F>(
    chunks: C,
    mut parse_data: F,
) -> BoxStream<'static, Result<StreamEvent>>
where
    C: Stream<Item = Result<String>> + Send + 'static,
    F: FnMut(&str) -> Vec<Result<StreamEvent>> + Send + 'static,
{
    let stream = async_stream::stream! {
        // The trailing delimiter flushes a partial tail through the same
        // drain path once the source closes.
        let flush = futures_util::stream::iter([Ok(String::from("\n\n"))]);
        let chunks = chunks.chain(flush);
        futures_util::pin_mut!(chunks);

        let mut buffer = String::new();
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(text) => buffer.push_str(&text),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }

            for payload in drain_data_payloads(&mut buffer) {
                for event in parse_data(&payload) {
                    match event {
                        Ok(StreamEvent::StreamEnd) => {
                            yield Ok(StreamEvent::StreamEnd);
                            return;
                        }
                        Ok(ev) => yield Ok(ev),
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
        }

        yield Ok(StreamEvent::StreamEnd);
    };

    Box::pin(stream)
}

/// Decode a chunked `reqwest::Response` into stream events.
pub(crate) fn sse_response_stream<F>(
    response: reqwest::Response,
    parse_data: F,
) -> BoxStream<'static, Result<StreamEvent>>
where
    F: FnMut(&str) -> Vec<Result<StreamEvent>> + Send + 'static,
{
    let chunks = async_stream::stream! {
        let mut response = response;
        loop {
            match response.chunk().await {
                Ok(Some(bytes)) => yield Ok(String::from_utf8_lossy(&bytes).into_owned()),
                Ok(None) => return,
                Err(e) => {
                    yield Err(from_reqwest(e));
                    return;
                }
            }
        }
    };

    decode_sse_events(chunks, parse_data)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
