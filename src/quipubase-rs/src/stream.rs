use futures::{stream, Stream, StreamExt};
use std::collections::VecDeque;

use crate::{ClientError, Result};

/// Terminator token some servers send as the last stream line
pub const DONE_TOKEN: &str = "[DONE]";

const DATA_PREFIX: &str = "data: ";

/// Incremental decoder turning body chunks into frames.
///
/// `push` never returns a frame until its boundary has been seen; `finish`
/// flushes whatever is still buffered once the body is exhausted.
pub trait FrameDecoder {
    type Frame;

    fn push(&mut self, chunk: &[u8]) -> Vec<Self::Frame>;
    fn finish(&mut self) -> Option<Self::Frame>;
}

/// Line splitter for newline-delimited and `data: `-prefixed bodies.
///
/// Emitted lines have the `data: ` prefix stripped and a trailing `\n`
/// appended. Blank lines and the [`DONE_TOKEN`] line are dropped.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered bytes not yet terminated by a newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl FrameDecoder for LineBuffer {
    type Frame = String;

    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        drain_lines(&mut self.buffer, chunk)
            .iter()
            .filter_map(|raw| meaningful_line(raw))
            .collect()
    }

    fn finish(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.buffer);
        meaningful_line(&raw)
    }
}

/// Append `chunk` to `buffer` and take every newline-terminated line out of it.
///
/// Only the appended bytes are searched, since the carried-over tail holds no
/// newline. Returned lines exclude the `\n`.
pub(crate) fn drain_lines(buffer: &mut Vec<u8>, chunk: &[u8]) -> Vec<Vec<u8>> {
    let mut cursor = buffer.len();
    buffer.extend_from_slice(chunk);

    let mut lines = Vec::new();
    let mut start = 0;
    while let Some(offset) = buffer[cursor..].iter().position(|b| *b == b'\n') {
        let end = cursor + offset;
        lines.push(buffer[start..end].to_vec());
        start = end + 1;
        cursor = start;
    }
    buffer.drain(..start);

    lines
}

fn meaningful_line(raw: &[u8]) -> Option<String> {
    let raw = match raw.last() {
        Some(b'\r') => &raw[..raw.len() - 1],
        _ => raw,
    };

    let text = String::from_utf8_lossy(raw);
    let line = text.strip_prefix(DATA_PREFIX).unwrap_or(&*text);
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed == DONE_TOKEN {
        return None;
    }

    Some(format!("{}\n", line))
}

/// Read a byte stream line by line, invoking `on_line` once per meaningful line.
///
/// Returns the number of lines delivered. The callback runs synchronously
/// between chunk reads.
pub async fn read_lines<S, B, E, F>(mut body: S, mut on_line: F) -> std::result::Result<usize, E>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    F: FnMut(&str),
{
    let mut buffer = LineBuffer::new();
    let mut delivered = 0;

    while let Some(chunk) = body.next().await {
        for line in buffer.push(chunk?.as_ref()) {
            on_line(&line);
            delivered += 1;
        }
    }

    if let Some(line) = buffer.finish() {
        on_line(&line);
        delivered += 1;
    }

    Ok(delivered)
}

struct Framed<S, D: FrameDecoder> {
    body: S,
    decoder: D,
    pending: VecDeque<D::Frame>,
    exhausted: bool,
}

/// Adapt a byte stream into a stream of decoded frames.
///
/// A body error is yielded once and ends the stream.
pub(crate) fn framed<S, B, E, D>(
    body: S,
    decoder: D,
) -> impl Stream<Item = Result<D::Frame>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + Unpin,
    B: AsRef<[u8]> + Send,
    E: Into<ClientError> + Send,
    D: FrameDecoder + Send,
    D::Frame: Send,
{
    let state = Framed {
        body,
        decoder,
        pending: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.pending.pop_front() {
                return Some((Ok(frame), state));
            }
            if state.exhausted {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let frames = state.decoder.push(chunk.as_ref());
                    state.pending.extend(frames);
                }
                Some(Err(e)) => {
                    state.exhausted = true;
                    return Some((Err(e.into()), state));
                }
                None => {
                    state.exhausted = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::convert::Infallible;

    fn chunks(
        parts: &[&'static str],
    ) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|&p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect_lines(parts: &[&'static str]) -> Vec<String> {
        let mut lines = Vec::new();
        read_lines(chunks(parts), |line| lines.push(line.to_string()))
            .await
            .unwrap();
        lines
    }

    #[tokio::test]
    async fn test_split_line_matches_unchunked() {
        let whole = collect_lines(&["{\"a\":1}\n{\"b\":2}\n"]).await;
        let split = collect_lines(&["{\"a\"", ":1}\n{\"b", "\":2}\n"]).await;
        assert_eq!(whole, vec!["{\"a\":1}\n", "{\"b\":2}\n"]);
        assert_eq!(split, whole);
    }

    #[tokio::test]
    async fn test_unterminated_tail_is_flushed() {
        let lines = collect_lines(&["first\nsec", "ond"]).await;
        assert_eq!(lines, vec!["first\n", "second\n"]);
    }

    #[tokio::test]
    async fn test_done_and_blank_lines_are_skipped() {
        let lines = collect_lines(&["data: one\n\ndata: \n", "data: [DONE]\n[DONE]\n"]).await;
        assert_eq!(lines, vec!["one\n"]);
    }

    #[tokio::test]
    async fn test_crlf_and_prefix_stripping() {
        let lines = collect_lines(&["data: {\"x\":1}\r\n\r\n"]).await;
        assert_eq!(lines, vec!["{\"x\":1}\n"]);
    }

    #[test]
    fn test_line_buffer_holds_partial_line() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"partial").is_empty());
        assert_eq!(buffer.pending(), 7);
        assert_eq!(buffer.push(b" line\nrest"), vec!["partial line\n".to_string()]);
        assert_eq!(buffer.finish(), Some("rest\n".to_string()));
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let mut buffer = LineBuffer::new();
        let text = "caf\u{e9}\n".as_bytes();
        assert!(buffer.push(&text[..4]).is_empty());
        assert_eq!(buffer.push(&text[4..]), vec!["caf\u{e9}\n".to_string()]);
    }

    #[test]
    fn test_long_line_fed_byte_by_byte() {
        let line = format!("{{\"blob\":\"{}\"}}\n", "x".repeat(64 * 1024));
        let mut buffer = LineBuffer::new();
        let mut lines = Vec::new();
        for byte in line.as_bytes() {
            lines.extend(buffer.push(std::slice::from_ref(byte)));
        }
        assert_eq!(lines, vec![line]);
        assert_eq!(buffer.pending(), 0);
    }

    #[test]
    fn test_drain_lines_keeps_unterminated_tail() {
        let mut buffer = b"ab".to_vec();
        let lines = drain_lines(&mut buffer, b"c\nd\n\nef");
        assert_eq!(lines, vec![b"abc".to_vec(), b"d".to_vec(), Vec::new()]);
        assert_eq!(buffer, b"ef");
        assert!(drain_lines(&mut buffer, b"g").is_empty());
        assert_eq!(buffer, b"efg");
    }

    #[tokio::test]
    async fn test_framed_yields_error_once() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"a\nb")),
            Err(ClientError::MissingBody),
            Ok(Bytes::from_static(b"never\n")),
        ]);
        let frames: Vec<_> = framed(body, LineBuffer::new()).collect().await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_ref().unwrap(), "a\n");
        assert!(matches!(frames[1], Err(ClientError::MissingBody)));
    }
}
