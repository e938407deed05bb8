use crate::stream::{drain_lines, FrameDecoder};

/// A parsed Server-Sent Event frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Optional event ID
    pub id: Option<String>,
    /// Optional event type
    pub event: Option<String>,
    /// Event data, multiple `data:` lines joined with `\n`
    pub data: String,
}

/// Incremental SSE decoder; a frame is dispatched on each blank line
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    id: Option<String>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }

        // Comment line
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "id" => self.id = Some(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {} // retry and unknown fields
        }

        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }

        let data = self.data.join("\n");
        self.data.clear();

        Some(SseFrame {
            id: self.id.clone(),
            event,
            data,
        })
    }
}

impl FrameDecoder for SseDecoder {
    type Frame = SseFrame;

    fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        for raw in drain_lines(&mut self.buffer, chunk) {
            let line = String::from_utf8_lossy(&raw);
            if let Some(frame) = self.process_line(line.trim_end_matches('\r')) {
                frames.push(frame);
            }
        }
        frames
    }

    fn finish(&mut self) -> Option<SseFrame> {
        let raw = std::mem::take(&mut self.buffer);
        if !raw.is_empty() {
            let line = String::from_utf8_lossy(&raw);
            let _ = self.process_line(line.trim_end_matches('\r'));
        }
        self.dispatch()
    }
}
