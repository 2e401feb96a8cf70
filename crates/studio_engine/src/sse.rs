/// Incremental decoder for `text/event-stream` bodies.
///
/// Bytes may arrive split anywhere, including inside a UTF-8 sequence; only
/// complete events are returned, as the joined contents of their `data:` lines.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data_lines.is_empty() {
                    events.push(self.data_lines.join("\n"));
                    self.data_lines.clear();
                }
            } else if let Some(data) = line.strip_prefix("data:") {
                self.data_lines.push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
            // Comments, `event:`, `id:` and `retry:` lines carry nothing we use.
        }
        events
    }

    /// Flushes an event left unterminated at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let rest = String::from_utf8_lossy(&rest);
            let line = rest.trim_end_matches(['\n', '\r']);
            if let Some(data) = line.strip_prefix("data:") {
                self.data_lines.push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
        }
        if self.data_lines.is_empty() {
            None
        } else {
            let event = self.data_lines.join("\n");
            self.data_lines.clear();
            Some(event)
        }
    }
}
