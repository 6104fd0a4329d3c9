// src/gateway/sse.rs
// Line-buffering decoder for the gateway's event stream
//
// Wire format: lines of `data: {"text": "<fragment>"}`. Fragments can be
// split across network reads, so bytes are buffered and only complete
// lines are decoded; the trailing partial line waits for the next read.
// Lines without the prefix, and data that is not valid JSON, are skipped
// silently - there is exactly one parse path.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// JSON payload of one `data:` line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamFrame {
    pub text: String,
}

#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: String,
}

impl StreamDecoder {
    /// Bound on buffered bytes - protects against a stream that never
    /// sends a newline.
    const MAX_BUFFER_SIZE: usize = 1024 * 1024;

    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Push a chunk of bytes and extract the text fragments of every
    /// complete line. Incomplete data stays buffered for the next push.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        if self.buffer.len() > Self::MAX_BUFFER_SIZE {
            warn!(
                "stream buffer exceeded {}KB, truncating",
                Self::MAX_BUFFER_SIZE / 1024
            );
            let mut keep_from = self.buffer.len() - (Self::MAX_BUFFER_SIZE / 2);
            // The cut point may land inside a multibyte character
            while !self.buffer.is_char_boundary(keep_from) {
                keep_from -= 1;
            }
            self.buffer = self.buffer.split_off(keep_from);
        }

        let mut fragments = Vec::new();

        while let Some(pos) = self.buffer.find('\n') {
            let line = self.buffer[..pos].trim().to_string();
            self.buffer = self.buffer[pos + 1..].to_string();

            if line.is_empty() {
                continue;
            }

            let Some(data) = line.strip_prefix("data: ") else {
                // Comments, event ids, anything else: not ours
                continue;
            };

            match serde_json::from_str::<StreamFrame>(data) {
                Ok(frame) => fragments.push(frame.text),
                Err(err) => {
                    debug!(error = %err, "skipping undecodable stream line");
                }
            }
        }

        fragments
    }

    /// Check if there's buffered data waiting for a newline
    pub fn has_remaining(&self) -> bool {
        !self.buffer.is_empty()
    }
}
