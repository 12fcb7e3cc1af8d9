//! Control connection framing
//!
//! TCP delivers the control stream in arbitrary segments, so commands are
//! reassembled here: bytes are appended to a growable buffer and each
//! complete LF-terminated line is handed out as one command. A trailing
//! fragment stays buffered until the rest of it arrives.

/// One unit extracted from the control stream.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// A complete command line with its CRLF stripped.
    Line(String),
    /// A line exceeded the configured limit and was dropped.
    Overlong,
}

/// Accumulates control connection bytes and yields complete lines.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    max_line_length: usize,
    discarding: bool,
}

impl LineBuffer {
    pub fn new(max_line_length: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line_length,
            discarding: false,
        }
    }

    /// Appends freshly received bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of buffered bytes not yet returned as a line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Pops the next complete frame, if any.
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = self.buf.drain(..=pos).collect();

                // tail of a line already reported as overlong
                if self.discarding {
                    self.discarding = false;
                    continue;
                }

                let mut line = &raw[..raw.len() - 1];
                if let Some(stripped) = line.strip_suffix(b"\r") {
                    line = stripped;
                }

                if line.len() > self.max_line_length {
                    return Some(Frame::Overlong);
                }
                return Some(Frame::Line(String::from_utf8_lossy(line).into_owned()));
            }

            if self.discarding {
                self.buf.clear();
                return None;
            }

            // a full-length line may still be waiting for the LF after its CR
            if self.buf.len() > self.max_line_length + 1
                || (self.buf.len() > self.max_line_length && self.buf.last() != Some(&b'\r'))
            {
                self.buf.clear();
                self.discarding = true;
                return Some(Frame::Overlong);
            }

            return None;
        }
    }
}
