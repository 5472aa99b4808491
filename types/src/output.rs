//! The user-visible output log and its projection rules.

/// Kind tag for one visible line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Error,
    Stdout,
}

/// One user-visible line of run output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub kind: OutputKind,
    pub text: String,
}

impl OutputLine {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: OutputKind::Error,
            text: text.into(),
        }
    }

    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            kind: OutputKind::Stdout,
            text: text.into(),
        }
    }
}

/// Ordered sequence of [`OutputLine`]s for one run.
///
/// The log is replaced wholesale at run start and again just before
/// execution; during execution it is append-only. Stdout capture keeps
/// terminal semantics: bytes extend the current line until a newline
/// closes it, so a chunk without a trailing newline leaves the last
/// line open for the next chunk to continue.
#[derive(Debug, Default, Clone)]
pub struct OutputLog {
    lines: Vec<OutputLine>,
    stdout_open: bool,
}

impl OutputLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> &[OutputLine] {
        &self.lines
    }

    #[must_use]
    pub fn into_lines(self) -> Vec<OutputLine> {
        self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.stdout_open = false;
    }

    /// Append one error line. Closes any open stdout line.
    pub fn push_error(&mut self, text: impl Into<String>) {
        self.stdout_open = false;
        self.lines.push(OutputLine::error(text));
    }

    /// Project a stdout byte chunk, splitting on newlines.
    ///
    /// The first segment extends the open stdout line (opening one if the
    /// log is empty or ends in an error line); each later segment starts a
    /// new line; a trailing newline closes the current line without
    /// leaving a visible empty entry behind.
    pub fn append_stdout(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(chunk);
        let segments: Vec<&str> = text.split('\n').collect();
        let last = segments.len() - 1;
        for (i, segment) in segments.iter().enumerate() {
            if i == 0 {
                if !self.stdout_open {
                    self.lines.push(OutputLine::stdout(""));
                    self.stdout_open = true;
                }
                if !segment.is_empty() {
                    if let Some(line) = self.lines.last_mut() {
                        line.text.push_str(segment);
                    }
                }
            } else if i == last && segment.is_empty() {
                self.stdout_open = false;
            } else {
                self.lines.push(OutputLine::stdout(*segment));
                self.stdout_open = true;
            }
        }
    }
}
