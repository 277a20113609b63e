use std::fmt;

/// Phase of an exchange a transcript line describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Url(String),
    Echo(String),
    Read(usize),
    Body(String),
}

/// One diagnostic line, owned by a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub request_id: u64,
    pub phase: Phase,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.request_id;
        match &self.phase {
            Phase::Url(url) => write!(f, "[{id}] Url={url}"),
            Phase::Echo(message) => write!(f, "[{id}] Echo={message}"),
            Phase::Read(n) => write!(f, "[{id}] Read {n} bytes"),
            Phase::Body(line) => write!(f, "[{id} body] {line}"),
        }
    }
}

/// Ordered diagnostic lines describing what happened during one or more exchanges
///
/// Renders one line per entry, each terminated by `\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    lines: Vec<Line>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Append the lines of a later exchange
    pub fn extend(&mut self, other: Transcript) {
        self.lines.extend(other.lines);
    }

    pub fn into_string(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Accumulates the lines of a single request, tagging each with its id
#[derive(Debug)]
pub struct TranscriptBuilder {
    request_id: u64,
    transcript: Transcript,
}

impl TranscriptBuilder {
    pub fn new(request_id: u64) -> Self {
        Self {
            request_id,
            transcript: Transcript::new(),
        }
    }

    fn push(&mut self, phase: Phase) -> &mut Self {
        self.transcript.lines.push(Line {
            request_id: self.request_id,
            phase,
        });
        self
    }

    pub fn url(&mut self, url: &str) -> &mut Self {
        self.push(Phase::Url(url.to_string()))
    }

    pub fn echo(&mut self, message: &str) -> &mut Self {
        self.push(Phase::Echo(message.to_string()))
    }

    pub fn read_bytes(&mut self, n: usize) -> &mut Self {
        self.push(Phase::Read(n))
    }

    pub fn body(&mut self, line: &str) -> &mut Self {
        self.push(Phase::Body(line.to_string()))
    }

    /// Add one body line per non-empty newline-separated segment
    pub fn body_lines(&mut self, response: &str) -> &mut Self {
        for line in response.split('\n').filter(|line| !line.is_empty()) {
            self.body(line);
        }
        self
    }

    pub fn finish(self) -> Transcript {
        self.transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_each_phase() {
        let mut builder = TranscriptBuilder::new(7);
        builder
            .url("tcp://h:9000")
            .echo("ping")
            .read_bytes(5)
            .body("pong");

        assert_eq!(
            builder.finish().into_string(),
            "[7] Url=tcp://h:9000\n[7] Echo=ping\n[7] Read 5 bytes\n[7 body] pong\n"
        );
    }

    #[test]
    fn body_lines_drop_empty_segments() {
        let mut builder = TranscriptBuilder::new(1);
        builder.body_lines("\nfirst\n\nsecond\n\n");

        let transcript = builder.finish();
        let bodies: Vec<_> = transcript
            .lines()
            .iter()
            .map(|line| line.phase.clone())
            .collect();
        assert_eq!(
            bodies,
            vec![Phase::Body("first".into()), Phase::Body("second".into())]
        );
    }

    #[test]
    fn extend_keeps_order_across_requests() {
        let mut first = TranscriptBuilder::new(0);
        first.url("tcp://a:1");
        let mut second = TranscriptBuilder::new(1);
        second.url("tcp://a:1");

        let mut transcript = first.finish();
        transcript.extend(second.finish());

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.to_string(), "[0] Url=tcp://a:1\n[1] Url=tcp://a:1\n");
    }

    #[test]
    fn empty_transcript_renders_nothing() {
        let transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert_eq!(transcript.into_string(), "");
    }
}
