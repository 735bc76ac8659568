use std::io::Write;

/// Receives engine output progressively while a read is in flight.
pub trait OutputSink {
    fn write_chunk(&mut self, chunk: &[u8]);
}

impl<F: FnMut(&[u8])> OutputSink for F {
    fn write_chunk(&mut self, chunk: &[u8]) {
        self(chunk)
    }
}

/// Copies output to this process's stdout as it arrives.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write_chunk(&mut self, chunk: &[u8]) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(chunk);
        let _ = out.flush();
    }
}

/// Where a call should stream engine output while it runs.
///
/// There is no process-wide default; every call site picks one.
pub enum Sink<'a> {
    /// Output is only returned, never streamed.
    Silent,
    /// Output is copied to stdout as it arrives.
    Stdout(StdoutSink),
    /// Output is handed to a caller-supplied sink.
    Custom(&'a mut dyn OutputSink),
}

impl<'a> Sink<'a> {
    pub fn stdout() -> Self {
        Sink::Stdout(StdoutSink)
    }

    pub fn custom(sink: &'a mut dyn OutputSink) -> Self {
        Sink::Custom(sink)
    }

    /// Silent unless `enabled`, in which case stdout.
    pub fn stdout_if(enabled: bool) -> Self {
        if enabled {
            Sink::stdout()
        } else {
            Sink::Silent
        }
    }

    /// Borrow as the optional sink taken by reads.
    pub fn as_output(&mut self) -> Option<&mut dyn OutputSink> {
        match self {
            Sink::Silent => None,
            Sink::Stdout(out) => {
                let out: &mut dyn OutputSink = out;
                Some(out)
            }
            Sink::Custom(sink) => {
                let sink: &mut dyn OutputSink = &mut **sink;
                Some(sink)
            }
        }
    }

    /// Send `chunk` to the sink, if any.
    pub fn emit(&mut self, chunk: &[u8]) {
        if let Some(sink) = self.as_output() {
            sink.write_chunk(chunk);
        }
    }
}

impl Default for Sink<'_> {
    fn default() -> Self {
        Sink::Silent
    }
}

impl std::fmt::Debug for Sink<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sink::Silent => f.write_str("Silent"),
            Sink::Stdout(_) => f.write_str("Stdout"),
            Sink::Custom(_) => f.write_str("Custom"),
        }
    }
}
