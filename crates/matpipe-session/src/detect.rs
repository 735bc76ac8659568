//! Heuristic detection of engine-side errors in console output.
//!
//! The console has no structured error channel, so errors are recognized by
//! substrings such as `Undefined` or `Error`. Legitimate output containing
//! those words is misreported as an error. Sessions that need stricter
//! matching can install their own [`ErrorDetector`].

/// Markers the engine prints when a command fails.
pub const DEFAULT_ERROR_MARKERS: &[&str] = &["Undefined", "Error", "???"];

/// Decides whether captured output represents a failed command.
pub trait ErrorDetector {
    fn is_error(&self, output: &str) -> bool;
}

impl<F: Fn(&str) -> bool> ErrorDetector for F {
    fn is_error(&self, output: &str) -> bool {
        self(output)
    }
}

/// Flags output that contains any of a fixed set of substrings.
#[derive(Debug, Clone)]
pub struct MarkerDetector {
    markers: Vec<String>,
}

impl MarkerDetector {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }
}

impl Default for MarkerDetector {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_MARKERS.iter().copied())
    }
}

impl ErrorDetector for MarkerDetector {
    fn is_error(&self, output: &str) -> bool {
        // Errors are printed last, so search from the end.
        self.markers
            .iter()
            .any(|marker| !marker.is_empty() && output.rfind(marker.as_str()).is_some())
    }
}
