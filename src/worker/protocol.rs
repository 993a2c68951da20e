//! Directive and response conventions of the `-stay_open` protocol.
//!
//! Requests are plain argument lines written to the worker's stdin, one per
//! line, closed by [`EXECUTE`]. Responses are the worker's merged stdout and
//! stderr text up to the ready token.

// ============================================================================
// Directives
// ============================================================================

/// Default ready token printed by the worker after each executed command.
pub const DEFAULT_READY_TOKEN: &str = "{ready}";

/// Directive that runs the lines queued since the previous execute.
pub const EXECUTE: &str = "-execute";

/// Directive requesting JSON output.
pub const JSON: &str = "-json";

/// Flag enabling persistent mode.
pub const STAY_OPEN: &str = "-stay_open";

/// Flag reading further arguments from a file (`-` for stdin).
pub const ARGFILE: &str = "-@";

/// Arguments that put the worker into persistent stdin-driven mode.
pub fn startup_args() -> [&'static str; 4] {
    [STAY_OPEN, "True", ARGFILE, "-"]
}

/// Directive lines that ask the worker to exit.
pub fn shutdown_directives() -> [&'static str; 2] {
    [STAY_OPEN, "False"]
}

// ============================================================================
// Responses
// ============================================================================

const WARNING_MARKER: &str = "Warning:";
const ERROR_MARKER: &str = "Error:";

/// One classified response frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// The frame text exactly as the worker produced it.
    pub raw: String,
    /// Messages from lines carrying the error marker.
    pub errors: Vec<String>,
    /// Messages from lines carrying the warning marker.
    pub warnings: Vec<String>,
}

impl Response {
    /// Classify the lines of a raw frame.
    ///
    /// A line containing the warning marker counts as a warning even when it
    /// also contains the error marker.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for line in raw.lines() {
            if line.contains(WARNING_MARKER) {
                warnings.push(strip_marker(line, WARNING_MARKER));
            } else if line.contains(ERROR_MARKER) {
                errors.push(strip_marker(line, ERROR_MARKER));
            }
        }

        Self {
            raw,
            errors,
            warnings,
        }
    }

    /// True when the worker reported no error lines.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

fn strip_marker(line: &str, marker: &str) -> String {
    let line = line.trim();
    line.strip_prefix(marker).unwrap_or(line).trim().to_string()
}
