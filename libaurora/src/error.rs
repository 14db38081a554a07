//! The error taxonomy of spec.md §7, reported by *site* rather than by
//! Rust type: parse errors and access errors are always fatal; I/O and
//! protocol problems are warnings unless `--strict` promotes them.

use libcommon::{ReasonsExt, ScriptAddress};
use std::cell::Cell;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("parse error at {address}: {message}")]
    Parse { address: ScriptAddress, message: String },

    #[error("access error: {message}")]
    Access { message: String },

    #[error("I/O warning: {message}")]
    Io { message: String },

    #[error("protocol warning: {message}")]
    Protocol { message: String },

    #[error("engine invariant violated: {message}")]
    Invariant { message: String },
}

impl EngineError {
    #[must_use]
    pub fn is_fatal_by_default(&self) -> bool {
        matches!(self, EngineError::Parse { .. } | EngineError::Access { .. } | EngineError::Invariant { .. })
    }
}

/// A single reported problem, carrying the script context spec.md §7 wants
/// for both fatal ("title" + "detail" + last few script lines) and warning
/// presentation.
#[derive(Debug)]
pub struct Report {
    pub title: &'static str,
    pub detail: String,
    pub context_lines: Vec<String>,
    pub fatal: bool,
}

/// Where reports are sent: a real UI shows a message box and requests quit;
/// `aurora-tools` and unit tests just collect them.
pub trait ErrorSink {
    fn report(&mut self, report: Report);
}

#[derive(Debug, Default)]
pub struct CollectingErrorSink {
    pub reports: Vec<Report>,
}

impl ErrorSink for CollectingErrorSink {
    fn report(&mut self, report: Report) {
        self.reports.push(report);
    }
}

thread_local! {
    static ERROR_NESTING: Cell<u32> = Cell::new(0);
}

/// Guards against runaway recursion through `fatal`/`warn` (an error handler
/// that itself errors). Mirrors the teacher's single-threaded nesting
/// counter; beyond the limit we short-circuit to a bare `eprintln!` instead
/// of going through the sink again.
const MAX_ERROR_NESTING: u32 = 4;

pub fn fatal(sink: &mut dyn ErrorSink, title: &'static str, err: &anyhow::Error, context_lines: Vec<String>) {
    report_with_guard(sink, title, err, context_lines, true);
}

pub fn warn(sink: &mut dyn ErrorSink, title: &'static str, err: &anyhow::Error, context_lines: Vec<String>, strict: bool) {
    report_with_guard(sink, title, err, context_lines, strict);
}

fn report_with_guard(sink: &mut dyn ErrorSink, title: &'static str, err: &anyhow::Error, context_lines: Vec<String>, fatal: bool) {
    let depth = ERROR_NESTING.with(|c| {
        let next = c.get() + 1;
        c.set(next);
        next
    });
    if depth > MAX_ERROR_NESTING {
        eprintln!("{title}: {err} (error reporting re-entered {depth} times, giving up on the sink)");
    } else {
        sink.report(Report { title, detail: format!("{err}\n{}", err.reasons()), context_lines, fatal });
    }
    ERROR_NESTING.with(|c| c.set(c.get() - 1));
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn collects_reports() {
        let mut sink = CollectingErrorSink::default();
        fatal(&mut sink, "Parse error", &anyhow::anyhow!("bad token"), vec!["*start".into()]);
        assert_eq!(sink.reports.len(), 1);
        assert!(sink.reports[0].fatal);
    }

    #[test]
    fn nesting_guard_does_not_panic_on_reentry() {
        let mut sink = CollectingErrorSink::default();
        for _ in 0..10 {
            fatal(&mut sink, "Parse error", &anyhow::anyhow!("bad token"), vec![]);
        }
        assert!(sink.reports.len() <= 10);
    }
}
