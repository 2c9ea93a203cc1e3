//! Progress reporting.
//!
//! The pipeline narrates every decision it makes through a [`Reporter`]. The
//! default sink, [`TracingReporter`], forwards lines to `tracing` and drives a
//! progress bar through `tracing-indicatif`; [`MemoryReporter`] keeps the
//! transcript in memory.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use console::style;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// Sink for progress output.
///
/// Calls arrive synchronously and in queue order, so the transcript is a
/// faithful record of the run.
pub trait Reporter: Send + Sync {
    /// A short line describing the current phase.
    fn status(&self, message: &str);
    /// A long running process begins, with the number of steps when known.
    fn process_start(&self, name: &str, total: Option<usize>);
    /// The current long running process advanced by one step.
    fn process_progress(&self, message: &str);
    fn process_end(&self, name: &str, elapsed: Duration);
    fn warn(&self, message: &str);
    fn success(&self, message: &str);
    fn failure(&self, message: &str);
}

/// Counts the steps of a long running process and reports them.
///
/// The end of the process is reported when the value is dropped, so a run
/// aborted by an error still closes its progress bar.
pub struct LongProcess<'a> {
    reporter: &'a dyn Reporter,
    name: String,
    total: Option<usize>,
    current: usize,
    started: Instant,
}

impl<'a> LongProcess<'a> {
    pub fn start(
        reporter: &'a dyn Reporter,
        name: impl Into<String>,
        total: Option<usize>,
    ) -> Self {
        let name = name.into();
        reporter.process_start(&name, total);

        Self {
            reporter,
            name,
            total,
            current: 0,
            started: Instant::now(),
        }
    }

    pub fn log_progress(&mut self, message: &str) {
        self.current += 1;
        self.reporter
            .process_progress(&format!("{} {}", self.progress(), message));
    }

    /// `(current/total)`, or `(current)` when the total is unknown.
    pub fn progress(&self) -> String {
        match self.total {
            Some(total) => format!("({}/{})", self.current, total),
            None => format!("({})", self.current),
        }
    }

    pub fn end(self) {
        drop(self);
    }
}

impl Drop for LongProcess<'_> {
    fn drop(&mut self) {
        self.reporter
            .process_end(&self.name, self.started.elapsed());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reports through `tracing`, with a progress bar for long processes.
///
/// The progress bar only renders when the subscriber carries an
/// `IndicatifLayer`, see `init_logging`.
#[derive(Debug, Default)]
pub struct TracingReporter {
    process: Mutex<Option<Span>>,
}

impl TracingReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for TracingReporter {
    fn status(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn process_start(&self, name: &str, total: Option<usize>) {
        let span = tracing::info_span!("process", process = name);

        match total {
            Some(total) => {
                span.pb_set_style(&crate::utils::get_style_process());
                span.pb_set_length(total as u64);
            }
            None => span.pb_set_style(&crate::utils::get_style_spinner()),
        }

        span.pb_set_message(name);
        span.pb_start();

        *lock(&self.process) = Some(span);
    }

    fn process_progress(&self, message: &str) {
        if let Some(span) = lock(&self.process).as_ref() {
            span.pb_inc(1);
            span.pb_set_message(message);
        }

        tracing::debug!("{message}");
    }

    fn process_end(&self, name: &str, elapsed: Duration) {
        lock(&self.process).take();

        let overhead = style(format!("(+{}ms)", elapsed.as_millis())).blue();
        tracing::info!("{name} finished {overhead}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{}", style(message).yellow());
    }

    fn success(&self, message: &str) {
        tracing::info!("{}", style(message).green());
    }

    fn failure(&self, message: &str) {
        tracing::error!("{}", style(message).red());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Status,
    ProcessStart,
    Progress,
    ProcessEnd,
    Warning,
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub kind: ReportKind,
    pub message: String,
}

/// Keeps every reported line, in order.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    lines: Mutex<Vec<ReportLine>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, kind: ReportKind, message: impl Into<String>) {
        lock(&self.lines).push(ReportLine {
            kind,
            message: message.into(),
        });
    }

    pub fn lines(&self) -> Vec<ReportLine> {
        lock(&self.lines).clone()
    }

    pub fn messages(&self, kind: ReportKind) -> Vec<String> {
        lock(&self.lines)
            .iter()
            .filter(|line| line.kind == kind)
            .map(|line| line.message.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        lock(&self.lines)
            .iter()
            .any(|line| line.message.contains(needle))
    }
}

impl Reporter for MemoryReporter {
    fn status(&self, message: &str) {
        self.push(ReportKind::Status, message);
    }

    fn process_start(&self, name: &str, _: Option<usize>) {
        self.push(ReportKind::ProcessStart, name);
    }

    fn process_progress(&self, message: &str) {
        self.push(ReportKind::Progress, message);
    }

    fn process_end(&self, name: &str, _: Duration) {
        self.push(ReportKind::ProcessEnd, name);
    }

    fn warn(&self, message: &str) {
        self.push(ReportKind::Warning, message);
    }

    fn success(&self, message: &str) {
        self.push(ReportKind::Success, message);
    }

    fn failure(&self, message: &str) {
        self.push(ReportKind::Failure, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_process_counts() {
        let reporter = MemoryReporter::new();
        let mut process = LongProcess::start(&reporter, "running tasks", Some(2));
        process.log_progress("first");
        assert_eq!(process.progress(), "(1/2)");
        process.log_progress("second");
        process.end();

        assert_eq!(
            reporter.lines(),
            [
                ReportLine { kind: ReportKind::ProcessStart, message: "running tasks".into() },
                ReportLine { kind: ReportKind::Progress, message: "(1/2) first".into() },
                ReportLine { kind: ReportKind::Progress, message: "(2/2) second".into() },
                ReportLine { kind: ReportKind::ProcessEnd, message: "running tasks".into() },
            ]
        );
    }

    #[test]
    fn test_dropped_process_ends() {
        let reporter = MemoryReporter::new();
        {
            let mut process = LongProcess::start(&reporter, "running tasks", Some(3));
            process.log_progress("first");
        }

        assert_eq!(reporter.messages(ReportKind::ProcessEnd), ["running tasks"]);
    }

    #[test]
    fn test_unknown_total() {
        let reporter = MemoryReporter::new();
        let mut process = LongProcess::start(&reporter, "pre-build", None);
        process.log_progress("step");
        assert_eq!(process.progress(), "(1)");
    }

    #[test]
    fn test_tracing_reporter_without_subscriber() {
        let reporter = TracingReporter::new();
        let mut process = LongProcess::start(&reporter, "running tasks", Some(1));
        process.log_progress("task");
        process.end();
        reporter.warn("skipped");
        reporter.success("done");
        reporter.failure("failed");
    }
}
