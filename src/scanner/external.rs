//! Out-of-process scanning.
//!
//! The command receives the document on stdin and prints a scope report as
//! JSON on stdout. Human-readable notes on stderr are turned into advisories:
//!
//! - `Warning: ...` becomes a recoverable-syntax advisory
//! - `Skipping invalid parameter name: NAME` becomes an invalid-name advisory
//!
//! The wait is bounded. A command that has not printed its report and exited
//! when the timeout expires is killed and the scan ends in
//! [`ScanError::Timeout`].

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use tracing::{debug, warn};

use crate::diagnostics::{Advisory, ScanError};
use crate::scanner::Scanner;
use crate::scope::ScopeReport;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct ExternalScanner {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalScanner {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    fn spawn(&self) -> Result<Child, ScanError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> ScanError {
        ScanError::Io {
            program: self.program.clone(),
            source,
        }
    }

    /// Kills a child that overran the deadline.
    fn abandon(&self, child: &mut Child, started: Instant) -> ScanError {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if let Err(e) = child.kill() {
            warn!(error = %e, program = %self.program, "failed to kill timed-out scanner");
        }
        let _ = child.wait();
        warn!(program = %self.program, elapsed_ms, "external scanner timed out");
        ScanError::Timeout { elapsed_ms }
    }
}

impl Scanner for ExternalScanner {
    fn scan(&self, source: &str) -> Result<ScopeReport, ScanError> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut child = self.spawn()?;

        // Feed stdin and drain stdout/stderr on their own threads so a chatty
        // child can never block on a full pipe.
        if let Some(mut stdin) = child.stdin.take() {
            let input = source.to_string();
            thread::spawn(move || {
                if let Err(e) = stdin.write_all(input.as_bytes()) {
                    debug!(error = %e, "scanner closed stdin early");
                }
            });
        }
        let stderr = drain(child.stderr.take());
        let stdout = drain(child.stdout.take());

        let output = match stdout.recv_timeout(remaining(deadline)) {
            Ok(result) => result.map_err(|e| self.io_error(e))?,
            Err(RecvTimeoutError::Timeout) => return Err(self.abandon(&mut child, started)),
            Err(RecvTimeoutError::Disconnected) => Vec::new(),
        };

        // Closing stdout is not the same as exiting.
        let status = loop {
            if let Some(status) = child.try_wait().map_err(|e| self.io_error(e))? {
                break status;
            }
            if Instant::now() >= deadline {
                return Err(self.abandon(&mut child, started));
            }
            thread::sleep(EXIT_POLL_INTERVAL.min(remaining(deadline)));
        };

        let notes = match stderr.recv_timeout(remaining(deadline)) {
            Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Ok(Err(e)) => {
                debug!(error = %e, "failed to read scanner stderr");
                String::new()
            }
            Err(RecvTimeoutError::Disconnected) => String::new(),
            Err(RecvTimeoutError::Timeout) => {
                warn!(program = %self.program, "scanner stderr still open after exit; ignoring notes");
                String::new()
            }
        };

        if !status.success() {
            let detail = notes
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("no error output");
            return Err(ScanError::structural_failure(
                format!("`{}` exited with {status}: {detail}", self.program),
                None,
            ));
        }

        let mut report: ScopeReport = serde_json::from_slice(&output).map_err(|e| {
            ScanError::structural_failure(format!("`{}` printed an invalid report: {e}", self.program), None)
        })?;
        report.diagnostics.extend(advisories_from_stderr(&notes));
        debug!(
            program = %self.program,
            contexts = report.contexts.len(),
            parameters = report.parameters.len(),
            "external scan finished"
        );
        Ok(report)
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// Reads a pipe to the end on its own thread. A missing pipe disconnects
/// the channel right away.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<std::io::Result<Vec<u8>>> {
    let (tx, rx) = bounded(1);
    if let Some(mut pipe) = pipe {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let result = pipe.read_to_end(&mut buffer).map(|_| buffer);
            let _ = tx.send(result);
        });
    }
    rx
}

fn advisories_from_stderr(text: &str) -> Vec<Advisory> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if let Some(name) = line.strip_prefix("Skipping invalid parameter name:") {
                Some(Advisory::invalid_parameter_name(name.trim(), None))
            } else {
                line.strip_prefix("Warning:")
                    .map(|message| Advisory::recoverable_syntax(message.trim(), None))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::AdvisoryKind;

    #[test]
    fn stderr_notes_become_advisories() {
        let advisories = advisories_from_stderr(
            "Warning: CUE syntax errors detected\nSkipping invalid parameter name: 1bad\nnoise\n",
        );
        assert_eq!(advisories.len(), 2);
        assert_eq!(advisories[0].kind, AdvisoryKind::RecoverableSyntax);
        assert_eq!(advisories[1].kind, AdvisoryKind::InvalidParameterName);
        assert!(advisories[1].message.contains("1bad"));
    }

    #[test]
    fn missing_program_is_an_io_error() {
        let scanner = ExternalScanner::new("/no/such/scanner", vec![], Duration::from_secs(1));
        assert!(matches!(scanner.scan("x: 1"), Err(ScanError::Io { .. })));
    }

    #[cfg(unix)]
    fn sh(script: &str, timeout: Duration) -> ExternalScanner {
        ExternalScanner::new("sh", vec!["-c".to_string(), script.to_string()], timeout)
    }

    #[cfg(unix)]
    #[test]
    fn reads_report_from_stdout() {
        let script = r#"cat > /dev/null; echo 'Warning: partial' >&2; printf '%s' '{"parameters":[{"name":"p","line":3,"column":5,"context":"b","version":"0.1.0"}],"contexts":[{"type":"b","version":"0.1.0","line":2,"column":5,"start_line":1,"end_line":4}]}'"#;
        let report = sh(script, Duration::from_secs(5)).scan("ignored").unwrap();
        assert_eq!(report.parameters[0].context_type, "b");
        assert_eq!(report.contexts[0].end_line, 4);
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn slow_command_times_out() {
        let scanner = sh("sleep 5", Duration::from_millis(100));
        let started = Instant::now();
        let err = scanner.scan("x: 1").unwrap_err();
        assert!(matches!(err, ScanError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn closing_stdout_without_exiting_times_out() {
        let scanner = sh(
            "cat > /dev/null; printf '{}'; exec 1>&-; sleep 6",
            Duration::from_millis(300),
        );
        let started = Instant::now();
        let err = scanner.scan("x: 1").unwrap_err();
        assert!(matches!(err, ScanError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_is_structural_failure() {
        let scanner = sh("echo 'Error: Complete parsing failure' >&2; exit 1", Duration::from_secs(5));
        match scanner.scan("x").unwrap_err() {
            ScanError::StructuralFailure { message, .. } => {
                assert!(message.contains("Complete parsing failure"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn garbage_output_is_structural_failure() {
        let scanner = sh("echo not json", Duration::from_secs(5));
        assert!(matches!(
            scanner.scan("x"),
            Err(ScanError::StructuralFailure { .. })
        ));
    }
}
