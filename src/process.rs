//! Subprocess execution with line streaming and cancellation.

use crate::cancel::CancelFlag;
use crate::error::{KataError, Result};
use std::io::{ErrorKind, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::Duration;

/// How often the cancel flag is checked while the child is quiet.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Which of the child's output streams to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    StderrOnly,
    Both,
}

/// Run `command` to completion, passing every output line to `on_line`.
///
/// Lines are split on both `\n` and `\r`, so in-place progress updates
/// arrive as separate lines. When `cancel` is raised the child is killed
/// and `Err(Cancelled)` is returned.
pub fn run_streaming(
    mut command: Command,
    capture: Capture,
    on_line: &mut dyn FnMut(String),
    cancel: &CancelFlag,
) -> Result<ExitStatus> {
    command.stdin(Stdio::null()).stderr(Stdio::piped());
    command.stdout(match capture {
        Capture::StderrOnly => Stdio::null(),
        Capture::Both => Stdio::piped(),
    });

    let mut child = command.spawn()?;
    let (tx, rx) = mpsc::channel::<String>();

    if let Some(stdout) = child.stdout.take() {
        let tx = tx.clone();
        std::thread::spawn(move || forward_lines(stdout, tx));
    }
    if let Some(stderr) = child.stderr.take() {
        let tx = tx.clone();
        std::thread::spawn(move || forward_lines(stderr, tx));
    }
    drop(tx);

    loop {
        if cancel.is_cancelled() {
            kill(&mut child);
            return Err(KataError::Cancelled);
        }
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(line) => on_line(line),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(child.wait()?)
}

fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::warn!(error = %e, "failed to kill subprocess");
    }
    let _ = child.wait();
}

/// Read `reader` to EOF, sending each non-empty `\r`/`\n` separated line.
fn forward_lines<R: Read>(mut reader: R, tx: Sender<String>) {
    let mut buf = [0u8; 4096];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        for &byte in &buf[..n] {
            if byte == b'\n' || byte == b'\r' {
                if !pending.is_empty() {
                    let line = String::from_utf8_lossy(&pending).into_owned();
                    pending.clear();
                    if tx.send(line).is_err() {
                        return;
                    }
                }
            } else {
                pending.push(byte);
            }
        }
    }

    if !pending.is_empty() {
        let _ = tx.send(String::from_utf8_lossy(&pending).into_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn collect(reader: &[u8]) -> Vec<String> {
        let (tx, rx) = mpsc::channel();
        forward_lines(reader, tx);
        rx.into_iter().collect()
    }

    #[test]
    fn test_forward_lines_splits_on_carriage_return_and_newline() {
        let lines = collect(b"Receiving objects:  10%\rReceiving objects:  50%\r\nDone\n\ntail");
        assert_eq!(
            lines,
            vec!["Receiving objects:  10%", "Receiving objects:  50%", "Done", "tail"]
        );
    }

    #[test]
    fn test_forward_lines_replaces_invalid_utf8() {
        let lines = collect(b"ok \xff\n");
        assert_eq!(lines, vec!["ok \u{fffd}"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_streaming_reads_both_streams() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo out; echo err >&2; exit 3"]);
        let mut lines = Vec::new();

        let status =
            run_streaming(command, Capture::Both, &mut |l| lines.push(l), &CancelFlag::new())
                .unwrap();

        lines.sort();
        assert_eq!(lines, vec!["err", "out"]);
        assert_eq!(status.code(), Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_streaming_stderr_only_ignores_stdout() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo out; echo err >&2"]);
        let mut lines = Vec::new();

        run_streaming(command, Capture::StderrOnly, &mut |l| lines.push(l), &CancelFlag::new())
            .unwrap();

        assert_eq!(lines, vec!["err"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_streaming_cancel_kills_child() {
        let mut command = Command::new("sh");
        command.args(["-c", "exec sleep 30"]);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let started = Instant::now();

        let result = run_streaming(command, Capture::Both, &mut |_| {}, &cancel);

        assert!(matches!(result, Err(KataError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_run_streaming_missing_program_is_io_error() {
        let command = Command::new("kata-definitely-not-a-real-program");
        let result = run_streaming(command, Capture::Both, &mut |_| {}, &CancelFlag::new());
        assert!(matches!(result, Err(KataError::Io(_))));
    }
}
