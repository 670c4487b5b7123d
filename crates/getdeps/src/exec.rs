use std::io::{BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::mpsc;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::log_sanitize::{redact_url_credentials, sanitize_log_line};

fn describe(cmd: &Command) -> String {
    let mut out = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        out.push(' ');
        out.push_str(&arg.to_string_lossy());
    }
    redact_url_credentials(&out)
}

/// Runs `cmd` to completion, forwarding its stdout and stderr to the log
/// line by line. `label` prefixes every forwarded line.
pub fn run_cmd(label: &str, mut cmd: Command) -> Result<()> {
    let shown = describe(&cmd);
    info!("{label}: running {shown}");

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::msg(format!("{label}: failed to spawn {shown}: {e}")))?;

    let (tx, rx) = mpsc::channel::<String>();
    if let Some(out) = child.stdout.take() {
        let tx = tx.clone();
        std::thread::spawn(move || read_output_stream(out, tx));
    }
    if let Some(err) = child.stderr.take() {
        let tx = tx.clone();
        std::thread::spawn(move || read_output_stream(err, tx));
    }
    drop(tx);

    for line in rx {
        let line = sanitize_log_line(&line);
        if !line.is_empty() {
            info!("{label}: {line}");
        }
    }

    let status = child
        .wait()
        .map_err(|e| Error::msg(format!("{label}: wait failed for {shown}: {e}")))?;
    if !status.success() {
        return Err(Error::msg(format!("error running {shown}: {status}")));
    }
    Ok(())
}

/// Runs `cmd` and returns its trimmed stdout. Output is not logged.
pub fn capture(cmd: &mut Command) -> Result<String> {
    let shown = describe(cmd);
    debug!("capturing {shown}");
    let out = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| Error::msg(format!("failed to run {shown}: {e}")))?;
    if !out.status.success() {
        let stderr = sanitize_log_line(String::from_utf8_lossy(&out.stderr).trim());
        return Err(Error::msg(format!(
            "error running {shown}: {} {stderr}",
            out.status
        )));
    }
    Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

fn read_output_stream<R: Read>(reader: R, tx: mpsc::Sender<String>) {
    const MAX_PENDING_BYTES: usize = 16 * 1024;
    let mut r = BufReader::new(reader);
    let mut buf = [0u8; 8192];
    let mut pending = Vec::with_capacity(1024);

    let flush = |pending: &mut Vec<u8>| {
        if !pending.is_empty() {
            let _ = tx.send(String::from_utf8_lossy(pending).into_owned());
            pending.clear();
        }
    };

    loop {
        let n = match r.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        for b in &buf[..n] {
            // git progress output uses bare '\r' between updates.
            if *b == b'\n' || *b == b'\r' {
                flush(&mut pending);
            } else {
                pending.push(*b);
                if pending.len() >= MAX_PENDING_BYTES {
                    flush(&mut pending);
                }
            }
        }
    }
    flush(&mut pending);
}
