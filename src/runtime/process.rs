use super::RuntimeLog;
use crate::config::CompanionSettings;
use crate::shared::ServerId;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::thread;

pub fn companion_args(companion: &CompanionSettings, port: u16, flags: &[String]) -> Vec<String> {
    let mut args = companion.args.clone();
    args.push(format!("--port={port}"));
    args.extend(flags.iter().cloned());
    args
}

pub fn command_form(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        return program.to_string();
    }
    format!("{program} {}", args.join(" "))
}

pub fn spawn_companion(companion: &CompanionSettings, args: &[String]) -> std::io::Result<Child> {
    let mut command = Command::new(&companion.program);
    command
        .current_dir(&companion.working_dir)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    for (key, value) in &companion.env {
        command.env(key, value);
    }

    command.spawn()
}

/// Forwards child stdout/stderr to the runtime log line by line, tagged with the server id.
pub fn capture_output(child: &mut Child, server_id: &ServerId, log: &RuntimeLog) {
    if let Some(stdout) = child.stdout.take() {
        forward_lines(stdout, server_id, "info", "process.stdout", log);
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(stderr, server_id, "error", "process.stderr", log);
    }
}

fn forward_lines<R: Read + Send + 'static>(
    stream: R,
    server_id: &ServerId,
    level: &'static str,
    event: &'static str,
    log: &RuntimeLog,
) {
    let tag = format!("[server {server_id}]");
    let thread_log = log.clone();
    let spawned = thread::Builder::new()
        .name(thread_name(event, server_id))
        .spawn(move || {
            let mut reader = BufReader::new(stream);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end();
                if line.is_empty() {
                    continue;
                }
                thread_log.append(level, event, &format!("{tag} {line}"));
            }
        });
    if let Err(err) = spawned {
        log.warn(
            "process.capture_failed",
            &format!("server={server_id} stream={event} error={err}"),
        );
    }
}

/// Thread names cannot carry arbitrary bytes, so the server id is reduced to a safe charset.
pub(crate) fn thread_name(prefix: &str, server_id: &ServerId) -> String {
    let id: String = server_id
        .as_str()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    format!("{prefix}-{id}")
}

/// Asks the child to exit through `kill_program -TERM <pid>`. A child that
/// already exited counts as terminated.
pub fn terminate(child: &mut Child, kill_program: &str) -> std::io::Result<()> {
    if child.try_wait()?.is_some() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        let pid = child.id();
        let status = Command::new(kill_program)
            .arg("-TERM")
            .arg(pid.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if status.success() {
            return Ok(());
        }
        Err(std::io::Error::other(format!(
            "{kill_program} -TERM {pid} exited with {status}"
        )))
    }

    #[cfg(not(unix))]
    {
        let _ = kill_program;
        child.kill()
    }
}
