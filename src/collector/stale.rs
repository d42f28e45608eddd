//! Cleanup of tool instances left behind by an earlier, uncleanly terminated run.

use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, kill, killpg};
use nix::unistd::{Pid, getpgid};
use regex::Regex;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

/// How long stale processes get to exit after `SIGTERM` before `SIGKILL`.
const STALE_GRACE: Duration = Duration::from_secs(2);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Build the pattern matching command lines of this exact invocation.
///
/// The tool must be the program itself or the first argument of an
/// interpreter, followed by the same arguments. Only the values of
/// `varying_flags` may differ, so another instance of the tool aimed at a
/// different device or host is left alone.
pub fn stale_pattern(
    tool: &str,
    args: &[String],
    varying_flags: &[&str],
) -> Result<Regex, regex::Error> {
    let mut pattern = format!(r"^(?:\S+\s+)?{}", regex::escape(tool));
    let mut wildcard_next = false;
    for arg in args {
        pattern.push_str(r"\s+");
        if wildcard_next {
            pattern.push_str(r"\S+");
        } else {
            pattern.push_str(&regex::escape(arg));
        }
        wildcard_next = varying_flags.contains(&arg.as_str());
    }
    pattern.push_str(r"\s*$");
    Regex::new(&pattern)
}

/// Find processes whose command line matches `pattern`, excluding this process.
pub fn find_processes(pattern: &Regex) -> Vec<(u32, String)> {
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
    );
    let own_pid = sysinfo::get_current_pid().ok();

    let mut found: Vec<(u32, String)> = system
        .processes()
        .iter()
        .filter(|(pid, _)| Some(**pid) != own_pid)
        .filter_map(|(pid, process)| {
            let cmdline = process
                .cmd()
                .iter()
                .map(|arg| arg.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ");
            pattern
                .is_match(&cmdline)
                .then(|| (pid.as_u32(), cmdline))
        })
        .collect();
    found.sort_unstable();
    found
}

/// Signal a process, or its whole group when it leads one.
fn signal_process(pid: Pid, signal: Signal) -> nix::Result<()> {
    match getpgid(Some(pid)) {
        Ok(pgid) if pgid == pid => killpg(pgid, signal),
        _ => kill(pid, signal),
    }
}

fn is_alive(pid: Pid) -> bool {
    kill(pid, None).is_ok()
}

/// Terminate every process matching `pattern`.
///
/// Best effort: failures are logged and otherwise ignored. Returns the PIDs
/// that were signaled.
pub async fn kill_processes(pattern: &Regex, collector: &str) -> Vec<u32> {
    let procs = find_processes(pattern);
    if procs.is_empty() {
        return Vec::new();
    }

    let mut signaled = Vec::new();
    for (pid, cmdline) in &procs {
        tracing::info!(collector, pid, cmdline = %cmdline, "Killing stale process");
        #[allow(clippy::cast_possible_wrap)]
        let target = Pid::from_raw(*pid as i32);
        match signal_process(target, Signal::SIGTERM) {
            Ok(()) => signaled.push(*pid),
            Err(e) => tracing::debug!(collector, pid, error = %e, "Failed to signal stale process"),
        }
    }

    let deadline = Instant::now() + STALE_GRACE;
    #[allow(clippy::cast_possible_wrap)]
    let mut remaining: Vec<Pid> = signaled.iter().map(|p| Pid::from_raw(*p as i32)).collect();
    while !remaining.is_empty() && Instant::now() < deadline {
        tokio::time::sleep(POLL_INTERVAL).await;
        remaining.retain(|pid| is_alive(*pid));
    }

    for pid in remaining {
        tracing::warn!(collector, pid = pid.as_raw(), "Stale process survived SIGTERM, sending SIGKILL");
        if let Err(e) = signal_process(pid, Signal::SIGKILL) {
            tracing::debug!(collector, pid = pid.as_raw(), error = %e, "Failed to kill stale process");
        }
    }

    signaled
}
