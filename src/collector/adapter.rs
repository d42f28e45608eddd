//! Collector adapter: the lifecycle of one wrapped statistics tool.
//!
//! An adapter goes through `configure` -> `start` -> `end` -> `save` ->
//! `validate`, and may be configured and started again after that. It owns
//! the tool's child process and the raw output file the tool writes into.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use chrono::Utc;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::{Pid, getpgid};
use regex::Regex;
use tokio::process::{Child, Command};
use tokio::time::timeout;

use super::property::Properties;
use super::source::Source;
use super::stale;
use super::traits::{CollectorError, DEFAULT_EXIT_TIMEOUT, ToolProfile, render_command};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unconfigured,
    Configured,
    Running,
    Stopped,
}

/// One statistics source: its properties, child process, and output file.
pub struct CollectorAdapter {
    profile: Box<dyn ToolProfile>,
    properties: Properties,
    exit_timeout: Duration,
    state: State,
    argv: Vec<String>,
    stale_pattern: Option<Regex>,
    output_path: Option<PathBuf>,
    output: Option<File>,
    child: Option<Child>,
}

impl CollectorAdapter {
    /// Create an unconfigured adapter for `source`.
    pub fn new(source: Source) -> Self {
        Self::with_profile(source.profile())
    }

    /// Create an unconfigured adapter around an explicit tool profile.
    pub(crate) fn with_profile(profile: Box<dyn ToolProfile>) -> Self {
        let mut properties = Properties::new();
        properties
            .required_str("outdir")
            .optional_str("logdir", None)
            .optional_str("toolpath", Some(profile.default_toolpath()))
            .optional_bool("fallible", false);
        profile.declare(&mut properties);

        Self {
            profile,
            properties,
            exit_timeout: DEFAULT_EXIT_TIMEOUT,
            state: State::Unconfigured,
            argv: Vec::new(),
            stale_pattern: None,
            output_path: None,
            output: None,
            child: None,
        }
    }

    /// Set how long `save` waits for the tool to exit.
    pub fn with_exit_timeout(mut self, exit_timeout: Duration) -> Self {
        self.exit_timeout = exit_timeout;
        self
    }

    /// Statistics source of this adapter.
    pub fn source(&self) -> Source {
        self.profile.source()
    }

    /// Current property values.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Whether failures of this adapter are tolerated.
    pub fn is_fallible(&self) -> bool {
        self.properties.bool("fallible").unwrap_or(false)
    }

    /// Whether the tool is currently running.
    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    /// Path of the raw output file, once configured.
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// Set a property from its raw string form.
    ///
    /// # Errors
    /// Fails while the tool runs, for unknown properties, and for values that
    /// do not coerce to the property's type.
    pub fn set_property(&mut self, name: &str, raw: &str) -> Result<(), CollectorError> {
        if self.state == State::Running {
            return Err(CollectorError::PropertyLocked(name.to_string()));
        }
        self.properties.set(name, raw)?;
        if self.state == State::Configured {
            // A configured command line is stale now.
            self.state = State::Unconfigured;
        }
        Ok(())
    }

    fn command_line(&self) -> String {
        render_command(&self.argv, self.profile.secret_flags())
    }

    /// Validate properties, prepare directories, and (re)open the output file.
    pub async fn configure(&mut self) -> Result<(), CollectorError> {
        if self.state == State::Running {
            return Err(CollectorError::AlreadyRunning);
        }
        self.state = State::Unconfigured;

        if let Some(name) = self.properties.missing_required() {
            return Err(CollectorError::MissingConfiguration(name));
        }

        let outdir = PathBuf::from(
            self.properties
                .str("outdir")
                .ok_or(CollectorError::MissingConfiguration("outdir"))?,
        );
        ensure_directory(&outdir)?;
        let logdir = self
            .properties
            .str("logdir")
            .map_or_else(|| outdir.join("logs"), PathBuf::from);
        ensure_directory(&logdir)?;

        let toolpath = self
            .properties
            .str("toolpath")
            .unwrap_or(self.profile.default_toolpath())
            .to_string();
        let mut argv = vec![toolpath.clone()];
        argv.extend(self.profile.args(&self.properties)?);

        self.profile
            .prepare(&toolpath, &self.properties, self.exit_timeout)
            .await?;

        let output_path = outdir.join(self.source().output_file_name());
        let output = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&output_path)
            .map_err(|source| CollectorError::Io {
                path: output_path.clone(),
                source,
            })?;
        output.sync_all().map_err(|source| CollectorError::Io {
            path: output_path.clone(),
            source,
        })?;

        let varying = self.profile.varying_flags();
        self.stale_pattern = match stale::stale_pattern(&toolpath, &argv[1..], varying) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::debug!(collector = %self.source(), error = %e, "No stale process pattern");
                None
            }
        };
        self.argv = argv;
        self.output_path = Some(output_path);
        self.output = Some(output);
        self.state = State::Configured;

        tracing::debug!(
            collector = %self.source(),
            command = %self.command_line(),
            "Collector configured"
        );
        Ok(())
    }

    /// Kill leftovers of this tool from an earlier run. Never fails.
    pub async fn kill_stale(&self) {
        if let Some(pattern) = &self.stale_pattern {
            let killed = stale::kill_processes(pattern, self.source().as_ref()).await;
            if !killed.is_empty() {
                tracing::info!(collector = %self.source(), pids = ?killed, "Killed stale processes");
            }
        }
    }

    /// Launch the tool in its own process group, writing into the output file.
    pub async fn start(&mut self) -> Result<(), CollectorError> {
        match self.state {
            State::Running => return Err(CollectorError::AlreadyRunning),
            State::Configured => {}
            State::Unconfigured | State::Stopped => return Err(CollectorError::NotConfigured),
        }
        let (Some(output), Some(output_path)) = (&self.output, &self.output_path) else {
            return Err(CollectorError::NotConfigured);
        };

        let io_error = |source| CollectorError::Io {
            path: output_path.clone(),
            source,
        };
        let stdout = output.try_clone().map_err(io_error)?;
        let stderr = output.try_clone().map_err(io_error)?;

        let command = self.command_line();
        let child = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .process_group(0)
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| CollectorError::Spawn {
                command: command.clone(),
                source,
            })?;

        tracing::info!(
            collector = %self.source(),
            pid = child.id(),
            command = %command,
            "Collector started"
        );
        self.child = Some(child);
        self.state = State::Running;

        self.log_command(&command)
    }

    /// Record the command line in the log directory.
    fn log_command(&self, command: &str) -> Result<(), CollectorError> {
        let Some(outdir) = self.properties.str("outdir") else {
            return Ok(());
        };
        let logdir = self
            .properties
            .str("logdir")
            .map_or_else(|| Path::new(outdir).join("logs"), PathBuf::from);
        let path = logdir.join(self.source().command_log_name());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| CollectorError::Io {
                path: path.clone(),
                source,
            })?;
        writeln!(file, "# started {}\n{command}", Utc::now().to_rfc3339())
            .map_err(|source| CollectorError::Io { path, source })
    }

    /// Signal the tool's process group to stop.
    ///
    /// The tool is expected to still be running: an earlier exit is reported as
    /// `PrematureExit`.
    pub async fn end(&mut self) -> Result<(), CollectorError> {
        let command = self.command_line();
        let child = self.child.as_mut().ok_or(CollectorError::NotRunning)?;

        match child.try_wait() {
            Ok(Some(status)) => {
                self.child = None;
                self.state = State::Stopped;
                return Err(CollectorError::PrematureExit { command, status });
            }
            Ok(None) => {}
            Err(e) => {
                return Err(CollectorError::SignalError {
                    command,
                    reason: format!("failed to query exit status: {e}"),
                });
            }
        }

        let pid = child.id().ok_or_else(|| CollectorError::SignalError {
            command: command.clone(),
            reason: "process id is no longer available".to_string(),
        })?;
        #[allow(clippy::cast_possible_wrap)]
        let pgid = getpgid(Some(Pid::from_raw(pid as i32))).map_err(|e| {
            CollectorError::SignalError {
                command: command.clone(),
                reason: format!("failed to get process group of PID {pid}: {e}"),
            }
        })?;

        let signal = self.profile.stop_signal();
        killpg(pgid, signal).map_err(|e| CollectorError::SignalError {
            command: command.clone(),
            reason: format!("failed to send {signal} to process group {pgid}: {e}"),
        })?;

        tracing::debug!(collector = %self.source(), pid, %signal, "Signaled collector process group");
        Ok(())
    }

    /// Wait for the signaled tool to exit, then sync the output file.
    pub async fn save(&mut self) -> Result<(), CollectorError> {
        let command = self.command_line();
        let child = self.child.as_mut().ok_or(CollectorError::NotRunning)?;

        let status = match timeout(self.exit_timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                return Err(CollectorError::SignalError {
                    command,
                    reason: format!("failed to wait for exit: {e}"),
                });
            }
            Err(_) => {
                return Err(CollectorError::ExitTimeout {
                    command,
                    timeout: self.exit_timeout,
                });
            }
        };

        tracing::debug!(collector = %self.source(), %status, "Collector exited");
        self.child = None;
        self.state = State::Stopped;

        if let (Some(output), Some(path)) = (&self.output, &self.output_path) {
            output.sync_all().map_err(|source| CollectorError::Io {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Check the output file against the source's marker bytes.
    pub fn validate(&self) -> Result<(), CollectorError> {
        let Some(path) = &self.output_path else {
            return Ok(());
        };

        let io_error = |source| CollectorError::Io {
            path: path.clone(),
            source,
        };

        if let Some(marker) = self.profile.leading_marker() {
            let actual = read_head(path, marker.len()).map_err(io_error)?;
            if actual != marker {
                return Err(corrupt(path, "leading", marker, &actual));
            }
        }
        if let Some(marker) = self.profile.trailing_marker() {
            let actual = read_tail(path, marker.len()).map_err(io_error)?;
            if actual != marker {
                return Err(corrupt(path, "trailing", marker, &actual));
            }
        }
        Ok(())
    }

    /// Kill the tool's process group outright and reap it.
    ///
    /// Used to roll back a partially started run; errors are only logged.
    pub async fn abort(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        self.state = State::Stopped;

        if let Some(pid) = child.id() {
            #[allow(clippy::cast_possible_wrap)]
            let pgid = Pid::from_raw(pid as i32);
            if let Err(e) = killpg(pgid, Signal::SIGKILL) {
                tracing::debug!(collector = %self.source(), pid, error = %e, "Failed to kill process group");
            }
        }
        match timeout(self.exit_timeout, child.wait()).await {
            Ok(Ok(status)) => tracing::debug!(collector = %self.source(), %status, "Collector aborted"),
            Ok(Err(e)) => tracing::warn!(collector = %self.source(), error = %e, "Failed to reap aborted collector"),
            Err(_) => tracing::warn!(collector = %self.source(), "Aborted collector did not exit"),
        }
    }
}

impl std::fmt::Debug for CollectorAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorAdapter")
            .field("source", &self.source())
            .field("state", &self.state)
            .field("output_path", &self.output_path)
            .finish_non_exhaustive()
    }
}

fn corrupt(path: &Path, position: &'static str, expected: &[u8], actual: &[u8]) -> CollectorError {
    CollectorError::CorruptOutput {
        path: path.to_path_buf(),
        position,
        expected: expected.escape_ascii().to_string(),
        actual: actual.escape_ascii().to_string(),
    }
}

/// Make sure `path` is an absolute directory, creating it if missing.
fn ensure_directory(path: &Path) -> Result<(), CollectorError> {
    let path_error = |reason: String| CollectorError::PathError {
        path: path.to_path_buf(),
        reason,
    };

    if !path.is_absolute() {
        return Err(path_error("not an absolute path".to_string()));
    }
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(path_error("exists but is not a directory".to_string())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => std::fs::create_dir_all(path)
            .map_err(|e| path_error(format!("failed to create directory: {e}"))),
        Err(e) => Err(path_error(format!("failed to stat: {e}"))),
    }
}

/// Read up to `len` bytes from the start of a file.
fn read_head(path: &Path, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len);
    File::open(path)?.take(len as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Read up to `len` bytes from the end of a file.
fn read_tail(path: &Path, len: usize) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    file.seek(SeekFrom::Start(size.saturating_sub(len as u64)))?;
    let mut buf = Vec::with_capacity(len);
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Tool that prints forever and exits cleanly on INT/TERM. A meter
    /// `set interval` invocation returns at once.
    pub(crate) const LOOPING_TOOL: &str = "#!/bin/sh\n\
        case \" $* \" in *' set interval '*) exit 0 ;; esac\n\
        trap 'echo stopped; exit 0' INT TERM\n\
        echo \"timestamp | args: $*\"\n\
        while :; do echo sample; sleep 0.05; done\n";

    /// Tool that exits immediately with status 3.
    pub(crate) const EXITING_TOOL: &str = "#!/bin/sh\necho bye\nexit 3\n";

    /// Write an executable script into `dir` and return its path.
    pub(crate) fn write_tool(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    /// Adapter with every required property set and `toolpath` pointing at `tool`.
    pub(crate) fn ready_adapter(source: Source, outdir: &Path, tool: &str) -> CollectorAdapter {
        let mut adapter =
            CollectorAdapter::new(source).with_exit_timeout(Duration::from_secs(5));
        adapter
            .set_property("outdir", &outdir.to_string_lossy())
            .unwrap();
        adapter.set_property("toolpath", tool).unwrap();
        match source {
            Source::FrequencySampler | Source::IpmiInband => {
                adapter.set_property("interval", "0.1").unwrap();
            }
            Source::IpmiOob => {
                adapter.set_property("interval", "0.1").unwrap();
                adapter.set_property("host", "bmc.example").unwrap();
            }
            Source::AcPower => {
                adapter.set_property("devnode", "/dev/null").unwrap();
            }
        }
        adapter
    }

    fn setup() -> (TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let tool = write_tool(dir.path(), "tool.sh", LOOPING_TOOL);
        (dir, tool)
    }

    #[tokio::test]
    #[serial]
    async fn test_configure_creates_empty_output_for_every_source() {
        let (dir, tool) = setup();
        for source in Source::ALL {
            let outdir = dir.path().join("out").join(source.as_ref());
            let mut adapter = ready_adapter(source, &outdir, &tool);
            adapter.configure().await.unwrap();

            let expected = outdir.join(source.output_file_name());
            assert_eq!(adapter.output_path(), Some(expected.as_path()));
            assert_eq!(std::fs::metadata(&expected).unwrap().len(), 0);
            assert!(outdir.join("logs").is_dir());
        }
    }

    #[tokio::test]
    async fn test_start_before_configure_fails_for_every_source() {
        for source in Source::ALL {
            let mut adapter = CollectorAdapter::new(source);
            assert!(matches!(
                adapter.start().await,
                Err(CollectorError::NotConfigured)
            ));
        }
    }

    #[tokio::test]
    async fn test_configure_missing_required() {
        let mut adapter = CollectorAdapter::new(Source::IpmiOob);
        adapter.set_property("outdir", "/tmp/unused").unwrap();
        adapter.set_property("interval", "1").unwrap();
        assert!(matches!(
            adapter.configure().await,
            Err(CollectorError::MissingConfiguration("host"))
        ));
    }

    #[tokio::test]
    async fn test_configure_relative_outdir() {
        let mut adapter = CollectorAdapter::new(Source::FrequencySampler);
        adapter.set_property("outdir", "relative/out").unwrap();
        adapter.set_property("interval", "1").unwrap();
        let err = adapter.configure().await.unwrap_err();
        assert!(matches!(err, CollectorError::PathError { .. }));
        assert!(err.to_string().contains("not an absolute path"));
    }

    #[tokio::test]
    async fn test_configure_outdir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain-file");
        std::fs::write(&file, b"x").unwrap();

        let mut adapter = CollectorAdapter::new(Source::FrequencySampler);
        adapter
            .set_property("outdir", &file.to_string_lossy())
            .unwrap();
        adapter.set_property("interval", "1").unwrap();
        let err = adapter.configure().await.unwrap_err();
        assert!(err.to_string().contains("exists but is not a directory"));
    }

    #[tokio::test]
    #[serial]
    async fn test_full_cycle_and_reconfigure_truncates() {
        let (dir, tool) = setup();
        let mut adapter = ready_adapter(Source::IpmiInband, dir.path(), &tool);

        adapter.configure().await.unwrap();
        adapter.start().await.unwrap();
        assert!(adapter.is_running());
        tokio::time::sleep(Duration::from_millis(200)).await;
        adapter.end().await.unwrap();
        adapter.save().await.unwrap();
        adapter.validate().unwrap();

        let path = adapter.output_path().unwrap().to_path_buf();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("timestamp | args: --interval 0.1"));
        assert!(content.contains("sample"));

        let cmd_log = dir.path().join("logs").join("ipmi-inband.cmd.txt");
        let logged = std::fs::read_to_string(cmd_log).unwrap();
        assert!(logged.contains(&format!("{tool} --interval 0.1")));

        // Starting again without configure is refused; configure truncates.
        assert!(matches!(
            adapter.start().await,
            Err(CollectorError::NotConfigured)
        ));
        adapter.configure().await.unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[tokio::test]
    #[serial]
    async fn test_property_locked_while_running() {
        let (dir, tool) = setup();
        let mut adapter = ready_adapter(Source::FrequencySampler, dir.path(), &tool);
        adapter.configure().await.unwrap();
        adapter.start().await.unwrap();

        assert!(matches!(
            adapter.set_property("interval", "2"),
            Err(CollectorError::PropertyLocked(_))
        ));

        adapter.end().await.unwrap();
        adapter.save().await.unwrap();
        adapter.set_property("interval", "2").unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_premature_exit() {
        let dir = tempfile::tempdir().unwrap();
        let tool = write_tool(dir.path(), "exits.sh", EXITING_TOOL);
        let mut adapter = ready_adapter(Source::FrequencySampler, dir.path(), &tool);
        adapter.configure().await.unwrap();
        adapter.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        let err = adapter.end().await.unwrap_err();
        match &err {
            CollectorError::PrematureExit { command, status } => {
                assert_eq!(status.code(), Some(3));
                assert!(command.starts_with(&tool));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("exit status: 3"));

        // The adapter is reusable after a premature exit.
        adapter.configure().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_save_times_out_when_signal_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let tool = write_tool(
            dir.path(),
            "stubborn.sh",
            "#!/bin/sh\ntrap '' INT TERM\nwhile :; do sleep 0.05; done\n",
        );
        let mut adapter = ready_adapter(Source::IpmiInband, dir.path(), &tool)
            .with_exit_timeout(Duration::from_millis(300));
        adapter.configure().await.unwrap();
        adapter.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        adapter.end().await.unwrap();
        assert!(matches!(
            adapter.save().await,
            Err(CollectorError::ExitTimeout { .. })
        ));
        assert!(adapter.is_running());

        adapter.abort().await;
        assert!(!adapter.is_running());
    }

    #[tokio::test]
    #[serial]
    async fn test_validate_rejects_wrong_leading_marker() {
        let (dir, tool) = setup();
        let mut adapter = ready_adapter(Source::IpmiOob, dir.path(), &tool);
        adapter.configure().await.unwrap();

        let path = adapter.output_path().unwrap().to_path_buf();
        std::fs::write(&path, b"error: BMC unreachable\n").unwrap();

        let err = adapter.validate().unwrap_err();
        match err {
            CollectorError::CorruptOutput {
                position,
                expected,
                actual,
                ..
            } => {
                assert_eq!(position, "leading");
                assert_eq!(expected, "timestamp |");
                assert_eq!(actual, "error: BMC ");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_validate_without_markers_is_noop() {
        let (dir, tool) = setup();
        let mut adapter = ready_adapter(Source::AcPower, dir.path(), &tool);
        adapter.configure().await.unwrap();
        std::fs::write(adapter.output_path().unwrap(), b"anything").unwrap();
        adapter.validate().unwrap();

        // Unconfigured adapters have nothing to validate.
        CollectorAdapter::new(Source::IpmiInband).validate().unwrap();
    }

    /// Profile whose output must end with a fixed footer.
    #[derive(Debug)]
    struct FooterProfile;

    impl ToolProfile for FooterProfile {
        fn source(&self) -> Source {
            Source::FrequencySampler
        }

        fn default_toolpath(&self) -> &'static str {
            "footer-tool"
        }

        fn declare(&self, _props: &mut Properties) {}

        fn args(&self, _props: &Properties) -> Result<Vec<String>, CollectorError> {
            Ok(Vec::new())
        }

        fn trailing_marker(&self) -> Option<&'static [u8]> {
            Some(b"-- end --\n")
        }
    }

    #[tokio::test]
    async fn test_validate_trailing_marker() {
        let dir = tempfile::tempdir().unwrap();
        let mut adapter = CollectorAdapter::with_profile(Box::new(FooterProfile));
        adapter
            .set_property("outdir", &dir.path().to_string_lossy())
            .unwrap();
        adapter.configure().await.unwrap();
        let path = adapter.output_path().unwrap().to_path_buf();

        std::fs::write(&path, b"sample 1\nsample 2\n-- end --\n").unwrap();
        adapter.validate().unwrap();

        std::fs::write(&path, b"sample 1\nsample 2\n").unwrap();
        match adapter.validate().unwrap_err() {
            CollectorError::CorruptOutput {
                position,
                expected,
                actual,
                ..
            } => {
                assert_eq!(position, "trailing");
                assert_eq!(expected, "-- end --\\n");
                assert_eq!(actual, "\\nsample 2\\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_tail_short_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(read_tail(&path, 2).unwrap(), b"bc");
        assert_eq!(read_tail(&path, 10).unwrap(), b"abc");
        assert_eq!(read_head(&path, 2).unwrap(), b"ab");
    }
}
