//! External command execution utilities.
//!
//! Provides a Builder-based API for running the external collaborators
//! (the mirroring tool and `git`) with output filtering and PTY support.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! // Simple command
//! Cmd::new("git").args(["status", "-s"]).cwd(dir).run()?;
//!
//! // Mirroring tool from config, tolerating partial failures
//! Cmd::from_slice(&["wget"])
//!     .args(["--recursive", "http://localhost:2368"])
//!     .accept_codes(&[8])
//!     .run()?;
//!
//! // With PTY so credential prompts reach the terminal
//! exec!(pty=true; dir; ["git"]; "push", "-u", "origin", "master")?;
//! ```

use crate::log;
use anyhow::{Context, Result};
use portable_pty::{CommandBuilder, NativePtySystem, PtySize, PtySystem};
use regex::Regex;
use std::{
    ffi::{OsStr, OsString},
    io::Read,
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Output},
    sync::OnceLock,
};

// ============================================================================
// Builder API
// ============================================================================

/// Command builder for external process execution.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    use_pty: bool,
    filter: Option<&'static FilterRule>,
    /// Non-zero exit codes treated as success.
    accepted: &'static [i32],
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Create from a command array (e.g., `["wget"]` or `["proxychains", "wget"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        match cmd.split_first() {
            Some((program, args)) => Self::new(program).args(args),
            None => Self::default(),
        }
    }

    /// Add a single argument.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            let arg = arg.as_ref();
            if !arg.is_empty() {
                self.args.push(arg.to_owned());
            }
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Enable PTY (pseudo-terminal) mode.
    ///
    /// PTY allows commands to behave as if running in a real terminal,
    /// enabling credential prompts and colored output.
    pub fn pty(mut self, enable: bool) -> Self {
        self.use_pty = enable;
        self
    }

    /// Set output filter for logging.
    pub fn filter(mut self, filter: &'static FilterRule) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Treat these non-zero exit codes as success.
    pub fn accept_codes(mut self, codes: &'static [i32]) -> Self {
        self.accepted = codes;
        self
    }

    /// Execute the command and return output.
    pub fn run(self) -> Result<Output> {
        let filter = self.filter.unwrap_or(&EMPTY_FILTER);

        if self.use_pty {
            self.run_with_pty(filter)
        } else {
            self.run_simple(filter)
        }
    }
}

/// Create a command from a slice of arguments.
///
/// The first element is the program, rest are arguments.
/// This is a helper for the `exec!` macro.
#[inline]
pub fn cmd_slice<S: AsRef<OsStr>>(slice: &[S]) -> Cmd {
    Cmd::from_slice(slice)
}

impl Cmd {
    /// Get the program name for error messages.
    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    fn is_accepted(&self, status: ExitStatus) -> bool {
        status.success() || status.code().is_some_and(|code| self.accepted.contains(&code))
    }

    /// Simple execution without PTY.
    fn run_simple(self, filter: &'static FilterRule) -> Result<Output> {
        let name = self.program_name();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .with_context(|| format!("Failed to execute `{name}`"))?;

        if !self.is_accepted(output.status) {
            anyhow::bail!(format_error(&name, &output, filter));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        filter.log(&name, stderr.trim());
        Ok(output)
    }

    /// Execution with PTY support.
    fn run_with_pty(self, filter: &'static FilterRule) -> Result<Output> {
        let name = self.program_name();

        let mut cmd_builder = CommandBuilder::new(&self.program);
        cmd_builder.args(&self.args);

        if let Some(dir) = &self.cwd {
            cmd_builder.cwd(dir);
        }

        let pty_system = NativePtySystem::default();
        let pair = pty_system.openpty(PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        })?;

        let mut child = pair.slave.spawn_command(cmd_builder)?;
        drop(pair.slave);

        // Read output in separate thread (PTY blocks until EOF)
        let mut reader = pair.master.try_clone_reader()?;
        let output_handle = std::thread::spawn(move || {
            let mut output = String::new();
            let _ = reader.read_to_string(&mut output);
            output
        });

        let status = child.wait()?;
        drop(pair.master);

        let output_str = output_handle
            .join()
            .map_err(|_| anyhow::anyhow!("Failed to join output reader thread"))?;

        // Convert to std::process::Output
        #[cfg(unix)]
        #[allow(clippy::cast_possible_wrap)]
        let std_status = {
            use std::os::unix::process::ExitStatusExt;
            ExitStatus::from_raw((status.exit_code() as i32) << 8)
        };
        #[cfg(windows)]
        let std_status = {
            use std::os::windows::process::ExitStatusExt;
            ExitStatus::from_raw(status.exit_code())
        };

        if !self.is_accepted(std_status) {
            anyhow::bail!("Command `{name}` failed: {status:?}\n{output_str}");
        }

        filter.log(&name, &output_str);

        Ok(Output {
            status: std_status,
            stdout: output_str.into_bytes(),
            stderr: Vec::new(),
        })
    }
}

// ============================================================================
// Macro (syntax sugar for simple cases)
// ============================================================================

/// Run an external command with arguments in a directory.
///
/// # Syntax
///
/// ```ignore
/// exec!(dir; ["git"]; "add", ".")?;
/// exec!(pty=true; dir; ["git"]; "push")?;
/// ```
#[macro_export]
macro_rules! exec {
    // pty + root + array cmd
    (pty=$pty:expr; $root:expr; [$($cmd:expr),+ $(,)?]; $($arg:expr),* $(,)?) => {
        $crate::utils::exec::cmd_slice(&[$($cmd),+])
            $(.arg($arg))*
            .cwd($root)
            .pty($pty)
            .run()
    };

    // root + array cmd
    ($root:expr; [$($cmd:expr),+ $(,)?]; $($arg:expr),* $(,)?) => {
        $crate::utils::exec::cmd_slice(&[$($cmd),+])
            $(.arg($arg))*
            .cwd($root)
            .run()
    };
}

// ============================================================================
// Output Filtering
// ============================================================================

/// Filter rule for command output logging.
///
/// Mirroring prints a line per request; rules keep the log to what matters.
pub struct FilterRule {
    /// Prefixes to skip when logging output.
    pub skip_prefixes: &'static [&'static str],
    /// When non-empty, only lines containing one of these are logged.
    pub keep_matching: &'static [&'static str],
}

impl FilterRule {
    /// Skip lines starting with any of `skip_prefixes`.
    pub const fn new(skip_prefixes: &'static [&'static str]) -> Self {
        Self {
            skip_prefixes,
            keep_matching: &[],
        }
    }

    /// Log only lines containing one of `keep_matching`.
    pub const fn keep(keep_matching: &'static [&'static str]) -> Self {
        Self {
            skip_prefixes: &[],
            keep_matching,
        }
    }

    fn should_skip(&self, line: &str) -> bool {
        line.is_empty()
            || self.skip_prefixes.iter().any(|p| line.starts_with(p))
            || (!self.keep_matching.is_empty()
                && !self.keep_matching.iter().any(|m| line.contains(m)))
    }

    /// Log output lines that pass the filter.
    pub fn log(&self, name: &str, output: &str) {
        let lines: Vec<_> = output
            .lines()
            .filter(|line| !self.should_skip(strip_ansi(line).trim()))
            .collect();

        if !lines.is_empty() {
            log!(name; "{}", lines.join("\n"));
        }
    }
}

/// Empty filter (no skipping).
pub const EMPTY_FILTER: FilterRule = FilterRule::new(&[]);

/// Mirroring tool: only failed requests and fatal errors.
pub const MIRROR_FILTER: FilterRule =
    FilterRule::keep(&["ERROR", "failed:", "unable to", "Unable to", "No such"]);

// ============================================================================
// Helpers
// ============================================================================

/// Strip ANSI escape codes from string.
fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    match RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").ok()) {
        Some(re) => re.replace_all(s, ""),
        None => std::borrow::Cow::Borrowed(s),
    }
}

/// Format error message for failed command.
fn format_error(name: &str, output: &Output, filter: &'static FilterRule) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let error_msg = filter
        .skip_prefixes
        .iter()
        .fold(stderr.trim(), |s, p| s.trim_start_matches(p).trim_start());

    let mut msg = format!("Command `{name}` failed with {}\n", output.status);
    if !error_msg.is_empty() {
        msg.push_str(error_msg);
    }

    let stdout_trimmed = stdout.trim();
    if !stdout_trimmed.is_empty() {
        msg.push_str("\nStdout:\n");
        msg.push_str(stdout_trimmed);
    }
    msg
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_builder() {
        let cmd = Cmd::new("echo")
            .arg("hello")
            .args(["world", "!"])
            .cwd("/tmp");

        assert_eq!(cmd.program, OsString::from("echo"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_from_slice() {
        let cmd = Cmd::from_slice(&["proxychains", "wget"]).arg("-r");
        assert_eq!(cmd.program, OsString::from("proxychains"));
        assert_eq!(cmd.args, vec![OsString::from("wget"), OsString::from("-r")]);

        let cmd = Cmd::from_slice::<&str>(&[]);
        assert!(cmd.program.is_empty());
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn test_empty_args_filtered() {
        let cmd = Cmd::new("echo").arg("").args(["a", "", "b"]);
        assert_eq!(cmd.args.len(), 2);
    }

    #[test]
    fn test_filter_rule() {
        let filter = FilterRule::new(&["--", "Resolving"]);
        assert!(filter.should_skip("--2024-01-01 12:00:00--  http://localhost:2368/"));
        assert!(filter.should_skip("Resolving localhost"));
        assert!(!filter.should_skip("ERROR 404: Not Found."));
        assert!(filter.should_skip(""));
    }

    #[test]
    fn test_mirror_filter_keeps_errors() {
        assert!(MIRROR_FILTER.should_skip("Saving to: 'index.html'"));
        assert!(MIRROR_FILTER.should_skip("Length: 5210 (5.1K) [text/html]"));
        assert!(!MIRROR_FILTER.should_skip("ERROR 404: Not Found."));
        assert!(!MIRROR_FILTER.should_skip("Connecting to localhost:2368... failed: Connection refused."));
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_ansi("Plain text"), "Plain text");
    }

    #[test]
    fn test_simple_command() {
        let output = Cmd::new("echo").arg("hello").run().unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hello"));
    }

    #[test]
    fn test_failing_command() {
        assert!(Cmd::new("false").run().is_err());
    }

    #[test]
    fn test_accepted_exit_code() {
        let output = Cmd::new("sh").args(["-c", "exit 8"]).accept_codes(&[8]).run();
        assert!(output.is_ok());
    }
}
