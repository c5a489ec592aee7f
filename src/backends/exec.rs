//! Process execution
//!
//! Hands control to the cached binary. On unix the launcher process is
//! replaced, so stdio, signals and the exit status belong to the tool.
//! Elsewhere the tool runs as a child with inherited stdio and its exit
//! status is propagated.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tracing::debug;

use crate::core::error::ExecError;

/// Environment variable pointing the tool at its extracted archive
pub const TOOL_DIR_ENV: &str = "PINRUN_TOOL_DIR";

/// Everything needed to start the tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub binary: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// Build the invocation for `executable` inside the slot at `slot`
    pub fn new(
        slot: &Path,
        executable: &str,
        args: Vec<OsString>,
        extra_env: &[(String, String)],
    ) -> Self {
        let mut env = extra_env.to_vec();
        env.push((TOOL_DIR_ENV.to_string(), slot.display().to_string()));
        Self {
            binary: slot.join(executable),
            args,
            env,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.args);
        cmd.envs(self.env.iter().map(|(k, v)| (k, v)));
        cmd
    }
}

/// Runs an invocation; returns the tool's exit code when control comes back
pub trait Executor {
    fn exec(&self, invocation: &Invocation) -> Result<i32, ExecError>;
}

/// Executes the real binary
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn exec(&self, invocation: &Invocation) -> Result<i32, ExecError> {
        if !invocation.binary.is_file() {
            return Err(ExecError::BinaryMissing {
                path: invocation.binary.clone(),
            });
        }
        debug!(binary = %invocation.binary.display(), args = invocation.args.len(), "Executing tool");

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            let source = invocation.command().exec();
            return Err(ExecError::Spawn {
                path: invocation.binary.clone(),
                source,
            });
        }

        #[cfg(not(unix))]
        {
            let status = invocation
                .command()
                .status()
                .map_err(|source| ExecError::Spawn {
                    path: invocation.binary.clone(),
                    source,
                })?;
            return Ok(exit_code(status));
        }
    }
}

/// Exit code to propagate for a finished child
#[cfg_attr(unix, allow(dead_code))]
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
