use anyhow::Context;
use async_trait::async_trait;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::time::{timeout, Duration};

/// Where a child's output stream goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stdio {
    Null,
    Inherit,
    /// Truncate (or create) the file.
    Create(PathBuf),
    /// Append to the file, creating it if needed.
    Append(PathBuf),
}

impl Stdio {
    fn open(&self) -> anyhow::Result<std::process::Stdio> {
        Ok(match self {
            Stdio::Null => std::process::Stdio::null(),
            Stdio::Inherit => std::process::Stdio::inherit(),
            Stdio::Create(path) => File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?
                .into(),
            Stdio::Append(path) => OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open {} for append", path.display()))?
                .into(),
        })
    }
}

/// A single external command, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub stdout: Stdio,
    pub stderr: Stdio,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdout: Stdio::Null,
            stderr: Stdio::Inherit,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn path_arg(self, path: impl AsRef<Path>) -> Self {
        let s = path.as_ref().display().to_string();
        self.arg(s)
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    pub fn stdout(mut self, s: Stdio) -> Self {
        self.stdout = s;
        self
    }

    pub fn stderr(mut self, s: Stdio) -> Self {
        self.stderr = s;
        self
    }

    /// The command as a single line, as written to `CMD:` log headers.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for a in &self.args {
            line.push(' ');
            line.push_str(a);
        }
        line
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())?;
        match &self.stdout {
            Stdio::Create(p) => write!(f, " > {}", p.display())?,
            Stdio::Append(p) => write!(f, " >> {}", p.display())?,
            _ => {}
        }
        match &self.stderr {
            Stdio::Create(p) => write!(f, " 2> {}", p.display())?,
            Stdio::Append(p) => write!(f, " 2>> {}", p.display())?,
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReport {
    Code(i32),
    /// Terminated by a signal, no exit code.
    Signal,
    TimedOut,
    DryRun,
}

impl ExitReport {
    pub fn success(&self) -> bool {
        matches!(self, ExitReport::Code(0))
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitReport::Code(c) => Some(*c),
            _ => None,
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, inv: &Invocation) -> anyhow::Result<ExitReport>;
}

/// Spawns real processes, one at a time.
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner {
    pub timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(timeout_secs: Option<u64>) -> Self {
        Self {
            timeout: timeout_secs.map(Duration::from_secs),
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, inv: &Invocation) -> anyhow::Result<ExitReport> {
        tracing::debug!(command = %inv, "spawning");
        let mut child = tokio::process::Command::new(&inv.program)
            .args(&inv.args)
            .stdin(std::process::Stdio::null())
            .stdout(inv.stdout.open()?)
            .stderr(inv.stderr.open()?)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", inv.program.display()))?;

        let status = match self.timeout {
            None => child.wait().await?,
            Some(limit) => match timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    tracing::warn!(
                        command = %inv.command_line(),
                        "no exit after {}s, killing",
                        limit.as_secs()
                    );
                    child.kill().await?;
                    return Ok(ExitReport::TimedOut);
                }
            },
        };

        Ok(match status.code() {
            Some(c) => ExitReport::Code(c),
            None => ExitReport::Signal,
        })
    }
}

/// Prints and records commands instead of running them.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    recorded: Mutex<Vec<Invocation>>,
}

impl DryRunRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<Invocation> {
        self.recorded
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CommandRunner for DryRunRunner {
    async fn run(&self, inv: &Invocation) -> anyhow::Result<ExitReport> {
        tracing::info!("[dry-run] {}", inv);
        if let Ok(mut v) = self.recorded.lock() {
            v.push(inv.clone());
        }
        Ok(ExitReport::DryRun)
    }
}
