//! External conversion engine.
//!
//! The pipeline only needs "run this recipe from that input to that output",
//! so the engine is a capability trait. Production uses ffmpeg; tests plug in
//! a fake that records the invocation.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};

use {async_trait::async_trait, tokio::process::Command, tracing::debug};

use crate::{
    error::{Error, Result},
    recipe::Recipe,
};

/// Maximum number of trailing stderr lines kept as the failure diagnostic.
const DIAGNOSTIC_LINES: usize = 20;

/// One engine run: an input file, an output file, and the recipe's flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    pub recipe: Recipe,
    pub input: PathBuf,
    pub output: PathBuf,
    pub input_args: Vec<String>,
    pub output_args: Vec<String>,
}

impl EngineInvocation {
    pub fn new(recipe: Recipe, input: &Path, output: &Path) -> Self {
        Self {
            recipe,
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            input_args: recipe.input_args(),
            output_args: recipe.output_args(),
        }
    }

    /// Full ffmpeg argument list, without the program name.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-nostdin", "-y"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.extend(self.input_args.iter().map(OsString::from));
        args.push("-i".into());
        args.push(self.input.clone().into_os_string());
        args.extend(self.output_args.iter().map(OsString::from));
        args.push(self.output.clone().into_os_string());
        args
    }

    /// Space-joined argument list for logs.
    pub fn command_line(&self) -> String {
        self.args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
pub trait ConversionEngine: Send + Sync {
    /// Engine identifier for logs.
    fn name(&self) -> &str;

    /// Run the conversion to completion. On success the output file exists.
    async fn run(&self, invocation: &EngineInvocation) -> Result<()>;
}

/// Runs the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    binary: PathBuf,
}

impl FfmpegEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// First line of `ffmpeg -version`, to check the binary at startup.
    pub async fn version(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::io(format!("failed to run {}", self.binary.display()), e))?;

        if !output.status.success() {
            return Err(Error::engine(diagnostic(&output.stderr, output.status)));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl ConversionEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn run(&self, invocation: &EngineInvocation) -> Result<()> {
        debug!(command = %invocation.command_line(), "starting ffmpeg");

        // kill_on_drop: a timed-out run drops this future and must not leave
        // the child process writing into the workspace.
        let output = Command::new(&self.binary)
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::io(format!("failed to spawn {}", self.binary.display()), e))?;

        if !output.status.success() {
            return Err(Error::engine(diagnostic(&output.stderr, output.status)));
        }
        Ok(())
    }
}

/// Trailing stderr lines, or the exit status when stderr is empty.
fn diagnostic(stderr: &[u8], status: std::process::ExitStatus) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return format!("exited with {status}");
    }
    let start = lines.len().saturating_sub(DIAGNOSTIC_LINES);
    lines[start..].join("\n")
}
