//! Generator child process

use crate::config::GeneratorConfig;
use crate::domain::{Result, SyncError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::Span;

/// Fully resolved generator invocation
#[derive(Debug, Clone)]
pub struct GeneratorCommand {
    program: String,
    args: Vec<OsString>,
    working_dir: PathBuf,
}

impl GeneratorCommand {
    /// `<launcher> <launcher_args..> <artifact> -p <count> --exporter.fhir.export=true
    /// --exporter.baseDirectory=<output_dir> <extra_args..> <region>`, run in `output_dir`
    pub fn synthea(
        config: &GeneratorConfig,
        artifact: &Path,
        count: u32,
        output_dir: &Path,
    ) -> Self {
        let mut args: Vec<OsString> = config.launcher_args.iter().map(OsString::from).collect();
        args.push(artifact.as_os_str().to_owned());
        args.push("-p".into());
        args.push(count.to_string().into());
        args.push("--exporter.fhir.export=true".into());

        let mut base_dir = OsString::from("--exporter.baseDirectory=");
        base_dir.push(output_dir.as_os_str());
        args.push(base_dir);

        args.extend(config.extra_args.iter().map(OsString::from));
        args.push(config.region.clone().into());

        Self {
            program: config.launcher.clone(),
            args,
            working_dir: output_dir.to_path_buf(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Run to completion, logging every output line at debug level
    ///
    /// Both output streams are drained concurrently so the child never stalls
    /// on a full pipe. The child is killed if the returned future is dropped.
    ///
    /// # Errors
    ///
    /// `SyncError::GeneratorProcess` when the process cannot be started
    /// (no exit code) or exits unsuccessfully.
    pub async fn run(&self, span: &Span) -> Result<()> {
        tracing::info!(
            parent: span,
            program = %self.program,
            args = ?self.args,
            "Starting generator"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SyncError::GeneratorProcess {
                exit_code: None,
                message: format!("cannot start '{}': {e}", self.program),
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (_, _, status) = tokio::join!(
            drain_lines(stdout, "stdout", span),
            drain_lines(stderr, "stderr", span),
            child.wait()
        );

        let status = status.map_err(|e| SyncError::GeneratorProcess {
            exit_code: None,
            message: format!("cannot wait for '{}': {e}", self.program),
        })?;

        if !status.success() {
            return Err(SyncError::GeneratorProcess {
                exit_code: status.code(),
                message: format!("'{}' exited with {status}", self.program),
            });
        }

        tracing::info!(parent: span, "Generator finished");
        Ok(())
    }
}

async fn drain_lines<R>(stream: Option<R>, name: &'static str, span: &Span)
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return;
    };

    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                tracing::debug!(parent: span, stream = name, "{}", text.trim_end());
            }
            Err(e) => {
                tracing::warn!(parent: span, stream = name, error = %e, "Failed to read generator output");
                break;
            }
        }
    }
}
