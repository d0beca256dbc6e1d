use std::ffi::OsString;
use std::process::{Output, Stdio};

use hyperdrive::ConvertError;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// An external program plus any arguments placed before the ones a
/// converter adds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    program: String,
    prefix: Vec<String>,
}

impl Tool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            prefix: Vec::new(),
        }
    }

    /// Arguments inserted ahead of the converter's own, e.g. to run the
    /// conversion through a wrapper script.
    pub fn with_prefix_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command<I>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut command = Command::new(&self.program);
        command.args(&self.prefix).args(args).kill_on_drop(true);
        command
    }

    /// Run to completion with `args`, optionally feeding `stdin`.
    pub(crate) async fn run<I>(&self, args: I, stdin: Option<Vec<u8>>) -> Result<Output, ConvertError>
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut command = self.command(args);
        command
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(program = %self.program, "running conversion tool");

        let mut child = command.spawn().map_err(|source| ConvertError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // Feed stdin from its own task so a tool that writes before it has
        // read everything cannot deadlock against us.
        let feeder = match (stdin, child.stdin.take()) {
            (Some(bytes), Some(mut pipe)) => Some(tokio::spawn(async move {
                pipe.write_all(&bytes).await?;
                pipe.shutdown().await
            })),
            _ => None,
        };

        let output = child.wait_with_output().await?;

        if let Some(feeder) = feeder {
            match feeder.await {
                Ok(Ok(())) => {}
                // A tool may exit without draining stdin; its status decides.
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) if output.status.success() => return Err(ConvertError::Io(e)),
                Ok(Err(_)) => {}
                Err(join) => return Err(ConvertError::Io(std::io::Error::other(join))),
            }
        }

        if !output.status.success() {
            return Err(ConvertError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        Ok(output)
    }
}
