use crate::error::CommandError;
use crate::verbose;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>, // None if killed by a signal
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// runs external commands on behalf of the repository view
pub trait CommandRunner {
    /// run `program` with `args` in `dir`, capturing its output
    ///
    /// a non-zero exit is not an error at this level; callers decide
    fn run(&self, dir: &Path, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError>;
}

/// shell-quoted rendering of a command line, for messages
pub fn display_command(program: &str, args: &[&str]) -> String {
    let words = std::iter::once(program).chain(args.iter().copied());
    shlex::try_join(words).unwrap_or_else(|_| {
        std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    })
}

/// runs commands as child processes, killing them after a timeout
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, dir: &Path, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        let command = display_command(program, args);
        verbose!("$ {}", command);
        let deadline = Instant::now() + self.timeout;

        let mut child = Command::new(program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => CommandError::NotFound {
                    program: program.to_string(),
                },
                _ => CommandError::Spawn {
                    command: command.clone(),
                    source: e,
                },
            })?;

        // drain pipes on their own threads so a chatty child can't block on a full pipe.
        // a process the child leaves behind can hold them open after it exits, so
        // output is only awaited until the deadline.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match child.wait_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(Some(status)) => status,
            Ok(None) => {
                // timeout occurred, kill the process
                if let Err(e) = child.kill() {
                    crate::warning!("failed to kill `{}`: {}", command, e);
                }
                let _ = child.wait();
                return Err(CommandError::Timeout {
                    command,
                    timeout: self.timeout,
                });
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CommandError::Io { command, source: e });
            }
        };

        let stdout = self.collect(stdout, deadline, &command)?;
        let stderr = self.collect(stderr, deadline, &command)?;
        verbose!("exit code: {:?}", status.code());

        Ok(CommandOutput {
            code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}

impl SystemRunner {
    /// wait for a drained pipe until `deadline`
    fn collect(
        &self,
        output: Option<Receiver<std::io::Result<Vec<u8>>>>,
        deadline: Instant,
        command: &str,
    ) -> Result<Vec<u8>, CommandError> {
        let Some(output) = output else {
            return Ok(Vec::new());
        };
        match output.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(result) => result.map_err(|e| CommandError::Io {
                command: command.to_string(),
                source: e,
            }),
            Err(RecvTimeoutError::Timeout) => Err(CommandError::Timeout {
                command: command.to_string(),
                timeout: self.timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(CommandError::Io {
                command: command.to_string(),
                source: std::io::Error::other("output reader exited without a result"),
            }),
        }
    }
}

/// read `pipe` to the end on a background thread
fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<std::io::Result<Vec<u8>>> {
    let (sender, receiver) = mpsc::channel();
    std::thread::spawn(move || {
        let mut data = Vec::new();
        let result = pipe.read_to_end(&mut data).map(|_| data);
        // the receiver is gone if the command already timed out
        let _ = sender.send(result);
    });
    receiver
}

#[cfg(test)]
mod tests;
