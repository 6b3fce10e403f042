//! Child-process execution for [`TextCommand`]s.

pub mod reducer;

use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::command::{Charset, TextCommand};
use crate::error::ExecError;

pub use reducer::{all, discard, first, last, LineReducer};

/// Bytes of stderr kept for error messages.
const STDERR_TAIL: usize = 4096;

/// Runs commands as child processes and folds their stdout through a reducer.
///
/// Stdin is closed and stderr is captured; only its tail is kept, for
/// [`ExecError::AbnormalExit`].
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run `command` to completion, feeding each stdout line to `reducer`.
    ///
    /// Lines are decoded with the command's charset and stripped of their
    /// terminator. A non-zero exit yields [`ExecError::AbnormalExit`]; spawn,
    /// read and decode failures are transport errors.
    pub async fn run<R: LineReducer>(
        &self,
        command: &TextCommand,
        reducer: R,
    ) -> Result<R::Output, ExecError> {
        let program = command.program().to_string();
        if program.is_empty() {
            return Err(ExecError::Spawn {
                program,
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
            });
        }

        debug!(command = %command, "Spawning process");
        let start = Instant::now();

        let mut child = Command::new(&program)
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (lines, stderr) = tokio::join!(
            read_lines(stdout, command.charset(), reducer),
            read_tail(stderr)
        );

        let status = child.wait().await.map_err(|source| ExecError::Io {
            program: program.clone(),
            source,
        })?;
        let lines = lines.map_err(|source| ExecError::Io {
            program: program.clone(),
            source,
        })?;

        let exit_code = status.code().unwrap_or(-1);
        debug!(
            program = %program,
            exit_code,
            duration_ms = start.elapsed().as_millis() as u64,
            "Process finished"
        );

        if !status.success() {
            return Err(ExecError::AbnormalExit {
                program,
                code: exit_code,
                stderr,
            });
        }

        match lines {
            LinesOutcome::Complete(reducer) => Ok(reducer.finish()),
            LinesOutcome::Undecodable => Err(ExecError::Decode {
                program,
                charset: command.charset().to_string(),
            }),
        }
    }

    /// Run `command` for its exit code, treating a non-zero exit as a value.
    ///
    /// Output is discarded. Only transport failures are errors.
    pub async fn status(&self, command: &TextCommand) -> Result<i32, ExecError> {
        match self.run(command, discard()).await {
            Ok(()) => Ok(0),
            Err(ExecError::AbnormalExit { code, .. }) => Ok(code),
            Err(e) => Err(e),
        }
    }

    /// Whether `command` can be spawned and exits successfully.
    pub async fn probe(&self, command: &TextCommand) -> bool {
        self.run(command, discard()).await.is_ok()
    }
}

enum LinesOutcome<R> {
    Complete(R),
    Undecodable,
}

/// Drain `stream` to EOF, decoding each line.
///
/// Reading continues past an undecodable line so the child never blocks on a
/// full pipe.
async fn read_lines<S, R>(
    stream: Option<S>,
    charset: Charset,
    mut reducer: R,
) -> std::io::Result<LinesOutcome<R>>
where
    S: AsyncRead + Unpin,
    R: LineReducer,
{
    let Some(stream) = stream else {
        return Ok(LinesOutcome::Complete(reducer));
    };

    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let mut decodable = true;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        if !decodable {
            continue;
        }
        match charset.decode(trim_newline(&buf)) {
            Some(line) => reducer.push(line),
            None => decodable = false,
        }
    }

    Ok(if decodable {
        LinesOutcome::Complete(reducer)
    } else {
        LinesOutcome::Undecodable
    })
}

async fn read_tail<S: AsyncRead + Unpin>(stream: Option<S>) -> String {
    let Some(mut stream) = stream else {
        return String::new();
    };
    let mut buf = Vec::new();
    if stream.read_to_end(&mut buf).await.is_err() {
        return String::new();
    }
    let start = buf.len().saturating_sub(STDERR_TAIL);
    String::from_utf8_lossy(&buf[start..]).trim().to_string()
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
