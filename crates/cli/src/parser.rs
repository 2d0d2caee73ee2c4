// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-process TypeScript parser adapter.
//!
//! Spawns the configured parser executable per request, writes one JSON
//! document to its stdin, and reads one JSON document back from stdout.
//! Batch mode sends many files in a single request (`--batch` appended),
//! amortizing subprocess startup. The subprocess is killed when it
//! exceeds its deadline.
//!
//! stdin is fed and stdout/stderr are drained on their own threads so a
//! reply larger than the pipe buffer can never wedge the child while the
//! deadline clock runs.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::ast::Ast;
use crate::config::ParserConfig;
use crate::error::{Error, Result};

/// How often the deadline loop polls the child.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How much captured stderr to keep in error messages.
const STDERR_SNIPPET: usize = 512;

/// Error type for parser requests.
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    /// The subprocess exceeded its deadline and was killed.
    #[error("parser timed out after {0:?}")]
    Timeout(Duration),

    /// The parser executable could not be started.
    #[error("failed to spawn parser: {0}")]
    Spawn(String),

    /// The subprocess exited nonzero.
    #[error("parser exited with status {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    /// The subprocess produced no output.
    #[error("parser produced no output")]
    EmptyReply,

    /// The reply was not a single well-formed JSON document.
    #[error("malformed parser reply: {0}")]
    Protocol(String),

    /// The parser reported a parse failure for this input.
    #[error("parse failed: {0}")]
    ParseFailed(String),

    /// I/O failure talking to the subprocess.
    #[error("parser io error: {0}")]
    Io(String),
}

#[derive(Serialize)]
struct SingleRequest<'a> {
    filename: &'a str,
    code: &'a str,
}

#[derive(Serialize)]
struct BatchFile<'a> {
    filename: String,
    code: &'a str,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    files: Vec<BatchFile<'a>>,
}

#[derive(Deserialize)]
struct FileReply {
    success: bool,
    #[serde(default)]
    ast: Option<Ast>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct BatchReply {
    success: bool,
    #[serde(default)]
    results: HashMap<String, FileReply>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    stats: Option<serde_json::Value>,
}

impl FileReply {
    /// Extract the AST or the best failure description the reply offers.
    fn into_ast(self) -> std::result::Result<Ast, ParserError> {
        if !self.success {
            let detail = self.error.unwrap_or_else(|| {
                if self.errors.is_empty() {
                    "parser reported failure".to_string()
                } else {
                    self.errors
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ")
                }
            });
            return Err(ParserError::ParseFailed(detail));
        }
        self.ast
            .ok_or_else(|| ParserError::Protocol("reply missing ast".to_string()))
    }
}

/// Adapter around the external TypeScript parser executable.
pub struct TsParser {
    command: PathBuf,
    args: Vec<String>,
    batch: bool,
    timeout: Duration,
    batch_timeout: Duration,
    /// One request in flight at a time.
    lock: Mutex<()>,
}

impl TsParser {
    /// Create an adapter with explicit settings.
    pub fn new(
        command: PathBuf,
        args: Vec<String>,
        batch: bool,
        timeout: Duration,
        batch_timeout: Duration,
    ) -> Self {
        Self {
            command,
            args,
            batch,
            timeout,
            batch_timeout,
            lock: Mutex::new(()),
        }
    }

    /// Create an adapter from the `[parser]` config table.
    pub fn from_config(config: &ParserConfig) -> Result<Self> {
        let command = config.command.clone().ok_or_else(|| Error::Config {
            message: "no parser command configured ([parser] command or --parser-cmd)".to_string(),
            path: None,
        })?;
        Ok(Self::new(
            command,
            config.args.clone(),
            config.batch,
            Duration::from_secs(config.timeout_secs),
            Duration::from_secs(config.batch_timeout_secs),
        ))
    }

    /// Whether the parser understands batch requests.
    pub fn supports_batch(&self) -> bool {
        self.batch
    }

    /// Parse one file.
    pub fn parse(&self, path: &Path, source: &str) -> std::result::Result<Ast, ParserError> {
        let filename = path.display().to_string();
        let request = SingleRequest {
            filename: &filename,
            code: source,
        };
        let payload =
            serde_json::to_vec(&request).map_err(|e| ParserError::Protocol(e.to_string()))?;

        let guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let reply_bytes = self.invoke(false, payload, self.timeout)?;
        drop(guard);

        let reply: FileReply = serde_json::from_slice(&reply_bytes)
            .map_err(|e| ParserError::Protocol(e.to_string()))?;
        reply.into_ast()
    }

    /// Parse many files in one subprocess invocation.
    ///
    /// Request-level failures (spawn, timeout, malformed reply) surface as
    /// the outer error; per-file failures land in the returned map.
    pub fn parse_batch(
        &self,
        files: &[(PathBuf, String)],
    ) -> std::result::Result<HashMap<PathBuf, std::result::Result<Ast, ParserError>>, ParserError>
    {
        let request = BatchRequest {
            files: files
                .iter()
                .map(|(path, code)| BatchFile {
                    filename: path.display().to_string(),
                    code,
                })
                .collect(),
        };
        let payload =
            serde_json::to_vec(&request).map_err(|e| ParserError::Protocol(e.to_string()))?;

        let guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let reply_bytes = self.invoke(true, payload, self.batch_timeout)?;
        drop(guard);

        let mut reply: BatchReply = serde_json::from_slice(&reply_bytes)
            .map_err(|e| ParserError::Protocol(e.to_string()))?;
        if !reply.success {
            return Err(ParserError::ParseFailed(
                reply
                    .error
                    .unwrap_or_else(|| "parser reported batch failure".to_string()),
            ));
        }
        if let Some(stats) = &reply.stats {
            tracing::debug!("parser batch stats: {stats}");
        }

        let mut out = HashMap::with_capacity(files.len());
        for (path, _) in files {
            let key = path.display().to_string();
            let result = match reply.results.remove(&key) {
                Some(file_reply) => file_reply.into_ast(),
                None => Err(ParserError::Protocol(format!(
                    "reply missing result for {key}"
                ))),
            };
            out.insert(path.clone(), result);
        }
        Ok(out)
    }

    /// Run one request/reply exchange with the subprocess.
    fn invoke(
        &self,
        batch: bool,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> std::result::Result<Vec<u8>, ParserError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args);
        if batch {
            cmd.arg("--batch");
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| ParserError::Spawn(e.to_string()))?;

        let Some(mut stdin) = child.stdin.take() else {
            return Err(ParserError::Io("no stdin handle".to_string()));
        };
        let writer = std::thread::spawn(move || {
            // Dropping stdin after the write signals EOF to the child.
            let _ = stdin.write_all(&payload);
        });

        let stdout = child.stdout.take();
        let stdout_reader = std::thread::spawn(move || drain(stdout));
        let stderr = child.stderr.take();
        let stderr_reader = std::thread::spawn(move || drain(stderr));

        let status = wait_with_deadline(&mut child, timeout);
        let _ = writer.join();
        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();
        let status = status?;

        if !status.success() {
            let snippet: String = String::from_utf8_lossy(&stderr)
                .trim()
                .chars()
                .take(STDERR_SNIPPET)
                .collect();
            return Err(ParserError::NonZeroExit {
                code: status.code().unwrap_or(-1),
                stderr: snippet,
            });
        }
        if stdout.iter().all(u8::is_ascii_whitespace) {
            return Err(ParserError::EmptyReply);
        }
        Ok(stdout)
    }
}

fn drain(pipe: Option<impl Read>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    buf
}

/// Poll the child until it exits or the deadline passes; kill on timeout.
fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
) -> std::result::Result<ExitStatus, ParserError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ParserError::Timeout(timeout));
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => return Err(ParserError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
