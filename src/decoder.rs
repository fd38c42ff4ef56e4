//! External transcoding subprocess.
//!
//! One decoder process per session turns the client's container stream
//! (WebM or MP4) into raw s16le mono PCM: container bytes go down
//! stdin, PCM comes back on stdout, and stderr is drained continuously
//! so the process can never wedge on a full diagnostic pipe.
//!
//! The stdin half splits off as [`DecoderInput`] so the receive loop
//! and the decode loop can run as independent tasks.

use crate::audio::format::ContainerFormat;
use crate::config::DecoderConfig;
use crate::defaults;
use crate::error::{Result, VoxgateError};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// One chunk of decoded PCM with its duration at the session's format.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub pcm: Vec<u8>,
    pub duration_secs: f32,
}

/// Outcome of one decoder read.
#[derive(Debug, PartialEq)]
pub enum DecodeRead {
    Chunk(AudioChunk),
    EndOfStream,
}

/// Write half of the decoder pipe, owned by the receive loop.
#[derive(Debug)]
pub struct DecoderInput {
    stdin: Option<ChildStdin>,
}

impl DecoderInput {
    /// Feed container bytes to the decoder.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(VoxgateError::DecoderIo {
                message: "decoder input already closed".to_string(),
            });
        };
        stdin
            .write_all(bytes)
            .await
            .map_err(|e| VoxgateError::DecoderIo {
                message: format!("write to decoder failed: {}", e),
            })?;
        stdin.flush().await.map_err(|e| VoxgateError::DecoderIo {
            message: format!("flush to decoder failed: {}", e),
        })?;
        Ok(())
    }

    /// Signal end of input. The decoder flushes its remaining output
    /// and exits on its own.
    pub fn close(&mut self) {
        // Dropping the handle closes the pipe.
        self.stdin.take();
    }
}

/// A running decoder process plus its stdout half.
#[derive(Debug)]
pub struct SampleDecoder {
    child: Child,
    stdout: ChildStdout,
    input: Option<DecoderInput>,
    read_chunk_bytes: usize,
    sample_rate: u32,
}

impl SampleDecoder {
    /// Spawn the decoder for one session.
    ///
    /// `{format}` and `{rate}` in the configured argument template are
    /// substituted with the sniffed container and the session sample
    /// rate before spawning.
    pub fn start(
        config: &DecoderConfig,
        format: ContainerFormat,
        sample_rate: u32,
        verbosity: u8,
    ) -> Result<Self> {
        let args = render_args(&config.args, format, sample_rate);
        let mut child = Command::new(&config.command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VoxgateError::DecoderSpawn {
                command: config.command.clone(),
                message: e.to_string(),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| VoxgateError::DecoderIo {
            message: "decoder stdin unavailable".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| VoxgateError::DecoderIo {
            message: "decoder stdout unavailable".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| VoxgateError::DecoderIo {
            message: "decoder stderr unavailable".to_string(),
        })?;

        // Keep stderr flowing for the life of the process; the task ends
        // when the pipe closes.
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if verbosity >= 2 {
                    eprintln!("decoder: {}", line);
                }
            }
        });

        Ok(Self {
            child,
            stdout,
            input: Some(DecoderInput { stdin: Some(stdin) }),
            read_chunk_bytes: config.read_chunk_bytes,
            sample_rate,
        })
    }

    /// Detach the stdin half for the receive loop. Valid exactly once.
    pub fn take_input(&mut self) -> Result<DecoderInput> {
        self.input.take().ok_or_else(|| VoxgateError::DecoderIo {
            message: "decoder input already taken".to_string(),
        })
    }

    /// Read the next PCM chunk.
    ///
    /// Returns [`DecodeRead::EndOfStream`] when the decoder closes its
    /// stdout, including when the process exits early; an early exit is
    /// not an error here.
    pub async fn read_chunk(&mut self) -> Result<DecodeRead> {
        let mut buf = vec![0u8; self.read_chunk_bytes];
        let n = self
            .stdout
            .read(&mut buf)
            .await
            .map_err(|e| VoxgateError::DecoderIo {
                message: format!("read from decoder failed: {}", e),
            })?;
        if n == 0 {
            return Ok(DecodeRead::EndOfStream);
        }
        buf.truncate(n);
        let duration_secs = n as f32 / defaults::bytes_per_second(self.sample_rate) as f32;
        Ok(DecodeRead::Chunk(AudioChunk {
            pcm: buf,
            duration_secs,
        }))
    }

    /// Close remaining pipes, drain stdout, and reap the process.
    ///
    /// Undelivered PCM is discarded; draining it keeps the process from
    /// blocking on a full pipe before it can exit.
    pub async fn finish(mut self) -> Result<std::process::ExitStatus> {
        if let Some(mut input) = self.input.take() {
            input.close();
        }
        let mut sink = Vec::new();
        self.stdout.read_to_end(&mut sink).await.unwrap_or(0);
        self.child.wait().await.map_err(|e| VoxgateError::DecoderIo {
            message: format!("wait for decoder failed: {}", e),
        })
    }
}

/// Expand the argument template for one session.
fn render_args(template: &[String], format: ContainerFormat, sample_rate: u32) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            arg.replace("{format}", format.demuxer())
                .replace("{rate}", &sample_rate.to_string())
        })
        .collect()
}
