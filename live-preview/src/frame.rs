//! Frame acquisition from an RTSP source.
//!
//! A [`FrameSource`] owns one ffmpeg child emitting an MJPEG elementary
//! stream on stdout; frames are split out of the byte stream at the JPEG
//! SOI/EOI markers. The child is spawned with `kill_on_drop`, so dropping
//! the source on any exit path reaps the upstream connection.

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};

use crate::error::PreviewError;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Upper bound on buffered bytes while hunting for a frame end; a stream
/// that never yields an EOI marker is treated as ended rather than
/// buffered without limit.
const MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// Number of trailing stderr lines kept for error reporting.
const STDERR_TAIL_LINES: usize = 8;

/// Tuning for the ffmpeg preview child.
#[derive(Debug, Clone)]
pub struct FrameSourceOptions {
    /// Binary to invoke; tests substitute a stub script here.
    pub ffmpeg_path: String,
    /// RTSP transport passed to `-rtsp_transport`.
    pub transport: String,
    /// JPEG quality for `-q:v` (2 best .. 31 worst).
    pub quality: u8,
    /// How long `open` waits for the first frame before giving up.
    pub connect_timeout: Duration,
}

impl Default for FrameSourceOptions {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            transport: "tcp".to_string(),
            quality: 5,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// One live connection to an RTSP source, yielding JPEG frames in order.
pub struct FrameSource {
    child: Child,
    stdout: BufReader<ChildStdout>,
    buffer: Vec<u8>,
    pending: Option<Bytes>,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
    stderr_task: Option<tokio::task::JoinHandle<()>>,
    url: String,
}

impl FrameSource {
    /// Connect to `url` and wait for the first decoded frame.
    ///
    /// Fails with [`PreviewError::SourceUnavailable`] when the child exits
    /// or stays silent past the connect timeout, so callers can reject the
    /// viewer before committing to a streaming response.
    pub async fn open(url: &str, opts: &FrameSourceOptions) -> Result<Self, PreviewError> {
        let mut child = Command::new(&opts.ffmpeg_path)
            .arg("-loglevel")
            .arg("error")
            .arg("-fflags")
            .arg("+nobuffer+discardcorrupt")
            .arg("-flags")
            .arg("low_delay")
            .arg("-rtsp_transport")
            .arg(&opts.transport)
            .arg("-i")
            .arg(url)
            .arg("-an")
            .arg("-f")
            .arg("mjpeg")
            .arg("-q:v")
            .arg(opts.quality.to_string())
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PreviewError::FfmpegNotFound
                } else {
                    PreviewError::Io(e)
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PreviewError::SourceUnavailable("no stdout pipe".to_string()))?;

        // Drain stderr in the background, keeping a short tail for error
        // messages. ffmpeg runs at -loglevel error so the volume is tiny.
        let stderr_tail = Arc::new(Mutex::new(VecDeque::new()));
        let stderr_task = child.stderr.take().map(|stderr| {
            let tail = Arc::clone(&stderr_tail);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let mut tail = tail.lock().unwrap_or_else(|p| p.into_inner());
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            })
        });

        let mut source = Self {
            child,
            stdout: BufReader::new(stdout),
            buffer: Vec::new(),
            pending: None,
            stderr_tail,
            stderr_task,
            url: url.to_string(),
        };

        match tokio::time::timeout(opts.connect_timeout, source.read_frame()).await {
            Ok(Some(frame)) => {
                source.pending = Some(frame);
                Ok(source)
            }
            Ok(None) => {
                // Stdout closed; kill the child and let the stderr drain
                // reach EOF so the failure reason is complete.
                let _ = source.child.kill().await;
                if let Some(task) = source.stderr_task.take() {
                    let _ = tokio::time::timeout(Duration::from_secs(1), task).await;
                }
                Err(PreviewError::SourceUnavailable(source.stderr_summary()))
            }
            Err(_) => {
                source.close().await;
                Err(PreviewError::SourceUnavailable(format!(
                    "no frame within {:?}",
                    opts.connect_timeout
                )))
            }
        }
    }

    /// Next frame in sequence, or `None` once the source has ended.
    ///
    /// The sequence is not restartable; any read failure ends it.
    pub async fn next_frame(&mut self) -> Option<Bytes> {
        if let Some(frame) = self.pending.take() {
            return Some(frame);
        }
        self.read_frame().await
    }

    /// Release the upstream connection. Also happens implicitly on drop.
    pub async fn close(mut self) {
        let _ = self.child.kill().await;
    }

    async fn read_frame(&mut self) -> Option<Bytes> {
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(frame) = extract_jpeg(&mut self.buffer) {
                return Some(frame);
            }
            if self.buffer.len() > MAX_FRAME_BYTES {
                tracing::warn!(
                    "preview stream for {} exceeded {} buffered bytes without a frame end",
                    self.url,
                    MAX_FRAME_BYTES
                );
                return None;
            }
            match self.stdout.read(&mut chunk).await {
                Ok(0) => {
                    tracing::debug!("preview stream for {} ended: {}", self.url, self.stderr_summary());
                    return None;
                }
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    tracing::warn!("preview stream read failed for {}: {}", self.url, e);
                    return None;
                }
            }
        }
    }

    fn stderr_summary(&self) -> String {
        let tail = self
            .stderr_tail
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        if tail.is_empty() {
            "source closed the stream".to_string()
        } else {
            tail.iter().cloned().collect::<Vec<_>>().join("; ")
        }
    }
}

/// Pull one complete JPEG out of the front of `buffer`.
///
/// Bytes preceding the SOI marker are discarded; the buffer retains
/// everything after the consumed frame, so a frame split across reads is
/// recovered on a later call.
fn extract_jpeg(buffer: &mut Vec<u8>) -> Option<Bytes> {
    let soi = find_marker(buffer, 0, JPEG_SOI)?;
    if soi > 0 {
        buffer.drain(..soi);
    }
    let eoi = find_marker(buffer, 2, JPEG_EOI)?;
    let frame: Vec<u8> = buffer.drain(..eoi + 2).collect();
    Some(Bytes::from(frame))
}

fn find_marker(buf: &[u8], from: usize, marker: [u8; 2]) -> Option<usize> {
    if buf.len() < from + 2 {
        return None;
    }
    buf[from..]
        .windows(2)
        .position(|w| w == marker)
        .map(|p| p + from)
}
