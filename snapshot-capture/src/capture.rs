//! Single-frame extraction from an RTSP source.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::CaptureError;

/// Tuning for a one-shot ffmpeg capture.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Executable to launch. Overridable so tests can inject a stub.
    pub ffmpeg_path: String,
    /// RTSP transport, normally `tcp`.
    pub transport: String,
    /// JPEG quality for `-q:v`, 2 (best) through 31.
    pub quality: u8,
    /// Hard cap on one extraction; a source that never delivers a frame
    /// must not hold the caller forever.
    pub timeout: Duration,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            transport: "tcp".to_string(),
            quality: 2,
            timeout: Duration::from_secs(20),
        }
    }
}

/// Grab one frame from `url` and write it to `output_path`.
///
/// A failed capture leaves no file behind: partial output is removed
/// before the error is returned.
pub async fn capture(
    url: &str,
    output_path: &Path,
    opts: &CaptureOptions,
) -> Result<(), CaptureError> {
    let child = Command::new(&opts.ffmpeg_path)
        .arg("-y")
        .arg("-loglevel")
        .arg("error")
        .arg("-rtsp_transport")
        .arg(&opts.transport)
        .arg("-i")
        .arg(url)
        .arg("-vframes")
        .arg("1")
        .arg("-q:v")
        .arg(opts.quality.to_string())
        .arg(output_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CaptureError::FfmpegNotFound
            } else {
                CaptureError::Io(e)
            }
        })?;

    let output = match tokio::time::timeout(opts.timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            discard_partial(output_path).await;
            return Err(CaptureError::Io(e));
        }
        Err(_) => {
            // The timed-out wait drops the child, which kills it.
            discard_partial(output_path).await;
            return Err(CaptureError::CaptureFailed(format!(
                "no frame from {} within {:?}",
                url, opts.timeout
            )));
        }
    };

    if !output.status.success() {
        discard_partial(output_path).await;
        let cause = stderr_summary(&String::from_utf8_lossy(&output.stderr));
        tracing::warn!("snapshot of {} failed ({}): {}", url, output.status, cause);
        return Err(CaptureError::CaptureFailed(cause));
    }

    // ffmpeg can exit cleanly without producing a frame; an empty or
    // missing file still counts as a failure.
    match tokio::fs::metadata(output_path).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => {
            discard_partial(output_path).await;
            Err(CaptureError::CaptureFailed(format!(
                "no frame produced for {}",
                url
            )))
        }
    }
}

async fn discard_partial(path: &Path) {
    let _ = tokio::fs::remove_file(path).await;
}

fn stderr_summary(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return "ffmpeg exited without diagnostics".to_string();
    }
    let start = lines.len().saturating_sub(4);
    lines[start..].join("; ")
}
