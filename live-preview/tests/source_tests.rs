//! Frame source behavior against stub producers.
//!
//! The ffmpeg binary path is injectable, so these tests drive the source
//! with tiny shell scripts instead of a real camera.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use live_preview::{multipart_stream, FrameSource, FrameSourceOptions, PreviewError};

fn write_stub(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-ffmpeg");
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn opts_for(stub: &Path) -> FrameSourceOptions {
    FrameSourceOptions {
        ffmpeg_path: stub.to_string_lossy().into_owned(),
        connect_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

// Emits two JPEG frames (8 and 10 bytes) and exits.
const TWO_FRAMES: &str =
    "#!/bin/sh\nprintf '\\377\\330AAAA\\377\\331\\377\\330BBBBBB\\377\\331'\n";

#[tokio::test]
async fn source_yields_frames_in_order_then_ends() {
    let tmp = tempfile::tempdir().unwrap();
    let stub = write_stub(tmp.path(), TWO_FRAMES);

    let mut source = FrameSource::open("rtsp://stub/live", &opts_for(&stub))
        .await
        .unwrap();

    let first = source.next_frame().await.expect("first frame");
    assert_eq!(first.len(), 8);
    assert_eq!(&first[..2], &[0xFF, 0xD8]);

    let second = source.next_frame().await.expect("second frame");
    assert_eq!(second.len(), 10);

    assert!(source.next_frame().await.is_none());
    source.close().await;
}

#[tokio::test]
async fn open_reports_source_unavailable_with_cause() {
    let tmp = tempfile::tempdir().unwrap();
    let stub = write_stub(
        tmp.path(),
        "#!/bin/sh\necho 'Connection refused' >&2\nexit 1\n",
    );

    match FrameSource::open("rtsp://stub/dead", &opts_for(&stub)).await {
        Err(PreviewError::SourceUnavailable(msg)) => {
            assert!(msg.contains("Connection refused"), "got: {msg}");
        }
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("expected open to fail"),
    }
}

#[tokio::test]
async fn open_times_out_on_silent_source() {
    let tmp = tempfile::tempdir().unwrap();
    let stub = write_stub(tmp.path(), "#!/bin/sh\nsleep 60\n");

    let opts = FrameSourceOptions {
        connect_timeout: Duration::from_millis(200),
        ..opts_for(&stub)
    };

    match FrameSource::open("rtsp://stub/silent", &opts).await {
        Err(PreviewError::SourceUnavailable(msg)) => {
            assert!(msg.contains("no frame"), "got: {msg}");
        }
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("expected open to time out"),
    }
}

#[tokio::test]
async fn open_reports_missing_binary() {
    let opts = FrameSourceOptions {
        ffmpeg_path: "/nonexistent/fake-ffmpeg".to_string(),
        ..FrameSourceOptions::default()
    };
    assert!(matches!(
        FrameSource::open("rtsp://stub/live", &opts).await,
        Err(PreviewError::FfmpegNotFound)
    ));
}

#[tokio::test]
async fn multipart_stream_frames_each_part() {
    let tmp = tempfile::tempdir().unwrap();
    let stub = write_stub(tmp.path(), TWO_FRAMES);

    let source = FrameSource::open("rtsp://stub/live", &opts_for(&stub))
        .await
        .unwrap();

    let parts: Vec<_> = multipart_stream(source)
        .map(|r| r.unwrap())
        .collect()
        .await;

    assert_eq!(parts.len(), 2);
    for part in &parts {
        assert!(part.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
        assert!(part.ends_with(b"\r\n"));
    }
}
