//! Multipart body encoding for the live preview.
//!
//! Each viewer gets one unbounded `multipart/x-mixed-replace` response;
//! every part is a complete JPEG frame. The part framing matches what
//! browsers expect for motion-JPEG `<img>` sources: boundary line, part
//! headers, frame bytes, trailing CRLF.

use bytes::{BufMut, Bytes, BytesMut};
use futures::Stream;

use crate::frame::FrameSource;

/// Boundary token used in the `multipart/x-mixed-replace` response.
pub const STREAM_BOUNDARY: &str = "frame";

/// Value for the response `Content-Type` header.
pub fn stream_content_type() -> String {
    format!("multipart/x-mixed-replace; boundary={STREAM_BOUNDARY}")
}

/// Turn a frame source into the body stream served to one viewer.
///
/// The stream ends when the source ends; dropping it mid-stream (viewer
/// disconnect) drops the source, which reaps the ffmpeg child.
pub fn multipart_stream(
    source: FrameSource,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
    futures::stream::unfold(Some(source), |state| async move {
        let mut source = state?;
        match source.next_frame().await {
            Some(frame) => Some((Ok(encode_part(&frame)), Some(source))),
            None => None,
        }
    })
}

fn encode_part(frame: &[u8]) -> Bytes {
    let mut part = BytesMut::with_capacity(frame.len() + 64);
    part.put_slice(b"--");
    part.put_slice(STREAM_BOUNDARY.as_bytes());
    part.put_slice(b"\r\nContent-Type: image/jpeg\r\n\r\n");
    part.put_slice(frame);
    part.put_slice(b"\r\n");
    part.freeze()
}
