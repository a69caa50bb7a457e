use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(5);
const READ_CHUNK: usize = 16 * 1024;
const MAX_HEADER_BYTES: usize = 16 * 1024;
const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("invalid stream url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to connect to stream: {0}")]
    Connect(#[source] std::io::Error),
    #[error("stream protocol error: {0}")]
    Protocol(String),
    #[error("stream read timed out")]
    Timeout,
    #[error("stream closed by remote")]
    Closed,
    #[error("stream i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Blocking MJPEG-over-HTTP frame source (ESP32-CAM style stream).
///
/// Speaks a minimal HTTP/1.1 GET and then scans the multipart body for
/// complete JPEGs by SOI/EOI markers, which tolerates the boundary
/// quirks of embedded camera firmwares. Per-read OS timeouts are the
/// sole cancellation mechanism; silence longer than the caller's stall
/// window is handled by tearing the source down and reconnecting.
#[derive(Debug)]
pub struct MjpegSource {
    stream: TcpStream,
    buffer: Vec<u8>,
    open: bool,
}

impl MjpegSource {
    pub fn connect(raw_url: &str) -> Result<Self, StreamError> {
        let url = Url::parse(raw_url).map_err(|e| StreamError::InvalidUrl {
            url: raw_url.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" {
            return Err(StreamError::InvalidUrl {
                url: raw_url.to_string(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }

        let host = url
            .host_str()
            .ok_or_else(|| StreamError::InvalidUrl {
                url: raw_url.to_string(),
                reason: "missing host".to_string(),
            })?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(80);

        let addr = (host.as_str(), port)
            .to_socket_addrs()
            .map_err(StreamError::Connect)?
            .next()
            .ok_or_else(|| StreamError::InvalidUrl {
                url: raw_url.to_string(),
                reason: "host did not resolve".to_string(),
            })?;

        let mut stream =
            TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).map_err(StreamError::Connect)?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;

        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        let request =
            format!("GET {path} HTTP/1.1\r\nHost: {host}\r\nConnection: keep-alive\r\n\r\n");
        stream.write_all(request.as_bytes())?;

        let mut source = Self {
            stream,
            buffer: Vec::new(),
            open: true,
        };
        source.read_response_head()?;

        Ok(source)
    }

    /// Pull the next complete JPEG frame out of the stream, blocking up
    /// to the read timeout.
    pub fn next_frame(&mut self) -> Result<Vec<u8>, StreamError> {
        loop {
            if let Some(frame) = extract_jpeg(&mut self.buffer) {
                return Ok(frame);
            }

            if self.buffer.len() > MAX_FRAME_BYTES {
                // lost sync somewhere; drop the garbage and rescan
                self.buffer.clear();
                return Err(StreamError::Protocol(
                    "no frame boundary within size limit".to_string(),
                ));
            }

            self.fill()?;
        }
    }

    /// Whether the underlying connection still looks usable. A timed-out
    /// read leaves the source open; EOF and hard i/o errors do not.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Consume the HTTP status line and response headers, keeping any
    /// body bytes that arrived in the same reads.
    fn read_response_head(&mut self) -> Result<(), StreamError> {
        loop {
            if let Some(end) = find_subslice(&self.buffer, b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&self.buffer[..end]).into_owned();
                let status_line = head.lines().next().unwrap_or_default().to_string();
                if !status_line.contains(" 200") {
                    return Err(StreamError::Protocol(format!(
                        "unexpected response: {status_line}"
                    )));
                }
                self.buffer.drain(..end + 4);
                return Ok(());
            }

            if self.buffer.len() > MAX_HEADER_BYTES {
                return Err(StreamError::Protocol(
                    "response headers exceed size limit".to_string(),
                ));
            }

            self.fill()?;
        }
    }

    fn fill(&mut self) -> Result<(), StreamError> {
        let mut chunk = [0u8; READ_CHUNK];
        match self.stream.read(&mut chunk) {
            Ok(0) => {
                self.open = false;
                Err(StreamError::Closed)
            }
            Ok(n) => {
                self.buffer.extend_from_slice(&chunk[..n]);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                Err(StreamError::Timeout)
            }
            Err(e) => {
                self.open = false;
                Err(StreamError::Io(e))
            }
        }
    }
}

/// Scan for a complete JPEG (SOI..EOI) and split it out of `buffer`.
/// Part headers and boundary text before the SOI marker are discarded.
fn extract_jpeg(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let soi = find_subslice(buffer, &JPEG_SOI)?;
    if soi > 0 {
        buffer.drain(..soi);
    }

    let eoi = find_subslice(&buffer[JPEG_SOI.len()..], &JPEG_EOI)? + JPEG_SOI.len();
    Some(buffer.drain(..eoi + JPEG_EOI.len()).collect())
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(body: &[u8]) -> Vec<u8> {
        let mut frame = JPEG_SOI.to_vec();
        frame.extend_from_slice(body);
        frame.extend_from_slice(&JPEG_EOI);
        frame
    }

    #[test]
    fn extracts_a_frame_wrapped_in_part_headers() {
        let frame = jpeg(b"pixels");
        let mut buffer = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
        buffer.extend_from_slice(&frame);
        buffer.extend_from_slice(b"\r\n--frame\r\n");

        let extracted = extract_jpeg(&mut buffer).unwrap();
        assert_eq!(extracted, frame);
        assert_eq!(buffer, b"\r\n--frame\r\n");
    }

    #[test]
    fn incomplete_frame_yields_nothing_until_eoi_arrives() {
        let frame = jpeg(b"0123456789");
        let (first, rest) = frame.split_at(6);

        let mut buffer = first.to_vec();
        assert!(extract_jpeg(&mut buffer).is_none());

        buffer.extend_from_slice(rest);
        assert_eq!(extract_jpeg(&mut buffer).unwrap(), frame);
        assert!(buffer.is_empty());
    }

    #[test]
    fn consecutive_frames_come_out_in_order() {
        let a = jpeg(b"aaaa");
        let b = jpeg(b"bbbb");
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&a);
        buffer.extend_from_slice(b"\r\n--frame\r\n\r\n");
        buffer.extend_from_slice(&b);

        assert_eq!(extract_jpeg(&mut buffer).unwrap(), a);
        assert_eq!(extract_jpeg(&mut buffer).unwrap(), b);
        assert!(extract_jpeg(&mut buffer).is_none());
    }

    #[test]
    fn garbage_without_markers_is_left_in_place() {
        let mut buffer = b"not a jpeg at all".to_vec();
        assert!(extract_jpeg(&mut buffer).is_none());
    }

    #[test]
    fn invalid_scheme_is_rejected_up_front() {
        let err = MjpegSource::connect("rtsp://camera.local/stream").unwrap_err();
        assert!(matches!(err, StreamError::InvalidUrl { .. }));
    }

    #[test]
    fn unparseable_url_is_rejected_up_front() {
        let err = MjpegSource::connect("not a url").unwrap_err();
        assert!(matches!(err, StreamError::InvalidUrl { .. }));
    }
}
