//! Streams a local file to the client.
//!
//! Honors `If-Modified-Since`: when the client's copy is at least as new
//! as the file, the response is a bodyless `304`. Otherwise `Date`,
//! `Last-Modified` and (for known extensions) `Content-Type` are set and
//! the file is copied to the response body in full.

use crate::error::{DocgateError, Result};
use crate::mime::mime_type_for_path;
use crate::request::{PageRequest, PageResponse};
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, instrument, warn};

pub const IF_MODIFIED_SINCE: &str = "If-Modified-Since";
pub const STATUS_NOT_MODIFIED: u16 = 304;

/// What [`send_file`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The client's cached copy is current; no body was sent
    NotModified,

    /// The file was sent
    Sent { bytes: u64 },
}

/// Send `path` to the client.
///
/// Any I/O failure while reading the file or writing the body fails the
/// whole operation with [`DocgateError::SendFile`]. A failure to flush the
/// body afterwards is only logged.
#[instrument(skip(request, response), fields(path = %path.display()))]
pub fn send_file(
    request: &PageRequest,
    response: &mut dyn PageResponse,
    path: &Path,
) -> Result<DeliveryOutcome> {
    let send_failed = |source: io::Error| DocgateError::SendFile {
        path: path.to_path_buf(),
        source,
    };

    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(send_failed)?;
    let last_modified = whole_seconds(DateTime::<Utc>::from(modified));

    if let Some(since) = request.header_as_date(IF_MODIFIED_SINCE) {
        if last_modified <= since {
            debug!(%last_modified, %since, "Client copy is current");
            response.send_status(STATUS_NOT_MODIFIED);
            return Ok(DeliveryOutcome::NotModified);
        }
    }

    response.set_header_as_date("Date", Utc::now());
    response.set_header_as_date("Last-Modified", last_modified);
    if let Some(mime) = mime_type_for_path(path) {
        response.set_header("Content-Type", mime);
    }

    let mut input = File::open(path).map_err(send_failed)?;
    let output = response.output().map_err(send_failed)?;
    let bytes = io::copy(&mut input, output).map_err(send_failed)?;

    if let Err(e) = output.flush() {
        warn!(error = %e, "Failed to flush response body");
    }

    debug!(bytes, "File sent");
    Ok(DeliveryOutcome::Sent { bytes })
}

/// HTTP dates carry no sub-second part
fn whole_seconds(date: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(date.timestamp(), 0).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{format_http_date, BufferedResponse};
    use chrono::Duration;
    use std::io::Write;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn file_with_mtime(dir: &TempDir, name: &str, contents: &[u8]) -> (std::path::PathBuf, DateTime<Utc>) {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents).unwrap();

        let mtime = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        file.set_modified(SystemTime::from(mtime)).unwrap();
        (path, mtime)
    }

    fn request_since(date: DateTime<Utc>) -> PageRequest {
        PageRequest::new("/file/x").with_header(IF_MODIFIED_SINCE, format_http_date(date))
    }

    #[test]
    fn test_sends_file_with_headers() {
        let dir = TempDir::new().unwrap();
        let (path, mtime) = file_with_mtime(&dir, "report.pdf", b"%PDF-1.4 body");
        let mut response = BufferedResponse::new();

        let outcome = send_file(&PageRequest::new("/file/x"), &mut response, &path).unwrap();

        assert_eq!(outcome, DeliveryOutcome::Sent { bytes: 13 });
        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), b"%PDF-1.4 body");
        assert_eq!(response.header("Content-Type"), Some("application/pdf"));
        assert_eq!(
            response.header("Last-Modified"),
            Some(format_http_date(mtime).as_str())
        );
        assert!(response.header("Date").is_some());
    }

    #[test]
    fn test_not_modified_when_equal_or_after() {
        let dir = TempDir::new().unwrap();
        let (path, mtime) = file_with_mtime(&dir, "report.pdf", b"body");

        for since in [mtime, mtime + Duration::hours(1)] {
            let mut response = BufferedResponse::new();
            let outcome = send_file(&request_since(since), &mut response, &path).unwrap();

            assert_eq!(outcome, DeliveryOutcome::NotModified);
            assert_eq!(response.status(), 304);
            assert!(response.body().is_empty());
            assert_eq!(response.header("Content-Type"), None);
        }
    }

    #[test]
    fn test_sent_when_client_copy_is_older() {
        let dir = TempDir::new().unwrap();
        let (path, mtime) = file_with_mtime(&dir, "notes.txt", b"hello");
        let mut response = BufferedResponse::new();

        let outcome =
            send_file(&request_since(mtime - Duration::seconds(1)), &mut response, &path).unwrap();

        assert_eq!(outcome, DeliveryOutcome::Sent { bytes: 5 });
        assert_eq!(response.header("Content-Type"), Some("text/plain"));
    }

    #[test]
    fn test_unknown_extension_has_no_content_type() {
        let dir = TempDir::new().unwrap();
        let (path, _) = file_with_mtime(&dir, "data.xyz", b"raw");
        let mut response = BufferedResponse::new();

        send_file(&PageRequest::new("/file/x"), &mut response, &path).unwrap();

        assert_eq!(response.header("Content-Type"), None);
        assert_eq!(response.body(), b"raw");
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.pdf");
        let mut response = BufferedResponse::new();

        let err = send_file(&PageRequest::new("/file/x"), &mut response, &path).unwrap_err();
        match err {
            DocgateError::SendFile { path: failed, .. } => assert_eq!(failed, path),
            other => panic!("expected SendFile, got {:?}", other),
        }
    }

    /// Body writer that fails after a number of bytes, or only on flush.
    struct FaultyBody {
        accept: usize,
        fail_flush: bool,
    }

    impl Write for FaultyBody {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.accept == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"));
            }
            let n = buf.len().min(self.accept);
            self.accept -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            if self.fail_flush {
                Err(io::Error::new(io::ErrorKind::Other, "flush failed"))
            } else {
                Ok(())
            }
        }
    }

    struct FaultyResponse {
        body: FaultyBody,
    }

    impl PageResponse for FaultyResponse {
        fn send_status(&mut self, _status: u16) {}

        fn set_header(&mut self, _name: &str, _value: &str) {}

        fn output(&mut self) -> io::Result<&mut dyn Write> {
            Ok(&mut self.body)
        }
    }

    #[test]
    fn test_write_failure_fails_with_path() {
        let dir = TempDir::new().unwrap();
        let (path, _) = file_with_mtime(&dir, "big.txt", &[b'x'; 4096]);
        let mut response = FaultyResponse {
            body: FaultyBody {
                accept: 100,
                fail_flush: false,
            },
        };

        let err = send_file(&PageRequest::new("/file/x"), &mut response, &path).unwrap_err();
        assert!(matches!(err, DocgateError::SendFile { .. }));
        assert!(err.to_string().contains("big.txt"));
    }

    #[test]
    fn test_flush_failure_is_suppressed() {
        let dir = TempDir::new().unwrap();
        let (path, _) = file_with_mtime(&dir, "small.txt", b"abc");
        let mut response = FaultyResponse {
            body: FaultyBody {
                accept: usize::MAX,
                fail_flush: true,
            },
        };

        let outcome = send_file(&PageRequest::new("/file/x"), &mut response, &path).unwrap();
        assert_eq!(outcome, DeliveryOutcome::Sent { bytes: 3 });
    }
}
