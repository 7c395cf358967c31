use std::fs;
use std::io::ErrorKind;

use tracing::{debug, warn};

use crate::config::HttpSettings;
use crate::error::FetchError;
use crate::http::get_text_with_retries;

fn is_remote(locator: &str) -> bool {
    let lower = locator.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

pub fn fetch_transcript(locator: &str, settings: &HttpSettings) -> Result<String, FetchError> {
    let locator = locator.trim();
    if is_remote(locator) {
        debug!(url = locator, "fetching remote transcript");
        return get_text_with_retries(locator, settings).map_err(|failure| {
            if failure.is_not_found() {
                FetchError::NotFound(locator.to_string())
            } else {
                FetchError::Network(failure.to_string())
            }
        });
    }

    fs::read_to_string(locator).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            FetchError::NotFound(locator.to_string())
        } else {
            FetchError::Read {
                path: locator.to_string(),
                source,
            }
        }
    })
}

/// A missing secondary track is normal and maps to `None`; other failures are errors.
pub fn fetch_optional_transcript(
    locator: &str,
    settings: &HttpSettings,
) -> Result<Option<String>, FetchError> {
    match fetch_transcript(locator, settings) {
        Ok(raw) => Ok(Some(raw)),
        Err(FetchError::NotFound(missing)) => {
            warn!(locator = %missing, "secondary transcript not found, continuing without it");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::http::stub::{Reply, StubServer};

    fn quick() -> HttpSettings {
        HttpSettings {
            connect_timeout: Duration::from_millis(200),
            read_timeout: Duration::from_millis(200),
            attempts: 2,
            retry_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn reads_local_transcript_files() {
        let path = std::env::temp_dir().join(format!("podlingo-fetch-{}.srt", std::process::id()));
        fs::write(&path, "1\n00:00:01,000 --> 00:00:02,000\nHi\n").expect("write fixture");
        let raw = fetch_transcript(path.to_str().expect("utf-8 path"), &quick())
            .expect("local file should load");
        assert!(raw.contains("-->"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_local_file_is_not_found() {
        let err = fetch_transcript("/definitely/not/here.vtt", &quick())
            .expect_err("missing file should fail");
        assert!(matches!(err, FetchError::NotFound(_)));
        let optional = fetch_optional_transcript("/definitely/not/here.vtt", &quick())
            .expect("missing secondary is not an error");
        assert!(optional.is_none());
    }

    #[test]
    fn remote_404_is_not_found_and_optional() {
        let server = StubServer::spawn(vec![Reply::Now(404, "gone".to_string())]);
        let optional = fetch_optional_transcript(&format!("{}/zh.srt", server.base_url), &quick())
            .expect("404 secondary is not an error");
        assert!(optional.is_none());
    }

    #[test]
    fn remote_server_errors_surface_as_network_errors() {
        let server = StubServer::spawn(vec![
            Reply::Now(502, "bad gateway".to_string()),
            Reply::Now(502, "bad gateway".to_string()),
        ]);
        let err = fetch_optional_transcript(&format!("{}/en.srt", server.base_url), &quick())
            .expect_err("5xx should not be swallowed");
        assert!(matches!(err, FetchError::Network(_)));
        assert_eq!(server.hits(), 2);
    }

    #[test]
    fn remote_transcript_body_is_returned() {
        let body = "WEBVTT\n\n00:01.000 --> 00:02.000\nHello\n";
        let server = StubServer::spawn(vec![Reply::Now(200, body.to_string())]);
        let raw = fetch_transcript(&format!("{}/en.vtt", server.base_url), &quick())
            .expect("200 should load");
        assert_eq!(raw, body);
    }
}
