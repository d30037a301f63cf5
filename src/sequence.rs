//! Client for the external transcript sequence service.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Configuration of the HTTP sequence service.
#[derive(Debug, Clone, derive_builder::Builder)]
#[builder(pattern = "immutable")]
pub struct SequenceServiceConfig {
    /// Base URL, e.g. `http://tark.ensembl.org/api`.
    #[builder(setter(into))]
    pub base_url: String,
    /// Timeout of one request.
    #[builder(default = "Duration::from_secs(10)")]
    pub timeout: Duration,
}

/// Transcript as reported by the sequence service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTranscript {
    pub loc_start: i64,
    pub loc_end: i64,
    /// `None` for transcripts without a sequence, e.g. non-coding ones.
    pub sequence: Option<String>,
}

/// Lookup of transcript sequences by stable id and Ensembl release.
#[async_trait::async_trait]
pub trait SequenceService: Send + Sync {
    async fn transcript(&self, enst_id: &str, release: i32) -> Result<RemoteTranscript>;
}

#[derive(Debug, Deserialize)]
struct TranscriptPage {
    results: Vec<TranscriptResult>,
}

#[derive(Debug, Deserialize)]
struct TranscriptResult {
    loc_start: i64,
    loc_end: i64,
    sequence: Option<SequenceBlock>,
}

#[derive(Debug, Deserialize)]
struct SequenceBlock {
    sequence: Option<String>,
}

/// Interpret a response body; anything but exactly one result is an integrity fault.
fn parse_page(enst_id: &str, body: &[u8]) -> Result<RemoteTranscript> {
    let page: TranscriptPage = serde_json::from_slice(body)
        .map_err(|e| Error::Upstream(format!("malformed response for {}: {}", enst_id, e)))?;
    let count = page.results.len();
    let mut results = page.results.into_iter();
    match (results.next(), results.next()) {
        (Some(result), None) => Ok(RemoteTranscript {
            loc_start: result.loc_start,
            loc_end: result.loc_end,
            sequence: result.sequence.and_then(|block| block.sequence),
        }),
        _ => Err(Error::Integrity(format!(
            "sequence service returned {} results for {}",
            count, enst_id
        ))),
    }
}

/// `SequenceService` talking HTTP to a Tark-like API.
#[derive(Debug, Clone)]
pub struct HttpSequenceService {
    config: SequenceServiceConfig,
    client: reqwest::Client,
}

impl HttpSequenceService {
    pub fn new(config: SequenceServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Store(anyhow::anyhow!("could not build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }
}

#[async_trait::async_trait]
impl SequenceService for HttpSequenceService {
    async fn transcript(&self, enst_id: &str, release: i32) -> Result<RemoteTranscript> {
        let url = format!("{}/transcript/", self.config.base_url.trim_end_matches('/'));
        let release = release.to_string();
        tracing::debug!("fetching sequence of {} (release {})", enst_id, release);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("stable_id", enst_id),
                ("release", release.as_str()),
                ("expand", "sequence"),
            ])
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("request for {} failed: {}", enst_id, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::not_found(format!("sequence of {}", enst_id)));
        }
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "sequence service answered HTTP {} for {}",
                status, enst_id
            )));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Upstream(format!("could not read response: {}", e)))?;
        parse_page(enst_id, &body)
    }
}


#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_single_result() {
        let body = br#"{"count": 1, "results": [
            {"loc_start": 100, "loc_end": 200, "sequence": {"sequence": "ATGC"}}
        ]}"#;
        assert_eq!(
            parse_page("ENST01", body).unwrap(),
            RemoteTranscript {
                loc_start: 100,
                loc_end: 200,
                sequence: Some("ATGC".into()),
            }
        );
    }

    #[test]
    fn parse_without_sequence() {
        let body = br#"{"results": [{"loc_start": 1, "loc_end": 2}]}"#;
        assert_eq!(parse_page("ENST01", body).unwrap().sequence, None);
    }

    #[rstest::rstest]
    #[case(r#"{"results": []}"#)]
    #[case(r#"{"results": [{"loc_start": 1, "loc_end": 2}, {"loc_start": 1, "loc_end": 2}]}"#)]
    fn parse_wrong_count_is_integrity_fault(#[case] body: &str) {
        assert!(matches!(
            parse_page("ENST01", body.as_bytes()),
            Err(Error::Integrity(_))
        ));
    }

    #[test]
    fn parse_garbage_is_upstream_error() {
        assert!(matches!(
            parse_page("ENST01", b"<html>"),
            Err(Error::Upstream(_))
        ));
    }

    #[test]
    fn config_builder_default_timeout() {
        let config = SequenceServiceConfigBuilder::default()
            .base_url("http://localhost:8000/api")
            .build()
            .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}
