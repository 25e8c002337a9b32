use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::CensorError;
use crate::types::RedactionKind;
use super::redaction::char_range_to_bytes;
use super::{Censor, Finding};

const SCANNER: &str = "presidio";

/// PII detection through a Presidio analyzer service (`POST /analyze`).
pub struct PresidioCensor {
    client: reqwest::Client,
    analyze_url: String,
    language: String,
    entities: Vec<String>,
    score_threshold: f64,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
    language: &'a str,
    entities: &'a [String],
    score_threshold: f64,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzerResult {
    pub entity_type: String,
    /// Character offsets into the analyzed text.
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub score: f64,
}

impl PresidioCensor {
    pub fn new(
        base_url: &str,
        language: String,
        entities: Vec<String>,
        score_threshold: f64,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build Presidio HTTP client")?;
        Ok(Self {
            client,
            analyze_url: format!("{}/analyze", base_url.trim_end_matches('/')),
            language,
            entities,
            score_threshold,
        })
    }
}

#[async_trait]
impl Censor for PresidioCensor {
    fn name(&self) -> &'static str {
        SCANNER
    }

    async fn detect(&self, text: &str) -> Result<Vec<Finding>, CensorError> {
        let request = AnalyzeRequest {
            text,
            language: &self.language,
            entities: &self.entities,
            score_threshold: self.score_threshold,
        };

        let response = self
            .client
            .post(&self.analyze_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CensorError::Unavailable {
                scanner: SCANNER,
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Presidio analyzer failed: {} - {}", status, body);
            return Err(CensorError::ScanFailed {
                scanner: SCANNER,
                reason: format!("analyzer returned {}", status),
            });
        }

        let results: Vec<AnalyzerResult> = response.json().await.map_err(|e| CensorError::MalformedOutput {
            scanner: SCANNER,
            reason: e.to_string(),
        })?;
        debug!("Presidio reported {} entities", results.len());

        results_to_findings(text, &results)
    }
}

/// Map Presidio's character offsets onto byte offsets of `text`.
pub fn results_to_findings(text: &str, results: &[AnalyzerResult]) -> Result<Vec<Finding>, CensorError> {
    results
        .iter()
        .map(|r| {
            let (start, end) = char_range_to_bytes(text, r.start, r.end).ok_or_else(|| {
                CensorError::MalformedOutput {
                    scanner: SCANNER,
                    reason: format!("{} span {}..{} outside text", r.entity_type, r.start, r.end),
                }
            })?;
            Ok(Finding {
                start,
                end,
                kind: RedactionKind::Pii(r.entity_type.clone()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_results_to_findings_uses_char_offsets() {
        let text = "Grüße from jürgen@example.de";
        let results = vec![AnalyzerResult {
            entity_type: "EMAIL_ADDRESS".to_string(),
            start: 11,
            end: 28,
            score: 1.0,
        }];
        let findings = results_to_findings(text, &results).unwrap();
        assert_eq!(&text[findings[0].start..findings[0].end], "jürgen@example.de");
    }

    #[test]
    fn test_results_out_of_range_are_rejected() {
        let results = vec![AnalyzerResult {
            entity_type: "PHONE_NUMBER".to_string(),
            start: 5,
            end: 50,
            score: 0.7,
        }];
        assert!(results_to_findings("short", &results).is_err());
    }

    #[tokio::test]
    async fn test_detect_posts_analyze_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/analyze")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "language": "en",
                "entities": ["EMAIL_ADDRESS"],
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"entity_type":"EMAIL_ADDRESS","start":8,"end":20,"score":1.0}]"#)
            .create_async()
            .await;

        let censor = PresidioCensor::new(&server.url(), "en".to_string(), vec!["EMAIL_ADDRESS".to_string()], 0.0).unwrap();
        let text = "contact a@example.io now";
        let findings = censor.detect(text).await.unwrap();

        mock.assert_async().await;
        assert_eq!(findings.len(), 1);
        assert_eq!(&text[findings[0].start..findings[0].end], "a@example.io");
    }

    #[tokio::test]
    async fn test_detect_fails_on_server_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/analyze").with_status(500).create_async().await;

        let censor = PresidioCensor::new(&server.url(), "en".to_string(), vec!["CRYPTO".to_string()], 0.0).unwrap();
        let err = censor.detect("text").await.unwrap_err();
        assert!(matches!(err, CensorError::ScanFailed { .. }));
    }
}
