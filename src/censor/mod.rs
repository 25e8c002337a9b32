//! Sensitive-data scanning for log text.
//!
//! Every [`Censor`] stage looks at the same input and reports the byte spans
//! it considers sensitive. [`CensorPipeline`] runs the stages concurrently,
//! merges their findings and substitutes the replacement token. A failing
//! stage fails the whole pass, so callers never receive partially scanned
//! text.

pub mod patterns;
pub mod presidio;
pub mod redaction;
pub mod trufflehog;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{debug, info};

use crate::error::CensorError;
use crate::types::{CensoredText, Config, RedactionKind};

pub use patterns::PatternCensor;
pub use presidio::PresidioCensor;
pub use redaction::{find_occurrences, merge_findings, redact};
pub use trufflehog::TruffleHogCensor;

/// A sensitive span reported by one stage, in bytes of the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub start: usize,
    pub end: usize,
    pub kind: RedactionKind,
}

#[async_trait]
pub trait Censor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn detect(&self, text: &str) -> Result<Vec<Finding>, CensorError>;
}

#[derive(Clone)]
pub struct CensorPipeline {
    stages: Vec<Arc<dyn Censor>>,
    replacement: String,
}

impl CensorPipeline {
    pub fn new(replacement: impl Into<String>) -> Self {
        Self {
            stages: Vec::new(),
            replacement: replacement.into(),
        }
    }

    pub fn with_stage<C: Censor + 'static>(mut self, stage: C) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Secret scanning with TruffleHog, then PII detection with Presidio when
    /// an analyzer URL is configured or the built-in patterns otherwise.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let pipeline = Self::new(cfg.redaction_token.clone()).with_stage(TruffleHogCensor::new(
            cfg.trufflehog_bin.clone(),
            Duration::from_secs(cfg.trufflehog_timeout_secs),
        ));

        let pipeline = match cfg.presidio_analyzer_url.as_deref() {
            Some(url) => pipeline.with_stage(PresidioCensor::new(
                url,
                cfg.pii_language.clone(),
                cfg.pii_entities.clone(),
                cfg.pii_score_threshold,
            )?),
            None => pipeline.with_stage(PatternCensor::for_entities(&cfg.pii_entities)),
        };

        info!("Censor pipeline stages: {}", pipeline.stage_names().join(", "));
        Ok(pipeline)
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub async fn censor(&self, text: &str) -> Result<CensoredText, CensorError> {
        if text.is_empty() || self.stages.is_empty() {
            return Ok(CensoredText {
                text: text.to_string(),
                redactions: Vec::new(),
            });
        }

        let per_stage = try_join_all(self.stages.iter().map(|stage| stage.detect(text))).await?;
        let findings: Vec<Finding> = per_stage.into_iter().flatten().collect();
        let censored = redact(text, findings, &self.replacement);

        if !censored.redactions.is_empty() {
            let mut by_kind: BTreeMap<String, usize> = BTreeMap::new();
            for r in &censored.redactions {
                *by_kind.entry(r.kind.to_string()).or_default() += 1;
            }
            debug!("Redactions by kind: {:?}", by_kind);
            info!("Redacted {} sensitive spans", censored.redactions.len());
        }
        Ok(censored)
    }
}
