//! Retrieval gateway — top-k semantic queries against the external
//! vector index.
//!
//! The index itself (and the embedding pipeline feeding it) is an
//! external collaborator; this crate only issues search requests,
//! normalizes hit records, and applies the relevance threshold.
//!
//! Transient backend failures are retried on a fixed schedule
//! (100 ms, 400 ms, 1.6 s). Authentication failures are never retried.

use std::time::Duration;

use async_trait::async_trait;
use lintel_config::RetrievalConfig;
use lintel_core::chunk::{ContentType, RetrievedChunk};
use lintel_core::error::RetrievalError;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// The retrieval seam the orchestrator depends on.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Top-k semantic query; hits ordered by decreasing relevance with
    /// the threshold applied.
    async fn retrieve(
        &self,
        query_text: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError>;
}

/// Retry delays applied between attempts.
const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_millis(100),
    Duration::from_millis(400),
    Duration::from_millis(1600),
];

/// `top_k` bounds.
const TOP_K_MIN: usize = 1;
const TOP_K_MAX: usize = 20;

/// What `/health` needs to know about the backend.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct BackendProbe {
    pub reachable: bool,
    pub index_non_empty: bool,
}

/// The gateway to the vector index.
pub struct RetrievalGateway {
    base_url: String,
    index: String,
    api_key: Option<String>,
    relevance_threshold: f32,
    top_k_default: usize,
    client: reqwest::Client,
}

impl RetrievalGateway {
    pub fn new(config: &RetrievalConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            api_key: config.api_key.clone(),
            relevance_threshold: config.relevance_threshold,
            top_k_default: config.top_k_default,
            client,
        }
    }

    async fn search_once(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<Vec<RawHit>, RetrievalError> {
        let mut request = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RetrievalError::Unavailable(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            return Err(RetrievalError::AuthenticationFailed(format!(
                "backend returned {status}"
            )));
        }
        if !(200..300).contains(&status) {
            let detail = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Unavailable(format!(
                "backend returned {status}: {detail}"
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::BadResponse(e.to_string()))?;
        Ok(parsed.hits)
    }

    /// Normalize raw hits: order by decreasing score, clamp scores into
    /// [0, 1], drop hits below the relevance threshold.
    fn normalize(&self, hits: Vec<RawHit>) -> Vec<RetrievedChunk> {
        let mut chunks: Vec<RetrievedChunk> = hits
            .into_iter()
            .map(|h| RetrievedChunk {
                document: h.document,
                page: h.page,
                paragraph: h.paragraph,
                title: h.title,
                content: h.content,
                content_type: h.content_type,
                score: h.score.clamp(0.0, 1.0),
                selected: false,
            })
            .collect();
        chunks.sort_by(|a, b| b.score.total_cmp(&a.score));
        chunks.retain(|c| c.score >= self.relevance_threshold);
        chunks
    }

    /// Single unretried probe used by `/health` and `doctor`.
    pub async fn probe(&self) -> BackendProbe {
        let url = format!("{}/indexes/{}/stats", self.base_url, self.index);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                let stats: IndexStats = response.json().await.unwrap_or_default();
                BackendProbe {
                    reachable: true,
                    index_non_empty: stats.document_count > 0,
                }
            }
            Ok(_) | Err(_) => BackendProbe {
                reachable: false,
                index_non_empty: false,
            },
        }
    }
}

#[async_trait]
impl Retriever for RetrievalGateway {
    /// Results come back ordered by decreasing relevance with
    /// below-threshold hits removed; an empty vec is a valid outcome.
    async fn retrieve(
        &self,
        query_text: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let top_k = clamp_top_k(top_k.unwrap_or(self.top_k_default));
        let url = format!("{}/indexes/{}/search", self.base_url, self.index);
        let body = serde_json::json!({ "query_text": query_text, "top_k": top_k });

        let mut last_error = RetrievalError::Unavailable("no attempt made".into());

        for attempt in 0..=RETRY_DELAYS.len() {
            if attempt > 0 {
                let delay = RETRY_DELAYS[attempt - 1];
                debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying retrieval");
                tokio::time::sleep(delay).await;
            }

            match self.search_once(&url, &body).await {
                Ok(hits) => {
                    let chunks = self.normalize(hits);
                    info!(
                        query_len = query_text.len(),
                        hits = chunks.len(),
                        "retrieval complete"
                    );
                    return Ok(chunks);
                }
                Err(e @ RetrievalError::AuthenticationFailed(_)) => return Err(e),
                Err(e) => {
                    warn!(attempt, error = %e, "retrieval attempt failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

fn clamp_top_k(top_k: usize) -> usize {
    top_k.clamp(TOP_K_MIN, TOP_K_MAX)
}

// --- Backend wire types ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    document: String,
    #[serde(default)]
    page: u32,
    #[serde(default)]
    paragraph: Option<u32>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    content_type: ContentType,
    #[serde(default)]
    score: f32,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStats {
    #[serde(default)]
    document_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway_with_threshold(threshold: f32) -> RetrievalGateway {
        let config = RetrievalConfig {
            relevance_threshold: threshold,
            ..Default::default()
        };
        RetrievalGateway::new(&config)
    }

    fn hit(document: &str, score: f32) -> RawHit {
        RawHit {
            document: document.into(),
            page: 1,
            paragraph: None,
            title: None,
            content: "text".into(),
            content_type: ContentType::Text,
            score,
        }
    }

    #[test]
    fn top_k_is_clamped() {
        assert_eq!(clamp_top_k(0), 1);
        assert_eq!(clamp_top_k(5), 5);
        assert_eq!(clamp_top_k(100), 20);
    }

    #[test]
    fn normalize_orders_by_score() {
        let gateway = gateway_with_threshold(0.0);
        let chunks = gateway.normalize(vec![hit("a", 0.2), hit("b", 0.9), hit("c", 0.5)]);
        let docs: Vec<&str> = chunks.iter().map(|c| c.document.as_str()).collect();
        assert_eq!(docs, ["b", "c", "a"]);
    }

    #[test]
    fn normalize_applies_threshold() {
        let gateway = gateway_with_threshold(0.7);
        let chunks = gateway.normalize(vec![hit("a", 0.95), hit("b", 0.69)]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].document, "a");
    }

    #[test]
    fn normalize_clamps_scores() {
        let gateway = gateway_with_threshold(0.0);
        let chunks = gateway.normalize(vec![hit("a", 1.4), hit("b", -0.3)]);
        assert_eq!(chunks[0].score, 1.0);
        assert_eq!(chunks[1].score, 0.0);
    }

    #[test]
    fn retry_schedule_is_exponential() {
        assert_eq!(RETRY_DELAYS[0], Duration::from_millis(100));
        assert_eq!(RETRY_DELAYS[1], Duration::from_millis(400));
        assert_eq!(RETRY_DELAYS[2], Duration::from_millis(1600));
    }

    #[test]
    fn parses_backend_hit_payload() {
        let raw = r#"{
            "hits": [{
                "document": "regs.pdf",
                "page": 7,
                "title": "Extensions",
                "content": "The maximum depth of a single-storey rear extension...",
                "content_type": "image-ocr",
                "score": 0.81
            }]
        }"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.hits.len(), 1);
        assert_eq!(parsed.hits[0].content_type, ContentType::ImageOcr);
    }

    #[tokio::test]
    async fn unreachable_backend_is_unavailable_not_panic() {
        let config = RetrievalConfig {
            base_url: "http://127.0.0.1:1".into(),
            ..Default::default()
        };
        let gateway = RetrievalGateway::new(&config);
        let probe = gateway.probe().await;
        assert!(!probe.reachable);
        assert!(!probe.index_non_empty);
    }
}
