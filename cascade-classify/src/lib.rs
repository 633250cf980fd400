#![deny(missing_docs)]
//! Tier classification cache.
//!
//! Newly deployed functions are assigned a starting tier by an
//! external AI classifier. Classification is expensive and
//! deterministic per (name, description, input schema), so this crate
//! memoizes it: a read-through cache keyed on the three inputs, with
//! concurrent producers for the same key collapsed into one pending
//! request. When the producer is unavailable a deterministic keyword
//! heuristic answers instead — marked `provider = "fallback"` and
//! never cached.

pub mod key;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use tier0::{DurationMs, Tier};

pub use key::{cache_key, canonical_json, schema_digest};

/// Provider name attached to heuristic results.
pub const FALLBACK_PROVIDER: &str = "fallback";

/// A tier assignment for one function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierClassification {
    /// The tier the function should start at.
    pub tier: Tier,
    /// Producer confidence in `[0, 1]`.
    pub confidence: f64,
    /// Why the producer chose this tier.
    pub reasoning: String,
    /// Which producer answered (`"fallback"` for the heuristic).
    pub provider: String,
}

/// Classifier producer failures.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The producer could not be reached.
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// The external classification producer.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Assign a tier to a function from its name, description, and
    /// input-schema digest.
    async fn classify(
        &self,
        name: &str,
        description: &str,
        schema_digest: &str,
    ) -> Result<TierClassification, ClassifyError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: TierClassification,
    expires_at: DateTime<Utc>,
}

/// Read-through classification cache.
///
/// Entries are stored with the cache's TTL directive. The entry map
/// doubles as the process-local key tracker: `clear` drops exactly the
/// keys this process wrote. Writes collapse concurrent producers for
/// the same key into one pending request; late arrivals find the
/// fresh entry on their double-checked read.
pub struct ClassificationCache {
    producer: Arc<dyn Classifier>,
    ttl: DurationMs,
    entries: RwLock<HashMap<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ClassificationCache {
    /// Default entry TTL: one hour.
    pub const DEFAULT_TTL: DurationMs = DurationMs::from_millis(3_600_000);

    /// A cache over `producer` with the default TTL.
    pub fn new(producer: Arc<dyn Classifier>) -> Self {
        Self::with_ttl(producer, Self::DEFAULT_TTL)
    }

    /// A cache over `producer` with an explicit TTL directive.
    pub fn with_ttl(producer: Arc<dyn Classifier>, ttl: DurationMs) -> Self {
        Self {
            producer,
            ttl,
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Classify through the cache.
    ///
    /// Hit → the cached assignment. Miss → the producer runs once per
    /// key (concurrent callers coalesce) and the result is written
    /// with the TTL. Producer failure → the deterministic heuristic,
    /// uncached.
    pub async fn get_or_classify(
        &self,
        name: &str,
        description: &str,
        schema: &serde_json::Value,
    ) -> TierClassification {
        let digest = schema_digest(schema);
        let key = cache_key(name, description, &digest);

        if let Some(hit) = self.lookup(&key).await {
            debug!(%key, tier = %hit.tier, "classification cache hit");
            return hit;
        }

        // Collapse concurrent producers for this key.
        let gate = {
            let mut in_flight = self.in_flight.lock().await;
            Arc::clone(
                in_flight
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        let _pending = gate.lock().await;

        // A coalesced caller may have written the entry while we
        // queued on the gate.
        if let Some(hit) = self.lookup(&key).await {
            self.in_flight.lock().await.remove(&key);
            return hit;
        }

        let classified = self
            .producer
            .classify(name, description, &digest)
            .await;
        let result = match classified {
            Ok(value) => {
                self.entries.write().await.insert(
                    key.clone(),
                    CacheEntry {
                        value: value.clone(),
                        expires_at: Utc::now()
                            + chrono::Duration::milliseconds(self.ttl.as_millis() as i64),
                    },
                );
                value
            }
            Err(err) => {
                warn!(%key, error = %err, "classifier unavailable, using heuristic");
                heuristic(name, description)
            }
        };
        self.in_flight.lock().await.remove(&key);
        result
    }

    /// Drop one cached classification by exact key.
    pub async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Drop every classification this process wrote.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// How many unexpired entries the cache currently tracks.
    pub async fn len(&self) -> usize {
        let now = Utc::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    /// Whether the cache tracks no unexpired entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn lookup(&self, key: &str) -> Option<TierClassification> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Utc::now())
            .map(|entry| entry.value.clone())
    }
}

/// Deterministic keyword heuristic used when the producer is down.
///
/// Scans the name and description for tier markers, preferring the
/// highest tier whose markers appear. Confidence is fixed at 0.5 and
/// the result is never cached.
pub fn heuristic(name: &str, description: &str) -> TierClassification {
    const HUMAN: &[&str] = &["approve", "approval", "review", "sign-off", "manual", "escalate"];
    const AGENTIC: &[&str] = &["agent", "tool", "multi-step", "workflow", "orchestrate", "research"];
    const GENERATIVE: &[&str] = &[
        "generate", "summar", "classif", "translate", "extract", "rewrite", "llm",
    ];

    let text = format!("{name} {description}").to_lowercase();
    let matched = |markers: &[&str]| markers.iter().any(|m| text.contains(m));

    let (tier, reasoning) = if matched(HUMAN) {
        (Tier::Human, "description mentions human review")
    } else if matched(AGENTIC) {
        (Tier::Agentic, "description mentions tools or multi-step work")
    } else if matched(GENERATIVE) {
        (Tier::Generative, "description mentions a single-shot AI task")
    } else {
        (Tier::Code, "no AI markers; assuming deterministic code")
    };

    TierClassification {
        tier,
        confidence: 0.5,
        reasoning: reasoning.to_owned(),
        provider: FALLBACK_PROVIDER.to_owned(),
    }
}
