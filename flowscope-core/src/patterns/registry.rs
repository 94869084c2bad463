use std::sync::Arc;

use crate::error::{FlowscopeError, FlowscopeResult};
use crate::models::{Difficulty, PatternCategory, PatternId, PatternInfo};
use crate::timing::Pacer;

use super::async_messaging::AsyncMessagingPattern;
use super::circuit_breaker::CircuitBreakerPattern;
use super::outbox::OutboxPattern;
use super::pub_sub::PubSubPattern;
use super::request_response::RequestResponsePattern;
use super::saga::SagaPattern;
use super::{PatternController, PatternSession};

static CATALOG: [PatternInfo; 6] = [
    PatternInfo {
        id: PatternId::RequestResponse,
        name: "Request/Response",
        icon: "⇄",
        description: "Synchronous HTTP through a gateway with a cache-aside Redis in front of Postgres.",
        category: PatternCategory::Communication,
        difficulty: Difficulty::Beginner,
        tags: &["http", "cache", "redis", "sync", "latency"],
    },
    PatternInfo {
        id: PatternId::AsyncMessaging,
        name: "Async Messaging",
        icon: "✉",
        description: "A producer publishes events to Kafka and a consumer processes them at its own pace.",
        category: PatternCategory::Communication,
        difficulty: Difficulty::Beginner,
        tags: &["kafka", "events", "queue", "lag", "decoupling"],
    },
    PatternInfo {
        id: PatternId::Outbox,
        name: "Transactional Outbox",
        icon: "📤",
        description: "Write the order and its event in one transaction; a relay publishes the event later.",
        category: PatternCategory::Consistency,
        difficulty: Difficulty::Intermediate,
        tags: &["outbox", "kafka", "transaction", "at-least-once", "relay"],
    },
    PatternInfo {
        id: PatternId::Saga,
        name: "Saga (Orchestration)",
        icon: "🧭",
        description: "An orchestrator drives order, payment and inventory steps and compensates on failure.",
        category: PatternCategory::Consistency,
        difficulty: Difficulty::Advanced,
        tags: &["saga", "compensation", "orchestrator", "distributed transaction"],
    },
    PatternInfo {
        id: PatternId::CircuitBreaker,
        name: "Circuit Breaker",
        icon: "⚡",
        description: "Stop hammering a failing dependency: closed, open, then half-open probes.",
        category: PatternCategory::Resilience,
        difficulty: Difficulty::Intermediate,
        tags: &["resilience", "breaker", "fallback", "timeout", "retry"],
    },
    PatternInfo {
        id: PatternId::PubSub,
        name: "Pub/Sub",
        icon: "📣",
        description: "One publisher, many subscribers: fan-out, offline subscribers and filtering.",
        category: PatternCategory::Communication,
        difficulty: Difficulty::Beginner,
        tags: &["pubsub", "fan-out", "topic", "subscription", "filter"],
    },
];

pub fn catalog() -> &'static [PatternInfo] {
    &CATALOG
}

pub fn info(id: PatternId) -> &'static PatternInfo {
    match id {
        PatternId::RequestResponse => &CATALOG[0],
        PatternId::AsyncMessaging => &CATALOG[1],
        PatternId::Outbox => &CATALOG[2],
        PatternId::Saga => &CATALOG[3],
        PatternId::CircuitBreaker => &CATALOG[4],
        PatternId::PubSub => &CATALOG[5],
    }
}

/// Looks a pattern up by slug or by exact display name.
pub fn find(query: &str) -> FlowscopeResult<&'static PatternInfo> {
    if let Some(id) = PatternId::from_slug(query) {
        return Ok(info(id));
    }
    CATALOG
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(query.trim()))
        .ok_or_else(|| FlowscopeError::PatternNotFound(query.to_string()))
}

/// Ranks patterns for the quick switcher, best match first.
pub fn search(query: &str) -> Vec<&'static PatternInfo> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return CATALOG.iter().collect();
    }

    let mut scored: Vec<(u32, &'static PatternInfo)> = CATALOG
        .iter()
        .filter_map(|p| score(p, &query).map(|s| (s, p)))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, p)| p).collect()
}

fn score(pattern: &PatternInfo, query: &str) -> Option<u32> {
    let name = pattern.name.to_lowercase();
    if name.starts_with(query) || pattern.id.slug().starts_with(query) {
        return Some(100);
    }
    if name.contains(query) {
        return Some(80);
    }
    if pattern.tags.iter().any(|t| t.contains(query)) {
        return Some(60);
    }
    if pattern.description.to_lowercase().contains(query) {
        return Some(40);
    }
    if is_subsequence(query, &name) {
        return Some(20);
    }
    None
}

fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut chars = haystack.chars();
    needle.chars().all(|c| chars.any(|h| h == c))
}

/// Creates a fresh pattern instance with its own state and engine.
pub fn create_session(id: PatternId, pacer: Pacer) -> Arc<dyn PatternController> {
    match id {
        PatternId::RequestResponse => Arc::new(PatternSession::new(RequestResponsePattern, pacer)),
        PatternId::AsyncMessaging => Arc::new(PatternSession::new(AsyncMessagingPattern, pacer)),
        PatternId::Outbox => Arc::new(PatternSession::new(OutboxPattern, pacer)),
        PatternId::Saga => Arc::new(PatternSession::new(SagaPattern, pacer)),
        PatternId::CircuitBreaker => Arc::new(PatternSession::new(CircuitBreakerPattern, pacer)),
        PatternId::PubSub => Arc::new(PatternSession::new(PubSubPattern, pacer)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_every_pattern() {
        assert_eq!(catalog().len(), PatternId::all().len());
        for id in PatternId::all() {
            assert_eq!(info(*id).id, *id);
        }
    }

    #[test]
    fn test_find() {
        assert_eq!(find("outbox").unwrap().id, PatternId::Outbox);
        assert_eq!(find("Pub/Sub").unwrap().id, PatternId::PubSub);
        assert_eq!(find("circuit_breaker").unwrap().id, PatternId::CircuitBreaker);

        let err = find("graphql").unwrap_err();
        assert_eq!(err.error_code(), "E3001");
    }

    #[test]
    fn test_search_ranks_name_matches_first() {
        let results = search("sag");
        assert_eq!(results[0].id, PatternId::Saga);

        let results = search("kafka");
        assert!(results.iter().any(|p| p.id == PatternId::AsyncMessaging));
        assert!(results.iter().any(|p| p.id == PatternId::Outbox));
        assert!(!results.iter().any(|p| p.id == PatternId::Saga));
    }

    #[test]
    fn test_search_fuzzy_and_empty() {
        assert_eq!(search("").len(), catalog().len());
        assert_eq!(search("crbr")[0].id, PatternId::CircuitBreaker);
        assert!(search("zzz").is_empty());
    }

    #[tokio::test]
    async fn test_create_session_for_every_pattern() {
        for id in PatternId::all() {
            let session = create_session(*id, Pacer::instant());
            assert_eq!(session.info().id, *id);
            assert!(!session.scenarios().is_empty());
            assert!(!session.topology().is_empty());
        }
    }
}
