use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternId {
    RequestResponse,
    AsyncMessaging,
    Outbox,
    Saga,
    CircuitBreaker,
    PubSub,
}

impl PatternId {
    pub fn all() -> &'static [PatternId] {
        &[
            PatternId::RequestResponse,
            PatternId::AsyncMessaging,
            PatternId::Outbox,
            PatternId::Saga,
            PatternId::CircuitBreaker,
            PatternId::PubSub,
        ]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            PatternId::RequestResponse => "request-response",
            PatternId::AsyncMessaging => "async-messaging",
            PatternId::Outbox => "outbox",
            PatternId::Saga => "saga",
            PatternId::CircuitBreaker => "circuit-breaker",
            PatternId::PubSub => "pub-sub",
        }
    }

    /// Accepts the slug, or the slug with `_` in place of `-`.
    pub fn from_slug(slug: &str) -> Option<PatternId> {
        let normalized = slug.trim().to_lowercase().replace('_', "-");
        Self::all().iter().copied().find(|p| p.slug() == normalized)
    }
}

impl std::fmt::Display for PatternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    Communication,
    Consistency,
    Resilience,
}

impl std::fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternCategory::Communication => write!(f, "communication"),
            PatternCategory::Consistency => write!(f, "consistency"),
            PatternCategory::Resilience => write!(f, "resilience"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Beginner => write!(f, "beginner"),
            Difficulty::Intermediate => write!(f, "intermediate"),
            Difficulty::Advanced => write!(f, "advanced"),
        }
    }
}

/// Catalog metadata for one pattern. Read-only, used for labels and search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternInfo {
    pub id: PatternId,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub category: PatternCategory,
    pub difficulty: Difficulty,
    pub tags: &'static [&'static str],
}
