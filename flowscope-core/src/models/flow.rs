use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::topology::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Http,
    Event,
    Cache,
    Db,
}

impl std::fmt::Display for FlowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowKind::Http => write!(f, "http"),
            FlowKind::Event => write!(f, "event"),
            FlowKind::Cache => write!(f, "cache"),
            FlowKind::Db => write!(f, "db"),
        }
    }
}

/// One animated hop between two services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageFlow {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub kind: FlowKind,
    pub label: String,
    pub path: (Position, Position),
    /// `None` while in flight, then whether the hop succeeded.
    pub success: Option<bool>,
    pub started_at: DateTime<Utc>,
}

impl MessageFlow {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        kind: FlowKind,
        label: impl Into<String>,
        path: (Position, Position),
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from: from.into(),
            to: to.into(),
            kind,
            label: label.into(),
            path,
            success: None,
            started_at: Utc::now(),
        }
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    /// Fraction of the hop covered at `now` for an animation lasting `duration_ms`.
    pub fn progress(&self, now: DateTime<Utc>, duration_ms: u64) -> f64 {
        if duration_ms == 0 {
            return 1.0;
        }
        let elapsed = (now - self.started_at).num_milliseconds().max(0) as f64;
        (elapsed / duration_ms as f64).min(1.0)
    }

    pub fn position_at(&self, t: f64) -> Position {
        self.path.0.lerp(&self.path.1, t)
    }
}
