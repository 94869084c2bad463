use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Publishing,
    Published,
}

impl std::fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutboxStatus::Pending => write!(f, "pending"),
            OutboxStatus::Publishing => write!(f, "publishing"),
            OutboxStatus::Published => write!(f, "published"),
        }
    }
}

/// A row of the outbox table, written in the same transaction as the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub status: OutboxStatus,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl OutboxEntry {
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            payload,
            status: OutboxStatus::Pending,
            created_at: Utc::now(),
            published_at: None,
        }
    }

    pub fn mark_publishing(&mut self) {
        self.status = OutboxStatus::Publishing;
    }

    /// Back to pending after a failed publish attempt.
    pub fn mark_pending(&mut self) {
        self.status = OutboxStatus::Pending;
        self.published_at = None;
    }

    pub fn mark_published(&mut self) {
        self.status = OutboxStatus::Published;
        self.published_at = Some(Utc::now());
    }

    pub fn is_published(&self) -> bool {
        self.status == OutboxStatus::Published
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaTxStatus {
    Success,
    Error,
    Compensating,
}

impl std::fmt::Display for SagaTxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SagaTxStatus::Success => write!(f, "success"),
            SagaTxStatus::Error => write!(f, "error"),
            SagaTxStatus::Compensating => write!(f, "compensating"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLogEntry {
    pub id: Uuid,
    pub step: String,
    pub action: String,
    pub status: SagaTxStatus,
    pub timestamp: DateTime<Utc>,
}

impl TransactionLogEntry {
    pub fn new(step: impl Into<String>, action: impl Into<String>, status: SagaTxStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            step: step.into(),
            action: action.into(),
            status,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Queued,
    Consumed,
    Retrying,
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueStatus::Queued => write!(f, "queued"),
            QueueStatus::Consumed => write!(f, "consumed"),
            QueueStatus::Retrying => write!(f, "retrying"),
        }
    }
}

/// An event sitting on a topic partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedEvent {
    pub offset: u64,
    pub event: String,
    pub status: QueueStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    #[default]
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "closed"),
            BreakerState::Open => write!(f, "open"),
            BreakerState::HalfOpen => write!(f, "half-open"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Success,
    Failure,
    Rejected,
}

impl std::fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallOutcome::Success => write!(f, "success"),
            CallOutcome::Failure => write!(f, "failure"),
            CallOutcome::Rejected => write!(f, "rejected"),
        }
    }
}

/// One call made through the circuit breaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerCall {
    pub attempt: u32,
    pub outcome: CallOutcome,
    /// Breaker state after the call was recorded.
    pub state: BreakerState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Pending,
    Filtered,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::Delivered => write!(f, "delivered"),
            DeliveryStatus::Pending => write!(f, "pending"),
            DeliveryStatus::Filtered => write!(f, "filtered"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub message: String,
    pub subscriber: String,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowTone {
    #[default]
    Neutral,
    Good,
    Warn,
    Bad,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub cells: Vec<String>,
    pub tone: RowTone,
}

/// Renderer-agnostic view of a pattern's ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTable {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<LedgerRow>,
}

impl LedgerTable {
    pub fn new(title: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            title: title.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, cells: Vec<String>, tone: RowTone) {
        self.rows.push(LedgerRow { cells, tone });
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
