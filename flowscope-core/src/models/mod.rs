mod flow;
mod ledger;
mod pattern;
mod topology;

pub use flow::{FlowKind, MessageFlow};
pub use ledger::{
    BreakerCall, BreakerState, CallOutcome, Delivery, DeliveryStatus, LedgerRow, LedgerTable,
    OutboxEntry, OutboxStatus, QueueStatus, QueuedEvent, RowTone, SagaTxStatus,
    TransactionLogEntry,
};
pub use pattern::{Difficulty, PatternCategory, PatternId, PatternInfo};
pub use topology::{Position, ServiceKind, ServiceNode, ServiceStatus, Topology, CANVAS_SIZE};
