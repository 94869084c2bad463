#![allow(
    clippy::needless_borrows_for_generic_args,
    clippy::manual_range_contains,
    clippy::derivable_impls,
    clippy::type_complexity,
    clippy::len_zero
)]

pub mod config;
pub mod error;
pub mod event_log;
pub mod models;
pub mod patterns;
pub mod playback;
pub mod timing;

pub use config::{
    ensure_config_dir, ensure_data_dir, get_config_dir, get_data_dir, ConfigLoadError,
    FlowscopeConfig, LoggingConfig, PatternsConfig, PlaybackConfig, TuiConfig, MAX_KAFKA_LAG_MS,
};
pub use error::{CliErrorDisplay, FlowscopeError, FlowscopeResult};
pub use event_log::{LogEntry, LogKind, LogRecorder, LOG_CAPACITY};
pub use models::{
    BreakerState, Delivery, DeliveryStatus, Difficulty, FlowKind, LedgerRow, LedgerTable,
    MessageFlow, OutboxEntry, OutboxStatus, PatternCategory, PatternId, PatternInfo, Position,
    QueueStatus, QueuedEvent, RowTone, SagaTxStatus, ServiceKind, ServiceNode, ServiceStatus,
    Topology, TransactionLogEntry, CANVAS_SIZE,
};
pub use patterns::{
    catalog, create_session, find, search, Activity, ActivityKind, ControlInfo, ControlKind,
    Indicator, PatternController, PatternControl, PatternDefinition, PatternSession,
    PatternSnapshot, PatternState, ViewState,
};
pub use playback::{
    PlaybackEngine, PlaybackPhase, PlaybackSnapshot, Scenario, ScenarioInfo, Step, StepContext,
    StepOutcome,
};
pub use timing::{Pacer, SpeedControl, DEFAULT_SPEED, MAX_SPEED, MIN_SPEED, SPEED_STEP};
