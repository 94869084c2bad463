use serde::{Deserialize, Serialize};

/// Width and height of the virtual canvas every topology is laid out on.
pub const CANVAS_SIZE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation towards `other`, `t` clamped to `[0, 1]`.
    pub fn lerp(&self, other: &Position, t: f64) -> Position {
        let t = t.clamp(0.0, 1.0);
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Client,
    Gateway,
    Service,
    Cache,
    Database,
    Broker,
    Worker,
}

impl ServiceKind {
    pub fn icon(&self) -> &'static str {
        match self {
            ServiceKind::Client => "◉",
            ServiceKind::Gateway => "⇄",
            ServiceKind::Service => "▣",
            ServiceKind::Cache => "⚡",
            ServiceKind::Database => "⛁",
            ServiceKind::Broker => "☰",
            ServiceKind::Worker => "⚙",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    #[default]
    Healthy,
    Degraded,
    Down,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceStatus::Healthy => write!(f, "healthy"),
            ServiceStatus::Degraded => write!(f, "degraded"),
            ServiceStatus::Down => write!(f, "down"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceNode {
    pub id: String,
    pub label: String,
    pub kind: ServiceKind,
    pub position: Position,
}

/// The services of one pattern and where they sit on the canvas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub nodes: Vec<ServiceNode>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(
        mut self,
        id: impl Into<String>,
        label: impl Into<String>,
        kind: ServiceKind,
        x: f64,
        y: f64,
    ) -> Self {
        self.nodes.push(ServiceNode {
            id: id.into(),
            label: label.into(),
            kind,
            position: Position::new(x.clamp(0.0, CANVAS_SIZE), y.clamp(0.0, CANVAS_SIZE)),
        });
        self
    }

    pub fn node(&self, id: &str) -> Option<&ServiceNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Position of a service, or the canvas origin for unknown ids.
    pub fn position(&self, id: &str) -> Position {
        self.node(id).map(|n| n.position).unwrap_or_default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
