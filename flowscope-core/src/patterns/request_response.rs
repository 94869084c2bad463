use crate::event_log::LogKind;
use crate::models::{FlowKind, LedgerTable, PatternId, RowTone, ServiceKind, ServiceStatus, Topology};
use crate::playback::{Scenario, ScenarioInfo, Step, StepContext};

use super::{ControlInfo, ControlKind, Indicator, PatternControl, PatternDefinition, PatternState, ViewState};
use crate::error::FlowscopeResult;

type Ctx = StepContext<RequestResponseState>;

/// Latency of a read that had to go to Postgres because Redis was down.
const UNCACHED_LATENCY_MS: u64 = 85;

static SCENARIOS: [ScenarioInfo; 3] = [
    ScenarioInfo {
        id: "cache-hit",
        name: "Cache Hit",
        description: "The user is in Redis; Postgres is never touched.",
    },
    ScenarioInfo {
        id: "cache-miss",
        name: "Cache Miss",
        description: "Redis misses, the service reads Postgres and fills the cache.",
    },
    ScenarioInfo {
        id: "redis-down",
        name: "Redis Down",
        description: "The cache is unreachable and every read falls through to the database.",
    },
];

static CONTROLS: [ControlInfo; 1] = [ControlInfo {
    kind: ControlKind::ToggleDependency,
    label: "Redis",
    description: "Take the cache down or bring it back",
}];

#[derive(Debug, Clone)]
pub struct RequestResponseState {
    view: ViewState,
    pub redis_enabled: bool,
    pub last_latency_ms: Option<u64>,
    pub cache_hits: u32,
    pub cache_misses: u32,
    pub db_queries: u32,
}

impl Default for RequestResponseState {
    fn default() -> Self {
        Self {
            view: ViewState::default(),
            redis_enabled: true,
            last_latency_ms: None,
            cache_hits: 0,
            cache_misses: 0,
            db_queries: 0,
        }
    }
}

impl PatternState for RequestResponseState {
    fn view(&self) -> &ViewState {
        &self.view
    }

    fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    fn reset_for_scenario(&mut self, name: &str) {
        self.view.start_scenario(name);
        self.last_latency_ms = None;
        self.cache_hits = 0;
        self.cache_misses = 0;
        self.db_queries = 0;
        if !self.redis_enabled {
            self.view.set_status("redis", ServiceStatus::Down);
        }
    }

    fn ledger(&self) -> Option<LedgerTable> {
        let mut table = LedgerTable::new("Cache", &["Metric", "Value"]);
        table.push(
            vec!["Hits".into(), self.cache_hits.to_string()],
            RowTone::Good,
        );
        table.push(
            vec!["Misses".into(), self.cache_misses.to_string()],
            if self.cache_misses > 0 { RowTone::Warn } else { RowTone::Neutral },
        );
        table.push(
            vec!["DB queries".into(), self.db_queries.to_string()],
            RowTone::Neutral,
        );
        Some(table)
    }

    fn indicators(&self) -> Vec<Indicator> {
        vec![
            Indicator::new(
                "Redis",
                if self.redis_enabled { "up" } else { "down" },
                if self.redis_enabled { RowTone::Good } else { RowTone::Bad },
            ),
            Indicator::new(
                "Latency",
                self.last_latency_ms
                    .map(|ms| format!("{}ms", ms))
                    .unwrap_or_else(|| "-".to_string()),
                match self.last_latency_ms {
                    Some(ms) if ms > 50 => RowTone::Warn,
                    Some(_) => RowTone::Good,
                    None => RowTone::Neutral,
                },
            ),
        ]
    }

    fn apply_control(&mut self, control: PatternControl) -> FlowscopeResult<()> {
        if control == PatternControl::ToggleDependency {
            self.redis_enabled = !self.redis_enabled;
            let status = if self.redis_enabled {
                ServiceStatus::Healthy
            } else {
                ServiceStatus::Down
            };
            self.view.set_status("redis", status);
            self.view.log(
                format!("Redis manually {}", if self.redis_enabled { "enabled" } else { "disabled" }),
                LogKind::Warning,
            );
        }
        Ok(())
    }
}

pub struct RequestResponsePattern;

impl PatternDefinition for RequestResponsePattern {
    type State = RequestResponseState;

    fn id(&self) -> PatternId {
        PatternId::RequestResponse
    }

    fn topology(&self) -> Topology {
        Topology::new()
            .with_node("client", "Client", ServiceKind::Client, 8.0, 50.0)
            .with_node("gateway", "API Gateway", ServiceKind::Gateway, 30.0, 50.0)
            .with_node("api", "User Service", ServiceKind::Service, 55.0, 50.0)
            .with_node("redis", "Redis", ServiceKind::Cache, 85.0, 22.0)
            .with_node("postgres", "Postgres", ServiceKind::Database, 85.0, 78.0)
    }

    fn scenarios(&self) -> &'static [ScenarioInfo] {
        &SCENARIOS
    }

    fn build(&self, scenario_id: &str) -> Option<Scenario<RequestResponseState>> {
        match scenario_id {
            "cache-hit" => Some(cache_hit()),
            "cache-miss" => Some(cache_miss()),
            "redis-down" => Some(redis_down()),
            _ => None,
        }
    }

    fn controls(&self) -> &'static [ControlInfo] {
        &CONTROLS
    }
}

fn client_request() -> Step<RequestResponseState> {
    Step::new(
        "The client sends GET /users/42 to the API gateway.",
        1500,
        |ctx: Ctx| async move {
            ctx.log("Client: GET /users/42", LogKind::Request).await;
            ctx.send("client", "gateway", FlowKind::Http, "GET /users/42").await;
            ctx.delay(800).await;
            Ok(())
        },
    )
}

fn gateway_route() -> Step<RequestResponseState> {
    Step::new(
        "The gateway authenticates the call and routes it to the User Service.",
        1200,
        |ctx: Ctx| async move {
            ctx.send("gateway", "api", FlowKind::Http, "GET /users/42").await;
            ctx.log("Gateway: routing to User Service", LogKind::Info).await;
            ctx.delay(600).await;
            Ok(())
        },
    )
}

fn cache_lookup() -> Step<RequestResponseState> {
    Step::new(
        "Cache-aside: the service always asks Redis before the database.",
        1200,
        |ctx: Ctx| async move {
            if !ctx.read(|s| s.redis_enabled).await {
                ctx.send_result("api", "redis", FlowKind::Cache, "GET user:42", false)
                    .await;
                ctx.log("Redis: connection refused", LogKind::Error).await;
                ctx.delay(500).await;
                return Ok(());
            }
            ctx.send("api", "redis", FlowKind::Cache, "GET user:42").await;
            ctx.log("User Service: GET user:42 from Redis", LogKind::Request)
                .await;
            ctx.delay(500).await;
            Ok(())
        },
    )
}

/// Reads the user straight from Postgres when the cache cannot answer.
async fn read_through_postgres(ctx: &Ctx) {
    ctx.send("api", "postgres", FlowKind::Db, "SELECT user 42")
        .await;
    ctx.update(|s| s.db_queries += 1).await;
    ctx.log(
        "User Service: cache unavailable, reading from Postgres",
        LogKind::Warning,
    )
    .await;
    ctx.delay(900).await;
    ctx.send_result("postgres", "api", FlowKind::Db, "1 row", true)
        .await;
    ctx.log("Postgres: 1 row (35ms)", LogKind::Info).await;
}

fn respond(latency_ms: u64) -> Step<RequestResponseState> {
    Step::new(
        "The response travels back through the gateway to the client.",
        1500,
        move |ctx: Ctx| async move {
            let latency_ms = if ctx.read(|s| s.redis_enabled).await {
                latency_ms
            } else {
                latency_ms.max(UNCACHED_LATENCY_MS)
            };
            ctx.send_result("api", "client", FlowKind::Http, "200 OK", true)
                .await;
            ctx.update(|s| s.last_latency_ms = Some(latency_ms)).await;
            ctx.log(format!("Client: 200 OK in {}ms", latency_ms), LogKind::Success)
                .await;
            ctx.delay(800).await;
            Ok(())
        },
    )
}

fn cache_hit() -> Scenario<RequestResponseState> {
    Scenario::new(
        "Cache Hit",
        vec![
            client_request(),
            gateway_route(),
            cache_lookup(),
            Step::new(
                "Hit: Redis has the user and answers in about 2 ms.",
                1200,
                |ctx: Ctx| async move {
                    if !ctx.read(|s| s.redis_enabled).await {
                        read_through_postgres(&ctx).await;
                        return Ok(());
                    }
                    ctx.send_result("redis", "api", FlowKind::Cache, "HIT user:42", true)
                        .await;
                    ctx.update(|s| s.cache_hits += 1).await;
                    ctx.log("Redis: HIT user:42 (2ms)", LogKind::Success).await;
                    ctx.delay(500).await;
                    Ok(())
                },
            ),
            respond(12),
            Step::new(
                "Postgres was never queried. Hot keys stay cheap.",
                800,
                |ctx: Ctx| async move {
                    ctx.clear_flows().await;
                    let queries = ctx.read(|s| s.db_queries).await;
                    ctx.log(
                        format!("Postgres: {} queries for this request", queries),
                        LogKind::Info,
                    )
                    .await;
                    ctx.delay(300).await;
                    Ok(())
                },
            ),
        ],
    )
}

fn cache_miss() -> Scenario<RequestResponseState> {
    Scenario::new(
        "Cache Miss",
        vec![
            client_request(),
            gateway_route(),
            cache_lookup(),
            Step::new(
                "Miss: the key is not in Redis (first read, or it expired).",
                1200,
                |ctx: Ctx| async move {
                    if !ctx.read(|s| s.redis_enabled).await {
                        ctx.log("User Service: no cache answer, going to Postgres", LogKind::Warning)
                            .await;
                        ctx.delay(500).await;
                        return Ok(());
                    }
                    ctx.send_result("redis", "api", FlowKind::Cache, "MISS user:42", false)
                        .await;
                    ctx.update(|s| s.cache_misses += 1).await;
                    ctx.log("Redis: MISS user:42", LogKind::Warning).await;
                    ctx.delay(500).await;
                    Ok(())
                },
            ),
            Step::new(
                "The service falls back to Postgres, the slow path.",
                1500,
                |ctx: Ctx| async move {
                    ctx.send("api", "postgres", FlowKind::Db, "SELECT user 42")
                        .await;
                    ctx.update(|s| s.db_queries += 1).await;
                    ctx.log("User Service: SELECT * FROM users WHERE id = 42", LogKind::Request)
                        .await;
                    ctx.delay(900).await;
                    ctx.send_result("postgres", "api", FlowKind::Db, "1 row", true)
                        .await;
                    ctx.log("Postgres: 1 row (35ms)", LogKind::Info).await;
                    Ok(())
                },
            ),
            Step::new(
                "The result is written back to Redis with a TTL so the next read hits.",
                1200,
                |ctx: Ctx| async move {
                    if !ctx.read(|s| s.redis_enabled).await {
                        ctx.log("User Service: cache write skipped, Redis is down", LogKind::Warning)
                            .await;
                        ctx.delay(500).await;
                        return Ok(());
                    }
                    ctx.send("api", "redis", FlowKind::Cache, "SET user:42 EX 300")
                        .await;
                    ctx.log("Redis: SET user:42 (TTL 300s)", LogKind::Info).await;
                    ctx.delay(500).await;
                    Ok(())
                },
            ),
            respond(48),
        ],
    )
}

fn redis_down() -> Scenario<RequestResponseState> {
    Scenario::new(
        "Redis Down",
        vec![
            client_request(),
            gateway_route(),
            Step::new(
                "The cache lookup fails: Redis is unreachable.",
                1500,
                |ctx: Ctx| async move {
                    ctx.set_status("redis", ServiceStatus::Down).await;
                    ctx.send_result("api", "redis", FlowKind::Cache, "GET user:42", false)
                        .await;
                    ctx.log("Redis: connection refused", LogKind::Error).await;
                    ctx.delay(600).await;
                    Ok(())
                },
            ),
            Step::new(
                "The service degrades gracefully and reads from Postgres instead of failing.",
                1500,
                |ctx: Ctx| async move {
                    ctx.send("api", "postgres", FlowKind::Db, "SELECT user 42")
                        .await;
                    ctx.update(|s| s.db_queries += 1).await;
                    ctx.log(
                        "User Service: cache unavailable, reading from Postgres",
                        LogKind::Warning,
                    )
                    .await;
                    ctx.delay(900).await;
                    Ok(())
                },
            ),
            Step::new(
                "Every read now lands on the database and its load climbs.",
                1500,
                |ctx: Ctx| async move {
                    ctx.send_result("postgres", "api", FlowKind::Db, "1 row", true)
                        .await;
                    ctx.set_status("postgres", ServiceStatus::Degraded).await;
                    ctx.log("Postgres: load rising without the cache", LogKind::Warning)
                        .await;
                    ctx.delay(600).await;
                    Ok(())
                },
            ),
            respond(85),
            Step::new(
                "Redis comes back; the cache warms up and Postgres load drops.",
                1200,
                |ctx: Ctx| async move {
                    ctx.clear_flows().await;
                    let enabled = ctx.read(|s| s.redis_enabled).await;
                    if enabled {
                        ctx.set_status("redis", ServiceStatus::Healthy).await;
                        ctx.log("Redis: connection restored", LogKind::Success).await;
                    } else {
                        ctx.log("Redis: still disabled", LogKind::Warning).await;
                    }
                    ctx.set_status("postgres", ServiceStatus::Healthy).await;
                    ctx.delay(400).await;
                    Ok(())
                },
            ),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{PatternController, PatternSession};
    use crate::timing::Pacer;

    fn session() -> PatternSession<RequestResponsePattern> {
        PatternSession::new(RequestResponsePattern, Pacer::instant())
    }

    async fn messages(session: &PatternSession<RequestResponsePattern>) -> Vec<String> {
        session
            .with_state(|s| s.view().logs().entries().map(|e| e.message.clone()).collect())
            .await
    }

    #[tokio::test]
    async fn test_cache_hit_skips_postgres() {
        let session = session();
        let steps = session.run_to_completion("cache-hit").await.unwrap();
        assert_eq!(steps, 6);

        let (hits, queries, latency) = session
            .with_state(|s| (s.cache_hits, s.db_queries, s.last_latency_ms))
            .await;
        assert_eq!(hits, 1);
        assert_eq!(queries, 0);
        assert_eq!(latency, Some(12));

        let logs = messages(&session).await;
        assert_eq!(logs.first().map(String::as_str), Some("Client: GET /users/42"));
        assert!(logs.iter().any(|m| m.contains("HIT user:42")));
    }

    #[tokio::test]
    async fn test_cache_miss_fills_cache() {
        let session = session();
        session.run_to_completion("cache-miss").await.unwrap();

        let (misses, queries) = session.with_state(|s| (s.cache_misses, s.db_queries)).await;
        assert_eq!(misses, 1);
        assert_eq!(queries, 1);

        let logs = messages(&session).await;
        let miss = logs.iter().position(|m| m.contains("MISS")).unwrap();
        let set = logs.iter().position(|m| m.contains("SET user:42")).unwrap();
        assert!(miss < set);
    }

    #[tokio::test]
    async fn test_redis_down_recovers() {
        let session = session();
        session.run_to_completion("redis-down").await.unwrap();

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.statuses["redis"], ServiceStatus::Healthy);
        assert_eq!(snapshot.statuses["postgres"], ServiceStatus::Healthy);
        assert!(snapshot.flows.is_empty());
        assert!(snapshot
            .logs
            .iter()
            .any(|l| l.message == "Redis: connection refused" && l.kind == LogKind::Error));
    }

    #[tokio::test]
    async fn test_toggle_survives_reload() {
        let session = session();
        session
            .apply_control(PatternControl::ToggleDependency)
            .await
            .unwrap();
        session.load_scenario("cache-hit").await.unwrap();

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.statuses["redis"], ServiceStatus::Down);
        assert_eq!(snapshot.indicators[0].value, "down");

        let err = session
            .apply_control(PatternControl::SetLag(100))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "E3003");
    }

    #[tokio::test]
    async fn test_cache_hit_with_redis_disabled_reads_postgres() {
        let session = session();
        session
            .apply_control(PatternControl::ToggleDependency)
            .await
            .unwrap();
        session.run_to_completion("cache-hit").await.unwrap();

        let (hits, queries, latency) = session
            .with_state(|s| (s.cache_hits, s.db_queries, s.last_latency_ms))
            .await;
        assert_eq!(hits, 0);
        assert_eq!(queries, 1);
        assert_eq!(latency, Some(UNCACHED_LATENCY_MS));

        let logs = messages(&session).await;
        assert!(!logs.iter().any(|m| m.contains("HIT user:42")));
        assert!(logs.iter().any(|m| m == "Redis: connection refused"));
        assert!(logs.iter().any(|m| m == "Postgres: 1 queries for this request"));
    }

    #[tokio::test]
    async fn test_cache_miss_with_redis_disabled_skips_cache_write() {
        let session = session();
        session
            .apply_control(PatternControl::ToggleDependency)
            .await
            .unwrap();
        session.run_to_completion("cache-miss").await.unwrap();

        let (misses, queries) = session.with_state(|s| (s.cache_misses, s.db_queries)).await;
        assert_eq!(misses, 0);
        assert_eq!(queries, 1);

        let logs = messages(&session).await;
        assert!(!logs.iter().any(|m| m.starts_with("Redis: SET")));
        assert!(logs.iter().any(|m| m.contains("cache write skipped")));
    }
}
