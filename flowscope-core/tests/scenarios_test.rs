use flowscope_core::event_log::{LogKind, LOG_CAPACITY};
use flowscope_core::models::{PatternId, ServiceStatus};
use flowscope_core::patterns::{
    self, ActivityKind, PatternControl, PatternController, PatternSnapshot, ViewState,
};
use flowscope_core::playback::{PlaybackPhase, StepOutcome};
use flowscope_core::timing::Pacer;

fn log_messages(snapshot: &PatternSnapshot) -> Vec<String> {
    snapshot
        .timeline
        .iter()
        .filter_map(|a| match &a.kind {
            ActivityKind::Log { message, .. } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

fn position(messages: &[String], needle: &str) -> usize {
    messages
        .iter()
        .position(|m| m == needle)
        .unwrap_or_else(|| panic!("{:?} not logged", needle))
}

mod outbox_tests {
    use super::*;

    #[tokio::test]
    async fn test_kafka_down_order_is_accepted_before_recovery() {
        let session = patterns::create_session(PatternId::Outbox, Pacer::instant());
        let executed = session.run_to_completion("kafka-down").await.unwrap();
        assert!(executed > 0);

        let snapshot = session.snapshot().await;
        let messages = log_messages(&snapshot);

        let created = position(&messages, "Order Service: 201 Created");
        let unavailable = position(&messages, "Kafka: broker unavailable");
        let restored = position(&messages, "Kafka service restored");
        assert!(created < unavailable);
        assert!(unavailable < restored);
        for (i, message) in messages.iter().enumerate() {
            if message.contains("Kafka") {
                assert!(i > created, "{:?} logged before the order was accepted", message);
            }
        }

        let ledger = snapshot.ledger.unwrap();
        assert_eq!(ledger.rows.len(), 1);
        assert_eq!(ledger.rows[0].cells[2], "published");
        assert_ne!(ledger.rows[0].cells[4], "-");
        assert_eq!(snapshot.statuses["kafka"], ServiceStatus::Healthy);
        assert_eq!(snapshot.playback.phase, PlaybackPhase::Complete);
    }

    #[tokio::test]
    async fn test_kafka_status_changes_are_journaled() {
        let session = patterns::create_session(PatternId::Outbox, Pacer::instant());
        session.run_to_completion("kafka-down").await.unwrap();

        let changes: Vec<_> = session
            .snapshot()
            .await
            .timeline
            .into_iter()
            .filter_map(|a| match a.kind {
                ActivityKind::StatusChange { service, to, .. } if service == "kafka" => Some(to),
                _ => None,
            })
            .collect();
        assert_eq!(changes, vec![ServiceStatus::Down, ServiceStatus::Healthy]);
    }
}

mod play_tests {
    use super::*;

    #[tokio::test]
    async fn test_play_finishes_from_the_cursor() {
        let session = patterns::create_session(PatternId::RequestResponse, Pacer::instant());
        assert_eq!(session.play().await.unwrap(), 0);

        session.load_scenario("cache-hit").await.unwrap();
        assert_eq!(session.next_step().await.unwrap(), StepOutcome::Advanced);

        assert_eq!(session.play().await.unwrap(), 5);
        assert_eq!(session.playback().phase, PlaybackPhase::Complete);
        assert_eq!(session.play().await.unwrap(), 0);
    }
}

mod settings_tests {
    use super::*;

    #[tokio::test]
    async fn test_controls_survive_reload() {
        let session = patterns::create_session(PatternId::AsyncMessaging, Pacer::instant());
        session
            .apply_control(PatternControl::SetLag(1500))
            .await
            .unwrap();
        session
            .apply_control(PatternControl::ToggleDependency)
            .await
            .unwrap();

        session.load_scenario("happy-path").await.unwrap();
        session.load_scenario("consumer-lag").await.unwrap();

        let snapshot = session.snapshot().await;
        let lag = snapshot
            .indicators
            .iter()
            .find(|i| i.label == "Consumer lag")
            .unwrap();
        assert_eq!(lag.value, "1500ms");
        assert_eq!(snapshot.statuses["kafka"], ServiceStatus::Down);
        assert!(snapshot.ledger.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lag_above_limit_rejected() {
        let session = patterns::create_session(PatternId::AsyncMessaging, Pacer::instant());
        let err = session
            .apply_control(PatternControl::SetLag(5001))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "E3004");
    }

    #[tokio::test]
    async fn test_unsupported_control_rejected() {
        let session = patterns::create_session(PatternId::Saga, Pacer::instant());
        let err = session
            .apply_control(PatternControl::ToggleDependency)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "E3003");
    }
}

mod catalog_tests {
    use super::*;

    #[tokio::test]
    async fn test_every_scenario_runs_to_completion() {
        for info in patterns::catalog() {
            let session = patterns::create_session(info.id, Pacer::instant());
            for scenario in session.scenarios() {
                let steps = session.run_to_completion(scenario.id).await.unwrap();
                let playback = session.playback();
                assert_eq!(steps, playback.total_steps, "{}/{}", info.id, scenario.id);
                assert_eq!(session.next_step().await.unwrap(), StepOutcome::Complete);
            }
        }
    }

    #[tokio::test]
    async fn test_unknown_scenario() {
        let session = patterns::create_session(PatternId::PubSub, Pacer::instant());
        let err = session.load_scenario("does-not-exist").await.unwrap_err();
        assert_eq!(err.error_code(), "E3002");
        assert_eq!(session.playback().phase, PlaybackPhase::Idle);
    }

    #[test]
    fn test_find_by_slug_and_name() {
        assert_eq!(patterns::find("circuit-breaker").unwrap().id, PatternId::CircuitBreaker);
        assert_eq!(patterns::find("Pub/Sub").unwrap().id, PatternId::PubSub);
        assert_eq!(patterns::find("nope").unwrap_err().error_code(), "E3001");
    }

    #[test]
    fn test_search_ranks_prefix_first() {
        let results = patterns::search("saga");
        assert_eq!(results[0].id, PatternId::Saga);
        assert_eq!(patterns::search("").len(), patterns::catalog().len());
    }

    #[tokio::test]
    async fn test_snapshot_serializes() {
        let session = patterns::create_session(PatternId::RequestResponse, Pacer::instant());
        session.run_to_completion("cache-hit").await.unwrap();
        let json = serde_json::to_value(session.snapshot().await).unwrap();

        assert_eq!(json["pattern"], "request-response");
        assert_eq!(json["playback"]["phase"], "complete");
        assert!(json["timeline"][0]["type"] == "scenario_started");
    }
}

mod log_tests {
    use super::*;

    #[test]
    fn test_log_keeps_latest_ten() {
        let mut view = ViewState::default();
        for i in 0..15 {
            view.log(format!("event {}", i), LogKind::Info);
        }

        let logs = view.logs().to_vec();
        assert_eq!(logs.len(), LOG_CAPACITY);
        assert_eq!(logs[0].message, "event 5");
        assert_eq!(logs[9].message, "event 14");
        assert!(logs.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(view.timeline().len(), 15);
    }
}
