use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

fn run_flowscope(args: &[&str]) -> Output {
    let dir = TempDir::new().unwrap();
    Command::new(env!("CARGO_BIN_EXE_flowscope"))
        .args(args)
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute flowscope command")
}

fn run_json(pattern: &str, scenario: &str, extra: &[&str]) -> Value {
    let mut args = vec!["run", pattern, scenario, "--instant", "--format", "json"];
    args.extend_from_slice(extra);
    let output = run_flowscope(&args);
    assert!(
        output.status.success(),
        "run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn logged(json: &Value) -> Vec<String> {
    json["snapshot"]["timeline"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|a| a["type"] == "log")
        .map(|a| a["message"].as_str().unwrap().to_string())
        .collect()
}

mod run_tests {
    use super::*;

    #[test]
    fn test_every_scenario_completes() {
        let catalog = run_flowscope(&["patterns", "--format", "json"]);
        let patterns: Value = serde_json::from_slice(&catalog.stdout).unwrap();

        for pattern in patterns.as_array().unwrap() {
            let slug = pattern["id"].as_str().unwrap();
            let listing = run_flowscope(&["scenarios", slug, "--format", "json"]);
            let listing: Value = serde_json::from_slice(&listing.stdout).unwrap();

            for scenario in listing["scenarios"].as_array().unwrap() {
                let id = scenario["id"].as_str().unwrap();
                let json = run_json(slug, id, &[]);
                let playback = &json["snapshot"]["playback"];

                assert_eq!(playback["phase"], "complete", "{}/{}", slug, id);
                assert_eq!(json["steps_executed"], playback["total_steps"]);
            }
        }
    }

    #[test]
    fn test_outbox_kafka_down_order() {
        let json = run_json("outbox", "kafka-down", &[]);
        let messages = logged(&json);

        let created = messages
            .iter()
            .position(|m| m == "Order Service: 201 Created")
            .unwrap();
        let first_kafka = messages
            .iter()
            .position(|m| m.starts_with("Kafka"))
            .unwrap();
        assert!(created < first_kafka);
        assert!(messages.contains(&"Kafka service restored".to_string()));

        let rows = json["snapshot"]["ledger"]["rows"].as_array().unwrap();
        assert_eq!(rows[0]["cells"][2], "published");
        assert_ne!(rows[0]["cells"][4], "-");
    }

    #[test]
    fn test_lag_flag_reaches_indicators() {
        let json = run_json("async-messaging", "happy-path", &["--lag", "2500"]);
        let indicators = json["snapshot"]["indicators"].as_array().unwrap();
        let lag = indicators
            .iter()
            .find(|i| i["label"] == "Consumer lag")
            .unwrap();
        assert_eq!(lag["value"], "2500ms");
    }

    #[test]
    fn test_lag_out_of_range_fails() {
        let output = run_flowscope(&[
            "run",
            "async-messaging",
            "happy-path",
            "--instant",
            "--lag",
            "9000",
        ]);
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("E3004"));
    }

    #[test]
    fn test_toggle_on_pattern_without_controls_fails() {
        let output = run_flowscope(&["run", "saga", "happy-path", "--instant", "--toggle"]);
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("E3003"));
    }

    #[test]
    fn test_unknown_scenario_fails() {
        let output = run_flowscope(&["run", "outbox", "meteor-strike", "--instant"]);
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("E3002"));
    }

    #[test]
    fn test_invalid_speed_fails() {
        let output = run_flowscope(&["run", "saga", "happy-path", "--speed", "7"]);
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("E2003"));
    }

    #[test]
    fn test_text_output_shows_steps() {
        let output = run_flowscope(&["run", "circuit-breaker", "trip-open", "--instant"]);
        let stdout = String::from_utf8_lossy(&output.stdout);

        assert!(output.status.success());
        assert!(stdout.contains("[1/"));
        assert!(stdout.contains("Scenario complete"));
        assert!(stdout.contains("Calls"));
    }
}
