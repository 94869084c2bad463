use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn flowscope_in(dir: &Path, args: &[&str], env_vars: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_flowscope"));
    cmd.args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env("XDG_DATA_HOME", dir.join(".local/share"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    for (key, value) in env_vars {
        cmd.env(key, value);
    }
    cmd.output().expect("Failed to execute flowscope command")
}

fn run_flowscope(args: &[&str]) -> Output {
    let dir = TempDir::new().unwrap();
    flowscope_in(dir.path(), args, &[])
}

fn output_to_string(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr_to_string(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

mod version_command_tests {
    use super::*;

    #[test]
    fn test_version_command_basic() {
        let output = run_flowscope(&["version"]);
        let stdout = output_to_string(&output);

        assert!(output.status.success(), "version command should succeed");
        assert!(stdout.contains("flowscope"));
        assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_version_command_detailed() {
        let output = run_flowscope(&["version", "--detailed"]);
        let stdout = output_to_string(&output);

        assert!(output.status.success());
        assert!(stdout.contains("Version"));
        assert!(stdout.contains("Apache-2.0"));
        assert!(stdout.contains("Circuit Breaker"));
    }
}

mod help_tests {
    use super::*;

    #[test]
    fn test_help_lists_commands() {
        let output = run_flowscope(&["--help"]);
        let stdout = output_to_string(&output);

        assert!(output.status.success());
        for command in ["patterns", "scenarios", "run", "config", "version"] {
            assert!(stdout.contains(command), "help should mention {}", command);
        }
    }

    #[test]
    fn test_unknown_command_fails() {
        let output = run_flowscope(&["teleport"]);
        assert!(!output.status.success());
    }
}

mod patterns_command_tests {
    use super::*;

    #[test]
    fn test_patterns_lists_catalog() {
        let output = run_flowscope(&["patterns"]);
        let stdout = output_to_string(&output);

        assert!(output.status.success());
        for slug in [
            "request-response",
            "async-messaging",
            "outbox",
            "saga",
            "circuit-breaker",
            "pub-sub",
        ] {
            assert!(stdout.contains(slug), "missing {}", slug);
        }
    }

    #[test]
    fn test_patterns_json() {
        let output = run_flowscope(&["patterns", "--format", "json"]);
        assert!(output.status.success());

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 6);
        assert_eq!(json[0]["id"], "request-response");
    }

    #[test]
    fn test_patterns_search() {
        let output = run_flowscope(&["patterns", "--search", "kafka", "--format", "json"]);
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

        let ids: Vec<_> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap().to_string())
            .collect();
        assert!(ids.contains(&"async-messaging".to_string()));
        assert!(ids.contains(&"outbox".to_string()));
    }
}

mod scenarios_command_tests {
    use super::*;

    #[test]
    fn test_scenarios_for_outbox() {
        let output = run_flowscope(&["scenarios", "outbox"]);
        let stdout = output_to_string(&output);

        assert!(output.status.success());
        assert!(stdout.contains("happy-path"));
        assert!(stdout.contains("kafka-down"));
        assert!(stdout.contains("relay-crash"));
    }

    #[test]
    fn test_scenarios_accepts_name() {
        let output = run_flowscope(&["scenarios", "Circuit Breaker", "--format", "json"]);
        assert!(output.status.success());

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["pattern"]["id"], "circuit-breaker");
        assert_eq!(json["scenarios"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_unknown_pattern_reports_code() {
        let output = run_flowscope(&["scenarios", "blockchain"]);
        let stderr = stderr_to_string(&output);

        assert!(!output.status.success());
        assert!(stderr.contains("E3001"));
        assert!(stderr.contains("flowscope patterns"));
    }
}

mod config_command_tests {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let output = run_flowscope(&["config", "show", "--format", "json"]);
        assert!(output.status.success());

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["playback"]["speed"], 1.0);
        assert_eq!(json["tui"]["theme"], "Tokyo Night");
    }

    #[test]
    fn test_config_reads_local_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("flowscope.toml"),
            "[playback]\nspeed = 2.0\n\n[patterns]\nkafka_lag_ms = 1500\n",
        )
        .unwrap();

        let output = flowscope_in(dir.path(), &["config", "show", "--format", "json"], &[]);
        assert!(output.status.success());

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["playback"]["speed"], 2.0);
        assert_eq!(json["patterns"]["kafka_lag_ms"], 1500);
    }

    #[test]
    fn test_config_env_override() {
        let dir = TempDir::new().unwrap();
        let output = flowscope_in(
            dir.path(),
            &["config", "show", "--format", "json"],
            &[("FLOWSCOPE__TUI__THEME", "Nord")],
        );
        assert!(output.status.success());

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["tui"]["theme"], "Nord");
    }

    #[test]
    fn test_invalid_speed_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("flowscope.toml"), "[playback]\nspeed = 9.0\n").unwrap();

        let output = flowscope_in(dir.path(), &["config", "show"], &[]);
        assert!(!output.status.success());
        assert!(stderr_to_string(&output).contains("E2002"));
    }

    #[test]
    fn test_config_path() {
        let output = run_flowscope(&["config", "path"]);
        let stdout = output_to_string(&output);

        assert!(output.status.success());
        assert!(stdout.contains("flowscope.toml"));
    }
}
