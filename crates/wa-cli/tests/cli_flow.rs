//! End-to-end tests for the `wa` binary.
//!
//! Tests the full pipeline: record → gaps → collect → reconstruct → prefill → status

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn wa_binary() -> String {
    env!("CARGO_BIN_EXE_wa").to_string()
}

/// Runs `wa` with an isolated home directory and the given config file.
fn wa(home: &Path, config: &Path, args: &[&str]) -> Output {
    Command::new(wa_binary())
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_DATA_HOME", home.join(".local/share"))
        .env_remove("WA_DATABASE_PATH")
        .env_remove("WA_USER_ID")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("failed to run wa")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "wa should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_str(&stdout(output)).expect("stdout should be JSON")
}

struct Workspace {
    temp: TempDir,
}

impl Workspace {
    fn new(with_connector: bool) -> Self {
        let temp = TempDir::new().unwrap();
        let export = temp.path().join("export.json");
        std::fs::write(
            &export,
            r#"[
                {"type": "document", "id": "d1", "timestamp": "2025-01-02T10:00:00Z", "metadata": {"title": "Motion to compel", "status": "filed", "matter_id": "M-1"}},
                {"type": "email", "id": "e1", "timestamp": "2025-01-02T15:00:00Z", "metadata": {"subject": "Re: motion", "sent": true}},
                {"type": "email", "id": "e2", "timestamp": "2025-01-02T15:10:00Z", "metadata": {"subject": "Re: motion"}}
            ]"#,
        )
        .unwrap();

        let mut config = format!(
            "database_path = '{}'\nuser_id = 'jdoe'\n",
            temp.path().join("wa.db").display()
        );
        if with_connector {
            config.push_str(&format!(
                "\n[[connectors]]\nkind = 'file'\nname = 'export'\npath = '{}'\n",
                export.display()
            ));
        }
        std::fs::write(temp.path().join("wa.toml"), config).unwrap();

        std::fs::write(
            temp.path().join("entries.json"),
            r#"[{"date": "2025-01-01", "hours": 8.0, "matter_id": "M-1", "description": "Trial prep"}]"#,
        )
        .unwrap();

        Self { temp }
    }

    fn run(&self, args: &[&str]) -> Output {
        wa(self.temp.path(), &self.temp.path().join("wa.toml"), args)
    }

    fn path(&self, name: &str) -> String {
        self.temp.path().join(name).display().to_string()
    }
}

#[test]
fn test_full_pipeline() {
    let ws = Workspace::new(true);

    let recorded = stdout(&ws.run(&["record", &ws.path("entries.json")]));
    assert_eq!(recorded.trim(), "Recorded 1 entries (8.00h).");

    let gaps = json(&ws.run(&[
        "gaps",
        "--start",
        "2025-01-01",
        "--end",
        "2025-01-03",
        "--json",
    ]));
    let dates: Vec<&str> = gaps["gaps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|gap| gap["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2025-01-02", "2025-01-03"]);

    let collection = json(&ws.run(&[
        "collect",
        "--start",
        "2025-01-01",
        "--end",
        "2025-01-03",
        "--json",
    ]));
    assert_eq!(collection["artifacts"].as_array().unwrap().len(), 3);
    assert_eq!(collection["artifacts"][0]["evidence_kind"], "direct");

    let reconstruction = json(&ws.run(&[
        "reconstruct",
        "--start",
        "2025-01-02T00:00:00Z",
        "--end",
        "2025-01-03T00:00:00Z",
        "--json",
    ]));
    assert_eq!(
        reconstruction["reconstruction"]["evidence"]["total_artifacts"],
        3
    );
    for entry in reconstruction["entries"].as_array().unwrap() {
        assert_eq!(entry["review_required"], true);
        assert!(entry["compliance_warning"].is_string());
    }

    let prefill = json(&ws.run(&[
        "prefill",
        "--start",
        "2025-01-01",
        "--end",
        "2025-01-03",
        "--json",
    ]));
    let entries = prefill["prefill"]["entries"].as_array().unwrap();
    let descriptions: Vec<&str> = entries
        .iter()
        .map(|entry| entry["description"].as_str().unwrap())
        .collect();
    assert_eq!(
        descriptions,
        vec![
            "Drafted motion: Motion to compel",
            "Email correspondence (2 emails)",
            "General legal work (reconstruction)",
        ]
    );
    assert_eq!(entries[2]["confidence"], "low");
    assert_eq!(entries[2]["evidence_kind"], "pattern");

    let status = stdout(&ws.run(&["status"]));
    assert!(status.contains("Recorded entries: 1"));
    assert!(status.contains("Reconstructions: 1"));
    assert!(status.contains("- export (file)"));
}

#[test]
fn test_saved_collection_feeds_reconstruct() {
    let ws = Workspace::new(true);

    let collected = ws.run(&[
        "collect",
        "--start",
        "2025-01-02",
        "--end",
        "2025-01-02",
        "--json",
    ]);
    let saved = ws.path("collection.json");
    std::fs::write(&saved, stdout(&collected)).unwrap();

    let reconstruction = json(&ws.run(&[
        "reconstruct",
        "--start",
        "2025-01-02T09:00:00Z",
        "--end",
        "2025-01-02T17:00:00Z",
        "--artifacts",
        &saved,
        "--matter",
        "M-1",
        "--json",
    ]));
    assert_eq!(reconstruction["classification"]["non_billable_hours"], 0.0);
}

#[test]
fn test_reconstruct_without_sources_fails() {
    let ws = Workspace::new(false);

    let output = ws.run(&["reconstruct", "--start", "2025-01-02T00:00:00Z"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("no evidence sources configured"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn test_invalid_dates_are_rejected() {
    let ws = Workspace::new(false);

    let output = ws.run(&["gaps", "--start", "2025-01-03", "--end", "2025-01-01"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid date range"));
}

#[test]
fn test_no_subcommand_prints_help() {
    let ws = Workspace::new(false);

    let output = stdout(&ws.run(&[]));
    assert!(output.contains("Usage:"));
    assert!(output.contains("prefill"));
}
