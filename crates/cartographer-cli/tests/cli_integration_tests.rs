//! CLI integration tests for cartographer
//!
//! Tests the cartographer CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const VIDEO_1: &str = r#"{
  "concepts": [
    {"name": "Python", "type": "lenguaje", "importance": 0.9},
    {"name": "Git", "type": "herramienta", "importance": 0.3},
    {"name": "Flask", "type": "framework", "importance": 0.6, "parent": "Python"}
  ],
  "relations": [
    {"from": "Flask", "to": "Python", "type": "usa", "strength": 0.8},
    {"from": "Flask", "to": "Django", "type": "alternativa", "strength": 0.5}
  ]
}"#;

const VIDEO_2: &str = r#"Here is what I found:
```json
{
  "concepts": [
    {"name": "python 3", "type": "lenguaje", "importance": 0.7},
    {"name": "git", "type": "herramienta", "importance": 0.3}
  ],
  "relations": []
}
```"#;

/// Isolated config and data directories for one test
struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn graph_path(&self) -> PathBuf {
        self.dir.path().join("data").join("graph.json")
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Command with config isolated and the graph file pinned via `--graph`
    fn cmd(&self) -> Command {
        let mut cmd = self.bare_cmd();
        cmd.arg("--graph").arg(self.graph_path());
        cmd
    }

    #[allow(deprecated)]
    fn bare_cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("cartographer").unwrap();
        cmd.env("CARTOGRAPHER_CONFIG_DIR", self.dir.path().join("config"));
        cmd.env("CARTOGRAPHER_DATA_DIR", self.dir.path().join("default-data"));
        cmd.env_remove("RUST_LOG");
        cmd
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    fn ingest(&self, document_id: &str, contents: &str) {
        let file = self.write(&format!("input/{}.txt", document_id), contents);
        self.cmd()
            .arg("ingest")
            .arg(document_id)
            .arg(file)
            .assert()
            .success();
    }
}

#[test]
fn test_help_lists_commands() {
    let env = Env::new();
    env.bare_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ingest"))
        .stdout(predicate::str::contains("related"))
        .stdout(predicate::str::contains("rebuild"));
}

#[test]
fn test_ingest_reports_counts() {
    let env = Env::new();
    let file = env.write("video-1.json", VIDEO_1);

    env.cmd()
        .args(["--format", "json", "ingest", "video-1"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"concepts_created\": 3"))
        .stdout(predicate::str::contains("\"relations_created\": 1"));

    assert!(env.graph_path().exists());
}

#[test]
fn test_ingest_from_stdin() {
    let env = Env::new();

    env.cmd()
        .args(["ingest", "video-2", "-"])
        .write_stdin(VIDEO_2)
        .assert()
        .success()
        .stdout(predicate::str::contains("Ingested 'video-2'"));

    env.cmd()
        .args(["concept", "PYTHON"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Python (lenguaje)"))
        .stdout(predicate::str::contains("python 3"));
}

#[test]
fn test_ingest_rejects_unparseable_output() {
    let env = Env::new();
    let file = env.write("broken.txt", "Sorry, I cannot help with that.");

    env.cmd()
        .args(["ingest", "broken"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Extraction could not be parsed"));

    assert!(!env.graph_path().exists());
}

#[test]
fn test_related_documents() {
    let env = Env::new();
    env.ingest("video-1", VIDEO_1);
    env.ingest("video-2", VIDEO_2);

    env.cmd()
        .args(["related", "video-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("video-2"))
        .stdout(predicate::str::contains("1.20"))
        .stdout(predicate::str::contains("Git, Python"));

    env.cmd()
        .args(["--format", "json", "related", "video-2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"document_id\": \"video-1\""));
}

#[test]
fn test_not_found_exits_zero() {
    let env = Env::new();

    env.cmd()
        .args(["related", "nope"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No related documents"));

    env.cmd()
        .args(["--format", "json", "related", "nope"])
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));

    env.cmd()
        .args(["--format", "json", "concept", "Haskell"])
        .assert()
        .success()
        .stdout(predicate::str::diff("null\n"));
}

#[test]
fn test_concept_lists_both_directions() {
    let env = Env::new();
    env.ingest("video-1", VIDEO_1);

    env.cmd()
        .args(["concept", "python"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Flask [usa] 0.80"));
}

#[test]
fn test_export_to_file() {
    let env = Env::new();
    env.ingest("video-1", VIDEO_1);
    let output = env.path().join("export.json");

    env.cmd()
        .args(["export", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 3 nodes and 1 edges"));

    let export: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(export["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(export["edges"][0]["source"], "Flask");
    assert_eq!(export["edges"][0]["target"], "Python");
}

#[test]
fn test_rebuild_from_directory() {
    let env = Env::new();
    env.ingest("stale", r#"{"concepts": [{"name": "Perl"}]}"#);

    env.write("extractions/video-1.json", VIDEO_1);
    env.write("extractions/video-2.json", VIDEO_2);
    env.write("extractions/video-3.json", "model timed out");

    env.cmd()
        .arg("rebuild")
        .arg(env.path().join("extractions"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Rebuilt graph from 3 documents"))
        .stdout(predicate::str::contains("video-3"));

    env.cmd()
        .args(["--format", "json", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"concepts\": 3"))
        .stdout(predicate::str::contains("\"documents\": 3"));

    env.cmd()
        .args(["--format", "json", "concept", "Perl"])
        .assert()
        .success()
        .stdout(predicate::str::diff("null\n"));
}

#[test]
fn test_corrupt_graph_fails_with_hint() {
    let env = Env::new();
    env.write("data/graph.json", "{ this is not json");

    env.cmd()
        .arg("stats")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is corrupt"))
        .stderr(predicate::str::contains("cartographer rebuild"));
}

#[test]
fn test_config_set_get_and_reset() {
    let env = Env::new();

    env.bare_cmd()
        .args(["config", "set", "query.related_limit", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set query.related_limit = 3"));

    env.bare_cmd()
        .args(["config", "get", "query.related_limit"])
        .assert()
        .success()
        .stdout(predicate::str::diff("3\n"));

    env.bare_cmd()
        .args(["config", "set", "query.related_limit", "0"])
        .assert()
        .failure();

    env.bare_cmd()
        .args(["config", "reset"])
        .assert()
        .success();

    env.bare_cmd()
        .args(["config", "get", "query.related_limit"])
        .assert()
        .success()
        .stdout(predicate::str::diff("10\n"));
}

#[test]
fn test_config_path_and_default_graph_location() {
    let env = Env::new();

    env.bare_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    env.bare_cmd()
        .args(["config", "get", "storage.graph_path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default-data"));

    let file = env.write("video-1.json", VIDEO_1);
    env.bare_cmd()
        .args(["ingest", "video-1"])
        .arg(&file)
        .assert()
        .success();
    assert!(env.path().join("default-data").join("graph.json").exists());
}

#[test]
fn test_configured_synonyms_apply() {
    let env = Env::new();
    let synonyms = env.write(
        "synonyms.toml",
        "[synonyms]\n\"flask framework\" = \"Flask\"\n",
    );

    env.bare_cmd()
        .args(["config", "set", "canonicalization.synonyms_path"])
        .arg(&synonyms)
        .assert()
        .success();

    env.ingest("video-1", VIDEO_1);

    env.cmd()
        .args(["--format", "json", "concept", "Flask Framework"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"Flask\""));
}

#[test]
fn test_config_rejects_synonyms_that_redirect_a_target() {
    let env = Env::new();
    let synonyms = env.write(
        "synonyms.toml",
        "[synonyms]\n\"machine learning\" = \"ML\"\n",
    );

    env.bare_cmd()
        .args(["config", "set", "canonicalization.synonyms_path"])
        .arg(&synonyms)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid synonym file"));

    env.bare_cmd()
        .args(["config", "get", "canonicalization.synonyms_path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("synonyms.toml").not());
}
