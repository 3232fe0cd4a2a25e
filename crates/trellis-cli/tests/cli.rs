use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn trellis(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("trellis").unwrap();
    cmd.arg("--data-dir").arg(dir.path()).env_remove("RUST_LOG");
    cmd
}

fn add_node(dir: &TempDir, node_type: &str, label: &str) -> String {
    let output = trellis(dir)
        .args(["--format", "json", "node", "add", "-t", node_type, label])
        .output()
        .unwrap();
    assert!(output.status.success());
    let node: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    node["id"].as_str().unwrap().to_string()
}

fn add_edge(dir: &TempDir, from: &str, edge_type: &str, to: &str) {
    trellis(dir)
        .args(["edge", "add", from, edge_type, to])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created edge"));
}

#[test]
fn test_help() {
    Command::cargo_bin("trellis")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Typed graph engine"));
}

#[test]
fn test_node_add_and_list() {
    let dir = TempDir::new().unwrap();
    trellis(&dir)
        .args(["node", "add", "-t", "person", "Alice", "-p", "age=30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[person] Alice"));

    trellis(&dir)
        .args(["node", "list", "-t", "person"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice"));

    trellis(&dir)
        .args(["node", "list", "-t", "company"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No nodes found"));
}

#[test]
fn test_node_get_json() {
    let dir = TempDir::new().unwrap();
    let id = add_node(&dir, "person", "Alice");

    let output = trellis(&dir)
        .args(["--format", "json", "node", "get", &id])
        .output()
        .unwrap();
    assert!(output.status.success());
    let node: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(node["label"], "Alice");
}

#[test]
fn test_get_missing_node_fails() {
    let dir = TempDir::new().unwrap();
    trellis(&dir)
        .args(["node", "get", "01ARZ3NDEKTSV4RRFFQ69G5FAV"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Node not found"));
}

#[test]
fn test_invalid_confidence_rejected() {
    let dir = TempDir::new().unwrap();
    trellis(&dir)
        .args(["node", "add", "-t", "person", "Alice", "--confidence", "1.5"])
        .assert()
        .failure();
}

#[test]
fn test_edge_to_missing_node_fails() {
    let dir = TempDir::new().unwrap();
    let alice = add_node(&dir, "person", "Alice");
    trellis(&dir)
        .args(["edge", "add", &alice, "knows", "01ARZ3NDEKTSV4RRFFQ69G5FAV"])
        .assert()
        .failure();
}

#[test]
fn test_path_and_traverse() {
    let dir = TempDir::new().unwrap();
    let a = add_node(&dir, "person", "Alice");
    let b = add_node(&dir, "person", "Bob");
    let c = add_node(&dir, "person", "Carol");
    add_edge(&dir, &a, "knows", &b);
    add_edge(&dir, &b, "knows", &c);

    trellis(&dir)
        .args(["path", &a, &c])
        .assert()
        .success()
        .stdout(predicate::str::contains("Path of length 2"))
        .stdout(predicate::str::contains("Alice -> Bob -> Carol"));

    trellis(&dir)
        .args(["path", &c, &a])
        .assert()
        .success()
        .stdout(predicate::str::contains("No path found"));

    trellis(&dir)
        .args(["traverse", &a, "--depth", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bob"))
        .stdout(predicate::str::contains("Carol").not());
}

#[test]
fn test_search() {
    let dir = TempDir::new().unwrap();
    add_node(&dir, "person", "Alice Smith");
    add_node(&dir, "person", "Bob Jones");

    trellis(&dir)
        .args(["search", "smith"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice Smith"))
        .stdout(predicate::str::contains("Bob Jones").not());
}

#[test]
fn test_import_and_analyze() {
    let dir = TempDir::new().unwrap();
    let batch = dir.path().join("batch.json");
    std::fs::write(
        &batch,
        r#"{
            "nodes": [
                {"type": "person", "label": "Alice"},
                {"type": "person", "label": "Bob"},
                {"type": "person", "label": "Carol"}
            ],
            "edges": [
                {"type": "knows", "from_label": "Alice", "to_label": "Bob"},
                {"type": "knows", "from_label": "Bob", "to_label": "Carol"},
                {"type": "knows", "from_label": "Carol", "to_label": "Alice"},
                {"type": "knows", "from_label": "Alice", "to_label": "Nobody"}
            ]
        }"#,
    )
    .unwrap();

    let output = trellis(&dir)
        .args(["--format", "json", "import"])
        .arg(&batch)
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["nodes_created"], 3);
    assert_eq!(report["edges_created"], 3);
    assert_eq!(report["failures"].as_array().unwrap().len(), 1);

    trellis(&dir)
        .args(["analyze", "cycles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 cycles"));

    trellis(&dir)
        .args(["analyze", "cliques"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 cliques"));

    trellis(&dir)
        .args(["analyze", "pagerank"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice"));

    // Importing again merges into the existing nodes
    trellis(&dir)
        .arg("import")
        .arg(&batch)
        .assert()
        .success()
        .stdout(predicate::str::contains("Nodes: 0 created, 3 updated"));
}

#[test]
fn test_stats_and_reindex() {
    let dir = TempDir::new().unwrap();
    let a = add_node(&dir, "person", "Alice");
    let b = add_node(&dir, "person", "Bob");
    add_edge(&dir, &a, "knows", &b);

    let output = trellis(&dir)
        .args(["--format", "json", "stats"])
        .output()
        .unwrap();
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["node_count"], 2);
    assert_eq!(stats["edge_count"], 1);

    trellis(&dir)
        .arg("reindex")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reindexed 2 nodes and 1 edges"));
}

#[test]
fn test_redb_backend() {
    let dir = TempDir::new().unwrap();
    trellis(&dir)
        .args(["--backend", "redb", "node", "add", "-t", "person", "Alice"])
        .assert()
        .success();

    trellis(&dir)
        .args(["--backend", "redb", "node", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice"));
    assert!(dir.path().join("trellis.redb").exists());
}

#[test]
fn test_completions() {
    Command::cargo_bin("trellis")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trellis"));
}
