use std::fs;
use std::process::{Command, Output};

fn gapnet(dir: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gapnet"))
        .args(args)
        .current_dir(dir)
        .env("RUST_LOG", "warn")
        .output()
        .expect("spawn gapnet")
}

#[test]
fn two_arguments_exit_with_status_one() {
    let dir = tempfile::tempdir().unwrap();
    let out = gapnet(dir.path(), &["a.json", "b.json"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("More than one"));
}

#[test]
fn missing_file_exits_with_status_one() {
    let dir = tempfile::tempdir().unwrap();
    let out = gapnet(dir.path(), &["missing.json"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Unable to open input parameter file"));
}

#[test]
fn flag_like_arguments_are_paths() {
    let dir = tempfile::tempdir().unwrap();
    for arg in ["--bogus", "-x.json", "--help", "--version"] {
        let out = gapnet(dir.path(), &[arg]);
        assert_eq!(out.status.code(), Some(1), "argument {}", arg);
    }
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn config_file_run_writes_traces() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("params.json"),
        r#"{"duration": 5, "gap-junctions": true, "foo": 1}"#,
    )
    .unwrap();

    let out = gapnet(dir.path(), &["params.json"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(dir.path().join("arb_cell0_v.json").exists());
    assert!(dir.path().join("arb_cell1_v.json").exists());
}

#[test]
fn defaults_exit_with_status_zero() {
    let dir = tempfile::tempdir().unwrap();
    let out = gapnet(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(0));

    let text = fs::read_to_string(dir.path().join("arb_cell1_v.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc["cell"], "1");
    assert_eq!(doc["data"]["time"].as_array().unwrap().len(), 12000);
}

#[test]
fn jsonify_converts_and_reports_errors() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("t.txt"), "0\n0.025\n").unwrap();
    fs::write(dir.path().join("v.txt"), "-65\n-64.8\n\n").unwrap();

    let run = |args: &[&str]| {
        Command::new(env!("CARGO_BIN_EXE_jsonify"))
            .args(args)
            .current_dir(dir.path())
            .output()
            .expect("spawn jsonify")
    };

    let ok = run(&["t.txt", "v.txt", "neuron.json"]);
    assert_eq!(ok.status.code(), Some(0));
    let text = fs::read_to_string(dir.path().join("neuron.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc["name"], "neuron");

    assert_eq!(run(&["t.txt", "nope.txt", "x.json"]).status.code(), Some(1));
    assert_eq!(run(&["t.txt"]).status.code(), Some(1));
}
