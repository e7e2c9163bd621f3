use logtriage_matcher::{MatchConfig, MatchEngine, MatchStage};
use pretty_assertions::assert_eq;
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

const KNOWLEDGE: &str = r#"{
  "entries": [
    {"Type/Source": "Connection failed", "Cause": "Network unreachable", "Solution": "Check the cabling"},
    {"error_text": "loading 'D:\\media\\clip.mov' failed", "cause": "Missing media", "solution": "Restore the file"},
    {"pattern": "Connection forcefully closed", "Cause": "Peer reset"},
    {"pattern": "   ", "Cause": "ignored"},
    {"error": "transferring file from 'a' to 'b' failed: disk full", "Fehler-Kategorie": "storage"}
  ]
}"#;

fn engine_with_file() -> MatchEngine {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("kb.json");
    fs::write(&path, KNOWLEDGE).expect("write kb");

    let engine = MatchEngine::new(MatchConfig::default()).expect("engine");
    engine.load_json_file(&path).expect("load kb");
    engine
}

#[test]
fn loads_aliased_rows_and_skips_blank_patterns() {
    let engine = engine_with_file();
    let kb = engine.knowledge();

    assert_eq!(kb.len(), 4);
    assert_eq!(kb.report().skipped_blank, 1);
    assert_eq!(kb.report().partial, 2);
    assert_eq!(kb.entries()[3].category(), Some("storage"));
}

#[test]
fn every_stage_is_reachable() {
    let engine = engine_with_file();

    let cases = [
        ("connection FAILED", MatchStage::Exact),
        ("4x Connection failed", MatchStage::Normalized),
        (r"loading 'E:\takes\take2.mov' failed", MatchStage::Normalized),
        (
            "transferring file from 'x:/in' to 'y:/out' failed: permission denied",
            MatchStage::Normalized,
        ),
        ("Connection forcibly closed", MatchStage::Fuzzy),
        ("Completely unrelated message", MatchStage::None),
    ];

    for (query, stage) in cases {
        assert_eq!(engine.match_text(query).stage, stage, "query {query:?}");
    }
}

#[test]
fn missing_file_is_an_error() {
    let engine = MatchEngine::new(MatchConfig::default()).expect("engine");
    let temp = tempdir().expect("tempdir");
    assert!(engine.load_json_file(&temp.path().join("absent.json")).is_err());
    assert!(engine.knowledge().is_empty());
}

#[test]
fn concurrent_matches_see_whole_snapshots() {
    let engine = Arc::new(MatchEngine::new(MatchConfig::default()).expect("engine"));
    engine.load([logtriage_matcher::KnowledgeRow::new("Connection failed").cause("v1")]);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..200 {
                    let result = engine.match_text("Connection failed");
                    let cause = result.entry.as_ref().and_then(|e| e.cause().map(str::to_string));
                    assert!(
                        matches!(cause.as_deref(), Some("v1") | Some("v2")),
                        "unexpected {cause:?}"
                    );
                }
            })
        })
        .collect();

    for _ in 0..20 {
        engine.load([logtriage_matcher::KnowledgeRow::new("Connection failed").cause("v2")]);
    }
    for reader in readers {
        reader.join().expect("reader");
    }
    assert_eq!(engine.knowledge().len(), 1);
}
