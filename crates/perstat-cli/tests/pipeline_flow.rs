//! Integration tests for the staged pipeline commands.
//!
//! These drive `dump2diffs`, `diffs2persistence`, and `persistence2stats`
//! over a small two-page fixture, both chained and via the single-pass
//! `dump2stats`, and validate the enriched documents end to end.

mod common;

use common::{fixture, parse_lines, perstat_cmd, SUNSET};

fn run_chain() -> Vec<u8> {
    let diffs = perstat_cmd()
        .arg("dump2diffs")
        .write_stdin(fixture())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let persistence = perstat_cmd()
        .args(["diffs2persistence", "--sunset", SUNSET])
        .write_stdin(diffs)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    perstat_cmd()
        .args(["persistence2stats", "--exclude", r"^\s+$"])
        .write_stdin(persistence)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_dump2diffs_enriches_records() {
    let output = perstat_cmd()
        .arg("dump2diffs")
        .write_stdin(fixture())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let docs = parse_lines(&output);
    assert_eq!(docs.len(), 4);

    // First revision of page 1: one big insert.
    let first = &docs[0];
    assert_eq!(first["id"], 1);
    assert!(first["sha1"].is_string());
    // Text is dropped by default.
    assert!(first.get("text").is_none());
    let ops = first["diff"]["ops"].as_array().unwrap();
    assert_eq!(ops[0]["name"], "insert");
    assert_eq!(
        ops[0]["tokens"].as_array().unwrap().len(),
        6 // Apples, space, are, space, red, period
    );

    // Second revision diffs against the first.
    assert_eq!(docs[1]["diff"]["last_id"], 1);
    // The revert carries a diff too (the diff stage does not detect
    // reverts; that is the persistence stage's job).
    assert_eq!(docs[2]["diff"]["last_id"], 2);

    // Page 2 starts a fresh baseline.
    assert!(docs[3]["diff"]["last_id"].is_null());
    assert_eq!(docs[3]["diff"]["ops"][0]["name"], "insert");
}

#[test]
fn test_keep_text_flag() {
    let output = perstat_cmd()
        .args(["dump2diffs", "--keep-text"])
        .write_stdin(fixture())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let docs = parse_lines(&output);
    assert_eq!(docs[0]["text"], "Apples are red.");
}

#[test]
fn test_diffs2persistence_tracks_survival() {
    let diffs = perstat_cmd()
        .arg("dump2diffs")
        .write_stdin(fixture())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let output = perstat_cmd()
        .args(["diffs2persistence", "--sunset", SUNSET])
        .write_stdin(diffs)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let docs = parse_lines(&output);
    assert_eq!(docs.len(), 4);

    // Revision 1 was observed by two later revisions, all same-author.
    let p1 = &docs[0]["persistence"];
    assert_eq!(p1["revisions_processed"], 2);
    assert_eq!(p1["non_self_processed"], 0);
    let tokens = p1["tokens"].as_array().unwrap();
    assert_eq!(tokens.len(), 6);
    for token in tokens {
        // Every token of revision 1 survived the addition and the revert,
        // and was still visible when the history was captured.
        assert_eq!(token["persisted"], 2);
        assert_eq!(token["non_self_persisted"], 0);
        assert_eq!(token["seconds_visible"], 10860.0);
    }

    // The revert added no tokens.
    let p3 = &docs[2]["persistence"];
    assert_eq!(p3["tokens"].as_array().unwrap().len(), 0);

    // Page 2's single revision saw nothing after it.
    let p4 = &docs[3]["persistence"];
    assert_eq!(p4["revisions_processed"], 0);
    assert_eq!(docs[3]["page"]["id"], 2);

    // The diff block is dropped by default.
    assert!(docs[0].get("diff").is_none());
}

#[test]
fn test_persistence2stats_aggregates() {
    let stats = run_chain();
    let docs = parse_lines(&stats);
    assert_eq!(docs.len(), 4);

    // Revision 1: four non-whitespace tokens, none persistent under the
    // default thresholds, censored because the observation (an afternoon)
    // is far shorter than 14 days.
    let p1 = &docs[0]["persistence"];
    assert_eq!(p1["tokens_added"], 4);
    assert_eq!(p1["persistent_tokens"], 0);
    assert_eq!(p1["non_self_persistent_tokens"], 0);
    assert_eq!(p1["censored"], true);
    assert_eq!(p1["non_self_censored"], true);

    // Revision 2 added one sentence: Apples, are, blue, period.
    assert_eq!(docs[1]["persistence"]["tokens_added"], 4);

    // The revert added nothing.
    assert_eq!(docs[2]["persistence"]["tokens_added"], 0);

    // Per-token documents are dropped by default.
    assert!(p1.get("tokens").is_none());

    // Log sums: revision 1's four counted tokens each persisted twice.
    let expected = 4.0 * (3.0f64).ln();
    let sum = docs[0]["persistence"]["sum_log_persisted"].as_f64().unwrap();
    assert!((sum - expected).abs() < 1e-9);
}

#[test]
fn test_relaxed_thresholds_count_survivors() {
    let diffs = perstat_cmd()
        .arg("dump2diffs")
        .write_stdin(fixture())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let persistence = perstat_cmd()
        .args(["diffs2persistence", "--sunset", SUNSET])
        .write_stdin(diffs)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stats = perstat_cmd()
        .args([
            "persistence2stats",
            "--exclude",
            r"^\s+$",
            "--min-persisted",
            "1",
            "--min-visible",
            "0",
        ])
        .write_stdin(persistence)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let docs = parse_lines(&stats);
    let p1 = &docs[0]["persistence"];
    // Everything passes the (zeroed) time threshold.
    assert_eq!(p1["persistent_tokens"], 4);
    assert_eq!(p1["non_self_persistent_tokens"], 4);
    assert_eq!(p1["censored"], false);
    assert_eq!(p1["non_self_censored"], false);
}

#[test]
fn test_dump2stats_matches_chained_stages() {
    let chained = run_chain();

    let single_pass = perstat_cmd()
        .args([
            "dump2stats",
            "--sunset",
            SUNSET,
            "--exclude",
            r"^\s+$",
        ])
        .write_stdin(fixture())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(
        String::from_utf8_lossy(&single_pass),
        String::from_utf8_lossy(&chained)
    );
}

#[test]
fn test_revdocs2stats_is_dump2stats() {
    let a = perstat_cmd()
        .args(["dump2stats", "--sunset", SUNSET])
        .write_stdin(fixture())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let b = perstat_cmd()
        .args(["revdocs2stats", "--sunset", SUNSET])
        .write_stdin(fixture())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(a, b);
}

#[test]
fn test_unknown_fields_pass_through() {
    let line = concat!(
        r#"{"id": 1, "timestamp": "2014-09-23T12:00:00Z", "text": "Hi.", "#,
        r#""comment": "hello", "minor": true, "#,
        r#""page": {"id": 9, "title": "T", "namespace": 0}}"#,
        "\n"
    );
    let output = perstat_cmd()
        .arg("dump2diffs")
        .write_stdin(line)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let docs = parse_lines(&output);
    assert_eq!(docs[0]["comment"], "hello");
    assert_eq!(docs[0]["minor"], true);
}

#[test]
fn test_contributor_normalization() {
    let line = concat!(
        r#"{"id": 1, "timestamp": "2014-09-23T12:00:00Z", "text": "Hi.", "#,
        r#""contributor": {"id": 42, "user_text": "Ash"}, "#,
        r#""page": {"id": 9, "title": "T", "namespace": 0}}"#,
        "\n"
    );
    let output = perstat_cmd()
        .arg("dump2diffs")
        .write_stdin(line)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let docs = parse_lines(&output);
    assert_eq!(docs[0]["user"]["id"], 42);
    assert_eq!(docs[0]["user"]["text"], "Ash");
    assert!(docs[0].get("contributor").is_none());
}

#[test]
fn test_namespace_filter() {
    let mut input = fixture();
    input += &common::revdoc(3, "Talk:Apples", 20, "2014-09-23T12:00:00Z", "W", "chatter");
    input += "\n";
    // Mark page 3 as namespace 1.
    let input = input.replace(r#""id": 3, "title": "Talk:Apples", "namespace": 0"#,
        r#""id": 3, "title": "Talk:Apples", "namespace": 1"#);

    let output = perstat_cmd()
        .args(["dump2diffs", "--namespaces", "0"])
        .write_stdin(input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let docs = parse_lines(&output);
    assert_eq!(docs.len(), 4);
    assert!(docs.iter().all(|d| d["page"]["namespace"] == 0));
}
