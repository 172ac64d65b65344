//! Shared test utilities for perstat-cli integration tests.

use assert_cmd::Command;

/// Get a Command for the perstat binary.
///
/// # Panics
///
/// Panics if the perstat binary cannot be found. This should not happen
/// in a properly configured test environment.
pub fn perstat_cmd() -> Command {
    Command::cargo_bin("perstat").expect("perstat binary should exist")
}

/// A revision-document JSONL line.
pub fn revdoc(
    page_id: i64,
    title: &str,
    rev_id: i64,
    timestamp: &str,
    user: &str,
    text: &str,
) -> String {
    format!(
        concat!(
            r#"{{"id": {id}, "timestamp": "{ts}", "text": {text}, "#,
            r#""user": {{"text": "{user}"}}, "#,
            r#""page": {{"id": {page}, "title": "{title}", "namespace": 0}}}}"#
        ),
        id = rev_id,
        ts = timestamp,
        text = serde_json::to_string(text).unwrap(),
        user = user,
        page = page_id,
        title = title,
    )
}

/// The shared fixture: two pages, chronological within each page.
///
/// Page 1 sees an addition and then a revert back to the first revision;
/// page 2 is a single-revision page.
pub fn fixture() -> String {
    [
        revdoc(1, "Apples", 1, "2014-09-23T12:00:00Z", "Willow", "Apples are red."),
        revdoc(
            1,
            "Apples",
            2,
            "2014-09-23T13:00:00Z",
            "Willow",
            "Apples are red. Apples are blue.",
        ),
        revdoc(1, "Apples", 3, "2014-09-23T14:00:00Z", "Willow", "Apples are red."),
        revdoc(2, "Pears", 10, "2014-09-23T12:30:00Z", "Rowan", "Pears are green."),
    ]
    .join("\n")
        + "\n"
}

/// Sunset an hour and a minute after page 1's last revision.
pub const SUNSET: &str = "2014-09-23T15:01:00Z";

/// Parse JSONL output into values.
pub fn parse_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("valid JSON line"))
        .collect()
}
