use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_raw(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request_raw(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "request failed: {}",
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

const DRAFT_TEXT: &str = "Here's a draft rubric for the assignment:\n\n```json\n{\n  \"sections\": [\n    {\n      \"title\": \"Analysis\",\n      \"items\": [\n        { \"title\": \"Identifies the problem\", \"points\": 40, },\n        { \"title\": \"Supports claims\", \"points\": 57, },\n      ],\n    },\n  ],\n}\n```\n\nFeel free to adjust the point values.";

#[test]
fn drafted_rubric_is_cleaned_parsed_and_given_ids() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "rubric.parseGenerated",
        json!({ "text": DRAFT_TEXT, "expectedPoints": 100.0 }),
    );
    let sections = &result["rubric"]["content"]["sections"];
    assert_eq!(sections[0]["id"], "section-0");
    assert_eq!(sections[0]["items"][0]["id"], "item-0-0");
    assert_eq!(result["check"]["totalPoints"], 97.0);
    assert_eq!(result["check"]["isValid"], false);
    let _ = child.kill();
}

#[test]
fn generated_grading_feeds_the_same_reconciler() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let rubric = json!({
        "content": {
            "sections": [{
                "id": "section-0",
                "title": "Analysis",
                "items": [
                    { "id": "item-0-0", "title": "Identifies the problem", "points": 40.0 },
                    { "id": "item-0-1", "title": "Supports claims", "points": 57.0 }
                ]
            }]
        }
    });
    let text = "Grading complete.\n```json\n{\"satisfied\": [\n  {\"itemId\": \"wrong-id\", \"section\": \"Analysis\", \"criterion\": \"Supports claims\", \"comment\": \"Well argued.\"},\n]}\n```";
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "grading.reconcileGenerated",
        json!({ "rubric": rubric, "text": text }),
    );
    assert_eq!(result["total"], 57.0);
    assert_eq!(result["hits"][0]["itemId"], "item-0-1");
    assert_eq!(result["feedbackText"], "Well argued.");
    let _ = child.kill();
}

#[test]
fn unusable_generator_output_is_a_hard_error() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let resp = request_raw(
        &mut stdin,
        &mut reader,
        "1",
        "rubric.parseGenerated",
        json!({ "text": "I'm sorry, I can't produce a rubric for that." }),
    );
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "generated_parse_failed");

    let resp = request_raw(
        &mut stdin,
        &mut reader,
        "2",
        "grading.reconcileGenerated",
        json!({
            "rubric": { "content": { "sections": [] } },
            "text": "{definitely not json}"
        }),
    );
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "generated_parse_failed");
    let _ = child.kill();
}
