use super::*;
use serde_json::json;

fn records(locator: &str, body: &str) -> Result<Vec<Value>> {
    let extractor = RecordExtractor::new(locator);
    extractor.records(&extractor.parse(body)?)
}

#[test]
fn test_api_calls_usage_array() {
    let body = r#"{"dailyWorkspaceAPICallsUsage": [
        {"timestamp": "2023-01-01T00:00:00Z", "apiCalls": 1},
        {"timestamp": "2023-01-02T00:00:00Z", "apiCalls": 2}
    ]}"#;

    let found = records("$.dailyWorkspaceAPICallsUsage[*]", body).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[1]["apiCalls"], 2);
}

#[test]
fn test_event_volume_series_uses_first_result_only() {
    let body = json!({
        "data": {
            "result": [
                {"series": [{"time": "2023-01-01T00:00:00Z", "count": 10}]},
                {"series": [{"time": "2023-01-01T00:00:00Z", "count": 99}]}
            ]
        }
    });

    let found = RecordExtractor::new("$.data.result[0].series[*]")
        .records(&body)
        .unwrap();
    assert_eq!(found, vec![json!({"time": "2023-01-01T00:00:00Z", "count": 10})]);
}

#[test]
fn test_missing_usage_array_is_zero_records() {
    let locator = "$.data.dailyWorkspaceMTUUsage[*]";
    assert!(records(locator, r#"{"data": {}}"#).unwrap().is_empty());
    assert!(records(locator, r#"{"errors": [{"message": "nope"}]}"#)
        .unwrap()
        .is_empty());
}

#[test]
fn test_dotted_locator() {
    let found = records("data.items", r#"{"data": {"items": [{"id": 1}, {"id": 2}]}}"#).unwrap();
    assert_eq!(found.len(), 2);

    assert!(records("data.items", r#"{"data": {"items": null}}"#)
        .unwrap()
        .is_empty());
    assert_eq!(records("$.data", r#"{"data": {"id": 1}}"#).unwrap().len(), 1);
}

#[test]
fn test_gateway_html_is_a_decode_error() {
    let err = records("$.data[*]", "<html>bad gateway</html>").unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

#[test]
fn test_malformed_locator_is_reported() {
    let err = RecordExtractor::new("$.data[*")
        .records(&json!({}))
        .unwrap_err();
    assert!(matches!(err, Error::JsonPath { ref path, .. } if path == "$.data[*"));
}

#[test]
fn test_cursor_lookup() {
    let body = json!({"data": {"pagination": {"current": "MA==", "next": "MTAw"}}});
    assert_eq!(first_match(&body, "$.data.pagination.next"), Some(json!("MTAw")));
    assert_eq!(first_match(&body, "$.data.pagination.previous"), None);

    let last_page = json!({"data": {"pagination": {"next": null}}});
    assert_eq!(first_match(&last_page, "$.data.pagination.next"), None);
}

#[test]
fn test_indexed_segments() {
    let body = json!({"items": [{"id": "a"}, {"id": "b"}]});
    assert_eq!(first_match(&body, "$.items[-1].id"), Some(json!("b")));
    assert_eq!(first_match(&body, "$.items[0].id"), Some(json!("a")));
    assert_eq!(first_match(&body, "$.items[5].id"), None);
    assert_eq!(first_match(&body, "$.items[-5].id"), None);
}

#[test]
fn test_scalars_as_text() {
    let body = json!({"a": {"s": "x", "n": 5, "b": true, "e": "", "o": {}}});
    assert_eq!(extract_jsonpath(&body, "$.a.s"), Some("x".to_string()));
    assert_eq!(extract_jsonpath(&body, "a.n"), Some("5".to_string()));
    assert_eq!(extract_jsonpath(&body, "$.a.b"), Some("true".to_string()));
    assert_eq!(extract_jsonpath(&body, "$.a.e"), None);
    assert_eq!(extract_jsonpath(&body, "$.a.o"), None);
}
