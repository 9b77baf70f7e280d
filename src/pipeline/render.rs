//! Terminal render stage: converts a fully processed event into a line of
//! output.

use crate::models::LogEvent;
use chrono::SecondsFormat;
use serde_json::{Map, Value};

/// Output representation, selected once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Single-line JSON object for log aggregators (production).
    Json,
    /// Fixed-width human-readable line (development).
    Human,
}

/// Render an event. Every field surviving the processor chain appears in the
/// output; nothing is silently dropped here.
pub fn render(mode: RenderMode, event: &LogEvent) -> String {
    match mode {
        RenderMode::Json => render_json(event),
        RenderMode::Human => render_human(event),
    }
}

/// JSON line with a stable envelope: `timestamp`, `level`, `logger`,
/// `message`, then all event fields flattened alongside. An attached error is
/// emitted under `exception`. Envelope keys win on collision.
fn render_json(event: &LogEvent) -> String {
    let mut object = Map::new();
    object.insert(
        "timestamp".into(),
        Value::String(event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    object.insert("level".into(), Value::String(event.level.as_str().into()));
    object.insert("logger".into(), Value::String(event.logger.clone()));
    object.insert("message".into(), Value::String(event.message.clone()));

    for (name, value) in &event.fields {
        if !object.contains_key(name) {
            object.insert(name.clone(), value.clone());
        }
    }

    if let Some(error) = &event.error {
        object.insert("exception".into(), Value::String(error.clone()));
    }

    Value::Object(object).to_string()
}

/// Human-readable line:
///
/// ```text
/// 2026-01-12 10:30:00 | INFO     | item_manager                   | item_created | {"item_id":"123"}
/// ```
///
/// Error text, when attached, follows on its own lines.
fn render_human(event: &LogEvent) -> String {
    let timestamp = event.timestamp.format("%Y-%m-%d %H:%M:%S");
    let level = format!("{:<8}", event.level.as_str());
    let logger = format!("{:<30}", event.logger);

    let extra = if event.fields.is_empty() {
        String::new()
    } else {
        format!(" | {}", Value::Object(event.fields.clone()))
    };

    let mut line = format!("{timestamp} | {level} | {logger} | {}{extra}", event.message);

    if let Some(error) = &event.error {
        line.push('\n');
        line.push_str(error);
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogLevel;
    use serde_json::json;

    fn sample_event() -> LogEvent {
        let mut event = LogEvent::new(LogLevel::Info, "item_manager", "item_created");
        event.fields.insert("item_id".into(), json!("123"));
        event.fields.insert("count".into(), json!(2));
        event
    }

    #[test]
    fn test_json_mode_emits_envelope_and_fields() {
        let line = render(RenderMode::Json, &sample_event());
        let parsed: Value = serde_json::from_str(&line).expect("output is valid JSON");

        assert_eq!(parsed["level"], json!("INFO"));
        assert_eq!(parsed["logger"], json!("item_manager"));
        assert_eq!(parsed["message"], json!("item_created"));
        assert_eq!(parsed["item_id"], json!("123"));
        assert_eq!(parsed["count"], json!(2));
        // ISO-8601 UTC timestamp.
        let timestamp = parsed["timestamp"].as_str().expect("timestamp present");
        assert!(timestamp.ends_with('Z'), "expected UTC timestamp: {timestamp}");
    }

    #[test]
    fn test_json_mode_is_single_line() {
        let line = render(RenderMode::Json, &sample_event());
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_json_mode_attaches_exception() {
        let mut event = sample_event();
        event.error = Some("boom".into());
        let parsed: Value = serde_json::from_str(&render(RenderMode::Json, &event)).unwrap();
        assert_eq!(parsed["exception"], json!("boom"));
    }

    #[test]
    fn test_json_envelope_wins_over_field_collision() {
        let mut event = sample_event();
        event.fields.insert("level".into(), json!("bogus"));
        let parsed: Value = serde_json::from_str(&render(RenderMode::Json, &event)).unwrap();
        assert_eq!(parsed["level"], json!("INFO"));
    }

    #[test]
    fn test_human_mode_pads_level_and_logger() {
        let line = render(RenderMode::Human, &sample_event());
        assert!(line.contains("| INFO     |"));
        assert!(line.contains("| item_manager                   |"));
        assert!(line.contains("item_created"));
        assert!(line.contains(r#""item_id":"123""#));
    }

    #[test]
    fn test_human_mode_appends_error_on_new_line() {
        let mut event = sample_event();
        event.error = Some("ValueError: bad input".into());
        let line = render(RenderMode::Human, &event);

        let (first, rest) = line.split_once('\n').expect("error on its own line");
        assert!(first.contains("item_created"));
        assert_eq!(rest, "ValueError: bad input");
    }

    #[test]
    fn test_human_mode_without_fields_has_no_trailing_separator() {
        let event = LogEvent::new(LogLevel::Warn, "auth", "token_expired");
        let line = render(RenderMode::Human, &event);
        assert!(line.ends_with("token_expired"));
    }
}
