//! Normalizes `Runtime` console and exception events into [`ConsoleEntry`]
//! records.

use crate::capture::{ConsoleEntry, ConsoleKind};
use crate::cdp::runtime::{EventConsoleApiCalled, EventExceptionThrown, StackTrace};

pub fn from_console_api(event: EventConsoleApiCalled) -> ConsoleEntry {
    let kind = match event.r#type.as_str() {
        "warning" => ConsoleKind::Warn,
        "error" | "assert" => ConsoleKind::Error,
        "info" => ConsoleKind::Info,
        "debug" => ConsoleKind::Debug,
        // dir, table, trace, count, … all render as plain log output
        _ => ConsoleKind::Log,
    };

    let text = event
        .args
        .iter()
        .map(|arg| arg.preview())
        .collect::<Vec<_>>()
        .join(" ");

    let (source_url, source_line) = top_frame(event.stack_trace.as_ref());

    ConsoleEntry {
        kind,
        text,
        timestamp_ms: event.timestamp,
        source_url,
        source_line,
    }
}

pub fn from_exception(event: EventExceptionThrown) -> ConsoleEntry {
    let details = &event.exception_details;
    let text = details.message();
    let source_url = details
        .url
        .clone()
        .or_else(|| top_frame(details.stack_trace.as_ref()).0);

    ConsoleEntry {
        kind: ConsoleKind::Exception,
        text,
        timestamp_ms: event.timestamp,
        source_url,
        source_line: Some(details.line_number),
    }
}

fn top_frame(stack: Option<&StackTrace>) -> (Option<String>, Option<i64>) {
    match stack.and_then(|s| s.call_frames.first()) {
        Some(frame) if !frame.url.is_empty() => (Some(frame.url.clone()), Some(frame.line_number)),
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::runtime::{ExceptionDetails, RemoteObject, RemoteObjectType};

    fn arg(value: serde_json::Value) -> RemoteObject {
        RemoteObject {
            r#type: RemoteObjectType::String,
            subtype: None,
            class_name: None,
            value: Some(value),
            unserializable_value: None,
            description: None,
            object_id: None,
        }
    }

    #[test]
    fn joins_arguments_with_spaces() {
        let event = EventConsoleApiCalled {
            r#type: "log".to_string(),
            args: vec![arg("count:".into()), arg(serde_json::json!(3))],
            execution_context_id: 1,
            timestamp: 1.0,
            stack_trace: None,
        };
        let entry = from_console_api(event);
        assert_eq!(entry.kind, ConsoleKind::Log);
        assert_eq!(entry.text, "count: 3");
    }

    #[test]
    fn warning_maps_to_warn() {
        let event = EventConsoleApiCalled {
            r#type: "warning".to_string(),
            args: vec![arg("careful".into())],
            execution_context_id: 1,
            timestamp: 2.0,
            stack_trace: None,
        };
        assert_eq!(from_console_api(event).kind, ConsoleKind::Warn);
    }

    #[test]
    fn exception_carries_description_and_location() {
        let event = EventExceptionThrown {
            timestamp: 3.0,
            exception_details: ExceptionDetails {
                exception_id: 1,
                text: "Uncaught".to_string(),
                line_number: 12,
                column_number: 8,
                script_id: None,
                url: Some("https://example.com/app.js".to_string()),
                exception: Some(RemoteObject {
                    r#type: RemoteObjectType::Object,
                    subtype: Some("error".to_string()),
                    class_name: Some("TypeError".to_string()),
                    value: None,
                    unserializable_value: None,
                    description: Some("TypeError: x is not a function".to_string()),
                    object_id: None,
                }),
                stack_trace: None,
            },
        };
        let entry = from_exception(event);
        assert_eq!(entry.kind, ConsoleKind::Exception);
        assert_eq!(entry.text, "TypeError: x is not a function");
        assert_eq!(entry.source_line, Some(12));
        assert_eq!(entry.source_url.as_deref(), Some("https://example.com/app.js"));
    }
}
