//! `{{placeholder}}` substitution for action templates.
//!
//! Only a fixed allow-list of paths resolves:
//! `event.id`, `event.type`, `event.title`, `event.description`,
//! `event.timestamp` and `event.metadata.<field>`. Anything else, and any
//! allowed path whose value is missing, renders as the empty string. An
//! unterminated `{{` is copied through literally.

use crate::types::Event;

/// Render `template` against `event`.
pub fn render(template: &str, event: &Event) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                let path = after_open[..end].trim();
                if let Some(value) = resolve(path, event) {
                    out.push_str(&value);
                }
                rest = &after_open[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Resolve an allow-listed path to its string value.
pub(crate) fn resolve(path: &str, event: &Event) -> Option<String> {
    let field = path.strip_prefix("event.")?;
    match field {
        "id" => Some(event.id.clone()),
        "type" => Some(event.event_type.as_str().to_string()),
        "title" => Some(event.title.clone()),
        "description" => Some(event.description.clone()),
        "timestamp" => Some(event.timestamp.to_rfc3339()),
        _ => {
            let meta_field = field.strip_prefix("metadata.")?;
            event.metadata.get(meta_field).map(String::from)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventMetadata, EventType};
    use chrono::{TimeZone, Utc};

    fn event() -> Event {
        Event {
            id: "evt_42".into(),
            event_type: EventType::FileAltered,
            title: "report.pdf changed".into(),
            description: "Modified by Alex".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
            metadata: EventMetadata {
                file_name: Some("report.pdf".into()),
                file_path: Some("/docs/report.pdf".into()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_render_title_and_metadata() {
        let out = render(
            "Alert: {{event.title}} at {{event.metadata.filePath}}",
            &event(),
        );
        assert_eq!(out, "Alert: report.pdf changed at /docs/report.pdf");
    }

    #[test]
    fn test_missing_metadata_renders_empty() {
        let out = render("From [{{event.metadata.contact}}]", &event());
        assert_eq!(out, "From []");
    }

    #[test]
    fn test_paths_outside_allow_list_render_empty() {
        assert_eq!(render("{{process.env.HOME}}", &event()), "");
        assert_eq!(render("{{event.metadata.nope}}", &event()), "");
        assert_eq!(render("{{event}}", &event()), "");
    }

    #[test]
    fn test_whitespace_inside_braces() {
        assert_eq!(render("{{ event.id }}", &event()), "evt_42");
    }

    #[test]
    fn test_core_fields() {
        let out = render("{{event.type}}|{{event.description}}|{{event.timestamp}}", &event());
        assert_eq!(out, "file_altered|Modified by Alex|2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn test_unterminated_placeholder_is_literal() {
        assert_eq!(render("oops {{event.title", &event()), "oops {{event.title");
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(render("no placeholders", &event()), "no placeholders");
    }
}
