//! Filtering the activity feed.

use std::collections::BTreeSet;

use crate::triggers::condition::contains_ignore_case;
use crate::types::{Event, EventType};

/// Which events to show. The default shows everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Allowed event types; empty means all types.
    pub types: BTreeSet<EventType>,
    /// Case-insensitive search text; blank means no text filter.
    pub query: String,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        if !self.types.is_empty() && !self.types.contains(&event.event_type) {
            return false;
        }
        let query = self.query.trim();
        if query.is_empty() {
            return true;
        }
        let meta = &event.metadata;
        [
            Some(event.title.as_str()),
            Some(event.description.as_str()),
            meta.contact.as_deref(),
            meta.file_name.as_deref(),
            meta.app_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| contains_ignore_case(field, query))
    }
}

/// Events passing `filter`, newest first. Ties keep their input order.
pub fn filter_events<'a>(events: &'a [Event], filter: &EventFilter) -> Vec<&'a Event> {
    let mut kept: Vec<&Event> = events.iter().filter(|e| filter.matches(e)).collect();
    kept.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventMetadata;
    use chrono::{TimeZone, Utc};

    fn event(id: &str, event_type: EventType, title: &str, minute: u32) -> Event {
        Event {
            id: id.into(),
            event_type,
            title: title.into(),
            description: String::new(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, minute, 0).unwrap(),
            metadata: EventMetadata::default(),
        }
    }

    fn ids(events: Vec<&Event>) -> Vec<&str> {
        events.into_iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_default_filter_sorts_newest_first() {
        let events = vec![
            event("a", EventType::FileAltered, "a", 1),
            event("b", EventType::FileAltered, "b", 3),
            event("c", EventType::FileAltered, "c", 3),
            event("d", EventType::FileAltered, "d", 2),
        ];
        assert_eq!(
            ids(filter_events(&events, &EventFilter::default())),
            vec!["b", "c", "d", "a"]
        );
    }

    #[test]
    fn test_type_filter() {
        let events = vec![
            event("msg", EventType::MessageReceived, "hi", 1),
            event("mail", EventType::EmailReceived, "hi", 2),
            event("app", EventType::AppInstalled, "hi", 3),
        ];
        let filter = EventFilter {
            types: BTreeSet::from([EventType::MessageReceived, EventType::EmailReceived]),
            query: String::new(),
        };
        assert_eq!(ids(filter_events(&events, &filter)), vec!["mail", "msg"]);
    }

    #[test]
    fn test_query_searches_metadata() {
        let mut by_contact = event("contact", EventType::MessageReceived, "New message", 1);
        by_contact.metadata.contact = Some("Sarah Chen".into());
        let mut by_file = event("file", EventType::FileDeleted, "File deleted", 2);
        by_file.metadata.file_name = Some("sarah-notes.txt".into());
        let mut by_app = event("app", EventType::AppInstalled, "Installed", 3);
        by_app.metadata.app_name = Some("Slack".into());
        let mut by_subject = event("subject", EventType::EmailReceived, "Mail", 4);
        by_subject.metadata.subject = Some("sarah".into());
        let events = vec![by_contact, by_file, by_app, by_subject];

        let filter = EventFilter {
            types: BTreeSet::new(),
            query: "  SARAH ".into(),
        };
        assert_eq!(ids(filter_events(&events, &filter)), vec!["file", "contact"]);

        let filter = EventFilter {
            types: BTreeSet::from([EventType::AppInstalled]),
            query: "slack".into(),
        };
        assert_eq!(ids(filter_events(&events, &filter)), vec!["app"]);
    }
}
