//! Sandboxed scripts for `custom` actions.
//!
//! A script is one statement per line. Blank lines and lines starting with
//! `#` are skipped.
//!
//! - `require <expression>` fails the action when the expression is false.
//! - `emit <template>` renders a template and appends it to the output.
//!
//! The whole script is parsed before anything runs, so a syntax error on
//! line 10 means lines 1-9 never execute. The only data in scope is the
//! triggering event.

use serde_json::Value;

use crate::errors::ActionError;
use crate::expression::Expression;
use crate::template;
use crate::types::Event;

#[derive(Debug)]
enum Statement {
    Require { line: usize, source: String, expr: Expression },
    Emit { template: String },
}

/// A parsed custom script.
#[derive(Debug)]
pub struct Script {
    statements: Vec<Statement>,
}

impl Script {
    /// Parse `source`, rejecting scripts longer than `max_statements`.
    pub fn parse(source: &str, max_statements: usize) -> Result<Self, ActionError> {
        let mut statements = Vec::new();
        for (idx, raw) in source.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if statements.len() == max_statements {
                return Err(script_err(format!(
                    "script exceeds {max_statements} statements"
                )));
            }
            let (keyword, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            let rest = rest.trim();
            let statement = match keyword {
                "require" => {
                    let expr = Expression::parse(rest)
                        .map_err(|e| script_err(format!("line {}: {e}", idx + 1)))?;
                    Statement::Require {
                        line: idx + 1,
                        source: rest.to_string(),
                        expr,
                    }
                }
                "emit" => Statement::Emit {
                    template: rest.to_string(),
                },
                other => {
                    return Err(script_err(format!(
                        "line {}: unknown statement '{other}'",
                        idx + 1
                    )))
                }
            };
            statements.push(statement);
        }
        Ok(Self { statements })
    }

    /// Run against `event`. Returns the emitted lines.
    pub fn run(&self, event: &Event) -> Result<Vec<String>, ActionError> {
        let context: Value = serde_json::to_value(event).map_err(|e| script_err(e.to_string()))?;
        let mut output = Vec::new();
        for statement in &self.statements {
            match statement {
                Statement::Require { line, source, expr } => {
                    if !expr.evaluate(&context) {
                        return Err(script_err(format!(
                            "line {line}: requirement failed: {source}"
                        )));
                    }
                }
                Statement::Emit { template } => output.push(template::render(template, event)),
            }
        }
        Ok(output)
    }
}

fn script_err(message: impl Into<String>) -> ActionError {
    ActionError::Script {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventMetadata, EventType};
    use chrono::{TimeZone, Utc};

    fn event() -> Event {
        Event {
            id: "evt_1".into(),
            event_type: EventType::EmailReceived,
            title: "Invoice #123".into(),
            description: "Payment due".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
            metadata: EventMetadata {
                sender: Some("billing@example.com".into()),
                subject: Some("Invoice #123".into()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_require_and_emit() {
        let script = Script::parse(
            "# forward invoices\n\
             require event.type == \"email_received\"\n\
             require event.metadata.sender contains \"billing\"\n\
             \n\
             emit forwarded {{event.title}}",
            16,
        )
        .unwrap();
        let out = script.run(&event()).unwrap();
        assert_eq!(out, vec!["forwarded Invoice #123".to_string()]);
    }

    #[test]
    fn test_failed_requirement_stops_script() {
        let script = Script::parse(
            "emit first\nrequire event.type == \"file_deleted\"\nemit never",
            16,
        )
        .unwrap();
        let err = script.run(&event()).unwrap_err();
        match err {
            ActionError::Script { message } => {
                assert!(message.contains("line 2"), "got: {message}");
            }
            other => panic!("expected Script error, got: {other}"),
        }
    }

    #[test]
    fn test_unknown_statement_rejected() {
        let err = Script::parse("console.log('Event triggered:', event);", 16).unwrap_err();
        assert!(err.to_string().contains("unknown statement"));
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = Script::parse("emit ok\nrequire process.env == 1", 16).unwrap_err();
        assert!(err.to_string().contains("line 2"), "got: {err}");
    }

    #[test]
    fn test_statement_limit() {
        let source = "emit x\n".repeat(5);
        assert!(Script::parse(&source, 5).is_ok());
        let err = Script::parse(&source, 4).unwrap_err();
        assert!(err.to_string().contains("exceeds 4 statements"));
    }

    #[test]
    fn test_empty_script_succeeds() {
        let script = Script::parse("  \n# nothing\n", 16).unwrap();
        assert!(script.run(&event()).unwrap().is_empty());
    }

    #[test]
    fn test_deeply_nested_line_is_rejected() {
        let nots = format!("require {}true", "!".repeat(100_000));
        let err = Script::parse(&nots, 16).unwrap_err();
        assert!(matches!(err, ActionError::Script { .. }), "got: {err}");

        let parens = format!(
            "require {}true{}",
            "(".repeat(100_000),
            ")".repeat(100_000)
        );
        let err = Script::parse(&parens, 16).unwrap_err();
        assert!(matches!(err, ActionError::Script { .. }), "got: {err}");

        let chain = format!("require {}", vec!["true"; 100_000].join(" && "));
        let err = Script::parse(&chain, 16).unwrap_err();
        assert!(matches!(err, ActionError::Script { .. }), "got: {err}");
    }
}
