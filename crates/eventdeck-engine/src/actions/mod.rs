//! Built-in action kinds.
//!
//! Each submodule turns an [`Action`] plus the triggering [`Event`] into
//! whatever its sink needs. Execution order, timeouts and fan-out live in
//! the [`ActionDispatcher`](crate::triggers::ActionDispatcher).

pub mod messaging;
pub mod script;
pub mod webhook;

pub use script::Script;
pub use webhook::{ReqwestWebhookClient, WEBHOOK_METHODS};

use serde::{Deserialize, Serialize};

use crate::types::{Action, ActionType};

/// What happened when one action ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    Success { detail: String },
    Failure { error: String },
}

/// Per-action entry of a firing report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_id: String,
    pub action_type: ActionType,
    pub outcome: ActionOutcome,
    pub elapsed_ms: u64,
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ActionOutcome::Success { .. })
    }
}

/// Milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Check an action's config against the fields its type requires.
///
/// Returns a list of human-readable problems, or `Ok(())`.
pub fn validate_action_config(action: &Action) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    let non_empty = |key: &str| {
        action
            .config_str(key)
            .is_some_and(|v| !v.trim().is_empty())
    };

    match action.action_type {
        ActionType::Webhook => {
            match action.config_str("url") {
                None => errors.push("webhook requires 'url'".to_string()),
                Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                    errors.push(format!("webhook url must be http(s): {url}"));
                }
                Some(_) => {}
            }
            if let Some(m) = action.config.get("method") {
                let valid = m
                    .as_str()
                    .is_some_and(|m| WEBHOOK_METHODS.contains(&m.to_uppercase().as_str()));
                if !valid {
                    errors.push(format!("unsupported webhook method: {m}"));
                }
            }
            if let Some(h) = action.config.get("headers") {
                let valid = h
                    .as_object()
                    .is_some_and(|obj| obj.values().all(|v| v.is_string()));
                if !valid {
                    errors.push("webhook 'headers' must map names to strings".to_string());
                }
            }
        }
        ActionType::Email => {
            if !non_empty("to") {
                errors.push("email requires 'to'".to_string());
            }
        }
        ActionType::Notification => {
            if !non_empty("message") {
                errors.push("notification requires 'message'".to_string());
            }
        }
        ActionType::Custom => match action.config_str("script") {
            None => errors.push("custom action requires 'script'".to_string()),
            Some(src) => {
                if let Err(e) = Script::parse(src, usize::MAX) {
                    errors.push(e.to_string());
                }
            }
        },
        ActionType::Log => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    fn action(action_type: ActionType, config: Value) -> Action {
        Action {
            id: "a".into(),
            action_type,
            name: "n".into(),
            description: String::new(),
            config: serde_json::from_value::<BTreeMap<String, Value>>(config).unwrap(),
        }
    }

    #[test]
    fn test_webhook_requires_http_url() {
        assert!(validate_action_config(&action(
            ActionType::Webhook,
            json!({"url": "https://example.com/webhook", "method": "patch"})
        ))
        .is_ok());

        let errs =
            validate_action_config(&action(ActionType::Webhook, json!({}))).unwrap_err();
        assert_eq!(errs, vec!["webhook requires 'url'".to_string()]);

        let errs = validate_action_config(&action(
            ActionType::Webhook,
            json!({"url": "ftp://x", "method": "TRACE", "headers": {"a": 1}}),
        ))
        .unwrap_err();
        assert_eq!(errs.len(), 3);
    }

    #[test]
    fn test_required_fields_per_type() {
        assert!(validate_action_config(&action(ActionType::Email, json!({}))).is_err());
        assert!(validate_action_config(&action(ActionType::Email, json!({"to": "a@b.c"}))).is_ok());
        assert!(
            validate_action_config(&action(ActionType::Notification, json!({"message": " "})))
                .is_err()
        );
        assert!(validate_action_config(&action(ActionType::Log, json!({}))).is_ok());
    }

    #[test]
    fn test_custom_script_is_parsed() {
        assert!(validate_action_config(&action(
            ActionType::Custom,
            json!({"script": "require event.type == \"file_deleted\""})
        ))
        .is_ok());

        let errs = validate_action_config(&action(
            ActionType::Custom,
            json!({"script": "console.log('Event triggered:', event);"}),
        ))
        .unwrap_err();
        assert!(errs[0].contains("unknown statement"));

        let errs = validate_action_config(&action(
            ActionType::Custom,
            json!({"script": format!("require {}true", "!".repeat(100))}),
        ))
        .unwrap_err();
        assert!(errs[0].contains("nested too deeply"), "got: {errs:?}");
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(std::time::Duration::from_millis(1500)), 1500);
        assert_eq!(millis(std::time::Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_outcome_wire_shape() {
        let result = ActionResult {
            action_id: "a".into(),
            action_type: ActionType::Log,
            outcome: ActionOutcome::Failure {
                error: "boom".into(),
            },
            elapsed_ms: 3,
        };
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(v["outcome"], json!({"status": "failure", "error": "boom"}));
        assert!(!result.is_success());
    }
}
