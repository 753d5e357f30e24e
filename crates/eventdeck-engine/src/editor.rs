//! Creating, editing and validating triggers.
//!
//! [`TriggerSet`] owns an ordered trigger list and only ever holds triggers
//! that passed [`validate_trigger`]. The engine applies edits through
//! [`Engine::edit`](crate::engine::Engine::edit), which persists the result.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::actions::validate_action_config;
use crate::errors::ValidationError;
use crate::triggers::CronSchedule;
use crate::types::{Action, ActionType, TimerCondition, Trigger, TriggerCondition};

/// A named cron schedule offered when creating a timer trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CronPreset {
    pub expression: &'static str,
    pub description: &'static str,
}

pub const CRON_PRESETS: &[CronPreset] = &[
    CronPreset {
        expression: "0 0 * * *",
        description: "Daily at midnight",
    },
    CronPreset {
        expression: "0 9 * * *",
        description: "Daily at 9:00 AM",
    },
    CronPreset {
        expression: "0 0 * * 1",
        description: "Weekly on Monday at midnight",
    },
    CronPreset {
        expression: "0 0 1 * *",
        description: "Monthly on the 1st at midnight",
    },
    CronPreset {
        expression: "*/5 * * * *",
        description: "Every 5 minutes",
    },
    CronPreset {
        expression: "0 */6 * * *",
        description: "Every 6 hours",
    },
];

/// The user-editable part of a trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerDraft {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub condition: TriggerCondition,
    pub actions: Vec<Action>,
}

impl TriggerDraft {
    /// An enabled draft with no actions yet.
    pub fn new(name: impl Into<String>, condition: TriggerCondition) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            enabled: true,
            condition,
            actions: Vec::new(),
        }
    }

    /// A timer draft on the default schedule (daily at midnight).
    pub fn timer(name: impl Into<String>) -> Self {
        let preset = CRON_PRESETS[0];
        Self::new(
            name,
            TriggerCondition::Timer(TimerCondition {
                cron_expression: preset.expression.to_string(),
                description: preset.description.to_string(),
            }),
        )
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Append an action with a freshly generated id.
    pub fn action(
        mut self,
        action_type: ActionType,
        name: impl Into<String>,
        config: BTreeMap<String, Value>,
    ) -> Self {
        self.actions.push(Action {
            id: format!("action_{}", uuid::Uuid::new_v4().simple()),
            action_type,
            name: name.into(),
            description: String::new(),
            config,
        });
        self
    }

    fn apply_to(self, trigger: &mut Trigger) {
        trigger.name = self.name;
        trigger.description = self.description;
        trigger.enabled = self.enabled;
        trigger.condition = self.condition;
        trigger.actions = self.actions;
    }
}

impl From<&Trigger> for TriggerDraft {
    fn from(trigger: &Trigger) -> Self {
        Self {
            name: trigger.name.clone(),
            description: trigger.description.clone(),
            enabled: trigger.enabled,
            condition: trigger.condition.clone(),
            actions: trigger.actions.clone(),
        }
    }
}

/// Validate a single trigger for shape and per-action config.
pub fn validate_trigger(trigger: &Trigger) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    // 1. Name and at least one action.
    if trigger.name.trim().is_empty() {
        errors.push("name must not be empty".to_string());
    }
    if trigger.actions.is_empty() {
        errors.push("trigger has no actions".to_string());
    }

    // 2. Condition.
    match &trigger.condition {
        TriggerCondition::Event(cond) => {
            let fields = [
                ("titleContains", &cond.title_contains),
                ("descriptionContains", &cond.description_contains),
                ("contactEquals", &cond.contact_equals),
            ];
            for (field, value) in fields {
                if value.as_deref().is_some_and(|v| v.is_empty()) {
                    errors.push(format!("{field} must not be empty when present"));
                }
            }
        }
        TriggerCondition::Timer(cond) => {
            if let Err(e) = CronSchedule::parse(&cond.cron_expression) {
                errors.push(e.to_string());
            }
        }
    }

    // 3. Actions: unique ids, names, per-type config.
    let mut seen_ids = HashSet::new();
    for action in &trigger.actions {
        if action.id.is_empty() {
            errors.push("action id must not be empty".to_string());
        } else if !seen_ids.insert(action.id.as_str()) {
            errors.push(format!("duplicate action id: {}", action.id));
        }
        if action.name.trim().is_empty() {
            errors.push(format!("action {} has no name", action.id));
        }
        if let Err(action_errors) = validate_action_config(action) {
            errors.extend(
                action_errors
                    .into_iter()
                    .map(|e| format!("action {}: {e}", action.id)),
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Trigger {
            trigger_id: trigger.id.clone(),
            errors,
        })
    }
}

/// Trigger ids must be unique across a list.
pub(crate) fn ensure_unique_ids(triggers: &[Trigger]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for trigger in triggers {
        if !seen.insert(trigger.id.as_str()) {
            return Err(ValidationError::DuplicateTrigger {
                id: trigger.id.clone(),
            });
        }
    }
    Ok(())
}

/// An ordered list of triggers with editing operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerSet {
    triggers: Vec<Trigger>,
}

impl TriggerSet {
    /// Wrap an existing list. Ids must be unique; individual triggers are
    /// not re-validated, so a stored trigger that predates a policy change
    /// can still be loaded and fixed.
    pub fn new(triggers: Vec<Trigger>) -> Result<Self, ValidationError> {
        ensure_unique_ids(&triggers)?;
        Ok(Self { triggers })
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    pub fn get(&self, id: &str) -> Option<&Trigger> {
        self.triggers.iter().find(|t| t.id == id)
    }

    pub fn into_inner(self) -> Vec<Trigger> {
        self.triggers
    }

    /// Validate and append a new trigger. Returns the stored trigger.
    pub fn create(
        &mut self,
        draft: TriggerDraft,
        now: DateTime<Utc>,
    ) -> Result<Trigger, ValidationError> {
        let TriggerDraft {
            name,
            description,
            enabled,
            condition,
            actions,
        } = draft;
        let trigger = Trigger {
            id: format!("trigger_{}", uuid::Uuid::new_v4().simple()),
            name,
            description,
            enabled,
            condition,
            actions,
            created_at: now,
            last_triggered: None,
            trigger_count: 0,
        };
        validate_trigger(&trigger)?;
        self.triggers.push(trigger.clone());
        Ok(trigger)
    }

    /// Replace the editable fields of trigger `id`, keeping its identity and
    /// firing history.
    pub fn update(&mut self, id: &str, draft: TriggerDraft) -> Result<Trigger, ValidationError> {
        let slot = self.slot(id)?;
        let mut updated = self.triggers[slot].clone();
        draft.apply_to(&mut updated);
        validate_trigger(&updated)?;
        self.triggers[slot] = updated.clone();
        Ok(updated)
    }

    /// Flip `enabled`. Returns the new state.
    pub fn toggle(&mut self, id: &str) -> Result<bool, ValidationError> {
        let slot = self.slot(id)?;
        let trigger = &mut self.triggers[slot];
        trigger.enabled = !trigger.enabled;
        Ok(trigger.enabled)
    }

    pub fn delete(&mut self, id: &str) -> Result<Trigger, ValidationError> {
        let slot = self.slot(id)?;
        Ok(self.triggers.remove(slot))
    }

    fn slot(&self, id: &str) -> Result<usize, ValidationError> {
        self.triggers
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| ValidationError::UnknownTrigger { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventCondition;
    use crate::types::EventType;
    use chrono::TimeZone;
    use serde_json::json;

    fn config(v: Value) -> BTreeMap<String, Value> {
        serde_json::from_value(v).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    fn sarah_draft() -> TriggerDraft {
        TriggerDraft::new(
            "Sarah pings",
            TriggerCondition::Event(EventCondition {
                event_type: Some(EventType::MessageReceived),
                contact_equals: Some("Sarah Chen".into()),
                ..Default::default()
            }),
        )
        .action(
            ActionType::Notification,
            "Toast",
            config(json!({"message": "{{event.title}}"})),
        )
    }

    #[test]
    fn test_create_assigns_identity() {
        let mut set = TriggerSet::default();
        let created = set.create(sarah_draft(), now()).unwrap();

        assert!(created.id.starts_with("trigger_"));
        assert!(created.actions[0].id.starts_with("action_"));
        assert_eq!(created.created_at, now());
        assert_eq!(created.trigger_count, 0);
        assert_eq!(created.last_triggered, None);
        assert_eq!(set.triggers().len(), 1);

        let second = set.create(sarah_draft(), now()).unwrap();
        assert_ne!(created.id, second.id);
    }

    #[test]
    fn test_create_rejects_invalid_draft() {
        let mut set = TriggerSet::default();
        let err = set
            .create(TriggerDraft::new(" ", TriggerCondition::Event(EventCondition::default())), now())
            .unwrap_err();
        match err {
            ValidationError::Trigger { errors, .. } => {
                assert!(errors.contains(&"name must not be empty".to_string()));
                assert!(errors.contains(&"trigger has no actions".to_string()));
            }
            other => panic!("unexpected: {other}"),
        }
        assert!(set.triggers().is_empty());
    }

    #[test]
    fn test_update_preserves_history() {
        let mut set = TriggerSet::default();
        let created = set.create(sarah_draft(), now()).unwrap();
        let mut set = {
            let mut triggers = set.into_inner();
            triggers[0].record_firing(now());
            triggers[0].record_firing(now());
            TriggerSet::new(triggers).unwrap()
        };

        let draft = TriggerDraft::from(set.get(&created.id).unwrap())
            .description("renamed")
            .enabled(false);
        let updated = set.update(&created.id, draft).unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.trigger_count, 2);
        assert_eq!(updated.last_triggered, Some(now()));
        assert_eq!(updated.description, "renamed");
        assert!(!updated.enabled);
    }

    #[test]
    fn test_toggle_and_delete() {
        let mut set = TriggerSet::default();
        let id = set.create(sarah_draft(), now()).unwrap().id;

        assert!(!set.toggle(&id).unwrap());
        assert!(set.toggle(&id).unwrap());
        assert_eq!(set.delete(&id).unwrap().id, id);
        assert_eq!(
            set.delete(&id).unwrap_err(),
            ValidationError::UnknownTrigger { id: id.clone() }
        );
        assert!(set.toggle("trigger_missing").is_err());
    }

    #[test]
    fn test_timer_draft_needs_valid_cron() {
        let mut set = TriggerSet::default();
        let ok = TriggerDraft::timer("nightly").action(ActionType::Log, "log", BTreeMap::new());
        assert!(set.create(ok, now()).is_ok());

        let bad = TriggerDraft::new(
            "broken",
            TriggerCondition::Timer(TimerCondition {
                cron_expression: "61 * * * *".into(),
                description: String::new(),
            }),
        )
        .action(ActionType::Log, "log", BTreeMap::new());
        let err = set.create(bad, now()).unwrap_err();
        assert!(err.to_string().contains("invalid cron expression"), "got: {err}");
    }

    #[test]
    fn test_action_rules() {
        let mut trigger = Trigger {
            id: "trigger_1".into(),
            name: "t".into(),
            description: String::new(),
            enabled: true,
            condition: TriggerCondition::Event(EventCondition {
                title_contains: Some(String::new()),
                ..Default::default()
            }),
            actions: vec![],
            created_at: now(),
            last_triggered: None,
            trigger_count: 0,
        };
        let hook = Action {
            id: "a1".into(),
            action_type: ActionType::Webhook,
            name: "hook".into(),
            description: String::new(),
            config: config(json!({"url": "https://example.com/webhook"})),
        };
        trigger.actions = vec![hook.clone(), hook];

        let err = validate_trigger(&trigger).unwrap_err();
        let ValidationError::Trigger { errors, .. } = err else {
            panic!("expected trigger error");
        };
        assert_eq!(
            errors,
            vec![
                "titleContains must not be empty when present".to_string(),
                "duplicate action id: a1".to_string(),
            ]
        );
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut set = TriggerSet::default();
        let created = set.create(sarah_draft(), now()).unwrap();
        let err = TriggerSet::new(vec![created.clone(), created]).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateTrigger { .. }));
    }

    #[test]
    fn test_presets_parse() {
        for preset in CRON_PRESETS {
            assert!(
                CronSchedule::parse(preset.expression).is_ok(),
                "{}",
                preset.expression
            );
        }
    }
}
