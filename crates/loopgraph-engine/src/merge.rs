use std::collections::BTreeMap;

use serde::Serialize;

use loopgraph_core::definition::MergeRule;
use loopgraph_core::error::{LoopgraphError, Result};
use loopgraph_core::types::{LogEntry, RunState, LOG_FIELD};
use loopgraph_core::value::Value;

/// Per-field rules for folding a step's update into the running state.
///
/// Fields without a rule are replaced. The execution log is not a field:
/// it always accumulates, one entry per executed node, and no step may
/// write it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergePolicy {
    rules: BTreeMap<String, MergeRule>,
}

impl MergePolicy {
    pub fn new(rules: BTreeMap<String, MergeRule>) -> Self {
        Self { rules }
    }

    pub fn rule_for(&self, field: &str) -> MergeRule {
        self.rules.get(field).copied().unwrap_or_default()
    }

    /// Fold `entry.update` into `state.fields`, then append `entry` to the log.
    ///
    /// All-or-nothing: on error the state is left untouched and the error
    /// names the entry's node.
    pub fn apply(&self, state: &mut RunState, entry: LogEntry) -> Result<()> {
        let fail = |cause: String| LoopgraphError::StepExecution {
            node: entry.node.clone(),
            cause,
        };

        if entry.update.contains_key(LOG_FIELD) {
            return Err(fail(format!("step wrote reserved field '{}'", LOG_FIELD)));
        }

        let mut merged = Vec::with_capacity(entry.update.len());
        for (key, value) in &entry.update {
            let next = match self.rule_for(key) {
                MergeRule::Replace => value.clone(),
                MergeRule::Append => append(key, state.fields.get(key), value).map_err(fail)?,
            };
            merged.push((key.clone(), next));
        }

        state.fields.extend(merged);
        state.log.push(entry);
        Ok(())
    }
}

fn append(
    key: &str,
    current: Option<&Value>,
    update: &Value,
) -> std::result::Result<Value, String> {
    let mut items = match current {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::List(items)) => items.clone(),
        Some(other) => {
            return Err(format!(
                "cannot append to field '{}' holding {}",
                key,
                other.kind()
            ))
        }
    };

    match update {
        Value::List(new_items) => items.extend(new_items.iter().cloned()),
        scalar => items.push(scalar.clone()),
    }
    Ok(Value::List(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopgraph_core::value::Fields;

    fn entry(node: &str, update: &[(&str, Value)]) -> LogEntry {
        LogEntry {
            node: node.into(),
            step: format!("{}_step", node),
            update: update
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_replace_is_default() {
        let policy = MergePolicy::default();
        let mut state = RunState::new(Fields::new());
        state.fields.insert("summary".into(), Value::from("old"));
        state.fields.insert("untouched".into(), Value::Integer(1));

        policy
            .apply(&mut state, entry("refine", &[("summary", Value::from("new"))]))
            .unwrap();

        assert_eq!(state.fields["summary"], Value::from("new"));
        assert_eq!(state.fields["untouched"], Value::Integer(1));
        assert_eq!(state.log.len(), 1);
        assert_eq!(state.log[0].node, "refine");
    }

    #[test]
    fn test_log_grows_by_one_per_apply() {
        let policy = MergePolicy::default();
        let mut state = RunState::default();
        for (i, node) in ["a", "b", "c"].iter().enumerate() {
            policy
                .apply(&mut state, entry(node, &[("i", Value::from(i))]))
                .unwrap();
            assert_eq!(state.log.len(), i + 1);
        }
        assert_eq!(state.trace(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_append_rule() {
        let mut rules = BTreeMap::new();
        rules.insert("notes".to_string(), MergeRule::Append);
        let policy = MergePolicy::new(rules);
        let mut state = RunState::default();

        policy
            .apply(&mut state, entry("a", &[("notes", Value::from("first"))]))
            .unwrap();
        policy
            .apply(
                &mut state,
                entry("b", &[("notes", Value::from(vec!["second", "third"]))]),
            )
            .unwrap();

        assert_eq!(
            state.fields["notes"].as_text_list(),
            Some(vec!["first", "second", "third"])
        );
    }

    #[test]
    fn test_append_to_scalar_fails_without_mutation() {
        let mut rules = BTreeMap::new();
        rules.insert("notes".to_string(), MergeRule::Append);
        let policy = MergePolicy::new(rules);
        let mut state = RunState::default();
        state.fields.insert("notes".into(), Value::from("scalar"));

        let err = policy
            .apply(
                &mut state,
                entry("a", &[("count", Value::Integer(1)), ("notes", Value::from("x"))]),
            )
            .unwrap_err();

        match err {
            LoopgraphError::StepExecution { node, cause } => {
                assert_eq!(node, "a");
                assert!(cause.contains("cannot append"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!state.fields.contains_key("count"));
        assert!(state.log.is_empty());
    }

    #[test]
    fn test_step_writing_log_is_rejected() {
        let policy = MergePolicy::default();
        let mut state = RunState::default();
        let err = policy
            .apply(&mut state, entry("a", &[(LOG_FIELD, Value::List(vec![]))]))
            .unwrap_err();
        assert!(err.to_string().contains("reserved"));
        assert!(state.log.is_empty());
    }
}
