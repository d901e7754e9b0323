//! Operation scripts shared by both adapter surfaces
//!
//! Each adapter operation is planned here as a [`Script`]: the store commands
//! to send, in order, and a `finish` step turning their replies into the
//! operation's result. Planning does all validation and encoding, so an
//! invalid rule fails before any command reaches the store. The blocking and
//! non-blocking surfaces differ only in how they send the commands.

use tracing::warn;

use super::errors::{AdapterError, AdapterResult};
use crate::filter::{self, Filter};
use crate::model::PolicyModel;
use crate::observability::{AdapterEvent, OperationScope};
use crate::rule::{PolicyRule, RuleDocument, MAX_FIELDS, PTYPE_FIELD};
use crate::store::{Document, Query, StoreCommand, StoreError, StoreReply};

/// Turns the replies of a script's commands into its result
pub(crate) type Finish<T> = fn(Vec<StoreReply>) -> AdapterResult<T>;

/// A planned adapter operation
#[derive(Debug)]
pub(crate) struct Script<T> {
    event: AdapterEvent,
    commands: Vec<StoreCommand>,
    finish: Finish<T>,
}

impl<T> Script<T> {
    fn new(event: AdapterEvent, commands: Vec<StoreCommand>, finish: Finish<T>) -> Self {
        Self {
            event,
            commands,
            finish,
        }
    }

    /// Event name, commands to send in order, and the reply handler
    pub(crate) fn into_parts(self) -> (AdapterEvent, Vec<StoreCommand>, Finish<T>) {
        (self.event, self.commands, self.finish)
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Fetch every rule, or only those accepted by `filter`
pub(crate) fn load(filter: Option<&Filter>) -> AdapterResult<Script<Vec<PolicyRule>>> {
    let (event, query) = match filter {
        Some(filter) => (AdapterEvent::LoadFilteredPolicy, filter::build(filter)?),
        None => (AdapterEvent::LoadPolicy, filter::match_all()),
    };

    Ok(Script::new(
        event,
        vec![StoreCommand::Find { query }],
        decode_found,
    ))
}

/// Replace the collection's contents with every rule of the model
pub(crate) fn save<M: PolicyModel + ?Sized>(model: &M) -> AdapterResult<Script<()>> {
    let mut documents = Vec::new();
    for section in model.rule_sections() {
        for rule in section.rules {
            let document = RuleDocument::from_rule(section.ptype, rule.as_slice())?;
            documents.push(document.to_document());
        }
    }

    let mut commands = vec![StoreCommand::Delete {
        query: filter::match_all(),
    }];
    if !documents.is_empty() {
        commands.push(StoreCommand::Insert { documents });
    }

    Ok(Script::new(AdapterEvent::SavePolicy, commands, expect_saved))
}

/// Insert one rule
pub(crate) fn add<S: AsRef<str>>(ptype: &str, rule: &[S]) -> AdapterResult<Script<()>> {
    let document = RuleDocument::from_rule(ptype, rule)?.to_document();
    Ok(Script::new(
        AdapterEvent::AddPolicy,
        vec![StoreCommand::Insert {
            documents: vec![document],
        }],
        expect_inserted,
    ))
}

/// Insert a batch of rules with one ordered insert
pub(crate) fn add_many<S: AsRef<str>>(
    ptype: &str,
    rules: &[Vec<S>],
) -> AdapterResult<Script<()>> {
    let documents = rules
        .iter()
        .map(|rule| RuleDocument::from_rule(ptype, rule.as_slice()).map(|d| d.to_document()))
        .collect::<AdapterResult<Vec<Document>>>()?;

    let commands = if documents.is_empty() {
        Vec::new()
    } else {
        vec![StoreCommand::Insert { documents }]
    };

    Ok(Script::new(AdapterEvent::AddPolicies, commands, expect_inserted))
}

/// Delete documents stored exactly as `rule`
pub(crate) fn remove<S: AsRef<str>>(ptype: &str, rule: &[S]) -> AdapterResult<Script<bool>> {
    let query = filter::exact_match(ptype, rule)?;
    Ok(Script::new(
        AdapterEvent::RemovePolicy,
        vec![StoreCommand::Delete { query }],
        all_deleted,
    ))
}

/// One exact-match delete per rule; every rule is attempted
pub(crate) fn remove_many<S: AsRef<str>>(
    ptype: &str,
    rules: &[Vec<S>],
) -> AdapterResult<Script<bool>> {
    let commands = rules
        .iter()
        .map(|rule| {
            filter::exact_match(ptype, rule.as_slice()).map(|query| StoreCommand::Delete { query })
        })
        .collect::<AdapterResult<Vec<_>>>()?;

    Ok(Script::new(AdapterEvent::RemovePolicies, commands, all_deleted))
}

/// Delete rules whose fields from `field_index` on equal `values`.
///
/// Plans no command (and so reports `false`) when the index or the values
/// run past the last slot. No values at all deletes every rule of `ptype`.
pub(crate) fn remove_filtered<S: AsRef<str>>(
    ptype: &str,
    field_index: usize,
    values: &[S],
) -> Script<bool> {
    let query = if field_index >= MAX_FIELDS {
        None
    } else {
        filter::prefix_match(ptype, field_index, values)
    };

    let commands = query
        .map(|query| vec![StoreCommand::Delete { query }])
        .unwrap_or_default();

    Script::new(AdapterEvent::RemoveFilteredPolicy, commands, all_deleted)
}

/// Rewrite the positional fields of the first document stored as `old`
pub(crate) fn update<S: AsRef<str>>(
    ptype: &str,
    old: &[S],
    new: &[S],
) -> AdapterResult<Script<bool>> {
    let command = update_command(ptype, old, new)?;
    Ok(Script::new(
        AdapterEvent::UpdatePolicy,
        vec![command],
        all_matched,
    ))
}

/// Pairwise updates; lengths and arities are checked before anything is sent
pub(crate) fn update_many<S: AsRef<str>>(
    ptype: &str,
    old: &[Vec<S>],
    new: &[Vec<S>],
) -> AdapterResult<Script<bool>> {
    if old.len() != new.len() {
        return Err(AdapterError::BatchMismatch {
            old: old.len(),
            new: new.len(),
        });
    }

    let commands = old
        .iter()
        .zip(new)
        .map(|(old, new)| update_command(ptype, old.as_slice(), new.as_slice()))
        .collect::<AdapterResult<Vec<_>>>()?;

    Ok(Script::new(AdapterEvent::UpdatePolicies, commands, all_matched))
}

fn update_command<S: AsRef<str>>(
    ptype: &str,
    old: &[S],
    new: &[S],
) -> AdapterResult<StoreCommand> {
    let query: Query = filter::exact_match(ptype, old)?;
    let set = RuleDocument::from_rule(ptype, new)?.positional_document();
    Ok(StoreCommand::UpdateOne { query, set })
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

fn unexpected(expected: &str, reply: &StoreReply) -> AdapterError {
    StoreError::Protocol(format!("expected a {} reply, got {}", expected, reply)).into()
}

fn decode_found(replies: Vec<StoreReply>) -> AdapterResult<Vec<PolicyRule>> {
    let mut documents = Vec::new();
    for reply in replies {
        match reply {
            StoreReply::Found(found) => documents.extend(found),
            other => return Err(unexpected("find", &other)),
        }
    }

    let mut rules = Vec::with_capacity(documents.len());
    for document in &documents {
        match RuleDocument::from_document(document)? {
            Some(decoded) => rules.push(decoded.into_rule()),
            None => warn!(
                event = AdapterEvent::DocumentSkipped.as_str(),
                id = %document.get("_id").unwrap_or(&serde_json::Value::Null),
                "stored document has no {}",
                PTYPE_FIELD
            ),
        }
    }

    Ok(rules)
}

fn expect_saved(replies: Vec<StoreReply>) -> AdapterResult<()> {
    let mut replies = replies.into_iter();
    match replies.next() {
        Some(StoreReply::Deleted(_)) => {}
        Some(other) => return Err(unexpected("delete", &other)),
        None => return Err(StoreError::Protocol("save sent no commands".to_string()).into()),
    }
    expect_inserted(replies.collect())
}

fn expect_inserted(replies: Vec<StoreReply>) -> AdapterResult<()> {
    for reply in &replies {
        if !matches!(reply, StoreReply::Inserted(_)) {
            return Err(unexpected("insert", reply));
        }
    }
    Ok(())
}

/// True when there was at least one delete and each removed something
fn all_deleted(replies: Vec<StoreReply>) -> AdapterResult<bool> {
    let mut all = !replies.is_empty();
    for reply in &replies {
        match reply {
            StoreReply::Deleted(count) => all &= *count > 0,
            other => return Err(unexpected("delete", other)),
        }
    }
    Ok(all)
}

/// True when there was at least one update and each matched a document
fn all_matched(replies: Vec<StoreReply>) -> AdapterResult<bool> {
    let mut all = !replies.is_empty();
    for reply in &replies {
        match reply {
            StoreReply::Updated { matched, .. } => all &= *matched > 0,
            other => return Err(unexpected("update", other)),
        }
    }
    Ok(all)
}

// ---------------------------------------------------------------------------
// Execution helpers
// ---------------------------------------------------------------------------

/// Insert loaded rules into the model; runs only once every document decoded
pub(crate) fn apply_loaded<M: PolicyModel + ?Sized>(model: &mut M, rules: Vec<PolicyRule>) {
    for rule in rules {
        model.load_rule(&rule.ptype, rule.fields);
    }
}

/// Log and convert a failed store command
pub(crate) fn abort(scope: OperationScope, command: &str, error: StoreError) -> AdapterError {
    scope.fail(command, error.code(), &error);
    error.into()
}

/// Hand the replies to the script's finish step and log the outcome
pub(crate) fn conclude<T>(
    scope: OperationScope,
    finish: Finish<T>,
    replies: Vec<StoreReply>,
) -> AdapterResult<T> {
    let outcome = replies
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    match finish(replies) {
        Ok(value) => {
            scope.complete(if outcome.is_empty() { "noop" } else { outcome.as_str() });
            Ok(value)
        }
        Err(e) => {
            let stage = if e.is_store() { "reply" } else { "decode" };
            scope.fail(stage, e.code(), &e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemoryModel;
    use serde_json::{json, Value};

    fn rule(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn test_load_plans_single_find() {
        let (event, commands, _) = load(None).unwrap().into_parts();
        assert_eq!(event, AdapterEvent::LoadPolicy);
        assert_eq!(
            commands,
            vec![StoreCommand::Find {
                query: Query::new()
            }]
        );
    }

    #[test]
    fn test_decode_skips_documents_without_ptype() {
        let replies = vec![StoreReply::Found(vec![
            doc(json!({"ptype": "p", "v0": "alice", "v1": "data1", "v2": "read"})),
            doc(json!({"_id": "x", "v0": "orphan"})),
        ])];
        let rules = decode_found(replies).unwrap();
        assert_eq!(rules, vec![PolicyRule::from_strs("p", &["alice", "data1", "read"])]);
    }

    #[test]
    fn test_decode_failure_fails_whole_load() {
        let replies = vec![StoreReply::Found(vec![
            doc(json!({"ptype": "p", "v0": "alice"})),
            doc(json!({"ptype": "p", "v0": 7})),
        ])];
        assert!(matches!(
            decode_found(replies).unwrap_err(),
            AdapterError::Decode(_)
        ));
    }

    #[test]
    fn test_save_of_empty_model_only_deletes() {
        let model = MemoryModel::new();
        let (_, commands, finish) = save(&model).unwrap().into_parts();
        assert_eq!(commands.len(), 1);
        assert!(finish(vec![StoreReply::Deleted(4)]).is_ok());
    }

    #[test]
    fn test_save_rejects_oversized_rule_before_sending() {
        let mut model = MemoryModel::new();
        model.add_rule("p", rule(&["a", "b", "c", "d", "e", "f", "g"]));
        assert!(matches!(save(&model).unwrap_err(), AdapterError::Arity(7)));
    }

    #[test]
    fn test_add_many_checks_every_rule_first() {
        let rules = vec![rule(&["alice"]), rule(&["1", "2", "3", "4", "5", "6", "7"])];
        assert!(matches!(
            add_many("p", &rules).unwrap_err(),
            AdapterError::Arity(7)
        ));
    }

    #[test]
    fn test_add_many_sends_one_insert() {
        let rules = vec![rule(&["alice", "data1"]), rule(&["bob", "data2"])];
        let (_, commands, _) = add_many("p", &rules).unwrap().into_parts();
        assert_eq!(commands.len(), 1);
        match &commands[0] {
            StoreCommand::Insert { documents } => assert_eq!(documents.len(), 2),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_remove_filtered_guards() {
        let (_, commands, finish) = remove_filtered("p", 6, &["x"]).into_parts();
        assert!(commands.is_empty());
        assert!(!finish(Vec::new()).unwrap());

        let (_, commands, _) = remove_filtered("p", 4, &["x", "y", "z"]).into_parts();
        assert!(commands.is_empty());

        let (_, commands, _) = remove_filtered::<&str>("p", 6, &[]).into_parts();
        assert!(commands.is_empty());

        let (_, commands, _) = remove_filtered::<&str>("p", 0, &[]).into_parts();
        match &commands[..] {
            [StoreCommand::Delete { query }] => {
                assert_eq!(query.len(), 1);
                assert_eq!(query["ptype"], "p");
            }
            other => panic!("unexpected commands {:?}", other),
        }

        let (_, commands, _) = remove_filtered("g", 1, &["data2_admin"]).into_parts();
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_update_many_length_mismatch() {
        let old = vec![rule(&["alice"]), rule(&["bob"])];
        let new = vec![rule(&["carol"])];
        assert!(matches!(
            update_many("p", &old, &new).unwrap_err(),
            AdapterError::BatchMismatch { old: 2, new: 1 }
        ));
    }

    #[test]
    fn test_update_sets_positional_fields_only() {
        let (_, commands, _) = update("p", &["alice", "data1"], &["alice", "data2", "write"])
            .unwrap()
            .into_parts();
        match &commands[0] {
            StoreCommand::UpdateOne { query, set } => {
                assert_eq!(query["v1"], "data1");
                assert_eq!(query["v2"], "");
                assert_eq!(set.len(), MAX_FIELDS);
                assert_eq!(set["v2"], "write");
                assert!(!set.contains_key(PTYPE_FIELD));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_all_deleted_requires_every_rule() {
        assert!(all_deleted(vec![StoreReply::Deleted(1), StoreReply::Deleted(2)]).unwrap());
        assert!(!all_deleted(vec![StoreReply::Deleted(1), StoreReply::Deleted(0)]).unwrap());
        assert!(!all_deleted(Vec::new()).unwrap());
    }

    #[test]
    fn test_unexpected_reply_is_protocol_error() {
        let err = all_matched(vec![StoreReply::Inserted(1)]).unwrap_err();
        assert_eq!(err.code(), "STORE_PROTOCOL_ERROR");
    }

    #[test]
    fn test_apply_loaded_inserts_in_order() {
        let mut model = MemoryModel::new();
        apply_loaded(
            &mut model,
            vec![
                PolicyRule::from_strs("p", &["alice", "data1", "read"]),
                PolicyRule::from_strs("p", &["bob", "data2", "write"]),
            ],
        );
        assert_eq!(model.rules("p")[1], rule(&["bob", "data2", "write"]));
    }
}
