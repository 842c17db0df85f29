use std::fmt::{Display, Formatter};

use tracing::{debug, warn};

use crate::Table;

const LOG_TRUNCATE_OVER: usize = 100;
const LOG_TRUNCATED_PREFIX: usize = 50;

/// A record kind with a fixed attribute set and a designated table.
pub trait Record: Clone + Default {
    const TABLE: Table;

    /// Attributes in declaration order, keyed by lower-case column name.
    fn fields(&self) -> Vec<Field<'_>>;
}

/// Kind and current value of one record attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Int(i64),
    /// Integer where zero is a meaningful value rather than "unset".
    TaskId(i64),
    Bool(bool),
    Text(&'a str),
    /// Attribute the reflector has no rule for; carries a kind label.
    Unsupported(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    pub column: &'static str,
    pub value: FieldValue<'a>,
}

impl<'a> Field<'a> {
    #[must_use]
    pub const fn int(column: &'static str, value: i64) -> Self {
        Self {
            column,
            value: FieldValue::Int(value),
        }
    }

    #[must_use]
    pub const fn task_id(column: &'static str, value: i64) -> Self {
        Self {
            column,
            value: FieldValue::TaskId(value),
        }
    }

    #[must_use]
    pub const fn boolean(column: &'static str, value: bool) -> Self {
        Self {
            column,
            value: FieldValue::Bool(value),
        }
    }

    #[must_use]
    pub fn text(column: &'static str, value: &'a str) -> Self {
        Self {
            column,
            value: FieldValue::Text(value),
        }
    }

    #[must_use]
    pub const fn unsupported(column: &'static str, kind: &'static str) -> Self {
        Self {
            column,
            value: FieldValue::Unsupported(kind),
        }
    }
}

/// Scalar bound to a statement placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Null,
    Int(i64),
    Bool(bool),
    Text(String),
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// Column → value pairs in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterMap {
    entries: Vec<(&'static str, ParamValue)>,
}

impl ParameterMap {
    /// Sets `column`, replacing an earlier value in place.
    pub fn insert(&mut self, column: &'static str, value: ParamValue) {
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParamValue)> + '_ {
        self.entries.iter().map(|(name, value)| (*name, value))
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds the parameter map for a seed record.
///
/// Integers are kept when positive, task ids when non-negative, booleans
/// always, text when non-empty. Unsupported attributes are logged and skipped.
#[must_use]
pub fn reflect<R: Record>(record: &R) -> ParameterMap {
    let mut params = ParameterMap::default();

    for field in record.fields() {
        let value = match field.value {
            FieldValue::Int(value) if value > 0 => ParamValue::Int(value),
            FieldValue::TaskId(value) if value >= 0 => ParamValue::Int(value),
            FieldValue::Int(_) | FieldValue::TaskId(_) => continue,
            FieldValue::Bool(value) => ParamValue::Bool(value),
            FieldValue::Text(value) if !value.is_empty() => ParamValue::Text(value.to_string()),
            FieldValue::Text(_) => continue,
            FieldValue::Unsupported(kind) => {
                warn!(
                    table = %R::TABLE,
                    column = field.column,
                    kind,
                    "skipping field of unsupported kind"
                );
                continue;
            }
        };

        log_reflected(field.column, &value);
        params.insert(field.column, value);
    }

    params
}

fn log_reflected(column: &str, value: &ParamValue) {
    match value {
        ParamValue::Text(text) if text.chars().count() > LOG_TRUNCATE_OVER => {
            let prefix: String = text.chars().take(LOG_TRUNCATED_PREFIX).collect();
            debug!(column, value = %prefix, truncated = true, "reflected param");
        }
        _ => debug!(column, value = %value, "reflected param"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Event, Subscription, Workflow, Xdw};
    use proptest::prelude::*;

    #[derive(Debug, Clone, Default)]
    struct Reading {
        id: i64,
        label: String,
    }

    impl Record for Reading {
        const TABLE: Table = Table::Statics;

        fn fields(&self) -> Vec<Field<'_>> {
            vec![
                Field::int("id", self.id),
                Field::text("label", &self.label),
                Field::unsupported("score", "float"),
            ]
        }
    }

    #[test]
    fn zero_record_without_booleans_reflects_nothing() {
        assert!(reflect(&Subscription::default()).is_empty());
    }

    #[test]
    fn booleans_are_always_reflected() {
        let params = reflect(&Workflow::default());
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("published"), Some(&ParamValue::Bool(false)));
    }

    #[test]
    fn task_id_zero_is_kept_but_other_zero_integers_are_not() {
        let event = Event {
            task_id: 0,
            version: 0,
            ..Event::default()
        };
        let params = reflect(&event);
        assert_eq!(params.get("taskid"), Some(&ParamValue::Int(0)));
        assert!(!params.contains("version"));
        assert!(!params.contains("id"));

        let unset = Event {
            task_id: -1,
            ..Event::default()
        };
        assert!(reflect(&unset).is_empty());
    }

    #[test]
    fn columns_follow_declaration_order() {
        let sub = Subscription {
            role: "clinician".to_string(),
            pathway: "P1".to_string(),
            nhs_id: "9999999468".to_string(),
            ..Subscription::default()
        };
        let columns: Vec<&str> = reflect(&sub).columns().collect();
        assert_eq!(columns, vec!["pathway", "nhsid", "role"]);
    }

    #[test]
    fn unsupported_fields_are_skipped_without_aborting() {
        let reading = Reading {
            id: 4,
            label: "bp".to_string(),
        };
        let params = reflect(&reading);
        let columns: Vec<&str> = params.columns().collect();
        assert_eq!(columns, vec!["id", "label"]);
    }

    #[test]
    fn long_text_is_reflected_in_full() {
        let body = "x".repeat(500);
        let xdw = Xdw {
            xdw: body.clone(),
            ..Xdw::default()
        };
        assert_eq!(reflect(&xdw).get("xdw"), Some(&ParamValue::Text(body)));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut params = ParameterMap::default();
        params.insert("a", ParamValue::Int(1));
        params.insert("b", ParamValue::Int(2));
        params.insert("a", ParamValue::Int(3));
        let entries: Vec<(&str, &ParamValue)> = params.iter().collect();
        assert_eq!(
            entries,
            vec![("a", &ParamValue::Int(3)), ("b", &ParamValue::Int(2))]
        );
    }

    proptest! {
        #[test]
        fn prop_integer_inclusion_rules(id in -5_i64..5, task_id in -5_i64..5, version in -5_i64..5) {
            let event = Event { id, task_id, version, ..Event::default() };
            let params = reflect(&event);
            prop_assert_eq!(params.contains("id"), id > 0);
            prop_assert_eq!(params.contains("version"), version > 0);
            prop_assert_eq!(params.contains("taskid"), task_id >= 0);
        }

        #[test]
        fn prop_text_included_only_when_non_empty(pathway in "[a-z0-9]{0,6}") {
            let sub = Subscription { pathway: pathway.clone(), ..Subscription::default() };
            let params = reflect(&sub);
            prop_assert_eq!(params.contains("pathway"), !pathway.is_empty());
        }
    }
}
