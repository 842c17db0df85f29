//! Record-to-statement translation shared by every entity kind.
//!
//! A caller builds a seed [`Record`], wraps it in [`Entities`] together with an
//! [`Action`], and hands the collection to a store. The store reflects the seed
//! into a [`ParameterMap`] with [`reflect`], turns that into a parameterized
//! [`Statement`] with [`synthesize`], and executes it.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

mod record;
mod records;
mod statement;

pub use record::{reflect, Field, FieldValue, ParamValue, ParameterMap, Record};
pub use records::{
    Event, IdMap, Static, Subscription, Template, Workflow, WorkflowState, Xdw,
    DSUB_TOPIC_TYPE_CODE, SYSTEM_USER,
};
pub use statement::{synthesize, template_for, Statement, StatementTemplate};

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum StatementError {
    #[error("{action} is not defined for table {table}")]
    Unsupported { action: Action, table: Table },
    #[error("update on {table} has no assignable column")]
    EmptyAssignment { table: Table },
}

/// Statement verb requested by a caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Select,
    Insert,
    Update,
    Delete,
    /// Increments the version counter of rows sharing a natural key.
    Deprecate,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Deprecate => "deprecate",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "select" => Some(Self::Select),
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "deprecate" => Some(Self::Deprecate),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_read(self) -> bool {
        self == Self::Select
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted table backing one record kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Subscriptions,
    Events,
    Workflows,
    WorkflowState,
    Xdws,
    Templates,
    IdMaps,
    Statics,
}

impl Table {
    pub const ALL: [Self; 8] = [
        Self::Subscriptions,
        Self::Events,
        Self::Workflows,
        Self::WorkflowState,
        Self::Xdws,
        Self::Templates,
        Self::IdMaps,
        Self::Statics,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subscriptions => "subscriptions",
            Self::Events => "events",
            Self::Workflows => "workflows",
            Self::WorkflowState => "workflowstate",
            Self::Xdws => "xdws",
            Self::Templates => "templates",
            Self::IdMaps => "idmaps",
            Self::Statics => "statics",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.as_str() == value)
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity collection passed through a store's `perform`.
///
/// `seed` is the input record (filter for reads and deletes, payload for
/// writes). After a select, `records` holds the materialized rows and `count`
/// their number; after an insert, `last_insert_id` holds the generated key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entities<R> {
    pub action: Action,
    #[serde(rename = "lastinsertid")]
    pub last_insert_id: i64,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<R>,
    pub records: Vec<R>,
}

impl<R: Record> Entities<R> {
    /// Collection without a seed; a select over it fetches the whole table.
    #[must_use]
    pub fn new(action: Action) -> Self {
        Self {
            action,
            last_insert_id: 0,
            count: 0,
            seed: None,
            records: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_seed(action: Action, seed: R) -> Self {
        Self {
            seed: Some(seed),
            ..Self::new(action)
        }
    }

    #[must_use]
    pub fn table(&self) -> Table {
        R::TABLE
    }

    /// Returns the single materialized record, or `None` for any other count.
    #[must_use]
    pub fn single(&self) -> Option<&R> {
        match self.records.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Builds the statement for this collection.
    ///
    /// Without a seed the statement is the unfiltered select for the table,
    /// whatever the action.
    ///
    /// # Errors
    /// Returns [`StatementError`] when the action has no statement shape for
    /// the table.
    pub fn statement(&self) -> Result<Statement, StatementError> {
        match &self.seed {
            Some(seed) => synthesize(self.action, R::TABLE, &reflect(seed)),
            None => Ok(Statement::select_all(R::TABLE)),
        }
    }

    pub fn push(&mut self, record: R) {
        self.records.push(record);
        self.count += 1;
    }
}

impl Entities<Event> {
    pub fn sort_newest_first(&mut self) {
        self.records.sort_by(|lhs, rhs| rhs.id.cmp(&lhs.id));
    }
}

impl Entities<IdMap> {
    pub fn sort_by_local_id_desc(&mut self) {
        self.records.sort_by(|lhs, rhs| rhs.lid.cmp(&lhs.lid));
    }
}

impl Entities<Workflow> {
    pub fn sort_by_pathway_desc(&mut self) {
        self.records.sort_by(|lhs, rhs| rhs.pathway.cmp(&lhs.pathway));
    }
}
