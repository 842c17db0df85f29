use tracing::{debug, warn};

use crate::{Action, ParamValue, ParameterMap, StatementError, Table};

/// Parameterized SQL text with its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<ParamValue>,
}

impl Statement {
    #[must_use]
    pub fn select_all(table: Table) -> Self {
        Self {
            sql: format!("SELECT * FROM {table}"),
            args: Vec::new(),
        }
    }
}

/// Table-specific statement shapes for actions that have no generic form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementTemplate {
    /// `UPDATE t SET version = version + 1 WHERE <keys>`.
    VersionBump { keys: &'static [&'static str] },
    /// `UPDATE t SET <set> WHERE <keys>` with a fixed column list.
    Assign {
        set: &'static [&'static str],
        keys: &'static [&'static str],
    },
    /// `UPDATE t SET <every present column but key> WHERE key = ?`.
    AssignPresent { key: &'static str },
}

const TEMPLATES: &[(Action, Table, StatementTemplate)] = &[
    (
        Action::Deprecate,
        Table::Workflows,
        StatementTemplate::VersionBump { keys: &["xdw_key"] },
    ),
    (
        Action::Deprecate,
        Table::Events,
        StatementTemplate::VersionBump {
            keys: &["pathway", "nhsid"],
        },
    ),
    (
        Action::Update,
        Table::Workflows,
        StatementTemplate::Assign {
            set: &["xdw_doc", "published", "status"],
            keys: &["pathway", "nhsid", "version"],
        },
    ),
    (
        Action::Update,
        Table::IdMaps,
        StatementTemplate::AssignPresent { key: "id" },
    ),
];

#[must_use]
pub fn template_for(action: Action, table: Table) -> Option<StatementTemplate> {
    TEMPLATES
        .iter()
        .find(|(candidate_action, candidate_table, _)| {
            *candidate_action == action && *candidate_table == table
        })
        .map(|(_, _, template)| *template)
}

/// Builds the statement for `action` against `table`.
///
/// An empty parameter map always yields the unfiltered select for the table.
///
/// # Errors
/// Returns [`StatementError::Unsupported`] for an update or deprecate on a table
/// without a template, and [`StatementError::EmptyAssignment`] when an
/// identifier-keyed update has nothing to set.
pub fn synthesize(
    action: Action,
    table: Table,
    params: &ParameterMap,
) -> Result<Statement, StatementError> {
    if params.is_empty() {
        return Ok(Statement::select_all(table));
    }

    let statement = match action {
        Action::Select => {
            let (filter, args) = conjunction(params);
            Statement {
                sql: format!("SELECT * FROM {table} WHERE {filter}"),
                args,
            }
        }
        Action::Delete => {
            let (filter, args) = conjunction(params);
            Statement {
                sql: format!("DELETE FROM {table} WHERE {filter}"),
                args,
            }
        }
        Action::Insert => {
            let columns: Vec<&str> = params.columns().collect();
            let placeholders = vec!["?"; columns.len()];
            Statement {
                sql: format!(
                    "INSERT INTO {table} ({}) VALUES ({})",
                    columns.join(", "),
                    placeholders.join(", ")
                ),
                args: params.iter().map(|(_, value)| value.clone()).collect(),
            }
        }
        Action::Update | Action::Deprecate => {
            let template =
                template_for(action, table).ok_or(StatementError::Unsupported { action, table })?;
            render_template(template, table, params)?
        }
    };

    debug!(
        action = %action,
        sql = %statement.sql,
        args = statement.args.len(),
        "synthesized statement"
    );
    Ok(statement)
}

fn conjunction(params: &ParameterMap) -> (String, Vec<ParamValue>) {
    let filter = params
        .columns()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ");
    let args = params.iter().map(|(_, value)| value.clone()).collect();
    (filter, args)
}

fn render_template(
    template: StatementTemplate,
    table: Table,
    params: &ParameterMap,
) -> Result<Statement, StatementError> {
    match template {
        StatementTemplate::VersionBump { keys } => Ok(Statement {
            sql: format!(
                "UPDATE {table} SET version = version + 1 WHERE {}",
                equalities(keys, " AND ")
            ),
            args: lookup(table, keys, params),
        }),
        StatementTemplate::Assign { set, keys } => {
            let mut args = lookup(table, set, params);
            args.extend(lookup(table, keys, params));
            Ok(Statement {
                sql: format!(
                    "UPDATE {table} SET {} WHERE {}",
                    equalities(set, ", "),
                    equalities(keys, " AND ")
                ),
                args,
            })
        }
        StatementTemplate::AssignPresent { key } => {
            let assigned: Vec<&'static str> =
                params.columns().filter(|column| *column != key).collect();
            if assigned.is_empty() {
                return Err(StatementError::EmptyAssignment { table });
            }
            let mut args = lookup(table, &assigned, params);
            args.extend(lookup(table, &[key], params));
            Ok(Statement {
                sql: format!(
                    "UPDATE {table} SET {} WHERE {key} = ?",
                    equalities(&assigned, ", ")
                ),
                args,
            })
        }
    }
}

fn equalities(columns: &[&str], separator: &str) -> String {
    columns
        .iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(separator)
}

// Columns a template names but the seed left unset bind as NULL.
fn lookup(table: Table, columns: &[&str], params: &ParameterMap) -> Vec<ParamValue> {
    columns
        .iter()
        .map(|column| {
            params.get(column).cloned().unwrap_or_else(|| {
                warn!(table = %table, column, "template column unset, binding NULL");
                ParamValue::Null
            })
        })
        .collect()
}
