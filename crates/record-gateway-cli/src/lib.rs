//! Command surface over the record gateway store.
//!
//! [`run_cli`] executes a parsed [`Cli`]; every command prints pretty JSON on
//! stdout. Logging goes to stderr.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use record_gateway_core::{IdMap, Subscription, SYSTEM_USER};
use record_gateway_store_sqlite::{Database, DbConfig};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "rgw")]
#[command(about = "Record gateway CLI")]
pub struct Cli {
    #[arg(long, env = "RGW_DB", default_value = "./record_gateway.sqlite3")]
    db: PathBuf,

    #[arg(long, env = "RGW_STATEMENT_TIMEOUT_MS", default_value_t = 2_000)]
    statement_timeout_ms: u64,

    #[arg(long, env = "RGW_BUSY_TIMEOUT_MS", default_value_t = 5_000)]
    busy_timeout_ms: u64,

    #[arg(long, env = "RGW_IDMAP_CACHE_SECS", default_value_t = 60)]
    idmap_cache_secs: u64,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    #[must_use]
    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            path: self.db.clone(),
            statement_timeout: Duration::from_millis(self.statement_timeout_ms),
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            idmap_cache_window: Duration::from_secs(self.idmap_cache_secs),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Schema {
        #[command(subcommand)]
        command: SchemaCommand,
    },
    Subs {
        #[command(subcommand)]
        command: SubsCommand,
    },
    Events {
        #[command(subcommand)]
        command: EventsCommand,
    },
    Workflows {
        #[command(subcommand)]
        command: WorkflowsCommand,
    },
    Xdw {
        #[command(subcommand)]
        command: XdwCommand,
    },
    Idmap {
        #[command(subcommand)]
        command: IdmapCommand,
    },
    Template {
        #[command(subcommand)]
        command: TemplateCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum SchemaCommand {
    /// Create any missing gateway tables.
    Init,
}

#[derive(Debug, Subcommand)]
pub enum SubsCommand {
    List(SubscriptionArgs),
    Add(SubscriptionArgs),
    /// Delete matching subscriptions and list what the user still holds.
    Cancel(SubscriptionArgs),
}

/// Subscription fields; omitted fields do not filter.
#[derive(Debug, Args)]
pub struct SubscriptionArgs {
    #[arg(long, default_value = "")]
    broker_ref: String,
    #[arg(long, default_value = "")]
    pathway: String,
    #[arg(long, default_value = "")]
    topic: String,
    #[arg(long, default_value = "")]
    expression: String,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long, default_value = "")]
    nhs_id: String,
    #[arg(long, default_value = "")]
    user: String,
    #[arg(long, default_value = "")]
    org: String,
    #[arg(long, default_value = "")]
    role: String,
}

impl From<SubscriptionArgs> for Subscription {
    fn from(args: SubscriptionArgs) -> Self {
        Self {
            broker_ref: args.broker_ref,
            pathway: args.pathway,
            topic: args.topic,
            expression: args.expression,
            email: args.email,
            nhs_id: args.nhs_id,
            user: args.user,
            org: args.org,
            role: args.role,
            ..Self::default()
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum EventsCommand {
    /// Comments recorded against one task.
    Notes(NotesArgs),
    /// Events for a patient on a pathway, newest first.
    List(PatientArgs),
}

#[derive(Debug, Args)]
pub struct NotesArgs {
    #[arg(long)]
    pathway: String,
    #[arg(long)]
    nhs_id: String,
    #[arg(long)]
    task_id: i64,
    #[arg(long, default_value_t = 0)]
    version: i64,
}

#[derive(Debug, Args)]
pub struct PatientArgs {
    #[arg(long)]
    pathway: String,
    #[arg(long)]
    nhs_id: String,
}

#[derive(Debug, Subcommand)]
pub enum WorkflowsCommand {
    List(WorkflowFilterArgs),
    /// Bump the version of every workflow sharing a key.
    Deprecate {
        #[arg(long)]
        xdw_key: String,
    },
}

#[derive(Debug, Args)]
pub struct WorkflowFilterArgs {
    #[arg(long, default_value = "")]
    pathway: String,
    #[arg(long, default_value = "")]
    nhs_id: String,
    #[arg(long, default_value_t = 0)]
    version: i64,
    #[arg(long, default_value = "")]
    status: String,
}

#[derive(Debug, Subcommand)]
pub enum XdwCommand {
    /// Registered definitions with display names mapped for a user.
    Pathways {
        #[arg(long, default_value = SYSTEM_USER)]
        user: String,
    },
    Show {
        #[arg(long)]
        name: String,
    },
    Meta {
        #[arg(long)]
        name: String,
    },
    /// Store a definition, replacing any with the same name.
    Put {
        #[arg(long)]
        name: String,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        meta: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum IdmapCommand {
    Add(IdmapEntryArgs),
    List,
    /// Local id to mapped id.
    Mapped {
        #[arg(long, default_value = SYSTEM_USER)]
        user: String,
        #[arg(long)]
        lid: String,
    },
    /// Mapped id to local id.
    Local {
        #[arg(long, default_value = SYSTEM_USER)]
        user: String,
        #[arg(long)]
        mid: String,
    },
}

#[derive(Debug, Args)]
pub struct IdmapEntryArgs {
    #[arg(long, default_value = SYSTEM_USER)]
    user: String,
    #[arg(long)]
    lid: String,
    #[arg(long)]
    mid: String,
}

#[derive(Debug, Subcommand)]
pub enum TemplateCommand {
    Put {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct Resolution<'a> {
    user: &'a str,
    input: &'a str,
    resolved: String,
}

pub fn run_cli(cli: Cli) -> Result<()> {
    let config = cli.db_config();
    let db = Database::open(config)
        .with_context(|| format!("failed to open database at {}", cli.db.display()))?;

    match cli.command {
        Command::Schema {
            command: SchemaCommand::Init,
        } => {
            db.init_schema().context("failed to create schema")?;
            print_json(&json!({ "initialized": true, "db": cli.db.display().to_string() }))?;
        }
        Command::Subs { command } => run_subs(command, &db)?,
        Command::Events { command } => run_events(command, &db)?,
        Command::Workflows { command } => run_workflows(command, &db)?,
        Command::Xdw { command } => run_xdw(command, &db)?,
        Command::Idmap { command } => run_idmap(command, &db)?,
        Command::Template {
            command: TemplateCommand::Put { user, name, file },
        } => {
            let body = read_body(&file)?;
            let id = db.persist_template(&user, &name, &body)?;
            print_json(&json!({ "id": id }))?;
        }
    }

    db.close().context("failed to close database")
}

fn run_subs(command: SubsCommand, db: &Database) -> Result<()> {
    match command {
        SubsCommand::List(args) => print_json(&db.subscriptions(args.into())?),
        SubsCommand::Add(args) => {
            let id = db.add_subscription(args.into())?;
            print_json(&json!({ "id": id }))
        }
        SubsCommand::Cancel(args) => print_json(&db.cancel_subscription(args.into())?),
    }
}

fn run_events(command: EventsCommand, db: &Database) -> Result<()> {
    match command {
        EventsCommand::Notes(args) => {
            let notes = db.task_notes(&args.pathway, &args.nhs_id, args.task_id, args.version)?;
            print_json(&json!({ "notes": notes }))
        }
        EventsCommand::List(args) => print_json(&db.events(&args.pathway, &args.nhs_id)?),
    }
}

fn run_workflows(command: WorkflowsCommand, db: &Database) -> Result<()> {
    match command {
        WorkflowsCommand::List(args) => print_json(&db.workflows(
            &args.pathway,
            &args.nhs_id,
            args.version,
            &args.status,
        )?),
        WorkflowsCommand::Deprecate { xdw_key } => {
            db.deprecate_workflow(&xdw_key)?;
            print_json(&json!({ "deprecated": xdw_key }))
        }
    }
}

fn run_xdw(command: XdwCommand, db: &Database) -> Result<()> {
    match command {
        XdwCommand::Pathways { user } => print_json(&db.pathways(&user)?),
        XdwCommand::Show { name } => print_json(&db.workflow_definition(&name)?),
        XdwCommand::Meta { name } => print_json(&db.workflow_xds_meta(&name)?),
        XdwCommand::Put { name, file, meta } => {
            let body = read_body(&file)?;
            let id = db.persist_workflow_definition(&name, &body, meta)?;
            print_json(&json!({ "id": id }))
        }
    }
}

fn run_idmap(command: IdmapCommand, db: &Database) -> Result<()> {
    match command {
        IdmapCommand::Add(args) => {
            let id = db.add_idmap(IdMap::new(&args.user, &args.lid, &args.mid))?;
            print_json(&json!({ "id": id }))
        }
        IdmapCommand::List => print_json(&db.idmaps()?),
        IdmapCommand::Mapped { user, lid } => {
            let resolved = db.resolver().resolve_mapped_id(&user, &lid);
            print_json(&Resolution {
                user: &user,
                input: &lid,
                resolved,
            })
        }
        IdmapCommand::Local { user, mid } => {
            let resolved = db.resolver().resolve_local_id(&user, &mid);
            print_json(&Resolution {
                user: &user,
                input: &mid,
                resolved,
            })
        }
    }
}

fn read_body(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
