use serde::{Deserialize, Serialize};

use crate::{Field, Record, Table};

/// Fallback identifier namespace used when a user has no mapping of their own.
pub const SYSTEM_USER: &str = "system";

/// Topic of broker subscriptions keyed on document type code.
pub const DSUB_TOPIC_TYPE_CODE: &str = "$XDSDocumentEntryTypeCode";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    pub id: i64,
    pub created: String,
    #[serde(rename = "brokerref")]
    pub broker_ref: String,
    pub pathway: String,
    pub topic: String,
    pub expression: String,
    pub email: String,
    #[serde(rename = "nhsid")]
    pub nhs_id: String,
    pub user: String,
    pub org: String,
    pub role: String,
}

impl Record for Subscription {
    const TABLE: Table = Table::Subscriptions;

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::int("id", self.id),
            Field::text("created", &self.created),
            Field::text("brokerref", &self.broker_ref),
            Field::text("pathway", &self.pathway),
            Field::text("topic", &self.topic),
            Field::text("expression", &self.expression),
            Field::text("email", &self.email),
            Field::text("nhsid", &self.nhs_id),
            Field::text("user", &self.user),
            Field::text("org", &self.org),
            Field::text("role", &self.role),
        ]
    }
}

/// Audit event. `task_id` is `-1` when the event is not tied to a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    #[serde(rename = "creationtime")]
    pub creation_time: String,
    #[serde(rename = "eventtype")]
    pub event_type: String,
    #[serde(rename = "docname")]
    pub doc_name: String,
    #[serde(rename = "classcode")]
    pub class_code: String,
    #[serde(rename = "confcode")]
    pub conf_code: String,
    #[serde(rename = "formatcode")]
    pub format_code: String,
    #[serde(rename = "facilitycode")]
    pub facility_code: String,
    #[serde(rename = "practicecode")]
    pub practice_code: String,
    pub expression: String,
    pub authors: String,
    #[serde(rename = "xdspid")]
    pub xds_pid: String,
    #[serde(rename = "xdsdocentryuid")]
    pub xds_doc_entry_uid: String,
    #[serde(rename = "repositoryuniqueid")]
    pub repository_unique_id: String,
    #[serde(rename = "nhsid")]
    pub nhs_id: String,
    pub user: String,
    pub org: String,
    pub role: String,
    pub speciality: String,
    pub topic: String,
    pub pathway: String,
    pub comments: String,
    #[serde(rename = "ver")]
    pub version: i64,
    #[serde(rename = "taskid")]
    pub task_id: i64,
    #[serde(rename = "brokerref")]
    pub broker_ref: String,
}

impl Default for Event {
    fn default() -> Self {
        Self {
            id: 0,
            creation_time: String::new(),
            event_type: String::new(),
            doc_name: String::new(),
            class_code: String::new(),
            conf_code: String::new(),
            format_code: String::new(),
            facility_code: String::new(),
            practice_code: String::new(),
            expression: String::new(),
            authors: String::new(),
            xds_pid: String::new(),
            xds_doc_entry_uid: String::new(),
            repository_unique_id: String::new(),
            nhs_id: String::new(),
            user: String::new(),
            org: String::new(),
            role: String::new(),
            speciality: String::new(),
            topic: String::new(),
            pathway: String::new(),
            comments: String::new(),
            version: 0,
            task_id: -1,
            broker_ref: String::new(),
        }
    }
}

impl Record for Event {
    const TABLE: Table = Table::Events;

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::int("id", self.id),
            Field::text("creationtime", &self.creation_time),
            Field::text("eventtype", &self.event_type),
            Field::text("docname", &self.doc_name),
            Field::text("classcode", &self.class_code),
            Field::text("confcode", &self.conf_code),
            Field::text("formatcode", &self.format_code),
            Field::text("facilitycode", &self.facility_code),
            Field::text("practicecode", &self.practice_code),
            Field::text("expression", &self.expression),
            Field::text("authors", &self.authors),
            Field::text("xdspid", &self.xds_pid),
            Field::text("xdsdocentryuid", &self.xds_doc_entry_uid),
            Field::text("repositoryuniqueid", &self.repository_unique_id),
            Field::text("nhsid", &self.nhs_id),
            Field::text("user", &self.user),
            Field::text("org", &self.org),
            Field::text("role", &self.role),
            Field::text("speciality", &self.speciality),
            Field::text("topic", &self.topic),
            Field::text("pathway", &self.pathway),
            Field::text("comments", &self.comments),
            Field::int("version", self.version),
            Field::task_id("taskid", self.task_id),
            Field::text("brokerref", &self.broker_ref),
        ]
    }
}

/// Workflow instance for a patient on a pathway.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Workflow {
    pub id: i64,
    pub created: String,
    pub pathway: String,
    #[serde(rename = "nhsid")]
    pub nhs_id: String,
    pub xdw_key: String,
    pub xdw_uid: String,
    pub xdw_doc: String,
    pub xdw_def: String,
    pub version: i64,
    pub published: bool,
    pub status: String,
}

impl Record for Workflow {
    const TABLE: Table = Table::Workflows;

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::int("id", self.id),
            Field::text("created", &self.created),
            Field::text("pathway", &self.pathway),
            Field::text("nhsid", &self.nhs_id),
            Field::text("xdw_key", &self.xdw_key),
            Field::text("xdw_uid", &self.xdw_uid),
            Field::text("xdw_doc", &self.xdw_doc),
            Field::text("xdw_def", &self.xdw_def),
            Field::int("version", self.version),
            Field::boolean("published", self.published),
            Field::text("status", &self.status),
        ]
    }
}

/// Point-in-time snapshot of a workflow's progress.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowState {
    pub id: i64,
    #[serde(rename = "workflowid")]
    pub workflow_id: i64,
    pub pathway: String,
    #[serde(rename = "nhsid")]
    pub nhs_id: String,
    pub version: i64,
    pub published: bool,
    pub created: String,
    #[serde(rename = "createdby")]
    pub created_by: String,
    pub status: String,
    #[serde(rename = "completeby")]
    pub complete_by: String,
    #[serde(rename = "lastupdate")]
    pub last_update: String,
    pub owner: String,
    pub overdue: String,
    pub escalated: String,
    #[serde(rename = "targetmet")]
    pub target_met: String,
    #[serde(rename = "inprogress")]
    pub in_progress: String,
    pub duration: String,
    #[serde(rename = "timeremaining")]
    pub time_remaining: String,
}

impl Record for WorkflowState {
    const TABLE: Table = Table::WorkflowState;

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::int("id", self.id),
            Field::int("workflowid", self.workflow_id),
            Field::text("pathway", &self.pathway),
            Field::text("nhsid", &self.nhs_id),
            Field::int("version", self.version),
            Field::boolean("published", self.published),
            Field::text("created", &self.created),
            Field::text("createdby", &self.created_by),
            Field::text("status", &self.status),
            Field::text("completeby", &self.complete_by),
            Field::text("lastupdate", &self.last_update),
            Field::text("owner", &self.owner),
            Field::text("overdue", &self.overdue),
            Field::text("escalated", &self.escalated),
            Field::text("targetmet", &self.target_met),
            Field::text("inprogress", &self.in_progress),
            Field::text("duration", &self.duration),
            Field::text("timeremaining", &self.time_remaining),
        ]
    }
}

/// Workflow definition, or its XDS metadata companion when `is_xds_meta`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Xdw {
    pub id: i64,
    pub name: String,
    #[serde(rename = "isxdsmeta")]
    pub is_xds_meta: bool,
    pub xdw: String,
}

impl Record for Xdw {
    const TABLE: Table = Table::Xdws;

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::int("id", self.id),
            Field::text("name", &self.name),
            Field::boolean("isxdsmeta", self.is_xds_meta),
            Field::text("xdw", &self.xdw),
        ]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Template {
    pub id: i64,
    pub name: String,
    pub template: String,
    pub user: String,
}

impl Record for Template {
    const TABLE: Table = Table::Templates;

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::int("id", self.id),
            Field::text("name", &self.name),
            Field::text("template", &self.template),
            Field::text("user", &self.user),
        ]
    }
}

/// Translation between a user's local identifier and the canonical one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdMap {
    pub id: i64,
    pub user: String,
    pub lid: String,
    pub mid: String,
}

impl IdMap {
    #[must_use]
    pub fn new(user: &str, lid: &str, mid: &str) -> Self {
        Self {
            id: 0,
            user: user.to_string(),
            lid: lid.to_string(),
            mid: mid.to_string(),
        }
    }
}

impl Record for IdMap {
    const TABLE: Table = Table::IdMaps;

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::int("id", self.id),
            Field::text("user", &self.user),
            Field::text("lid", &self.lid),
            Field::text("mid", &self.mid),
        ]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Static {
    pub id: i64,
    pub name: String,
    pub content: String,
}

impl Record for Static {
    const TABLE: Table = Table::Statics;

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::int("id", self.id),
            Field::text("name", &self.name),
            Field::text("content", &self.content),
        ]
    }
}
