use record_gateway_core::{
    Event, IdMap, Record, Static, Subscription, Template, Workflow, WorkflowState, Xdw,
};
use rusqlite::Row;

/// Builds a record from a `SELECT *` row of its table.
///
/// Columns are read by position, so each implementation must follow the
/// column order of the table it reads.
pub trait Materialize: Record {
    fn scan(row: &Row<'_>) -> rusqlite::Result<Self>;
}

fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

fn int(row: &Row<'_>, idx: usize) -> rusqlite::Result<i64> {
    Ok(row.get::<_, Option<i64>>(idx)?.unwrap_or_default())
}

fn flag(row: &Row<'_>, idx: usize) -> rusqlite::Result<bool> {
    Ok(int(row, idx)? != 0)
}

impl Materialize for Subscription {
    fn scan(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: int(row, 0)?,
            created: text(row, 1)?,
            broker_ref: text(row, 2)?,
            pathway: text(row, 3)?,
            topic: text(row, 4)?,
            expression: text(row, 5)?,
            email: text(row, 6)?,
            nhs_id: text(row, 7)?,
            user: text(row, 8)?,
            org: text(row, 9)?,
            role: text(row, 10)?,
        })
    }
}

// `speciality` sits after the practice code in the events table.
impl Materialize for Event {
    fn scan(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: int(row, 0)?,
            creation_time: text(row, 1)?,
            event_type: text(row, 2)?,
            doc_name: text(row, 3)?,
            class_code: text(row, 4)?,
            conf_code: text(row, 5)?,
            format_code: text(row, 6)?,
            facility_code: text(row, 7)?,
            practice_code: text(row, 8)?,
            speciality: text(row, 9)?,
            expression: text(row, 10)?,
            authors: text(row, 11)?,
            xds_pid: text(row, 12)?,
            xds_doc_entry_uid: text(row, 13)?,
            repository_unique_id: text(row, 14)?,
            nhs_id: text(row, 15)?,
            user: text(row, 16)?,
            org: text(row, 17)?,
            role: text(row, 18)?,
            topic: text(row, 19)?,
            pathway: text(row, 20)?,
            comments: text(row, 21)?,
            version: int(row, 22)?,
            task_id: row.get::<_, Option<i64>>(23)?.unwrap_or(-1),
            broker_ref: text(row, 24)?,
        })
    }
}

impl Materialize for Workflow {
    fn scan(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: int(row, 0)?,
            pathway: text(row, 1)?,
            nhs_id: text(row, 2)?,
            created: text(row, 3)?,
            xdw_key: text(row, 4)?,
            xdw_uid: text(row, 5)?,
            xdw_doc: text(row, 6)?,
            xdw_def: text(row, 7)?,
            version: int(row, 8)?,
            published: flag(row, 9)?,
            status: text(row, 10)?,
        })
    }
}

impl Materialize for WorkflowState {
    fn scan(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: int(row, 0)?,
            workflow_id: int(row, 1)?,
            pathway: text(row, 2)?,
            nhs_id: text(row, 3)?,
            version: int(row, 4)?,
            published: flag(row, 5)?,
            created: text(row, 6)?,
            created_by: text(row, 7)?,
            status: text(row, 8)?,
            complete_by: text(row, 9)?,
            last_update: text(row, 10)?,
            owner: text(row, 11)?,
            overdue: text(row, 12)?,
            escalated: text(row, 13)?,
            target_met: text(row, 14)?,
            in_progress: text(row, 15)?,
            duration: text(row, 16)?,
            time_remaining: text(row, 17)?,
        })
    }
}

impl Materialize for Xdw {
    fn scan(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: int(row, 0)?,
            name: text(row, 1)?,
            is_xds_meta: flag(row, 2)?,
            xdw: text(row, 3)?,
        })
    }
}

impl Materialize for Template {
    fn scan(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: int(row, 0)?,
            name: text(row, 1)?,
            template: text(row, 2)?,
            user: text(row, 3)?,
        })
    }
}

impl Materialize for IdMap {
    fn scan(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: int(row, 0)?,
            lid: text(row, 1)?,
            mid: text(row, 2)?,
            user: text(row, 3)?,
        })
    }
}

impl Materialize for Static {
    fn scan(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: int(row, 0)?,
            name: text(row, 1)?,
            content: text(row, 2)?,
        })
    }
}
