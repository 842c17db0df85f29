use rusqlite::Connection;

/// Tables read and written by the gateway.
///
/// Column order is significant: rows are materialized by position.
pub const REFERENCE_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS subscriptions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  created TEXT NOT NULL DEFAULT (datetime('now')),
  brokerref TEXT DEFAULT '',
  pathway TEXT DEFAULT '',
  topic TEXT DEFAULT '',
  expression TEXT DEFAULT '',
  email TEXT DEFAULT '',
  nhsid TEXT DEFAULT '',
  user TEXT DEFAULT '',
  org TEXT DEFAULT '',
  role TEXT DEFAULT ''
);

CREATE TABLE IF NOT EXISTS events (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  creationtime TEXT NOT NULL DEFAULT (datetime('now')),
  eventtype TEXT DEFAULT '',
  docname TEXT DEFAULT '',
  classcode TEXT DEFAULT '',
  confcode TEXT DEFAULT '',
  formatcode TEXT DEFAULT '',
  facilitycode TEXT DEFAULT '',
  practicecode TEXT DEFAULT '',
  speciality TEXT DEFAULT '',
  expression TEXT DEFAULT '',
  authors TEXT DEFAULT '',
  xdspid TEXT DEFAULT '',
  xdsdocentryuid TEXT DEFAULT '',
  repositoryuniqueid TEXT DEFAULT '',
  nhsid TEXT DEFAULT '',
  user TEXT DEFAULT '',
  org TEXT DEFAULT '',
  role TEXT DEFAULT '',
  topic TEXT DEFAULT '',
  pathway TEXT DEFAULT '',
  comments TEXT DEFAULT '',
  version INTEGER NOT NULL DEFAULT 0,
  taskid INTEGER NOT NULL DEFAULT -1,
  brokerref TEXT DEFAULT ''
);

CREATE TABLE IF NOT EXISTS workflows (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  pathway TEXT DEFAULT '',
  nhsid TEXT DEFAULT '',
  created TEXT NOT NULL DEFAULT (datetime('now')),
  xdw_key TEXT DEFAULT '',
  xdw_uid TEXT DEFAULT '',
  xdw_doc TEXT DEFAULT '',
  xdw_def TEXT DEFAULT '',
  version INTEGER NOT NULL DEFAULT 0,
  published INTEGER NOT NULL DEFAULT 0 CHECK (published IN (0, 1)),
  status TEXT DEFAULT ''
);

CREATE TABLE IF NOT EXISTS workflowstate (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  workflowid INTEGER NOT NULL DEFAULT 0,
  pathway TEXT DEFAULT '',
  nhsid TEXT DEFAULT '',
  version INTEGER NOT NULL DEFAULT 0,
  published INTEGER NOT NULL DEFAULT 0 CHECK (published IN (0, 1)),
  created TEXT DEFAULT '',
  createdby TEXT DEFAULT '',
  status TEXT DEFAULT '',
  completeby TEXT DEFAULT '',
  lastupdate TEXT DEFAULT '',
  owner TEXT DEFAULT '',
  overdue TEXT DEFAULT '',
  escalated TEXT DEFAULT '',
  targetmet TEXT DEFAULT '',
  inprogress TEXT DEFAULT '',
  duration TEXT DEFAULT '',
  timeremaining TEXT DEFAULT ''
);

CREATE TABLE IF NOT EXISTS xdws (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT DEFAULT '',
  isxdsmeta INTEGER NOT NULL DEFAULT 0 CHECK (isxdsmeta IN (0, 1)),
  xdw TEXT DEFAULT ''
);

CREATE TABLE IF NOT EXISTS templates (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT DEFAULT '',
  template TEXT DEFAULT '',
  user TEXT DEFAULT ''
);

CREATE TABLE IF NOT EXISTS idmaps (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  lid TEXT DEFAULT '',
  mid TEXT DEFAULT '',
  user TEXT DEFAULT ''
);

CREATE TABLE IF NOT EXISTS statics (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT DEFAULT '',
  content TEXT DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_workflows_pathway_nhsid ON workflows(pathway, nhsid);
CREATE INDEX IF NOT EXISTS idx_events_pathway_nhsid ON events(pathway, nhsid);
CREATE INDEX IF NOT EXISTS idx_idmaps_user_lid ON idmaps(user, lid);
";

/// Creates every gateway table that does not exist yet.
pub fn create_reference_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(REFERENCE_SCHEMA)
}
