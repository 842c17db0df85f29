//! Business helpers over [`Database::perform`].

use std::collections::BTreeMap;

use record_gateway_core::{
    Action, Entities, Event, IdMap, Subscription, Template, Workflow, Xdw, DSUB_TOPIC_TYPE_CODE,
};
use tracing::debug;

use crate::{Database, DbError};

impl Database {
    pub fn subscriptions(&self, seed: Subscription) -> Result<Entities<Subscription>, DbError> {
        self.perform_with(Action::Select, seed)
    }

    pub fn pathway_subscriptions(&self, pathway: &str) -> Result<Vec<Subscription>, DbError> {
        let seed = Subscription {
            pathway: pathway.to_string(),
            ..Subscription::default()
        };
        Ok(self.subscriptions(seed)?.records)
    }

    /// Stores a subscription and returns its generated id.
    pub fn add_subscription(&self, sub: Subscription) -> Result<i64, DbError> {
        Ok(self.perform_with(Action::Insert, sub)?.last_insert_id)
    }

    /// Broker reference of the first document-type subscription for `expression`.
    pub fn broker_subscription(&self, expression: &str) -> Result<Option<String>, DbError> {
        let seed = Subscription {
            topic: DSUB_TOPIC_TYPE_CODE.to_string(),
            expression: expression.to_string(),
            ..Subscription::default()
        };
        Ok(self
            .subscriptions(seed)?
            .records
            .into_iter()
            .map(|sub| sub.broker_ref)
            .find(|broker_ref| !broker_ref.is_empty()))
    }

    /// True when exactly one stored subscription matches `sub`.
    pub fn has_user_subscription(&self, sub: Subscription) -> Result<bool, DbError> {
        Ok(self.subscriptions(sub)?.single().is_some())
    }

    /// Deletes subscriptions matching `sub` and returns those still held by
    /// the same user, org and role.
    pub fn cancel_subscription(&self, sub: Subscription) -> Result<Vec<Subscription>, DbError> {
        let remaining = Subscription {
            user: sub.user.clone(),
            org: sub.org.clone(),
            role: sub.role.clone(),
            ..Subscription::default()
        };
        self.perform_with(Action::Delete, sub)?;
        Ok(self.subscriptions(remaining)?.records)
    }

    /// Comments of the events recorded against one task, one per line.
    pub fn task_notes(
        &self,
        pathway: &str,
        nhs_id: &str,
        task_id: i64,
        version: i64,
    ) -> Result<String, DbError> {
        let seed = Event {
            pathway: pathway.to_string(),
            nhs_id: nhs_id.to_string(),
            task_id,
            version,
            ..Event::default()
        };
        let events = self.perform_with(Action::Select, seed)?;
        Ok(events
            .records
            .iter()
            .map(|event| format!("{}\n", event.comments))
            .collect())
    }

    pub fn workflows(
        &self,
        pathway: &str,
        nhs_id: &str,
        version: i64,
        status: &str,
    ) -> Result<Entities<Workflow>, DbError> {
        let seed = Workflow {
            pathway: pathway.to_string(),
            nhs_id: nhs_id.to_string(),
            version,
            status: status.to_string(),
            ..Workflow::default()
        };
        let mut found = self.perform_with(Action::Select, seed)?;
        found.sort_by_pathway_desc();
        Ok(found)
    }

    /// Rewrites document, publish flag and status of the workflow keyed by
    /// pathway, patient and version.
    pub fn update_workflow(&self, workflow: Workflow) -> Result<(), DbError> {
        self.perform_with(Action::Update, workflow).map(|_| ())
    }

    /// Bumps the version of every workflow sharing `xdw_key`.
    pub fn deprecate_workflow(&self, xdw_key: &str) -> Result<(), DbError> {
        let seed = Workflow {
            xdw_key: xdw_key.to_string(),
            ..Workflow::default()
        };
        self.perform_with(Action::Deprecate, seed).map(|_| ())
    }

    /// Registered workflow definitions, keyed by name, with the display name
    /// mapped for `user`.
    pub fn pathways(&self, user: &str) -> Result<BTreeMap<String, String>, DbError> {
        let definitions = self.perform_with(Action::Select, Xdw::default())?;
        let resolver = self.resolver();
        let pathways: BTreeMap<String, String> = definitions
            .records
            .into_iter()
            .map(|xdw| {
                let display = resolver.resolve_mapped_id(user, &xdw.name).trim().to_string();
                (xdw.name, display)
            })
            .collect();
        debug!(user, pathways = pathways.len(), "listed pathways");
        Ok(pathways)
    }

    pub fn workflow_definition(&self, name: &str) -> Result<Xdw, DbError> {
        self.single_xdw(name, false)?
            .ok_or_else(|| DbError::NotFound(format!("no xdw registered for {name}")))
    }

    pub fn workflow_xds_meta(&self, name: &str) -> Result<Xdw, DbError> {
        self.single_xdw(name, true)?
            .ok_or_else(|| DbError::NotFound(format!("no xdw meta registered for {name}")))
    }

    /// Replaces the definition (or metadata) registered under `name`.
    pub fn persist_workflow_definition(
        &self,
        name: &str,
        body: &str,
        is_xds_meta: bool,
    ) -> Result<i64, DbError> {
        let key = Xdw {
            name: name.to_string(),
            is_xds_meta,
            ..Xdw::default()
        };
        self.perform_with(Action::Delete, key.clone())?;
        let record = Xdw {
            xdw: body.to_string(),
            ..key
        };
        Ok(self.perform_with(Action::Insert, record)?.last_insert_id)
    }

    /// Replaces `user`'s template called `name`.
    pub fn persist_template(&self, user: &str, name: &str, body: &str) -> Result<i64, DbError> {
        let key = Template {
            name: name.to_string(),
            user: user.to_string(),
            ..Template::default()
        };
        self.perform_with(Action::Delete, key.clone())?;
        let record = Template {
            template: body.to_string(),
            ..key
        };
        Ok(self.perform_with(Action::Insert, record)?.last_insert_id)
    }

    pub fn add_idmap(&self, entry: IdMap) -> Result<i64, DbError> {
        Ok(self.perform_with(Action::Insert, entry)?.last_insert_id)
    }

    /// Every mapping entry, local ids in descending order.
    pub fn idmaps(&self) -> Result<Vec<IdMap>, DbError> {
        let mut all = Entities::<IdMap>::new(Action::Select);
        self.perform(&mut all)?;
        all.sort_by_local_id_desc();
        Ok(all.records)
    }

    /// Events for a patient on a pathway, newest first.
    pub fn events(&self, pathway: &str, nhs_id: &str) -> Result<Vec<Event>, DbError> {
        let seed = Event {
            pathway: pathway.to_string(),
            nhs_id: nhs_id.to_string(),
            ..Event::default()
        };
        let mut found = self.perform_with(Action::Select, seed)?;
        found.sort_newest_first();
        Ok(found.records)
    }

    // Some only when exactly one row matches.
    fn single_xdw(&self, name: &str, is_xds_meta: bool) -> Result<Option<Xdw>, DbError> {
        let seed = Xdw {
            name: name.to_string(),
            is_xds_meta,
            ..Xdw::default()
        };
        Ok(self.perform_with(Action::Select, seed)?.single().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use record_gateway_core::SYSTEM_USER;

    fn must<T>(result: Result<T, DbError>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => panic!("test failure: {err}"),
        }
    }

    fn fixture_db() -> Database {
        let db = must(Database::open_in_memory());
        must(db.init_schema());
        db
    }

    fn subscription(user: &str, pathway: &str, expression: &str) -> Subscription {
        Subscription {
            broker_ref: format!("ref-{pathway}-{expression}"),
            pathway: pathway.to_string(),
            topic: DSUB_TOPIC_TYPE_CODE.to_string(),
            expression: expression.to_string(),
            user: user.to_string(),
            org: "RCH".to_string(),
            role: "clinician".to_string(),
            ..Subscription::default()
        }
    }

    #[test]
    fn broker_subscription_finds_reference_for_expression() {
        let db = fixture_db();
        must(db.add_subscription(subscription("ann", "P1", "53423-4")));
        assert_eq!(
            must(db.broker_subscription("53423-4")),
            Some("ref-P1-53423-4".to_string())
        );
        assert_eq!(must(db.broker_subscription("other")), None);
    }

    #[test]
    fn has_user_subscription_requires_exactly_one_match() {
        let db = fixture_db();
        let sub = subscription("ann", "P1", "53423-4");
        assert!(!must(db.has_user_subscription(sub.clone())));
        must(db.add_subscription(sub.clone()));
        assert!(must(db.has_user_subscription(sub.clone())));
        must(db.add_subscription(sub.clone()));
        assert!(!must(db.has_user_subscription(sub)));
    }

    #[test]
    fn cancel_subscription_deletes_and_lists_remaining() {
        let db = fixture_db();
        let first = subscription("ann", "P1", "A");
        let second = subscription("ann", "P2", "B");
        must(db.add_subscription(first.clone()));
        must(db.add_subscription(second));
        must(db.add_subscription(subscription("bob", "P1", "A")));

        let remaining = must(db.cancel_subscription(first));
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].pathway, "P2");
        assert_eq!(must(db.pathway_subscriptions("P1")).len(), 1);
    }

    #[test]
    fn task_notes_accepts_task_zero() {
        let db = fixture_db();
        for (task_id, comment) in [(0, "first note"), (0, "second note"), (1, "other task")] {
            must(db.perform_with(
                Action::Insert,
                Event {
                    pathway: "P1".to_string(),
                    nhs_id: "9999999468".to_string(),
                    task_id,
                    comments: comment.to_string(),
                    ..Event::default()
                },
            ));
        }

        let notes = must(db.task_notes("P1", "9999999468", 0, 0));
        assert_eq!(notes, "first note\nsecond note\n");
        assert_eq!(must(db.events("P1", "9999999468")).len(), 3);
    }

    #[test]
    fn workflow_definition_needs_single_match() {
        let db = fixture_db();
        assert!(matches!(
            db.workflow_definition("P1"),
            Err(DbError::NotFound(_))
        ));

        must(db.persist_workflow_definition("P1", "<def v='1'/>", false));
        must(db.persist_workflow_definition("P1", "<meta/>", true));
        let def = must(db.workflow_definition("P1"));
        assert_eq!(def.xdw, "<def v='1'/>");
        assert_eq!(must(db.workflow_xds_meta("P1")).xdw, "<meta/>");

        must(db.persist_workflow_definition("P1", "<def v='2'/>", false));
        assert_eq!(must(db.workflow_definition("P1")).xdw, "<def v='2'/>");
    }

    #[test]
    fn pathways_map_names_through_idmaps() {
        let db = fixture_db();
        must(db.persist_workflow_definition("P1", "<def/>", false));
        must(db.persist_workflow_definition("P2", "<def/>", false));
        must(db.persist_workflow_definition("P2", "<meta/>", true));
        must(db.add_idmap(IdMap::new(SYSTEM_USER, "P1", " Chest Pain ")));

        let pathways = must(db.pathways("ann"));
        assert_eq!(pathways.len(), 2);
        assert_eq!(pathways.get("P1").map(String::as_str), Some("Chest Pain"));
        assert_eq!(pathways.get("P2").map(String::as_str), Some("P2"));
    }

    #[test]
    fn persist_template_replaces_users_template() {
        let db = fixture_db();
        must(db.persist_template("ann", "summary", "v1"));
        must(db.persist_template("ann", "summary", "v2"));
        must(db.persist_template("bob", "summary", "bob"));

        let found = must(db.perform_with(
            Action::Select,
            Template {
                name: "summary".to_string(),
                user: "ann".to_string(),
                ..Template::default()
            },
        ));
        assert_eq!(found.single().map(|t| t.template.as_str()), Some("v2"));
    }

    #[test]
    fn workflow_lifecycle_update_then_deprecate() {
        let db = fixture_db();
        let wf = Workflow {
            pathway: "P1".to_string(),
            nhs_id: "9999999468".to_string(),
            xdw_key: "P19999999468".to_string(),
            xdw_doc: "<xdw/>".to_string(),
            version: 1,
            status: "OPEN".to_string(),
            ..Workflow::default()
        };
        must(db.perform_with(Action::Insert, wf.clone()));

        must(db.update_workflow(Workflow {
            status: "CLOSED".to_string(),
            ..wf.clone()
        }));
        let closed = must(db.workflows("P1", "9999999468", 1, "CLOSED"));
        assert_eq!(closed.count, 1);

        must(db.deprecate_workflow("P19999999468"));
        let bumped = must(db.workflows("P1", "9999999468", 2, "CLOSED"));
        assert_eq!(bumped.count, 1);
    }

    #[test]
    fn idmaps_sorted_by_local_id_descending() {
        let db = fixture_db();
        for lid in ["a", "c", "b"] {
            must(db.add_idmap(IdMap::new("ann", lid, "m")));
        }
        let lids: Vec<String> = must(db.idmaps()).into_iter().map(|m| m.lid).collect();
        assert_eq!(lids, vec!["c", "b", "a"]);
    }
}
