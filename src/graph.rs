//! Discovery graph: ingests liveliness add/drop events and answers the
//! multi-axis query surface of spec §4.6.
//!
//! Grounded on `oxidros-zenoh/src/graph_cache.rs`'s `GraphCache` (a
//! `HashMap<String, EntityInfo>` updated from liveliness tokens), restructured
//! around ZRM's simpler key format and query table.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use zenoh::Session;

use crate::entity::{self, Entity, EndpointEntity, EntityKind};
use crate::error::{Error, Result};

fn require_not_node(kind: EntityKind, op: &str) -> Result<()> {
    if kind == EntityKind::Node {
        Err(Error::GraphQuery(format!(
            "{op} does not accept EntityKind::Node; use count_by_node / get_entities_by_node"
        )))
    } else {
        Ok(())
    }
}

/// The pure index: entities keyed by wire key, plus the by-topic / by-node
/// secondary indexes. All query logic lives here so it is testable without a
/// live transport session.
#[derive(Default)]
pub struct GraphData {
    entities: HashMap<String, Entity>,
    by_topic: HashMap<String, HashSet<String>>,
    by_node: HashMap<String, HashSet<String>>,
}

impl GraphData {
    pub fn insert(&mut self, key: &str, entity: Entity) {
        if let Entity::Endpoint(ref e) = entity {
            self.by_topic
                .entry(e.topic.clone())
                .or_default()
                .insert(key.to_string());
            self.by_node
                .entry(e.node_name.clone())
                .or_default()
                .insert(key.to_string());
        }
        self.entities.insert(key.to_string(), entity);
    }

    pub fn remove(&mut self, key: &str) {
        if let Some(entity) = self.entities.remove(key) {
            if let Entity::Endpoint(e) = entity {
                if let Some(set) = self.by_topic.get_mut(&e.topic) {
                    set.remove(key);
                    if set.is_empty() {
                        self.by_topic.remove(&e.topic);
                    }
                }
                if let Some(set) = self.by_node.get_mut(&e.node_name) {
                    set.remove(key);
                    if set.is_empty() {
                        self.by_node.remove(&e.node_name);
                    }
                }
            }
        }
    }

    fn endpoints_by_topic(&self, kind: EntityKind, topic: &str) -> Vec<EndpointEntity> {
        self.by_topic
            .get(topic)
            .into_iter()
            .flatten()
            .filter_map(|k| match self.entities.get(k) {
                Some(Entity::Endpoint(e)) if e.kind == kind => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    fn endpoints_by_node(&self, kind: EntityKind, node_name: &str) -> Vec<EndpointEntity> {
        self.by_node
            .get(node_name)
            .into_iter()
            .flatten()
            .filter_map(|k| match self.entities.get(k) {
                Some(Entity::Endpoint(e)) if e.kind == kind => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, kind: EntityKind, name: &str) -> Result<usize> {
        require_not_node(kind, "count")?;
        Ok(self.endpoints_by_topic(kind, name).len())
    }

    pub fn count_by_node(&self, node_name: &str) -> usize {
        self.by_node.get(node_name).map(|s| s.len()).unwrap_or(0)
    }

    pub fn get_entities_by_topic(&self, kind: EntityKind, topic: &str) -> Result<Vec<EndpointEntity>> {
        if !matches!(kind, EntityKind::Publisher | EntityKind::Subscriber) {
            return Err(Error::GraphQuery(
                "get_entities_by_topic requires Publisher or Subscriber".to_string(),
            ));
        }
        Ok(self.endpoints_by_topic(kind, topic))
    }

    pub fn get_entities_by_service(&self, kind: EntityKind, name: &str) -> Result<Vec<EndpointEntity>> {
        if !matches!(kind, EntityKind::Service | EntityKind::Client) {
            return Err(Error::GraphQuery(
                "get_entities_by_service requires Service or Client".to_string(),
            ));
        }
        Ok(self.endpoints_by_topic(kind, name))
    }

    pub fn get_entities_by_node(&self, kind: EntityKind, node_name: &str) -> Result<Vec<EndpointEntity>> {
        require_not_node(kind, "get_entities_by_node")?;
        Ok(self.endpoints_by_node(kind, node_name))
    }

    pub fn get_node_names(&self) -> Vec<String> {
        self.entities
            .values()
            .filter_map(|e| match e {
                Entity::Node(n) => Some(n.name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn get_topic_names_and_types(&self) -> HashMap<String, HashSet<String>> {
        self.names_and_types(EntityKind::Publisher, EntityKind::Subscriber)
    }

    pub fn get_service_names_and_types(&self) -> HashMap<String, HashSet<String>> {
        self.names_and_types(EntityKind::Service, EntityKind::Client)
    }

    fn names_and_types(&self, a: EntityKind, b: EntityKind) -> HashMap<String, HashSet<String>> {
        let mut out: HashMap<String, HashSet<String>> = HashMap::new();
        for e in self.entities.values() {
            if let Entity::Endpoint(ep) = e {
                if ep.kind == a || ep.kind == b {
                    let entry = out.entry(ep.topic.clone()).or_default();
                    if let Some(t) = &ep.type_name {
                        entry.insert(t.clone());
                    }
                }
            }
        }
        out
    }

    pub fn get_names_and_types_by_node(
        &self,
        node_name: &str,
        kind: EntityKind,
    ) -> Result<HashMap<String, Option<String>>> {
        require_not_node(kind, "get_names_and_types_by_node")?;
        Ok(self
            .endpoints_by_node(kind, node_name)
            .into_iter()
            .map(|e| (e.topic, e.type_name))
            .collect())
    }

    fn has_service(&self, name: &str) -> bool {
        !self.endpoints_by_topic(EntityKind::Service, name).is_empty()
    }
}

/// Per-domain discovery graph. Subscribes to the admin namespace restricted to
/// its own `domain_id`, so entries from other domains are never observed
/// (spec §4.6 domain isolation).
pub struct Graph {
    data: Arc<Mutex<GraphData>>,
    changed: Arc<Condvar>,
    domain_id: u32,
    _liveliness_subscriber: zenoh::liveliness::LivelinessSubscriber<()>,
}

impl Graph {
    pub(crate) fn new(session: Session, domain_id: u32) -> Result<Self> {
        let data: Arc<Mutex<GraphData>> = Arc::new(Mutex::new(GraphData::default()));
        let changed = Arc::new(Condvar::new());
        let prefix = format!("{}/{}/**", entity::LIVELINESS_PREFIX, domain_id);

        let cb_data = data.clone();
        let cb_changed = changed.clone();
        let subscriber = session
            .liveliness()
            .declare_subscriber(&prefix)
            .callback(move |sample| {
                let key = sample.key_expr().as_str();
                match sample.kind() {
                    zenoh::sample::SampleKind::Put => {
                        if let Ok(Some(entity)) = entity::from_key(key) {
                            cb_data.lock().insert(key, entity);
                            cb_changed.notify_all();
                        }
                    }
                    zenoh::sample::SampleKind::Delete => {
                        cb_data.lock().remove(key);
                        cb_changed.notify_all();
                    }
                }
            })
            .wait()?;

        // Backfill: the network may already hold tokens declared before this
        // subscriber existed.
        if let Ok(replies) = session.liveliness().get(&prefix).wait() {
            while let Ok(reply) = replies.recv() {
                if let Ok(sample) = reply.result() {
                    let key = sample.key_expr().as_str();
                    if let Ok(Some(entity)) = entity::from_key(key) {
                        data.lock().insert(key, entity);
                    }
                }
            }
        }

        Ok(Self {
            data,
            changed,
            domain_id,
            _liveliness_subscriber: subscriber,
        })
    }

    pub fn domain_id(&self) -> u32 {
        self.domain_id
    }

    pub fn count(&self, kind: EntityKind, name: &str) -> Result<usize> {
        self.data.lock().count(kind, name)
    }

    pub fn count_by_node(&self, node_name: &str) -> usize {
        self.data.lock().count_by_node(node_name)
    }

    pub fn get_entities_by_topic(&self, kind: EntityKind, topic: &str) -> Result<Vec<EndpointEntity>> {
        self.data.lock().get_entities_by_topic(kind, topic)
    }

    pub fn get_entities_by_service(&self, kind: EntityKind, name: &str) -> Result<Vec<EndpointEntity>> {
        self.data.lock().get_entities_by_service(kind, name)
    }

    pub fn get_entities_by_node(&self, kind: EntityKind, node_name: &str) -> Result<Vec<EndpointEntity>> {
        self.data.lock().get_entities_by_node(kind, node_name)
    }

    pub fn get_node_names(&self) -> Vec<String> {
        self.data.lock().get_node_names()
    }

    pub fn get_topic_names_and_types(&self) -> HashMap<String, HashSet<String>> {
        self.data.lock().get_topic_names_and_types()
    }

    pub fn get_service_names_and_types(&self) -> HashMap<String, HashSet<String>> {
        self.data.lock().get_service_names_and_types()
    }

    pub fn get_names_and_types_by_node(
        &self,
        node_name: &str,
        kind: EntityKind,
    ) -> Result<HashMap<String, Option<String>>> {
        self.data.lock().get_names_and_types_by_node(node_name, kind)
    }

    pub fn wait_for_service(&self, name: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.data.lock();
        loop {
            if guard.has_service(name) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let wait_result = self.changed.wait_for(&mut guard, deadline - now);
            if wait_result.timed_out() {
                return guard.has_service(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EndpointEntity, NodeEntity};

    fn endpoint(node: &str, topic: &str, kind: EntityKind) -> (String, Entity) {
        let e = Entity::Endpoint(EndpointEntity {
            domain_id: 0,
            z_id: "z1".to_string(),
            kind,
            node_name: node.to_string(),
            topic: topic.to_string(),
            type_name: Some("std/String".to_string()),
        });
        (entity::to_key(&e), e)
    }

    #[test]
    fn insert_then_remove_clears_all_indexes() {
        let mut data = GraphData::default();
        let (key, entity) = endpoint("talker", "chat", EntityKind::Publisher);
        data.insert(&key, entity);
        assert_eq!(data.count(EntityKind::Publisher, "chat").unwrap(), 1);
        data.remove(&key);
        assert_eq!(data.count(EntityKind::Publisher, "chat").unwrap(), 0);
        assert!(!data.by_topic.contains_key("chat"));
        assert!(!data.by_node.contains_key("talker"));
    }

    #[test]
    fn node_insert_is_counted() {
        let mut data = GraphData::default();
        let e = Entity::Node(NodeEntity {
            domain_id: 0,
            z_id: "z1".to_string(),
            name: "talker".to_string(),
        });
        let key = entity::to_key(&e);
        data.insert(&key, e);
        assert_eq!(data.get_node_names(), vec!["talker".to_string()]);
    }

    #[test]
    fn count_rejects_node_kind() {
        let data = GraphData::default();
        assert!(matches!(
            data.count(EntityKind::Node, "x"),
            Err(Error::GraphQuery(_))
        ));
        assert!(matches!(
            data.get_entities_by_topic(EntityKind::Service, "x"),
            Err(Error::GraphQuery(_))
        ));
    }

    #[test]
    fn by_node_query_filters_kind() {
        let mut data = GraphData::default();
        let (k1, e1) = endpoint("talker", "chat", EntityKind::Publisher);
        let (k2, e2) = endpoint("talker", "other", EntityKind::Subscriber);
        data.insert(&k1, e1);
        data.insert(&k2, e2);
        assert_eq!(data.count_by_node("talker"), 2);
        assert_eq!(
            data.get_entities_by_node(EntityKind::Publisher, "talker")
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn topic_names_and_types_aggregates() {
        let mut data = GraphData::default();
        let (k1, e1) = endpoint("talker", "chat", EntityKind::Publisher);
        let (k2, e2) = endpoint("listener", "chat", EntityKind::Subscriber);
        data.insert(&k1, e1);
        data.insert(&k2, e2);
        let types = data.get_topic_names_and_types();
        assert_eq!(types.get("chat").unwrap().len(), 1);
    }
}
