//! Publisher endpoint (spec §4.4).
//!
//! Grounded on `oxidros-zenoh/src/topic/publisher.rs`'s liveliness-token +
//! `.put().wait()` pattern. QoS mapping and the Attachment/sequence-number
//! bookkeeping are dropped: the spec's Publisher contract carries no wire
//! metadata requirement.

use std::marker::PhantomData;

use parking_lot::Mutex;
use zenoh::liveliness::LivelinessToken;
use zenoh::pubsub::Publisher as ZenohPublisher;

use crate::entity::{Entity, EndpointEntity, EntityKind};
use crate::error::Result;
use crate::message::Message;
use crate::node::Node;

/// A typed publisher bound to one topic. The message schema is pinned by `M`,
/// so a type mismatch is a compile error rather than a runtime one (spec
/// §4.4, Open Question decision in DESIGN.md).
pub struct Publisher<M: Message> {
    node: Node,
    topic: String,
    zenoh_publisher: ZenohPublisher<'static>,
    liveliness_token: Mutex<Option<LivelinessToken>>,
    _marker: PhantomData<M>,
}

impl<M: Message> Publisher<M> {
    pub(crate) fn new(node: Node, topic: &str) -> Result<Self> {
        let session = node.context().session();
        let zenoh_publisher = session.declare_publisher(topic.to_string()).wait()?;

        let entity = Entity::Endpoint(EndpointEntity {
            domain_id: node.domain_id(),
            z_id: node.z_id(),
            kind: EntityKind::Publisher,
            node_name: node.name().to_string(),
            topic: topic.to_string(),
            type_name: Some(M::schema_name().to_string()),
        });
        let key = crate::entity::to_key(&entity);
        let token = session.liveliness().declare_token(&key).wait()?;
        tracing::debug!(%topic, schema = M::schema_name(), "publisher created");

        Ok(Self {
            node,
            topic: topic.to_string(),
            zenoh_publisher,
            liveliness_token: Mutex::new(Some(token)),
            _marker: PhantomData,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Serializes `msg` and hands it to the transport keyed by topic.
    /// Non-blocking beyond transport buffer pressure; a failed publish does
    /// not fail the Publisher.
    pub fn publish(&self, msg: &M) -> Result<()> {
        let bytes = msg.to_bytes()?;
        self.zenoh_publisher.put(bytes).wait()?;
        Ok(())
    }

    /// Undeclares the liveliness token, making this publisher disappear from
    /// the discovery graph. Idempotent: a second call is a no-op.
    pub fn close(&self) -> Result<()> {
        if let Some(token) = self.liveliness_token.lock().take() {
            token.undeclare().wait()?;
        }
        Ok(())
    }
}

impl<M: Message> std::fmt::Debug for Publisher<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("node", &self.node.name())
            .field("topic", &self.topic)
            .finish()
    }
}
