//! Subscriber endpoint (spec §4.5).
//!
//! Grounded on `oxidros-zenoh/src/topic/subscriber.rs`, restructured: the
//! teacher's pull-style `flume` channel is replaced by a push-style atomic
//! latest-sample slot plus an optional inline callback, per spec §4.5. The
//! atomic-slot pattern is grounded in `arc-swap` usage found elsewhere in
//! the retrieval pack (see DESIGN.md).

use std::marker::PhantomData;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use zenoh::liveliness::LivelinessToken;
use zenoh::pubsub::Subscriber as ZenohSubscriber;

use crate::entity::{Entity, EndpointEntity, EntityKind};
use crate::error::Result;
use crate::message::Message;
use crate::node::Node;

/// A sample delivered to a [`Subscriber`].
#[derive(Debug)]
pub struct ReceivedMessage<M> {
    pub data: M,
}

/// A typed subscriber bound to one topic, holding the latest received sample
/// in a lock-free atomic slot.
pub struct Subscriber<M: Message> {
    node: Node,
    topic: String,
    latest: Arc<ArcSwapOption<ReceivedMessage<M>>>,
    _zenoh_subscriber: ZenohSubscriber<()>,
    liveliness_token: Mutex<Option<LivelinessToken>>,
    _marker: PhantomData<M>,
}

impl<M: Message> Subscriber<M> {
    pub(crate) fn new(
        node: Node,
        topic: &str,
        callback: Option<Box<dyn Fn(&M) + Send + Sync>>,
    ) -> Result<Self> {
        let session = node.context().session();
        let latest: Arc<ArcSwapOption<ReceivedMessage<M>>> = Arc::new(ArcSwapOption::empty());

        let cb_latest = latest.clone();
        let topic_name = topic.to_string();
        let zenoh_subscriber = session
            .declare_subscriber(topic.to_string())
            .callback(move |sample| {
                let payload = sample.payload().to_bytes();
                match M::from_bytes(&payload) {
                    Ok(data) => {
                        cb_latest.store(Some(Arc::new(ReceivedMessage { data })));
                        if let Some(cb) = &callback {
                            if let Some(snapshot) = cb_latest.load_full() {
                                cb(&snapshot.data);
                            }
                        }
                    }
                    Err(err) => {
                        // Schema mismatch or decode failure: discard, never
                        // update the cache, never crash the delivery thread.
                        tracing::warn!(topic = %topic_name, %err, "discarding undecodable sample");
                    }
                }
            })
            .wait()?;

        let entity = Entity::Endpoint(EndpointEntity {
            domain_id: node.domain_id(),
            z_id: node.z_id(),
            kind: EntityKind::Subscriber,
            node_name: node.name().to_string(),
            topic: topic.to_string(),
            type_name: Some(M::schema_name().to_string()),
        });
        let key = crate::entity::to_key(&entity);
        let token = session.liveliness().declare_token(&key).wait()?;
        tracing::debug!(%topic, schema = M::schema_name(), "subscriber created");

        Ok(Self {
            node,
            topic: topic.to_string(),
            latest,
            _zenoh_subscriber: zenoh_subscriber,
            liveliness_token: Mutex::new(Some(token)),
            _marker: PhantomData,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns an atomic snapshot of the latest sample, or `None` if none has
    /// arrived yet. Safe for any number of concurrent readers.
    pub fn latest(&self) -> Option<Arc<ReceivedMessage<M>>> {
        self.latest.load_full()
    }

    /// Undeclares the liveliness token, making this subscriber disappear from
    /// the discovery graph. Idempotent: a second call is a no-op.
    pub fn close(&self) -> Result<()> {
        if let Some(token) = self.liveliness_token.lock().take() {
            token.undeclare().wait()?;
        }
        Ok(())
    }
}

impl<M: Message> std::fmt::Debug for Subscriber<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("node", &self.node.name())
            .field("topic", &self.topic)
            .finish()
    }
}
