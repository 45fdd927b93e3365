//! Service client (spec §4.7).
//!
//! Grounded on `oxidros-zenoh/src/service/client.rs`. Each call issues its
//! own keyed query, so (unlike the teacher) no request/response correlation
//! id is needed: a query's reply channel is already scoped to that query.
//! The teacher's `tokio`-based async call is replaced by a worker thread
//! driving a [`crate::future::CallFuture`] (`parking_lot::{Mutex, Condvar}`),
//! per spec §5/§9.

use std::time::Duration;

use parking_lot::Mutex;
use zenoh::liveliness::LivelinessToken;
use zenoh::query::QueryTarget;

use super::{REPLY_ERR, REPLY_OK};
use crate::entity::{Entity, EndpointEntity, EntityKind};
use crate::error::{Error, Result};
use crate::future::{new_call_future, CallFuture};
use crate::message::{Message, ServiceSchema};
use crate::node::Node;

/// A typed RPC client bound to one service name.
pub struct Client<S: ServiceSchema> {
    node: Node,
    name: String,
    liveliness_token: Mutex<Option<LivelinessToken>>,
    _marker: std::marker::PhantomData<S>,
}

impl<S: ServiceSchema> Client<S> {
    pub(crate) fn new(node: Node, name: &str) -> Result<Self> {
        let session = node.context().session();
        let entity = Entity::Endpoint(EndpointEntity {
            domain_id: node.domain_id(),
            z_id: node.z_id(),
            kind: EntityKind::Client,
            node_name: node.name().to_string(),
            topic: name.to_string(),
            type_name: Some(S::Request::schema_name().to_string()),
        });
        let key = crate::entity::to_key(&entity);
        let token = session.liveliness().declare_token(&key).wait()?;
        tracing::debug!(service = %name, "service client created");

        Ok(Self {
            node,
            name: name.to_string(),
            liveliness_token: Mutex::new(Some(token)),
            _marker: std::marker::PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if at least one [`crate::graph::Graph`]-visible server with this
    /// name is currently alive.
    pub fn is_service_available(&self) -> Result<bool> {
        Ok(self
            .node
            .graph()?
            .count(EntityKind::Service, &self.name)?
            > 0)
    }

    /// Blocking call. Raises a timeout error on deadline expiry, a Service
    /// Error on a server-side error reply.
    pub fn call(&self, request: &S::Request, timeout: Duration) -> Result<S::Response> {
        let session = self.node.context().session();
        let payload = request.to_bytes()?;
        let replies = session
            .get(&self.name)
            .payload(payload)
            .target(QueryTarget::All)
            .timeout(timeout)
            .wait()?;

        match replies.recv_timeout(timeout) {
            Ok(reply) => decode_reply::<S>(&reply),
            Err(_timeout) => Err(Error::Timeout(format!(
                "service '{}' did not respond within {:?}",
                self.name, timeout
            ))),
        }
    }

    /// Non-blocking call returning a cancellable [`CallFuture`]. The actual
    /// query and reply wait run on a dedicated worker thread.
    pub fn call_async(&self, request: &S::Request, timeout: Duration) -> Result<CallFuture<S::Response>>
    where
        S::Response: Clone,
    {
        let session = self.node.context().session();
        let name = self.name.clone();
        let request_bytes = request.to_bytes()?;
        let (future, setter) = new_call_future::<S::Response>();

        std::thread::spawn(move || {
            let result = (|| -> Result<S::Response> {
                let replies = session
                    .get(&name)
                    .payload(request_bytes)
                    .target(QueryTarget::All)
                    .timeout(timeout)
                    .wait()?;
                match replies.recv_timeout(timeout) {
                    Ok(reply) => decode_reply::<S>(&reply),
                    Err(_) => Err(Error::Timeout(format!(
                        "service '{name}' did not respond within {timeout:?}"
                    ))),
                }
            })();
            setter.set(result);
        });

        Ok(future)
    }

    /// Undeclares the liveliness token, making this client disappear from
    /// the discovery graph. Idempotent: a second call is a no-op.
    pub fn close(&self) -> Result<()> {
        if let Some(token) = self.liveliness_token.lock().take() {
            token.undeclare().wait()?;
        }
        Ok(())
    }
}

fn decode_reply<S: ServiceSchema>(reply: &zenoh::query::Reply) -> Result<S::Response> {
    let sample = reply
        .result()
        .map_err(|e| Error::Service(format!("service error: {e:?}")))?;
    let bytes = sample.payload().to_bytes();
    if bytes.is_empty() {
        return Err(Error::Service("service error: empty reply".to_string()));
    }
    match bytes[0] {
        b if b == REPLY_OK => S::Response::from_bytes(&bytes[1..]),
        b if b == REPLY_ERR => {
            let msg = String::from_utf8_lossy(&bytes[1..]).to_string();
            Err(Error::Service(msg))
        }
        other => Err(Error::Service(format!(
            "service error: unrecognized reply sentinel byte {other}"
        ))),
    }
}

impl<S: ServiceSchema> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("node", &self.node.name())
            .field("name", &self.name)
            .finish()
    }
}
