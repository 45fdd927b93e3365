//! Service server (spec §4.7).
//!
//! Grounded on `oxidros-zenoh/src/service/server.rs`, restructured: the
//! teacher's pull-style `recv()`/`flume` channel is replaced by registering
//! the user handler directly in the queryable callback, per spec §4.7.
//! Decode failures, handler-returned errors, and handler panics are all
//! converted to Service Error replies so the server never crashes from
//! request handling.

use std::panic::{catch_unwind, AssertUnwindSafe};

use parking_lot::Mutex;
use zenoh::liveliness::LivelinessToken;
use zenoh::query::Queryable;

use super::{REPLY_ERR, REPLY_OK};
use crate::entity::{Entity, EndpointEntity, EntityKind};
use crate::error::Result;
use crate::message::{Message, ServiceSchema};
use crate::node::Node;

/// A registered RPC handler for one service name.
pub struct Server<S: ServiceSchema> {
    node: Node,
    name: String,
    _queryable: Queryable<()>,
    liveliness_token: Mutex<Option<LivelinessToken>>,
    _marker: std::marker::PhantomData<S>,
}

impl<S: ServiceSchema> Server<S> {
    pub(crate) fn new(
        node: Node,
        name: &str,
        handler: impl Fn(S::Request) -> Result<S::Response> + Send + Sync + 'static,
    ) -> Result<Self> {
        let session = node.context().session();
        let service_name = name.to_string();

        let queryable = session
            .declare_queryable(name.to_string())
            .callback(move |query| {
                let payload = query
                    .payload()
                    .map(|p| p.to_bytes().to_vec())
                    .unwrap_or_default();

                let reply = match S::Request::from_bytes(&payload) {
                    Err(err) => {
                        tracing::warn!(service = %service_name, %err, "service request decode failed");
                        encode_error(&format!("service error: request decode failed: {err}"))
                    }
                    Ok(request) => {
                        match catch_unwind(AssertUnwindSafe(|| handler(request))) {
                            Ok(Ok(response)) => match response.to_bytes() {
                                Ok(bytes) => {
                                    let mut buf = Vec::with_capacity(bytes.len() + 1);
                                    buf.push(REPLY_OK);
                                    buf.extend_from_slice(&bytes);
                                    buf
                                }
                                Err(err) => encode_error(&format!("service error: {err}")),
                            },
                            Ok(Err(err)) => {
                                tracing::warn!(service = %service_name, %err, "service handler returned an error");
                                encode_error(&format!("service error: {err}"))
                            }
                            Err(panic) => {
                                let msg = panic
                                    .downcast_ref::<&str>()
                                    .map(|s| s.to_string())
                                    .or_else(|| panic.downcast_ref::<String>().cloned())
                                    .unwrap_or_else(|| "handler panicked".to_string());
                                tracing::error!(service = %service_name, %msg, "service handler panicked");
                                encode_error(&format!("service error: {msg}"))
                            }
                        }
                    }
                };

                if let Err(err) = query.reply(query.key_expr().clone(), reply).wait() {
                    tracing::warn!(service = %service_name, %err, "failed to send service reply");
                }
            })
            .wait()?;

        let entity = Entity::Endpoint(EndpointEntity {
            domain_id: node.domain_id(),
            z_id: node.z_id(),
            kind: EntityKind::Service,
            node_name: node.name().to_string(),
            topic: name.to_string(),
            type_name: Some(S::Request::schema_name().to_string()),
        });
        let key = crate::entity::to_key(&entity);
        let token = session.liveliness().declare_token(&key).wait()?;
        tracing::debug!(service = %name, "service server created");

        Ok(Self {
            node,
            name: name.to_string(),
            _queryable: queryable,
            liveliness_token: Mutex::new(Some(token)),
            _marker: std::marker::PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Undeclares the liveliness token, making this server disappear from
    /// the discovery graph. Idempotent: a second call is a no-op.
    pub fn close(&self) -> Result<()> {
        if let Some(token) = self.liveliness_token.lock().take() {
            token.undeclare().wait()?;
        }
        Ok(())
    }
}

impl<S: ServiceSchema> std::fmt::Debug for Server<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("node", &self.node.name())
            .field("name", &self.name)
            .finish()
    }
}

fn encode_error(message: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(message.len() + 1);
    buf.push(REPLY_ERR);
    buf.extend_from_slice(message.as_bytes());
    buf
}
