//! Node: identity plus factory for endpoints on one context (spec §4.3).
//!
//! Grounded on `oxidros-zenoh/src/node.rs`'s `Node`/`NodeInner`
//! declare-liveliness-token-on-construct pattern; entity_id/enclave/namespace
//! bookkeeping dropped since ZRM's key format carries none of it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use zenoh::liveliness::LivelinessToken;

use crate::context::Context;
use crate::entity::{Entity, NodeEntity};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::message::{ActionSchema, Message, ServiceSchema};

struct NodeInner {
    context: Context,
    name: String,
    closed: AtomicBool,
    liveliness_token: Mutex<Option<LivelinessToken>>,
}

/// A named identity that owns endpoints, bound to one [`Context`].
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    /// Creates a node on the process-global context, initializing it if needed.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let ctx = match crate::context::global() {
            Some(ctx) => ctx,
            None => {
                crate::context::init()?;
                crate::context::global().expect("just initialized")
            }
        };
        Self::with_context(ctx, name)
    }

    /// Creates a node on an explicit context.
    pub fn with_context(context: Context, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let z_id = context.session().zid().to_string();
        let entity = Entity::Node(NodeEntity {
            domain_id: context.domain_id(),
            z_id,
            name: name.clone(),
        });
        let key = crate::entity::to_key(&entity);
        let token = context.session().liveliness().declare_token(&key).wait()?;
        tracing::info!(node = %name, %key, "node liveliness token declared");
        Ok(Self {
            inner: Arc::new(NodeInner {
                context,
                name,
                closed: AtomicBool::new(false),
                liveliness_token: Mutex::new(Some(token)),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn context(&self) -> &Context {
        &self.inner.context
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::ContextClosed)
        } else {
            Ok(())
        }
    }

    pub fn create_publisher<M: Message>(&self, topic: &str) -> Result<crate::topic::Publisher<M>> {
        self.check_open()?;
        crate::topic::Publisher::new(self.clone(), topic)
    }

    pub fn create_subscriber<M: Message>(
        &self,
        topic: &str,
        callback: Option<Box<dyn Fn(&M) + Send + Sync>>,
    ) -> Result<crate::topic::Subscriber<M>> {
        self.check_open()?;
        crate::topic::Subscriber::new(self.clone(), topic, callback)
    }

    pub fn create_server<S: ServiceSchema>(
        &self,
        name: &str,
        handler: impl Fn(S::Request) -> Result<S::Response> + Send + Sync + 'static,
    ) -> Result<crate::service::Server<S>> {
        self.check_open()?;
        crate::service::Server::new(self.clone(), name, handler)
    }

    pub fn create_client<S: ServiceSchema>(&self, name: &str) -> Result<crate::service::Client<S>> {
        self.check_open()?;
        crate::service::Client::new(self.clone(), name)
    }

    pub fn create_action_server<A: ActionSchema>(
        &self,
        name: &str,
        execute_callback: impl Fn(Arc<crate::action::ServerGoalHandle<A>>) + Send + Sync + 'static,
    ) -> Result<crate::action::ActionServer<A>> {
        self.check_open()?;
        crate::action::ActionServer::new(self.clone(), name, execute_callback)
    }

    pub fn create_action_client<A: ActionSchema>(&self, name: &str) -> Result<crate::action::ActionClient<A>> {
        self.check_open()?;
        crate::action::ActionClient::new(self.clone(), name)
    }

    pub fn graph(&self) -> Result<Graph> {
        self.inner.context.graph()
    }

    pub(crate) fn domain_id(&self) -> u32 {
        self.inner.context.domain_id()
    }

    pub(crate) fn z_id(&self) -> String {
        self.inner.context.session().zid().to_string()
    }

    /// Idempotent close. Undeclares the node's liveliness token.
    pub fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Release);
        if let Some(token) = self.inner.liveliness_token.lock().take() {
            token.undeclare().wait()?;
        }
        Ok(())
    }
}
