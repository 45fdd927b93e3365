//! Action client (spec §4.8).
//!
//! Composed from [`crate::service::Client`] + [`crate::topic::Subscriber`].
//! A single feedback/status subscriber pair is shared by every goal sent
//! through this client; per-goal dispatch (feedback callback, observed
//! status) is done via a registry keyed by `goal_id`, since the subscriber
//! sees samples for every goal on the action, not just one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::types::{
    AcceptedResponse, FeedbackSample, GetResultResponse, GoalId, GoalIdRequest, GoalStatus,
    SendGoalRequest, SendGoalResponse, StatusSample,
};
use crate::error::{Error, Result};
use crate::message::ActionSchema;
use crate::node::Node;
use crate::service::Client;
use crate::topic::Subscriber;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

type FeedbackCallback<A> = Box<dyn Fn(&<A as ActionSchema>::Feedback) + Send + Sync>;

/// The client-side per-goal handle returned by [`ActionClient::send_goal`].
pub struct ClientGoalHandle<A: ActionSchema> {
    pub goal_id: GoalId,
    status: Arc<AtomicU8>,
    cancel_client: Arc<Client<CancelGoalService>>,
    get_result_client: Arc<Client<GetResultService<A>>>,
}

impl<A: ActionSchema> ClientGoalHandle<A> {
    /// The most recently observed status from the action's status topic.
    /// `Unknown` until the first sample for this goal arrives. Sticky once
    /// terminal (spec invariant 7): the status subscriber callback never
    /// overwrites a terminal status with a later non-terminal one.
    pub fn status(&self) -> GoalStatus {
        GoalStatus::from(self.status.load(Ordering::Acquire))
    }

    /// Requests cancellation of this goal. Non-blocking beyond the
    /// underlying service call.
    pub fn cancel(&self) -> Result<bool> {
        let resp = self
            .cancel_client
            .call(&GoalIdRequest { goal_id: self.goal_id }, DEFAULT_CALL_TIMEOUT)?;
        Ok(resp.accepted)
    }

    /// Blocks until a terminal status is observed or `timeout` elapses.
    pub fn get_result(&self, timeout: Duration) -> Result<A::Result> {
        let resp = self
            .get_result_client
            .call(&GoalIdRequest { goal_id: self.goal_id }, timeout)?;
        self.status.store(u8::from(resp.status), Ordering::Release);
        Ok(resp.result)
    }
}

/// A typed action client bound to one action name.
pub struct ActionClient<A: ActionSchema> {
    name: String,
    send_goal: Client<SendGoalService<A>>,
    cancel_goal: Arc<Client<CancelGoalService>>,
    get_result: Arc<Client<GetResultService<A>>>,
    statuses: Arc<Mutex<HashMap<GoalId, Arc<AtomicU8>>>>,
    feedback_callbacks: Arc<Mutex<HashMap<GoalId, FeedbackCallback<A>>>>,
    _feedback_sub: Subscriber<FeedbackSample<A::Feedback>>,
    _status_sub: Subscriber<StatusSample>,
}

impl<A: ActionSchema> ActionClient<A> {
    pub(crate) fn new(node: Node, name: &str) -> Result<Self> {
        let send_goal = node.create_client::<SendGoalService<A>>(&format!("{name}/_action/send_goal"))?;
        let cancel_goal =
            Arc::new(node.create_client::<CancelGoalService>(&format!("{name}/_action/cancel_goal"))?);
        let get_result =
            Arc::new(node.create_client::<GetResultService<A>>(&format!("{name}/_action/get_result"))?);

        let statuses: Arc<Mutex<HashMap<GoalId, Arc<AtomicU8>>>> = Arc::new(Mutex::new(HashMap::new()));
        let feedback_callbacks: Arc<Mutex<HashMap<GoalId, FeedbackCallback<A>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let cb_statuses = statuses.clone();
        let _status_sub = node.create_subscriber::<StatusSample>(
            &format!("{name}/_action/status"),
            Some(Box::new(move |sample: &StatusSample| {
                if let Some(slot) = cb_statuses.lock().get(&sample.goal_id) {
                    let current = GoalStatus::from(slot.load(Ordering::Acquire));
                    if !current.is_terminal() {
                        slot.store(u8::from(sample.status), Ordering::Release);
                    }
                }
            })),
        )?;

        let cb_feedback = feedback_callbacks.clone();
        let _feedback_sub = node.create_subscriber::<FeedbackSample<A::Feedback>>(
            &format!("{name}/_action/feedback"),
            Some(Box::new(move |sample: &FeedbackSample<A::Feedback>| {
                if let Some(cb) = cb_feedback.lock().get(&sample.goal_id) {
                    cb(&sample.feedback);
                }
            })),
        )?;

        Ok(Self {
            name: name.to_string(),
            send_goal,
            cancel_goal,
            get_result,
            statuses,
            feedback_callbacks,
            _feedback_sub,
            _status_sub,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sends a goal. `feedback_callback`, when given, is invoked on the
    /// subscriber delivery thread for every feedback sample matching the
    /// returned handle's `goal_id`.
    pub fn send_goal(
        &self,
        goal: A::Goal,
        feedback_callback: Option<FeedbackCallback<A>>,
    ) -> Result<ClientGoalHandle<A>> {
        let response: SendGoalResponse = self
            .send_goal
            .call(&SendGoalRequest { goal }, DEFAULT_CALL_TIMEOUT)?;
        if !response.accepted {
            return Err(Error::Action("goal was rejected by the action server".to_string()));
        }

        let status = Arc::new(AtomicU8::new(u8::from(GoalStatus::Accepted)));
        self.statuses.lock().insert(response.goal_id, status.clone());
        if let Some(cb) = feedback_callback {
            self.feedback_callbacks.lock().insert(response.goal_id, cb);
        }

        Ok(ClientGoalHandle {
            goal_id: response.goal_id,
            status,
            cancel_client: self.cancel_goal.clone(),
            get_result_client: self.get_result.clone(),
        })
    }

    /// Closes the three composed RPC clients and the feedback/status
    /// subscribers, undeclaring their liveliness tokens. Idempotent: a
    /// second call is a no-op (each sub-endpoint's own `close` already is).
    pub fn close(&self) -> Result<()> {
        self.send_goal.close()?;
        self.cancel_goal.close()?;
        self.get_result.close()?;
        self._feedback_sub.close()?;
        self._status_sub.close()?;
        Ok(())
    }
}

struct CancelGoalService;
impl crate::message::ServiceSchema for CancelGoalService {
    type Request = GoalIdRequest;
    type Response = AcceptedResponse;
}

struct SendGoalService<A>(std::marker::PhantomData<A>);
impl<A: ActionSchema> crate::message::ServiceSchema for SendGoalService<A> {
    type Request = SendGoalRequest<A::Goal>;
    type Response = SendGoalResponse;
}

struct GetResultService<A>(std::marker::PhantomData<A>);
impl<A: ActionSchema> crate::message::ServiceSchema for GetResultService<A> {
    type Request = GoalIdRequest;
    type Response = GetResultResponse<A::Result>;
}
