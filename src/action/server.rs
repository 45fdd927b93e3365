//! Action server (spec §4.8).
//!
//! Composed from [`crate::service::Server`] + [`crate::topic::Publisher`] per
//! the five sub-endpoints in spec §6. Goal dispatch uses one `std::thread`
//! per accepted goal, matching the teacher's preference for explicit thread
//! ownership (`oxidros-zenoh/src/node.rs`) over a shared executor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::types::{
    new_goal_id, AcceptedResponse, FeedbackSample, GetResultResponse, GoalId, GoalIdRequest,
    GoalStatus, SendGoalRequest, SendGoalResponse, StatusSample,
};
use crate::error::{Error, Result};
use crate::message::ActionSchema;
use crate::node::Node;
use crate::service::Server;
use crate::topic::Publisher;

/// Upper bound on how long a `get_result` query blocks waiting for a goal to
/// reach a terminal state. A caller whose own timeout is shorter simply gives
/// up first; this only bounds how long the server-side handler thread parks.
const GET_RESULT_MAX_WAIT: Duration = Duration::from_secs(300);

struct GoalShared<A: ActionSchema> {
    status: Mutex<GoalStatus>,
    result: Mutex<Option<A::Result>>,
    cancel_requested: AtomicBool,
    condvar: Condvar,
}

impl<A: ActionSchema> GoalShared<A> {
    fn new() -> Self {
        Self {
            status: Mutex::new(GoalStatus::Accepted),
            result: Mutex::new(None),
            cancel_requested: AtomicBool::new(false),
            condvar: Condvar::new(),
        }
    }

}

/// The server-side per-goal handle passed to the user's execute callback.
pub struct ServerGoalHandle<A: ActionSchema> {
    pub goal: A::Goal,
    pub goal_id: GoalId,
    shared: Arc<GoalShared<A>>,
    feedback_pub: Arc<Publisher<FeedbackSample<A::Feedback>>>,
    status_pub: Arc<Publisher<StatusSample>>,
}

impl<A: ActionSchema> ServerGoalHandle<A> {
    pub fn status(&self) -> GoalStatus {
        *self.shared.status.lock()
    }

    pub fn cancel_requested(&self) -> bool {
        self.shared.cancel_requested.load(Ordering::Acquire)
    }

    fn publish_status(&self, status: GoalStatus) {
        let sample = StatusSample {
            goal_id: self.goal_id,
            status,
        };
        if let Err(err) = self.status_pub.publish(&sample) {
            tracing::warn!(%err, "failed to publish goal status");
        }
    }

    /// Transitions ACCEPTED -> EXECUTING.
    pub fn execute(&self) -> Result<()> {
        let mut status = self.shared.status.lock();
        if *status != GoalStatus::Accepted {
            return Err(Error::Action(format!(
                "cannot execute from state {:?}",
                *status
            )));
        }
        *status = GoalStatus::Executing;
        drop(status);
        self.publish_status(GoalStatus::Executing);
        Ok(())
    }

    /// Emits one feedback sample. Requires a non-terminal state.
    pub fn publish_feedback(&self, feedback: A::Feedback) -> Result<()> {
        if self.status().is_terminal() {
            return Err(Error::Action("cannot publish feedback from a terminal state".to_string()));
        }
        let sample = FeedbackSample {
            goal_id: self.goal_id,
            feedback,
        };
        self.feedback_pub.publish(&sample)
    }

    fn finish(&self, status: GoalStatus, result: A::Result) -> Result<()> {
        let mut guard = self.shared.status.lock();
        if guard.is_terminal() {
            return Err(Error::Action(format!(
                "cannot transition to {status:?} from terminal state {:?}",
                *guard
            )));
        }
        *guard = status;
        drop(guard);
        *self.shared.result.lock() = Some(result);
        self.shared.condvar.notify_all();
        self.publish_status(status);
        Ok(())
    }

    pub fn succeed(&self, result: A::Result) -> Result<()> {
        self.finish(GoalStatus::Succeeded, result)
    }

    pub fn abort(&self, result: A::Result) -> Result<()> {
        self.finish(GoalStatus::Aborted, result)
    }

    pub fn cancel(&self, result: A::Result) -> Result<()> {
        self.finish(GoalStatus::Canceled, result)
    }
}

/// A running action server: the five composed sub-endpoints plus the goal
/// registry.
pub struct ActionServer<A: ActionSchema> {
    name: String,
    feedback_pub: Arc<Publisher<FeedbackSample<A::Feedback>>>,
    status_pub: Arc<Publisher<StatusSample>>,
    _send_goal: Server<SendGoalService<A>>,
    _cancel_goal: Server<CancelGoalService>,
    _get_result: Server<GetResultService<A>>,
}

impl<A: ActionSchema> ActionServer<A> {
    pub(crate) fn new(
        node: Node,
        name: &str,
        execute_callback: impl Fn(Arc<ServerGoalHandle<A>>) + Send + Sync + 'static,
    ) -> Result<Self> {
        let goals: Arc<Mutex<HashMap<GoalId, Arc<GoalShared<A>>>>> = Arc::new(Mutex::new(HashMap::new()));
        let feedback_pub: Arc<Publisher<FeedbackSample<A::Feedback>>> =
            Arc::new(node.create_publisher(&format!("{name}/_action/feedback"))?);
        let status_pub: Arc<Publisher<StatusSample>> =
            Arc::new(node.create_publisher(&format!("{name}/_action/status"))?);

        let execute_callback = Arc::new(execute_callback);

        let sg_goals = goals.clone();
        let sg_feedback = feedback_pub.clone();
        let sg_status = status_pub.clone();
        let sg_callback = execute_callback.clone();
        let send_goal = node.create_server::<SendGoalService<A>>(
            &format!("{name}/_action/send_goal"),
            move |request| {
                let goal_id = new_goal_id();
                let shared = Arc::new(GoalShared::<A>::new());
                sg_goals.lock().insert(goal_id, shared.clone());

                let handle = Arc::new(ServerGoalHandle {
                    goal: request.goal,
                    goal_id,
                    shared,
                    feedback_pub: sg_feedback.clone(),
                    status_pub: sg_status.clone(),
                });

                let callback = sg_callback.clone();
                let finish_handle = handle.clone();
                std::thread::spawn(move || {
                    callback(handle);
                    // Safety net: if the callback returned without reaching a
                    // terminal state, auto-abort (spec §9).
                    if !finish_handle.status().is_terminal() {
                        let _ = finish_handle.abort(A::Result::default());
                    }
                });

                Ok(SendGoalResponse {
                    accepted: true,
                    goal_id,
                })
            },
        )?;

        let cg_goals = goals.clone();
        let cancel_goal = node.create_server::<CancelGoalService>(
            &format!("{name}/_action/cancel_goal"),
            move |request| {
                let accepted = match cg_goals.lock().get(&request.goal_id) {
                    Some(shared) => {
                        let terminal = shared.status.lock().is_terminal();
                        if !terminal {
                            shared.cancel_requested.store(true, Ordering::Release);
                            *shared.status.lock() = GoalStatus::Canceling;
                        }
                        !terminal
                    }
                    None => false,
                };
                Ok(AcceptedResponse { accepted })
            },
        )?;

        let gr_goals = goals.clone();
        let get_result = node.create_server::<GetResultService<A>>(
            &format!("{name}/_action/get_result"),
            move |request| -> Result<GetResultResponse<A::Result>> {
                let shared = gr_goals
                    .lock()
                    .get(&request.goal_id)
                    .cloned()
                    .ok_or_else(|| Error::Action(format!("unknown goal_id for get_result: {:?}", request.goal_id)))?;

                let mut status_guard = shared.status.lock();
                if !status_guard.is_terminal() {
                    let _ = shared
                        .condvar
                        .wait_for(&mut status_guard, GET_RESULT_MAX_WAIT);
                }
                let status = *status_guard;
                drop(status_guard);
                let result = shared.result.lock().clone().unwrap_or_default();
                Ok(GetResultResponse { status, result })
            },
        )?;

        Ok(Self {
            name: name.to_string(),
            feedback_pub,
            status_pub,
            _send_goal: send_goal,
            _cancel_goal: cancel_goal,
            _get_result: get_result,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Closes all five composed sub-endpoints, undeclaring their liveliness
    /// tokens. Idempotent: a second call is a no-op (each sub-endpoint's own
    /// `close` already is).
    pub fn close(&self) -> Result<()> {
        self._send_goal.close()?;
        self._cancel_goal.close()?;
        self._get_result.close()?;
        self.feedback_pub.close()?;
        self.status_pub.close()?;
        Ok(())
    }
}

/// Marker service schemas composing the action's three RPC sub-endpoints.
struct SendGoalService<A>(std::marker::PhantomData<A>);
impl<A: ActionSchema> crate::message::ServiceSchema for SendGoalService<A> {
    type Request = SendGoalRequest<A::Goal>;
    type Response = SendGoalResponse;
}

struct CancelGoalService;
impl crate::message::ServiceSchema for CancelGoalService {
    type Request = GoalIdRequest;
    type Response = AcceptedResponse;
}

struct GetResultService<A>(std::marker::PhantomData<A>);
impl<A: ActionSchema> crate::message::ServiceSchema for GetResultService<A> {
    type Request = GoalIdRequest;
    type Response = GetResultResponse<A::Result>;
}
