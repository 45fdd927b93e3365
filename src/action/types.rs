//! Action wire types and goal state machine (spec §4.8).
//!
//! `GoalStatus` is reused near-verbatim from `oxidros-core/src/action.rs`'s
//! `GoalStatus` enum. The wire envelope types below (`SendGoalRequest`,
//! `GetResultResponse`, ...) implement [`Message`] by hand rather than via
//! the `serde` blanket impl, since they wrap an arbitrary `A::Goal`/
//! `A::Result`/`A::Feedback` that is only known to implement `Message`, not
//! `Serialize`.

use crate::error::{Error, Result};
use crate::message::Message;

/// A goal's identifier: 16 raw bytes (a `uuid::Uuid`), generated fresh by the
/// server for every accepted goal (spec §4.8, grounded on `generate_gid` in
/// `oxidros-zenoh/src/attachment.rs`).
pub type GoalId = [u8; 16];

pub fn new_goal_id() -> GoalId {
    *uuid::Uuid::new_v4().as_bytes()
}

/// Goal lifecycle state, reused near-verbatim from the teacher's
/// `oxidros_core::action::GoalStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GoalStatus {
    Unknown = 0,
    Accepted = 1,
    Executing = 2,
    Canceling = 3,
    Succeeded = 4,
    Canceled = 5,
    Aborted = 6,
}

impl GoalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GoalStatus::Succeeded | GoalStatus::Canceled | GoalStatus::Aborted
        )
    }
}

impl From<u8> for GoalStatus {
    fn from(v: u8) -> Self {
        match v {
            1 => GoalStatus::Accepted,
            2 => GoalStatus::Executing,
            3 => GoalStatus::Canceling,
            4 => GoalStatus::Succeeded,
            5 => GoalStatus::Canceled,
            6 => GoalStatus::Aborted,
            _ => GoalStatus::Unknown,
        }
    }
}

impl From<GoalStatus> for u8 {
    fn from(s: GoalStatus) -> Self {
        s as u8
    }
}

pub struct SendGoalRequest<G> {
    pub goal: G,
}

impl<G: Message> Message for SendGoalRequest<G> {
    fn schema_name() -> &'static str {
        "zrm::action::SendGoalRequest"
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        self.goal.to_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let goal = G::from_bytes(bytes)?;
        Ok(Self { goal })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SendGoalResponse {
    pub accepted: bool,
    pub goal_id: GoalId,
}

impl Message for SendGoalResponse {
    fn schema_name() -> &'static str {
        "zrm::action::SendGoalResponse"
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(17);
        buf.push(self.accepted as u8);
        buf.extend_from_slice(&self.goal_id);
        Ok(buf)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 17 {
            return Err(Error::Type("send_goal response malformed".to_string()));
        }
        let mut goal_id = [0u8; 16];
        goal_id.copy_from_slice(&bytes[1..17]);
        Ok(Self {
            accepted: bytes[0] != 0,
            goal_id,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GoalIdRequest {
    pub goal_id: GoalId,
}

impl Message for GoalIdRequest {
    fn schema_name() -> &'static str {
        "zrm::action::GoalIdRequest"
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.goal_id.to_vec())
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 16 {
            return Err(Error::Type("goal id request malformed".to_string()));
        }
        let mut goal_id = [0u8; 16];
        goal_id.copy_from_slice(bytes);
        Ok(Self { goal_id })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AcceptedResponse {
    pub accepted: bool,
}

impl Message for AcceptedResponse {
    fn schema_name() -> &'static str {
        "zrm::action::AcceptedResponse"
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(vec![self.accepted as u8])
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 1 {
            return Err(Error::Type("accepted response malformed".to_string()));
        }
        Ok(Self {
            accepted: bytes[0] != 0,
        })
    }
}

pub struct GetResultResponse<R> {
    pub status: GoalStatus,
    pub result: R,
}

impl<R: Message> Message for GetResultResponse<R> {
    fn schema_name() -> &'static str {
        "zrm::action::GetResultResponse"
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = vec![u8::from(self.status)];
        buf.extend_from_slice(&self.result.to_bytes()?);
        Ok(buf)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::Type("get_result response too short".to_string()));
        }
        let status = GoalStatus::from(bytes[0]);
        let result = R::from_bytes(&bytes[1..])?;
        Ok(Self { status, result })
    }
}

pub struct FeedbackSample<F> {
    pub goal_id: GoalId,
    pub feedback: F,
}

impl<F: Message> Message for FeedbackSample<F> {
    fn schema_name() -> &'static str {
        "zrm::action::FeedbackSample"
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = self.goal_id.to_vec();
        buf.extend_from_slice(&self.feedback.to_bytes()?);
        Ok(buf)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 16 {
            return Err(Error::Type("feedback sample too short".to_string()));
        }
        let mut goal_id = [0u8; 16];
        goal_id.copy_from_slice(&bytes[..16]);
        let feedback = F::from_bytes(&bytes[16..])?;
        Ok(Self { goal_id, feedback })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StatusSample {
    pub goal_id: GoalId,
    pub status: GoalStatus,
}

impl Message for StatusSample {
    fn schema_name() -> &'static str {
        "zrm::action::StatusSample"
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = self.goal_id.to_vec();
        buf.push(u8::from(self.status));
        Ok(buf)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 17 {
            return Err(Error::Type("status sample malformed".to_string()));
        }
        let mut goal_id = [0u8; 16];
        goal_id.copy_from_slice(&bytes[..16]);
        Ok(Self {
            goal_id,
            status: GoalStatus::from(bytes[16]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Goal {
        order: u32,
    }

    #[test]
    fn send_goal_request_roundtrip() {
        let req = SendGoalRequest {
            goal: Goal { order: 10 },
        };
        let bytes = req.to_bytes().unwrap();
        let back = SendGoalRequest::<Goal>::from_bytes(&bytes).unwrap();
        assert_eq!(back.goal, req.goal);
    }

    #[test]
    fn status_sample_roundtrip() {
        let sample = StatusSample {
            goal_id: new_goal_id(),
            status: GoalStatus::Executing,
        };
        let bytes = sample.to_bytes().unwrap();
        let back = StatusSample::from_bytes(&bytes).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn terminal_states() {
        assert!(GoalStatus::Succeeded.is_terminal());
        assert!(GoalStatus::Canceled.is_terminal());
        assert!(GoalStatus::Aborted.is_terminal());
        assert!(!GoalStatus::Executing.is_terminal());
        assert!(!GoalStatus::Accepted.is_terminal());
    }
}
