//! Integration tests for the action layer (spec §8 scenarios 5-6), grounded
//! on `examples/original_source/examples/action_server.py` /
//! `action_client.py`'s Fibonacci example.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zrm::action::ServerGoalHandle;
use zrm::message::ActionSchema;
use zrm::{Context, Node};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FibonacciGoal {
    order: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FibonacciResult {
    sequence: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FibonacciFeedback {
    partial_sequence: Vec<u64>,
}

struct Fibonacci;
impl ActionSchema for Fibonacci {
    type Goal = FibonacciGoal;
    type Result = FibonacciResult;
    type Feedback = FibonacciFeedback;
}

fn test_node(name: &str) -> Node {
    let ctx = Context::new(0).expect("open context");
    Node::with_context(ctx, name).expect("create node")
}

fn execute_fibonacci(goal_handle: Arc<ServerGoalHandle<Fibonacci>>) {
    let order = goal_handle.goal.order;
    goal_handle.execute().unwrap();

    let mut sequence: Vec<u64> = vec![0, 1];
    for i in 1..order as usize {
        if goal_handle.cancel_requested() {
            goal_handle.cancel(FibonacciResult { sequence }).unwrap();
            return;
        }
        let next = sequence[i] + sequence[i - 1];
        sequence.push(next);
        goal_handle
            .publish_feedback(FibonacciFeedback {
                partial_sequence: sequence.clone(),
            })
            .unwrap();
    }
    goal_handle.succeed(FibonacciResult { sequence }).unwrap();
}

#[test]
fn fibonacci_action_runs_to_completion() {
    let node = test_node("fibonacci_server");
    let server = node
        .create_action_server::<Fibonacci>("fibonacci", execute_fibonacci)
        .expect("create action server");
    std::thread::sleep(Duration::from_millis(200));

    let client = node
        .create_action_client::<Fibonacci>("fibonacci")
        .expect("create action client");

    let feedback_log: Arc<Mutex<Vec<Vec<u64>>>> = Arc::new(Mutex::new(Vec::new()));
    let log = feedback_log.clone();
    let goal_handle = client
        .send_goal(
            FibonacciGoal { order: 10 },
            Some(Box::new(move |fb: &FibonacciFeedback| {
                log.lock().unwrap().push(fb.partial_sequence.clone());
            })),
        )
        .expect("goal accepted");

    let result = goal_handle
        .get_result(Duration::from_secs(30))
        .expect("goal completes");

    assert_eq!(
        result.sequence,
        vec![0u64, 1, 1, 2, 3, 5, 8, 13, 21, 34, 55]
    );
    server.close().unwrap();
}

#[test]
fn goal_status_is_sticky_once_terminal() {
    let node = test_node("fibonacci_server_2");
    let server = node
        .create_action_server::<Fibonacci>("fibonacci2", execute_fibonacci)
        .expect("create action server");
    std::thread::sleep(Duration::from_millis(200));

    let client = node
        .create_action_client::<Fibonacci>("fibonacci2")
        .expect("create action client");
    let goal_handle = client
        .send_goal(FibonacciGoal { order: 3 }, None)
        .expect("goal accepted");

    let _ = goal_handle.get_result(Duration::from_secs(10)).unwrap();
    assert!(goal_handle.status().is_terminal());
    server.close().unwrap();
}
