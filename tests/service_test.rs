//! Integration tests for ServiceServer/ServiceClient (spec §8 scenarios 2-4).
//!
//! Grounded on `examples/original_source/tests/service_test.py`: one shared
//! Context and Node host both ends of each service in these tests.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use zrm::{message::ServiceSchema, Context, EntityKind, Error, Node};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AddTwoIntsRequest {
    a: i64,
    b: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AddTwoIntsResponse {
    sum: i64,
}

struct AddTwoInts;
impl ServiceSchema for AddTwoInts {
    type Request = AddTwoIntsRequest;
    type Response = AddTwoIntsResponse;
}

fn test_node() -> Node {
    let ctx = Context::new(0).expect("open context");
    Node::with_context(ctx, "test_node").expect("create node")
}

#[test]
fn add_two_ints_succeeds() {
    let node = test_node();
    let server = node
        .create_server::<AddTwoInts>("add_two_ints", |req: AddTwoIntsRequest| {
            Ok(AddTwoIntsResponse { sum: req.a + req.b })
        })
        .expect("create server");
    std::thread::sleep(Duration::from_millis(200));

    let client = node.create_client::<AddTwoInts>("add_two_ints").expect("create client");
    let response = client
        .call(&AddTwoIntsRequest { a: 5, b: 7 }, Duration::from_secs(2))
        .expect("call succeeds");

    assert_eq!(response.sum, 12);
    server.close().unwrap();
    client.close().unwrap();
}

#[test]
fn call_async_delivers_result_to_repeated_reads() {
    let node = test_node();
    let server = node
        .create_server::<AddTwoInts>("add_two_ints_async", |req: AddTwoIntsRequest| {
            Ok(AddTwoIntsResponse { sum: req.a + req.b })
        })
        .expect("create server");
    std::thread::sleep(Duration::from_millis(200));

    let client = node
        .create_client::<AddTwoInts>("add_two_ints_async")
        .expect("create client");
    let future = client
        .call_async(&AddTwoIntsRequest { a: 3, b: 4 }, Duration::from_secs(2))
        .expect("call_async dispatches");

    let first = future.result(Some(Duration::from_secs(2))).expect("first read");
    assert_eq!(first.sum, 7);
    let second = future.result(Some(Duration::from_secs(2))).expect("second read");
    assert_eq!(second.sum, 7);

    server.close().unwrap();
    client.close().unwrap();
}

#[test]
fn call_async_cancel_before_completion_is_reported() {
    let node = test_node();
    let client = node
        .create_client::<AddTwoInts>("add_two_ints_cancel")
        .expect("create client");

    let future = client
        .call_async(&AddTwoIntsRequest { a: 1, b: 1 }, Duration::from_secs(5))
        .expect("call_async dispatches");
    assert!(future.cancel());

    let err = future
        .result(Some(Duration::from_millis(100)))
        .unwrap_err();
    assert!(matches!(err, Error::ServiceCancelled));

    client.close().unwrap();
}

#[test]
fn call_to_nonexistent_service_times_out() {
    let node = test_node();
    let client = node
        .create_client::<AddTwoInts>("nonexistent_service")
        .expect("create client");

    let err = client
        .call(&AddTwoIntsRequest { a: 5, b: 7 }, Duration::from_millis(500))
        .unwrap_err();

    match err {
        Error::Timeout(msg) => assert!(msg.contains("did not respond within")),
        other => panic!("expected timeout error, got {other:?}"),
    }
}

#[test]
fn handler_panic_becomes_service_error() {
    let node = test_node();
    let server = node
        .create_server::<AddTwoInts>("flaky", |_req: AddTwoIntsRequest| -> zrm::Result<AddTwoIntsResponse> {
            panic!("intentional error")
        })
        .expect("create server");
    std::thread::sleep(Duration::from_millis(200));

    let client = node.create_client::<AddTwoInts>("flaky").expect("create client");
    let err = client
        .call(&AddTwoIntsRequest { a: 1, b: 2 }, Duration::from_secs(2))
        .unwrap_err();

    match err {
        Error::Service(msg) => assert!(msg.contains("Service error")),
        other => panic!("expected service error, got {other:?}"),
    }
    server.close().unwrap();
    client.close().unwrap();
}

#[test]
fn wait_for_service_observes_discovery() {
    let node = test_node();
    let graph = node.graph().expect("graph");
    assert!(!graph.wait_for_service("slow_trigger", Duration::from_millis(100)));

    let server = node
        .create_server::<AddTwoInts>("slow_trigger", |req: AddTwoIntsRequest| {
            Ok(AddTwoIntsResponse { sum: req.a + req.b })
        })
        .expect("create server");

    assert!(graph.wait_for_service("slow_trigger", Duration::from_secs(2)));
    server.close().unwrap();
}

#[test]
fn server_close_removes_it_from_the_graph() {
    let node = test_node();
    let graph = node.graph().expect("graph");

    let server = node
        .create_server::<AddTwoInts>("disappearing_service", |req: AddTwoIntsRequest| {
            Ok(AddTwoIntsResponse { sum: req.a + req.b })
        })
        .expect("create server");
    assert!(graph.wait_for_service("disappearing_service", Duration::from_secs(2)));
    assert_eq!(
        graph.count(EntityKind::Service, "disappearing_service").unwrap(),
        1
    );

    server.close().unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    loop {
        if graph.count(EntityKind::Service, "disappearing_service").unwrap() == 0 {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "service did not disappear from the graph after close()");
        std::thread::sleep(Duration::from_millis(50));
    }
}
