//! Integration tests for Graph discovery, grounded on
//! `examples/original_source/tests/graph_test.py`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use zrm::{message::ServiceSchema, Context, EntityKind, Node};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Ping {
    n: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PingResponse {
    n: u32,
}

struct Echo;
impl ServiceSchema for Echo {
    type Request = Ping;
    type Response = PingResponse;
}

fn test_node() -> Node {
    let ctx = Context::new(0).expect("open context");
    Node::with_context(ctx, "test_node").expect("create node")
}

#[test]
fn graph_discovers_publisher() {
    let node = test_node();
    let graph = node.graph().expect("create graph");
    std::thread::sleep(Duration::from_millis(500));

    let publisher = node
        .create_publisher::<Ping>("test/topic")
        .expect("create publisher");
    std::thread::sleep(Duration::from_millis(500));

    assert!(graph.count(EntityKind::Publisher, "test/topic").unwrap() >= 1);
    publisher.close().unwrap();
}

#[test]
fn graph_discovers_subscriber() {
    let node = test_node();
    let graph = node.graph().expect("create graph");
    std::thread::sleep(Duration::from_millis(500));

    let subscriber = node
        .create_subscriber::<Ping>("test/topic", None)
        .expect("create subscriber");
    std::thread::sleep(Duration::from_millis(500));

    assert!(graph.count(EntityKind::Subscriber, "test/topic").unwrap() >= 1);
    subscriber.close().unwrap();
}

#[test]
fn graph_discovers_service() {
    let node = test_node();
    let graph = node.graph().expect("create graph");
    std::thread::sleep(Duration::from_millis(500));

    let server = node
        .create_server::<Echo>("test_service", |req: Ping| Ok(PingResponse { n: req.n }))
        .expect("create server");
    std::thread::sleep(Duration::from_millis(500));

    assert!(graph.count(EntityKind::Service, "test_service").unwrap() >= 1);
    assert!(graph.get_node_names().contains(&"test_node".to_string()));
    server.close().unwrap();
}

#[test]
fn count_rejects_node_kind_through_graph() {
    let node = test_node();
    let graph = node.graph().expect("create graph");
    assert!(graph.count(EntityKind::Node, "test_node").is_err());
}

#[test]
fn publisher_close_removes_it_from_the_graph() {
    let node = test_node();
    let graph = node.graph().expect("create graph");
    std::thread::sleep(Duration::from_millis(500));

    let publisher = node
        .create_publisher::<Ping>("disappearing/topic")
        .expect("create publisher");
    std::thread::sleep(Duration::from_millis(500));
    assert!(graph.count(EntityKind::Publisher, "disappearing/topic").unwrap() >= 1);

    publisher.close().unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    loop {
        if graph.count(EntityKind::Publisher, "disappearing/topic").unwrap() == 0 {
            break;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "publisher did not disappear from the graph after close()"
        );
        std::thread::sleep(Duration::from_millis(50));
    }
}
