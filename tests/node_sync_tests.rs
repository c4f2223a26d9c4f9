//! Node synchronization integration tests
//!
//! Runs real nodes on loopback sockets and checks that they converge on the
//! same chain through the tip-then-full-chain protocol.

use peer_ledger::{is_valid_chain, Block, Blockchain, Node, Peer};
use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

/// Start a node accepting peers on an ephemeral port; returns it with its P2P address
fn start_node() -> (Node, String) {
    let node = Node::new(Blockchain::new());
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let listening = node.clone();
    thread::spawn(move || listening.listen(listener));
    (node, addr)
}

fn wait_for(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(20));
    }
}

fn chain_len(node: &Node) -> usize {
    node.get_chain().unwrap().len()
}

#[test]
fn test_mined_block_reaches_connected_peer() {
    let (a, _) = start_node();
    let (b, b_addr) = start_node();

    a.add_peer(&b_addr).unwrap();
    wait_for("both sides to register", || {
        a.list_peers().unwrap().len() == 1 && b.list_peers().unwrap().len() == 1
    });

    let block = a.mine("hello").unwrap();
    assert_eq!(block.get_index(), 1);
    assert_eq!(block.get_previous_hash(), Block::genesis().get_hash());

    wait_for("peer to append the block", || chain_len(&b) == 2);
    assert_eq!(a.get_chain().unwrap(), b.get_chain().unwrap());
}

#[test]
fn test_lagging_node_catches_up_on_connect() {
    let (a, a_addr) = start_node();
    for i in 0..4 {
        a.mine(&format!("block {i}")).unwrap();
    }
    let (b, _) = start_node();
    b.mine("only one").unwrap();
    assert_eq!(chain_len(&a), 5);
    assert_eq!(chain_len(&b), 2);

    // b's tip query finds a ahead by more than one block and pulls the full chain
    b.add_peer(&a_addr).unwrap();
    wait_for("lagging node to adopt the longer chain", || chain_len(&b) == 5);

    let adopted = b.get_chain().unwrap();
    assert!(is_valid_chain(&adopted));
    assert_eq!(adopted, a.get_chain().unwrap());
}

#[test]
fn test_block_propagates_across_a_line_of_nodes() {
    let (a, _) = start_node();
    let (b, b_addr) = start_node();
    let (c, c_addr) = start_node();

    a.add_peer(&b_addr).unwrap();
    b.add_peer(&c_addr).unwrap();
    wait_for("links to come up", || {
        a.list_peers().unwrap().len() == 1
            && b.list_peers().unwrap().len() == 2
            && c.list_peers().unwrap().len() == 1
    });

    a.mine("relayed").unwrap();
    wait_for("block to reach the far end", || chain_len(&c) == 2);
    assert_eq!(a.get_chain().unwrap(), c.get_chain().unwrap());
}

#[test]
fn test_disconnected_peer_is_deregistered() {
    let (a, _) = start_node();
    let (b, b_addr) = start_node();

    a.add_peer(&b_addr).unwrap();
    wait_for("registration", || b.list_peers().unwrap().len() == 1);

    for peer in a.registry().snapshot().unwrap() {
        peer.close();
    }
    wait_for("both sides to drop the channel", || {
        a.list_peers().unwrap().is_empty() && b.list_peers().unwrap().is_empty()
    });

    // Mining with no peers still works
    a.mine("alone").unwrap();
    assert_eq!(chain_len(&a), 2);
}
