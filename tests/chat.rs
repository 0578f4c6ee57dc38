//! Multi-party scenario: three peers coordinate room membership over a
//! join/leave/message protocol authored with the builder DSL.

mod common;

use common::{init_tracing, spawn_runner, wait_until};
use prodigy::{Protocol, ProtocolRunner};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;

#[derive(Serialize, Deserialize, Debug, Clone)]
struct Membership {
    member: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ChatMessage {
    from: String,
    text: String,
}

/// Per-peer room view, shared with that peer's handlers.
#[derive(Clone, Default)]
struct PeerState {
    members: Arc<Mutex<BTreeSet<String>>>,
    log: Arc<Mutex<Vec<ChatMessage>>>,
}

impl PeerState {
    fn members(&self) -> BTreeSet<String> {
        self.members.lock().unwrap().clone()
    }

    fn log_len(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

fn room_protocol(state: PeerState) -> Protocol {
    let on_ask = state.clone();
    let on_join = state.clone();
    let on_message = state.clone();
    let on_leave = state;

    Protocol::builder("room")
        // Exchange: admit the joiner and answer with the current member list.
        .on("ask_to_join", move |mut request, _sender| {
            let state = on_ask.clone();
            async move {
                let joining: Membership = request.payload_as()?;
                let roster: Vec<String> = {
                    let mut members = state.members.lock().unwrap();
                    members.insert(joining.member);
                    members.iter().cloned().collect()
                };
                request.respond(Some(&roster)).await
            }
        })
        // Send-only broadcast: a peer announces itself to the others.
        .on("join", move |request, _sender| {
            let state = on_join.clone();
            async move {
                let joining: Membership = request.payload_as()?;
                state.members.lock().unwrap().insert(joining.member);
                Ok(())
            }
        })
        .on("message", move |request, _sender| {
            let state = on_message.clone();
            async move {
                let message: ChatMessage = request.payload_as()?;
                state.log.lock().unwrap().push(message);
                Ok(())
            }
        })
        .on("leave", move |request, _sender| {
            let state = on_leave.clone();
            async move {
                let leaving: Membership = request.payload_as()?;
                state.members.lock().unwrap().remove(&leaving.member);
                Ok(())
            }
        })
        .build()
}

async fn spawn_peer() -> (ProtocolRunner, PeerState, String) {
    let state = PeerState::default();
    let runner = spawn_runner(room_protocol(state.clone())).await;
    let addr = runner.local_addr().unwrap().to_string();
    state.members.lock().unwrap().insert(addr.clone());
    (runner, state, addr)
}

fn set_of<const N: usize>(addrs: [&String; N]) -> BTreeSet<String> {
    addrs.into_iter().cloned().collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_three_peer_room_membership() {
    init_tracing();

    let (mut a, a_state, a_addr) = spawn_peer().await;
    let (mut b, b_state, b_addr) = spawn_peer().await;
    let (mut c, c_state, c_addr) = spawn_peer().await;

    let a_socket = a.local_addr().unwrap();
    let b_socket = b.local_addr().unwrap();
    let c_socket = c.local_addr().unwrap();

    let b_sender = b.sender().unwrap();
    let c_sender = c.sender().unwrap();

    // B joins the room through A.
    let roster: Vec<String> = timeout(
        Duration::from_secs(5),
        b_sender.exchange(
            "room",
            "ask_to_join",
            a_socket,
            Some(&Membership {
                member: b_addr.clone(),
            }),
        ),
    )
    .await
    .expect("Timeout joining via A")
    .expect("ask_to_join failed");
    *b_state.members.lock().unwrap() = roster.into_iter().collect();
    assert_eq!(b_state.members(), set_of([&a_addr, &b_addr]));

    // C joins through A, then announces itself to B with a send-only join.
    let roster: Vec<String> = timeout(
        Duration::from_secs(5),
        c_sender.exchange(
            "room",
            "ask_to_join",
            a_socket,
            Some(&Membership {
                member: c_addr.clone(),
            }),
        ),
    )
    .await
    .expect("Timeout joining via A")
    .expect("ask_to_join failed");
    *c_state.members.lock().unwrap() = roster.into_iter().collect();
    assert_eq!(c_state.members(), set_of([&a_addr, &b_addr, &c_addr]));

    c_sender
        .send(
            "room",
            "join",
            b_socket,
            Some(&Membership {
                member: c_addr.clone(),
            }),
        )
        .await
        .expect("join broadcast failed");

    let full_room = set_of([&a_addr, &b_addr, &c_addr]);
    for state in [&a_state, &b_state, &c_state] {
        let state = state.clone();
        let expected = full_room.clone();
        assert!(
            wait_until(Duration::from_secs(2), move || state.members() == expected).await,
            "room views did not converge after joins"
        );
    }

    // A round of messages: B to everyone else, C to everyone else.
    for (text, from, sender, peers) in [
        ("hi from b", &b_addr, &b_sender, [a_socket, c_socket]),
        ("hi from c", &c_addr, &c_sender, [a_socket, b_socket]),
    ] {
        for peer in peers {
            sender
                .send(
                    "room",
                    "message",
                    peer,
                    Some(&ChatMessage {
                        from: from.clone(),
                        text: text.to_string(),
                    }),
                )
                .await
                .expect("message send failed");
        }
    }

    let a_log = a_state.clone();
    assert!(
        wait_until(Duration::from_secs(2), move || a_log.log_len() == 2).await,
        "A did not observe both messages"
    );
    let b_log = b_state.clone();
    assert!(
        wait_until(Duration::from_secs(2), move || b_log.log_len() == 1).await,
        "B did not observe C's message"
    );
    let c_log = c_state.clone();
    assert!(
        wait_until(Duration::from_secs(2), move || c_log.log_len() == 1).await,
        "C did not observe B's message"
    );
    assert_eq!(b_state.log.lock().unwrap()[0].from, c_addr);
    assert_eq!(c_state.log.lock().unwrap()[0].from, b_addr);

    // B leaves and broadcasts the departure.
    for peer in [a_socket, c_socket] {
        b_sender
            .send(
                "room",
                "leave",
                peer,
                Some(&Membership {
                    member: b_addr.clone(),
                }),
            )
            .await
            .expect("leave broadcast failed");
    }

    let after_leave = set_of([&a_addr, &c_addr]);
    for state in [&a_state, &c_state] {
        let state = state.clone();
        let expected = after_leave.clone();
        assert!(
            wait_until(Duration::from_secs(2), move || state.members() == expected).await,
            "room views did not converge after leave"
        );
    }

    // Views stayed consistent with each peer's observed event sequence.
    assert_eq!(a_state.members(), c_state.members());

    let _ = a.close().await;
    let _ = b.close().await;
    let _ = c.close().await;
}
