//! # Presence Flows
//!
//! Registry and presence behavior across multiple connections per user:
//!
//! 1. Multi-device users appear once and receive every targeted event
//! 2. Presence snapshots follow every registry mutation
//! 3. Closed connections stop receiving events

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rt_signaling::{ClientSignal, ServerEvent, SignalingApi};

    use crate::integration::support::Harness;

    // =========================================================================
    // MULTI-CONNECTION USERS
    // =========================================================================

    #[test]
    fn test_two_connections_one_user() {
        let h = Harness::new();
        let mut c1 = h.connect("alice");
        let mut c2 = h.connect("alice");
        c1.events();
        c2.events();

        assert_eq!(h.service.online_users(), vec!["alice".to_string()]);

        let delivered = h
            .service
            .emit_to_user("alice", &ServerEvent::CallEnded {});
        assert_eq!(delivered, 2);
        assert_eq!(c1.signal_names(), vec!["call:ended"]);
        assert_eq!(c2.signal_names(), vec!["call:ended"]);
    }

    #[test]
    fn test_closed_connection_receives_nothing() {
        let h = Harness::new();
        let c1 = h.connect("alice");
        let mut c2 = h.connect("alice");
        let mut c3 = h.connect("alice");

        h.disconnect(&c1);
        c2.events();
        c3.events();

        let delivered = h
            .service
            .emit_to_user("alice", &ServerEvent::CallEnded {});
        assert_eq!(delivered, 2);
        assert_eq!(c2.signal_names(), vec!["call:ended"]);
        assert_eq!(c3.signal_names(), vec!["call:ended"]);
        assert!(h.service.registry().is_online("alice"));
    }

    #[test]
    fn test_identity_is_trimmed() {
        let h = Harness::new();
        let _padded = h.connect("  alice ");
        assert_eq!(h.service.online_users(), vec!["alice".to_string()]);
    }

    // =========================================================================
    // PRESENCE SNAPSHOTS
    // =========================================================================

    #[test]
    fn test_snapshot_follows_every_mutation() {
        let h = Harness::new();
        let mut alice = h.connect("alice");
        assert_eq!(alice.last_presence(), Some(vec!["alice".to_string()]));

        let bob = h.connect("bob");
        assert_eq!(
            alice.last_presence(),
            Some(vec!["alice".to_string(), "bob".to_string()])
        );

        h.disconnect(&bob);
        assert_eq!(alice.last_presence(), Some(vec!["alice".to_string()]));
    }

    #[test]
    fn test_anonymous_connection_sees_presence_but_is_not_listed() {
        let h = Harness::new();
        let _alice = h.connect("alice");
        let mut anonymous = h.connect_anonymous();

        assert_eq!(anonymous.last_presence(), Some(vec!["alice".to_string()]));
        assert_eq!(h.service.online_users(), vec!["alice".to_string()]);

        let _bob = h.connect("bob");
        assert_eq!(
            anonymous.last_presence(),
            Some(vec!["alice".to_string(), "bob".to_string()])
        );
    }

    #[tokio::test]
    async fn test_sentinel_identity_cannot_signal() {
        let h = Harness::new();
        let sentinel = h.connect("undefined");
        assert!(h.service.online_users().is_empty());

        let result = h
            .signal(
                &sentinel,
                ClientSignal::GroupJoin {
                    group_id: "g1".into(),
                },
            )
            .await;
        assert_eq!(
            result.map_err(|e| e.code()),
            Err("invalid_identity")
        );
    }

    #[test]
    fn test_disconnect_twice_is_harmless() {
        let h = Harness::new();
        let mut alice = h.connect("alice");
        let bob = h.connect("bob");
        alice.events();

        h.disconnect(&bob);
        h.disconnect(&bob);

        let snapshots: Vec<_> = alice
            .events()
            .into_iter()
            .filter(|event| matches!(event, ServerEvent::OnlineUsers(_)))
            .collect();
        assert_eq!(snapshots.len(), 1);
    }

    // =========================================================================
    // PROPERTY: online iff at least one connection
    // =========================================================================

    #[derive(Debug, Clone)]
    enum Op {
        Connect(usize),
        Disconnect(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..3).prop_map(Op::Connect),
            (0usize..16).prop_map(Op::Disconnect),
        ]
    }

    proptest! {
        #[test]
        fn prop_online_iff_connected(ops in prop::collection::vec(op_strategy(), 1..40)) {
            let users = ["alice", "bob", "carol"];
            let h = Harness::new();
            let mut live = Vec::new();

            for op in ops {
                match op {
                    Op::Connect(user) => live.push((users[user], h.connect(users[user]))),
                    Op::Disconnect(index) if !live.is_empty() => {
                        let (_, client) = live.remove(index % live.len());
                        h.disconnect(&client);
                    }
                    Op::Disconnect(_) => {}
                }

                for user in users {
                    let expected = live.iter().filter(|(u, _)| *u == user).count();
                    let registry = h.service.registry();
                    prop_assert_eq!(registry.connections_of(user).len(), expected);
                    prop_assert_eq!(registry.is_online(user), expected > 0);
                }
            }
        }
    }
}
