//! # Call Flows
//!
//! The call state machine end to end:
//!
//! - request → reject: caller told `callCancelled`, `rejected` logged
//! - request → end: both parties told, outcome logged as given
//! - request → caller disconnects: receiver told, nothing logged
//! - terminal transitions are remove-once, also under concurrency

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use proptest::prelude::*;
    use rt_signaling::{
        CallKind, CallStatus, ClientSignal, FailingCallLog, ServerEvent, SignalingApi,
        SignalingConfig, TransitionOutcome,
    };

    use crate::integration::support::{call_request, Client, Harness};

    fn end(channel: &str, status: CallStatus, duration: u64) -> ClientSignal {
        ClientSignal::CallEnd {
            channel_id: channel.into(),
            terminal_status: status,
            duration_seconds: duration,
        }
    }

    fn reject(channel: &str) -> ClientSignal {
        ClientSignal::CallRejected {
            channel_id: channel.into(),
        }
    }

    // =========================================================================
    // REJECT
    // =========================================================================

    #[tokio::test]
    async fn test_receiver_rejects_ringing_call() {
        let h = Harness::new();
        let mut alice = h.connect("alice");
        let mut bob = h.connect("bob");

        let outcome = h.signal(&alice, call_request("bob", "ch1")).await.unwrap();
        assert_eq!(outcome, TransitionOutcome::Applied);

        let incoming = bob.signals();
        match incoming.as_slice() {
            [ServerEvent::IncomingCall {
                caller_info,
                channel_id,
                call_type,
            }] => {
                assert_eq!(channel_id, "ch1");
                assert_eq!(*call_type, CallKind::Video);
                assert_eq!(caller_info.id, "alice");
                // Blank caller name falls back to the caller id.
                assert_eq!(caller_info.name, "alice");
            }
            other => panic!("unexpected events: {other:?}"),
        }

        h.signal(&bob, reject("ch1")).await.unwrap();

        assert_eq!(
            alice.signals(),
            vec![ServerEvent::CallCancelled {
                reason: "rejected".into()
            }]
        );
        let log = h.call_log.entries();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, CallStatus::Rejected);
        assert_eq!(log[0].duration, 0);
        assert_eq!(log[0].caller, "alice");
        assert!(h.service.calls().record("ch1").is_none());
    }

    #[tokio::test]
    async fn test_caller_cannot_reject_own_call() {
        let h = Harness::new();
        let alice = h.connect("alice");
        let _bob = h.connect("bob");

        h.signal(&alice, call_request("bob", "ch1")).await.unwrap();
        let outcome = h.signal(&alice, reject("ch1")).await.unwrap();

        assert_eq!(outcome, TransitionOutcome::NoOp);
        assert!(h.service.calls().record("ch1").is_some());
        assert!(h.call_log.is_empty());
    }

    #[tokio::test]
    async fn test_padded_receiver_id_reaches_receiver() {
        let h = Harness::new();
        let mut alice = h.connect("alice");
        let mut bob = h.connect(" bob ");

        h.signal(&alice, call_request("bob ", "ch1")).await.unwrap();
        assert_eq!(h.service.calls().record("ch1").unwrap().receiver, "bob");
        assert_eq!(bob.signal_names(), vec!["incomingCall"]);

        let outcome = h.signal(&bob, reject("ch1")).await.unwrap();
        assert_eq!(outcome, TransitionOutcome::Applied);
        assert_eq!(alice.signal_names(), vec!["callCancelled"]);
        assert!(h.service.calls().record("ch1").is_none());
    }

    #[tokio::test]
    async fn test_reject_after_accept_is_ignored() {
        let h = Harness::new();
        let mut alice = h.connect("alice");
        let bob = h.connect("bob");

        h.signal(&alice, call_request("bob", "ch1")).await.unwrap();
        h.signal(
            &bob,
            ClientSignal::CallAccepted {
                channel_id: "ch1".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(alice.signal_names(), vec!["callAccepted"]);

        let outcome = h.signal(&bob, reject("ch1")).await.unwrap();
        assert_eq!(outcome, TransitionOutcome::NoOp);
        assert!(h.call_log.is_empty());
    }

    // =========================================================================
    // END
    // =========================================================================

    #[tokio::test]
    async fn test_end_notifies_both_and_logs_outcome() {
        let h = Harness::new();
        let mut alice = h.connect("alice");

        // Receiver comes online after the request was issued.
        h.signal(&alice, call_request("bob", "ch2")).await.unwrap();
        let mut bob = h.connect("bob");
        assert!(bob.signals().is_empty());

        h.signal(&bob, end("ch2", CallStatus::Answered, 125))
            .await
            .unwrap();

        assert_eq!(
            alice.signal_names(),
            vec!["call:ended", "call:history_updated"]
        );
        assert_eq!(bob.signal_names(), vec!["call:ended", "call:history_updated"]);

        let log = h.call_log.entries();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, CallStatus::Answered);
        assert_eq!(log[0].duration, 125);
        assert!(h.service.calls().record("ch2").is_none());
    }

    #[tokio::test]
    async fn test_end_from_outsider_is_ignored() {
        let h = Harness::new();
        let alice = h.connect("alice");
        let _bob = h.connect("bob");
        let mut mallory = h.connect("mallory");

        h.signal(&alice, call_request("bob", "ch2")).await.unwrap();
        let outcome = h
            .signal(&mallory, end("ch2", CallStatus::Answered, 1))
            .await
            .unwrap();

        assert_eq!(outcome, TransitionOutcome::NoOp);
        assert!(mallory.signals().is_empty());
        assert_eq!(h.service.calls().active_calls(), 1);
    }

    #[tokio::test]
    async fn test_history_visible_to_both_parties() {
        let h = Harness::new();
        let alice = h.connect("alice");
        let _bob = h.connect("bob");

        h.signal(&alice, call_request("bob", "ch2")).await.unwrap();
        h.signal(&alice, end("ch2", CallStatus::Busy, 0)).await.unwrap();

        for user in ["alice", "bob"] {
            let history = h.service.call_history(user).await.unwrap();
            assert_eq!(history.len(), 1);
            assert_eq!(history[0].status, CallStatus::Busy);
        }
    }

    // =========================================================================
    // DISCONNECT CLEANUP
    // =========================================================================

    #[tokio::test]
    async fn test_caller_disconnect_ends_ringing_call() {
        let h = Harness::new();
        let alice = h.connect("alice");
        let mut bob = h.connect("bob");

        h.signal(&alice, call_request("bob", "ch3")).await.unwrap();
        bob.events();

        h.disconnect(&alice);

        assert_eq!(bob.signal_names(), vec!["call:ended"]);
        assert!(h.service.calls().record("ch3").is_none());
        assert!(h.call_log.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_of_secondary_device_keeps_call() {
        let h = Harness::new();
        let alice_phone = h.connect("alice");
        let alice_laptop = h.connect("alice");
        let mut bob = h.connect("bob");

        h.signal(&alice_phone, call_request("bob", "ch3")).await.unwrap();
        bob.events();

        h.disconnect(&alice_laptop);

        assert!(bob.signals().is_empty());
        assert!(h.service.calls().record("ch3").is_some());
    }

    // =========================================================================
    // DUPLICATES AND IDEMPOTENCE
    // =========================================================================

    #[tokio::test]
    async fn test_duplicate_channel_refused() {
        let h = Harness::new();
        let alice = h.connect("alice");
        let carol = h.connect("carol");
        let mut bob = h.connect("bob");

        h.signal(&alice, call_request("bob", "ch1")).await.unwrap();
        bob.events();

        let result = h.signal(&carol, call_request("bob", "ch1")).await;
        assert_eq!(result.map_err(|e| e.code()), Err("duplicate_channel"));

        assert!(bob.signals().is_empty());
        assert_eq!(h.service.calls().record("ch1").unwrap().caller, "alice");
    }

    #[tokio::test]
    async fn test_second_end_is_noop() {
        let h = Harness::new();
        let mut alice = h.connect("alice");
        let mut bob = h.connect("bob");

        h.signal(&alice, call_request("bob", "ch2")).await.unwrap();
        h.signal(&alice, end("ch2", CallStatus::Answered, 10))
            .await
            .unwrap();
        alice.events();
        bob.events();

        let outcome = h
            .signal(&bob, end("ch2", CallStatus::Answered, 10))
            .await
            .unwrap();

        assert_eq!(outcome, TransitionOutcome::NoOp);
        assert!(alice.signals().is_empty());
        assert!(bob.signals().is_empty());
        assert_eq!(h.call_log.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_terminal_signals_log_once() {
        for round in 0..50 {
            let h = Harness::new();
            let alice = h.connect("alice");
            let bob = h.connect("bob");
            let channel = format!("race-{round}");

            h.signal(&alice, call_request("bob", &channel)).await.unwrap();

            let rejecter = {
                let (service, conn, channel) =
                    (Arc::clone(&h.service), bob.connection_id, channel.clone());
                tokio::spawn(async move { service.handle_signal(conn, reject(&channel)).await })
            };
            let ender = {
                let (service, conn, channel) =
                    (Arc::clone(&h.service), alice.connection_id, channel.clone());
                tokio::spawn(async move {
                    service
                        .handle_signal(conn, end(&channel, CallStatus::Missed, 0))
                        .await
                })
            };

            let outcomes = [
                rejecter.await.unwrap().unwrap(),
                ender.await.unwrap().unwrap(),
            ];
            let applied = outcomes.iter().filter(|o| o.is_applied()).count();
            assert_eq!(applied, 1, "round {round}: {outcomes:?}");
            assert_eq!(h.call_log.len(), 1);
            assert_eq!(h.service.calls().active_calls(), 0);
        }
    }

    #[derive(Debug, Clone)]
    enum Terminal {
        Reject,
        EndByCaller,
        EndByReceiver,
        CallerDisconnect,
    }

    fn terminal_strategy() -> impl Strategy<Value = Terminal> {
        prop_oneof![
            Just(Terminal::Reject),
            Just(Terminal::EndByCaller),
            Just(Terminal::EndByReceiver),
            Just(Terminal::CallerDisconnect),
        ]
    }

    proptest! {
        #[test]
        fn prop_only_first_terminal_transition_counts(
            sequence in prop::collection::vec(terminal_strategy(), 1..8)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let h = Harness::new();
                let alice = h.connect("alice");
                let mut bob = h.connect("bob");
                h.signal(&alice, call_request("bob", "ch")).await.unwrap();
                bob.events();

                let mut applied = 0;
                let mut logged_by_first = false;
                for step in &sequence {
                    let outcome = match step {
                        Terminal::Reject => h.signal(&bob, reject("ch")).await.unwrap(),
                        Terminal::EndByCaller => h
                            .signal(&alice, end("ch", CallStatus::Answered, 3))
                            .await
                            .unwrap_or(TransitionOutcome::NoOp),
                        Terminal::EndByReceiver => h
                            .signal(&bob, end("ch", CallStatus::Answered, 3))
                            .await
                            .unwrap(),
                        Terminal::CallerDisconnect => {
                            let active = h.service.calls().active_calls();
                            h.disconnect(&alice);
                            if active > h.service.calls().active_calls() {
                                TransitionOutcome::Applied
                            } else {
                                TransitionOutcome::NoOp
                            }
                        }
                    };
                    if outcome.is_applied() {
                        applied += 1;
                        logged_by_first = !matches!(step, Terminal::CallerDisconnect);
                    }
                }

                assert_eq!(applied, 1);
                assert_eq!(h.call_log.len(), usize::from(logged_by_first));
                assert!(h.service.calls().record("ch").is_none());

                let ended = bob
                    .signals()
                    .iter()
                    .filter(|event| matches!(event, ServerEvent::CallEnded {}))
                    .count();
                assert!(ended <= 1);
            });
        }
    }

    // =========================================================================
    // RING TIMEOUT
    // =========================================================================

    #[tokio::test]
    async fn test_unanswered_call_times_out_as_missed() {
        let h = Harness::with_config(SignalingConfig::default().ring_timeout(Duration::from_secs(30)));
        let alice = h.connect("alice");
        let mut bob = h.connect("bob");

        h.signal(&alice, call_request("bob", "ch4")).await.unwrap();
        bob.events();

        h.clock.advance(10_000);
        assert_eq!(
            h.service.calls().sweep_expired(Duration::from_secs(30)).await,
            0
        );

        h.clock.advance(25_000);
        assert_eq!(
            h.service.calls().sweep_expired(Duration::from_secs(30)).await,
            1
        );

        assert_eq!(bob.signal_names(), vec!["call:ended", "call:history_updated"]);
        let log = h.call_log.entries();
        assert_eq!(log[0].status, CallStatus::Missed);
        assert_eq!(log[0].duration, 0);
    }

    // =========================================================================
    // COLLABORATOR FAILURE
    // =========================================================================

    #[tokio::test]
    async fn test_log_failure_still_notifies_parties() {
        let failing = Arc::new(FailingCallLog::default());
        let service = Harness::with_call_log(failing.clone());
        let alice = Client::connect(&service, Some("alice"));
        let mut bob = Client::connect(&service, Some("bob"));

        service
            .handle_signal(alice.connection_id, call_request("bob", "ch5"))
            .await
            .unwrap();
        bob.events();

        let outcome = service
            .handle_signal(alice.connection_id, end("ch5", CallStatus::Answered, 7))
            .await
            .unwrap();

        assert_eq!(outcome, TransitionOutcome::Applied);
        assert_eq!(failing.attempts(), 1);
        assert_eq!(bob.signal_names(), vec!["call:ended", "call:history_updated"]);
        assert_eq!(service.calls().active_calls(), 0);
    }
}
