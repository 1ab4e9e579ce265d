//! # Signaling Benchmarks
//!
//! Hot paths of the signaling core:
//!
//! | Path | Operation |
//! |------|-----------|
//! | Registry | register + unregister across many users |
//! | Fanout | emit to a multi-device user, broadcast to all transports |
//! | Call table | open + remove-once take |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rt_signaling::{
    CallKind, CallRecord, CallTable, ConnectionId, ConnectionRegistry, EventFanout, ServerEvent,
};
use std::sync::Arc;

fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");

    for users in [100usize, 1_000, 10_000] {
        let ids: Vec<String> = (0..users).map(|i| format!("user-{i}")).collect();
        group.throughput(Throughput::Elements(users as u64));
        group.bench_with_input(BenchmarkId::new("register_unregister", users), &ids, |b, ids| {
            let registry = ConnectionRegistry::new();
            b.iter(|| {
                let connections: Vec<_> = ids
                    .iter()
                    .map(|id| {
                        let conn = ConnectionId::new();
                        registry.register(id, conn);
                        (id, conn)
                    })
                    .collect();
                for (id, conn) in &connections {
                    black_box(registry.unregister(id, conn));
                }
            })
        });
    }

    group.finish();
}

fn bench_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("fanout");

    for devices in [1usize, 4, 16] {
        let registry = Arc::new(ConnectionRegistry::new());
        let fanout = EventFanout::new(Arc::clone(&registry), 1_024);
        let mut mailboxes = Vec::new();
        for _ in 0..devices {
            let (conn, mailbox) = fanout.attach(Some("alice".into()));
            registry.register("alice", conn);
            mailboxes.push(mailbox);
        }
        let event = ServerEvent::UserTyping {
            sender_id: "bob".into(),
        };

        group.throughput(Throughput::Elements(devices as u64));
        group.bench_function(BenchmarkId::new("emit_to_user", devices), |b| {
            b.iter(|| {
                black_box(fanout.emit_to_user("alice", &event));
                for mailbox in &mut mailboxes {
                    mailbox.drain();
                }
            })
        });
    }

    let registry = Arc::new(ConnectionRegistry::new());
    let fanout = EventFanout::new(Arc::clone(&registry), 1_024);
    let mut mailboxes: Vec<_> = (0..500)
        .map(|i| {
            let user = format!("user-{i}");
            let (conn, mailbox) = fanout.attach(Some(user.clone()));
            registry.register(&user, conn);
            mailbox
        })
        .collect();
    let snapshot = ServerEvent::OnlineUsers(registry.online_user_ids());

    group.throughput(Throughput::Elements(500));
    group.bench_function("broadcast_presence_500", |b| {
        b.iter(|| {
            black_box(fanout.broadcast(&snapshot));
            for mailbox in &mut mailboxes {
                mailbox.drain();
            }
        })
    });

    group.finish();
}

fn bench_call_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("call_table");
    let table = CallTable::new();
    let mut round = 0u64;

    group.bench_function("open_take", |b| {
        b.iter(|| {
            round += 1;
            let channel = format!("ch-{round}");
            let record = CallRecord::ringing(channel.clone(), "alice", "bob", CallKind::Audio, round);
            table.open(record).ok();
            black_box(table.take_for_party(&channel, "bob"));
        })
    });

    group.finish();
}

criterion_group!(benches, bench_registry, bench_fanout, bench_call_table);
criterion_main!(benches);
