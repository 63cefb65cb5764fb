use criterion::{criterion_group, criterion_main, Criterion};
use rally_channel::{listener, room_update_listener, Frame, ListenerRegistry};
use serde_json::{json, Value};
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A full room with 8 waiting members and 3 groups of 4.
fn room_payload() -> Value {
    let member = |id: u64| {
        json!({"memberId": id, "name": format!("Player {id}"), "level": "중급자", "status": "WAITING"})
    };
    json!({
        "id": 42,
        "name": "Tuesday club",
        "enterMebmerList": (0..8).map(member).collect::<Vec<_>>(),
        "groupList": (0..3u64).map(|g| json!({
            "id": g,
            "courtNumber": g + 1,
            "memberList": (g * 4 + 100..g * 4 + 104).map(member).collect::<Vec<_>>(),
            "status": "PLAYING",
        })).collect::<Vec<_>>(),
    })
}

fn bench_frame_encode(c: &mut Criterion) {
    let frame = Frame::room_update(room_payload());

    c.bench_function("frame_encode_room_update", |b| {
        b.iter(|| black_box(black_box(&frame).encode().unwrap()))
    });
}

fn bench_frame_decode(c: &mut Criterion) {
    let text = Frame::room_update(room_payload()).encode().unwrap();

    c.bench_function("frame_decode_room_update", |b| {
        b.iter(|| black_box(Frame::decode(black_box(&text)).unwrap()))
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut registry = ListenerRegistry::new();
    for _ in 0..10 {
        let hits = hits.clone();
        registry.add(
            "roomUpdate",
            listener(move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
            }),
        );
    }
    let payload = room_payload();

    c.bench_function("dispatch_10_listeners", |b| {
        b.iter(|| {
            for l in registry.snapshot(black_box("roomUpdate")) {
                l(&payload);
            }
        })
    });
}

fn bench_typed_dispatch(c: &mut Criterion) {
    let mut registry = ListenerRegistry::new();
    registry.add(
        "roomUpdate",
        room_update_listener(|update| {
            black_box(update);
        }),
    );
    let payload = room_payload();

    c.bench_function("dispatch_decoded_room_update", |b| {
        b.iter(|| {
            for l in registry.snapshot("roomUpdate") {
                l(black_box(&payload));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_frame_encode,
    bench_frame_decode,
    bench_dispatch,
    bench_typed_dispatch,
);
criterion_main!(benches);
