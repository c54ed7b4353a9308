//! Tick benchmark: Measure per-tick overhead of the loop machinery.
//!
//! Target: clock math well under 100ns, an empty tick well under 1µs

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pacer::{
    Access, Actor, ActorConfig, Canvas, Hooks, NullTransport, Primitive, Rgb, SignalBus, Surface,
    TickClock,
};
use std::time::{Duration, Instant};

fn clock_math(c: &mut Criterion) {
    let clock = TickClock::from_frequency(60);
    let start = Instant::now();
    let deadline = clock.next_deadline(start);
    let late = deadline + Duration::from_millis(40);

    c.bench_function("clock_remaining", |b| {
        b.iter(|| clock.remaining(black_box(deadline), black_box(start)))
    });

    c.bench_function("clock_advance_on_time", |b| {
        b.iter(|| clock.advance(black_box(deadline), black_box(start)))
    });

    c.bench_function("clock_advance_late", |b| {
        b.iter(|| clock.advance(black_box(deadline), black_box(late)))
    });
}

fn empty_ticks(c: &mut Criterion) {
    // No sleep between ticks at this rate, so this measures loop overhead.
    c.bench_function("run_1000_empty_ticks", |b| {
        b.iter(|| {
            let hooks = Hooks::new().on_update(|ctx| {
                if ctx.tick() == 999 {
                    ctx.stop();
                }
                Ok(())
            });
            let config = ActorConfig::standalone("bench").with_interval(Duration::from_nanos(1));
            let handle = Actor::new(config, hooks, NullTransport)
                .and_then(Actor::start)
                .expect("bench actor");
            black_box(handle.stats().ticks)
        })
    });
}

fn signal_emit(c: &mut Criterion) {
    let bus = SignalBus::new();
    let (emitter, _emitter_inbox) = bus.join("emitter").expect("join");
    let (listener, _listener_inbox) = bus.join("listener").expect("join");
    emitter.register("level", 0_i64, Access::READ | Access::EMIT).expect("register");
    listener.register("level", 0_i64, Access::SIGNAL).expect("register");
    listener.subscribe("emitter", "level", "level").expect("subscribe");

    // The listener inbox is never polled, so emissions past its capacity
    // are dropped and the measured path stays the same.
    c.bench_function("signal_emit_one_subscriber", |b| {
        b.iter(|| emitter.emit("level", black_box(42_i64)))
    });

    c.bench_function("signal_read", |b| {
        b.iter(|| listener.read("emitter", black_box("level")))
    });
}

fn canvas_draw(c: &mut Criterion) {
    let (mut canvas, _frames) = Canvas::new(320, 240, Rgb::BACKGROUND);
    let line = Primitive::Line {
        from: (0, 0),
        to: (319, 239),
        color: Rgb::WHITE,
    };

    c.bench_function("canvas_line_diagonal", |b| {
        b.iter(|| canvas.draw(black_box(&line)))
    });

    c.bench_function("canvas_present_320x240", |b| b.iter(|| canvas.present()));
}

criterion_group!(benches, clock_math, empty_ticks, signal_emit, canvas_draw);
criterion_main!(benches);
