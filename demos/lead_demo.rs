//! Lead Demo: A lead actor driving two painting children.
//!
//! Two canvas actors paint at 120 Hz on worker threads and announce every
//! frame on the signal bus. The lead runs at 60 Hz on the main thread,
//! follows both frame signals and stops after three seconds, taking the
//! children down with it.
//!
//! Run with `RUST_LOG=debug` to see the full lifecycle.

use pacer::canvas::{canvas_actor, FRAME_SIGNAL};
use pacer::{
    Access, ActorConfig, Canvas, FrameId, Hooks, LeadActor, Primitive, Rect, Rgb, SignalBus,
    Surface, Value,
};
use std::error::Error;
use std::time::Duration;

const SIZE: u16 = 64;
const RUN_FOR: Duration = Duration::from_secs(3);

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Pacer Lead Demo");
    println!("===============");
    println!();

    let bus = SignalBus::new();
    let (lead_peer, lead_inbox) = bus.join("lead")?;

    // A bouncing square.
    let (canvas, square_frames) = Canvas::new(SIZE, SIZE, Rgb::BACKGROUND);
    let (peer, inbox) = bus.join("square")?;
    let square = canvas_actor(
        ActorConfig::high_frequency("square"),
        canvas,
        peer,
        inbox,
        |canvas, ctx| {
            let offset = u16::try_from(ctx.tick() % u64::from(SIZE - 8))?;
            let background = canvas.background();
            canvas.draw(&Primitive::Clear(background));
            canvas.draw(&Primitive::Rectangle {
                rect: Rect::new(offset, offset, 8, 8),
                fill: Some(Rgb::new(230, 120, 40)),
                outline: Some(Rgb::WHITE),
            });
            Ok(())
        },
    )?
    .start()?;

    // A growing ellipse.
    let (canvas, orbit_frames) = Canvas::new(SIZE, SIZE, Rgb::BACKGROUND);
    let (peer, inbox) = bus.join("orbit")?;
    let orbit = canvas_actor(
        ActorConfig::high_frequency("orbit"),
        canvas,
        peer,
        inbox,
        |canvas, ctx| {
            let radius = u16::try_from(ctx.tick() % u64::from(SIZE / 2))?;
            let origin = SIZE / 2 - radius;
            let background = canvas.background();
            canvas.draw(&Primitive::Clear(background));
            canvas.draw(&Primitive::Ellipse {
                rect: Rect::new(origin, origin, radius * 2, radius * 2),
                fill: None,
                outline: Some(Rgb::new(80, 200, 255)),
            });
            Ok(())
        },
    )?
    .start()?;

    for name in ["square", "orbit"] {
        lead_peer.register(name, FrameId::default(), Access::SIGNAL)?;
        lead_peer.subscribe(name, FRAME_SIGNAL, name)?;
    }

    let report_peer = lead_peer.clone();
    let hooks = Hooks::new()
        .on_update(move |ctx| {
            if ctx.elapsed() >= RUN_FOR {
                ctx.stop();
            }
            Ok(())
        })
        .on_draw(move |ctx| {
            if ctx.tick() % 60 != 0 {
                return Ok(());
            }
            let square = report_peer.get("square")?;
            let orbit = report_peer.get("orbit")?;
            let lit = |frame: Option<std::sync::Arc<pacer::canvas::Frame>>| {
                frame.map_or(0, |f| f.pixels().iter().filter(|p| **p != Rgb::BACKGROUND).count())
            };
            println!(
                "tick {:>4}: square {square} ({} lit), orbit {orbit} ({} lit)",
                ctx.tick(),
                lit(square_frames.latest()),
                lit(orbit_frames.latest()),
            );
            Ok(())
        });

    let lead = LeadActor::new(ActorConfig::lead("lead"), hooks, lead_inbox)?;
    lead.add_child(square)?;
    lead.add_child(orbit)?;

    let reason = lead.start()?;
    println!();
    println!("Lead exited: {reason}");

    if let Value::Frame(last) = lead_peer.get("square")? {
        println!("Last square frame seen: {last}");
    }
    println!("Peers left on the bus: {:?}", bus.peers());

    Ok(())
}
