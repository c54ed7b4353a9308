//! Canvas: in-memory drawing surfaces and the actor preset that drives
//! them.
//!
//! This module contains:
//! - [`Canvas`]: a pixel grid implementing [`Surface`]
//! - [`Primitive`]: shapes that can be drawn
//! - [`Frame`] / [`FrameReceiver`]: presented snapshots and their consumer
//! - [`canvas_actor`]: a worker that paints, presents and announces frames

mod color;
mod rect;
mod surface;

pub use color::Rgb;
pub use rect::Rect;
pub use surface::{Canvas, Frame, FrameId, FrameReceiver, Primitive, Surface};

use crate::actor::{Actor, ActorConfig, Hooks, TickContext};
use crate::error::{ActorError, HookResult};
use crate::signal::{Access, Peer, PeerInbox};

/// Signal on which a canvas actor announces each presented frame.
pub const FRAME_SIGNAL: &str = "frame";

/// Build an actor that paints `canvas` on every tick.
///
/// Setup registers [`FRAME_SIGNAL`] on `peer` as a readable emitter. Each
/// draw phase calls `paint`, presents the canvas and emits the new frame
/// id, so subscribers learn about the frame on their next poll. The
/// actor polls `inbox` as its transport.
///
/// [`ActorConfig::high_frequency`] is the usual config.
pub fn canvas_actor<F>(
    config: ActorConfig,
    mut canvas: Canvas,
    peer: Peer,
    inbox: PeerInbox,
    mut paint: F,
) -> Result<Actor, ActorError>
where
    F: FnMut(&mut Canvas, &TickContext<'_>) -> HookResult + Send + 'static,
{
    let setup_peer = peer.clone();
    let hooks = Hooks::new()
        .on_setup(move || {
            setup_peer.register(FRAME_SIGNAL, FrameId::default(), Access::READ | Access::EMIT)?;
            Ok(())
        })
        .on_draw(move |ctx| {
            paint(&mut canvas, ctx)?;
            let id = canvas.present();
            peer.emit(FRAME_SIGNAL, id)?;
            Ok(())
        });

    Actor::new(config, hooks, inbox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ExitReason;
    use crate::signal::{SignalBus, Value};
    use crate::transport::Transport;
    use std::time::Duration;

    #[test]
    fn test_canvas_actor_presents_and_announces() {
        let bus = SignalBus::new();
        let (painter_peer, painter_inbox) = bus.join("painter").unwrap();
        let (lead_peer, mut lead_inbox) = bus.join("lead").unwrap();

        let (canvas, frames) = Canvas::new(32, 32, Rgb::BACKGROUND);
        let actor = canvas_actor(
            ActorConfig::high_frequency("painter"),
            canvas,
            painter_peer,
            painter_inbox,
            |canvas, ctx| {
                let x = u16::try_from(ctx.tick() % 32)?;
                canvas.draw(&Primitive::Point { x, y: 0, color: Rgb::WHITE });
                Ok(())
            },
        )
        .unwrap();

        lead_peer.register("latest", FrameId::default(), Access::SIGNAL).unwrap();
        assert!(lead_peer.subscribe("painter", FRAME_SIGNAL, "latest").is_err());

        // Setup runs before start returns, so the frame signal exists now.
        let handle = actor.start().unwrap();
        lead_peer.subscribe("painter", FRAME_SIGNAL, "latest").unwrap();

        let frame = frames.recv_timeout(Duration::from_secs(2)).expect("a frame");
        assert_eq!(frame.width(), 32);
        assert!(frame.pixels().iter().any(|p| *p == Rgb::WHITE));

        let mut announced = None;
        for _ in 0..100 {
            lead_inbox.poll(Duration::from_millis(20)).unwrap();
            if let Value::Frame(id) = lead_peer.get("latest").unwrap() {
                if id > FrameId::default() {
                    announced = Some(id);
                    break;
                }
            }
        }
        assert!(announced.is_some());

        assert_eq!(handle.shutdown(Duration::from_secs(2)).unwrap(), ExitReason::Stopped);
        assert_eq!(bus.peers(), vec!["lead".to_string()]);
    }
}
