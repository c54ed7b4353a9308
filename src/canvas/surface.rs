//! Canvas: an in-memory pixel surface that hands finished frames over a
//! channel.
//!
//! The drawing side owns the canvas. `present` snapshots the pixels into a
//! shared [`Frame`], pushes it to the [`FrameReceiver`] and clears the
//! canvas for the next tick. Frames are skipped rather than queued when
//! the receiver falls behind.

use super::{Rect, Rgb};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Frames buffered between a canvas and its receiver.
const FRAME_QUEUE: usize = 2;

/// Identifier of a presented frame. Monotonically increasing per canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FrameId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// An immutable snapshot of a canvas.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    id: FrameId,
    width: u16,
    height: u16,
    pixels: Vec<Rgb>,
}

impl Frame {
    /// Frame identifier.
    #[inline]
    pub const fn id(&self) -> FrameId {
        self.id
    }

    /// Frame width.
    #[inline]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Frame height.
    #[inline]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Pixel at (x, y), or `None` out of bounds.
    pub fn get(&self, x: u16, y: u16) -> Option<Rgb> {
        (x < self.width && y < self.height)
            .then(|| self.pixels[usize::from(y) * usize::from(self.width) + usize::from(x)])
    }

    /// All pixels in row-major order.
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({}, {}x{})", self.id, self.width, self.height)
    }
}

/// Receiving end of a canvas's presented frames.
#[derive(Debug, Clone)]
pub struct FrameReceiver {
    rx: Receiver<Arc<Frame>>,
}

impl FrameReceiver {
    /// The newest queued frame, discarding older ones.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.rx.try_iter().last()
    }

    /// Wait up to `timeout` for the next frame.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Arc<Frame>> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Some(frame),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// A drawing primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Fill the whole surface.
    Clear(Rgb),
    /// A single pixel.
    Point {
        /// X coordinate.
        x: u16,
        /// Y coordinate.
        y: u16,
        /// Colour.
        color: Rgb,
    },
    /// A straight line between two points, clipped to the surface.
    Line {
        /// Start point.
        from: (i32, i32),
        /// End point (inclusive).
        to: (i32, i32),
        /// Colour.
        color: Rgb,
    },
    /// An axis-aligned rectangle.
    Rectangle {
        /// Bounds.
        rect: Rect,
        /// Interior colour.
        fill: Option<Rgb>,
        /// Border colour.
        outline: Option<Rgb>,
    },
    /// An ellipse inscribed in `rect`.
    Ellipse {
        /// Bounding box.
        rect: Rect,
        /// Interior colour.
        fill: Option<Rgb>,
        /// Border colour.
        outline: Option<Rgb>,
    },
}

/// Something primitives can be drawn onto.
pub trait Surface {
    /// Draw one primitive.
    fn draw(&mut self, primitive: &Primitive);

    /// Publish the current contents and start a fresh frame.
    fn present(&mut self) -> FrameId;
}

/// In-memory pixel canvas.
pub struct Canvas {
    width: u16,
    height: u16,
    background: Rgb,
    pixels: Vec<Rgb>,
    next_id: u64,
    frames: Sender<Arc<Frame>>,
}

impl Canvas {
    /// Create a canvas filled with `background`, plus the receiver its
    /// frames go to.
    ///
    /// # Panics
    /// Panics if width or height is 0.
    pub fn new(width: u16, height: u16, background: Rgb) -> (Self, FrameReceiver) {
        assert!(width > 0 && height > 0, "Canvas dimensions must be non-zero");
        let (tx, rx) = bounded(FRAME_QUEUE);
        let canvas = Self {
            width,
            height,
            background,
            pixels: vec![background; usize::from(width) * usize::from(height)],
            next_id: 1,
            frames: tx,
        };
        (canvas, FrameReceiver { rx })
    }

    /// Canvas width.
    #[inline]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Canvas height.
    #[inline]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Background colour used by [`reset`](Self::reset).
    #[inline]
    pub const fn background(&self) -> Rgb {
        self.background
    }

    /// Change the background colour.
    pub fn set_background(&mut self, background: Rgb) {
        self.background = background;
    }

    /// Bounds of the canvas.
    #[inline]
    pub const fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    /// Pixel at (x, y), or `None` out of bounds.
    pub fn get(&self, x: u16, y: u16) -> Option<Rgb> {
        self.index_of(x, y).map(|i| self.pixels[i])
    }

    /// Fill the canvas with the background colour.
    pub fn reset(&mut self) {
        self.pixels.fill(self.background);
    }

    #[inline]
    fn index_of(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| usize::from(y) * usize::from(self.width) + usize::from(x))
    }

    #[inline]
    fn plot(&mut self, x: i64, y: i64, color: Rgb) {
        let (Ok(x), Ok(y)) = (u16::try_from(x), u16::try_from(y)) else {
            return;
        };
        if let Some(i) = self.index_of(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Clip a segment to the canvas (Liang-Barsky). `None` if it misses.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn clip_line(&self, from: (i32, i32), to: (i32, i32)) -> Option<((i64, i64), (i64, i64))> {
        let (x0, y0) = (i64::from(from.0), i64::from(from.1));
        let (dx, dy) = (i64::from(to.0) - x0, i64::from(to.1) - y0);
        let (max_x, max_y) = (i64::from(self.width) - 1, i64::from(self.height) - 1);

        let (mut enter, mut exit) = (0.0_f64, 1.0_f64);
        for (p, q) in [(-dx, x0), (dx, max_x - x0), (-dy, y0), (dy, max_y - y0)] {
            if p == 0 {
                if q < 0 {
                    return None;
                }
                continue;
            }
            let r = q as f64 / p as f64;
            if p < 0 {
                enter = enter.max(r);
            } else {
                exit = exit.min(r);
            }
            if enter > exit {
                return None;
            }
        }

        let at = |t: f64| {
            let x = (x0 as f64 + t * dx as f64).round() as i64;
            let y = (y0 as f64 + t * dy as f64).round() as i64;
            (x.clamp(0, max_x), y.clamp(0, max_y))
        };
        Some((at(enter), at(exit)))
    }

    fn line(&mut self, from: (i32, i32), to: (i32, i32), color: Rgb) {
        let Some(((mut x, mut y), end)) = self.clip_line(from, to) else {
            return;
        };
        // Bresenham, all octants, on the clipped segment.
        let dx = (end.0 - x).abs();
        let dy = -(end.1 - y).abs();
        let sx = if x < end.0 { 1 } else { -1 };
        let sy = if y < end.1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.plot(x, y, color);
            if (x, y) == end {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn rectangle(&mut self, rect: Rect, fill: Option<Rgb>, outline: Option<Rgb>) {
        let clipped = rect.intersection(&self.bounds());
        if clipped.is_empty() {
            return;
        }
        for y in clipped.y..clipped.bottom() {
            for x in clipped.x..clipped.right() {
                let edge = x == rect.x
                    || y == rect.y
                    || x + 1 == rect.right()
                    || y + 1 == rect.bottom();
                let color = if edge { outline.or(fill) } else { fill };
                if let Some(color) = color {
                    self.plot(i64::from(x), i64::from(y), color);
                }
            }
        }
    }

    fn ellipse(&mut self, rect: Rect, fill: Option<Rgb>, outline: Option<Rgb>) {
        if rect.is_empty() {
            return;
        }
        let rx = f64::from(rect.width) / 2.0;
        let ry = f64::from(rect.height) / 2.0;
        let cx = f64::from(rect.x) + rx;
        let cy = f64::from(rect.y) + ry;
        let inside = |x: i32, y: i32| {
            let nx = (f64::from(x) + 0.5 - cx) / rx;
            let ny = (f64::from(y) + 0.5 - cy) / ry;
            nx * nx + ny * ny <= 1.0
        };

        let clipped = rect.intersection(&self.bounds());
        for y in clipped.y..clipped.bottom() {
            for x in clipped.x..clipped.right() {
                let (x, y) = (i32::from(x), i32::from(y));
                if !inside(x, y) {
                    continue;
                }
                let edge = !inside(x - 1, y)
                    || !inside(x + 1, y)
                    || !inside(x, y - 1)
                    || !inside(x, y + 1);
                let color = if edge { outline.or(fill) } else { fill };
                if let Some(color) = color {
                    self.plot(i64::from(x), i64::from(y), color);
                }
            }
        }
    }
}

impl Surface for Canvas {
    fn draw(&mut self, primitive: &Primitive) {
        match *primitive {
            Primitive::Clear(color) => self.pixels.fill(color),
            Primitive::Point { x, y, color } => self.plot(i64::from(x), i64::from(y), color),
            Primitive::Line { from, to, color } => self.line(from, to, color),
            Primitive::Rectangle {
                rect,
                fill,
                outline,
            } => self.rectangle(rect, fill, outline),
            Primitive::Ellipse {
                rect,
                fill,
                outline,
            } => self.ellipse(rect, fill, outline),
        }
    }

    fn present(&mut self) -> FrameId {
        let id = FrameId(self.next_id);
        self.next_id += 1;

        let frame = Arc::new(Frame {
            id,
            width: self.width,
            height: self.height,
            pixels: self.pixels.clone(),
        });
        // Receiver too slow or gone: skip this frame rather than queue up.
        if let Err(TrySendError::Full(_)) = self.frames.try_send(frame) {
            log::trace!("canvas: dropped {id}, receiver is behind");
        }

        self.reset();
        id
    }
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("background", &self.background)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}
