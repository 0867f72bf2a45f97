// SPDX-License-Identifier: MPL-2.0

//! Timer-driven frame player.
//!
//! [`FramePlayer`] owns the GPU copies of an [`AnimatedImage`], an
//! intermediate render target that accumulates frames, and the surface that
//! is handed to the window. Frames are drawn onto the render target with
//! source-over blending and the render target is cleared only when playback
//! wraps back to the first frame.

use std::{
    io::Read,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use tracing::{debug, error, info};

use super::{
    DecodeError, decoder,
    types::AnimatedImage,
};
use crate::{
    dispatch::{DispatchQueue, FrameTimer},
    error::{Error, Result},
    geometry::{Region, Size},
    gpu::{DrawContext, GraphicsDevice, OPAQUE_BLACK},
};

/// Called on the UI thread after a tick presented a new frame.
pub type FrameListener = Arc<dyn Fn(usize) + Send + Sync>;

/// Position of playback within the loaded animation.
#[cfg(test)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorState {
    pub index: usize,
    pub frame_count: usize,
    pub interval: Duration,
}

struct PlaybackCursor {
    index: usize,
    interval: Duration,
    timer: Box<dyn FrameTimer>,
}

struct Playback<T> {
    image: Arc<AnimatedImage>,
    frames: Vec<T>,
    render_target: T,
    surface: T,
    cursor: PlaybackCursor,
    generation: u64,
}

impl<T> Playback<T> {
    /// Draw the next frame and re-arm the timer with its interval.
    fn advance<G>(&mut self, device: &G) -> Result<usize>
    where
        G: GraphicsDevice<Texture = T>,
    {
        let next = (self.cursor.index + 1) % self.frames.len();
        let frame = &self.image.frames()[next];
        let canvas = Region::full(self.image.size());

        device.context().with(|ctx| {
            if next == 0 {
                ctx.clear(&self.render_target, OPAQUE_BLACK)?;
            }
            ctx.draw_image(&self.render_target, &self.frames[next], frame.origin)?;
            ctx.copy_region(&self.surface, (0, 0), &self.render_target, canvas)
        })?;

        self.cursor.index = next;
        self.cursor.interval = frame.interval();
        self.cursor.timer.set_interval(self.cursor.interval);
        self.cursor.timer.start();
        Ok(next)
    }
}

struct Inner<G: GraphicsDevice> {
    device: Arc<G>,
    queue: Arc<dyn DispatchQueue>,
    playback: Mutex<Option<Playback<G::Texture>>>,
    generation: AtomicU64,
    listener: Mutex<Option<FrameListener>>,
}

impl<G: GraphicsDevice> Inner<G> {
    fn playback(&self) -> MutexGuard<'_, Option<Playback<G::Texture>>> {
        self.playback.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance playback. With `expected` set, ticks belonging to a replaced
    /// animation are dropped.
    fn tick(&self, expected: Option<u64>) -> Result<Option<usize>> {
        let index = {
            let mut playback = self.playback();
            let Some(playback) = playback.as_mut() else {
                return Ok(None);
            };
            if expected.is_some_and(|generation| generation != playback.generation) {
                debug!(
                    stale = expected,
                    current = playback.generation,
                    "ignoring tick from a replaced animation"
                );
                return Ok(None);
            }
            playback.advance(&*self.device)?
        };

        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(listener) = listener {
            listener(index);
        }
        Ok(Some(index))
    }
}

/// Plays an [`AnimatedImage`] into a surface on a graphics device.
///
/// Cloning yields another handle to the same player.
pub struct FramePlayer<G: GraphicsDevice> {
    inner: Arc<Inner<G>>,
}

impl<G: GraphicsDevice> Clone for FramePlayer<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: GraphicsDevice> FramePlayer<G> {
    pub fn new(device: Arc<G>, queue: Arc<dyn DispatchQueue>) -> Self {
        Self {
            inner: Arc::new(Inner {
                device,
                queue,
                playback: Mutex::new(None),
                generation: AtomicU64::new(0),
                listener: Mutex::new(None),
            }),
        }
    }

    pub fn set_frame_listener(&self, listener: impl Fn(usize) + Send + Sync + 'static) {
        *self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(listener));
    }

    /// Replace the current animation.
    ///
    /// All GPU resources for the new animation are created and the first
    /// frame is presented before the old state is swapped out, so a failure
    /// leaves the previous animation untouched and a concurrent tick sees
    /// either the old animation or the new one. The new timer is armed with
    /// the first frame's interval but not started.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::WrongThread`] off the UI thread, or if the device
    /// cannot create or draw the textures.
    pub fn load(&self, image: AnimatedImage) -> Result<()> {
        if !self.inner.queue.has_thread_access() {
            return Err(Error::WrongThread("FramePlayer::load"));
        }

        let device = &*self.inner.device;
        let image = Arc::new(image);
        let size = image.size();
        let first = image.frames().first().ok_or(DecodeError::NoFrames)?;

        let frames = image
            .frames()
            .iter()
            .map(|frame| device.create_texture(frame.size, Some(&frame.pixels)))
            .collect::<Result<Vec<_>, _>>()?;
        let render_target = device.create_texture(size, None)?;
        let surface = device.create_texture(size, None)?;

        device.context().with(|ctx| {
            ctx.clear(&render_target, OPAQUE_BLACK)?;
            ctx.draw_image(&render_target, &frames[0], first.origin)?;
            ctx.copy_region(&surface, (0, 0), &render_target, Region::full(size))
        })?;

        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let interval = first.interval();
        let mut timer = self.inner.queue.create_timer(Arc::new(tick_callback(
            Arc::downgrade(&self.inner),
            generation,
        )));
        timer.set_interval(interval);

        let playback = Playback {
            image: Arc::clone(&image),
            frames,
            render_target,
            surface,
            cursor: PlaybackCursor {
                index: 0,
                interval,
                timer,
            },
            generation,
        };

        let previous = self.inner.playback().replace(playback);
        if let Some(mut previous) = previous {
            previous.cursor.timer.stop();
        }

        info!(
            width = size.width,
            height = size.height,
            frames = image.frame_count(),
            generation,
            "loaded animation"
        );
        Ok(())
    }

    /// Decode `reader` on the thread pool, then [`load`](Self::load) the result
    /// on the UI thread and report the outcome to `done` there.
    ///
    /// # Errors
    ///
    /// Fails immediately with [`Error::WrongThread`] off the UI thread.
    pub fn load_async<R>(
        &self,
        reader: R,
        done: impl FnOnce(Result<()>) + Send + 'static,
    ) -> Result<()>
    where
        R: Read + Send + 'static,
    {
        if !self.inner.queue.has_thread_access() {
            return Err(Error::WrongThread("FramePlayer::load_async"));
        }

        let player = self.clone();
        rayon::spawn(move || {
            let start = Instant::now();
            let decoded = decoder::decode(reader);
            debug!(elapsed = ?start.elapsed(), ok = decoded.is_ok(), "decode finished");

            let queue = Arc::clone(&player.inner.queue);
            let enqueued = queue.enqueue(Box::new(move || {
                let result = decoded
                    .map_err(Error::from)
                    .and_then(|image| player.load(image));
                done(result);
            }));
            if !enqueued {
                error!("event loop closed before the animation finished loading");
            }
        });
        Ok(())
    }

    /// Advance to the next frame regardless of which timer asked for it.
    pub fn tick(&self) -> Result<Option<usize>> {
        self.inner.tick(None)
    }

    /// Start or resume playback.
    pub fn play(&self) -> Result<()> {
        let mut playback = self.inner.playback();
        let playback = playback.as_mut().ok_or(Error::NotLoaded)?;
        if !playback.cursor.timer.is_running() {
            playback.cursor.timer.start();
        }
        Ok(())
    }

    pub fn stop(&self) {
        if let Some(playback) = self.inner.playback().as_mut() {
            playback.cursor.timer.stop();
        }
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.inner
            .playback()
            .as_ref()
            .is_some_and(|playback| playback.cursor.timer.is_running())
    }

    /// Logical canvas size of the loaded animation.
    #[must_use]
    pub fn size(&self) -> Option<Size> {
        self.inner.playback().as_ref().map(|p| p.image.size())
    }

    /// The surface holding the most recently presented frame.
    #[must_use]
    pub fn surface(&self) -> Option<G::Texture> {
        self.inner.playback().as_ref().map(|p| p.surface.clone())
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self) -> Option<CursorState> {
        self.inner.playback().as_ref().map(|p| CursorState {
            index: p.cursor.index,
            frame_count: p.frames.len(),
            interval: p.cursor.interval,
        })
    }

    /// Frame count and surface pixels read under one lock.
    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> Option<(usize, Vec<u8>)> {
        let playback = self.inner.playback();
        let playback = playback.as_ref()?;
        let pixels = self
            .inner
            .device
            .context()
            .with(|ctx| ctx.read_pixels(&playback.surface))
            .ok()?;
        Some((playback.frames.len(), pixels))
    }
}

fn tick_callback<G: GraphicsDevice>(
    inner: Weak<Inner<G>>,
    generation: u64,
) -> impl Fn() + Send + Sync + 'static {
    move || {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        if let Err(why) = inner.tick(Some(generation)) {
            error!(?why, "failed to present animation frame");
        }
    }
}
