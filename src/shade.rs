// SPDX-License-Identifier: MPL-2.0

//! The shade: a copy of the screen under the window, split into two panels
//! that slide apart to reveal the animation and back together to hide it.
//!
//! Panel offsets are relative to the window width. At rest the left panel
//! sits at 0.0 and the right one at 0.5, each covering half of the window
//! and showing its half of the captured image. Revealing moves them to
//! -0.5 and 1.0, i.e. fully outside the window.

use std::time::{Duration, Instant};

use crate::{
    error::Result,
    geometry::{Region, Size},
    gpu::{DrawContext, GpuError, GraphicsDevice},
};

/// Where the shade image is drawn relative to a panel's top left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushOffset {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Panel {
    /// Horizontal offset as a fraction of the window width.
    pub relative_offset_x: f32,
    pub brush: BrushOffset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadePanels {
    pub left: Panel,
    pub right: Panel,
}

impl ShadePanels {
    /// Panels at rest for a window of `footprint`, together showing the whole shade.
    #[must_use]
    pub fn at_rest(footprint: Size) -> Self {
        Self {
            left: Panel {
                relative_offset_x: 0.0,
                brush: BrushOffset { x: 0.0, y: 0.0 },
            },
            right: Panel {
                relative_offset_x: 0.5,
                brush: BrushOffset {
                    x: -(footprint.width as f32 / 2.0),
                    y: 0.0,
                },
            },
        }
    }

    pub fn set_offsets(&mut self, left: f32, right: f32) {
        self.left.relative_offset_x = left;
        self.right.relative_offset_x = right;
    }
}

impl Default for ShadePanels {
    fn default() -> Self {
        Self::at_rest(Size::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipeDirection {
    /// Panels slide out of the window.
    Reveal,
    /// Panels slide back over the animation.
    Conceal,
}

impl WipeDirection {
    /// `(from, to)` offsets of the left and right panel.
    #[must_use]
    pub const fn keyframes(self) -> [(f32, f32); 2] {
        match self {
            Self::Reveal => [(0.0, -0.5), (0.5, 1.0)],
            Self::Conceal => [(-0.5, 0.0), (1.0, 0.5)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WipeSample {
    pub left: f32,
    pub right: f32,
    pub finished: bool,
}

/// A linear wipe of both panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wipe {
    direction: WipeDirection,
    started: Instant,
    duration: Duration,
}

impl Wipe {
    pub fn new(direction: WipeDirection, now: Instant, duration: Duration) -> Self {
        Self {
            direction,
            started: now,
            duration,
        }
    }

    #[must_use]
    pub fn direction(&self) -> WipeDirection {
        self.direction
    }

    fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    #[must_use]
    pub fn sample(&self, now: Instant) -> WipeSample {
        let t = self.progress(now);
        let lerp = |(from, to): (f32, f32)| from + (to - from) * t;
        let [left, right] = self.direction.keyframes();
        WipeSample {
            left: lerp(left),
            right: lerp(right),
            finished: t >= 1.0,
        }
    }

    /// The wipe in the other direction, starting from where this one is at `now`.
    #[must_use]
    pub fn reversed(&self, now: Instant) -> Self {
        let direction = match self.direction {
            WipeDirection::Reveal => WipeDirection::Conceal,
            WipeDirection::Conceal => WipeDirection::Reveal,
        };
        let remaining = self.duration.mul_f32(1.0 - self.progress(now));
        Self {
            direction,
            started: now.checked_sub(remaining).unwrap_or(now),
            duration: self.duration,
        }
    }
}

/// Texture holding the captured screen region, sized to the window.
pub struct ShadeSurface<T> {
    texture: Option<T>,
    size: Size,
}

impl<T: Clone> Default for ShadeSurface<T> {
    fn default() -> Self {
        Self {
            texture: None,
            size: Size::default(),
        }
    }
}

impl<T: Clone> ShadeSurface<T> {
    #[must_use]
    pub fn texture(&self) -> Option<&T> {
        self.texture.as_ref()
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    /// Make the surface exactly `size`, reallocating only when it changes.
    pub fn resize<G>(&mut self, device: &G, size: Size) -> Result<()>
    where
        G: GraphicsDevice<Texture = T>,
    {
        if self.texture.is_none() || self.size != size {
            self.texture = Some(device.create_texture(size, None)?);
            self.size = size;
        }
        Ok(())
    }

    /// Replace the shade with `staging`, which must match the surface size.
    pub fn update<G>(&mut self, device: &G, staging: &T) -> Result<()>
    where
        G: GraphicsDevice<Texture = T>,
    {
        if self.texture.is_none() {
            self.resize(device, device.texture_size(staging))?;
        }
        let texture = self
            .texture
            .as_ref()
            .ok_or(GpuError::Missing("shade surface"))?;
        device
            .context()
            .with(|ctx| ctx.copy_region(texture, (0, 0), staging, Region::full(self.size)))?;
        Ok(())
    }
}
