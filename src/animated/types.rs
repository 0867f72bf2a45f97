// SPDX-License-Identifier: MPL-2.0

//! Core types for decoded animations.

use std::time::Duration;

use super::DecodeError;
use crate::geometry::{Point, Size};

/// Display time used when a frame declares a zero delay.
pub(crate) const FALLBACK_FRAME_DELAY: Duration = Duration::from_millis(100);

/// GIF delays are stored in hundredths of a second.
pub(crate) const DELAY_UNIT_MS: u64 = 10;

/// A single decoded frame. Pixels are premultiplied BGRA covering only the
/// frame's own rectangle within the canvas.
#[derive(Clone, Debug)]
pub struct DecodedFrame {
    pub pixels: Vec<u8>,
    pub origin: Point,
    pub size: Size,
    /// Delay as declared by the file; may be zero.
    pub delay: Duration,
}

impl DecodedFrame {
    /// How long this frame stays on screen once drawn.
    #[must_use]
    pub fn interval(&self) -> Duration {
        if self.delay.is_zero() {
            FALLBACK_FRAME_DELAY
        } else {
            self.delay
        }
    }
}

/// A fully decoded animation. Immutable after construction.
#[derive(Clone, Debug)]
pub struct AnimatedImage {
    size: Size,
    frames: Vec<DecodedFrame>,
}

impl AnimatedImage {
    /// Build an animation from its logical canvas size and frames.
    ///
    /// # Errors
    ///
    /// Fails if there are no frames, the canvas is empty, or a frame's pixel
    /// buffer does not match its rectangle.
    pub fn new(size: Size, frames: Vec<DecodedFrame>) -> Result<Self, DecodeError> {
        if frames.is_empty() {
            return Err(DecodeError::NoFrames);
        }
        if size.is_empty() {
            return Err(DecodeError::EmptyCanvas);
        }
        if let Some((index, frame)) = frames
            .iter()
            .enumerate()
            .find(|(_, frame)| frame.pixels.len() != frame.size.byte_len())
        {
            return Err(DecodeError::FrameLength {
                index,
                expected: frame.size.byte_len(),
                actual: frame.pixels.len(),
            });
        }

        Ok(Self { size, frames })
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    #[must_use]
    pub fn frames(&self) -> &[DecodedFrame] {
        &self.frames
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}
