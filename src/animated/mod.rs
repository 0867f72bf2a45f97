// SPDX-License-Identifier: MPL-2.0

//! Animated GIF support.
//!
//! The whole animation is decoded up front into premultiplied BGRA frames,
//! uploaded to the graphics device once, and then played back by a timer on
//! the UI thread.
//!
//! # Module Structure
//!
//! - [`types`]: Core types (DecodedFrame, AnimatedImage)
//! - [`decoder`]: GIF stream decoding
//! - [`detection`]: File type detection utilities
//! - [`player`]: Timer-driven frame player
//!
//! # Frame Timing
//!
//! GIF delays are stored in hundredths of a second. A frame with a zero
//! delay is shown for 100 ms, which is what browsers do as well.

mod decoder;
mod detection;
mod player;
mod types;

pub use decoder::{DecodeError, decode};
pub use detection::{GIF_EXTENSIONS, is_gif_file};
pub use player::FramePlayer;
pub use types::{AnimatedImage, DecodedFrame};

#[cfg(test)]
mod tests;
