// SPDX-License-Identifier: MPL-2.0

//! GIF decoding into premultiplied BGRA frames.

use std::{
    io::{self, Cursor, Read},
    time::Duration,
};

use gif::{ColorOutput, DecodeOptions};

use super::{
    detection::has_gif_signature,
    types::{AnimatedImage, DELAY_UNIT_MS, DecodedFrame},
};
use crate::geometry::{Point, Size};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to read animation data")]
    Io(#[from] io::Error),
    #[error("stream is not a GIF")]
    NotGif,
    #[error("malformed GIF stream")]
    Gif(#[from] gif::DecodingError),
    #[error("animation contains no frames")]
    NoFrames,
    #[error("animation canvas is empty")]
    EmptyCanvas,
    #[error("frame {index} holds {actual} bytes of pixel data, expected {expected}")]
    FrameLength {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

/// Decode every frame of a GIF stream.
///
/// Frames keep their own rectangle; compositing them onto the canvas is left
/// to the player. Delays are taken as written, zero included.
pub fn decode(mut reader: impl Read) -> Result<AnimatedImage, DecodeError> {
    let mut header = [0u8; 6];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Err(DecodeError::NotGif),
        Err(err) => return Err(err.into()),
    }
    if !has_gif_signature(&header) {
        return Err(DecodeError::NotGif);
    }

    let mut options = DecodeOptions::new();
    options.set_color_output(ColorOutput::RGBA);
    let mut decoder = options.read_info(Cursor::new(header).chain(reader))?;
    let canvas = Size::new(u32::from(decoder.width()), u32::from(decoder.height()));

    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame()? {
        let size = Size::new(u32::from(frame.width), u32::from(frame.height));
        let delay = Duration::from_millis(u64::from(frame.delay) * DELAY_UNIT_MS);
        tracing::trace!(
            index = frames.len(),
            left = frame.left,
            top = frame.top,
            width = frame.width,
            height = frame.height,
            ?delay,
            "decoded frame"
        );

        frames.push(DecodedFrame {
            pixels: premultiplied_bgra(&frame.buffer),
            origin: Point::new(i32::from(frame.left), i32::from(frame.top)),
            size,
            delay,
        });
    }

    let image = AnimatedImage::new(canvas, frames)?;
    tracing::debug!(
        width = canvas.width,
        height = canvas.height,
        frames = image.frame_count(),
        "decoded animation"
    );
    Ok(image)
}

/// Convert straight RGBA rows into premultiplied BGRA.
pub(crate) fn premultiplied_bgra(rgba: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rgba.len());
    for px in rgba.chunks_exact(4) {
        let alpha = u16::from(px[3]);
        let scale = |c: u8| ((u16::from(c) * alpha + 127) / 255) as u8;
        out.extend_from_slice(&[scale(px[2]), scale(px[1]), scale(px[0]), px[3]]);
    }
    out
}
