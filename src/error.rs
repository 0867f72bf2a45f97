// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use crate::{
    animated::DecodeError,
    capture::CaptureError,
    geometry::{Rect, Size},
    gpu::GpuError,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode animation")]
    Decode(#[from] DecodeError),
    #[error("graphics device failure")]
    Gpu(#[from] GpuError),
    #[error("screen capture failed")]
    Capture(#[from] CaptureError),
    #[error("{0} must be called on the thread that owns the dispatch queue")]
    WrongThread(&'static str),
    #[error("animation of {}x{} does not fit on an output of {}x{}", footprint.width, footprint.height, bounds.width(), bounds.height())]
    FootprintTooLarge { footprint: Size, bounds: Rect },
    #[error("no animation is loaded")]
    NotLoaded,
    #[error("event loop failure")]
    EventLoop(#[from] calloop::Error),
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

impl<T> From<calloop::InsertError<T>> for Error {
    fn from(err: calloop::InsertError<T>) -> Self {
        Self::EventLoop(err.error)
    }
}
