// SPDX-License-Identifier: MPL-2.0

//! Primary-output screen capture.
//!
//! Two backends exist on Windows. The graphics capture API can hide the
//! yellow capture border on newer systems; desktop duplication works
//! everywhere but shows nothing on top. A fresh [`CaptureSource`] is created
//! for every capture so that display changes between cycles are picked up.

use visitor_gag_config::BackendPreference;

use crate::{
    geometry::Rect,
    gpu::{GpuError, GraphicsDevice},
};

#[cfg(windows)]
pub mod duplication;
#[cfg(windows)]
pub mod graphics_capture;
pub mod rendezvous;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureBackend {
    GraphicsCapture,
    DesktopDuplication,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no display output to capture")]
    NoOutput,
    #[error("capture pipeline closed before a frame arrived")]
    NoFrame,
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[cfg(windows)]
    #[error(transparent)]
    Windows(#[from] windows::core::Error),
}

/// What the running OS can do for screen capture.
pub trait PlatformCapabilities {
    /// Whether a graphics capture session can be told not to draw its border.
    fn borderless_capture_supported(&self) -> bool;
}

/// Pick a backend, honouring an explicit preference first.
pub fn select_backend(
    capabilities: &dyn PlatformCapabilities,
    preference: BackendPreference,
) -> CaptureBackend {
    match preference {
        BackendPreference::GraphicsCapture => CaptureBackend::GraphicsCapture,
        BackendPreference::Duplication => CaptureBackend::DesktopDuplication,
        BackendPreference::Automatic if capabilities.borderless_capture_supported() => {
            CaptureBackend::GraphicsCapture
        }
        BackendPreference::Automatic => CaptureBackend::DesktopDuplication,
    }
}

/// One capture of the primary output.
pub trait CaptureSource<G: GraphicsDevice> {
    /// Desktop rectangle of the captured output.
    fn bounds(&self) -> Rect;

    /// Block until a frame is available and return a copy owned by the caller.
    /// Its pixel (0, 0) corresponds to the top left corner of [`bounds`](Self::bounds).
    fn capture(&mut self) -> Result<G::Texture, CaptureError>;
}

/// Builds capture sources for a device.
pub trait CaptureProvider<G: GraphicsDevice> {
    fn create_source(
        &self,
        backend: CaptureBackend,
    ) -> Result<Box<dyn CaptureSource<G>>, CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Caps(bool);

    impl PlatformCapabilities for Caps {
        fn borderless_capture_supported(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn automatic_selection_follows_capabilities() {
        assert_eq!(
            select_backend(&Caps(true), BackendPreference::Automatic),
            CaptureBackend::GraphicsCapture
        );
        assert_eq!(
            select_backend(&Caps(false), BackendPreference::Automatic),
            CaptureBackend::DesktopDuplication
        );
    }

    #[test]
    fn forced_backends_win() {
        for caps in [Caps(true), Caps(false)] {
            assert_eq!(
                select_backend(&caps, BackendPreference::GraphicsCapture),
                CaptureBackend::GraphicsCapture
            );
            assert_eq!(
                select_backend(&caps, BackendPreference::Duplication),
                CaptureBackend::DesktopDuplication
            );
        }
    }
}
