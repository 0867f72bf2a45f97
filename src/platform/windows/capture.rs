// SPDX-License-Identifier: MPL-2.0

use std::sync::Arc;

use windows::{Foundation::Metadata::ApiInformation, core::h};

use crate::{
    capture::{
        CaptureBackend, CaptureError, CaptureProvider, CaptureSource, PlatformCapabilities,
        duplication::DuplicationSource, graphics_capture::GraphicsCaptureSource,
    },
    gpu::d3d11::D3D11Device,
};

/// Whether this system lets a graphics capture session run without the
/// yellow border.
pub struct WindowsCapabilities;

impl PlatformCapabilities for WindowsCapabilities {
    fn borderless_capture_supported(&self) -> bool {
        ApiInformation::IsPropertyPresent(
            h!("Windows.Graphics.Capture.GraphicsCaptureSession"),
            h!("IsBorderRequired"),
        )
        .unwrap_or_else(|why| {
            tracing::warn!(?why, "failed to query graphics capture capabilities");
            false
        })
    }
}

pub struct WindowsCaptureProvider {
    pub device: Arc<D3D11Device>,
    pub hide_border: bool,
}

impl CaptureProvider<D3D11Device> for WindowsCaptureProvider {
    fn create_source(
        &self,
        backend: CaptureBackend,
    ) -> Result<Box<dyn CaptureSource<D3D11Device>>, CaptureError> {
        Ok(match backend {
            CaptureBackend::GraphicsCapture => Box::new(GraphicsCaptureSource::new(
                Arc::clone(&self.device),
                self.hide_border,
            )?),
            CaptureBackend::DesktopDuplication => {
                Box::new(DuplicationSource::new(Arc::clone(&self.device))?)
            }
        })
    }
}
