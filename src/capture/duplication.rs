// SPDX-License-Identifier: MPL-2.0

//! Capture through DXGI desktop duplication.

use std::sync::Arc;

use windows::{
    Win32::{
        Graphics::{
            Direct3D11::ID3D11Texture2D,
            Dxgi::{
                DXGI_OUTDUPL_FRAME_INFO, IDXGIDevice, IDXGIOutput1, IDXGIOutputDuplication,
                IDXGIResource,
            },
        },
        System::Threading::INFINITE,
    },
    core::Interface,
};

use super::{CaptureError, CaptureSource};
use crate::{
    geometry::Rect,
    gpu::{
        d3d11::{D3D11Device, D3D11Texture},
        duplicate_texture,
    },
};

pub struct DuplicationSource {
    device: Arc<D3D11Device>,
    output: IDXGIOutput1,
    bounds: Rect,
}

impl DuplicationSource {
    /// Target the first output of the device's adapter.
    pub fn new(device: Arc<D3D11Device>) -> Result<Self, CaptureError> {
        let dxgi_device: IDXGIDevice = device.raw().cast()?;
        let (output, desc) = unsafe {
            let adapter = dxgi_device.GetAdapter()?;
            let output = adapter.EnumOutputs(0).map_err(|_| CaptureError::NoOutput)?;
            let desc = output.GetDesc()?;
            (output, desc)
        };
        let rc = desc.DesktopCoordinates;

        Ok(Self {
            device,
            output: output.cast()?,
            bounds: Rect::new(rc.left, rc.top, rc.right, rc.bottom),
        })
    }
}

/// A frame held by the duplication. Released when dropped.
struct AcquiredFrame<'a> {
    duplication: &'a IDXGIOutputDuplication,
    resource: IDXGIResource,
}

impl<'a> AcquiredFrame<'a> {
    fn acquire(duplication: &'a IDXGIOutputDuplication) -> Result<Self, CaptureError> {
        let mut info = DXGI_OUTDUPL_FRAME_INFO::default();
        let mut resource = None;
        unsafe { duplication.AcquireNextFrame(INFINITE, &mut info, &mut resource)? };
        let resource = resource.ok_or(CaptureError::NoFrame);
        match resource {
            Ok(resource) => Ok(Self {
                duplication,
                resource,
            }),
            Err(err) => {
                let _ = unsafe { duplication.ReleaseFrame() };
                Err(err)
            }
        }
    }
}

impl Drop for AcquiredFrame<'_> {
    fn drop(&mut self) {
        if let Err(why) = unsafe { self.duplication.ReleaseFrame() } {
            tracing::warn!(?why, "failed to release duplicated frame");
        }
    }
}

impl CaptureSource<D3D11Device> for DuplicationSource {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn capture(&mut self) -> Result<D3D11Texture, CaptureError> {
        let duplication = unsafe { self.output.DuplicateOutput(self.device.raw())? };

        // The first frame after creating a duplication is usually blank.
        drop(AcquiredFrame::acquire(&duplication)?);

        let frame = AcquiredFrame::acquire(&duplication)?;
        let texture: ID3D11Texture2D = frame.resource.cast()?;
        let copy = duplicate_texture(&*self.device, &D3D11Texture::from_raw(texture))?;
        drop(frame);

        tracing::debug!(bounds = ?self.bounds, "captured primary output via desktop duplication");
        Ok(copy)
    }
}
