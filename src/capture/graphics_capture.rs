// SPDX-License-Identifier: MPL-2.0

//! Capture through Windows.Graphics.Capture.

use std::sync::Arc;

use windows::{
    Foundation::TypedEventHandler,
    Graphics::{
        Capture::{Direct3D11CaptureFramePool, GraphicsCaptureItem},
        DirectX::{Direct3D11::IDirect3DDevice, DirectXPixelFormat},
    },
    Win32::{
        Foundation::HWND,
        Graphics::{
            Direct3D11::ID3D11Texture2D,
            Dxgi::IDXGIDevice,
            Gdi::{GetMonitorInfoW, MONITOR_DEFAULTTOPRIMARY, MONITORINFO, MonitorFromWindow},
        },
        System::WinRT::{
            Direct3D11::{CreateDirect3D11DeviceFromDXGIDevice, IDirect3DDxgiInterfaceAccess},
            Graphics::Capture::IGraphicsCaptureItemInterop,
        },
    },
    core::{IInspectable, Interface, factory},
};

use super::{CaptureError, CaptureSource, rendezvous::one_shot};
use crate::{
    geometry::Rect,
    gpu::{
        d3d11::{D3D11Device, D3D11Texture},
        duplicate_texture,
    },
};

pub struct GraphicsCaptureSource {
    device: Arc<D3D11Device>,
    item: GraphicsCaptureItem,
    bounds: Rect,
    hide_border: bool,
}

impl GraphicsCaptureSource {
    /// Target the primary monitor. `hide_border` turns off the capture border,
    /// which only newer systems allow.
    pub fn new(device: Arc<D3D11Device>, hide_border: bool) -> Result<Self, CaptureError> {
        let monitor = unsafe { MonitorFromWindow(HWND::default(), MONITOR_DEFAULTTOPRIMARY) };
        if monitor.is_invalid() {
            return Err(CaptureError::NoOutput);
        }

        let mut info = MONITORINFO {
            cbSize: std::mem::size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        if !unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
            return Err(CaptureError::NoOutput);
        }
        let rc = info.rcMonitor;

        let interop = factory::<GraphicsCaptureItem, IGraphicsCaptureItemInterop>()?;
        let item: GraphicsCaptureItem = unsafe { interop.CreateForMonitor(monitor)? };

        Ok(Self {
            device,
            item,
            bounds: Rect::new(rc.left, rc.top, rc.right, rc.bottom),
            hide_border,
        })
    }
}

/// Take the next frame off `pool` and copy it into a texture of our own.
fn copy_next_frame(
    device: &D3D11Device,
    pool: &Direct3D11CaptureFramePool,
) -> Result<D3D11Texture, CaptureError> {
    let frame = pool.TryGetNextFrame()?;
    let copied = (|| -> Result<D3D11Texture, CaptureError> {
        let access: IDirect3DDxgiInterfaceAccess = frame.Surface()?.cast()?;
        let texture: ID3D11Texture2D = unsafe { access.GetInterface()? };
        Ok(duplicate_texture(device, &D3D11Texture::from_raw(texture))?)
    })();
    if let Err(why) = frame.Close() {
        tracing::warn!(?why, "failed to close capture frame");
    }
    copied
}

impl CaptureSource<D3D11Device> for GraphicsCaptureSource {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn capture(&mut self) -> Result<D3D11Texture, CaptureError> {
        let dxgi_device: IDXGIDevice = self.device.raw().cast()?;
        let winrt_device: IDirect3DDevice =
            unsafe { CreateDirect3D11DeviceFromDXGIDevice(&dxgi_device)? }.cast()?;

        let pool = Direct3D11CaptureFramePool::CreateFreeThreaded(
            &winrt_device,
            DirectXPixelFormat::B8G8R8A8UIntNormalized,
            1,
            self.item.Size()?,
        )?;

        let (publisher, waiter) = one_shot::<Result<D3D11Texture, CaptureError>>();
        let device = Arc::clone(&self.device);
        pool.FrameArrived(&TypedEventHandler::<Direct3D11CaptureFramePool, IInspectable>::new(
            move |pool, _| {
                let Some(pool) = pool.as_ref() else {
                    return Ok(());
                };
                if publisher.is_published() {
                    return Ok(());
                }
                publisher.publish(copy_next_frame(&device, pool));
                Ok(())
            },
        ))?;

        let session = pool.CreateCaptureSession(&self.item)?;
        session.SetIsCursorCaptureEnabled(false)?;
        if self.hide_border {
            session.SetIsBorderRequired(false)?;
        }
        session.StartCapture()?;

        let frame = waiter.wait();

        if let Err(why) = session.Close() {
            tracing::warn!(?why, "failed to close capture session");
        }
        if let Err(why) = pool.Close() {
            tracing::warn!(?why, "failed to close frame pool");
        }

        let texture = frame??;
        tracing::debug!(bounds = ?self.bounds, "captured primary output via graphics capture");
        Ok(texture)
    }
}
