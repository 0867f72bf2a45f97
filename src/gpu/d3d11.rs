// SPDX-License-Identifier: MPL-2.0

//! Direct3D 11 device with a Direct2D context for compositing.

use windows::{
    Win32::Graphics::{
        Direct2D::{
            Common::{D2D_POINT_2F, D2D1_ALPHA_MODE_PREMULTIPLIED, D2D1_COLOR_F, D2D1_PIXEL_FORMAT},
            D2D1_BITMAP_OPTIONS, D2D1_BITMAP_OPTIONS_CANNOT_DRAW, D2D1_BITMAP_OPTIONS_NONE,
            D2D1_BITMAP_OPTIONS_TARGET, D2D1_BITMAP_PROPERTIES1, D2D1_COMPOSITE_MODE_SOURCE_OVER,
            D2D1_DEBUG_LEVEL_INFORMATION, D2D1_DEBUG_LEVEL_NONE, D2D1_DEVICE_CONTEXT_OPTIONS_NONE,
            D2D1_FACTORY_OPTIONS, D2D1_FACTORY_TYPE_MULTI_THREADED,
            D2D1_INTERPOLATION_MODE_NEAREST_NEIGHBOR, D2D1CreateFactory, ID2D1Bitmap1,
            ID2D1DeviceContext, ID2D1Factory1,
        },
        Direct3D::D3D_DRIVER_TYPE_HARDWARE,
        Direct3D11::{
            D3D11_BIND_RENDER_TARGET, D3D11_BIND_SHADER_RESOURCE, D3D11_BOX,
            D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_CREATE_DEVICE_DEBUG,
            D3D11_MAP_READ, D3D11_MAPPED_SUBRESOURCE, D3D11_SDK_VERSION, D3D11_SUBRESOURCE_DATA,
            D3D11_TEXTURE2D_DESC, D3D11_USAGE_DEFAULT, D3D11_USAGE_STAGING, D3D11CreateDevice,
            ID3D11Device, ID3D11DeviceContext, ID3D11Multithread, ID3D11Texture2D,
        },
        Dxgi::{
            Common::{DXGI_FORMAT_B8G8R8A8_UNORM, DXGI_SAMPLE_DESC},
            IDXGIDevice, IDXGISurface,
        },
    },
    core::Interface,
};

use super::{Bgra, DeviceLock, DrawContext, GpuError, GraphicsDevice, check_copy, check_upload};
use crate::geometry::{Point, Region, Size};

#[derive(Clone, Debug)]
pub struct D3D11Texture(ID3D11Texture2D);

// SAFETY: D3D11 resources are free-threaded; every command touching them
// goes through the immediate context, which is guarded by the device lock.
unsafe impl Send for D3D11Texture {}
unsafe impl Sync for D3D11Texture {}

impl D3D11Texture {
    pub fn from_raw(texture: ID3D11Texture2D) -> Self {
        Self(texture)
    }

    pub fn raw(&self) -> &ID3D11Texture2D {
        &self.0
    }

    fn desc(&self) -> D3D11_TEXTURE2D_DESC {
        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { self.0.GetDesc(&mut desc) };
        desc
    }

    fn size(&self) -> Size {
        let desc = self.desc();
        Size::new(desc.Width, desc.Height)
    }
}

pub struct D3D11Device {
    device: ID3D11Device,
    context: DeviceLock<D3D11Context>,
}

// SAFETY: the device interface is free-threaded (multithread protection is
// switched on at creation) and the context is only reachable through its lock.
unsafe impl Send for D3D11Device {}
unsafe impl Sync for D3D11Device {}

impl D3D11Device {
    /// Create a hardware device with BGRA support and its Direct2D companion.
    pub fn new(debug_layer: bool) -> Result<Self, GpuError> {
        let mut flags = D3D11_CREATE_DEVICE_BGRA_SUPPORT;
        if debug_layer {
            flags |= D3D11_CREATE_DEVICE_DEBUG;
        }

        let mut device: Option<ID3D11Device> = None;
        let mut immediate: Option<ID3D11DeviceContext> = None;
        unsafe {
            D3D11CreateDevice(
                None,
                D3D_DRIVER_TYPE_HARDWARE,
                None,
                flags,
                None,
                D3D11_SDK_VERSION,
                Some(&mut device),
                None,
                Some(&mut immediate),
            )?;
        }
        let device = device.ok_or(GpuError::Missing("D3D11CreateDevice"))?;
        let immediate = immediate.ok_or(GpuError::Missing("D3D11CreateDevice"))?;

        let multithread: ID3D11Multithread = immediate.cast()?;
        unsafe {
            let _ = multithread.SetMultithreadProtected(true);
        }

        let options = D2D1_FACTORY_OPTIONS {
            debugLevel: if debug_layer {
                D2D1_DEBUG_LEVEL_INFORMATION
            } else {
                D2D1_DEBUG_LEVEL_NONE
            },
        };
        let d2d = unsafe {
            let factory: ID2D1Factory1 =
                D2D1CreateFactory(D2D1_FACTORY_TYPE_MULTI_THREADED, Some(&options))?;
            let dxgi_device: IDXGIDevice = device.cast()?;
            factory
                .CreateDevice(&dxgi_device)?
                .CreateDeviceContext(D2D1_DEVICE_CONTEXT_OPTIONS_NONE)?
        };

        tracing::info!(debug_layer, "created Direct3D 11 device");

        Ok(Self {
            device: device.clone(),
            context: DeviceLock::new(D3D11Context {
                device,
                immediate,
                d2d,
            }),
        })
    }

    pub fn raw(&self) -> &ID3D11Device {
        &self.device
    }
}

impl GraphicsDevice for D3D11Device {
    type Texture = D3D11Texture;
    type Context = D3D11Context;

    fn create_texture(&self, size: Size, pixels: Option<&[u8]>) -> Result<D3D11Texture, GpuError> {
        check_upload(size, pixels)?;

        let desc = D3D11_TEXTURE2D_DESC {
            Width: size.width,
            Height: size.height,
            MipLevels: 1,
            ArraySize: 1,
            Format: DXGI_FORMAT_B8G8R8A8_UNORM,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: (D3D11_BIND_RENDER_TARGET.0 | D3D11_BIND_SHADER_RESOURCE.0) as u32,
            CPUAccessFlags: 0,
            MiscFlags: 0,
        };
        let initial = pixels.map(|data| D3D11_SUBRESOURCE_DATA {
            pSysMem: data.as_ptr().cast(),
            SysMemPitch: size.width * 4,
            SysMemSlicePitch: 0,
        });

        let mut texture = None;
        unsafe {
            self.device.CreateTexture2D(
                &desc,
                initial.as_ref().map(|data| data as *const _),
                Some(&mut texture),
            )?;
        }
        texture
            .map(D3D11Texture)
            .ok_or(GpuError::Missing("CreateTexture2D"))
    }

    fn texture_size(&self, texture: &D3D11Texture) -> Size {
        texture.size()
    }

    fn context(&self) -> &DeviceLock<D3D11Context> {
        &self.context
    }
}

pub struct D3D11Context {
    device: ID3D11Device,
    immediate: ID3D11DeviceContext,
    d2d: ID2D1DeviceContext,
}

// SAFETY: only ever used while holding the device lock.
unsafe impl Send for D3D11Context {}

impl D3D11Context {
    fn bitmap(
        &self,
        texture: &D3D11Texture,
        options: D2D1_BITMAP_OPTIONS,
    ) -> Result<ID2D1Bitmap1, GpuError> {
        let properties = D2D1_BITMAP_PROPERTIES1 {
            pixelFormat: D2D1_PIXEL_FORMAT {
                format: DXGI_FORMAT_B8G8R8A8_UNORM,
                alphaMode: D2D1_ALPHA_MODE_PREMULTIPLIED,
            },
            dpiX: 96.0,
            dpiY: 96.0,
            bitmapOptions: options,
            colorContext: std::mem::ManuallyDrop::new(None),
        };
        let surface: IDXGISurface = texture.0.cast()?;
        Ok(unsafe { self.d2d.CreateBitmapFromDxgiSurface(&surface, Some(&properties))? })
    }

    fn draw_on(
        &mut self,
        target: &D3D11Texture,
        draw: impl FnOnce(&ID2D1DeviceContext) -> Result<(), GpuError>,
    ) -> Result<(), GpuError> {
        let bitmap = self.bitmap(
            target,
            D2D1_BITMAP_OPTIONS_TARGET | D2D1_BITMAP_OPTIONS_CANNOT_DRAW,
        )?;
        unsafe {
            self.d2d.SetTarget(&bitmap);
            self.d2d.BeginDraw();
        }
        let drawn = draw(&self.d2d);
        let ended = unsafe { self.d2d.EndDraw(None, None) };
        drawn?;
        Ok(ended?)
    }
}

impl DrawContext for D3D11Context {
    type Texture = D3D11Texture;

    fn clear(&mut self, target: &D3D11Texture, color: Bgra) -> Result<(), GpuError> {
        let [b, g, r, a] = color.map(|c| f32::from(c) / 255.0);
        self.draw_on(target, |d2d| {
            unsafe { d2d.Clear(Some(&D2D1_COLOR_F { r, g, b, a })) };
            Ok(())
        })
    }

    fn draw_image(
        &mut self,
        target: &D3D11Texture,
        source: &D3D11Texture,
        origin: Point,
    ) -> Result<(), GpuError> {
        if target.0 == source.0 {
            return Err(GpuError::SelfCopy);
        }
        let image = self.bitmap(source, D2D1_BITMAP_OPTIONS_NONE)?;
        let offset = D2D_POINT_2F {
            x: origin.x as f32,
            y: origin.y as f32,
        };
        self.draw_on(target, |d2d| {
            unsafe {
                d2d.DrawImage(
                    &image,
                    Some(&offset),
                    None,
                    D2D1_INTERPOLATION_MODE_NEAREST_NEIGHBOR,
                    D2D1_COMPOSITE_MODE_SOURCE_OVER,
                );
            }
            Ok(())
        })
    }

    fn copy_region(
        &mut self,
        target: &D3D11Texture,
        dest: (u32, u32),
        source: &D3D11Texture,
        region: Region,
    ) -> Result<(), GpuError> {
        if target.0 == source.0 {
            return Err(GpuError::SelfCopy);
        }
        check_copy(target.size(), dest, source.size(), region)?;

        let area = D3D11_BOX {
            left: region.x,
            top: region.y,
            front: 0,
            right: region.x + region.width,
            bottom: region.y + region.height,
            back: 1,
        };
        unsafe {
            self.immediate.CopySubresourceRegion(
                &target.0,
                0,
                dest.0,
                dest.1,
                0,
                &source.0,
                0,
                Some(&area),
            );
        }
        Ok(())
    }

    fn read_pixels(&mut self, texture: &D3D11Texture) -> Result<Vec<u8>, GpuError> {
        let mut desc = texture.desc();
        let size = Size::new(desc.Width, desc.Height);
        desc.Usage = D3D11_USAGE_STAGING;
        desc.BindFlags = 0;
        desc.CPUAccessFlags = D3D11_CPU_ACCESS_READ.0 as u32;
        desc.MiscFlags = 0;

        let mut staging: Option<ID3D11Texture2D> = None;
        unsafe { self.device.CreateTexture2D(&desc, None, Some(&mut staging))? };
        let staging = staging.ok_or(GpuError::Missing("CreateTexture2D"))?;

        let row = size.width as usize * 4;
        let mut pixels = Vec::with_capacity(size.byte_len());
        unsafe {
            self.immediate.CopyResource(&staging, &texture.0);
            let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
            self.immediate
                .Map(&staging, 0, D3D11_MAP_READ, 0, Some(&mut mapped))?;
            let base = mapped.pData as *const u8;
            for y in 0..size.height as usize {
                let line = std::slice::from_raw_parts(base.add(y * mapped.RowPitch as usize), row);
                pixels.extend_from_slice(line);
            }
            self.immediate.Unmap(&staging, 0);
        }
        Ok(pixels)
    }
}
