// SPDX-License-Identifier: MPL-2.0

//! CPU implementation of the graphics device.
//!
//! Textures are `image` buffers. The buffer type says `Rgba` but the bytes
//! are stored in BGRA order, matching the layout used everywhere else.

use std::{
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use image::{ImageBuffer, Rgba, imageops};

use super::{Bgra, DeviceLock, DrawContext, GpuError, GraphicsDevice, check_copy, check_upload};
use crate::geometry::{Point, Region, Size};

type Pixels = ImageBuffer<Rgba<u8>, Vec<u8>>;

#[derive(Clone, Debug)]
pub struct SoftwareTexture(Arc<RwLock<Pixels>>);

impl SoftwareTexture {
    fn read(&self) -> RwLockReadGuard<'_, Pixels> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Pixels> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn size(&self) -> Size {
        let (width, height) = self.read().dimensions();
        Size::new(width, height)
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

pub struct SoftwareDevice {
    context: DeviceLock<SoftwareContext>,
    upload_delay: Duration,
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareDevice {
    #[must_use]
    pub fn new() -> Self {
        Self {
            context: DeviceLock::new(SoftwareContext),
            upload_delay: Duration::ZERO,
        }
    }

    /// Make every initialised upload take at least `delay`, to widen race windows in tests.
    #[cfg(test)]
    #[must_use]
    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = delay;
        self
    }
}

impl GraphicsDevice for SoftwareDevice {
    type Texture = SoftwareTexture;
    type Context = SoftwareContext;

    fn create_texture(
        &self,
        size: Size,
        pixels: Option<&[u8]>,
    ) -> Result<SoftwareTexture, GpuError> {
        check_upload(size, pixels)?;

        let buffer = match pixels {
            Some(data) => {
                if !self.upload_delay.is_zero() {
                    std::thread::sleep(self.upload_delay);
                }
                Pixels::from_raw(size.width, size.height, data.to_vec()).ok_or(
                    GpuError::PixelLength {
                        expected: size.byte_len(),
                        actual: data.len(),
                    },
                )?
            }
            None => Pixels::new(size.width, size.height),
        };

        Ok(SoftwareTexture(Arc::new(RwLock::new(buffer))))
    }

    fn texture_size(&self, texture: &SoftwareTexture) -> Size {
        texture.size()
    }

    fn context(&self) -> &DeviceLock<SoftwareContext> {
        &self.context
    }
}

pub struct SoftwareContext;

impl DrawContext for SoftwareContext {
    type Texture = SoftwareTexture;

    fn clear(&mut self, target: &SoftwareTexture, color: Bgra) -> Result<(), GpuError> {
        for pixel in target.write().pixels_mut() {
            pixel.0 = color;
        }
        Ok(())
    }

    fn draw_image(
        &mut self,
        target: &SoftwareTexture,
        source: &SoftwareTexture,
        origin: Point,
    ) -> Result<(), GpuError> {
        if target.same(source) {
            return Err(GpuError::SelfCopy);
        }

        let src = source.read();
        let mut dst = target.write();

        let (dst_w, dst_h) = (i64::from(dst.width()), i64::from(dst.height()));
        let x0 = i64::from(origin.x).max(0);
        let y0 = i64::from(origin.y).max(0);
        let x1 = (i64::from(origin.x) + i64::from(src.width())).min(dst_w);
        let y1 = (i64::from(origin.y) + i64::from(src.height())).min(dst_h);

        for y in y0..y1 {
            for x in x0..x1 {
                let s = src.get_pixel(
                    (x - i64::from(origin.x)) as u32,
                    (y - i64::from(origin.y)) as u32,
                );
                let d = dst.get_pixel_mut(x as u32, y as u32);
                d.0 = source_over(s.0, d.0);
            }
        }
        Ok(())
    }

    fn copy_region(
        &mut self,
        target: &SoftwareTexture,
        dest: (u32, u32),
        source: &SoftwareTexture,
        region: Region,
    ) -> Result<(), GpuError> {
        if target.same(source) {
            return Err(GpuError::SelfCopy);
        }
        check_copy(target.size(), dest, source.size(), region)?;

        let patch = imageops::crop_imm(&*source.read(), region.x, region.y, region.width, region.height)
            .to_image();
        imageops::replace(&mut *target.write(), &patch, i64::from(dest.0), i64::from(dest.1));
        Ok(())
    }

    fn read_pixels(&mut self, texture: &SoftwareTexture) -> Result<Vec<u8>, GpuError> {
        Ok(texture.read().as_raw().clone())
    }
}

/// Premultiplied source-over: `dst = src + dst * (1 - src.a)`.
fn source_over(src: Bgra, dst: Bgra) -> Bgra {
    let inverse = 255 - u16::from(src[3]);
    let mut out = [0; 4];
    for (channel, (s, d)) in out.iter_mut().zip(src.iter().zip(dst)) {
        let blended = u16::from(*s) + (u16::from(d) * inverse + 127) / 255;
        *channel = blended.min(255) as u8;
    }
    out
}
