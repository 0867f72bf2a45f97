// SPDX-License-Identifier: MPL-2.0

//! Graphics device abstraction.
//!
//! Every surface in the program is a 4 byte per pixel, premultiplied BGRA
//! texture owned by a [`GraphicsDevice`]. Drawing goes through a single
//! [`DrawContext`] per device which is only reachable through the device's
//! [`DeviceLock`], so the decode thread, the frame timer and the presenter
//! never interleave commands.
//!
//! - [`software`]: CPU textures backed by `image` buffers
//! - `d3d11`: Direct3D 11 textures drawn with Direct2D (Windows only)

use std::{
    ops::{Deref, DerefMut},
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::geometry::{Point, Region, Size};

#[cfg(windows)]
pub mod d3d11;
pub mod software;

/// A premultiplied BGRA color.
pub type Bgra = [u8; 4];

pub const OPAQUE_BLACK: Bgra = [0, 0, 0, 255];
pub const TRANSPARENT: Bgra = [0, 0, 0, 0];

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("cannot create a texture of {}x{}", .0.width, .0.height)]
    EmptyTexture(Size),
    #[error("expected {expected} bytes of pixel data, got {actual}")]
    PixelLength { expected: usize, actual: usize },
    #[error("{region:?} lies outside a {}x{} texture", size.width, size.height)]
    OutOfBounds { region: Region, size: Size },
    #[error("source and target are the same texture")]
    SelfCopy,
    #[error("{0} returned no object")]
    Missing(&'static str),
    #[cfg(windows)]
    #[error(transparent)]
    Windows(#[from] windows::core::Error),
}

/// A device able to allocate textures and hand out its draw context.
pub trait GraphicsDevice: Send + Sync + 'static {
    type Texture: Clone + Send + Sync + 'static;
    type Context: DrawContext<Texture = Self::Texture>;

    /// Allocate a texture, optionally initialised from tightly packed BGRA rows.
    fn create_texture(&self, size: Size, pixels: Option<&[u8]>)
    -> Result<Self::Texture, GpuError>;

    fn texture_size(&self, texture: &Self::Texture) -> Size;

    fn context(&self) -> &DeviceLock<Self::Context>;
}

/// Drawing commands. Only reachable while holding the device lock.
pub trait DrawContext: Send {
    type Texture;

    fn clear(&mut self, target: &Self::Texture, color: Bgra) -> Result<(), GpuError>;

    /// Composite `source` onto `target` at `origin` with premultiplied source-over
    /// blending. Parts falling outside the target are clipped.
    fn draw_image(
        &mut self,
        target: &Self::Texture,
        source: &Self::Texture,
        origin: Point,
    ) -> Result<(), GpuError>;

    /// Copy `region` of `source` verbatim into `target` at `dest`.
    ///
    /// Both the source region and the destination box must be in bounds.
    fn copy_region(
        &mut self,
        target: &Self::Texture,
        dest: (u32, u32),
        source: &Self::Texture,
        region: Region,
    ) -> Result<(), GpuError>;

    /// Read back the texture as tightly packed BGRA rows.
    fn read_pixels(&mut self, texture: &Self::Texture) -> Result<Vec<u8>, GpuError>;
}

/// Serialises access to a device's draw context.
pub struct DeviceLock<C> {
    context: Mutex<C>,
}

impl<C> DeviceLock<C> {
    pub fn new(context: C) -> Self {
        Self {
            context: Mutex::new(context),
        }
    }

    /// Enter the device. The lock is released when the guard drops.
    pub fn lock(&self) -> DeviceGuard<'_, C> {
        // Draw commands leave no partial state behind, so a panic while
        // holding the lock does not invalidate the context.
        DeviceGuard(self.context.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Run `f` with the device entered.
    pub fn with<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }
}

pub struct DeviceGuard<'a, C>(MutexGuard<'a, C>);

impl<C> Deref for DeviceGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.0
    }
}

impl<C> DerefMut for DeviceGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.0
    }
}

/// Copy `source` into a new texture owned by the caller.
pub fn duplicate_texture<G: GraphicsDevice>(
    device: &G,
    source: &G::Texture,
) -> Result<G::Texture, GpuError> {
    let size = device.texture_size(source);
    let copy = device.create_texture(size, None)?;
    device
        .context()
        .with(|ctx| ctx.copy_region(&copy, (0, 0), source, Region::full(size)))?;
    Ok(copy)
}

/// Check that `pixels`, if present, holds exactly one BGRA texel per pixel of `size`.
pub(crate) fn check_upload(size: Size, pixels: Option<&[u8]>) -> Result<(), GpuError> {
    if size.is_empty() {
        return Err(GpuError::EmptyTexture(size));
    }
    match pixels {
        Some(data) if data.len() != size.byte_len() => Err(GpuError::PixelLength {
            expected: size.byte_len(),
            actual: data.len(),
        }),
        _ => Ok(()),
    }
}

/// Check both sides of a region copy.
pub(crate) fn check_copy(
    target: Size,
    dest: (u32, u32),
    source: Size,
    region: Region,
) -> Result<(), GpuError> {
    if !region.within(source) {
        return Err(GpuError::OutOfBounds {
            region,
            size: source,
        });
    }
    let landing = Region::new(dest.0, dest.1, region.width, region.height);
    if !landing.within(target) {
        return Err(GpuError::OutOfBounds {
            region: landing,
            size: target,
        });
    }
    Ok(())
}
