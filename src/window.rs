// SPDX-License-Identifier: MPL-2.0

use crate::{
    compose::Scene,
    error::Result,
    geometry::{Point, Size},
    gpu::GraphicsDevice,
};

/// The borderless, topmost window the animation plays in.
///
/// Implementations forward a primary button release inside the window to
/// the application as [`AppEvent::PrimaryButtonUp`](crate::app::AppEvent).
pub trait PrankWindow<G: GraphicsDevice> {
    /// Move to `position`, resize to `size` and show without taking focus.
    fn show(&mut self, position: Point, size: Size) -> Result<()>;

    fn hide(&mut self) -> Result<()>;

    /// Render `scene` and put it on screen.
    fn present(&mut self, device: &G, scene: &Scene<'_, G::Texture>) -> Result<()>;
}
