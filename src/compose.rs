// SPDX-License-Identifier: MPL-2.0

//! Rasterises the window contents: the animation with the two shade panels on top.

use crate::{
    geometry::{Point, Region, Size},
    gpu::{DrawContext, GpuError, TRANSPARENT},
    shade::{Panel, ShadePanels},
};

/// Everything drawn into the window for one presentation.
pub struct Scene<'a, T> {
    pub size: Size,
    pub animation: Option<&'a T>,
    pub shade: Option<&'a T>,
    pub panels: &'a ShadePanels,
}

/// Draw `scene` into `target`, which must be at least `scene.size`.
pub fn render<C: DrawContext>(
    ctx: &mut C,
    target: &C::Texture,
    scene: &Scene<'_, C::Texture>,
) -> Result<(), GpuError> {
    ctx.clear(target, TRANSPARENT)?;

    if let Some(animation) = scene.animation {
        ctx.draw_image(target, animation, Point::default())?;
    }

    if let Some(shade) = scene.shade {
        for (dest, region) in panel_copies(scene.size, scene.panels) {
            ctx.copy_region(target, dest, shade, region)?;
        }
    }
    Ok(())
}

/// The parts of the shade visible through each panel, clipped to the window.
///
/// The left panel spans `width / 2` columns and the right one the rest, so
/// at rest they tile the window even for odd widths.
pub fn panel_copies(size: Size, panels: &ShadePanels) -> Vec<((u32, u32), Region)> {
    let split = size.width / 2;
    [(&panels.left, split), (&panels.right, size.width - split)]
        .into_iter()
        .filter_map(|(panel, width)| visible_part(size, panel, width))
        .collect()
}

fn visible_part(size: Size, panel: &Panel, panel_width: u32) -> Option<((u32, u32), Region)> {
    let panel_x = (panel.relative_offset_x * size.width as f32).floor() as i64;
    let (dest_x, src_x, width) = span(size.width, panel_x, panel_width, panel.brush.x)?;
    let (dest_y, src_y, height) = span(size.height, 0, size.height, panel.brush.y)?;
    Some(((dest_x, dest_y), Region::new(src_x, src_y, width, height)))
}

/// One axis of a panel: the panel starts at `panel_pos` on the window and is
/// `panel_len` long; the shade is shifted by `brush` within it. Returns the
/// destination start, source start and length of the visible overlap.
fn span(extent: u32, panel_pos: i64, panel_len: u32, brush: f32) -> Option<(u32, u32, u32)> {
    let extent = i64::from(extent);
    let src_start = (-brush).floor() as i64;

    let mut src_lo = src_start.max(0);
    let mut src_hi = (src_start + i64::from(panel_len)).min(extent);

    let mut dest_lo = panel_pos + (src_lo - src_start);
    if dest_lo < 0 {
        src_lo -= dest_lo;
        dest_lo = 0;
    }
    let overflow = dest_lo + (src_hi - src_lo) - extent;
    if overflow > 0 {
        src_hi -= overflow;
    }

    (src_hi > src_lo).then(|| (dest_lo as u32, src_lo as u32, (src_hi - src_lo) as u32))
}
