// SPDX-License-Identifier: MPL-2.0

//! Pixel geometry shared by the decoder, renderer and placement code.

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of bytes in a tightly packed 4 byte per pixel buffer of this size.
    #[must_use]
    pub const fn byte_len(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// A position in desktop or texture coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Desktop rectangle with exclusive `right` and `bottom` edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    #[must_use]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    #[must_use]
    pub const fn width(&self) -> i64 {
        self.right as i64 - self.left as i64
    }

    #[must_use]
    pub const fn height(&self) -> i64 {
        self.bottom as i64 - self.top as i64
    }

    /// Whether a box of `size` can be placed entirely inside this rectangle.
    #[must_use]
    pub const fn fits(&self, size: Size) -> bool {
        size.width as i64 <= self.width() && size.height as i64 <= self.height()
    }
}

/// A sub-box of a texture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The region covering a whole texture of `size`.
    #[must_use]
    pub const fn full(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Whether the region lies entirely within a texture of `size`.
    #[must_use]
    pub const fn within(&self, size: Size) -> bool {
        self.x as u64 + self.width as u64 <= size.width as u64
            && self.y as u64 + self.height as u64 <= size.height as u64
    }
}
