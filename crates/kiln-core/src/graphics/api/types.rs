// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Plain value types passed to native calls.

use bytemuck::{Pod, Zeroable};

/// A rasterizer viewport.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Viewport {
    /// Left edge in pixels.
    pub x: f32,
    /// Top edge in pixels.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Near depth bound.
    pub min_depth: f32,
    /// Far depth bound.
    pub max_depth: f32,
}

impl Viewport {
    /// A viewport covering `width` x `height` with the full depth range.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// An integer rectangle, used for scissor testing.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Rect {
    /// Left edge, inclusive.
    pub left: i32,
    /// Top edge, inclusive.
    pub top: i32,
    /// Right edge, exclusive.
    pub right: i32,
    /// Bottom edge, exclusive.
    pub bottom: i32,
}

impl Rect {
    /// A rectangle at the origin with the given size.
    pub fn from_size(width: i32, height: i32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }
}

/// A linear RGBA color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color {
    /// Transparent black.
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    /// Opaque black.
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    /// Cornflower blue, the usual clear color.
    pub const CORNFLOWER_BLUE: Color = Color::rgba(0.392, 0.584, 0.929, 1.0);

    /// Builds a color from its four channels.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Quantizes the color to 8-bit RGBA.
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

/// A box inside a resource, in elements. `right`, `bottom` and `back` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResourceRegion {
    /// First column.
    pub left: u32,
    /// First row.
    pub top: u32,
    /// First slice.
    pub front: u32,
    /// One past the last column.
    pub right: u32,
    /// One past the last row.
    pub bottom: u32,
    /// One past the last slice.
    pub back: u32,
}

impl ResourceRegion {
    /// A one-row, one-slice region spanning `[start, end)` elements of a buffer.
    pub fn span(start: u32, end: u32) -> Self {
        Self {
            left: start,
            top: 0,
            front: 0,
            right: end,
            bottom: 1,
            back: 1,
        }
    }

    /// Width in elements.
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    /// Height in rows.
    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Depth in slices.
    pub fn depth(&self) -> u32 {
        self.back.saturating_sub(self.front)
    }
}

/// Thread-group counts of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ComputeGroups {
    /// Groups along X.
    pub x: u32,
    /// Groups along Y.
    pub y: u32,
    /// Groups along Z.
    pub z: u32,
}

impl ComputeGroups {
    /// Builds a group count.
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Resolves a per-dispatch override against a pass default.
    ///
    /// Each non-zero component of `self` wins; zero components fall back to `default`.
    pub fn or_default(self, default: ComputeGroups) -> ComputeGroups {
        let pick = |o: u32, d: u32| if o != 0 { o } else { d };
        ComputeGroups {
            x: pick(self.x, default.x),
            y: pick(self.y, default.y),
            z: pick(self.z, default.z),
        }
    }

    /// `true` when every component is in `1..=max`.
    pub fn is_valid(&self, max: u32) -> bool {
        [self.x, self.y, self.z].iter().all(|c| (1..=max).contains(c))
    }
}

/// Size and layout of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDimensions {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth in texels (3D textures only, 1 otherwise).
    pub depth: u32,
    /// Number of mip levels.
    pub mip_levels: u32,
    /// Number of array slices.
    pub array_size: u32,
}

impl TextureDimensions {
    /// A single-mip, single-slice 2D size.
    pub fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
            mip_levels: 1,
            array_size: 1,
        }
    }

    /// Number of subresources (mips times slices).
    pub fn subresource_count(&self) -> u32 {
        self.mip_levels.max(1) * self.array_size.max(1)
    }

    /// Byte size of the full mip chain of every slice, for a given element size.
    pub fn byte_size(&self, bytes_per_pixel: u32) -> u64 {
        let mut total = 0u64;
        let (mut w, mut h, mut d) = (self.width.max(1), self.height.max(1), self.depth.max(1));
        for _ in 0..self.mip_levels.max(1) {
            total += w as u64 * h as u64 * d as u64 * bytes_per_pixel as u64;
            w = (w / 2).max(1);
            h = (h / 2).max(1);
            d = (d / 2).max(1);
        }
        total * self.array_size.max(1) as u64
    }

    /// Dimensions of mip level `mip`.
    pub fn mip_size(&self, mip: u32) -> (u32, u32, u32) {
        (
            (self.width >> mip).max(1),
            (self.height >> mip).max(1),
            (self.depth >> mip).max(1),
        )
    }
}

impl Default for TextureDimensions {
    fn default() -> Self {
        Self::new_2d(1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_groups_override_wins_per_component() {
        let pass_default = ComputeGroups::new(8, 8, 1);
        let resolved = ComputeGroups::new(4, 0, 0).or_default(pass_default);
        assert_eq!(resolved, ComputeGroups::new(4, 8, 1));
    }

    #[test]
    fn test_compute_groups_validity() {
        assert!(ComputeGroups::new(1, 1, 1).is_valid(65535));
        assert!(!ComputeGroups::new(0, 1, 1).is_valid(65535));
        assert!(!ComputeGroups::new(70000, 1, 1).is_valid(65535));
    }

    #[test]
    fn test_texture_byte_size_includes_mips() {
        let dims = TextureDimensions {
            width: 4,
            height: 4,
            depth: 1,
            mip_levels: 3,
            array_size: 2,
        };
        // 16 + 4 + 1 texels per slice.
        assert_eq!(dims.byte_size(4), (16 + 4 + 1) * 4 * 2);
        assert_eq!(dims.subresource_count(), 6);
        assert_eq!(dims.mip_size(2), (1, 1, 1));
    }

    #[test]
    fn test_color_quantization() {
        assert_eq!(Color::WHITE.to_rgba8(), [255, 255, 255, 255]);
        assert_eq!(Color::rgba(2.0, -1.0, 0.5, 0.0).to_rgba8(), [255, 0, 128, 0]);
    }
}
