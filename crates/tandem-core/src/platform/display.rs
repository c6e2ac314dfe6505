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

//! Monitors, display modes, images and cursors.

use crate::error::PlatformError;

/// A video mode a monitor supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayMode {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Refresh rate in Hz.
    pub refresh_rate: u32,
    /// Bits per pixel.
    pub bits_per_pixel: u32,
}

/// A connected monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorInfo {
    /// Human-readable name.
    pub name: String,
    /// Virtual desktop position of the top-left corner.
    pub position: (i32, i32),
    /// The mode currently in use.
    pub current_mode: DisplayMode,
    /// Every mode the monitor supports.
    pub modes: Vec<DisplayMode>,
    /// Content scale.
    pub scale_factor: f64,
}

/// A tightly packed RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl PixelImage {
    /// Wraps `rgba`, which must hold exactly `width * height * 4` bytes.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, PlatformError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(PlatformError::CreationFailed {
                what: "image",
                reason: format!(
                    "{width}x{height} RGBA needs {expected} bytes, got {}",
                    rgba.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

/// The pixels and hotspot of a custom cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorImage {
    /// Cursor pixels.
    pub image: PixelImage,
    /// Hotspot x, within the image.
    pub hotspot_x: u32,
    /// Hotspot y, within the image.
    pub hotspot_y: u32,
}

impl CursorImage {
    /// Builds a cursor image, rejecting a hotspot outside the pixels.
    pub fn new(image: PixelImage, hotspot_x: u32, hotspot_y: u32) -> Result<Self, PlatformError> {
        if hotspot_x >= image.width() || hotspot_y >= image.height() {
            return Err(PlatformError::CreationFailed {
                what: "cursor",
                reason: format!(
                    "hotspot ({hotspot_x}, {hotspot_y}) outside {}x{} image",
                    image.width(),
                    image.height()
                ),
            });
        }
        Ok(Self {
            image,
            hotspot_x,
            hotspot_y,
        })
    }
}

/// Identifies a custom cursor owned by the native backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorId(pub u64);

/// Standard cursor shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SystemCursor {
    /// The default arrow.
    #[default]
    Arrow,
    /// Text insertion bar.
    Ibeam,
    /// Crosshair.
    Crosshair,
    /// Pointing hand.
    Hand,
    /// Horizontal resize arrows.
    HorizontalResize,
    /// Vertical resize arrows.
    VerticalResize,
    /// Operation not allowed.
    NotAllowed,
}

/// The cursor shown over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorIcon {
    /// A standard shape.
    System(SystemCursor),
    /// A cursor from [`NativeWindows::create_cursor`](super::NativeWindows::create_cursor).
    Custom(CursorId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_size_must_match_buffer() {
        assert!(PixelImage::new(2, 2, vec![0; 16]).is_ok());
        assert!(PixelImage::new(2, 2, vec![0; 15]).is_err());
        assert!(PixelImage::new(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn hotspot_must_be_inside_image() {
        let image = PixelImage::new(4, 4, vec![255; 64]).expect("valid image");
        assert!(CursorImage::new(image.clone(), 3, 3).is_ok());
        assert!(matches!(
            CursorImage::new(image, 4, 0),
            Err(PlatformError::CreationFailed { what: "cursor", .. })
        ));
    }
}
