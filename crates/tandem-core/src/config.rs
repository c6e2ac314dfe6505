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

//! Application and window configuration.
//!
//! Every field has a default, so a RON document only needs the values it changes.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How the main and render roles map onto OS threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThreadingMode {
    /// A dedicated render thread next to the main thread.
    #[default]
    Dual,
    /// Both roles run on the calling thread.
    Single,
}

/// Which unit window sizes are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HdpiMode {
    /// Logical (scaled) coordinates.
    #[default]
    Logical,
    /// Raw back-buffer pixels.
    Pixels,
}

/// Requested back-buffer bit depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackBufferConfig {
    /// Red bits.
    pub r: u8,
    /// Green bits.
    pub g: u8,
    /// Blue bits.
    pub b: u8,
    /// Alpha bits.
    pub a: u8,
    /// Depth buffer bits.
    pub depth: u8,
    /// Stencil buffer bits.
    pub stencil: u8,
    /// MSAA samples, `0` to disable.
    pub samples: u8,
}

impl Default for BackBufferConfig {
    fn default() -> Self {
        Self {
            r: 8,
            g: 8,
            b: 8,
            a: 8,
            depth: 16,
            stencil: 0,
            samples: 0,
        }
    }
}

/// Per-window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Title bar text.
    pub title: String,
    /// Logical width.
    pub width: u32,
    /// Logical height.
    pub height: u32,
    /// Initial position, or `None` to let the window system decide.
    pub position: Option<(i32, i32)>,
    /// Minimum logical size.
    pub min_size: Option<(u32, u32)>,
    /// Maximum logical size.
    pub max_size: Option<(u32, u32)>,
    /// Whether the user may resize the window.
    pub resizable: bool,
    /// Whether the window has a title bar and borders.
    pub decorated: bool,
    /// Whether the window starts maximized.
    pub maximized: bool,
    /// Whether the window is shown once its first frame is ready.
    pub initial_visible: bool,
    /// RGBA color used for the warm-up clears.
    pub background: [f32; 4],
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Tandem".to_string(),
            width: 640,
            height: 480,
            position: None,
            min_size: None,
            max_size: None,
            resizable: true,
            decorated: true,
            maximized: false,
            initial_visible: true,
            background: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Application-wide settings, including the primary window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Thread layout.
    pub threading: ThreadingMode,
    /// Frame rate the render loop idles at when no window rendered.
    pub idle_fps: u32,
    /// Sync presents to the display refresh.
    pub vsync: bool,
    /// Unit for reported window sizes.
    pub hdpi_mode: HdpiMode,
    /// Back-buffer format.
    pub back_buffer: BackBufferConfig,
    /// Upper bound for one native event wait on the main thread, in milliseconds.
    pub main_wait_timeout_ms: u64,
    /// Deliver `pause`/`resume` to the application when its window is iconified/restored.
    pub pause_when_minimized: bool,
    /// The primary window.
    pub window: WindowConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            threading: ThreadingMode::default(),
            idle_fps: 60,
            vsync: true,
            hdpi_mode: HdpiMode::default(),
            back_buffer: BackBufferConfig::default(),
            main_wait_timeout_ms: 100,
            pause_when_minimized: true,
            window: WindowConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parses a RON document. Missing fields take their defaults.
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&source)?;
        log::info!("Loaded application config from {}", path.display());
        Ok(config)
    }

    /// Serializes the config as pretty RON.
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            ConfigError::Invalid {
                field: "config",
                reason: e.to_string(),
            }
        })
    }

    /// The bounded native wait used by the main loop.
    pub fn main_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.main_wait_timeout_ms)
    }

    /// How long the render loop sleeps after an iteration that rendered nothing.
    ///
    /// `None` when `idle_fps` is zero, meaning the loop never idles.
    pub fn idle_frame_time(&self) -> Option<Duration> {
        (self.idle_fps > 0).then(|| Duration::from_secs_f64(1.0 / f64::from(self.idle_fps)))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid {
                field: "window",
                reason: format!(
                    "size must be non-zero, got {}x{}",
                    self.window.width, self.window.height
                ),
            });
        }
        if self.main_wait_timeout_ms == 0 && self.threading == ThreadingMode::Dual {
            return Err(ConfigError::Invalid {
                field: "main_wait_timeout_ms",
                reason: "a dual-threaded main loop needs a non-zero wait".to_string(),
            });
        }
        Ok(())
    }
}
