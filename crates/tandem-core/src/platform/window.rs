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

//! The main-thread window system contract.

use super::backend::{ContextBackend, MainWaker};
use super::display::{CursorIcon, CursorId, CursorImage, DisplayMode, MonitorInfo, PixelImage};
use super::event::NativeEvent;
use crate::config::WindowConfig;
use crate::context::ContextHandle;
use crate::error::PlatformError;
use std::sync::Arc;
use std::time::Duration;

/// Cached size and position of a window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowGeometry {
    /// Logical x position.
    pub x: i32,
    /// Logical y position.
    pub y: i32,
    /// Logical width.
    pub width: u32,
    /// Logical height.
    pub height: u32,
    /// Back-buffer width in pixels.
    pub backbuffer_width: u32,
    /// Back-buffer height in pixels.
    pub backbuffer_height: u32,
    /// Ratio between pixels and logical units.
    pub scale_factor: f64,
}

/// A window freshly created by [`NativeWindows::create_window`].
#[derive(Debug, Clone, PartialEq)]
pub struct NativeWindow {
    /// The handle of the window and its context.
    pub context: ContextHandle,
    /// Geometry right after creation.
    pub geometry: WindowGeometry,
}

/// A change to apply to a native window.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowAttribute {
    /// Title bar text.
    Title(String),
    /// Logical position.
    Position {
        /// New x.
        x: i32,
        /// New y.
        y: i32,
    },
    /// Logical inner size.
    Size {
        /// New width.
        width: u32,
        /// New height.
        height: u32,
    },
    /// Show or hide.
    Visible(bool),
    /// Title bar and borders.
    Decorated(bool),
    /// User resizing.
    Resizable(bool),
    /// Logical size bounds.
    SizeLimits {
        /// Minimum size, if any.
        min: Option<(u32, u32)>,
        /// Maximum size, if any.
        max: Option<(u32, u32)>,
    },
    /// Minimize.
    Iconify,
    /// Undo minimize or maximize.
    Restore,
    /// Maximize.
    Maximize,
    /// Request keyboard focus.
    Focus,
    /// Window icon, or `None` for the default.
    Icon(Option<PixelImage>),
    /// Enter fullscreen on a monitor, optionally switching its video mode.
    Fullscreen {
        /// Index into [`NativeWindows::monitors`].
        monitor: usize,
        /// Exclusive mode, or `None` for borderless.
        mode: Option<DisplayMode>,
    },
    /// Leave fullscreen with the given logical size.
    Windowed {
        /// Logical width.
        width: u32,
        /// Logical height.
        height: u32,
    },
    /// Cursor shape over the window.
    Cursor(CursorIcon),
}

/// A native window system, driven from the main thread only.
///
/// Implementations are not required to be `Send`: every method runs on the
/// thread that created the backend. Work from other threads reaches it through
/// the delegation channel.
pub trait NativeWindows {
    /// A handle other threads use to interrupt [`NativeWindows::wait_events`].
    fn waker(&self) -> Arc<dyn MainWaker>;

    /// The thread-safe graphics context interface.
    fn context_backend(&self) -> Arc<dyn ContextBackend>;

    /// Waits at most `timeout` for native events and returns every event received.
    fn wait_events(&mut self, timeout: Duration) -> Result<Vec<NativeEvent>, PlatformError>;

    /// Creates an invisible window and its context, sharing objects with `shared_with`
    /// unless it is [`ContextHandle::NONE`].
    fn create_window(
        &mut self,
        config: &WindowConfig,
        shared_with: ContextHandle,
    ) -> Result<NativeWindow, PlatformError>;

    /// Destroys a window and its context.
    fn destroy_window(&mut self, context: ContextHandle) -> Result<(), PlatformError>;

    /// Applies an attribute change.
    fn apply(&mut self, context: ContextHandle, attribute: WindowAttribute) -> Result<(), PlatformError>;

    /// Reads the current geometry.
    fn geometry(&self, context: ContextHandle) -> Result<WindowGeometry, PlatformError>;

    /// Connected monitors, primary first.
    fn monitors(&self) -> Vec<MonitorInfo>;

    /// Clipboard text, if any.
    fn clipboard_text(&mut self) -> Option<String>;

    /// Replaces the clipboard text.
    fn set_clipboard_text(&mut self, text: &str) -> Result<(), PlatformError>;

    /// Uploads a custom cursor.
    fn create_cursor(&mut self, image: &CursorImage) -> Result<CursorId, PlatformError>;

    /// Frees a custom cursor. Unknown ids are ignored.
    fn destroy_cursor(&mut self, cursor: CursorId);

    /// Tears the window system down. Called once, after every window is gone.
    fn terminate(&mut self);
}
