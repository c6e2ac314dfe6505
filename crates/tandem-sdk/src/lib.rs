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

//! # Tandem SDK
//!
//! The public face of Tandem: implement [`ApplicationListener`], hand it to an
//! [`Engine`], and the engine runs the native event loop on the calling thread
//! while a render thread drives your callbacks. Windows, the clipboard and
//! cursors can be used from any thread; native calls are delegated to the
//! main thread for you.

#![warn(missing_docs)]

pub mod app;
pub mod clipboard;
pub mod clock;
pub mod cursor;
pub mod engine;
pub mod input;
pub mod listener;
mod render;
pub mod window;

pub use app::{AppHandle, ListenerId};
pub use clipboard::Clipboard;
pub use clock::FrameClock;
pub use cursor::Cursor;
pub use engine::Engine;
pub use input::InputState;
pub use listener::{ApplicationListener, Frame, LifecycleListener, WindowListener};
pub use window::WindowHandle;

/// Re-exports from the lower layers that appear in this crate's API.
pub mod prelude {
    pub use tandem_core::config::{BackBufferConfig, HdpiMode, ThreadingMode};
    pub use tandem_core::platform::{
        CursorImage, DisplayMode, InputEvent, MonitorInfo, MouseButton, PixelImage, SystemCursor,
    };
    pub use tandem_core::{AppConfig, ContextHandle, WindowConfig};
    pub use tandem_infra::{HeadlessPlatform, WinitPlatform};
}
