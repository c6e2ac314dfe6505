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

//! Provides abstractions over the native window system.
//!
//! This module contains the traits a windowing backend implements to be driven by
//! the coordination engine, and the backend-agnostic types that cross them:
//! events, geometry, monitors, cursors and images.

pub mod backend;
pub mod display;
pub mod event;
pub mod window;

pub use backend::{ContextBackend, MainWaker};
pub use display::{CursorIcon, CursorId, CursorImage, DisplayMode, MonitorInfo, PixelImage, SystemCursor};
pub use event::{InputEvent, MouseButton, NativeEvent, WindowEventKind};
pub use window::{NativeWindow, NativeWindows, WindowAttribute, WindowGeometry};
