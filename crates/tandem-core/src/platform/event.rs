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

//! Backend-agnostic native events.

use crate::context::ContextHandle;
use std::path::PathBuf;

/// A window event observed by the main thread.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeEvent {
    /// The window the event belongs to.
    pub context: ContextHandle,
    /// What happened.
    pub kind: WindowEventKind,
}

impl NativeEvent {
    /// Creates an event for `context`.
    pub fn new(context: ContextHandle, kind: WindowEventKind) -> Self {
        Self { context, kind }
    }
}

/// The kinds of window event the engine forwards to the render thread.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowEventKind {
    /// Keyboard focus gained (`true`) or lost (`false`).
    Focused(bool),
    /// Window minimized (`true`) or restored (`false`).
    Iconified(bool),
    /// Window maximized (`true`) or restored (`false`).
    Maximized(bool),
    /// The user asked to close the window.
    CloseRequested,
    /// Files were dropped onto the window.
    FilesDropped(Vec<PathBuf>),
    /// The window contents need to be redrawn.
    RefreshRequested,
    /// Logical size changed.
    Resized {
        /// New logical width.
        width: u32,
        /// New logical height.
        height: u32,
    },
    /// Back-buffer size changed.
    FramebufferResized {
        /// New width in pixels.
        width: u32,
        /// New height in pixels.
        height: u32,
    },
    /// Window moved.
    Moved {
        /// New x position.
        x: i32,
        /// New y position.
        y: i32,
    },
    /// Cursor entered (`true`) or left (`false`) the window.
    CursorEntered(bool),
    /// User input.
    Input(InputEvent),
}

/// An engine-internal representation of a user input event.
///
/// This enum is backend-agnostic and represents the high-level input actions
/// that the application can respond to.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// A keyboard key was pressed.
    KeyPressed {
        /// A string representation of the physical key code.
        key_code: String,
    },
    /// A keyboard key was released.
    KeyReleased {
        /// A string representation of the physical key code.
        key_code: String,
    },
    /// A mouse button was pressed.
    MouseButtonPressed {
        /// The mouse button that was pressed.
        button: MouseButton,
    },
    /// A mouse button was released.
    MouseButtonReleased {
        /// The mouse button that was released.
        button: MouseButton,
    },
    /// The mouse cursor moved.
    MouseMoved {
        /// The new x-coordinate of the cursor.
        x: f32,
        /// The new y-coordinate of the cursor.
        y: f32,
    },
    /// The mouse wheel was scrolled.
    MouseWheelScrolled {
        /// The horizontal scroll delta.
        delta_x: f32,
        /// The vertical scroll delta.
        delta_y: f32,
    },
}

/// An engine-internal representation of a mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// The left mouse button.
    Left,
    /// The right mouse button.
    Right,
    /// The middle mouse button.
    Middle,
    /// The back mouse button (typically on the side).
    Back,
    /// The forward mouse button (typically on the side).
    Forward,
    /// Another mouse button, identified by a numeric code.
    Other(u16),
}
