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

//! The callbacks an application implements. All of them run on the render thread.

use crate::app::AppHandle;
use crate::clock::FrameClock;
use crate::input::InputState;
use crate::window::WindowHandle;
use anyhow::Result;
use std::path::PathBuf;

/// What an [`ApplicationListener`] callback can see.
pub struct Frame<'a> {
    /// The running application.
    pub app: &'a AppHandle,
    /// The window the listener belongs to.
    pub window: &'a WindowHandle,
    /// Timing of the current render iteration.
    pub clock: &'a FrameClock,
    /// Input state of the window.
    pub input: &'a InputState,
}

/// The per-window application: created once, rendered every frame, disposed once.
///
/// An error returned from any callback stops the render loop; the windows are
/// then disposed in order and [`Engine::run`](crate::Engine::run) returns it.
pub trait ApplicationListener: Send {
    /// Called once the window's context is ready, before the first `resize`.
    fn create(&mut self, frame: &Frame<'_>) -> Result<()> {
        let _ = frame;
        Ok(())
    }

    /// Called after `create` and whenever the back buffer changes size.
    fn resize(&mut self, frame: &Frame<'_>, width: u32, height: u32) -> Result<()> {
        let _ = (frame, width, height);
        Ok(())
    }

    /// Called every frame the window renders.
    fn render(&mut self, frame: &Frame<'_>) -> Result<()>;

    /// Called when the window is minimized, and before `dispose`.
    fn pause(&mut self, frame: &Frame<'_>) -> Result<()> {
        let _ = frame;
        Ok(())
    }

    /// Called when the window is restored.
    fn resume(&mut self, frame: &Frame<'_>) -> Result<()> {
        let _ = frame;
        Ok(())
    }

    /// Called once, before the native window is destroyed.
    fn dispose(&mut self, frame: &Frame<'_>) -> Result<()> {
        let _ = frame;
        Ok(())
    }
}

/// Window-system notifications for one window.
pub trait WindowListener: Send {
    /// The window finished its setup and is about to receive `create`.
    fn created(&mut self, window: &WindowHandle) {
        let _ = window;
    }

    /// The window gained keyboard focus.
    fn focus_gained(&mut self) {}

    /// The window lost keyboard focus.
    fn focus_lost(&mut self) {}

    /// The window was minimized (`true`) or restored (`false`).
    fn iconified(&mut self, iconified: bool) {
        let _ = iconified;
    }

    /// The window was maximized (`true`) or restored (`false`).
    fn maximized(&mut self, maximized: bool) {
        let _ = maximized;
    }

    /// The user asked to close the window. Return `false` to keep it open.
    fn close_requested(&mut self) -> bool {
        true
    }

    /// Files were dropped onto the window.
    fn files_dropped(&mut self, files: &[PathBuf]) {
        let _ = files;
    }

    /// The window contents were damaged and a frame will be rendered.
    fn refresh_requested(&mut self) {}

    /// The window moved to a new logical position.
    fn moved(&mut self, x: i32, y: i32) {
        let _ = (x, y);
    }
}

/// Application-wide lifecycle hooks, independent of any window.
pub trait LifecycleListener: Send {
    /// Every window is minimized, or the application is shutting down.
    fn pause(&mut self) {}

    /// A window came back after every window was minimized.
    fn resume(&mut self) {}

    /// The last window is closing. Called once, after `pause`.
    fn dispose(&mut self) {}
}
