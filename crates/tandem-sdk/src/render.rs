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

//! State owned by the render thread and one iteration of the render loop.

use crate::app::{AppHandle, ListenerId};
use crate::clock::FrameClock;
use crate::listener::LifecycleListener;
use crate::window::Window;
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tandem_core::platform::WindowEventKind;
use tandem_core::{ContextHandle, Executor, ThreadRole, WindowState};

/// Everything the render loop mutates. Only the render thread touches it;
/// other threads reach it through render work items.
pub(crate) struct RenderState {
    app: AppHandle,
    windows: Vec<Window>,
    lifecycle: Vec<(ListenerId, Box<dyn LifecycleListener>)>,
    clock: FrameClock,
    lifecycle_paused: bool,
}

impl RenderState {
    pub(crate) fn new(app: AppHandle) -> Self {
        Self {
            app,
            windows: Vec::new(),
            lifecycle: Vec::new(),
            clock: FrameClock::new(),
            lifecycle_paused: false,
        }
    }

    pub(crate) fn adopt(&mut self, window: Window) {
        self.windows.push(window);
    }

    pub(crate) fn has_windows(&self) -> bool {
        !self.windows.is_empty()
    }

    pub(crate) fn add_lifecycle_listener(&mut self, id: ListenerId, listener: Box<dyn LifecycleListener>) {
        self.lifecycle.push((id, listener));
    }

    pub(crate) fn remove_lifecycle_listener(&mut self, id: ListenerId) {
        self.lifecycle.retain(|(listener, _)| *listener != id);
    }

    fn position(&self, context: ContextHandle) -> Option<usize> {
        self.windows.iter().position(|window| window.context() == context)
    }

    /// Applies a native event forwarded by the main thread.
    pub(crate) fn deliver(&mut self, context: ContextHandle, kind: WindowEventKind) -> Result<()> {
        let Some(index) = self.position(context) else {
            log::trace!("Event for {context} arrived after its window closed.");
            return Ok(());
        };
        let iconify = matches!(kind, WindowEventKind::Iconified(_));
        self.windows[index].handle_event(&self.app, &self.clock, kind)?;
        if iconify {
            self.sync_lifecycle_pause();
        }
        Ok(())
    }

    /// Pauses lifecycle listeners once every window is minimized, and resumes
    /// them when one comes back.
    fn sync_lifecycle_pause(&mut self) {
        let all_iconified =
            !self.windows.is_empty() && self.windows.iter().all(|w| w.handle().is_iconified());
        if all_iconified == self.lifecycle_paused {
            return;
        }
        self.lifecycle_paused = all_iconified;
        for (_, listener) in &mut self.lifecycle {
            if all_iconified {
                listener.pause();
            } else {
                listener.resume();
            }
        }
    }

    /// Completes every window still waiting for its context to be finished.
    pub(crate) fn complete_created(&mut self) -> Result<()> {
        for window in &mut self.windows {
            if window.state() == WindowState::Created {
                window.complete(&self.app, &self.clock)?;
            }
        }
        Ok(())
    }

    /// One pass of the render loop: application work, then every window in
    /// turn with its context current, then the windows flagged for closing.
    ///
    /// Returns `true` if any window rendered.
    pub(crate) fn iterate(&mut self) -> Result<bool> {
        let channel = Arc::clone(self.app.channel());
        self.clock.tick(Instant::now());

        if channel.drain(ContextHandle::NONE, Executor::Render(self))? > 0 {
            // Runnables usually change what is on screen.
            for window in &self.windows {
                if !window.handle().is_continuous_rendering() {
                    window.handle().request_rendering();
                }
            }
        }

        let contexts: Vec<ContextHandle> = self.windows.iter().map(Window::context).collect();
        let mut rendered = false;
        for context in contexts {
            if self.position(context).is_none() {
                continue;
            }
            channel.arbiter().acquire(ThreadRole::Render, context)?;
            let ran = channel.drain(context, Executor::Render(self))?;
            // The drained work may have closed the window.
            let Some(index) = self.position(context) else {
                continue;
            };
            let window = &mut self.windows[index];
            if ran > 0 {
                window.handle().request_rendering();
            }
            if window.state() == WindowState::Created {
                window.complete(&self.app, &self.clock)?;
            }
            rendered |= window.update(&self.app, &self.clock)?;
        }

        self.close_flagged()?;
        Ok(rendered)
    }

    fn close_flagged(&mut self) -> Result<()> {
        let mut first_error = None;
        let mut index = 0;
        while index < self.windows.len() {
            if !self.windows[index].handle().should_close() {
                index += 1;
                continue;
            }
            if let Err(err) = self.close_window(index) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn close_window(&mut self, index: usize) -> Result<()> {
        let mut window = self.windows.remove(index);
        if self.windows.is_empty() {
            self.dispose_lifecycle();
        }
        window.dispose(&self.app, &self.clock)
    }

    fn dispose_lifecycle(&mut self) {
        for (id, listener) in self.lifecycle.iter_mut().rev() {
            log::debug!("Disposing lifecycle listener {id:?}.");
            listener.pause();
            listener.dispose();
        }
        self.lifecycle.clear();
    }

    /// Disposes every remaining window in order and lets go of the render context.
    ///
    /// Every window is disposed even if one fails; the first error is returned.
    pub(crate) fn shutdown(&mut self) -> Result<()> {
        let mut first_error = None;
        while !self.windows.is_empty() {
            if let Err(err) = self.close_window(0) {
                log::error!("Window disposal failed: {err:#}");
                first_error.get_or_insert(err);
            }
        }
        if let Err(err) = self.app.channel().arbiter().release(ThreadRole::Render) {
            first_error.get_or_insert(err.into());
        }
        first_error.map_or(Ok(()), Err)
    }
}
