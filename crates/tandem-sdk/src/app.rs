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

//! The application handle shared by listeners and user threads.

use crate::clipboard::Clipboard;
use crate::listener::{ApplicationListener, LifecycleListener, WindowListener};
use crate::render::RenderState;
use crate::window::{Window, WindowHandle};
use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tandem_core::platform::{MonitorInfo, NativeWindow, NativeWindows};
use tandem_core::{
    AppConfig, ContextHandle, CoordinationError, DelegationChannel, PlatformError, TaskScope,
    ThreadRole, WindowConfig,
};

pub(crate) type Channel = DelegationChannel<RenderState>;

/// Identifies a registered [`LifecycleListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct AppShared {
    channel: Arc<Channel>,
    config: AppConfig,
    running: AtomicBool,
    next_listener: AtomicU64,
    primary: AtomicU64,
}

/// A cloneable handle to the running application. Usable from any thread.
#[derive(Clone)]
pub struct AppHandle {
    shared: Arc<AppShared>,
}

impl AppHandle {
    pub(crate) fn new(channel: Arc<Channel>, config: AppConfig) -> Self {
        Self {
            shared: Arc::new(AppShared {
                channel,
                config,
                running: AtomicBool::new(true),
                next_listener: AtomicU64::new(1),
                primary: AtomicU64::new(ContextHandle::NONE.raw()),
            }),
        }
    }

    pub(crate) fn channel(&self) -> &Arc<Channel> {
        &self.shared.channel
    }

    /// The configuration the application was started with.
    pub fn config(&self) -> &AppConfig {
        &self.shared.config
    }

    /// Returns `false` once [`AppHandle::exit`] was called.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Stops the render loop after the current iteration. Every window is then disposed.
    pub fn exit(&self) {
        if self.shared.running.swap(false, Ordering::SeqCst) {
            log::info!("Exit requested.");
        }
        self.shared.channel.wake(ThreadRole::Render);
    }

    /// Queues `runnable` for the render thread, outside any window context.
    pub fn post_runnable<F>(&self, runnable: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let posted = self
            .shared
            .channel
            .post_async(ThreadRole::Render, ContextHandle::NONE, move |_| {
                runnable();
                Ok(())
            });
        if let Err(err) = posted {
            log::warn!("Runnable dropped: {err}");
        }
    }

    /// Opens another window driven by `listener`.
    ///
    /// The native window is created on the main thread before this returns;
    /// it joins the render loop on the next iteration.
    pub fn new_window<L>(&self, listener: L, config: WindowConfig) -> Result<WindowHandle>
    where
        L: ApplicationListener + 'static,
    {
        self.new_window_with(Box::new(listener), None, config)
    }

    /// Like [`AppHandle::new_window`], with a [`WindowListener`] for window-system notifications.
    pub fn new_window_with(
        &self,
        listener: Box<dyn ApplicationListener>,
        window_listener: Option<Box<dyn WindowListener>>,
        config: WindowConfig,
    ) -> Result<WindowHandle> {
        let window = self.open_window(listener, window_listener, config)?;
        let handle = window.handle().clone();
        let context = window.context();
        self.shared
            .channel
            .post_async(ThreadRole::Render, ContextHandle::NONE, move |scope| {
                scope.state()?.adopt(window);
                Ok(())
            })?;
        log::debug!("Window {context} handed to the render loop.");
        Ok(handle)
    }

    /// Creates and registers a native window on the main thread.
    pub(crate) fn open_window(
        &self,
        listener: Box<dyn ApplicationListener>,
        window_listener: Option<Box<dyn WindowListener>>,
        config: WindowConfig,
    ) -> Result<Window> {
        let shared_with = ContextHandle::new(self.shared.primary.load(Ordering::SeqCst));
        let native_config = config.clone();
        let created = self.shared.channel.post_blocking(
            ThreadRole::Main,
            ContextHandle::NONE,
            None,
            move |scope| Ok(Some(create_native(scope, &native_config, shared_with))),
        )?;
        let native = created.ok_or_else(|| anyhow!("window creation was interrupted"))??;

        let _ = self.shared.primary.compare_exchange(
            ContextHandle::NONE.raw(),
            native.context.raw(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        log::info!(
            "Created window {} ('{}', {}x{}).",
            native.context,
            config.title,
            native.geometry.width,
            native.geometry.height
        );
        Ok(Window::new(native, self, listener, window_listener, config)?)
    }

    /// Registers a listener for application-wide pause, resume and dispose.
    ///
    /// The listener is added on the render thread, before its next iteration.
    pub fn add_lifecycle_listener<L>(&self, listener: L) -> ListenerId
    where
        L: LifecycleListener + 'static,
    {
        let id = ListenerId(self.shared.next_listener.fetch_add(1, Ordering::SeqCst));
        let posted = self
            .shared
            .channel
            .post_async(ThreadRole::Render, ContextHandle::NONE, move |scope| {
                scope.state()?.add_lifecycle_listener(id, Box::new(listener));
                Ok(())
            });
        if let Err(err) = posted {
            log::warn!("Lifecycle listener {id:?} dropped: {err}");
        }
        id
    }

    /// Unregisters a lifecycle listener. Unknown ids are ignored.
    pub fn remove_lifecycle_listener(&self, id: ListenerId) {
        let posted = self
            .shared
            .channel
            .post_async(ThreadRole::Render, ContextHandle::NONE, move |scope| {
                scope.state()?.remove_lifecycle_listener(id);
                Ok(())
            });
        if let Err(err) = posted {
            log::warn!("Removal of lifecycle listener {id:?} dropped: {err}");
        }
    }

    /// The system clipboard.
    pub fn clipboard(&self) -> Clipboard {
        Clipboard::new(Arc::clone(&self.shared.channel))
    }

    /// Connected monitors, primary first. Empty if the main thread could not answer.
    pub fn monitors(&self) -> Vec<MonitorInfo> {
        call_main(
            &self.shared.channel,
            ContextHandle::NONE,
            "Monitor query",
            Vec::new(),
            |scope| Ok(scope.native()?.monitors()),
        )
    }

    /// The primary monitor, if any.
    pub fn primary_monitor(&self) -> Option<MonitorInfo> {
        self.monitors().into_iter().next()
    }
}

fn create_native(
    scope: &mut TaskScope<'_, RenderState>,
    config: &WindowConfig,
    shared_with: ContextHandle,
) -> Result<NativeWindow, CoordinationError> {
    let arbiter = scope.arbiter();
    let native = scope.native()?;
    let window = native.create_window(config, shared_with)?;
    if let Err(err) = arbiter.registry().register(window.context) {
        if let Err(destroy) = native.destroy_window(window.context) {
            log::warn!("Could not destroy unregistered window {}: {destroy}", window.context);
        }
        return Err(err);
    }
    Ok(window)
}

/// Queues a native call for the main thread. Failures are logged there.
pub(crate) fn post_main<F>(channel: &Channel, context: ContextHandle, what: &'static str, action: F)
where
    F: FnOnce(&mut dyn NativeWindows) -> Result<(), PlatformError> + Send + 'static,
{
    let posted = channel.post_async(ThreadRole::Main, context, move |scope| {
        if let Err(err) = action(scope.native()?) {
            log::warn!("{what} on {context} failed: {err}");
        }
        Ok(())
    });
    if let Err(err) = posted {
        log::warn!("{what} on {context} was not queued: {err}");
    }
}

/// Runs `function` on the main thread and waits for it, falling back to `default`.
pub(crate) fn call_main<R, F>(
    channel: &Channel,
    context: ContextHandle,
    what: &'static str,
    default: R,
    function: F,
) -> R
where
    R: Send + 'static,
    F: FnOnce(&mut TaskScope<'_, RenderState>) -> Result<R, CoordinationError> + Send + 'static,
{
    match channel.post_blocking(ThreadRole::Main, context, None, move |scope| {
        Ok(Some(function(scope)))
    }) {
        Ok(Some(Ok(value))) => value,
        Ok(Some(Err(err))) => {
            log::warn!("{what} on {context} failed: {err}");
            default
        }
        Ok(None) => {
            log::debug!("{what} on {context} was interrupted.");
            default
        }
        Err(err) => {
            log::warn!("{what} on {context} could not be delegated: {err}");
            default
        }
    }
}
