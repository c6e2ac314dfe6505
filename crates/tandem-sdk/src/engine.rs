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

//! The application runner.
//!
//! In [`ThreadingMode::Dual`] the calling thread becomes the main thread: it
//! owns the native window system, waits for native events, forwards them to
//! the render thread, and runs the work the render thread delegates to it.
//! A spawned `tandem-render` thread drives the render loop. In
//! [`ThreadingMode::Single`] both roles share the calling thread and
//! main-thread calls go straight to the native window system.

use crate::app::{AppHandle, Channel};
use crate::listener::{ApplicationListener, WindowListener};
use crate::render::RenderState;
use anyhow::{anyhow, bail, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tandem_core::config::ThreadingMode;
use tandem_core::delegate::{direct, EventForwarder};
use tandem_core::platform::{NativeWindows, WindowEventKind};
use tandem_core::{AppConfig, ContextArbiter, ContextRegistry, DelegationChannel, Executor, ThreadRole};
use tandem_infra::WinitPlatform;

type Forwarder = EventForwarder<RenderState, WindowEventKind>;

/// The public entry point: configure, then [`Engine::run`].
pub struct Engine {
    config: AppConfig,
}

impl Engine {
    /// An engine with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Overrides the thread layout.
    pub fn with_threading(mut self, threading: ThreadingMode) -> Self {
        self.config.threading = threading;
        self
    }

    /// Overrides the render loop's idle frame rate.
    pub fn with_idle_fps(mut self, idle_fps: u32) -> Self {
        self.config.idle_fps = idle_fps;
        self
    }

    /// The configuration the engine will run with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Opens the primary window on the desktop window system and runs until
    /// the last window closes or [`AppHandle::exit`] is called.
    pub fn run_desktop<L>(self, listener: L) -> Result<()>
    where
        L: ApplicationListener + 'static,
    {
        let platform = WinitPlatform::new()?;
        self.run(Box::new(platform), listener)
    }

    /// Runs on the given native window system. Blocks the calling thread,
    /// which becomes the main thread.
    pub fn run<L>(self, native: Box<dyn NativeWindows>, listener: L) -> Result<()>
    where
        L: ApplicationListener + 'static,
    {
        self.run_with(native, Box::new(listener), None)
    }

    /// Like [`Engine::run`], with a [`WindowListener`] for the primary window.
    pub fn run_with(
        self,
        native: Box<dyn NativeWindows>,
        listener: Box<dyn ApplicationListener>,
        window_listener: Option<Box<dyn WindowListener>>,
    ) -> Result<()> {
        log::info!("Tandem: starting in {:?} threading mode...", self.config.threading);

        let registry = Arc::new(ContextRegistry::new());
        let arbiter = Arc::new(ContextArbiter::new(registry, native.context_backend()));
        let channel = Arc::new(DelegationChannel::new(arbiter, native.waker()));
        let app = AppHandle::new(Arc::clone(&channel), self.config);
        let forwarder = EventForwarder::new(Arc::clone(&channel), RenderState::deliver);

        let outcome = match app.config().threading {
            ThreadingMode::Dual => run_dual(app, native, &forwarder, listener, window_listener),
            ThreadingMode::Single => run_single(app, native, &forwarder, listener, window_listener),
        };
        match &outcome {
            Ok(()) => log::info!("Tandem: shut down cleanly."),
            Err(err) => log::error!("Tandem: shut down after an error: {err:#}"),
        }
        outcome
    }
}

/// Sets the finished flag and wakes the main thread when the render thread
/// ends, including by panic.
struct FinishGuard {
    finished: Arc<AtomicBool>,
    channel: Arc<Channel>,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.finished.store(true, Ordering::SeqCst);
        self.channel.wake(ThreadRole::Main);
    }
}

fn run_dual(
    app: AppHandle,
    mut native: Box<dyn NativeWindows>,
    forwarder: &Forwarder,
    listener: Box<dyn ApplicationListener>,
    window_listener: Option<Box<dyn WindowListener>>,
) -> Result<()> {
    let channel = Arc::clone(app.channel());
    channel.bind_current_thread(ThreadRole::Main);

    let finished = Arc::new(AtomicBool::new(false));
    let render = {
        let app = app.clone();
        let guard = FinishGuard {
            finished: Arc::clone(&finished),
            channel: Arc::clone(&channel),
        };
        thread::Builder::new()
            .name("tandem-render".to_string())
            .spawn(move || {
                let _guard = guard;
                render_thread(app, listener, window_listener)
            })?
    };

    let timeout = app.config().main_wait_timeout();
    let mut failure = None;
    while !finished.load(Ordering::SeqCst) {
        if let Err(err) = main_step(&channel, native.as_mut(), forwarder, timeout) {
            log::error!("Main loop failed: {err:#}");
            failure = Some(err);
            app.exit();
            break;
        }
    }

    if failure.is_none() {
        // Work posted while the render thread was winding down.
        if let Err(err) = drain_main(&channel, native.as_mut()) {
            log::warn!("Final main-thread drain failed: {err:#}");
        }
    }
    let dropped = channel.close(ThreadRole::Main);
    if dropped > 0 {
        log::debug!("Dropped {dropped} main-thread work item(s) at shutdown.");
    }
    channel.interrupt(ThreadRole::Render);

    let rendered = match render.join() {
        Ok(outcome) => outcome,
        Err(_) => Err(anyhow!("the render thread panicked")),
    };
    channel.close(ThreadRole::Render);
    teardown(&channel, native.as_mut());

    match failure {
        Some(err) => Err(err),
        None => rendered,
    }
}

fn render_thread(
    app: AppHandle,
    listener: Box<dyn ApplicationListener>,
    window_listener: Option<Box<dyn WindowListener>>,
) -> Result<()> {
    app.channel().bind_current_thread(ThreadRole::Render);
    log::info!("Render thread started.");

    let mut state = RenderState::new(app.clone());
    let outcome = drive(&app, &mut state, listener, window_listener, |_| Ok(()));
    if let Err(err) = &outcome {
        log::error!("Exception caught in render thread: {err:#}");
        app.exit();
    }
    let shutdown = state.shutdown();
    log::info!("Render thread finished.");
    outcome.and(shutdown)
}

/// Opens and completes the primary window, then iterates until exit or
/// until the last window is gone. `before_iteration` runs ahead of every
/// iteration and is told whether the previous one rendered.
fn drive(
    app: &AppHandle,
    state: &mut RenderState,
    listener: Box<dyn ApplicationListener>,
    window_listener: Option<Box<dyn WindowListener>>,
    mut before_iteration: impl FnMut(bool) -> Result<()>,
) -> Result<()> {
    let primary = app.open_window(listener, window_listener, app.config().window.clone())?;
    state.adopt(primary);
    state.complete_created()?;

    let channel = Arc::clone(app.channel());
    let single = app.config().threading == ThreadingMode::Single;
    let mut rendered = true;
    while app.is_running() && state.has_windows() {
        if single {
            // Main-thread work in the same iteration may need the contexts.
            channel.arbiter().release(ThreadRole::Render)?;
        }
        before_iteration(rendered)?;
        rendered = state.iterate()?;
        if !single && !rendered {
            match app.config().idle_frame_time() {
                Some(frame_time) => {
                    channel.wait_render_work(frame_time);
                }
                None => thread::yield_now(),
            }
        }
    }
    Ok(())
}

fn run_single(
    app: AppHandle,
    native: Box<dyn NativeWindows>,
    forwarder: &Forwarder,
    listener: Box<dyn ApplicationListener>,
    window_listener: Option<Box<dyn WindowListener>>,
) -> Result<()> {
    let channel = Arc::clone(app.channel());
    if direct::is_installed() {
        bail!("a native window system is already installed on this thread");
    }
    if direct::install(native).is_err() {
        bail!("the native window system could not be installed on this thread");
    }
    channel.bind_current_thread(ThreadRole::Main);
    channel.bind_current_thread(ThreadRole::Render);

    let busy = app.config().main_wait_timeout();
    let idle = app.config().idle_frame_time().unwrap_or(Duration::ZERO);
    let mut state = RenderState::new(app.clone());
    let outcome = drive(&app, &mut state, listener, window_listener, |rendered| {
        let timeout = if rendered { Duration::ZERO } else { idle.min(busy) };
        direct::with_native(|native| main_step(&channel, native, forwarder, timeout))
            .ok_or_else(|| anyhow!("the native window system is unavailable"))?
    });
    if let Err(err) = &outcome {
        log::error!("Exception caught in render loop: {err:#}");
        app.exit();
    }
    let shutdown = state.shutdown();

    channel.close(ThreadRole::Main);
    channel.close(ThreadRole::Render);
    match direct::uninstall() {
        Some(mut native) => teardown(&channel, native.as_mut()),
        None => log::warn!("The native window system vanished before teardown."),
    }
    outcome.and(shutdown)
}

/// Waits for native events, forwards them to the render thread and runs
/// every queued main-thread item.
fn main_step(
    channel: &Channel,
    native: &mut dyn NativeWindows,
    forwarder: &Forwarder,
    timeout: Duration,
) -> Result<()> {
    for event in native.wait_events(timeout)? {
        forwarder.forward(event.context, event.kind);
    }
    drain_main(channel, native)
}

fn drain_main(channel: &Channel, native: &mut dyn NativeWindows) -> Result<()> {
    for context in channel.registry().handles() {
        channel.drain(context, Executor::Main(&mut *native))?;
    }
    Ok(())
}

/// Destroys whatever windows the render thread could not, then shuts the
/// window system down.
fn teardown(channel: &Channel, native: &mut dyn NativeWindows) {
    let registry = channel.registry();
    for context in registry.handles().into_iter().filter(|c| !c.is_none()) {
        log::warn!("Destroying leftover window {context}.");
        if let Err(err) = native.destroy_window(context) {
            log::warn!("Could not destroy {context}: {err}");
        }
        registry.unregister(context);
    }
    native.terminate();
    log::info!("Native window system terminated.");
}
