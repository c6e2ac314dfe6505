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

//! Windows: the thread-safe [`WindowHandle`] and the render-thread side of
//! the window lifecycle.
//!
//! A window is created on the main thread (`Created`), finished on the render
//! thread before its first frame (`Completed`), updated every iteration
//! (`Active`), and torn down once its close flag is seen (`CloseRequested`,
//! then `Disposed`): the listener gets `pause` and `dispose` on the render
//! thread, then the native window is destroyed on the main thread.

use crate::app::{call_main, post_main, AppHandle, Channel};
use crate::clock::FrameClock;
use crate::cursor::Cursor;
use crate::input::InputState;
use crate::listener::{ApplicationListener, Frame, WindowListener};
use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tandem_core::config::{BackBufferConfig, HdpiMode, WindowConfig};
use tandem_core::platform::{
    CursorIcon, CursorId, CursorImage, DisplayMode, NativeWindow, PixelImage, SystemCursor,
    WindowAttribute, WindowEventKind, WindowGeometry,
};
use tandem_core::{ContextHandle, CoordinationError, ThreadRole, WindowState};

struct WindowShared {
    context: ContextHandle,
    channel: Arc<Channel>,
    hdpi_mode: HdpiMode,
    buffer_format: BackBufferConfig,
    geometry: Mutex<WindowGeometry>,
    iconified: AtomicBool,
    focused: AtomicBool,
    maximized: AtomicBool,
    continuous: AtomicBool,
    render_requested: AtomicBool,
    close_requested: AtomicBool,
    input_reset: AtomicBool,
}

/// A cheap, cloneable handle to a window, usable from any thread.
///
/// Attribute changes are queued for the main thread and return immediately;
/// the few that report success (icon, fullscreen, windowed mode) block until
/// the main thread answers and return `false` if it could not.
#[derive(Clone)]
pub struct WindowHandle {
    shared: Arc<WindowShared>,
}

impl WindowHandle {
    fn new(native: &NativeWindow, channel: Arc<Channel>, app: &AppHandle) -> Self {
        Self {
            shared: Arc::new(WindowShared {
                context: native.context,
                channel,
                hdpi_mode: app.config().hdpi_mode,
                buffer_format: app.config().back_buffer,
                geometry: Mutex::new(native.geometry),
                iconified: AtomicBool::new(false),
                focused: AtomicBool::new(false),
                maximized: AtomicBool::new(false),
                continuous: AtomicBool::new(true),
                render_requested: AtomicBool::new(false),
                close_requested: AtomicBool::new(false),
                input_reset: AtomicBool::new(false),
            }),
        }
    }

    /// The handle of the window's graphics context.
    pub fn context(&self) -> ContextHandle {
        self.shared.context
    }

    fn apply(&self, what: &'static str, attribute: WindowAttribute) {
        let context = self.context();
        post_main(&self.shared.channel, context, what, move |native| {
            native.apply(context, attribute)
        });
    }

    fn apply_and_measure(&self, what: &'static str, attribute: WindowAttribute) -> bool {
        let context = self.context();
        let geometry = call_main(&self.shared.channel, context, what, None, move |scope| {
            let native = scope.native()?;
            native.apply(context, attribute)?;
            Ok(Some(native.geometry(context)?))
        });
        match geometry {
            Some(geometry) => {
                *self.lock_geometry() = geometry;
                true
            }
            None => false,
        }
    }

    /// Sets the title bar text.
    pub fn set_title(&self, title: impl Into<String>) {
        self.apply("Title change", WindowAttribute::Title(title.into()));
    }

    /// Moves the window to a logical position.
    pub fn set_position(&self, x: i32, y: i32) {
        self.apply("Move", WindowAttribute::Position { x, y });
    }

    /// Resizes the window in logical units.
    pub fn set_size(&self, width: u32, height: u32) {
        self.apply("Resize", WindowAttribute::Size { width, height });
    }

    /// Shows or hides the window.
    pub fn set_visible(&self, visible: bool) {
        self.apply("Visibility change", WindowAttribute::Visible(visible));
    }

    /// Toggles the title bar and borders.
    pub fn set_decorated(&self, decorated: bool) {
        self.apply("Decoration change", WindowAttribute::Decorated(decorated));
    }

    /// Toggles user resizing.
    pub fn set_resizable(&self, resizable: bool) {
        self.apply("Resizability change", WindowAttribute::Resizable(resizable));
    }

    /// Bounds the logical size. `None` lifts a bound.
    pub fn set_size_limits(&self, min: Option<(u32, u32)>, max: Option<(u32, u32)>) {
        self.apply("Size limits", WindowAttribute::SizeLimits { min, max });
    }

    /// Minimizes the window.
    pub fn iconify(&self) {
        self.apply("Iconify", WindowAttribute::Iconify);
    }

    /// Undoes a minimize or maximize.
    pub fn restore(&self) {
        self.apply("Restore", WindowAttribute::Restore);
    }

    /// Maximizes the window.
    pub fn maximize(&self) {
        self.apply("Maximize", WindowAttribute::Maximize);
    }

    /// Asks for keyboard focus.
    pub fn focus(&self) {
        self.apply("Focus", WindowAttribute::Focus);
    }

    /// Sets the window icon, or restores the default with `None`.
    pub fn set_icon(&self, icon: Option<PixelImage>) -> bool {
        let context = self.context();
        call_main(&self.shared.channel, context, "Icon change", false, move |scope| {
            scope.native()?.apply(context, WindowAttribute::Icon(icon))?;
            Ok(true)
        })
    }

    /// Enters fullscreen on a monitor, switching video mode if `mode` is given.
    pub fn set_fullscreen(&self, monitor: usize, mode: Option<DisplayMode>) -> bool {
        let switched = self.apply_and_measure("Fullscreen switch", WindowAttribute::Fullscreen { monitor, mode });
        self.shared.input_reset.store(true, Ordering::SeqCst);
        switched
    }

    /// Leaves fullscreen with a logical size.
    pub fn set_windowed(&self, width: u32, height: u32) -> bool {
        let switched = self.apply_and_measure("Windowed switch", WindowAttribute::Windowed { width, height });
        self.shared.input_reset.store(true, Ordering::SeqCst);
        switched
    }

    /// Uploads a custom cursor while this window's context is current.
    ///
    /// Callers outside the engine's threads are routed through the render
    /// thread, which lends the context to the main thread for the upload.
    pub fn new_cursor(&self, image: CursorImage) -> Result<Cursor> {
        let context = self.context();
        let channel = &self.shared.channel;
        let created = match channel.current_role() {
            Some(_) => upload_cursor(channel, context, image)?,
            None => {
                let inner = Arc::clone(channel);
                channel.post_blocking(ThreadRole::Render, context, None, move |_| {
                    Ok(upload_cursor(&inner, context, image)?)
                })?
            }
        };
        match created {
            Some(Ok(id)) => Ok(Cursor::new(id, Arc::clone(&self.shared.channel))),
            Some(Err(err)) => Err(err.into()),
            None => bail!("cursor creation for {context} was interrupted"),
        }
    }

    /// Shows a custom cursor over the window.
    pub fn set_cursor(&self, cursor: &Cursor) {
        self.apply("Cursor change", WindowAttribute::Cursor(CursorIcon::Custom(cursor.id())));
    }

    /// Shows a standard cursor over the window.
    pub fn set_system_cursor(&self, cursor: SystemCursor) {
        self.apply("Cursor change", WindowAttribute::Cursor(CursorIcon::System(cursor)));
    }

    /// Flags the window for closing; it is disposed at the end of the current iteration.
    pub fn close(&self) {
        self.shared.close_requested.store(true, Ordering::SeqCst);
        self.shared.channel.wake(ThreadRole::Render);
    }

    /// Returns `true` once the window was flagged for closing.
    pub fn should_close(&self) -> bool {
        self.shared.close_requested.load(Ordering::SeqCst)
    }

    /// Renders one frame even when continuous rendering is off.
    pub fn request_rendering(&self) {
        self.shared.render_requested.store(true, Ordering::SeqCst);
        self.shared.channel.wake(ThreadRole::Render);
    }

    /// Renders every iteration (`true`, the default) or only on request.
    pub fn set_continuous_rendering(&self, continuous: bool) {
        self.shared.continuous.store(continuous, Ordering::SeqCst);
    }

    /// Returns `true` if the window renders every iteration.
    pub fn is_continuous_rendering(&self) -> bool {
        self.shared.continuous.load(Ordering::SeqCst)
    }

    /// Queues `runnable` for the render thread, with this window's context current.
    pub fn post_runnable<F>(&self, runnable: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let context = self.context();
        let posted = self
            .shared
            .channel
            .post_async(ThreadRole::Render, context, move |_| {
                runnable();
                Ok(())
            });
        if let Err(err) = posted {
            log::warn!("Runnable for {context} dropped: {err}");
        }
    }

    fn lock_geometry(&self) -> std::sync::MutexGuard<'_, WindowGeometry> {
        self.shared
            .geometry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The last known geometry.
    pub fn geometry(&self) -> WindowGeometry {
        *self.lock_geometry()
    }

    /// Width in the configured HDPI unit.
    pub fn width(&self) -> u32 {
        let geometry = self.geometry();
        match self.shared.hdpi_mode {
            HdpiMode::Logical => geometry.width,
            HdpiMode::Pixels => geometry.backbuffer_width,
        }
    }

    /// Height in the configured HDPI unit.
    pub fn height(&self) -> u32 {
        let geometry = self.geometry();
        match self.shared.hdpi_mode {
            HdpiMode::Logical => geometry.height,
            HdpiMode::Pixels => geometry.backbuffer_height,
        }
    }

    /// Back-buffer width in pixels.
    pub fn backbuffer_width(&self) -> u32 {
        self.geometry().backbuffer_width
    }

    /// Back-buffer height in pixels.
    pub fn backbuffer_height(&self) -> u32 {
        self.geometry().backbuffer_height
    }

    /// Logical position of the window.
    pub fn position(&self) -> (i32, i32) {
        let geometry = self.geometry();
        (geometry.x, geometry.y)
    }

    /// The bit depths the back buffer was requested with.
    pub fn buffer_format(&self) -> BackBufferConfig {
        self.shared.buffer_format
    }

    /// Returns `true` while the window is minimized.
    pub fn is_iconified(&self) -> bool {
        self.shared.iconified.load(Ordering::SeqCst)
    }

    /// Returns `true` while the window has keyboard focus.
    pub fn is_focused(&self) -> bool {
        self.shared.focused.load(Ordering::SeqCst)
    }

    /// Returns `true` while the window is maximized.
    pub fn is_maximized(&self) -> bool {
        self.shared.maximized.load(Ordering::SeqCst)
    }
}

type CursorUpload = Option<Result<CursorId, CoordinationError>>;

fn upload_cursor(
    channel: &Channel,
    context: ContextHandle,
    image: CursorImage,
) -> Result<CursorUpload, CoordinationError> {
    channel.post_blocking(ThreadRole::Main, context, None, move |scope| {
        let created = scope
            .make_current()
            .and_then(|()| Ok(scope.native()?.create_cursor(&image)?));
        Ok(Some(created))
    })
}

/// The render-thread side of a window.
pub(crate) struct Window {
    handle: WindowHandle,
    listener: Box<dyn ApplicationListener>,
    window_listener: Option<Box<dyn WindowListener>>,
    config: WindowConfig,
    state: WindowState,
    input: InputState,
}

impl Window {
    pub(crate) fn new(
        native: NativeWindow,
        app: &AppHandle,
        listener: Box<dyn ApplicationListener>,
        window_listener: Option<Box<dyn WindowListener>>,
        config: WindowConfig,
    ) -> Result<Self, CoordinationError> {
        let state = WindowState::Unregistered.transition(WindowState::Created)?;
        Ok(Self {
            handle: WindowHandle::new(&native, Arc::clone(app.channel()), app),
            listener,
            window_listener,
            config,
            state,
            input: InputState::default(),
        })
    }

    pub(crate) fn context(&self) -> ContextHandle {
        self.handle.context()
    }

    pub(crate) fn handle(&self) -> &WindowHandle {
        &self.handle
    }

    pub(crate) fn state(&self) -> WindowState {
        self.state
    }

    fn notify(
        &mut self,
        app: &AppHandle,
        clock: &FrameClock,
        callback: impl FnOnce(&mut dyn ApplicationListener, &Frame<'_>) -> Result<()>,
    ) -> Result<()> {
        let frame = Frame {
            app,
            window: &self.handle,
            clock,
            input: &self.input,
        };
        callback(self.listener.as_mut(), &frame)
    }

    /// Finishes the context on the render thread and introduces the window to its listeners.
    pub(crate) fn complete(&mut self, app: &AppHandle, clock: &FrameClock) -> Result<()> {
        let context = self.context();
        let arbiter = Arc::clone(app.channel().arbiter());
        arbiter.acquire(ThreadRole::Render, context)?;

        let backend = arbiter.backend();
        backend.set_swap_interval(context, u32::from(app.config().vsync))?;
        for _ in 0..2 {
            backend.clear(context, self.config.background)?;
            backend.swap_buffers(context)?;
        }
        let format = self.handle.buffer_format();
        log::debug!(
            "{context} buffer format: r{} g{} b{} a{} depth{} stencil{} samples{}",
            format.r,
            format.g,
            format.b,
            format.a,
            format.depth,
            format.stencil,
            format.samples
        );

        self.state = self.state.transition(WindowState::Completed)?;
        if let Some(window_listener) = self.window_listener.as_mut() {
            window_listener.created(&self.handle);
        }
        self.notify(app, clock, |listener, frame| listener.create(frame))?;
        let (width, height) = (self.handle.width(), self.handle.height());
        self.notify(app, clock, |listener, frame| listener.resize(frame, width, height))?;

        if self.config.initial_visible {
            self.handle.set_visible(true);
        }
        log::info!("Window {context} ('{}') is ready.", self.config.title);
        Ok(())
    }

    /// One frame. Returns `true` if the window rendered.
    pub(crate) fn update(&mut self, app: &AppHandle, clock: &FrameClock) -> Result<bool> {
        if self.state == WindowState::Completed {
            self.state = self.state.transition(WindowState::Active)?;
        }
        if self.handle.shared.input_reset.swap(false, Ordering::SeqCst) {
            self.input.reset();
        }

        let requested = self.handle.shared.render_requested.swap(false, Ordering::SeqCst);
        let should_render =
            !self.handle.is_iconified() && (self.handle.is_continuous_rendering() || requested);
        if should_render {
            self.notify(app, clock, |listener, frame| listener.render(frame))?;
            app.channel()
                .arbiter()
                .backend()
                .swap_buffers(self.context())?;
        }
        self.input.prepare_next();
        Ok(should_render)
    }

    /// Applies a forwarded native event.
    pub(crate) fn handle_event(
        &mut self,
        app: &AppHandle,
        clock: &FrameClock,
        kind: WindowEventKind,
    ) -> Result<()> {
        let shared = Arc::clone(&self.handle.shared);
        // Listeners only hear about a window once it is introduced.
        let live = self.state.is_live();
        match kind {
            WindowEventKind::Focused(focused) => {
                shared.focused.store(focused, Ordering::SeqCst);
                if let (true, Some(listener)) = (live, self.window_listener.as_mut()) {
                    if focused {
                        listener.focus_gained();
                    } else {
                        listener.focus_lost();
                    }
                }
            }
            WindowEventKind::Iconified(iconified) => {
                if shared.iconified.swap(iconified, Ordering::SeqCst) == iconified {
                    return Ok(());
                }
                if let (true, Some(listener)) = (live, self.window_listener.as_mut()) {
                    listener.iconified(iconified);
                }
                if live && app.config().pause_when_minimized {
                    if iconified {
                        self.notify(app, clock, |listener, frame| listener.pause(frame))?;
                    } else {
                        self.notify(app, clock, |listener, frame| listener.resume(frame))?;
                    }
                }
            }
            WindowEventKind::Maximized(maximized) => {
                shared.maximized.store(maximized, Ordering::SeqCst);
                if let (true, Some(listener)) = (live, self.window_listener.as_mut()) {
                    listener.maximized(maximized);
                }
            }
            WindowEventKind::CloseRequested => {
                let close = match self.window_listener.as_mut() {
                    Some(listener) if live => listener.close_requested(),
                    _ => true,
                };
                if close {
                    self.handle.close();
                } else {
                    log::debug!("Close of {} vetoed by its window listener.", self.context());
                }
            }
            WindowEventKind::FilesDropped(files) => {
                if let (true, Some(listener)) = (live, self.window_listener.as_mut()) {
                    listener.files_dropped(&files);
                }
            }
            WindowEventKind::RefreshRequested => {
                if let (true, Some(listener)) = (live, self.window_listener.as_mut()) {
                    listener.refresh_requested();
                }
                self.handle.request_rendering();
            }
            WindowEventKind::Resized { width, height } => {
                let mut geometry = self.handle.lock_geometry();
                geometry.width = width;
                geometry.height = height;
            }
            WindowEventKind::FramebufferResized { width, height } => {
                {
                    let mut geometry = self.handle.lock_geometry();
                    geometry.backbuffer_width = width;
                    geometry.backbuffer_height = height;
                }
                if live {
                    let (width, height) = (self.handle.width(), self.handle.height());
                    self.notify(app, clock, |listener, frame| listener.resize(frame, width, height))?;
                }
                self.handle.request_rendering();
            }
            WindowEventKind::Moved { x, y } => {
                {
                    let mut geometry = self.handle.lock_geometry();
                    geometry.x = x;
                    geometry.y = y;
                }
                if let (true, Some(listener)) = (live, self.window_listener.as_mut()) {
                    listener.moved(x, y);
                }
            }
            WindowEventKind::CursorEntered(inside) => self.input.set_cursor_inside(inside),
            WindowEventKind::Input(event) => {
                self.input.apply(&event);
                self.handle.request_rendering();
            }
        }
        Ok(())
    }

    /// Runs `pause` and `dispose`, then has the main thread destroy the native window.
    ///
    /// A window that never completed skips its listener. The native window is
    /// destroyed even if a callback fails; the callback error is returned afterwards.
    pub(crate) fn dispose(&mut self, app: &AppHandle, clock: &FrameClock) -> Result<()> {
        let context = self.context();
        let channel = Arc::clone(app.channel());

        if self.state.is_live() {
            self.state = self.state.transition(WindowState::CloseRequested)?;
        }
        let mut outcome = Ok(());
        if self.state == WindowState::CloseRequested {
            outcome = channel
                .arbiter()
                .acquire(ThreadRole::Render, context)
                .map_err(anyhow::Error::from)
                .and_then(|()| self.notify(app, clock, |listener, frame| listener.pause(frame)))
                .and_then(|()| self.notify(app, clock, |listener, frame| listener.dispose(frame)));
            self.state = self.state.transition(WindowState::Disposed)?;
        }

        let destroyed = call_main(&channel, context, "Window destruction", false, move |scope| {
            scope.native()?.destroy_window(context)?;
            scope.arbiter().registry().unregister(context);
            Ok(true)
        });
        if destroyed {
            log::info!("Window {context} disposed.");
        } else {
            log::warn!("Native window {context} was not destroyed; it is left to shutdown.");
        }
        outcome
    }
}
