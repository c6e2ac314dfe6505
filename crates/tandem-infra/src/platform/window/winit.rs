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

//! A `winit`-based implementation of the [`NativeWindows`] contract.
//!
//! The event loop is pumped with a timeout instead of being handed control,
//! so the engine's main loop stays in charge. Wake-ups from other threads are
//! user events sent through an [`EventLoopProxy`].
//!
//! `winit` has no graphics API of its own: a context here is the window's
//! presentation surface. Binding is tracked per thread and presenting only
//! notifies the window system. The system clipboard goes through `arboard`,
//! opened on first use.

use crate::platform::input::translate_winit_input;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tandem_core::config::WindowConfig;
use tandem_core::platform::{
    ContextBackend, CursorIcon, CursorId, CursorImage, DisplayMode, MainWaker, MonitorInfo,
    NativeEvent, NativeWindow, NativeWindows, SystemCursor, WindowAttribute, WindowEventKind,
    WindowGeometry,
};
use tandem_core::{ContextHandle, PlatformError};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalPosition, LogicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy};
use winit::monitor::{MonitorHandle, VideoModeHandle};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{CursorIcon as WinitCursorIcon, CustomCursor, Fullscreen, Icon, Window, WindowId};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The user event that interrupts a pump.
#[derive(Debug, Clone, Copy)]
pub struct WakeSignal;

struct WinitWaker {
    proxy: Mutex<EventLoopProxy<WakeSignal>>,
}

impl MainWaker for WinitWaker {
    fn wake(&self) {
        if lock(&self.proxy).send_event(WakeSignal).is_err() {
            log::trace!("Event loop already closed; wake ignored.");
        }
    }
}

/// Per-thread binding of window surfaces.
#[derive(Default)]
pub struct WinitContexts {
    windows: RwLock<HashMap<ContextHandle, Arc<Window>>>,
    bound: Mutex<HashMap<ThreadId, ContextHandle>>,
}

impl WinitContexts {
    fn window(&self, context: ContextHandle) -> Result<Arc<Window>, PlatformError> {
        self.windows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&context)
            .cloned()
            .ok_or(PlatformError::UnknownWindow(context))
    }

    fn insert(&self, context: ContextHandle, window: Arc<Window>) {
        self.windows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(context, window);
    }

    fn remove(&self, context: ContextHandle) {
        self.windows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&context);
    }
}

impl ContextBackend for WinitContexts {
    fn make_current(&self, context: ContextHandle) -> Result<(), PlatformError> {
        if !context.is_none() {
            self.window(context)?;
        }
        lock(&self.bound).insert(thread::current().id(), context);
        Ok(())
    }

    fn swap_buffers(&self, context: ContextHandle) -> Result<(), PlatformError> {
        self.window(context)?.pre_present_notify();
        Ok(())
    }

    fn set_swap_interval(&self, context: ContextHandle, interval: u32) -> Result<(), PlatformError> {
        log::debug!("Swap interval {interval} requested for {context}; presentation is driven by the compositor.");
        Ok(())
    }

    fn clear(&self, context: ContextHandle, _color: [f32; 4]) -> Result<(), PlatformError> {
        self.window(context).map(drop)
    }
}

struct WindowSlot {
    window: Arc<Window>,
    maximized: bool,
}

/// A desktop window system backed by a pumped `winit` event loop.
pub struct WinitPlatform {
    event_loop: EventLoop<WakeSignal>,
    waker: Arc<WinitWaker>,
    contexts: Arc<WinitContexts>,
    windows: HashMap<ContextHandle, WindowSlot>,
    ids: HashMap<WindowId, ContextHandle>,
    next_handle: u64,
    cursors: HashMap<CursorId, CustomCursor>,
    next_cursor: u64,
    clipboard: Option<arboard::Clipboard>,
}

impl WinitPlatform {
    /// Opens the connection to the display server.
    ///
    /// Must be called on the thread that will play the main role.
    pub fn new() -> Result<Self, PlatformError> {
        let event_loop = EventLoop::<WakeSignal>::with_user_event()
            .build()
            .map_err(|err| PlatformError::Backend(err.to_string()))?;
        let proxy = event_loop.create_proxy();
        log::info!("Winit event loop created.");
        Ok(Self {
            event_loop,
            waker: Arc::new(WinitWaker {
                proxy: Mutex::new(proxy),
            }),
            contexts: Arc::new(WinitContexts::default()),
            windows: HashMap::new(),
            ids: HashMap::new(),
            next_handle: 0,
            cursors: HashMap::new(),
            next_cursor: 0,
            clipboard: None,
        })
    }

    fn window(&self, context: ContextHandle) -> Result<&Window, PlatformError> {
        self.windows
            .get(&context)
            .map(|slot| slot.window.as_ref())
            .ok_or(PlatformError::UnknownWindow(context))
    }

    fn system_clipboard(&mut self) -> Result<&mut arboard::Clipboard, PlatformError> {
        if self.clipboard.is_none() {
            self.clipboard = Some(arboard::Clipboard::new().map_err(clipboard_error)?);
            log::debug!("System clipboard opened.");
        }
        self.clipboard
            .as_mut()
            .ok_or_else(|| PlatformError::Backend("the system clipboard is unavailable".to_string()))
    }

    /// Monitors as seen from any live window, primary first.
    fn monitor_handles(&self) -> Vec<MonitorHandle> {
        let Some(slot) = self.windows.values().next() else {
            return Vec::new();
        };
        let mut monitors: Vec<_> = slot.window.available_monitors().collect();
        if let Some(primary) = slot.window.primary_monitor() {
            if let Some(index) = monitors.iter().position(|m| *m == primary) {
                monitors[..=index].rotate_right(1);
            }
        }
        monitors
    }

    fn fullscreen(&self, monitor: usize, mode: Option<DisplayMode>) -> Result<Fullscreen, PlatformError> {
        let handle = self
            .monitor_handles()
            .into_iter()
            .nth(monitor)
            .ok_or_else(|| PlatformError::Backend(format!("no monitor #{monitor}")))?;
        let Some(mode) = mode else {
            return Ok(Fullscreen::Borderless(Some(handle)));
        };
        handle
            .video_modes()
            .find(|video| display_mode(video) == mode)
            .map(Fullscreen::Exclusive)
            .ok_or(PlatformError::Unsupported("display mode"))
    }
}

impl NativeWindows for WinitPlatform {
    fn waker(&self) -> Arc<dyn MainWaker> {
        self.waker.clone()
    }

    fn context_backend(&self) -> Arc<dyn ContextBackend> {
        self.contexts.clone()
    }

    fn wait_events(&mut self, timeout: Duration) -> Result<Vec<NativeEvent>, PlatformError> {
        let mut collector = Collector {
            ids: &self.ids,
            windows: &mut self.windows,
            events: Vec::new(),
        };
        match self.event_loop.pump_app_events(Some(timeout), &mut collector) {
            PumpStatus::Continue => Ok(collector.events),
            PumpStatus::Exit(code) => Err(PlatformError::Backend(format!(
                "event loop exited with code {code}"
            ))),
        }
    }

    #[allow(deprecated)]
    fn create_window(
        &mut self,
        config: &WindowConfig,
        shared_with: ContextHandle,
    ) -> Result<NativeWindow, PlatformError> {
        let mut attributes = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(LogicalSize::new(config.width, config.height))
            .with_visible(false)
            .with_resizable(config.resizable)
            .with_decorations(config.decorated)
            .with_maximized(config.maximized);
        if let Some((x, y)) = config.position {
            attributes = attributes.with_position(LogicalPosition::new(x, y));
        }
        if let Some((width, height)) = config.min_size {
            attributes = attributes.with_min_inner_size(LogicalSize::new(width, height));
        }
        if let Some((width, height)) = config.max_size {
            attributes = attributes.with_max_inner_size(LogicalSize::new(width, height));
        }

        let window = self
            .event_loop
            .create_window(attributes)
            .map_err(|err| PlatformError::CreationFailed {
                what: "window",
                reason: err.to_string(),
            })?;
        let window = Arc::new(window);

        self.next_handle += 1;
        let context = ContextHandle::new(self.next_handle);
        if !shared_with.is_none() {
            log::trace!("{context} shares surfaces with {shared_with}; nothing to share under winit.");
        }
        let geometry = read_geometry(&window);
        self.ids.insert(window.id(), context);
        self.contexts.insert(context, Arc::clone(&window));
        self.windows.insert(
            context,
            WindowSlot {
                maximized: window.is_maximized(),
                window,
            },
        );
        log::info!(
            "Winit window {context} created ('{}', {}x{}).",
            config.title,
            geometry.width,
            geometry.height
        );
        Ok(NativeWindow { context, geometry })
    }

    fn destroy_window(&mut self, context: ContextHandle) -> Result<(), PlatformError> {
        let slot = self
            .windows
            .remove(&context)
            .ok_or(PlatformError::UnknownWindow(context))?;
        self.ids.remove(&slot.window.id());
        self.contexts.remove(context);
        log::info!("Winit window {context} destroyed.");
        Ok(())
    }

    fn apply(&mut self, context: ContextHandle, attribute: WindowAttribute) -> Result<(), PlatformError> {
        // Resolved before borrowing the window.
        let fullscreen = match &attribute {
            WindowAttribute::Fullscreen { monitor, mode } => Some(self.fullscreen(*monitor, *mode)?),
            _ => None,
        };
        let cursor = match &attribute {
            WindowAttribute::Cursor(CursorIcon::Custom(id)) => Some(
                self.cursors
                    .get(id)
                    .cloned()
                    .ok_or_else(|| PlatformError::Backend(format!("unknown cursor #{}", id.0)))?,
            ),
            _ => None,
        };

        let window = self.window(context)?;
        match attribute {
            WindowAttribute::Title(title) => window.set_title(&title),
            WindowAttribute::Position { x, y } => window.set_outer_position(LogicalPosition::new(x, y)),
            WindowAttribute::Size { width, height } => {
                let _ = window.request_inner_size(LogicalSize::new(width, height));
            }
            WindowAttribute::Visible(visible) => window.set_visible(visible),
            WindowAttribute::Decorated(decorated) => window.set_decorations(decorated),
            WindowAttribute::Resizable(resizable) => window.set_resizable(resizable),
            WindowAttribute::SizeLimits { min, max } => {
                window.set_min_inner_size(min.map(|(w, h)| LogicalSize::new(w, h)));
                window.set_max_inner_size(max.map(|(w, h)| LogicalSize::new(w, h)));
            }
            WindowAttribute::Iconify => window.set_minimized(true),
            WindowAttribute::Restore => {
                window.set_minimized(false);
                window.set_maximized(false);
            }
            WindowAttribute::Maximize => window.set_maximized(true),
            WindowAttribute::Focus => window.focus_window(),
            WindowAttribute::Icon(image) => {
                let icon = image
                    .map(|image| Icon::from_rgba(image.rgba().to_vec(), image.width(), image.height()))
                    .transpose()
                    .map_err(|err| PlatformError::CreationFailed {
                        what: "icon",
                        reason: err.to_string(),
                    })?;
                window.set_window_icon(icon);
            }
            WindowAttribute::Fullscreen { .. } => window.set_fullscreen(fullscreen),
            WindowAttribute::Windowed { width, height } => {
                window.set_fullscreen(None);
                let _ = window.request_inner_size(LogicalSize::new(width, height));
            }
            WindowAttribute::Cursor(CursorIcon::System(shape)) => window.set_cursor(system_cursor(shape)),
            WindowAttribute::Cursor(CursorIcon::Custom(_)) => {
                if let Some(cursor) = cursor {
                    window.set_cursor(cursor);
                }
            }
        }
        Ok(())
    }

    fn geometry(&self, context: ContextHandle) -> Result<WindowGeometry, PlatformError> {
        self.window(context).map(read_geometry)
    }

    fn monitors(&self) -> Vec<MonitorInfo> {
        self.monitor_handles().iter().map(monitor_info).collect()
    }

    fn clipboard_text(&mut self) -> Option<String> {
        let text = self
            .system_clipboard()
            .and_then(|clipboard| clipboard.get_text().map_err(clipboard_error));
        match text {
            Ok(text) => Some(text),
            Err(err) => {
                log::debug!("No clipboard text: {err}");
                None
            }
        }
    }

    fn set_clipboard_text(&mut self, text: &str) -> Result<(), PlatformError> {
        self.system_clipboard()?
            .set_text(text)
            .map_err(clipboard_error)
    }

    #[allow(deprecated)]
    fn create_cursor(&mut self, image: &CursorImage) -> Result<CursorId, PlatformError> {
        let dimension = |value: u32| {
            u16::try_from(value).map_err(|_| PlatformError::CreationFailed {
                what: "cursor",
                reason: format!("{value} does not fit a cursor dimension"),
            })
        };
        let source = CustomCursor::from_rgba(
            image.image.rgba().to_vec(),
            dimension(image.image.width())?,
            dimension(image.image.height())?,
            dimension(image.hotspot_x)?,
            dimension(image.hotspot_y)?,
        )
        .map_err(|err| PlatformError::CreationFailed {
            what: "cursor",
            reason: err.to_string(),
        })?;
        let cursor = self.event_loop.create_custom_cursor(source);

        self.next_cursor += 1;
        let id = CursorId(self.next_cursor);
        self.cursors.insert(id, cursor);
        Ok(id)
    }

    fn destroy_cursor(&mut self, cursor: CursorId) {
        self.cursors.remove(&cursor);
    }

    fn terminate(&mut self) {
        if !self.windows.is_empty() {
            log::warn!("Terminating with {} live window(s).", self.windows.len());
        }
        for context in self.windows.keys() {
            self.contexts.remove(*context);
        }
        self.windows.clear();
        self.ids.clear();
        self.cursors.clear();
        self.clipboard = None;
        log::info!("Winit platform terminated.");
    }
}

fn clipboard_error(err: arboard::Error) -> PlatformError {
    PlatformError::Backend(format!("clipboard: {err}"))
}

/// Collects the events of one pump.
struct Collector<'a> {
    ids: &'a HashMap<WindowId, ContextHandle>,
    windows: &'a mut HashMap<ContextHandle, WindowSlot>,
    events: Vec<NativeEvent>,
}

impl ApplicationHandler<WakeSignal> for Collector<'_> {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(&context) = self.ids.get(&window_id) else {
            return;
        };
        let Some(slot) = self.windows.get_mut(&context) else {
            return;
        };
        let scale = slot.window.scale_factor();
        let mut push = |kind| self.events.push(NativeEvent::new(context, kind));

        match &event {
            WindowEvent::Focused(focused) => push(WindowEventKind::Focused(*focused)),
            // The closest thing to minimization winit reports everywhere.
            WindowEvent::Occluded(occluded) => push(WindowEventKind::Iconified(*occluded)),
            WindowEvent::CloseRequested => push(WindowEventKind::CloseRequested),
            WindowEvent::DroppedFile(path) => push(WindowEventKind::FilesDropped(vec![path.clone()])),
            WindowEvent::RedrawRequested => push(WindowEventKind::RefreshRequested),
            WindowEvent::Resized(size) => {
                let logical = size.to_logical::<u32>(scale);
                push(WindowEventKind::Resized {
                    width: logical.width,
                    height: logical.height,
                });
                push(WindowEventKind::FramebufferResized {
                    width: size.width,
                    height: size.height,
                });
                let maximized = slot.window.is_maximized();
                if maximized != slot.maximized {
                    slot.maximized = maximized;
                    push(WindowEventKind::Maximized(maximized));
                }
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = slot.window.inner_size();
                push(WindowEventKind::FramebufferResized {
                    width: size.width,
                    height: size.height,
                });
            }
            WindowEvent::Moved(position) => {
                let logical = position.to_logical::<i32>(scale);
                push(WindowEventKind::Moved {
                    x: logical.x,
                    y: logical.y,
                });
            }
            WindowEvent::CursorEntered { .. } => push(WindowEventKind::CursorEntered(true)),
            WindowEvent::CursorLeft { .. } => push(WindowEventKind::CursorEntered(false)),
            other => {
                if let Some(input) = translate_winit_input(other, scale) {
                    push(WindowEventKind::Input(input));
                }
            }
        }
    }
}

fn read_geometry(window: &Window) -> WindowGeometry {
    let scale_factor = window.scale_factor();
    let physical = window.inner_size();
    let logical = physical.to_logical::<u32>(scale_factor);
    let position = window
        .outer_position()
        .map(|position| position.to_logical::<i32>(scale_factor))
        .unwrap_or(LogicalPosition::new(0, 0));
    WindowGeometry {
        x: position.x,
        y: position.y,
        width: logical.width,
        height: logical.height,
        backbuffer_width: physical.width,
        backbuffer_height: physical.height,
        scale_factor,
    }
}

fn display_mode(video: &VideoModeHandle) -> DisplayMode {
    DisplayMode {
        width: video.size().width,
        height: video.size().height,
        refresh_rate: video.refresh_rate_millihertz() / 1000,
        bits_per_pixel: u32::from(video.bit_depth()),
    }
}

fn monitor_info(handle: &MonitorHandle) -> MonitorInfo {
    let modes: Vec<DisplayMode> = handle.video_modes().map(|video| display_mode(&video)).collect();
    let size = handle.size();
    let current_mode = DisplayMode {
        width: size.width,
        height: size.height,
        refresh_rate: handle.refresh_rate_millihertz().unwrap_or(0) / 1000,
        bits_per_pixel: modes.first().map_or(24, |mode| mode.bits_per_pixel),
    };
    let position = handle.position();
    MonitorInfo {
        name: handle.name().unwrap_or_default(),
        position: (position.x, position.y),
        current_mode,
        modes,
        scale_factor: handle.scale_factor(),
    }
}

fn system_cursor(shape: SystemCursor) -> WinitCursorIcon {
    match shape {
        SystemCursor::Arrow => WinitCursorIcon::Default,
        SystemCursor::Ibeam => WinitCursorIcon::Text,
        SystemCursor::Crosshair => WinitCursorIcon::Crosshair,
        SystemCursor::Hand => WinitCursorIcon::Pointer,
        SystemCursor::HorizontalResize => WinitCursorIcon::EwResize,
        SystemCursor::VerticalResize => WinitCursorIcon::NsResize,
        SystemCursor::NotAllowed => WinitCursorIcon::NotAllowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_cursors_use_css_names() {
        assert_eq!(system_cursor(SystemCursor::default()), WinitCursorIcon::Default);
        assert_eq!(system_cursor(SystemCursor::Hand), WinitCursorIcon::Pointer);
        assert_eq!(system_cursor(SystemCursor::Ibeam), WinitCursorIcon::Text);
    }

    #[test]
    fn unknown_surface_cannot_be_bound() {
        let contexts = WinitContexts::default();
        assert!(matches!(
            contexts.make_current(ContextHandle::new(7)),
            Err(PlatformError::UnknownWindow(_))
        ));
        contexts.make_current(ContextHandle::NONE).unwrap();
    }

    #[test]
    fn clipboard_failures_surface_as_backend_errors() {
        let err = clipboard_error(arboard::Error::ContentNotAvailable);
        match err {
            PlatformError::Backend(reason) => assert!(reason.starts_with("clipboard: ")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
