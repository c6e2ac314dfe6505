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

//! An in-memory window system.
//!
//! Windows exist only as bookkeeping. Events are injected through a
//! [`HeadlessController`], which also exposes what the engine did: which
//! windows it created and destroyed, which attributes it applied, and whether
//! a context was ever bound on two threads at once.

use crossbeam_channel::{Receiver, Sender};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tandem_core::config::WindowConfig;
use tandem_core::platform::{
    ContextBackend, CursorId, CursorImage, DisplayMode, MainWaker, MonitorInfo, NativeEvent,
    NativeWindow, NativeWindows, WindowAttribute, WindowEventKind, WindowGeometry,
};
use tandem_core::{ContextHandle, PlatformError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum HeadlessSignal {
    Wake,
    Event(NativeEvent),
}

/// A window as the headless backend sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessWindow {
    /// Title bar text.
    pub title: String,
    /// Current geometry.
    pub geometry: WindowGeometry,
    /// Whether the window is shown.
    pub visible: bool,
    /// The context it shares objects with.
    pub shared_with: ContextHandle,
}

#[derive(Default)]
struct HeadlessState {
    windows: BTreeMap<ContextHandle, HeadlessWindow>,
    created: Vec<ContextHandle>,
    destroyed: Vec<ContextHandle>,
    applied: Vec<(ContextHandle, WindowAttribute)>,
    handles: VecDeque<u64>,
    next_handle: u64,
    fail_next_window: Option<String>,
    clipboard: Option<String>,
    cursors: Vec<CursorId>,
    next_cursor: u64,
    terminated: usize,
}

impl HeadlessState {
    fn allocate_handle(&mut self) -> ContextHandle {
        if let Some(raw) = self.handles.pop_front() {
            return ContextHandle::new(raw);
        }
        loop {
            self.next_handle += 1;
            let handle = ContextHandle::new(self.next_handle);
            if !self.windows.contains_key(&handle) && !self.destroyed.contains(&handle) {
                return handle;
            }
        }
    }

    fn window_mut(&mut self, context: ContextHandle) -> Result<&mut HeadlessWindow, PlatformError> {
        self.windows
            .get_mut(&context)
            .ok_or(PlatformError::UnknownWindow(context))
    }
}

/// Graphics contexts without a GPU: binding is tracked per thread.
#[derive(Default)]
pub struct HeadlessContexts {
    bound: Mutex<HashMap<ThreadId, ContextHandle>>,
    violations: AtomicUsize,
    swaps: Mutex<HashMap<ContextHandle, u64>>,
    intervals: Mutex<HashMap<ContextHandle, u32>>,
}

impl HeadlessContexts {
    fn require_bound(&self, context: ContextHandle, op: &str) {
        let bound = lock(&self.bound).get(&thread::current().id()).copied();
        if bound != Some(context) {
            log::error!("{op} on {context}, which is not current on this thread.");
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl ContextBackend for HeadlessContexts {
    fn make_current(&self, context: ContextHandle) -> Result<(), PlatformError> {
        let me = thread::current().id();
        let mut bound = lock(&self.bound);
        if !context.is_none() {
            if let Some((other, _)) = bound.iter().find(|(id, c)| **id != me && **c == context) {
                log::error!("{context} made current on {me:?} while bound on {other:?}.");
                self.violations.fetch_add(1, Ordering::SeqCst);
            }
        }
        bound.insert(me, context);
        Ok(())
    }

    fn swap_buffers(&self, context: ContextHandle) -> Result<(), PlatformError> {
        self.require_bound(context, "Swap");
        *lock(&self.swaps).entry(context).or_default() += 1;
        Ok(())
    }

    fn set_swap_interval(&self, context: ContextHandle, interval: u32) -> Result<(), PlatformError> {
        self.require_bound(context, "Swap interval");
        lock(&self.intervals).insert(context, interval);
        Ok(())
    }

    fn clear(&self, context: ContextHandle, _color: [f32; 4]) -> Result<(), PlatformError> {
        self.require_bound(context, "Clear");
        Ok(())
    }
}

struct HeadlessWaker {
    tx: Sender<HeadlessSignal>,
}

impl MainWaker for HeadlessWaker {
    fn wake(&self) {
        let _ = self.tx.send(HeadlessSignal::Wake);
    }
}

/// A builder for [`HeadlessPlatform`] instances.
pub struct HeadlessPlatformBuilder {
    handles: Vec<u64>,
    scale_factor: f64,
    monitor: MonitorInfo,
}

impl HeadlessPlatformBuilder {
    /// Creates a builder with one 1920x1080 monitor and a scale factor of 1.
    pub fn new() -> Self {
        let mode = DisplayMode {
            width: 1920,
            height: 1080,
            refresh_rate: 60,
            bits_per_pixel: 24,
        };
        Self {
            handles: Vec::new(),
            scale_factor: 1.0,
            monitor: MonitorInfo {
                name: "Headless".to_string(),
                position: (0, 0),
                current_mode: mode,
                modes: vec![mode],
                scale_factor: 1.0,
            },
        }
    }

    /// Hands out these context handles, in order, before counting up from 1.
    pub fn with_handles(mut self, handles: impl IntoIterator<Item = u64>) -> Self {
        self.handles = handles.into_iter().collect();
        self
    }

    /// Sets the ratio between back-buffer pixels and logical units.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self.monitor.scale_factor = scale_factor;
        self
    }

    /// Replaces the single monitor.
    pub fn with_monitor(mut self, monitor: MonitorInfo) -> Self {
        self.monitor = monitor;
        self
    }

    /// Builds the platform and the controller that drives it.
    pub fn build(self) -> (HeadlessPlatform, HeadlessController) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let state = Arc::new(Mutex::new(HeadlessState {
            handles: self.handles.into_iter().collect(),
            ..HeadlessState::default()
        }));
        let contexts = Arc::new(HeadlessContexts::default());
        let waker = Arc::new(HeadlessWaker { tx: tx.clone() });
        let controller = HeadlessController {
            tx,
            state: Arc::clone(&state),
            contexts: Arc::clone(&contexts),
            scale_factor: self.scale_factor,
        };
        let platform = HeadlessPlatform {
            rx,
            state,
            contexts,
            waker,
            scale_factor: self.scale_factor,
            monitors: vec![self.monitor],
        };
        (platform, controller)
    }
}

impl Default for HeadlessPlatformBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`NativeWindows`] implementation with no display behind it.
pub struct HeadlessPlatform {
    rx: Receiver<HeadlessSignal>,
    state: Arc<Mutex<HeadlessState>>,
    contexts: Arc<HeadlessContexts>,
    waker: Arc<HeadlessWaker>,
    scale_factor: f64,
    monitors: Vec<MonitorInfo>,
}

impl HeadlessPlatform {
    /// Starts building a headless platform.
    pub fn builder() -> HeadlessPlatformBuilder {
        HeadlessPlatformBuilder::new()
    }

    fn backbuffer(&self, logical: u32) -> u32 {
        (f64::from(logical) * self.scale_factor).round() as u32
    }

    fn resize(&self, geometry: &mut WindowGeometry, width: u32, height: u32) {
        geometry.width = width;
        geometry.height = height;
        geometry.backbuffer_width = self.backbuffer(width);
        geometry.backbuffer_height = self.backbuffer(height);
    }
}

impl NativeWindows for HeadlessPlatform {
    fn waker(&self) -> Arc<dyn MainWaker> {
        self.waker.clone()
    }

    fn context_backend(&self) -> Arc<dyn ContextBackend> {
        self.contexts.clone()
    }

    fn wait_events(&mut self, timeout: Duration) -> Result<Vec<NativeEvent>, PlatformError> {
        let first = if timeout.is_zero() {
            self.rx.try_recv().ok()
        } else {
            self.rx.recv_timeout(timeout).ok()
        };
        let events = first
            .into_iter()
            .chain(self.rx.try_iter())
            .filter_map(|signal| match signal {
                HeadlessSignal::Event(event) => Some(event),
                HeadlessSignal::Wake => None,
            })
            .collect();
        Ok(events)
    }

    fn create_window(
        &mut self,
        config: &WindowConfig,
        shared_with: ContextHandle,
    ) -> Result<NativeWindow, PlatformError> {
        let mut state = lock(&self.state);
        if let Some(reason) = state.fail_next_window.take() {
            return Err(PlatformError::CreationFailed {
                what: "window",
                reason,
            });
        }
        let context = state.allocate_handle();
        let (x, y) = config.position.unwrap_or((0, 0));
        let mut geometry = WindowGeometry {
            x,
            y,
            scale_factor: self.scale_factor,
            ..WindowGeometry::default()
        };
        self.resize(&mut geometry, config.width, config.height);
        state.windows.insert(
            context,
            HeadlessWindow {
                title: config.title.clone(),
                geometry,
                visible: false,
                shared_with,
            },
        );
        state.created.push(context);
        log::debug!("Headless window {context} created ({}x{}).", config.width, config.height);
        Ok(NativeWindow { context, geometry })
    }

    fn destroy_window(&mut self, context: ContextHandle) -> Result<(), PlatformError> {
        let mut state = lock(&self.state);
        if state.windows.remove(&context).is_none() {
            return Err(PlatformError::UnknownWindow(context));
        }
        state.destroyed.push(context);
        log::debug!("Headless window {context} destroyed.");
        Ok(())
    }

    fn apply(&mut self, context: ContextHandle, attribute: WindowAttribute) -> Result<(), PlatformError> {
        let mut state = lock(&self.state);
        let window = state.window_mut(context)?;
        match &attribute {
            WindowAttribute::Title(title) => window.title = title.clone(),
            WindowAttribute::Visible(visible) => window.visible = *visible,
            WindowAttribute::Position { x, y } => {
                window.geometry.x = *x;
                window.geometry.y = *y;
            }
            WindowAttribute::Size { width, height } | WindowAttribute::Windowed { width, height } => {
                self.resize(&mut window.geometry, *width, *height);
            }
            WindowAttribute::Fullscreen { monitor, mode } => {
                let monitor = self
                    .monitors
                    .get(*monitor)
                    .ok_or_else(|| PlatformError::Backend(format!("no monitor #{monitor}")))?;
                let mode = mode.unwrap_or(monitor.current_mode);
                window.geometry.x = monitor.position.0;
                window.geometry.y = monitor.position.1;
                self.resize(&mut window.geometry, mode.width, mode.height);
            }
            _ => {}
        }
        state.applied.push((context, attribute));
        Ok(())
    }

    fn geometry(&self, context: ContextHandle) -> Result<WindowGeometry, PlatformError> {
        lock(&self.state)
            .windows
            .get(&context)
            .map(|window| window.geometry)
            .ok_or(PlatformError::UnknownWindow(context))
    }

    fn monitors(&self) -> Vec<MonitorInfo> {
        self.monitors.clone()
    }

    fn clipboard_text(&mut self) -> Option<String> {
        lock(&self.state).clipboard.clone()
    }

    fn set_clipboard_text(&mut self, text: &str) -> Result<(), PlatformError> {
        lock(&self.state).clipboard = Some(text.to_string());
        Ok(())
    }

    fn create_cursor(&mut self, image: &CursorImage) -> Result<CursorId, PlatformError> {
        let mut state = lock(&self.state);
        state.next_cursor += 1;
        let cursor = CursorId(state.next_cursor);
        state.cursors.push(cursor);
        log::debug!(
            "Headless cursor {} created ({}x{}).",
            cursor.0,
            image.image.width(),
            image.image.height()
        );
        Ok(cursor)
    }

    fn destroy_cursor(&mut self, cursor: CursorId) {
        lock(&self.state).cursors.retain(|c| *c != cursor);
    }

    fn terminate(&mut self) {
        let mut state = lock(&self.state);
        state.terminated += 1;
        if !state.windows.is_empty() {
            log::warn!("Headless platform terminated with {} live window(s).", state.windows.len());
        }
        log::info!("Headless platform terminated.");
    }
}

/// Drives a [`HeadlessPlatform`] from any thread and inspects what it saw.
#[derive(Clone)]
pub struct HeadlessController {
    tx: Sender<HeadlessSignal>,
    state: Arc<Mutex<HeadlessState>>,
    contexts: Arc<HeadlessContexts>,
    scale_factor: f64,
}

impl HeadlessController {
    /// Delivers `kind` to the main thread as if the window system reported it.
    pub fn inject(&self, context: ContextHandle, kind: WindowEventKind) {
        let _ = self.tx.send(HeadlessSignal::Event(NativeEvent::new(context, kind)));
    }

    /// Simulates the user clicking the close button.
    pub fn request_close(&self, context: ContextHandle) {
        self.inject(context, WindowEventKind::CloseRequested);
    }

    /// Simulates a user resize, reporting both the logical and back-buffer sizes.
    pub fn resize(&self, context: ContextHandle, width: u32, height: u32) {
        let backbuffer = |logical: u32| (f64::from(logical) * self.scale_factor).round() as u32;
        if let Some(window) = lock(&self.state).windows.get_mut(&context) {
            window.geometry.width = width;
            window.geometry.height = height;
            window.geometry.backbuffer_width = backbuffer(width);
            window.geometry.backbuffer_height = backbuffer(height);
        }
        self.inject(context, WindowEventKind::Resized { width, height });
        self.inject(
            context,
            WindowEventKind::FramebufferResized {
                width: backbuffer(width),
                height: backbuffer(height),
            },
        );
    }

    /// Makes the next window creation fail with `reason`.
    pub fn fail_next_window(&self, reason: impl Into<String>) {
        lock(&self.state).fail_next_window = Some(reason.into());
    }

    /// Windows that are currently alive.
    pub fn alive_windows(&self) -> Vec<ContextHandle> {
        lock(&self.state).windows.keys().copied().collect()
    }

    /// A snapshot of a live window.
    pub fn window(&self, context: ContextHandle) -> Option<HeadlessWindow> {
        lock(&self.state).windows.get(&context).cloned()
    }

    /// Every window created so far, in creation order.
    pub fn created(&self) -> Vec<ContextHandle> {
        lock(&self.state).created.clone()
    }

    /// Every window destroyed so far, in destruction order.
    pub fn destroyed(&self) -> Vec<ContextHandle> {
        lock(&self.state).destroyed.clone()
    }

    /// Every attribute applied so far.
    pub fn applied(&self) -> Vec<(ContextHandle, WindowAttribute)> {
        lock(&self.state).applied.clone()
    }

    /// The clipboard contents.
    pub fn clipboard(&self) -> Option<String> {
        lock(&self.state).clipboard.clone()
    }

    /// Custom cursors not yet destroyed.
    pub fn live_cursors(&self) -> Vec<CursorId> {
        lock(&self.state).cursors.clone()
    }

    /// How many times the platform was terminated.
    pub fn terminated(&self) -> usize {
        lock(&self.state).terminated
    }

    /// Times a context was bound on two threads, or used where it was not bound.
    pub fn violations(&self) -> usize {
        self.contexts.violations.load(Ordering::SeqCst)
    }

    /// Buffer swaps presented for `context`.
    pub fn swap_count(&self, context: ContextHandle) -> u64 {
        lock(&self.contexts.swaps).get(&context).copied().unwrap_or(0)
    }

    /// The swap interval last set for `context`.
    pub fn swap_interval(&self, context: ContextHandle) -> Option<u32> {
        lock(&self.contexts.intervals).get(&context).copied()
    }
}
