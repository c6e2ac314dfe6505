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

//! Cross-thread choreography of the delegation channel and the arbiter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tandem_core::config::WindowConfig;
use tandem_core::delegate::direct;
use tandem_core::platform::{
    ContextBackend, CursorId, CursorImage, MainWaker, MonitorInfo, NativeEvent, NativeWindow,
    NativeWindows, WindowAttribute, WindowGeometry,
};
use tandem_core::{
    ContextArbiter, ContextHandle, ContextRegistry, CoordinationError, DelegationChannel, Executor,
    PlatformError, ThreadRole,
};

/// Records which thread has which context bound and counts double bindings.
#[derive(Default)]
struct TrackingBackend {
    bound: Mutex<HashMap<ThreadId, ContextHandle>>,
    violations: AtomicUsize,
}

impl TrackingBackend {
    fn bound_here(&self) -> ContextHandle {
        self.bound
            .lock()
            .unwrap()
            .get(&thread::current().id())
            .copied()
            .unwrap_or(ContextHandle::NONE)
    }
}

impl ContextBackend for TrackingBackend {
    fn make_current(&self, context: ContextHandle) -> Result<(), PlatformError> {
        let mut bound = self.bound.lock().unwrap();
        let me = thread::current().id();
        if !context.is_none() && bound.iter().any(|(id, c)| *id != me && *c == context) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        bound.insert(me, context);
        Ok(())
    }
    fn swap_buffers(&self, _: ContextHandle) -> Result<(), PlatformError> {
        Ok(())
    }
    fn set_swap_interval(&self, _: ContextHandle, _: u32) -> Result<(), PlatformError> {
        Ok(())
    }
    fn clear(&self, _: ContextHandle, _: [f32; 4]) -> Result<(), PlatformError> {
        Ok(())
    }
}

#[derive(Default)]
struct CountingWaker(AtomicUsize);

impl MainWaker for CountingWaker {
    fn wake(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// A window system with nothing behind it; the tests only need a main executor.
struct NoWindows {
    backend: Arc<TrackingBackend>,
    waker: Arc<CountingWaker>,
}

impl NativeWindows for NoWindows {
    fn waker(&self) -> Arc<dyn MainWaker> {
        self.waker.clone()
    }
    fn context_backend(&self) -> Arc<dyn ContextBackend> {
        self.backend.clone()
    }
    fn wait_events(&mut self, _: Duration) -> Result<Vec<NativeEvent>, PlatformError> {
        Ok(Vec::new())
    }
    fn create_window(&mut self, _: &WindowConfig, _: ContextHandle) -> Result<NativeWindow, PlatformError> {
        Err(PlatformError::Unsupported("windows"))
    }
    fn destroy_window(&mut self, context: ContextHandle) -> Result<(), PlatformError> {
        Err(PlatformError::UnknownWindow(context))
    }
    fn apply(&mut self, context: ContextHandle, _: WindowAttribute) -> Result<(), PlatformError> {
        Err(PlatformError::UnknownWindow(context))
    }
    fn geometry(&self, context: ContextHandle) -> Result<WindowGeometry, PlatformError> {
        Err(PlatformError::UnknownWindow(context))
    }
    fn monitors(&self) -> Vec<MonitorInfo> {
        Vec::new()
    }
    fn clipboard_text(&mut self) -> Option<String> {
        None
    }
    fn set_clipboard_text(&mut self, _: &str) -> Result<(), PlatformError> {
        Ok(())
    }
    fn create_cursor(&mut self, _: &CursorImage) -> Result<CursorId, PlatformError> {
        Err(PlatformError::Unsupported("cursors"))
    }
    fn destroy_cursor(&mut self, _: CursorId) {}
    fn terminate(&mut self) {}
}

struct Fixture {
    channel: Arc<DelegationChannel<()>>,
    backend: Arc<TrackingBackend>,
    native: NoWindows,
}

fn fixture(contexts: &[u64]) -> Fixture {
    let registry = Arc::new(ContextRegistry::new());
    for raw in contexts {
        registry.register(ContextHandle::new(*raw)).unwrap();
    }
    let backend = Arc::new(TrackingBackend::default());
    let waker = Arc::new(CountingWaker::default());
    let arbiter = Arc::new(ContextArbiter::new(registry, backend.clone()));
    let channel = Arc::new(DelegationChannel::new(arbiter, waker.clone()));
    channel.bind_current_thread(ThreadRole::Main);
    Fixture {
        channel,
        backend: backend.clone(),
        native: NoWindows { backend, waker },
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn main_work_can_take_the_context_the_render_thread_is_blocked_on() {
    // --- ARRANGE ---
    let Fixture {
        channel,
        backend,
        mut native,
    } = fixture(&[42]);
    let ctx = ContextHandle::new(42);

    // --- ACT ---
    let render = {
        let channel = Arc::clone(&channel);
        let backend = Arc::clone(&backend);
        thread::spawn(move || {
            channel.bind_current_thread(ThreadRole::Render);
            channel.arbiter().acquire(ThreadRole::Render, ctx).unwrap();

            let seen = channel
                .post_blocking(ThreadRole::Main, ctx, ContextHandle::NONE, |scope| {
                    scope.make_current()?;
                    Ok(scope.arbiter().current(ThreadRole::Main))
                })
                .unwrap();
            (seen, channel.arbiter().current(ThreadRole::Render), backend.bound_here())
        })
    };
    while !render.is_finished() {
        channel.drain(ctx, Executor::Main(&mut native)).unwrap();
        thread::sleep(Duration::from_millis(1));
    }
    let (seen_by_main, render_current, render_bound) = render.join().unwrap();

    // --- ASSERT ---
    assert_eq!(seen_by_main, ctx);
    assert_eq!(render_current, ctx, "the render thread resumed its context");
    assert_eq!(render_bound, ctx);
    assert_eq!(channel.arbiter().current(ThreadRole::Main), ContextHandle::NONE);
    assert_eq!(backend.bound_here(), ContextHandle::NONE);
    assert_eq!(backend.violations.load(Ordering::SeqCst), 0);
}

#[test]
fn interrupted_wait_returns_default_and_discards_the_late_result() {
    // --- ARRANGE ---
    let Fixture {
        channel,
        mut native,
        ..
    } = fixture(&[]);
    let ran = Arc::new(AtomicBool::new(false));

    // --- ACT ---
    let render = {
        let channel = Arc::clone(&channel);
        let ran = Arc::clone(&ran);
        thread::spawn(move || {
            channel.bind_current_thread(ThreadRole::Render);
            channel
                .post_blocking(ThreadRole::Main, ContextHandle::NONE, 7, move |_| {
                    ran.store(true, Ordering::SeqCst);
                    Ok(99)
                })
                .unwrap()
        })
    };
    wait_until(|| {
        channel
            .registry()
            .pending(ThreadRole::Main, ContextHandle::NONE)
            == 1
    });
    channel.interrupt(ThreadRole::Render);
    let value = render.join().unwrap();
    let drained = channel
        .drain(ContextHandle::NONE, Executor::Main(&mut native))
        .unwrap();

    // --- ASSERT ---
    assert_eq!(value, 7);
    assert_eq!(drained, 1, "the orphaned item still runs");
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn unregistering_the_target_releases_blocked_callers() {
    // --- ARRANGE ---
    let Fixture { channel, .. } = fixture(&[10]);
    let ctx = ContextHandle::new(10);

    // --- ACT ---
    let render = {
        let channel = Arc::clone(&channel);
        thread::spawn(move || {
            channel.bind_current_thread(ThreadRole::Render);
            channel
                .post_blocking(ThreadRole::Main, ctx, "default", |_| Ok("ran"))
                .unwrap()
        })
    };
    wait_until(|| channel.registry().pending(ThreadRole::Main, ctx) == 1);
    let dropped = channel.registry().unregister(ctx);

    // --- ASSERT ---
    assert_eq!(dropped, 1);
    assert_eq!(render.join().unwrap(), "default");
}

#[test]
fn closing_the_main_queue_releases_blocked_callers() {
    // --- ARRANGE ---
    let Fixture { channel, .. } = fixture(&[]);

    // --- ACT ---
    let render = {
        let channel = Arc::clone(&channel);
        thread::spawn(move || {
            channel.bind_current_thread(ThreadRole::Render);
            channel
                .post_blocking(ThreadRole::Main, ContextHandle::NONE, false, |_| Ok(true))
                .unwrap()
        })
    };
    wait_until(|| {
        channel
            .registry()
            .pending(ThreadRole::Main, ContextHandle::NONE)
            == 1
    });
    channel.close(ThreadRole::Main);

    // --- ASSERT ---
    assert!(!render.join().unwrap());
}

#[test]
fn each_producer_keeps_its_own_order() {
    // --- ARRANGE ---
    let Fixture {
        channel,
        mut native,
        ..
    } = fixture(&[]);
    let seen = Arc::new(Mutex::new(Vec::new()));

    // --- ACT ---
    let producers: Vec<_> = (0..3u32)
        .map(|producer| {
            let channel = Arc::clone(&channel);
            let seen = Arc::clone(&seen);
            thread::spawn(move || {
                for n in 0..50u32 {
                    let seen = Arc::clone(&seen);
                    channel
                        .post_async(ThreadRole::Main, ContextHandle::NONE, move |_| {
                            seen.lock().unwrap().push((producer, n));
                            Ok(())
                        })
                        .unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    let drained = channel
        .drain(ContextHandle::NONE, Executor::Main(&mut native))
        .unwrap();

    // --- ASSERT ---
    assert_eq!(drained, 150);
    let seen = seen.lock().unwrap();
    for producer in 0..3u32 {
        let order: Vec<u32> = seen
            .iter()
            .filter(|(p, _)| *p == producer)
            .map(|(_, n)| *n)
            .collect();
        assert_eq!(order, (0..50).collect::<Vec<_>>());
    }
}

#[test]
fn direct_main_call_runs_after_work_queued_before_it() {
    // --- ARRANGE ---
    // Single-threaded layout: one thread plays both roles.
    let Fixture { channel, native, .. } = fixture(&[]);
    channel.bind_current_thread(ThreadRole::Render);
    assert!(direct::install(Box::new(native)).is_ok());
    let order = Arc::new(Mutex::new(Vec::new()));
    {
        let order = Arc::clone(&order);
        channel
            .post_async(ThreadRole::Main, ContextHandle::NONE, move |_| {
                order.lock().unwrap().push("queued");
                Ok(())
            })
            .unwrap();
    }

    // --- ACT ---
    let value = {
        let order = Arc::clone(&order);
        channel
            .post_blocking(ThreadRole::Main, ContextHandle::NONE, 0, move |scope| {
                order.lock().unwrap().push("direct");
                scope.native()?;
                Ok(7)
            })
            .unwrap()
    };
    let own_render = channel.post_blocking(ThreadRole::Render, ContextHandle::NONE, 0, |_| Ok(1));
    direct::uninstall();

    // --- ASSERT ---
    assert_eq!(value, 7);
    assert_eq!(*order.lock().unwrap(), ["queued", "direct"]);
    assert!(matches!(
        own_render,
        Err(CoordinationError::SelfBlocking(ThreadRole::Render))
    ));
}
