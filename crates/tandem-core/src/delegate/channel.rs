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

//! The bidirectional queue-and-wake primitive.

use super::arbiter::ContextArbiter;
use super::registry::ContextRegistry;
use super::scope::TaskScope;
use super::{direct, lock, WorkItem};
use crate::context::{ContextHandle, ThreadRole};
use crate::error::CoordinationError;
use crate::platform::{MainWaker, NativeWindows};
use crossbeam_channel::{select, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Who is draining a queue, and with what.
pub enum Executor<'a, S> {
    /// The main thread, holding the native window system.
    Main(&'a mut dyn NativeWindows),
    /// The render thread, holding its state.
    Render(&'a mut S),
}

impl<S> Executor<'_, S> {
    /// The role this executor drains for.
    pub fn role(&self) -> ThreadRole {
        match self {
            Executor::Main(_) => ThreadRole::Main,
            Executor::Render(_) => ThreadRole::Render,
        }
    }
}

/// Moves work between the main and render threads.
///
/// Work is queued per `(role, context)` and runs in posting order for any one
/// producer. Blocking posts release the caller's hold on the target context
/// before waiting and take it back afterwards, so the other thread can make
/// that context current to finish the job.
pub struct DelegationChannel<S> {
    registry: Arc<ContextRegistry<S>>,
    arbiter: Arc<ContextArbiter<S>>,
    main_waker: Arc<dyn MainWaker>,
    render_wake_tx: Sender<()>,
    render_wake_rx: Receiver<()>,
    interrupt_tx: [Sender<()>; 2],
    interrupt_rx: [Receiver<()>; 2],
    bound: Mutex<[Option<ThreadId>; 2]>,
}

impl<S: 'static> DelegationChannel<S> {
    /// Creates a channel over the arbiter's registry.
    pub fn new(arbiter: Arc<ContextArbiter<S>>, main_waker: Arc<dyn MainWaker>) -> Self {
        let (render_wake_tx, render_wake_rx) = crossbeam_channel::bounded(1);
        let (main_interrupt_tx, main_interrupt_rx) = crossbeam_channel::bounded(1);
        let (render_interrupt_tx, render_interrupt_rx) = crossbeam_channel::bounded(1);
        Self {
            registry: Arc::clone(arbiter.registry()),
            arbiter,
            main_waker,
            render_wake_tx,
            render_wake_rx,
            interrupt_tx: [main_interrupt_tx, render_interrupt_tx],
            interrupt_rx: [main_interrupt_rx, render_interrupt_rx],
            bound: Mutex::new([None, None]),
        }
    }

    /// The registry behind the queues.
    pub fn registry(&self) -> &Arc<ContextRegistry<S>> {
        &self.registry
    }

    /// The arbiter blocking posts go through.
    pub fn arbiter(&self) -> &Arc<ContextArbiter<S>> {
        &self.arbiter
    }

    /// Declares the calling thread as the one playing `role`.
    pub fn bind_current_thread(&self, role: ThreadRole) {
        lock(&self.bound)[role.index()] = Some(thread::current().id());
        log::debug!("Thread {:?} bound to the {role} role.", thread::current().name());
    }

    /// The role of the calling thread. Render wins when one thread plays both.
    pub fn current_role(&self) -> Option<ThreadRole> {
        let id = thread::current().id();
        let bound = lock(&self.bound);
        [ThreadRole::Render, ThreadRole::Main]
            .into_iter()
            .find(|role| bound[role.index()] == Some(id))
    }

    fn is_bound_here(&self, role: ThreadRole) -> bool {
        lock(&self.bound)[role.index()] == Some(thread::current().id())
    }

    /// Wakes the thread playing `role` if it is idle.
    pub fn wake(&self, role: ThreadRole) {
        match role {
            ThreadRole::Main => self.main_waker.wake(),
            // A pending token already guarantees a wake-up.
            ThreadRole::Render => {
                let _ = self.render_wake_tx.try_send(());
            }
        }
    }

    /// Queues `action` for `role` on `context` and returns immediately.
    pub fn post_async<F>(
        &self,
        role: ThreadRole,
        context: ContextHandle,
        action: F,
    ) -> Result<(), CoordinationError>
    where
        F: FnOnce(&mut TaskScope<'_, S>) -> anyhow::Result<()> + Send + 'static,
    {
        self.registry.push(role, context, Box::new(action))?;
        log::trace!("Posted {role} work for {context}.");
        self.wake(role);
        Ok(())
    }

    /// Runs `function` on the `role` thread against `context` and waits for its value.
    ///
    /// Returns `default` if the waiting thread is interrupted, or if the item
    /// never produced a value (it failed, or was dropped with its context).
    /// A thread playing `role` itself calls straight through when it is the main
    /// thread in single-threaded mode and is refused otherwise.
    pub fn post_blocking<R, F>(
        &self,
        role: ThreadRole,
        context: ContextHandle,
        default: R,
        function: F,
    ) -> Result<R, CoordinationError>
    where
        R: Send + 'static,
        F: FnOnce(&mut TaskScope<'_, S>) -> anyhow::Result<R> + Send + 'static,
    {
        let caller = self.current_role();
        if self.is_bound_here(role) {
            return match role {
                ThreadRole::Main => self.call_direct(caller, context, default, function),
                ThreadRole::Render => Err(CoordinationError::SelfBlocking(role)),
            };
        }
        if !self.registry.contains(context) {
            return Err(CoordinationError::UnknownContext(context));
        }

        let suspension = match caller {
            Some(caller) => self.arbiter.suspend(caller, context)?,
            None => None,
        };

        let (result_tx, result_rx) = crossbeam_channel::bounded::<R>(1);
        let item: WorkItem<S> = Box::new(move |scope: &mut TaskScope<'_, S>| {
            let outcome = function(scope);
            // The waiter reacquires as soon as it sees the value.
            let released = scope.finish_main();
            let value = outcome?;
            released?;
            if result_tx.send(value).is_err() {
                log::debug!(
                    "Result for {} discarded; the caller stopped waiting.",
                    scope.context()
                );
            }
            Ok(())
        });

        if let Err(err) = self.registry.push(role, context, item) {
            if let Some(suspension) = suspension {
                self.arbiter.resume(suspension)?;
            }
            return Err(err);
        }
        log::trace!("Posted blocking {role} work for {context}.");
        self.wake(role);

        let value = self.wait_for(caller, &result_rx);
        drop(result_rx);

        if let Some(suspension) = suspension {
            self.arbiter.resume(suspension)?;
        }
        Ok(value.unwrap_or(default))
    }

    fn call_direct<R, F>(
        &self,
        caller: Option<ThreadRole>,
        context: ContextHandle,
        default: R,
        function: F,
    ) -> Result<R, CoordinationError>
    where
        F: FnOnce(&mut TaskScope<'_, S>) -> anyhow::Result<R>,
    {
        if !self.registry.contains(context) {
            return Err(CoordinationError::UnknownContext(context));
        }
        let suspension = match caller {
            Some(ThreadRole::Render) => self.arbiter.suspend(ThreadRole::Render, context)?,
            _ => None,
        };

        let outcome = direct::with_native(|native| {
            // Work this thread queued earlier runs first.
            if let Err(err) = self.drain(context, Executor::Main(&mut *native)) {
                log::warn!("Queued main-thread work on {context} failed: {err:#}");
            }
            let mut scope = TaskScope::main(context, &self.arbiter, native);
            let outcome = function(&mut scope);
            (outcome, scope.finish_main())
        });

        if let Some(suspension) = suspension {
            self.arbiter.resume(suspension)?;
        }
        let Some((outcome, released)) = outcome else {
            return Err(CoordinationError::SelfBlocking(ThreadRole::Main));
        };
        released?;
        match outcome {
            Ok(value) => Ok(value),
            Err(err) => {
                log::error!("Direct main-thread call on {context} failed: {err:#}");
                Ok(default)
            }
        }
    }

    fn wait_for<R>(&self, caller: Option<ThreadRole>, result: &Receiver<R>) -> Option<R> {
        let Some(role) = caller else {
            return result.recv().ok();
        };
        let interrupt = &self.interrupt_rx[role.index()];
        if interrupt.try_recv().is_ok() {
            log::debug!("The {role} thread was interrupted before blocking.");
            return None;
        }
        select! {
            recv(result) -> value => value.ok(),
            recv(interrupt) -> _ => {
                log::debug!("Blocking wait of the {role} thread interrupted.");
                None
            }
        }
    }

    /// Interrupts the thread playing `role`: its pending or next blocking wait
    /// returns the caller's default.
    pub fn interrupt(&self, role: ThreadRole) {
        let _ = self.interrupt_tx[role.index()].try_send(());
        self.wake(role);
    }

    /// Parks the render thread until work is posted to it or `timeout` elapses.
    ///
    /// Returns `true` if it was woken by a post.
    pub fn wait_render_work(&self, timeout: Duration) -> bool {
        self.render_wake_rx.recv_timeout(timeout).is_ok()
    }

    /// Runs every item queued for the executor's role on `context`, in order.
    ///
    /// The queue is swapped out first, so items may post more work; that work
    /// waits for the next drain. Main-thread items have their context released
    /// after each one. The first failing item aborts the drain: its error is
    /// returned as is and the items behind it are dropped.
    pub fn drain(&self, context: ContextHandle, mut executor: Executor<'_, S>) -> anyhow::Result<usize> {
        let role = executor.role();
        let items = self.registry.take(role, context);
        if items.is_empty() {
            return Ok(0);
        }

        let mut executed = 0;
        let mut items = items.into_iter();
        while let Some(item) = items.next() {
            let outcome = {
                let mut scope = match &mut executor {
                    Executor::Main(native) => TaskScope::main(context, &self.arbiter, &mut **native),
                    Executor::Render(state) => TaskScope::render(context, &self.arbiter, &mut **state),
                };
                item(&mut scope)
            };
            executed += 1;
            let released = match role {
                ThreadRole::Main => self.arbiter.release(ThreadRole::Main),
                ThreadRole::Render => Ok(()),
            };
            if let Err(err) = outcome {
                if items.len() > 0 {
                    log::warn!(
                        "Dropping {} {role} work item(s) for {context} behind a failed one.",
                        items.len()
                    );
                }
                return Err(err);
            }
            released?;
        }
        log::trace!("Drained {executed} {role} work item(s) for {context}.");
        Ok(executed)
    }

    /// Shuts `role` down: queued work is dropped and new posts are refused.
    pub fn close(&self, role: ThreadRole) -> usize {
        let dropped = self.registry.close(role);
        log::info!("The {role} queue is closed.");
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::platform::ContextBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullBackend;

    impl ContextBackend for NullBackend {
        fn make_current(&self, _: ContextHandle) -> Result<(), PlatformError> {
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

    fn channel() -> (DelegationChannel<Vec<u32>>, Arc<CountingWaker>) {
        let registry = Arc::new(ContextRegistry::new());
        let arbiter = Arc::new(ContextArbiter::new(registry, Arc::new(NullBackend)));
        let waker = Arc::new(CountingWaker::default());
        (DelegationChannel::new(arbiter, waker.clone()), waker)
    }

    #[test]
    fn single_producer_order_is_preserved() {
        let (channel, _) = channel();
        for n in 0..10 {
            channel
                .post_async(ThreadRole::Render, ContextHandle::NONE, move |scope| {
                    scope.state()?.push(n);
                    Ok(())
                })
                .unwrap();
        }

        let mut state = Vec::new();
        let executed = channel
            .drain(ContextHandle::NONE, Executor::Render(&mut state))
            .unwrap();
        assert_eq!(executed, 10);
        assert_eq!(state, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn work_posted_during_a_drain_waits_for_the_next_one() {
        let (channel, _) = channel();
        let channel = Arc::new(channel);
        let inner = Arc::clone(&channel);
        channel
            .post_async(ThreadRole::Render, ContextHandle::NONE, move |scope| {
                scope.state()?.push(1);
                inner.post_async(ThreadRole::Render, ContextHandle::NONE, |scope| {
                    scope.state()?.push(2);
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();

        let mut state = Vec::new();
        assert_eq!(
            channel
                .drain(ContextHandle::NONE, Executor::Render(&mut state))
                .unwrap(),
            1
        );
        assert_eq!(state, vec![1]);
        assert_eq!(
            channel
                .drain(ContextHandle::NONE, Executor::Render(&mut state))
                .unwrap(),
            1
        );
        assert_eq!(state, vec![1, 2]);
    }

    #[test]
    fn failing_item_stops_the_drain() {
        let (channel, _) = channel();
        channel
            .post_async(ThreadRole::Render, ContextHandle::NONE, |scope| {
                scope.state()?.push(1);
                Ok(())
            })
            .unwrap();
        channel
            .post_async(ThreadRole::Render, ContextHandle::NONE, |_| {
                anyhow::bail!("boom")
            })
            .unwrap();
        channel
            .post_async(ThreadRole::Render, ContextHandle::NONE, |scope| {
                scope.state()?.push(3);
                Ok(())
            })
            .unwrap();

        let mut state = Vec::new();
        let err = channel
            .drain(ContextHandle::NONE, Executor::Render(&mut state))
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(state, vec![1]);
        assert_eq!(
            channel
                .registry()
                .pending(ThreadRole::Render, ContextHandle::NONE),
            0
        );
    }

    #[test]
    fn unknown_context_drains_nothing() {
        let (channel, _) = channel();
        let mut state = Vec::new();
        assert_eq!(
            channel
                .drain(ContextHandle::new(5), Executor::Render(&mut state))
                .unwrap(),
            0
        );
        assert!(matches!(
            channel.post_async(ThreadRole::Render, ContextHandle::new(5), |_| Ok(())),
            Err(CoordinationError::UnknownContext(_))
        ));
    }

    #[test]
    fn posting_to_main_wakes_it() {
        let (channel, waker) = channel();
        channel
            .post_async(ThreadRole::Main, ContextHandle::NONE, |_| Ok(()))
            .unwrap();
        assert_eq!(waker.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn render_post_ends_idle_wait() {
        let (channel, _) = channel();
        assert!(!channel.wait_render_work(Duration::from_millis(1)));
        channel
            .post_async(ThreadRole::Render, ContextHandle::NONE, |_| Ok(()))
            .unwrap();
        assert!(channel.wait_render_work(Duration::from_millis(100)));
    }

    #[test]
    fn render_cannot_block_on_itself() {
        let (channel, _) = channel();
        channel.bind_current_thread(ThreadRole::Render);
        assert!(matches!(
            channel.post_blocking(ThreadRole::Render, ContextHandle::NONE, 0, |_| Ok(1)),
            Err(CoordinationError::SelfBlocking(ThreadRole::Render))
        ));
    }

    #[test]
    fn closed_main_queue_refuses_posts() {
        let (channel, _) = channel();
        channel
            .post_async(ThreadRole::Main, ContextHandle::NONE, |_| Ok(()))
            .unwrap();
        assert_eq!(channel.close(ThreadRole::Main), 1);
        assert!(matches!(
            channel.post_blocking(ThreadRole::Main, ContextHandle::NONE, 0, |_| Ok(1)),
            Err(CoordinationError::ChannelClosed(ThreadRole::Main))
        ));
    }

    #[test]
    fn current_role_prefers_render() {
        let (channel, _) = channel();
        assert_eq!(channel.current_role(), None);
        channel.bind_current_thread(ThreadRole::Main);
        assert_eq!(channel.current_role(), Some(ThreadRole::Main));
        channel.bind_current_thread(ThreadRole::Render);
        assert_eq!(channel.current_role(), Some(ThreadRole::Render));
    }
}
