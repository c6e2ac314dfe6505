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

//! Per-context work queues and ownership tokens.

use super::{lock, read, write, WorkItem};
use crate::context::{ContextHandle, ThreadRole};
use crate::error::CoordinationError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// The queues and ownership token of one context.
pub(crate) struct ContextSlot<S> {
    queues: [Mutex<Vec<WorkItem<S>>>; 2],
    holder: Mutex<Option<ThreadRole>>,
}

impl<S> ContextSlot<S> {
    fn new() -> Self {
        Self {
            queues: [Mutex::new(Vec::new()), Mutex::new(Vec::new())],
            holder: Mutex::new(None),
        }
    }

    fn queue(&self, role: ThreadRole) -> &Mutex<Vec<WorkItem<S>>> {
        &self.queues[role.index()]
    }
}

/// Tracks every registered context: its two FIFO work queues and which role
/// currently has it current.
///
/// [`ContextHandle::NONE`] is registered from the start and can never be removed.
pub struct ContextRegistry<S> {
    slots: RwLock<HashMap<ContextHandle, Arc<ContextSlot<S>>>>,
    closed: [AtomicBool; 2],
}

impl<S> ContextRegistry<S> {
    /// Creates a registry holding only the non-window context.
    pub fn new() -> Self {
        let mut slots = HashMap::new();
        slots.insert(ContextHandle::NONE, Arc::new(ContextSlot::new()));
        Self {
            slots: RwLock::new(slots),
            closed: [AtomicBool::new(false), AtomicBool::new(false)],
        }
    }

    /// Registers a new window context with empty queues.
    pub fn register(&self, context: ContextHandle) -> Result<(), CoordinationError> {
        let mut slots = write(&self.slots);
        if slots.contains_key(&context) {
            return Err(CoordinationError::AlreadyRegistered(context));
        }
        slots.insert(context, Arc::new(ContextSlot::new()));
        log::debug!("Registered {context}.");
        Ok(())
    }

    /// Removes a context and drops whatever work is still queued for it.
    ///
    /// Returns the number of dropped items. Blocking callers waiting on one of
    /// them get their default value back.
    pub fn unregister(&self, context: ContextHandle) -> usize {
        if context.is_none() {
            log::warn!("Ignoring request to unregister the non-window context.");
            return 0;
        }
        let Some(slot) = write(&self.slots).remove(&context) else {
            return 0;
        };

        let mut dropped = 0;
        for role in ThreadRole::ALL {
            let items = std::mem::take(&mut *lock(slot.queue(role)));
            if !items.is_empty() {
                log::warn!(
                    "Dropping {} pending {role} work item(s) of unregistered {context}.",
                    items.len()
                );
            }
            dropped += items.len();
        }
        log::debug!("Unregistered {context}.");
        dropped
    }

    /// Returns `true` if `context` is registered.
    pub fn contains(&self, context: ContextHandle) -> bool {
        read(&self.slots).contains_key(&context)
    }

    /// Every registered context in ascending order, [`ContextHandle::NONE`] first.
    pub fn handles(&self) -> Vec<ContextHandle> {
        let mut handles: Vec<_> = read(&self.slots).keys().copied().collect();
        handles.sort_unstable();
        handles
    }

    /// Number of items waiting in the `role` queue of `context`.
    pub fn pending(&self, role: ThreadRole, context: ContextHandle) -> usize {
        match self.slot(context) {
            Some(slot) => {
                let queue = lock(slot.queue(role));
                queue.len()
            }
            None => 0,
        }
    }

    /// The role that has `context` current, if any.
    pub fn holder(&self, context: ContextHandle) -> Option<ThreadRole> {
        let slot = self.slot(context)?;
        let holder = *lock(&slot.holder);
        holder
    }

    /// Returns `true` once [`ContextRegistry::close`] was called for `role`.
    pub fn is_closed(&self, role: ThreadRole) -> bool {
        self.closed[role.index()].load(Ordering::SeqCst)
    }

    /// Rejects further work for `role` and drops everything already queued for it.
    pub fn close(&self, role: ThreadRole) -> usize {
        self.closed[role.index()].store(true, Ordering::SeqCst);
        let slots: Vec<_> = read(&self.slots).values().cloned().collect();
        let dropped: usize = slots
            .iter()
            .map(|slot| std::mem::take(&mut *lock(slot.queue(role))).len())
            .sum();
        if dropped > 0 {
            log::warn!("Dropped {dropped} pending {role} work item(s) on shutdown.");
        }
        dropped
    }

    pub(crate) fn slot(&self, context: ContextHandle) -> Option<Arc<ContextSlot<S>>> {
        read(&self.slots).get(&context).cloned()
    }

    /// Appends `item` to the `role` queue of `context`.
    pub(crate) fn push(
        &self,
        role: ThreadRole,
        context: ContextHandle,
        item: WorkItem<S>,
    ) -> Result<(), CoordinationError> {
        let slot = self
            .slot(context)
            .ok_or(CoordinationError::UnknownContext(context))?;
        let mut queue = lock(slot.queue(role));
        // Checked under the queue lock so `close` cannot miss an item.
        if self.is_closed(role) {
            return Err(CoordinationError::ChannelClosed(role));
        }
        queue.push(item);
        Ok(())
    }

    /// Swaps the whole `role` queue of `context` out, leaving it empty for producers.
    pub(crate) fn take(&self, role: ThreadRole, context: ContextHandle) -> Vec<WorkItem<S>> {
        let Some(slot) = self.slot(context) else {
            return Vec::new();
        };
        let mut queue = lock(slot.queue(role));
        std::mem::take(&mut *queue)
    }

    /// Marks `context` as current on `role`.
    pub(crate) fn claim(
        &self,
        context: ContextHandle,
        role: ThreadRole,
    ) -> Result<(), CoordinationError> {
        let slot = self
            .slot(context)
            .ok_or(CoordinationError::UnknownContext(context))?;
        let mut holder = lock(&slot.holder);
        match *holder {
            Some(current) if current != role => Err(CoordinationError::Contention {
                context,
                holder: current,
                requester: role,
            }),
            _ => {
                *holder = Some(role);
                Ok(())
            }
        }
    }

    /// Clears the token of `context` if `role` holds it.
    pub(crate) fn unclaim(&self, context: ContextHandle, role: ThreadRole) {
        if let Some(slot) = self.slot(context) {
            let mut holder = lock(&slot.holder);
            if *holder == Some(role) {
                *holder = None;
            }
        }
    }
}

impl<S> Default for ContextRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::TaskScope;

    fn noop() -> WorkItem<()> {
        Box::new(|_: &mut TaskScope<'_, ()>| -> anyhow::Result<()> { Ok(()) })
    }

    #[test]
    fn none_context_is_always_registered() {
        let registry = ContextRegistry::<()>::new();
        assert!(registry.contains(ContextHandle::NONE));
        assert_eq!(registry.unregister(ContextHandle::NONE), 0);
        assert!(registry.contains(ContextHandle::NONE));
    }

    #[test]
    fn register_twice_is_rejected() {
        let registry = ContextRegistry::<()>::new();
        let ctx = ContextHandle::new(10);
        registry.register(ctx).expect("first registration");
        assert!(matches!(
            registry.register(ctx),
            Err(CoordinationError::AlreadyRegistered(c)) if c == ctx
        ));
        assert_eq!(registry.handles(), vec![ContextHandle::NONE, ctx]);
    }

    #[test]
    fn queues_are_independent_per_role() {
        let registry = ContextRegistry::<()>::new();
        let ctx = ContextHandle::new(10);
        registry.register(ctx).unwrap();
        registry.push(ThreadRole::Main, ctx, noop()).unwrap();
        registry.push(ThreadRole::Main, ctx, noop()).unwrap();
        registry.push(ThreadRole::Render, ctx, noop()).unwrap();

        assert_eq!(registry.pending(ThreadRole::Main, ctx), 2);
        assert_eq!(registry.pending(ThreadRole::Render, ctx), 1);
        assert_eq!(registry.take(ThreadRole::Main, ctx).len(), 2);
        assert_eq!(registry.pending(ThreadRole::Main, ctx), 0);
        assert_eq!(registry.pending(ThreadRole::Render, ctx), 1);
    }

    #[test]
    fn unregister_reports_dropped_work() {
        let registry = ContextRegistry::<()>::new();
        let ctx = ContextHandle::new(10);
        registry.register(ctx).unwrap();
        registry.push(ThreadRole::Main, ctx, noop()).unwrap();
        registry.push(ThreadRole::Render, ctx, noop()).unwrap();

        assert_eq!(registry.unregister(ctx), 2);
        assert!(!registry.contains(ctx));
        assert!(matches!(
            registry.push(ThreadRole::Main, ctx, noop()),
            Err(CoordinationError::UnknownContext(_))
        ));
    }

    #[test]
    fn token_rejects_the_other_role() {
        let registry = ContextRegistry::<()>::new();
        let ctx = ContextHandle::new(42);
        registry.register(ctx).unwrap();

        registry.claim(ctx, ThreadRole::Render).unwrap();
        registry.claim(ctx, ThreadRole::Render).expect("re-claim by holder");
        assert!(matches!(
            registry.claim(ctx, ThreadRole::Main),
            Err(CoordinationError::Contention {
                holder: ThreadRole::Render,
                requester: ThreadRole::Main,
                ..
            })
        ));

        registry.unclaim(ctx, ThreadRole::Main);
        assert_eq!(registry.holder(ctx), Some(ThreadRole::Render));
        registry.unclaim(ctx, ThreadRole::Render);
        assert_eq!(registry.holder(ctx), None);
        registry.claim(ctx, ThreadRole::Main).unwrap();
    }

    #[test]
    fn closed_role_rejects_new_work() {
        let registry = ContextRegistry::<()>::new();
        registry
            .push(ThreadRole::Main, ContextHandle::NONE, noop())
            .unwrap();

        assert_eq!(registry.close(ThreadRole::Main), 1);
        assert!(matches!(
            registry.push(ThreadRole::Main, ContextHandle::NONE, noop()),
            Err(CoordinationError::ChannelClosed(ThreadRole::Main))
        ));
        registry
            .push(ThreadRole::Render, ContextHandle::NONE, noop())
            .expect("render queue still open");
    }
}
