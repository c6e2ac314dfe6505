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

//! Graphics-context ownership between the two roles.

use super::lock;
use super::registry::ContextRegistry;
use crate::context::{ContextHandle, ThreadRole};
use crate::error::CoordinationError;
use crate::platform::ContextBackend;
use std::sync::{Arc, Mutex};

/// Proof that a role gave up a context for the duration of a blocking call.
///
/// Hand it back to [`ContextArbiter::resume`] once the call returns.
#[must_use = "a suspended context must be resumed"]
#[derive(Debug, PartialEq, Eq)]
pub struct Suspension {
    role: ThreadRole,
    context: ContextHandle,
}

impl Suspension {
    /// The role that released the context.
    pub fn role(&self) -> ThreadRole {
        self.role
    }

    /// The released context.
    pub fn context(&self) -> ContextHandle {
        self.context
    }
}

/// Enforces that a graphics context is current on at most one thread.
///
/// Each role has at most one current context. Making another one current
/// releases the previous one. Asking for a context the other role holds is a
/// [`CoordinationError::Contention`]: the two threads raced for the same context.
pub struct ContextArbiter<S> {
    registry: Arc<ContextRegistry<S>>,
    backend: Arc<dyn ContextBackend>,
    current: Mutex<[ContextHandle; 2]>,
}

impl<S> ContextArbiter<S> {
    /// Creates an arbiter over `registry`, binding contexts through `backend`.
    pub fn new(registry: Arc<ContextRegistry<S>>, backend: Arc<dyn ContextBackend>) -> Self {
        Self {
            registry,
            backend,
            current: Mutex::new([ContextHandle::NONE; 2]),
        }
    }

    /// The registry holding the ownership tokens.
    pub fn registry(&self) -> &Arc<ContextRegistry<S>> {
        &self.registry
    }

    /// The backend contexts are bound through.
    pub fn backend(&self) -> &Arc<dyn ContextBackend> {
        &self.backend
    }

    /// The context `role` currently has current.
    pub fn current(&self, role: ThreadRole) -> ContextHandle {
        lock(&self.current)[role.index()]
    }

    /// Makes `context` current for `role` on the calling thread.
    ///
    /// [`ContextHandle::NONE`] always succeeds and only releases what `role` held.
    pub fn acquire(&self, role: ThreadRole, context: ContextHandle) -> Result<(), CoordinationError> {
        let mut current = lock(&self.current);
        let previous = current[role.index()];

        if context.is_none() {
            if !previous.is_none() {
                current[role.index()] = ContextHandle::NONE;
                self.registry.unclaim(previous, role);
                self.backend.make_current(ContextHandle::NONE)?;
            }
            return Ok(());
        }

        if let Err(err) = self.registry.claim(context, role) {
            if previous == context {
                current[role.index()] = ContextHandle::NONE;
            }
            if let CoordinationError::Contention { holder, .. } = &err {
                log::error!("{context} requested by the {role} thread while current on the {holder} thread.");
            }
            return Err(err);
        }
        if previous != context && !previous.is_none() {
            self.registry.unclaim(previous, role);
        }
        current[role.index()] = context;

        // The backend is told every time: a same-thread role switch may have
        // unbound the context underneath us.
        if let Err(err) = self.backend.make_current(context) {
            current[role.index()] = ContextHandle::NONE;
            self.registry.unclaim(context, role);
            return Err(err.into());
        }
        log::trace!("{context} current on the {role} thread.");
        Ok(())
    }

    /// Releases whatever context `role` has current.
    pub fn release(&self, role: ThreadRole) -> Result<(), CoordinationError> {
        let mut current = lock(&self.current);
        let previous = std::mem::replace(&mut current[role.index()], ContextHandle::NONE);
        if previous.is_none() {
            return Ok(());
        }
        self.registry.unclaim(previous, role);
        self.backend.make_current(ContextHandle::NONE)?;
        log::trace!("{previous} released by the {role} thread.");
        Ok(())
    }

    /// Releases `context` if `role` holds it, ahead of a blocking round-trip
    /// that may need the other role to make it current.
    pub fn suspend(
        &self,
        role: ThreadRole,
        context: ContextHandle,
    ) -> Result<Option<Suspension>, CoordinationError> {
        if context.is_none() || self.current(role) != context {
            return Ok(None);
        }
        self.release(role)?;
        log::trace!("{context} suspended by the {role} thread.");
        Ok(Some(Suspension { role, context }))
    }

    /// Reacquires a suspended context.
    ///
    /// A context unregistered in the meantime (the round-trip destroyed its
    /// window) is skipped and the role is left with nothing current.
    pub fn resume(&self, suspension: Suspension) -> Result<(), CoordinationError> {
        if !self.registry.contains(suspension.context) {
            log::debug!(
                "{} vanished while suspended; not reacquiring.",
                suspension.context
            );
            return Ok(());
        }
        self.acquire(suspension.role, suspension.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;

    #[derive(Default)]
    struct CountingBackend {
        binds: Mutex<Vec<ContextHandle>>,
    }

    impl ContextBackend for CountingBackend {
        fn make_current(&self, context: ContextHandle) -> Result<(), PlatformError> {
            lock(&self.binds).push(context);
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

    fn arbiter_with(contexts: &[u64]) -> (ContextArbiter<()>, Arc<CountingBackend>) {
        let registry = Arc::new(ContextRegistry::new());
        for raw in contexts {
            registry.register(ContextHandle::new(*raw)).unwrap();
        }
        let backend = Arc::new(CountingBackend::default());
        (ContextArbiter::new(registry, backend.clone()), backend)
    }

    #[test]
    fn acquire_records_role_and_token() {
        let (arbiter, backend) = arbiter_with(&[10]);
        let ctx = ContextHandle::new(10);

        arbiter.acquire(ThreadRole::Render, ctx).unwrap();
        assert_eq!(arbiter.current(ThreadRole::Render), ctx);
        assert_eq!(arbiter.registry().holder(ctx), Some(ThreadRole::Render));
        assert_eq!(*lock(&backend.binds), vec![ctx]);
    }

    #[test]
    fn contention_is_fatal_and_leaves_holder_untouched() {
        let (arbiter, _) = arbiter_with(&[42]);
        let ctx = ContextHandle::new(42);

        arbiter.acquire(ThreadRole::Render, ctx).unwrap();
        let err = arbiter.acquire(ThreadRole::Main, ctx).unwrap_err();
        assert!(matches!(
            err,
            CoordinationError::Contention {
                holder: ThreadRole::Render,
                requester: ThreadRole::Main,
                ..
            }
        ));
        assert_eq!(arbiter.current(ThreadRole::Main), ContextHandle::NONE);
        assert_eq!(arbiter.registry().holder(ctx), Some(ThreadRole::Render));
    }

    #[test]
    fn switching_context_releases_the_previous_one() {
        let (arbiter, _) = arbiter_with(&[10, 20]);
        let a = ContextHandle::new(10);
        let b = ContextHandle::new(20);

        arbiter.acquire(ThreadRole::Render, a).unwrap();
        arbiter.acquire(ThreadRole::Render, b).unwrap();
        assert_eq!(arbiter.registry().holder(a), None);
        assert_eq!(arbiter.registry().holder(b), Some(ThreadRole::Render));

        // The main role can now take the released context.
        arbiter.acquire(ThreadRole::Main, a).unwrap();
    }

    #[test]
    fn none_only_detaches() {
        let (arbiter, backend) = arbiter_with(&[10]);
        let ctx = ContextHandle::new(10);

        arbiter.acquire(ThreadRole::Main, ContextHandle::NONE).unwrap();
        assert!(lock(&backend.binds).is_empty());

        arbiter.acquire(ThreadRole::Main, ctx).unwrap();
        arbiter.acquire(ThreadRole::Main, ContextHandle::NONE).unwrap();
        assert_eq!(arbiter.registry().holder(ctx), None);
        assert_eq!(*lock(&backend.binds), vec![ctx, ContextHandle::NONE]);
    }

    #[test]
    fn suspend_only_applies_to_the_held_context() {
        let (arbiter, _) = arbiter_with(&[10, 20]);
        let a = ContextHandle::new(10);
        let b = ContextHandle::new(20);
        arbiter.acquire(ThreadRole::Render, a).unwrap();

        assert_eq!(arbiter.suspend(ThreadRole::Render, b).unwrap(), None);
        assert_eq!(
            arbiter.suspend(ThreadRole::Render, ContextHandle::NONE).unwrap(),
            None
        );
        assert_eq!(arbiter.current(ThreadRole::Render), a);

        let suspension = arbiter
            .suspend(ThreadRole::Render, a)
            .unwrap()
            .expect("held context is suspended");
        assert_eq!(arbiter.current(ThreadRole::Render), ContextHandle::NONE);

        // While suspended the other role may use it.
        arbiter.acquire(ThreadRole::Main, a).unwrap();
        arbiter.release(ThreadRole::Main).unwrap();

        arbiter.resume(suspension).unwrap();
        assert_eq!(arbiter.current(ThreadRole::Render), a);
        assert_eq!(arbiter.registry().holder(a), Some(ThreadRole::Render));
    }

    #[test]
    fn resume_skips_unregistered_context() {
        let (arbiter, _) = arbiter_with(&[10]);
        let ctx = ContextHandle::new(10);
        arbiter.acquire(ThreadRole::Render, ctx).unwrap();
        let suspension = arbiter.suspend(ThreadRole::Render, ctx).unwrap().unwrap();

        arbiter.registry().unregister(ctx);
        arbiter.resume(suspension).unwrap();
        assert_eq!(arbiter.current(ThreadRole::Render), ContextHandle::NONE);
    }

    #[test]
    fn unknown_context_is_rejected() {
        let (arbiter, _) = arbiter_with(&[]);
        assert!(matches!(
            arbiter.acquire(ThreadRole::Render, ContextHandle::new(99)),
            Err(CoordinationError::UnknownContext(_))
        ));
    }
}
