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

//! Cross-thread delegation between the main and render roles.
//!
//! The pieces, leaves first:
//! - [`ContextRegistry`]: per-context work queues (one per role) and ownership tokens.
//! - [`ContextArbiter`]: keeps each graphics context current on at most one thread.
//! - [`DelegationChannel`]: post-and-forget, post-and-block, drain.
//! - [`EventForwarder`]: turns native events into render-thread work.

pub mod arbiter;
pub mod channel;
pub mod direct;
pub mod forward;
pub mod registry;
pub mod scope;

pub use arbiter::{ContextArbiter, Suspension};
pub use channel::{DelegationChannel, Executor};
pub use forward::EventForwarder;
pub use registry::ContextRegistry;
pub use scope::TaskScope;

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A unit of delegated work.
///
/// Consumed exactly once by the thread draining the queue it was posted to.
pub type WorkItem<S> = Box<dyn FnOnce(&mut TaskScope<'_, S>) -> anyhow::Result<()> + Send>;

// A panicking work item must not wedge every other thread, so poisoned
// locks are recovered; the guarded data is only ever swapped whole.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
