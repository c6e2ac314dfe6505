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

//! What a work item can reach while it runs.

use super::arbiter::ContextArbiter;
use crate::context::{ContextHandle, ThreadRole};
use crate::error::CoordinationError;
use crate::platform::NativeWindows;

/// The environment handed to a [`WorkItem`](super::WorkItem).
///
/// Main-thread items see the native window system; render-thread items see
/// the render state `S`. Both can make their context current through the arbiter.
pub struct TaskScope<'a, S> {
    role: ThreadRole,
    context: ContextHandle,
    arbiter: &'a ContextArbiter<S>,
    native: Option<&'a mut dyn NativeWindows>,
    state: Option<&'a mut S>,
}

impl<'a, S> TaskScope<'a, S> {
    pub(crate) fn main(
        context: ContextHandle,
        arbiter: &'a ContextArbiter<S>,
        native: &'a mut dyn NativeWindows,
    ) -> Self {
        Self {
            role: ThreadRole::Main,
            context,
            arbiter,
            native: Some(native),
            state: None,
        }
    }

    pub(crate) fn render(
        context: ContextHandle,
        arbiter: &'a ContextArbiter<S>,
        state: &'a mut S,
    ) -> Self {
        Self {
            role: ThreadRole::Render,
            context,
            arbiter,
            native: None,
            state: Some(state),
        }
    }

    /// The role executing this item.
    pub fn role(&self) -> ThreadRole {
        self.role
    }

    /// The context the item was posted to.
    pub fn context(&self) -> ContextHandle {
        self.context
    }

    /// The arbiter, for items that juggle several contexts.
    pub fn arbiter(&self) -> &'a ContextArbiter<S> {
        self.arbiter
    }

    /// Makes the item's context current on this thread.
    ///
    /// On the main thread the context is released again once the item returns.
    pub fn make_current(&mut self) -> Result<(), CoordinationError> {
        self.arbiter.acquire(self.role, self.context)
    }

    /// Releases whatever this role has current.
    pub fn release_current(&mut self) -> Result<(), CoordinationError> {
        self.arbiter.release(self.role)
    }

    /// The native window system. Only available to main-thread items.
    pub fn native(&mut self) -> Result<&mut (dyn NativeWindows + 'a), CoordinationError> {
        self.native
            .as_deref_mut()
            .ok_or(CoordinationError::NativeUnavailable)
    }

    /// The render state. Only available to render-thread items.
    pub fn state(&mut self) -> Result<&mut S, CoordinationError> {
        self.state
            .as_deref_mut()
            .ok_or(CoordinationError::StateUnavailable)
    }

    /// Releases the main role's context so a blocked render thread can take it back.
    pub(crate) fn finish_main(&mut self) -> Result<(), CoordinationError> {
        match self.role {
            ThreadRole::Main => self.arbiter.release(ThreadRole::Main),
            ThreadRole::Render => Ok(()),
        }
    }
}
