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

//! Native event to render work adapter.

use super::channel::DelegationChannel;
use crate::context::{ContextHandle, ThreadRole};
use crate::error::CoordinationError;
use std::sync::Arc;

/// How a forwarded event is applied to the render state.
pub type Deliver<S, E> = fn(&mut S, ContextHandle, E) -> anyhow::Result<()>;

/// Re-posts events observed on the main thread as render-thread work.
///
/// Every event kind goes through the same adapter; only `deliver` differs.
/// Events for a context that is already gone are dropped.
pub struct EventForwarder<S, E> {
    channel: Arc<DelegationChannel<S>>,
    deliver: Deliver<S, E>,
}

impl<S: 'static, E: Send + 'static> EventForwarder<S, E> {
    /// Creates a forwarder posting through `channel`.
    pub fn new(channel: Arc<DelegationChannel<S>>, deliver: Deliver<S, E>) -> Self {
        Self { channel, deliver }
    }

    /// Queues `event` for the render thread on `context`.
    ///
    /// Returns `false` if the event was dropped.
    pub fn forward(&self, context: ContextHandle, event: E) -> bool {
        let deliver = self.deliver;
        let posted = self
            .channel
            .post_async(ThreadRole::Render, context, move |scope| {
                deliver(scope.state()?, context, event)
            });
        match posted {
            Ok(()) => true,
            Err(CoordinationError::UnknownContext(_)) => {
                log::trace!("Dropped an event for {context}; the window is gone.");
                false
            }
            Err(err) => {
                log::debug!("Dropped an event for {context}: {err}");
                false
            }
        }
    }
}

impl<S, E> Clone for EventForwarder<S, E> {
    fn clone(&self) -> Self {
        Self {
            channel: Arc::clone(&self.channel),
            deliver: self.deliver,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::{ContextArbiter, ContextRegistry, Executor};
    use crate::error::PlatformError;
    use crate::platform::{ContextBackend, MainWaker};

    struct Null;

    impl ContextBackend for Null {
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

    impl MainWaker for Null {
        fn wake(&self) {}
    }

    fn record(state: &mut Vec<(ContextHandle, &'static str)>, ctx: ContextHandle, event: &'static str) -> anyhow::Result<()> {
        state.push((ctx, event));
        Ok(())
    }

    #[test]
    fn events_reach_the_render_state_of_their_window() {
        let registry = Arc::new(ContextRegistry::new());
        let window = ContextHandle::new(10);
        registry.register(window).unwrap();
        let arbiter = Arc::new(ContextArbiter::new(registry, Arc::new(Null)));
        let channel = Arc::new(DelegationChannel::new(arbiter, Arc::new(Null)));
        let forwarder = EventForwarder::new(Arc::clone(&channel), record);

        assert!(forwarder.forward(window, "focus"));
        assert!(forwarder.forward(window, "resize"));
        assert!(!forwarder.forward(ContextHandle::new(20), "lost"));

        let mut state = Vec::new();
        channel
            .drain(window, Executor::Render(&mut state))
            .unwrap();
        assert_eq!(state, vec![(window, "focus"), (window, "resize")]);
    }
}
