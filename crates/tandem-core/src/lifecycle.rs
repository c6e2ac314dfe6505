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

//! The per-window lifecycle states and their legal transitions.

use crate::error::CoordinationError;

/// Where a window stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WindowState {
    /// No native window exists yet.
    #[default]
    Unregistered,
    /// Native window allocated on the main thread, context registered, still invisible.
    Created,
    /// Context finalized on the render thread, `create` and `resize` delivered.
    Completed,
    /// Participating in the render loop.
    Active,
    /// The close flag was observed by the render loop.
    CloseRequested,
    /// `pause` and `dispose` delivered, native window gone, context unregistered.
    Disposed,
}

impl WindowState {
    /// Returns `true` if the state machine allows moving to `next`.
    ///
    /// A window may be asked to close before its first frame, so `Completed`
    /// can skip straight to `CloseRequested`.
    pub fn can_transition_to(self, next: WindowState) -> bool {
        use WindowState::*;
        matches!(
            (self, next),
            (Unregistered, Created)
                | (Created, Completed)
                | (Completed, Active)
                | (Completed, CloseRequested)
                | (Active, CloseRequested)
                | (CloseRequested, Disposed)
        )
    }

    /// Validates the move to `next` and returns it.
    pub fn transition(self, next: WindowState) -> Result<WindowState, CoordinationError> {
        if self.can_transition_to(next) {
            log::debug!("Window state {self:?} -> {next:?}");
            Ok(next)
        } else {
            Err(CoordinationError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Returns `true` once the window takes part in per-frame updates.
    pub fn is_live(self) -> bool {
        matches!(self, WindowState::Completed | WindowState::Active)
    }
}
