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

//! Error types for the coordination engine and its platform contracts.

use crate::context::{ContextHandle, ThreadRole};
use crate::lifecycle::WindowState;
use std::path::PathBuf;

/// Errors reported by a native window-system backend.
///
/// These are surfaced unchanged through [`CoordinationError::Platform`].
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// A native resource (window, context, cursor) could not be created.
    #[error("native {what} creation failed: {reason}")]
    CreationFailed {
        /// The kind of resource.
        what: &'static str,
        /// Backend-provided reason.
        reason: String,
    },
    /// The backend has no window for this handle.
    #[error("no native window for {0}")]
    UnknownWindow(ContextHandle),
    /// The backend cannot perform this operation.
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),
    /// Any other backend failure.
    #[error("native backend error: {0}")]
    Backend(String),
}

/// Errors raised by the registry, the delegation channel and the arbiter.
#[derive(Debug, thiserror::Error)]
pub enum CoordinationError {
    /// A role tried to make a context current while the other role holds it.
    #[error("{context} is current on the {holder} thread; the {requester} thread cannot make it current")]
    Contention {
        /// The contended context.
        context: ContextHandle,
        /// The role currently holding it.
        holder: ThreadRole,
        /// The role that asked for it.
        requester: ThreadRole,
    },
    /// The context is not (or no longer) registered.
    #[error("{0} is not registered")]
    UnknownContext(ContextHandle),
    /// The context is already registered.
    #[error("{0} is already registered")]
    AlreadyRegistered(ContextHandle),
    /// A thread tried to block on a queue that only it drains.
    #[error("the {0} thread cannot block on its own queue")]
    SelfBlocking(ThreadRole),
    /// The target role has shut down and accepts no more work.
    #[error("the {0} queue is closed")]
    ChannelClosed(ThreadRole),
    /// A window lifecycle transition that the state machine does not allow.
    #[error("invalid window transition {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current state.
        from: WindowState,
        /// Requested state.
        to: WindowState,
    },
    /// A task asked for the native window system outside a main-thread scope.
    #[error("the native window system is only reachable from main-thread work")]
    NativeUnavailable,
    /// A task asked for render state outside a render-thread scope.
    #[error("render state is only reachable from render-thread work")]
    StateUnavailable,
    /// A native backend error, passed through untouched.
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Errors raised while loading an [`AppConfig`](crate::config::AppConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The RON document is malformed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// The document parsed but holds an unusable value.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contention_names_both_roles() {
        let err = CoordinationError::Contention {
            context: ContextHandle::new(42),
            holder: ThreadRole::Render,
            requester: ThreadRole::Main,
        };
        let message = err.to_string();
        assert!(message.contains("ctx:42"));
        assert!(message.contains("render thread"));
        assert!(message.contains("main thread"));
    }

    #[test]
    fn platform_errors_pass_through_unchanged() {
        let err: CoordinationError = PlatformError::Unsupported("icons").into();
        assert_eq!(
            err.to_string(),
            "operation not supported by this backend: icons"
        );
    }
}
