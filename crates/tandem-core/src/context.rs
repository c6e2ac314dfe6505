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

//! Identifiers shared by every part of the coordination engine.

use std::fmt;

/// An opaque identifier for a native window and its graphics context.
///
/// The value `0` ([`ContextHandle::NONE`]) never names a window. It addresses the
/// application-level queue, which is always registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ContextHandle(u64);

impl ContextHandle {
    /// The non-window context.
    pub const NONE: ContextHandle = ContextHandle(0);

    /// Wraps a raw native handle value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns `true` for the non-window context.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for ContextHandle {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "ctx:none")
        } else {
            write!(f, "ctx:{}", self.0)
        }
    }
}

/// The two cooperating thread roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadRole {
    /// Owns the native event loop and performs every native window-system call.
    Main,
    /// Drives the application loop and the graphics calls.
    Render,
}

impl ThreadRole {
    /// Both roles, in slot order.
    pub const ALL: [ThreadRole; 2] = [ThreadRole::Main, ThreadRole::Render];

    /// Returns the opposite role.
    pub const fn other(self) -> ThreadRole {
        match self {
            ThreadRole::Main => ThreadRole::Render,
            ThreadRole::Render => ThreadRole::Main,
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            ThreadRole::Main => 0,
            ThreadRole::Render => 1,
        }
    }
}

impl fmt::Display for ThreadRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadRole::Main => write!(f, "main"),
            ThreadRole::Render => write!(f, "render"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_handle_is_zero() {
        assert!(ContextHandle::NONE.is_none());
        assert!(ContextHandle::default().is_none());
        assert!(!ContextHandle::new(42).is_none());
        assert_eq!(ContextHandle::from(42).raw(), 42);
    }

    #[test]
    fn display_formats() {
        assert_eq!(ContextHandle::NONE.to_string(), "ctx:none");
        assert_eq!(ContextHandle::new(7).to_string(), "ctx:7");
        assert_eq!(ThreadRole::Render.to_string(), "render");
    }

    #[test]
    fn roles_are_opposites() {
        assert_eq!(ThreadRole::Main.other(), ThreadRole::Render);
        assert_eq!(ThreadRole::Render.other(), ThreadRole::Main);
        assert_ne!(ThreadRole::Main.index(), ThreadRole::Render.index());
    }
}
