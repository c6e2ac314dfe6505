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

//! Graphics-context and wake-up contracts shared across threads.

use crate::context::ContextHandle;
use crate::error::PlatformError;

/// Thread-safe access to the graphics contexts of a window system.
///
/// Every call acts on the calling thread. The arbiter guarantees a context is
/// only ever bound on one thread; backends may verify it but need not.
pub trait ContextBackend: Send + Sync {
    /// Binds `context` to the calling thread. [`ContextHandle::NONE`] unbinds.
    fn make_current(&self, context: ContextHandle) -> Result<(), PlatformError>;

    /// Presents the back buffer of `context`.
    fn swap_buffers(&self, context: ContextHandle) -> Result<(), PlatformError>;

    /// Sets the swap interval of the context current on this thread.
    fn set_swap_interval(&self, context: ContextHandle, interval: u32) -> Result<(), PlatformError>;

    /// Clears the color buffer of the context current on this thread.
    fn clear(&self, context: ContextHandle, color: [f32; 4]) -> Result<(), PlatformError>;
}

/// Interrupts the main thread's native event wait from any thread.
pub trait MainWaker: Send + Sync {
    /// Makes a pending or the next native wait return early.
    fn wake(&self);
}
