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

//! Thread-local native window system for single-threaded mode.
//!
//! When one thread plays both roles, blocking main-thread calls cannot be
//! queued (nobody else would drain them). The engine parks the native window
//! system here instead and the channel calls into it directly.

use crate::platform::NativeWindows;
use std::cell::RefCell;

thread_local! {
    static NATIVE: RefCell<Option<Box<dyn NativeWindows>>> = const { RefCell::new(None) };
}

/// Parks `native` on the calling thread, returning whatever was parked before.
///
/// Returns `Err(native)` untouched if called from inside [`with_native`].
pub fn install(
    native: Box<dyn NativeWindows>,
) -> Result<Option<Box<dyn NativeWindows>>, Box<dyn NativeWindows>> {
    NATIVE.with(|slot| match slot.try_borrow_mut() {
        Ok(mut slot) => Ok(slot.replace(native)),
        Err(_) => Err(native),
    })
}

/// Takes the parked window system back.
pub fn uninstall() -> Option<Box<dyn NativeWindows>> {
    NATIVE.with(|slot| slot.try_borrow_mut().ok().and_then(|mut slot| slot.take()))
}

/// Returns `true` if a window system is parked on this thread.
pub fn is_installed() -> bool {
    NATIVE.with(|slot| slot.try_borrow().map_or(true, |slot| slot.is_some()))
}

/// Runs `f` with the parked window system.
///
/// Returns `None` if nothing is parked or it is already in use further up the stack.
pub fn with_native<R>(f: impl FnOnce(&mut dyn NativeWindows) -> R) -> Option<R> {
    NATIVE.with(|slot| {
        let mut slot = slot.try_borrow_mut().ok()?;
        let native = slot.as_deref_mut()?;
        Some(f(native))
    })
}
