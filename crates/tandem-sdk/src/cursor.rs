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

//! Custom cursors.

use crate::app::{post_main, Channel};
use std::sync::Arc;
use tandem_core::platform::CursorId;
use tandem_core::ContextHandle;

/// A custom cursor uploaded with [`WindowHandle::new_cursor`](crate::WindowHandle::new_cursor).
///
/// The native cursor is freed on the main thread when this is dropped.
pub struct Cursor {
    id: CursorId,
    channel: Arc<Channel>,
}

impl Cursor {
    pub(crate) fn new(id: CursorId, channel: Arc<Channel>) -> Self {
        Self { id, channel }
    }

    /// The backend id of the cursor.
    pub fn id(&self) -> CursorId {
        self.id
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        let id = self.id;
        post_main(&self.channel, ContextHandle::NONE, "Cursor release", move |native| {
            native.destroy_cursor(id);
            Ok(())
        });
    }
}
