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

//! Clipboard access, delegated to the main thread.

use crate::app::{call_main, post_main, Channel};
use std::sync::Arc;
use tandem_core::ContextHandle;

/// The system clipboard. Cloneable and usable from any thread.
#[derive(Clone)]
pub struct Clipboard {
    channel: Arc<Channel>,
}

impl Clipboard {
    pub(crate) fn new(channel: Arc<Channel>) -> Self {
        Self { channel }
    }

    /// Current clipboard text. Blocks until the main thread answers.
    pub fn contents(&self) -> Option<String> {
        call_main(&self.channel, ContextHandle::NONE, "Clipboard read", None, |scope| {
            Ok(scope.native()?.clipboard_text())
        })
    }

    /// Replaces the clipboard text. Returns immediately.
    pub fn set_contents(&self, text: impl Into<String>) {
        let text = text.into();
        post_main(&self.channel, ContextHandle::NONE, "Clipboard write", move |native| {
            native.set_clipboard_text(&text)
        });
    }
}
