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

//! # Tandem Core
//!
//! Foundational crate for the main-thread / render-thread coordination engine:
//! context handles and thread roles, the delegation channel and ownership arbiter,
//! the window lifecycle states, configuration, and the platform contracts a
//! windowing backend implements.

#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod delegate;
pub mod error;
pub mod lifecycle;
pub mod platform;

pub use config::{AppConfig, WindowConfig};
pub use context::{ContextHandle, ThreadRole};
pub use delegate::{ContextArbiter, ContextRegistry, DelegationChannel, Executor, TaskScope, WorkItem};
pub use error::{ConfigError, CoordinationError, PlatformError};
pub use lifecycle::WindowState;
