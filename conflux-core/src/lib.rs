/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

#![forbid(unsafe_code)]

//! Conflux Core Library
//!
//! This library provides the core functionality for the Conflux concurrency
//! runtime: isolated agents with serialized mailboxes, request/reply
//! messaging, CSP-style channels, a bounded worker pool with explicit
//! execution-context propagation, and a fork-join map/reduce combinator.
//! All state mutation flows through exactly one agent task per state owner;
//! the runtime contains no shared-memory locks.

/// Common utilities and structures used throughout the Conflux runtime.
pub(crate) mod common;

pub(crate) mod agent;
pub(crate) mod channel;
pub(crate) mod forkjoin;
pub(crate) mod message;
pub(crate) mod pool;
/// Trait definitions used in the Conflux runtime.
pub(crate) mod traits;

/// Prelude module for convenient imports.
///
/// This module re-exports commonly used items from the runtime, as well as
/// the `async_trait` crate.
pub mod prelude {
    pub use async_trait;

    pub use crate::agent::{Agent, AgentBuilder, AgentHandle, ReplyAgent, ReplyAgentHandle};
    pub use crate::channel::{Channel, ChannelSnapshot};
    pub use crate::common::{
        AgentId, ConfluxApp, ConfluxConfig, ExecutionContext, MailboxCapacity, Runtime, CONFIG,
    };
    pub use crate::forkjoin::fork_join;
    pub use crate::message::{Envelope, MessageError};
    pub use crate::pool::WorkerPool;
    pub use crate::traits::{AgentMessage, Lifecycle};
}
