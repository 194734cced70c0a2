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

//! Defines common internal type aliases and supporting structures used within
//! `conflux-core`.

use std::future::Future;
use std::pin::Pin;

use crate::common::config::CONFIG;
use crate::common::ExecutionContext;

/// A pinned, boxed, dynamically dispatched future with `Output = ()`.
///
/// This is the erased form in which pool tasks and channel receive handlers
/// are stored and shipped between tasks.
pub type FutureBox = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Crate-internal: the erased form of a pool-submitted action.
pub(crate) type TaskFn = Box<dyn FnOnce(ExecutionContext) -> FutureBox + Send + 'static>;

/// Crate-internal: the erased form of a channel receive handler.
pub(crate) type ReceiverFn<T> = Box<dyn FnOnce(T, ExecutionContext) -> FutureBox + Send + 'static>;

/// Capacity policy for an agent's mailbox.
///
/// Mailboxes are unbounded by default; a bounded mailbox makes `send` exert
/// backpressure on producers once the configured number of messages is
/// waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxCapacity {
    /// No limit; `send` always completes immediately.
    Unbounded,
    /// At most this many queued messages; `send` suspends while full.
    Bounded(usize),
}

impl Default for MailboxCapacity {
    fn default() -> Self {
        match CONFIG.limits.mailbox_capacity {
            0 => Self::Unbounded,
            capacity => Self::Bounded(capacity),
        }
    }
}
