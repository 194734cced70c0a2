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

use std::fmt;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{instrument, trace};

use crate::agent::mailbox::Outbox;
use crate::common::AgentId;
use crate::message::{Command, MessageError};
use crate::traits::{AgentMessage, Lifecycle};

/// A clonable handle for interacting with an agent.
///
/// The handle is the only way to reach an agent from outside its own task:
/// it carries the sending half of the mailbox, the agent's identity, its
/// cancellation token, and the tracker used to await the processing loop on
/// shutdown. Handles can be cloned freely; equality and hashing are based
/// solely on the agent's id.
pub struct AgentHandle<M> {
    pub(crate) id: AgentId,
    pub(crate) outbox: Outbox<Command<M>>,
    pub(crate) tracker: TaskTracker,
    pub(crate) cancellation: CancellationToken,
}

impl<M> Clone for AgentHandle<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            outbox: self.outbox.clone(),
            tracker: self.tracker.clone(),
            cancellation: self.cancellation.clone(),
        }
    }
}

impl<M> fmt::Debug for AgentHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentHandle").field("id", &self.id).finish()
    }
}

impl<M> PartialEq for AgentHandle<M> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<M> Eq for AgentHandle<M> {}

impl<M> Hash for AgentHandle<M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<M: AgentMessage> AgentHandle<M> {
    /// The agent's identity.
    pub fn id(&self) -> &AgentId {
        &self.id
    }

    /// Non-blocking enqueue.
    ///
    /// The message is silently dropped (with a trace event) if the agent has
    /// stopped, or if a bounded mailbox is full. Use [`send`](Self::send)
    /// when acceptance matters.
    pub fn post(&self, message: M) {
        if let Err(error) = self.outbox.try_post(Command::Message(message)) {
            trace!(agent = %self.id, %error, "dropping posted message");
        }
    }

    /// Enqueues a message, suspending while a bounded mailbox is full.
    ///
    /// The returned future completes once the message has been **accepted**
    /// into the mailbox. It does not wait for the message to be processed;
    /// callers that need processing-order guarantees should reason in terms
    /// of mailbox FIFO order, not `send` completion.
    #[instrument(skip_all, fields(agent = %self.id))]
    pub async fn send(&self, message: M) -> Result<(), MessageError> {
        self.outbox.accept(Command::Message(message)).await
    }

    /// Cooperatively halts the agent.
    ///
    /// No further messages are dequeued after the signal is observed; a
    /// transition already in flight runs to completion. Messages left in the
    /// mailbox are discarded.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Gracefully stops the agent.
    ///
    /// A terminate command is enqueued behind everything already accepted,
    /// so the mailbox drains in FIFO order before the loop exits; the call
    /// then waits for the agent's task to finish.
    #[instrument(skip(self), fields(agent = %self.id))]
    pub async fn stop(&self) -> anyhow::Result<()> {
        if let Err(error) = self.outbox.accept(Command::Terminate).await {
            trace!(agent = %self.id, %error, "agent already stopped");
        }
        self.tracker.wait().await;
        Ok(())
    }

    /// Whether the agent's processing loop has gone away.
    pub fn is_stopped(&self) -> bool {
        self.outbox.is_closed()
    }

    pub(crate) fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }
}

#[async_trait]
impl<M: AgentMessage> Lifecycle for AgentHandle<M> {
    fn id(&self) -> &AgentId {
        &self.id
    }

    fn cancel(&self) {
        AgentHandle::cancel(self);
    }

    async fn stop(&self) -> anyhow::Result<()> {
        AgentHandle::stop(self).await
    }
}
