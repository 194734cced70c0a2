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
use std::future::Future;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, instrument, trace};

use crate::agent::mailbox::{mailbox, Inbox, Outbox};
use crate::agent::AgentBuilder;
use crate::common::AgentId;
use crate::message::{Command, Envelope, MessageError};
use crate::traits::{AgentMessage, Lifecycle};

impl AgentBuilder {
    /// Starts a reply agent: an agent that additionally answers `ask`
    /// requests from inside its serialized processing step.
    ///
    /// `project` is the ordinary fold applied to `post`/`send` messages;
    /// `respond` handles `ask` messages and returns both the next state and
    /// the reply. Because the reply sink is completed inside the same step
    /// that updates the state, every reply reflects a consistent, totally
    /// ordered state transition relative to all other traffic on the agent.
    #[instrument(skip(self, initial, project, respond), fields(agent = %self.name))]
    pub fn start_replying<S, M, R, P, PFut, A, AFut>(
        self,
        initial: S,
        project: P,
        respond: A,
    ) -> ReplyAgentHandle<M, R>
    where
        S: Send + 'static,
        M: AgentMessage,
        R: AgentMessage,
        P: FnMut(S, M) -> PFut + Send + 'static,
        PFut: Future<Output = anyhow::Result<S>> + Send + 'static,
        A: FnMut(S, M) -> AFut + Send + 'static,
        AFut: Future<Output = anyhow::Result<(S, R)>> + Send + 'static,
    {
        let id = AgentId::new(&self.name);
        let (outbox, inbox) = mailbox(self.mailbox);
        let cancellation = CancellationToken::new();
        let tracker = TaskTracker::new();

        tracker.spawn(run_replying(
            id.clone(),
            initial,
            inbox,
            project,
            respond,
            cancellation.clone(),
        ));
        tracker.close();

        ReplyAgentHandle {
            id,
            outbox,
            tracker,
            cancellation,
        }
    }
}

/// Shorthand entry point for reply agents with default configuration.
pub struct ReplyAgent;

impl ReplyAgent {
    /// Starts a reply agent with the configured defaults; see
    /// [`AgentBuilder::start_replying`].
    pub fn start<S, M, R, P, PFut, A, AFut>(
        initial: S,
        project: P,
        respond: A,
    ) -> ReplyAgentHandle<M, R>
    where
        S: Send + 'static,
        M: AgentMessage,
        R: AgentMessage,
        P: FnMut(S, M) -> PFut + Send + 'static,
        PFut: Future<Output = anyhow::Result<S>> + Send + 'static,
        A: FnMut(S, M) -> AFut + Send + 'static,
        AFut: Future<Output = anyhow::Result<(S, R)>> + Send + 'static,
    {
        AgentBuilder::default().start_replying(initial, project, respond)
    }
}

/// A clonable handle for interacting with a reply agent.
///
/// Extends the plain agent surface with [`ask`](Self::ask): request/reply
/// messaging where the reply future is resolved by the agent's own
/// processing step.
pub struct ReplyAgentHandle<M, R> {
    pub(crate) id: AgentId,
    pub(crate) outbox: Outbox<Command<Envelope<M, R>>>,
    pub(crate) tracker: TaskTracker,
    pub(crate) cancellation: CancellationToken,
}

impl<M, R> Clone for ReplyAgentHandle<M, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            outbox: self.outbox.clone(),
            tracker: self.tracker.clone(),
            cancellation: self.cancellation.clone(),
        }
    }
}

impl<M, R> fmt::Debug for ReplyAgentHandle<M, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyAgentHandle")
            .field("id", &self.id)
            .finish()
    }
}

impl<M, R> PartialEq for ReplyAgentHandle<M, R> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<M, R> Eq for ReplyAgentHandle<M, R> {}

impl<M, R> Hash for ReplyAgentHandle<M, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<M: AgentMessage, R: AgentMessage> ReplyAgentHandle<M, R> {
    /// The agent's identity.
    pub fn id(&self) -> &AgentId {
        &self.id
    }

    /// Non-blocking enqueue of a fire-and-forget message; dropped with a
    /// trace event if the agent has stopped or a bounded mailbox is full.
    pub fn post(&self, message: M) {
        if let Err(error) = self.outbox.try_post(Command::Message(Envelope::tell(message))) {
            trace!(agent = %self.id, %error, "dropping posted message");
        }
    }

    /// Enqueues a fire-and-forget message; completes on mailbox acceptance,
    /// not on processing.
    #[instrument(skip_all, fields(agent = %self.id))]
    pub async fn send(&self, message: M) -> Result<(), MessageError> {
        self.outbox
            .accept(Command::Message(Envelope::tell(message)))
            .await
    }

    /// Sends a request and resolves with the agent's reply.
    ///
    /// The reply is computed and the sink completed inside the agent's
    /// serialized step, so concurrent `ask` calls never race on state. If the
    /// agent halts before replying, the future resolves to
    /// [`MessageError::ReplyDropped`].
    #[instrument(skip_all, fields(agent = %self.id))]
    pub async fn ask(&self, message: M) -> Result<R, MessageError> {
        let (reply_to, reply) = oneshot::channel();
        self.outbox
            .accept(Command::Message(Envelope::request(message, reply_to)))
            .await?;
        reply.await.map_err(|_| MessageError::ReplyDropped)
    }

    /// Cooperatively halts the agent; see [`AgentHandle::cancel`](crate::agent::AgentHandle::cancel).
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Gracefully stops the agent, draining the mailbox FIFO first.
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
}

#[async_trait]
impl<M: AgentMessage, R: AgentMessage> Lifecycle for ReplyAgentHandle<M, R> {
    fn id(&self) -> &AgentId {
        &self.id
    }

    fn cancel(&self) {
        ReplyAgentHandle::cancel(self);
    }

    async fn stop(&self) -> anyhow::Result<()> {
        ReplyAgentHandle::stop(self).await
    }
}

#[instrument(skip_all, fields(agent = %id))]
async fn run_replying<S, M, R, P, PFut, A, AFut>(
    id: AgentId,
    mut state: S,
    mut inbox: Inbox<Command<Envelope<M, R>>>,
    mut project: P,
    mut respond: A,
    cancellation: CancellationToken,
) where
    S: Send + 'static,
    M: AgentMessage,
    R: AgentMessage,
    P: FnMut(S, M) -> PFut + Send + 'static,
    PFut: Future<Output = anyhow::Result<S>> + Send + 'static,
    A: FnMut(S, M) -> AFut + Send + 'static,
    AFut: Future<Output = anyhow::Result<(S, R)>> + Send + 'static,
{
    let mut cancelled = Box::pin(cancellation.cancelled());

    loop {
        let command = tokio::select! {
            biased;
            () = &mut cancelled => {
                trace!(agent = %id, "cancellation triggered");
                break;
            }
            next = inbox.recv() => {
                let Some(command) = next else { break };
                command
            }
        };

        let envelope = match command {
            Command::Terminate => {
                trace!(agent = %id, "terminate received; mailbox drained");
                break;
            }
            Command::Message(envelope) => envelope,
        };

        trace!(agent = %id, queued_for = ?envelope.sent_at.elapsed());
        let Envelope {
            message, reply_to, ..
        } = envelope;

        state = match reply_to {
            // Plain fold: no reply sink present.
            None => match project(state, message).await {
                Ok(next) => next,
                Err(error) => {
                    error!(agent = %id, %error, "unhandled transition fault; agent halted");
                    break;
                }
            },
            // Ask: update state and complete the sink inside this same step.
            Some(sink) => match respond(state, message).await {
                Ok((next, reply)) => {
                    if sink.send(reply).is_err() {
                        trace!(agent = %id, "asker went away before the reply");
                    }
                    next
                }
                Err(error) => {
                    error!(agent = %id, %error, "unhandled ask fault; agent halted");
                    break;
                }
            },
        };
    }
    trace!(agent = %id, "message loop finished");
}
