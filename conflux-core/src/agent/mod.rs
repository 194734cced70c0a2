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

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, instrument, trace};

pub use handle::AgentHandle;
pub use reply::{ReplyAgent, ReplyAgentHandle};

use crate::agent::mailbox::{mailbox, Inbox};
use crate::common::config::CONFIG;
use crate::common::{AgentId, MailboxCapacity};
use crate::message::Command;
use crate::traits::AgentMessage;

mod handle;
pub(crate) mod mailbox;
mod reply;

/// Configures and starts agents.
///
/// An agent is a unit of exclusively-owned state plus a serialized
/// message-processing loop: the transition function is the only code that
/// ever touches the state, and it runs for one message at a time, in arrival
/// order. That structural guarantee is what lets the state be mutated
/// without locks.
pub struct AgentBuilder {
    name: String,
    mailbox: MailboxCapacity,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self {
            name: CONFIG.defaults.agent_name.clone(),
            mailbox: MailboxCapacity::default(),
        }
    }
}

impl AgentBuilder {
    /// A builder whose agent will carry the given label in ids and tracing.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the mailbox capacity policy.
    pub fn mailbox(mut self, capacity: MailboxCapacity) -> Self {
        self.mailbox = capacity;
        self
    }

    /// Bounds the mailbox at `capacity` messages; `send` exerts backpressure
    /// once the bound is reached.
    pub fn mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox = MailboxCapacity::Bounded(capacity);
        self
    }

    /// Starts an agent owning `initial`, applying `transition` to each
    /// dequeued message.
    ///
    /// `transition` consumes the current state and the message and returns
    /// the next state. An `Err` permanently halts the agent; there is no
    /// restart. The returned handle is the only way to reach the agent.
    #[instrument(skip(self, initial, transition), fields(agent = %self.name))]
    pub fn start<S, M, F, Fut>(self, initial: S, transition: F) -> AgentHandle<M>
    where
        S: Send + 'static,
        M: AgentMessage,
        F: FnMut(S, M) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<S>> + Send + 'static,
    {
        let id = AgentId::new(&self.name);
        let (outbox, inbox) = mailbox(self.mailbox);
        let cancellation = CancellationToken::new();
        let tracker = TaskTracker::new();

        tracker.spawn(run(id.clone(), initial, inbox, transition, cancellation.clone()));
        tracker.close();

        AgentHandle {
            id,
            outbox,
            tracker,
            cancellation,
        }
    }
}

/// Shorthand entry point for agents with default configuration.
pub struct Agent;

impl Agent {
    /// Starts an agent with the configured defaults; see
    /// [`AgentBuilder::start`].
    pub fn start<S, M, F, Fut>(initial: S, transition: F) -> AgentHandle<M>
    where
        S: Send + 'static,
        M: AgentMessage,
        F: FnMut(S, M) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<S>> + Send + 'static,
    {
        AgentBuilder::default().start(initial, transition)
    }
}

#[instrument(skip_all, fields(agent = %id))]
async fn run<S, M, F, Fut>(
    id: AgentId,
    mut state: S,
    mut inbox: Inbox<Command<M>>,
    mut transition: F,
    cancellation: CancellationToken,
) where
    S: Send + 'static,
    M: AgentMessage,
    F: FnMut(S, M) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<S>> + Send + 'static,
{
    let mut cancelled = Box::pin(cancellation.cancelled());

    loop {
        let command = tokio::select! {
            biased;
            // React to cancellation before admitting further work; a
            // transition already underway has completed by this point.
            () = &mut cancelled => {
                trace!(agent = %id, "cancellation triggered");
                break;
            }
            next = inbox.recv() => {
                let Some(command) = next else { break };
                command
            }
        };

        match command {
            Command::Terminate => {
                trace!(agent = %id, "terminate received; mailbox drained");
                break;
            }
            Command::Message(message) => {
                state = match transition(state, message).await {
                    Ok(next) => next,
                    Err(error) => {
                        error!(agent = %id, %error, "unhandled transition fault; agent halted");
                        break;
                    }
                };
            }
        }
    }
    trace!(agent = %id, "message loop finished");
}
