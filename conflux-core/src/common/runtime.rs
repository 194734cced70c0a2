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
use std::sync::Arc;

use anyhow::Context;
use dashmap::DashMap;
use futures::future::join_all;
use tokio::time::timeout;
use tracing::{instrument, trace};

use crate::agent::{AgentBuilder, AgentHandle, ReplyAgentHandle};
use crate::channel::Channel;
use crate::common::config::CONFIG;
use crate::pool::WorkerPool;
use crate::traits::{AgentMessage, Lifecycle};

/// The composition root of a Conflux application.
///
/// Owns the shared default [`WorkerPool`] and a registry of every root
/// handle it has created, so the whole system can be shut down in one call.
/// The runtime is a convenience: agents, channels, and pools remain
/// independently constructible, and anything needing the pool receives it
/// explicitly rather than through hidden global state.
#[derive(Clone)]
pub struct Runtime {
    pool: Arc<WorkerPool>,
    roots: Arc<DashMap<String, Arc<dyn Lifecycle>>>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("pool", &self.pool)
            .field("roots", &self.roots.len())
            .finish()
    }
}

impl Runtime {
    pub(crate) fn new(pool: WorkerPool) -> Self {
        Self {
            pool: Arc::new(pool),
            roots: Arc::new(DashMap::new()),
        }
    }

    /// The shared worker pool.
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// The number of root handles currently registered.
    pub fn agent_count(&self) -> usize {
        self.roots.len()
    }

    fn register(&self, root: Arc<dyn Lifecycle>) {
        trace!(id = %root.id(), "registering root");
        self.roots.insert(root.id().to_string(), root);
    }

    /// Starts an agent with default configuration and registers it for
    /// shutdown.
    pub fn spawn_agent<S, M, F, Fut>(&self, initial: S, transition: F) -> AgentHandle<M>
    where
        S: Send + 'static,
        M: AgentMessage,
        F: FnMut(S, M) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<S>> + Send + 'static,
    {
        self.spawn_agent_named(CONFIG.defaults.agent_name.clone(), initial, transition)
    }

    /// Starts a named agent and registers it for shutdown.
    pub fn spawn_agent_named<S, M, F, Fut>(
        &self,
        name: impl Into<String>,
        initial: S,
        transition: F,
    ) -> AgentHandle<M>
    where
        S: Send + 'static,
        M: AgentMessage,
        F: FnMut(S, M) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<S>> + Send + 'static,
    {
        let handle = AgentBuilder::named(name).start(initial, transition);
        self.register(Arc::new(handle.clone()));
        handle
    }

    /// Starts a reply agent and registers it for shutdown.
    pub fn spawn_reply_agent<S, M, R, P, PFut, A, AFut>(
        &self,
        name: impl Into<String>,
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
        let handle = AgentBuilder::named(name).start_replying(initial, project, respond);
        self.register(Arc::new(handle.clone()));
        handle
    }

    /// Creates an unbounded channel backed by the shared pool and registers
    /// it for shutdown.
    pub fn channel<T: AgentMessage>(&self) -> Channel<T> {
        let channel = Channel::new(Arc::clone(&self.pool));
        self.register(Arc::new(channel.clone()));
        channel
    }

    /// Creates a bounded channel backed by the shared pool and registers it
    /// for shutdown.
    pub fn bounded_channel<T: AgentMessage>(&self, capacity: usize) -> Channel<T> {
        let channel = Channel::bounded(capacity, Arc::clone(&self.pool));
        self.register(Arc::new(channel.clone()));
        channel
    }

    /// Shuts down every registered root, then the shared pool.
    ///
    /// Roots stop concurrently and gracefully (mailboxes drain first), under
    /// the configured system shutdown timeout.
    #[instrument(skip(self))]
    pub async fn shutdown_all(&self) -> anyhow::Result<()> {
        let roots: Vec<Arc<dyn Lifecycle>> = self
            .roots
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.roots.clear();

        let stop_all = join_all(roots.iter().map(|root| root.stop()));
        let results = timeout(CONFIG.shutdown_timeout(), stop_all)
            .await
            .context("system shutdown timed out")?;
        for result in results {
            result?;
        }

        self.pool.stop().await
    }
}
