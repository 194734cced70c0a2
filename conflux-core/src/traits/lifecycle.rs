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

use async_trait::async_trait;

use crate::common::AgentId;

/// Common lifecycle surface shared by agent handles, channels, and pools.
///
/// The runtime stores roots as `Arc<dyn Lifecycle>` so heterogeneous handles
/// can be shut down uniformly.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// The identity of the underlying component.
    fn id(&self) -> &AgentId;

    /// Cooperatively halts the component: admission stops, in-flight work
    /// runs to completion, nothing further is dequeued.
    fn cancel(&self);

    /// Gracefully stops the component, letting accepted work drain first,
    /// and waits for its tasks to finish.
    async fn stop(&self) -> anyhow::Result<()>;
}
