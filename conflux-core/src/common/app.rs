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

use crate::common::Runtime;
use crate::pool::WorkerPool;

/// Entry point for a Conflux application.
///
/// `ConfluxApp::launch` is the composition root: it constructs the one shared
/// [`WorkerPool`] and hands back a [`Runtime`] through which agents and
/// channels are created. There is no hidden global; anything that needs the
/// pool receives it from the runtime explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfluxApp;

impl ConfluxApp {
    /// Launches the runtime with a default-sized worker pool.
    pub fn launch() -> Runtime {
        Runtime::new(WorkerPool::default())
    }

    /// Launches the runtime around an explicitly configured pool.
    pub fn launch_with_pool(pool: WorkerPool) -> Runtime {
        Runtime::new(pool)
    }
}
