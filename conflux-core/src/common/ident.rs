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
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity for an agent, channel coordinator, or pool.
///
/// Pairs a human-readable label with a monotonically increasing sequence
/// number, so tracing output stays readable while equality and hashing stay
/// unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentId {
    label: Arc<str>,
    sequence: u64,
}

impl AgentId {
    /// Mints a fresh id with the given label.
    pub fn new(label: &str) -> Self {
        Self {
            label: Arc::from(label),
            sequence: NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// The label this id was minted with.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.label, self.sequence)
    }
}
