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

//! # Conflux
//!
//! An in-process concurrency runtime built on Tokio. Conflux gives every
//! piece of mutable state exactly one owner, an **agent** with a FIFO
//! mailbox and a serialized processing loop, and builds the rest of the
//! toolkit on that single rule:
//!
//! - **Agents**: `Agent::start(initial, transition)`; state mutated by one
//!   task, one message at a time, with no locks.
//! - **Ask pattern**: reply agents resolve request futures from inside their
//!   own processing step, so replies are linearized with all other traffic.
//! - **Channels**: CSP-style FIFO matching of senders and receivers, with
//!   matched handlers executed on a shared worker pool.
//! - **Worker pool**: bounded concurrency with explicit
//!   `ExecutionContext` propagation; the context is an ordinary value
//!   captured at submission, not a thread-local.
//! - **Fork-join**: parallel map fanned out over the pool, folded by a
//!   single reducer agent.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use conflux::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = ConfluxApp::launch();
//!
//!     let counter = runtime.spawn_agent(0i64, |state, delta: i64| async move {
//!         Ok(state + delta)
//!     });
//!     counter.post(1);
//!     counter.post(2);
//!     counter.post(3);
//!
//!     runtime.shutdown_all().await?;
//!     Ok(())
//! }
//! ```

/// Prelude module for convenient imports.
pub mod prelude {
    pub use conflux_core::prelude::*;
}
