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

use std::time::Instant;

use static_assertions::assert_impl_all;
use tokio::sync::oneshot;

/// An envelope carrying a message through a reply agent's mailbox.
///
/// The reply sink is a single-shot slot: when present, it is completed
/// exactly once, inside the agent's own processing step, never externally.
/// Envelopes created by `post`/`send` carry no sink and fall through to the
/// agent's ordinary fold.
pub struct Envelope<M, R> {
    /// The message contained in the envelope.
    pub message: M,
    /// The time the envelope entered the mailbox.
    pub sent_at: Instant,
    pub(crate) reply_to: Option<oneshot::Sender<R>>,
}

impl<M, R> Envelope<M, R> {
    /// Wraps a fire-and-forget message.
    pub(crate) fn tell(message: M) -> Self {
        Envelope {
            message,
            sent_at: Instant::now(),
            reply_to: None,
        }
    }

    /// Wraps a request whose reply resolves the given sink.
    pub(crate) fn request(message: M, reply_to: oneshot::Sender<R>) -> Self {
        Envelope {
            message,
            sent_at: Instant::now(),
            reply_to: Some(reply_to),
        }
    }
}

// Ensures that envelopes can cross into the agent's task.
assert_impl_all!(Envelope<String, usize>: Send);
