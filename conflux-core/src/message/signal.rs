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

/// The item type that actually travels through an agent's mailbox.
///
/// `Terminate` rides the same FIFO as ordinary messages, so a graceful stop
/// processes everything enqueued ahead of it before the loop exits.
pub(crate) enum Command<M> {
    /// An ordinary message for the agent's transition function.
    Message(M),
    /// Signal to stop the agent once everything ahead of it has been applied.
    Terminate,
}
