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

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::common::MailboxCapacity;
use crate::message::MessageError;

/// Builds the sending and receiving halves of a mailbox under the given
/// capacity policy.
pub(crate) fn mailbox<T>(capacity: MailboxCapacity) -> (Outbox<T>, Inbox<T>) {
    match capacity {
        MailboxCapacity::Bounded(limit) => {
            let (tx, rx) = mpsc::channel(limit.max(1));
            (Outbox::Bounded(tx), Inbox::Bounded(rx))
        }
        MailboxCapacity::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (Outbox::Unbounded(tx), Inbox::Unbounded(rx))
        }
    }
}

/// Sending half of an agent's mailbox.
pub(crate) enum Outbox<T> {
    Bounded(mpsc::Sender<T>),
    Unbounded(mpsc::UnboundedSender<T>),
}

// derive(Clone) would require `T: Clone`; the senders clone on their own.
impl<T> Clone for Outbox<T> {
    fn clone(&self) -> Self {
        match self {
            Outbox::Bounded(tx) => Outbox::Bounded(tx.clone()),
            Outbox::Unbounded(tx) => Outbox::Unbounded(tx.clone()),
        }
    }
}

impl<T> Outbox<T> {
    /// Non-blocking enqueue; fails rather than waits when a bounded mailbox
    /// is full.
    pub(crate) fn try_post(&self, item: T) -> Result<(), MessageError> {
        match self {
            Outbox::Bounded(tx) => tx.try_send(item).map_err(|error| match error {
                TrySendError::Full(_) => MessageError::MailboxFull,
                TrySendError::Closed(_) => MessageError::MailboxClosed,
            }),
            Outbox::Unbounded(tx) => tx.send(item).map_err(MessageError::from),
        }
    }

    /// Enqueue that suspends while a bounded mailbox is full. Completion
    /// means the item was accepted, nothing more.
    pub(crate) async fn accept(&self, item: T) -> Result<(), MessageError> {
        match self {
            Outbox::Bounded(tx) => tx.send(item).await.map_err(MessageError::from),
            Outbox::Unbounded(tx) => tx.send(item).map_err(MessageError::from),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        match self {
            Outbox::Bounded(tx) => tx.is_closed(),
            Outbox::Unbounded(tx) => tx.is_closed(),
        }
    }
}

/// Receiving half of an agent's mailbox; owned by the processing loop.
pub(crate) enum Inbox<T> {
    Bounded(mpsc::Receiver<T>),
    Unbounded(mpsc::UnboundedReceiver<T>),
}

impl<T> Inbox<T> {
    pub(crate) async fn recv(&mut self) -> Option<T> {
        match self {
            Inbox::Bounded(rx) => rx.recv().await,
            Inbox::Unbounded(rx) => rx.recv().await,
        }
    }
}
