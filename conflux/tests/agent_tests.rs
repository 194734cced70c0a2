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

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::timeout;

use conflux::prelude::*;

mod setup;

/// Posts 1, 2, 3 to a summing agent and checks the drained state is 6.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn posted_messages_drain_in_order() -> anyhow::Result<()> {
    setup::initialize_tracing();

    let mirror = Arc::new(AtomicI64::new(0));
    let observed = Arc::clone(&mirror);
    let agent = Agent::start(0i64, move |state, delta: i64| {
        let observed = Arc::clone(&observed);
        async move {
            let next = state + delta;
            observed.store(next, Ordering::SeqCst);
            Ok(next)
        }
    });

    agent.post(1);
    agent.post(2);
    agent.post(3);

    // stop() rides the mailbox FIFO, so everything above is applied first.
    agent.stop().await?;
    assert_eq!(mirror.load(Ordering::SeqCst), 6);
    Ok(())
}

/// The final agent state equals the left fold of the message sequence.
/// The transition is deliberately non-commutative so reordering would show.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn state_equals_left_fold_of_messages() -> anyhow::Result<()> {
    setup::initialize_tracing();

    let messages = vec![3i64, 1, 4, 1, 5, 9, 2, 6];
    let expected = messages.iter().fold(7i64, |acc, m| acc * 31 + m);

    let mirror = Arc::new(AtomicI64::new(0));
    let observed = Arc::clone(&mirror);
    let agent = Agent::start(7i64, move |state, message: i64| {
        let observed = Arc::clone(&observed);
        async move {
            let next = state * 31 + message;
            observed.store(next, Ordering::SeqCst);
            Ok(next)
        }
    });

    for message in messages {
        agent.send(message).await?;
    }
    agent.stop().await?;

    assert_eq!(mirror.load(Ordering::SeqCst), expected);
    Ok(())
}

/// `send` resolves on mailbox acceptance, not on processing, and a bounded
/// mailbox makes further sends wait.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn send_completes_on_acceptance_not_processing() -> anyhow::Result<()> {
    setup::initialize_tracing();

    let gate = Arc::new(Notify::new());
    let processed = Arc::new(AtomicI64::new(0));

    let step = Arc::clone(&gate);
    let seen = Arc::clone(&processed);
    let agent = AgentBuilder::named("gated")
        .mailbox_capacity(1)
        .start(0i64, move |state, value: i64| {
            let step = Arc::clone(&step);
            let seen = Arc::clone(&seen);
            async move {
                step.notified().await;
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(state + value)
            }
        });

    // First message is dequeued and parks in the transition; second fills
    // the single mailbox slot. Both sends complete with nothing processed.
    agent.send(1).await?;
    agent.send(2).await?;
    assert_eq!(processed.load(Ordering::SeqCst), 0);

    // Third send finds the mailbox full and must wait.
    let blocked = timeout(Duration::from_millis(50), agent.send(3)).await;
    assert!(blocked.is_err(), "send should wait while the mailbox is full");

    gate.notify_one();
    agent.send(3).await?;
    gate.notify_one();
    gate.notify_one();

    agent.stop().await?;
    assert_eq!(processed.load(Ordering::SeqCst), 3);
    Ok(())
}

/// Cancellation lets the in-flight transition finish but dequeues nothing
/// further; already-enqueued messages are discarded.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_stops_dequeuing_after_inflight_step() -> anyhow::Result<()> {
    setup::initialize_tracing();

    let gate = Arc::new(Notify::new());
    let processed = Arc::new(AtomicI64::new(0));

    let step = Arc::clone(&gate);
    let seen = Arc::clone(&processed);
    let agent = Agent::start(0i64, move |state, value: i64| {
        let step = Arc::clone(&step);
        let seen = Arc::clone(&seen);
        async move {
            step.notified().await;
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(state + value)
        }
    });

    agent.send(1).await?;
    agent.send(2).await?;
    agent.send(3).await?;

    // Give the loop a moment to pick up the first message.
    tokio::time::sleep(Duration::from_millis(20)).await;
    agent.cancel();
    gate.notify_one();

    agent.stop().await?;
    assert_eq!(processed.load(Ordering::SeqCst), 1);
    Ok(())
}

enum Op {
    Add(i64),
    Explode,
}

/// An `Err` from the transition permanently halts the agent.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn transition_fault_halts_agent_permanently() -> anyhow::Result<()> {
    setup::initialize_tracing();

    let mirror = Arc::new(AtomicI64::new(0));
    let observed = Arc::clone(&mirror);
    let agent = Agent::start(0i64, move |state, op: Op| {
        let observed = Arc::clone(&observed);
        async move {
            match op {
                Op::Add(value) => {
                    let next = state + value;
                    observed.store(next, Ordering::SeqCst);
                    Ok(next)
                }
                Op::Explode => Err(anyhow::anyhow!("boom")),
            }
        }
    });

    agent.send(Op::Add(5)).await?;
    agent.send(Op::Explode).await?;
    // Racing the halt: this message is either accepted and discarded, or
    // refused outright. It must never be applied.
    let _ = agent.send(Op::Add(7)).await;

    // stop() returns once the (now dead) loop task is gone.
    agent.stop().await?;
    assert_eq!(mirror.load(Ordering::SeqCst), 5);
    assert!(agent.is_stopped());

    let refused = agent.send(Op::Add(1)).await;
    assert_eq!(refused, Err(MessageError::MailboxClosed));
    Ok(())
}

/// Posting to a stopped agent drops the message without panicking.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn post_after_stop_is_silently_dropped() -> anyhow::Result<()> {
    setup::initialize_tracing();

    let agent = Agent::start(0u64, |state, _message: u64| async move { Ok(state + 1) });
    agent.stop().await?;

    agent.post(9);
    let refused = agent.send(9).await;
    assert_eq!(refused, Err(MessageError::MailboxClosed));
    Ok(())
}
