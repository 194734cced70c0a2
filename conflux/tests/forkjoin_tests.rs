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

use std::time::Duration;

use conflux::prelude::*;

mod setup;

/// With a commutative, associative reduce, the result is identical at every
/// parallelism level despite non-deterministic branch completion order.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sum_of_squares_is_deterministic_across_parallelism() -> anyhow::Result<()> {
    setup::initialize_tracing();

    let pool = WorkerPool::new(4);
    for parallelism in [1usize, 2, 4] {
        let total = fork_join(
            &pool,
            1..=5i64,
            |x| async move { Ok(vec![x * x]) },
            |acc, x| async move { Ok(acc + x) },
            0i64,
            parallelism,
            2,
        )
        .await?;
        assert_eq!(total, 55, "parallelism {parallelism}");
    }
    pool.stop().await?;
    Ok(())
}

/// Each map invocation may flatten into zero or more items.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn map_flattens_into_multiple_items() -> anyhow::Result<()> {
    setup::initialize_tracing();

    let pool = WorkerPool::new(2);
    let total = fork_join(
        &pool,
        vec![1i64, 2, 3],
        |x| async move {
            if x == 2 {
                Ok(vec![])
            } else {
                Ok(vec![x, x * 10])
            }
        },
        |acc, x| async move { Ok(acc + x) },
        0i64,
        2,
        4,
    )
    .await?;
    // 1 + 10 + 3 + 30; the 2 maps to nothing.
    assert_eq!(total, 44);
    pool.stop().await?;
    Ok(())
}

/// An empty source completes immediately with the initial accumulator.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_source_yields_initial() -> anyhow::Result<()> {
    setup::initialize_tracing();

    let pool = WorkerPool::new(2);
    let total = fork_join(
        &pool,
        Vec::<i64>::new(),
        |x| async move { Ok(vec![x]) },
        |acc, x| async move { Ok(acc + x) },
        99i64,
        2,
        2,
    )
    .await?;
    assert_eq!(total, 99);
    pool.stop().await?;
    Ok(())
}

/// A fault in the map stage faults the whole session; no partial result.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn map_fault_faults_the_session() -> anyhow::Result<()> {
    setup::initialize_tracing();

    let pool = WorkerPool::new(2);
    let outcome = fork_join(
        &pool,
        1..=100i64,
        |x| async move {
            if x == 13 {
                Err(anyhow::anyhow!("unlucky input"))
            } else {
                Ok(vec![x])
            }
        },
        |acc, x| async move { Ok(acc + x) },
        0i64,
        2,
        4,
    )
    .await;

    let error = outcome.expect_err("map fault must surface");
    assert!(error.to_string().contains("map stage"), "{error:#}");
    pool.stop().await?;
    Ok(())
}

/// A fault in the reduce stage surfaces the original error from the outer
/// future; remaining items drain without further folding.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reduce_fault_faults_the_session() -> anyhow::Result<()> {
    setup::initialize_tracing();

    let pool = WorkerPool::new(2);
    let outcome = fork_join(
        &pool,
        1..=20i64,
        |x| async move { Ok(vec![x]) },
        |acc, x| async move {
            if x == 7 {
                Err(anyhow::anyhow!("accumulator rejected 7"))
            } else {
                Ok(acc + x)
            }
        },
        0i64,
        2,
        4,
    )
    .await;

    let error = outcome.expect_err("reduce fault must surface");
    assert!(error.to_string().contains("rejected 7"), "{error:#}");
    pool.stop().await?;
    Ok(())
}

/// A tiny input buffer forces producer suspension without affecting the
/// result, even with a slow reducer.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn bounded_buffer_backpressure_preserves_result() -> anyhow::Result<()> {
    setup::initialize_tracing();

    let pool = WorkerPool::new(4);
    let total = fork_join(
        &pool,
        0..200i64,
        |x| async move { Ok(vec![x]) },
        |acc, x| async move {
            if x % 50 == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            Ok(acc + x)
        },
        0i64,
        2,
        1,
    )
    .await?;
    assert_eq!(total, (0..200i64).sum::<i64>());
    pool.stop().await?;
    Ok(())
}
