/*!
 * vtask demo
 *
 * Four ways of launching lightweight tasks and combining their results:
 * 1. Fire-and-forget spawn of a closure
 * 2. Spawn returning a handle that is awaited
 * 3. A scoped executor running 10,000 sleeping tasks, drained on close
 * 4. Two independent results combined and consumed by a continuation
 */

use anyhow::Context as _;
use std::time::{Duration, Instant};
use tracing::info;
use vtask::{combine, init_tracing, ExecutorConfig, TaskExecutor};

const BATCH_SIZE: usize = 10_000;
const BATCH_SLEEP: Duration = Duration::from_secs(1);

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ExecutorConfig::from_env();
    let executor = TaskExecutor::new(config.clone()).context("building executor")?;

    // Method 1: fire and forget
    executor.spawn_blocking(|| info!("Inside runnable (fire and forget)"))?;

    // Method 2: keep the handle and wait on it
    let handle = executor.spawn(async { info!("Inside runnable (awaited)") })?;
    executor.block_on(handle)?;

    // Method 3: scoped executor; leaving the block drains every task
    {
        let started = Instant::now();
        let scoped = TaskExecutor::new(config).context("building scoped executor")?;
        scoped.submit_many((0..BATCH_SIZE).map(|i| async move {
            tokio::time::sleep(BATCH_SLEEP).await;
            i
        }))?;
        info!(
            tasks = BATCH_SIZE,
            workers = scoped.config().worker_threads,
            "Batch submitted; closing scope"
        );
        scoped.shutdown_blocking();

        let stats = scoped.stats();
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            stats = %serde_json::to_string(&stats)?,
            "Batch drained"
        );
    }

    // Method 4: combine two independent results, then consume
    let first = executor.spawn(async { "Result1".to_string() })?;
    let second = executor.spawn(async { "Result2".to_string() })?;
    let combined = combine(&first, &second, |a, b| format!("{} {}", a, b));
    combined.on_complete(|result| match result {
        Ok(text) => println!("{}", text),
        Err(err) => tracing::error!(error = %err, "combine failed"),
    });

    executor.shutdown_blocking();
    // Surface a combine failure as the exit status
    combined.wait_blocking()?;

    info!(stats = ?executor.stats(), "Demo finished");
    Ok(())
}
