//! Parallel frame pipeline.
//!
//! Fans per-frame compositing out over a bounded worker pool and restores
//! source order before anything downstream sees the frames.
//!
//! The order-restoring merge is generic ([`FramePipeline::map_ordered`]):
//!
//! 1. tag every item with its index
//! 2. dispatch each tagged item to the pool
//! 3. collect `(index, result)` pairs in arrival order over a channel
//! 4. barrier: block until every task finished
//! 5. sort by index, verify the indices are exactly `0..N`, extract values
//!
//! Any failing item fails the whole batch with the error of the lowest
//! failing index. Nothing is retried and no partial output is returned.

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{Result, WatermarkError};
use crate::watermark::{composite_frame, BgrFrame, Overlay};

/// Pipeline section of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Worker threads for frame compositing; 0 means available parallelism (default: 0)
    #[serde(default)]
    pub workers: usize,
}

/// A value paired with the index of the item it was produced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tagged<T> {
    pub index: usize,
    pub value: T,
}

/// Worker count to use when the configuration asks for "automatic".
pub fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Sort tagged results into index order and extract the values.
///
/// Fails if the indices are not exactly `0..expected`, or with the error of
/// the lowest-indexed failed item.
pub fn merge_ordered<U>(mut results: Vec<Tagged<Result<U>>>, expected: usize) -> Result<Vec<U>> {
    results.sort_by_key(|tagged| tagged.index);

    if results.len() != expected {
        return Err(WatermarkError::processing(
            results.len().min(expected),
            format!("expected {} results, got {}", expected, results.len()),
        ));
    }

    let mut values = Vec::with_capacity(expected);
    for (position, tagged) in results.into_iter().enumerate() {
        if tagged.index != position {
            return Err(WatermarkError::processing(
                position,
                format!("result index {} out of sequence", tagged.index),
            ));
        }
        values.push(tagged.value?);
    }

    Ok(values)
}

/// Bounded worker pool for per-frame compositing.
pub struct FramePipeline {
    pool: ThreadPool,
    workers: usize,
}

impl std::fmt::Debug for FramePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePipeline")
            .field("workers", &self.workers)
            .finish()
    }
}

impl FramePipeline {
    /// Create a pipeline with `workers` threads (0 = available parallelism).
    pub fn new(workers: usize) -> Result<Self> {
        let workers = if workers == 0 {
            available_workers()
        } else {
            workers
        };

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("tilemark-worker-{}", i))
            .build()
            .map_err(|e| {
                WatermarkError::configuration(format!("Failed to build worker pool: {}", e))
            })?;

        Ok(Self { pool, workers })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(config.workers)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `f` to every item on the pool, returning results in item order.
    ///
    /// A panic inside `f` is caught and reported as a `Processing` error for
    /// that item instead of unwinding into the caller.
    pub fn map_ordered<T, U, F>(&self, items: Vec<T>, f: F) -> Result<Vec<U>>
    where
        T: Send,
        U: Send,
        F: Fn(usize, T) -> Result<U> + Sync,
    {
        let expected = items.len();
        let (tx, rx) = mpsc::channel::<Tagged<Result<U>>>();

        self.pool.scope(|scope| {
            for (index, item) in items.into_iter().enumerate() {
                let tx = tx.clone();
                let f = &f;
                scope.spawn(move |_| {
                    let value = catch_unwind(AssertUnwindSafe(|| f(index, item)))
                        .unwrap_or_else(|payload| {
                            Err(WatermarkError::processing(index, panic_message(&*payload)))
                        });
                    // The receiver lives until after the scope joins
                    let _ = tx.send(Tagged { index, value });
                });
            }
        });
        drop(tx);

        // Arrival order; restored by merge_ordered
        let results: Vec<Tagged<Result<U>>> = rx.into_iter().collect();
        merge_ordered(results, expected)
    }

    /// Composite the overlay onto every frame, preserving frame order.
    pub fn composite(&self, frames: Vec<BgrFrame>, overlay: &Overlay) -> Result<Vec<BgrFrame>> {
        let frame_count = frames.len();
        let started = Instant::now();
        debug!(frames = frame_count, workers = self.workers, "Dispatching frames");

        let result = self.map_ordered(frames, |index, frame| {
            composite_frame(&frame, overlay).map_err(|e| match e {
                WatermarkError::Processing { .. } => e,
                other => WatermarkError::processing(index, other.to_string()),
            })
        });

        match &result {
            Ok(_) => info!(
                frames = frame_count,
                workers = self.workers,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Composited all frames"
            ),
            Err(e) => warn!(
                frames = frame_count,
                error = %e,
                "Frame compositing failed, discarding batch"
            ),
        }

        result
    }
}
