// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Region sweep scheduling.

The region range is cut into chunks of `chunk_size`. In parallel mode the
chunks are fitted on the rayon pool; each chunk checks the cancellation flag
before it starts. Chunk results are merged by region index in one sequential
pass, so the output order never depends on scheduling.
*/

use std::sync::atomic::{AtomicBool, Ordering};

use laminar_config::ExecutionMode;
use rayon::prelude::*;

use crate::error::{AnalysisError, AnalysisResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOptions {
    pub mode: ExecutionMode,
    pub chunk_size: usize,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Parallel,
            chunk_size: 100,
        }
    }
}

/// Evaluate `fit` for every region in `0..n_regions`, in region order.
pub fn sweep_regions<T, F>(
    n_regions: usize,
    options: SweepOptions,
    cancel: &AtomicBool,
    fit: F,
) -> AnalysisResult<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    let chunk_size = options.chunk_size.max(1);
    let chunks: Vec<(usize, usize)> = (0..n_regions)
        .step_by(chunk_size)
        .map(|start| (start, (start + chunk_size).min(n_regions)))
        .collect();

    let run_chunk = |&(start, end): &(usize, usize)| -> Option<Vec<T>> {
        if cancel.load(Ordering::Relaxed) {
            return None;
        }
        Some((start..end).map(&fit).collect())
    };

    let chunk_results: Vec<Option<Vec<T>>> = match options.mode {
        ExecutionMode::Sequential => chunks.iter().map(run_chunk).collect(),
        ExecutionMode::Parallel => chunks.par_iter().map(run_chunk).collect(),
    };

    let mut rows = Vec::with_capacity(n_regions);
    for chunk in chunk_results {
        match chunk {
            Some(chunk_rows) => rows.extend(chunk_rows),
            None => {
                tracing::warn!("Region sweep cancelled after {} regions", rows.len());
                return Err(AnalysisError::Cancelled {
                    completed: rows.len(),
                    total: n_regions,
                });
            }
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_matches_sequential() {
        let cancel = AtomicBool::new(false);
        let fit = |region: usize| region * region;
        let sequential = sweep_regions(
            1000,
            SweepOptions {
                mode: ExecutionMode::Sequential,
                chunk_size: 64,
            },
            &cancel,
            fit,
        )
        .unwrap();
        let parallel = sweep_regions(1000, SweepOptions::default(), &cancel, fit).unwrap();

        assert_eq!(sequential.len(), 1000);
        assert_eq!(sequential, parallel);
        assert_eq!(parallel[999], 998001);
    }

    #[test]
    fn test_cancelled_sweep() {
        let cancel = AtomicBool::new(true);
        let result = sweep_regions(10, SweepOptions::default(), &cancel, |r| r);
        assert!(matches!(
            result,
            Err(AnalysisError::Cancelled { completed: 0, total: 10 })
        ));
    }

    #[test]
    fn test_cancel_between_chunks() {
        let cancel = AtomicBool::new(false);
        let options = SweepOptions {
            mode: ExecutionMode::Sequential,
            chunk_size: 3,
        };
        let result = sweep_regions(9, options, &cancel, |r| {
            if r == 4 {
                cancel.store(true, Ordering::Relaxed);
            }
            r
        });
        assert!(matches!(
            result,
            Err(AnalysisError::Cancelled { completed: 6, total: 9 })
        ));
    }

    #[test]
    fn test_empty_range() {
        let cancel = AtomicBool::new(false);
        assert!(sweep_regions(0, SweepOptions::default(), &cancel, |r| r)
            .unwrap()
            .is_empty());
    }
}
