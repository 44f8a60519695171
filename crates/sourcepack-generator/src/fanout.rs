//! Settle-all fan-out.
//!
//! Dispatches every item at once and waits for every task to finish. There is
//! no concurrency cap: each fan-out gets a dedicated pool with one thread per
//! item. A failing task never stops its siblings; each item comes back with its
//! own outcome.

use rayon::{ThreadPoolBuilder, prelude::*};
use tracing::{debug, warn};

/// Outcomes of a fan-out, in input order.
#[derive(Debug)]
pub struct Settled<K, T, E> {
    /// Items whose task returned `Ok`.
    pub succeeded: Vec<(K, T)>,

    /// Items whose task returned `Err`.
    pub failed: Vec<(K, E)>,
}

impl<K, T, E> Settled<K, T, E> {
    /// Whether no task failed.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run `task` for every item concurrently and collect every outcome.
pub fn settle_all<K, T, E, F>(items: Vec<K>, task: F) -> Settled<K, T, E>
where
    K: Send,
    T: Send,
    E: Send,
    F: Fn(&K) -> Result<T, E> + Sync + Send,
{
    let width = items.len().max(1);
    let run = || -> Vec<(K, Result<T, E>)> {
        items
            .into_par_iter()
            .with_max_len(1)
            .map(|item| {
                let result = task(&item);
                (item, result)
            })
            .collect()
    };

    let outcomes = match ThreadPoolBuilder::new()
        .num_threads(width)
        .thread_name(|i| format!("sourcepack-task-{i}"))
        .build()
    {
        Ok(pool) => {
            debug!(tasks = width, "dispatching fan-out");
            pool.install(run)
        }
        Err(e) => {
            warn!(error = %e, "cannot start task threads, using the shared pool");
            run()
        }
    };

    let mut settled = Settled {
        succeeded: Vec::with_capacity(outcomes.len()),
        failed: Vec::new(),
    };

    for (item, result) in outcomes {
        match result {
            Ok(value) => settled.succeeded.push((item, value)),
            Err(error) => settled.failed.push((item, error)),
        }
    }

    settled
}
