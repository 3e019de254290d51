//! Concurrent execution of parallel plan groups.
//!
//! A [`Operation::Parallel`] group holds gather/load pairs for types with
//! no ordering dependency on one another. The pairs are distributed over a
//! bounded pool of worker threads and joined with a deadline: all members
//! are awaited, the first member failure is propagated once the group has
//! drained, and a deadline expiry abandons the remaining siblings (they
//! run to completion detached) and surfaces a timeout.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;

use super::context::RequestState;
use crate::error::Error;
use crate::plan::Operation;
use crate::schema::EntityType;

/// Execute a parallel group's operations.
pub(crate) fn run_group(state: &RequestState, operations: &[Operation]) -> Result<(), Error> {
    let Some(members) = pair_members(operations) else {
        // Not a recognizable set of gather/load pairs; run the operations
        // in plan order instead.
        for operation in operations {
            state.execute_operation(operation)?;
        }
        return Ok(());
    };

    let workers = state.shared.config.parallelism.min(members.len());
    if workers <= 1 {
        for member in members {
            state.gather(member)?;
            state.load(member)?;
        }
        return Ok(());
    }

    debug!(members = members.len(), workers, "executing parallel group");
    let timeout = state.shared.config.parallel_timeout;
    let deadline = Instant::now() + timeout;
    let expected = members.len();

    let (member_tx, member_rx) = mpsc::channel::<EntityType>();
    for member in members {
        // The receiver outlives this loop; sends cannot fail.
        let _ = member_tx.send(member);
    }
    drop(member_tx);
    let member_rx = Arc::new(Mutex::new(member_rx));

    let (result_tx, result_rx) = mpsc::channel::<Result<(), Error>>();
    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let state = state.clone();
        let member_rx = Arc::clone(&member_rx);
        let result_tx = result_tx.clone();
        handles.push(thread::spawn(move || {
            loop {
                let member = { member_rx.lock().recv() };
                let Ok(member) = member else {
                    break;
                };
                let result = state.gather(member).and_then(|()| state.load(member));
                if result_tx.send(result).is_err() {
                    break;
                }
            }
        }));
    }
    drop(result_tx);

    let mut first_failure = None;
    for _ in 0..expected {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match result_rx.recv_timeout(remaining) {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                if first_failure.is_none() {
                    first_failure = Some(error);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                return Err(Error::ParallelTimeout {
                    elapsed_ms: timeout.as_millis() as u64,
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(first_failure.unwrap_or(Error::ParallelWorkerLost));
            }
        }
    }

    for handle in handles {
        let _ = handle.join();
    }
    match first_failure {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Split a group into its gather/load member types, or `None` when the
/// operations are not plain pairs.
fn pair_members(operations: &[Operation]) -> Option<Vec<EntityType>> {
    if operations.len() % 2 != 0 {
        return None;
    }
    let mut members = Vec::with_capacity(operations.len() / 2);
    for pair in operations.chunks(2) {
        match pair {
            [Operation::GatherForeignKeysTo(gather), Operation::LoadEntities(load)]
                if gather == load =>
            {
                members.push(*gather);
            }
            _ => return None,
        }
    }
    Some(members)
}
