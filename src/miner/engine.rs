//! Parallel proof-of-work nonce search.
//!
//! Each worker owns a private copy of the block and walks its own nonce
//! range. Workers share an atomic abort flag, a bounded result sink and an
//! atomic found flag. The found flag is claimed with a compare-and-set before
//! delivery, so at most one block is reported per round. Both flags are plain
//! loads in the hot loop.

use crate::error::ChainError;
use crate::miner::pow::meets_target;
use crate::miner::task::{MiningResult, Task};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use primitive_types::U256;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Nonces `[min, max]` searched starting at `seed` and wrapping to `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceRange {
    seed: u64,
    min: u64,
    max: u64,
}

impl NonceRange {
    pub fn new(seed: u64, min: u64, max: u64) -> Result<Self, ChainError> {
        if min > max {
            return Err(ChainError::InvalidNonceRange(format!(
                "min {} is greater than max {}",
                min, max
            )));
        }
        if seed < min || seed > max {
            return Err(ChainError::InvalidNonceRange(format!(
                "seed {} outside [{}, {}]",
                seed, min, max
            )));
        }
        Ok(NonceRange { seed, min, max })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    /// The nonce tried after `nonce`.
    #[inline]
    fn next(&self, nonce: u64) -> u64 {
        if nonce == self.max {
            self.min
        } else {
            nonce + 1
        }
    }
}

/// Splits the whole `u64` nonce space into `workers` disjoint ranges, each
/// starting at a random seed.
pub fn partition_nonces<R: Rng + ?Sized>(workers: usize, rng: &mut R) -> Vec<NonceRange> {
    let workers = workers.max(1) as u64;
    let step = u64::MAX / workers;

    (0..workers)
        .map(|i| {
            let min = i * step;
            let max = if i == workers - 1 {
                u64::MAX
            } else {
                min + step - 1
            };
            NonceRange {
                seed: rng.gen_range(min..=max),
                min,
                max,
            }
        })
        .collect()
}

/// Fires the abort signal for every worker of a round.
#[derive(Debug)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Drop for AbortHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Read side of the abort signal. Fires once, when its handle aborts or is dropped.
#[derive(Debug, Clone)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    #[inline]
    pub fn is_fired(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub fn abort_signal() -> (AbortHandle, AbortSignal) {
    let flag = Arc::new(AtomicBool::new(false));
    (AbortHandle(Arc::clone(&flag)), AbortSignal(flag))
}

/// How a single worker left the search loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Found a nonce and delivered the block.
    Found,
    /// Tried every nonce in its range and reported exhaustion.
    Exhausted,
    /// Another worker claimed the round first.
    Superseded,
    /// The abort signal fired, possibly while delivering.
    Aborted,
}

/// Outcome of a round as seen by the caller.
#[derive(Debug)]
pub enum RoundOutcome {
    Found(MiningResult),
    /// Every worker exhausted its range without success.
    Exhausted,
    /// Workers stopped without a result, because the round was aborted.
    Aborted,
    /// `wait_timeout` gave up; the round is still running.
    TimedOut,
}

struct Worker {
    id: usize,
    task: Arc<Task>,
    range: NonceRange,
    target: U256,
    abort: AbortSignal,
    found: Arc<AtomicBool>,
    sink: Sender<Option<MiningResult>>,
}

impl Worker {
    fn run(self) -> WorkerExit {
        let mut block = self.task.generate_block();
        let mut nonce = self.range.seed;

        loop {
            if self.abort.is_fired() {
                debug!("worker {}: nonce finding aborted", self.id);
                return WorkerExit::Aborted;
            }
            if self.found.load(Ordering::Acquire) {
                debug!("worker {}: exit as nonce is found by another worker", self.id);
                return WorkerExit::Superseded;
            }

            block.header.nonce = nonce;
            let hash = block.header.hash();

            if meets_target(&hash, &self.target) {
                if self
                    .found
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    return WorkerExit::Superseded;
                }

                block.header_hash = hash;
                let result = MiningResult {
                    task: Arc::clone(&self.task),
                    block,
                };
                return if self.deliver(Some(result)) {
                    info!("worker {}: nonce finding succeeded, nonce {}", self.id, nonce);
                    WorkerExit::Found
                } else {
                    WorkerExit::Aborted
                };
            }

            nonce = self.range.next(nonce);
            if nonce == self.range.seed {
                return if self.deliver(None) {
                    info!("worker {}: nonce finding outage", self.id);
                    WorkerExit::Exhausted
                } else {
                    WorkerExit::Aborted
                };
            }
        }
    }

    /// Sends to the sink unless the round is aborted first. Returns whether
    /// the message was delivered.
    ///
    /// The sink has one slot per worker and each worker sends at most once,
    /// so `try_send` only fails once the round itself is gone.
    fn deliver(&self, message: Option<MiningResult>) -> bool {
        if self.abort.is_fired() {
            debug!("worker {}: nonce finding aborted during delivery", self.id);
            return false;
        }
        self.sink.try_send(message).is_ok()
    }
}

/// A running search. Dropping it aborts and joins every worker.
pub struct MiningRound {
    results: Receiver<Option<MiningResult>>,
    abort: AbortHandle,
    handles: Vec<JoinHandle<WorkerExit>>,
    workers: usize,
    exhausted: usize,
}

impl MiningRound {
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Fires the abort signal. Workers stop within one loop iteration.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Blocks until a block is found, every range is exhausted or every
    /// worker has stopped. Once the round is aborted, blocks still in flight
    /// are discarded and the outcome is [`RoundOutcome::Aborted`].
    pub fn wait(&mut self) -> RoundOutcome {
        loop {
            let message = self.results.recv().map_err(|_| RecvTimeoutError::Disconnected);
            if let Some(outcome) = self.handle(message) {
                return outcome;
            }
        }
    }

    /// Like [`MiningRound::wait`] but returns [`RoundOutcome::TimedOut`]
    /// once `timeout` has passed. A timeout too large to represent waits
    /// without a deadline.
    pub fn wait_timeout(&mut self, timeout: Duration) -> RoundOutcome {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.wait();
        };
        loop {
            let message = self.results.recv_deadline(deadline);
            if let Some(outcome) = self.handle(message) {
                return outcome;
            }
        }
    }

    fn handle(
        &mut self,
        message: Result<Option<MiningResult>, RecvTimeoutError>,
    ) -> Option<RoundOutcome> {
        match message {
            Ok(Some(_)) if self.abort.is_aborted() => None,
            Ok(Some(result)) => {
                // The round is over; release the remaining workers.
                self.abort();
                Some(RoundOutcome::Found(result))
            }
            Ok(None) => {
                self.exhausted += 1;
                (self.exhausted == self.workers).then_some(RoundOutcome::Exhausted)
            }
            Err(RecvTimeoutError::Timeout) => Some(RoundOutcome::TimedOut),
            Err(RecvTimeoutError::Disconnected) => Some(RoundOutcome::Aborted),
        }
    }

    /// Aborts the round and waits for every worker thread to finish.
    pub fn join(mut self) -> Vec<WorkerExit> {
        self.abort();
        std::mem::take(&mut self.handles)
            .into_iter()
            .map(|handle| handle.join().unwrap_or(WorkerExit::Aborted))
            .collect()
    }
}

impl Drop for MiningRound {
    fn drop(&mut self) {
        self.abort();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Spawns one worker thread per range to search for a nonce meeting `target`.
pub fn start_round(
    task: Arc<Task>,
    target: U256,
    ranges: &[NonceRange],
) -> Result<MiningRound, ChainError> {
    if ranges.is_empty() {
        return Err(ChainError::InvalidNonceRange(
            "at least one nonce range is required".to_string(),
        ));
    }

    let (abort, signal) = abort_signal();
    // One slot per worker: no delivery can ever block.
    let (sink, results) = bounded(ranges.len());
    let found = Arc::new(AtomicBool::new(false));

    let mut round = MiningRound {
        results,
        abort,
        handles: Vec::with_capacity(ranges.len()),
        workers: ranges.len(),
        exhausted: 0,
    };

    for (id, range) in ranges.iter().enumerate() {
        let worker = Worker {
            id,
            task: Arc::clone(&task),
            range: *range,
            target,
            abort: signal.clone(),
            found: Arc::clone(&found),
            sink: sink.clone(),
        };
        // A failed spawn drops `round`, which aborts and joins the workers
        // already started.
        let handle = thread::Builder::new()
            .name(format!("pow-worker-{}", id))
            .spawn(move || worker.run())?;
        round.handles.push(handle);
    }

    info!(
        "started {} mining workers for height {}",
        ranges.len(),
        task.header().height
    );
    Ok(round)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::BlockHeader;
    use crate::miner::pow::hash_to_u256;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_task() -> Arc<Task> {
        Arc::new(Task::new(BlockHeader::template(1, [0u8; 32], 1)))
    }

    /// Hash of the task's header at `nonce`.
    fn hash_at(task: &Task, nonce: u64) -> U256 {
        let mut block = task.generate_block();
        block.header.nonce = nonce;
        hash_to_u256(&block.header.hash())
    }

    #[test]
    fn test_nonce_range_validation() {
        assert!(NonceRange::new(5, 0, 10).is_ok());
        assert!(NonceRange::new(0, 0, 0).is_ok());
        assert!(NonceRange::new(11, 0, 10).is_err());
        assert!(NonceRange::new(5, 10, 0).is_err());
    }

    #[test]
    fn test_next_wraps_to_min() {
        let range = NonceRange::new(7, 5, 9).unwrap();
        let visited: Vec<u64> = std::iter::successors(Some(7), |n| Some(range.next(*n)))
            .take(5)
            .collect();
        assert_eq!(visited, vec![7, 8, 9, 5, 6]);
        assert_eq!(range.next(6), 7);
    }

    #[test]
    fn test_partition_covers_space_disjointly() {
        let mut rng = StdRng::seed_from_u64(42);
        let ranges = partition_nonces(4, &mut rng);
        assert_eq!(ranges.len(), 4);
        assert_eq!(ranges[0].min(), 0);
        assert_eq!(ranges[3].max(), u64::MAX);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].max() + 1, pair[1].min());
        }
        for range in &ranges {
            assert!(range.seed() >= range.min() && range.seed() <= range.max());
        }
    }

    #[test]
    fn test_found_block_meets_target() {
        let task = sample_task();
        // Target met exactly by the hash at nonce 3.
        let target = hash_at(&task, 3);
        let ranges = [NonceRange::new(0, 0, 3).unwrap()];

        let mut round = start_round(Arc::clone(&task), target, &ranges).unwrap();
        match round.wait() {
            RoundOutcome::Found(result) => {
                let header = &result.block.header;
                assert!(hash_to_u256(&result.block.header_hash) <= target);
                assert_eq!(header.hash(), result.block.header_hash);
                assert!(header.nonce <= 3);
            }
            other => panic!("expected a found block, got {:?}", other),
        }
        assert_eq!(round.join(), vec![WorkerExit::Found]);
    }

    #[test]
    fn test_unreachable_target_exhausts_every_worker() {
        let task = sample_task();
        let ranges: Vec<NonceRange> = (0..4)
            .map(|i| NonceRange::new(i * 100 + 50, i * 100, i * 100 + 99).unwrap())
            .collect();

        let mut round = start_round(task, U256::zero(), &ranges).unwrap();
        assert!(matches!(
            round.wait_timeout(Duration::from_secs(30)),
            RoundOutcome::Exhausted
        ));
        assert_eq!(round.join(), vec![WorkerExit::Exhausted; 4]);
    }

    #[test]
    fn test_abort_stops_all_workers() {
        let task = sample_task();
        let mut rng = StdRng::seed_from_u64(7);
        let ranges = partition_nonces(3, &mut rng);

        let mut round = start_round(task, U256::zero(), &ranges).unwrap();
        assert!(matches!(
            round.wait_timeout(Duration::from_millis(20)),
            RoundOutcome::TimedOut
        ));
        round.abort();
        assert!(matches!(round.wait(), RoundOutcome::Aborted));
        assert_eq!(round.join(), vec![WorkerExit::Aborted; 3]);
    }

    #[test]
    fn test_abort_signal_fires_on_drop() {
        let (handle, signal) = abort_signal();
        assert!(!signal.is_fired());
        drop(handle);
        assert!(signal.is_fired());
    }

    #[test]
    fn test_wait_timeout_without_deadline() {
        let ranges = [NonceRange::new(0, 0, 3).unwrap()];
        let mut round = start_round(sample_task(), U256::zero(), &ranges).unwrap();
        assert!(matches!(
            round.wait_timeout(Duration::MAX),
            RoundOutcome::Exhausted
        ));
    }

    #[test]
    fn test_delivery_abandoned_after_abort() {
        let task = sample_task();
        let (handle, signal) = abort_signal();
        let (sink, results) = bounded(1);
        let worker = Worker {
            id: 0,
            task: Arc::clone(&task),
            range: NonceRange::new(0, 0, 0).unwrap(),
            target: U256::MAX,
            abort: signal,
            found: Arc::new(AtomicBool::new(true)),
            sink,
        };

        handle.abort();
        let result = MiningResult {
            task: Arc::clone(&task),
            block: task.generate_block(),
        };
        assert!(!worker.deliver(Some(result)));
        assert!(results.try_recv().is_err());
    }

    #[test]
    fn test_wait_after_abort_discards_found_blocks() {
        // Every hash meets the target, so blocks may already be in flight.
        let mut rng = StdRng::seed_from_u64(11);
        let ranges = partition_nonces(3, &mut rng);
        let mut round = start_round(sample_task(), U256::MAX, &ranges).unwrap();

        round.abort();
        assert!(matches!(round.wait(), RoundOutcome::Aborted));
        let exits = round.join();
        assert_eq!(exits.len(), 3);
        assert!(exits.iter().filter(|e| **e == WorkerExit::Found).count() <= 1);
    }

    #[test]
    fn test_empty_ranges_rejected() {
        assert!(start_round(sample_task(), U256::MAX, &[]).is_err());
    }
}
