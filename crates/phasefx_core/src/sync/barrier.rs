//! # Phase Barrier
//!
//! Reusable rendezvous for a fixed participant count.
//!
//! A plain condition wait is not enough for reuse: a thread released from
//! phase K can race ahead, arrive at phase K+1 and be woken by a stale
//! broadcast. Every waiter therefore captures the generation it arrived in
//! and only leaves once that generation has been completed.

use parking_lot::{Condvar, Mutex};

/// Counters guarded by the barrier's mutex.
#[derive(Debug, Default)]
struct BarrierState {
    /// Arrivals in the current phase.
    arrived: usize,
    /// Completed phases.
    generation: u64,
}

/// Outcome of one [`PhaseBarrier::wait`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseWait {
    /// The generation this caller arrived in (and which is now complete).
    pub generation: u64,
    /// True for exactly one caller per phase: the last arriver.
    pub leader: bool,
}

/// A reusable barrier for `participants` threads.
///
/// # Example
///
/// ```rust,ignore
/// let barrier = PhaseBarrier::new(workers + 1);
/// std::thread::scope(|s| {
///     for _ in 0..workers {
///         s.spawn(|| { do_band(); barrier.wait(); });
///     }
///     barrier.wait();
/// });
/// ```
#[derive(Debug)]
pub struct PhaseBarrier {
    participants: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl PhaseBarrier {
    /// Creates a barrier released by every `participants`-th arrival.
    ///
    /// # Panics
    ///
    /// Panics if `participants` is zero.
    #[must_use]
    pub fn new(participants: usize) -> Self {
        assert!(participants > 0, "Barrier needs at least one participant");

        Self {
            participants,
            state: Mutex::new(BarrierState::default()),
            released: Condvar::new(),
        }
    }

    /// Returns the number of threads that must arrive per phase.
    #[inline]
    #[must_use]
    pub const fn participants(&self) -> usize {
        self.participants
    }

    /// Returns the number of completed phases.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Blocks until `participants` threads have called `wait` in this phase.
    ///
    /// The last arriver resets the arrival count, advances the generation and
    /// wakes everyone else; it does not block.
    pub fn wait(&self) -> PhaseWait {
        let mut state = self.state.lock();
        let generation = state.generation;

        if self.register_arrival(&mut state) {
            return PhaseWait {
                generation,
                leader: true,
            };
        }

        // Spurious wake-ups and stale broadcasts both fail this check.
        while state.generation == generation {
            self.released.wait(&mut state);
        }

        PhaseWait {
            generation,
            leader: false,
        }
    }

    /// Counts one arrival in this phase without blocking.
    ///
    /// Used on behalf of a participant that will never reach [`wait`], so the
    /// others are not left parked. Returns `true` if this arrival completed
    /// the phase.
    ///
    /// [`wait`]: PhaseBarrier::wait
    pub fn arrive(&self) -> bool {
        let mut state = self.state.lock();
        self.register_arrival(&mut state)
    }

    /// Records an arrival; the last one of a phase releases the others.
    fn register_arrival(&self, state: &mut BarrierState) -> bool {
        state.arrived += 1;
        if state.arrived < self.participants {
            return false;
        }

        state.arrived = 0;
        state.generation += 1;
        self.released.notify_all();
        true
    }
}
