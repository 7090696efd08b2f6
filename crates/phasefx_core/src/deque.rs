//! # Work-Stealing Deque
//!
//! Per-worker queue of tasks. The owner treats its end as a stack, thieves
//! treat the other end as a queue, and the two only contend when a single
//! task is left.
//!
//! ## Safety Note
//!
//! Task slots live in `UnsafeCell`s. Exclusive access to a slot is handed
//! out by the position protocol below, not by a lock.

#![allow(unsafe_code)]
//!
//! ## Layout
//!
//! ```text
//!            top (thieves)                 bottom (owner)
//!               │                              │
//!   retired     ▼                              ▼
//!  ┌───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬─────────┐
//!  │ · │ · │ · │ A │ B │ C │ D │ E │ F │ G │   │  ...    │
//!  └───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴─────────┘
//!   segment 0 (32)  │ segment 1 (64)          │ segment 2 (128) ...
//! ```
//!
//! `top` only moves forward, so retired slots are never read again. The
//! arena is a directory of segments whose sizes double: publishing a new
//! segment never moves an old slot, and a thief holding a position can
//! always find it. Retired slots are freed when the deque is dropped.
//!
//! ## Protocol
//!
//! - `push_own`: write slot `bottom`, then publish `bottom + 1` (Release).
//! - `pop_own`: reserve `bottom - 1`, SeqCst fence, read `top`. More than
//!   one task left: the slot is ours. Exactly one: race thieves with a CAS
//!   on `top`. None: restore `bottom`.
//! - `steal`: read `top`, SeqCst fence, read `bottom`. If non-empty, CAS
//!   `top` forward; the winner owns the passed-over slot.
//!
//! A position is claimed by exactly one thread, so each task is delivered
//! exactly once.

use std::cell::{Cell, UnsafeCell};
use std::marker::PhantomData;
use std::sync::atomic::{fence, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// log2 of the first segment's slot count.
const FIRST_SEGMENT_SHIFT: u32 = 5;

/// Slots in the first segment; segment `k` holds `FIRST_SEGMENT_LEN << k`.
const FIRST_SEGMENT_LEN: usize = 1 << FIRST_SEGMENT_SHIFT;

/// Enough segments to address every `usize` position.
const SEGMENT_COUNT: usize = (usize::BITS - FIRST_SEGMENT_SHIFT) as usize;

/// One arena slot. `None` once its task has been claimed.
struct Slot<T> {
    task: UnsafeCell<Option<T>>,
}

impl<T> Slot<T> {
    fn empty() -> Self {
        Self {
            task: UnsafeCell::new(None),
        }
    }
}

/// Append-only segmented storage addressed by position.
struct Arena<T> {
    segments: [OnceLock<Box<[Slot<T>]>>; SEGMENT_COUNT],
}

impl<T> Arena<T> {
    fn new() -> Self {
        Self {
            segments: std::array::from_fn(|_| OnceLock::new()),
        }
    }

    /// Maps a position to `(segment, offset)`.
    #[inline]
    fn locate(position: usize) -> (usize, usize) {
        let biased = position + FIRST_SEGMENT_LEN;
        let segment = (biased.ilog2() - FIRST_SEGMENT_SHIFT) as usize;
        let offset = biased - (FIRST_SEGMENT_LEN << segment);
        (segment, offset)
    }

    /// Slot for a position the caller is about to publish. Owner only.
    fn slot_for_write(&self, position: usize) -> &Slot<T> {
        let (segment, offset) = Self::locate(position);
        let slots = self.segments[segment].get_or_init(|| {
            (0..FIRST_SEGMENT_LEN << segment)
                .map(|_| Slot::empty())
                .collect()
        });
        &slots[offset]
    }

    /// Slot for a position that has already been published.
    fn slot(&self, position: usize) -> &Slot<T> {
        let (segment, offset) = Self::locate(position);
        // The owner initializes a segment before publishing any position in
        // it, and segments are never reset.
        let slots = self.segments[segment]
            .get()
            .unwrap_or_else(|| unreachable!("position {position} read before segment {segment}"));
        &slots[offset]
    }
}

/// State shared by the owner and every stealer.
struct Inner<T> {
    /// Next position a thief will take (head).
    top: AtomicUsize,
    /// One past the owner's newest task (tail).
    bottom: AtomicUsize,
    arena: Arena<T>,
}

impl<T> Inner<T> {
    /// Takes the task out of a position this thread has claimed.
    ///
    /// # Safety
    ///
    /// The caller must hold the unique claim on `position` (won the `top`
    /// CAS, or reserved it as owner with no thief able to reach it).
    unsafe fn take(&self, position: usize) -> Option<T> {
        (*self.arena.slot(position).task.get()).take()
    }

    fn is_empty(&self) -> bool {
        let bottom = self.bottom.load(Ordering::Acquire);
        let top = self.top.load(Ordering::Acquire);
        top >= bottom
    }

    fn len(&self) -> usize {
        let bottom = self.bottom.load(Ordering::Acquire);
        let top = self.top.load(Ordering::Acquire);
        bottom.saturating_sub(top)
    }
}

// SAFETY: slots are only touched by the thread holding their position claim;
// claims are handed out through the atomics in `top`/`bottom`.
unsafe impl<T: Send> Send for Inner<T> {}
// SAFETY: see above; `&Inner` never exposes a `&T`.
unsafe impl<T: Send> Sync for Inner<T> {}

/// The owner's handle to a work-stealing deque.
///
/// `Send` but not `Sync`: exactly one thread at a time may push and pop.
/// Other threads steal through [`Stealer`] handles.
///
/// # Example
///
/// ```rust,ignore
/// let deque = WorkStealingDeque::new();
/// let thief = deque.stealer();
///
/// deque.push_own("A");
/// deque.push_own("B");
/// assert_eq!(thief.steal(), Some("A"));   // oldest
/// assert_eq!(deque.pop_own(), Some("B")); // newest
/// ```
pub struct WorkStealingDeque<T> {
    inner: Arc<Inner<T>>,
    _not_sync: PhantomData<Cell<()>>,
}

impl<T: Send> WorkStealingDeque<T> {
    /// Creates an empty deque.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                top: AtomicUsize::new(0),
                bottom: AtomicUsize::new(0),
                arena: Arena::new(),
            }),
            _not_sync: PhantomData,
        }
    }

    /// Creates a handle other threads can steal through.
    #[must_use]
    pub fn stealer(&self) -> Stealer<T> {
        Stealer {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Pushes a task onto the owner's end.
    ///
    /// Never fails and never blocks; may allocate a new arena segment.
    pub fn push_own(&self, task: T) {
        let bottom = self.inner.bottom.load(Ordering::Relaxed);
        let slot = self.inner.arena.slot_for_write(bottom);

        // SAFETY: `bottom` is unpublished, so no thief can claim it, and only
        // the owner writes slots.
        unsafe {
            *slot.task.get() = Some(task);
        }

        self.inner.bottom.store(bottom + 1, Ordering::Release);
    }

    /// Pops the most recently pushed task (LIFO).
    ///
    /// Returns `None` when the deque is empty or a thief won the race for
    /// the last task.
    pub fn pop_own(&self) -> Option<T> {
        let bottom = self.inner.bottom.load(Ordering::Relaxed);
        if bottom == 0 {
            return None;
        }

        let reserved = bottom - 1;
        self.inner.bottom.store(reserved, Ordering::Release);
        fence(Ordering::SeqCst);
        let top = self.inner.top.load(Ordering::Relaxed);

        if top > reserved {
            // Empty: undo the reservation.
            self.inner.bottom.store(bottom, Ordering::Release);
            return None;
        }

        if top < reserved {
            // SAFETY: thieves can only reach positions below `reserved`.
            return unsafe { self.inner.take(reserved) };
        }

        // Last task: thieves may be racing for the same position.
        let won = self
            .inner
            .top
            .compare_exchange(top, top + 1, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok();
        self.inner.bottom.store(bottom, Ordering::Release);

        if won {
            // SAFETY: the CAS on `top` gave us the unique claim.
            unsafe { self.inner.take(reserved) }
        } else {
            None
        }
    }

    /// Returns true if no task was visible at the instant of the check.
    ///
    /// Advisory only: thieves may change the answer immediately.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of tasks visible at the instant of the check (advisory).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<T: Send> Default for WorkStealingDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for WorkStealingDeque<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkStealingDeque")
            .field("top", &self.inner.top.load(Ordering::Relaxed))
            .field("bottom", &self.inner.bottom.load(Ordering::Relaxed))
            .finish()
    }
}

/// A thief's handle to another worker's deque.
pub struct Stealer<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send> Stealer<T> {
    /// Steals the oldest task (FIFO).
    ///
    /// Spins while it keeps losing races to other thieves or the owner;
    /// returns `None` only once the deque is observed empty.
    pub fn steal(&self) -> Option<T> {
        loop {
            let top = self.inner.top.load(Ordering::Acquire);
            fence(Ordering::SeqCst);
            let bottom = self.inner.bottom.load(Ordering::Acquire);

            // Another thread moved the head since the snapshot began.
            if self.inner.top.load(Ordering::Acquire) != top {
                std::hint::spin_loop();
                continue;
            }

            if top >= bottom {
                return None;
            }

            if self
                .inner
                .top
                .compare_exchange(top, top + 1, Ordering::SeqCst, Ordering::Relaxed)
                .is_ok()
            {
                // SAFETY: the CAS on `top` gave us the unique claim.
                return unsafe { self.inner.take(top) };
            }

            std::hint::spin_loop();
        }
    }

    /// Returns true if no task was visible at the instant of the check.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T> Clone for Stealer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Stealer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stealer")
            .field("top", &self.inner.top.load(Ordering::Relaxed))
            .field("bottom", &self.inner.bottom.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicBool;
    use parking_lot::Mutex;

    #[test]
    fn test_locate_segments() {
        assert_eq!(Arena::<u8>::locate(0), (0, 0));
        assert_eq!(Arena::<u8>::locate(31), (0, 31));
        assert_eq!(Arena::<u8>::locate(32), (1, 0));
        assert_eq!(Arena::<u8>::locate(95), (1, 63));
        assert_eq!(Arena::<u8>::locate(96), (2, 0));
    }

    #[test]
    fn test_owner_is_lifo() {
        let deque = WorkStealingDeque::new();
        deque.push_own('A');
        deque.push_own('B');
        deque.push_own('C');

        assert_eq!(deque.pop_own(), Some('C'));
        assert_eq!(deque.pop_own(), Some('B'));
        assert_eq!(deque.pop_own(), Some('A'));
        assert_eq!(deque.pop_own(), None);
        assert!(deque.is_empty());
    }

    #[test]
    fn test_thief_is_fifo() {
        let deque = WorkStealingDeque::new();
        let thief = deque.stealer();
        deque.push_own('A');
        deque.push_own('B');
        deque.push_own('C');

        assert_eq!(thief.steal(), Some('A'));
        assert_eq!(thief.steal(), Some('B'));
        assert_eq!(deque.pop_own(), Some('C'));
        assert_eq!(thief.steal(), None);
        assert_eq!(deque.pop_own(), None);
    }

    #[test]
    fn test_empty_deque() {
        let deque: WorkStealingDeque<u32> = WorkStealingDeque::new();
        assert!(deque.is_empty());
        assert_eq!(deque.len(), 0);
        assert_eq!(deque.pop_own(), None);
        assert_eq!(deque.stealer().steal(), None);
        // A failed pop must not disturb later pushes.
        deque.push_own(7);
        assert_eq!(deque.len(), 1);
        assert_eq!(deque.stealer().steal(), Some(7));
    }

    #[test]
    fn test_push_after_steal_reuses_nothing() {
        let deque = WorkStealingDeque::new();
        let thief = deque.stealer();
        for round in 0..100u32 {
            deque.push_own(round);
            assert_eq!(thief.steal(), Some(round));
            assert!(deque.is_empty());
        }
    }

    #[test]
    fn test_grows_across_segments() {
        let deque = WorkStealingDeque::new();
        for i in 0..1_000u32 {
            deque.push_own(i);
        }
        assert_eq!(deque.len(), 1_000);
        for i in (0..1_000u32).rev() {
            assert_eq!(deque.pop_own(), Some(i));
        }
    }

    #[test]
    fn test_drop_releases_unclaimed_tasks() {
        let marker = Arc::new(());
        {
            let deque = WorkStealingDeque::new();
            for _ in 0..10 {
                deque.push_own(Arc::clone(&marker));
            }
            let _ = deque.pop_own();
            let _ = deque.stealer().steal();
        }
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[test]
    fn test_concurrent_exactly_once() {
        const TASKS: usize = 20_000;
        const THIEVES: usize = 4;

        let deque = WorkStealingDeque::new();
        let stealers: Vec<_> = (0..THIEVES).map(|_| deque.stealer()).collect();
        let owner_done = AtomicBool::new(false);
        let delivered = Mutex::new(Vec::with_capacity(TASKS));

        std::thread::scope(|s| {
            for thief in &stealers {
                let delivered = &delivered;
                let owner_done = &owner_done;
                s.spawn(move || {
                    let mut local = Vec::new();
                    loop {
                        match thief.steal() {
                            Some(task) => local.push(task),
                            None if owner_done.load(Ordering::Acquire) => break,
                            None => std::hint::spin_loop(),
                        }
                    }
                    delivered.lock().extend(local);
                });
            }

            // Owner interleaves pushes and pops.
            let mut local = Vec::new();
            for task in 0..TASKS {
                deque.push_own(task);
                if task % 3 == 0 {
                    if let Some(t) = deque.pop_own() {
                        local.push(t);
                    }
                }
            }
            while let Some(t) = deque.pop_own() {
                local.push(t);
            }
            delivered.lock().extend(local);
            owner_done.store(true, Ordering::Release);
        });

        let delivered = delivered.into_inner();
        assert_eq!(delivered.len(), TASKS, "lost or duplicated tasks");
        let unique: HashSet<_> = delivered.into_iter().collect();
        assert_eq!(unique.len(), TASKS);
        assert!(deque.is_empty());
    }
}
