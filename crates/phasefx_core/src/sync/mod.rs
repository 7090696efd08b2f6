//! # Synchronization Primitives
//!
//! Everything that lets threads agree on *when* a phase is over.
//!
//! ## The Problem
//!
//! ```text
//! Band 0 writes rows [0, 40)      Band 1 writes rows [40, 80)
//!   row 39 of the NEXT effect needs row 40 of THIS effect
//!
//! Without a full-image rendezvous: band 0 reads a half-written neighbor
//! ```
//!
//! ## The Solution: Phase Barrier
//!
//! ```text
//! Phase K:   bands write scratch ──► wait() ──┐
//!                                              ├─ generation K → K+1, swap
//! Launcher:  ──────────────────────► wait() ──┘
//! Phase K+1: bands read the swapped buffer
//! ```

mod barrier;

pub use barrier::{PhaseBarrier, PhaseWait};
