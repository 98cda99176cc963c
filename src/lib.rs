//! Bounded, deterministic, lock-free allocation over a fixed arena
//!
//! This crate serves `malloc`/`free`-style requests out of a fixed byte
//! arena without ever calling into the operating system, taking a lock, or
//! spinning on one. It was built for IPC tracing: many producer threads
//! allocate small, short-lived records from a shared pool and release them
//! in roughly FIFO order (strictly FIFO per producer, interleaved across
//! producers). As long as old records keep getting freed, the pool never
//! fragments indefinitely.
//!
//! Two allocators are provided:
//!
//! - [`RingAlloc`] — the thread-safe allocator. All shared state lives in
//!   8-byte words updated with compare-and-swap; progress is lock-free
//!   system-wide. See [`ring`] for the protocol.
//! - [`UnsyncRing`] — the single-threaded `&mut self` variant with in-band
//!   bookkeeping and zero atomics, for embedders that don't share the pool.
//!
//! Neither allocator coalesces freed middle blocks or searches for a fit:
//! allocation is O(1), freeing is O(k) in the number of consecutively-freed
//! blocks uncovered at the pool's tail.

pub mod ring;
pub mod single_threaded;

pub(crate) mod loom_testing;
pub(crate) mod util;

pub use ring::{AllocError, RingAlloc};
pub use single_threaded::UnsyncRing;
