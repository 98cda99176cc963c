//! Lock-free circular allocator over a fixed arena
//!
//! Serves variable-sized blocks out of a caller-sized byte arena. The
//! bookkeeping is split across two circular structures, each updated with
//! single 8-byte CAS operations:
//!
//! - the **arena queue**: one word describing the span of the arena
//!   currently carrying blocks, bit packed as follows:
//!     - `bits[27:0]` = length / 16
//!     - `bits[55:28]` = tail offset / 16
//!     - `bits[63:56]` = reservation generation (see below)
//! - the **descriptor table**: a fixed array of slot words, one per
//!   in-flight allocation in allocation order, plus its own queue word
//!   (`bits[31:0]` = length, `bits[63:32]` = tail index).
//!
//! A descriptor slot is bit packed as follows:
//! - `bits[27:0]` = block length / 16
//! - `bits[55:28]` = block offset into the arena / 16
//! - `bits[62:56]` = unused
//! - `bit[63]` = released by the owner
//!
//! The all-zero slot doubles as "out of queue" and "reservation in flight",
//! which is what lets a descriptor claim be a single CAS on the queue word:
//! the slot at `tail + length` is always zero, because retirement rewrites
//! slots to zero before advancing the tail past them.
//!
//! The logical head of either queue is `(tail + length) mod N`, and a queue
//! is empty exactly when its length is zero; allocation refuses the exact
//! fill that would fold "full" onto "empty".
//!
//! Allocation claims a descriptor first and arena bytes second, and the
//! retirement walk relies on the two orders agreeing: the first owned block
//! at the arena tail must belong to the descriptor at the table tail. Two
//! racing allocations could claim descriptors in one order and win their
//! arena CASes in the other, so every arena reservation bumps the
//! generation bits, and a claimant that observes a generation it did not
//! expect throws its claim away (rescinding it, or leaving a ghost) and
//! starts over. Retirement preserves the generation.
//!
//! Every block starts with an 8-byte header, padded out to the 16-byte
//! alignment: the owning descriptor index (or -1 for a wrap-around gap
//! block, which owns no descriptor) and the total block length in bytes.
//! Payloads start 16 bytes into the block and are never touched by the
//! allocator while the block is live.
//!
//! ```text
//!             tail                                  head
//!              v                                     v
//!  +-----------+------+--------+------+--------------+------------+
//!  |           | hdr1 : pay1   | hdr2 : pay2         |            |
//!  +-----------+------+--------+------+--------------+------------+
//!   <- free ->  <------- arena queue length --------->  <- free ->
//! ```
//!
//! Freeing flips the descriptor's released bit and then walks the
//! descriptor queue from its tail, retiring every consecutively-released
//! entry and advancing both queues. Releasing a middle block therefore
//! costs one RMW now and returns its arena bytes later, once everything
//! older is also gone. A gap block is retired together with the wrapped
//! block it was created alongside (the tail parks on the gap until that
//! block's turn comes).

use std::{
    alloc::{self, Layout},
    fmt,
    fmt::Debug,
    ptr::NonNull,
    sync::atomic::Ordering,
};

use thiserror::Error;
use tracing::Level;

use crate::loom_testing::*;
use crate::util::roundto;

/// Payload alignment; block offsets and lengths are multiples of this
pub const BLOCK_ALIGN: u32 = 16;
/// Bytes reserved at the start of every block for the header (8 bytes of
/// header rounded up to the alignment)
const HDR_RESERVED: u32 = 16;

/// Header owner index marking a gap block
const GAP_OWNER: i32 = -1;

/// Released bit of a descriptor slot
const SLOT_RELEASED: u64 = 1 << 63;
/// A slot whose owner failed to secure arena bytes: released, zero length.
/// Consumes a descriptor until the next retirement walk, but no arena bytes.
const SLOT_GHOST: u64 = SLOT_RELEASED;

#[inline]
fn slot_pack(offset: u32, length: u32) -> u64 {
    debug_assert!(offset % BLOCK_ALIGN == 0 && length % BLOCK_ALIGN == 0);
    ((offset as u64 / 16) << 28) | (length as u64 / 16)
}

#[inline]
fn slot_offset(slot: u64) -> u32 {
    (((slot >> 28) & 0x0fff_ffff) as u32) * 16
}

#[inline]
fn slot_length(slot: u64) -> u32 {
    ((slot & 0x0fff_ffff) as u32) * 16
}

#[inline]
fn slot_released(slot: u64) -> bool {
    slot & SLOT_RELEASED != 0
}

#[inline]
fn queue_pack(tail: u32, length: u32) -> u64 {
    ((tail as u64) << 32) | length as u64
}

#[inline]
fn queue_tail(queue: u64) -> u32 {
    (queue >> 32) as u32
}

#[inline]
fn queue_length(queue: u64) -> u32 {
    queue as u32
}

#[inline]
fn arena_pack(tail16: u32, length16: u32, generation: u8) -> u64 {
    debug_assert!(tail16 < 1 << 28 && length16 < 1 << 28);
    ((generation as u64) << 56) | ((tail16 as u64) << 28) | length16 as u64
}

#[inline]
fn arena_tail(queue: u64) -> u32 {
    ((queue >> 28) & 0x0fff_ffff) as u32
}

#[inline]
fn arena_length(queue: u64) -> u32 {
    (queue & 0x0fff_ffff) as u32
}

#[inline]
fn arena_generation(queue: u64) -> u8 {
    (queue >> 56) as u8
}

#[inline]
fn header_pack(owner: i32, length: u32) -> u64 {
    ((length as u64) << 32) | owner as u32 as u64
}

#[inline]
fn header_owner(header: u64) -> i32 {
    header as u32 as i32
}

#[inline]
fn header_length(header: u64) -> u32 {
    (header >> 32) as u32
}

/// Construction parameter violations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocError {
    #[error("arena capacity {capacity:#x} is not a multiple of {}", BLOCK_ALIGN)]
    UnalignedCapacity { capacity: u32 },

    #[error("arena capacity {capacity:#x} cannot hold a single block")]
    CapacityTooSmall { capacity: u32 },

    #[error("descriptor table must have at least one slot")]
    NoSlots,

    #[error("descriptor table of {nslots} slots cannot be indexed by a block header")]
    TooManySlots { nslots: u32 },
}

/// Lock-free circular allocator over an owned, fixed-size arena
///
/// Any number of threads may call [`alloc`](RingAlloc::alloc) and
/// [`free`](RingAlloc::free) concurrently on a shared instance. Dropping
/// the allocator releases the arena; Rust's `&mut` exclusivity in `drop`
/// is what guarantees no operation is still in flight.
pub struct RingAlloc {
    /// Arena backing store, `cap` bytes, 16-aligned, starts zeroed
    buf: *mut u8,
    /// Arena capacity in bytes
    cap: u32,
    /// Descriptor table; all-zero slots are out of queue (or mid-claim)
    slots: Box<[AtomicU64]>,
    /// `{tail, length}` over `slots`, CASed as one word
    slot_queue: AtomicU64,
    /// `{tail, length, generation}` over the arena in 16-byte units, CASed
    /// as one word
    buf_queue: AtomicU64,
}

// safety: the arena pointer is owned by this value; all shared mutation of
// the bookkeeping goes through atomics, and the queue protocol hands each
// payload region to exactly one owner at a time
unsafe impl Send for RingAlloc {}
unsafe impl Sync for RingAlloc {}

impl Debug for RingAlloc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bq = self.buf_queue.load(Ordering::Relaxed);
        let sq = self.slot_queue.load(Ordering::Relaxed);
        f.debug_struct("RingAlloc")
            .field("@arena", &self.buf)
            .field("capacity", &self.cap)
            .field("buf_queue", &(arena_tail(bq) * 16, arena_length(bq) * 16))
            .field("generation", &arena_generation(bq))
            .field("slot_queue", &(queue_tail(sq), queue_length(sq)))
            .field("slots", &self.slots.len())
            .finish()
    }
}

impl RingAlloc {
    /// Create an allocator with a zeroed, 16-aligned arena of `capacity`
    /// bytes and a descriptor table of `nslots` entries
    ///
    /// `capacity` bounds the total bytes in flight; `nslots` bounds the
    /// number of simultaneously live allocations.
    pub fn new(capacity: u32, nslots: u32) -> Result<RingAlloc, AllocError> {
        if capacity % BLOCK_ALIGN != 0 {
            return Err(AllocError::UnalignedCapacity { capacity });
        }
        if capacity < 2 * BLOCK_ALIGN {
            return Err(AllocError::CapacityTooSmall { capacity });
        }
        if nslots == 0 {
            return Err(AllocError::NoSlots);
        }
        // block headers carry the owning index as an i32, -1 meaning gap
        if nslots > i32::MAX as u32 {
            return Err(AllocError::TooManySlots { nslots });
        }

        let layout = match Layout::from_size_align(capacity as usize, BLOCK_ALIGN as usize) {
            Ok(x) => x,
            // any 16-aligned u32 size can be laid out
            Err(_) => unreachable!(),
        };
        // safety: layout has non-zero size
        let buf = unsafe { alloc::alloc_zeroed(layout) };
        if buf.is_null() {
            alloc::handle_alloc_error(layout);
        }

        let slots = (0..nslots).map(|_| AtomicU64::new(0)).collect();
        Ok(RingAlloc {
            buf,
            cap: capacity,
            slots,
            slot_queue: AtomicU64::new(0),
            buf_queue: AtomicU64::new(0),
        })
    }

    /// Arena capacity in bytes
    pub fn capacity(&self) -> u32 {
        self.cap
    }

    /// Number of descriptor slots
    pub fn slot_count(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Whether nothing is in flight (no live, released-but-unreclaimed, or
    /// gap blocks, and no ghost descriptors)
    pub fn is_empty(&self) -> bool {
        arena_length(self.buf_queue.load(Ordering::Relaxed)) == 0
            && queue_length(self.slot_queue.load(Ordering::Relaxed)) == 0
    }

    /// View of the 8-byte block header at arena byte offset `offset`.
    ///
    /// Header cells stay on `std` atomics even under loom: loom's atomics
    /// cannot be materialized on top of raw arena memory (they are bigger
    /// than the 8 bytes the layout gives us). Exclusive access to each
    /// header is established through the queue words, which *are* modeled.
    #[inline]
    fn header_at(&self, offset: u32) -> &std::sync::atomic::AtomicU64 {
        debug_assert!(offset % BLOCK_ALIGN == 0 && offset < self.cap);
        // safety: offset is 16-aligned and in bounds, and the arena itself
        // is 16-aligned, so this is a valid aligned u64 cell
        unsafe { &*(self.buf.add(offset as usize) as *const std::sync::atomic::AtomicU64) }
    }

    /// Allocate `size` bytes, 16-aligned
    ///
    /// Returns `None` when the request cannot be satisfied: `size` is zero
    /// or larger than the arena allows, the descriptor table is full, or
    /// the arena has no room. The largest satisfiable request on an empty
    /// allocator is `capacity - 32`: the exact fill that would make the
    /// head meet the tail with data still in flight is refused.
    pub fn alloc(&self, size: u32) -> Option<NonNull<u8>> {
        let trace_span = tracing::span!(Level::TRACE, "ring::alloc", size);
        let _span_enter = trace_span.enter();

        if size == 0 || size > self.cap - HDR_RESERVED {
            return None;
        }
        let nsize = roundto(size, BLOCK_ALIGN) + HDR_RESERVED;
        let n16 = nsize / 16;
        let cap16 = self.cap / 16;
        let nslots = self.slots.len() as u32;

        'claim: loop {
            // sample the arena generation before the claim below: any
            // reservation that lands between this load and ours bumps it,
            // and seeing a bump means arena order may no longer match
            // descriptor order for this claim
            let expected_gen =
                arena_generation(self.buf_queue.load(Ordering::Relaxed));

            // claim the descriptor at the queue head
            let mut sq = self.slot_queue.load(Ordering::Relaxed);
            let (slot_idx, claimed) = loop {
                let (tail, length) = (queue_tail(sq), queue_length(sq));
                if length == nslots {
                    tracing::event!(Level::TRACE, "descriptor table full");
                    return None;
                }
                let head = ((tail as u64 + length as u64) % nslots as u64) as u32;
                let claimed = queue_pack(tail, length + 1);
                // order: acquire pairs with the release in
                // advance_slot_tail so the claimed slot is observed in its
                // zeroed state
                match self.slot_queue.compare_exchange_weak(
                    sq,
                    claimed,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break (head, claimed),
                    Err(x) => sq = x,
                }
            };

            // reserve arena bytes; geometry is recomputed on every attempt
            // because frees may shift the tail under us
            let mut bq = self.buf_queue.load(Ordering::Relaxed);
            loop {
                if arena_generation(bq) != expected_gen {
                    // another reservation interleaved with this claim; it
                    // may belong to a younger descriptor, which would break
                    // the order the retirement walk relies on. Start over.
                    self.rescind_or_ghost(slot_idx, claimed);
                    continue 'claim;
                }
                let (tail, length) = (arena_tail(bq), arena_length(bq));
                let head = (tail + length) % cap16;
                // a gap is needed when the head has not wrapped yet and the
                // run up to the physical end is too short for the block
                let gap16 = if tail + length < cap16 && n16 > cap16 - head {
                    cap16 - head
                } else {
                    0
                };
                let rsize16 = gap16 + n16;
                // `>=` refuses the exact fill; head == tail must keep
                // meaning empty
                if length + rsize16 >= cap16 {
                    tracing::event!(Level::TRACE, nsize, "arena full");
                    self.rescind_or_ghost(slot_idx, claimed);
                    return None;
                }
                let off16 = if gap16 != 0 { 0 } else { head };
                // order: acquire extends the happens-before chain from the
                // previous owner of these bytes (released-bit RMW, then the
                // retirer's release on this word) to the caller about to
                // write into them
                match self.buf_queue.compare_exchange_weak(
                    bq,
                    arena_pack(tail, length + rsize16, expected_gen.wrapping_add(1)),
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let offset = off16 * 16;
                        // the reserved region is exclusively ours until the
                        // publish below makes it reachable, so
                        // plain-ordering header stores suffice
                        if gap16 != 0 {
                            self.header_at(head * 16).store(
                                header_pack(GAP_OWNER, gap16 * 16),
                                Ordering::Relaxed,
                            );
                        }
                        self.header_at(offset)
                            .store(header_pack(slot_idx as i32, nsize), Ordering::Relaxed);

                        // publish: the claimed slot transitions from zero to
                        // live. No other thread may touch a claimed slot, so
                        // a losing exchange can only mean corruption.
                        // order: release so a freer's acquire load of the
                        // slot also sees the header stores above
                        if let Err(found) = self.slots[slot_idx as usize].compare_exchange(
                            0,
                            slot_pack(offset, nsize),
                            Ordering::Release,
                            Ordering::Relaxed,
                        ) {
                            panic!(
                                "descriptor {} clobbered during publish: {:#018x}",
                                slot_idx, found
                            );
                        }
                        tracing::event!(Level::TRACE, offset, nsize, slot = slot_idx);

                        // safety: offset + nsize was validated against the
                        // arena bounds by the reservation, and buf is
                        // non-null
                        return Some(unsafe {
                            NonNull::new_unchecked(self.buf.add((offset + HDR_RESERVED) as usize))
                        });
                    }
                    Err(x) => bq = x,
                }
            }
        }
    }

    /// Undo a descriptor claim that did not lead to a published block
    fn rescind_or_ghost(&self, slot_idx: u32, claimed: u64) {
        let rescinded = queue_pack(queue_tail(claimed), queue_length(claimed) - 1);
        // order: the slot was never written, nothing to publish
        if self
            .slot_queue
            .compare_exchange(claimed, rescinded, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            // ours was still the newest claim; the slot never became visible
            return;
        }
        // a later claim (or a retirement) moved the queue word, so the slot
        // can no longer be pulled back out. Mark it released-with-no-body;
        // the next retirement walk clears it.
        // order: relaxed, there is no payload behind a ghost
        self.slots[slot_idx as usize].store(SLOT_GHOST, Ordering::Relaxed);
        tracing::event!(Level::TRACE, slot = slot_idx, "ghost deposited");
    }

    /// Release a block previously returned by [`alloc`](RingAlloc::alloc)
    ///
    /// Blocks may be released in any order; arena bytes only return to the
    /// pool once every older block has also been released.
    ///
    /// # Safety
    ///
    /// `ptr` must have come from [`alloc`](RingAlloc::alloc) on this same
    /// allocator and must not have been freed before. If the pointer
    /// crossed threads, the caller must have transferred it with proper
    /// synchronization. No references into the payload may outlive this
    /// call.
    pub unsafe fn free(&self, ptr: NonNull<u8>) {
        let trace_span = tracing::span!(Level::TRACE, "ring::free");
        let _span_enter = trace_span.enter();

        let addr = ptr.as_ptr() as usize;
        let base = self.buf as usize;
        debug_assert!(
            addr >= base + HDR_RESERVED as usize && addr < base + self.cap as usize,
            "foreign pointer"
        );
        debug_assert_eq!(addr % BLOCK_ALIGN as usize, 0, "foreign pointer");
        let offset = (addr - base) as u32 - HDR_RESERVED;

        // the caller owns the block, so its header cannot change under us
        let header = self.header_at(offset).load(Ordering::Relaxed);
        let owner = header_owner(header);
        debug_assert!(
            owner >= 0 && (owner as usize) < self.slots.len(),
            "foreign or already-reclaimed pointer"
        );
        tracing::event!(Level::TRACE, offset, slot = owner);

        // order: release keeps the owner's payload writes ahead of the
        // released bit; the chain (this RMW -> retirer's acquire load ->
        // retirer's release on the arena queue -> a reservation's acquire)
        // is what makes reuse of the bytes race-free
        let prev = self.slots[owner as usize].fetch_or(SLOT_RELEASED, Ordering::AcqRel);
        debug_assert_eq!(prev & SLOT_RELEASED, 0, "double free");
        debug_assert_ne!(slot_length(prev), 0, "double free of a reclaimed slot");
        debug_assert_eq!(slot_offset(prev), offset, "pointer/descriptor mismatch");

        self.retire();
    }

    /// Retirement walk: pop every consecutively-released descriptor off the
    /// queue tail, returning arena bytes (and leading gap blocks) to the
    /// pool
    fn retire(&self) {
        let nslots = self.slots.len() as u32;
        loop {
            // order: acquire pairs with the release in advance_slot_tail,
            // so every arena pop a previous retirer did is visible before
            // we read the arena queue ourselves
            let sq = self.slot_queue.load(Ordering::Acquire);
            let (tail, length) = (queue_tail(sq), queue_length(sq));
            if length == 0 {
                return;
            }
            // order: acquire pairs with the publish so the header behind a
            // live entry can be trusted
            let slot = self.slots[tail as usize].load(Ordering::Acquire);
            if !slot_released(slot) {
                // covers both the all-zero claim-in-flight state and live
                // blocks: the tail owner has not released yet
                return;
            }
            // order: whoever wins this exchange owns the retirement of the
            // entry (and of its arena block, if any). Synchronization with
            // the slot's contents was already established by the acquire
            // load above; relaxed is enough to arbitrate.
            if self.slots[tail as usize]
                .compare_exchange(slot, 0, Ordering::Relaxed, Ordering::Relaxed)
                .is_err()
            {
                // another freer is retiring this very entry and will make
                // the progress
                return;
            }
            if slot_length(slot) != 0 {
                self.pop_block(slot);
            }
            self.advance_slot_tail(tail, nslots);
        }
    }

    /// Pop the arena block owned by `slot` off the arena queue tail,
    /// together with the gap block in front of it if its allocation wrapped
    ///
    /// Caller must have won the retirement of `slot`.
    fn pop_block(&self, slot: u64) {
        let cap16 = self.cap / 16;
        let want16 = slot_offset(slot) / 16;
        let mut bq = self.buf_queue.load(Ordering::Relaxed);
        loop {
            let (tail, length) = (arena_tail(bq), arena_length(bq));
            let ours = tail == want16;
            let adv = if ours {
                slot_length(slot) / 16
            } else {
                // everything older than our entry is already gone, so this
                // can only be the gap our own allocation left when it
                // wrapped; its header was written before our slot was
                // published, so the acquire load in retire() covers it
                let header = self.header_at(tail * 16).load(Ordering::Relaxed);
                debug_assert_eq!(
                    header_owner(header),
                    GAP_OWNER,
                    "arena/descriptor order broken"
                );
                header_length(header) / 16
            };
            debug_assert!(adv > 0 && adv <= length, "corrupt block length");
            let next = arena_pack((tail + adv) % cap16, length - adv, arena_generation(bq));
            // order: release hands the popped bytes (and, transitively, the
            // previous owner's payload writes) to whichever reservation
            // acquires them next
            match self.buf_queue.compare_exchange_weak(
                bq,
                next,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    if ours {
                        return;
                    }
                    bq = next;
                }
                // only a reservation can interfere here: we are the sole
                // tail-mover while we hold the retirement
                Err(x) => bq = x,
            }
        }
    }

    /// Advance the descriptor queue past the retired (and re-zeroed) `tail`
    fn advance_slot_tail(&self, tail: u32, nslots: u32) {
        let mut sq = self.slot_queue.load(Ordering::Relaxed);
        loop {
            // we hold the retirement, so the tail cannot have moved; only
            // claims can bump the length
            debug_assert_eq!(queue_tail(sq), tail);
            let next = queue_pack((tail + 1) % nslots, queue_length(sq) - 1);
            // order: release republishes the zeroed slot before its index
            // becomes claimable again
            match self.slot_queue.compare_exchange_weak(
                sq,
                next,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(x) => sq = x,
            }
        }
    }

    /// Walk the whole structure and cross-check every invariant that must
    /// hold while no operation is in flight
    ///
    /// Returns `(live or released blocks, ghost descriptors)`. The caller
    /// must guarantee quiescence.
    pub fn _debug_check_consistency(&self) -> (usize, usize) {
        let cap16 = self.cap / 16;
        let nslots = self.slots.len() as u32;
        let sq = self.slot_queue.load(Ordering::SeqCst);
        let bq = self.buf_queue.load(Ordering::SeqCst);
        let (list_tail, list_len) = (queue_tail(sq), queue_length(sq));
        let (buf_tail, buf_len) = (arena_tail(bq), arena_length(bq));
        assert!(list_len <= nslots, "descriptor queue longer than the table");
        assert!(buf_len <= cap16, "arena queue longer than the arena");

        // descriptors in queue order; anything out of queue must be zero
        let mut owned = Vec::new();
        let mut ghosts = 0usize;
        for i in 0..nslots {
            let idx = ((list_tail as u64 + i as u64) % nslots as u64) as u32;
            let slot = self.slots[idx as usize].load(Ordering::SeqCst);
            if i >= list_len {
                assert_eq!(
                    slot, 0,
                    "slot {} out of queue but not zero: {:#018x}",
                    idx, slot
                );
            } else if slot_length(slot) == 0 {
                assert_eq!(slot, SLOT_GHOST, "slot {} holds junk: {:#018x}", idx, slot);
                ghosts += 1;
            } else {
                owned.push((idx, slot));
            }
        }

        // walk the arena span block by block; owned blocks must appear in
        // exactly descriptor-queue order, gaps only at the physical end
        let mut pos = 0u32;
        let mut next_owned = 0usize;
        while pos < buf_len {
            let off16 = ((buf_tail as u64 + pos as u64) % cap16 as u64) as u32;
            let header = self.header_at(off16 * 16).load(Ordering::SeqCst);
            let len16 = header_length(header) / 16;
            assert!(
                len16 > 0 && pos + len16 <= buf_len,
                "block at {:#x} overruns the queue",
                off16 * 16
            );
            let owner = header_owner(header);
            if owner == GAP_OWNER {
                assert_eq!(off16 + len16, cap16, "gap block not at the arena end");
            } else {
                assert!(
                    next_owned < owned.len(),
                    "block at {:#x} has no descriptor",
                    off16 * 16
                );
                let (idx, slot) = owned[next_owned];
                next_owned += 1;
                assert_eq!(
                    owner as u32, idx,
                    "block at {:#x} points at slot {}, queue order says {}",
                    off16 * 16,
                    owner,
                    idx
                );
                assert_eq!(slot_offset(slot), off16 * 16);
                assert_eq!(slot_length(slot), header_length(header));
            }
            pos += len16;
        }
        assert_eq!(next_owned, owned.len(), "descriptors without a block");
        (owned.len(), ghosts)
    }

    fn arena_layout(&self) -> Layout {
        match Layout::from_size_align(self.cap as usize, BLOCK_ALIGN as usize) {
            Ok(x) => x,
            // validated in new()
            Err(_) => unreachable!(),
        }
    }
}

impl Drop for RingAlloc {
    fn drop(&mut self) {
        // safety: buf came from alloc_zeroed with this same layout, and
        // &mut guarantees no operation is in flight
        unsafe { alloc::dealloc(self.buf, self.arena_layout()) }
    }
}
