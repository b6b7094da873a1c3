//! Lock-free handoff between the audio thread and a reporting thread
//!
//! Scalar meters travel through atomics that the reader samples whenever it
//! likes. Gating blocks travel through an SPSC ring so the reader can rebuild
//! the full history without the audio thread ever allocating.

use rtrb::{Consumer, Producer, RingBuffer};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use sage_core::DB_FLOOR;

use crate::gating::GatingHistory;
use crate::loudness::{LoudnessAccumulator, LoudnessReading};

/// Atomic f64 stored as its bit pattern
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Default for AtomicF64 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// `LoudnessReading` in one atomic word (sentinels survive the trip)
#[derive(Debug)]
struct AtomicReading(AtomicU64);

impl AtomicReading {
    fn new(reading: LoudnessReading) -> Self {
        Self(AtomicU64::new(reading.to_bits()))
    }

    fn load(&self) -> LoudnessReading {
        LoudnessReading::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, reading: LoudnessReading) {
        self.0.store(reading.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug)]
struct SharedMeters {
    momentary: AtomicReading,
    short_term: AtomicReading,
    true_peak_dbtp: AtomicF64,
    gain_reduction_db: AtomicF64,
    session: AtomicU32,
    overflowed: AtomicBool,
}

/// One completed hop as seen by the reader
#[derive(Debug, Clone, Copy)]
struct HopEntry {
    session: u32,
    block_power: f64,
    short_term_power: Option<f64>,
}

/// What the reporting thread sees after `poll()`
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct LoudnessSnapshot {
    pub momentary: LoudnessReading,
    pub short_term: LoudnessReading,
    pub integrated: LoudnessReading,
    pub loudness_range: Option<f64>,
    pub true_peak_dbtp: f64,
    pub gain_reduction_db: f64,
    /// Gating blocks received this session
    pub blocks: usize,
    /// History stopped short because the ring filled up
    pub overflowed: bool,
}

/// Create a bridge whose ring holds `capacity` pending hops
pub fn meter_bridge(capacity: usize) -> (MeterPublisher, MeterReader) {
    let shared = Arc::new(SharedMeters {
        momentary: AtomicReading::new(LoudnessReading::InsufficientData),
        short_term: AtomicReading::new(LoudnessReading::InsufficientData),
        true_peak_dbtp: AtomicF64::new(DB_FLOOR),
        gain_reduction_db: AtomicF64::new(0.0),
        session: AtomicU32::new(0),
        overflowed: AtomicBool::new(false),
    });
    let capacity = capacity.max(1);
    let (producer, consumer) = RingBuffer::new(capacity);

    (
        MeterPublisher {
            shared: Arc::clone(&shared),
            producer,
            pending: VecDeque::with_capacity(capacity),
            pending_capacity: capacity,
            session: 0,
            halted: false,
        },
        MeterReader {
            shared,
            consumer,
            session: 0,
            history: GatingHistory::with_capacity(capacity),
            warned: false,
        },
    )
}

/// Audio-thread side. Never blocks, locks, or allocates.
///
/// Entries that do not fit in the ring wait in a preallocated pending
/// queue of the same capacity and move over as the reader frees slots.
/// Only when both are full does the session halt.
pub struct MeterPublisher {
    shared: Arc<SharedMeters>,
    producer: Producer<HopEntry>,
    pending: VecDeque<HopEntry>,
    pending_capacity: usize,
    session: u32,
    halted: bool,
}

impl MeterPublisher {
    /// Publish the hop just appended to `accumulator`
    pub fn publish(&mut self, accumulator: &LoudnessAccumulator, true_peak_dbtp: f64) {
        self.shared.momentary.store(accumulator.momentary());
        self.shared.short_term.store(accumulator.short_term());
        self.shared.true_peak_dbtp.store(true_peak_dbtp);
        self.flush();

        let Some(block_power) = accumulator.last_block_power() else {
            return;
        };
        if self.halted {
            return;
        }
        let entry = HopEntry {
            session: self.session,
            block_power,
            short_term_power: accumulator.last_short_term_power(),
        };
        if self.pending.is_empty() {
            match self.producer.push(entry) {
                Ok(()) => return,
                Err(rtrb::PushError::Full(entry)) => self.pending.push_back(entry),
            }
        } else if self.pending.len() < self.pending_capacity {
            self.pending.push_back(entry);
        } else {
            // Stop here so the reader holds an exact prefix
            self.halted = true;
            self.shared.overflowed.store(true, Ordering::Release);
        }
    }

    /// Move pending entries into the ring while it has room
    pub fn flush(&mut self) {
        while let Some(&entry) = self.pending.front() {
            if self.producer.push(entry).is_err() {
                break;
            }
            self.pending.pop_front();
        }
    }

    /// Entries still waiting for ring space
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn set_gain_reduction(&self, db: f64) {
        self.shared.gain_reduction_db.store(db);
    }

    /// Mark the start of a new measurement session
    pub fn begin_session(&mut self) {
        self.session = self.session.wrapping_add(1);
        self.halted = false;
        // The reader would discard these anyway
        self.pending.clear();
        self.shared.momentary.store(LoudnessReading::InsufficientData);
        self.shared.short_term.store(LoudnessReading::InsufficientData);
        self.shared.true_peak_dbtp.store(DB_FLOOR);
        self.shared.gain_reduction_db.store(0.0);
        self.shared.overflowed.store(false, Ordering::Release);
        self.shared.session.store(self.session, Ordering::Release);
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }
}

impl fmt::Debug for MeterPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeterPublisher")
            .field("session", &self.session)
            .field("pending", &self.pending.len())
            .field("halted", &self.halted)
            .finish_non_exhaustive()
    }
}

/// Reporting-thread side. Owns the rebuilt gating history.
pub struct MeterReader {
    shared: Arc<SharedMeters>,
    consumer: Consumer<HopEntry>,
    session: u32,
    history: GatingHistory,
    warned: bool,
}

impl MeterReader {
    /// Drain pending hops and return the current readings
    pub fn poll(&mut self) -> LoudnessSnapshot {
        let current = self.shared.session.load(Ordering::Acquire);
        if current != self.session {
            self.start_session(current);
        }

        while let Ok(entry) = self.consumer.pop() {
            if entry.session != self.session {
                if entry.session.wrapping_sub(self.session) as i32 > 0 {
                    self.start_session(entry.session);
                } else {
                    // Leftover from an older session
                    continue;
                }
            }
            self.history.push_block(entry.block_power);
            if let Some(power) = entry.short_term_power {
                self.history.push_short_term(power);
            }
        }

        let overflowed = self.shared.overflowed.load(Ordering::Acquire);
        if overflowed && !self.warned {
            log::warn!(
                "meter bridge overflowed after {} blocks; integrated loudness covers a prefix only",
                self.history.len()
            );
            self.warned = true;
        }

        LoudnessSnapshot {
            momentary: self.shared.momentary.load(),
            short_term: self.shared.short_term.load(),
            integrated: self.history.integrated(),
            loudness_range: self.history.loudness_range(),
            true_peak_dbtp: self.shared.true_peak_dbtp.load(),
            gain_reduction_db: self.shared.gain_reduction_db.load(),
            blocks: self.history.len(),
            overflowed,
        }
    }

    fn start_session(&mut self, session: u32) {
        log::debug!("meter bridge: session {} -> {}", self.session, session);
        self.session = session;
        self.history.clear();
        self.warned = false;
    }

    pub fn history(&self) -> &GatingHistory {
        &self.history
    }
}

impl fmt::Debug for MeterReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeterReader")
            .field("session", &self.session)
            .field("blocks", &self.history.len())
            .finish_non_exhaustive()
    }
}

/// One-directional parameter handoff into the audio thread
///
/// The control side validates and pushes whole values; the audio side takes
/// the newest one between blocks and discards the rest. Processor
/// `set_params` methods do not log, so applying a value there stays off the
/// logging path.
pub struct ParamQueue<T> {
    consumer: Consumer<T>,
}

/// Control-thread end of a `ParamQueue`
pub struct ParamSender<T> {
    producer: Producer<T>,
}

impl<T> ParamQueue<T> {
    pub fn new(capacity: usize) -> (ParamSender<T>, ParamQueue<T>) {
        let (producer, consumer) = RingBuffer::new(capacity.max(1));
        (ParamSender { producer }, ParamQueue { consumer })
    }

    /// Newest pending value, if any
    pub fn latest(&mut self) -> Option<T> {
        let mut newest = None;
        while let Ok(value) = self.consumer.pop() {
            newest = Some(value);
        }
        newest
    }
}

impl<T> ParamSender<T> {
    /// Queue `value`; hands it back when the queue is full
    pub fn send(&mut self, value: T) -> Result<(), T> {
        self.producer.push(value).map_err(|err| match err {
            rtrb::PushError::Full(value) => value,
        })
    }
}
