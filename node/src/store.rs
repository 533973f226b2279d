//! Latest-value store shared between the acquisition loop and its consumers.
//!
//! The store keeps only the most recent [`Reading`]. Every consumer gets its own
//! notification flag, so a slow consumer never holds back a fast one and a burst
//! of readings collapses into a single wake-up carrying the newest value.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use shared::Reading;

/// Consumers fed by the node: display, telemetry and beacon.
pub const CONSUMERS: usize = 3;

pub type NodeStore<M> = ReadingStore<M, CONSUMERS>;

pub struct ReadingStore<M: RawMutex, const N: usize> {
    latest: Mutex<M, Cell<Option<Reading>>>,
    pending: [Signal<M, ()>; N],
}

impl<M: RawMutex, const N: usize> ReadingStore<M, N> {
    pub fn new() -> Self {
        Self {
            latest: Mutex::new(Cell::new(None)),
            pending: core::array::from_fn(|_| Signal::new()),
        }
    }

    pub fn latest(&self) -> Option<Reading> {
        self.latest.lock(|latest| latest.get())
    }

    /// Hands out the single writer and one watch per consumer.
    pub fn split(&mut self) -> (ReadingWriter<'_, M, N>, [ReadingWatch<'_, M, N>; N]) {
        let store: &Self = self;
        let watches = core::array::from_fn(|index| ReadingWatch { store, index });

        (ReadingWriter { store }, watches)
    }
}

impl<M: RawMutex, const N: usize> Default for ReadingStore<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ReadingWriter<'a, M: RawMutex, const N: usize> {
    store: &'a ReadingStore<M, N>,
}

impl<M: RawMutex, const N: usize> ReadingWriter<'_, M, N> {
    /// Replaces the stored reading, then wakes every consumer.
    pub fn publish(&mut self, reading: Reading) {
        self.store.latest.lock(|latest| latest.set(Some(reading)));

        for pending in &self.store.pending {
            pending.signal(());
        }
    }
}

pub struct ReadingWatch<'a, M: RawMutex, const N: usize> {
    store: &'a ReadingStore<M, N>,
    index: usize,
}

impl<M: RawMutex, const N: usize> ReadingWatch<'_, M, N> {
    /// Waits until a reading newer than the last one observed is available.
    pub async fn changed(&mut self) -> Reading {
        loop {
            self.pending().wait().await;
            if let Some(reading) = self.store.latest() {
                return reading;
            }
        }
    }

    /// Like [`Self::changed`], without waiting.
    pub fn try_changed(&mut self) -> Option<Reading> {
        self.pending().try_take().and_then(|()| self.store.latest())
    }

    pub fn latest(&self) -> Option<Reading> {
        self.store.latest()
    }

    fn pending(&self) -> &Signal<M, ()> {
        &self.store.pending[self.index]
    }
}
