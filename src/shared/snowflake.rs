//! Snowflake ID Generator
//!
//! Twitter-style distributed unique ID generation. IDs are time-ordered,
//! which the chat read cursors rely on: a room's per-participant cursor is
//! the highest message ID the participant has seen. Within one generator
//! IDs are strictly increasing, even across calls in the same millisecond.

use parking_lot::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default custom epoch (2015-01-01T00:00:00.000Z)
pub const DEFAULT_EPOCH: u64 = 1420070400000;

struct ClockState {
    last_timestamp: u64,
    sequence: u64,
}

/// Snowflake ID generator
pub struct SnowflakeGenerator {
    machine_id: u64,
    node_id: u64,
    epoch: u64,
    state: Mutex<ClockState>,
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator
    pub fn new(machine_id: u64, node_id: u64) -> Self {
        Self::with_epoch(machine_id, node_id, DEFAULT_EPOCH)
    }

    /// Create a generator with a custom epoch
    pub fn with_epoch(machine_id: u64, node_id: u64, epoch: u64) -> Self {
        Self {
            machine_id: machine_id & 0x1F, // 5 bits
            node_id: node_id & 0x1F,       // 5 bits
            epoch,
            state: Mutex::new(ClockState {
                last_timestamp: 0,
                sequence: 0,
            }),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let mut state = self.state.lock();

        // Never move backwards, even if the wall clock does
        let mut timestamp = self.current_timestamp().max(state.last_timestamp);

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & 0xFFF;
            if state.sequence == 0 {
                // 12-bit sequence exhausted: spill into the next millisecond
                timestamp += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        let id = ((timestamp - self.epoch) << 22)
            | (self.machine_id << 17)
            | (self.node_id << 12)
            | state.sequence;

        id as i64
    }

    /// Get current timestamp in milliseconds
    fn current_timestamp(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as u64
    }
}

/// Extract the millisecond timestamp from a snowflake ID
pub fn extract_timestamp(snowflake: i64, epoch: u64) -> u64 {
    ((snowflake as u64) >> 22) + epoch
}
