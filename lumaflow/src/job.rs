//! Job-scoped IO registry.
//!
//! A job binds small integer ids to context-owned IO streams for one
//! processing run. The graph the engine executes refers to streams by these
//! ids. The job never owns the streams: destroying it releases the id
//! mapping and nothing else.

use crate::context::IoId;
use crate::errors::FlowError;
use crate::io::Direction;
use std::collections::HashMap;

/// One id → stream binding inside a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoBinding {
    /// Handle of the context-owned stream.
    pub io: IoId,
    /// Whether the engine reads or writes this stream.
    pub direction: Direction,
}

/// A bounded execution scope mapping io ids to streams.
#[derive(Debug, Default)]
pub struct Job {
    bindings: HashMap<i32, IoBinding>,
}

impl Job {
    /// Creates a job with no bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `io` to `io_id` with the given direction.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `io_id` is already bound in this job.
    pub fn add_io(&mut self, io_id: i32, io: IoId, direction: Direction) -> Result<(), FlowError> {
        if self.bindings.contains_key(&io_id) {
            return Err(FlowError::InvalidArgument(format!(
                "io_id {io_id} is already bound in this job"
            )));
        }
        self.bindings.insert(io_id, IoBinding { io, direction });
        Ok(())
    }

    /// Looks up the binding for `io_id`.
    #[must_use]
    pub fn get_io(&self, io_id: i32) -> Option<IoBinding> {
        self.bindings.get(&io_id).copied()
    }

    /// Returns the bound ids in ascending order.
    #[must_use]
    pub fn io_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.bindings.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if no streams are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn io_id(token: u64) -> IoId {
        IoId::from_token(token).unwrap()
    }

    #[test]
    fn test_add_and_get_io() {
        let mut job = Job::new();
        job.add_io(0, io_id(11), Direction::In).unwrap();
        job.add_io(1, io_id(12), Direction::Out).unwrap();

        let binding = job.get_io(0).unwrap();
        assert_eq!(binding.io, io_id(11));
        assert_eq!(binding.direction, Direction::In);
        assert_eq!(job.len(), 2);
    }

    #[test]
    fn test_duplicate_io_id_rejected() {
        let mut job = Job::new();
        job.add_io(3, io_id(11), Direction::In).unwrap();
        let err = job.add_io(3, io_id(12), Direction::Out).unwrap_err();
        assert_eq!(err.code().value(), 50);
        // Original binding unchanged.
        assert_eq!(job.get_io(3).unwrap().io, io_id(11));
    }

    #[test]
    fn test_get_missing_id_is_none() {
        let job = Job::new();
        assert!(job.get_io(7).is_none());
    }

    #[test]
    fn test_io_ids_sorted() {
        let mut job = Job::new();
        job.add_io(5, io_id(1), Direction::Out).unwrap();
        job.add_io(-2, io_id(2), Direction::In).unwrap();
        job.add_io(0, io_id(3), Direction::In).unwrap();
        assert_eq!(job.io_ids(), vec![-2, 0, 5]);
    }
}
