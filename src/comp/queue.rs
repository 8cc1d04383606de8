//! The handoff queue between a single producer worker and a single consumer
//! worker in the `RandomWalkManager` mesh.
//!
//! Because the mesh assigns exactly one producer and one consumer to every
//! `(s, r)` pair, a lock-free SPSC-friendly channel gives the same bulk
//! push/drain semantics as a pair of locked deques with no lock at all.
//! `crossbeam-channel`'s MPMC channel is used here rather than a hand-rolled
//! ring buffer.

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::comp::random_walk::RandomWalk;

/// Bounded-contention handoff queue for one `(sender, receiver)` pair.
/// `push_all` is atomic with respect to concurrent `pop_all`: a drained walk
/// is never lost nor duplicated. No FIFO guarantee is required by callers.
pub struct RandomWalkQueue {
    sender: Sender<RandomWalk>,
    receiver: Receiver<RandomWalk>,
}

impl RandomWalkQueue {
    pub fn new() -> RandomWalkQueue {
        let (sender, receiver) = unbounded();
        RandomWalkQueue { sender, receiver }
    }

    /// Bulk-append; amortizes handoff overhead over many walks.
    pub fn push_all(&self, walks: Vec<RandomWalk>) {
        for walk in walks {
            // The receiver only drops once the owning manager is torn down
            // at the end of a render, after which no more pushes occur.
            let _ = self.sender.send(walk);
        }
    }

    /// Non-blocking bulk drain; returns everything currently queued,
    /// possibly empty.
    pub fn pop_all(&self) -> Vec<RandomWalk> {
        self.receiver.try_iter().collect()
    }
}

impl Default for RandomWalkQueue {
    fn default() -> Self {
        RandomWalkQueue::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::vec_types::Vec2;

    #[test]
    fn drains_everything_pushed() {
        let q = RandomWalkQueue::new();
        q.push_all(vec![
            RandomWalk::new(0, 0, Vec2::new(0.0, 0.0), 1),
            RandomWalk::new(0, 1, Vec2::new(0.0, 0.0), 1),
        ]);
        let drained = q.pop_all();
        assert_eq!(drained.len(), 2);
        assert!(q.pop_all().is_empty());
    }

    #[test]
    fn concurrent_push_and_pop_lose_nothing() {
        use std::sync::Arc;
        let q = Arc::new(RandomWalkQueue::new());
        let producer = {
            let q = q.clone();
            std::thread::spawn(move || {
                for i in 0..1000 {
                    q.push_all(vec![RandomWalk::new(0, i, Vec2::new(0.0, 0.0), 1)]);
                }
            })
        };
        producer.join().unwrap();
        let mut total = 0;
        while total < 1000 {
            total += q.pop_all().len();
        }
        assert_eq!(total, 1000);
    }
}
