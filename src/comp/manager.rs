//! The inbox/outbox mesh of queues between workers, and block-ownership
//! routing.
//!
//! `Mesh` is the shared `N × N` array of queues (two logical channels:
//! active, terminated), held behind an `Arc` and touched concurrently by
//! every worker. `RandomWalkManager` is each worker's private view onto the
//! mesh: its own outbox buffers, which are never shared, plus a reference to
//! the mesh for draining its inbox row and flushing its outbox row.

use std::sync::Arc;

use crate::comp::grid::ClosestPointGrid;
use crate::comp::queue::RandomWalkQueue;
use crate::comp::random_walk::RandomWalk;
use crate::storage::vec_types::Vec2;

/// The shared `N × N × 2` queue mesh. `active[s][r]` holds active walks sent
/// from worker `s` to worker `r`; `terminated[s][r]` the same for walks
/// pending termination classification.
pub struct Mesh {
    n: usize,
    active: Vec<Vec<RandomWalkQueue>>,
    terminated: Vec<Vec<RandomWalkQueue>>,
}

impl Mesh {
    pub fn new(n: usize) -> Mesh {
        let make_grid = || (0..n).map(|_| (0..n).map(|_| RandomWalkQueue::new()).collect()).collect();
        Mesh {
            n,
            active: make_grid(),
            terminated: make_grid(),
        }
    }
}

/// One worker's view of the mesh: its own outbox buffers (private, no
/// locking needed) plus access to its inbox row of the shared mesh.
pub struct RandomWalkManager {
    mesh: Arc<Mesh>,
    cpg: Arc<ClosestPointGrid>,
    tid: usize,
    active_outbox: Vec<Vec<RandomWalk>>,
    terminated_outbox: Vec<Vec<RandomWalk>>,
}

impl RandomWalkManager {
    pub fn new(mesh: Arc<Mesh>, cpg: Arc<ClosestPointGrid>, tid: usize) -> RandomWalkManager {
        let n = mesh.n;
        RandomWalkManager {
            mesh,
            cpg,
            tid,
            active_outbox: (0..n).map(|_| Vec::new()).collect(),
            terminated_outbox: (0..n).map(|_| Vec::new()).collect(),
        }
    }

    /// The block owning `p`, used both for seeding (`parent_id`) and for
    /// routing a walk already in flight.
    pub fn owner_of(&self, p: Vec2) -> usize {
        self.cpg.block_id(p).expect("seed points must lie within the scene window")
    }

    /// Drain this worker's active inbox: everything peers sent it, plus
    /// whatever it buffered for itself (which never crosses a queue).
    pub fn recv_active_walks(&mut self) -> Vec<RandomWalk> {
        let mut walks = Vec::new();
        for s in 0..self.mesh.n {
            if s != self.tid {
                walks.extend(self.mesh.active[s][self.tid].pop_all());
            }
        }
        walks.append(&mut self.active_outbox[self.tid]);
        walks
    }

    /// Symmetric drain for the terminated channel.
    pub fn recv_terminated_walks(&mut self) -> Vec<RandomWalk> {
        let mut walks = Vec::new();
        for s in 0..self.mesh.n {
            if s != self.tid {
                walks.extend(self.mesh.terminated[s][self.tid].pop_all());
            }
        }
        walks.append(&mut self.terminated_outbox[self.tid]);
        walks
    }

    /// Route `rw` into the outbox bucket for its destination: the block
    /// owning its current position if in range, else its `parent_id`
    /// (fallback for walks that wandered outside the grid).
    pub fn add_walk_to_buffer(&mut self, rw: RandomWalk) {
        let dest = if self.cpg.point_in_range(rw.p) {
            self.cpg.block_id(rw.p).expect("point_in_range implies block_id succeeds")
        } else {
            rw.parent_id
        };
        if rw.terminated {
            self.terminated_outbox[dest].push(rw);
        } else {
            self.active_outbox[dest].push(rw);
        }
    }

    /// Flush every non-self outbox bucket into the corresponding peer's
    /// inbox queue. Self-bound buckets are left alone; they're consumed in
    /// place on the next `recv_*`.
    pub fn send_walks(&mut self) {
        for i in 0..self.mesh.n {
            if i == self.tid {
                continue;
            }
            if !self.active_outbox[i].is_empty() {
                self.mesh.active[self.tid][i].push_all(std::mem::take(&mut self.active_outbox[i]));
            }
            if !self.terminated_outbox[i].is_empty() {
                self.mesh.terminated[self.tid][i].push_all(std::mem::take(&mut self.terminated_outbox[i]));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::scene::{Disk, Scene, Window};
    use crate::storage::vec_types::Vec3;

    fn cpg_4_workers() -> Arc<ClosestPointGrid> {
        let scene = Scene::new(
            "t".into(),
            Window { xmin: 0.0, ymin: 0.0, xmax: 10.0, ymax: 10.0 },
            vec![Disk { center: Vec2::new(5.0, 5.0), radius: 2.0, boundary: Vec3::new(1.0, 0.0, 0.0) }],
        );
        Arc::new(ClosestPointGrid::build(&scene, Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0), 0.5, 4))
    }

    #[test]
    fn self_routed_walks_never_cross_a_queue() {
        let cpg = cpg_4_workers();
        let mesh = Arc::new(Mesh::new(4));
        let mgr = RandomWalkManager::new(mesh, cpg, 0);
        let owner = mgr.owner_of(Vec2::new(0.1, 0.1));
        let rw = RandomWalk::new(owner, 0, Vec2::new(0.1, 0.1), 1);
        // Force tid to equal the owner so the walk is self-routed.
        let mesh2 = mgr_with_tid(owner);
        let mut mgr2 = mesh2;
        mgr2.add_walk_to_buffer(rw);
        mgr2.send_walks();
        let received = mgr2.recv_active_walks();
        assert_eq!(received.len(), 1);
    }

    fn mgr_with_tid(tid: usize) -> RandomWalkManager {
        let cpg = cpg_4_workers();
        let mesh = Arc::new(Mesh::new(4));
        RandomWalkManager::new(mesh, cpg, tid)
    }

    #[test]
    fn out_of_range_walk_routes_to_parent_id() {
        let cpg = cpg_4_workers();
        let mesh = Arc::new(Mesh::new(4));
        let mut mgr = RandomWalkManager::new(mesh, cpg, 2);
        let rw = RandomWalk::new(2, 0, Vec2::new(1000.0, 1000.0), 1);
        mgr.add_walk_to_buffer(rw);
        mgr.send_walks();
        let received = mgr.recv_active_walks();
        assert_eq!(received.len(), 1);
    }
}
