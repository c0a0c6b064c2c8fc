//! Asynchronous path-find service boundary.
//!
//! Path searches run off the simulation thread. Requests are tagged with
//! the requesting entity and a per-component sequence number; results come
//! back through a thread-safe queue and are drained by the entity manager
//! at the start of each tick, so entity state is only ever touched on the
//! simulation thread. A response whose sequence no longer matches the
//! component's current request is stale and is discarded on delivery.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::entity::EntityId;
use crate::math::Vec3;
use crate::nav::{find_path, smooth_path, NavGrid};

/// A path query dispatched to the service.
#[derive(Debug, Clone, PartialEq)]
pub struct PathRequest {
    /// Entity the path is for.
    pub entity: EntityId,
    /// The requesting component's sequence number.
    pub seq: u64,
    /// Search start position.
    pub start: Vec3,
    /// Search goal position.
    pub goal: Vec3,
}

/// Result of a path query.
#[derive(Debug, Clone, PartialEq)]
pub enum PathOutcome {
    /// A non-empty waypoint sequence from start to goal.
    Found(Vec<Vec3>),
    /// No route exists (or an endpoint was invalid).
    Unreachable,
}

/// A completed query, delivered back to the simulation thread.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResponse {
    /// Entity the path is for.
    pub entity: EntityId,
    /// Sequence number copied from the request.
    pub seq: u64,
    /// The search result.
    pub outcome: PathOutcome,
}

/// The path-find collaborator consumed by the simulation core.
///
/// Implementations must deliver every response through [`poll`] on the
/// simulation thread; they must never touch entity state themselves.
///
/// [`poll`]: Pathfinder::poll
pub trait Pathfinder {
    /// Submit a query. Never blocks the simulation thread.
    fn request(&self, request: PathRequest);

    /// Drain completed responses, in completion order.
    fn poll(&self) -> Vec<PathResponse>;
}

/// Grid A* service running on a dedicated worker thread.
///
/// Dropping the service closes the request channel and joins the worker.
pub struct GridPathfinderService {
    jobs: Option<Sender<PathRequest>>,
    results: Receiver<PathResponse>,
    worker: Option<JoinHandle<()>>,
}

impl GridPathfinderService {
    /// Spawn the worker over the given navigation grid.
    #[must_use]
    pub fn spawn(grid: NavGrid) -> Self {
        let (jobs_tx, jobs_rx) = unbounded::<PathRequest>();
        let (results_tx, results_rx) = unbounded::<PathResponse>();

        let worker = std::thread::Builder::new()
            .name("pathfinder".to_owned())
            .spawn(move || {
                for request in jobs_rx {
                    let outcome = match find_path(&grid, request.start, request.goal) {
                        Ok(path) => PathOutcome::Found(smooth_path(&grid, path)),
                        Err(err) => {
                            tracing::debug!(
                                entity = request.entity,
                                %err,
                                "path request failed"
                            );
                            PathOutcome::Unreachable
                        }
                    };
                    let response = PathResponse {
                        entity: request.entity,
                        seq: request.seq,
                        outcome,
                    };
                    if results_tx.send(response).is_err() {
                        break;
                    }
                }
            })
            .expect("spawn pathfinder worker");

        Self {
            jobs: Some(jobs_tx),
            results: results_rx,
            worker: Some(worker),
        }
    }
}

impl Pathfinder for GridPathfinderService {
    fn request(&self, request: PathRequest) {
        if let Some(jobs) = &self.jobs {
            // A send error means the worker is gone; the request is
            // implicitly cancelled.
            let _ = jobs.send(request);
        }
    }

    fn poll(&self) -> Vec<PathResponse> {
        self.results.try_iter().collect()
    }
}

impl Drop for GridPathfinderService {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// In-process pathfinder that searches synchronously on `request` and
/// delivers the result on the next `poll`.
///
/// Keeps the asynchronous delivery contract (results never apply during
/// the requesting call) without a worker thread. Used by the headless
/// runner for reproducible runs and convenient in tests.
pub struct ImmediatePathfinder {
    grid: NavGrid,
    ready: RefCell<VecDeque<PathResponse>>,
}

impl ImmediatePathfinder {
    /// Create over the given grid.
    #[must_use]
    pub fn new(grid: NavGrid) -> Self {
        Self {
            grid,
            ready: RefCell::new(VecDeque::new()),
        }
    }
}

impl Default for ImmediatePathfinder {
    fn default() -> Self {
        Self::new(NavGrid::default())
    }
}

impl Pathfinder for ImmediatePathfinder {
    fn request(&self, request: PathRequest) {
        let outcome = match find_path(&self.grid, request.start, request.goal) {
            Ok(path) => PathOutcome::Found(smooth_path(&self.grid, path)),
            Err(_) => PathOutcome::Unreachable,
        };
        self.ready.borrow_mut().push_back(PathResponse {
            entity: request.entity,
            seq: request.seq,
            outcome,
        });
    }

    fn poll(&self) -> Vec<PathResponse> {
        self.ready.borrow_mut().drain(..).collect()
    }
}
