//! Pathfinder doubles for exercising the asynchronous boundary.

use std::cell::RefCell;
use std::rc::Rc;

use rp_sim::pathfinder::{PathOutcome, PathRequest, PathResponse, Pathfinder};

/// A pathfinder that holds every request until the test resolves it.
///
/// Lets tests interleave requests and deliveries precisely, which is the key tool
/// for supersede/stale-response coverage. Keep a second `Rc` to the
/// double and hand a clone to the manager:
///
/// ```
/// use std::rc::Rc;
/// use rp_test_utils::pathfinders::ManualPathfinder;
///
/// let control = Rc::new(ManualPathfinder::default());
/// let service: Rc<dyn rp_sim::pathfinder::Pathfinder> = Rc::clone(&control) as _;
/// # let _ = service;
/// ```
#[derive(Default)]
pub struct ManualPathfinder {
    pending: RefCell<Vec<PathRequest>>,
    ready: RefCell<Vec<PathResponse>>,
}

impl ManualPathfinder {
    /// Create an empty double.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Number of requests not yet resolved.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Snapshot of the oldest unresolved request.
    #[must_use]
    pub fn oldest_pending(&self) -> Option<PathRequest> {
        self.pending.borrow().first().cloned()
    }

    /// Resolve the oldest pending request with the given outcome. The
    /// response is delivered on the manager's next poll (next tick).
    ///
    /// # Panics
    ///
    /// Panics if no request is pending.
    pub fn resolve_oldest(&self, outcome: PathOutcome) {
        let request = self.pending.borrow_mut().remove(0);
        self.ready.borrow_mut().push(PathResponse {
            entity: request.entity,
            seq: request.seq,
            outcome,
        });
    }

    /// Resolve the oldest pending request with a two-point straight-line
    /// path (start, goal).
    ///
    /// # Panics
    ///
    /// Panics if no request is pending.
    pub fn resolve_oldest_direct(&self) {
        let request = self.pending.borrow().first().cloned().expect("pending request");
        self.resolve_oldest(PathOutcome::Found(vec![request.start, request.goal]));
    }
}

impl Pathfinder for ManualPathfinder {
    fn request(&self, request: PathRequest) {
        self.pending.borrow_mut().push(request);
    }

    fn poll(&self) -> Vec<PathResponse> {
        self.ready.borrow_mut().drain(..).collect()
    }
}
