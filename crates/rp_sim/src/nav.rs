//! Grid-based pathfinding using the A* algorithm.
//!
//! The default pathfinder service runs this search on its worker thread.
//! Movement is 8-directional with corner cutting rejected; equal-cost
//! frontier nodes are tie-broken by cell coordinates so the same query
//! always yields the same path.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::Vec3;

/// Errors produced by a path query.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavError {
    /// Start or goal lies outside the grid.
    #[error("Position outside navigation grid")]
    OutsideGrid,
    /// Start or goal cell is impassable.
    #[error("Position is blocked")]
    Blocked,
    /// Every route between start and goal is obstructed.
    #[error("No route between start and goal")]
    NoRoute,
}

/// Cell classification for the navigation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellKind {
    /// Normal terrain (cost 1).
    #[default]
    Open,
    /// Impassable terrain.
    Blocked,
    /// Rough terrain with doubled traversal cost.
    Rough,
}

impl CellKind {
    /// Traversal cost multiplier, `None` for impassable cells.
    #[must_use]
    pub const fn cost(self) -> Option<f32> {
        match self {
            Self::Open => Some(1.0),
            Self::Blocked => None,
            Self::Rough => Some(2.0),
        }
    }

    /// Whether the cell can be entered.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Blocked)
    }
}

/// Walkability grid over the world's x/y plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavGrid {
    width: u32,
    height: u32,
    cells: Vec<CellKind>,
    cell_size: f32,
}

impl NavGrid {
    /// Create a grid with every cell open.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero or `cell_size` is not
    /// positive.
    #[must_use]
    pub fn new(width: u32, height: u32, cell_size: f32) -> Self {
        assert!(width > 0, "NavGrid width must be positive");
        assert!(height > 0, "NavGrid height must be positive");
        assert!(cell_size > 0.0, "NavGrid cell_size must be positive");
        Self {
            width,
            height,
            cells: vec![CellKind::Open; (width as usize) * (height as usize)],
            cell_size,
        }
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Cell edge length in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Check whether coordinates are inside the grid.
    #[must_use]
    pub fn in_bounds(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Cell kind at coordinates, `None` when out of bounds.
    #[must_use]
    pub fn cell(&self, x: u32, y: u32) -> Option<CellKind> {
        self.in_bounds(x, y).then(|| self.cells[self.index(x, y)])
    }

    /// Set a cell's kind. Returns `false` when out of bounds.
    pub fn set_cell(&mut self, x: u32, y: u32, kind: CellKind) -> bool {
        if self.in_bounds(x, y) {
            let index = self.index(x, y);
            self.cells[index] = kind;
            true
        } else {
            false
        }
    }

    /// Whether the cell at coordinates can be entered.
    #[must_use]
    pub fn is_walkable(&self, x: u32, y: u32) -> bool {
        self.cell(x, y).is_some_and(CellKind::is_walkable)
    }

    /// World position → grid cell, `None` outside the grid.
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec3) -> Option<(u32, u32)> {
        if pos.x < 0.0 || pos.y < 0.0 {
            return None;
        }
        let x = (pos.x / self.cell_size).floor() as i64;
        let y = (pos.y / self.cell_size).floor() as i64;
        (x >= 0 && x < i64::from(self.width) && y >= 0 && y < i64::from(self.height))
            .then(|| (x as u32, y as u32))
    }

    /// Grid cell → world position at the cell center (z = 0).
    #[must_use]
    pub fn grid_to_world(&self, x: u32, y: u32) -> Vec3 {
        let half = self.cell_size * 0.5;
        Vec3::new(
            (x as f32) * self.cell_size + half,
            (y as f32) * self.cell_size + half,
            0.0,
        )
    }

    /// Traversal cost of a cell, `None` for blocked or out-of-bounds.
    #[must_use]
    pub fn traversal_cost(&self, x: u32, y: u32) -> Option<f32> {
        self.cell(x, y).and_then(CellKind::cost)
    }
}

impl Default for NavGrid {
    /// 64x64 open cells, one world unit per cell.
    fn default() -> Self {
        Self::new(64, 64, 1.0)
    }
}

/// A frontier node in the A* open set.
#[derive(Debug, Clone, Copy)]
struct FrontierNode {
    x: u32,
    y: u32,
    f_score: f32,
    /// Deterministic tie-breaker: lower packed coordinates first.
    tie_breaker: u64,
}

impl PartialEq for FrontierNode {
    fn eq(&self, other: &Self) -> bool {
        self.f_score == other.f_score && self.tie_breaker == other.tie_breaker
    }
}

impl Eq for FrontierNode {}

impl Ord for FrontierNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior: lower f_score = higher priority.
        match other.f_score.total_cmp(&self.f_score) {
            Ordering::Equal => other.tie_breaker.cmp(&self.tie_breaker),
            ord => ord,
        }
    }
}

impl PartialOrd for FrontierNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Neighbor offsets for 8-directional movement.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

const SQRT_2: f32 = std::f32::consts::SQRT_2;

/// Octile distance heuristic for 8-directional movement.
#[inline]
fn octile_heuristic(x1: u32, y1: u32, x2: u32, y2: u32) -> f32 {
    let dx = x1.abs_diff(x2) as f32;
    let dy = y1.abs_diff(y2) as f32;
    dx.max(dy) + (SQRT_2 - 1.0) * dx.min(dy)
}

#[inline]
fn pack_coords(x: u32, y: u32) -> u64 {
    (u64::from(y) << 32) | u64::from(x)
}

/// Reject diagonal steps that would cut a blocked corner.
#[inline]
fn diagonal_clear(grid: &NavGrid, x: u32, y: u32, dx: i32, dy: i32) -> bool {
    if dx != 0 && dy != 0 {
        let nx = (x as i32 + dx) as u32;
        let ny = (y as i32 + dy) as u32;
        grid.is_walkable(nx, y) && grid.is_walkable(x, ny)
    } else {
        true
    }
}

/// Find a path between two world positions.
///
/// The returned waypoints are cell centers from start to goal inclusive.
///
/// # Errors
///
/// [`NavError::OutsideGrid`] or [`NavError::Blocked`] for bad endpoints,
/// [`NavError::NoRoute`] when the goal is unreachable.
pub fn find_path(grid: &NavGrid, start: Vec3, goal: Vec3) -> Result<Vec<Vec3>, NavError> {
    let (sx, sy) = grid.world_to_grid(start).ok_or(NavError::OutsideGrid)?;
    let (gx, gy) = grid.world_to_grid(goal).ok_or(NavError::OutsideGrid)?;

    if !grid.is_walkable(sx, sy) || !grid.is_walkable(gx, gy) {
        return Err(NavError::Blocked);
    }
    if sx == gx && sy == gy {
        return Ok(vec![grid.grid_to_world(sx, sy)]);
    }

    let mut open: BinaryHeap<FrontierNode> = BinaryHeap::new();
    let mut came_from: HashMap<(u32, u32), (u32, u32)> = HashMap::new();
    let mut g_score: HashMap<(u32, u32), f32> = HashMap::new();

    g_score.insert((sx, sy), 0.0);
    open.push(FrontierNode {
        x: sx,
        y: sy,
        f_score: octile_heuristic(sx, sy, gx, gy),
        tie_breaker: pack_coords(sx, sy),
    });

    while let Some(current) = open.pop() {
        if current.x == gx && current.y == gy {
            return Ok(reconstruct(grid, &came_from, gx, gy));
        }

        let current_g = g_score
            .get(&(current.x, current.y))
            .copied()
            .unwrap_or(f32::INFINITY);

        for &(dx, dy) in &DIRECTIONS {
            let nx = current.x as i32 + dx;
            let ny = current.y as i32 + dy;
            if nx < 0 || ny < 0 {
                continue;
            }
            let nx = nx as u32;
            let ny = ny as u32;
            if !grid.in_bounds(nx, ny) {
                continue;
            }
            let Some(cell_cost) = grid.traversal_cost(nx, ny) else {
                continue;
            };
            if !diagonal_clear(grid, current.x, current.y, dx, dy) {
                continue;
            }

            let step = if dx != 0 && dy != 0 { SQRT_2 } else { 1.0 };
            let tentative = current_g + step * cell_cost;
            let neighbor_g = g_score.get(&(nx, ny)).copied().unwrap_or(f32::INFINITY);

            if tentative < neighbor_g {
                came_from.insert((nx, ny), (current.x, current.y));
                g_score.insert((nx, ny), tentative);
                open.push(FrontierNode {
                    x: nx,
                    y: ny,
                    f_score: tentative + octile_heuristic(nx, ny, gx, gy),
                    tie_breaker: pack_coords(nx, ny),
                });
            }
        }
    }

    Err(NavError::NoRoute)
}

fn reconstruct(
    grid: &NavGrid,
    came_from: &HashMap<(u32, u32), (u32, u32)>,
    gx: u32,
    gy: u32,
) -> Vec<Vec3> {
    let mut path = vec![grid.grid_to_world(gx, gy)];
    let mut current = (gx, gy);
    while let Some(&prev) = came_from.get(&current) {
        path.push(grid.grid_to_world(prev.0, prev.1));
        current = prev;
    }
    path.reverse();
    path
}

/// Drop waypoints that a straight line can skip without crossing blocked
/// cells.
#[must_use]
pub fn smooth_path(grid: &NavGrid, path: Vec<Vec3>) -> Vec<Vec3> {
    if path.len() <= 2 {
        return path;
    }

    let mut smoothed = Vec::with_capacity(path.len());
    smoothed.push(path[0]);
    let mut current = 0;

    while current < path.len() - 1 {
        let mut furthest = current + 1;
        for candidate in (current + 2)..path.len() {
            if line_of_sight(grid, path[current], path[candidate]) {
                furthest = candidate;
            }
        }
        smoothed.push(path[furthest]);
        current = furthest;
    }

    smoothed
}

/// Bresenham walk over the cells between two world positions.
fn line_of_sight(grid: &NavGrid, from: Vec3, to: Vec3) -> bool {
    let Some((x0, y0)) = grid.world_to_grid(from) else {
        return false;
    };
    let Some((x1, y1)) = grid.world_to_grid(to) else {
        return false;
    };

    let dx = (x1 as i32 - x0 as i32).abs();
    let dy = (y1 as i32 - y0 as i32).abs();
    let sx = if x0 < x1 { 1i32 } else { -1i32 };
    let sy = if y0 < y1 { 1i32 } else { -1i32 };
    let mut err = dx - dy;
    let mut x = x0 as i32;
    let mut y = y0 as i32;

    loop {
        if !grid.is_walkable(x as u32, y as u32) {
            return false;
        }
        if x == x1 as i32 && y == y1 as i32 {
            break;
        }

        let e2 = 2 * err;
        if e2 > -dy && e2 < dx {
            // Diagonal step: both adjacent cardinals must be clear.
            if !grid.is_walkable((x + sx) as u32, y as u32)
                || !grid.is_walkable(x as u32, (y + sy) as u32)
            {
                return false;
            }
        }
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }

    true
}
