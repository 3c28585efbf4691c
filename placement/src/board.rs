use std::fmt::{Display, Formatter};

use math_util::{Point, Rect, Unit};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::error::{PlacementError, Result};

/// Largest magnitude accepted for a board dimension or a loaded coordinate. Squared distances between points in
/// this range stay inside the fixed-point range of `Unit`.
pub const COORDINATE_LIMIT: i32 = 10_000;

/// Whether `value` lies within `COORDINATE_LIMIT` of the origin.
pub fn in_coordinate_domain(value: Unit) -> bool {
    value.abs() <= Unit::from(COORDINATE_LIMIT)
}

/// The board is an axis-aligned rectangle with its lower-left corner at the origin.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Board {
    width: Unit,
    height: Unit,
}

impl Default for Board {
    fn default() -> Self {
        Board {
            width: Unit::from(50),
            height: Unit::from(50),
        }
    }
}

impl Board {
    pub fn new(width: Unit, height: Unit) -> Result<Self> {
        if !width.is_positive() || !height.is_positive() {
            return Err(PlacementError::invalid(format!(
                "board dimensions must be positive, got {} x {}",
                width, height
            )));
        }
        if !in_coordinate_domain(width) || !in_coordinate_domain(height) {
            return Err(PlacementError::invalid(format!(
                "board dimensions must not exceed {}, got {} x {}",
                COORDINATE_LIMIT, width, height
            )));
        }
        Ok(Board { width, height })
    }

    pub fn width(&self) -> Unit {
        self.width
    }

    pub fn height(&self) -> Unit {
        self.height
    }

    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(Unit::zero(), Unit::zero(), self.width, self.height)
    }

    pub fn center(&self) -> Point {
        self.rect().center()
    }

    /// Length of the board along the edge.
    pub fn edge_length(&self, edge: Edge) -> Unit {
        match edge.axis() {
            Axis::Vertical => self.height,
            Axis::Horizontal => self.width,
        }
    }

    /// Edges the rectangle is exactly flush with. Two at a corner, none in the interior.
    pub fn edges_touched(&self, rect: &Rect) -> Vec<Edge> {
        Edge::ALL
            .iter()
            .copied()
            .filter(|edge| self.gap_to_edge(rect, *edge) == Unit::zero())
            .collect()
    }

    /// Distance from the rectangle's nearest side to the edge line. Zero when flush, negative when the rectangle
    /// pokes past the edge.
    pub fn gap_to_edge(&self, rect: &Rect, edge: Edge) -> Unit {
        match edge {
            Edge::Left => rect.min_corner().x,
            Edge::Bottom => rect.min_corner().y,
            Edge::Right => self.width - rect.max_corner().x,
            Edge::Top => self.height - rect.max_corner().y,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Edge lines parallel to the y axis.
    Vertical,
    Horizontal,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top];

    pub fn opposite(&self) -> Edge {
        match self {
            Edge::Left => Edge::Right,
            Edge::Right => Edge::Left,
            Edge::Bottom => Edge::Top,
            Edge::Top => Edge::Bottom,
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            Edge::Left | Edge::Right => Axis::Vertical,
            Edge::Bottom | Edge::Top => Axis::Horizontal,
        }
    }
}

impl Display for Edge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Edge::Left => "left",
            Edge::Right => "right",
            Edge::Bottom => "bottom",
            Edge::Top => "top",
        };
        write!(f, "{}", name)
    }
}
