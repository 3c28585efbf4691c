//! Geometric predicates over placed components and the hard/soft evaluation built from them.
//!
//! Every predicate is closed on the boundary the way a board designer reads it: a component flush with an edge is on
//! that edge, rectangles sharing a side do not overlap, and a route grazing a keep-out corner crosses it. Coordinates
//! are fixed point, so these equalities are exact.
use itertools::Itertools;
use math_util::{bounding_box, centroid, segment_intersects_rect, Point, Rect, Segment, Unit};
use num_traits::Zero;
use serde::Serialize;

use crate::board::{Board, Edge};
use crate::catalog::{Catalog, ComponentId};
use crate::config::PlacementConfig;
use crate::error::Result;
use crate::placement::Placement;
use crate::pose::long_axis;

/// Penalty for each missing component. Large enough that completing a placement always pays.
const MISSING_COMPONENT_PENALTY: f64 = 1_000.0;

pub fn is_on_edge(rect: &Rect, board: &Board) -> bool {
    !board.edges_touched(rect).is_empty()
}

/// Both rectangles are flush with opposite edges and their long axes agree. Squares have no long axis and agree with
/// each other.
///
/// Only the two long axes are compared, not their relation to the edges. A pair standing perpendicular to the top and
/// bottom edges, both vertical, is accepted just like a pair lying along them.
pub fn is_opposite_parallel(a: &Rect, b: &Rect, board: &Board) -> bool {
    if long_axis(a) != long_axis(b) {
        return false;
    }
    let b_edges = board.edges_touched(b);
    board
        .edges_touched(a)
        .iter()
        .any(|edge| b_edges.contains(&edge.opposite()))
}

pub fn within_distance(a: &Rect, b: &Rect, limit: Unit) -> bool {
    a.center().distance_squared(&b.center()) <= limit.squared()
}

pub fn no_overlap(a: &Rect, b: &Rect) -> bool {
    !a.interiors_intersect(b)
}

pub fn in_bounds(rect: &Rect, board: &Board) -> bool {
    board.rect().contains_rect(rect)
}

/// The straight route between the two centers shares no point with the zone.
pub fn keepout_clear(a: &Rect, b: &Rect, zone: &Rect) -> bool {
    !segment_intersects_rect(&Segment::new(a.center(), b.center()), zone)
}

/// Outcome of every hard constraint family for one placement.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ConstraintChecks {
    pub complete: bool,
    pub in_bounds: bool,
    pub no_overlap: bool,
    pub on_edge: bool,
    pub opposite_parallel: bool,
    pub proximity: bool,
    pub balance: bool,
    pub keep_out: bool,
}

impl ConstraintChecks {
    pub fn all(&self) -> bool {
        self.complete
            && self.in_bounds
            && self.no_overlap
            && self.on_edge
            && self.opposite_parallel
            && self.proximity
            && self.balance
            && self.keep_out
    }
}

/// The soft cost and the terms it is made of, unweighted.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SoftCostBreakdown {
    pub bounding_box_area: f64,
    /// Bounding box area not covered by any component.
    pub wasted_space: f64,
    /// Mean squared distance of component centers from their centroid.
    pub compactness: f64,
    /// Distance of the free components' centroid from the board center plus that of the bounding box center.
    pub centrality: f64,
    /// Bounding box area plus ten times the free components' distance from the board center. Comparable across runs
    /// with different weights.
    pub checker_score: f64,
    pub total: f64,
}

/// Board, catalog and thresholds. Pure: evaluating a placement never changes the model.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintModel {
    board: Board,
    catalog: Catalog,
    config: PlacementConfig,
}

impl Default for ConstraintModel {
    fn default() -> Self {
        ConstraintModel {
            board: Board::default(),
            catalog: Catalog::default(),
            config: PlacementConfig::default(),
        }
    }
}

impl ConstraintModel {
    pub fn new(board: Board, catalog: Catalog, config: PlacementConfig) -> Result<Self> {
        let board = Board::new(board.width(), board.height())?;
        catalog.validate(&board)?;
        config.validate()?;
        Ok(ConstraintModel { board, catalog, config })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Center of mass of the placed components, each weighted equally.
    pub fn center_of_mass(&self, placement: &Placement) -> Option<Point> {
        let centers: Vec<Point> = placement
            .rects(&self.catalog)
            .iter()
            .map(|(_, rect)| rect.center())
            .collect();
        centroid(&centers)
    }

    pub fn balance_ok(&self, placement: &Placement) -> bool {
        match self.center_of_mass(placement) {
            Some(center) => center.distance_squared(&self.board.center()) <= self.config.balance_radius.squared(),
            None => false,
        }
    }

    /// Zones projected by each placed keep-out source.
    pub fn keep_out_zones(&self, placement: &Placement) -> Vec<(ComponentId, Rect)> {
        self.catalog
            .keep_out_sources()
            .into_iter()
            .filter_map(|id| {
                placement
                    .rect_of(&self.catalog, id)
                    .map(|rect| (id, self.config.keep_out.zone(&rect, &self.board)))
            })
            .collect()
    }

    /// Routes between proximity-linked pairs, each with the zones it has to avoid. A pair never avoids a zone it
    /// projects itself.
    fn routes(&self, placement: &Placement) -> Vec<(Rect, Rect, Vec<Rect>)> {
        let zones = self.keep_out_zones(placement);
        self.catalog
            .proximity_links()
            .into_iter()
            .filter_map(|(linked, anchor)| {
                let a = placement.rect_of(&self.catalog, linked)?;
                let b = placement.rect_of(&self.catalog, anchor)?;
                let avoid = zones
                    .iter()
                    .filter(|(source, _)| *source != linked && *source != anchor)
                    .map(|(_, zone)| *zone)
                    .collect();
                Some((a, b, avoid))
            })
            .collect()
    }

    pub fn checks(&self, placement: &Placement) -> ConstraintChecks {
        let catalog = &self.catalog;
        let rects = placement.rects(catalog);
        let rect_of = |id: ComponentId| placement.rect_of(catalog, id);

        let on_edge = catalog
            .components()
            .iter()
            .filter(|component| component.is_edge_required())
            .all(|component| rect_of(component.id).map_or(false, |rect| is_on_edge(&rect, &self.board)));
        let opposite_parallel = catalog.parallel_pairs().into_iter().all(|(a, b)| {
            match (rect_of(a), rect_of(b)) {
                (Some(a), Some(b)) => is_opposite_parallel(&a, &b, &self.board),
                _ => false,
            }
        });
        let proximity = catalog.proximity_links().into_iter().all(|(linked, anchor)| {
            match (rect_of(linked), rect_of(anchor)) {
                (Some(a), Some(b)) => within_distance(&a, &b, self.config.proximity_limit),
                _ => false,
            }
        });
        let keep_out = self
            .routes(placement)
            .iter()
            .all(|(a, b, zones)| zones.iter().all(|zone| keepout_clear(a, b, zone)));

        ConstraintChecks {
            complete: placement.is_complete(catalog),
            in_bounds: rects.iter().all(|(_, rect)| in_bounds(rect, &self.board)),
            no_overlap: rects
                .iter()
                .tuple_combinations()
                .all(|((_, a), (_, b))| no_overlap(a, b)),
            on_edge,
            opposite_parallel,
            proximity,
            balance: self.balance_ok(placement),
            keep_out,
        }
    }

    pub fn hard_feasible(&self, placement: &Placement) -> bool {
        self.checks(placement).all()
    }

    /// How badly a placement breaks the hard constraints. Each broken constraint adds one plus a measure of how far
    /// it is from holding, so the result is zero exactly when `hard_feasible` holds and shrinks as a placement gets
    /// closer to feasible.
    pub fn hard_violation(&self, placement: &Placement) -> f64 {
        let catalog = &self.catalog;
        let board = &self.board;
        let rects = placement.rects(catalog);
        let rect_of = |id: ComponentId| placement.rect_of(catalog, id);
        let mut violation = 0.0;

        violation += placement.missing(catalog).len() as f64 * MISSING_COMPONENT_PENALTY;

        for (_, rect) in &rects {
            if !in_bounds(rect, board) {
                let overshoot: Unit = Edge::ALL
                    .iter()
                    .map(|edge| (-board.gap_to_edge(rect, *edge)).max(Unit::zero()))
                    .sum();
                violation += 1.0 + overshoot.to_f64();
            }
        }

        for ((_, a), (_, b)) in rects.iter().tuple_combinations() {
            if !no_overlap(a, b) {
                violation += 1.0 + a.overlap_area(b).to_f64();
            }
        }

        for component in catalog.components().iter().filter(|c| c.is_edge_required()) {
            if let Some(rect) = rect_of(component.id) {
                if !is_on_edge(&rect, board) {
                    let nearest = Edge::ALL
                        .iter()
                        .map(|edge| board.gap_to_edge(&rect, *edge).abs())
                        .min()
                        .unwrap_or_else(Unit::zero);
                    violation += 1.0 + nearest.to_f64();
                }
            }
        }

        for (a, b) in catalog.parallel_pairs() {
            if let (Some(a), Some(b)) = (rect_of(a), rect_of(b)) {
                if !is_opposite_parallel(&a, &b, board) {
                    let distance_to_opposite = Edge::ALL
                        .iter()
                        .map(|edge| board.gap_to_edge(&a, *edge).abs() + board.gap_to_edge(&b, edge.opposite()).abs())
                        .min()
                        .unwrap_or_else(Unit::zero);
                    let misaligned = if long_axis(&a) == long_axis(&b) { 0.0 } else { 1.0 };
                    violation += 1.0 + distance_to_opposite.to_f64() + misaligned;
                }
            }
        }

        for (linked, anchor) in catalog.proximity_links() {
            if let (Some(a), Some(b)) = (rect_of(linked), rect_of(anchor)) {
                if !within_distance(&a, &b, self.config.proximity_limit) {
                    let excess = a.center().distance(&b.center()) - self.config.proximity_limit.to_f64();
                    violation += 1.0 + excess.max(0.0);
                }
            }
        }

        if !rects.is_empty() && !self.balance_ok(placement) {
            let excess = self
                .center_of_mass(placement)
                .map_or(0.0, |center| center.distance(&board.center()) - self.config.balance_radius.to_f64());
            violation += 1.0 + excess.max(0.0);
        }

        for (a, b, zones) in self.routes(placement) {
            for zone in zones {
                if !keepout_clear(&a, &b, &zone) {
                    violation += 1.0;
                }
            }
        }

        violation
    }

    pub fn soft_cost(&self, placement: &Placement) -> f64 {
        self.soft_cost_breakdown(placement).total
    }

    /// Lower is tighter and more central. Meaningful for any placement, but only compared between feasible ones.
    pub fn soft_cost_breakdown(&self, placement: &Placement) -> SoftCostBreakdown {
        let rects: Vec<Rect> = placement
            .rects(&self.catalog)
            .into_iter()
            .map(|(_, rect)| rect)
            .collect();
        let bbox = match bounding_box(&rects) {
            Some(bbox) => bbox,
            None => return SoftCostBreakdown::default(),
        };
        let board_center = self.board.center();

        let bounding_box_area = bbox.area().to_f64();
        let occupied: f64 = rects.iter().map(|rect| rect.area().to_f64()).sum();
        let wasted_space = (bounding_box_area - occupied).max(0.0);

        let centers: Vec<Point> = rects.iter().map(|rect| rect.center()).collect();
        let compactness = match centroid(&centers) {
            Some(mean) => {
                centers
                    .iter()
                    .map(|center| center.distance_squared(&mean).to_f64())
                    .sum::<f64>()
                    / centers.len() as f64
            }
            None => 0.0,
        };

        let free_centers: Vec<Point> = self
            .catalog
            .components()
            .iter()
            .filter(|component| component.is_free())
            .filter_map(|component| placement.rect_of(&self.catalog, component.id))
            .map(|rect| rect.center())
            .collect();
        let free_offset = centroid(&free_centers).map_or(0.0, |center| center.distance(&board_center));
        let centrality = free_offset + bbox.center().distance(&board_center);

        let weights = &self.config.cost_weights;
        SoftCostBreakdown {
            bounding_box_area,
            wasted_space,
            compactness,
            centrality,
            checker_score: bounding_box_area + 10.0 * free_offset,
            total: weights.wasted_space * wasted_space
                + weights.compactness * compactness
                + weights.centrality * centrality,
        }
    }
}

#[cfg(test)]
pub(crate) mod constraints_tests {
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::config::KeepOutShape;
    use crate::pose::{Pose, Rotation};

    fn rect(x: i32, y: i32, w: i32, h: i32) -> Rect {
        Rect::from_origin_size(x.into(), y.into(), w.into(), h.into())
    }

    /// Poses from the board walkthrough: everything local holds but the center of mass sits far from the middle.
    pub(crate) fn walkthrough_placement() -> Placement {
        Placement::new()
            .with(ComponentId::UsbConnector, Pose::new(0, 0, Rotation::R0))
            .with(ComponentId::MikroBus1, Pose::new(0, 10, Rotation::R0))
            .with(ComponentId::MikroBus2, Pose::new(45, 10, Rotation::R0))
            .with(ComponentId::Microcontroller, Pose::new(20, 20, Rotation::R0))
            .with(ComponentId::Crystal, Pose::new(22, 28, Rotation::R0))
    }

    /// A placement satisfying every hard constraint.
    pub(crate) fn feasible_placement() -> Placement {
        Placement::new()
            .with(ComponentId::UsbConnector, Pose::new(20, 45, Rotation::R0))
            .with(ComponentId::MikroBus1, Pose::new(0, 15, Rotation::R0))
            .with(ComponentId::MikroBus2, Pose::new(45, 15, Rotation::R0))
            .with(ComponentId::Microcontroller, Pose::new(22, 22, Rotation::R0))
            .with(ComponentId::Crystal, Pose::new(25, 14, Rotation::R0))
    }

    #[test]
    fn flush_counts_as_on_edge_and_near_miss_does_not() {
        let board = Board::default();
        assert!(is_on_edge(&rect(0, 20, 5, 5), &board));
        assert!(is_on_edge(&rect(45, 20, 5, 5), &board));
        let gap = Unit::from_f64(0.0001).unwrap();
        let near = Rect::from_origin_size(gap, 20.into(), 5.into(), 5.into());
        assert!(!is_on_edge(&near, &board));
    }

    #[test]
    fn opposite_parallel_needs_opposite_edges_and_matching_axes() {
        let board = Board::default();
        let left = rect(0, 10, 5, 15);
        assert!(is_opposite_parallel(&left, &rect(45, 10, 5, 15), &board));
        assert!(is_opposite_parallel(&left, &rect(45, 30, 5, 15), &board));
        assert!(!is_opposite_parallel(&left, &rect(0, 30, 5, 15), &board));
        assert!(!is_opposite_parallel(&left, &rect(35, 0, 15, 5), &board));
        assert!(is_opposite_parallel(&rect(10, 0, 15, 5), &rect(30, 45, 15, 5), &board));
        // Corners touch two edges; one opposite pairing is enough.
        assert!(is_opposite_parallel(&rect(0, 0, 5, 15), &rect(45, 35, 5, 15), &board));
        // Standing on the bottom and top edges rather than lying along them.
        assert!(is_opposite_parallel(&rect(25, 0, 5, 15), &rect(20, 35, 5, 15), &board));
    }

    #[test]
    fn distance_limit_is_inclusive() {
        assert!(within_distance(&rect(0, 0, 5, 5), &rect(10, 0, 5, 5), 10.into()));
        assert!(!within_distance(&rect(0, 0, 5, 5), &rect(11, 0, 5, 5), 10.into()));
        assert!(within_distance(&rect(0, 0, 5, 5), &rect(6, 8, 5, 5), 10.into()));
    }

    #[test]
    fn shared_side_is_not_an_overlap() {
        assert!(no_overlap(&rect(0, 0, 5, 5), &rect(5, 0, 5, 5)));
        assert!(!no_overlap(&rect(0, 0, 5, 5), &rect(4, 0, 5, 5)));
    }

    #[test]
    fn bounds_are_closed() {
        let board = Board::default();
        assert!(in_bounds(&rect(45, 45, 5, 5), &board));
        assert!(!in_bounds(&rect(46, 45, 5, 5), &board));
        assert!(!in_bounds(&rect(-1, 0, 5, 5), &board));
    }

    #[test]
    fn route_touching_zone_is_blocked() {
        let zone = rect(20, 0, 5, 5);
        // Centers (22.5, 12.5) and (22.5, 22.5), well above the zone.
        assert!(keepout_clear(&rect(20, 10, 5, 5), &rect(20, 20, 5, 5), &zone));
        // Route from (17.5, 2.5) to (27.5, 2.5) straight through it.
        assert!(!keepout_clear(&rect(15, 0, 5, 5), &rect(25, 0, 5, 5), &zone));
        // Route along y = 5, the zone's top side.
        let low = Rect::from_origin_size(15.into(), Unit::from_f64(2.5).unwrap(), 5.into(), 5.into());
        let high = Rect::from_origin_size(25.into(), Unit::from_f64(2.5).unwrap(), 5.into(), 5.into());
        assert!(!keepout_clear(&low, &high, &zone));
    }

    #[test]
    fn walkthrough_predicates() {
        let model = ConstraintModel::default();
        let placement = walkthrough_placement();
        let checks = model.checks(&placement);
        assert!(checks.complete);
        assert!(checks.in_bounds);
        assert!(checks.no_overlap);
        assert!(checks.on_edge);
        assert!(checks.opposite_parallel);
        assert!(checks.proximity);
        assert!(checks.keep_out);

        let com = model.center_of_mass(&placement).unwrap();
        assert_abs_diff_eq!(com.x.to_f64(), 19.9, epsilon = 1e-6);
        assert_abs_diff_eq!(com.y.to_f64(), 18.1, epsilon = 1e-6);
        assert!(!model.balance_ok(&placement));
        assert!(!model.hard_feasible(&placement));
        assert!(model.hard_violation(&placement) > 0.0);
    }

    #[test]
    fn pair_on_the_same_edge_is_rejected() {
        let model = ConstraintModel::default();
        let placement = walkthrough_placement().with(ComponentId::MikroBus2, Pose::new(0, 30, Rotation::R0));
        let board = model.board();
        let mb1 = placement.rect_of(model.catalog(), ComponentId::MikroBus1).unwrap();
        let mb2 = placement.rect_of(model.catalog(), ComponentId::MikroBus2).unwrap();
        assert!(!is_opposite_parallel(&mb1, &mb2, board));
        assert!(!model.checks(&placement).opposite_parallel);
        assert!(!model.hard_feasible(&placement));
    }

    #[test]
    fn feasible_placement_passes_everything() {
        let model = ConstraintModel::default();
        let placement = feasible_placement();
        assert_eq!(model.checks(&placement), ConstraintChecks {
            complete: true,
            in_bounds: true,
            no_overlap: true,
            on_edge: true,
            opposite_parallel: true,
            proximity: true,
            balance: true,
            keep_out: true,
        });
        assert_eq!(model.hard_violation(&placement), 0.0);
    }

    #[test]
    fn feasible_placement_clears_edge_projected_zone() {
        let mut config = PlacementConfig::default();
        config.keep_out = KeepOutShape::EdgeProjected {
            across: 10.into(),
            inward: 20.into(),
        };
        let model = ConstraintModel::new(Board::default(), Catalog::default(), config).unwrap();
        assert!(model.hard_feasible(&feasible_placement()));

        // Crystal pulled up under the USB connector; its route now enters the projected zone.
        let blocked = feasible_placement()
            .with(ComponentId::Microcontroller, Pose::new(22, 32, Rotation::R0))
            .with(ComponentId::Crystal, Pose::new(25, 25, Rotation::R0));
        assert!(!model.checks(&blocked).keep_out);
    }

    #[test]
    fn incomplete_placement_is_infeasible() {
        let model = ConstraintModel::default();
        let mut placement = Placement::new();
        for (id, pose) in feasible_placement().iter().take(4) {
            placement.set(id, *pose);
        }
        assert!(!model.checks(&placement).complete);
        assert!(!model.hard_feasible(&placement));
        assert!(model.hard_violation(&placement) >= MISSING_COMPONENT_PENALTY);
    }

    #[test]
    fn soft_cost_terms() {
        let model = ConstraintModel::default();
        let breakdown = model.soft_cost_breakdown(&feasible_placement());
        // Bounding box (0, 14) to (50, 50).
        assert_abs_diff_eq!(breakdown.bounding_box_area, 50.0 * 36.0, epsilon = 1e-9);
        assert_abs_diff_eq!(breakdown.wasted_space, 1800.0 - 75.0 - 75.0 - 25.0 * 3.0, epsilon = 1e-9);
        // Microcontroller center (24.5, 24.5).
        let mcu_offset = 0.5f64.sqrt();
        assert_abs_diff_eq!(breakdown.checker_score, 1800.0 + 10.0 * mcu_offset, epsilon = 1e-6);
        assert!(breakdown.compactness > 0.0);
        assert_abs_diff_eq!(
            breakdown.total,
            breakdown.wasted_space + breakdown.compactness + 10.0 * breakdown.centrality,
            epsilon = 1e-6
        );
        assert_eq!(model.soft_cost(&feasible_placement()), breakdown.total);
    }

    #[test]
    fn tighter_layout_costs_less() {
        let model = ConstraintModel::default();
        let spread = feasible_placement();
        let tight = feasible_placement()
            .with(ComponentId::UsbConnector, Pose::new(0, 30, Rotation::R0))
            .with(ComponentId::Crystal, Pose::new(27, 16, Rotation::R0));
        assert!(model.soft_cost(&tight) < model.soft_cost(&spread));
    }

    #[test]
    fn invalid_model_inputs_are_rejected() {
        let mut config = PlacementConfig::default();
        config.grid_step = Unit::zero();
        assert!(ConstraintModel::new(Board::default(), Catalog::default(), config).is_err());
        let tiny = Board::new(10.into(), 10.into()).unwrap();
        assert!(ConstraintModel::new(tiny, Catalog::default(), PlacementConfig::default()).is_err());
    }

    fn arbitrary_placement() -> impl Strategy<Value = Placement> {
        proptest::collection::vec((0i32..=50, 0i32..=50, prop::bool::ANY), 5).prop_map(|poses| {
            ComponentId::ALL
                .iter()
                .zip(poses)
                .fold(Placement::new(), |placement, (id, (x, y, rotated))| {
                    let rotation = if rotated { Rotation::R90 } else { Rotation::R0 };
                    placement.with(*id, Pose::new(x, y, rotation))
                })
        })
    }

    proptest! {
        #[test]
        fn violation_is_zero_exactly_when_feasible(placement in arbitrary_placement()) {
            let model = ConstraintModel::default();
            let violation = model.hard_violation(&placement);
            prop_assert!(violation >= 0.0);
            prop_assert_eq!(violation == 0.0, model.hard_feasible(&placement));
        }

        #[test]
        fn evaluation_is_pure(placement in arbitrary_placement()) {
            let model = ConstraintModel::default();
            prop_assert_eq!(model.hard_violation(&placement), model.hard_violation(&placement));
            prop_assert_eq!(model.soft_cost(&placement), model.soft_cost(&placement));
        }

        #[test]
        fn no_overlap_is_symmetric(x1 in 0i32..45, y1 in 0i32..45, w1 in 1i32..15, h1 in 1i32..15,
                                   x2 in 0i32..45, y2 in 0i32..45, w2 in 1i32..15, h2 in 1i32..15) {
            let a = rect(x1, y1, w1, h1);
            let b = rect(x2, y2, w2, h2);
            prop_assert_eq!(no_overlap(&a, &b), no_overlap(&b, &a));
            prop_assert!(!no_overlap(&a, &a));
        }
    }
}
