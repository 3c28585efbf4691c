//! Iterated local search over placements. Candidates are scored (hard violation, soft cost) so that any feasible
//! placement outranks any infeasible one, and the search keeps descending on cost once it is feasible.
use std::f64::consts::TAU;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use local_search::iterated_local_search::{AcceptanceCriterion, IteratedLocalSearch, Perturbation, Termination};
use local_search::local_search::{
    History, InitialSolutionGenerator, LocalSearch, MoveProposer, Score, ScoredSolution, Solution,
    SolutionScoreCalculator,
};
use local_search::seed::rng_from_str;
use math_util::{Point, Unit};
use num_traits::Zero;
use ordered_float::OrderedFloat;
use rand::prelude::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::StandardNormal;
use tracing::{debug, info};

use crate::board::{Axis, Board, Edge};
use crate::catalog::Component;
use crate::config::SearchConfig;
use crate::constraints::{ConstraintModel, SoftCostBreakdown};
use crate::error::{PlacementError, Result};
use crate::placement::Placement;
use crate::pose::{Pose, Rotation};

pub type PlacementIls = IteratedLocalSearch<
    ChaCha20Rng,
    PlacementSolution,
    PlacementScore,
    PlacementSolutionScoreCalculator,
    PlacementMoveProposer,
    PlacementInitialSolutionGenerator,
    PlacementPerturbation,
>;

/// Attempts at finding an overlap-free spot for each free component of the initial solution.
const INITIAL_PLACEMENT_ATTEMPTS: usize = 16;
/// Largest grid shift of a single move, in grid steps.
const MAX_SHIFT_STEPS: i32 = 3;
/// Standard deviation of the perturbation jitter, in board units.
const JITTER_STD_DEV: f64 = 4.0;

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlacementSolution {
    pub placement: Placement,
}

impl PlacementSolution {
    pub fn new(placement: Placement) -> Self {
        Self { placement }
    }
}

impl Debug for PlacementSolution {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.placement)
    }
}

impl Solution for PlacementSolution {}

/// Hard score first: zero exactly when the placement is feasible. Soft score only separates candidates with equal
/// hard scores.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlacementScore {
    pub hard_score: OrderedFloat<f64>,
    pub soft_score: OrderedFloat<f64>,
}

impl PlacementScore {
    pub fn is_feasible(&self) -> bool {
        self.hard_score.0 == 0.0
    }
}

impl Score for PlacementScore {
    fn is_best(&self) -> bool {
        // The lowest achievable cost is unknown.
        false
    }
}

pub struct PlacementSolutionScoreCalculator {
    model: Rc<ConstraintModel>,
}

impl PlacementSolutionScoreCalculator {
    pub fn new(model: Rc<ConstraintModel>) -> Self {
        Self { model }
    }
}

impl SolutionScoreCalculator for PlacementSolutionScoreCalculator {
    type _Solution = PlacementSolution;
    type _Score = PlacementScore;

    fn get_scored_solution(&self, solution: Self::_Solution) -> ScoredSolution<Self::_Solution, Self::_Score> {
        let hard_score = self.model.hard_violation(&solution.placement);
        let soft_score = self.model.soft_cost(&solution.placement);
        ScoredSolution::new(
            solution,
            PlacementScore {
                hard_score: OrderedFloat(hard_score),
                soft_score: OrderedFloat(soft_score),
            },
        )
    }
}

fn to_unit(value: f64) -> Unit {
    Unit::from_f64(value).unwrap_or_else(Unit::zero)
}

fn fits(component: &Component, rotation: Rotation, board: &Board) -> bool {
    let (width, height) = component.footprint.oriented(rotation);
    width <= board.width() && height <= board.height()
}

fn random_rotation<R: Rng>(component: &Component, rng: &mut R) -> Rotation {
    component.rotations().choose(rng).copied().unwrap_or_default()
}

/// A rotation both parallel pair members may take, so they start out aligned.
fn pair_rotation<R: Rng>(first: &Component, second: &Component, rng: &mut R) -> Rotation {
    let shared: Vec<Rotation> = first
        .rotations()
        .iter()
        .copied()
        .filter(|rotation| second.allows_rotation(*rotation))
        .collect();
    shared.choose(rng).copied().unwrap_or_default()
}

fn random_edge<R: Rng>(rng: &mut R) -> Edge {
    Edge::ALL.choose(rng).copied().unwrap_or(Edge::Left)
}

/// Pose whose rectangle is centered on `center`.
fn pose_centered_at(component: &Component, center: Point, rotation: Rotation) -> Pose {
    let (width, height) = component.footprint.oriented(rotation);
    Pose {
        x: center.x - width.half(),
        y: center.y - height.half(),
        rotation,
    }
}

/// Move the pose perpendicular to `edge` until it is flush with it.
fn flush(board: &Board, component: &Component, pose: Pose, edge: Edge) -> Pose {
    let (width, height) = component.footprint.oriented(pose.rotation);
    match edge {
        Edge::Left => Pose { x: Unit::zero(), ..pose },
        Edge::Right => Pose {
            x: board.width() - width,
            ..pose
        },
        Edge::Bottom => Pose { y: Unit::zero(), ..pose },
        Edge::Top => Pose {
            y: board.height() - height,
            ..pose
        },
    }
}

/// Snap to the grid and clamp into the board. The result is flush with `edge` when one is given, and an
/// edge-required component without one is pushed against its nearest edge.
fn settle(model: &ConstraintModel, component: &Component, pose: Pose, edge: Option<Edge>) -> Pose {
    let board = model.board();
    let rotation = [pose.rotation, pose.rotation.toggled()]
        .into_iter()
        .find(|rotation| component.allows_rotation(*rotation) && fits(component, *rotation, board))
        .unwrap_or(Rotation::R0);
    let (width, height) = component.footprint.oriented(rotation);
    let step = model.config().grid_step;
    let max_x = (board.width() - width).max(Unit::zero());
    let max_y = (board.height() - height).max(Unit::zero());
    let settled = Pose {
        x: pose.x.snap_to(step).clamp(Unit::zero(), max_x),
        y: pose.y.snap_to(step).clamp(Unit::zero(), max_y),
        rotation,
    };
    let edge = edge.or_else(|| {
        if !component.is_edge_required() {
            return None;
        }
        let rect = settled.rect(&component.footprint);
        Edge::ALL
            .iter()
            .copied()
            .min_by_key(|edge| board.gap_to_edge(&rect, *edge))
    });
    match edge {
        Some(edge) => flush(board, component, settled, edge),
        None => settled,
    }
}

/// First edge the component is flush with, if any.
fn current_edge(model: &ConstraintModel, component: &Component, pose: &Pose) -> Option<Edge> {
    model
        .board()
        .edges_touched(&pose.rect(&component.footprint))
        .first()
        .copied()
}

/// Position of the pose along the edge: y for vertical edges, x for horizontal ones.
fn offset_along(pose: &Pose, edge: Edge) -> Unit {
    match edge.axis() {
        Axis::Vertical => pose.y,
        Axis::Horizontal => pose.x,
    }
}

fn pose_on_edge(
    model: &ConstraintModel,
    component: &Component,
    edge: Edge,
    rotation: Rotation,
    offset: Unit,
) -> Pose {
    let pose = match edge.axis() {
        Axis::Vertical => Pose {
            x: Unit::zero(),
            y: offset,
            rotation,
        },
        Axis::Horizontal => Pose {
            x: offset,
            y: Unit::zero(),
            rotation,
        },
    };
    settle(model, component, pose, Some(edge))
}

/// Random point within the proximity limit of `center`, far enough out that two equal squares rarely collide.
fn point_near<R: Rng>(center: Point, limit: Unit, rng: &mut R) -> Point {
    let angle = rng.gen_range(0.0..TAU);
    let radius = limit.to_f64() * rng.gen_range(0.6..0.9);
    Point {
        x: center.x + to_unit(radius * angle.cos()),
        y: center.y + to_unit(radius * angle.sin()),
    }
}

/// Average center the unplaced components need for the center of mass to land on the board center, jittered.
fn balancing_point<R: Rng>(model: &ConstraintModel, placement: &Placement, rng: &mut R) -> Point {
    let catalog = model.catalog();
    let placed: Vec<Point> = placement
        .rects(catalog)
        .iter()
        .map(|(_, rect)| rect.center())
        .collect();
    let total = catalog.len() as f64;
    let remaining = (catalog.len() - placed.len()).max(1) as f64;
    let center = model.board().center();
    let sum_x: f64 = placed.iter().map(|p| p.x.to_f64()).sum();
    let sum_y: f64 = placed.iter().map(|p| p.y.to_f64()).sum();
    Point {
        x: to_unit((total * center.x.to_f64() - sum_x) / remaining + rng.gen_range(-2.0..2.0)),
        y: to_unit((total * center.y.to_f64() - sum_y) / remaining + rng.gen_range(-2.0..2.0)),
    }
}

fn overlaps_any(model: &ConstraintModel, placement: &Placement, component: &Component, pose: &Pose) -> bool {
    let rect = pose.rect(&component.footprint);
    placement
        .rects(model.catalog())
        .iter()
        .any(|(id, other)| *id != component.id && rect.interiors_intersect(other))
}

/// Builds a likely-feasible start: the parallel pair mirrored on opposite edges, other edge components on random
/// edges, and the remaining components around the point that balances the center of mass, linked components next
/// to their anchors.
pub struct PlacementInitialSolutionGenerator {
    model: Rc<ConstraintModel>,
}

impl PlacementInitialSolutionGenerator {
    pub fn new(model: Rc<ConstraintModel>) -> Self {
        Self { model }
    }
}

impl InitialSolutionGenerator for PlacementInitialSolutionGenerator {
    type R = ChaCha20Rng;
    type Solution = PlacementSolution;

    fn generate_initial_solution(&self, rng: &mut Self::R) -> Self::Solution {
        let model = &*self.model;
        let catalog = model.catalog();
        let board = model.board();
        let mut placement = Placement::new();

        for (first, second) in catalog.parallel_pairs() {
            let (first, second) = match (catalog.get(first), catalog.get(second)) {
                (Some(first), Some(second)) => (first, second),
                _ => continue,
            };
            let edge = random_edge(rng);
            let rotation = pair_rotation(first, second, rng);
            let (width, height) = first.footprint.oriented(rotation);
            let extent = match edge.axis() {
                Axis::Vertical => height,
                Axis::Horizontal => width,
            };
            let length = board.edge_length(edge).to_f64();
            let jitter = rng.gen_range(-length / 4.0..length / 4.0);
            let offset = to_unit((length - extent.to_f64()) / 2.0 + jitter);
            placement.set(first.id, pose_on_edge(model, first, edge, rotation, offset));
            placement.set(second.id, pose_on_edge(model, second, edge.opposite(), rotation, offset));
        }

        for component in catalog.components() {
            if !component.is_edge_required() || placement.get(component.id).is_some() {
                continue;
            }
            let edge = random_edge(rng);
            let rotation = random_rotation(component, rng);
            let offset = to_unit(rng.gen_range(0.0..=board.edge_length(edge).to_f64()));
            let mut pose = pose_on_edge(model, component, edge, rotation, offset);
            for _ in 0..INITIAL_PLACEMENT_ATTEMPTS {
                if !overlaps_any(model, &placement, component, &pose) {
                    break;
                }
                let offset = to_unit(rng.gen_range(0.0..=board.edge_length(edge).to_f64()));
                pose = pose_on_edge(model, component, edge, rotation, offset);
            }
            placement.set(component.id, pose);
        }

        // Anchors before the components linked to them.
        let mut remaining: Vec<&Component> = catalog
            .components()
            .iter()
            .filter(|component| placement.get(component.id).is_none())
            .collect();
        remaining.sort_by_key(|component| component.proximity_anchor().is_some());
        for component in remaining {
            let anchor_center = component
                .proximity_anchor()
                .and_then(|anchor| placement.rect_of(catalog, anchor))
                .map(|rect| rect.center());
            let mut pose = Pose::default();
            for _ in 0..INITIAL_PLACEMENT_ATTEMPTS {
                let target = match anchor_center {
                    Some(center) => point_near(center, model.config().proximity_limit, rng),
                    None => balancing_point(model, &placement, rng),
                };
                let rotation = random_rotation(component, rng);
                pose = settle(model, component, pose_centered_at(component, target, rotation), None);
                if !overlaps_any(model, &placement, component, &pose) {
                    break;
                }
            }
            placement.set(component.id, pose);
        }

        debug!(?placement, "generated initial placement");
        PlacementSolution::new(placement)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PlacementMove {
    /// Shift one component a few grid steps. Edge components only slide along their edge.
    Shift,
    /// Slide both members of a parallel pair along their edges together.
    SlidePair,
    /// Move an edge component to another edge, taking its parallel partner to the opposite one.
    JumpEdge,
    /// Quarter turn in place, pairs turning together.
    Rotate,
    /// Put a proximity-linked component somewhere else around its anchor.
    Orbit,
    /// Exchange the centers of two components.
    SwapPositions,
    /// Send both members of a parallel pair to the edges opposite their current ones.
    MirrorPair,
}

fn random_shift<R: Rng>(step: Unit, rng: &mut R) -> Unit {
    let steps = rng.gen_range(1..=MAX_SHIFT_STEPS);
    let steps = if rng.gen_bool(0.5) { -steps } else { steps };
    step * Unit::from(steps)
}

fn shift(model: &ConstraintModel, placement: &mut Placement, rng: &mut ChaCha20Rng) {
    let component = match model.catalog().components().choose(rng) {
        Some(component) => component,
        None => return,
    };
    let pose = match placement.get(component.id) {
        Some(pose) => *pose,
        None => return,
    };
    let step = model.config().grid_step;
    let edge = if component.is_edge_required() {
        current_edge(model, component, &pose)
    } else {
        None
    };
    let moved = match edge.map(|edge| edge.axis()) {
        Some(Axis::Vertical) => Pose {
            y: pose.y + random_shift(step, rng),
            ..pose
        },
        Some(Axis::Horizontal) => Pose {
            x: pose.x + random_shift(step, rng),
            ..pose
        },
        None => {
            let (dx, dy) = match rng.gen_range(0..3) {
                0 => (random_shift(step, rng), Unit::zero()),
                1 => (Unit::zero(), random_shift(step, rng)),
                _ => (random_shift(step, rng), random_shift(step, rng)),
            };
            Pose {
                x: pose.x + dx,
                y: pose.y + dy,
                ..pose
            }
        }
    };
    placement.set(component.id, settle(model, component, moved, edge));
}

fn random_pair<'a>(model: &'a ConstraintModel, rng: &mut ChaCha20Rng) -> Option<(&'a Component, &'a Component)> {
    let catalog = model.catalog();
    let (first, second) = *catalog.parallel_pairs().choose(rng)?;
    Some((catalog.get(first)?, catalog.get(second)?))
}

fn slide_pair(model: &ConstraintModel, placement: &mut Placement, rng: &mut ChaCha20Rng) {
    let (first, second) = match random_pair(model, rng) {
        Some(pair) => pair,
        None => return shift(model, placement, rng),
    };
    let delta = random_shift(model.config().grid_step, rng);
    for component in [first, second] {
        if let Some(pose) = placement.get(component.id).copied() {
            let edge = current_edge(model, component, &pose);
            let moved = match edge.map(|edge| edge.axis()) {
                Some(Axis::Horizontal) => Pose {
                    x: pose.x + delta,
                    ..pose
                },
                _ => Pose {
                    y: pose.y + delta,
                    ..pose
                },
            };
            placement.set(component.id, settle(model, component, moved, edge));
        }
    }
}

fn jump_edge(model: &ConstraintModel, placement: &mut Placement, rng: &mut ChaCha20Rng) {
    let catalog = model.catalog();
    let edge_components: Vec<&Component> = catalog
        .components()
        .iter()
        .filter(|component| component.is_edge_required())
        .collect();
    let component = match edge_components.choose(rng) {
        Some(component) => *component,
        None => return shift(model, placement, rng),
    };
    let partner = component.parallel_partner().and_then(|partner| catalog.get(partner));
    let edge = random_edge(rng);
    let rotation = match partner {
        Some(partner) => pair_rotation(component, partner, rng),
        None => random_rotation(component, rng),
    };
    let offset = to_unit(rng.gen_range(0.0..=model.board().edge_length(edge).to_f64()));
    placement.set(component.id, pose_on_edge(model, component, edge, rotation, offset));
    if let Some(partner) = partner {
        placement.set(partner.id, pose_on_edge(model, partner, edge.opposite(), rotation, offset));
    }
}

fn rotate(model: &ConstraintModel, placement: &mut Placement, rng: &mut ChaCha20Rng) {
    let catalog = model.catalog();
    let rotatable: Vec<&Component> = catalog
        .components()
        .iter()
        .filter(|component| component.rotations().len() > 1)
        .collect();
    let component = match rotatable.choose(rng) {
        Some(component) => *component,
        None => return shift(model, placement, rng),
    };
    let partner = component.parallel_partner().and_then(|partner| catalog.get(partner));
    for component in std::iter::once(component).chain(partner) {
        if let Some(pose) = placement.get(component.id).copied() {
            let edge = current_edge(model, component, &pose);
            let center = pose.rect(&component.footprint).center();
            let turned = pose_centered_at(component, center, pose.rotation.toggled());
            placement.set(component.id, settle(model, component, turned, edge));
        }
    }
}

fn orbit(model: &ConstraintModel, placement: &mut Placement, rng: &mut ChaCha20Rng) {
    let catalog = model.catalog();
    let (linked, anchor) = match catalog.proximity_links().choose(rng) {
        Some(link) => *link,
        None => return shift(model, placement, rng),
    };
    let (component, anchor_rect) = match (catalog.get(linked), placement.rect_of(catalog, anchor)) {
        (Some(component), Some(anchor_rect)) => (component, anchor_rect),
        _ => return,
    };
    let rotation = placement.get(linked).map(|pose| pose.rotation).unwrap_or_default();
    let target = point_near(anchor_rect.center(), model.config().proximity_limit, rng);
    let pose = settle(model, component, pose_centered_at(component, target, rotation), None);
    placement.set(linked, pose);
}

fn swap_positions(model: &ConstraintModel, placement: &mut Placement, rng: &mut ChaCha20Rng) {
    let catalog = model.catalog();
    let chosen: Vec<&Component> = catalog.components().choose_multiple(rng, 2).collect();
    let (first, second) = match chosen.as_slice() {
        [first, second] => (*first, *second),
        _ => return,
    };
    let (first_pose, second_pose) = match (placement.get(first.id).copied(), placement.get(second.id).copied()) {
        (Some(first_pose), Some(second_pose)) => (first_pose, second_pose),
        _ => return,
    };
    let first_center = first_pose.rect(&first.footprint).center();
    let second_center = second_pose.rect(&second.footprint).center();
    let first_moved = pose_centered_at(first, second_center, first_pose.rotation);
    let second_moved = pose_centered_at(second, first_center, second_pose.rotation);
    placement.set(first.id, settle(model, first, first_moved, None));
    placement.set(second.id, settle(model, second, second_moved, None));
}

fn mirror_pair(model: &ConstraintModel, placement: &mut Placement, rng: &mut ChaCha20Rng) {
    let (first, second) = match random_pair(model, rng) {
        Some(pair) => pair,
        None => return shift(model, placement, rng),
    };
    for component in [first, second] {
        if let Some(pose) = placement.get(component.id).copied() {
            if let Some(edge) = current_edge(model, component, &pose) {
                let offset = offset_along(&pose, edge);
                placement.set(
                    component.id,
                    pose_on_edge(model, component, edge.opposite(), pose.rotation, offset),
                );
            }
        }
    }
}

fn apply_move(
    model: &ConstraintModel,
    placement: &mut Placement,
    current_move: PlacementMove,
    rng: &mut ChaCha20Rng,
) {
    match current_move {
        PlacementMove::Shift => shift(model, placement, rng),
        PlacementMove::SlidePair => slide_pair(model, placement, rng),
        PlacementMove::JumpEdge => jump_edge(model, placement, rng),
        PlacementMove::Rotate => rotate(model, placement, rng),
        PlacementMove::Orbit => orbit(model, placement, rng),
        PlacementMove::SwapPositions => swap_positions(model, placement, rng),
        PlacementMove::MirrorPair => mirror_pair(model, placement, rng),
    }
}

/// Random neighborhood of weighted single moves, `moves_per_neighborhood` long.
pub struct PlacementMoveProposer {
    model: Rc<ConstraintModel>,
    random_move_types: Vec<(PlacementMove, u64)>,
    moves_per_neighborhood: usize,
}

impl PlacementMoveProposer {
    pub fn new(model: Rc<ConstraintModel>, moves_per_neighborhood: usize) -> Self {
        Self {
            model,
            random_move_types: vec![
                (PlacementMove::Shift, 8),
                (PlacementMove::SlidePair, 2),
                (PlacementMove::JumpEdge, 1),
                (PlacementMove::Rotate, 1),
                (PlacementMove::Orbit, 2),
                (PlacementMove::SwapPositions, 1),
                (PlacementMove::MirrorPair, 1),
            ],
            moves_per_neighborhood,
        }
    }
}

impl MoveProposer for PlacementMoveProposer {
    type R = ChaCha20Rng;
    type Solution = PlacementSolution;

    fn iter_local_moves(&self, start: &Self::Solution, rng: &mut Self::R) -> Box<dyn Iterator<Item = Self::Solution>> {
        struct MoveIterator {
            model: Rc<ConstraintModel>,
            solution: PlacementSolution,
            random_move_types: Vec<(PlacementMove, u64)>,
            remaining: usize,
            rng: ChaCha20Rng,
        }
        impl Iterator for MoveIterator {
            type Item = PlacementSolution;

            fn next(&mut self) -> Option<Self::Item> {
                while self.remaining > 0 {
                    self.remaining -= 1;
                    let current_move = self
                        .random_move_types
                        .choose_weighted(&mut self.rng, |s| s.1)
                        .map(|s| s.0)
                        .unwrap_or(PlacementMove::Shift);
                    let mut placement = self.solution.placement.clone();
                    apply_move(&self.model, &mut placement, current_move, &mut self.rng);
                    if placement != self.solution.placement {
                        return Some(PlacementSolution::new(placement));
                    }
                }
                None
            }
        }

        Box::new(MoveIterator {
            model: Rc::clone(&self.model),
            solution: start.clone(),
            random_move_types: self.random_move_types.clone(),
            remaining: self.moves_per_neighborhood,
            rng: ChaCha20Rng::seed_from_u64(rng.gen()),
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PlacementPerturbationStrategy {
    DoNothing,
    /// Normally distributed jitter on a random subset of components.
    JitterSubset,
    /// Move an edge component, and its partner, to other edges.
    RelocateEdgeComponent,
}

pub struct PlacementPerturbation {
    model: Rc<ConstraintModel>,
    strategy: Vec<(PlacementPerturbationStrategy, u64)>,
}

impl PlacementPerturbation {
    pub fn new(model: Rc<ConstraintModel>) -> Self {
        Self {
            model,
            strategy: vec![
                (PlacementPerturbationStrategy::DoNothing, 10),
                (PlacementPerturbationStrategy::JitterSubset, 100),
                (PlacementPerturbationStrategy::RelocateEdgeComponent, 20),
            ],
        }
    }
}

impl Perturbation for PlacementPerturbation {
    type _R = ChaCha20Rng;
    type _Solution = PlacementSolution;
    type _Score = PlacementScore;

    fn propose_new_starting_solution(
        &mut self,
        current: &ScoredSolution<Self::_Solution, Self::_Score>,
        history: &History<Self::_R, Self::_Solution, Self::_Score>,
        rng: &mut Self::_R,
    ) -> Self::_Solution {
        let current_strategy = self
            .strategy
            .choose_weighted(rng, |s| s.1)
            .map(|s| s.0)
            .unwrap_or(PlacementPerturbationStrategy::DoNothing);
        let model = &*self.model;
        let mut placement = current.solution.placement.clone();
        match current_strategy {
            PlacementPerturbationStrategy::DoNothing => {}
            PlacementPerturbationStrategy::JitterSubset => {
                let total = model.catalog().len();
                // Small kicks around the best minima, larger ones elsewhere.
                let number_to_alter = if history.is_best_solution(current) {
                    1
                } else {
                    rng.gen_range(1..=((total + 1) / 2).max(1))
                };
                let chosen: Vec<&Component> = model
                    .catalog()
                    .components()
                    .choose_multiple(rng, number_to_alter)
                    .collect();
                for component in chosen {
                    let pose = match placement.get(component.id) {
                        Some(pose) => *pose,
                        None => continue,
                    };
                    let dx: f64 = rng.sample(StandardNormal);
                    let dy: f64 = rng.sample(StandardNormal);
                    let jittered = Pose {
                        x: pose.x + to_unit(dx * JITTER_STD_DEV),
                        y: pose.y + to_unit(dy * JITTER_STD_DEV),
                        ..pose
                    };
                    placement.set(component.id, settle(model, component, jittered, None));
                }
            }
            PlacementPerturbationStrategy::RelocateEdgeComponent => jump_edge(model, &mut placement, rng),
        }
        PlacementSolution::new(placement)
    }
}

/// Wire the placement problem into an iterated local search. The local search and the outer loop draw from separate
/// streams derived from the same seed string.
pub fn get_ils(model: Rc<ConstraintModel>, search: &SearchConfig) -> PlacementIls {
    let local_search = LocalSearch::new(
        PlacementMoveProposer::new(Rc::clone(&model), search.moves_per_neighborhood),
        PlacementSolutionScoreCalculator::new(Rc::clone(&model)),
        search.local_search_max_iterations,
        search.window_size,
        search.best_solutions_capacity,
        search.all_solutions_capacity,
        search.all_solution_iteration_expiry,
        rng_from_str(&format!("{}/local-search", search.seed)),
    );
    let history = History::<ChaCha20Rng, PlacementSolution, PlacementScore>::new(
        search.best_solutions_capacity,
        search.all_solutions_capacity,
        search.all_solution_iteration_expiry,
    );
    IteratedLocalSearch::new(
        PlacementInitialSolutionGenerator::new(Rc::clone(&model)),
        local_search,
        PlacementPerturbation::new(model),
        history,
        AcceptanceCriterion::default(),
        search.iterated_local_search_max_iterations,
        search.max_allow_no_improvement_for,
        search.restart_every,
        search.converge_after,
        rng_from_str(&search.seed),
    )
}

/// Where a search stands, judged by the best candidate found so far.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SearchPhase {
    /// No candidate generated yet.
    Unplaced,
    /// Candidates exist but none satisfies every hard constraint.
    HardInfeasible,
    /// A feasible candidate exists and the search is still lowering its cost.
    CostImproving,
    /// Finished with a feasible best candidate.
    Final,
    /// Finished without ever reaching a feasible candidate.
    Exhausted,
}

pub struct PlacementOutcome {
    pub placement: Placement,
    pub score: PlacementScore,
    pub breakdown: SoftCostBreakdown,
    pub rounds: u64,
    pub termination: Termination,
}

/// One search invocation. Owns every piece of best-so-far state, so searches never influence each other.
pub struct PlacementSearch {
    model: Rc<ConstraintModel>,
    ils: PlacementIls,
}

impl PlacementSearch {
    pub fn new(model: &ConstraintModel, search: &SearchConfig) -> Result<Self> {
        search.validate()?;
        let model = Rc::new(model.clone());
        let ils = get_ils(Rc::clone(&model), search);
        Ok(Self { model, ils })
    }

    pub fn execute_round(&mut self) {
        self.ils.execute_round();
    }

    pub fn is_finished(&self) -> bool {
        self.ils.is_finished()
    }

    pub fn rounds(&self) -> u64 {
        self.ils.rounds()
    }

    pub fn best(&self) -> Option<ScoredSolution<PlacementSolution, PlacementScore>> {
        self.ils.get_best_solution()
    }

    pub fn phase(&self) -> SearchPhase {
        let feasible = self.best().map(|best| best.score.is_feasible());
        match (feasible, self.is_finished()) {
            (None, false) => SearchPhase::Unplaced,
            (Some(false), false) => SearchPhase::HardInfeasible,
            (Some(true), false) => SearchPhase::CostImproving,
            (Some(true), true) => SearchPhase::Final,
            (_, true) => SearchPhase::Exhausted,
        }
    }

    /// Run the remaining rounds and hand back the best feasible placement.
    pub fn run(mut self) -> Result<PlacementOutcome> {
        while !self.is_finished() {
            self.execute_round();
        }
        let rounds = self.rounds();
        let termination = self.ils.termination().unwrap_or(Termination::BudgetExhausted);
        let best = match self.best() {
            Some(best) => best,
            None => {
                return Err(PlacementError::InfeasibleWithinBudget {
                    rounds,
                    best_hard_score: f64::INFINITY,
                })
            }
        };
        let placement = best.solution.placement;
        if !best.score.is_feasible() || !self.model.hard_feasible(&placement) {
            info!(rounds, hard_score = best.score.hard_score.0, "no feasible placement found");
            return Err(PlacementError::InfeasibleWithinBudget {
                rounds,
                best_hard_score: best.score.hard_score.0,
            });
        }
        let breakdown = self.model.soft_cost_breakdown(&placement);
        info!(rounds, ?termination, soft_score = best.score.soft_score.0, "placement search finished");
        Ok(PlacementOutcome {
            placement,
            score: best.score,
            breakdown,
            rounds,
            termination,
        })
    }
}

/// Search for a feasible, low-cost placement of every catalog component.
pub fn solve(model: &ConstraintModel, search: &SearchConfig) -> Result<PlacementOutcome> {
    info!(seed = %search.seed, rounds = search.iterated_local_search_max_iterations, "starting placement search");
    PlacementSearch::new(model, search)?.run()
}
