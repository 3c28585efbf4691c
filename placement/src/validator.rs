//! Standalone verdict on a finished placement, rule by rule, with enough detail to see why a rule failed. Derived
//! straight from coordinates rather than through the constraint model, so the two act as a check on each other.
use std::fmt::{Display, Formatter};

use math_util::{segment_intersects_rect, Point, Rect, Segment, Unit};
use num_traits::Zero;
use serde::Serialize;

use crate::catalog::ComponentId;
use crate::constraints::ConstraintModel;
use crate::placement::Placement;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub enum Rule {
    Boundary,
    NoOverlap,
    EdgePlacement,
    ParallelPlacement,
    Proximity,
    GlobalBalance,
    KeepOut,
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Rule::Boundary => "Boundary Constraint",
            Rule::NoOverlap => "No Overlapping",
            Rule::EdgePlacement => "Edge Placement",
            Rule::ParallelPlacement => "Parallel Placement",
            Rule::Proximity => "Proximity Constraint",
            Rule::GlobalBalance => "Global Balance",
            Rule::KeepOut => "Keep-Out Zone",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RuleResult {
    pub rule: Rule,
    pub passed: bool,
    pub detail: String,
}

impl RuleResult {
    fn new(rule: Rule, passed: bool, detail: impl Into<String>) -> Self {
        RuleResult {
            rule,
            passed,
            detail: detail.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Catalog components with no pose. When non-empty no rule is evaluated.
    pub missing: Vec<ComponentId>,
    pub results: Vec<RuleResult>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty() && self.results.iter().all(|result| result.passed)
    }

    pub fn result(&self, rule: Rule) -> Option<&RuleResult> {
        self.results.iter().find(|result| result.rule == rule)
    }

    pub fn failed_rules(&self) -> Vec<Rule> {
        self.results
            .iter()
            .filter(|result| !result.passed)
            .map(|result| result.rule)
            .collect()
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if !self.missing.is_empty() {
            let names: Vec<&str> = self.missing.iter().map(|id| id.name()).collect();
            return writeln!(f, "FAILED: placement is missing {}", names.join(", "));
        }
        for result in &self.results {
            let status = if result.passed { "PASSED" } else { "FAILED" };
            writeln!(f, "{:<22}: {} {}", result.rule.to_string(), status, result.detail)?;
        }
        Ok(())
    }
}

/// Check every hard rule of `model` against `placement`.
pub fn validate(model: &ConstraintModel, placement: &Placement) -> ValidationReport {
    let catalog = model.catalog();
    let missing = placement.missing(catalog);
    if !missing.is_empty() {
        return ValidationReport {
            missing,
            results: vec![],
        };
    }
    let placed: Vec<(ComponentId, Rect)> = placement.rects(catalog);
    let rect_of = |id: ComponentId| placed.iter().find(|(other, _)| *other == id).map(|(_, rect)| *rect);

    ValidationReport {
        missing,
        results: vec![
            check_boundary(model, &placed),
            check_overlap(&placed),
            check_edges(model, &placed),
            check_parallel(model, &rect_of),
            check_proximity(model, &rect_of),
            check_balance(model, &placed),
            check_keep_out(model, &rect_of),
        ],
    }
}

fn check_boundary(model: &ConstraintModel, placed: &[(ComponentId, Rect)]) -> RuleResult {
    let (width, height) = (model.board().width(), model.board().height());
    let outside: Vec<&str> = placed
        .iter()
        .filter(|(_, r)| {
            let (low, high) = (r.min_corner(), r.max_corner());
            low.x < Unit::zero() || low.y < Unit::zero() || high.x > width || high.y > height
        })
        .map(|(id, _)| id.name())
        .collect();
    if outside.is_empty() {
        RuleResult::new(Rule::Boundary, true, "")
    } else {
        RuleResult::new(Rule::Boundary, false, format!("outside the board: {}", outside.join(", ")))
    }
}

fn check_overlap(placed: &[(ComponentId, Rect)]) -> RuleResult {
    for (i, (first_id, first)) in placed.iter().enumerate() {
        for (second_id, second) in &placed[i + 1..] {
            let separated = first.max_corner().x <= second.min_corner().x
                || first.min_corner().x >= second.max_corner().x
                || first.max_corner().y <= second.min_corner().y
                || first.min_corner().y >= second.max_corner().y;
            if !separated {
                return RuleResult::new(Rule::NoOverlap, false, format!("{} overlaps {}", first_id, second_id));
            }
        }
    }
    RuleResult::new(Rule::NoOverlap, true, "")
}

fn flush_with_any_edge(model: &ConstraintModel, rect: &Rect) -> bool {
    let board = model.board();
    rect.min_corner().x == Unit::zero()
        || rect.min_corner().y == Unit::zero()
        || rect.max_corner().x == board.width()
        || rect.max_corner().y == board.height()
}

fn check_edges(model: &ConstraintModel, placed: &[(ComponentId, Rect)]) -> RuleResult {
    let catalog = model.catalog();
    let off_edge: Vec<&str> = placed
        .iter()
        .filter(|(id, _)| catalog.get(*id).map_or(false, |component| component.is_edge_required()))
        .filter(|(_, rect)| !flush_with_any_edge(model, rect))
        .map(|(id, _)| id.name())
        .collect();
    if off_edge.is_empty() {
        RuleResult::new(Rule::EdgePlacement, true, "")
    } else {
        RuleResult::new(Rule::EdgePlacement, false, format!("not on an edge: {}", off_edge.join(", ")))
    }
}

fn check_parallel(model: &ConstraintModel, rect_of: &dyn Fn(ComponentId) -> Option<Rect>) -> RuleResult {
    let board = model.board();
    for (first_id, second_id) in model.catalog().parallel_pairs() {
        let (a, b) = match (rect_of(first_id), rect_of(second_id)) {
            (Some(a), Some(b)) => (a, b),
            _ => continue,
        };
        let same_orientation = (a.width() > a.height()) == (b.width() > b.height())
            && (a.height() > a.width()) == (b.height() > b.width());
        let zero = Unit::zero();
        let opposite_vertical = (a.min_corner().x == zero && b.max_corner().x == board.width())
            || (a.max_corner().x == board.width() && b.min_corner().x == zero);
        let opposite_horizontal = (a.min_corner().y == zero && b.max_corner().y == board.height())
            || (a.max_corner().y == board.height() && b.min_corner().y == zero);
        if !same_orientation {
            return RuleResult::new(
                Rule::ParallelPlacement,
                false,
                format!("{} and {} are oriented differently", first_id, second_id),
            );
        }
        if !(opposite_vertical || opposite_horizontal) {
            return RuleResult::new(
                Rule::ParallelPlacement,
                false,
                format!("{} and {} are not on opposite edges", first_id, second_id),
            );
        }
    }
    RuleResult::new(Rule::ParallelPlacement, true, "")
}

fn check_proximity(model: &ConstraintModel, rect_of: &dyn Fn(ComponentId) -> Option<Rect>) -> RuleResult {
    let limit = model.config().proximity_limit;
    let mut details = vec![];
    let mut passed = true;
    for (linked, anchor) in model.catalog().proximity_links() {
        if let (Some(a), Some(b)) = (rect_of(linked), rect_of(anchor)) {
            let (ca, cb) = (a.center(), b.center());
            let dx = (ca.x - cb.x).to_f64();
            let dy = (ca.y - cb.y).to_f64();
            let distance = (dx * dx + dy * dy).sqrt();
            let (sx, sy) = ((ca.x - cb.x).squared(), (ca.y - cb.y).squared());
            passed &= sx.saturating_add(sy) <= limit.squared();
            details.push(format!("{} to {}: {:.2} (limit {})", linked, anchor, distance, limit));
        }
    }
    RuleResult::new(Rule::Proximity, passed, details.join("; "))
}

fn check_balance(model: &ConstraintModel, placed: &[(ComponentId, Rect)]) -> RuleResult {
    let count = Unit::from(placed.len() as i32);
    let sum_x: Unit = placed.iter().map(|(_, rect)| rect.center().x).sum();
    let sum_y: Unit = placed.iter().map(|(_, rect)| rect.center().y).sum();
    let center_of_mass = Point {
        x: sum_x / count,
        y: sum_y / count,
    };
    let board_center = model.board().center();
    let radius = model.config().balance_radius;
    let passed = center_of_mass.distance_squared(&board_center) <= radius.squared();
    RuleResult::new(
        Rule::GlobalBalance,
        passed,
        format!(
            "center of mass ({:.2}, {:.2}) is {:.2} from center (limit {})",
            center_of_mass.x.to_f64(),
            center_of_mass.y.to_f64(),
            center_of_mass.distance(&board_center),
            radius
        ),
    )
}

fn check_keep_out(model: &ConstraintModel, rect_of: &dyn Fn(ComponentId) -> Option<Rect>) -> RuleResult {
    let catalog = model.catalog();
    for source in catalog.keep_out_sources() {
        let source_rect = match rect_of(source) {
            Some(rect) => rect,
            None => continue,
        };
        let zone = model.config().keep_out.zone(&source_rect, model.board());
        for (linked, anchor) in catalog.proximity_links() {
            if source == linked || source == anchor {
                continue;
            }
            if let (Some(a), Some(b)) = (rect_of(linked), rect_of(anchor)) {
                if segment_intersects_rect(&Segment::new(a.center(), b.center()), &zone) {
                    return RuleResult::new(
                        Rule::KeepOut,
                        false,
                        format!("route {} to {} crosses the zone of {}", linked, anchor, source),
                    );
                }
            }
        }
    }
    RuleResult::new(Rule::KeepOut, true, "path is clear")
}

#[cfg(test)]
mod validator_tests {
    use proptest::prelude::*;

    use super::*;
    use crate::constraints::constraints_tests::{feasible_placement, walkthrough_placement};
    use crate::pose::{Pose, Rotation};

    #[test]
    fn feasible_placement_passes_every_rule() {
        let report = validate(&ConstraintModel::default(), &feasible_placement());
        assert!(report.is_valid(), "{}", report);
        assert_eq!(report.results.len(), 7);
        assert!(report.result(Rule::Proximity).unwrap().detail.contains("8.54"));
    }

    #[test]
    fn walkthrough_fails_only_balance() {
        let report = validate(&ConstraintModel::default(), &walkthrough_placement());
        assert!(!report.is_valid());
        assert_eq!(report.failed_rules(), vec![Rule::GlobalBalance]);
    }

    #[test]
    fn pair_on_one_edge_fails_parallel() {
        let placement = walkthrough_placement().with(ComponentId::MikroBus2, Pose::new(0, 30, Rotation::R0));
        let report = validate(&ConstraintModel::default(), &placement);
        assert!(report.failed_rules().contains(&Rule::ParallelPlacement));
    }

    #[test]
    fn parallel_rule_names_the_broken_condition() {
        let model = ConstraintModel::default();
        let turned = walkthrough_placement().with(ComponentId::MikroBus2, Pose::new(35, 0, Rotation::R90));
        let result = validate(&model, &turned).result(Rule::ParallelPlacement).cloned().unwrap();
        assert!(!result.passed);
        assert!(result.detail.contains("oriented differently"), "{}", result.detail);

        let same_edge = walkthrough_placement().with(ComponentId::MikroBus2, Pose::new(0, 30, Rotation::R0));
        let result = validate(&model, &same_edge).result(Rule::ParallelPlacement).cloned().unwrap();
        assert!(result.detail.contains("not on opposite edges"), "{}", result.detail);

        let standing = walkthrough_placement()
            .with(ComponentId::MikroBus1, Pose::new(25, 0, Rotation::R0))
            .with(ComponentId::MikroBus2, Pose::new(20, 35, Rotation::R0));
        assert!(validate(&model, &standing).result(Rule::ParallelPlacement).unwrap().passed);
    }

    #[test]
    fn missing_component_short_circuits() {
        let mut placement = Placement::new();
        for (id, pose) in feasible_placement().iter().filter(|(id, _)| *id != ComponentId::Crystal) {
            placement.set(id, *pose);
        }
        let report = validate(&ConstraintModel::default(), &placement);
        assert_eq!(report.missing, vec![ComponentId::Crystal]);
        assert!(report.results.is_empty());
        assert!(!report.is_valid());
        assert!(report.to_string().contains("CRYSTAL"));
    }

    #[test]
    fn report_lists_rules_by_name() {
        let text = validate(&ConstraintModel::default(), &feasible_placement()).to_string();
        assert!(text.contains("Boundary Constraint"));
        assert!(text.contains("Keep-Out Zone"));
        assert!(!text.contains("FAILED"));
    }

    proptest! {
        #[test]
        fn agrees_with_constraint_model(
            poses in proptest::collection::vec((0i32..=45, 0i32..=45, prop::bool::ANY), 5)
        ) {
            let model = ConstraintModel::default();
            let mut placement = Placement::new();
            for (id, (x, y, rotated)) in ComponentId::ALL.iter().zip(poses) {
                let rotation = if rotated { Rotation::R90 } else { Rotation::R0 };
                placement.set(*id, Pose::new(x, y, rotation));
            }
            let report = validate(&model, &placement);
            let checks = model.checks(&placement);
            prop_assert_eq!(report.is_valid(), model.hard_feasible(&placement));
            prop_assert_eq!(report.result(Rule::Boundary).unwrap().passed, checks.in_bounds);
            prop_assert_eq!(report.result(Rule::NoOverlap).unwrap().passed, checks.no_overlap);
            prop_assert_eq!(report.result(Rule::EdgePlacement).unwrap().passed, checks.on_edge);
            prop_assert_eq!(report.result(Rule::ParallelPlacement).unwrap().passed, checks.opposite_parallel);
            prop_assert_eq!(report.result(Rule::Proximity).unwrap().passed, checks.proximity);
            prop_assert_eq!(report.result(Rule::GlobalBalance).unwrap().passed, checks.balance);
            prop_assert_eq!(report.result(Rule::KeepOut).unwrap().passed, checks.keep_out);
        }
    }
}
