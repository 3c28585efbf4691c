use std::path::Path;
use std::time::Duration;

use math_util::{Rect, Unit};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::board::{Board, Edge};
use crate::error::{PlacementError, Result};

/// Tunable thresholds and weights. Every field has a default, so a config file only needs the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Maximum center-to-center distance of a proximity-linked pair.
    pub proximity_limit: Unit,
    /// Maximum distance of the center of mass from the board center.
    pub balance_radius: Unit,
    pub keep_out: KeepOutShape,
    /// Candidate coordinates are snapped to multiples of this.
    pub grid_step: Unit,
    pub cost_weights: CostWeights,
    pub search: SearchConfig,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        PlacementConfig {
            proximity_limit: Unit::from(10),
            balance_radius: Unit::from(2),
            keep_out: KeepOutShape::Footprint,
            grid_step: Unit::from(1),
            cost_weights: CostWeights::default(),
            search: SearchConfig::default(),
        }
    }
}

impl PlacementConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<PlacementConfig> {
        let json = std::fs::read_to_string(path)?;
        let config: PlacementConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.proximity_limit.is_positive() {
            return Err(PlacementError::invalid("proximity_limit must be positive"));
        }
        if self.balance_radius < Unit::zero() {
            return Err(PlacementError::invalid("balance_radius must not be negative"));
        }
        if !self.grid_step.is_positive() {
            return Err(PlacementError::invalid("grid_step must be positive"));
        }
        if let KeepOutShape::EdgeProjected { across, inward } = self.keep_out {
            if !across.is_positive() || !inward.is_positive() {
                return Err(PlacementError::invalid("edge projected keep-out dimensions must be positive"));
            }
        }
        self.cost_weights.validate()?;
        self.search.validate()
    }
}

/// Shape of the zone a keep-out source projects.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum KeepOutShape {
    /// The source's own rectangle.
    Footprint,
    /// A rectangle `across` wide centered on the source, reaching `inward` from the edge the source sits on.
    EdgeProjected { across: Unit, inward: Unit },
}

impl KeepOutShape {
    /// Zone projected by a source occupying `source`. An edge projected zone for a source that touches no edge falls
    /// back to the source's rectangle.
    pub fn zone(&self, source: &Rect, board: &Board) -> Rect {
        let (across, inward) = match self {
            KeepOutShape::Footprint => return *source,
            KeepOutShape::EdgeProjected { across, inward } => (*across, *inward),
        };
        let center = source.center();
        let half = across.half();
        // Bottom and top win over the vertical edges when the source sits in a corner.
        let edge = [Edge::Bottom, Edge::Top, Edge::Left, Edge::Right]
            .into_iter()
            .find(|edge| board.gap_to_edge(source, *edge) == Unit::zero());
        match edge {
            Some(Edge::Bottom) => Rect::from_origin_size(center.x - half, Unit::zero(), across, inward),
            Some(Edge::Top) => Rect::from_origin_size(center.x - half, board.height() - inward, across, inward),
            Some(Edge::Left) => Rect::from_origin_size(Unit::zero(), center.y - half, inward, across),
            Some(Edge::Right) => Rect::from_origin_size(board.width() - inward, center.y - half, inward, across),
            None => *source,
        }
    }
}

/// Weights of the soft cost terms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostWeights {
    pub wasted_space: f64,
    pub compactness: f64,
    pub centrality: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        CostWeights {
            wasted_space: 1.0,
            compactness: 1.0,
            centrality: 10.0,
        }
    }
}

impl CostWeights {
    fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("wasted_space", self.wasted_space),
            ("compactness", self.compactness),
            ("centrality", self.centrality),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(PlacementError::invalid(format!(
                    "cost weight {} must be finite and non-negative, got {}",
                    name, weight
                )));
            }
        }
        Ok(())
    }
}

/// Search budget and seeding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Hashed into the random generator seed. Same seed, same inputs, same placement.
    pub seed: String,
    pub iterated_local_search_max_iterations: u64,
    pub local_search_max_iterations: u64,
    pub window_size: usize,
    /// Candidate moves generated per neighborhood. The local search scores the first `window_size` non-tabu ones.
    pub moves_per_neighborhood: usize,
    pub best_solutions_capacity: usize,
    pub all_solutions_capacity: usize,
    pub all_solution_iteration_expiry: u64,
    pub max_allow_no_improvement_for: u64,
    pub restart_every: u64,
    pub converge_after: u64,
    /// Wall-clock allowance for search plus validation. Reported against, never enforced mid-search.
    pub time_limit_millis: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            seed: "42".to_string(),
            iterated_local_search_max_iterations: 300,
            local_search_max_iterations: 200,
            window_size: 48,
            moves_per_neighborhood: 96,
            best_solutions_capacity: 16,
            all_solutions_capacity: 5_000,
            all_solution_iteration_expiry: 1_000,
            max_allow_no_improvement_for: 10,
            restart_every: 100,
            converge_after: 120,
            time_limit_millis: 2_000,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.iterated_local_search_max_iterations == 0 {
            return Err(PlacementError::invalid(
                "iterated_local_search_max_iterations must be at least 1",
            ));
        }
        if self.local_search_max_iterations == 0 {
            return Err(PlacementError::invalid("local_search_max_iterations must be at least 1"));
        }
        if self.window_size == 0 || self.moves_per_neighborhood == 0 {
            return Err(PlacementError::invalid(
                "window_size and moves_per_neighborhood must be at least 1",
            ));
        }
        if self.best_solutions_capacity == 0 {
            return Err(PlacementError::invalid("best_solutions_capacity must be at least 1"));
        }
        if self.time_limit_millis == 0 {
            return Err(PlacementError::invalid("time_limit_millis must be at least 1"));
        }
        Ok(())
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_millis)
    }

    pub fn within_time_limit(&self, elapsed: Duration) -> bool {
        elapsed <= self.time_limit()
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    fn rect(x: i32, y: i32, w: i32, h: i32) -> Rect {
        Rect::from_origin_size(x.into(), y.into(), w.into(), h.into())
    }

    #[test]
    fn defaults_are_valid() {
        PlacementConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config: PlacementConfig =
            serde_json::from_str(r#"{"proximity_limit": 12, "search": {"seed": "abc"}}"#).unwrap();
        assert_eq!(config.proximity_limit, Unit::from(12));
        assert_eq!(config.balance_radius, Unit::from(2));
        assert_eq!(config.search.seed, "abc");
        assert_eq!(config.search.window_size, SearchConfig::default().window_size);
    }

    #[test]
    fn time_limit_is_inclusive() {
        let search = SearchConfig::default();
        assert_eq!(search.time_limit(), Duration::from_secs(2));
        assert!(search.within_time_limit(Duration::from_millis(1_999)));
        assert!(search.within_time_limit(Duration::from_secs(2)));
        assert!(!search.within_time_limit(Duration::from_millis(2_001)));

        let config: PlacementConfig = serde_json::from_str(r#"{"search": {"time_limit_millis": 500}}"#).unwrap();
        assert!(!config.search.within_time_limit(Duration::from_millis(600)));
        let zero = SearchConfig {
            time_limit_millis: 0,
            ..SearchConfig::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn keep_out_shape_from_json() {
        let config: PlacementConfig =
            serde_json::from_str(r#"{"keep_out": {"shape": "edge_projected", "across": 10, "inward": 20}}"#)
                .unwrap();
        assert_eq!(
            config.keep_out,
            KeepOutShape::EdgeProjected {
                across: 10.into(),
                inward: 20.into()
            }
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = PlacementConfig::default();
        config.proximity_limit = Unit::zero();
        assert!(config.validate().is_err());

        let mut config = PlacementConfig::default();
        config.cost_weights.centrality = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = PlacementConfig::default();
        config.search.window_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn footprint_zone_is_the_source() {
        let source = rect(20, 0, 5, 5);
        assert_eq!(KeepOutShape::Footprint.zone(&source, &Board::default()), source);
    }

    #[test]
    fn edge_projected_zone_reaches_inward() {
        let shape = KeepOutShape::EdgeProjected {
            across: 10.into(),
            inward: 20.into(),
        };
        let board = Board::default();
        let seventeen_and_a_half = Unit::from_f64(17.5).unwrap();
        let bottom = shape.zone(&rect(20, 0, 5, 5), &board);
        assert_eq!(bottom, Rect::from_origin_size(seventeen_and_a_half, Unit::zero(), 10.into(), 20.into()));
        let right = shape.zone(&rect(45, 20, 5, 5), &board);
        assert_eq!(right, Rect::from_origin_size(30.into(), seventeen_and_a_half, 20.into(), 10.into()));
        assert_eq!(shape.zone(&rect(20, 20, 5, 5), &board), rect(20, 20, 5, 5));
    }
}
