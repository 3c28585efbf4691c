//! Placement of a small fixed set of PCB components on a rectangular board.
//!
//! `constraints` decides whether a placement satisfies the hard rules (bounds, overlap, edges, parallel pair,
//! proximity, balance, keep-out) and how good it is. `search` finds a feasible, low-cost placement with an iterated
//! local search. `validator` re-checks a finished placement rule by rule.
pub mod board;
pub mod catalog;
pub mod config;
pub mod constraints;
pub mod error;
pub mod placement;
pub mod pose;
pub mod search;
pub mod validator;

pub use board::{Board, Edge};
pub use catalog::{Catalog, Component, ComponentId, Role};
pub use config::{CostWeights, KeepOutShape, PlacementConfig, SearchConfig};
pub use constraints::{ConstraintModel, SoftCostBreakdown};
pub use error::{PlacementError, Result};
pub use placement::Placement;
pub use pose::{Footprint, Pose, Rotation};
pub use search::{solve, PlacementOutcome, PlacementSearch, SearchPhase};
pub use validator::{validate, ValidationReport};
