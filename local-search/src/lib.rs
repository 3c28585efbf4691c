//! A small local search framework. `local_search` descends to a local minimum from a starting solution;
//! `iterated_local_search` repeatedly perturbs and re-descends, keeping a history of the best minima found.
//!
//! Problems plug in by implementing `Solution`, `Score`, `SolutionScoreCalculator`, `InitialSolutionGenerator`,
//! `MoveProposer` and `Perturbation`.
#[macro_use]
extern crate derivative;

pub mod iterated_local_search;
pub mod local_search;
pub mod seed;

#[cfg(test)]
mod test_problem;
