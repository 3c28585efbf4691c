//! A tiny problem for exercising the search machinery: move an integer vector onto a fixed target vector. The score is
//! the L1 distance to the target, so the global minimum is known and reachable by unit steps.
use rand::prelude::SliceRandom;
use rand::Rng;

use crate::iterated_local_search::Perturbation;
use crate::local_search::{
    History, InitialSolutionGenerator, MoveProposer, Score, ScoredSolution, Solution, SolutionScoreCalculator,
};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetSolution {
    values: Vec<i64>,
}

impl TargetSolution {
    pub fn new(values: Vec<i64>) -> Self {
        Self { values }
    }
}

impl Solution for TargetSolution {}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetScore(pub u64);

impl Score for TargetScore {
    fn is_best(&self) -> bool {
        self.0 == 0
    }
}

pub struct TargetSolutionScoreCalculator {
    target: Vec<i64>,
}

impl TargetSolutionScoreCalculator {
    pub fn new(target: Vec<i64>) -> Self {
        Self { target }
    }
}

impl SolutionScoreCalculator for TargetSolutionScoreCalculator {
    type _Solution = TargetSolution;
    type _Score = TargetScore;

    fn get_scored_solution(&self, solution: Self::_Solution) -> ScoredSolution<Self::_Solution, Self::_Score> {
        let distance = solution
            .values
            .iter()
            .zip(&self.target)
            .map(|(v, t)| (v - t).unsigned_abs())
            .sum();
        ScoredSolution::new(solution, TargetScore(distance))
    }
}

pub struct TargetInitialSolutionGenerator {
    dimensions: usize,
}

impl TargetInitialSolutionGenerator {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl InitialSolutionGenerator for TargetInitialSolutionGenerator {
    type R = rand_chacha::ChaCha20Rng;
    type Solution = TargetSolution;

    fn generate_initial_solution(&self, rng: &mut Self::R) -> Self::Solution {
        TargetSolution::new((0..self.dimensions).map(|_| rng.gen_range(-50..50)).collect())
    }
}

pub struct TargetMoveProposer {
    dimensions: usize,
}

impl TargetMoveProposer {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl MoveProposer for TargetMoveProposer {
    type R = rand_chacha::ChaCha20Rng;
    type Solution = TargetSolution;

    fn iter_local_moves(&self, start: &Self::Solution, rng: &mut Self::R) -> Box<dyn Iterator<Item = Self::Solution>> {
        let mut dimensions: Vec<usize> = (0..self.dimensions).collect();
        dimensions.shuffle(rng);
        let start = start.clone();
        Box::new(dimensions.into_iter().flat_map(move |dimension| {
            [-1, 1].into_iter().map({
                let start = start.clone();
                move |delta| {
                    let mut moved = start.clone();
                    moved.values[dimension] += delta;
                    moved
                }
            })
        }))
    }
}

#[derive(Default)]
pub struct TargetPerturbation {}

impl Perturbation for TargetPerturbation {
    type _R = rand_chacha::ChaCha20Rng;
    type _Solution = TargetSolution;
    type _Score = TargetScore;

    fn propose_new_starting_solution(
        &mut self,
        current: &ScoredSolution<Self::_Solution, Self::_Score>,
        _history: &History<Self::_R, Self::_Solution, Self::_Score>,
        rng: &mut Self::_R,
    ) -> Self::_Solution {
        let mut new_solution = current.solution.clone();
        if let Some(value) = new_solution.values.choose_mut(rng) {
            *value += rng.gen_range(-5..=5);
        }
        new_solution
    }
}
