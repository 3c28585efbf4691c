use std::collections::BTreeSet;
use std::marker::PhantomData;

use hashlink::LinkedHashMap;
use rand::prelude::SliceRandom;
use tracing::{debug, trace};

/// local_search contains methods that represent a solution and proposing moves in the neighborhood of a solution.
/// Use methods in this module you can discover local minima. This is the LocalSearch part of [1] section 2 pages 2 and
/// 3.
///
/// [1] Lourenço, Helena Ramalhinho, Olivier C. Martin and Thomas Stützle. "Iterated Local Search: Framework and
/// Applications." (2010).

/// Solution is a plain old data object.
pub trait Solution:
    Clone + Send + PartialEq + Eq + PartialOrd + Ord + std::hash::Hash + std::fmt::Debug
{
}

/// Score for a solution. Could just be e.g. u64, f64, num::Num. Could be more complicated like a tuple
/// (hard score, soft score).
pub trait Score: Clone + Send + PartialEq + Eq + PartialOrd + Ord + std::fmt::Debug {
    /// Is this the best possible score. For some problem domains you do not know if there is a best score, so you
    /// can return false.
    fn is_best(&self) -> bool;
}

/// Ordering is score first, then the solution itself, so ties between equal scores resolve the same way on every run.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScoredSolution<_Solution, _Score>
where
    _Solution: Solution,
    _Score: Score,
{
    pub score: _Score,
    pub solution: _Solution,
}

impl<_Solution, _Score> ScoredSolution<_Solution, _Score>
where
    _Solution: Solution,
    _Score: Score,
{
    pub fn new(solution: _Solution, score: _Score) -> Self {
        Self { solution, score }
    }
}

/// SolutionScoreCalculator calculates the hard and soft score for a given solution.
///
/// -    A pure satisfaction problem moves from an infeasible configuration and tries to find any feasible
///      solution. Trying to minimize hard score to zero.
/// -    A pure optimization problem always has feasible solutions but move from suboptimal solutions to
///      more optimal solutions. Hard score always zero, trying to minimize soft score to zero.
///      A constraint optimization problem combines both satisfaction and optimization.
pub trait SolutionScoreCalculator {
    type _Solution: Solution;
    type _Score: Score;

    /// get_scored_solution calculates the score of a solution. See SolutionScoreCalculator doc for ideas about what
    /// the score should be.
    fn get_scored_solution(&self, solution: Self::_Solution)
        -> ScoredSolution<Self::_Solution, Self::_Score>;
}

pub trait InitialSolutionGenerator {
    type R: rand::Rng;
    type Solution: Solution;

    /// Generate an initial solution. Does not have to be feasible, i.e. does not have to have a hard score of zero.
    /// However, many local search applications depend on some greedy construction of a feasible initial solution.
    fn generate_initial_solution(&self, rng: &mut Self::R) -> Self::Solution;
}

/// MoveProposer promises to let one iterate randomly over the neighborhood of a solution.
pub trait MoveProposer {
    type R: rand::Rng;
    type Solution: Solution;

    /// Iterate over the neighborhood of a start solution randomly. Must be a finite-sized iterator that is
    /// computationally feasible to fully consume. However, local search will typically not exhaust this iterator.
    fn iter_local_moves(
        &self,
        start: &Self::Solution,
        rng: &mut Self::R,
    ) -> Box<dyn Iterator<Item = Self::Solution>>;
}

/// History keeps track of the all solutions that LocalSearch finds. You can then ask History for the best solutions
/// it's seen so far, the tabu set, etc.
pub struct History<_R, _Solution, _Score>
where
    _R: rand::Rng,
    _Solution: Solution,
    _Score: Score,
{
    best_solutions: BTreeSet<ScoredSolution<_Solution, _Score>>,
    best_solutions_capacity: usize,

    // Oldest first. Value is the iteration the solution was last seen at.
    all_solutions: LinkedHashMap<_Solution, u64>,
    all_solutions_capacity: usize,
    all_solution_iteration_expiry: u64,
    pub iteration_count: u64,
    phantom_r: PhantomData<_R>,
}

impl<_R, _Solution, _Score> Default for History<_R, _Solution, _Score>
where
    _R: rand::Rng,
    _Solution: Solution,
    _Score: Score,
{
    fn default() -> Self {
        Self::new(16, 10_000, 100_000)
    }
}

impl<_R, _Solution, _Score> History<_R, _Solution, _Score>
where
    _R: rand::Rng,
    _Solution: Solution,
    _Score: Score,
{
    pub fn new(
        best_solutions_capacity: usize,
        all_solutions_capacity: usize,
        all_solution_iteration_expiry: u64,
    ) -> Self {
        History {
            best_solutions: Default::default(),
            best_solutions_capacity,
            all_solutions: LinkedHashMap::with_capacity(all_solutions_capacity),
            all_solutions_capacity,
            all_solution_iteration_expiry,
            iteration_count: 0,
            phantom_r: PhantomData,
        }
    }

    pub fn seen_solution(&mut self, solution: &ScoredSolution<_Solution, _Score>) {
        self.iteration_count += 1;
        self.pop_solutions_for_age();
        if self.all_solutions.contains_key(&solution.solution) {
            return;
        }
        self.add_solution(solution.solution.clone());
    }

    fn add_solution(&mut self, solution: _Solution) {
        while self.all_solutions.len() >= self.all_solutions_capacity.max(1) {
            if self.all_solutions.pop_front().is_none() {
                break;
            }
        }
        self.all_solutions.insert(solution, self.iteration_count);
    }

    fn pop_solutions_for_age(&mut self) {
        while let Some((_, added_at)) = self.all_solutions.front() {
            if added_at + self.all_solution_iteration_expiry >= self.iteration_count {
                break;
            }
            self.all_solutions.pop_front();
        }
    }

    pub fn is_solution_tabu(&self, solution: &_Solution) -> bool {
        self.all_solutions.contains_key(solution)
    }

    pub fn is_best_solution(&self, solution: &ScoredSolution<_Solution, _Score>) -> bool {
        self.best_solutions.contains(solution)
    }

    pub fn local_search_chose_solution(&mut self, solution: &ScoredSolution<_Solution, _Score>) {
        if self.best_solutions.len() < self.best_solutions_capacity {
            self.best_solutions.insert(solution.clone());
            return;
        }

        // TODO better heuristic for creating a diverse best solution set even if the candidate solution has a worse
        // score.
        let worst_solution = match self.best_solutions.iter().next_back() {
            Some(worst_solution) => worst_solution.clone(),
            None => return,
        };
        if solution < &worst_solution {
            self.best_solutions.remove(&worst_solution);
            self.best_solutions.insert(solution.clone());
        }
    }

    pub fn get_random_best_solution(&self, rng: &mut _R) -> Option<ScoredSolution<_Solution, _Score>> {
        let best_solutions_vec: Vec<&ScoredSolution<_Solution, _Score>> = self.best_solutions.iter().collect();
        best_solutions_vec.choose(rng).map(|solution| (*solution).clone())
    }

    pub fn get_best(&self) -> Option<ScoredSolution<_Solution, _Score>> {
        self.best_solutions.iter().next().cloned()
    }
}

/// LocalSearch lets you find local minima for an optimization problem.
pub struct LocalSearch<R, _Solution, _Score, SSC, MP>
where
    R: rand::Rng,
    _Solution: Solution,
    _Score: Score,
    SSC: SolutionScoreCalculator<_Solution = _Solution, _Score = _Score>,
    MP: MoveProposer<R = R, Solution = _Solution>,
{
    move_proposer: MP,
    solution_score_calculator: SSC,
    max_iterations: u64,
    window_size: usize,
    history: History<R, _Solution, _Score>,
    rng: R,
}

impl<R, _Solution, _Score, SSC, MP> LocalSearch<R, _Solution, _Score, SSC, MP>
where
    R: rand::Rng,
    _Solution: Solution,
    _Score: Score,
    SSC: SolutionScoreCalculator<_Solution = _Solution, _Score = _Score>,
    MP: MoveProposer<R = R, Solution = _Solution>,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        move_proposer: MP,
        solution_score_calculator: SSC,
        max_iterations: u64,
        window_size: usize,
        best_solutions_capacity: usize,
        all_solutions_capacity: usize,
        all_solution_iteration_expiry: u64,
        rng: R,
    ) -> Self {
        LocalSearch {
            move_proposer,
            solution_score_calculator,
            max_iterations,
            window_size,
            history: History::new(
                best_solutions_capacity,
                all_solutions_capacity,
                all_solution_iteration_expiry,
            ),
            rng,
        }
    }

    /// Descend from `start`, always moving to the best non-tabu neighbor in a window of the neighborhood. Sideways
    /// and uphill moves are tolerated for `allow_no_improvement_for` consecutive iterations. Returns the best
    /// solution seen, which is never worse than `start`.
    pub fn execute(
        &mut self,
        start: _Solution,
        allow_no_improvement_for: u64,
    ) -> ScoredSolution<_Solution, _Score> {
        let mut current_solution = self.solution_score_calculator.get_scored_solution(start);
        let mut best_solution = current_solution.clone();
        let mut no_improvement_for = 0;
        for current_iteration in 0..self.max_iterations {
            self.history.seen_solution(&current_solution);
            if current_solution.score.is_best() {
                debug!(current_iteration, "local search found best possible solution and is terminating");
                return current_solution;
            }
            let history = &self.history;
            let solution_score_calculator = &self.solution_score_calculator;
            let mut neighborhood: Vec<ScoredSolution<_Solution, _Score>> = self
                .move_proposer
                .iter_local_moves(&current_solution.solution, &mut self.rng)
                .filter(|solution| !history.is_solution_tabu(solution))
                .take(self.window_size)
                .map(|solution| solution_score_calculator.get_scored_solution(solution))
                .collect();
            neighborhood.sort();
            trace!(
                current_iteration,
                neighborhood_size = neighborhood.len(),
                "local search neighborhood scored"
            );
            match neighborhood.into_iter().next() {
                Some(neighborhood_best) => {
                    if neighborhood_best < best_solution {
                        best_solution = neighborhood_best.clone();
                        no_improvement_for = 0;
                    } else {
                        no_improvement_for += 1;
                        if no_improvement_for > allow_no_improvement_for {
                            break;
                        }
                    }
                    current_solution = neighborhood_best;
                }
                None => break,
            }
        }
        trace!(score = ?best_solution.score, "local search finished");
        best_solution
    }
}
