/// iterated_local_search builds upon local_search, see [1] page 7 algorithm 1.
///
/// [1] Lourenço, Helena Ramalhinho, Olivier C. Martin and Thomas Stützle. "Iterated Local Search: Framework and
/// Applications." (2010).
use std::marker::PhantomData;

use rand::prelude::SliceRandom;
use tracing::debug;

use crate::local_search::History;
use crate::local_search::InitialSolutionGenerator;
use crate::local_search::LocalSearch;
use crate::local_search::MoveProposer;
use crate::local_search::Score;
use crate::local_search::ScoredSolution;
use crate::local_search::Solution;
use crate::local_search::SolutionScoreCalculator;

/// AcceptanceCriterion takes the old local minima and new local minima, combines it with the history, and determines
/// which one to use.
#[derive(Derivative)]
#[derivative(Default(bound = ""))]
pub struct AcceptanceCriterion<_R, _Solution, _Score>
where
    _R: rand::Rng,
    _Solution: Solution,
    _Score: Score,
{
    phantom_r: PhantomData<_R>,
    phantom_solution: PhantomData<_Solution>,
    phantom_score: PhantomData<_Score>,
}

impl<_R, _Solution, _Score> AcceptanceCriterion<_R, _Solution, _Score>
where
    _R: rand::Rng,
    _Solution: Solution,
    _Score: Score,
{
    pub fn choose(
        &mut self,
        existing_local_minima: ScoredSolution<_Solution, _Score>,
        new_local_minima: ScoredSolution<_Solution, _Score>,
        history: &History<_R, _Solution, _Score>,
        rng: &mut _R,
    ) -> ScoredSolution<_Solution, _Score> {
        let mut choices = vec![(existing_local_minima, 1), (new_local_minima, 5)];
        if let Some(random_best_solution) = history.get_random_best_solution(rng) {
            choices.push((random_best_solution, 1));
        }
        let indices: Vec<usize> = (0..choices.len()).collect();
        let index = indices
            .choose_weighted(rng, |index| choices[*index].1)
            .map(|index| *index)
            .unwrap_or(1);
        choices.swap_remove(index).0
    }
}

/// Perturbation takes the current local minima and the history and proposes a new starting point for LocalSearch
/// to start from.
pub trait Perturbation {
    type _R: rand::Rng;
    type _Solution: Solution;
    type _Score: Score;

    fn propose_new_starting_solution(
        &mut self,
        current: &ScoredSolution<Self::_Solution, Self::_Score>,
        history: &History<Self::_R, Self::_Solution, Self::_Score>,
        rng: &mut Self::_R,
    ) -> Self::_Solution;
}

/// Why an iterated local search stopped.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Termination {
    /// A local minimum reported `Score::is_best`.
    BestPossible,
    /// The best score did not improve for the configured number of rounds.
    Converged,
    /// All rounds were used.
    BudgetExhausted,
}

pub struct IteratedLocalSearch<_R, _Solution, _Score, _SSC, _MP, _ISG, _P>
where
    _R: rand::Rng,
    _Score: Score,
    _Solution: Solution,
    _SSC: SolutionScoreCalculator<_Solution = _Solution, _Score = _Score>,
    _MP: MoveProposer<R = _R, Solution = _Solution>,
    _ISG: InitialSolutionGenerator,
    _P: Perturbation<_R = _R, _Solution = _Solution, _Score = _Score>,
{
    initial_solution_generator: _ISG,
    local_search: LocalSearch<_R, _Solution, _Score, _SSC, _MP>,
    perturbation: _P,
    history: History<_R, _Solution, _Score>,
    acceptance_criterion: AcceptanceCriterion<_R, _Solution, _Score>,
    max_iterations: u64,
    max_allow_no_improvement_for: u64,
    restart_every: u64,
    converge_after: u64,
    rng: _R,

    current: Option<ScoredSolution<_Solution, _Score>>,
    allow_no_improvement_for: u64,
    round: u64,
    rounds_since_improvement: u64,
    termination: Option<Termination>,
}

impl<_R, _Solution, _Score, _SSC, _MP, _ISG, _P> IteratedLocalSearch<_R, _Solution, _Score, _SSC, _MP, _ISG, _P>
where
    _R: rand::Rng,
    _Score: Score,
    _Solution: Solution,
    _SSC: SolutionScoreCalculator<_Solution = _Solution, _Score = _Score>,
    _MP: MoveProposer<R = _R, Solution = _Solution>,
    _ISG: InitialSolutionGenerator<R = _R, Solution = _Solution>,
    _P: Perturbation<_R = _R, _Solution = _Solution, _Score = _Score>,
{
    /// `restart_every` rounds the search abandons its current minimum and descends from a fresh initial solution;
    /// zero disables restarts. `converge_after` rounds without a better best solution finish the search early; zero
    /// disables early finishing.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        initial_solution_generator: _ISG,
        local_search: LocalSearch<_R, _Solution, _Score, _SSC, _MP>,
        perturbation: _P,
        history: History<_R, _Solution, _Score>,
        acceptance_criterion: AcceptanceCriterion<_R, _Solution, _Score>,
        max_iterations: u64,
        max_allow_no_improvement_for: u64,
        restart_every: u64,
        converge_after: u64,
        rng: _R,
    ) -> Self {
        IteratedLocalSearch {
            initial_solution_generator,
            local_search,
            perturbation,
            history,
            acceptance_criterion,
            max_iterations,
            max_allow_no_improvement_for,
            restart_every,
            converge_after,
            rng,
            current: None,
            allow_no_improvement_for: 0,
            round: 0,
            rounds_since_improvement: 0,
            termination: None,
        }
    }

    fn descend_from_initial_solution(&mut self) -> ScoredSolution<_Solution, _Score> {
        let initial = self
            .initial_solution_generator
            .generate_initial_solution(&mut self.rng);
        let local_minima = self.local_search.execute(initial, self.allow_no_improvement_for);
        self.history.local_search_chose_solution(&local_minima);
        local_minima
    }

    /// Run one perturb, descend, accept round. The very first call also builds and descends from the initial
    /// solution. Does nothing once the search is finished.
    pub fn execute_round(&mut self) {
        if self.termination.is_some() {
            return;
        }
        let best_before = self.history.get_best().map(|best| best.score);
        let mut current = match self.current.take() {
            Some(current) => current,
            None => self.descend_from_initial_solution(),
        };
        if current.score.is_best() {
            debug!(round = self.round, "iterated local search found best possible solution and is terminating");
            self.current = Some(current);
            self.termination = Some(Termination::BestPossible);
            return;
        }
        if self.round >= self.max_iterations {
            self.current = Some(current);
            self.termination = Some(Termination::BudgetExhausted);
            return;
        }

        if self.restart_every != 0 && self.round > 0 && self.round % self.restart_every == 0 {
            debug!(round = self.round, "reset from random");
            current = self.descend_from_initial_solution();
        }
        if let Some(best) = self.history.get_best() {
            if current.score <= best.score {
                self.allow_no_improvement_for = self.allow_no_improvement_for.saturating_sub(1);
            } else {
                self.allow_no_improvement_for =
                    (self.allow_no_improvement_for + 1).min(self.max_allow_no_improvement_for);
            }
        }
        let perturbed = self
            .perturbation
            .propose_new_starting_solution(&current, &self.history, &mut self.rng);
        let new = self.local_search.execute(perturbed, self.allow_no_improvement_for);
        self.history.local_search_chose_solution(&new);
        let chosen = self
            .acceptance_criterion
            .choose(current, new, &self.history, &mut self.rng);
        self.current = Some(chosen);
        self.round += 1;

        let best_after = self.history.get_best().map(|best| best.score);
        match (&best_before, &best_after) {
            (Some(before), Some(after)) if after >= before => self.rounds_since_improvement += 1,
            _ => self.rounds_since_improvement = 0,
        }
        debug!(round = self.round, best_score = ?best_after, "iterated local search round finished");

        if let Some(best) = &best_after {
            if best.is_best() {
                self.termination = Some(Termination::BestPossible);
                return;
            }
        }
        if self.converge_after != 0 && self.rounds_since_improvement >= self.converge_after {
            self.termination = Some(Termination::Converged);
        } else if self.round >= self.max_iterations {
            self.termination = Some(Termination::BudgetExhausted);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.termination.is_some()
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn rounds(&self) -> u64 {
        self.round
    }

    pub fn get_best_solution(&self) -> Option<ScoredSolution<_Solution, _Score>> {
        self.history.get_best()
    }

    pub fn execute(&mut self) -> Option<ScoredSolution<_Solution, _Score>> {
        while !self.is_finished() {
            self.execute_round();
        }
        self.get_best_solution()
    }
}
