use std::{
  cmp::{Ordering, Reverse},
  collections::{BinaryHeap, HashMap},
  hash::Hash,
};

/// A search space for [`find_path`].
pub(crate) trait AStarProblem {
  /// The label of an edge between two states.
  type ActionType: Clone;
  /// A position in the search space.
  type StateType: Hash + Eq + Clone;

  /// The state the search starts from.
  fn initial_state(&self) -> Self::StateType;

  /// Every edge leaving `state`, as (cost, action, next state). Costs must be
  /// non-negative.
  fn successors(
    &self,
    state: &Self::StateType,
  ) -> Vec<(f32, Self::ActionType, Self::StateType)>;

  /// A lower bound on the cost from `state` to the nearest goal. Zero at
  /// goal states.
  fn heuristic(&self, state: &Self::StateType) -> f32;

  fn is_goal_state(&self, state: &Self::StateType) -> bool;
}

/// A state reached during the search, along with how it was reached.
struct Visit<ProblemType: AStarProblem> {
  /// The total cost from the initial state.
  cost: f32,
  state: ProblemType::StateType,
  /// The visit this one was reached from and the action that was taken.
  /// `None` for the initial state.
  parent: Option<(usize, ProblemType::ActionType)>,
}

/// An entry in the open set, ordered by its estimated total cost.
struct OpenEntry {
  cost: f32,
  /// `cost` plus the heuristic of the visit's state.
  estimate: f32,
  visit: usize,
}

impl PartialEq for OpenEntry {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for OpenEntry {
  fn cmp(&self, other: &Self) -> Ordering {
    // Among equal estimates, prefer the entry that got further.
    self
      .estimate
      .total_cmp(&other.estimate)
      .then_with(|| other.cost.total_cmp(&self.cost))
  }
}

/// Counters describing how much work a search did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PathStats {
  /// The number of open entries that were expanded. A state may be expanded
  /// more than once if a cheaper way to it turns up later.
  pub(crate) explored_nodes: u32,
  /// Whether the search stopped because it hit its exploration limit.
  pub(crate) reached_limit: bool,
}

#[derive(Debug)]
pub(crate) struct PathResult<ActionType> {
  pub(crate) stats: PathStats,
  /// The actions leading from the initial state to the goal, in order.
  pub(crate) path: Vec<ActionType>,
  pub(crate) cost: f32,
}

/// The bookkeeping of a single search.
struct Search<'a, ProblemType: AStarProblem> {
  problem: &'a ProblemType,
  visits: Vec<Visit<ProblemType>>,
  open: BinaryHeap<Reverse<OpenEntry>>,
  /// The lowest estimate queued so far for each state.
  best_estimates: HashMap<ProblemType::StateType, f32>,
}

impl<'a, ProblemType: AStarProblem> Search<'a, ProblemType> {
  fn new(problem: &'a ProblemType) -> Self {
    Self {
      problem,
      visits: Vec::new(),
      open: BinaryHeap::new(),
      best_estimates: HashMap::new(),
    }
  }

  /// Queues `visit` unless its state is already queued with an estimate at
  /// least as good.
  fn push(&mut self, visit: Visit<ProblemType>) {
    let estimate = visit.cost + self.problem.heuristic(&visit.state);
    let best =
      self.best_estimates.entry(visit.state.clone()).or_insert(f32::INFINITY);
    if *best <= estimate {
      return;
    }
    *best = estimate;
    self.open.push(Reverse(OpenEntry {
      cost: visit.cost,
      estimate,
      visit: self.visits.len(),
    }));
    self.visits.push(visit);
  }

  /// Whether a better entry for the state of `entry` has been queued since
  /// `entry` was.
  fn is_stale(&self, entry: &OpenEntry) -> bool {
    let state = &self.visits[entry.visit].state;
    self.best_estimates.get(state).is_some_and(|&best| best < entry.estimate)
  }

  /// The actions taken to reach the visit at `index`.
  fn actions_to(mut self, mut index: usize) -> Vec<ProblemType::ActionType> {
    let mut actions = Vec::new();
    while let Some((parent, action)) = self.visits[index].parent.take() {
      actions.push(action);
      index = parent;
    }
    actions.reverse();
    actions
  }
}

/// Searches `problem` for the cheapest path from the initial state to a goal
/// state. Gives up after expanding `max_explored_nodes` entries. On failure,
/// returns the stats of the search.
pub(crate) fn find_path<ProblemType: AStarProblem>(
  problem: &ProblemType,
  max_explored_nodes: u32,
) -> Result<PathResult<ProblemType::ActionType>, PathStats> {
  let mut stats = PathStats { explored_nodes: 0, reached_limit: false };
  let mut search = Search::new(problem);
  search.push(Visit {
    cost: 0.0,
    state: problem.initial_state(),
    parent: None,
  });

  while let Some(Reverse(entry)) = search.open.pop() {
    if search.is_stale(&entry) {
      continue;
    }
    if stats.explored_nodes >= max_explored_nodes {
      stats.reached_limit = true;
      return Err(stats);
    }
    stats.explored_nodes += 1;

    let state = &search.visits[entry.visit].state;
    if problem.is_goal_state(state) {
      return Ok(PathResult {
        stats,
        cost: entry.cost,
        path: search.actions_to(entry.visit),
      });
    }

    for (action_cost, action, next) in problem.successors(state) {
      search.push(Visit {
        cost: entry.cost + action_cost,
        state: next,
        parent: Some((entry.visit, action)),
      });
    }
  }

  Err(stats)
}

#[cfg(test)]
#[path = "astar_test.rs"]
mod test;
