use more_asserts::assert_gt;

use crate::game::state::Action;

/// One table cell of the trainer, keyed by an info-set encoding: the legal
/// actions there plus the cumulative regret and strategy mass for each.
/// Regrets may go negative; strategy mass never does.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    actions: Vec<Action>,
    regret_sum: Vec<f64>,
    strategy_sum: Vec<f64>,
}

impl Node {
    pub fn new(actions: Vec<Action>) -> Node {
        assert_gt!(actions.len(), 0);
        let len = actions.len();
        Node {
            actions,
            regret_sum: vec![0.0; len],
            strategy_sum: vec![0.0; len],
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Current strategy by regret matching: positive regrets, normalised;
    /// uniform while no regret is positive.
    pub fn regret_matching(&self) -> Vec<f64> {
        let normalizing_sum: f64 = self.regret_sum.iter().filter(|v| **v > 0.0).sum();
        if normalizing_sum == 0.0 {
            return vec![1.0 / self.actions.len() as f64; self.actions.len()];
        }
        self.regret_sum.iter().map(|r| r.max(0.0) / normalizing_sum).collect()
    }

    /// Strategy averaged over all visits; this is what converges and what
    /// play-time sampling uses.
    pub fn average_strategy(&self) -> Vec<f64> {
        let normalizing_sum: f64 = self.strategy_sum.iter().sum();
        if normalizing_sum == 0.0 {
            return vec![1.0 / self.actions.len() as f64; self.actions.len()];
        }
        self.strategy_sum.iter().map(|s| s / normalizing_sum).collect()
    }

    pub fn add_regret(&mut self, action_index: usize, amount: f64) {
        self.regret_sum[action_index] += amount;
    }

    pub fn add_strategy(&mut self, action_index: usize, amount: f64) {
        self.strategy_sum[action_index] += amount;
    }

    pub(crate) fn regret_sum(&self) -> &[f64] {
        &self.regret_sum
    }

    pub(crate) fn strategy_sum(&self) -> &[f64] {
        &self.strategy_sum
    }

    pub(crate) fn from_sums(
        actions: Vec<Action>,
        regret_sum: Vec<f64>,
        strategy_sum: Vec<f64>,
    ) -> Node {
        assert_eq!(actions.len(), regret_sum.len());
        assert_eq!(actions.len(), strategy_sum.len());
        assert_gt!(actions.len(), 0);
        Node {
            actions,
            regret_sum,
            strategy_sum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Action::{
        Call,
        Fold,
        Raise,
    };

    fn assert_simplex(strategy: &[f64]) {
        let sum: f64 = strategy.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "not a distribution: {:?}", strategy);
        for p in strategy {
            assert!(*p >= 0.0);
        }
    }

    #[test]
    fn test_fresh_node_plays_uniformly() {
        let node = Node::new(vec![Raise, Call, Fold]);
        let strategy = node.regret_matching();
        assert_eq!(vec![1.0 / 3.0; 3], strategy);
        assert_simplex(&strategy);
        assert_simplex(&node.average_strategy());
    }

    #[test]
    fn test_regret_matching_follows_positive_regret() {
        let mut node = Node::new(vec![Raise, Call, Fold]);
        node.add_regret(0, 3.0);
        node.add_regret(1, 1.0);
        node.add_regret(2, -5.0);

        let strategy = node.regret_matching();
        assert_eq!(vec![0.75, 0.25, 0.0], strategy);
        assert_simplex(&strategy);
    }

    #[test]
    fn test_all_negative_regret_falls_back_to_uniform() {
        let mut node = Node::new(vec![Call, Fold]);
        node.add_regret(0, -1.0);
        node.add_regret(1, -2.0);

        assert_eq!(vec![0.5, 0.5], node.regret_matching());
    }

    #[test]
    fn test_average_strategy_normalises_visits() {
        let mut node = Node::new(vec![Raise, Call]);
        node.add_strategy(0, 0.2);
        node.add_strategy(1, 0.6);

        let average = node.average_strategy();
        assert!((average[0] - 0.25).abs() < 1e-9);
        assert!((average[1] - 0.75).abs() < 1e-9);
        assert_simplex(&average);
    }
}
