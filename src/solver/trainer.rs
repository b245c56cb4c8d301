use std::{
    collections::HashMap,
    path::Path,
    time::{
        Duration,
        Instant,
    },
};

use anyhow::Result;
use log::info;
use more_asserts::assert_gt;
use rand::{
    Rng,
    SeedableRng,
};
use wyhash::WyRng;

use super::{
    model,
    node::Node,
};
use crate::{
    abstraction::Abstraction,
    game::{
        bundle::CardBundle,
        rule::Seat,
        state::{
            Action,
            InfoSet,
        },
    },
};

const INITIAL_REACH_PROB: f64 = 1.0;
const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

// Cumulative sampling can fail when rounding leaves the total probability
// mass marginally under the drawn value; redraw a bounded number of times.
const MAX_SAMPLE_RETRIES: usize = 16;

/// Where training deals come from: real shuffles scored through the hand
/// abstraction, or the fast synthetic bucket walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealSource {
    Sampled,
    Synthetic,
}

/// Chance-sampling CFR over the deal tree. One table keyed by info-set
/// encoding holds each cell's cumulative regrets and strategy mass; the
/// average strategy read from it converges towards equilibrium as
/// iterations accumulate.
pub struct Trainer {
    abstraction: Abstraction,
    nodes: HashMap<String, Node>,
    rng: WyRng,
}

impl Trainer {
    pub fn new(seed: u64) -> Trainer {
        Trainer {
            abstraction: Abstraction::default(),
            nodes: HashMap::new(),
            rng: WyRng::seed_from_u64(seed),
        }
    }

    /// Restores a trainer from a saved model; training continues additively.
    pub fn load(path: &Path, seed: u64) -> Result<Trainer> {
        Ok(Trainer {
            abstraction: Abstraction::default(),
            nodes: model::load(path)?,
            rng: WyRng::seed_from_u64(seed),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        model::save(path, &self.nodes)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Runs `iterations` deals, descending once per seat on each of them.
    pub fn train(&mut self, iterations: usize, source: DealSource) {
        let started = Instant::now();
        let mut last_report = Instant::now();

        for i in 0..iterations {
            let bundle = match source {
                DealSource::Sampled => CardBundle::deal(&mut self.rng, &self.abstraction),
                DealSource::Synthetic => CardBundle::synthetic(&mut self.rng),
            };
            let root = InfoSet::root(&bundle);
            for trainee in Seat::ALL {
                self.cfr(&root, trainee, INITIAL_REACH_PROB, INITIAL_REACH_PROB);
            }

            if last_report.elapsed() > PROGRESS_INTERVAL {
                last_report = Instant::now();
                info!("iteration {:>8} of {}: {} info sets", i + 1, iterations, self.nodes.len());
            }
        }

        let elapsed = Duration::from_millis(started.elapsed().as_millis() as u64);
        info!(
            "trained {} iterations in {}: {} info sets",
            iterations,
            humantime::format_duration(elapsed),
            self.nodes.len()
        );
    }

    /// One descent. Returns the expected utility of the node for `trainee`
    /// under the current strategies, updating the trainee's regrets and
    /// average-strategy mass on every node where they act.
    fn cfr(&mut self, info_set: &InfoSet, trainee: Seat, sb_prob: f64, bb_prob: f64) -> f64 {
        if info_set.is_terminal() {
            return f64::from(info_set.utility(trainee));
        }
        if info_set.is_chance() {
            // The deal was fixed when the bundle was drawn, so a chance node
            // has exactly one outcome and the reach probabilities carry over.
            return self.cfr(&info_set.play(Action::Chance), trainee, sb_prob, bb_prob);
        }

        let encoding = info_set.encoding();
        let seat = info_set.to_move();

        let node = self
            .nodes
            .entry(encoding.clone())
            .or_insert_with(|| Node::new(info_set.actions()));
        let actions = node.actions().to_vec();
        let strategy = node.regret_matching();
        assert_gt!(actions.len(), 0);

        let mut action_utilities = vec![0.0; actions.len()];
        let mut utility = 0.0;
        for (i, &action) in actions.iter().enumerate() {
            let child = info_set.play(action);
            action_utilities[i] = match seat {
                Seat::SmallBlind => {
                    self.cfr(&child, trainee, strategy[i] * sb_prob, bb_prob)
                }
                Seat::BigBlind => {
                    self.cfr(&child, trainee, sb_prob, strategy[i] * bb_prob)
                }
            };
            utility += strategy[i] * action_utilities[i];
        }

        if seat == trainee {
            let (reach_prob, counterfactual_prob) = match seat {
                Seat::SmallBlind => (sb_prob, bb_prob),
                Seat::BigBlind => (bb_prob, sb_prob),
            };
            let node = self.nodes.get_mut(&encoding).unwrap();
            for (i, action_utility) in action_utilities.iter().enumerate() {
                node.add_regret(i, counterfactual_prob * (action_utility - utility));
                node.add_strategy(i, reach_prob * strategy[i]);
            }
        }

        utility
    }

    /// Samples an action from the average strategy at `info_set` and
    /// returns the child it leads to.
    pub fn play<'a>(&mut self, info_set: &InfoSet<'a>) -> InfoSet<'a> {
        let actions = info_set.actions();
        assert!(!actions.is_empty(), "cannot play at a terminal node");
        let strategy = self.average_strategy(&info_set.encoding(), actions.len());

        for _ in 0..MAX_SAMPLE_RETRIES {
            let draw: f64 = self.rng.gen();
            let mut mass = 0.0;
            for (i, &action) in actions.iter().enumerate() {
                mass += strategy[i];
                if mass >= draw {
                    return info_set.play(action);
                }
            }
        }
        info_set.play(*actions.last().unwrap())
    }

    fn average_strategy(&self, encoding: &str, actions_len: usize) -> Vec<f64> {
        match self.nodes.get(encoding) {
            Some(node) => node.average_strategy(),
            None => vec![1.0 / actions_len as f64; actions_len],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        card::parse_cards,
        state::Action::{
            Chance,
            Raise,
        },
    };

    fn bundle() -> CardBundle {
        CardBundle::fixed(
            [
                parse_cards("AhAd").try_into().unwrap(),
                parse_cards("KhKd").try_into().unwrap(),
            ],
            parse_cards("2c5c8d9hJs").try_into().unwrap(),
            5,
            Seat::SmallBlind,
        )
    }

    fn assert_simplex(strategy: &[f64]) {
        let sum: f64 = strategy.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "not a distribution: {:?}", strategy);
        for p in strategy {
            assert!(*p >= 0.0);
        }
    }

    #[test]
    fn test_one_synthetic_iteration_populates_the_tables() {
        let mut trainer = Trainer::new(42);
        trainer.train(1, DealSource::Synthetic);

        assert_gt!(trainer.node_count(), 0);

        let mut visited = 0;
        for node in trainer.nodes.values() {
            assert_simplex(&node.regret_matching());
            assert_simplex(&node.average_strategy());
            if node.strategy_sum().iter().sum::<f64>() > 0.0 {
                visited += 1;
            }
        }
        // Both trainees walked the same deal, so both must have deposited
        // strategy mass somewhere.
        assert_gt!(visited, 0);
    }

    #[test]
    fn test_one_sampled_iteration_populates_the_tables() {
        let mut trainer = Trainer::new(42);
        trainer.train(1, DealSource::Sampled);
        assert_gt!(trainer.node_count(), 0);
    }

    #[test]
    fn test_training_is_reproducible_under_a_seed() {
        let mut a = Trainer::new(7);
        let mut b = Trainer::new(7);
        a.train(3, DealSource::Synthetic);
        b.train(3, DealSource::Synthetic);

        assert_eq!(a.nodes, b.nodes);
    }

    #[test]
    fn test_cfr_populates_the_small_blind_opening_cell() {
        let bundle = bundle();
        let mut trainer = Trainer::new(11);
        let root = InfoSet::root(&bundle);
        for trainee in Seat::ALL {
            trainer.cfr(&root, trainee, 1.0, 1.0);
        }

        // The small blind's first decision lies on every descent, so its
        // cell exists and carries strategy mass from the trainee pass.
        let first = InfoSet::from_history(&[Chance], &bundle);
        let cell = trainer.nodes.get(&first.encoding()).unwrap();
        assert_eq!(first.actions(), cell.actions());
        assert_gt!(cell.strategy_sum().iter().sum::<f64>(), 0.0);
        assert_simplex(&cell.average_strategy());
    }

    #[test]
    fn test_repeated_training_punishes_folding_a_winning_hand() {
        // The fixed deal always goes to the small blind, so folding the
        // small blind's first decision can only lose; its average strategy
        // should starve the fold as regrets accumulate.
        let bundle = bundle();
        let mut trainer = Trainer::new(29);
        let root = InfoSet::root(&bundle);
        for _ in 0..200 {
            for trainee in Seat::ALL {
                trainer.cfr(&root, trainee, 1.0, 1.0);
            }
        }

        let first = InfoSet::from_history(&[Chance], &bundle);
        let cell = trainer.nodes.get(&first.encoding()).unwrap();
        let average = cell.average_strategy();
        let fold_index =
            cell.actions().iter().position(|&a| a == Action::Fold).unwrap();
        assert!(average[fold_index] < 0.1, "fold kept weight: {:?}", average);
    }

    #[test]
    fn test_play_from_an_untrained_table_is_uniformly_legal() {
        let bundle = bundle();
        let mut trainer = Trainer::new(13);
        let node = InfoSet::from_history(&[Chance], &bundle);

        for _ in 0..20 {
            let child = trainer.play(&node);
            assert_eq!(2, child.history().len());
            assert!(node.actions().contains(&child.last_action().unwrap()));
        }
    }

    #[test]
    fn test_play_follows_a_degenerate_average_strategy() {
        let bundle = bundle();
        let mut trainer = Trainer::new(17);
        let node = InfoSet::from_history(&[Chance], &bundle);

        let mut cell = Node::new(node.actions());
        cell.add_strategy(0, 1.0);
        trainer.nodes.insert(node.encoding(), cell);

        for _ in 0..20 {
            let child = trainer.play(&node);
            assert_eq!(Some(Raise), child.last_action());
        }
    }

    #[test]
    #[should_panic(expected = "terminal")]
    fn test_play_at_a_terminal_node_panics() {
        let bundle = bundle();
        let mut trainer = Trainer::new(19);
        let node = InfoSet::from_history(&[Chance, Action::Fold], &bundle);
        trainer.play(&node);
    }

    #[test]
    fn test_round_trip_through_a_model_file() {
        let path = std::env::temp_dir()
            .join(format!("hulth-trainer-{}.json", std::process::id()));

        let mut trainer = Trainer::new(23);
        trainer.train(2, DealSource::Synthetic);
        trainer.save(&path).unwrap();

        let restored = Trainer::load(&path, 23).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(trainer.nodes, restored.nodes);
    }
}
