use itertools::Itertools;
use more_asserts::{
    assert_gt,
    assert_lt,
};
use rand::{
    seq::SliceRandom,
    Rng,
};

use crate::game::{
    card::Card,
    deck::Deck,
    rule::MAX_BUCKETS,
    strength,
};

// The pre-flop score ranges over [-1, 20]; 20 is also the normalisation
// denominator the score is rescaled by.
const CHEN_MIN: f64 = -1.0;
const CHEN_RANGE: f64 = 20.0;

const CHEN_ACE: f64 = 10.0;
const CHEN_KING: f64 = 8.0;
const CHEN_QUEEN: f64 = 7.0;
const CHEN_JACK: f64 = 6.0;

// Keeps the potential ratios defined when a side of the contingency table
// is empty.
const POTENTIAL_EPSILON: f64 = 0.001;

// Share of board completions to examine, indexed by how many community
// cards are still undrawn.
const BOARD_SAMPLE_RATIOS: [f64; 3] = [1.0, 0.1, 0.005];

const AHEAD: usize = 0;
const TIED: usize = 1;
const BEHIND: usize = 2;

/// Collapses hole/board combinations into a small number of strategically
/// equivalent buckets, so that many deals share one strategy cell. Pre-flop
/// hands are scored with the Chen formula, later streets with effective
/// hand strength against every live opponent holding.
#[derive(Debug, Clone)]
pub struct Abstraction {
    buckets: usize,
}

impl Default for Abstraction {
    fn default() -> Abstraction {
        Abstraction::new(MAX_BUCKETS)
    }
}

impl Abstraction {
    pub fn new(buckets: usize) -> Abstraction {
        assert_gt!(buckets, 0);
        Abstraction {
            buckets,
        }
    }

    /// Bucket of `hole` against the board visible so far. Deterministic for
    /// a given RNG state.
    pub fn bucket<R: Rng>(&self, rng: &mut R, hole: [Card; 2], board: &[Card]) -> usize {
        let bucket = if board.is_empty() {
            self.hole_bucket(hole)
        } else {
            self.board_bucket(rng, hole, board)
        };
        assert_lt!(bucket, self.buckets);
        bucket
    }

    fn hole_bucket(&self, hole: [Card; 2]) -> usize {
        let mut score = chen_score(hole[0]).max(chen_score(hole[1]));

        if hole[0].suit == hole[1].suit {
            score += 2.0;
        }

        let gap = (i32::from(hole[0].rank) - i32::from(hole[1].rank)).abs();
        score = match gap {
            0 => score * 2.0,
            1 => score + 1.0,
            2 => score - 1.0,
            3 => score - 2.0,
            4 => score - 4.0,
            _ => score - 5.0,
        };

        let norm = (score.ceil() - CHEN_MIN) / CHEN_RANGE;
        let bucket = (norm * (self.buckets - 1) as f64).floor();
        bucket.clamp(0.0, (self.buckets - 1) as f64) as usize
    }

    fn board_bucket<R: Rng>(&self, rng: &mut R, hole: [Card; 2], board: &[Card]) -> usize {
        let ehs = self.effective_hand_strength(rng, hole, board);
        let bucket = (ehs * self.buckets as f64).floor() as usize;
        bucket.min(self.buckets - 1)
    }

    /// EHS = HS·(1 − Npot) + (1 − HS)·Ppot: the chance of being best now,
    /// discounted by the chance of falling behind and credited with the
    /// chance of catching up by the river.
    pub fn effective_hand_strength<R: Rng>(
        &self,
        rng: &mut R,
        hole: [Card; 2],
        board: &[Card],
    ) -> f64 {
        let hand_strength = self.hand_strength(hole, board);
        let (ppot, npot) = self.hand_potential(rng, hole, board);

        hand_strength * (1.0 - npot) + (1.0 - hand_strength) * ppot
    }

    fn hand_strength(&self, hole: [Card; 2], board: &[Card]) -> f64 {
        let ours = strength::evaluate(&hole, board);

        let mut known = board.to_vec();
        known.extend(hole);
        let live = Deck::new_without(&known);

        let (mut ahead, mut tied, mut behind) = (0.0, 0.0, 0.0);
        for opp in live.remaining().iter().copied().combinations(2) {
            let theirs = strength::evaluate(&opp, board);
            if ours > theirs {
                ahead += 1.0;
            } else if ours == theirs {
                tied += 1.0;
            } else {
                behind += 1.0;
            }
        }

        (ahead + tied / 2.0) / (ahead + tied + behind)
    }

    fn hand_potential<R: Rng>(&self, rng: &mut R, hole: [Card; 2], board: &[Card]) -> (f64, f64) {
        let mut table = [[0.0f64; 3]; 3];
        let mut totals = [0.0f64; 3];

        let ours = strength::evaluate(&hole, board);
        let undrawn = 5 - board.len();
        let ratio = BOARD_SAMPLE_RATIOS[undrawn];

        let mut known = board.to_vec();
        known.extend(hole);
        let live = Deck::new_without(&known);

        for opp in live.remaining().iter().copied().combinations(2) {
            let theirs = strength::evaluate(&opp, board);
            let now = if ours > theirs {
                AHEAD
            } else if ours == theirs {
                TIED
            } else {
                BEHIND
            };

            let rest: Vec<Card> =
                live.remaining().iter().copied().filter(|c| !opp.contains(c)).collect();
            let completions: Vec<Vec<Card>> =
                rest.iter().copied().combinations(undrawn).collect();
            let sampled = sample_ratio(rng, completions, ratio);

            for completion in sampled {
                totals[now] += 1.0;

                let mut full_board = board.to_vec();
                full_board.extend(completion);

                let our_best = strength::evaluate(&hole, &full_board);
                let their_best = strength::evaluate(&opp, &full_board);
                let later = if our_best > their_best {
                    AHEAD
                } else if our_best == their_best {
                    TIED
                } else {
                    BEHIND
                };
                table[now][later] += 1.0;
            }
        }

        let ppot = (table[BEHIND][AHEAD] + table[BEHIND][TIED] / 2.0 + table[TIED][AHEAD] / 2.0
            + POTENTIAL_EPSILON)
            / (totals[BEHIND] + totals[TIED] + POTENTIAL_EPSILON);
        let npot = (table[AHEAD][BEHIND] + table[TIED][BEHIND] / 2.0 + table[AHEAD][TIED] / 2.0
            + POTENTIAL_EPSILON)
            / (totals[AHEAD] + totals[TIED] + POTENTIAL_EPSILON);

        (ppot, npot)
    }
}

fn chen_score(card: Card) -> f64 {
    match card.rank {
        14 => CHEN_ACE,
        13 => CHEN_KING,
        12 => CHEN_QUEEN,
        11 => CHEN_JACK,
        r => f64::from(r) / 2.0,
    }
}

fn sample_ratio<R: Rng, T>(rng: &mut R, items: Vec<T>, ratio: f64) -> Vec<T> {
    if ratio >= 1.0 {
        return items;
    }
    let count = (items.len() as f64 * ratio) as usize;
    let mut sampled = items;
    sampled.shuffle(rng);
    sampled.truncate(count);
    sampled
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use rand::SeedableRng;
    use wyhash::WyRng;

    use super::*;
    use crate::game::{
        card::parse_cards,
        deck::all_cards,
    };

    fn hole(s: &str) -> [Card; 2] {
        parse_cards(s).try_into().unwrap()
    }

    #[test]
    fn test_chen_bucket_of_premium_pairs() {
        let abstraction = Abstraction::default();
        let mut rng = WyRng::seed_from_u64(1);

        // Pocket aces score 20, the formula's ceiling.
        assert_eq!(7, abstraction.bucket(&mut rng, hole("AhAd"), &[]));
        // Suited big slick: 10 + 2 suited + 1 connector = 13.
        assert_eq!(4, abstraction.bucket(&mut rng, hole("AhKh"), &[]));
        // The classic worst hand bottoms out below zero and clamps.
        assert_eq!(0, abstraction.bucket(&mut rng, hole("7c2d"), &[]));
    }

    #[test]
    fn test_chen_bucket_ordering() {
        let abstraction = Abstraction::default();
        let mut rng = WyRng::seed_from_u64(2);

        let aces = abstraction.bucket(&mut rng, hole("AhAd"), &[]);
        let suited_connector = abstraction.bucket(&mut rng, hole("8h9h"), &[]);
        let junk = abstraction.bucket(&mut rng, hole("2c9d"), &[]);

        assert!(aces > suited_connector);
        assert!(suited_connector > junk);
    }

    #[test]
    fn test_every_preflop_bucket_is_in_range() {
        let abstraction = Abstraction::default();
        let mut rng = WyRng::seed_from_u64(3);

        for pair in all_cards().into_iter().combinations(2) {
            let bucket = abstraction.bucket(&mut rng, [pair[0], pair[1]], &[]);
            assert!(bucket < MAX_BUCKETS);
        }
    }

    #[test]
    fn test_unbeatable_river_hand_takes_the_top_bucket() {
        let abstraction = Abstraction::default();
        let mut rng = WyRng::seed_from_u64(4);

        // A royal flush on a full board: ahead of all 1128 opponent hands,
        // and the river leaves no card to come.
        let bucket =
            abstraction.bucket(&mut rng, hole("AhKh"), &parse_cards("QhJhTh2c7d"));
        assert_eq!(MAX_BUCKETS - 1, bucket);
    }

    #[test]
    fn test_board_that_plays_for_everyone_is_a_coin_flip() {
        let abstraction = Abstraction::default();
        let mut rng = WyRng::seed_from_u64(5);

        // Broadway on the board, no flush possible: every showdown ties, so
        // EHS sits at exactly one half.
        let ehs = abstraction.effective_hand_strength(
            &mut rng,
            hole("2c3d"),
            &parse_cards("AhKhQsJsTc"),
        );
        assert!((ehs - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_flop_bucket_is_deterministic_under_a_seed() {
        let abstraction = Abstraction::default();
        let board = parse_cards("Qs7h2d");

        let a = abstraction.bucket(&mut WyRng::seed_from_u64(6), hole("AhQd"), &board);
        let b = abstraction.bucket(&mut WyRng::seed_from_u64(6), hole("AhQd"), &board);
        assert_eq!(a, b);
        assert!(a < MAX_BUCKETS);
    }
}
