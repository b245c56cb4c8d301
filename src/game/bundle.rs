use std::cmp::Ordering;

use rand::Rng;
use rand_distr::{
    Distribution,
    WeightedIndex,
};

use super::{
    card::Card,
    deck::Deck,
    rule::{
        Seat,
        MAX_BUCKETS,
    },
    stage::Stage,
    strength::{
        self,
        Strength,
    },
};
use crate::abstraction::Abstraction;

/// Cards consumed by one deal: two hole cards per seat plus the board.
pub const DEAL_CARDS: usize = 9;

// Per-street bucket drift for synthetic deals, offsets {-1, 0, +1, +2}
// weighted 1:3:2:1.
const DRIFT_STEPS: [i32; 4] = [-1, 0, 1, 2];
const DRIFT_WEIGHTS: [u32; 4] = [1, 3, 2, 1];

/// Everything a single deal pins down: both hands, the full board, each
/// seat's bucket per stage, and the showdown result. Immutable once dealt;
/// the info-set tree of the deal borrows it.
#[derive(Debug, Clone)]
pub struct CardBundle {
    hands: [[Card; 2]; 2],
    board: [Card; 5],
    buckets: [[usize; Stage::COUNT]; 2],
    strengths: [Strength; 2],
    winner: Seat,
}

impl CardBundle {
    /// Deals from a fresh shuffled deck and computes every bucket up front.
    pub fn deal<R: Rng>(rng: &mut R, abstraction: &Abstraction) -> CardBundle {
        let mut deck = Deck::default();
        deck.shuffle_first_n(rng, DEAL_CARDS);
        Self::from_deck(&mut deck, rng, abstraction)
    }

    pub fn from_deck<R: Rng>(deck: &mut Deck, rng: &mut R, abstraction: &Abstraction) -> CardBundle {
        let (hands, board) = draw_deal(deck);

        let mut buckets = [[0; Stage::COUNT]; 2];
        for seat in Seat::ALL {
            for stage in Stage::DEALT {
                buckets[seat.index()][stage as usize] =
                    abstraction.bucket(rng, hands[seat.index()], &board[..stage.board_cards()]);
            }
            buckets[seat.index()][Stage::Showdown as usize] =
                buckets[seat.index()][Stage::River as usize];
        }

        let strengths = [
            strength::evaluate(&hands[Seat::SmallBlind.index()], &board),
            strength::evaluate(&hands[Seat::BigBlind.index()], &board),
        ];
        // Fixed tie-break: an even showdown goes to the small blind.
        let winner = if strengths[0] >= strengths[1] {
            Seat::SmallBlind
        } else {
            Seat::BigBlind
        };

        CardBundle {
            hands,
            board,
            buckets,
            strengths,
            winner,
        }
    }

    /// A fast stand-in for a real deal: buckets are sampled instead of
    /// computed, starting uniform pre-flop and drifting street by street,
    /// and the showdown goes to the seat with the better final bucket.
    pub fn synthetic<R: Rng>(rng: &mut R) -> CardBundle {
        let mut deck = Deck::default();
        deck.shuffle_first_n(rng, DEAL_CARDS);
        let (hands, board) = draw_deal(&mut deck);

        let drift = WeightedIndex::new(DRIFT_WEIGHTS).unwrap_or_else(|e| {
            panic!("Invalid drift weights {:?}: {}", DRIFT_WEIGHTS, e);
        });

        let mut buckets = [[0; Stage::COUNT]; 2];
        for seat in Seat::ALL {
            let mut bucket = rng.gen_range(0..MAX_BUCKETS);
            buckets[seat.index()][Stage::Preflop as usize] = bucket;
            for stage in [Stage::Flop, Stage::Turn, Stage::River] {
                let step = DRIFT_STEPS[drift.sample(rng)];
                bucket = (bucket as i32 + step).clamp(0, MAX_BUCKETS as i32 - 1) as usize;
                buckets[seat.index()][stage as usize] = bucket;
            }
            buckets[seat.index()][Stage::Showdown as usize] = bucket;
        }

        let sb_final = buckets[Seat::SmallBlind.index()][Stage::Showdown as usize];
        let bb_final = buckets[Seat::BigBlind.index()][Stage::Showdown as usize];
        let winner = match sb_final.cmp(&bb_final) {
            Ordering::Greater => Seat::SmallBlind,
            Ordering::Less => Seat::BigBlind,
            Ordering::Equal => {
                if rng.gen() {
                    Seat::SmallBlind
                } else {
                    Seat::BigBlind
                }
            }
        };

        let strengths = [
            strength::evaluate(&hands[Seat::SmallBlind.index()], &board),
            strength::evaluate(&hands[Seat::BigBlind.index()], &board),
        ];

        CardBundle {
            hands,
            board,
            buckets,
            strengths,
            winner,
        }
    }

    pub fn hand(&self, seat: Seat) -> [Card; 2] {
        self.hands[seat.index()]
    }

    /// The board cards visible during `stage`.
    pub fn board(&self, stage: Stage) -> &[Card] {
        &self.board[..stage.board_cards()]
    }

    pub fn bucket(&self, seat: Seat, stage: Stage) -> usize {
        self.buckets[seat.index()][stage as usize]
    }

    pub fn strength(&self, seat: Seat) -> Strength {
        self.strengths[seat.index()]
    }

    pub fn winner(&self) -> Seat {
        self.winner
    }

    #[cfg(test)]
    pub fn fixed(hands: [[Card; 2]; 2], board: [Card; 5], bucket: usize, winner: Seat) -> CardBundle {
        CardBundle {
            hands,
            board,
            buckets: [[bucket; Stage::COUNT]; 2],
            strengths: [
                strength::evaluate(&hands[0], &board),
                strength::evaluate(&hands[1], &board),
            ],
            winner,
        }
    }
}

fn draw_deal(deck: &mut Deck) -> ([[Card; 2]; 2], [Card; 5]) {
    let hands = [[deck.draw(), deck.draw()], [deck.draw(), deck.draw()]];
    let board = [deck.draw(), deck.draw(), deck.draw(), deck.draw(), deck.draw()];
    (hands, board)
}
