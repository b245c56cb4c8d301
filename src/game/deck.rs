use std::fmt;

use rand::Rng;

use super::card::{
    Card,
    Suit,
    MAX_RANK,
    MIN_RANK,
};

pub fn all_cards() -> Vec<Card> {
    let mut cards = Vec::with_capacity(52);
    for suit in Suit::ALL {
        for rank in MIN_RANK..=MAX_RANK {
            cards.push(Card {
                rank,
                suit,
            });
        }
    }
    cards
}

pub struct Deck {
    pos: usize,
    cards: Vec<Card>,
}

impl Default for Deck {
    fn default() -> Deck {
        Deck {
            pos: 0,
            cards: all_cards(),
        }
    }
}

impl Deck {
    /// A deck holding every card except the given ones, in a fixed order.
    pub fn new_without(cs: &[Card]) -> Deck {
        Deck {
            pos: 0,
            cards: all_cards().into_iter().filter(|c| !cs.contains(c)).collect(),
        }
    }

    /// Puts the given cards on top of the deck, in order.
    pub fn cheat(top: &[Card]) -> Deck {
        let mut cards = top.to_vec();
        cards.extend(all_cards().into_iter().filter(|c| !top.contains(c)));
        Deck {
            pos: 0,
            cards,
        }
    }

    // Only the first n cards need shuffling; a deal never draws past them.
    pub fn shuffle_first_n<T: Rng>(&mut self, rng: &mut T, n: usize) {
        let last = self.cards.len();
        assert!(n < last);
        self.pos = 0;
        for i in 0..n {
            let frm = rng.gen_range(i..last);
            if i != frm {
                self.cards.swap(i, frm);
            }
        }
    }

    pub fn draw(&mut self) -> Card {
        let card = self.cards[self.pos];
        self.pos += 1;
        card
    }

    pub fn remaining(&self) -> &[Card] {
        &self.cards[self.pos..]
    }
}

impl fmt::Debug for Deck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Deck( pos: {:?}, cards: {:?})",
            self.pos,
            self.cards.iter().take(9).collect::<Vec<_>>()
        )
    }
}
