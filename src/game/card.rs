use std::{
    char,
    fmt,
    str,
};

pub type Rank = u8;

pub const MIN_RANK: Rank = 2;
pub const MAX_RANK: Rank = 14;

pub fn rank_ch(r: Rank) -> char {
    match r {
        10 => 'T',
        11 => 'J',
        12 => 'Q',
        13 => 'K',
        14 => 'A',
        x => (b'0' + x).into(),
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Suit {
    Spade,
    Club,
    Heart,
    Diamond,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spade, Suit::Club, Suit::Heart, Suit::Diamond];

    fn ch(self) -> char {
        match self {
            Suit::Spade => 's',
            Suit::Club => 'c',
            Suit::Heart => 'h',
            Suit::Diamond => 'd',
        }
    }
}

#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    /// Zero-based rank used by the pre-flop scoring formula: deuce is 0, ace is 12.
    pub fn rank_index(self) -> u8 {
        self.rank - MIN_RANK
    }
}

pub fn cards_to_str(cards: &[Card]) -> String {
    let mut s = String::with_capacity(cards.len() * 2);
    for card in cards {
        s.push(rank_ch(card.rank));
        s.push(card.suit.ch());
    }
    s
}

pub fn parse_cards(s: &str) -> Vec<Card> {
    let s = s.replace([' ', ','], "");
    assert_eq!(s.len() % 2, 0, "Given string is {}", s);

    let mut cards = Vec::with_capacity(s.len() / 2);
    let mut i = 0;
    while i < s.len() {
        cards.push(s[i..i + 2].parse().unwrap());
        i += 2;
    }
    cards
}

impl str::FromStr for Card {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cs = s.chars();
        let (rank, suit) = match (cs.next(), cs.next(), cs.next()) {
            (Some(r), Some(u), None) => (r, u),
            _ => return Err(format!("Bad card: {}", s)),
        };
        let rank = match rank {
            'T' => 10,
            'J' => 11,
            'Q' => 12,
            'K' => 13,
            'A' => 14,
            x if char::is_digit(x, 10) && x != '0' && x != '1' => x as u8 - b'0',
            _ => return Err(format!("Bad rank: {}", s)),
        };
        let suit = match suit {
            's' => Suit::Spade,
            'c' => Suit::Club,
            'h' => Suit::Heart,
            'd' => Suit::Diamond,
            _ => return Err(format!("Bad suit: {}", s)),
        };
        Ok(Card {
            rank,
            suit,
        })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}{}", rank_ch(self.rank), self.suit.ch())
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self)
    }
}
