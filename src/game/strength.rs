use std::{
    cmp::Reverse,
    fmt,
    str::FromStr,
};

use iota::iota;
use more_asserts::assert_ge;

use super::card::{
    rank_ch,
    Card,
};

/*
 * A hand's strength packs into a u32 as
 *     <category> <rank> * 5
 * with 4 bits per field, the category at the MSB. The cards that define the
 * category come first, kickers after, each slice sorted by rank, so
 * comparing two strengths as integers compares the hands. For the 5-high
 * straight the ace sits in the last rank slot.
 */
const RANK_BITS: u32 = 4;
const CATEGORY_SHIFT: u32 = RANK_BITS * 5;
const CATEGORY_MASK: u32 = !0 << CATEGORY_SHIFT;
const RANK_MASK: u32 = 0b1111;

type Category = u32;

iota! {
    const HIGH_CARD: Category = iota << CATEGORY_SHIFT;
        , ONE_PAIR
        , TWO_PAIR
        , THREE_OF_KIND
        , STRAIGHT
        , FLUSH
        , FULL_HOUSE
        , FOUR_OF_KIND
        , STRAIGHT_FLUSH
}

fn category_name(c: Category) -> &'static str {
    match c {
        HIGH_CARD => "High card",
        ONE_PAIR => "One pair",
        TWO_PAIR => "Two pair",
        THREE_OF_KIND => "Three of a kind",
        STRAIGHT => "Straight",
        FLUSH => "Flush",
        FULL_HOUSE => "Full house",
        FOUR_OF_KIND => "Four of a kind",
        STRAIGHT_FLUSH => "Straight flush",
        _ => "Err hand",
    }
}

/// Comparable value of a player's best five-card hand. Greater is stronger.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Strength {
    value: u32,
}

impl Strength {
    fn new(category: Category, cards: &[Card]) -> Strength {
        let mut value = category;
        let mut sht = RANK_BITS * 5;
        for card in cards.iter().take(5) {
            sht -= RANK_BITS;
            value |= u32::from(card.rank) << sht;
        }
        Strength {
            value,
        }
    }

    fn category(self) -> Category {
        self.value & CATEGORY_MASK
    }

    fn promoted(self, category: Category) -> Strength {
        Strength {
            value: (self.value & !CATEGORY_MASK) | category,
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rs = String::new();
        for i in 0..5 {
            let shift = RANK_BITS * (4 - i);
            let rank = ((self.value >> shift) & RANK_MASK) as u8;
            rs.push(rank_ch(rank));
        }
        write!(f, "{}-{}", category_name(self.category()), rs)
    }
}

impl fmt::Debug for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for Strength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(strength_of(&super::card::parse_cards(s)))
    }
}

/// Best five-card strength over hole cards plus the visible board.
pub fn evaluate(hole: &[Card], board: &[Card]) -> Strength {
    let cards: Vec<Card> = hole.iter().chain(board).copied().collect();
    strength_of(&cards)
}

pub fn strength_of(cards: &[Card]) -> Strength {
    assert_ge!(cards.len(), 5, "Too few cards to evaluate: {:?}", cards);
    let by_rank = sorted_by_rank(cards);
    let suit_groups = group_by_suit(&by_rank);
    let rank_groups = group_by_rank(&by_rank);

    straight_flush(&suit_groups)
        .or_else(|| four_of_kind(&rank_groups))
        .or_else(|| full_house(&rank_groups))
        .or_else(|| flush(&suit_groups))
        .or_else(|| straight(&wheel_extended(&by_rank)))
        .or_else(|| three_of_kind(&rank_groups))
        .or_else(|| two_pair(&rank_groups))
        .or_else(|| one_pair(&rank_groups))
        .unwrap_or_else(|| Strength::new(HIGH_CARD, &by_rank))
}

fn sorted_by_rank(cards: &[Card]) -> Vec<Card> {
    let mut sorted = cards.to_vec();
    sorted.sort_by(|a, b| b.rank.cmp(&a.rank));
    sorted
}

// Repeats the aces after the deuce so a single descending scan can find the
// 5-4-3-2-A straight.
fn wheel_extended(by_rank: &[Card]) -> Vec<Card> {
    if by_rank.is_empty() || by_rank[0].rank != 14 || by_rank.last().unwrap().rank != 2 {
        return by_rank.to_vec();
    }
    let aces = by_rank.iter().filter(|c| c.rank == 14);
    by_rank.iter().chain(aces).copied().collect()
}

/*
 * Groups cards of equal rank, largest group first; equally large groups stay
 * in descending rank order. The input must already be sorted by rank.
 */
fn group_by_rank(by_rank: &[Card]) -> Vec<Vec<Card>> {
    let mut groups: Vec<Vec<Card>> = vec![];
    for &card in by_rank {
        let extends = groups.last().map_or(false, |g| g[0].rank == card.rank);
        if extends {
            groups.last_mut().unwrap().push(card);
        } else {
            groups.push(vec![card]);
        }
    }
    groups.sort_by_key(|g| Reverse(g.len()));
    groups
}

fn group_by_suit(by_rank: &[Card]) -> Vec<Vec<Card>> {
    let mut groups: Vec<Vec<Card>> = vec![vec![], vec![], vec![], vec![]];
    for &card in by_rank {
        groups[card.suit as usize].push(card);
    }
    groups.sort_by_key(|g| Reverse(g.len()));
    groups
}

fn flatten_sorted(groups: &[Vec<Card>]) -> Vec<Card> {
    let flat: Vec<Card> = groups.iter().flatten().copied().collect();
    sorted_by_rank(&flat)
}

fn straight_flush(suit_groups: &[Vec<Card>]) -> Option<Strength> {
    if suit_groups[0].len() < 5 {
        return None;
    }
    straight(&wheel_extended(&suit_groups[0])).map(|s| s.promoted(STRAIGHT_FLUSH))
}

fn four_of_kind(rank_groups: &[Vec<Card>]) -> Option<Strength> {
    if rank_groups[0].len() != 4 {
        return None;
    }
    let mut cs = rank_groups[0].clone();
    cs.push(flatten_sorted(&rank_groups[1..])[0]);
    Some(Strength::new(FOUR_OF_KIND, &cs))
}

fn full_house(rank_groups: &[Vec<Card>]) -> Option<Strength> {
    if rank_groups.len() < 2 || rank_groups[0].len() < 3 || rank_groups[1].len() < 2 {
        return None;
    }
    let three = rank_groups[0].iter().take(3);
    let two = rank_groups[1].iter().take(2);
    Some(Strength::new(FULL_HOUSE, &three.chain(two).copied().collect::<Vec<_>>()))
}

fn flush(suit_groups: &[Vec<Card>]) -> Option<Strength> {
    if suit_groups[0].len() < 5 {
        return None;
    }
    Some(Strength::new(FLUSH, &suit_groups[0]))
}

fn straight(cards: &[Card]) -> Option<Strength> {
    let mut run: Vec<Card> = Vec::with_capacity(5);
    for &card in cards {
        if let Some(&last) = run.last() {
            if last.rank == card.rank {
                continue;
            }
            let connects = last.rank == card.rank + 1 || (last.rank == 2 && card.rank == 14);
            if !connects {
                run.clear();
            }
        }
        run.push(card);
        if run.len() == 5 {
            return Some(Strength::new(STRAIGHT, &run));
        }
    }
    None
}

fn three_of_kind(rank_groups: &[Vec<Card>]) -> Option<Strength> {
    if rank_groups[0].len() != 3 {
        return None;
    }
    let mut cs = rank_groups[0].clone();
    cs.extend(flatten_sorted(&rank_groups[1..]));
    Some(Strength::new(THREE_OF_KIND, &cs))
}

fn two_pair(rank_groups: &[Vec<Card>]) -> Option<Strength> {
    if rank_groups.len() < 2 || rank_groups[0].len() != 2 || rank_groups[1].len() != 2 {
        return None;
    }
    let mut cs: Vec<Card> = rank_groups[..2].iter().flatten().copied().collect();
    cs.push(flatten_sorted(&rank_groups[2..])[0]);
    Some(Strength::new(TWO_PAIR, &cs))
}

fn one_pair(rank_groups: &[Vec<Card>]) -> Option<Strength> {
    if rank_groups[0].len() != 2 {
        return None;
    }
    let mut cs = rank_groups[0].clone();
    cs.extend(flatten_sorted(&rank_groups[1..]));
    Some(Strength::new(ONE_PAIR, &cs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::parse_cards;

    fn check_category(category: Category, txt: &str) {
        let strength: Strength = txt.parse().unwrap();
        assert_eq!(
            category,
            strength.category(),
            "\nExpected(left): {}\nActual(right): {} ({})",
            category_name(category),
            category_name(strength.category()),
            txt
        );
    }

    fn hand_eq(a: &str, b: &str) {
        let sa: Strength = a.parse().unwrap();
        let sb: Strength = b.parse().unwrap();
        assert_eq!(sa, sb, "\nExpected {} == {}", sa, sb);
    }

    fn hand_gt(a: &str, b: &str) {
        let sa: Strength = a.parse().unwrap();
        let sb: Strength = b.parse().unwrap();
        assert!(sa > sb, "\nExpected {}({}) is greater than {}({})", sa, a, sb, b);
    }

    #[test]
    fn test_straight_flush() {
        check_category(STRAIGHT_FLUSH, "Ah Kh Qh Jh Th");
        check_category(STRAIGHT_FLUSH, "Ah Kh Qh Jh Th 8s 7s");

        // Duplicated Q.
        check_category(STRAIGHT_FLUSH, "Kh Qh Qs Jh Th 9h 8h");

        // The wheel.
        check_category(STRAIGHT_FLUSH, "5h 4h 3h 2h Ah Kh Qh");
    }

    #[test]
    fn test_four_of_kind() {
        check_category(FOUR_OF_KIND, "Ah Ad Ac As Kc Kd 8h");

        // Quads win over the full house reading of the same cards.
        check_category(FOUR_OF_KIND, "Kh Kd Kc Ks Qc Qd Qh");

        // Kicker is the best of the remaining cards.
        hand_eq("Ah Kh Kd Kc Ks Qc Qd", "Ah Kh Kd Kc Ks");
        hand_eq("3h Kh Kd Kc Ks Qc Qd", "Qh Kh Kd Kc Ks");
    }

    #[test]
    fn test_full_house() {
        check_category(FULL_HOUSE, "Ah As Ac Ks Kc Kd 8h");
        check_category(FULL_HOUSE, "Ah As Ac Ks Kc 8h 7s");

        // Side cards beyond the five never count.
        hand_eq("Ah As Ac 8s 8c Jh 5s", "Ah As Ac 8s 8c 6h 5s");
        hand_gt("9h 9s Ah As Ac 8s 8c", "9h 5s Ah As Ac 8s 8c");
    }

    #[test]
    fn test_flush() {
        let nut = "Ah Th 9h 8h 7h Qs Tc";
        let weak = "5h 2h 9h 8h 7h Qs Tc";
        check_category(FLUSH, nut);
        check_category(FLUSH, weak);
        hand_gt(nut, weak);

        // Six of a suit: the best five play.
        let with_a = "Ah 2h 9h 8h 7h Qh Th";
        let with_t = "5h 2h 9h 8h 7h Qh Th";
        check_category(FLUSH, with_a);
        hand_gt(with_a, with_t);
    }

    #[test]
    fn test_straight() {
        check_category(STRAIGHT, "Ah Kh Qd Jh Th 8d 7c");
        check_category(STRAIGHT, "Ad Ac Kh Qd Jh Th 8d");
        check_category(STRAIGHT, "Ah Kh Qd Qd Jh Th 8d");
        check_category(STRAIGHT, "5h 5s 5d 4h 3h 2d Ah");

        // Shuffled input.
        check_category(STRAIGHT, "Qd 8d Jh Th Kh 7h 9d");
    }

    #[test]
    fn test_straight_ordering() {
        let nut = "Ah Kh Qd Jh Th 8d 7s";
        let middle = "Qd Jh Th 9h 8d 7h 3s";
        let wheel = "5h 5s 5d 4h 3h 2d Ah";
        hand_gt(nut, middle);
        hand_gt(middle, wheel);

        let high = "7s 5d Ah 3d 6h 8s 4c";
        let low = "2s 5h Ah 3d 6h 8s 4c";
        check_category(STRAIGHT, high);
        check_category(STRAIGHT, low);
        hand_gt(high, low);
    }

    #[test]
    fn test_three_of_kind() {
        check_category(THREE_OF_KIND, "Ah Ad Kh Qd Th As 7c");
        check_category(THREE_OF_KIND, "Ah Kd Qc 9d Th As Ad");
    }

    #[test]
    fn test_two_pair() {
        check_category(TWO_PAIR, "Ah Ad Kh Kd Th 8h 7c");
        check_category(TWO_PAIR, "Ah Th 8h Td Ad");
    }

    #[test]
    fn test_two_pair_kicker() {
        hand_gt("Ah 3d Kh Kd Th 8h 7c", "Jh 4d Kh Kd Ts 8h 7c");

        // With three pairs the kicker may come from the lowest pair.
        hand_eq("Ah TdTh 8d8c 5h5s", "Ah TdTh 8d8c");
        hand_eq("3h TdTh 8d8c 5h5s", "5h TdTh 8d8c");
    }

    #[test]
    fn test_one_pair() {
        check_category(ONE_PAIR, "Ah Ad Kh Js Ts 8h 7h");
        check_category(ONE_PAIR, "Ah Th 8h 7h Ad");
    }

    #[test]
    fn test_high_card() {
        check_category(HIGH_CARD, "Ah Kc Js Th 8c 7s 5h");
        check_category(HIGH_CARD, "5h 8h 7d Kc As");

        // Four in a row is not a straight.
        check_category(HIGH_CARD, "9h 8s 4h 3h 2d Ah Kd");
    }

    #[test]
    fn test_category_ladder() {
        hand_gt("Kh Kd Qh Jh Th", "Ah Kd Qh 5h 9h");
        hand_gt("Ah Kd Qh 5h 9h", "Qh 5d 9h 7h 4h");
        hand_gt("Ah Ad Kh Kd 2c", "Ah Ad Kh Qd 2c");
        hand_gt("2h 3h 4h 5h 6h", "Ah Ad Ac As Kc");
    }

    #[test]
    fn test_evaluate_uses_hole_and_board() {
        let hole = parse_cards("AhAd");
        let board = parse_cards("As 7c 8d 9h Kc");
        check_category(THREE_OF_KIND, "Ah Ad As 7c 8d 9h Kc");
        assert_eq!(strength_of(&parse_cards("AhAdAs7c8d9hKc")), evaluate(&hole, &board));
    }

    #[test]
    #[should_panic]
    fn test_too_few_cards() {
        strength_of(&parse_cards("AhAd"));
    }
}
