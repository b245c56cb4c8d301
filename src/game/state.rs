use std::fmt;

use super::{
    bundle::CardBundle,
    rule::{
        Seat,
        BIG_BLIND_BET,
        MAX_RAISES_PER_STAGE,
        RAISE_AMOUNT,
        SMALL_BLIND_BET,
        START_MONEY,
    },
    stage::Stage,
};

/// Table key shared by every chance node: there is no decision to learn at
/// a card reveal, so they all collapse into one cell.
pub const CHANCE_ENCODING: &str = ".";

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Action {
    Raise,
    Call,
    Fold,
    Chance,
}

impl Action {
    /// Single-character form used in encodings and the model file.
    pub fn code(self) -> char {
        match self {
            Action::Raise => 'r',
            Action::Call => 'c',
            Action::Fold => 'f',
            Action::Chance => ':',
        }
    }

    pub fn from_code(code: char) -> Option<Action> {
        match code {
            'r' => Some(Action::Raise),
            'c' => Some(Action::Call),
            'f' => Some(Action::Fold),
            ':' => Some(Action::Chance),
            _ => None,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Action::Raise => "raise",
            Action::Call => "call/check",
            Action::Fold => "fold",
            Action::Chance => "deal",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

fn players_called(history: &[Action]) -> bool {
    let n = history.len();
    n >= 2 && history[n - 1] == Action::Call && history[n - 2] == Action::Call
}

/// A stage closes at every double call; the stage of a history is the number
/// of closed stages in it.
fn stage_of(history: &[Action]) -> Stage {
    let mut closed = 0;
    for i in 2..history.len() {
        if history[i] == Action::Call && history[i - 1] == Action::Call {
            closed += 1;
        }
    }
    Stage::from(closed)
}

/// Suffix of the history since (and including) the latest deal.
fn stage_line(history: &[Action]) -> &[Action] {
    let start = history.iter().rposition(|&a| a == Action::Chance).unwrap_or(0);
    &history[start..]
}

// The small blind opens every street; seats then alternate.
fn to_move(history: &[Action]) -> Seat {
    Seat::from_index((1 + stage_line(history).len()) % 2)
}

fn bets_of(history: &[Action]) -> [i32; 2] {
    let mut bets = [SMALL_BLIND_BET, BIG_BLIND_BET];
    let mut seat = Seat::SmallBlind;
    for &action in history {
        if action == Action::Chance {
            seat = Seat::SmallBlind;
            continue;
        }
        let opponent = seat.opponent();
        match action {
            Action::Raise => bets[seat.index()] = bets[opponent.index()] + RAISE_AMOUNT,
            Action::Call => bets[seat.index()] = bets[opponent.index()],
            Action::Fold | Action::Chance => {}
        }
        seat = opponent;
    }
    bets
}

/// A point between betting rounds: the next card reveal, or the showdown
/// once every round has closed.
#[derive(Debug, Clone)]
pub struct ChanceNode<'a> {
    history: Vec<Action>,
    bundle: &'a CardBundle,
    stage: Stage,
}

impl<'a> ChanceNode<'a> {
    fn new(history: Vec<Action>, bundle: &'a CardBundle) -> ChanceNode<'a> {
        assert!(
            history.is_empty() || (history.len() > 2 && players_called(&history)),
            "chance node history must be empty or end in a double call: {:?}",
            history
        );
        let stage = stage_of(&history);
        ChanceNode {
            history,
            bundle,
            stage,
        }
    }

    fn is_terminal(&self) -> bool {
        self.stage == Stage::Showdown
    }

    fn actions(&self) -> Vec<Action> {
        if self.is_terminal() {
            vec![]
        } else {
            vec![Action::Chance]
        }
    }
}

/// A decision point for one of the seats.
#[derive(Debug, Clone)]
pub struct MoveNode<'a> {
    history: Vec<Action>,
    bundle: &'a CardBundle,
    stage: Stage,
    seat: Seat,
    bucket: usize,
}

impl<'a> MoveNode<'a> {
    fn new(history: Vec<Action>, bundle: &'a CardBundle) -> MoveNode<'a> {
        assert!(!history.is_empty(), "move node history cannot be empty");
        assert!(
            !players_called(&history),
            "move node history cannot end in a double call: {:?}",
            history
        );
        let stage = stage_of(&history);
        let seat = to_move(&history);
        let bucket = bundle.bucket(seat, stage);
        MoveNode {
            history,
            bundle,
            stage,
            seat,
            bucket,
        }
    }

    fn is_terminal(&self) -> bool {
        self.history.last() == Some(&Action::Fold)
    }

    fn actions(&self) -> Vec<Action> {
        if self.is_terminal() {
            return vec![];
        }
        let mut actions = Vec::with_capacity(3);
        if self.could_raise() {
            actions.push(Action::Raise);
        }
        actions.push(Action::Call);
        actions.push(Action::Fold);
        actions
    }

    fn could_raise(&self) -> bool {
        let bets = bets_of(&self.history);
        if START_MONEY - bets[self.seat.index()] < RAISE_AMOUNT {
            return false;
        }
        let raises =
            stage_line(&self.history).iter().filter(|&&a| a == Action::Raise).count();
        raises < MAX_RAISES_PER_STAGE
    }

    fn encoding(&self) -> String {
        let mut enc: String = self.history.iter().map(|a| a.code()).collect();
        enc.push('.');
        enc.push_str(&self.bucket.to_string());
        enc
    }
}

/// One node of a deal's game tree, identified by its action history. Every
/// derived attribute is a pure function of the history plus the deal bundle,
/// so nodes are built on demand and thrown away on return.
#[derive(Debug, Clone)]
pub enum InfoSet<'a> {
    Chance(ChanceNode<'a>),
    Move(MoveNode<'a>),
}

impl<'a> InfoSet<'a> {
    pub fn root(bundle: &'a CardBundle) -> InfoSet<'a> {
        InfoSet::Chance(ChanceNode::new(vec![], bundle))
    }

    /// Replays `history` from the root, panicking at the first illegal step.
    pub fn from_history(history: &[Action], bundle: &'a CardBundle) -> InfoSet<'a> {
        let mut node = InfoSet::root(bundle);
        for &action in history {
            node = node.play(action);
        }
        node
    }

    fn with_history(history: Vec<Action>, bundle: &'a CardBundle) -> InfoSet<'a> {
        if history.is_empty() || players_called(&history) {
            InfoSet::Chance(ChanceNode::new(history, bundle))
        } else {
            InfoSet::Move(MoveNode::new(history, bundle))
        }
    }

    /// The child reached by `action`, which must be legal here.
    pub fn play(&self, action: Action) -> InfoSet<'a> {
        assert!(
            self.actions().contains(&action),
            "action {:?} is not legal after {:?}",
            action,
            self.history()
        );
        let mut history = self.history().to_vec();
        history.push(action);
        Self::with_history(history, self.bundle())
    }

    pub fn actions(&self) -> Vec<Action> {
        match self {
            InfoSet::Chance(node) => node.actions(),
            InfoSet::Move(node) => node.actions(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            InfoSet::Chance(node) => node.is_terminal(),
            InfoSet::Move(node) => node.is_terminal(),
        }
    }

    pub fn is_chance(&self) -> bool {
        matches!(self, InfoSet::Chance(_))
    }

    /// The CFR table key of this node.
    pub fn encoding(&self) -> String {
        match self {
            InfoSet::Chance(_) => CHANCE_ENCODING.to_string(),
            InfoSet::Move(node) => node.encoding(),
        }
    }

    pub fn to_move(&self) -> Seat {
        match self {
            InfoSet::Chance(_) => panic!("no seat to act at a chance node"),
            InfoSet::Move(node) => node.seat,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            InfoSet::Chance(node) => node.stage,
            InfoSet::Move(node) => node.stage,
        }
    }

    pub fn history(&self) -> &[Action] {
        match self {
            InfoSet::Chance(node) => &node.history,
            InfoSet::Move(node) => &node.history,
        }
    }

    pub fn last_action(&self) -> Option<Action> {
        self.history().last().copied()
    }

    pub fn bundle(&self) -> &'a CardBundle {
        match self {
            InfoSet::Chance(node) => node.bundle,
            InfoSet::Move(node) => node.bundle,
        }
    }

    pub fn bets(&self) -> [i32; 2] {
        bets_of(self.history())
    }

    pub fn pot(&self) -> i32 {
        let bets = self.bets();
        bets[0] + bets[1]
    }

    pub fn stacks(&self) -> [i32; 2] {
        let bets = self.bets();
        [START_MONEY - bets[0], START_MONEY - bets[1]]
    }

    /// Who takes the pot. Only terminal nodes have a winner: the seat that
    /// did not fold, or the bundle's showdown result.
    pub fn winner(&self) -> Seat {
        assert!(
            self.is_terminal(),
            "winner of a non-terminal node: {:?}",
            self.history()
        );
        match self {
            InfoSet::Chance(_) => self.bundle().winner(),
            InfoSet::Move(node) => node.seat,
        }
    }

    /// Chips won or lost by `seat`: the loser forfeits their committed bet.
    pub fn utility(&self, seat: Seat) -> i32 {
        let winner = self.winner();
        let loser = winner.opponent();
        let stake = self.bets()[loser.index()];
        if seat == winner {
            stake
        } else {
            -stake
        }
    }
}
