use std::io::{
    self,
    BufRead,
    Write,
};

use anyhow::{
    bail,
    Context,
    Result,
};
use log::debug;
use rand::Rng;

use crate::{
    abstraction::Abstraction,
    game::{
        bundle::CardBundle,
        card::cards_to_str,
        rule::{
            Seat,
            START_MONEY,
        },
        stage::Stage,
        state::{
            Action,
            InfoSet,
        },
    },
    solver::trainer::Trainer,
};

/// Rating gap below which two strategies are considered indistinguishable.
pub const NOISE_THRESHOLD: f64 = 0.02;

/// Average chips won per deal, normalised by the starting stack.
pub struct MatchReport {
    pub left_rating: f64,
    pub right_rating: f64,
}

/// Pits two bots against each other over `deals` deals. Each deal is played
/// twice with the seats swapped so neither side banks the blind advantage.
pub fn run_match<R: Rng>(
    rng: &mut R,
    left: &mut Trainer,
    right: &mut Trainer,
    deals: usize,
) -> MatchReport {
    let abstraction = Abstraction::default();
    let mut left_total: i64 = 0;
    let mut right_total: i64 = 0;

    for i in 0..deals {
        let bundle = CardBundle::deal(rng, &abstraction);

        let (sb_utility, bb_utility) = play_out(left, right, &bundle);
        left_total += i64::from(sb_utility);
        right_total += i64::from(bb_utility);

        let (sb_utility, bb_utility) = play_out(right, left, &bundle);
        right_total += i64::from(sb_utility);
        left_total += i64::from(bb_utility);

        debug!("deal {}: totals {} / {}", i + 1, left_total, right_total);
    }

    let scale = (deals as f64) * f64::from(START_MONEY);
    MatchReport {
        left_rating: left_total as f64 / scale,
        right_rating: right_total as f64 / scale,
    }
}

fn play_out(sb_bot: &mut Trainer, bb_bot: &mut Trainer, bundle: &CardBundle) -> (i32, i32) {
    let mut node = InfoSet::root(bundle);
    loop {
        if node.is_terminal() {
            return (node.utility(Seat::SmallBlind), node.utility(Seat::BigBlind));
        }
        if node.is_chance() {
            node = node.play(Action::Chance);
            continue;
        }
        node = match node.to_move() {
            Seat::SmallBlind => sb_bot.play(&node),
            Seat::BigBlind => bb_bot.play(&node),
        };
    }
}

/// Plays one interactive hand on stdin/stdout with the user in `user`'s
/// seat. Returns the user's chip result.
pub fn play_hand<R: Rng>(rng: &mut R, trainer: &mut Trainer, user: Seat) -> Result<i32> {
    let abstraction = Abstraction::default();
    let bundle = CardBundle::deal(rng, &abstraction);

    println!();
    println!("You are the {}.", user);
    println!("Your hand: {}", cards_to_str(&bundle.hand(user)));

    let mut node = InfoSet::root(&bundle);
    let mut shown_stage = Stage::Preflop;
    loop {
        if node.is_terminal() {
            announce_result(&node, &bundle, user);
            return Ok(node.utility(user));
        }

        if node.is_chance() {
            node = node.play(Action::Chance);
            continue;
        }

        if node.stage() > shown_stage {
            shown_stage = node.stage();
            println!("-- {} -- board: {}", node.stage(), cards_to_str(bundle.board(node.stage())));
        }

        let stacks = node.stacks();
        println!(
            "[pot {}] [your stack {}] [bot stack {}]",
            node.pot(),
            stacks[user.index()],
            stacks[user.opponent().index()]
        );

        if node.to_move() == user {
            node = prompt_action(&node)?;
        } else {
            let child = trainer.play(&node);
            println!("Bot plays {}.", child.last_action().unwrap().describe());
            node = child;
        }
    }
}

/// Asks on stdout and waits for a y/n line; anything else (or end of input)
/// declines.
pub fn confirm(question: &str) -> Result<bool> {
    print!("{}", question);
    io::stdout().flush().context("failed to flush stdout")?;
    match read_line()? {
        Some(line) => Ok(line.trim().eq_ignore_ascii_case("y")),
        None => Ok(false),
    }
}

fn prompt_action<'a>(node: &InfoSet<'a>) -> Result<InfoSet<'a>> {
    let actions = node.actions();
    let menu = actions
        .iter()
        .map(|a| format!("{} - {}", a.code(), a.describe()))
        .collect::<Vec<_>>()
        .join(", ");

    loop {
        print!("Your move ({}): ", menu);
        io::stdout().flush().context("failed to flush stdout")?;

        let line = match read_line()? {
            Some(line) => line,
            None => bail!("input ended before the hand finished"),
        };
        match line.trim().chars().next().and_then(Action::from_code) {
            Some(action) if actions.contains(&action) => return Ok(node.play(action)),
            _ => println!("That is not a legal move here."),
        }
    }
}

fn announce_result(node: &InfoSet, bundle: &CardBundle, user: Seat) {
    if node.stage() == Stage::Showdown {
        println!("Board: {}", cards_to_str(bundle.board(Stage::Showdown)));
        for seat in Seat::ALL {
            let who = if seat == user {
                "You show"
            } else {
                "Bot shows"
            };
            println!("{} {} ({})", who, cards_to_str(&bundle.hand(seat)), bundle.strength(seat));
        }
    } else {
        let folder = node.winner().opponent();
        let who = if folder == user {
            "You fold."
        } else {
            "Bot folds."
        };
        println!("{}", who);
    }

    let utility = node.utility(user);
    if utility > 0 {
        println!("You win {} chips.", utility);
    } else {
        println!("You lose {} chips.", -utility);
    }
}

fn read_line() -> Result<Option<String>> {
    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
