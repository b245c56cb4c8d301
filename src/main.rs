use std::path::PathBuf;

use anyhow::Result;
use clap::{
    Args,
    Parser,
    Subcommand,
    ValueEnum,
    ValueHint,
};
use log::info;
use rand::SeedableRng;
use wyhash::WyRng;

use hulth::{
    arena,
    game::rule::Seat,
    solver::trainer::{
        DealSource,
        Trainer,
    },
};

#[derive(Parser)]
struct AppArgs {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a model with chance-sampling CFR self-play.
    Train(TrainArgs),
    /// Play hands against a trained model.
    Play(PlayArgs),
    /// Pit two trained models against each other.
    Duel(DuelArgs),
}

#[derive(Args)]
struct TrainArgs {
    #[clap(long, short, value_parser, value_hint(ValueHint::FilePath))]
    model: PathBuf,

    #[clap(long, short, value_parser, default_value_t = 1000)]
    iterations: usize,

    #[clap(long, short, value_parser, default_value_t = 42)]
    seed: u64,

    /// Discard any model already at the path and start fresh.
    #[clap(long)]
    new: bool,

    /// Train on synthetic bucket walks instead of real deals.
    #[clap(long)]
    synthetic: bool,
}

#[derive(Args)]
struct PlayArgs {
    #[clap(long, short, value_parser, value_hint(ValueHint::FilePath))]
    model: PathBuf,

    #[clap(long, value_enum, default_value = "small")]
    seat: SeatChoice,

    #[clap(long, short, value_parser)]
    seed: Option<u64>,
}

#[derive(Args)]
struct DuelArgs {
    #[clap(long, value_parser, value_hint(ValueHint::FilePath))]
    left: PathBuf,

    #[clap(long, value_parser, value_hint(ValueHint::FilePath))]
    right: PathBuf,

    #[clap(long, short, value_parser, default_value_t = 1000)]
    deals: usize,

    #[clap(long, short, value_parser, default_value_t = 42)]
    seed: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SeatChoice {
    Small,
    Big,
}

impl From<SeatChoice> for Seat {
    fn from(choice: SeatChoice) -> Seat {
        match choice {
            SeatChoice::Small => Seat::SmallBlind,
            SeatChoice::Big => Seat::BigBlind,
        }
    }
}

fn main() -> Result<()> {
    // Initialize env_logger with a default log level of INFO.
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = AppArgs::parse();
    match args.command {
        Command::Train(args) => run_train(args),
        Command::Play(args) => run_play(args),
        Command::Duel(args) => run_duel(args),
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    let mut trainer = if args.new || !args.model.exists() {
        info!("starting a fresh model at {}", args.model.display());
        Trainer::new(args.seed)
    } else {
        info!("continuing training of {}", args.model.display());
        Trainer::load(&args.model, args.seed)?
    };

    let source = if args.synthetic {
        DealSource::Synthetic
    } else {
        DealSource::Sampled
    };
    trainer.train(args.iterations, source);

    trainer.save(&args.model)?;
    info!("model saved to {}", args.model.display());
    Ok(())
}

fn run_play(args: PlayArgs) -> Result<()> {
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut trainer = Trainer::load(&args.model, seed)?;
    info!("loaded model {} ({} info sets)", args.model.display(), trainer.node_count());

    let user = Seat::from(args.seat);
    let mut rng = WyRng::seed_from_u64(seed.wrapping_add(1));
    loop {
        arena::play_hand(&mut rng, &mut trainer, user)?;
        if !arena::confirm("Play another hand? [y/N] ")? {
            return Ok(());
        }
    }
}

fn run_duel(args: DuelArgs) -> Result<()> {
    let mut left = Trainer::load(&args.left, args.seed)?;
    let mut right = Trainer::load(&args.right, args.seed.wrapping_add(1))?;
    info!(
        "{} ({} info sets) versus {} ({} info sets) over {} deals",
        args.left.display(),
        left.node_count(),
        args.right.display(),
        right.node_count(),
        args.deals
    );

    let mut rng = WyRng::seed_from_u64(args.seed.wrapping_add(2));
    let report = arena::run_match(&mut rng, &mut left, &mut right, args.deals);

    println!("left rating:  {:+.4}", report.left_rating);
    println!("right rating: {:+.4}", report.right_rating);
    if report.left_rating.abs() > arena::NOISE_THRESHOLD {
        let better = if report.left_rating > 0.0 {
            &args.left
        } else {
            &args.right
        };
        println!("{} is meaningfully stronger.", better.display());
    } else {
        println!("No meaningful difference between the two strategies.");
    }
    Ok(())
}
