use std::{
    collections::{
        BTreeMap,
        HashMap,
    },
    fs::File,
    io::{
        BufReader,
        BufWriter,
    },
    path::Path,
};

use anyhow::{
    anyhow,
    bail,
    Context,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};

use super::node::Node;
use crate::game::{
    rule::{
        BIG_BLIND_BET,
        MAX_BUCKETS,
        MAX_RAISES_PER_STAGE,
        RAISE_AMOUNT,
        SMALL_BLIND_BET,
        START_MONEY,
    },
    state::Action,
};

// Tags in both tables are matched against this order when rebuilding a
// cell's action list.
const TAG_ORDER: [Action; 4] = [Action::Raise, Action::Call, Action::Fold, Action::Chance];

/// Game parameters a model was trained under. A model trained with one set
/// of constants is meaningless under another, so the loader refuses any
/// mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constants {
    max_buckets: usize,
    start_money: i32,
    small_blind_bet: i32,
    big_blind_bet: i32,
    raise_amount: i32,
    max_raises_per_stage: usize,
}

impl Constants {
    pub fn current() -> Constants {
        Constants {
            max_buckets: MAX_BUCKETS,
            start_money: START_MONEY,
            small_blind_bet: SMALL_BLIND_BET,
            big_blind_bet: BIG_BLIND_BET,
            raise_amount: RAISE_AMOUNT,
            max_raises_per_stage: MAX_RAISES_PER_STAGE,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ModelFile {
    constants: Constants,
    cum_regrets: BTreeMap<String, BTreeMap<String, f64>>,
    cum_strategy: BTreeMap<String, BTreeMap<String, f64>>,
}

pub fn save(path: &Path, nodes: &HashMap<String, Node>) -> Result<()> {
    let mut cum_regrets = BTreeMap::new();
    let mut cum_strategy = BTreeMap::new();

    for (encoding, node) in nodes {
        let mut regrets = BTreeMap::new();
        let mut strategies = BTreeMap::new();
        for (i, action) in node.actions().iter().enumerate() {
            regrets.insert(tag(*action), node.regret_sum()[i]);
            strategies.insert(tag(*action), node.strategy_sum()[i]);
        }
        cum_regrets.insert(encoding.clone(), regrets);
        cum_strategy.insert(encoding.clone(), strategies);
    }

    let model = ModelFile {
        constants: Constants::current(),
        cum_regrets,
        cum_strategy,
    };

    let file = File::create(path)
        .with_context(|| format!("failed to create model file {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), &model)
        .with_context(|| format!("failed to write model file {}", path.display()))?;
    Ok(())
}

pub fn load(path: &Path) -> Result<HashMap<String, Node>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open model file {}", path.display()))?;
    let model: ModelFile = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("malformed model file {}", path.display()))?;

    let expected = Constants::current();
    if model.constants != expected {
        bail!(
            "model {} was trained under {:?}, this build uses {:?}",
            path.display(),
            model.constants,
            expected
        );
    }
    if model.cum_regrets.len() != model.cum_strategy.len() {
        bail!("regret and strategy tables disagree on their encodings");
    }

    let mut nodes = HashMap::with_capacity(model.cum_regrets.len());
    for (encoding, regrets) in &model.cum_regrets {
        let strategies = model
            .cum_strategy
            .get(encoding)
            .ok_or_else(|| anyhow!("encoding {:?} has regrets but no strategy entry", encoding))?;

        let actions = ordered_actions(regrets)?;
        if ordered_actions(strategies)? != actions {
            bail!("encoding {:?} lists different actions in the two tables", encoding);
        }

        let regret_sum = actions.iter().map(|a| regrets[&tag(*a)]).collect();
        let strategy_sum = actions.iter().map(|a| strategies[&tag(*a)]).collect();
        nodes.insert(encoding.clone(), Node::from_sums(actions, regret_sum, strategy_sum));
    }
    Ok(nodes)
}

fn tag(action: Action) -> String {
    action.code().to_string()
}

fn ordered_actions(tags: &BTreeMap<String, f64>) -> Result<Vec<Action>> {
    let mut actions = Vec::with_capacity(tags.len());
    for action in TAG_ORDER {
        if tags.contains_key(&tag(action)) {
            actions.push(action);
        }
    }
    if actions.len() != tags.len() {
        bail!("unknown action tag among {:?}", tags.keys().collect::<Vec<_>>());
    }
    Ok(actions)
}
