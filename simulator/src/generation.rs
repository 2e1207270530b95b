use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::args::SimConfig;
use crate::model::{Model, Op, TaskState};

#[derive(Debug, Clone, Copy)]
enum Kind {
    Insert,
    Update,
    Delete,
    Select,
    Batch,
    SetManual,
    SetAuto,
    Commit,
    Rollback,
    Reopen,
}

/// Fresh primary keys, unique across the whole run.
pub(crate) struct IdSource {
    next: i64,
}

impl IdSource {
    pub(crate) fn new() -> Self {
        Self { next: 1 }
    }

    fn take(&mut self) -> i64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

pub(crate) fn next_op(
    task: &TaskState,
    model: &Model,
    ids: &mut IdSource,
    config: &SimConfig,
    rng: &mut ChaCha8Rng,
) -> Op {
    let weights: Vec<(Kind, f64)> = if task.manual {
        vec![
            (Kind::Insert, 0.30),
            (Kind::Update, 0.15),
            (Kind::Delete, 0.10),
            (Kind::Select, 0.15),
            (Kind::Batch, config.batch_rate),
            (Kind::Commit, 0.15),
            (Kind::Rollback, 0.10),
            (Kind::SetAuto, 0.05),
            (Kind::Reopen, config.reopen_rate),
        ]
    } else {
        vec![
            (Kind::Insert, 0.35),
            (Kind::Update, 0.15),
            (Kind::Delete, 0.10),
            (Kind::Select, 0.20),
            (Kind::Batch, config.batch_rate),
            (Kind::SetManual, config.manual_rate),
            (Kind::Reopen, config.reopen_rate),
        ]
    };

    match choose_weighted(&weights, rng) {
        Kind::Insert => Op::Insert {
            id: ids.take(),
            value: random_value(rng),
        },
        Kind::Update => Op::Update {
            id: pick_id(model, ids, rng),
            value: random_value(rng),
        },
        Kind::Delete => Op::Delete {
            id: pick_id(model, ids, rng),
        },
        Kind::Select => Op::Select,
        Kind::Batch => {
            let len = rng.random_range(1..=4);
            Op::Batch {
                ids: (0..len).map(|_| ids.take()).collect(),
            }
        }
        Kind::SetManual => Op::SetManual,
        Kind::SetAuto => Op::SetAuto,
        Kind::Commit => Op::Commit,
        Kind::Rollback => Op::Rollback,
        Kind::Reopen => Op::Reopen,
    }
}

/// Mostly existing ids, occasionally one that was never inserted.
fn pick_id(model: &Model, ids: &mut IdSource, rng: &mut ChaCha8Rng) -> i64 {
    let known = model.known_ids();
    if known.is_empty() || rng.random::<f64>() < 0.1 {
        return ids.take();
    }
    known[rng.random_range(0..known.len())]
}

fn random_value(rng: &mut ChaCha8Rng) -> String {
    let len = rng.random_range(1..=12);
    (0..len)
        .map(|_| char::from(b'a' + rng.random_range(0..26u8)))
        .collect()
}

fn choose_weighted(items: &[(Kind, f64)], rng: &mut ChaCha8Rng) -> Kind {
    let total: f64 = items.iter().map(|(_, weight)| weight.max(0.0)).sum();
    if total <= f64::EPSILON {
        return Kind::Select;
    }
    let mut target = rng.random::<f64>() * total;
    for (kind, weight) in items {
        let w = weight.max(0.0);
        if target <= w {
            return *kind;
        }
        target -= w;
    }
    items.last().map_or(Kind::Select, |(kind, _)| *kind)
}
