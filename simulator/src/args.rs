use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Deterministic async-sql simulator")]
pub(crate) struct Args {
    #[arg(long, value_parser = humantime::parse_duration)]
    pub(crate) duration: Option<Duration>,
    #[arg(long)]
    pub(crate) iterations: Option<u64>,
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Connections driven by the simulation, one per task.
    #[arg(long, default_value_t = 4)]
    pub(crate) tasks: usize,
    #[arg(long, default_value_t = 0.15)]
    pub(crate) manual_rate: f64,
    #[arg(long, default_value_t = 0.05)]
    pub(crate) batch_rate: f64,
    #[arg(long, default_value_t = 0.02)]
    pub(crate) reopen_rate: f64,
    #[arg(long, default_value_t = 10)]
    pub(crate) busy_timeout_ms: u64,
    /// Database file; a fresh file under the temp dir when omitted.
    #[arg(long)]
    pub(crate) db: Option<PathBuf>,
    #[arg(long)]
    pub(crate) log: Option<PathBuf>,
    #[arg(long)]
    pub(crate) quick: bool,
    #[arg(long)]
    pub(crate) stress: bool,
    #[arg(long)]
    pub(crate) verbose: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SimConfig {
    pub(crate) duration_ms: Option<u64>,
    pub(crate) iterations: Option<u64>,
    pub(crate) seed: u64,
    pub(crate) tasks: usize,
    pub(crate) manual_rate: f64,
    pub(crate) batch_rate: f64,
    pub(crate) reopen_rate: f64,
    pub(crate) busy_timeout_ms: u64,
    pub(crate) db: PathBuf,
    pub(crate) log: Option<PathBuf>,
    pub(crate) preset: Option<String>,
    pub(crate) tail_steps: usize,
    pub(crate) verbose: bool,
}

impl SimConfig {
    pub(crate) fn from_args(args: Args) -> Self {
        let seed = args.seed.unwrap_or_else(random_seed);
        let db = args
            .db
            .unwrap_or_else(|| std::env::temp_dir().join(format!("async-sql-sim-{seed}.db")));
        let mut config = SimConfig {
            duration_ms: args
                .duration
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            iterations: args.iterations,
            seed,
            tasks: args.tasks.max(1),
            manual_rate: clamp_rate(args.manual_rate),
            batch_rate: clamp_rate(args.batch_rate),
            reopen_rate: clamp_rate(args.reopen_rate),
            busy_timeout_ms: args.busy_timeout_ms,
            db,
            log: args.log,
            preset: None,
            tail_steps: 80,
            verbose: args.verbose,
        };

        if args.quick {
            config.apply_quick();
        }
        if args.stress {
            config.apply_stress();
        }

        config
    }

    fn apply_quick(&mut self) {
        self.preset = Some("quick".to_string());
        self.iterations = Some(2_000);
        self.duration_ms = None;
        self.tasks = 2;
    }

    fn apply_stress(&mut self) {
        self.preset = Some("stress".to_string());
        self.iterations = Some(100_000);
        self.duration_ms = None;
        self.tasks = 8;
        self.manual_rate = 0.25;
        self.batch_rate = 0.10;
        self.reopen_rate = 0.05;
    }
}

fn clamp_rate(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn random_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    now.as_secs() ^ u64::from(now.subsec_nanos())
}
