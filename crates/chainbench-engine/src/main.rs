use anyhow::{anyhow, bail, Context, Result};
use chainbench_engine::test_harness::{run_simulator, SimulatorConfig};
use chainbench_engine::types::{
    AllocatorStrategy, ChainId, ChainSelection, SweepRequest, TransmitterStrategy, UserId,
    ValueRange,
};
use clap::{value_parser, Arg, ArgAction, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Command::new("chainbench")
        .version(chainbench_engine::VERSION)
        .about("Operator console engine for data-chain sweep testing")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("plan")
                .about("Dry-run a sweep expansion and print the scenario table")
                .arg(Arg::new("project").long("project").default_value("sweep"))
                .arg(Arg::new("user").long("user").default_value("operator"))
                .arg(
                    Arg::new("data")
                        .long("data")
                        .default_value("500")
                        .help("Data size in MB: a value or start:end:step"),
                )
                .arg(
                    Arg::new("chunk")
                        .long("chunk")
                        .default_value("64")
                        .help("Chunk size in KB: a value or start:end:step"),
                )
                .arg(
                    Arg::new("chains")
                        .long("chains")
                        .required(true)
                        .help("Comma-separated selected chain ids"),
                )
                .arg(
                    Arg::new("chain-counts")
                        .long("chain-counts")
                        .help("Sweep the chain count: start:end:step (default: use all chains)"),
                )
                .arg(
                    Arg::new("allocators")
                        .long("allocators")
                        .help("Comma-separated allocator strategies (default: all)"),
                )
                .arg(
                    Arg::new("transmitters")
                        .long("transmitters")
                        .help("Comma-separated transmitter strategies (default: all)"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Emit the expanded scenarios as JSON"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run the seeded end-to-end sweep simulator")
                .arg(
                    Arg::new("sweeps")
                        .long("sweeps")
                        .default_value("25")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("max-chains")
                        .long("max-chains")
                        .default_value("6")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("keep-going")
                        .long("keep-going")
                        .action(ArgAction::SetTrue)
                        .help("Collect all violations instead of stopping at the first"),
                ),
        );

    match cli.get_matches().subcommand() {
        Some(("plan", args)) => {
            let request = SweepRequest {
                project: args.get_one::<String>("project").unwrap().clone(),
                user_id: UserId::new(args.get_one::<String>("user").unwrap().clone()),
                data_size_mb: parse_range(args.get_one::<String>("data").unwrap())
                    .context("invalid --data")?,
                chunk_size_kb: parse_range(args.get_one::<String>("chunk").unwrap())
                    .context("invalid --chunk")?,
                allocators: parse_allocators(args.get_one::<String>("allocators"))?,
                transmitters: parse_transmitters(args.get_one::<String>("transmitters"))?,
                chain_selection: match args.get_one::<String>("chain-counts") {
                    Some(spec) => match parse_range(spec).context("invalid --chain-counts")? {
                        ValueRange::Fixed(v) => ChainSelection::Range { start: v, end: v, step: 1 },
                        ValueRange::Range { start, end, step } => {
                            ChainSelection::Range { start, end, step }
                        }
                    },
                    None => ChainSelection::Fixed,
                },
                selected_chains: args
                    .get_one::<String>("chains")
                    .unwrap()
                    .split(',')
                    .filter(|c| !c.is_empty())
                    .map(ChainId::new)
                    .collect(),
            };

            let scenarios = chainbench_engine::generator::generate(&request, 0)?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&scenarios)?);
                return Ok(());
            }
            println!("{} scenarios:", scenarios.len());
            println!(
                "{:<4} {:>8} {:>8} {:>7} {:<10} {:<10}",
                "id", "data MB", "chunk KB", "chains", "allocator", "transmitter"
            );
            for s in &scenarios {
                println!(
                    "{:<4} {:>8} {:>8} {:>7} {:<10?} {:<10?}",
                    s.id,
                    s.data_size_mb,
                    s.chunk_size_kb,
                    s.target_chain_ids.len(),
                    s.allocator,
                    s.transmitter,
                );
            }
        }
        Some(("simulate", args)) => {
            let config = SimulatorConfig {
                seed: *args.get_one::<u64>("seed").unwrap(),
                sweeps: *args.get_one::<u64>("sweeps").unwrap(),
                max_chains: *args.get_one::<usize>("max-chains").unwrap(),
                stop_on_first_violation: !args.get_flag("keep-going"),
            };

            println!("Running sweep simulator (seed {})...", config.seed);
            let report = run_simulator(config).await;
            println!("{}", report.generate_text());
            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        _ => {}
    }

    Ok(())
}

/// Parse "500" into a fixed range or "100:500:200" into a stepped one.
fn parse_range(spec: &str) -> Result<ValueRange> {
    let parts: Vec<&str> = spec.split(':').collect();
    match parts.as_slice() {
        [v] => Ok(ValueRange::Fixed(v.parse()?)),
        [start, end, step] => Ok(ValueRange::Range {
            start: start.parse()?,
            end: end.parse()?,
            step: step.parse()?,
        }),
        _ => bail!("expected a value or start:end:step, got {spec:?}"),
    }
}

fn parse_allocators(spec: Option<&String>) -> Result<Vec<AllocatorStrategy>> {
    let Some(spec) = spec else {
        return Ok(AllocatorStrategy::ALL.to_vec());
    };
    spec.split(',')
        .map(|name| match name.trim().to_lowercase().as_str() {
            "static" => Ok(AllocatorStrategy::Static),
            "roundrobin" | "round-robin" => Ok(AllocatorStrategy::RoundRobin),
            "random" => Ok(AllocatorStrategy::Random),
            "available" => Ok(AllocatorStrategy::Available),
            "hash" => Ok(AllocatorStrategy::Hash),
            other => Err(anyhow!("unknown allocator strategy {other:?}")),
        })
        .collect()
}

fn parse_transmitters(spec: Option<&String>) -> Result<Vec<TransmitterStrategy>> {
    let Some(spec) = spec else {
        return Ok(TransmitterStrategy::ALL.to_vec());
    };
    spec.split(',')
        .map(|name| match name.trim().to_lowercase().as_str() {
            "onebyone" | "one-by-one" => Ok(TransmitterStrategy::OneByOne),
            "multiburst" | "multi-burst" => Ok(TransmitterStrategy::MultiBurst),
            other => Err(anyhow!("unknown transmitter strategy {other:?}")),
        })
        .collect()
}
