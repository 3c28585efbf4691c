use std::time::Instant;

use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use placement::{
    solve, validate, Board, Catalog, ConstraintModel, Placement, PlacementConfig, PlacementError, Result,
    SoftCostBreakdown, ValidationReport,
};

#[derive(Serialize)]
struct Report<'a> {
    validation: &'a ValidationReport,
    cost: Option<&'a SoftCostBreakdown>,
    rounds: Option<u64>,
    elapsed_seconds: f64,
    within_time_limit: bool,
}

fn parse_u64(input: &str) -> std::result::Result<(), String> {
    input.parse::<u64>().map(|_| ()).map_err(|err| err.to_string())
}

fn print_cost(cost: &SoftCostBreakdown) {
    println!("bounding box area      : {:.2}", cost.bounding_box_area);
    println!("wasted space           : {:.2}", cost.wasted_space);
    println!("compactness            : {:.2}", cost.compactness);
    println!("centrality             : {:.2}", cost.centrality);
    println!("checker score          : {:.2}", cost.checker_score);
    println!("total soft cost        : {:.2}", cost.total);
}

fn run() -> Result<()> {
    let matches = clap::Command::new("placement")
        .version("0.1.0")
        .about("Places connectors, microcontroller and crystal on a PCB under hard and soft constraints")
        .arg(
            clap::Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON configuration; missing fields keep their defaults")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("seed")
                .short('s')
                .long("seed")
                .value_name("STRING")
                .help("Random seed, any string")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("rounds")
                .short('r')
                .long("rounds")
                .value_name("INT")
                .help("Iterated local search rounds")
                .takes_value(true)
                .validator(parse_u64),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Where to write the placement")
                .default_value("placement.json")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("report")
                .long("report")
                .value_name("FILE")
                .help("Also write the validation report and cost breakdown as JSON")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("check")
                .long("check")
                .value_name("FILE")
                .help("Validate an existing placement file instead of searching")
                .takes_value(true),
        )
        .get_matches();

    let mut config = match matches.value_of("config") {
        Some(path) => PlacementConfig::from_json_file(path)?,
        None => PlacementConfig::default(),
    };
    if let Some(seed) = matches.value_of("seed") {
        config.search.seed = seed.to_string();
    }
    if let Some(rounds) = matches.value_of("rounds") {
        config.search.iterated_local_search_max_iterations = rounds
            .parse()
            .map_err(|_| PlacementError::InvalidInput(format!("rounds must be an integer, got {}", rounds)))?;
    }
    let search = config.search.clone();
    let model = ConstraintModel::new(Board::default(), Catalog::default(), config)?;

    let start = Instant::now();
    let (placement, rounds) = match matches.value_of("check") {
        Some(path) => {
            info!(path, "validating existing placement");
            (Placement::read_json_file(path, model.catalog())?, None)
        }
        None => {
            let outcome = solve(&model, &search)?;
            println!("search rounds          : {} ({:?})", outcome.rounds, outcome.termination);
            (outcome.placement, Some(outcome.rounds))
        }
    };
    let report = validate(&model, &placement);
    let elapsed = start.elapsed();

    println!("{:?}", placement);
    println!("--- hard constraints ---");
    print!("{}", report);
    let cost = if placement.is_complete(model.catalog()) {
        let cost = model.soft_cost_breakdown(&placement);
        println!("--- soft cost (lower is better) ---");
        print_cost(&cost);
        Some(cost)
    } else {
        None
    };
    println!("elapsed                : {:.3}s", elapsed.as_secs_f64());
    let within_time_limit = search.within_time_limit(elapsed);
    println!(
        "performance            : {} (limit {:.3}s)",
        if within_time_limit { "PASS" } else { "FAIL" },
        search.time_limit().as_secs_f64()
    );

    if matches.value_of("check").is_none() {
        let output = matches.value_of("output").unwrap_or("placement.json");
        placement.write_json_file(output, model.catalog())?;
        info!(output, "wrote placement");
    }
    if let Some(path) = matches.value_of("report") {
        let json = serde_json::to_string_pretty(&Report {
            validation: &report,
            cost: cost.as_ref(),
            rounds,
            elapsed_seconds: elapsed.as_secs_f64(),
            within_time_limit,
        })?;
        std::fs::write(path, json)?;
        info!(path, "wrote report");
    }

    if report.is_valid() {
        println!("placement is fully valid");
        Ok(())
    } else {
        let failed: Vec<String> = report.failed_rules().iter().map(|rule| rule.to_string()).collect();
        let broken = if failed.is_empty() {
            "components are missing".to_string()
        } else {
            failed.join(", ")
        };
        Err(PlacementError::InvalidInput(format!("placement breaks hard constraints: {}", broken)))
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run() {
        error!(%err, "placement failed");
        std::process::exit(1);
    }
}
