use anyhow::Context;
use clap::Parser;
use copperline::board::Board;
use copperline::pull_tight::{PullTight, TraceCostFactor};
use copperline::rules::AngleRestriction;
use copperline::settings::OptimizerSettings;
use std::fs::File;
use std::io::{BufReader, BufWriter};

mod cli;

use cli::{AngleArg, Cli};

impl From<AngleArg> for AngleRestriction {
    fn from(angle: AngleArg) -> Self {
        match angle {
            AngleArg::Ninety => AngleRestriction::NinetyDegree,
            AngleArg::FortyFive => AngleRestriction::FortyFiveDegree,
            AngleArg::Any => AngleRestriction::AnyAngle,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();

    let mut settings = if let Some(settings_filename) = &args.settings {
        let json = std::fs::read_to_string(settings_filename)
            .with_context(|| format!("reading {}", settings_filename.display()))?;
        OptimizerSettings::from_json_str(&json)?
    } else {
        OptimizerSettings::default()
    };

    if let Some(angle) = args.angle {
        settings.angle_restriction = angle.into();
    }

    if let Some(time_limit) = args.time_limit {
        settings.time_limit_ms = time_limit;
    }

    let via_costs: Option<Vec<TraceCostFactor>> = if let Some(costs_filename) = &args.via_costs {
        let costs_file = File::open(costs_filename)
            .with_context(|| format!("opening {}", costs_filename.display()))?;
        Some(serde_json::from_reader(BufReader::new(costs_file))?)
    } else {
        None
    };

    let board_file =
        File::open(&args.input).with_context(|| format!("opening {}", args.input.display()))?;
    let mut board = Board::from_json_reader(BufReader::new(board_file))?;
    board.set_clearance_compensation_used(settings.clearance_compensation);

    board.mark_all_changed_area();
    let changed = PullTight::new(&mut board, &settings).opt_changed_area(via_costs.as_deref());
    board.stop_marking_changed_area();
    log::info!("board {}", if changed { "optimized" } else { "unchanged" });

    let output_filename = args
        .output
        .unwrap_or_else(|| args.input.with_extension("optimized.json"));
    let output_file = File::create(&output_filename)
        .with_context(|| format!("creating {}", output_filename.display()))?;
    board.to_json_writer(BufWriter::new(output_file))?;

    Ok(())
}
