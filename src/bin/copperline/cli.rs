use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AngleArg {
    Ninety,
    FortyFive,
    Any,
}

#[derive(Parser, Debug, Default)]
#[command(about, version)]
pub struct Cli {
    #[arg(value_name = "BOARD FILE",
	  help = "Specify the JSON board description to optimize")]
    pub input: PathBuf,
    #[arg(short, long, value_name = "BOARD FILE",
	  help = "Specify the output board file. The input filename is used by default, with the extension changed to .optimized.json")
    ]
    pub output: Option<PathBuf>,
    #[arg(short, long, value_name = "SETTINGS FILE", help = "JSON file with optimizer settings; missing fields take their defaults")]
    pub settings: Option<PathBuf>,
    #[arg(short, long, value_enum, help = "Override the angle restriction of the settings")]
    pub angle: Option<AngleArg>,
    #[arg(short, long, value_name = "MILLISECONDS", help = "Override the time limit of the settings")]
    pub time_limit: Option<u64>,
    #[arg(long, value_name = "VIA COST FILE", help = "JSON array with a horizontal and vertical trace cost per layer. Via locations are optimized too if given")]
    pub via_costs: Option<PathBuf>,
}
