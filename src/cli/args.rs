use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::equalization::Strategy;

#[derive(Debug, Parser)]
#[clap(author, version, about)]
pub struct HistogramEqualizerArgs {
    #[command(subcommand)]
    pub command: Option<CommandsEnum>,
}

#[derive(Debug, Subcommand)]
pub enum CommandsEnum {
    /// Equalize every image in the input directory of a parameter file
    Equalize(EqualizeArgs),
    /// Print the histogram and intensity mapping of a single image
    Inspect(InspectArgs),
}

#[derive(Debug, Args)]
pub struct EqualizeArgs {
    pub params_path: PathBuf,

    /// Write into a fresh date-time sub-directory of the output directory
    #[clap(long, short)]
    pub date_time_out: bool,

    /// Override the worker count of the parameter file
    #[clap(long, short)]
    pub workers: Option<usize>,

    /// Override the strategy of the parameter file
    #[clap(long, short, value_enum)]
    pub strategy: Option<Strategy>,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    pub image_path: PathBuf,

    #[clap(long, short, default_value_t = 1)]
    pub workers: usize,

    #[clap(long, short, value_enum)]
    pub strategy: Option<Strategy>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_parse_equalize_with_overrides() {
        let args = HistogramEqualizerArgs::parse_from([
            "histogram-equalizer",
            "equalize",
            "params.json",
            "--date-time-out",
            "--workers",
            "8",
            "--strategy",
            "shared-memory",
        ]);
        match args.command {
            Some(CommandsEnum::Equalize(equalize)) => {
                assert_eq!(equalize.params_path, PathBuf::from("params.json"));
                assert!(equalize.date_time_out);
                assert_eq!(equalize.workers, Some(8));
                assert_eq!(equalize.strategy, Some(Strategy::SharedMemory));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_inspect_defaults() {
        let args = HistogramEqualizerArgs::parse_from(["histogram-equalizer", "inspect", "a.png"]);
        match args.command {
            Some(CommandsEnum::Inspect(inspect)) => {
                assert_eq!(inspect.workers, 1);
                assert!(inspect.strategy.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
