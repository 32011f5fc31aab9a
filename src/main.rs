use clap::Parser;
use histogram_equalizer::cli::args::{CommandsEnum, HistogramEqualizerArgs};
use histogram_equalizer::cli::equalize::run_equalize;
use histogram_equalizer::cli::inspect::run_inspect;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: HistogramEqualizerArgs = HistogramEqualizerArgs::parse();

    match &args.command {
        Some(CommandsEnum::Equalize(params)) => {
            let summary = run_equalize(params)?;
            if summary.all_failed() {
                return Err("no image could be equalized".into());
            }
        }

        Some(CommandsEnum::Inspect(params)) => {
            run_inspect(params)?;
        }

        None => {
            println!("Default command (nothing specified!)");
        }
    }
    Ok(())
}
