//! CLI interface for Bitlamp
//!
//! Provides command-line interface for:
//! - Running the calculator on the configured GPIO board
//! - Probing the buttons and lamps after wiring changes

use crate::config::BoardConfig;
use crate::gpio::Board;
use crate::hal::SystemClock;
use crate::machine::Calculator;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bitlamp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "64-bit binary calculator driven by four buttons and four lamps")]
#[command(
    long_about = "Bitlamp - a four-button, four-lamp binary calculator for Linux GPIO boards\n\n\
    Operands are entered one bit at a time, least-significant bit first:\n\
    • button 0: confirm / next phase\n\
    • button 1: append 0 (cycles the operation during selection)\n\
    • button 2: append 1\n\
    • button 3: backspace\n\n\
    The result is blinked out as 64 pulses, LSB first: lamps 0+1 mean 1,\n\
    lamps 2+3 mean 0. A shine flourish brackets the transmission.\n\n\
    Examples:\n\
      bitlamp\n\
      bitlamp run --config board.json -v\n\
      bitlamp probe --chip /dev/gpiochip1"
)]
pub struct Cli {
    /// JSON board configuration (pins, chip, timing)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// GPIO chip device, overrides the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub chip: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the calculator (default)
    Run {
        /// Exit after this many results instead of looping forever
        #[arg(long, value_name = "N")]
        cycles: Option<u64>,
    },

    /// Log every button press and toggle the matching lamp
    #[command(
        long_about = "Log every button press and toggle the matching lamp\n\n\
        Useful after wiring a board: each falling edge on button N is logged\n\
        and flips lamp N. Runs until interrupted or a GPIO error occurs."
    )]
    Probe,
}

impl Cli {
    /// Defaults, then the config file, then command-line overrides.
    pub fn board_config(&self) -> crate::Result<BoardConfig> {
        let mut config = match &self.config {
            Some(path) => BoardConfig::load(path)?,
            None => BoardConfig::default(),
        };
        if let Some(chip) = &self.chip {
            config.chip = chip.clone();
        }
        Ok(config)
    }
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    let config = cli.board_config().context("loading board configuration")?;
    tracing::info!(
        "Welcome to bitlamp v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.chip.display()
    );

    let board = Board::open(&config).context("acquiring GPIO lines")?;
    let (buttons, lamps) = board.into_parts();
    tracing::info!(
        buttons = ?buttons.offsets(),
        lamps = ?lamps.offsets(),
        result_display = ?config.timing.display_duration(),
        "board ready"
    );
    let mut calc = Calculator::new(buttons, lamps, SystemClock, config.timing.clone());

    let outcome = match cli.command.unwrap_or(Commands::Run { cycles: None }) {
        Commands::Run { cycles } => {
            if let Some(limit) = cycles {
                calc = calc.with_cycle_limit(limit);
            }
            calc.blank().and_then(|()| calc.run())
        }
        Commands::Probe => calc.probe(),
    };

    if let Err(e) = &outcome {
        tracing::error!(error = %e, "fatal error, releasing GPIO lines");
    }
    // buttons first, then lamps
    drop(calc);
    outcome?;

    tracing::info!("Goodbye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["bitlamp"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bitlamp", "run", "--cycles", "2", "-vv", "--chip", "/dev/gpiochip3"])
            .unwrap();
        assert_eq!(cli.command, Some(Commands::Run { cycles: Some(2) }));
        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.board_config().unwrap().chip,
            PathBuf::from("/dev/gpiochip3")
        );
    }

    #[test]
    fn chip_flag_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "chip": "/dev/gpiochip1", "buttons": [1, 2, 3, 4] }}"#).unwrap();
        let path = file.path().to_str().unwrap();

        let cli = Cli::try_parse_from(["bitlamp", "--config", path, "--chip", "/dev/gpiochip2", "probe"])
            .unwrap();
        let config = cli.board_config().unwrap();
        assert_eq!(config.chip, PathBuf::from("/dev/gpiochip2"));
        assert_eq!(config.buttons, [1, 2, 3, 4]);
        assert_eq!(cli.command, Some(Commands::Probe));
    }
}
