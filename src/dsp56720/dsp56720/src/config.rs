use std::path::PathBuf;

use clap::{App, Arg, ArgMatches};
use thiserror::Error;

use dsp56720_core::constants::esai::{RX_CHANNELS, TX_CHANNELS};
use dsp56720_core::constants::DEFAULT_CYCLES_PER_SAMPLE;
use dsp56720_core::Word;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required option --{0}")]
    Missing(&'static str),
    #[error("invalid value for --{flag}: {value}")]
    InvalidNumber { flag: &'static str, value: String },
    #[error("invalid channel mapping for --{flag}: {value} (expected CH=FILE, CH below {limit})")]
    InvalidChannel {
        flag: &'static str,
        value: String,
        limit: usize,
    },
}

/// Run configuration taken from the command line
#[derive(Debug, PartialEq, Eq)]
pub struct Config {
    pub boot: PathBuf,                   // Image streamed into SHI receive
    pub inputs: Vec<(usize, PathBuf)>,   // ESAI input channel feeds
    pub outputs: Vec<(usize, PathBuf)>,  // ESAI output channel drains
    pub shi_output: Option<PathBuf>,     // SHI transmit drain
    pub cycles_per_sample: u32,
    pub core: u32,                       // CHIDR core index
    pub breakpoints: Vec<Word>,
    pub stopped: bool,                   // Debugger starts stopped
    pub steps: Option<u64>,              // Instructions to run before stopping
}

/// Configures command-line interface using clap
pub fn app<'a, 'b>() -> App<'a, 'b> {
    let description = "DSP56720 peripheral emulator driven by a stand-in core";
    App::new("DSP56720 peripherals")
        .version("0.1")
        .about(description)
        .arg(
            Arg::with_name("boot")
                .long("boot")
                .value_name("FILE")
                .takes_value(true)
                .required(true)
                .help("Boot image streamed into the SHI receive FIFO"),
        )
        .arg(
            Arg::with_name("input")
                .long("input")
                .value_name("CH=FILE")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("Feed an ESAI input channel from a file"),
        )
        .arg(
            Arg::with_name("output")
                .long("output")
                .value_name("CH=FILE")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("Drain an ESAI output channel into a file"),
        )
        .arg(
            Arg::with_name("shi-output")
                .long("shi-output")
                .value_name("FILE")
                .takes_value(true)
                .help("Drain the SHI transmit register into a file"),
        )
        .arg(
            Arg::with_name("cycles-per-sample")
                .long("cycles-per-sample")
                .value_name("N")
                .takes_value(true)
                .help("Core cycles per audio sample period"),
        )
        .arg(
            Arg::with_name("core")
                .long("core")
                .value_name("N")
                .takes_value(true)
                .help("Core index reported by CHIDR"),
        )
        .arg(
            Arg::with_name("break")
                .long("break")
                .value_name("ADDR")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("Hex program address to stop at"),
        )
        .arg(
            Arg::with_name("stopped")
                .long("stopped")
                .help("Start with execution stopped"),
        )
        .arg(
            Arg::with_name("steps")
                .long("steps")
                .value_name("N")
                .takes_value(true)
                .help("Run N instructions, then stop"),
        )
}

fn number<T: std::str::FromStr>(
    matches: &ArgMatches,
    flag: &'static str,
) -> Result<Option<T>, ConfigError> {
    match matches.value_of(flag) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber {
                flag,
                value: value.to_string(),
            }),
        None => Ok(None),
    }
}

fn address(flag: &'static str, value: &str) -> Result<Word, ConfigError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    Word::from_str_radix(digits, 16).map_err(|_| ConfigError::InvalidNumber {
        flag,
        value: value.to_string(),
    })
}

fn channels(
    matches: &ArgMatches,
    flag: &'static str,
    limit: usize,
) -> Result<Vec<(usize, PathBuf)>, ConfigError> {
    let values = match matches.values_of(flag) {
        Some(values) => values,
        None => return Ok(Vec::new()),
    };

    values
        .map(|value| {
            let invalid = || ConfigError::InvalidChannel {
                flag,
                value: value.to_string(),
                limit,
            };
            let mut parts = value.splitn(2, '=');
            let channel = parts
                .next()
                .and_then(|channel| channel.parse::<usize>().ok())
                .filter(|&channel| channel < limit)
                .ok_or_else(invalid)?;
            let path = parts
                .next()
                .filter(|path| !path.is_empty())
                .ok_or_else(invalid)?;
            Ok((channel, PathBuf::from(path)))
        })
        .collect()
}

impl Config {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, ConfigError> {
        let boot = matches
            .value_of("boot")
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("boot"))?;

        let breakpoints = match matches.values_of("break") {
            Some(values) => values
                .map(|value| address("break", value))
                .collect::<Result<_, _>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            boot,
            inputs: channels(matches, "input", RX_CHANNELS)?,
            outputs: channels(matches, "output", TX_CHANNELS)?,
            shi_output: matches.value_of("shi-output").map(PathBuf::from),
            cycles_per_sample: number(matches, "cycles-per-sample")?
                .unwrap_or(DEFAULT_CYCLES_PER_SAMPLE),
            core: number(matches, "core")?.unwrap_or(0),
            breakpoints,
            stopped: matches.is_present("stopped"),
            steps: number(matches, "steps")?,
        })
    }
}
