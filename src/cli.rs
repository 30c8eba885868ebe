use crate::{commands::merge::MergeOptions, constants::*, utils::util::Result};
use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use column_merge::MergeConfig;
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{io::Write, path::PathBuf};

/// Full version string including the crate version and git description.
///
/// # Examples
/// * `0.1.0-1ba958a-dirty` - while on a dirty branch
/// * `0.1.0-1ba958a` - with a fresh commit
/// * `0.1.0` - when built outside of a git checkout
pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    let git_describe = env!("VERGEN_GIT_DESCRIBE");
    if git_describe.is_empty() || git_describe == "VERGEN_IDEMPOTENT_OUTPUT" {
        env!("CARGO_PKG_VERSION").to_string()
    } else {
        format!("{}-{}", env!("CARGO_PKG_VERSION"), git_describe)
    }
});

#[derive(Parser, Debug)]
#[command(name="tabmerge",
          version=&**FULL_VERSION,
          about="Merge CSV, JSON and XML tables into one sorted TSV",
          long_about = None,
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true
    )]
    pub verbosity: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Merge every source file of a directory without prompting
    Merge(MergeArgs),
    /// Interactive text menu
    Menu(MenuArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Merge(_) => "merge",
            Command::Menu(_) => "menu",
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(arg_required_else_help(true))]
pub struct MergeArgs {
    /// Directory holding the .csv, .json and .xml sources; output goes to <DIR>/result/
    #[arg(
        short = 'd',
        long = "dir",
        value_name = "DIR",
        value_parser = check_dir_exists
    )]
    pub dir: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct MenuArgs {
    /// Directory offered as the default data directory
    #[arg(
        long = "default-dir",
        value_name = "DIR",
        default_value = DEFAULT_DATA_DIR
    )]
    pub default_dir: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct OutputArgs {
    /// Output file name, without extension
    #[arg(
        long = "output-name",
        value_name = "NAME",
        default_value = DEFAULT_OUTPUT_NAME,
        value_parser = check_file_name
    )]
    pub output_name: String,

    /// Output format, by file extension
    #[arg(
        long = "output-ext",
        value_name = "EXT",
        default_value = DEFAULT_OUTPUT_EXTENSION
    )]
    pub output_ext: String,

    /// Buffered record count above which a partial batch is sorted and written
    #[arg(
        help_heading("Advanced"),
        long,
        default_value_t = DEFAULT_FLUSH_THRESHOLD,
        value_parser = positive_count
    )]
    pub flush_threshold: usize,

    /// Number of leading columns that order each partial batch
    #[arg(
        help_heading("Advanced"),
        long,
        default_value_t = DEFAULT_PARTIAL_KEY_COLUMNS,
        value_parser = positive_count
    )]
    pub partial_key_columns: usize,

    /// Number of leading columns that order the final batch
    #[arg(
        help_heading("Advanced"),
        long,
        default_value_t = DEFAULT_FINAL_KEY_COLUMNS,
        value_parser = positive_count
    )]
    pub final_key_columns: usize,
}

impl OutputArgs {
    pub fn merge_options(&self) -> Result<MergeOptions> {
        let config = MergeConfig::new(
            self.flush_threshold,
            self.partial_key_columns,
            self.final_key_columns,
        )?;
        Ok(MergeOptions {
            output_name: self.output_name.clone(),
            output_extension: self.output_ext.clone(),
            config,
        })
    }
}

/// Initializes the verbosity level for logging based on the command-line arguments.
///
/// `-v` enables debug output and `-vv` trace output; the default is info.
pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.module_path().unwrap_or("unknown_module"),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn positive_count(s: &str) -> anyhow::Result<usize> {
    let count: usize = s
        .parse::<usize>()
        .map_err(|_| anyhow!("`{}` is not a valid count", s))?;
    if count == 0 {
        return Err(anyhow!("Value must be >= 1"));
    }
    Ok(count)
}

fn check_dir_exists(s: &str) -> anyhow::Result<PathBuf> {
    let path = PathBuf::from(s);
    if !path.is_dir() {
        return Err(anyhow!("Directory does not exist: {}", path.display()));
    }
    Ok(path)
}

fn check_file_name(s: &str) -> anyhow::Result<String> {
    if s.is_empty() || s.contains(['/', '\\']) {
        return Err(anyhow!("`{}` is not a plain file name", s));
    }
    Ok(s.to_string())
}
