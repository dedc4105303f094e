// Numan Thabit 2025
use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, ensure, Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::info;
use wrk_output::GoalConfig;

const DEFAULT_CONFIG_PATH: &str = "wrk-toolbox.toml";
const DEFAULT_OUTPUT_DIR: &str = "out";
const DEFAULT_WRITE_JSON: bool = true;

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Parse captured wrk/wrk2 output, check performance goals and store JSON results",
    rename_all = "kebab-case"
)]
pub struct CliArgs {
    /// Path to a TOML configuration file.
    #[arg(long, value_name = "PATH", env = "WRK_TOOLBOX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory receiving one JSON file per parsed report.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Suite identifier attached to every parsed report.
    #[arg(long)]
    pub suite_id: Option<String>,

    /// Skip writing JSON results.
    #[arg(long, default_value_t = false)]
    pub no_json: bool,

    /// Exit with an error when any performance goal is not satisfied.
    #[arg(long, default_value_t = false)]
    pub fail_on_goals: bool,

    /// Files holding the captured stdout of wrk or wrk2.
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub suite_id: Option<String>,
    pub write_json: bool,
    pub fail_on_goals: bool,
    pub goals: Vec<GoalConfig>,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    output_dir: Option<PathBuf>,
    suite_id: Option<String>,
    write_json: Option<bool>,
    fail_on_goals: Option<bool>,
    #[serde(default)]
    goals: Vec<GoalConfig>,
}

impl Config {
    pub fn from_cli(cli: &CliArgs) -> Result<Self> {
        let file_cfg =
            load_file_config(cli.config.as_deref()).context("failed to load config file")?;
        let config = merge(cli, file_cfg);
        config.validate()?;
        config.log_summary();
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.inputs.is_empty(), "at least one input file is required");
        if let Some(suite_id) = &self.suite_id {
            ensure!(!suite_id.trim().is_empty(), "suite_id must not be blank");
        }
        for goal in &self.goals {
            match *goal {
                GoalConfig::RequestsPerSecond { minimum } if minimum < 0.0 => {
                    bail!("requests-per-second goal minimum must not be negative");
                }
                GoalConfig::AvgLatency { limit } if limit <= 0.0 => {
                    bail!("avg-latency goal limit must be greater than 0 ms");
                }
                GoalConfig::PercentileLatency { percentile, limit } => {
                    if !(percentile > 0.0 && percentile <= 100.0) {
                        bail!("percentile-latency goal percentile must be within (0, 100]");
                    }
                    if limit <= 0.0 {
                        bail!("percentile-latency goal limit must be greater than 0 ms");
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn log_summary(&self) {
        info!(
            inputs = self.inputs.len(),
            output_dir = %self.output_dir.display(),
            suite_id = ?self.suite_id,
            write_json = self.write_json,
            fail_on_goals = self.fail_on_goals,
            goals = self.goals.len(),
            config = ?self.config_path,
            "wrk-toolbox configuration"
        );
    }
}

fn merge(cli: &CliArgs, file_cfg: Option<(PathBuf, FileConfig)>) -> Config {
    let (cfg_path, file_cfg) = file_cfg.unzip();
    let file_cfg = file_cfg.unwrap_or_default();

    let output_dir = pick(
        cli.output_dir.clone(),
        file_cfg.output_dir,
        PathBuf::from(DEFAULT_OUTPUT_DIR),
    );
    let suite_id = cli.suite_id.clone().or(file_cfg.suite_id);
    let write_json = !cli.no_json && file_cfg.write_json.unwrap_or(DEFAULT_WRITE_JSON);
    let fail_on_goals = cli.fail_on_goals || file_cfg.fail_on_goals.unwrap_or(false);

    Config {
        inputs: cli.inputs.clone(),
        output_dir,
        suite_id,
        write_json,
        fail_on_goals,
        goals: file_cfg.goals,
        config_path: cfg_path,
    }
}

fn pick<T>(cli: Option<T>, file: Option<T>, default: T) -> T {
    cli.or(file).unwrap_or(default)
}

fn load_file_config(path: Option<&Path>) -> Result<Option<(PathBuf, FileConfig)>> {
    if let Some(path) = path {
        return read_config(path).map(|cfg| Some((path.to_path_buf(), cfg)));
    }

    let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        return read_config(&default_path).map(|cfg| Some((default_path, cfg)));
    }

    Ok(None)
}

fn read_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        bail!("config file {} does not exist", path.display());
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let cfg: FileConfig = toml::from_str(&data)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(cfg)
}
