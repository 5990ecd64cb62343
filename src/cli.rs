//! CLI argument parsing with clap

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Photo Mover - copy a folder of photos and videos into a dated library
///
/// Photos are sorted into YEAR/MONTH folders by their capture date, movies
/// into Movies/ and everything else into Other/. Photos already in the
/// library are recognized even when rotated.
#[derive(Parser, Debug)]
#[command(name = "photo-mover")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Source folder to copy from
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Destination library folder
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// Number of files copied in parallel (0 = auto)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Hash distance below which photos count as the same picture
    #[arg(long)]
    pub threshold: Option<u32>,

    /// Stop after this many files have been handled
    #[arg(long)]
    pub limit: Option<usize>,

    /// Do not read or update the remembered folders
    #[arg(long)]
    pub forget_locations: bool,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub sample_config: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref source) = self.source {
            config.source_dir = Some(source.clone());
        }
        if let Some(ref dest) = self.dest {
            config.dest_dir = Some(dest.clone());
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(threshold) = self.threshold {
            config.similarity_threshold = threshold;
        }
        if self.forget_locations {
            config.remember_locations = false;
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_flags() {
        let cli = Cli::parse_from(["photo-mover", "-s", "/card", "-d", "/lib", "-w", "2"]);
        let config = cli.to_config();

        assert_eq!(config.source_dir, Some(PathBuf::from("/card")));
        assert_eq!(config.dest_dir, Some(PathBuf::from("/lib")));
        assert_eq!(config.workers, 2);
        assert!(config.remember_locations);
    }

    #[test]
    fn test_cli_overrides_file_settings() {
        let file = Config {
            source_dir: Some(PathBuf::from("/from-file")),
            dest_dir: Some(PathBuf::from("/lib")),
            workers: 8,
            ..Config::default()
        };
        let cli = Cli::parse_from([
            "photo-mover",
            "--source",
            "/card",
            "--threshold",
            "3",
            "--forget-locations",
        ]);

        let config = cli.merge_with_config(file);
        assert_eq!(config.source_dir, Some(PathBuf::from("/card")));
        assert_eq!(config.dest_dir, Some(PathBuf::from("/lib")));
        assert_eq!(config.workers, 8);
        assert_eq!(config.similarity_threshold, 3);
        assert!(!config.remember_locations);
    }

    #[test]
    fn test_config_name() {
        let cli = Cli::parse_from(["photo-mover", "-C", "Config/holiday.toml"]);
        assert_eq!(cli.config_name(), Some("holiday".to_string()));
    }
}
