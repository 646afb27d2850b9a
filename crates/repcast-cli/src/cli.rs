//! Command-line arguments

use clap::{ArgAction, ArgGroup, Parser};
use repcast_core::{AudioFormat, RepcastConfig, TagOptions};
use std::path::{Path, PathBuf};

/// Build spoken workout tracks from an exercise list
#[derive(Debug, Parser)]
#[command(name = "repcast", version, about)]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .args(["xlsx", "csv", "stdin"])
))]
pub struct Cli {
    /// Output file; `.wav` selects WAV, anything else gets `.mp3` appended
    /// unless it already ends in `.mp3`
    pub output: PathBuf,

    /// Title of the merged file (defaults to the output file name)
    #[arg(long)]
    pub title: Option<String>,

    /// Artist tag for every file
    #[arg(long)]
    pub artist: Option<String>,

    /// Album tag for every file
    #[arg(long)]
    pub album: Option<String>,

    /// Combine every exercise into the output file
    #[arg(long)]
    pub merge: bool,

    /// Read exercises from a spreadsheet
    #[arg(long, value_name = "PATH")]
    pub xlsx: Option<PathBuf>,

    /// Read exercises from a CSV file
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Read `name,duration[,reps]` lines from standard input
    #[arg(long)]
    pub stdin: bool,

    /// TOML configuration file
    #[arg(long, env = "REPCAST_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Language code for the spoken instructions
    #[arg(long, value_name = "CODE")]
    pub language: Option<String>,

    /// Speak instructions slowly
    #[arg(long)]
    pub slow: bool,

    /// Directory holding the beep and finish clips
    #[arg(long, value_name = "DIR")]
    pub resources: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Where the exercise list comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Spreadsheet with a header row
    Xlsx(PathBuf),
    /// CSV file with a header row
    Csv(PathBuf),
    /// Lines on standard input, no header
    Stdin,
}

impl Cli {
    /// Selected exercise source
    pub fn input(&self) -> Input {
        match (&self.xlsx, &self.csv) {
            (Some(path), _) => Input::Xlsx(path.clone()),
            (None, Some(path)) => Input::Csv(path.clone()),
            (None, None) => Input::Stdin,
        }
    }

    /// Output path, with `.mp3` appended unless it names a supported format
    pub fn output_path(&self) -> PathBuf {
        let supported = self
            .output
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| AudioFormat::from_extension(ext).is_ok());
        if supported {
            self.output.clone()
        } else {
            let mut name = self.output.clone().into_os_string();
            name.push(".mp3");
            PathBuf::from(name)
        }
    }

    /// Directory for the per-exercise files
    pub fn output_dir(&self) -> PathBuf {
        self.output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }

    /// Tag choices from the command line
    pub fn tag_options(&self) -> TagOptions {
        TagOptions {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
        }
    }

    /// Default log filter for the chosen verbosity
    pub const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Apply command-line overrides on top of file configuration
    pub fn apply_overrides(&self, config: &mut RepcastConfig) {
        if let Some(language) = &self.language {
            config.synthesis.language.clone_from(language);
        }
        if self.slow {
            config.synthesis.slow = true;
        }
        if let Some(dir) = &self.resources {
            config.resources.dir.clone_from(dir);
        }
    }
}
