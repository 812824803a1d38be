//! Bikeride CLI - Command-line interface for bikeride
//!
//! Commands:
//! - summary: Summarize one or more track files
//! - segments: Export the segments of a track as CSV
//! - station: Find the nearest KNMI weather station

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bikeride::weather::knmi;
use bikeride::{
    Position, Ride, RideError, RideOptions, RouteLimits, SummaryReport, TrackFormat, WeatherConfig,
    BIKERIDE_VERSION,
};

/// Bikeride - GPS ride analysis
#[derive(Parser)]
#[command(name = "bikeride")]
#[command(version = BIKERIDE_VERSION)]
#[command(about = "Summarize bicycle rides from FIT and GPX tracks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize one or more track files
    Summary {
        /// Track files (.fit or .gpx)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        ride: RideArgs,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Export the segments of a track as CSV
    Segments {
        /// Track file (.fit or .gpx)
        file: PathBuf,

        #[command(flatten)]
        ride: RideArgs,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the KNMI station nearest to a location
    Station {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
    },
}

/// Options shared by commands that process a track
#[derive(Args)]
struct RideArgs {
    /// JSON options file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Track format, overriding the file extension
    #[arg(long)]
    format: Option<FormatArg>,

    /// Start location as LAT,LON
    #[arg(long, value_parser = parse_position, requires_all = ["end", "threshold"])]
    start: Option<Position>,

    /// End location as LAT,LON
    #[arg(long, value_parser = parse_position, requires = "start")]
    end: Option<Position>,

    /// Maximum distance in meters between a location and the track
    #[arg(long, requires = "start")]
    threshold: Option<f64>,

    /// CSV weather table to join onto segments
    #[arg(long)]
    weather_csv: Option<PathBuf>,

    /// Additional segment field to aggregate (repeatable)
    #[arg(long = "var")]
    vars: Vec<String>,
}

impl RideArgs {
    fn options(&self) -> Result<RideOptions, CliFailure> {
        let mut options = match &self.config {
            Some(path) => RideOptions::from_json_file(path)?,
            None => RideOptions::default(),
        };

        if let Some(format) = self.format {
            options.format = Some(format.into());
        }
        if let (Some(start), Some(end), Some(threshold)) = (self.start, self.end, self.threshold) {
            options.limits = Some(RouteLimits::new(start, end, threshold));
        }
        if let Some(path) = &self.weather_csv {
            options.weather = Some(WeatherConfig::Csv { path: path.clone() });
        }
        for var in &self.vars {
            if !options.additional_vars.contains(var) {
                options.additional_vars.push(var.clone());
            }
        }

        options.validate()?;
        Ok(options)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Fit,
    Gpx,
}

impl From<FormatArg> for TrackFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Fit => TrackFormat::Fit,
            FormatArg::Gpx => TrackFormat::Gpx,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one summary per line)
    Ndjson,
    /// JSON array of summaries
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn parse_position(value: &str) -> Result<Position, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{}'", value))?;
    let lat: f64 = lat.trim().parse().map_err(|_| format!("invalid latitude '{}'", lat))?;
    let lon: f64 = lon.trim().parse().map_err(|_| format!("invalid longitude '{}'", lon))?;
    Ok(Position::new(lat, lon))
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliFailure> {
    match cli.command {
        Commands::Summary {
            files,
            ride,
            output_format,
        } => cmd_summary(&files, &ride.options()?, output_format),

        Commands::Segments { file, ride, output } => {
            cmd_segments(&file, &ride.options()?, output.as_deref())
        }

        Commands::Station { lat, lon } => cmd_station(Position::new(lat, lon)),
    }
}

fn cmd_summary(
    files: &[PathBuf],
    options: &RideOptions,
    output_format: OutputFormat,
) -> Result<(), CliFailure> {
    let mut reports: Vec<SummaryReport> = Vec::with_capacity(files.len());
    for file in files {
        let ride = Ride::from_path(file, options)?;
        reports.push(ride.summary(None));
    }

    let pretty = atty::is(atty::Stream::Stdout);
    let output = match output_format {
        OutputFormat::Ndjson if pretty => {
            let mut blocks = Vec::with_capacity(reports.len());
            for report in &reports {
                blocks.push(serde_json::to_string_pretty(report)?);
            }
            blocks.join("\n") + "\n"
        }
        OutputFormat::Ndjson => {
            let mut lines = Vec::with_capacity(reports.len());
            for report in &reports {
                lines.push(serde_json::to_string(report)?);
            }
            lines.join("\n") + "\n"
        }
        OutputFormat::Json => serde_json::to_string(&reports)? + "\n",
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&reports)? + "\n",
    };

    io::stdout().write_all(output.as_bytes())?;
    Ok(())
}

fn cmd_segments(file: &Path, options: &RideOptions, output: Option<&Path>) -> Result<(), CliFailure> {
    let ride = Ride::from_path(file, options)?;
    if ride.segments.is_empty() {
        return Err(CliFailure::NoSegments(file.display().to_string()));
    }

    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };
    let mut writer = csv::Writer::from_writer(sink);

    let weather_columns: BTreeSet<&String> =
        ride.segments.iter().flat_map(|s| s.weather.keys()).collect();
    let mut header: Vec<&str> = bikeride::Segment::FIELD_NAMES.to_vec();
    header.extend(weather_columns.iter().map(|c| c.as_str()));
    writer.write_record(&header)?;

    for segment in &ride.segments {
        let row: Vec<String> = header
            .iter()
            .map(|name| segment.field(name).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn cmd_station(position: Position) -> Result<(), CliFailure> {
    if !position.is_valid() {
        return Err(CliFailure::InvalidArgs(format!(
            "{},{} is not a valid coordinate",
            position.lat, position.lon
        )));
    }
    let station = knmi::nearest_station(position);
    let report = serde_json::json!({
        "id": station.id,
        "name": station.name,
        "lat": station.lat,
        "lon": station.lon,
    });

    if atty::is(atty::Stream::Stdout) {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum CliFailure {
    Io(io::Error),
    Ride(RideError),
    Json(serde_json::Error),
    Csv(csv::Error),
    NoSegments(String),
    InvalidArgs(String),
}

impl From<io::Error> for CliFailure {
    fn from(e: io::Error) -> Self {
        CliFailure::Io(e)
    }
}

impl From<RideError> for CliFailure {
    fn from(e: RideError) -> Self {
        CliFailure::Ride(e)
    }
}

impl From<serde_json::Error> for CliFailure {
    fn from(e: serde_json::Error) -> Self {
        CliFailure::Json(e)
    }
}

impl From<csv::Error> for CliFailure {
    fn from(e: csv::Error) -> Self {
        CliFailure::Csv(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliFailure> for CliError {
    fn from(e: CliFailure) -> Self {
        match e {
            CliFailure::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliFailure::Ride(e) => {
                let (code, hint) = match &e {
                    RideError::UnsupportedFormat(_) => {
                        ("UNSUPPORTED_FORMAT", Some("Use a .fit or .gpx file, or pass --format"))
                    }
                    RideError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
                    RideError::Json(_) | RideError::InvalidConfig(_) => {
                        ("CONFIG_ERROR", Some("Check the --config file and flags"))
                    }
                    RideError::Csv(_) | RideError::WeatherParse(_) => {
                        ("WEATHER_ERROR", Some("Check the weather data file"))
                    }
                    RideError::MalformedTrack(_) => ("PARSE_ERROR", None),
                    RideError::ConflictingSelection => ("SELECTION_ERROR", None),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: hint.map(str::to_string),
                }
            }
            CliFailure::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            CliFailure::Csv(e) => CliError {
                code: "CSV_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the output path".to_string()),
            },
            CliFailure::NoSegments(file) => CliError {
                code: "NO_SEGMENTS".to_string(),
                message: format!("No segments found in {}", file),
                hint: Some("Check the track contains timestamped positions".to_string()),
            },
            CliFailure::InvalidArgs(msg) => CliError {
                code: "INVALID_ARGS".to_string(),
                message: msg,
                hint: None,
            },
        }
    }
}
