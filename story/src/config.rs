//! Command-line and environment configuration.

use crate::error::AppError;
use std::path::PathBuf;

/// Port used by `--serve` when neither `--port` nor `STORY_PORT` is given.
pub const DEFAULT_PORT: u16 = 8000;

/// Data directory used when neither `--data-dir` nor `STORY_DATA_DIR` is given.
pub const DEFAULT_DATA_DIR: &str = "story_data";

/// Resolved front-end settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Run the HTTP server instead of the interactive intake.
    pub serve: bool,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Model override; the client default is used when absent.
    pub model: Option<String>,
    pub analysis: bool,
    /// Stream story text to the terminal while it is generated.
    pub stream: bool,
    pub help: bool,
}

impl AppConfig {
    /// Build the configuration from process arguments and environment.
    pub fn from_args(args: &[String]) -> Result<Self, AppError> {
        Self::parse(args, |name| std::env::var(name).ok())
    }

    /// Parse arguments, reading defaults through `env`.
    ///
    /// Flags win over environment variables.
    pub fn parse(args: &[String], env: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let env = |name: &str| env(name).filter(|value| !value.trim().is_empty());

        let mut config = Self {
            serve: false,
            port: match env("STORY_PORT") {
                Some(port) => parse_port(&port)?,
                None => DEFAULT_PORT,
            },
            data_dir: env("STORY_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            model: env("STORY_MODEL"),
            analysis: true,
            stream: false,
            help: false,
        };

        // Skip the program name
        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--serve" => config.serve = true,
                "--no-analysis" => config.analysis = false,
                "--stream" => config.stream = true,
                "-h" | "--help" => config.help = true,
                "--port" => {
                    config.port = parse_port(flag_value(args, i)?)?;
                    i += 1;
                }
                "--data-dir" => {
                    config.data_dir = PathBuf::from(flag_value(args, i)?);
                    i += 1;
                }
                "--model" => {
                    config.model = Some(flag_value(args, i)?.to_string());
                    i += 1;
                }
                other => {
                    return Err(AppError::Config(format!(
                        "unknown argument '{other}' (try --help)"
                    )))
                }
            }
            i += 1;
        }

        Ok(config)
    }

    pub fn stories_dir(&self) -> PathBuf {
        self.data_dir.join(story_core::persist::STORIES_DIR)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn flag_value(args: &[String], i: usize) -> Result<&str, AppError> {
    args.get(i + 1)
        .map(String::as_str)
        .filter(|value| !value.starts_with("--"))
        .ok_or_else(|| AppError::Config(format!("{} needs a value", args[i])))
}

fn parse_port(value: &str) -> Result<u16, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("invalid port '{value}'")))
}

pub fn print_help() {
    println!("Magical Story Creator - personalized children's stories");
    println!();
    println!("USAGE:");
    println!("  story [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help          Show this help message");
    println!("  --serve             Run the HTTP API instead of the interactive creator");
    println!("  --port <PORT>       Port for --serve (default: {DEFAULT_PORT}, env STORY_PORT)");
    println!("  --data-dir <DIR>    Where characters, stories and logs are kept");
    println!("                      (default: {DEFAULT_DATA_DIR}, env STORY_DATA_DIR)");
    println!("  --model <NAME>      Gemini model to use (env STORY_MODEL)");
    println!("  --no-analysis       Skip the story analysis pass");
    println!("  --stream            Show the story as it is being written");
    println!();
    println!("ENVIRONMENT:");
    println!("  GEMINI_API_KEY      API key (GOOGLE_API_KEY is also accepted)");
    println!("  RUST_LOG            Log filter, e.g. info or story=debug");
    println!();
    println!("EXAMPLES:");
    println!("  story                              # Create a story interactively");
    println!("  story --stream --no-analysis");
    println!("  story --serve --port 8080          # POST /generate_story");
}
