// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info};
use std::io::Write;
use std::path::PathBuf;

use phrase_drill::app_config::{self, Config};
use phrase_drill::app_controller::Controller;
use phrase_drill::drill::Language;
use phrase_drill::speech::SpeechBackend;
use phrase_drill::store::NewPhrase;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for SpeechBackend to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliSpeechBackend {
    Say,
    Espeak,
    Silent,
}

impl From<CliSpeechBackend> for SpeechBackend {
    fn from(cli_backend: CliSpeechBackend) -> Self {
        match cli_backend {
            CliSpeechBackend::Say => SpeechBackend::Say,
            CliSpeechBackend::Espeak => SpeechBackend::Espeak,
            CliSpeechBackend::Silent => SpeechBackend::Silent,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play the drill (default command)
    Drill(DrillArgs),

    /// List catalog phrases
    List {
        /// Include inactive phrases
        #[arg(short, long)]
        all: bool,
    },

    /// Show available voices and the selected default per language
    Voices,

    /// Add a phrase to the catalog
    Add(AddArgs),

    /// Remove a phrase from the catalog
    Remove {
        /// Phrase id as shown by `list`
        id: String,
    },

    /// Show lifetime repetition totals for the configured user
    Progress,

    /// Generate shell completions for phrase-drill
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
struct DrillArgs {
    /// Keep the session open and read commands from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Speech rate (0.5 to 1.5)
    #[arg(short, long)]
    rate: Option<f32>,

    /// Mandarin repetitions per phrase (1 to 10)
    #[arg(short = 'n', long)]
    repetitions: Option<u32>,

    /// Shuffle phrase order
    #[arg(short, long)]
    shuffle: bool,

    /// Only drill phrases in this category
    #[arg(short, long)]
    category: Option<String>,

    /// Speech backend to use
    #[arg(short, long, value_enum)]
    backend: Option<CliSpeechBackend>,

    /// Practising user id (enables lifetime progress)
    #[arg(short, long, env = "PHRASE_DRILL_USER")]
    user: Option<String>,
}

#[derive(Args, Debug)]
struct AddArgs {
    /// English text
    english: String,

    /// Chinese text
    chinese: String,

    /// Pinyin transcription
    #[arg(short, long)]
    pinyin: Option<String>,

    /// Category label
    #[arg(short, long)]
    category: Option<String>,

    /// Usage example
    #[arg(short, long)]
    example: Option<String>,
}

/// phrase-drill - English/Mandarin pronunciation drills
///
/// Speaks each phrase once in English and then several times in Mandarin,
/// counting how often every Mandarin phrase was heard.
#[derive(Parser, Debug)]
#[command(name = "phrase-drill")]
#[command(version)]
#[command(about = "Spoken English/Mandarin phrase drills")]
#[command(long_about = "phrase-drill speaks paired English/Mandarin phrases aloud in a fixed cadence.

EXAMPLES:
    phrase-drill                                   # Play the drill once with the config defaults
    phrase-drill drill -n 5 --shuffle              # Five Mandarin repetitions, shuffled order
    phrase-drill drill -c greetings -r 0.7         # Only greetings, slower speech
    phrase-drill drill --interactive               # Control playback from the keyboard
    phrase-drill add \"Good morning\" \"早上好\" -p \"zǎo shang hǎo\"
    phrase-drill voices                            # Show voices and the default picks
    phrase-drill completions bash > phrase-drill.bash

CONFIGURATION:
    Configuration is stored in drill.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(long = "config", global = true, default_value = "drill.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Accept everything at the logger; the effective level is set through
    // log::set_max_level once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "phrase-drill", &mut std::io::stdout());
        return Ok(());
    }

    let command = cli.command.unwrap_or(Commands::Drill(DrillArgs::default()));

    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;
    if let Commands::Drill(args) = &command {
        apply_drill_overrides(&mut config, args);
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?;

    let result = run_command(&controller, command).await;
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

fn apply_drill_overrides(config: &mut Config, args: &DrillArgs) {
    if let Some(rate) = args.rate {
        config.playback.rate = rate;
    }
    if let Some(repetitions) = args.repetitions {
        config.playback.repetitions = repetitions;
    }
    if args.shuffle {
        config.playback.shuffle = true;
    }
    if let Some(category) = &args.category {
        config.playback.category = category.clone();
    }
    if let Some(backend) = &args.backend {
        config.speech.backend = backend.clone().into();
    }
    if let Some(user) = &args.user {
        config.user = Some(user.clone());
    }
}

async fn run_command(controller: &Controller, command: Commands) -> Result<()> {
    match command {
        Commands::Drill(args) => controller.run_drill(args.interactive).await?,
        Commands::List { all } => {
            let phrases = controller.list_phrases(all).await?;
            if phrases.is_empty() {
                println!("No phrases yet.");
            }
            for phrase in phrases {
                println!(
                    "{}  {} / {}{}  [{}]",
                    phrase.id,
                    phrase.english,
                    phrase.chinese,
                    phrase.pinyin.map(|p| format!(" ({})", p)).unwrap_or_default(),
                    phrase.category.unwrap_or_default()
                );
            }
        }
        Commands::Voices => {
            let directory = controller.list_voices().await;
            for language in [Language::English, Language::Mandarin] {
                let selection = directory.selection(language);
                println!(
                    "{} (default: {})",
                    language.display_name(),
                    selection.chosen.as_ref().map_or("platform default", |v| v.name.as_str())
                );
                for voice in &selection.candidates {
                    println!("  {:<32} {}", voice.name, voice.lang);
                }
            }
        }
        Commands::Add(args) => {
            let phrase = NewPhrase {
                english: args.english,
                chinese: args.chinese,
                pinyin: args.pinyin,
                category: args.category,
                example: args.example,
            };
            let created = controller.add_phrase(phrase).await?;
            println!("{}", created.id);
        }
        Commands::Remove { id } => controller.remove_phrase(&id).await?,
        Commands::Progress => {
            let rows = controller.progress().await?;
            for (phrase, total) in rows {
                println!("{:>6}  {} / {}", total, phrase.english, phrase.chinese);
            }
            info!("{}", controller.stats()?);
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
