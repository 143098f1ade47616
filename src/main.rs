use anyhow::{Context, Result};
use clap::Parser;
use dailybrief::app::{App, AppEvent};
use dailybrief::config::Config;
use dailybrief::content::{ContentStore, RestStore};
use dailybrief::menu::Selection;
use dailybrief::playback::{command, CommandSpeechEngine, NoSpeech, SpeechEngine, SpeechHandle};
use dailybrief::sync::FeedSynchronizer;
use dailybrief::ui;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(
    name = "dailybrief",
    about = "Terminal client for a daily news brief and quote feed, with read-aloud"
)]
struct Args {
    /// Config file (default: ~/.config/dailybrief/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initial category (flat menus)
    #[arg(long, value_name = "NAME", conflicts_with_all = ["main", "sub"])]
    category: Option<String>,

    /// Initial main category (two-level menus)
    #[arg(long, value_name = "NAME")]
    main: Option<String>,

    /// Initial sub-category (two-level menus; requires --main)
    #[arg(long, value_name = "NAME", requires = "main")]
    sub: Option<String>,

    /// Run without a speech engine
    #[arg(long)]
    no_speech: bool,

    /// Fetch the quote and initial selection, print once, and exit
    #[arg(long)]
    once: bool,
}

fn build_speech(
    config: &Config,
    no_speech: bool,
    completions: mpsc::UnboundedSender<SpeechHandle>,
) -> Box<dyn SpeechEngine> {
    if no_speech || !config.speech.enabled {
        tracing::info!("Speech disabled");
        return Box::new(NoSpeech);
    }
    let program = config
        .speech
        .program
        .clone()
        .unwrap_or_else(|| command::default_program().to_string());
    tracing::debug!(program = %program, "Using command speech engine");
    Box::new(CommandSpeechEngine::new(
        program,
        config.speech.args.clone(),
        completions,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with the printed view
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config.clone() {
        Some(path) => path,
        None => Config::default_path().context("HOME environment variable not set")?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Command-line selection overrides the config file
    if args.category.is_some() {
        config.default_category = args.category.clone();
    }
    if args.main.is_some() {
        config.default_main = args.main.clone();
        config.default_sub = args.sub.clone();
    }

    let menu = config.to_menu().context("Invalid menu configuration")?;
    let initial: Selection = config.initial_selection(&menu);
    let feed = FeedSynchronizer::new(menu, initial).context("Invalid initial selection")?;

    let settings = config.store_settings()?;
    let timeout = settings.timeout;
    let store: Arc<dyn ContentStore> =
        Arc::new(RestStore::new(settings).context("Failed to create store client")?);

    let (speech_tx, speech_rx) = mpsc::unbounded_channel::<SpeechHandle>();
    let speech = build_speech(&config, args.no_speech, speech_tx);

    let mut app = App::new(store, feed, speech);

    // Create event channel for background tasks
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);

    if args.once {
        ui::run_once(&mut app, event_tx, event_rx, timeout * 2).await?;
    } else {
        ui::run(&mut app, event_tx, event_rx, speech_rx).await?;
        println!("Goodbye!");
    }
    Ok(())
}
