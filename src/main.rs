use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use taxua_data::cache::{Resources, Subscription, SwrCache};
use taxua_data::config::Config;
use taxua_data::error::{ErrorHandler, RawError};
use taxua_data::event::{LifecycleEvent, LifecycleEvents};
use taxua_data::fetch::{DefaultFetcher, FallbackPolicy, ReqwestTransport};
use taxua_data::loader::{maps_loader, LoadOptions};
use taxua_data::models::Weather;

#[derive(Parser, Debug)]
#[command(name = "taxua")]
#[command(about = "Fetch and inspect Tà Xùa site data through the caching layer")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/taxua/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Write logs to this file instead of stderr
  #[arg(long)]
  log_file: Option<PathBuf>,

  /// Fail instead of serving mock data when the backend is unusable
  #[arg(long)]
  strict: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Fetch one resource and print it as JSON
  Fetch {
    #[command(subcommand)]
    resource: Resource,
  },
  /// Print weather for a location every time it refreshes
  WatchWeather {
    location: String,
    /// Stop after this many updates
    #[arg(short, long, default_value_t = 3)]
    updates: usize,
  },
  /// Load the maps SDK script and report whether it became available
  MapsCheck,
  /// Classify an error message and print what a user would see
  Errors { message: String },
}

#[derive(Subcommand, Debug)]
enum Resource {
  Attractions,
  Accommodations,
  Weather { location: String },
  Profile { user_id: String },
  Gallery { category: Option<String> },
  Search { query: String },
  Reviews { item_id: String, kind: String },
}

fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  match log_file {
    Some(path) => {
      let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| eyre!("Failed to open log file {}: {}", path.display(), e))?;
      let (writer, guard) = tracing_appender::non_blocking(file);
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
      Ok(None)
    }
  }
}

fn resources(config: &Config, strict: bool) -> Result<Resources> {
  let transport = ReqwestTransport::new(&config.api)?;
  let fallback = if strict {
    FallbackPolicy::Propagate
  } else {
    FallbackPolicy::MockData
  };
  let fetcher = DefaultFetcher::new(Arc::new(transport), fallback);
  Ok(Resources::new(SwrCache::new(), Arc::new(fetcher)))
}

async fn print_settled(mut subscription: Subscription) -> Result<()> {
  let state = subscription.settled().await;
  if let Some(error) = state.error {
    return Err(eyre!("{}", error.formatted()));
  }
  let data = state.data.unwrap_or_default();
  println!("{}", serde_json::to_string_pretty(&data)?);
  Ok(())
}

async fn fetch(resources: &Resources, resource: Resource) -> Result<()> {
  let subscription = match resource {
    Resource::Attractions => resources.attractions(),
    Resource::Accommodations => resources.accommodations(),
    Resource::Weather { location } => resources.weather(Some(&location)),
    Resource::Profile { user_id } => resources.user_profile(Some(&user_id)),
    Resource::Gallery { category } => resources.gallery(category.as_deref()),
    Resource::Search { query } => resources.search(&query),
    Resource::Reviews { item_id, kind } => resources.reviews(Some(&item_id), &kind),
  };
  print_settled(subscription).await
}

/// Treat each line on stdin as the window regaining focus.
///
/// Runs on a plain thread so a blocked read never holds up runtime shutdown.
fn forward_stdin(events: LifecycleEvents) {
  std::thread::spawn(move || {
    for line in std::io::stdin().lock().lines() {
      if line.is_err() {
        break;
      }
      events.emit(LifecycleEvent::Focus);
    }
  });
}

async fn watch_weather(resources: &Resources, location: &str, updates: usize) -> Result<()> {
  let events = LifecycleEvents::new();
  let listener = events.attach(resources.cache().clone());
  forward_stdin(events);

  let mut subscription = resources.weather(Some(location));
  let mut seen = 0;
  eprintln!("press Enter to refresh now");

  'updates: loop {
    let state = subscription.settled().await;
    match state.data_as::<Weather>() {
      Some(w) => println!(
        "{}: {}°C, {} (độ ẩm {}%)",
        w.location, w.temperature, w.condition, w.humidity
      ),
      None => println!("{}", serde_json::to_string(&state.data)?),
    }
    seen += 1;
    if seen >= updates {
      break;
    }

    // Wait for the next refresh to start
    loop {
      if !subscription.changed().await {
        break 'updates;
      }
      if subscription.is_validating() {
        break;
      }
    }
  }

  listener.abort();
  Ok(())
}

async fn maps_check(config: &Config) -> Result<()> {
  let loader = maps_loader(&config.maps).map_err(|e| eyre!("Maps loader unavailable: {}", e))?;
  let options = LoadOptions::from_config(&config.maps, Config::get_maps_api_key());

  loader
    .load(options)
    .await
    .map_err(|e| eyre!("Maps SDK unavailable: {}", e))?;
  println!("maps SDK loaded: {}", loader.is_loaded());
  Ok(())
}

fn classify(message: &str) {
  let handler = ErrorHandler::global();
  let error = handler.classify(&RawError::new(message), "cli");
  println!("{}", error.formatted());
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_tracing(args.log_file.as_deref())?;

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  match args.command {
    Command::Fetch { resource } => fetch(&resources(&config, args.strict)?, resource).await,
    Command::WatchWeather { location, updates } => {
      watch_weather(&resources(&config, args.strict)?, &location, updates).await
    }
    Command::MapsCheck => maps_check(&config).await,
    Command::Errors { message } => {
      classify(&message);
      Ok(())
    }
  }
}
