use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use itinera_agents::{
    AgentConfig, HttpPlanningBackend, OpenWeatherProvider, PlanInput, PlannerAgent, ReplanInput,
};
use itinera_core::{
    build_itinerary, clean_for_display, fill_missing_places, parse_with_today, replan_by_distance,
    split_interests, Itinerary, NameTable, Poi, ReplanMode, ReplanRequest, TripRequest,
};
use itinera_observability::{init_tracing, AppMetrics};
use serde::de::DeserializeOwned;

#[derive(Debug, Parser)]
#[command(name = "itinera")]
#[command(about = "Itinera trip planner CLI")]
struct Cli {
    #[arg(long, env = "ITINERA_BACKEND_URL")]
    backend_url: Option<String>,

    /// Treat this date as today (YYYY-MM-DD).
    #[arg(long)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract city, days and start date from free text.
    Parse { query: String },
    /// Build a schedule locally from a JSON array of POIs.
    Build {
        #[arg(long)]
        pois: PathBuf,
        #[arg(long)]
        city: String,
        #[arg(long, default_value_t = 2)]
        days: u32,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        interests: String,
        #[arg(long)]
        display: bool,
    },
    /// Reorder the sightseeing stops of an itinerary JSON file by distance.
    Replan { itinerary: PathBuf },
    /// Ask the planning backend for an itinerary.
    Plan {
        #[arg(default_value = "")]
        query: String,
        #[arg(long, default_value = "")]
        city: String,
        #[arg(long)]
        days: Option<i64>,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long, default_value = "")]
        interests: String,
        /// Replan through the backend instead of planning from scratch.
        #[arg(long, value_enum)]
        replan: Option<ModeArg>,
        /// Previous itinerary used when a distance replan falls back locally.
        #[arg(long)]
        previous: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show the daily forecast for a city.
    Weather { city: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Default,
    Distance,
}

impl From<ModeArg> for ReplanMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Default => ReplanMode::Default,
            ModeArg::Distance => ReplanMode::Distance,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("itinera_cli");
    let cli = Cli::parse();
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());

    match cli.command {
        Command::Parse { query } => {
            let parsed = parse_with_today(&query, today);
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
        Command::Build {
            pois,
            city,
            days,
            start_date,
            interests,
            display,
        } => {
            let pois: Vec<Poi> = read_json(&pois)?;
            let itinerary = build_itinerary(
                &pois,
                days,
                start_date.unwrap_or(today),
                &city,
                &split_interests(&interests),
            );
            let itinerary = if display {
                prepare(&itinerary)
            } else {
                itinerary
            };
            println!("{}", serde_json::to_string_pretty(&itinerary)?);
        }
        Command::Replan { itinerary } => {
            let itinerary: Itinerary = read_json(&itinerary)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&replan_by_distance(&itinerary))?
            );
        }
        Command::Plan {
            query,
            city,
            days,
            start_date,
            interests,
            replan,
            previous,
            seed,
        } => {
            let agent = build_agent(cli.backend_url)?;
            let trip = TripRequest {
                city,
                days,
                start_date,
                interests: split_interests(&interests),
            };

            let itinerary = match replan {
                None => agent.plan(PlanInput { query, trip }, today).await?,
                Some(mode) => {
                    let previous = previous
                        .as_deref()
                        .map(read_json::<Itinerary>)
                        .transpose()?;
                    let input = ReplanInput {
                        query,
                        request: ReplanRequest {
                            trip,
                            shuffle: true,
                            seed,
                            mode: mode.into(),
                        },
                        previous,
                    };
                    agent.replan(input, today).await?
                }
            };
            println!("{}", serde_json::to_string_pretty(&itinerary)?);
        }
        Command::Weather { city } => {
            let agent = build_agent(cli.backend_url)?;
            let forecast = agent.forecast(&city).await?;
            println!("{}", serde_json::to_string_pretty(&forecast)?);
        }
    }

    Ok(())
}

fn prepare(itinerary: &Itinerary) -> Itinerary {
    let mut names = NameTable::new();
    let mut prepared = clean_for_display(itinerary, &mut names);
    fill_missing_places(&mut prepared);
    prepared
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn build_agent(
    backend_url: Option<String>,
) -> Result<PlannerAgent<HttpPlanningBackend, OpenWeatherProvider>> {
    let mut config = AgentConfig::from_env();
    if let Some(url) = backend_url {
        config = config.with_backend_url(url);
    }

    let backend = Arc::new(HttpPlanningBackend::new(&config)?);
    let weather = config
        .openweather_api_key
        .as_deref()
        .map(|key| OpenWeatherProvider::new(key, config.http_timeout))
        .transpose()?
        .map(Arc::new);

    Ok(PlannerAgent::new(backend, weather, AppMetrics::shared()))
}
