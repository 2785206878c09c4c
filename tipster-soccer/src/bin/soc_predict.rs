use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use tipster_soccer::config::EngineConfig;
use tipster_soccer::data::LeagueData;
use tipster_soccer::domain::OddsQuote;
use tipster_soccer::predict::{MatchRequest, Predictor};
use tipster_soccer::print;
use tipster_soccer::rating::registry::RatingRegistry;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// file to source the league's historical matches from
    #[clap(short = 'f', long)]
    file: PathBuf,

    /// engine configuration file
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// home team
    #[clap(long)]
    home: Option<String>,

    /// away team
    #[clap(long)]
    away: Option<String>,

    /// bookmaker odds, e.g. "1=2.1,X=3.3,2=3.6,O2_5=1.9,U2_5=1.95"
    #[clap(short = 'o', long)]
    odds: Option<String>,

    /// half-life of match weights, in days
    #[clap(long = "half-life", env = "DC_HALFLIFE_DAYS")]
    half_life: Option<f64>,

    /// goals per side modelled in the scoreline grid
    #[clap(long = "max-goals", env = "DC_MAX_GOALS")]
    max_goals: Option<u8>,

    /// list the league's teams and exit
    #[clap(long)]
    teams: bool,

    /// print the fitted team ratings
    #[clap(long)]
    ratings: bool,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.teams {
            return Ok(());
        }
        match (&self.home, &self.away) {
            (Some(home), Some(away)) if home == away => bail!("a team cannot play itself"),
            (Some(_), Some(_)) => Ok(()),
            _ => bail!("both --home and --away must be specified"),
        }
    }

    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        if let Some(half_life) = self.half_life {
            config.rating.half_life_days = half_life;
        }
        if let Some(max_goals) = self.max_goals {
            config.scoregrid.max_goals = max_goals;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");
    let config = args.engine_config()?;
    let league = Arc::new(LeagueData::load(&args.file)?);
    info!("league: {} ({} matches)", league.name, league.matches.len());

    if args.teams {
        for name in league.roster().names() {
            println!("{name}");
        }
        return Ok(());
    }

    let registry = RatingRegistry::new(config.rating.clone());
    let snapshot = registry.ratings(league.clone()).await?;
    if args.ratings {
        info!(
            "Ratings v{} ({}), home advantage {:.3}, ρ {:.3}:\n{}",
            snapshot.version,
            snapshot.ratings.source,
            snapshot.ratings.home_advantage,
            snapshot.ratings.rho,
            Console::default().render(&print::tabulate_ratings(&snapshot.ratings))
        );
    }

    let odds = args.odds.as_deref().map(OddsQuote::parse).unwrap_or_default();
    let (Some(home), Some(away)) = (args.home.clone(), args.away.clone()) else {
        return Err(anyhow!("both --home and --away must be specified").into());
    };
    let request = MatchRequest::new(home, away).with_odds(odds);
    let prediction = Predictor::new(config).predict(&snapshot.ratings, &request)?;

    info!(
        "Markets:\n{}",
        Console::default().render(&print::tabulate_markets(&prediction))
    );
    info!(
        "Top scorelines:\n{}",
        Console::default().render(&print::tabulate_scorelines(prediction.top_scorelines()))
    );
    if prediction.is_blended() {
        info!(
            "Blend:\n{}",
            Console::default().render(&print::tabulate_blend(&prediction.blend_detail))
        );
    }
    if !prediction.value_table.is_empty() {
        info!(
            "Value:\n{}",
            Console::default().render(&print::tabulate_value(&prediction.value_table))
        );
    }
    if let Some(pick) = &prediction.pick {
        info!("Pick: {} ({:.0}/100)", pick.selection.label(), pick.confidence);
        for line in &pick.rationale {
            info!("  {line}");
        }
    }
    info!("{}", prediction.summary);
    Ok(())
}
