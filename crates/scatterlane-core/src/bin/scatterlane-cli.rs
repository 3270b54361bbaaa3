use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use scatterlane_core::{
    CrossfadeShape, Engine, GenerationScope, MemoryTimeline, ScatterConfig, Session, TimeWindow,
    assets::load_asset_pool,
    diagnostics::init_tracing_with_config,
    fixtures::demo_session,
    persistence::{load_session, save_session},
    report::{plan_report, write_plan_report},
};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "scatterlane-cli")]
#[command(about = "Headless tools for planning and generating scattered ambience layers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file; discovered from the environment and cwd when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    DemoSession {
        /// Defaults to `demo.scatterlane.json` in the configured sessions dir.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Plan {
        #[command(flatten)]
        target: TargetArgs,

        #[arg(long)]
        output: Option<PathBuf>,
    },
    Generate {
        #[command(flatten)]
        target: TargetArgs,

        #[arg(long)]
        output: Option<PathBuf>,
    },
    Report {
        #[command(flatten)]
        target: TargetArgs,

        #[arg(long)]
        output: Option<PathBuf>,
    },
    ScanAssets {
        #[arg(long)]
        dir: Option<PathBuf>,

        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct TargetArgs {
    /// Session file; the built-in demo session is used when omitted.
    #[arg(long)]
    session: Option<PathBuf>,

    #[arg(long, default_value_t = 0.0)]
    start: f64,

    #[arg(long)]
    end: Option<f64>,

    #[arg(long)]
    group: Option<Uuid>,

    #[arg(long, requires = "group")]
    container: Option<Uuid>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum)]
    crossfade: Option<CrossfadeArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CrossfadeArg {
    Linear,
    EqualPower,
    SCurve,
}

impl From<CrossfadeArg> for CrossfadeShape {
    fn from(value: CrossfadeArg) -> Self {
        match value {
            CrossfadeArg::Linear => Self::Linear,
            CrossfadeArg::EqualPower => Self::EqualPower,
            CrossfadeArg::SCurve => Self::SCurve,
        }
    }
}

impl TargetArgs {
    fn scope(&self) -> GenerationScope {
        match (self.group, self.container) {
            (Some(group_id), Some(container_id)) => GenerationScope::Container {
                group_id,
                container_id,
            },
            (Some(group_id), None) => GenerationScope::Group { group_id },
            _ => GenerationScope::Session,
        }
    }

    fn window(&self, config: &ScatterConfig) -> anyhow::Result<TimeWindow> {
        let end = self
            .end
            .unwrap_or(self.start + config.generation.default_window_seconds);
        TimeWindow::new(self.start, end).context("rejected time window")
    }

    fn session(&self) -> anyhow::Result<Session> {
        match &self.session {
            Some(path) => load_session(path),
            None => Ok(demo_session()),
        }
    }

    fn engine(&self, config: &ScatterConfig) -> anyhow::Result<Engine> {
        let mut options = config.generation_options();
        if let Some(seed) = self.seed {
            options.seed = Some(seed);
        }
        if let Some(shape) = self.crossfade {
            options.schedule.crossfade_shape = shape.into();
        }
        Ok(Engine::new(self.session()?).with_options(options))
    }
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(value).context("failed to encode json output")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ScatterConfig::load_from(path)?,
        None => ScatterConfig::load_or_default()?,
    };
    let log_dir = cli
        .log_dir
        .clone()
        .unwrap_or_else(|| config.paths.logs_dir.clone());
    let _telemetry = init_tracing_with_config(&log_dir, &config.diagnostics)?;

    match cli.command {
        Commands::DemoSession { output } => {
            let output =
                output.unwrap_or_else(|| config.paths.session_file("demo.scatterlane.json"));
            save_session(&output, &demo_session())?;
            tracing::info!(path = %output.display(), "demo session written");
        }
        Commands::Plan { target, output } => {
            let output = output.unwrap_or_else(|| config.paths.plan_file("plan.json"));
            let engine = target.engine(&config)?;
            let plans = engine.plan(target.window(&config)?, target.scope())?;
            write_json(&output, &plans)?;
            tracing::info!(path = %output.display(), containers = plans.len(), "plan written");
        }
        Commands::Generate { target, output } => {
            let output = output.unwrap_or_else(|| config.paths.plan_file("timeline.json"));
            let engine = target.engine(&config)?;
            let mut timeline = MemoryTimeline::new();
            let summary =
                engine.generate(&mut timeline, target.window(&config)?, target.scope())?;
            write_json(&output, &timeline)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            if summary.skipped_count > 0 {
                tracing::warn!(
                    skipped = summary.skipped_count,
                    min_required_length = summary.min_required_length,
                    "some items were skipped; use longer assets or a smaller overlap"
                );
            }
        }
        Commands::Report { target, output } => {
            let output = output.unwrap_or_else(|| config.paths.plan_file("report.json"));
            let engine = target.engine(&config)?;
            let plans = engine.plan(target.window(&config)?, target.scope())?;
            let report = plan_report(engine.session().id, &plans)?;
            write_plan_report(&output, &report)?;
            tracing::info!(
                path = %output.display(),
                hash = %report.structure_hash,
                "plan report generated"
            );
        }
        Commands::ScanAssets { dir, cache_dir } => {
            let directories = dir.map_or_else(
                || config.assets.asset_directories.clone(),
                |dir| vec![dir],
            );
            let cache_dir = cache_dir.unwrap_or_else(|| config.assets.probe_cache_dir.clone());
            let mut pool = Vec::new();
            for directory in &directories {
                pool.extend(load_asset_pool(directory, &cache_dir)?);
            }
            println!("{}", serde_json::to_string_pretty(&pool)?);
        }
    }

    Ok(())
}
