use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use energyviz::config::VizConfig;
use energyviz::data::{Dataset, Field};
use energyviz::parser::parse_script;
use energyviz::render;
use energyviz::runtime::{self, ChartInstance, ChartKind};
use energyviz::OutputFormat;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "energyviz")]
#[command(about = "Render the sustainable-energy charts and replay interaction on them", long_about = None)]
struct Cli {
    /// JSON config file; every key is optional
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Energy dataset CSV
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// World boundaries GeoJSON, as a path or http(s) URL
    #[arg(long, global = true)]
    boundaries: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Output width in pixels
    #[arg(long, global = true)]
    width: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render one chart in its initial state, or with the given selection
    Render {
        #[arg(value_enum)]
        chart: ChartKind,

        /// Country to show; repeat for several series
        #[arg(long = "country")]
        countries: Vec<String>,

        /// Year to show
        #[arg(long)]
        year: Option<i32>,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render every chart into a directory
    All {
        #[arg(long)]
        out_dir: PathBuf,
    },

    /// Run the bubble chart's animation, writing one frame per tick
    Play {
        #[arg(long, default_value_t = 10)]
        ticks: usize,

        /// Delay between ticks; the configured interval when omitted
        #[arg(long)]
        interval_ms: Option<u64>,

        #[arg(long)]
        out_dir: PathBuf,
    },

    /// Replay an event script against one chart
    Session {
        #[arg(value_enum)]
        chart: ChartKind,

        script: PathBuf,

        #[arg(long)]
        out_dir: PathBuf,
    },

    /// List the years present in the dataset
    Years,

    /// List the countries present in the dataset
    Countries,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "energyviz=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<VizConfig> {
    let mut config = match &cli.config {
        Some(path) => VizConfig::load(path)?,
        None => VizConfig::default(),
    };
    if let Some(data) = &cli.data {
        config.data = data.clone();
    }
    if let Some(boundaries) = &cli.boundaries {
        config.boundaries = boundaries.clone();
    }
    if let Some(format) = cli.format {
        config.render.format = format;
    }
    if cli.width.is_some() {
        config.render.width = cli.width;
    }
    Ok(config)
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory '{}'", dir.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Render {
            chart,
            countries,
            year,
            output,
        } => cmd_render(&config, *chart, countries, *year, output.as_deref()),
        Commands::All { out_dir } => cmd_all(&config, out_dir),
        Commands::Play {
            ticks,
            interval_ms,
            out_dir,
        } => {
            let interval = Duration::from_millis(interval_ms.unwrap_or(config.animation_interval_ms));
            cmd_play(&config, *ticks, interval, out_dir)
        }
        Commands::Session {
            chart,
            script,
            out_dir,
        } => cmd_session(&config, *chart, script, out_dir),
        Commands::Years => {
            let dataset = Dataset::load(&config.data, &[Field::Year])?;
            print_lines(dataset.years().iter().map(|y| y.to_string()))
        }
        Commands::Countries => {
            let dataset = Dataset::load(&config.data, &[])?;
            print_lines(dataset.entities().into_iter())
        }
    }
}

fn print_lines(lines: impl Iterator<Item = String>) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for line in lines {
        writeln!(handle, "{}", line).context("Failed to write to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

fn cmd_render(
    config: &VizConfig,
    chart: ChartKind,
    countries: &[String],
    year: Option<i32>,
    output: Option<&Path>,
) -> Result<()> {
    let mut instance = ChartInstance::load(chart, config)?;
    instance.start()?;
    instance.select(countries, year)?;
    let bytes = render::encode_scene(&instance.scene(), &config.render)
        .with_context(|| format!("Failed to encode {}", chart))?;

    match output {
        Some(path) => {
            std::fs::write(path, &bytes)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            info!(chart = %chart, path = %path.display(), "written");
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(&bytes)
                .context("Failed to write chart to stdout")?;
            handle.flush().context("Failed to flush stdout")?;
        }
    }
    Ok(())
}

fn cmd_all(config: &VizConfig, out_dir: &Path) -> Result<()> {
    create_dir(out_dir)?;
    let results = runtime::render_all(config, out_dir);
    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    for (kind, result) in &results {
        match result {
            Ok(path) => println!("{}: {}", kind, path.display()),
            Err(e) => eprintln!("{}: failed: {:#}", kind, e),
        }
    }
    if failed == results.len() {
        bail!("every chart failed to render");
    }
    Ok(())
}

fn cmd_play(config: &VizConfig, ticks: usize, interval: Duration, out_dir: &Path) -> Result<()> {
    create_dir(out_dir)?;
    let kind = ChartKind::Bubble;
    let ext = config.render.format.extension();
    let mut instance = ChartInstance::load(kind, config)?;
    let fired = runtime::play(&mut instance, ticks, interval, |i, scene| {
        let path = runtime::output_path(out_dir, kind, Some(i), ext);
        render::write_scene(scene, &path, &config.render)
    })?;
    info!(ticks = fired, "animation finished");
    Ok(())
}

fn cmd_session(config: &VizConfig, chart: ChartKind, script: &Path, out_dir: &Path) -> Result<()> {
    let text = std::fs::read_to_string(script)
        .with_context(|| format!("Failed to read script '{}'", script.display()))?;
    let events = parse_script(&text)
        .with_context(|| format!("Invalid script '{}'", script.display()))?;
    create_dir(out_dir)?;

    let ext = config.render.format.extension();
    let mut instance = ChartInstance::load(chart, config)?;
    let stdout = io::stdout();
    let frames = runtime::run_session(
        &mut instance,
        &events,
        |i, scene| {
            let path = runtime::output_path(out_dir, chart, Some(i), ext);
            render::write_scene(scene, &path, &config.render)
        },
        |id, tooltip| {
            let mut handle = stdout.lock();
            let written = match tooltip {
                Some(tip) => writeln!(handle, "{}\n", tip.to_text()),
                None => writeln!(handle, "{}: no tooltip\n", id),
            };
            written.context("Failed to write tooltip")
        },
    )?;
    info!(chart = %chart, frames, "session replayed");
    Ok(())
}
