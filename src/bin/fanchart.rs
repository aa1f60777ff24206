use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use fanchart::{BatchStatus, Chart, Configuration, DataSource as _, PersonNode, StaticDataSource};

#[derive(Parser, Debug)]
#[command(name = "fanchart", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a dataset as an SVG or PNG.
    Render(RenderArgs),
    /// Animate from one dataset to another and write the settled SVG.
    Update(UpdateArgs),
    /// Export a dataset as a PNG through the export path.
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input dataset JSON (array of person nodes).
    #[arg(long = "in", conflicts_with = "url")]
    in_path: Option<PathBuf>,

    /// Fetch the dataset from this URL instead of a file.
    #[arg(long)]
    url: Option<String>,

    /// Chart configuration JSON; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output path.
    #[arg(long)]
    out: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Svg)]
    format: Format,
}

#[derive(Parser, Debug)]
struct UpdateArgs {
    /// Dataset the chart starts from.
    #[arg(long)]
    from: PathBuf,

    /// Dataset the chart animates to.
    #[arg(long)]
    to: PathBuf,

    /// Chart configuration JSON; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Milliseconds advanced per tick while settling the animation.
    #[arg(long, default_value_t = 16.0)]
    step_ms: f64,

    /// Output SVG path for the settled scene.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input dataset JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Chart configuration JSON; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for the PNG.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Output filename; the default export name applies when omitted.
    #[arg(long)]
    filename: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Svg,
    Png,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Update(args) => cmd_update(args),
        Command::Export(args) => cmd_export(args),
    }
}

fn read_dataset(path: &Path) -> anyhow::Result<Vec<PersonNode>> {
    let f = File::open(path).with_context(|| format!("open dataset '{}'", path.display()))?;
    let nodes: Vec<PersonNode> =
        serde_json::from_reader(BufReader::new(f)).context("parse dataset JSON")?;
    Ok(nodes)
}

fn read_config(path: Option<&Path>) -> anyhow::Result<Configuration> {
    let Some(path) = path else {
        return Ok(Configuration::default());
    };
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let config: Configuration =
        serde_json::from_reader(BufReader::new(f)).context("parse config JSON")?;
    Ok(config)
}

fn write_out(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let dataset = match (&args.in_path, &args.url) {
        (Some(path), None) => read_dataset(path)?,
        (None, Some(url)) => fanchart::HttpDataSource::new()?.fetch(url)?,
        _ => anyhow::bail!("pass exactly one of --in and --url"),
    };

    let config = read_config(args.config.as_deref())?;
    let mut chart = Chart::new(config, StaticDataSource::new())?;
    chart.draw(dataset)?;

    match args.format {
        Format::Svg => write_out(&args.out, chart.svg()?.as_bytes())?,
        Format::Png => write_out(&args.out, &chart.export()?.png)?,
    }
    Ok(())
}

fn cmd_update(args: UpdateArgs) -> anyhow::Result<()> {
    if !args.step_ms.is_finite() || args.step_ms <= 0.0 {
        anyhow::bail!("--step-ms must be a positive number");
    }

    let from = read_dataset(&args.from)?;
    let to = read_dataset(&args.to)?;
    let config = read_config(args.config.as_deref())?;

    let mut source = StaticDataSource::new();
    source.insert("next", to);
    let mut chart = Chart::new(config, source)?;
    chart.draw(from)?;
    chart.update("next", || tracing::debug!("update cycle settled"))?;

    while chart.advance(args.step_ms)? == BatchStatus::Running {}

    write_out(&args.out, chart.svg()?.as_bytes())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let dataset = read_dataset(&args.in_path)?;
    let config = read_config(args.config.as_deref())?;
    let mut chart = Chart::new(config, StaticDataSource::new())?;
    chart.draw(dataset)?;

    let path = chart.export_to_file(&args.out_dir, args.filename.as_deref())?;
    println!("{}", path.display());
    Ok(())
}
