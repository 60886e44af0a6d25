use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use inscription_backdrop::color::parse_hex_color;
use inscription_backdrop::config::DEFAULT_CONFIG_PATH;
use inscription_backdrop::{
    Background, Compositor, Fetcher, GridSpec, HttpFetcher, Pipeline, TemplateCatalog, Workspace,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Composite inscription artwork onto a background
#[derive(Parser, Debug)]
#[command(name = "backdrop", version, about)]
#[command(group(ArgGroup::new("background").args(["color", "grid", "template"])))]
struct Cli {
    /// Comma-separated inscription numbers, e.g. 70300943,70300944
    ids: String,

    /// Configuration file, relative to --root unless absolute
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Workspace root holding core/ and the output directory
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Solid background color (#rgb or #rrggbb)
    #[arg(long)]
    color: Option<String>,

    /// Jittered grid background around this base color
    #[arg(long)]
    grid: Option<String>,

    /// Template index (0-4) from core/images/templates
    #[arg(long)]
    template: Option<usize>,

    /// Print one JSON object per inscription
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    inscription: &'a str,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    download_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn background(cli: &Cli, catalog: &TemplateCatalog) -> anyhow::Result<Background> {
    if let Some(index) = cli.template {
        return Ok(Background::Template(catalog.load(index)?));
    }
    if let Some(base) = &cli.grid {
        return Ok(Background::Grid(GridSpec::new(parse_hex_color(base)?)));
    }
    let color = cli.color.as_deref().unwrap_or("#000");
    Ok(Background::Solid(parse_hex_color(color)?))
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let workspace = Workspace::prepare(&cli.root, &cli.config).context("workspace bootstrap failed")?;

    let catalog = TemplateCatalog::new(workspace.templates_dir());
    let background = background(&cli, &catalog)?;

    let fetcher = HttpFetcher::new(workspace.settings.fetch.clone())?.with_scratch_dir(workspace.data_dir());
    let pipeline = Pipeline::new(fetcher, Compositor::new(workspace.output_dir()));

    let items = pipeline.process_batch(&cli.ids, &background, &mut rand::rng());
    let mut all_ok = true;
    for item in &items {
        let report = match &item.outcome {
            Ok(result) => Report {
                inscription: &item.identifier,
                ok: true,
                path: Some(result.path.display().to_string()),
                download_name: Some(result.download_name()),
                error: None,
            },
            Err(e) => {
                all_ok = false;
                Report {
                    inscription: &item.identifier,
                    ok: false,
                    path: None,
                    download_name: None,
                    error: Some(e.to_string()),
                }
            }
        };

        if cli.json {
            println!("{}", serde_json::to_string(&report)?);
        } else if let Some(path) = &report.path {
            println!("{}\t{}", report.inscription, path);
        } else {
            println!("{}\terror: {}", report.inscription, report.error.unwrap_or_default());
        }
    }
    Ok(all_ok)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("backdrop: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
