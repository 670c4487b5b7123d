use clap::Parser;
use std::path::{Path, PathBuf};

use tracing::info;
use tracing_subscriber::EnvFilter;

use getdeps::config::{Component, Config, expand_components, resolve_file};
use getdeps::fetch::HttpTransport;
use getdeps::hash::HashMode;
use getdeps::orchestrator::Fetcher;
use getdeps::overrides::UrlOverrides;
use getdeps::vcs::GitCli;
use getdeps::workspace::{get_base_dir, resolve_output_path};
use getdeps::{Error, Result, build_id, manifest};

/// Fetch the sources a firmware build depends on, as pinned in a JSON config.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// How content hashes are enforced
    #[arg(short = 'H', long = "hashmode", value_enum, default_value_t = HashMode::Strict)]
    hash_mode: HashMode,
    /// Comma-separated components to fetch (default: all)
    #[arg(short = 'C', long, default_value = "")]
    components: String,
    /// Configuration file
    #[arg(short = 'c', long, default_value = "config.json")]
    config: PathBuf,
    /// JSON file mapping URLs (or their base names) to replacement URLs
    #[arg(short = 'u', long = "url-overrides")]
    url_overrides: Option<PathBuf>,
    /// Write the resolved versions manifest here, relative to the working directory
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
    /// Directory that includes and file:// sources resolve against
    /// (default: the directory holding the config file)
    #[arg(short = 'd', long)]
    basedir: Option<PathBuf>,
    /// Debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let cwd = std::env::current_dir()
        .map_err(|e| Error::msg(format!("failed to get current working directory: {e}")))?;
    let base_dir = get_base_dir(args.basedir.as_deref(), &args.config, &cwd);
    let components = expand_components(&args.components)?;
    info!("hash mode {}; components {:?}", args.hash_mode, names(&components));

    let mut config = resolve_file(&args.config, &base_dir)?;
    let overrides = args
        .url_overrides
        .as_deref()
        .map(UrlOverrides::load)
        .transpose()?;

    let build_id = build_id::resolve_build_id(&args.config, &cwd);
    info!("build id {build_id}");

    let transport = HttpTransport::new()?;
    let vcs = GitCli;
    let fetcher = Fetcher {
        transport: &transport,
        vcs: &vcs,
        base_dir: &base_dir,
        overrides: overrides.as_ref(),
        hash_mode: args.hash_mode,
    };
    fetcher.fetch_all(&mut config, &components, &cwd)?;

    if let Some(out) = args.output.as_deref() {
        write_output(&cwd, out, &config, &components, &build_id)?;
    }
    Ok(())
}

fn write_output(
    cwd: &Path,
    out: &Path,
    config: &Config,
    components: &[Component],
    build_id: &str,
) -> Result<()> {
    let path = resolve_output_path(cwd, out);
    manifest::write_manifest(&path, config, components, build_id)?;
    Ok(())
}

fn names(components: &[Component]) -> Vec<&'static str> {
    components.iter().map(|c| c.as_str()).collect()
}
