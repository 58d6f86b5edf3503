use std::path::PathBuf;

use builder_engine::{
    resolve_app_paths, AssetCatalog, EditorSession, LoopConfig, SessionConfig, DEFAULT_RNG_SEED,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CliOptions {
    pub(crate) project: Option<PathBuf>,
    pub(crate) catalog: Option<PathBuf>,
    pub(crate) export: Option<PathBuf>,
    pub(crate) seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    Run(CliOptions),
    Help,
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) session: EditorSession,
    pub(crate) asset_root: PathBuf,
    pub(crate) export: Option<PathBuf>,
}

pub(crate) fn usage_text() -> String {
    [
        "usage: builder_editor [options]",
        "",
        "  --project <path>    open a saved project (gamedata.js or JSON document)",
        "  --catalog <path>    merge an XML asset catalog over the built-in one",
        "  --export <path.zip> write the game bundle and exit instead of opening a window",
        "  --seed <u64>        seed for obstacle and respawn randomness",
        "  -h, --help          show this text",
    ]
    .join("\n")
}

pub(crate) fn parse_args(args: &[String]) -> Result<CliCommand, String> {
    let mut options = CliOptions::default();
    let mut index = 0usize;
    while index < args.len() {
        let flag = args[index].as_str();
        match flag {
            "-h" | "--help" => return Ok(CliCommand::Help),
            "--project" | "--catalog" | "--export" | "--seed" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| format!("missing value for {flag}"))?;
                match flag {
                    "--project" => options.project = Some(PathBuf::from(value)),
                    "--catalog" => options.catalog = Some(PathBuf::from(value)),
                    "--export" => options.export = Some(PathBuf::from(value)),
                    _ => {
                        let seed = value
                            .parse::<u64>()
                            .map_err(|_| format!("invalid --seed value '{value}' (expected u64)"))?;
                        options.seed = Some(seed);
                    }
                }
                index += 2;
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }
    Ok(CliCommand::Run(options))
}

pub(crate) fn build_app(options: CliOptions) -> Result<AppWiring, String> {
    info!("=== Game Builder Startup ===");
    let paths = resolve_app_paths().map_err(|error| error.to_string())?;
    info!(
        root = %paths.root.display(),
        exports_dir = %paths.exports_dir.display(),
        "startup"
    );

    let mut catalog = AssetCatalog::builtin();
    if let Some(path) = &options.catalog {
        let extra = AssetCatalog::load_xml_file(path).map_err(|error| error.to_string())?;
        info!(path = %path.display(), entries = extra.len(), "catalog_merged");
        catalog.merge(extra);
    }

    let has_assets = paths.assets_dir.join("assets").is_dir();
    if !has_assets {
        warn!(
            root = %paths.assets_dir.display(),
            "assets_directory_missing_using_placeholders"
        );
    }
    let config = SessionConfig {
        rng_seed: options.seed.unwrap_or(DEFAULT_RNG_SEED),
        asset_root: has_assets.then(|| paths.assets_dir.clone()),
        ..SessionConfig::default()
    };
    let mut session = EditorSession::new(config, catalog);
    if let Some(path) = &options.project {
        session
            .import_project(path)
            .map_err(|error| error.to_string())?;
        info!(path = %path.display(), "project_opened");
    }

    Ok(AppWiring {
        config: LoopConfig::default(),
        session,
        asset_root: paths.assets_dir,
        export: options.export,
    })
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
