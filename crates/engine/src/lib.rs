use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;
pub mod runtime;
pub mod scenes;
pub mod session;
pub mod store;

pub use app::{
    run_app, run_app_with_metrics, AppError, EditorIntent, InputAction, LoopConfig,
    LoopMetricsSnapshot, MetricsHandle, Renderer,
};
pub use content::{
    AssetCatalog, CatalogCategory, CatalogEntry, CatalogError, ExportDocument, ExportError,
    ExportSummary, ProjectError,
};
pub use runtime::{HeadlessConfig, HeadlessRuntime, LoadMode, SceneRuntime, Size, Vec2};
pub use scenes::{PlayerInput, SceneMachine};
pub use session::{EditorSession, SessionConfig, DEFAULT_RNG_SEED};
pub use store::{Entity, EntityId, EntityKind, EntityStore, Mode, StoreSnapshot, Tool};

pub const ROOT_ENV_VAR: &str = "GAMEBUILDER_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    /// Base directory that catalog and entity asset URLs resolve against.
    pub assets_dir: PathBuf,
    pub exports_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create exports directory at {path}: {source}")]
    CreateExportsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "{env_var} is set but does not point to a builder root: {path}\n\
A builder root contains Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot {
        path: PathBuf,
        env_var: &'static str,
    },
    #[error(
        "could not find the builder root above {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} to the checkout, for example: export {env_var}=\"/path/to/game-builder\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

/// Locates the builder root and makes sure the exports directory exists.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    app_paths_for_root(root)
}

fn app_paths_for_root(root: PathBuf) -> Result<AppPaths, StartupError> {
    let exports_dir = root.join("exports");
    fs::create_dir_all(&exports_dir).map_err(|source| StartupError::CreateExportsDir {
        path: exports_dir.clone(),
        source,
    })?;
    Ok(AppPaths {
        assets_dir: root.clone(),
        exports_dir,
        root,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(Path::new(&value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot {
                    path: normalized,
                    env_var: ROOT_ENV_VAR,
                })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            find_root_above(&exe_dir).ok_or_else(|| StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn find_root_above(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();
    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_root() -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("Cargo.toml"), "[workspace]\n").expect("manifest");
        fs::create_dir(dir.path().join("assets")).expect("assets");
        dir
    }

    #[test]
    fn repo_marker_requires_cargo_toml_and_a_tree() {
        let dir = TempDir::new().expect("temp dir");
        assert!(!is_repo_marker(dir.path()));
        fs::create_dir(dir.path().join("crates")).expect("crates");
        assert!(!is_repo_marker(dir.path()));
        fs::write(dir.path().join("Cargo.toml"), "").expect("manifest");
        assert!(is_repo_marker(dir.path()));
    }

    #[test]
    fn root_is_found_from_a_nested_directory() {
        let root = fake_root();
        let nested = root.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("nested");
        assert_eq!(find_root_above(&nested), Some(normalize_path(root.path())));
    }

    #[test]
    fn app_paths_create_the_exports_directory() {
        let root = fake_root();
        let paths = app_paths_for_root(root.path().to_path_buf()).expect("paths");
        assert!(paths.exports_dir.is_dir());
        assert_eq!(paths.assets_dir, root.path());
    }
}
