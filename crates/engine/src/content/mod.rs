mod asset_paths;
mod atomic_io;
mod catalog;
mod export;
mod hashing;
mod project;
mod start_data;

pub use asset_paths::{
    asset_file_name, asset_folder_name, is_remote_url, local_asset_path, normalize_asset_url,
};
pub use catalog::{
    AssetCatalog, CatalogCategory, CatalogEntry, CatalogError, SourceLocation, SpriteFrames,
    SPOTLIGHT_EFFECT,
};
pub use export::{
    write_export_bundle, AudioRecord, BackgroundRecord, BundledAsset, ExportDocument,
    ExportError, ExportManifest, ExportSummary, ManifestFile, GAMEDATA_FILE, MANIFEST_FILE,
};
pub use project::{load_project, parse_project, save_project, ImportedProject, ProjectError};
pub use start_data::{start_entities, PLAYER_START};
