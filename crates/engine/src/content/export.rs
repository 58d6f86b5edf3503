use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::store::{EntityRecord, StoreState};

use super::asset_paths::{asset_file_name, asset_folder_name, is_remote_url, local_asset_path};
use super::atomic_io::write_bytes_atomic;
use super::catalog::{AssetCatalog, CatalogCategory};
use super::hashing::sha256_hex;

pub const GAMEDATA_FILE: &str = "gamedata.js";
pub const MANIFEST_FILE: &str = "manifest.json";
pub(crate) const GAMEDATA_PREFIX: &str = "export const data = ";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackgroundRecord {
    #[serde(default)]
    pub img: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioRecord {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub title: String,
}

/// Serialized game: resolved background/audio selections plus every entity record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    #[serde(default)]
    pub background: BackgroundRecord,
    #[serde(default)]
    pub audio: AudioRecord,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub effect: String,
    #[serde(default)]
    pub entities: BTreeMap<String, EntityRecord>,
}

impl ExportDocument {
    pub fn from_state(state: &StoreState, catalog: &AssetCatalog) -> Self {
        let canvas = &state.canvas;
        let background = match catalog.get(CatalogCategory::Backgrounds, &canvas.background) {
            Some(entry) => BackgroundRecord {
                img: entry.img.clone(),
            },
            None => {
                if !canvas.background.is_empty() {
                    warn!(key = canvas.background.as_str(), "export_unknown_background");
                }
                BackgroundRecord::default()
            }
        };
        let audio = catalog
            .get(CatalogCategory::Audio, &canvas.audio)
            .map(|entry| AudioRecord {
                file: entry.asset_url().to_string(),
                title: entry.title.clone(),
            })
            .unwrap_or_default();
        let entities = state
            .entities
            .values()
            .map(|entity| (entity.id.to_string(), EntityRecord::from(entity.clone())))
            .collect();

        Self {
            background,
            audio,
            effect: canvas.effect.clone(),
            entities,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// `export const data = <json>`, the module the standalone player imports.
    pub fn to_gamedata_js(&self) -> Result<String, serde_json::Error> {
        Ok(format!("{GAMEDATA_PREFIX}{}\n", self.to_json()?))
    }

    /// Every asset url the bundle must carry, mapped to its path inside the archive.
    pub fn referenced_assets(&self) -> Vec<BundledAsset> {
        let mut seen = BTreeSet::new();
        let mut claimed = BTreeSet::new();
        let mut assets = Vec::new();
        let mut push = |url: &str, fallback_folder: &str| {
            let url = url.trim();
            if url.is_empty() || !seen.insert(url.to_string()) {
                return;
            }
            let Some(file_name) = asset_file_name(url) else {
                return;
            };
            let folder = asset_folder_name(url).unwrap_or(fallback_folder);
            let mut bundle_path = format!("assets/{folder}/{file_name}");
            if !claimed.insert(bundle_path.clone()) {
                bundle_path = disambiguated_path(folder, file_name, url);
                claimed.insert(bundle_path.clone());
            }
            assets.push(BundledAsset {
                url: url.to_string(),
                bundle_path,
            });
        };

        push(&self.background.img, "backgrounds");
        push(&self.audio.file, "audio");
        for record in self.entities.values() {
            push(&record.sprite_url, "sprites");
        }
        assets
    }
}

/// Archive path for a url whose plain path is already taken: the file stem
/// gets a suffix derived from the url digest.
fn disambiguated_path(folder: &str, file_name: &str, url: &str) -> String {
    let digest = sha256_hex(url.as_bytes());
    let suffix = &digest[..8];
    match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => {
            format!("assets/{folder}/{stem}-{suffix}.{extension}")
        }
        _ => format!("assets/{folder}/{file_name}-{suffix}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledAsset {
    pub url: String,
    pub bundle_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub path: String,
    pub bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub files: Vec<ManifestFile>,
}

impl ExportManifest {
    fn record(&mut self, path: &str, bytes: &[u8]) {
        self.files.push(ManifestFile {
            path: path.to_string(),
            bytes: bytes.len() as u64,
            sha256: sha256_hex(bytes),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub output: PathBuf,
    pub manifest: ExportManifest,
    pub skipped_remote: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize export document: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("asset {url} resolves outside the asset root")]
    AssetOutsideRoot { url: String },
    #[error("asset {url} not found at {path}")]
    MissingAsset { url: String, path: PathBuf },
    #[error("failed to read asset {path}: {source}")]
    ReadAsset {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write bundle entry {name}: {source}")]
    WriteEntry {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to write bundle {path}: {source}")]
    WriteBundle {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes `gamedata.js`, the referenced local assets and `manifest.json` into a
/// zip at `output`. Remote urls are left for the player to fetch.
pub fn write_export_bundle(
    document: &ExportDocument,
    asset_root: &Path,
    output: &Path,
) -> Result<ExportSummary, ExportError> {
    let mut manifest = ExportManifest::default();
    let mut skipped_remote = Vec::new();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    let gamedata = document.to_gamedata_js()?;
    add_entry(&mut writer, GAMEDATA_FILE, gamedata.as_bytes())?;
    manifest.record(GAMEDATA_FILE, gamedata.as_bytes());

    for asset in document.referenced_assets() {
        if is_remote_url(&asset.url) {
            warn!(url = asset.url.as_str(), "export_remote_asset_skipped");
            skipped_remote.push(asset.url);
            continue;
        }
        let Some(path) = local_asset_path(asset_root, &asset.url) else {
            return Err(ExportError::AssetOutsideRoot { url: asset.url });
        };
        if !path.is_file() {
            return Err(ExportError::MissingAsset {
                url: asset.url,
                path,
            });
        }
        let bytes = fs::read(&path).map_err(|source| ExportError::ReadAsset {
            path: path.clone(),
            source,
        })?;
        add_entry(&mut writer, &asset.bundle_path, &bytes)?;
        manifest.record(&asset.bundle_path, &bytes);
    }

    let manifest_json = serde_json::to_string_pretty(&manifest)?;
    add_entry(&mut writer, MANIFEST_FILE, manifest_json.as_bytes())?;

    let archive = writer.finish()?.into_inner();
    write_bytes_atomic(output, &archive).map_err(|source| ExportError::WriteBundle {
        path: output.to_path_buf(),
        source,
    })?;

    info!(
        output = %output.display(),
        files = manifest.files.len(),
        skipped_remote = skipped_remote.len(),
        "export_written"
    );
    Ok(ExportSummary {
        output: output.to_path_buf(),
        manifest,
        skipped_remote,
    })
}

fn add_entry(
    writer: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    bytes: &[u8],
) -> Result<(), ExportError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(name, options)?;
    writer
        .write_all(bytes)
        .map_err(|source| ExportError::WriteEntry {
            name: name.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use zip::ZipArchive;

    use super::*;
    use crate::store::{Entity, EntityId, EntityKind, EntityStore, ObstacleBehavior};

    fn sample_store() -> EntityStore {
        EntityStore::with_entities([
            Entity::new(EntityId::player(), EntityKind::Player, "pinkman")
                .with_position(100.0, 450.0)
                .with_sprite("../assets/sprites/pinkman.png"),
            Entity::new(
                EntityId::new("bomb-1"),
                EntityKind::Obstacle {
                    behavior: ObstacleBehavior::Bounce,
                },
                "bomb",
            )
            .with_sprite("https://cdn.example.com/bomb.png"),
        ])
    }

    fn write_asset(root: &Path, rel: &str, bytes: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, bytes).expect("write asset");
    }

    #[test]
    fn document_resolves_catalog_selections() {
        let mut store = sample_store();
        store.set_audio("a1");
        let document = ExportDocument::from_state(&store.snapshot(), &AssetCatalog::builtin());

        assert_eq!(document.background.img, "assets/backgrounds/bluesky.png");
        assert_eq!(document.audio.file, "assets/audio/adventure.mp3");
        assert_eq!(document.audio.title, "adventure");
        assert_eq!(document.entities["player"].entity_type, "PLAYER");
        assert_eq!(document.entities["bomb-1"].physics, "BOUNCE");
    }

    #[test]
    fn gamedata_module_wraps_json() {
        let document = ExportDocument::default();
        let js = document.to_gamedata_js().expect("js");
        assert!(js.starts_with("export const data = {"));
    }

    #[test]
    fn bundle_contains_gamedata_assets_and_manifest() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        write_asset(root, "assets/backgrounds/bluesky.png", b"sky");
        write_asset(root, "assets/sprites/pinkman.png", b"pink");
        let store = sample_store();
        let document = ExportDocument::from_state(&store.snapshot(), &AssetCatalog::builtin());
        let output = root.join("out").join("yourgame.zip");

        let summary = write_export_bundle(&document, root, &output).expect("export");
        assert_eq!(summary.skipped_remote, vec!["https://cdn.example.com/bomb.png"]);
        assert_eq!(summary.manifest.files.len(), 3);

        let file = fs::File::open(&output).expect("open zip");
        let mut archive = ZipArchive::new(file).expect("archive");
        let mut sprite = String::new();
        archive
            .by_name("assets/sprites/pinkman.png")
            .expect("sprite entry")
            .read_to_string(&mut sprite)
            .expect("read sprite");
        assert_eq!(sprite, "pink");

        let mut manifest_raw = String::new();
        archive
            .by_name(MANIFEST_FILE)
            .expect("manifest entry")
            .read_to_string(&mut manifest_raw)
            .expect("read manifest");
        let manifest: ExportManifest = serde_json::from_str(&manifest_raw).expect("manifest json");
        let sprite_entry = manifest
            .files
            .iter()
            .find(|file| file.path == "assets/sprites/pinkman.png")
            .expect("sprite in manifest");
        assert_eq!(sprite_entry.sha256, sha256_hex(b"pink"));
        assert!(archive.by_name(GAMEDATA_FILE).is_ok());
    }

    #[test]
    fn missing_local_asset_fails_the_export() {
        let temp = tempfile::tempdir().expect("tempdir");
        let document = ExportDocument::from_state(
            &sample_store().snapshot(),
            &AssetCatalog::builtin(),
        );
        let error = write_export_bundle(&document, temp.path(), &temp.path().join("g.zip"))
            .expect_err("missing background");
        assert!(matches!(error, ExportError::MissingAsset { .. }));
        assert!(!temp.path().join("g.zip").exists());
    }

    #[test]
    fn asset_urls_outside_the_root_fail_the_export() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("project");
        write_asset(temp.path(), "secret.png", b"secret");
        write_asset(&root, "assets/backgrounds/bluesky.png", b"sky");
        let store = EntityStore::with_entities([Entity::new(
            EntityId::player(),
            EntityKind::Player,
            "pinkman",
        )
        .with_sprite("assets/../../secret.png")]);
        let document = ExportDocument::from_state(&store.snapshot(), &AssetCatalog::builtin());
        let output = root.join("g.zip");

        let error = write_export_bundle(&document, &root, &output).expect_err("escaping url");
        assert!(matches!(
            error,
            ExportError::AssetOutsideRoot { ref url } if url == "assets/../../secret.png"
        ));
        assert!(!output.exists());
    }

    #[test]
    fn colliding_file_names_get_distinct_bundle_paths() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        write_asset(root, "assets/backgrounds/bluesky.png", b"sky");
        write_asset(root, "a/sprites/dude.png", b"first");
        write_asset(root, "b/sprites/dude.png", b"second");
        let store = EntityStore::with_entities([
            Entity::new(EntityId::player(), EntityKind::Player, "dude")
                .with_sprite("a/sprites/dude.png"),
            Entity::new(EntityId::new("twin"), EntityKind::Item, "dude")
                .with_sprite("b/sprites/dude.png"),
        ]);
        let document = ExportDocument::from_state(&store.snapshot(), &AssetCatalog::builtin());

        let assets = document.referenced_assets();
        let paths: BTreeSet<&str> = assets
            .iter()
            .map(|asset| asset.bundle_path.as_str())
            .collect();
        assert_eq!(paths.len(), assets.len());
        assert!(paths.contains("assets/sprites/dude.png"));

        let output = root.join("g.zip");
        let summary = write_export_bundle(&document, root, &output).expect("export");
        let sprite_hashes: BTreeSet<&str> = summary
            .manifest
            .files
            .iter()
            .filter(|file| file.path.starts_with("assets/sprites/dude"))
            .map(|file| file.sha256.as_str())
            .collect();
        let expected: BTreeSet<String> = [sha256_hex(b"first"), sha256_hex(b"second")].into();
        assert_eq!(
            sprite_hashes,
            expected.iter().map(String::as_str).collect::<BTreeSet<_>>()
        );

        let file = fs::File::open(&output).expect("open zip");
        let mut archive = ZipArchive::new(file).expect("archive");
        assert_eq!(archive.len(), summary.manifest.files.len() + 1);
        assert!(archive.by_name("assets/sprites/dude.png").is_ok());
    }
}
