use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::store::{Entity, EntityRecordError, EntityStore};

use super::atomic_io::write_text_atomic;
use super::catalog::{AssetCatalog, CatalogCategory};
use super::export::{ExportDocument, GAMEDATA_PREFIX};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to read project {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse project json: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },
    #[error("parse project json at {path}: {source}")]
    ParseAt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid entity '{key}': {source}")]
    InvalidEntity {
        key: String,
        #[source]
        source: EntityRecordError,
    },
    #[error("failed to serialize project: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write project {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A parsed project ready to be pushed into a store.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedProject {
    pub entities: Vec<Entity>,
    pub background: String,
    pub audio: String,
    pub effect: String,
}

impl ImportedProject {
    /// Replaces every entity (all unloaded) and the canvas selections.
    pub fn apply_to(self, store: &mut EntityStore) {
        store.replace_entities(self.entities);
        store.set_background(&self.background);
        store.set_audio(&self.audio);
        store.set_effect(&self.effect);
    }
}

/// Accepts the plain JSON document or the `gamedata.js` module form.
pub fn parse_project(raw: &str, catalog: &AssetCatalog) -> Result<ImportedProject, ProjectError> {
    let json = strip_module_wrapper(raw);
    let mut deserializer = serde_json::Deserializer::from_str(json);
    let document: ExportDocument = match serde_path_to_error::deserialize(&mut deserializer) {
        Ok(document) => document,
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            return Err(if path.is_empty() || path == "." {
                ProjectError::Parse { source }
            } else {
                ProjectError::ParseAt { path, source }
            });
        }
    };

    let mut entities = Vec::with_capacity(document.entities.len());
    for (key, record) in document.entities {
        let mut entity =
            Entity::try_from(record).map_err(|source| ProjectError::InvalidEntity {
                key: key.clone(),
                source,
            })?;
        entity.loaded = false;
        entities.push(entity);
    }

    let background = lookup_key(catalog, CatalogCategory::Backgrounds, &document.background.img);
    let audio = lookup_key(catalog, CatalogCategory::Audio, &document.audio.file);
    Ok(ImportedProject {
        entities,
        background,
        audio,
        effect: document.effect,
    })
}

pub fn load_project(path: &Path, catalog: &AssetCatalog) -> Result<ImportedProject, ProjectError> {
    let raw = fs::read_to_string(path).map_err(|source| ProjectError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let project = parse_project(&raw, catalog)?;
    info!(
        path = %path.display(),
        entity_count = project.entities.len(),
        "project_loaded"
    );
    Ok(project)
}

/// Writes the document atomically; `.js` targets get the module wrapper.
pub fn save_project(path: &Path, document: &ExportDocument) -> Result<(), ProjectError> {
    let is_module = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("js"));
    let text = if is_module {
        document.to_gamedata_js()
    } else {
        document.to_json()
    }
    .map_err(ProjectError::Serialize)?;

    write_text_atomic(path, &text).map_err(|source| ProjectError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        path = %path.display(),
        entity_count = document.entities.len(),
        "project_saved"
    );
    Ok(())
}

fn strip_module_wrapper(raw: &str) -> &str {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix(GAMEDATA_PREFIX.trim_end()).unwrap_or(trimmed);
    body.trim().trim_end_matches(';').trim_end()
}

/// Maps an asset url back to the catalog key that produced it. Unknown urls
/// fall back to no selection.
fn lookup_key(catalog: &AssetCatalog, category: CatalogCategory, url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    match catalog.entries(category).find(|entry| entry.asset_url() == url) {
        Some(entry) => entry.key.clone(),
        None => {
            warn!(category = %category, url, "project_asset_not_in_catalog");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EntityId, EntityKind, Mode, ObstacleBehavior};

    const SAMPLE: &str = r#"{
  "background": { "img": "assets/backgrounds/forest.png" },
  "audio": { "file": "assets/audio/caves.mp3", "title": "caves" },
  "entities": {
    "player": {
      "id": "player", "type": "PLAYER", "x": 100, "y": 450, "width": 32, "height": 32,
      "title": "pinkman", "spriteUrl": "assets/sprites/pinkman.png", "loaded": true
    },
    "spike": {
      "id": "spike", "type": "OBSTACLE", "x": 300, "y": 500, "width": 32, "height": 16,
      "title": "spikes", "physics": "STATIC"
    }
  }
}"#;

    #[test]
    fn parses_plain_json_and_resolves_catalog_keys() {
        let project = parse_project(SAMPLE, &AssetCatalog::builtin()).expect("parse");
        assert_eq!(project.background, "bg3");
        assert_eq!(project.audio, "a2");
        assert_eq!(project.entities.len(), 2);
        assert!(project.entities.iter().all(|entity| !entity.loaded));
        let spike = project
            .entities
            .iter()
            .find(|entity| entity.id == EntityId::new("spike"))
            .expect("spike");
        assert_eq!(
            spike.kind,
            EntityKind::Obstacle {
                behavior: ObstacleBehavior::Static
            }
        );
    }

    #[test]
    fn parses_gamedata_module_form() {
        let module = format!("export const data = {SAMPLE};\n");
        let project = parse_project(&module, &AssetCatalog::builtin()).expect("parse");
        assert_eq!(project.entities.len(), 2);
    }

    #[test]
    fn reports_json_path_of_bad_field() {
        let raw = r#"{"background": {"img": 7}, "entities": {}}"#;
        let error = parse_project(raw, &AssetCatalog::builtin()).expect_err("invalid");
        match error {
            ProjectError::ParseAt { path, .. } => assert_eq!(path, "background.img"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_unknown_obstacle_physics() {
        let raw = r#"{"entities": {"o": {"id": "o", "type": "OBSTACLE", "x": 0, "y": 0,
            "width": 1, "height": 1, "physics": "SPIN"}}}"#;
        let error = parse_project(raw, &AssetCatalog::builtin()).expect_err("invalid");
        assert!(matches!(error, ProjectError::InvalidEntity { ref key, .. } if key == "o"));
    }

    #[test]
    fn save_then_load_restores_store_contents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("game.js");
        let catalog = AssetCatalog::builtin();
        let project = parse_project(SAMPLE, &catalog).expect("parse");
        let mut store = EntityStore::new();
        project.apply_to(&mut store);

        let document = ExportDocument::from_state(&store.snapshot(), &catalog);
        save_project(&path, &document).expect("save");
        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.starts_with("export const data = "));

        let mut reloaded = EntityStore::new();
        load_project(&path, &catalog)
            .expect("load")
            .apply_to(&mut reloaded);
        let snapshot = reloaded.snapshot();
        assert_eq!(snapshot.entities.len(), 2);
        assert_eq!(snapshot.canvas.background, "bg3");
        assert_eq!(snapshot.canvas.audio, "a2");
        assert_eq!(snapshot.canvas.mode, Mode::Edit);
    }
}
