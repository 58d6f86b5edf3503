use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::content::{
    load_project, save_project, start_entities, write_export_bundle, AssetCatalog,
    CatalogCategory, CatalogError, ExportDocument, ExportError, ExportSummary, ProjectError,
};
use crate::runtime::{
    HeadlessConfig, HeadlessRuntime, LoadMode, ObjectHandle, Size, Vec2, DEFAULT_GRAVITY_Y,
    DEFAULT_WORLD_SIZE,
};
use crate::scenes::{self, PlayerInput, SceneContext, SceneMachine};
use crate::store::{EntityId, EntityPatch, EntityStore, Mode, StoreSnapshot, Tool};

pub const DEFAULT_RNG_SEED: u64 = 0x5eed_0b1d;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub world_size: Size,
    pub gravity_y: f32,
    pub rng_seed: u64,
    pub load_mode: LoadMode,
    pub asset_root: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            world_size: DEFAULT_WORLD_SIZE,
            gravity_y: DEFAULT_GRAVITY_Y,
            rng_seed: DEFAULT_RNG_SEED,
            load_mode: LoadMode::NextPoll,
            asset_root: None,
        }
    }
}

impl SessionConfig {
    pub fn headless_config(&self) -> HeadlessConfig {
        HeadlessConfig {
            world_size: self.world_size,
            gravity_y: self.gravity_y,
            load_mode: self.load_mode,
            asset_root: self.asset_root.clone(),
        }
    }
}

/// One open builder: the store, the runtime it is shown on and the scene
/// machine keeping the two in sync. Every UI intent lands here as a store
/// command followed by a reconciliation pass.
pub struct EditorSession {
    store: EntityStore,
    runtime: HeadlessRuntime,
    machine: SceneMachine,
    catalog: AssetCatalog,
    config: SessionConfig,
}

impl EditorSession {
    /// Opens the New Game project in Edit mode.
    pub fn new(config: SessionConfig, catalog: AssetCatalog) -> Self {
        let mut session = Self {
            store: EntityStore::with_entities(start_entities(&catalog)),
            runtime: HeadlessRuntime::new(config.headless_config()),
            machine: SceneMachine::new(config.rng_seed),
            catalog,
            config,
        };
        let (machine, mut ctx) = session.parts();
        machine.start(&mut ctx);
        info!(
            entity_count = session.store.snapshot().entities.len(),
            catalog_entries = session.catalog.len(),
            "session_opened"
        );
        session
    }

    fn parts(&mut self) -> (&mut SceneMachine, SceneContext<'_>) {
        (
            &mut self.machine,
            SceneContext {
                store: &mut self.store,
                runtime: &mut self.runtime,
                catalog: &self.catalog,
            },
        )
    }

    fn sync(&mut self) {
        let (machine, mut ctx) = self.parts();
        machine.sync(&mut ctx);
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    pub fn runtime(&self) -> &HeadlessRuntime {
        &self.runtime
    }

    pub fn machine(&self) -> &SceneMachine {
        &self.machine
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn active_mode(&self) -> Mode {
        self.machine.active_mode()
    }

    pub fn is_game_over(&self) -> bool {
        self.machine.active_mode() == Mode::Play && self.machine.play().rules().is_game_over()
    }

    pub fn frame(&mut self, dt_seconds: f32, input: &PlayerInput) {
        let (machine, mut ctx) = self.parts();
        machine.frame(&mut ctx, dt_seconds, input);
    }

    /// Replaces every entity with the start set and resets the canvas.
    pub fn new_game(&mut self) {
        let entities = start_entities(&self.catalog);
        self.store.replace_entities(entities);
        self.store.reset();
        self.sync();
        info!("new_game");
    }

    pub fn switch_mode(&mut self, mode: Mode) {
        self.store.switch_mode(mode);
        self.sync();
    }

    pub fn toggle_mode(&mut self) -> Mode {
        let mode = self.store.snapshot().canvas.mode.other();
        self.switch_mode(mode);
        mode
    }

    pub fn switch_tool(&mut self, tool: Tool) -> bool {
        let changed = self.store.switch_tool(tool);
        self.sync();
        changed
    }

    pub fn select(&mut self, id: &EntityId) -> bool {
        let changed = self.store.select_entity(id);
        self.sync();
        changed
    }

    pub fn confirm_dialog(&mut self) -> Option<EntityId> {
        let created = scenes::confirm_dialog(&mut self.store);
        self.sync();
        created
    }

    pub fn cancel_dialog(&mut self) -> bool {
        let changed = scenes::cancel_dialog(&mut self.store);
        self.sync();
        changed
    }

    pub fn set_background(&mut self, key: &str) -> bool {
        self.set_canvas_key(CatalogCategory::Backgrounds, key)
    }

    pub fn set_audio(&mut self, key: &str) -> bool {
        self.set_canvas_key(CatalogCategory::Audio, key)
    }

    pub fn set_effect(&mut self, key: &str) -> bool {
        self.set_canvas_key(CatalogCategory::Effects, key)
    }

    /// Empty keys clear the selection; unknown keys are rejected.
    fn set_canvas_key(&mut self, category: CatalogCategory, key: &str) -> bool {
        if !key.is_empty() && !self.catalog.contains(category, key) {
            warn!(category = category.as_str(), key, "unknown_catalog_key");
            return false;
        }
        let changed = match category {
            CatalogCategory::Backgrounds => self.store.set_background(key),
            CatalogCategory::Audio => self.store.set_audio(key),
            CatalogCategory::Effects => self.store.set_effect(key),
            _ => false,
        };
        self.sync();
        changed
    }

    /// Moves to the next background in catalog order, wrapping around.
    pub fn cycle_background(&mut self) -> Option<String> {
        let keys = self.catalog.keys(CatalogCategory::Backgrounds);
        if keys.is_empty() {
            return None;
        }
        let current = self.store.snapshot().canvas.background.clone();
        let next = match keys.iter().position(|key| *key == current) {
            Some(index) => keys[(index + 1) % keys.len()].clone(),
            None => keys[0].clone(),
        };
        self.set_background(&next);
        Some(next)
    }

    /// Adds an entity from a catalog entry and selects it. Sprites restyle the
    /// existing player in place instead of adding a second one.
    pub fn place_from_catalog(
        &mut self,
        category: CatalogCategory,
        key: &str,
        position: Vec2,
    ) -> Result<EntityId, CatalogError> {
        let entity = self.catalog.place(category, key, position.x, position.y)?;
        let id = entity.id.clone();
        let existing_player = category == CatalogCategory::Sprites
            && self.store.snapshot().player().is_some();
        if existing_player {
            let patch = EntityPatch {
                title: Some(entity.title),
                sprite_url: Some(entity.sprite_url),
                width: Some(entity.width),
                height: Some(entity.height),
                sprite_width: Some(entity.sprite_width),
                sprite_height: Some(entity.sprite_height),
                ..EntityPatch::default()
            };
            self.store.update_entity_fields(&id, patch);
            debug!(key, "player_restyled");
        } else {
            self.store.add_entity(entity);
            debug!(category = category.as_str(), key, entity_id = %id, "entity_placed");
        }
        self.store.select_entity(&id);
        self.sync();
        Ok(id)
    }

    pub fn flip_selected(&mut self) -> bool {
        let snapshot = self.store.snapshot();
        let Some(entity) = snapshot
            .canvas
            .selected
            .as_ref()
            .and_then(|id| snapshot.entity(id))
        else {
            return false;
        };
        let changed = self.store.flip_entity(&entity.id, !entity.flip_x);
        self.sync();
        changed
    }

    /// Restarts the Play round; only meaningful once the round is over.
    pub fn restart(&mut self) -> bool {
        if !self.is_game_over() {
            return false;
        }
        let (machine, mut ctx) = self.parts();
        machine.restart_active(&mut ctx);
        machine.sync(&mut ctx);
        true
    }

    pub fn import_project(&mut self, path: &Path) -> Result<(), ProjectError> {
        let project = load_project(path, &self.catalog)?;
        project.apply_to(&mut self.store);
        self.sync();
        Ok(())
    }

    pub fn export_document(&self) -> ExportDocument {
        ExportDocument::from_state(&self.store.snapshot(), &self.catalog)
    }

    pub fn save_project(&self, path: &Path) -> Result<(), ProjectError> {
        save_project(path, &self.export_document())
    }

    pub fn export_bundle(&self, asset_root: &Path, output: &Path) -> Result<ExportSummary, ExportError> {
        write_export_bundle(&self.export_document(), asset_root, output)
    }

    pub fn pointer_down(&mut self, position: Vec2) -> Option<ObjectHandle> {
        self.runtime.pointer_down(position)
    }

    pub fn pointer_move(&mut self, position: Vec2) {
        self.runtime.pointer_move(position);
    }

    pub fn pointer_up(&mut self, position: Vec2) {
        self.runtime.pointer_up(position);
    }

    pub fn shutdown(&mut self) {
        let (machine, mut ctx) = self.parts();
        machine.shutdown(&mut ctx);
        info!("session_closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::PLAYER_START;
    use crate::runtime::SceneRuntime;
    use crate::store::{DialogState, EntityKind};

    const DT: f32 = 1.0 / 60.0;

    fn session() -> EditorSession {
        let mut session = EditorSession::new(SessionConfig::default(), AssetCatalog::builtin());
        session.frame(DT, &PlayerInput::empty());
        session
    }

    #[test]
    fn new_session_shows_the_start_project() {
        let session = session();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.entities.len(), 2);
        let player = snapshot.player().expect("player");
        assert_eq!((player.x, player.y), PLAYER_START);
        assert!(snapshot.entities.values().all(|entity| entity.loaded));
        assert_eq!(session.machine().edit().visual_count(), 2);
        assert_eq!(session.active_mode(), Mode::Edit);
    }

    #[test]
    fn choosing_a_sprite_restyles_the_player_in_place() {
        let mut session = session();
        let id = session
            .place_from_catalog(CatalogCategory::Sprites, "s1", Vec2::new(600.0, 100.0))
            .expect("place sprite");
        session.frame(DT, &PlayerInput::empty());

        assert_eq!(id, EntityId::player());
        let snapshot = session.snapshot();
        let player = snapshot.player().expect("player");
        assert_eq!(player.title, "dude");
        assert_eq!((player.x, player.y), PLAYER_START);
        assert_eq!((player.width, player.height), (32.0, 48.0));
        assert_eq!(snapshot.canvas.selected, Some(EntityId::player()));
        assert_eq!(session.runtime().objects_with_texture("EDIT_dude"), 1);
        assert_eq!(session.runtime().objects_with_texture("EDIT_pinkman"), 0);
    }

    #[test]
    fn placing_an_obstacle_uses_the_catalog_behavior() {
        let mut session = session();
        let id = session
            .place_from_catalog(CatalogCategory::Obstacles, "o2", Vec2::new(300.0, 200.0))
            .expect("place obstacle");
        let snapshot = session.snapshot();
        let cloud = snapshot.entity(&id).expect("cloud");
        assert_eq!(
            cloud.kind,
            EntityKind::Obstacle {
                behavior: crate::store::ObstacleBehavior::Float
            }
        );
        assert_eq!((cloud.width, cloud.height), (64.0, 32.0));

        let error = session
            .place_from_catalog(CatalogCategory::Backgrounds, "bg2", Vec2::ZERO)
            .expect_err("backgrounds are not placeable");
        assert!(matches!(error, CatalogError::NotPlaceable(_)));
    }

    #[test]
    fn unknown_canvas_keys_are_rejected() {
        let mut session = session();
        assert!(!session.set_background("bg99"));
        assert!(!session.set_audio("a9"));
        assert!(session.set_audio("a1"));
        assert!(session.set_audio(""));
        assert_eq!(session.snapshot().canvas.background, "bg1");
    }

    #[test]
    fn cycling_backgrounds_wraps_in_catalog_order() {
        let mut session = session();
        let keys = session.catalog().keys(CatalogCategory::Backgrounds);
        let mut seen = Vec::new();
        for _ in 0..keys.len() {
            seen.push(session.cycle_background().expect("background"));
        }
        assert_eq!(seen.last(), Some(&session.snapshot().canvas.background));
        assert_eq!(session.snapshot().canvas.background, "bg1");
    }

    #[test]
    fn toggling_modes_swaps_scenes() {
        let mut session = session();
        assert_eq!(session.toggle_mode(), Mode::Play);
        session.frame(DT, &PlayerInput::empty());
        assert_eq!(session.active_mode(), Mode::Play);
        assert!(!session.runtime().physics_paused());
        assert_eq!(session.runtime().objects_with_texture("PLAY_pinkman"), 1);

        assert_eq!(session.toggle_mode(), Mode::Edit);
        assert_eq!(session.active_mode(), Mode::Edit);
        assert!(session.runtime().physics_paused());
    }

    #[test]
    fn new_game_discards_edits_and_returns_to_edit() {
        let mut session = session();
        session
            .place_from_catalog(CatalogCategory::Items, "i1", Vec2::new(300.0, 300.0))
            .expect("place item");
        session.set_audio("a2");
        session.switch_mode(Mode::Play);
        session.frame(DT, &PlayerInput::empty());

        session.new_game();
        session.frame(DT, &PlayerInput::empty());
        let snapshot = session.snapshot();
        assert_eq!(snapshot.entities.len(), 2);
        assert!(snapshot.canvas.audio.is_empty());
        assert_eq!(session.active_mode(), Mode::Edit);
        assert_eq!(session.machine().edit().visual_count(), 2);
        assert!(session.runtime().playing_sounds().is_empty());
    }

    #[test]
    fn duplicate_confirmation_adds_an_offset_copy() {
        let mut session = session();
        let ground = session
            .snapshot()
            .entities
            .values()
            .find(|entity| entity.kind == EntityKind::Platform)
            .map(|entity| entity.id.clone())
            .expect("ground");
        session.select(&ground);
        session.switch_tool(Tool::Duplicate);
        session.store.open_dialog(DialogState::ConfirmDuplicate);

        let clone = session.confirm_dialog().expect("clone id");
        session.frame(DT, &PlayerInput::empty());
        let snapshot = session.snapshot();
        let source = snapshot.entity(&ground).expect("source");
        let copy = snapshot.entity(&clone).expect("copy");
        assert_eq!((copy.x, copy.y), (source.x + 20.0, source.y + 20.0));
        assert_eq!(snapshot.canvas.dialog, DialogState::Closed);
        assert_eq!(session.machine().edit().visual_count(), 3);
    }

    #[test]
    fn flip_toggles_the_selected_entity() {
        let mut session = session();
        assert!(!session.flip_selected());
        session.select(&EntityId::player());
        assert!(session.flip_selected());
        session.frame(DT, &PlayerInput::empty());
        let handle = session
            .machine()
            .edit()
            .visual_for(&EntityId::player())
            .expect("player visual");
        assert!(session.runtime().object(handle).expect("object").flip_x);
    }

    #[test]
    fn restart_requires_game_over() {
        let mut session = session();
        session.switch_mode(Mode::Play);
        session.frame(DT, &PlayerInput::empty());
        assert!(!session.restart());
        assert_eq!(session.machine().activations(Mode::Play), 1);
    }

    #[test]
    fn saved_projects_import_back_unloaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("level.json");
        let mut session = session();
        session
            .place_from_catalog(CatalogCategory::Platforms, "p2", Vec2::new(500.0, 300.0))
            .expect("place ledge");
        session.set_background("bg3");
        session.save_project(&path).expect("save");

        let mut other = EditorSession::new(SessionConfig::default(), AssetCatalog::builtin());
        other.import_project(&path).expect("import");
        let snapshot = other.snapshot();
        assert_eq!(snapshot.entities.len(), 3);
        assert_eq!(snapshot.canvas.background, "bg3");

        other.frame(DT, &PlayerInput::empty());
        assert!(other.snapshot().entities.values().all(|entity| entity.loaded));
        assert_eq!(other.machine().edit().visual_count(), 3);
    }

    #[test]
    fn pointer_passthrough_reaches_the_edit_scene() {
        let mut session = session();
        let handle = session
            .machine()
            .edit()
            .visual_for(&EntityId::player())
            .expect("player visual");
        let position = session.runtime().position(handle).expect("position");
        assert_eq!(session.pointer_down(position), Some(handle));
        session.pointer_up(position);
        session.frame(DT, &PlayerInput::empty());
        assert_eq!(session.snapshot().canvas.selected, Some(EntityId::player()));
    }
}
