use super::*;
use crate::content::AssetCatalog;
use crate::runtime::{
    ContactEvent, HeadlessConfig, HeadlessRuntime, LoadMode, ObjectHandle, SceneRuntime, Size,
    Vec2,
};
use crate::store::{
    DialogState, Entity, EntityId, EntityKind, EntityPatch, EntityStore, Mode, ObstacleBehavior,
    Tool, TransitionStatus,
};

const DT: f32 = 1.0 / 60.0;

struct Harness {
    store: EntityStore,
    runtime: HeadlessRuntime,
    catalog: AssetCatalog,
    machine: SceneMachine,
}

impl Harness {
    fn new(entities: Vec<Entity>) -> Self {
        Self::with_config(entities, HeadlessConfig::default())
    }

    fn with_config(entities: Vec<Entity>, config: HeadlessConfig) -> Self {
        Self::with_runtime(entities, HeadlessRuntime::new(config))
    }

    fn with_runtime(entities: Vec<Entity>, runtime: HeadlessRuntime) -> Self {
        let mut harness = Self {
            store: EntityStore::with_entities(entities),
            runtime,
            catalog: AssetCatalog::builtin(),
            machine: SceneMachine::new(42),
        };
        harness.with(|machine, ctx| machine.start(ctx));
        harness
    }

    fn with<R>(&mut self, f: impl FnOnce(&mut SceneMachine, &mut SceneContext<'_>) -> R) -> R {
        let mut ctx = SceneContext {
            store: &mut self.store,
            runtime: &mut self.runtime,
            catalog: &self.catalog,
        };
        f(&mut self.machine, &mut ctx)
    }

    fn frame_with(&mut self, input: PlayerInput) {
        self.with(|machine, ctx| machine.frame(ctx, DT, &input));
    }

    fn frame(&mut self) {
        self.frame_with(PlayerInput::empty());
    }

    fn frames(&mut self, count: usize) {
        for _ in 0..count {
            self.frame();
        }
    }

    fn sync(&mut self) {
        self.with(|machine, ctx| machine.sync(ctx));
    }

    fn contact(&mut self, event: ContactEvent) {
        self.with(|machine, ctx| machine.dispatch_contact(ctx, event));
    }

    fn enter_play(&mut self) {
        self.store.switch_mode(Mode::Play);
        self.frames(2);
        assert_eq!(self.machine.active_mode(), Mode::Play);
    }

    fn edit_visual(&self, id: &str) -> ObjectHandle {
        self.machine
            .edit()
            .visual_for(&EntityId::new(id))
            .expect("edit visual")
    }

    fn play_visual(&self, id: &str) -> ObjectHandle {
        self.machine
            .play()
            .visual_for(&EntityId::new(id))
            .expect("play visual")
    }

    fn all_loaded(&self) -> bool {
        self.store.snapshot().unloaded_entities().next().is_none()
    }
}

fn player() -> Entity {
    Entity::new(EntityId::player(), EntityKind::Player, "pinkman")
        .with_position(100.0, 450.0)
        .with_sprite("assets/sprites/pinkman.png")
        .with_frame_size(32.0, 32.0)
}

fn ground() -> Entity {
    Entity::new(EntityId::new("ground"), EntityKind::Platform, "ground")
        .with_position(400.0, 568.0)
        .with_size(400.0, 32.0)
        .with_sprite("assets/platforms/platform.png")
}

fn star(x: f32, y: f32) -> Entity {
    Entity::new(EntityId::new("star"), EntityKind::Item, "star")
        .with_position(x, y)
        .with_size(24.0, 22.0)
        .with_sprite("assets/items/star.png")
}

fn obstacle(id: &str, title: &str, behavior: ObstacleBehavior, x: f32, y: f32) -> Entity {
    Entity::new(EntityId::new(id), EntityKind::Obstacle { behavior }, title)
        .with_position(x, y)
        .with_size(14.0, 14.0)
        .with_sprite(format!("assets/obstacles/{title}.png"))
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

#[test]
fn edit_scene_materializes_every_entity_after_loads_complete() {
    let mut harness = Harness::new(vec![player(), ground()]);
    assert_eq!(harness.machine.activations(Mode::Edit), 1);
    assert!(!harness.all_loaded());

    harness.frame();
    assert!(harness.all_loaded());
    assert_eq!(harness.machine.edit().visual_count(), 2);
    // background plus two entities
    assert_eq!(harness.runtime.sprite_count(), 3);
    assert!(harness.runtime.physics_paused());
}

#[test]
fn reconciliation_is_idempotent() {
    let mut harness = Harness::new(vec![player(), ground()]);
    harness.frame();
    let handle = harness.edit_visual("player");
    let before = harness.store.snapshot().entity(&EntityId::player()).cloned();

    harness.store.mark_entity_unloaded(&EntityId::player());
    harness.store.select_entity(&EntityId::new("ground"));
    harness.frames(3);

    assert_eq!(harness.edit_visual("player"), handle);
    assert_eq!(harness.runtime.sprite_count(), 3);
    assert_eq!(harness.runtime.objects_with_texture("EDIT_pinkman"), 1);
    assert_eq!(
        harness.store.snapshot().entity(&EntityId::player()).cloned(),
        before
    );
}

#[test]
fn repeated_player_adds_keep_a_single_player_visual() {
    let mut harness = Harness::new(vec![ground()]);
    for (id, title) in [("p-1", "pinkman"), ("p-2", "dude"), ("player", "pinkman")] {
        harness.store.add_entity(
            Entity::new(EntityId::new(id), EntityKind::Player, title)
                .with_sprite(format!("assets/sprites/{title}.png")),
        );
        harness.frame();
    }

    let snapshot = harness.store.snapshot();
    let players = snapshot
        .entities
        .values()
        .filter(|entity| entity.kind == EntityKind::Player)
        .count();
    assert_eq!(players, 1);
    assert!(snapshot.entities.contains_key(&EntityId::player()));
    assert_eq!(harness.machine.edit().visual_count(), 2);
    assert_eq!(harness.runtime.objects_with_texture("EDIT_pinkman"), 1);
    assert_eq!(harness.runtime.objects_with_texture("EDIT_dude"), 0);
}

#[test]
fn texture_key_follows_mode_and_title() {
    let mut harness = Harness::new(vec![player(), ground()]);
    harness.frame();
    let handle = harness.edit_visual("player");
    assert_eq!(
        harness.runtime.texture_key(handle).as_deref(),
        Some("EDIT_pinkman")
    );

    harness.store.update_entity_fields(
        &EntityId::player(),
        EntityPatch {
            title: Some("dude".to_string()),
            sprite_url: Some("assets/sprites/dude.png".to_string()),
            ..EntityPatch::default()
        },
    );
    harness.frames(2);
    assert_eq!(harness.edit_visual("player"), handle);
    assert_eq!(harness.runtime.texture_key(handle).as_deref(), Some("EDIT_dude"));

    harness.enter_play();
    assert!(harness.all_loaded());
    let play_handle = harness.play_visual("player");
    assert_eq!(
        harness.runtime.texture_key(play_handle).as_deref(),
        Some("PLAY_dude")
    );
    assert_eq!(harness.runtime.objects_with_texture("EDIT_dude"), 0);
}

#[test]
fn pending_loads_leave_entities_unloaded_and_failures_are_not_retried() {
    let mut harness = Harness::with_config(
        vec![player(), ground()],
        HeadlessConfig {
            load_mode: LoadMode::Manual,
            ..HeadlessConfig::default()
        },
    );
    harness.frame();
    assert!(!harness.all_loaded());
    assert!(harness.runtime.complete_load("EDIT_ground"));
    assert!(harness.runtime.fail_load("EDIT_pinkman", "404"));
    harness.frame();

    let snapshot = harness.store.snapshot();
    assert!(snapshot.entity(&EntityId::new("ground")).expect("ground").loaded);
    assert!(!snapshot.entity(&EntityId::player()).expect("player").loaded);
    let requests = harness
        .runtime
        .load_requests()
        .iter()
        .filter(|key| key.as_str() == "EDIT_pinkman")
        .count();

    harness.store.select_entity(&EntityId::new("ground"));
    harness.frames(2);
    let requests_after = harness
        .runtime
        .load_requests()
        .iter()
        .filter(|key| key.as_str() == "EDIT_pinkman")
        .count();
    assert_eq!(requests, requests_after);
    assert!(harness.machine.edit().visual_for(&EntityId::player()).is_none());
}

#[test]
fn load_completion_respects_deletion_during_the_wait() {
    let mut harness = Harness::with_config(
        vec![player(), ground()],
        HeadlessConfig {
            load_mode: LoadMode::Manual,
            ..HeadlessConfig::default()
        },
    );
    harness.store.delete_entity(&EntityId::new("ground"));
    harness.sync();
    assert!(harness.runtime.complete_load("EDIT_ground"));
    harness.frame();

    assert!(harness.machine.edit().visual_for(&EntityId::new("ground")).is_none());
    assert_eq!(harness.runtime.objects_with_texture("EDIT_ground"), 0);
    assert_eq!(harness.store.snapshot().deletion, TransitionStatus::Idle);
}

#[test]
fn deleting_an_entity_destroys_its_visual_and_acknowledges() {
    let mut harness = Harness::new(vec![player(), ground()]);
    harness.frame();
    let handle = harness.edit_visual("ground");
    harness.store.select_entity(&EntityId::new("ground"));
    harness.store.delete_entity(&EntityId::new("ground"));
    harness.sync();

    assert!(!harness.runtime.exists(handle));
    assert!(harness.machine.edit().visual_for(&EntityId::new("ground")).is_none());
    let snapshot = harness.store.snapshot();
    assert_eq!(snapshot.deletion, TransitionStatus::Idle);
    assert_eq!(snapshot.canvas.selected, None);
    assert_eq!(harness.runtime.outline(), None);
}

#[test]
fn select_tool_drag_commits_the_new_position() {
    let mut harness = Harness::new(vec![player(), ground()]);
    harness.frame();
    let handle = harness.edit_visual("ground");

    assert_eq!(harness.runtime.pointer_down(Vec2::new(400.0, 568.0)), Some(handle));
    harness.runtime.pointer_move(Vec2::new(430.0, 548.0));
    harness.runtime.pointer_up(Vec2::new(430.0, 548.0));
    harness.frame();

    let snapshot = harness.store.snapshot();
    let ground = snapshot.entity(&EntityId::new("ground")).expect("ground");
    assert_eq!((ground.x, ground.y), (430.0, 548.0));
    assert!(ground.loaded);
    assert_eq!(snapshot.canvas.selected, Some(EntityId::new("ground")));
    assert_eq!(harness.runtime.outline(), Some(handle));
    assert_eq!(
        harness.runtime.position(handle),
        Some(Vec2::new(430.0, 548.0))
    );
}

#[test]
fn resize_handle_drag_scales_from_the_opposite_corner() {
    let boxy = Entity::new(EntityId::new("box"), EntityKind::Platform, "box")
        .with_position(200.0, 100.0)
        .with_size(100.0, 50.0)
        .with_sprite("assets/platforms/box.png");
    let mut harness = Harness::new(vec![boxy]);
    harness.frame();
    harness.store.switch_tool(Tool::Resize);
    harness.store.select_entity(&EntityId::new("box"));
    harness.sync();

    let handles = harness.machine.edit().resize_handles();
    assert_eq!(handles.len(), 4);
    let top_right = handles
        .iter()
        .find(|(corner, _)| *corner == crate::runtime::Corner::TopRight)
        .map(|(_, handle)| *handle)
        .expect("top right handle");
    assert_eq!(
        harness.runtime.position(top_right),
        Some(Vec2::new(250.0, 75.0))
    );

    assert_eq!(harness.runtime.pointer_down(Vec2::new(250.0, 75.0)), Some(top_right));
    harness.runtime.pointer_move(Vec2::new(260.0, 70.0));
    harness.runtime.pointer_up(Vec2::new(260.0, 70.0));
    harness.frame();

    let snapshot = harness.store.snapshot();
    let entity = snapshot.entity(&EntityId::new("box")).expect("box");
    let (width, height) = entity.display_size();
    assert!(close(width, 110.0), "width {width}");
    assert!(close(height, 55.0), "height {height}");
    assert_eq!((entity.width, entity.height), (100.0, 50.0));
    // bottom-left corner stays at (150, 125)
    assert!(close(entity.x - width * 0.5, 150.0));
    assert!(close(entity.y + height * 0.5, 125.0));

    let visual = harness.edit_visual("box");
    let size = harness.runtime.display_size(visual).expect("display size");
    assert!(close(size.width, 110.0) && close(size.height, 55.0));
}

#[test]
fn resize_scale_is_relative_to_the_drawn_texture() {
    let boxy = Entity::new(EntityId::new("box"), EntityKind::Platform, "box")
        .with_position(200.0, 100.0)
        .with_size(100.0, 50.0)
        .with_sprite("assets/platforms/box.png");
    let mut runtime = HeadlessRuntime::new(HeadlessConfig::default());
    // the image on disk is half the authored size
    runtime.register_texture("EDIT_box", Size::new(50.0, 25.0));
    let mut harness = Harness::with_runtime(vec![boxy], runtime);
    harness.frame();
    harness.store.switch_tool(Tool::Resize);
    harness.store.select_entity(&EntityId::new("box"));
    harness.sync();

    let top_right = harness
        .machine
        .edit()
        .resize_handles()
        .iter()
        .find(|(corner, _)| *corner == crate::runtime::Corner::TopRight)
        .map(|(_, handle)| *handle)
        .expect("top right handle");
    assert_eq!(
        harness.runtime.position(top_right),
        Some(Vec2::new(225.0, 87.5))
    );

    assert_eq!(harness.runtime.pointer_down(Vec2::new(225.0, 87.5)), Some(top_right));
    harness.runtime.pointer_move(Vec2::new(235.0, 82.5));
    harness.runtime.pointer_up(Vec2::new(235.0, 82.5));
    harness.frame();

    let snapshot = harness.store.snapshot();
    let entity = snapshot.entity(&EntityId::new("box")).expect("box");
    assert_eq!((entity.width, entity.height), (50.0, 25.0));
    assert!(close(entity.scale_x, 1.2) && close(entity.scale_y, 1.2));

    let visual = harness.edit_visual("box");
    let size = harness.runtime.display_size(visual).expect("display size");
    assert!(close(size.width, 60.0), "width {}", size.width);
    assert!(close(size.height, 30.0), "height {}", size.height);
}

#[test]
fn delete_tool_release_opens_confirmation() {
    let mut harness = Harness::new(vec![player(), ground()]);
    harness.frame();
    harness.store.switch_tool(Tool::Delete);
    harness.sync();

    let handle = harness.edit_visual("ground");
    assert!(!harness.runtime.object(handle).expect("object").draggable);
    harness.runtime.pointer_down(Vec2::new(400.0, 568.0));
    harness.runtime.pointer_up(Vec2::new(400.0, 568.0));
    harness.frame();
    assert_eq!(
        harness.store.snapshot().canvas.dialog,
        DialogState::ConfirmDelete
    );

    confirm_dialog(&mut harness.store);
    harness.frame();
    assert!(!harness.runtime.exists(handle));
    assert_eq!(harness.store.snapshot().entities.len(), 1);
}

#[test]
fn tool_changes_reconfigure_existing_visuals() {
    let mut harness = Harness::new(vec![player(), ground()]);
    harness.frame();
    let handle = harness.edit_visual("player");
    assert!(harness.runtime.object(handle).expect("object").draggable);

    harness.store.switch_tool(Tool::Flip);
    harness.sync();
    let object = harness.runtime.object(handle).expect("object");
    assert!(object.interactive);
    assert!(!object.draggable);
    assert_eq!(harness.machine.edit().tool(), Tool::Flip);
}

#[test]
fn collecting_the_last_item_respawns_items_and_clones_a_moving_obstacle() {
    let mut harness = Harness::new(vec![
        player(),
        ground(),
        star(700.0, 100.0),
        obstacle("bomb", "bomb", ObstacleBehavior::Bounce, 400.0, 100.0),
        obstacle("spikes", "spikes", ObstacleBehavior::Static, 600.0, 540.0),
    ]);
    harness.frame();
    harness.enter_play();
    assert!(harness.all_loaded());
    assert_eq!(harness.runtime.hud_text(), Some("Score: 0"));

    let player = harness.machine.play().player().expect("player");
    let item = harness.play_visual("star");
    let before = harness.runtime.position(item).expect("item position");
    harness.contact(ContactEvent {
        tag: PLAYER_COLLECT_ITEM,
        first: player,
        second: item,
    });

    let rules = harness.machine.play().rules();
    assert_eq!(rules.score(), 10);
    assert!(!rules.is_game_over());
    assert_eq!(harness.runtime.hud_text(), Some("Score: 10"));
    assert!(harness.runtime.body_enabled(item));

    let after = harness.runtime.position(item).expect("respawned position");
    assert_ne!(after, before, "item respawns somewhere new");
    let size = harness.runtime.display_size(item).expect("item size");
    let world = harness.runtime.world_size();
    assert!(after.x >= size.width * 0.5 && after.x <= world.width - size.width * 0.5);
    assert!(after.y >= size.height * 0.5 && after.y <= world.height - size.height);

    assert_eq!(rules.clones().len(), 1);
    let clone = rules.clones()[0];
    assert_eq!(rules.obstacle_behavior(clone), Some(ObstacleBehavior::Bounce));
    assert_eq!(harness.runtime.objects_with_texture("PLAY_bomb"), 2);
    let position = harness.runtime.position(clone).expect("clone position");
    assert_eq!(position.y, 0.0);
    assert!(position.x >= 400.0, "player is on the left half");
}

#[test]
fn clones_are_never_templates_for_later_waves() {
    let mut harness = Harness::new(vec![
        player(),
        ground(),
        star(700.0, 100.0),
        obstacle("bomb", "bomb", ObstacleBehavior::Bounce, 400.0, 100.0),
    ]);
    harness.frame();
    harness.enter_play();
    let player = harness.machine.play().player().expect("player");
    let item = harness.play_visual("star");
    let collect = ContactEvent {
        tag: PLAYER_COLLECT_ITEM,
        first: player,
        second: item,
    };

    harness.contact(collect);
    assert_eq!(harness.machine.play().rules().clones().len(), 1);

    // with the authored bomb gone only the clone is left moving
    let bomb = harness.play_visual("bomb");
    harness.runtime.destroy(bomb);
    harness.contact(collect);

    let rules = harness.machine.play().rules();
    assert_eq!(rules.score(), 20);
    assert_eq!(rules.clones().len(), 1);
    assert_eq!(harness.runtime.objects_with_texture("PLAY_bomb"), 1);
}

#[test]
fn collecting_a_disabled_item_scores_nothing() {
    let mut harness = Harness::new(vec![
        player(),
        ground(),
        star(700.0, 100.0),
        Entity::new(EntityId::new("gem"), EntityKind::Item, "gem").with_position(600.0, 100.0),
    ]);
    harness.frame();
    harness.enter_play();
    let player = harness.machine.play().player().expect("player");
    let item = harness.play_visual("star");
    let event = ContactEvent {
        tag: PLAYER_COLLECT_ITEM,
        first: player,
        second: item,
    };
    harness.contact(event);
    harness.contact(event);

    assert_eq!(harness.machine.play().rules().score(), 10);
    assert!(!harness.runtime.body_enabled(item));
    assert!(harness.machine.play().rules().clones().is_empty());
}

#[test]
fn game_over_freezes_the_player_until_restart() {
    let mut harness = Harness::new(vec![
        player(),
        ground(),
        obstacle("bomb", "bomb", ObstacleBehavior::Bounce, 400.0, 100.0),
    ]);
    harness.frame();
    harness.enter_play();
    let player = harness.machine.play().player().expect("player");
    let bomb = harness.play_visual("bomb");
    harness.contact(ContactEvent {
        tag: PLAYER_HIT_OBSTACLE,
        first: player,
        second: bomb,
    });

    assert!(harness.machine.play().rules().is_game_over());
    assert!(harness.runtime.physics_paused());
    let object = harness.runtime.object(player).expect("player object");
    assert_eq!(object.tint, Some(0xff0000));
    assert_eq!(object.animation.as_deref(), Some("turn_pinkman"));
    let overlay = harness.runtime.overlay().expect("overlay");
    assert_eq!(overlay.message, "GAME OVER!");
    assert_eq!(overlay.action_label, "PLAY AGAIN");

    let position = harness.runtime.position(player);
    let velocity = harness.runtime.velocity(player);
    let revision = harness.store.revision();
    harness.runtime.force_touching_down(player, true);
    harness.frame_with(PlayerInput::empty().with_right(true).with_up(true));
    assert_eq!(harness.runtime.position(player), position);
    assert_eq!(harness.runtime.velocity(player), velocity);
    assert_eq!(
        harness.runtime.object(player).expect("player").animation.as_deref(),
        Some("turn_pinkman")
    );
    assert_eq!(harness.store.revision(), revision);

    harness.runtime.pointer_down(Vec2::new(10.0, 10.0));
    harness.frames(2);
    assert_eq!(harness.machine.activations(Mode::Play), 2);
    assert!(!harness.machine.play().rules().is_game_over());
    assert!(harness.runtime.overlay().is_none());
    assert!(!harness.runtime.physics_paused());
    let restarted = harness.machine.play().player().expect("player");
    assert_eq!(harness.runtime.object(restarted).expect("player").tint, None);
}

#[test]
fn play_input_drives_velocity_and_animation() {
    let mut harness = Harness::new(vec![player(), ground()]);
    harness.frame();
    harness.enter_play();
    let player = harness.machine.play().player().expect("player");

    harness.frame_with(PlayerInput::empty().with_left(true));
    let object = harness.runtime.object(player).expect("player");
    assert_eq!(object.animation.as_deref(), Some("left_pinkman"));
    assert_eq!(harness.runtime.velocity(player).map(|v| v.x), Some(-RUN_SPEED));

    harness.runtime.force_touching_down(player, true);
    harness.with(|machine, ctx| {
        let input = PlayerInput::empty().with_up(true);
        // update without stepping so the jump velocity is observable
        machine.frame(ctx, 0.0, &input);
    });
    assert_eq!(harness.runtime.velocity(player).map(|v| v.y), Some(JUMP_VELOCITY));
}

#[test]
fn obstacle_behaviors_configure_bodies() {
    let mut harness = Harness::new(vec![
        player(),
        obstacle("bomb", "bomb", ObstacleBehavior::Bounce, 400.0, 100.0),
        obstacle("cloud", "cloud", ObstacleBehavior::Float, 200.0, 100.0),
        obstacle("spikes", "spikes", ObstacleBehavior::Static, 600.0, 540.0),
    ]);
    harness.frame();
    harness.enter_play();

    let bomb = harness.runtime.object(harness.play_visual("bomb")).expect("bomb");
    let body = bomb.body.as_ref().expect("bomb body");
    assert_eq!(body.bounce, 1.0);
    assert!(body.collide_world_bounds);
    assert!(!body.gravity_enabled);
    assert!((-200.0..=200.0).contains(&body.velocity.x));

    let cloud = harness.runtime.object(harness.play_visual("cloud")).expect("cloud");
    assert!(cloud.has_tween());
    assert!(cloud.body.as_ref().expect("cloud body").immovable);

    let spikes = harness.runtime.object(harness.play_visual("spikes")).expect("spikes");
    assert!(!spikes.body.as_ref().expect("spikes body").gravity_enabled);
}

#[test]
fn audio_and_spotlight_follow_canvas_selections_in_play() {
    let mut harness = Harness::new(vec![player(), ground()]);
    harness.frame();
    harness.store.set_audio("a1");
    harness.store.set_effect("spotlight");
    harness.frame();
    assert!(harness.runtime.playing_sounds().is_empty());

    harness.enter_play();
    harness.frame();
    assert_eq!(harness.runtime.playing_sounds(), vec![("AUDIO_a1", true)]);
    let light = harness.machine.play().light().expect("spotlight");

    harness.store.set_audio("a2");
    harness.frames(2);
    assert_eq!(harness.runtime.playing_sounds(), vec![("AUDIO_a2", true)]);

    harness.with(|machine, ctx| machine.frame(ctx, 0.0, &PlayerInput::empty()));
    let player = harness.machine.play().player().expect("player");
    assert_eq!(harness.machine.play().light(), Some(light));
    assert_eq!(harness.runtime.position(light), harness.runtime.position(player));

    harness.store.switch_mode(Mode::Edit);
    harness.frame();
    assert!(harness.runtime.playing_sounds().is_empty());
    assert!(!harness.runtime.exists(light));
}

#[test]
fn rapid_mode_switches_activate_play_once() {
    let mut harness = Harness::new(vec![player(), ground()]);
    harness.frame();
    harness.store.switch_mode(Mode::Play);
    harness.store.switch_mode(Mode::Play);
    harness.frame();
    assert_eq!(harness.machine.activations(Mode::Play), 1);

    harness.with(|machine, ctx| {
        ctx.store.switch_mode(Mode::Play);
        machine.sync(ctx);
        ctx.store.switch_mode(Mode::Play);
        machine.sync(ctx);
    });
    assert_eq!(harness.machine.activations(Mode::Play), 1);
    assert_eq!(harness.machine.activations(Mode::Edit), 1);
    assert_eq!(
        harness.store.snapshot().canvas.mode_switch,
        TransitionStatus::Idle
    );
    assert!(!harness.machine.edit().is_active());
    assert!(harness.machine.play().is_active());
}

#[test]
fn switching_back_to_edit_rebuilds_edit_visuals() {
    let mut harness = Harness::new(vec![player(), ground()]);
    harness.frame();
    harness.enter_play();
    assert_eq!(harness.runtime.objects_with_texture("EDIT_pinkman"), 0);

    harness.store.switch_mode(Mode::Edit);
    harness.frames(2);
    assert_eq!(harness.machine.activations(Mode::Edit), 2);
    assert!(harness.all_loaded());
    assert_eq!(harness.runtime.objects_with_texture("PLAY_pinkman"), 0);
    assert_eq!(harness.runtime.objects_with_texture("EDIT_pinkman"), 1);
    assert!(harness.runtime.physics_paused());
    assert_eq!(harness.runtime.hud_text(), None);
}

#[test]
fn background_changes_swap_the_texture_in_place() {
    let mut harness = Harness::new(vec![player()]);
    harness.frame();
    let background = harness.machine.edit().background().expect("background");
    assert_eq!(harness.runtime.texture_key(background).as_deref(), Some("bg1"));
    assert_eq!(
        harness.runtime.display_size(background),
        Some(Size::new(800.0, 600.0))
    );

    harness.store.set_background("bg2");
    harness.frames(2);
    assert_eq!(harness.machine.edit().background(), Some(background));
    assert_eq!(harness.runtime.texture_key(background).as_deref(), Some("bg2"));

    harness.store.set_background("nope");
    harness.frame();
    assert_eq!(harness.runtime.texture_key(background).as_deref(), Some("bg2"));
}
