use tracing::{info, warn};

use crate::runtime::{ContactEvent, InteractionEvent};
use crate::store::Mode;

use super::edit::EditScene;
use super::play::PlayScene;
use super::{ModeScene, PlayerInput, SceneCommand, SceneContext};

/// Upper bound on reconciliation passes per sync. Write-backs from one pass
/// normally settle in the next.
pub const MAX_RECONCILE_PASSES: usize = 8;

/// Owns both mode scenes and keeps exactly one of them active.
pub struct SceneMachine {
    edit: EditScene,
    play: PlayScene,
    active: Mode,
    edit_activations: u32,
    play_activations: u32,
}

impl SceneMachine {
    pub fn new(seed: u64) -> Self {
        Self {
            edit: EditScene::new(),
            play: PlayScene::new(seed),
            active: Mode::Edit,
            edit_activations: 0,
            play_activations: 0,
        }
    }

    pub fn active_mode(&self) -> Mode {
        self.active
    }

    pub fn edit(&self) -> &EditScene {
        &self.edit
    }

    pub fn play(&self) -> &PlayScene {
        &self.play
    }

    pub fn activations(&self, mode: Mode) -> u32 {
        match mode {
            Mode::Edit => self.edit_activations,
            Mode::Play => self.play_activations,
        }
    }

    fn scene_mut(&mut self, mode: Mode) -> &mut dyn ModeScene {
        match mode {
            Mode::Edit => &mut self.edit,
            Mode::Play => &mut self.play,
        }
    }

    fn scene_ref(&self, mode: Mode) -> &dyn ModeScene {
        match mode {
            Mode::Edit => &self.edit,
            Mode::Play => &self.play,
        }
    }

    fn activate(&mut self, ctx: &mut SceneContext<'_>, mode: Mode) {
        self.active = mode;
        self.scene_mut(mode).activate(ctx);
        match mode {
            Mode::Edit => self.edit_activations += 1,
            Mode::Play => self.play_activations += 1,
        }
    }

    /// Activates the scene named by the store's current mode.
    pub fn start(&mut self, ctx: &mut SceneContext<'_>) {
        if self.scene_ref(self.active).is_active() {
            return;
        }
        let mode = ctx.store.snapshot().canvas.mode;
        self.activate(ctx, mode);
        ctx.store.acknowledge_mode_switch();
        info!(mode = ?mode, "scene_machine_started");
        self.sync(ctx);
    }

    /// Runs reconciliation passes on the active scene until the store stops
    /// changing underneath it.
    pub fn sync(&mut self, ctx: &mut SceneContext<'_>) {
        for _ in 0..MAX_RECONCILE_PASSES {
            let scene = self.scene_mut(self.active);
            if !scene.take_dirty() {
                return;
            }
            let command = scene.reconcile(ctx);
            self.apply(ctx, command);
        }
        warn!(
            mode = ?self.active,
            passes = MAX_RECONCILE_PASSES,
            "reconcile_pass_limit"
        );
    }

    fn apply(&mut self, ctx: &mut SceneContext<'_>, command: SceneCommand) {
        match command {
            SceneCommand::None => {}
            SceneCommand::SwitchTo(mode) => {
                self.switch_to(ctx, mode);
            }
            SceneCommand::Restart => self.restart_active(ctx),
        }
    }

    /// Deactivates the current scene, unloads every entity and activates
    /// `mode`. Returns false when `mode` is already running.
    pub fn switch_to(&mut self, ctx: &mut SceneContext<'_>, mode: Mode) -> bool {
        if self.active == mode && self.scene_ref(mode).is_active() {
            ctx.store.acknowledge_mode_switch();
            return false;
        }
        let from = self.active;
        self.scene_mut(from).deactivate(ctx);
        ctx.store.unload_all_entities();
        self.activate(ctx, mode);
        ctx.store.acknowledge_mode_switch();
        info!(from = ?from, to = ?mode, "scene_switched");
        true
    }

    /// Tears the active scene down and rebuilds it from the current snapshot.
    pub fn restart_active(&mut self, ctx: &mut SceneContext<'_>) {
        let mode = self.active;
        self.scene_mut(mode).deactivate(ctx);
        ctx.store.unload_all_entities();
        self.activate(ctx, mode);
        info!(mode = ?mode, "scene_restarted");
    }

    /// One frame: finished loads, pointer input, per-frame update, physics
    /// step, then contacts. The store is reconciled after each stage.
    pub fn frame(&mut self, ctx: &mut SceneContext<'_>, dt_seconds: f32, input: &PlayerInput) {
        for event in ctx.runtime.poll_loads() {
            self.scene_mut(self.active).on_load_event(ctx, &event);
        }
        self.sync(ctx);

        for event in ctx.runtime.poll_interactions() {
            self.dispatch_interaction(ctx, event);
        }
        self.sync(ctx);

        let command = self.scene_mut(self.active).update(ctx, dt_seconds, input);
        self.apply(ctx, command);
        ctx.runtime.step(dt_seconds);

        for event in ctx.runtime.poll_contacts() {
            self.dispatch_contact(ctx, event);
        }
        self.sync(ctx);
    }

    pub fn dispatch_interaction(&mut self, ctx: &mut SceneContext<'_>, event: InteractionEvent) {
        let command = self.scene_mut(self.active).handle_interaction(ctx, event);
        self.apply(ctx, command);
    }

    pub fn dispatch_contact(&mut self, ctx: &mut SceneContext<'_>, event: ContactEvent) {
        let command = self.scene_mut(self.active).handle_contact(ctx, event);
        self.apply(ctx, command);
    }

    pub fn shutdown(&mut self, ctx: &mut SceneContext<'_>) {
        let mode = self.active;
        let scene = self.scene_mut(mode);
        if scene.is_active() {
            scene.deactivate(ctx);
            info!(mode = ?mode, "scene_machine_stopped");
        }
    }
}
