use tracing::{debug, info};

use crate::runtime::{Corner, InteractionEvent, LoadEvent, ObjectHandle, Rect, Size, Vec2};
use crate::store::{Entity, EntityId, Mode, ScaleUpdate, StoreSnapshot, Tool};

use super::base::{SceneCore, SceneGroups, SceneHooks};
use super::tools::{dialog_for_release, interactivity_for, resize_from_handle};
use super::{ModeScene, SceneCommand, SceneContext};

const HANDLE_RADIUS: f32 = 4.0;
const HANDLE_DEPTH: i32 = 1000;

#[derive(Debug, Clone, PartialEq)]
enum EditDrag {
    Move {
        id: EntityId,
    },
    Resize {
        id: EntityId,
        corner: Corner,
        handle_origin: Vec2,
        base: Size,
        base_center: Vec2,
        current: Option<(Size, Vec2)>,
    },
}

/// Tool-dependent interaction state of the Edit scene.
#[derive(Debug, Default)]
struct EditTools {
    tool: Tool,
    handles: Vec<(Corner, ObjectHandle)>,
    drag: Option<EditDrag>,
}

impl EditTools {
    fn corner_for(&self, handle: ObjectHandle) -> Option<Corner> {
        self.handles
            .iter()
            .find(|(_, candidate)| *candidate == handle)
            .map(|(corner, _)| *corner)
    }

    fn apply_tool(&self, ctx: &mut SceneContext<'_>, handle: ObjectHandle) {
        let interactivity = interactivity_for(self.tool);
        ctx.runtime.set_interactive(handle, interactivity.interactive);
        ctx.runtime.set_draggable(handle, interactivity.draggable);
    }

    fn clear_handles(&mut self, ctx: &mut SceneContext<'_>) {
        for (_, handle) in self.handles.drain(..) {
            ctx.runtime.destroy(handle);
        }
    }

    fn place_handles(&mut self, ctx: &mut SceneContext<'_>, bounds: Rect) {
        if self.handles.is_empty() {
            for corner in Corner::ALL {
                let handle = ctx.runtime.create_marker(bounds.corner(corner), HANDLE_RADIUS);
                ctx.runtime.set_depth(handle, HANDLE_DEPTH);
                ctx.runtime.set_draggable(handle, true);
                self.handles.push((corner, handle));
            }
            return;
        }
        for (corner, handle) in &self.handles {
            ctx.runtime.set_position(*handle, bounds.corner(*corner));
        }
    }
}

impl SceneHooks for EditTools {
    fn configure_visual(
        &mut self,
        ctx: &mut SceneContext<'_>,
        _groups: SceneGroups,
        _entity: &Entity,
        handle: ObjectHandle,
        _created: bool,
    ) {
        self.apply_tool(ctx, handle);
    }

    fn visual_released(&mut self, ctx: &mut SceneContext<'_>, id: &EntityId, _handle: ObjectHandle) {
        let dragging = match &self.drag {
            Some(EditDrag::Move { id: target }) | Some(EditDrag::Resize { id: target, .. }) => {
                target == id
            }
            None => false,
        };
        if dragging {
            self.drag = None;
        }
        ctx.runtime.set_outline(None);
    }
}

/// Editing controller: physics paused, visuals respond to the active tool.
pub struct EditScene {
    core: SceneCore,
    tools: EditTools,
}

impl Default for EditScene {
    fn default() -> Self {
        Self::new()
    }
}

impl EditScene {
    pub fn new() -> Self {
        Self {
            core: SceneCore::new(Mode::Edit),
            tools: EditTools::default(),
        }
    }

    pub fn visual_for(&self, id: &EntityId) -> Option<ObjectHandle> {
        self.core.visual_handle(id)
    }

    pub fn visual_count(&self) -> usize {
        self.core.visuals.len()
    }

    pub fn background(&self) -> Option<ObjectHandle> {
        self.core.background()
    }

    /// Live resize handles, one per corner while the Resize tool has a selection.
    pub fn resize_handles(&self) -> Vec<(Corner, ObjectHandle)> {
        self.tools.handles.clone()
    }

    pub fn tool(&self) -> Tool {
        self.tools.tool
    }

    fn sync_tool(&mut self, ctx: &mut SceneContext<'_>, snapshot: &StoreSnapshot) {
        let tool = snapshot.canvas.tool;
        if tool == self.tools.tool {
            return;
        }
        self.tools.tool = tool;
        self.tools.drag = None;
        for visual in self.core.visuals.values() {
            self.tools.apply_tool(ctx, visual.handle);
        }
        info!(tool = ?tool, "tool_applied");
    }

    /// Outline on the selected visual; corner handles under the Resize tool.
    fn sync_selection(&mut self, ctx: &mut SceneContext<'_>, snapshot: &StoreSnapshot) {
        let selected = snapshot
            .canvas
            .selected
            .as_ref()
            .and_then(|id| self.core.visual_handle(id));
        ctx.runtime.set_outline(selected);

        let resizing = matches!(self.tools.drag, Some(EditDrag::Resize { .. }));
        if resizing {
            return;
        }
        let bounds = selected.and_then(|handle| ctx.runtime.bounds(handle));
        match bounds {
            Some(bounds) if interactivity_for(self.tools.tool).resize_handles => {
                self.tools.place_handles(ctx, bounds);
            }
            _ => self.tools.clear_handles(ctx),
        }
    }

    fn begin_drag(&mut self, ctx: &mut SceneContext<'_>, target: ObjectHandle, position: Vec2) {
        if let Some(corner) = self.tools.corner_for(target) {
            let snapshot = ctx.store.snapshot();
            let Some(id) = snapshot.canvas.selected.clone() else {
                return;
            };
            let Some(visual) = self.core.visual_handle(&id) else {
                return;
            };
            let (Some(base), Some(base_center)) =
                (ctx.runtime.display_size(visual), ctx.runtime.position(visual))
            else {
                return;
            };
            self.tools.drag = Some(EditDrag::Resize {
                id,
                corner,
                handle_origin: position,
                base,
                base_center,
                current: None,
            });
            return;
        }
        if self.tools.tool != Tool::Select {
            return;
        }
        if let Some(id) = self.core.entity_for_handle(target).cloned() {
            self.tools.drag = Some(EditDrag::Move { id });
        }
    }

    fn continue_drag(&mut self, ctx: &mut SceneContext<'_>, target: ObjectHandle, position: Vec2) {
        match &mut self.tools.drag {
            Some(EditDrag::Move { id }) => {
                let Some(visual) = self.core.visuals.get(id) else {
                    return;
                };
                if visual.handle != target {
                    return;
                }
                ctx.runtime.set_position(visual.handle, position);
                if let Some(group) = visual.group {
                    ctx.runtime.refresh_group(group);
                }
            }
            Some(EditDrag::Resize {
                id,
                corner,
                handle_origin,
                base,
                base_center,
                current,
            }) => {
                let Some(visual) = self.core.visual_handle(id) else {
                    return;
                };
                let delta = Vec2::new(position.x - handle_origin.x, position.y - handle_origin.y);
                let (size, center) = resize_from_handle(*corner, *base, *base_center, delta);
                ctx.runtime.set_display_size(visual, size);
                ctx.runtime.set_position(visual, center);
                *current = Some((size, center));
                let bounds = Rect::from_center(center, size);
                for (corner, handle) in &self.tools.handles {
                    ctx.runtime.set_position(*handle, bounds.corner(*corner));
                }
            }
            None => {}
        }
    }

    fn finish_drag(&mut self, ctx: &mut SceneContext<'_>, position: Vec2) {
        let Some(drag) = self.tools.drag.take() else {
            return;
        };
        match drag {
            EditDrag::Move { id } => {
                let z = ctx.store.snapshot().entity(&id).map(|entity| entity.z);
                if let Some(z) = z {
                    ctx.store.update_entity_position(&id, position.x, position.y, z);
                    debug!(entity_id = %id, x = position.x, y = position.y, "entity_moved");
                }
            }
            EditDrag::Resize { id, current, .. } => {
                let Some((size, center)) = current else {
                    return;
                };
                // Scale is relative to the texture the visual actually draws.
                let source = self
                    .core
                    .visual_handle(&id)
                    .and_then(|visual| ctx.runtime.source_size(visual));
                let Some(source) = source else {
                    return;
                };
                if source.width <= 0.0 || source.height <= 0.0 {
                    return;
                }
                let scale_x = size.width / source.width;
                let scale_y = size.height / source.height;
                ctx.store.update_entity_scale(
                    &id,
                    ScaleUpdate {
                        width: source.width,
                        height: source.height,
                        scale_x,
                        scale_y,
                        scale: (scale_x + scale_y) * 0.5,
                        x: center.x,
                        y: center.y,
                    },
                );
                debug!(
                    entity_id = %id,
                    display_width = size.width,
                    display_height = size.height,
                    "entity_resized"
                );
            }
        }
    }
}

impl ModeScene for EditScene {
    fn mode(&self) -> Mode {
        Mode::Edit
    }

    fn is_active(&self) -> bool {
        self.core.is_active()
    }

    fn activate(&mut self, ctx: &mut SceneContext<'_>) {
        ctx.runtime.pause_physics();
        self.tools.tool = ctx.store.snapshot().canvas.tool;
        self.tools.drag = None;
        self.core.activate(ctx);
    }

    fn deactivate(&mut self, ctx: &mut SceneContext<'_>) {
        self.tools.clear_handles(ctx);
        self.tools.drag = None;
        ctx.runtime.set_outline(None);
        self.core.deactivate(ctx, &mut self.tools);
    }

    fn take_dirty(&mut self) -> bool {
        self.core.take_dirty()
    }

    fn reconcile(&mut self, ctx: &mut SceneContext<'_>) -> SceneCommand {
        if !self.core.is_active() {
            return SceneCommand::None;
        }
        let snapshot = ctx.store.snapshot();
        if let Some(command) = self.core.check_mode(ctx, &snapshot) {
            return command;
        }
        self.core.sync_background(ctx, &snapshot);
        self.sync_tool(ctx, &snapshot);
        self.core.release_deleted(ctx, &snapshot, &mut self.tools);
        self.core.sync_positions(ctx, &snapshot);
        self.core.materialize_pending(ctx, &snapshot, &mut self.tools);
        self.sync_selection(ctx, &snapshot);
        SceneCommand::None
    }

    fn on_load_event(&mut self, ctx: &mut SceneContext<'_>, event: &LoadEvent) {
        self.core.on_load_event(ctx, event, &mut self.tools);
    }

    fn handle_interaction(&mut self, ctx: &mut SceneContext<'_>, event: InteractionEvent) -> SceneCommand {
        match event {
            InteractionEvent::PointerDown { target, .. } => {
                if let Some(id) = self.core.entity_for_handle(target).cloned() {
                    ctx.store.select_entity(&id);
                }
            }
            InteractionEvent::DragStart { target, position } => self.begin_drag(ctx, target, position),
            InteractionEvent::Drag { target, position } => self.continue_drag(ctx, target, position),
            InteractionEvent::DragEnd { position, .. } => self.finish_drag(ctx, position),
            InteractionEvent::PointerUp { target, .. } => {
                let Some(dialog) = dialog_for_release(ctx.store.snapshot().canvas.tool) else {
                    return SceneCommand::None;
                };
                if let Some(id) = self.core.entity_for_handle(target).cloned() {
                    ctx.store.select_entity(&id);
                    ctx.store.open_dialog(dialog);
                }
            }
            InteractionEvent::OverlayAction => {}
        }
        SceneCommand::None
    }
}
