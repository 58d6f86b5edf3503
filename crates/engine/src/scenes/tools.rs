use tracing::debug;

use crate::runtime::{Corner, Size, Vec2};
use crate::store::{DialogState, EntityId, EntityKind, EntityStore, ObstacleBehavior, Tool};

pub const DUPLICATE_OFFSET: f32 = 20.0;
const MIN_RESIZE_EXTENT: f32 = 1.0;

/// How entity visuals respond to the pointer under a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interactivity {
    pub interactive: bool,
    pub draggable: bool,
    pub resize_handles: bool,
}

pub fn interactivity_for(tool: Tool) -> Interactivity {
    match tool {
        Tool::Select => Interactivity {
            interactive: true,
            draggable: true,
            resize_handles: false,
        },
        Tool::Resize => Interactivity {
            interactive: true,
            draggable: false,
            resize_handles: true,
        },
        Tool::Delete | Tool::Flip | Tool::Duplicate | Tool::Fill | Tool::Rotate => Interactivity {
            interactive: true,
            draggable: false,
            resize_handles: false,
        },
    }
}

/// Dialog a pointer release opens under `tool`, if any.
pub fn dialog_for_release(tool: Tool) -> Option<DialogState> {
    match tool {
        Tool::Delete => Some(DialogState::ConfirmDelete),
        Tool::Duplicate => Some(DialogState::ConfirmDuplicate),
        _ => None,
    }
}

/// Display size and center after dragging `corner` by `delta` from where the
/// drag started. The opposite corner stays put.
pub fn resize_from_handle(corner: Corner, base: Size, base_center: Vec2, delta: Vec2) -> (Size, Vec2) {
    let (width, height) = match corner {
        Corner::TopLeft => (base.width - delta.x, base.height - delta.y),
        Corner::TopRight => (base.width + delta.x, base.height - delta.y),
        Corner::BottomRight => (base.width + delta.x, base.height + delta.y),
        Corner::BottomLeft => (base.width - delta.x, base.height + delta.y),
    };
    let size = Size::new(width.max(MIN_RESIZE_EXTENT), height.max(MIN_RESIZE_EXTENT));

    let grow_x = (size.width - base.width) * 0.5;
    let grow_y = (size.height - base.height) * 0.5;
    let (sign_x, sign_y) = match corner {
        Corner::TopLeft => (-1.0, -1.0),
        Corner::TopRight => (1.0, -1.0),
        Corner::BottomRight => (1.0, 1.0),
        Corner::BottomLeft => (-1.0, 1.0),
    };
    let center = Vec2::new(base_center.x + sign_x * grow_x, base_center.y + sign_y * grow_y);
    (size, center)
}

/// Applies the open confirmation dialog to the selection and closes it.
/// Returns the id created by a duplicate, if any.
pub fn confirm_dialog(store: &mut EntityStore) -> Option<EntityId> {
    let snapshot = store.snapshot();
    let selected = snapshot.canvas.selected.clone();
    let dialog = snapshot.canvas.dialog;
    drop(snapshot);

    let created = match (dialog, selected) {
        (DialogState::Closed, _) => return None,
        (DialogState::ConfirmDelete, Some(id)) => {
            store.delete_entity(&id);
            None
        }
        (DialogState::ConfirmDuplicate, Some(id)) => duplicate_entity(store, &id),
        (_, None) => None,
    };
    store.close_dialog();
    created
}

pub fn cancel_dialog(store: &mut EntityStore) -> bool {
    store.close_dialog()
}

/// Clones `id` with a fresh id, offset down and right, and selects the clone.
/// A duplicated player becomes a static obstacle so the player stays unique.
pub fn duplicate_entity(store: &mut EntityStore, id: &EntityId) -> Option<EntityId> {
    let mut clone = store.snapshot().entity(id)?.clone();
    clone.id = EntityId::generate();
    clone.x += DUPLICATE_OFFSET;
    clone.y += DUPLICATE_OFFSET;
    clone.loaded = false;
    if clone.kind == EntityKind::Player {
        let behavior = ObstacleBehavior::Static;
        clone.kind = EntityKind::Obstacle { behavior };
        clone.physics = behavior.as_tag().to_string();
    }

    let new_id = clone.id.clone();
    debug!(source = %id, clone = %new_id, "entity_duplicated");
    store.add_entity(clone);
    store.select_entity(&new_id);
    Some(new_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Entity, TransitionStatus};

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn top_right_drag_grows_width_and_height() {
        let (size, center) = resize_from_handle(
            Corner::TopRight,
            Size::new(100.0, 50.0),
            Vec2::new(200.0, 100.0),
            Vec2::new(10.0, -5.0),
        );
        assert_eq!(size, Size::new(110.0, 55.0));
        // bottom-left corner stays at (150, 125)
        assert!(close(center.x - size.width * 0.5, 150.0));
        assert!(close(center.y + size.height * 0.5, 125.0));
    }

    #[test]
    fn each_corner_follows_its_own_signs() {
        let base = Size::new(100.0, 50.0);
        let delta = Vec2::new(10.0, 10.0);
        let center = Vec2::ZERO;
        assert_eq!(
            resize_from_handle(Corner::TopLeft, base, center, delta).0,
            Size::new(90.0, 40.0)
        );
        assert_eq!(
            resize_from_handle(Corner::BottomRight, base, center, delta).0,
            Size::new(110.0, 60.0)
        );
        assert_eq!(
            resize_from_handle(Corner::BottomLeft, base, center, delta).0,
            Size::new(90.0, 60.0)
        );
    }

    #[test]
    fn sizes_never_collapse_below_one_pixel() {
        let (size, _) = resize_from_handle(
            Corner::BottomRight,
            Size::new(10.0, 10.0),
            Vec2::ZERO,
            Vec2::new(-50.0, -50.0),
        );
        assert_eq!(size, Size::new(1.0, 1.0));
    }

    #[test]
    fn only_select_drags_and_only_resize_shows_handles() {
        for tool in Tool::ACTIVE {
            let interactivity = interactivity_for(tool);
            assert!(interactivity.interactive);
            assert_eq!(interactivity.draggable, tool == Tool::Select);
            assert_eq!(interactivity.resize_handles, tool == Tool::Resize);
        }
        assert_eq!(dialog_for_release(Tool::Flip), None);
    }

    #[test]
    fn confirming_delete_removes_selection_and_closes_dialog() {
        let mut store = EntityStore::with_entities([Entity::new(
            EntityId::new("box"),
            EntityKind::Platform,
            "ground",
        )]);
        store.select_entity(&EntityId::new("box"));
        store.open_dialog(DialogState::ConfirmDelete);

        assert_eq!(confirm_dialog(&mut store), None);
        let snapshot = store.snapshot();
        assert!(snapshot.entities.is_empty());
        assert_eq!(snapshot.canvas.dialog, DialogState::Closed);
        assert_eq!(snapshot.deletion, TransitionStatus::Pending);
    }

    #[test]
    fn cancel_only_closes_the_dialog() {
        let mut store = EntityStore::with_entities([Entity::new(
            EntityId::new("box"),
            EntityKind::Platform,
            "ground",
        )]);
        store.select_entity(&EntityId::new("box"));
        store.open_dialog(DialogState::ConfirmDelete);

        assert!(cancel_dialog(&mut store));
        assert_eq!(store.snapshot().entities.len(), 1);
    }

    #[test]
    fn duplicating_the_player_yields_a_static_obstacle() {
        let mut store = EntityStore::with_entities([Entity::new(
            EntityId::player(),
            EntityKind::Player,
            "pinkman",
        )
        .with_position(100.0, 450.0)]);
        store.select_entity(&EntityId::player());
        store.open_dialog(DialogState::ConfirmDuplicate);

        let clone_id = confirm_dialog(&mut store).expect("clone");
        let snapshot = store.snapshot();
        let clone = snapshot.entity(&clone_id).expect("clone entity");
        assert_eq!(
            clone.kind,
            EntityKind::Obstacle {
                behavior: ObstacleBehavior::Static
            }
        );
        assert_eq!((clone.x, clone.y), (120.0, 470.0));
        assert!(!clone.loaded);
        assert_eq!(snapshot.canvas.selected.as_ref(), Some(&clone_id));
        assert_eq!(snapshot.entities.len(), 2);
        assert!(snapshot.player().is_some());
    }
}
