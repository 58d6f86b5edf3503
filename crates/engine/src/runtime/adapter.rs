use super::types::{
    AnimationSpec, AssetRequest, BodyKind, ContactEvent, ContactTag, GroupHandle,
    InteractionEvent, LoadEvent, LoadTicket, ObjectHandle, Overlay, Rect, Size, SoundHandle,
    SpriteSpec, Target, Vec2,
};

/// Capability surface the mode scenes drive. Implementations own every live
/// object; scenes only ever hold handles.
///
/// Asset loading is asynchronous: `load_asset` returns immediately and the
/// outcome arrives later through `poll_loads`. Physics contacts and pointer
/// interactions are likewise queued and drained by the caller.
pub trait SceneRuntime {
    fn asset_exists(&self, key: &str) -> bool;
    /// Requests for a key that is already in flight return the same ticket.
    fn load_asset(&mut self, request: AssetRequest) -> LoadTicket;
    fn poll_loads(&mut self) -> Vec<LoadEvent>;

    fn create_sprite(&mut self, spec: SpriteSpec) -> ObjectHandle;
    fn create_marker(&mut self, position: Vec2, radius: f32) -> ObjectHandle;
    fn create_light(&mut self, position: Vec2, radius: f32) -> ObjectHandle;
    /// Also detaches the object from groups and contact rules.
    fn destroy(&mut self, handle: ObjectHandle);
    fn exists(&self, handle: ObjectHandle) -> bool;

    fn texture_key(&self, handle: ObjectHandle) -> Option<String>;
    fn set_texture(&mut self, handle: ObjectHandle, key: &str);
    fn position(&self, handle: ObjectHandle) -> Option<Vec2>;
    fn set_position(&mut self, handle: ObjectHandle, position: Vec2);
    fn set_scale(&mut self, handle: ObjectHandle, scale_x: f32, scale_y: f32);
    fn set_flip_x(&mut self, handle: ObjectHandle, flip_x: bool);
    fn set_rotation(&mut self, handle: ObjectHandle, degrees: f32);
    fn set_depth(&mut self, handle: ObjectHandle, depth: i32);
    fn display_size(&self, handle: ObjectHandle) -> Option<Size>;
    /// Unscaled size of the object's texture.
    fn source_size(&self, handle: ObjectHandle) -> Option<Size>;
    /// Rescales the object so it renders at `size`.
    fn set_display_size(&mut self, handle: ObjectHandle, size: Size);
    /// Body size in unscaled texture pixels.
    fn set_body_size(&mut self, handle: ObjectHandle, size: Size);
    fn bounds(&self, handle: ObjectHandle) -> Option<Rect>;
    fn set_visible(&mut self, handle: ObjectHandle, visible: bool);

    fn set_velocity(&mut self, handle: ObjectHandle, velocity: Vec2);
    fn set_velocity_x(&mut self, handle: ObjectHandle, vx: f32);
    fn set_velocity_y(&mut self, handle: ObjectHandle, vy: f32);
    fn velocity(&self, handle: ObjectHandle) -> Option<Vec2>;
    fn set_bounce(&mut self, handle: ObjectHandle, bounce: f32);
    fn set_gravity_enabled(&mut self, handle: ObjectHandle, enabled: bool);
    fn set_immovable(&mut self, handle: ObjectHandle, immovable: bool);
    fn set_collide_world_bounds(&mut self, handle: ObjectHandle, collide: bool);
    /// Endless back-and-forth vertical tween between the current y and `target_y`.
    fn add_yoyo_tween(&mut self, handle: ObjectHandle, target_y: f32, duration_ms: u32);
    /// Disabling hides the object and removes its body from the simulation.
    fn set_body_enabled(&mut self, handle: ObjectHandle, enabled: bool);
    fn body_enabled(&self, handle: ObjectHandle) -> bool;
    fn touching_down(&self, handle: ObjectHandle) -> bool;

    fn pause_physics(&mut self);
    fn resume_physics(&mut self);
    fn physics_paused(&self) -> bool;
    fn step(&mut self, dt_seconds: f32);

    fn create_group(&mut self, kind: BodyKind) -> GroupHandle;
    fn destroy_group(&mut self, group: GroupHandle);
    fn group_add(&mut self, group: GroupHandle, handle: ObjectHandle);
    fn group_remove(&mut self, group: GroupHandle, handle: ObjectHandle);
    fn refresh_group(&mut self, group: GroupHandle);
    fn group_members(&self, group: GroupHandle) -> Vec<ObjectHandle>;

    /// Solid contact; `tag` makes the contact observable through `poll_contacts`.
    fn add_collider(&mut self, first: Target, second: Target, tag: Option<ContactTag>);
    /// Non-solid contact, always reported.
    fn add_overlap(&mut self, first: Target, second: Target, tag: ContactTag);
    fn clear_contact_rules(&mut self);
    fn poll_contacts(&mut self) -> Vec<ContactEvent>;

    fn set_interactive(&mut self, handle: ObjectHandle, interactive: bool);
    fn set_draggable(&mut self, handle: ObjectHandle, draggable: bool);
    fn poll_interactions(&mut self) -> Vec<InteractionEvent>;

    fn set_tint(&mut self, handle: ObjectHandle, tint: Option<u32>);
    fn animation_exists(&self, key: &str) -> bool;
    fn create_animation(&mut self, spec: AnimationSpec);
    fn play_animation(&mut self, handle: ObjectHandle, key: &str);
    fn set_outline(&mut self, handle: Option<ObjectHandle>);
    fn set_hud_text(&mut self, text: Option<&str>);
    fn show_overlay(&mut self, overlay: Overlay);
    fn clear_overlay(&mut self);
    fn play_sound(&mut self, key: &str, looped: bool) -> SoundHandle;
    fn stop_sound(&mut self, sound: SoundHandle);

    fn world_size(&self) -> Size;
}
