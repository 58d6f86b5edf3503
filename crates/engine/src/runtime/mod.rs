mod adapter;
mod arcade;
mod headless;
mod types;

pub use adapter::SceneRuntime;
pub use arcade::Body;
pub use headless::{
    HeadlessConfig, HeadlessRuntime, LoadMode, ObjectKind, RuntimeObject, TextureSource,
    DEFAULT_GRAVITY_Y,
    DEFAULT_TEXTURE_SIZE, DEFAULT_WORLD_SIZE,
};
pub use types::{
    AnimationSpec, AssetKind, AssetRequest, BodyKind, ContactEvent, ContactTag, Corner,
    GroupHandle, InteractionEvent, LoadEvent, LoadOutcome, LoadTicket, ObjectHandle, Overlay,
    Rect, Size, SoundHandle, SpriteSpec, Target, Vec2,
};
