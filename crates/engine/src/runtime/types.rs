#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in canvas pixels, y growing downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Rect {
    pub fn from_center(center: Vec2, size: Size) -> Self {
        let half_w = size.width.abs() * 0.5;
        let half_h = size.height.abs() * 0.5;
        Self {
            min_x: center.x - half_w,
            min_y: center.y - half_h,
            max_x: center.x + half_w,
            max_y: center.y + half_h,
        }
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    pub fn corner(&self, corner: Corner) -> Vec2 {
        match corner {
            Corner::TopLeft => Vec2::new(self.min_x, self.min_y),
            Corner::TopRight => Vec2::new(self.max_x, self.min_y),
            Corner::BottomRight => Vec2::new(self.max_x, self.max_y),
            Corner::BottomLeft => Vec2::new(self.min_x, self.max_y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomRight => Corner::TopLeft,
            Corner::BottomLeft => Corner::TopRight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SoundHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyKind {
    None,
    Dynamic,
    Static,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteSpec {
    pub position: Vec2,
    pub texture: String,
    pub body: BodyKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssetKind {
    Image,
    Spritesheet { frame: Size },
    Audio,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetRequest {
    pub key: String,
    pub url: String,
    pub kind: AssetKind,
    /// Used by runtimes that cannot read the real image dimensions.
    pub size_hint: Option<Size>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadEvent {
    pub ticket: LoadTicket,
    pub key: String,
    pub outcome: LoadOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Object(ObjectHandle),
    Group(GroupHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContactTag(pub u16);

/// `first` always belongs to the rule's first target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContactEvent {
    pub tag: ContactTag,
    pub first: ObjectHandle,
    pub second: ObjectHandle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionEvent {
    PointerDown {
        target: ObjectHandle,
        position: Vec2,
    },
    DragStart {
        target: ObjectHandle,
        position: Vec2,
    },
    Drag {
        target: ObjectHandle,
        position: Vec2,
    },
    DragEnd {
        target: ObjectHandle,
        position: Vec2,
    },
    PointerUp {
        target: ObjectHandle,
        position: Vec2,
    },
    OverlayAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSpec {
    pub key: String,
    pub texture: String,
    pub first_frame: u32,
    pub last_frame: u32,
    pub frame_rate: u32,
    pub repeat: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub message: String,
    pub action_label: String,
}
