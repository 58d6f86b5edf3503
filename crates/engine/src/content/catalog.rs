use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use thiserror::Error;

use crate::store::{Entity, EntityId, EntityKind, ObstacleBehavior};

pub const SPOTLIGHT_EFFECT: &str = "spotlight";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CatalogCategory {
    Backgrounds,
    Sprites,
    Items,
    Obstacles,
    Platforms,
    Effects,
    Audio,
}

impl CatalogCategory {
    pub const ALL: [CatalogCategory; 7] = [
        CatalogCategory::Backgrounds,
        CatalogCategory::Sprites,
        CatalogCategory::Items,
        CatalogCategory::Obstacles,
        CatalogCategory::Platforms,
        CatalogCategory::Effects,
        CatalogCategory::Audio,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CatalogCategory::Backgrounds => "backgrounds",
            CatalogCategory::Sprites => "sprites",
            CatalogCategory::Items => "items",
            CatalogCategory::Obstacles => "obstacles",
            CatalogCategory::Platforms => "platforms",
            CatalogCategory::Effects => "effects",
            CatalogCategory::Audio => "audio",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for CatalogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spritesheet frame ranges for the three player animations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteFrames {
    pub left: (u32, u32),
    pub turn: u32,
    pub right: (u32, u32),
}

impl Default for SpriteFrames {
    fn default() -> Self {
        Self {
            left: (0, 3),
            turn: 4,
            right: (5, 8),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub key: String,
    pub img: String,
    pub title: String,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub physics: Option<String>,
    pub file: Option<String>,
    pub frames: Option<SpriteFrames>,
}

impl CatalogEntry {
    pub fn new(key: &str, img: &str, title: &str) -> Self {
        Self {
            key: key.to_string(),
            img: img.to_string(),
            title: title.to_string(),
            width: None,
            height: None,
            physics: None,
            file: None,
            frames: None,
        }
    }

    fn sized(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    fn with_physics(mut self, physics: ObstacleBehavior) -> Self {
        self.physics = Some(physics.as_tag().to_string());
        self
    }

    fn with_file(mut self, file: &str) -> Self {
        self.file = Some(file.to_string());
        self
    }

    fn with_frames(mut self, frames: SpriteFrames) -> Self {
        self.frames = Some(frames);
        self
    }

    /// Url the runtime should load: audio entries point at `file`, everything else at `img`.
    pub fn asset_url(&self) -> &str {
        self.file.as_deref().unwrap_or(&self.img)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line={}, column={}", self.line, self.column)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed XML in {path} ({location}): {message}")]
    XmlMalformed {
        path: PathBuf,
        location: SourceLocation,
        message: String,
    },
    #[error("{message} ({path}, {location})")]
    Invalid {
        path: PathBuf,
        location: SourceLocation,
        message: String,
    },
    #[error("unknown catalog entry {category}/{key}")]
    UnknownEntry {
        category: CatalogCategory,
        key: String,
    },
    #[error("catalog category {0} does not place entities")]
    NotPlaceable(CatalogCategory),
}

/// Category → key → entry mapping consumed by the scenes, placement and export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetCatalog {
    categories: BTreeMap<CatalogCategory, BTreeMap<String, CatalogEntry>>,
}

impl AssetCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        let backgrounds = [
            ("bg1", "bluesky", "blue sky"),
            ("bg2", "cavern", "cavern"),
            ("bg3", "forest", "forest"),
            ("bg4", "magicalcave", "magical cave"),
            ("bg5", "shipwreck", "shipwreck"),
            ("bg6", "starryforest", "starry forest"),
            ("bg7", "starrysky", "starry sky"),
            ("bg8", "sunsetocean", "sunset ocean"),
            ("bg9", "treasurecave", "treasure cave"),
            ("bg10", "undersea", "undersea"),
            ("bg11", "water", "water"),
        ];
        for (key, file, title) in backgrounds {
            catalog.insert(
                CatalogCategory::Backgrounds,
                CatalogEntry::new(key, &format!("assets/backgrounds/{file}.png"), title)
                    .sized(800.0, 600.0),
            );
        }

        catalog.insert(
            CatalogCategory::Sprites,
            CatalogEntry::new("s1", "assets/sprites/dude.png", "dude")
                .sized(32.0, 48.0)
                .with_frames(SpriteFrames::default()),
        );
        catalog.insert(
            CatalogCategory::Sprites,
            CatalogEntry::new("s2", "assets/sprites/pinkman.png", "pinkman")
                .sized(32.0, 32.0)
                .with_frames(SpriteFrames::default()),
        );

        catalog.insert(
            CatalogCategory::Platforms,
            CatalogEntry::new("p1", "assets/platforms/platform.png", "ground").sized(400.0, 32.0),
        );
        catalog.insert(
            CatalogCategory::Platforms,
            CatalogEntry::new("p2", "assets/platforms/ledge.png", "ledge").sized(128.0, 24.0),
        );

        catalog.insert(
            CatalogCategory::Items,
            CatalogEntry::new("i1", "assets/items/star.png", "star").sized(24.0, 22.0),
        );
        catalog.insert(
            CatalogCategory::Items,
            CatalogEntry::new("i2", "assets/items/gem.png", "gem").sized(20.0, 20.0),
        );

        catalog.insert(
            CatalogCategory::Obstacles,
            CatalogEntry::new("o1", "assets/obstacles/bomb.png", "bomb")
                .sized(14.0, 14.0)
                .with_physics(ObstacleBehavior::Bounce),
        );
        catalog.insert(
            CatalogCategory::Obstacles,
            CatalogEntry::new("o2", "assets/obstacles/cloud.png", "cloud")
                .sized(64.0, 32.0)
                .with_physics(ObstacleBehavior::Float),
        );
        catalog.insert(
            CatalogCategory::Obstacles,
            CatalogEntry::new("o3", "assets/obstacles/spikes.png", "spikes")
                .sized(32.0, 16.0)
                .with_physics(ObstacleBehavior::Static),
        );

        catalog.insert(
            CatalogCategory::Effects,
            CatalogEntry::new(SPOTLIGHT_EFFECT, "", "spotlight"),
        );

        catalog.insert(
            CatalogCategory::Audio,
            CatalogEntry::new("a1", "", "adventure").with_file("assets/audio/adventure.mp3"),
        );
        catalog.insert(
            CatalogCategory::Audio,
            CatalogEntry::new("a2", "", "caves").with_file("assets/audio/caves.mp3"),
        );
        catalog
    }

    /// Inserts or replaces an entry; later catalogs override earlier ones key by key.
    pub fn insert(&mut self, category: CatalogCategory, entry: CatalogEntry) {
        self.categories
            .entry(category)
            .or_default()
            .insert(entry.key.clone(), entry);
    }

    pub fn merge(&mut self, other: AssetCatalog) {
        for (category, entries) in other.categories {
            self.categories.entry(category).or_default().extend(entries);
        }
    }

    pub fn get(&self, category: CatalogCategory, key: &str) -> Option<&CatalogEntry> {
        self.categories.get(&category)?.get(key)
    }

    pub fn contains(&self, category: CatalogCategory, key: &str) -> bool {
        self.get(category, key).is_some()
    }

    pub fn entries(&self, category: CatalogCategory) -> impl Iterator<Item = &CatalogEntry> {
        self.categories
            .get(&category)
            .into_iter()
            .flat_map(|entries| entries.values())
    }

    pub fn keys(&self, category: CatalogCategory) -> Vec<String> {
        self.entries(category).map(|entry| entry.key.clone()).collect()
    }

    pub fn find_by_title(&self, category: CatalogCategory, title: &str) -> Option<&CatalogEntry> {
        self.entries(category).find(|entry| entry.title == title)
    }

    /// Frame ranges for a player title; titles without catalog frames use the default layout.
    pub fn sprite_frames(&self, title: &str) -> SpriteFrames {
        self.find_by_title(CatalogCategory::Sprites, title)
            .and_then(|entry| entry.frames)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn load_xml_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_xml_str(path, &raw)
    }

    /// Parses a `<Catalog>` document:
    ///
    /// ```xml
    /// <Catalog>
    ///   <Entry category="obstacles" key="o9">
    ///     <img>assets/obstacles/saw.png</img>
    ///     <title>saw</title>
    ///     <width>32</width>
    ///     <height>32</height>
    ///     <physics>BOUNCE</physics>
    ///   </Entry>
    /// </Catalog>
    /// ```
    pub fn from_xml_str(path: &Path, raw: &str) -> Result<Self, CatalogError> {
        let doc = Document::parse(raw).map_err(|error| CatalogError::XmlMalformed {
            path: path.to_path_buf(),
            location: SourceLocation {
                line: error.pos().row as usize,
                column: error.pos().col as usize,
            },
            message: error.to_string(),
        })?;
        let parser = XmlParser { path, doc: &doc };

        let root = doc.root_element();
        if root.tag_name().name() != "Catalog" {
            return Err(parser.invalid(root, "root element must be <Catalog>".to_string()));
        }

        let mut catalog = Self::empty();
        for node in root.children().filter(|node| node.is_element()) {
            if node.tag_name().name() != "Entry" {
                return Err(parser.invalid(
                    node,
                    format!("unsupported element <{}>; expected <Entry>", node.tag_name().name()),
                ));
            }
            let (category, entry) = parser.parse_entry(node)?;
            catalog.insert(category, entry);
        }
        Ok(catalog)
    }

    /// Builds a new entity from a placeable catalog entry. Sprites always yield
    /// the singleton player record.
    pub fn place(
        &self,
        category: CatalogCategory,
        key: &str,
        x: f32,
        y: f32,
    ) -> Result<Entity, CatalogError> {
        let entry = self
            .get(category, key)
            .ok_or_else(|| CatalogError::UnknownEntry {
                category,
                key: key.to_string(),
            })?;
        let (id, kind) = match category {
            CatalogCategory::Sprites => (EntityId::player(), EntityKind::Player),
            CatalogCategory::Platforms => (EntityId::generate(), EntityKind::Platform),
            CatalogCategory::Items => (EntityId::generate(), EntityKind::Item),
            CatalogCategory::Obstacles => {
                let behavior = entry
                    .physics
                    .as_deref()
                    .and_then(ObstacleBehavior::from_tag)
                    .unwrap_or(ObstacleBehavior::Static);
                (EntityId::generate(), EntityKind::Obstacle { behavior })
            }
            other => return Err(CatalogError::NotPlaceable(other)),
        };

        let width = entry.width.unwrap_or(32.0);
        let height = entry.height.unwrap_or(32.0);
        let mut entity = Entity::new(id, kind, entry.title.clone())
            .with_position(x, y)
            .with_size(width, height)
            .with_sprite(entry.img.clone());
        if category == CatalogCategory::Sprites {
            entity = entity.with_frame_size(width, height);
            entity.z = 1.0;
        }
        Ok(entity)
    }
}

struct XmlParser<'a, 'input> {
    path: &'a Path,
    doc: &'a Document<'input>,
}

impl XmlParser<'_, '_> {
    fn parse_entry(&self, node: Node<'_, '_>) -> Result<(CatalogCategory, CatalogEntry), CatalogError> {
        let raw_category = node
            .attribute("category")
            .ok_or_else(|| self.invalid(node, "<Entry> is missing the category attribute".to_string()))?;
        let category = CatalogCategory::parse(raw_category).ok_or_else(|| {
            self.invalid(node, format!("unknown catalog category '{raw_category}'"))
        })?;
        let key = node
            .attribute("key")
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| self.invalid(node, "<Entry> is missing the key attribute".to_string()))?;

        let mut entry = CatalogEntry::new(key, "", "");
        let mut frames = SpriteFrames::default();
        let mut has_frames = false;
        for field in node.children().filter(|child| child.is_element()) {
            let name = field.tag_name().name();
            match name {
                "img" => entry.img = self.text(field),
                "title" => entry.title = self.text(field),
                "width" => entry.width = Some(self.dimension(field)?),
                "height" => entry.height = Some(self.dimension(field)?),
                "file" => entry.file = Some(self.text(field)),
                "physics" => {
                    let value = self.text(field);
                    if ObstacleBehavior::from_tag(&value).is_none() && category == CatalogCategory::Obstacles {
                        return Err(self.invalid(
                            field,
                            format!("invalid physics '{value}'; allowed values: BOUNCE, FLOAT, STATIC"),
                        ));
                    }
                    entry.physics = Some(value);
                }
                "leftFrames" => {
                    frames.left = self.frame_range(field)?;
                    has_frames = true;
                }
                "turnFrame" => {
                    frames.turn = self.frame_index(field, &self.text(field))?;
                    has_frames = true;
                }
                "rightFrames" => {
                    frames.right = self.frame_range(field)?;
                    has_frames = true;
                }
                _ => {
                    return Err(self.invalid(field, format!("unknown field <{name}> in <Entry>")));
                }
            }
        }

        if entry.title.is_empty() {
            entry.title = key.to_string();
        }
        if has_frames || category == CatalogCategory::Sprites {
            entry.frames = Some(frames);
        }
        Ok((category, entry))
    }

    fn text(&self, node: Node<'_, '_>) -> String {
        node.text().map(str::trim).unwrap_or_default().to_string()
    }

    fn dimension(&self, node: Node<'_, '_>) -> Result<f32, CatalogError> {
        let value = self.text(node);
        match value.parse::<f32>() {
            Ok(parsed) if parsed.is_finite() && parsed > 0.0 => Ok(parsed),
            _ => Err(self.invalid(
                node,
                format!("<{}> '{value}' must be a positive number", node.tag_name().name()),
            )),
        }
    }

    fn frame_index(&self, node: Node<'_, '_>, raw: &str) -> Result<u32, CatalogError> {
        raw.trim()
            .parse::<u32>()
            .map_err(|_| self.invalid(node, format!("frame '{raw}' is not a valid index")))
    }

    /// Accepts `first-last` or a single index.
    fn frame_range(&self, node: Node<'_, '_>) -> Result<(u32, u32), CatalogError> {
        let value = self.text(node);
        let (first, last) = match value.split_once('-') {
            Some((first, last)) => (
                self.frame_index(node, first)?,
                self.frame_index(node, last)?,
            ),
            None => {
                let only = self.frame_index(node, &value)?;
                (only, only)
            }
        };
        if last < first {
            return Err(self.invalid(node, format!("frame range '{value}' is reversed")));
        }
        Ok((first, last))
    }

    fn invalid(&self, node: Node<'_, '_>, message: String) -> CatalogError {
        let pos = self.doc.text_pos_at(node.range().start);
        CatalogError::Invalid {
            path: self.path.to_path_buf(),
            location: SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            },
            message,
        }
    }
}
