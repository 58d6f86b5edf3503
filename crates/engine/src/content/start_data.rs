use crate::store::{Entity, EntityId, EntityKind};

use super::catalog::{AssetCatalog, CatalogCategory};

pub const PLAYER_START: (f32, f32) = (100.0, 450.0);
const GROUND_START: (f32, f32) = (400.0, 568.0);

/// The "New Game" entity set: the pinkman player standing on a ground platform.
pub fn start_entities(catalog: &AssetCatalog) -> Vec<Entity> {
    let mut player = match catalog.find_by_title(CatalogCategory::Sprites, "pinkman") {
        Some(entry) => catalog
            .place(CatalogCategory::Sprites, &entry.key, PLAYER_START.0, PLAYER_START.1)
            .ok(),
        None => None,
    }
    .unwrap_or_else(|| {
        Entity::new(EntityId::player(), EntityKind::Player, "pinkman")
            .with_position(PLAYER_START.0, PLAYER_START.1)
            .with_sprite("assets/sprites/pinkman.png")
            .with_frame_size(32.0, 32.0)
    });
    player.z = 1.0;
    player.physics = "arcade".to_string();

    let mut entities = vec![player];
    if let Some(entry) = catalog.find_by_title(CatalogCategory::Platforms, "ground") {
        if let Ok(ground) =
            catalog.place(CatalogCategory::Platforms, &entry.key, GROUND_START.0, GROUND_START.1)
        {
            entities.push(ground);
        }
    }
    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_data_has_player_on_ground() {
        let entities = start_entities(&AssetCatalog::builtin());
        assert_eq!(entities.len(), 2);

        let player = &entities[0];
        assert!(player.id.is_player());
        assert_eq!((player.x, player.y), PLAYER_START);
        assert_eq!((player.width, player.height), (32.0, 32.0));
        assert_eq!(player.title, "pinkman");
        assert!(!player.loaded);

        assert_eq!(entities[1].kind, EntityKind::Platform);
        assert!(!entities[1].id.is_player());
    }

    #[test]
    fn empty_catalog_still_yields_a_player() {
        let entities = start_entities(&AssetCatalog::empty());
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].sprite_url, "assets/sprites/pinkman.png");
    }
}
