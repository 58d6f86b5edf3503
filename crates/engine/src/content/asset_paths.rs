use std::path::{Component, Path, PathBuf};

pub fn is_remote_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:")
}

/// Strips relative prefixes so catalog urls such as `../assets/sprites/dude.png`
/// resolve against the project root.
pub fn normalize_asset_url(url: &str) -> String {
    let mut rest = url.trim().replace('\\', "/");
    loop {
        if let Some(stripped) = rest.strip_prefix("../") {
            rest = stripped.to_string();
        } else if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped.to_string();
        } else if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped.to_string();
        } else {
            break;
        }
    }
    rest
}

/// Resolves a local asset url under `root`. Urls that would climb out of the
/// root after normalization resolve to nothing.
pub fn local_asset_path(root: &Path, url: &str) -> Option<PathBuf> {
    if url.trim().is_empty() || is_remote_url(url) {
        return None;
    }
    let relative = PathBuf::from(normalize_asset_url(url));
    let escapes = relative.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return None;
    }
    Some(root.join(relative))
}

/// Last path segment of an asset url.
pub fn asset_file_name(url: &str) -> Option<&str> {
    url.rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
}

/// Parent folder of the file, e.g. `sprites` for `../assets/sprites/dude.png`.
pub fn asset_folder_name(url: &str) -> Option<&str> {
    let mut segments = url.rsplit(['/', '\\']).filter(|segment| !segment.is_empty());
    segments.next()?;
    segments.next().filter(|segment| *segment != ".." && *segment != ".")
}
