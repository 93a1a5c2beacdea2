//! Package naming
//!
//! Packages are long names rooted at a mount point, e.g. `/Game/Props/SM_Rock`.
//! The last segment is the short (asset) name.

use crate::{AssetError, AssetResult};

/// Mount point of project content
pub const CONTENT_ROOT: &str = "/Game";

/// Base short name of merged meshes
pub const DEFAULT_MESH_NAME: &str = "SM_BATCHED";

const MAX_DEFAULT_NAME_LEN: usize = 15;

/// Default package for a merge of the given actors.
///
/// Actor names are appended to `<root>/SM_BATCHED` until the name grows past
/// fifteen characters.
pub fn default_package_name<'a>(root: &str, actor_names: impl IntoIterator<Item = &'a str>) -> String {
    let mut package = format!("{}/{}", root.trim_end_matches('/'), DEFAULT_MESH_NAME);
    for actor in actor_names {
        package = format!("{package}_{actor}");
        if package.len() > MAX_DEFAULT_NAME_LEN {
            break;
        }
    }
    package
}

/// Everything before the short name, without the trailing slash
pub fn long_package_path(package: &str) -> &str {
    package.rfind('/').map_or("", |i| &package[..i])
}

/// Last path segment of a package
pub fn short_name(package: &str) -> &str {
    package.rfind('/').map_or(package, |i| &package[i + 1..])
}

/// Package of the GigaMesh built from the static mesh in `package`.
///
/// The first `SM_` in the short name becomes `GM_`; names without it get a
/// `GM_` prefix.
pub fn asset_package_name(package: &str) -> String {
    let path = long_package_path(package);
    let name = short_name(package);

    let asset_name = match name.find("SM_") {
        Some(prefix) => format!("{}G{}", &name[..prefix], &name[prefix + 1..]),
        None => format!("GM_{name}"),
    };
    format!("{path}/{asset_name}")
}

/// `/Game/Dir/Name.Name` to `/Game/Dir/Name`
pub fn object_path_to_package_name(object_path: &str) -> &str {
    let name_start = object_path.rfind('/').map_or(0, |i| i + 1);
    match object_path[name_start..].find('.') {
        Some(dot) => &object_path[..name_start + dot],
        None => object_path,
    }
}

/// Check that `package` is a rooted long package name
pub fn validate_package_name(package: &str) -> AssetResult<()> {
    let invalid = |reason: &str| AssetError::InvalidPackageName {
        package: package.to_string(),
        reason: reason.to_string(),
    };

    if !package.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }
    if short_name(package).is_empty() {
        return Err(invalid("missing asset name"));
    }
    if package.split('/').skip(1).any(|segment| segment.is_empty() || segment == "..") {
        return Err(invalid("empty or relative path segment"));
    }
    if let Some(c) = package
        .chars()
        .find(|c| !(c.is_alphanumeric() || matches!(c, '/' | '_' | '-')))
    {
        return Err(invalid(&format!("invalid character '{c}'")));
    }
    Ok(())
}
