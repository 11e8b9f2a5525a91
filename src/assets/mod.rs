//! Asset vocabulary
//!
//! This module knows which file extensions count as downloadable 3D/CAD
//! assets, which of them are containers, and how a link's anchor text or
//! extension maps to a file-type tag used in the directory layout.

mod file_type;

pub use file_type::{infer_file_type, FileType, TypeFilter};

/// Extensions (lowercase, with leading dot) accepted as downloadable assets
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".zip", ".rfa", ".rvt", ".skp", ".dwg", ".obj", ".fbx", ".glb", ".gltf", ".3ds", ".3dm", ".sif",
];

/// Extensions whose files are expanded by the archive expander
pub const CONTAINER_EXTENSIONS: &[&str] = &[".zip"];

/// Returns the lowercase extension of a file name or URL path, with its dot
///
/// ```
/// use asset_ripper::assets::extension_of;
///
/// assert_eq!(extension_of("Zeph_Stool.RFA"), ".rfa");
/// assert_eq!(extension_of("README"), "");
/// ```
pub fn extension_of(name: &str) -> String {
    let leaf = name.rsplit('/').next().unwrap_or(name);
    match leaf.rfind('.') {
        Some(idx) if idx + 1 < leaf.len() => leaf[idx..].to_lowercase(),
        _ => String::new(),
    }
}

/// Checks whether an extension is in the supported asset set
pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext)
}

/// Checks whether an extension marks a container that should be expanded
pub fn is_container_extension(ext: &str) -> bool {
    CONTAINER_EXTENSIONS.contains(&ext)
}

/// Replaces every run of characters outside `[A-Za-z0-9_.-]` with `_`
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}

/// Formats a byte count the way the vendor's search results do
pub fn format_size(size_bytes: u64) -> String {
    if size_bytes < 1024 {
        format!("{} B", size_bytes)
    } else if size_bytes < 1024 * 1024 {
        format!("{:.1} KB", size_bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", size_bytes as f64 / (1024.0 * 1024.0))
    }
}
