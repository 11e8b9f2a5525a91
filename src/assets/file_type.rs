//! File-type tags used in the storage layout and the allowed-type filter
//!
//! The tag is inferred from the link's anchor text first, since vendor
//! links are labelled with the format family ("Revit", "SketchUp",
//! "AutoCAD 3D"), and falls back to the file extension.
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A normalized file-type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileType {
    Revit,
    Sketchup,
    Autocad,
    Autocad2d,
    Autocad3d,
    Sif,
    Obj,
    Fbx,
    Glb,
    Gltf,
    ThreeDs,
    ThreeDm,
    Other,
}

impl FileType {
    /// Returns the directory/manifest string for this tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revit => "revit",
            Self::Sketchup => "sketchup",
            Self::Autocad => "autocad",
            Self::Autocad2d => "autocad_2d",
            Self::Autocad3d => "autocad_3d",
            Self::Sif => "sif",
            Self::Obj => "obj",
            Self::Fbx => "fbx",
            Self::Glb => "glb",
            Self::Gltf => "gltf",
            Self::ThreeDs => "3ds",
            Self::ThreeDm => "3dm",
            Self::Other => "other",
        }
    }

    /// Returns all tags
    pub fn all() -> Vec<Self> {
        vec![
            Self::Revit,
            Self::Sketchup,
            Self::Autocad,
            Self::Autocad2d,
            Self::Autocad3d,
            Self::Sif,
            Self::Obj,
            Self::Fbx,
            Self::Glb,
            Self::Gltf,
            Self::ThreeDs,
            Self::ThreeDm,
            Self::Other,
        ]
    }

    /// Maps an extension (lowercase, with dot) to a tag
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            ".rfa" | ".rvt" | ".zip" => Self::Revit,
            ".skp" => Self::Sketchup,
            ".dwg" => Self::Autocad,
            ".sif" => Self::Sif,
            ".obj" => Self::Obj,
            ".fbx" => Self::Fbx,
            ".glb" => Self::Glb,
            ".gltf" => Self::Gltf,
            ".3ds" => Self::ThreeDs,
            ".3dm" => Self::ThreeDm,
            _ => Self::Other,
        }
    }

    /// Maps anchor text to a tag when it names a format family
    pub fn from_anchor_text(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if lower.contains("revit") {
            return Some(Self::Revit);
        }
        if lower.contains("sketchup") {
            return Some(Self::Sketchup);
        }
        if lower.contains("autocad") {
            let words: Vec<&str> = lower
                .split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|w| !w.is_empty())
                .collect();
            if words.contains(&"3d") {
                return Some(Self::Autocad3d);
            }
            if words.contains(&"2d") {
                return Some(Self::Autocad2d);
            }
        }
        let has_sif_word = lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|w| w == "sif");
        if has_sif_word {
            return Some(Self::Sif);
        }
        None
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::all()
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown file type '{}'", s))
    }
}

/// Infers the file-type tag for a link
///
/// Anchor text wins when it names a format family; otherwise the extension
/// of the file name decides.
pub fn infer_file_type(anchor_text: &str, ext: &str) -> FileType {
    FileType::from_anchor_text(anchor_text).unwrap_or_else(|| FileType::from_extension(ext))
}

/// Allowed-type filter applied to every download candidate
#[derive(Debug, Clone)]
pub struct TypeFilter {
    allowed: HashSet<FileType>,
    exclude_2d: bool,
}

impl TypeFilter {
    pub fn new(allowed: impl IntoIterator<Item = FileType>, exclude_2d: bool) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
            exclude_2d,
        }
    }

    /// Returns true if a file of this type should be downloaded
    pub fn allows(&self, file_type: FileType) -> bool {
        if self.exclude_2d && file_type == FileType::Autocad2d {
            return false;
        }
        self.allowed.contains(&file_type)
    }
}
