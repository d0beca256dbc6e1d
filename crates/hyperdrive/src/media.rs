//! Filename policy shared by the reconciler and the pruner.
//!
//! Everything here is pure string logic: no I/O, no allocation beyond the
//! returned names.

/// Extensions browsers can display directly. Compared case-insensitively.
pub const SUPPORTED_TYPES: &[&str] = &[
    "apng", "avif", "gif", "jpg", "jpeg", "jfif", "pjpeg", "pjp", "png", "svg", "webp",
];

/// A conversion the reconciler knows how to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// `.heic` / `.HEIC` still image to `.jpeg`.
    HeicToJpeg,
    /// `.mov` / `.MOV` video to `.gif`.
    MovToGif,
}

impl Conversion {
    /// Extension of the converted artifact, without the dot.
    pub fn target_extension(self) -> &'static str {
        match self {
            Self::HeicToJpeg => "jpeg",
            Self::MovToGif => "gif",
        }
    }
}

/// Text after the last `.`, or `""` when there is none.
pub fn extension(name: &str) -> &str {
    name.rsplit_once('.').map_or("", |(_, ext)| ext)
}

/// Text before the last `.`, or the whole name when there is none.
pub fn stem(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

/// The conversion that applies to `name`, if any.
///
/// Only the exact spellings `heic`, `HEIC`, `mov` and `MOV` qualify.
pub fn conversion_for(name: &str) -> Option<Conversion> {
    match extension(name) {
        "heic" | "HEIC" => Some(Conversion::HeicToJpeg),
        "mov" | "MOV" => Some(Conversion::MovToGif),
        _ => None,
    }
}

/// Filename the converted form of `name` would bear.
///
/// `IMG_1.HEIC` becomes `IMG_1.jpeg`, `clip.mov` becomes `clip.gif`, anything
/// else maps to itself.
pub fn derived_name(name: &str) -> String {
    match conversion_for(name) {
        Some(conversion) => format!("{}.{}", stem(name), conversion.target_extension()),
        None => name.to_owned(),
    }
}

/// True if `name` names a file directly inside the cache directory.
///
/// Remote names may contain separators or be `.`/`..`; those are never
/// written to disk.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// True if `ext` (without the dot) is servable.
pub fn is_supported(ext: &str) -> bool {
    SUPPORTED_TYPES
        .iter()
        .any(|supported| supported.eq_ignore_ascii_case(ext))
}

/// True if the extension of `name` is servable.
pub fn is_supported_name(name: &str) -> bool {
    is_supported(extension(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_and_stem_split_on_last_dot() {
        assert_eq!(extension("a.b.png"), "png");
        assert_eq!(stem("a.b.png"), "a.b");
    }

    #[test]
    fn name_without_dot_has_empty_extension() {
        assert_eq!(extension("README"), "");
        assert_eq!(stem("README"), "README");
    }

    #[test]
    fn leading_dot_name() {
        assert_eq!(extension(".hidden"), "hidden");
        assert_eq!(stem(".hidden"), "");
    }

    #[test]
    fn heic_derives_jpeg() {
        assert_eq!(derived_name("b.heic"), "b.jpeg");
        assert_eq!(derived_name("IMG_0001.HEIC"), "IMG_0001.jpeg");
    }

    #[test]
    fn mov_derives_gif() {
        assert_eq!(derived_name("clip.mov"), "clip.gif");
        assert_eq!(derived_name("CLIP.MOV"), "CLIP.gif");
    }

    #[test]
    fn mixed_case_source_is_not_convertible() {
        assert_eq!(conversion_for("x.Heic"), None);
        assert_eq!(derived_name("x.Mov"), "x.Mov");
    }

    #[test]
    fn other_names_derive_to_themselves() {
        for name in ["a.png", "b.jpeg", "notes.txt", "noext", ".hidden"] {
            assert_eq!(derived_name(name), name);
        }
    }

    #[test]
    fn derived_name_is_idempotent_on_non_convertible_names() {
        // Derived names are never convertible themselves, so this holds for
        // convertible inputs too.
        for name in ["a.png", "b.jpeg", "c.gif", "d.txt", "e", "f.heic", "g.MOV"] {
            let once = derived_name(name);
            assert_eq!(derived_name(&once), once);
        }
    }

    #[test]
    fn plain_file_names() {
        assert!(is_plain_file_name("a.png"));
        assert!(is_plain_file_name(".hidden.png"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name("../escape.png"));
        assert!(!is_plain_file_name("nested/a.png"));
        assert!(!is_plain_file_name("win\\a.png"));
    }

    #[test]
    fn supported_types_are_case_insensitive() {
        assert!(is_supported("png"));
        assert!(is_supported("PNG"));
        assert!(is_supported("JpEg"));
        assert!(is_supported_name("photo.WEBP"));
    }

    #[test]
    fn unsupported_types_are_rejected() {
        assert!(!is_supported("heic"));
        assert!(!is_supported("mov"));
        assert!(!is_supported(""));
        assert!(!is_supported_name("notes.txt"));
        assert!(!is_supported_name("png"));
        assert!(!is_supported_name(".photo.png.part"));
    }

    #[test]
    fn every_supported_type_is_listed() {
        let expected = [
            "apng", "avif", "gif", "jpg", "jpeg", "jfif", "pjpeg", "pjp", "png", "svg", "webp",
        ];
        for ext in expected {
            assert!(is_supported(ext), "{ext} should be supported");
        }
        assert_eq!(SUPPORTED_TYPES.len(), expected.len());
    }
}
