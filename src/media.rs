use std::path::Path;

use crate::store::{join, ContentStore};

/// Recognized visual extensions, in the order they are advertised.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg"];

/// Recognized auditory extensions. Order is the matching priority.
pub const AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".wav", ".ogg", ".m4a", ".aac"];

/// Image name that is reserved for a category cover and never listed as content.
pub const COVER_FILE: &str = "cover.jpg";

/// Find the audio clip that pairs with `base_name` inside `audio_dir`.
///
/// Candidates are probed in `extensions` order and the first one that exists
/// wins; later variants are never considered once a match is found. A missing
/// file is the normal "no match" outcome, so this never fails.
///
/// Returns the matching file name (e.g. `cat.mp3`), not the full path.
pub async fn find_matching_audio<E>(
    store: &dyn ContentStore,
    audio_dir: &str,
    base_name: &str,
    extensions: &[E],
) -> Option<String>
where
    E: AsRef<str>,
{
    for extension in extensions {
        let candidate = format!("{}{}", base_name, extension.as_ref());
        if store.probe(&join(&[audio_dir, &candidate])).await {
            return Some(candidate);
        }
    }

    None
}

/// File name without its final extension (`cat.png` -> `cat`).
pub fn base_name(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.to_string())
}

/// Lowercased extension including the dot (`Cat.PNG` -> `.png`).
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

/// Whether `filename` should be listed as a content image.
pub fn is_content_image<E: AsRef<str>>(filename: &str, extensions: &[E], cover_file: &str) -> bool {
    if filename == cover_file {
        return false;
    }

    match extension_of(filename) {
        Some(ext) => extensions.iter().any(|allowed| allowed.as_ref().eq_ignore_ascii_case(&ext)),
        None => false,
    }
}

/// Human-readable label for a base name.
///
/// `-` and `_` become spaces and the first letter of every word is
/// capitalized, so `body-parts` reads `Body Parts`. The builder and the
/// resolver share this function so labels never drift between them.
pub fn display_name(base_name: &str) -> String {
    let mut label = String::with_capacity(base_name.len());
    let mut previous_is_word = false;

    for ch in base_name.chars() {
        let ch = if ch == '-' || ch == '_' { ' ' } else { ch };
        let is_word = ch.is_ascii_alphanumeric();

        if is_word && !previous_is_word {
            label.push(ch.to_ascii_uppercase());
        } else {
            label.push(ch);
        }
        previous_is_word = is_word;
    }

    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{StoreEntry, StoreError};
    use std::collections::HashSet;

    struct ProbeOnly {
        existing: HashSet<String>,
    }

    #[async_trait::async_trait]
    impl ContentStore for ProbeOnly {
        async fn fetch(&self, path: &str) -> Result<String, StoreError> {
            Err(StoreError::NotFound { path: path.to_string() })
        }

        async fn probe(&self, path: &str) -> bool {
            self.existing.contains(path)
        }

        async fn list(&self, _path: &str) -> Result<Vec<StoreEntry>, StoreError> {
            Err(StoreError::Unsupported { operation: "list" })
        }
    }

    fn store(paths: &[&str]) -> ProbeOnly {
        ProbeOnly { existing: paths.iter().map(|p| p.to_string()).collect() }
    }

    #[tokio::test]
    async fn test_first_existing_extension_wins() {
        let store = store(&["audio/animals/cat.ogg", "audio/animals/cat.wav"]);

        let matched = find_matching_audio(&store, "audio/animals", "cat", AUDIO_EXTENSIONS).await;
        assert_eq!(matched.as_deref(), Some("cat.wav"));
    }

    #[tokio::test]
    async fn test_no_match_is_none() {
        let store = store(&["audio/animals/dog.mp3"]);

        let matched = find_matching_audio(&store, "audio/animals", "cat", AUDIO_EXTENSIONS).await;
        assert_eq!(matched, None);
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("cat.png"), "cat");
        assert_eq!(base_name("ice-cream.final.jpg"), "ice-cream.final");
        assert_eq!(base_name("noext"), "noext");
    }

    #[test]
    fn test_content_image_filter() {
        assert!(is_content_image("cat.png", IMAGE_EXTENSIONS, COVER_FILE));
        assert!(is_content_image("DOG.JPG", IMAGE_EXTENSIONS, COVER_FILE));
        assert!(!is_content_image("cover.jpg", IMAGE_EXTENSIONS, COVER_FILE));
        assert!(!is_content_image("manifest.json", IMAGE_EXTENSIONS, COVER_FILE));
        assert!(!is_content_image("README", IMAGE_EXTENSIONS, COVER_FILE));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("body-parts"), "Body Parts");
        assert_eq!(display_name("school_supplies"), "School Supplies");
        assert_eq!(display_name("cat"), "Cat");
        assert_eq!(display_name("t-rex2"), "T Rex2");
        assert_eq!(display_name("don't"), "Don'T");
    }
}
