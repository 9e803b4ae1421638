//! Asset directory layout and media file naming.

use std::env;
use std::path::PathBuf;

use chrono::Local;

/// Root directory for generated assets.
///
/// Uses the `PERSONAFORGE_ASSETS_DIR` environment variable if set,
/// otherwise `assets/` under the current working directory.
pub fn assets_path() -> PathBuf {
    env::var("PERSONAFORGE_ASSETS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("assets")
        })
}

fn asset_subdir(name: &str) -> PathBuf {
    let dir = assets_path().join(name);
    let _ = std::fs::create_dir_all(&dir);
    dir
}

/// Directory for generated portrait images, created on first use.
pub fn images_dir() -> PathBuf {
    asset_subdir("images")
}

/// Directory for synthesized voice clips, created on first use.
pub fn audios_dir() -> PathBuf {
    asset_subdir("audios")
}

/// Directory for generated videos and temporary video inputs.
pub fn videos_dir() -> PathBuf {
    asset_subdir("videos")
}

/// Build a `<name>_<timestamp>.<ext>` filename for a media artifact.
///
/// The character name is lowercased and reduced to ASCII alphanumerics so
/// the result is safe on every filesystem; an empty or fully non-ASCII
/// name falls back to `"default"`.
pub fn media_filename(character_name: &str, ext: &str) -> String {
    let mut stem: String = character_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .trim_matches('_')
        .to_string();
    if stem.is_empty() {
        stem = "default".to_string();
    }
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    format!("{stem}_{timestamp}.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_filename_sanitizes_the_character_name() {
        let name = media_filename("Wu Zetian", "jpg");
        assert!(name.starts_with("wu_zetian_"));
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn media_filename_falls_back_for_unusable_names() {
        let name = media_filename("   ", "mp3");
        assert!(name.starts_with("default_"));
    }
}
