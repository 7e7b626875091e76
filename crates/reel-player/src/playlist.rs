//! Playlist file parsing: one audio file path per line.

use std::io;
use std::path::{Path, PathBuf};

/// Read an ordered path list. Blank lines and `#` comments are skipped;
/// capacity truncation happens in the track store, not here.
pub fn read(path: &Path) -> io::Result<Vec<PathBuf>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blanks_and_comments() {
        let path = std::env::temp_dir().join("reel-playlist-test.txt");
        std::fs::write(&path, "# my set\n\ntracks/one.wav\n  tracks/two.wav  \n").unwrap();

        let paths = read(&path).unwrap();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("tracks/one.wav"),
                PathBuf::from("tracks/two.wav")
            ]
        );

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read(Path::new("/no/such/playlist.txt")).is_err());
    }
}
