//! Local file input: telling paths from URLs, `~` expansion, Tab completion

use std::path::{Path, PathBuf};

/// Replace a leading `~/` with the home directory
pub fn expand_home(input: &str) -> PathBuf {
    match input.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(input),
        },
        None if input == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(input)),
        None => PathBuf::from(input),
    }
}

/// The URL box holds a local file rather than a URL
///
/// Existing files always count; anything written like a path counts too so
/// a typo is reported as a missing file instead of a bad URL.
pub fn local_file(input: &str) -> Option<PathBuf> {
    let input = input.trim();
    if input.is_empty() || input.contains("://") {
        return None;
    }
    let path = expand_home(input);
    let path_like = ["/", "./", "../", "~/"]
        .iter()
        .any(|prefix| input.starts_with(prefix));
    (path_like || path.is_file()).then_some(path)
}

/// Complete the last path component of `input`
///
/// Returns the extended text, or `None` when nothing matches. With several
/// matches the common prefix is filled in; a single directory gets a
/// trailing `/`.
pub fn complete_path(input: &str) -> Option<String> {
    let (dir_part, prefix) = match input.rfind('/') {
        Some(i) => input.split_at(i + 1),
        None => ("", input),
    };
    let dir = if dir_part.is_empty() {
        PathBuf::from(".")
    } else {
        expand_home(dir_part)
    };

    let mut matches: Vec<(String, bool)> = std::fs::read_dir(&dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            let hidden = name.starts_with('.') && !prefix.starts_with('.');
            (name.starts_with(prefix) && !hidden).then(|| (name, is_dir(&entry.path())))
        })
        .collect();
    matches.sort();

    let completed = match matches.as_slice() {
        [] => return None,
        [(name, true)] => format!("{}/", name),
        [(name, false)] => name.clone(),
        [(first, _), rest @ ..] => rest.iter().fold(first.clone(), |common, (name, _)| {
            common
                .chars()
                .zip(name.chars())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect()
        }),
    };

    (completed.len() > prefix.len() || matches.len() == 1)
        .then(|| format!("{}{}", dir_part, completed))
}

fn is_dir(path: &Path) -> bool {
    path.metadata().map(|m| m.is_dir()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_urls_are_not_files() {
        assert!(local_file("https://example.com/v.mp4").is_none());
        assert!(local_file("").is_none());
        assert!(local_file("example.com/v.mp4").is_none());
    }

    #[test]
    fn test_path_like_input_is_a_file() {
        assert_eq!(
            local_file("/srv/media/movie night.mkv"),
            Some(PathBuf::from("/srv/media/movie night.mkv"))
        );
        assert!(local_file("./clip.mp4").is_some());
    }

    #[test]
    fn test_home_expansion() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/Videos/a.mp4"), home.join("Videos/a.mp4"));
        }
        assert_eq!(expand_home("/tmp/a.mp4"), PathBuf::from("/tmp/a.mp4"));
    }

    #[test]
    fn test_complete_single_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("holiday.mp4"));
        let base = format!("{}/", dir.path().display());

        assert_eq!(
            complete_path(&format!("{}hol", base)),
            Some(format!("{}holiday.mp4", base))
        );
        assert_eq!(complete_path(&format!("{}zzz", base)), None);
    }

    #[test]
    fn test_complete_common_prefix_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("episode 01.mkv"));
        touch(&dir.path().join("episode 02.mkv"));
        std::fs::create_dir(dir.path().join("extras")).unwrap();
        let base = format!("{}/", dir.path().display());

        assert_eq!(
            complete_path(&format!("{}ep", base)),
            Some(format!("{}episode 0", base))
        );
        assert_eq!(
            complete_path(&format!("{}ex", base)),
            Some(format!("{}extras/", base))
        );
        // ambiguous and nothing more to add
        assert_eq!(complete_path(&format!("{}e", base)), None);
    }
}
