use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// A named position pulled from the players directory or a warps file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedPos {
    pub name: String,
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

fn parse_pos(text: &str) -> Option<(i64, i64, i64)> {
    let mut it = text.split_whitespace();
    let x = it.next()?.parse().ok()?;
    let y = it.next()?.parse().ok()?;
    let z = it.next()?.parse().ok()?;
    Some((x, y, z))
}

/// Load the world's players directory: one file per player, named after the
/// player, containing `<x> <y> <z>`. A missing directory is an empty
/// database; unreadable entries are skipped.
pub fn load_players(dir: &Path, filter: &HashSet<String>) -> Vec<NamedPos> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            log::debug!("no players database at {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut players = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = match path.file_stem().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };
        if !filter.is_empty() && !filter.contains(&name) {
            continue;
        }
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("skipping player file {}: {}", path.display(), e);
                continue;
            }
        };
        match parse_pos(&text) {
            Some((x, y, z)) => players.push(NamedPos { name, x, y, z }),
            None => log::warn!("skipping malformed player file {}", path.display()),
        }
    }
    players.sort_by(|a, b| a.name.cmp(&b.name));
    players
}

/// Load a warps file: one warp per line, `<name> <x> <y> <z>`; `#` starts a
/// comment line.
pub fn load_warps(path: &Path) -> std::io::Result<Vec<NamedPos>> {
    let text = fs::read_to_string(path)?;
    let mut warps = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some(pair) => pair,
            None => {
                log::warn!("skipping malformed warp line: {}", line);
                continue;
            }
        };
        match parse_pos(rest) {
            Some((x, y, z)) => warps.push(NamedPos {
                name: name.to_string(),
                x,
                y,
                z,
            }),
            None => log::warn!("skipping malformed warp line: {}", line),
        }
    }
    Ok(warps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT: AtomicUsize = AtomicUsize::new(0);

    fn scratch_dir() -> std::path::PathBuf {
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        let dir =
            std::env::temp_dir().join(format!("carta-players-{}-{}", std::process::id(), n));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn players_load_and_filter() {
        let dir = scratch_dir();
        fs::write(dir.join("alice"), "16 64 -32").unwrap();
        fs::write(dir.join("bob"), "0 70 0").unwrap();
        fs::write(dir.join("mallory"), "not a position").unwrap();

        let all = load_players(&dir, &HashSet::new());
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "alice");
        assert_eq!((all[0].x, all[0].y, all[0].z), (16, 64, -32));

        let filter: HashSet<String> = ["bob".to_string()].into_iter().collect();
        let some = load_players(&dir, &filter);
        assert_eq!(some.len(), 1);
        assert_eq!(some[0].name, "bob");
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_players_dir_is_empty() {
        let dir = scratch_dir().join("nope");
        assert!(load_players(&dir, &HashSet::new()).is_empty());
    }

    #[test]
    fn warps_parse_with_comments() {
        let dir = scratch_dir();
        let path = dir.join("warps.txt");
        fs::write(&path, "# warps\nspawn 0 64 0\nmine -120 30 455\nbroken\n").unwrap();
        let warps = load_warps(&path).unwrap();
        assert_eq!(warps.len(), 2);
        assert_eq!(warps[1].name, "mine");
        assert_eq!((warps[1].x, warps[1].y, warps[1].z), (-120, 30, 455));
        fs::remove_dir_all(dir).unwrap();
    }
}
