use std::path::{Path, PathBuf};

fn has_windows_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic()
}

/// Convert an archive entry path to a relative PathBuf, rejecting empty,
/// absolute or traversal paths.
pub(crate) fn parse_entry_rel_path(raw: &str) -> Option<PathBuf> {
    let normalized = raw.replace('\\', "/");
    if normalized.starts_with('/') || has_windows_drive_prefix(&normalized) {
        return None;
    }

    let mut relative = PathBuf::new();
    for part in normalized.split('/') {
        match part {
            "" | "." => {}
            ".." => return None,
            _ => relative.push(part),
        }
    }

    if relative.as_os_str().is_empty() {
        None
    } else {
        Some(relative)
    }
}

/// Find the folder every entry lives under, if the archive has exactly one
/// top-level folder with content inside it.
pub(super) fn detect_common_top_dir<'a, I>(paths: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidate: Option<String> = None;
    let mut saw_nested = false;

    for raw in paths {
        let relative = parse_entry_rel_path(raw)?;
        let mut components = relative.components();
        let first = components.next()?.as_os_str().to_str()?.to_string();
        if components.next().is_some() {
            saw_nested = true;
        }
        match candidate.as_deref() {
            None => candidate = Some(first),
            Some(existing) if existing == first => {}
            Some(_) => return None,
        }
    }

    candidate.filter(|_| saw_nested)
}

/// Map an entry path below `dest_dir`, with the common top folder removed.
///
/// Returns `None` for the top folder entry itself.
pub(super) fn destination_for(raw: &str, dest_dir: &Path, top_dir: Option<&str>) -> Option<PathBuf> {
    let relative = parse_entry_rel_path(raw)?;
    let stripped = match top_dir {
        Some(top) => relative.strip_prefix(top).ok()?.to_path_buf(),
        None => relative,
    };
    if stripped.as_os_str().is_empty() {
        None
    } else {
        Some(dest_dir.join(stripped))
    }
}
