//! Path normalization for instruction strings.
//!
//! Instruction paths are stored relative to the mod root or a version directory and
//! may have been typed with either separator. Everything that is stored or compared
//! goes through [`normalize`] first so that `style\\custom.css`, `./style/custom.css`
//! and `style/x/../custom.css` are the same path.

/// Normalize a relative path string to `/` separators.
///
/// - `\` becomes `/`
/// - empty and `.` segments are dropped
/// - `name/..` pairs are collapsed
/// - leading `..` segments that cannot be collapsed are kept
///
/// The result never ends with a separator. A leading `/` is preserved so absolute
/// paths stay absolute.
pub fn normalize(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                // `/..` is still `/`
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Normalize a path that must stay below the directory it is joined to.
///
/// Like [`normalize`], but leading separators and leading `..` segments are dropped,
/// so `/resources/vivaldi` and `../resources/vivaldi` both become `resources/vivaldi`.
pub fn normalize_relative(path: &str) -> String {
    let normalized = normalize(path);
    normalized
        .split('/')
        .skip_while(|segment| segment.is_empty() || *segment == "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Join two relative path strings and normalize the result.
pub fn join(base: &str, child: &str) -> String {
    if base.is_empty() {
        normalize(child)
    } else {
        normalize(&format!("{}/{}", base, child))
    }
}

/// Compute the path of `target` relative to the directory `base_dir`.
///
/// Both arguments are normalized first. Segments of `base_dir` not shared with
/// `target` become `..`.
///
/// ```
/// use vivaldi_modder::services::paths::relative_to;
///
/// assert_eq!(relative_to("resources/vivaldi", "resources/vivaldi/style/a.css"), "style/a.css");
/// assert_eq!(relative_to("resources/vivaldi", "mods/a.js"), "../../mods/a.js");
/// ```
pub fn relative_to(base_dir: &str, target: &str) -> String {
    let base = normalize(base_dir);
    let target = normalize(target);

    let base_segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    let target_segments: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();

    let common = base_segments
        .iter()
        .zip(target_segments.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    parts.extend(std::iter::repeat_n("..", base_segments.len() - common));
    parts.extend(&target_segments[common..]);

    parts.join("/")
}

/// The final segment of a path string.
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
