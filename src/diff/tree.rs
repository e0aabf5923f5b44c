use crate::fs::parent;
use crate::scanner::FileSystemEntry;
use std::collections::HashMap;

/// Renders entries as an ASCII tree.
///
/// Children are grouped under their parent path and sorted by name on every
/// level; directories get a trailing `/`. Entries whose parent directory is
/// not part of `entries` are unreachable and not rendered.
///
/// ```
/// use treelens::diff::render_tree;
/// use treelens::fs::EntryKind;
/// use treelens::scanner::FileSystemEntry;
///
/// let entry = |path: &str, kind| FileSystemEntry {
///     name: path.rsplit('/').next().unwrap().to_string(),
///     kind,
///     path: path.to_string(),
///     last_modified: None,
///     size: None,
///     content: None,
/// };
/// let tree = render_tree(&[
///     entry("src", EntryKind::Directory),
///     entry("src/lib.rs", EntryKind::File),
///     entry("Cargo.toml", EntryKind::File),
/// ]);
/// assert_eq!(tree, "├── Cargo.toml\n└── src/\n    └── lib.rs\n");
/// ```
#[must_use]
pub fn render_tree(entries: &[FileSystemEntry]) -> String {
    let mut children: HashMap<&str, Vec<&FileSystemEntry>> = HashMap::new();
    for entry in entries {
        children.entry(parent(&entry.path)).or_default().push(entry);
    }
    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| a.name.cmp(&b.name));
    }

    let mut out = String::new();
    render_level(&children, "", "", &mut out);
    out
}

fn render_level(
    children: &HashMap<&str, Vec<&FileSystemEntry>>,
    dir: &str,
    prefix: &str,
    out: &mut String,
) {
    let Some(siblings) = children.get(dir) else {
        return;
    };

    for (idx, entry) in siblings.iter().enumerate() {
        let last = idx + 1 == siblings.len();
        out.push_str(prefix);
        out.push_str(if last { "└── " } else { "├── " });
        out.push_str(&entry.name);

        if entry.is_file() {
            out.push('\n');
        } else {
            out.push_str("/\n");
            let nested = format!("{prefix}{}", if last { "    " } else { "│   " });
            render_level(children, &entry.path, &nested, out);
        }
    }
}
