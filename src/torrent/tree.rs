use super::hash::PiecesRoot;
use super::meta::TorrentInfoFile;
use crate::bencode::Value;
use crate::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Appends one torrent path segment below `path`. Leading separators are
/// stripped so a segment can never replace what precedes it; empty and `.`
/// segments are skipped and `..` is rejected.
pub(crate) fn push_segment(path: &mut PathBuf, segment: &str) -> Result<()> {
    let segment = segment.trim_start_matches(|c: char| c == '/' || c == '\\');
    if Path::new(segment)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(Error::InvalidTorrent(format!(
            "path segment {segment:?} leaves the torrent root"
        )));
    }
    if !segment.is_empty() && segment != "." {
        path.push(segment);
    }
    Ok(())
}

pub(crate) fn join_segments<S: AsRef<str>>(segments: &[S]) -> Result<PathBuf> {
    let mut path = PathBuf::new();
    for segment in segments {
        push_segment(&mut path, segment.as_ref())?;
    }
    Ok(path)
}

/// Flattens a bep-0052 `file tree` into files in tree (key) order.
///
/// Directories are dictionaries keyed by path segment; a file is a
/// dictionary holding a single empty key whose value carries `length`,
/// `pieces root` and `attr`.
pub(crate) fn flatten_file_tree(tree: &Value) -> Result<Vec<TorrentInfoFile>> {
    let mut files = vec![];
    walk(tree, PathBuf::new(), &mut files)?;
    Ok(files)
}

fn walk(node: &Value, path: PathBuf, files: &mut Vec<TorrentInfoFile>) -> Result<()> {
    let dict = node
        .as_dict()
        .ok_or_else(|| Error::InvalidTorrent(format!("file tree node {path:?} is a {}", node.kind())))?;

    if let Some(leaf) = dict.get("") {
        let length = leaf
            .dict_get("length")
            .and_then(Value::as_i64)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| Error::InvalidTorrent(format!("file tree entry {path:?} has no length")))?;
        files.push(TorrentInfoFile {
            length,
            path,
            attr: leaf
                .dict_get("attr")
                .and_then(Value::as_text)
                .map(|a| a.into_owned()),
            pieces_root: leaf
                .dict_get("pieces root")
                .and_then(Value::as_bytes)
                .and_then(PiecesRoot::from_slice),
        });
        return Ok(());
    }

    for (name, child) in dict {
        let mut child_path = path.clone();
        push_segment(&mut child_path, name)?;
        walk(child, child_path, files)?;
    }
    Ok(())
}
