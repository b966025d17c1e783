use super::file::{RawInfo, RawTorrent};
use super::hash::{info_hash, HashId, PiecesRoot};
use super::tree::{flatten_file_tree, join_segments};
use crate::bencode::{self, Value};
use crate::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PIECE_HASH_LEN: usize = 20;

/// A DHT bootstrap node from the `nodes` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeAddr {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TorrentInfoFile {
    pub length: u64,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pieces_root: Option<PiecesRoot>,
}

impl TorrentInfoFile {
    pub fn is_padding(&self) -> bool {
        self.attr.as_deref().map_or(false, |a| a.contains('p'))
    }
}

/// The decoded `info` dictionary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TorrentInfo {
    pub name: String,
    pub piece_length: u64,
    pub pieces: Vec<HashId>,
    pub length: u64,
    pub files: Vec<TorrentInfoFile>,
    pub meta_version: i64,
    pub private: bool,
}

impl TorrentInfo {
    /// Decodes and validates the raw info dictionary.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let value = bencode::decode(raw)?;
        let info: RawInfo = bencode::from_value(&value)?;

        if info.piece_length == 0 {
            return Err(Error::InvalidTorrent("piece length must be positive".into()));
        }
        if info.pieces.len() % PIECE_HASH_LEN != 0 {
            return Err(Error::InvalidTorrent(format!(
                "pieces is {} bytes, not a multiple of {PIECE_HASH_LEN}",
                info.pieces.len()
            )));
        }
        let pieces = info
            .pieces
            .chunks_exact(PIECE_HASH_LEN)
            .map(HashId::from_slice)
            .collect::<Result<Vec<_>>>()?;

        let tree = match &info.file_tree {
            Some(tree) => Some(flatten_file_tree(tree)?),
            None => None,
        };

        let files = match (info.files, info.length, tree) {
            (Some(files), _, tree) => {
                let mut files = files
                    .into_iter()
                    .map(|f| {
                        Ok(TorrentInfoFile {
                            length: f.length,
                            path: join_segments(f.path.as_slice())?,
                            attr: f.attr,
                            pieces_root: None,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                if let Some(tree) = tree {
                    attach_pieces_roots(&mut files, &tree);
                }
                files
            }
            (None, Some(length), tree) => {
                let mut files = vec![TorrentInfoFile {
                    length,
                    path: join_segments(&[info.name.as_str()])?,
                    attr: None,
                    pieces_root: None,
                }];
                if let Some(tree) = tree {
                    attach_pieces_roots(&mut files, &tree);
                }
                files
            }
            (None, None, Some(tree)) => tree,
            (None, None, None) => {
                return Err(Error::InvalidTorrent(
                    "info has neither length nor files".into(),
                ))
            }
        };

        let length = files
            .iter()
            .try_fold(0u64, |sum, f| sum.checked_add(f.length))
            .ok_or_else(|| Error::InvalidTorrent("total length overflows u64".into()))?;
        let meta_version = info.meta_version.unwrap_or(0);

        // v2-only torrents carry no v1 piece list.
        let expected = length.div_ceil(info.piece_length);
        if (meta_version < 2 || !pieces.is_empty()) && pieces.len() as u64 != expected {
            return Err(Error::InvalidTorrent(format!(
                "{} piece hashes for {length} bytes in pieces of {}, expect {expected}",
                pieces.len(),
                info.piece_length
            )));
        }

        Ok(Self {
            name: info.name,
            piece_length: info.piece_length,
            pieces,
            length,
            files,
            meta_version,
            private: info.private.unwrap_or(false),
        })
    }
}

// Hybrid torrents: v1 paths and v2 tree paths are both relative to the
// torrent name, except a single file which is keyed by the name itself.
fn attach_pieces_roots(files: &mut [TorrentInfoFile], tree: &[TorrentInfoFile]) {
    for f in files.iter_mut() {
        if let Some(t) = tree.iter().find(|t| t.path == f.path) {
            f.pieces_root = t.pieces_root;
            if f.attr.is_none() {
                f.attr = t.attr.clone();
            }
        }
    }
}

/// One decoded `.torrent` file.
///
/// Holds the normalized envelope and the verbatim bytes of the `info`
/// dictionary; the typed [`TorrentInfo`] is derived from those bytes once.
#[derive(Debug, Clone, Default)]
pub struct TorrentMeta {
    pub announce: String,
    pub announce_list: Vec<String>,
    pub nodes: Vec<NodeAddr>,
    pub url_list: Vec<String>,
    pub comment: String,
    pub creation_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub encoding: String,
    info_bytes: Vec<u8>,
    info: OnceCell<TorrentInfo>,
}

impl TorrentMeta {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::from(e).with_path(path))?;
        let meta = Self::from_bytes(&data).map_err(|e| e.with_path(path))?;
        debug!(?path, info_hash = %meta.info_hash(), "loaded torrent");
        Ok(meta)
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let (origin, rest) = bencode::Decoder::new(buf).decode_partial()?;
        if !rest.is_empty() {
            warn!(trailing = rest.len(), "ignoring bytes after torrent dictionary");
        }
        if origin.as_dict().is_none() {
            return Err(Error::Decode(format!(
                "top level is a {}, expect dictionary",
                origin.kind()
            )));
        }
        let raw: RawTorrent = bencode::from_value(&origin)?;
        let info_bytes = bencode::raw_dict_entry(buf, "info")?
            .ok_or_else(|| Error::Decode("missing info".into()))?
            .to_vec();

        let mut announce_list: Vec<String> = raw
            .announce_list
            .iter()
            .flatten()
            .flatten()
            .cloned()
            .collect();
        announce_list.sort();
        let mut url_list = raw.url_list();
        url_list.sort();

        let mut meta = Self {
            announce: raw.announce.unwrap_or_default(),
            announce_list,
            nodes: raw.nodes.iter().flatten().filter_map(node_addr).collect(),
            url_list,
            comment: raw.comment.unwrap_or_default(),
            creation_date: raw.creation_date.and_then(unix_time),
            created_by: raw.created_by.unwrap_or_default(),
            encoding: raw.encoding.unwrap_or_default(),
            info_bytes,
            info: OnceCell::new(),
        };
        meta.apply_legacy_keys(&origin);
        meta.info()?;
        Ok(meta)
    }

    // Some older tools write "saved by"/"save date" instead of the
    // standard "created by"/"creation date"; when present they win.
    fn apply_legacy_keys(&mut self, origin: &Value) {
        if let Some(by) = origin.dict_get("saved by").and_then(Value::as_text) {
            self.created_by = by.into_owned();
        }
        if let Some(date) = origin.dict_get("save date").and_then(Value::as_i64) {
            self.creation_date = unix_time(date);
        }
    }

    /// The untouched bytes of the `info` dictionary.
    pub fn info_bytes(&self) -> &[u8] {
        &self.info_bytes
    }

    pub fn info(&self) -> Result<&TorrentInfo> {
        self.info
            .get_or_try_init(|| TorrentInfo::from_bytes(&self.info_bytes))
    }

    pub fn info_hash(&self) -> HashId {
        info_hash(&self.info_bytes)
    }
}

fn unix_time(secs: i64) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    let t = Utc.timestamp_opt(secs, 0).single();
    if t.is_none() {
        warn!(secs, "creation date out of range");
    }
    t
}

fn node_addr(v: &Value) -> Option<NodeAddr> {
    match v.as_list()? {
        [host, port] => Some(NodeAddr {
            host: host.as_text()?.into_owned(),
            port: u16::try_from(port.as_i64()?).ok()?,
        }),
        _ => None,
    }
}
