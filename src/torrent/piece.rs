use super::hash::HashId;
use super::meta::{TorrentInfo, TorrentInfoFile};
use serde::Serialize;
use std::ops::RangeInclusive;
use tracing::debug;

/// Where a file's first byte sits in the shared piece array.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilePieceInfo {
    pub index: usize,
    pub offset: u64,
    /// `None` when `index` is past the last piece, which only happens for a
    /// trailing empty file or a torrent without v1 piece hashes.
    pub hash: Option<HashId>,
}

impl TorrentInfo {
    /// Byte offset of file `index` within the concatenated content.
    fn file_start(&self, index: usize) -> u64 {
        self.files[..index].iter().map(|f| f.length).sum()
    }

    fn piece_at(&self, start: u64) -> FilePieceInfo {
        let index = (start / self.piece_length) as usize;
        FilePieceInfo {
            index,
            offset: start % self.piece_length,
            hash: self.pieces.get(index).copied(),
        }
    }

    /// First piece of `file`, which must be an element of `self.files`.
    ///
    /// The file is looked up by identity, not by value. A reference from
    /// another torrent (or a clone) yields `FilePieceInfo::default()`; use
    /// [`TorrentInfo::first_piece_at`] when only a position is known.
    pub fn first_piece(&self, file: &TorrentInfoFile) -> FilePieceInfo {
        match self.files.iter().position(|f| std::ptr::eq(f, file)) {
            Some(index) => self.piece_at(self.file_start(index)),
            None => {
                debug!(path = ?file.path, "file not part of this torrent");
                FilePieceInfo::default()
            }
        }
    }

    pub fn first_piece_at(&self, index: usize) -> Option<FilePieceInfo> {
        (index < self.files.len()).then(|| self.piece_at(self.file_start(index)))
    }

    /// Pieces holding any byte of file `index`; `None` for empty files.
    pub fn piece_span(&self, index: usize) -> Option<RangeInclusive<usize>> {
        let file = self.files.get(index)?;
        if file.length == 0 {
            return None;
        }
        let start = self.file_start(index);
        let end = start + file.length - 1;
        Some(self.piece_at(start).index..=self.piece_at(end).index)
    }

    /// [`FilePieceInfo`] for every file, in listing order.
    pub fn file_pieces(&self) -> Vec<FilePieceInfo> {
        let mut start = 0u64;
        self.files
            .iter()
            .map(|f| {
                let p = self.piece_at(start);
                start += f.length;
                p
            })
            .collect()
    }
}
