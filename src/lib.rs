pub mod batch;
pub mod bencode;
pub mod config;
mod error;
pub mod filter;
pub mod output;
pub mod torrent;
pub use error::{Error, Result};

pub use batch::{Batch, Predicate, Summary};
pub use filter::Filter;
pub use torrent::{FilePieceInfo, HashId, TorrentInfo, TorrentInfoFile, TorrentMeta};
