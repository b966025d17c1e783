use crate::torrent::TorrentMeta;
use crate::{Error, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Decides whether a record is kept. `index` is the record's position in
/// the unfiltered batch.
pub trait Predicate {
    fn test(&self, meta: &TorrentMeta, index: usize) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&TorrentMeta, usize) -> bool,
{
    fn test(&self, meta: &TorrentMeta, index: usize) -> bool {
        self(meta, index)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub length: u64,
    pub files: u64,
}

/// Decoded torrents in input order.
#[derive(Debug, Default, Clone)]
pub struct Batch {
    items: Vec<TorrentMeta>,
}

impl Batch {
    pub fn new(items: Vec<TorrentMeta>) -> Self {
        Self { items }
    }

    /// Loads every path in order. The first unreadable or malformed file
    /// aborts the whole batch; its path is attached to the error.
    pub fn load<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let items = paths
            .into_iter()
            .map(TorrentMeta::from_path)
            .collect::<Result<Vec<_>>>()?;
        info!(count = items.len(), "loaded batch");
        Ok(Self { items })
    }

    pub fn filter<P>(self, predicate: &P) -> Self
    where
        P: Predicate + ?Sized,
    {
        let total = self.items.len();
        let items: Vec<_> = self
            .items
            .into_iter()
            .enumerate()
            .filter(|(i, meta)| predicate.test(meta, *i))
            .map(|(_, meta)| meta)
            .collect();
        debug!(total, kept = items.len(), "filtered batch");
        Self { items }
    }

    /// Like [`Batch::filter`]; without a predicate everything is kept.
    pub fn filter_opt(self, predicate: Option<&dyn Predicate>) -> Self {
        match predicate {
            Some(p) => self.filter(p),
            None => self,
        }
    }

    pub fn summary(&self) -> Result<Summary> {
        let mut summary = Summary {
            count: self.items.len(),
            ..Default::default()
        };
        for meta in &self.items {
            let info = meta.info()?;
            summary.length = summary
                .length
                .checked_add(info.length)
                .ok_or_else(|| Error::InvalidInput("summed length overflows u64".into()))?;
            summary.files += info.files.len() as u64;
        }
        Ok(summary)
    }

    pub fn items(&self) -> &[TorrentMeta] {
        &self.items
    }

    pub fn into_items(self) -> Vec<TorrentMeta> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
