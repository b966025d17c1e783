use crate::batch::{Batch, Summary};
use crate::bencode::{self, Value};
use crate::torrent::{FilePieceInfo, HashId, NodeAddr, TorrentInfoFile, TorrentMeta};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::str::FromStr;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    #[default]
    Text,
    Json,
    InfoJson,
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "info-json" | "info:json" => Ok(Self::InfoJson),
            _ => Err(Error::Config(format!("output not supported: {s:?}"))),
        }
    }
}

#[derive(Serialize)]
struct FileRecord<'a> {
    #[serde(flatten)]
    file: &'a TorrentInfoFile,
    first_piece: FilePieceInfo,
}

#[derive(Serialize)]
struct InfoRecord<'a> {
    name: &'a str,
    piece_length: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pieces: Option<&'a [HashId]>,
    piece_count: usize,
    length: u64,
    files: Vec<FileRecord<'a>>,
    meta_version: i64,
    private: bool,
}

/// Plain-data view of one torrent for serializers.
#[derive(Serialize)]
pub struct Record<'a> {
    info_hash: HashId,
    announce: &'a str,
    announce_list: &'a [String],
    nodes: &'a [NodeAddr],
    url_list: &'a [String],
    comment: &'a str,
    creation_date: Option<DateTime<Utc>>,
    created_by: &'a str,
    encoding: &'a str,
    info: InfoRecord<'a>,
}

impl<'a> Record<'a> {
    pub fn new(meta: &'a TorrentMeta, with_pieces: bool) -> Result<Self> {
        let info = meta.info()?;
        let files = info
            .files
            .iter()
            .zip(info.file_pieces())
            .map(|(file, first_piece)| FileRecord { file, first_piece })
            .collect();
        Ok(Self {
            info_hash: meta.info_hash(),
            announce: &meta.announce,
            announce_list: &meta.announce_list,
            nodes: &meta.nodes,
            url_list: &meta.url_list,
            comment: &meta.comment,
            creation_date: meta.creation_date,
            created_by: &meta.created_by,
            encoding: &meta.encoding,
            info: InfoRecord {
                name: &info.name,
                piece_length: info.piece_length,
                pieces: with_pieces.then_some(info.pieces.as_slice()),
                piece_count: info.pieces.len(),
                length: info.length,
                files,
                meta_version: info.meta_version,
                private: info.private,
            },
        })
    }
}

#[derive(Serialize)]
struct Report<'a> {
    items: Vec<Record<'a>>,
    summary: Summary,
}

#[derive(Debug, Default, Clone)]
pub struct Renderer {
    pub format: Format,
    pub summary: bool,
    pub summary_only: bool,
    pub show_pieces: bool,
}

impl Renderer {
    pub fn render<W: Write>(&self, w: &mut W, batch: &Batch) -> Result<()> {
        match self.format {
            Format::Text => self.render_text(w, batch),
            Format::Json => self.render_json(w, batch),
            Format::InfoJson => render_info_json(w, batch),
        }
    }

    fn render_text<W: Write>(&self, w: &mut W, batch: &Batch) -> Result<()> {
        if !self.summary_only {
            for meta in batch.items() {
                write_text(w, meta)?;
            }
        }
        if self.summary || self.summary_only {
            let s = batch.summary()?;
            writeln!(
                w,
                "total: {} torrents, {} files, {} bytes",
                s.count, s.files, s.length
            )?;
        }
        Ok(())
    }

    fn render_json<W: Write>(&self, w: &mut W, batch: &Batch) -> Result<()> {
        let items = batch
            .items()
            .iter()
            .map(|m| Record::new(m, self.show_pieces))
            .collect::<Result<Vec<_>>>()?;
        if self.summary || self.summary_only {
            let report = Report {
                items: if self.summary_only { vec![] } else { items },
                summary: batch.summary()?,
            };
            serde_json::to_writer_pretty(&mut *w, &report)?;
        } else {
            serde_json::to_writer_pretty(&mut *w, &items)?;
        }
        writeln!(w)?;
        Ok(())
    }
}

fn write_text<W: Write>(w: &mut W, meta: &TorrentMeta) -> Result<()> {
    let info = meta.info()?;
    writeln!(w, "name:         {}", info.name)?;
    writeln!(w, "info hash:    {}", meta.info_hash())?;
    writeln!(w, "length:       {}", info.length)?;
    writeln!(
        w,
        "pieces:       {} x {}",
        info.pieces.len(),
        info.piece_length
    )?;
    if info.meta_version != 0 {
        writeln!(w, "meta version: {}", info.meta_version)?;
    }
    if info.private {
        writeln!(w, "private:      yes")?;
    }
    if !meta.created_by.is_empty() {
        writeln!(w, "created by:   {}", meta.created_by)?;
    }
    if let Some(date) = meta.creation_date {
        writeln!(w, "created at:   {}", date.to_rfc3339())?;
    }
    if !meta.comment.is_empty() {
        writeln!(w, "comment:      {}", meta.comment)?;
    }
    if !meta.announce.is_empty() {
        writeln!(w, "announce:     {}", meta.announce)?;
    }
    for url in &meta.announce_list {
        writeln!(w, "  tracker:    {url}")?;
    }
    for url in &meta.url_list {
        writeln!(w, "  web seed:   {url}")?;
    }
    for node in &meta.nodes {
        writeln!(w, "  node:       {}:{}", node.host, node.port)?;
    }
    writeln!(w, "files:        {}", info.files.len())?;
    for (i, (file, piece)) in info.files.iter().zip(info.file_pieces()).enumerate() {
        let pad = if file.is_padding() { " (padding)" } else { "" };
        writeln!(
            w,
            "  [{i}] {} {} bytes @ piece {}+{}{pad}",
            file.path.display(),
            file.length,
            piece.index,
            piece.offset
        )?;
    }
    writeln!(w)?;
    Ok(())
}

fn render_info_json<W: Write>(w: &mut W, batch: &Batch) -> Result<()> {
    let [meta] = batch.items() else {
        return Err(Error::Config(format!(
            "info-json needs exactly one torrent, got {}",
            batch.len()
        )));
    };
    let mut info = bencode::decode(meta.info_bytes())?;
    if let Value::Dictionary(m) = &mut info {
        m.remove("pieces");
    }
    serde_json::to_writer_pretty(&mut *w, &to_json(&info))?;
    writeln!(w)?;
    Ok(())
}

/// Byte strings become text when they are UTF-8 and hex otherwise.
pub fn to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::String(s) => s.clone().into(),
        Value::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => s.into(),
            Err(_) => hex::encode(b).into(),
        },
        Value::Integer(i) => (*i).into(),
        Value::List(l) => l.iter().map(to_json).collect(),
        Value::Dictionary(m) => m
            .iter()
            .map(|(k, v)| (k.clone(), to_json(v)))
            .collect::<serde_json::Map<_, _>>()
            .into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::torrent::parse_torrent;
    use crate::torrent::testing::{info_value, torrent, torrent_bytes};

    fn render(r: &Renderer, batch: &Batch) -> String {
        let mut out = vec![];
        r.render(&mut out, batch).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn sample() -> Batch {
        Batch::new(vec![
            parse_torrent(torrent_bytes(
                info_value("a", 16, &[20, 12]),
                vec![("created by", "mk".into()), ("announce", "udp://t".into())],
            ))
            .unwrap(),
            parse_torrent(torrent("b.iso", 16, &[5])).unwrap(),
        ])
    }

    #[test]
    fn format_names() {
        assert_eq!("".parse::<Format>().unwrap(), Format::Text);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("info:json".parse::<Format>().unwrap(), Format::InfoJson);
        assert!(matches!("yaml".parse::<Format>(), Err(Error::Config(_))));
    }

    #[test]
    fn text_listing() {
        let r = Renderer {
            summary: true,
            ..Default::default()
        };
        let out = render(&r, &sample());
        assert!(out.contains("name:         a\n"));
        assert!(out.contains("created by:   mk\n"));
        assert!(out.contains("  [1] dir/file1 12 bytes @ piece 1+4\n"));
        assert!(out.ends_with("total: 2 torrents, 3 files, 37 bytes\n"));

        let r = Renderer {
            summary_only: true,
            ..Default::default()
        };
        assert_eq!(render(&r, &sample()), "total: 2 torrents, 3 files, 37 bytes\n");
    }

    #[test]
    fn json_elides_pieces() {
        let batch = sample();
        let out = render(
            &Renderer {
                format: Format::Json,
                ..Default::default()
            },
            &batch,
        );
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        let list = v.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["info_hash"], batch.items()[0].info_hash().hex());
        assert_eq!(list[0]["info"]["piece_count"], 2);
        assert!(list[0]["info"].get("pieces").is_none());
        assert_eq!(list[0]["info"]["files"][1]["first_piece"]["offset"], 4);
        assert_eq!(list[0]["info"]["files"][1]["path"], "dir/file1");

        let out = render(
            &Renderer {
                format: Format::Json,
                show_pieces: true,
                summary: true,
                ..Default::default()
            },
            &batch,
        );
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["summary"]["length"], 37);
        assert_eq!(v["items"][1]["info"]["pieces"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn info_json_single_record() {
        let batch = Batch::new(vec![sample().into_items().remove(1)]);
        let out = render(
            &Renderer {
                format: Format::InfoJson,
                ..Default::default()
            },
            &batch,
        );
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"length": 5, "name": "b.iso", "piece length": 16})
        );

        let mut out = vec![];
        let err = Renderer {
            format: Format::InfoJson,
            ..Default::default()
        }
        .render(&mut out, &sample())
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn json_bytes_fall_back_to_hex() {
        assert_eq!(to_json(&Value::Bytes(vec![0xff, 0x01])), "ff01");
        assert_eq!(to_json(&Value::Bytes(b"ok".to_vec())), "ok");
    }
}
