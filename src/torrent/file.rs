//! Strict serde shapes of the on-disk torrent dictionaries.
//!
//! These mirror the bencode keys one to one; the normalized model lives in
//! [`super::meta`].

use crate::bencode::Value;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;

/// A bencode byte string read as text. Legacy torrents store names in the
/// codepage given by `encoding`, so invalid UTF-8 is replaced, not rejected.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Text(String);

struct TextVisitor;

impl<'de> Visitor<'de> for TextVisitor {
    type Value = Text;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "byte string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Text(v.to_owned()))
    }

    fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Text(String::from_utf8_lossy(v).into_owned()))
    }
}

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        d.deserialize_bytes(TextVisitor)
    }
}

fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Text::deserialize(d).map(|t| t.0)
}

fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    text(d).map(Some)
}

fn text_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let list = Vec::<Text>::deserialize(d)?;
    Ok(list.into_iter().map(|t| t.0).collect())
}

fn text_tiers<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<Vec<String>>>, D::Error> {
    let tiers = Vec::<Vec<Text>>::deserialize(d)?;
    Ok(Some(
        tiers
            .into_iter()
            .map(|tier| tier.into_iter().map(|t| t.0).collect())
            .collect(),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawFile {
    pub length: u64,

    #[serde(default, deserialize_with = "text_list")]
    pub path: Vec<String>,

    #[serde(default, deserialize_with = "opt_text")]
    pub attr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawInfo {
    #[serde(default, deserialize_with = "text")]
    pub name: String,

    #[serde(default, rename = "piece length")]
    pub piece_length: u64,

    #[serde(default, with = "serde_bytes")]
    pub pieces: Vec<u8>,

    #[serde(default)]
    pub length: Option<u64>,

    #[serde(default)]
    pub files: Option<Vec<RawFile>>,

    #[serde(default, rename = "meta version")]
    pub meta_version: Option<i64>,

    #[serde(default)]
    pub private: Option<bool>,

    // bep-0052
    #[serde(default, rename = "file tree")]
    pub file_tree: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawTorrent {
    #[serde(default, deserialize_with = "opt_text")]
    pub announce: Option<String>,

    #[serde(default, rename = "announce-list", deserialize_with = "text_tiers")]
    pub announce_list: Option<Vec<Vec<String>>>,

    #[serde(default, deserialize_with = "opt_text")]
    pub comment: Option<String>,

    #[serde(default, rename = "created by", deserialize_with = "opt_text")]
    pub created_by: Option<String>,

    #[serde(default, rename = "creation date")]
    pub creation_date: Option<i64>,

    #[serde(default, deserialize_with = "opt_text")]
    pub encoding: Option<String>,

    // bep-0019: either one url or a list of them
    #[serde(default, rename = "url-list")]
    pub url_list: Option<Value>,

    // bep-0005: list of [host, port] pairs
    #[serde(default)]
    pub nodes: Option<Vec<Value>>,
}

impl RawTorrent {
    pub fn url_list(&self) -> Vec<String> {
        match &self.url_list {
            Some(Value::List(list)) => list
                .iter()
                .filter_map(Value::as_text)
                .filter(|s| !s.is_empty())
                .map(|s| s.into_owned())
                .collect(),
            Some(v) => v
                .as_text()
                .filter(|s| !s.is_empty())
                .map(|s| vec![s.into_owned()])
                .unwrap_or_default(),
            None => vec![],
        }
    }
}
