use crate::output::{Format, Renderer};
use crate::{Error, Result};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub output: String,
    pub filter: Option<String>,
    pub summary: bool,
    pub summary_only: bool,
    pub show_pieces: bool,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: "text".to_string(),
            filter: None,
            summary: false,
            summary_only: false,
            show_pieces: false,
            log_level: "warn".to_string(),
        }
    }
}

fn as_str<'a>(key: &str, val: &'a serde_json::Value) -> Result<&'a str> {
    val.as_str()
        .ok_or_else(|| Error::Config(format!("{key} must be a string")))
}

fn as_bool(key: &str, val: &serde_json::Value) -> Result<bool> {
    val.as_bool()
        .ok_or_else(|| Error::Config(format!("{key} must be a boolean")))
}

impl Config {
    pub fn load_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::from(e).with_path(path))?;
        let value = content
            .parse::<serde_json::Value>()
            .map_err(|e| Error::from(e).with_path(path))?;

        let mut config = Self::default();
        config.merge_json(&value).map_err(|e| e.with_path(path))?;
        Ok(config)
    }

    fn merge_json(&mut self, val: &serde_json::Value) -> Result<()> {
        let serde_json::Value::Object(table) = val else {
            return Err(Error::Config("top level must be an object".into()));
        };
        if let Some(val) = table.get("output") {
            self.output = as_str("output", val)?.to_string();
        }
        if let Some(val) = table.get("filter") {
            self.filter = match val {
                serde_json::Value::Null => None,
                val => Some(as_str("filter", val)?.to_string()),
            };
        }
        if let Some(val) = table.get("summary") {
            self.summary = as_bool("summary", val)?;
        }
        if let Some(val) = table.get("summary_only") {
            self.summary_only = as_bool("summary_only", val)?;
        }
        if let Some(val) = table.get("show_pieces") {
            self.show_pieces = as_bool("show_pieces", val)?;
        }
        if let Some(val) = table.get("log_level") {
            self.log_level = as_str("log_level", val)?.to_string();
        }
        Ok(())
    }

    pub fn renderer(&self) -> Result<Renderer> {
        Ok(Renderer {
            format: self.output.parse::<Format>()?,
            summary: self.summary,
            summary_only: self.summary_only,
            show_pieces: self.show_pieces,
        })
    }
}
