//! I/O 支持：构造描述的 JSON 与 RON 读写，格式按扩展名选择。
use std::fs;
use std::path::Path;

use ron::ser::PrettyConfig;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::net::descriptor::NetDescriptor;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),
    #[error("ron parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported descriptor extension: {0:?}")]
    UnknownFormat(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Ron,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Ok(Format::Json),
            Some("ron") => Ok(Format::Ron),
            _ => Err(IoError::UnknownFormat(ext)),
        }
    }
}

pub fn to_json_string<T>(value: &T) -> Result<String, IoError>
where
    T: Serialize,
{
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_json_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(serde_json::from_str(s)?)
}

pub fn to_ron_string<T>(value: &T) -> Result<String, IoError>
where
    T: Serialize,
{
    Ok(ron::ser::to_string_pretty(value, PrettyConfig::default())?)
}

pub fn from_ron_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(ron::from_str(s)?)
}

pub fn read_descriptor<P: AsRef<Path>>(path: P) -> Result<NetDescriptor, IoError> {
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    let content = fs::read_to_string(path)?;
    let descriptor = match format {
        Format::Json => from_json_str(&content)?,
        Format::Ron => from_ron_str(&content)?,
    };
    log::debug!("loaded net descriptor from {}", path.display());
    Ok(descriptor)
}

pub fn write_descriptor<P: AsRef<Path>>(path: P, descriptor: &NetDescriptor) -> Result<(), IoError> {
    let path = path.as_ref();
    let content = match Format::from_path(path)? {
        Format::Json => to_json_string(descriptor)?,
        Format::Ron => to_ron_string(descriptor)?,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::descriptor::{ArcDesc, PlaceDesc, TransitionDesc};
    use crate::net::structure::Delay;

    fn sample() -> NetDescriptor {
        NetDescriptor::new(
            vec![PlaceDesc::new("A").tokens(1), PlaceDesc::new("B").capacity(2)],
            vec![
                TransitionDesc::priority("T1", 3),
                TransitionDesc::timed("T2", Delay::Uniform { min: 1.0, max: 2.0 }),
            ],
            vec![ArcDesc::new("A", "T1"), ArcDesc::new("T1", "B").weight(2)],
        )
    }

    #[test]
    fn ron_text_reads_back() {
        let text = to_ron_string(&sample()).unwrap();
        let back: NetDescriptor = from_ron_str(&text).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(Format::from_path(Path::new("net.JSON")).unwrap(), Format::Json);
        assert_eq!(Format::from_path(Path::new("a/b.ron")).unwrap(), Format::Ron);
        assert!(matches!(
            Format::from_path(Path::new("net.yaml")),
            Err(IoError::UnknownFormat(Some(_)))
        ));
    }
}
