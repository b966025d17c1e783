mod de;
mod decoder;
mod encoder;
mod value;
use crate::{Error, Result};
use de::Deserializer;
pub use decoder::Decoder;
pub use encoder::Encoder;
use serde::de::DeserializeOwned;
pub use value::{Value, ValueVisitor};

/// Decodes `input` into a generic tree.
pub fn decode<B>(input: &B) -> Result<Value>
where
    B: AsRef<[u8]> + ?Sized,
{
    Decoder::new(input.as_ref()).decode()
}

/// Maps an already decoded tree onto `T`.
pub fn from_value<T>(value: &Value) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut deserializer = Deserializer::new(Some(value));
    T::deserialize(&mut deserializer)
}

pub fn from_bytes<T, B>(input: &B) -> Result<T>
where
    T: DeserializeOwned,
    B: AsRef<[u8]> + ?Sized,
{
    from_value(&decode(input)?)
}

pub fn from_str<T>(input: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    from_bytes(input.as_bytes())
}

/// Returns the exact source bytes of `key` in the top-level dictionary.
pub fn raw_dict_entry<'a, B>(input: &'a B, key: &str) -> Result<Option<&'a [u8]>>
where
    B: AsRef<[u8]> + ?Sized,
{
    Decoder::new(input.as_ref()).raw_entry(key)
}

pub fn to_bytes(value: &Value) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(vec![]);
    encoder.encode(value)?;
    Ok(encoder.into_inner())
}

pub fn to_string(value: &Value) -> Result<String> {
    let buf = to_bytes(value)?;
    String::from_utf8(buf).map_err(|e| Error::Decode(e.to_string()))
}
