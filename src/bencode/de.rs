use super::{Error, Result, Value};
use serde::de::{self, DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess, Visitor};
use serde::forward_to_deserialize_any;
use std::collections::btree_map;
use std::slice;

/// Drives serde over an already decoded [`Value`] tree.
pub struct Deserializer<'a> {
    value: Option<&'a Value>,
}

impl<'a> Deserializer<'a> {
    pub fn new(v: Option<&'a Value>) -> Self {
        Self { value: v }
    }
}

impl<'a, 'de> de::Deserializer<'de> for &mut Deserializer<'a> {
    type Error = Error;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value.take() {
            Some(Value::String(s)) => visitor.visit_str(s),
            Some(Value::Bytes(b)) => visitor.visit_bytes(b),
            Some(Value::Integer(i)) => visitor.visit_i64(*i),
            Some(Value::List(l)) => visitor.visit_seq(SeqAccessor { iter: l.iter() }),
            Some(Value::Dictionary(m)) => visitor.visit_map(MapAccessor {
                iter: m.iter(),
                value: None,
            }),
            None => visitor.visit_none(),
        }
    }

    fn deserialize_struct<V>(
        self,
        name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Some(Value::Dictionary(_)) => self.deserialize_any(visitor),
            Some(v) => Err(Error::Deserialize(format!(
                "{name}: expect dictionary, got {}",
                v.kind()
            ))),
            None => Err(Error::Deserialize(format!("{name}: missing value"))),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value.is_some() {
            true => visitor.visit_some(self),
            false => visitor.visit_none(),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value.take() {
            Some(Value::Integer(i)) => visitor.visit_bool(*i != 0),
            Some(v) => Err(Error::Deserialize(format!(
                "expect integer flag, got {}",
                v.kind()
            ))),
            None => visitor.visit_none(),
        }
    }

    // Skipped entries are never walked.
    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.value.take();
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier
    }
}

struct SeqAccessor<'a> {
    iter: slice::Iter<'a, Value>,
}

impl<'a, 'de> SeqAccess<'de> for SeqAccessor<'a> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(v) => seed.deserialize(&mut Deserializer::new(Some(v))).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapAccessor<'a> {
    iter: btree_map::Iter<'a, String, Value>,
    value: Option<&'a Value>,
}

impl<'a, 'de> MapAccess<'de> for MapAccessor<'a> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                let key: de::value::StrDeserializer<Error> = key.as_str().into_deserializer();
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        let value = self
            .value
            .take()
            .ok_or_else(|| Error::Deserialize("value requested before key".into()))?;
        seed.deserialize(&mut Deserializer::new(Some(value)))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}
