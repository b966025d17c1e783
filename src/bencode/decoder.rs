use super::{Error, Result, Value};
use std::collections::BTreeMap;

const MAX_DEPTH: usize = 64;

/// Bencode decoder over an in-memory buffer.
///
/// The decoder keeps its byte position so callers can recover the exact
/// source range of any value it walked over.
pub struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Decodes the first value, ignoring anything after it.
    pub fn decode(&mut self) -> Result<Value> {
        self.next_value(0)
    }

    /// Decodes the first value and returns the bytes following it.
    pub fn decode_partial(&mut self) -> Result<(Value, &'a [u8])> {
        let val = self.next_value(0)?;
        Ok((val, &self.input[self.pos..]))
    }

    /// Walks a top-level dictionary and returns the undecoded bytes of the
    /// value stored under `key`. A repeated `key` is an error, matching
    /// [`Decoder::decode`].
    pub fn raw_entry(&mut self, key: &str) -> Result<Option<&'a [u8]>> {
        self.consume_byte(b'd')?;
        let mut found = None;
        while self.peek_byte()? != b'e' {
            let k = self.read_bytes()?;
            let start = self.pos;
            self.next_value(1)?;
            if k == key.as_bytes() {
                if found.is_some() {
                    return Err(Error::Decode(format!("duplicate key {key:?}")));
                }
                found = Some(&self.input[start..self.pos]);
            }
        }
        self.consume_end()?;
        Ok(found)
    }

    fn next_value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(Error::Decode("nesting too deep".into()));
        }
        let v = match self.peek_byte()? {
            b'i' => Value::Integer(self.read_integer()?),
            b'l' => Value::List(self.read_list(depth)?),
            b'd' => Value::Dictionary(self.read_dictionary(depth)?),
            b'0'..=b'9' => Value::Bytes(self.read_bytes()?.to_vec()),
            b => {
                return Err(Error::Decode(format!(
                    "unrecognized data type {:?} at offset {}",
                    b as char, self.pos
                )))
            }
        };
        Ok(v)
    }

    fn read_dictionary(&mut self, depth: usize) -> Result<BTreeMap<String, Value>> {
        self.consume_byte(b'd')?;
        let mut m = BTreeMap::new();
        while self.peek_byte()? != b'e' {
            let raw = self.read_bytes()?;
            let key = String::from_utf8_lossy(raw).into_owned();
            let value = self.next_value(depth + 1)?;
            // also catches distinct non-UTF-8 keys that decode to the same text
            if m.insert(key, value).is_some() {
                return Err(Error::Decode(format!(
                    "duplicate dictionary key {:?}",
                    String::from_utf8_lossy(raw)
                )));
            }
        }
        self.consume_end()?;
        Ok(m)
    }

    fn read_list(&mut self, depth: usize) -> Result<Vec<Value>> {
        self.consume_byte(b'l')?;
        let mut v = vec![];
        while self.peek_byte()? != b'e' {
            v.push(self.next_value(depth + 1)?);
        }
        self.consume_end()?;
        Ok(v)
    }

    fn read_integer(&mut self) -> Result<i64> {
        self.consume_byte(b'i')?;
        let digits = self.take_until(b'e')?;
        let s = std::str::from_utf8(digits)
            .map_err(|_| Error::Decode("integer is not ascii".into()))?;
        s.parse::<i64>()
            .map_err(|e| Error::Decode(format!("integer {s:?}: {e}")))
    }

    fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_length()?;
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.input.len())
            .ok_or_else(|| Error::Decode(format!("byte string of {len} bytes overruns input")))?;
        let b = &self.input[self.pos..end];
        self.pos = end;
        Ok(b)
    }

    fn read_length(&mut self) -> Result<usize> {
        let digits = self.take_until(b':')?;
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return Err(Error::Decode("length not found".to_string()));
        }
        String::from_utf8_lossy(digits)
            .parse::<usize>()
            .map_err(|e| Error::Decode(format!("{e}")))
    }

    // Consumes up to and including `delim`, returning the bytes before it.
    fn take_until(&mut self, delim: u8) -> Result<&'a [u8]> {
        let rest = &self.input[self.pos..];
        let n = rest
            .iter()
            .position(|b| *b == delim)
            .ok_or_else(|| Error::Decode(format!("expect byte {:?}, got end of input", delim as char)))?;
        self.pos += n + 1;
        Ok(&rest[..n])
    }

    fn consume_byte(&mut self, expected: u8) -> Result<()> {
        match self.peek_byte()? {
            actual if actual == expected => {
                self.pos += 1;
                Ok(())
            }
            b => Err(Error::Decode(format!(
                "expect byte: {:?}, actually got: {:?}",
                expected as char, b as char
            ))),
        }
    }

    fn consume_end(&mut self) -> Result<()> {
        self.consume_byte(b'e')
    }

    fn peek_byte(&self) -> Result<u8> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or_else(|| Error::Decode("unexpected end of input".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_partial_with_remain() {
        let s = b"d1:rd2:id20:abcdefghij01234567895:token8:aoeusnth6:valuesl6:axje.u6:idhtnmee1:t2:aa1:y1:re12345".as_slice();
        let (v, remain) = Decoder::new(s).decode_partial().unwrap();
        assert_eq!(remain, b"12345");
        assert_eq!(v.dict_get("y").and_then(Value::as_str), Some("r"));
    }

    #[test]
    fn raw_entry_is_byte_exact() {
        let s = b"d8:announce3:url4:infod6:lengthi5e4:name1:xe3:zzzi0ee";
        let raw = Decoder::new(s).raw_entry("info").unwrap().unwrap();
        assert_eq!(raw, b"d6:lengthi5e4:name1:xe");
        assert_eq!(Decoder::new(s).raw_entry("nope").unwrap(), None);
    }

    #[test]
    fn malformed_input() {
        for s in [
            b"d4:info".as_slice(),
            b"i12",
            b"5:abc",
            b"x",
            b"",
            b"d3:keyi1e",
        ] {
            let res = Decoder::new(s).decode();
            assert!(res.is_err(), "{:?}", String::from_utf8_lossy(s));
        }
        let (_, rest) = Decoder::new(b"l1:ae1").decode_partial().unwrap();
        assert_eq!(rest, b"1");
        assert!(Decoder::new(b"i12e").raw_entry("info").is_err());
    }

    #[test]
    fn duplicate_keys_rejected() {
        let s = b"d4:infoi1e4:infoi2ee";
        assert!(matches!(Decoder::new(s).decode(), Err(Error::Decode(_))));
        assert!(matches!(
            Decoder::new(s).raw_entry("info"),
            Err(Error::Decode(_))
        ));
        // both keys decode to U+FFFD
        let lossy = b"d1:\xffi1e1:\xfei2ee";
        assert!(Decoder::new(lossy).decode().is_err());
    }

    #[test]
    fn nesting_limit() {
        let mut s = vec![b'l'; MAX_DEPTH + 2];
        s.extend(vec![b'e'; MAX_DEPTH + 2]);
        assert!(Decoder::new(&s).decode().is_err());
    }
}
