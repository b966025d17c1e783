use super::{Result, Value};
use byteorder::WriteBytesExt;
use std::io::Write;

/// Writes a [`Value`] tree in canonical bencode (dictionary keys sorted).
pub struct Encoder<W> {
    w: W,
}

impl<W: Write> Encoder<W> {
    pub fn new(output: W) -> Self {
        Self { w: output }
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    fn write_bytes(&mut self, b: &[u8]) -> Result<()> {
        write!(self.w, "{}", b.len())?;
        self.w.write_u8(b':')?;
        self.w.write_all(b)?;
        Ok(())
    }

    pub fn encode(&mut self, v: &Value) -> Result<()> {
        match v {
            Value::Bytes(b) => self.write_bytes(b)?,
            Value::String(s) => self.write_bytes(s.as_bytes())?,
            Value::Integer(i) => {
                self.w.write_u8(b'i')?;
                write!(self.w, "{i}")?;
                self.w.write_u8(b'e')?;
            }
            Value::List(list) => {
                self.w.write_u8(b'l')?;
                for item in list {
                    self.encode(item)?;
                }
                self.w.write_u8(b'e')?;
            }
            Value::Dictionary(m) => {
                self.w.write_u8(b'd')?;
                for (k, v) in m {
                    self.write_bytes(k.as_bytes())?;
                    self.encode(v)?;
                }
                self.w.write_u8(b'e')?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_output() {
        let v: Value = [
            ("name", Value::from("a.txt")),
            ("length", Value::from(-3)),
            ("list", Value::List(vec![Value::from(b"\x00\x01".as_slice())])),
        ]
        .into_iter()
        .collect();
        let mut enc = Encoder::new(vec![]);
        enc.encode(&v).unwrap();
        assert_eq!(
            enc.into_inner(),
            b"d6:lengthi-3e4:listl2:\x00\x01e4:name5:a.txte"
        );
    }
}
