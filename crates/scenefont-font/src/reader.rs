//! Big-endian binary reader and writer helpers for font data

/// Reader ran past the end of its buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unexpected end of data at offset {0}")]
pub struct ReadError(pub usize);

/// Binary reader with bounds checking
#[derive(Debug, Clone)]
pub struct FontReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FontReader<'a> {
    /// Create a new reader
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current position
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Skip bytes
    pub fn skip(&mut self, n: usize) -> Result<(), ReadError> {
        self.read_bytes(n).map(|_| ())
    }

    /// Read u8
    pub fn read_u8(&mut self) -> Result<u8, ReadError> {
        let v = *self.data.get(self.pos).ok_or(ReadError(self.pos))?;
        self.pos += 1;
        Ok(v)
    }

    /// Read big-endian u16
    pub fn read_u16(&mut self) -> Result<u16, ReadError> {
        let b = self.read_array::<2>()?;
        Ok(u16::from_be_bytes(b))
    }

    /// Read big-endian i16
    pub fn read_i16(&mut self) -> Result<i16, ReadError> {
        Ok(self.read_u16()? as i16)
    }

    /// Read big-endian u32
    pub fn read_u32(&mut self) -> Result<u32, ReadError> {
        let b = self.read_array::<4>()?;
        Ok(u32::from_be_bytes(b))
    }

    /// Read 4-byte tag
    pub fn read_tag(&mut self) -> Result<[u8; 4], ReadError> {
        self.read_array::<4>()
    }

    /// Read bytes
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
        let end = self.pos.checked_add(n).ok_or(ReadError(self.pos))?;
        let slice = self.data.get(self.pos..end).ok_or(ReadError(self.pos))?;
        self.pos = end;
        Ok(slice)
    }

    /// Read a WOFF2 `255UInt16`
    pub fn read_255_u16(&mut self) -> Result<u16, ReadError> {
        match self.read_u8()? {
            253 => self.read_u16(),
            254 => Ok(self.read_u8()? as u16 + 253 * 2),
            255 => Ok(self.read_u8()? as u16 + 253),
            code => Ok(code as u16),
        }
    }

    /// Read a WOFF2 `UIntBase128`. Leading zeros and values above
    /// `u32::MAX` are rejected.
    pub fn read_base128(&mut self) -> Result<u32, ReadError> {
        let start = self.pos;
        let mut value = 0u32;
        for i in 0..5 {
            let byte = self.read_u8()?;
            if i == 0 && byte == 0x80 {
                return Err(ReadError(start));
            }
            if value & 0xFE00_0000 != 0 {
                return Err(ReadError(start));
            }
            value = (value << 7) | (byte & 0x7F) as u32;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ReadError(start))
    }

    /// Remaining bytes
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ReadError> {
        let slice = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }
}

/// Big-endian writes onto a byte buffer
pub trait FontWrite {
    fn write_u8(&mut self, v: u8);
    fn write_u16(&mut self, v: u16);
    fn write_i16(&mut self, v: i16);
    fn write_u32(&mut self, v: u32);
    fn write_255_u16(&mut self, v: u16);
    fn write_base128(&mut self, v: u32);
    /// Zero-pad to a multiple of four bytes
    fn pad4(&mut self);
}

impl FontWrite for Vec<u8> {
    fn write_u8(&mut self, v: u8) {
        self.push(v);
    }

    fn write_u16(&mut self, v: u16) {
        self.extend_from_slice(&v.to_be_bytes());
    }

    fn write_i16(&mut self, v: i16) {
        self.extend_from_slice(&v.to_be_bytes());
    }

    fn write_u32(&mut self, v: u32) {
        self.extend_from_slice(&v.to_be_bytes());
    }

    fn write_255_u16(&mut self, v: u16) {
        if v < 253 {
            self.push(v as u8);
        } else if v < 506 {
            self.push(255);
            self.push((v - 253) as u8);
        } else if v < 762 {
            self.push(254);
            self.push((v - 506) as u8);
        } else {
            self.push(253);
            self.write_u16(v);
        }
    }

    fn write_base128(&mut self, v: u32) {
        let mut len = 1;
        let mut rest = v >> 7;
        while rest != 0 {
            len += 1;
            rest >>= 7;
        }
        for i in (0..len).rev() {
            let mut byte = ((v >> (7 * i)) & 0x7F) as u8;
            if i != 0 {
                byte |= 0x80;
            }
            self.push(byte);
        }
    }

    fn pad4(&mut self) {
        while self.len() % 4 != 0 {
            self.push(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u16() {
        let data = [0x12, 0x34, 0x56, 0x78];
        let mut reader = FontReader::new(&data);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u16().unwrap(), 0x5678);
        assert_eq!(reader.read_u8(), Err(ReadError(4)));
    }

    #[test]
    fn test_read_tag() {
        let data = b"headtest";
        let mut reader = FontReader::new(data);
        assert_eq!(reader.read_tag().unwrap(), *b"head");
        assert_eq!(reader.remaining(), 4);
    }

    #[test]
    fn test_255_u16_codes() {
        let mut reader = FontReader::new(&[100, 255, 50, 254, 0, 253, 0x10, 0x00]);
        assert_eq!(reader.read_255_u16().unwrap(), 100);
        assert_eq!(reader.read_255_u16().unwrap(), 303);
        assert_eq!(reader.read_255_u16().unwrap(), 506);
        assert_eq!(reader.read_255_u16().unwrap(), 0x1000);
    }

    #[test]
    fn test_255_u16_write_boundaries() {
        for v in [0u16, 252, 253, 505, 506, 761, 762, 4096, u16::MAX] {
            let mut buf = Vec::new();
            buf.write_255_u16(v);
            assert_eq!(FontReader::new(&buf).read_255_u16().unwrap(), v, "value {v}");
        }
    }

    #[test]
    fn test_base128() {
        let mut reader = FontReader::new(&[0x3F, 0x81, 0x00, 0x8F, 0xFF, 0xFF, 0xFF, 0x7F]);
        assert_eq!(reader.read_base128().unwrap(), 63);
        assert_eq!(reader.read_base128().unwrap(), 128);
        assert_eq!(reader.read_base128().unwrap(), u32::MAX);

        let mut buf = Vec::new();
        buf.write_base128(128);
        assert_eq!(buf, [0x81, 0x00]);
    }

    #[test]
    fn test_base128_rejects_leading_zero() {
        let mut reader = FontReader::new(&[0x80, 0x01]);
        assert!(reader.read_base128().is_err());
    }
}
