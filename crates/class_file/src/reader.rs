use byteorder::{BigEndian, ByteOrder};

use crate::{ClassFileError, Result};

type Endian = BigEndian;

// All multi-byte values in a class file are stored in big-endian order.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}
impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    // A failed read leaves the position where it was.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ClassFileError::TruncatedInput {
                offset: self.pos,
                needed: n,
            });
        }

        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_remaining(&mut self) -> &'a [u8] {
        let bytes = &self.buf[self.pos..];
        self.pos = self.buf.len();
        bytes
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(Endian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(Endian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(Endian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(Endian::read_i64(self.read_bytes(8)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(Endian::read_f32(self.read_bytes(4)?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(Endian::read_f64(self.read_bytes(8)?))
    }
}

#[cfg(test)]
mod reader_tests {
    use super::*;

    #[test]
    fn it_should_read_fixed_width_values_big_endian() {
        let mut r = Reader::new(&[0x12, 0x34, 0x56, 0x78, 0x9a]);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u8().unwrap(), 0x56);
        assert_eq!(r.read_u16().unwrap(), 0x789a);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn it_should_track_the_position() {
        let mut r = Reader::new(&[0, 0, 0, 1, 2]);
        assert_eq!(r.position(), 0);
        r.read_u32().unwrap();
        assert_eq!(r.position(), 4);
        assert_eq!(r.remaining(), 1);
    }

    #[test]
    fn it_should_fail_if_there_is_not_enough_data() {
        let mut r = Reader::new(&[0x12, 0x34, 0x56]);
        r.read_u16().unwrap();
        assert!(matches!(
            r.read_u32(),
            Err(ClassFileError::TruncatedInput {
                offset: 2,
                needed: 4,
            })
        ));
    }

    #[test]
    fn it_should_not_advance_past_a_failed_read() {
        let mut r = Reader::new(&[0xab]);
        assert!(r.read_u16().is_err());
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_u8().unwrap(), 0xab);
    }

    #[test]
    fn it_should_read_the_remaining_bytes() {
        let mut r = Reader::new(&[1, 2, 3]);
        r.read_u8().unwrap();
        assert_eq!(r.read_remaining(), &[2, 3]);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn it_should_allow_empty_reads_at_the_end() {
        let mut r = Reader::new(&[]);
        assert_eq!(r.read_bytes(0).unwrap(), &[] as &[u8]);
        assert_eq!(r.read_remaining(), &[] as &[u8]);
    }
}
