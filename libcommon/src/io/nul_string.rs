use std::io::{self, Error, ErrorKind, Read, Write};

/// Reads/writes the NUL-terminated UTF-8 strings used throughout the save
/// record (§4.6): description text, current label name, current dialogue
/// name, every cast/image/sound name.
pub trait ReadNulStringExt: Read {
    #[inline]
    fn read_nul_string(&mut self) -> io::Result<String> {
        let mut raw = Vec::with_capacity(16);
        for byte in self.bytes() {
            match byte? {
                0 => return String::from_utf8(raw).map_err(|e| Error::new(ErrorKind::InvalidData, e)),
                b => raw.push(b),
            }
        }
        Err(ErrorKind::UnexpectedEof.into())
    }
}
impl<T: Read + ?Sized> ReadNulStringExt for T {}

pub trait WriteNulStringExt: Write {
    #[inline]
    fn write_nul_string(&mut self, value: &str) -> io::Result<()> {
        self.write_all(value.as_bytes())?;
        self.write_all(&[0])
    }
}
impl<T: Write + ?Sized> WriteNulStringExt for T {}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_nul_terminated_string() {
        let mut buf = Vec::new();
        buf.write_nul_string("saveN").unwrap();
        buf.extend_from_slice(b"trailing");
        let mut reader = Cursor::new(buf);
        assert_eq!(reader.read_nul_string().unwrap(), "saveN");
    }

    #[test]
    fn rejects_an_unterminated_string() {
        let mut reader = Cursor::new(b"no-terminator".to_vec());
        assert!(reader.read_nul_string().is_err());
    }
}
