use std::io::{Cursor, Read, Seek};

use binrw::{BinRead, BinResult, Endian};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::error::{PigError, Result};

/// Sequential little-endian reader over one fully loaded input buffer.
pub type Reader<'a> = Cursor<&'a [u8]>;

#[inline]
pub fn remaining(reader: &Reader) -> u64 {
    (reader.get_ref().len() as u64).saturating_sub(reader.position())
}

/// Reads one fixed-layout record.
pub fn read_record<T>(reader: &mut Reader, what: &'static str) -> Result<T>
where T: for<'a> BinRead<Args<'a> = ()> {
    let offset = reader.position();
    T::read_options(reader, Endian::Little, ())
        .map_err(|e| PigError::from_binrw(e, what, offset, remaining_from(reader, offset)))
}

/// Reads the u32 record ident and checks it against `expected`.
pub fn expect_ident(reader: &mut Reader, record: &'static str, expected: u32) -> Result<()> {
    let offset = reader.position();
    let found: u32 = read_record(reader, record)?;
    if found != expected {
        return Err(PigError::BadIdent { record, offset, expected, found });
    }
    Ok(())
}

#[inline]
pub fn peek_u32(reader: &Reader) -> Option<u32> {
    let pos = reader.position() as usize;
    let bytes = reader.get_ref().get(pos..pos.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

/// Advances to the next multiple of `alignment` from the start of the buffer.
pub fn align(reader: &mut Reader, alignment: u64) -> Result<()> {
    let offset = reader.position();
    let aligned = (offset + alignment - 1) / alignment * alignment;
    skip(reader, aligned - offset, "alignment padding")
}

pub fn skip(reader: &mut Reader, count: u64, what: &'static str) -> Result<()> {
    let offset = reader.position();
    let available = remaining(reader);
    if count > available {
        return Err(PigError::PayloadTooSmall { what, offset, needed: count, available });
    }
    reader.set_position(offset + count);
    Ok(())
}

/// Skips a run of zero u32 words of unknown length.
pub fn skip_zero_words(reader: &mut Reader) -> Result<u64> {
    let mut skipped = 0;
    loop {
        match peek_u32(reader) {
            Some(0) => {
                reader.set_position(reader.position() + 4);
                skipped += 1;
            }
            Some(_) => return Ok(skipped),
            None => {
                return Err(PigError::UnexpectedEof {
                    what: "block padding",
                    offset: reader.position(),
                    available: remaining(reader),
                })
            }
        }
    }
}

/// Borrows the next `len` bytes and advances past them.
pub fn read_slice<'a>(reader: &mut Reader<'a>, len: u64, what: &'static str) -> Result<&'a [u8]> {
    let offset = reader.position();
    let available = remaining(reader);
    if len > available {
        return Err(PigError::PayloadTooSmall { what, offset, needed: len, available });
    }
    let data: &'a [u8] = *reader.get_ref();
    reader.set_position(offset + len);
    Ok(&data[offset as usize..(offset + len) as usize])
}

/// Reads `count` plain-old-data elements in one go.
pub fn read_vec<T>(reader: &mut Reader, count: usize, what: &'static str) -> Result<Vec<T>>
where T: FromBytes + FromZeroes + AsBytes {
    let offset = reader.position();
    let mut ret = <T>::new_vec_zeroed(count);
    reader
        .read_exact(ret.as_mut_slice().as_bytes_mut())
        .map_err(|e| PigError::from_io(e, what, offset, remaining_from(reader, offset)))?;
    Ok(ret)
}

fn remaining_from(reader: &Reader, offset: u64) -> u64 {
    (reader.get_ref().len() as u64).saturating_sub(offset)
}

/// binrw parser for a u16 length-prefixed string.
pub fn read_string<R: Read + Seek>(reader: &mut R, endian: Endian, _: ()) -> BinResult<String> {
    let len = u16::read_options(reader, endian, ())?;
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
