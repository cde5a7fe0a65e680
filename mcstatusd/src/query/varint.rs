use tokio::io::{AsyncRead, AsyncReadExt};
use crate::query::QueryError;

/// An i32 never needs more than five 7-bit groups
pub const MAX_VARINT_LEN: usize = 5;

pub fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !0x7f == 0 {
            buf.push(value as u8);
            return;
        }
        buf.push((value & 0x7f) as u8 | 0x80);
        value >>= 7;
    }
}

/// Length-prefixed UTF-8 string
pub fn write_string(buf: &mut Vec<u8>, value: &str) {
    write_varint(buf, value.len() as i32);
    buf.extend_from_slice(value.as_bytes());
}

/// Decode a VarInt from the front of `buf`, returning it with the bytes consumed.
pub fn decode_varint(buf: &[u8]) -> Result<(i32, usize), QueryError> {
    let mut value: u32 = 0;
    for (i, byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value as i32, i + 1));
        }
    }

    if buf.len() >= MAX_VARINT_LEN {
        Err(QueryError::Malformed("VarInt is too long".into()))
    } else {
        Err(QueryError::Malformed("VarInt is truncated".into()))
    }
}

pub async fn read_varint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i32, QueryError> {
    let mut value: u32 = 0;
    for i in 0..MAX_VARINT_LEN {
        let byte = reader.read_u8().await?;
        value |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(QueryError::Malformed("VarInt is too long".into()))
}
