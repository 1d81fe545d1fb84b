//! Client side of the RESP2 protocol.
//!
//! Only what a snapshot fetch needs: commands are encoded as arrays of bulk
//! strings, and replies are parsed incrementally from a byte buffer that may
//! hold a partial reply.

use bytes::{BufMut, Bytes, BytesMut};
use ciq_core::RetrievalError;

/// Maximum nesting depth for arrays.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Maximum bulk string size (512MB, the server-side limit).
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array elements.
pub const MAX_ELEMENTS: usize = 1_000_000;

/// A RESP2 reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// `+OK`
    SimpleString(String),
    /// `-ERR message`
    Error(String),
    /// `:42`
    Integer(i64),
    /// `$n` payload, `None` for the null bulk string `$-1`
    BulkString(Option<Bytes>),
    /// `*n` elements, `None` for the null array `*-1`
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    /// Short name of the reply type, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RespValue::SimpleString(_) => "simple string",
            RespValue::Error(_) => "error",
            RespValue::Integer(_) => "integer",
            RespValue::BulkString(_) => "bulk string",
            RespValue::Array(_) => "array",
        }
    }
}

/// Encode a command as an array of bulk strings.
pub fn encode_command(args: &[&[u8]], buf: &mut BytesMut) {
    buf.put_u8(b'*');
    buf.put_slice(args.len().to_string().as_bytes());
    buf.put_slice(b"\r\n");
    for arg in args {
        buf.put_u8(b'$');
        buf.put_slice(arg.len().to_string().as_bytes());
        buf.put_slice(b"\r\n");
        buf.put_slice(arg);
        buf.put_slice(b"\r\n");
    }
}

/// Parse one reply from the front of `data`.
///
/// Returns `Ok(None)` when `data` holds only part of a reply, or the parsed
/// value together with the number of bytes it occupied.
pub fn parse_reply(data: &[u8]) -> Result<Option<(RespValue, usize)>, RetrievalError> {
    parse_value(data, 0)
}

fn parse_value(data: &[u8], depth: usize) -> Result<Option<(RespValue, usize)>, RetrievalError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(protocol("maximum nesting depth exceeded"));
    }

    let Some(&type_byte) = data.first() else {
        return Ok(None);
    };
    let Some(line_end) = find_crlf(&data[1..]) else {
        return Ok(None);
    };
    let line = &data[1..1 + line_end];
    // Offset of the first byte after the header line.
    let body = 1 + line_end + 2;

    match type_byte {
        b'+' => Ok(Some((
            RespValue::SimpleString(String::from_utf8_lossy(line).into_owned()),
            body,
        ))),
        b'-' => Ok(Some((
            RespValue::Error(String::from_utf8_lossy(line).into_owned()),
            body,
        ))),
        b':' => {
            let n = parse_int(line, "integer")?;
            Ok(Some((RespValue::Integer(n), body)))
        }
        b'$' => {
            let len = parse_int(line, "bulk string length")?;
            if len == -1 {
                return Ok(Some((RespValue::BulkString(None), body)));
            }
            let len = usize::try_from(len)
                .map_err(|_| protocol("invalid bulk string length"))?;
            if len > MAX_BULK_SIZE {
                return Err(protocol(&format!(
                    "bulk string too large: {} > {}",
                    len, MAX_BULK_SIZE
                )));
            }

            let end = body + len;
            if data.len() < end + 2 {
                return Ok(None);
            }
            if &data[end..end + 2] != b"\r\n" {
                return Err(protocol("missing CRLF after bulk string"));
            }

            let payload = Bytes::copy_from_slice(&data[body..end]);
            Ok(Some((RespValue::BulkString(Some(payload)), end + 2)))
        }
        b'*' => {
            let len = parse_int(line, "array length")?;
            if len == -1 {
                return Ok(Some((RespValue::Array(None), body)));
            }
            let len = usize::try_from(len).map_err(|_| protocol("invalid array length"))?;
            if len > MAX_ELEMENTS {
                return Err(protocol(&format!(
                    "array too large: {} > {}",
                    len, MAX_ELEMENTS
                )));
            }

            let mut elements = Vec::with_capacity(len.min(64));
            let mut offset = body;
            for _ in 0..len {
                match parse_value(&data[offset..], depth + 1)? {
                    Some((value, consumed)) => {
                        elements.push(value);
                        offset += consumed;
                    }
                    None => return Ok(None),
                }
            }
            Ok(Some((RespValue::Array(Some(elements)), offset)))
        }
        other => Err(protocol(&format!(
            "unexpected reply type byte 0x{:02x}",
            other
        ))),
    }
}

fn parse_int(line: &[u8], what: &str) -> Result<i64, RetrievalError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| protocol(&format!("invalid {}", what)))
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}

fn protocol(reason: &str) -> RetrievalError {
    RetrievalError::Protocol {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_complete(data: &[u8]) -> RespValue {
        match parse_reply(data) {
            Ok(Some((value, consumed))) => {
                assert_eq!(consumed, data.len(), "reply not fully consumed");
                value
            }
            other => panic!("expected a complete reply, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_get_command() {
        let mut buf = BytesMut::new();
        encode_command(&[b"GET", b"Stock"], &mut buf);
        assert_eq!(&buf[..], b"*2\r\n$3\r\nGET\r\n$5\r\nStock\r\n");
    }

    #[test]
    fn test_encode_binary_safe_argument() {
        let mut buf = BytesMut::new();
        encode_command(&[b"AUTH", b"p\r\nss"], &mut buf);
        assert_eq!(&buf[..], b"*2\r\n$4\r\nAUTH\r\n$6\r\np\r\nss\r\n");
    }

    #[test]
    fn test_parse_simple_string() {
        assert_eq!(
            parse_complete(b"+OK\r\n"),
            RespValue::SimpleString("OK".to_string())
        );
    }

    #[test]
    fn test_parse_error() {
        assert_eq!(
            parse_complete(b"-WRONGPASS invalid username-password pair\r\n"),
            RespValue::Error("WRONGPASS invalid username-password pair".to_string())
        );
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_complete(b":1000\r\n"), RespValue::Integer(1000));
        assert_eq!(parse_complete(b":-3\r\n"), RespValue::Integer(-3));
    }

    #[test]
    fn test_parse_bulk_string() {
        assert_eq!(
            parse_complete(b"$6\r\nfoobar\r\n"),
            RespValue::BulkString(Some(Bytes::from_static(b"foobar")))
        );
        assert_eq!(
            parse_complete(b"$0\r\n\r\n"),
            RespValue::BulkString(Some(Bytes::new()))
        );
    }

    #[test]
    fn test_parse_bulk_string_with_embedded_crlf() {
        assert_eq!(
            parse_complete(b"$4\r\na\r\nb\r\n"),
            RespValue::BulkString(Some(Bytes::from_static(b"a\r\nb")))
        );
    }

    #[test]
    fn test_parse_null_bulk_string() {
        assert_eq!(parse_complete(b"$-1\r\n"), RespValue::BulkString(None));
    }

    #[test]
    fn test_parse_array() {
        assert_eq!(
            parse_complete(b"*2\r\n$3\r\nfoo\r\n:7\r\n"),
            RespValue::Array(Some(vec![
                RespValue::BulkString(Some(Bytes::from_static(b"foo"))),
                RespValue::Integer(7),
            ]))
        );
        assert_eq!(parse_complete(b"*-1\r\n"), RespValue::Array(None));
    }

    #[test]
    fn test_incomplete_replies() -> Result<(), RetrievalError> {
        assert!(parse_reply(b"")?.is_none());
        assert!(parse_reply(b"+OK")?.is_none());
        assert!(parse_reply(b"$6\r\nfoo")?.is_none());
        assert!(parse_reply(b"$6\r\nfoobar")?.is_none());
        assert!(parse_reply(b"*2\r\n:1\r\n")?.is_none());
        Ok(())
    }

    #[test]
    fn test_trailing_bytes_are_left_for_next_reply() -> Result<(), RetrievalError> {
        let data = b"+OK\r\n$2\r\nhi\r\n";
        let (first, consumed) = parse_reply(data)?.ok_or_else(|| protocol("incomplete"))?;
        assert_eq!(first, RespValue::SimpleString("OK".to_string()));
        assert_eq!(consumed, 5);

        let (second, _) = parse_reply(&data[consumed..])?.ok_or_else(|| protocol("incomplete"))?;
        assert_eq!(
            second,
            RespValue::BulkString(Some(Bytes::from_static(b"hi")))
        );
        Ok(())
    }

    #[test]
    fn test_malformed_replies() {
        assert!(parse_reply(b"?what\r\n").is_err());
        assert!(parse_reply(b":abc\r\n").is_err());
        assert!(parse_reply(b"$-5\r\n").is_err());
        assert!(parse_reply(b"$3\r\nfooXY").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let mut data = Vec::new();
        for _ in 0..=MAX_NESTING_DEPTH + 1 {
            data.extend_from_slice(b"*1\r\n");
        }
        data.extend_from_slice(b":1\r\n");
        assert!(parse_reply(&data).is_err());
    }
}
