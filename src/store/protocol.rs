// src/store/protocol.rs

//! memcached text protocol: the two commands the lock uses.
//!
//! Only request encoding and reply-line classification live here; the
//! socket handling is in [`super::memcache`].

/// Items stored by the lock never expire.
const NO_EXPIRY: u32 = 0;

/// Classified single-line reply from a memcached server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Stored,
    NotStored,
    Deleted,
    NotFound,
    /// `ERROR`, `CLIENT_ERROR <msg>` or `SERVER_ERROR <msg>`.
    Error(String),
    /// Anything we don't recognise.
    Unknown(String),
}

/// `add <key> <flags> <exptime> <bytes>\r\n<data>\r\n`
pub fn encode_add(key: &str, value: &[u8]) -> Vec<u8> {
    let mut buf = format!("add {key} 0 {NO_EXPIRY} {}\r\n", value.len()).into_bytes();
    buf.extend_from_slice(value);
    buf.extend_from_slice(b"\r\n");
    buf
}

/// `delete <key>\r\n`
pub fn encode_delete(key: &str) -> Vec<u8> {
    format!("delete {key}\r\n").into_bytes()
}

/// Classify one reply line. Bytes that are not UTF-8 can never form a
/// known reply, so they are decoded lossily and end up as `Unknown`.
pub fn parse_reply(line: &[u8]) -> Reply {
    let line = String::from_utf8_lossy(line);
    match line.trim_end_matches(['\r', '\n']) {
        "STORED" => Reply::Stored,
        "NOT_STORED" => Reply::NotStored,
        "DELETED" => Reply::Deleted,
        "NOT_FOUND" => Reply::NotFound,
        "ERROR" => Reply::Error("ERROR".to_string()),
        other if other.starts_with("CLIENT_ERROR") || other.starts_with("SERVER_ERROR") => {
            Reply::Error(other.to_string())
        }
        other => Reply::Unknown(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_request_carries_length_and_payload() {
        let req = encode_add("mutex-default", b"HI");
        assert_eq!(req, b"add mutex-default 0 0 2\r\nHI\r\n".to_vec());
    }

    #[test]
    fn delete_request_is_single_line() {
        assert_eq!(encode_delete("k"), b"delete k\r\n".to_vec());
    }

    #[test]
    fn classifies_replies() {
        assert_eq!(parse_reply(b"STORED\r\n"), Reply::Stored);
        assert_eq!(parse_reply(b"NOT_STORED\r\n"), Reply::NotStored);
        assert_eq!(parse_reply(b"DELETED\r\n"), Reply::Deleted);
        assert_eq!(parse_reply(b"NOT_FOUND\r\n"), Reply::NotFound);
        assert_eq!(
            parse_reply(b"SERVER_ERROR out of memory\r\n"),
            Reply::Error("SERVER_ERROR out of memory".to_string())
        );
        assert_eq!(parse_reply(b"ERROR\r\n"), Reply::Error("ERROR".to_string()));
        assert_eq!(parse_reply(b"EXISTS\r\n"), Reply::Unknown("EXISTS".to_string()));
    }

    #[test]
    fn invalid_utf8_is_unknown() {
        let reply = parse_reply(b"STO\xffRED\r\n");
        assert!(matches!(reply, Reply::Unknown(ref text) if text.starts_with("STO")));
    }
}
