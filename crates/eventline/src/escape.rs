//! Byte-level escaping applied to everything entering the buffer.
//!
//! Seven bytes are rewritten into two-byte backslash sequences so the
//! buffered content can be embedded in a JSON string verbatim. Every other
//! byte, including arbitrary non-ASCII values, passes through untouched.

const fn identity_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = i as u8;
        i += 1;
    }
    table
}

static IDENTITY: [u8; 256] = identity_table();

/// Escaped form of `byte`: either a two-byte sequence from the table or the
/// byte itself.
pub fn escaped(byte: u8) -> &'static [u8] {
    match byte {
        0x08 => b"\\b",
        0x0C => b"\\f",
        b'\r' => b"\\r",
        b'\n' => b"\\n",
        b'\t' => b"\\t",
        b'\\' => b"\\\\",
        b'"' => b"\\\"",
        _ => std::slice::from_ref(&IDENTITY[byte as usize]),
    }
}

/// True when `escaped` would rewrite `byte`.
pub fn needs_escape(byte: u8) -> bool {
    matches!(byte, 0x08 | 0x0C | b'\r' | b'\n' | b'\t' | b'\\' | b'"')
}
