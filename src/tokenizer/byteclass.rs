// Copyright 2025 The xmpp5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Byte classification and strict UTF-8 decoding.
//!
//! The scanner dispatches on a per-byte class rather than on decoded
//! characters; only multi-byte sequences are decoded, and only to check
//! them against the XML character and name productions.

use self::ByteType::*;

/// The class of a single input byte as seen by the scan state machines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteType {
    /// A byte that can never appear in a well-formed XML document.
    Nonxml,
    /// A byte that is never valid at the start of a UTF-8 sequence.
    Malformed,
    /// Lead byte of a 2-byte UTF-8 sequence.
    Lead2,
    /// Lead byte of a 3-byte UTF-8 sequence.
    Lead3,
    /// Lead byte of a 4-byte UTF-8 sequence.
    Lead4,
    /// Space or tab.
    S,
    /// Carriage return.
    Cr,
    /// Line feed.
    Lf,
    /// `<`
    Lt,
    /// `&`
    Amp,
    /// `>`
    Gt,
    /// `/`
    Sol,
    /// `?`
    Quest,
    /// `!`
    Excl,
    /// `=`
    Equals,
    /// `"`
    Quot,
    /// `'`
    Apos,
    /// `;`
    Semi,
    /// `#`
    Num,
    /// `[`
    Lsqb,
    /// `]`
    Rsqb,
    /// `-`
    Minus,
    /// An ASCII name-start character (letters, `_`, `:`).
    NmStrt,
    /// An ASCII name character that cannot start a name (digits, `.`).
    Name,
    /// Any other character data byte.
    Other,
}

#[rustfmt::skip]
static ASCII_TYPES: [ByteType; 128] = [
    /* 0x00 */ Nonxml, Nonxml, Nonxml, Nonxml, Nonxml, Nonxml, Nonxml, Nonxml,
    /* 0x08 */ Nonxml, S,      Lf,     Nonxml, Nonxml, Cr,     Nonxml, Nonxml,
    /* 0x10 */ Nonxml, Nonxml, Nonxml, Nonxml, Nonxml, Nonxml, Nonxml, Nonxml,
    /* 0x18 */ Nonxml, Nonxml, Nonxml, Nonxml, Nonxml, Nonxml, Nonxml, Nonxml,
    /* 0x20 */ S,      Excl,   Quot,   Num,    Other,  Other,  Amp,    Apos,
    /* 0x28 */ Other,  Other,  Other,  Other,  Other,  Minus,  Name,   Sol,
    /* 0x30 */ Name,   Name,   Name,   Name,   Name,   Name,   Name,   Name,
    /* 0x38 */ Name,   Name,   NmStrt, Semi,   Lt,     Equals, Gt,     Quest,
    /* 0x40 */ Other,  NmStrt, NmStrt, NmStrt, NmStrt, NmStrt, NmStrt, NmStrt,
    /* 0x48 */ NmStrt, NmStrt, NmStrt, NmStrt, NmStrt, NmStrt, NmStrt, NmStrt,
    /* 0x50 */ NmStrt, NmStrt, NmStrt, NmStrt, NmStrt, NmStrt, NmStrt, NmStrt,
    /* 0x58 */ NmStrt, NmStrt, NmStrt, Lsqb,   Other,  Rsqb,   Other,  NmStrt,
    /* 0x60 */ Other,  NmStrt, NmStrt, NmStrt, NmStrt, NmStrt, NmStrt, NmStrt,
    /* 0x68 */ NmStrt, NmStrt, NmStrt, NmStrt, NmStrt, NmStrt, NmStrt, NmStrt,
    /* 0x70 */ NmStrt, NmStrt, NmStrt, NmStrt, NmStrt, NmStrt, NmStrt, NmStrt,
    /* 0x78 */ NmStrt, NmStrt, NmStrt, Other,  Other,  Other,  Other,  Other,
];

/// Classify one input byte.
pub fn byte_type(b: u8) -> ByteType {
    match b {
        0x00..=0x7F => ASCII_TYPES[b as usize],
        0x80..=0xBF => Malformed,
        0xC0..=0xDF => Lead2,
        0xE0..=0xEF => Lead3,
        0xF0..=0xF7 => Lead4,
        0xF8..=0xFD => Nonxml,
        0xFE..=0xFF => Malformed,
    }
}

/// Outcome of decoding one character at a buffer offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharDecode {
    /// A scalar value and its encoded width in bytes.
    Char(char, usize),
    /// The buffer ends inside the character's byte sequence.
    Incomplete,
    /// The bytes are not well-formed UTF-8.
    Invalid,
}

/// Decode the UTF-8 character starting at `off`.
///
/// Strict: overlong encodings, surrogate codepoints, and lead bytes
/// beyond `0xF4` are `Invalid` rather than decoded permissively.
pub fn decode_char(buf: &[u8], off: usize) -> CharDecode {
    let b0 = buf[off];
    let width = match b0 {
        0x00..=0x7F => return CharDecode::Char(b0 as char, 1),
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return CharDecode::Invalid,
    };
    if buf.len() - off < width {
        return CharDecode::Incomplete;
    }
    let b1 = buf[off + 1];
    let b1_ok = match (width, b0) {
        (3, 0xE0) => (0xA0..=0xBF).contains(&b1),
        (3, 0xED) => (0x80..=0x9F).contains(&b1),
        (4, 0xF0) => (0x90..=0xBF).contains(&b1),
        (4, 0xF4) => (0x80..=0x8F).contains(&b1),
        _ => (0x80..=0xBF).contains(&b1),
    };
    if !b1_ok {
        return CharDecode::Invalid;
    }
    let mut cp = match width {
        2 => (u32::from(b0) & 0x1F) << 6 | (u32::from(b1) & 0x3F),
        3 => (u32::from(b0) & 0x0F) << 12 | (u32::from(b1) & 0x3F) << 6,
        _ => (u32::from(b0) & 0x07) << 18 | (u32::from(b1) & 0x3F) << 12,
    };
    for i in 2..width {
        let b = buf[off + i];
        if !(0x80..=0xBF).contains(&b) {
            return CharDecode::Invalid;
        }
        cp |= (u32::from(b) & 0x3F) << (6 * (width - 1 - i));
    }
    match char::from_u32(cp) {
        Some(c) => CharDecode::Char(c, width),
        None => CharDecode::Invalid,
    }
}

/// XML 1.0 `NameStartChar`, fifth edition.
pub fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | '_' | 'A'..='Z' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

/// XML 1.0 `NameChar`, fifth edition.
pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}
