// Copyright 2025 The xmpp5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Resumable scan state machines.
//!
//! Each entry point scans exactly one token starting at `off` and
//! reports byte spans through the caller's [`ContentToken`]. Nothing
//! here keeps state between calls: when a token runs past the end of
//! the window the caller holds on to the bytes and rescans the same
//! token from its first byte once more input arrives. That property is
//! what makes arbitrary chunking invisible.

use crate::error::{ErrorKind, ParseError};

use super::byteclass::{byte_type, decode_char, is_name_char, is_name_start_char};
use super::byteclass::{ByteType, CharDecode};
use super::token::{AttributeSpan, ContentToken, TokenKind};

/// Result of scanning for one token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scan {
    /// A complete token; `token_end` is one past its final byte.
    Token(TokenKind),
    /// The window ends inside a token. Feed more bytes and rescan.
    Incomplete,
    /// A token is complete as recognized, but one more byte of lookahead
    /// could extend or invalidate it (a bare `\r` or a trailing `]` at
    /// the end of the window). Treat as `Incomplete` mid-stream, as
    /// `Token` at end of input.
    Ambiguous(TokenKind),
    /// The input can never form a legal token.
    Fatal(ParseError),
}

macro_rules! fatal {
    ($kind:ident, $off:expr) => {
        return Scan::Fatal(ParseError::new(ErrorKind::$kind, $off))
    };
}

/// Decode the multi-byte character at `$off`, require `$pred` of it,
/// advance past it.
macro_rules! name_char {
    ($buf:ident, $off:ident, $pred:path) => {
        match decode_char($buf, $off) {
            CharDecode::Char(c, w) => {
                if !$pred(c) {
                    fatal!(InvalidToken, $off);
                }
                $off += w;
            }
            CharDecode::Incomplete => return Scan::Incomplete,
            CharDecode::Invalid => fatal!(MalformedUtf8, $off),
        }
    };
}

/// Decode the multi-byte character at `$off`, require it to be a legal
/// XML character, advance past it.
macro_rules! text_char {
    ($buf:ident, $off:ident) => {
        match decode_char($buf, $off) {
            CharDecode::Char(c, w) => {
                if c == '\u{FFFE}' || c == '\u{FFFF}' {
                    fatal!(InvalidToken, $off);
                }
                $off += w;
            }
            CharDecode::Incomplete => return Scan::Incomplete,
            CharDecode::Invalid => fatal!(MalformedUtf8, $off),
        }
    };
}

/// Scan the first token of ordinary element content.
pub fn tokenize_content(buf: &[u8], mut off: usize, token: &mut ContentToken) -> Scan {
    let end = buf.len();
    if off == end {
        return Scan::Incomplete;
    }
    match byte_type(buf[off]) {
        ByteType::Lt => return scan_lt(buf, off + 1, token),
        ByteType::Amp => return scan_ref(buf, off + 1, token),
        ByteType::Cr => {
            off += 1;
            if off == end {
                token.token_end = off;
                return Scan::Ambiguous(TokenKind::DataNewline);
            }
            if byte_type(buf[off]) == ByteType::Lf {
                off += 1;
            }
            token.token_end = off;
            return Scan::Token(TokenKind::DataNewline);
        }
        ByteType::Lf => {
            token.token_end = off + 1;
            return Scan::Token(TokenKind::DataNewline);
        }
        ByteType::Rsqb => {
            off += 1;
            if off == end {
                token.token_end = off;
                return Scan::Ambiguous(TokenKind::DataChars);
            }
            if buf[off] == b']' {
                off += 1;
                if off == end {
                    token.token_end = off;
                    return Scan::Ambiguous(TokenKind::DataChars);
                }
                if buf[off] == b'>' {
                    // "]]>" outside a CDATA section
                    fatal!(InvalidToken, off);
                }
                off -= 1;
            }
        }
        ByteType::Nonxml => fatal!(InvalidToken, off),
        ByteType::Malformed => fatal!(MalformedUtf8, off),
        ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => text_char!(buf, off),
        _ => off += 1,
    }
    extend_data(buf, off, token)
}

/// Scan the first token inside a CDATA section.
pub fn tokenize_cdata_section(buf: &[u8], mut off: usize, token: &mut ContentToken) -> Scan {
    let end = buf.len();
    if off == end {
        return Scan::Incomplete;
    }
    match byte_type(buf[off]) {
        ByteType::Rsqb => {
            off += 1;
            if off == end {
                return Scan::Incomplete;
            }
            if buf[off] == b']' {
                off += 1;
                if off == end {
                    return Scan::Incomplete;
                }
                if buf[off] == b'>' {
                    token.token_end = off + 1;
                    return Scan::Token(TokenKind::CdataSectClose);
                }
                off -= 1;
            }
            // lone "]" is ordinary data here
        }
        ByteType::Cr => {
            off += 1;
            if off == end {
                token.token_end = off;
                return Scan::Ambiguous(TokenKind::DataNewline);
            }
            if byte_type(buf[off]) == ByteType::Lf {
                off += 1;
            }
            token.token_end = off;
            return Scan::Token(TokenKind::DataNewline);
        }
        ByteType::Lf => {
            token.token_end = off + 1;
            return Scan::Token(TokenKind::DataNewline);
        }
        ByteType::Nonxml => fatal!(InvalidToken, off),
        ByteType::Malformed => fatal!(MalformedUtf8, off),
        ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => text_char!(buf, off),
        _ => off += 1,
    }
    extend_cdata(buf, off, token)
}

/// Re-scan one already-delimited attribute value span. `buf` holds the
/// whole span, so running off the end of it completes the final token
/// instead of asking for more input.
pub fn tokenize_attribute_value(buf: &[u8], mut off: usize, token: &mut ContentToken) -> Scan {
    let end = buf.len();
    if off == end {
        return Scan::Incomplete;
    }
    let start = off;
    while off != end {
        match byte_type(buf[off]) {
            ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => text_char!(buf, off),
            ByteType::Amp => {
                if off == start {
                    return scan_ref(buf, off + 1, token);
                }
                token.token_end = off;
                return Scan::Token(TokenKind::DataChars);
            }
            ByteType::Lt => fatal!(InvalidToken, off),
            ByteType::S => {
                if off == start {
                    token.token_end = off + 1;
                    return Scan::Token(TokenKind::AttributeValueWhitespace);
                }
                token.token_end = off;
                return Scan::Token(TokenKind::DataChars);
            }
            ByteType::Lf => {
                if off == start {
                    token.token_end = off + 1;
                    return Scan::Token(TokenKind::DataNewline);
                }
                token.token_end = off;
                return Scan::Token(TokenKind::DataChars);
            }
            ByteType::Cr => {
                if off == start {
                    off += 1;
                    if off == end {
                        token.token_end = off;
                        return Scan::Ambiguous(TokenKind::DataNewline);
                    }
                    if byte_type(buf[off]) == ByteType::Lf {
                        off += 1;
                    }
                    token.token_end = off;
                    return Scan::Token(TokenKind::DataNewline);
                }
                token.token_end = off;
                return Scan::Token(TokenKind::DataChars);
            }
            ByteType::Nonxml => fatal!(InvalidToken, off),
            ByteType::Malformed => fatal!(MalformedUtf8, off),
            _ => off += 1,
        }
    }
    token.token_end = off;
    Scan::Token(TokenKind::DataChars)
}

/// Extend a character-data run until a structural byte or the window end.
/// Stops (without consuming) before anything that starts a new token or
/// needs its own error report.
fn extend_data(buf: &[u8], mut off: usize, token: &mut ContentToken) -> Scan {
    let end = buf.len();
    while off != end {
        match byte_type(buf[off]) {
            ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => match decode_char(buf, off) {
                CharDecode::Char(c, w) => {
                    if c == '\u{FFFE}' || c == '\u{FFFF}' {
                        fatal!(InvalidToken, off);
                    }
                    off += w;
                }
                // the data token ends cleanly before the partial char
                CharDecode::Incomplete => break,
                CharDecode::Invalid => fatal!(MalformedUtf8, off),
            },
            ByteType::Rsqb
            | ByteType::Amp
            | ByteType::Lt
            | ByteType::Cr
            | ByteType::Lf
            | ByteType::Nonxml
            | ByteType::Malformed => break,
            _ => off += 1,
        }
    }
    token.token_end = off;
    Scan::Token(TokenKind::DataChars)
}

/// Like `extend_data`, but `&` and `<` are ordinary data inside CDATA.
fn extend_cdata(buf: &[u8], mut off: usize, token: &mut ContentToken) -> Scan {
    let end = buf.len();
    while off != end {
        match byte_type(buf[off]) {
            ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => match decode_char(buf, off) {
                CharDecode::Char(c, w) => {
                    if c == '\u{FFFE}' || c == '\u{FFFF}' {
                        fatal!(InvalidToken, off);
                    }
                    off += w;
                }
                CharDecode::Incomplete => break,
                CharDecode::Invalid => fatal!(MalformedUtf8, off),
            },
            ByteType::Rsqb
            | ByteType::Cr
            | ByteType::Lf
            | ByteType::Nonxml
            | ByteType::Malformed => break,
            _ => off += 1,
        }
    }
    token.token_end = off;
    Scan::Token(TokenKind::DataChars)
}

/// `off` points past `<`.
fn scan_lt(buf: &[u8], mut off: usize, token: &mut ContentToken) -> Scan {
    let end = buf.len();
    if off == end {
        return Scan::Incomplete;
    }
    match byte_type(buf[off]) {
        ByteType::NmStrt => off += 1,
        ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => {
            name_char!(buf, off, is_name_start_char)
        }
        ByteType::Excl => {
            off += 1;
            if off == end {
                return Scan::Incomplete;
            }
            return match byte_type(buf[off]) {
                ByteType::Minus => scan_comment(buf, off + 1, token),
                ByteType::Lsqb => scan_cdata_open(buf, off + 1, token),
                _ => fatal!(InvalidToken, off),
            };
        }
        ByteType::Quest => return scan_pi(buf, off + 1, token),
        ByteType::Sol => return scan_end_tag(buf, off + 1, token),
        _ => fatal!(InvalidToken, off),
    }

    // we have a start tag
    token.attrs.clear();
    let mut name_end: Option<usize> = None;

    while off != end {
        match byte_type(buf[off]) {
            ByteType::NmStrt | ByteType::Name | ByteType::Minus => off += 1,
            ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => {
                name_char!(buf, off, is_name_char)
            }
            ByteType::S | ByteType::Cr | ByteType::Lf => {
                name_end = Some(off);
                off += 1;
                loop {
                    if off == end {
                        return Scan::Incomplete;
                    }
                    match byte_type(buf[off]) {
                        ByteType::NmStrt => return scan_atts(buf, off, off + 1, name_end, token),
                        ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => {
                            return match decode_char(buf, off) {
                                CharDecode::Char(c, w) => {
                                    if !is_name_start_char(c) {
                                        fatal!(InvalidToken, off);
                                    }
                                    scan_atts(buf, off, off + w, name_end, token)
                                }
                                CharDecode::Incomplete => Scan::Incomplete,
                                CharDecode::Invalid => fatal!(MalformedUtf8, off),
                            };
                        }
                        ByteType::Gt | ByteType::Sol => break,
                        ByteType::S | ByteType::Cr | ByteType::Lf => off += 1,
                        _ => fatal!(InvalidToken, off),
                    }
                }
            }
            ByteType::Gt => {
                token.name_end = name_end.unwrap_or(off);
                token.token_end = off + 1;
                return Scan::Token(TokenKind::StartTagNoAtts);
            }
            ByteType::Sol => {
                let ne = name_end.unwrap_or(off);
                off += 1;
                if off == end {
                    return Scan::Incomplete;
                }
                if buf[off] != b'>' {
                    fatal!(InvalidToken, off);
                }
                token.name_end = ne;
                token.token_end = off + 1;
                return Scan::Token(TokenKind::EmptyElementNoAtts);
            }
            _ => fatal!(InvalidToken, off),
        }
    }
    Scan::Incomplete
}

/// `name_start` is the first byte of an attribute name; `off` points
/// past that name's first character. `tag_name_end` is the end of the
/// element name scanned by the caller.
fn scan_atts(
    buf: &[u8],
    mut name_start: usize,
    mut off: usize,
    tag_name_end: Option<usize>,
    token: &mut ContentToken,
) -> Scan {
    let end = buf.len();
    let mut name_end: Option<usize> = None;

    if let Some(ne) = tag_name_end {
        token.name_end = ne;
    }

    while off != end {
        match byte_type(buf[off]) {
            ByteType::NmStrt | ByteType::Name | ByteType::Minus => {
                off += 1;
                continue;
            }
            ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => {
                name_char!(buf, off, is_name_char);
                continue;
            }
            ByteType::S | ByteType::Cr | ByteType::Lf => {
                name_end = Some(off);
                loop {
                    off += 1;
                    if off == end {
                        return Scan::Incomplete;
                    }
                    match byte_type(buf[off]) {
                        ByteType::Equals => break,
                        ByteType::S | ByteType::Lf | ByteType::Cr => {}
                        _ => fatal!(InvalidToken, off),
                    }
                }
            }
            ByteType::Equals => {
                if name_end.is_none() {
                    name_end = Some(off);
                }
            }
            _ => fatal!(InvalidToken, off),
        }

        // off points at '='
        let attr_name_end = name_end.unwrap_or(off);

        let open;
        loop {
            off += 1;
            if off == end {
                return Scan::Incomplete;
            }
            match byte_type(buf[off]) {
                t @ (ByteType::Quot | ByteType::Apos) => {
                    open = t;
                    break;
                }
                ByteType::S | ByteType::Lf | ByteType::Cr => {}
                _ => fatal!(InvalidToken, off),
            }
        }
        off += 1;
        let value_start = off;
        let mut normalized = true;

        // in the attribute value
        loop {
            if off == end {
                return Scan::Incomplete;
            }
            let t = byte_type(buf[off]);
            if t == open {
                break;
            }
            match t {
                ByteType::Nonxml => fatal!(InvalidToken, off),
                ByteType::Malformed => fatal!(MalformedUtf8, off),
                ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => text_char!(buf, off),
                ByteType::Amp => {
                    normalized = false;
                    let saved_name_end = token.name_end;
                    match scan_ref(buf, off + 1, token) {
                        Scan::Token(_) => {}
                        other => return other,
                    }
                    token.name_end = saved_name_end;
                    off = token.token_end;
                }
                ByteType::S => {
                    if normalized
                        && (off == value_start
                            || buf[off] != b' '
                            || (off + 1 != end
                                && (buf[off + 1] == b' ' || byte_type(buf[off + 1]) == open)))
                    {
                        normalized = false;
                    }
                    off += 1;
                }
                ByteType::Lt => fatal!(InvalidToken, off),
                ByteType::Lf | ByteType::Cr => {
                    normalized = false;
                    off += 1;
                }
                _ => off += 1,
            }
        }
        token.attrs.append(AttributeSpan {
            name_start,
            name_end: attr_name_end,
            value_start,
            value_end: off,
            normalized,
        });

        // past the closing quote: a space, '>', or '/>' must follow
        off += 1;
        if off == end {
            return Scan::Incomplete;
        }
        let mut t = byte_type(buf[off]);
        match t {
            ByteType::S | ByteType::Cr | ByteType::Lf => {
                off += 1;
                if off == end {
                    return Scan::Incomplete;
                }
                t = byte_type(buf[off]);
            }
            ByteType::Gt | ByteType::Sol => {}
            _ => fatal!(InvalidToken, off),
        }

        // skip whitespace to the next attribute name or the tag close
        loop {
            match t {
                ByteType::NmStrt => {
                    name_start = off;
                    off += 1;
                    break;
                }
                ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => {
                    match decode_char(buf, off) {
                        CharDecode::Char(c, w) => {
                            if !is_name_start_char(c) {
                                fatal!(InvalidToken, off);
                            }
                            name_start = off;
                            off += w;
                            break;
                        }
                        CharDecode::Incomplete => return Scan::Incomplete,
                        CharDecode::Invalid => fatal!(MalformedUtf8, off),
                    }
                }
                ByteType::S | ByteType::Cr | ByteType::Lf => {}
                ByteType::Gt => {
                    if let Err(e) = token.attrs.check_uniqueness(buf) {
                        return Scan::Fatal(e);
                    }
                    token.token_end = off + 1;
                    return Scan::Token(TokenKind::StartTagWithAtts);
                }
                ByteType::Sol => {
                    off += 1;
                    if off == end {
                        return Scan::Incomplete;
                    }
                    if buf[off] != b'>' {
                        fatal!(InvalidToken, off);
                    }
                    if let Err(e) = token.attrs.check_uniqueness(buf) {
                        return Scan::Fatal(e);
                    }
                    token.token_end = off + 1;
                    return Scan::Token(TokenKind::EmptyElementWithAtts);
                }
                _ => fatal!(InvalidToken, off),
            }
            off += 1;
            if off == end {
                return Scan::Incomplete;
            }
            t = byte_type(buf[off]);
        }
        name_end = None;
    }
    Scan::Incomplete
}

/// `off` points past `</`.
fn scan_end_tag(buf: &[u8], mut off: usize, token: &mut ContentToken) -> Scan {
    let end = buf.len();
    if off == end {
        return Scan::Incomplete;
    }
    match byte_type(buf[off]) {
        ByteType::NmStrt => off += 1,
        ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => {
            name_char!(buf, off, is_name_start_char)
        }
        _ => fatal!(InvalidToken, off),
    }
    while off != end {
        match byte_type(buf[off]) {
            ByteType::NmStrt | ByteType::Name | ByteType::Minus => off += 1,
            ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => {
                name_char!(buf, off, is_name_char)
            }
            ByteType::S | ByteType::Cr | ByteType::Lf => {
                token.name_end = off;
                off += 1;
                while off != end {
                    match byte_type(buf[off]) {
                        ByteType::S | ByteType::Cr | ByteType::Lf => off += 1,
                        ByteType::Gt => {
                            token.token_end = off + 1;
                            return Scan::Token(TokenKind::EndTag);
                        }
                        _ => fatal!(InvalidToken, off),
                    }
                }
                return Scan::Incomplete;
            }
            ByteType::Gt => {
                token.name_end = off;
                token.token_end = off + 1;
                return Scan::Token(TokenKind::EndTag);
            }
            _ => fatal!(InvalidToken, off),
        }
    }
    Scan::Incomplete
}

/// `off` points past `<!-`.
fn scan_comment(buf: &[u8], mut off: usize, token: &mut ContentToken) -> Scan {
    let end = buf.len();
    if off == end {
        return Scan::Incomplete;
    }
    if buf[off] != b'-' {
        fatal!(InvalidToken, off);
    }
    off += 1;
    while off != end {
        match byte_type(buf[off]) {
            ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => text_char!(buf, off),
            ByteType::Nonxml => fatal!(InvalidToken, off),
            ByteType::Malformed => fatal!(MalformedUtf8, off),
            ByteType::Minus => {
                off += 1;
                if off == end {
                    return Scan::Incomplete;
                }
                if buf[off] == b'-' {
                    off += 1;
                    if off == end {
                        return Scan::Incomplete;
                    }
                    if buf[off] != b'>' {
                        fatal!(InvalidToken, off);
                    }
                    token.token_end = off + 1;
                    return Scan::Token(TokenKind::Comment);
                }
            }
            _ => off += 1,
        }
    }
    Scan::Incomplete
}

const CDATA_OPEN: &[u8] = b"CDATA[";

/// `off` points past `<![`.
fn scan_cdata_open(buf: &[u8], mut off: usize, token: &mut ContentToken) -> Scan {
    let end = buf.len();
    if end - off < CDATA_OPEN.len() {
        return Scan::Incomplete;
    }
    for &c in CDATA_OPEN {
        if buf[off] != c {
            fatal!(InvalidToken, off);
        }
        off += 1;
    }
    token.token_end = off;
    Scan::Token(TokenKind::CdataSectOpen)
}

/// `xml` target check for a processing instruction. Mixed-case `XML`
/// spellings are reserved and rejected outright.
fn pi_target_is_xml_decl(buf: &[u8], off: usize, name_end: usize) -> Result<bool, ParseError> {
    if name_end - off != 3 {
        return Ok(false);
    }
    let mut upper = false;
    for (i, &(lo, up)) in [(b'x', b'X'), (b'm', b'M'), (b'l', b'L')].iter().enumerate() {
        let b = buf[off + i];
        if b == up {
            upper = true;
        } else if b != lo {
            return Ok(false);
        }
    }
    if upper {
        return Err(ParseError::new(ErrorKind::InvalidToken, off + 2));
    }
    Ok(true)
}

/// `off` points past `<?`.
fn scan_pi(buf: &[u8], mut off: usize, token: &mut ContentToken) -> Scan {
    let end = buf.len();
    let target = off;
    if off == end {
        return Scan::Incomplete;
    }
    match byte_type(buf[off]) {
        ByteType::NmStrt => off += 1,
        ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => {
            name_char!(buf, off, is_name_start_char)
        }
        _ => fatal!(InvalidToken, off),
    }
    while off != end {
        match byte_type(buf[off]) {
            ByteType::NmStrt | ByteType::Name | ByteType::Minus => off += 1,
            ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => {
                name_char!(buf, off, is_name_char)
            }
            ByteType::S | ByteType::Cr | ByteType::Lf => {
                let is_xml = match pi_target_is_xml_decl(buf, target, off) {
                    Ok(b) => b,
                    Err(e) => return Scan::Fatal(e),
                };
                token.name_end = off;
                off += 1;
                while off != end {
                    match byte_type(buf[off]) {
                        ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => {
                            text_char!(buf, off)
                        }
                        ByteType::Nonxml => fatal!(InvalidToken, off),
                        ByteType::Malformed => fatal!(MalformedUtf8, off),
                        ByteType::Quest => {
                            off += 1;
                            if off == end {
                                return Scan::Incomplete;
                            }
                            if buf[off] == b'>' {
                                token.token_end = off + 1;
                                return Scan::Token(if is_xml {
                                    TokenKind::XmlDecl
                                } else {
                                    TokenKind::Pi
                                });
                            }
                        }
                        _ => off += 1,
                    }
                }
                return Scan::Incomplete;
            }
            ByteType::Quest => {
                token.name_end = off;
                off += 1;
                if off == end {
                    return Scan::Incomplete;
                }
                if buf[off] != b'>' {
                    fatal!(InvalidToken, off);
                }
                token.token_end = off + 1;
                let is_xml = match pi_target_is_xml_decl(buf, target, token.name_end) {
                    Ok(b) => b,
                    Err(e) => return Scan::Fatal(e),
                };
                return Scan::Token(if is_xml { TokenKind::XmlDecl } else { TokenKind::Pi });
            }
            _ => fatal!(InvalidToken, off),
        }
    }
    Scan::Incomplete
}

/// Match `amp`/`lt`/`gt`/`quot`/`apos` plus `;` at `off` without a
/// general name scan. The five built-ins are resolved right here; a
/// miss falls back to the caller's entity-name scan.
fn magic_entity_ref(buf: &[u8], off: usize, token: &mut ContentToken) -> bool {
    let avail = buf.len() - off;
    match buf[off] {
        b'a' => {
            if avail >= 4 && &buf[off + 1..off + 4] == b"mp;" {
                token.token_end = off + 4;
                token.ref_char = '&';
                return true;
            }
            if avail >= 5 && &buf[off + 1..off + 5] == b"pos;" {
                token.token_end = off + 5;
                token.ref_char = '\'';
                return true;
            }
        }
        b'l' => {
            if avail >= 3 && &buf[off + 1..off + 3] == b"t;" {
                token.token_end = off + 3;
                token.ref_char = '<';
                return true;
            }
        }
        b'g' => {
            if avail >= 3 && &buf[off + 1..off + 3] == b"t;" {
                token.token_end = off + 3;
                token.ref_char = '>';
                return true;
            }
        }
        b'q' => {
            if avail >= 5 && &buf[off + 1..off + 5] == b"uot;" {
                token.token_end = off + 5;
                token.ref_char = '"';
                return true;
            }
        }
        _ => {}
    }
    false
}

/// `off` points past `&`.
fn scan_ref(buf: &[u8], mut off: usize, token: &mut ContentToken) -> Scan {
    let end = buf.len();
    if off == end {
        return Scan::Incomplete;
    }
    if magic_entity_ref(buf, off, token) {
        return Scan::Token(TokenKind::MagicEntityRef);
    }
    match byte_type(buf[off]) {
        ByteType::NmStrt => off += 1,
        ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => {
            name_char!(buf, off, is_name_start_char)
        }
        ByteType::Num => return scan_char_ref(buf, off + 1, token),
        _ => fatal!(InvalidToken, off),
    }
    while off != end {
        match byte_type(buf[off]) {
            ByteType::NmStrt | ByteType::Name | ByteType::Minus => off += 1,
            ByteType::Lead2 | ByteType::Lead3 | ByteType::Lead4 => {
                name_char!(buf, off, is_name_char)
            }
            ByteType::Semi => {
                token.name_end = off;
                token.token_end = off + 1;
                return Scan::Token(TokenKind::EntityRef);
            }
            _ => fatal!(InvalidToken, off),
        }
    }
    Scan::Incomplete
}

/// `off` points past `&#`.
fn scan_char_ref(buf: &[u8], mut off: usize, token: &mut ContentToken) -> Scan {
    let end = buf.len();
    if off == end {
        return Scan::Incomplete;
    }
    let c = buf[off];
    if c == b'x' {
        return scan_hex_char_ref(buf, off + 1, token);
    }
    if !c.is_ascii_digit() {
        fatal!(InvalidToken, off);
    }
    let mut num = u32::from(c - b'0');
    off += 1;
    while off != end {
        match buf[off] {
            c @ b'0'..=b'9' => {
                num = num * 10 + u32::from(c - b'0');
                if num >= 0x11_0000 {
                    fatal!(InvalidToken, off);
                }
            }
            b';' => {
                token.token_end = off + 1;
                return set_ref_char(num, token);
            }
            _ => fatal!(InvalidToken, off),
        }
        off += 1;
    }
    Scan::Incomplete
}

/// `off` points past `&#x`.
fn scan_hex_char_ref(buf: &[u8], mut off: usize, token: &mut ContentToken) -> Scan {
    let end = buf.len();
    if off == end {
        return Scan::Incomplete;
    }
    let mut num = match (buf[off] as char).to_digit(16) {
        Some(d) => d,
        None => fatal!(InvalidToken, off),
    };
    off += 1;
    while off != end {
        if buf[off] == b';' {
            token.token_end = off + 1;
            return set_ref_char(num, token);
        }
        match (buf[off] as char).to_digit(16) {
            Some(d) => {
                num = (num << 4) + d;
                if num >= 0x11_0000 {
                    fatal!(InvalidToken, off);
                }
            }
            None => fatal!(InvalidToken, off),
        }
        off += 1;
    }
    Scan::Incomplete
}

/// `num` is known to be below 0x110000; classify the reference and
/// reject characters XML forbids even in reference form.
fn set_ref_char(num: u32, token: &mut ContentToken) -> Scan {
    let c = match char::from_u32(num) {
        Some(c) => c,
        None => fatal!(InvalidToken, token.token_end - 1),
    };
    let forbidden = match c {
        '\t' | '\n' | '\r' => false,
        '\0'..='\u{1F}' => true,
        '\u{FFFE}' | '\u{FFFF}' => true,
        _ => false,
    };
    if forbidden {
        fatal!(InvalidToken, token.token_end - 1);
    }
    token.ref_char = c;
    Scan::Token(if num < 0x1_0000 {
        TokenKind::CharRef
    } else {
        TokenKind::CharPairRef
    })
}
