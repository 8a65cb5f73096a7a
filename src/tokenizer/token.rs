// Copyright 2025 The xmpp5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Token records shared between the scanner and the stream assembler.
//!
//! The scanner never allocates for token content; it reports byte spans
//! into the caller's buffer through a [`ContentToken`] that is reused
//! across tokens.

use crate::error::{ErrorKind, ParseError};

/// The kinds of tokens the scanner recognizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// A run of ordinary character data.
    DataChars,
    /// A line ending: `\n`, a `\r\n` pair, or a bare `\r`.
    DataNewline,
    /// `<name>`
    StartTagNoAtts,
    /// `<name a='v'>`
    StartTagWithAtts,
    /// `<name/>`
    EmptyElementNoAtts,
    /// `<name a='v'/>`
    EmptyElementWithAtts,
    /// `</name>`
    EndTag,
    /// `<![CDATA[`
    CdataSectOpen,
    /// `]]>` while inside a CDATA section.
    CdataSectClose,
    /// A numeric character reference to a BMP character.
    CharRef,
    /// A numeric character reference to a supplementary-plane character.
    CharPairRef,
    /// One of `&amp;` `&lt;` `&gt;` `&quot;` `&apos;`.
    MagicEntityRef,
    /// A named general entity reference. Always rejected downstream;
    /// XMPP streams have no DTD to define one.
    EntityRef,
    /// `<!-- ... -->`
    Comment,
    /// A `<?xml ...?>` text declaration.
    XmlDecl,
    /// A processing instruction other than the text declaration.
    Pi,
    /// A single whitespace character at the head of an attribute value.
    /// Produced only by the attribute-value re-scan.
    AttributeValueWhitespace,
}

/// Byte spans of one attribute inside a start tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeSpan {
    /// First byte of the attribute name.
    pub name_start: usize,
    /// One past the last byte of the attribute name.
    pub name_end: usize,
    /// First byte of the value, inside the quotes.
    pub value_start: usize,
    /// One past the last byte of the value.
    pub value_end: usize,
    /// True when the raw value span is already in normalized form:
    /// no references, no CR/LF, no tabs, no leading/trailing/double
    /// spaces. A normalized span can be used verbatim.
    pub normalized: bool,
}

/// The attributes of the start tag currently being scanned.
///
/// One growable vector, cleared (not reallocated) between start tags.
#[derive(Debug, Default)]
pub struct AttributeTable {
    spans: Vec<AttributeSpan>,
}

impl AttributeTable {
    /// An empty table.
    pub fn new() -> AttributeTable {
        AttributeTable { spans: Vec::new() }
    }

    /// Forget all spans, keeping the allocation.
    pub fn clear(&mut self) {
        self.spans.clear();
    }

    /// Record one attribute.
    pub fn append(&mut self, span: AttributeSpan) {
        self.spans.push(span);
    }

    /// Number of attributes recorded.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// True when no attributes are recorded.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// The span at `index`, if recorded.
    pub fn get(&self, index: usize) -> Option<&AttributeSpan> {
        self.spans.get(index)
    }

    /// Iterate over the recorded spans in document order.
    pub fn iter(&self) -> std::slice::Iter<'_, AttributeSpan> {
        self.spans.iter()
    }

    /// Compare all attribute names pairwise over their raw byte spans.
    ///
    /// On a duplicate, the error offset is the start of the second
    /// occurrence's name.
    pub fn check_uniqueness(&self, buf: &[u8]) -> Result<(), ParseError> {
        for i in 1..self.spans.len() {
            let a = &self.spans[i];
            for b in &self.spans[..i] {
                if buf[a.name_start..a.name_end] == buf[b.name_start..b.name_end] {
                    return Err(ParseError::new(ErrorKind::DuplicateAttribute, a.name_start));
                }
            }
        }
        Ok(())
    }
}

/// Output of one scan call: spans into the scanned buffer plus the
/// decoded character for reference tokens.
#[derive(Debug, Default)]
pub struct ContentToken {
    /// One past the last byte of the token. The next token starts here.
    pub token_end: usize,
    /// One past the last byte of a tag, target, or entity name.
    pub name_end: usize,
    /// Decoded character for `CharRef`, `CharPairRef` and
    /// `MagicEntityRef` tokens.
    pub ref_char: char,
    /// Attribute spans collected while scanning a start tag.
    pub attrs: AttributeTable,
}

impl ContentToken {
    /// A fresh token record.
    pub fn new() -> ContentToken {
        ContentToken {
            token_end: 0,
            name_end: 0,
            ref_char: '\0',
            attrs: AttributeTable::new(),
        }
    }

    /// Reset all fields, keeping the attribute allocation.
    pub fn clear(&mut self) {
        self.token_end = 0;
        self.name_end = 0;
        self.ref_char = '\0';
        self.attrs.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn span(name_start: usize, name_end: usize) -> AttributeSpan {
        AttributeSpan {
            name_start,
            name_end,
            value_start: 0,
            value_end: 0,
            normalized: true,
        }
    }

    #[test]
    fn uniqueness_ok() {
        let buf = b"to from id";
        let mut attrs = AttributeTable::new();
        attrs.append(span(0, 2));
        attrs.append(span(3, 7));
        attrs.append(span(8, 10));
        assert!(attrs.check_uniqueness(buf).is_ok());
    }

    #[test]
    fn uniqueness_reports_second_occurrence() {
        let buf = b"to from to";
        let mut attrs = AttributeTable::new();
        attrs.append(span(0, 2));
        attrs.append(span(3, 7));
        attrs.append(span(8, 10));
        let err = attrs.check_uniqueness(buf).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateAttribute);
        assert_eq!(err.offset, 8);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut attrs = AttributeTable::new();
        for i in 0..16 {
            attrs.append(span(i, i + 1));
        }
        let cap = attrs.spans.capacity();
        attrs.clear();
        assert!(attrs.is_empty());
        assert_eq!(attrs.spans.capacity(), cap);
    }
}
