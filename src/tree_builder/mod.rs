// Copyright 2025 The xmpp5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Assembles scanner tokens into stream events and stanza trees.
//!
//! The assembler tracks the one piece of structure an XMPP stream has:
//! a single wrapper element whose depth-one children are stanzas. The
//! wrapper's start and end tags become `stream_start` and `stream_end`
//! events on the sink; everything below depth one is built into a tree
//! and delivered whole when its stanza root closes.

use log::{debug, warn};
use mac::unwrap_or_return;
use tendril::StrTendril;

use crate::error::{ErrorKind, ParseError};
use crate::interface::{ns, Attribute, NodeOrText, QName, TreeSink};
use crate::namespaces::NamespaceStack;
use crate::tokenizer::{
    split_qname, tokenize_attribute_value, AttributeSpan, ContentToken, Scan, TokenKind,
};

/// The raw qualified name every compliant stream opens with.
const STREAM_WRAPPER: &str = "stream:stream";

/// Stanza names eligible for the legacy namespace fallback.
const LEGACY_STANZAS: [&str; 3] = ["iq", "message", "presence"];

/// Where we are in the life of one stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StreamPhase {
    /// Nothing but the text declaration and whitespace seen yet.
    AwaitingStreamStart,
    /// The wrapper is open; stanzas may arrive.
    InStream,
    /// The wrapper has closed; only trailing whitespace is tolerated.
    StreamEnded,
}

/// Assembler options.
#[derive(Clone, Copy, Debug)]
pub struct XmppStreamBuilderOpts {
    /// Resolve unprefixed `iq`, `message` and `presence` elements to
    /// `jabber:client` when no default namespace is in scope, instead
    /// of failing. Some pre-RFC servers omit the declaration.
    pub legacy_stanza_fallback: bool,
}

impl Default for XmppStreamBuilderOpts {
    fn default() -> XmppStreamBuilderOpts {
        XmppStreamBuilderOpts {
            legacy_stanza_fallback: false,
        }
    }
}

/// The stream assembler. Generic over the sink that owns the tree.
pub struct XmppStreamBuilder<Sink: TreeSink> {
    opts: XmppStreamBuilderOpts,
    /// Consumer of stream events; owns all nodes.
    pub sink: Sink,
    phase: StreamPhase,
    namespaces: NamespaceStack,
    /// Open elements below the wrapper, innermost last, each with the
    /// raw qualified name its end tag must repeat.
    open_elems: Vec<(Sink::Handle, StrTendril)>,
    /// The wrapper's raw qualified name, once seen.
    wrapper_name: Option<StrTendril>,
    /// Character data not yet delivered to the sink. Coalesced until
    /// the next structural token.
    pending_text: StrTendril,
    in_cdata: bool,
    cdata_text: StrTendril,
}

impl<Sink: TreeSink> XmppStreamBuilder<Sink> {
    /// A builder feeding `sink`, with default options.
    pub fn new(sink: Sink) -> XmppStreamBuilder<Sink> {
        XmppStreamBuilder::new_with_opts(sink, Default::default())
    }

    /// A builder feeding `sink`.
    pub fn new_with_opts(sink: Sink, opts: XmppStreamBuilderOpts) -> XmppStreamBuilder<Sink> {
        XmppStreamBuilder {
            opts,
            sink,
            phase: StreamPhase::AwaitingStreamStart,
            namespaces: NamespaceStack::new(),
            open_elems: Vec::new(),
            wrapper_name: None,
            pending_text: StrTendril::new(),
            in_cdata: false,
            cdata_text: StrTendril::new(),
        }
    }

    /// True while positioned inside a CDATA section. The driver scans
    /// with the CDATA rules when this holds.
    pub fn in_cdata(&self) -> bool {
        self.in_cdata
    }

    /// Forget all stream state, keeping the sink. The next token must
    /// open a fresh stream.
    pub fn reset(&mut self) {
        self.phase = StreamPhase::AwaitingStreamStart;
        self.namespaces.reset();
        self.open_elems.clear();
        self.wrapper_name = None;
        self.pending_text.clear();
        self.in_cdata = false;
        self.cdata_text.clear();
    }

    /// Consume one token scanned from `buf`. `start` is the token's
    /// first byte; error offsets are relative to `buf`.
    pub fn process_token(
        &mut self,
        buf: &[u8],
        start: usize,
        token: &ContentToken,
        kind: TokenKind,
    ) -> Result<(), ParseError> {
        match kind {
            TokenKind::DataChars => {
                let text = text_slice(buf, start, token.token_end)?;
                self.add_text(text);
            }
            TokenKind::DataNewline => self.add_char('\n'),
            TokenKind::CharRef | TokenKind::CharPairRef | TokenKind::MagicEntityRef => {
                self.add_char(token.ref_char);
            }
            TokenKind::StartTagNoAtts | TokenKind::StartTagWithAtts => {
                self.start_tag(buf, start, token, false)?;
            }
            TokenKind::EmptyElementNoAtts | TokenKind::EmptyElementWithAtts => {
                self.start_tag(buf, start, token, true)?;
            }
            TokenKind::EndTag => self.end_tag(buf, start, token)?,
            TokenKind::CdataSectOpen => {
                if self.open_elems.is_empty() {
                    return Err(ParseError::new(ErrorKind::InvalidToken, start));
                }
                self.flush_text();
                self.in_cdata = true;
            }
            TokenKind::CdataSectClose => {
                self.in_cdata = false;
                self.append_cdata();
            }
            TokenKind::Comment => {
                let text = text_slice(buf, start + 4, token.token_end - 3)?;
                self.comment(text);
            }
            TokenKind::XmlDecl => {
                debug!("skipping text declaration");
            }
            TokenKind::Pi | TokenKind::EntityRef | TokenKind::AttributeValueWhitespace => {
                return Err(ParseError::new(ErrorKind::InvalidToken, start));
            }
        }
        Ok(())
    }

    fn start_tag(
        &mut self,
        buf: &[u8],
        start: usize,
        token: &ContentToken,
        empty: bool,
    ) -> Result<(), ParseError> {
        if self.phase == StreamPhase::StreamEnded {
            return Err(ParseError::new(ErrorKind::InvalidToken, start));
        }
        self.flush_text();
        let raw = StrTendril::from_slice(text_slice(buf, start + 1, token.name_end)?);
        self.namespaces.push_scope();

        // declarations first, so they apply to the tag's own names
        for span in token.attrs.iter() {
            let name = text_slice(buf, span.name_start, span.name_end)?;
            let (prefix, local) = split_qname(name);
            if prefix == Some("xmlns") {
                let uri = assemble_attribute_value(buf, span)?;
                self.namespaces.declare(local, uri);
            } else if name == "xmlns" {
                let uri = assemble_attribute_value(buf, span)?;
                self.namespaces.declare("", uri);
            }
        }

        let mut attrs = Vec::with_capacity(token.attrs.len());
        for span in token.attrs.iter() {
            let name = text_slice(buf, span.name_start, span.name_end)?;
            let name = self.resolve_attr_name(name, span.name_start)?;
            let value = assemble_attribute_value(buf, span)?;
            attrs.push(Attribute { name, value });
        }

        if self.phase == StreamPhase::AwaitingStreamStart {
            if &*raw != STREAM_WRAPPER {
                return Err(ParseError::new(ErrorKind::InvalidToken, start));
            }
            let name = self.resolve_wrapper_name(&raw);
            self.wrapper_name = Some(raw);
            self.phase = StreamPhase::InStream;
            self.sink.stream_start(name, attrs);
            if empty {
                // a wrapper that opens and closes in one tag
                self.namespaces.pop_scope();
                self.phase = StreamPhase::StreamEnded;
                self.sink.stream_end();
            }
            return Ok(());
        }

        let name = self.resolve_element_name(&raw, start)?;
        let handle = self.sink.create_element(name, attrs);
        if let Some((parent, _)) = self.open_elems.last() {
            let parent = parent.clone();
            self.sink.append(&parent, NodeOrText::AppendNode(handle.clone()));
        }
        if empty {
            self.namespaces.pop_scope();
            if self.open_elems.is_empty() {
                self.sink.stanza(handle);
            }
        } else {
            self.open_elems.push((handle, raw));
        }
        Ok(())
    }

    fn end_tag(&mut self, buf: &[u8], start: usize, token: &ContentToken) -> Result<(), ParseError> {
        let name = text_slice(buf, start + 2, token.name_end)?;
        self.flush_text();
        if let Some((handle, raw)) = self.open_elems.pop() {
            if &*raw != name {
                return Err(ParseError::new(ErrorKind::InvalidToken, start));
            }
            self.namespaces.pop_scope();
            if self.open_elems.is_empty() {
                self.sink.stanza(handle);
            }
            return Ok(());
        }
        let is_wrapper = self.phase == StreamPhase::InStream
            && self.wrapper_name.as_deref() == Some(name);
        if !is_wrapper {
            return Err(ParseError::new(ErrorKind::InvalidToken, start));
        }
        self.namespaces.pop_scope();
        self.phase = StreamPhase::StreamEnded;
        self.sink.stream_end();
        Ok(())
    }

    /// The wrapper resolves like any element, except that an undeclared
    /// `stream` prefix falls back to the stream namespace; some legacy
    /// servers omit the declaration on the frame tag.
    fn resolve_wrapper_name(&self, raw: &str) -> QName {
        let (prefix, local) = split_qname(raw);
        let prefix = prefix.unwrap_or("stream");
        let uri = self
            .lookup(prefix)
            .unwrap_or_else(|| StrTendril::from_slice(ns::STREAM));
        QName::prefixed(
            StrTendril::from_slice(prefix),
            StrTendril::from_slice(local),
            uri,
        )
    }

    fn resolve_element_name(&self, raw: &str, offset: usize) -> Result<QName, ParseError> {
        let (prefix, local) = split_qname(raw);
        match prefix {
            Some(p) => match self.lookup(p) {
                Some(uri) => Ok(QName::prefixed(
                    StrTendril::from_slice(p),
                    StrTendril::from_slice(local),
                    uri,
                )),
                None => Err(ParseError::new(ErrorKind::UnresolvedPrefix, offset)),
            },
            None => match self.lookup("") {
                Some(uri) => Ok(QName::new(StrTendril::from_slice(local), Some(uri))),
                None if self.opts.legacy_stanza_fallback && LEGACY_STANZAS.contains(&local) => {
                    Ok(QName::new(
                        StrTendril::from_slice(local),
                        Some(StrTendril::from_slice(ns::JABBER_CLIENT)),
                    ))
                }
                None => Err(ParseError::new(ErrorKind::UnresolvedPrefix, offset)),
            },
        }
    }

    /// Unprefixed attributes never take the default namespace.
    fn resolve_attr_name(&self, raw: &str, offset: usize) -> Result<QName, ParseError> {
        let (prefix, local) = split_qname(raw);
        match prefix {
            Some("xmlns") => Ok(QName::prefixed(
                StrTendril::from_slice("xmlns"),
                StrTendril::from_slice(local),
                StrTendril::from_slice(ns::XMLNS),
            )),
            Some(p) => match self.lookup(p) {
                Some(uri) => Ok(QName::prefixed(
                    StrTendril::from_slice(p),
                    StrTendril::from_slice(local),
                    uri,
                )),
                None => Err(ParseError::new(ErrorKind::UnresolvedPrefix, offset)),
            },
            None if raw == "xmlns" => Ok(QName::new(
                StrTendril::from_slice("xmlns"),
                Some(StrTendril::from_slice(ns::XMLNS)),
            )),
            None => Ok(QName::new(StrTendril::from_slice(local), None)),
        }
    }

    /// An `xmlns=""` declaration unbinds rather than binds.
    fn lookup(&self, prefix: &str) -> Option<StrTendril> {
        self.namespaces.lookup(prefix).filter(|uri| !uri.is_empty())
    }

    fn add_text(&mut self, text: &str) {
        if self.in_cdata {
            self.cdata_text.push_slice(text);
        } else if !self.open_elems.is_empty() {
            self.pending_text.push_slice(text);
        } else if !is_xml_space(text) {
            warn!("discarding {} bytes of text outside any stanza", text.len());
        }
    }

    fn add_char(&mut self, c: char) {
        if self.in_cdata {
            self.cdata_text.push_char(c);
        } else if !self.open_elems.is_empty() {
            self.pending_text.push_char(c);
        } else if !c.is_ascii_whitespace() {
            warn!("discarding character {:?} outside any stanza", c);
        }
    }

    fn flush_text(&mut self) {
        if self.pending_text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending_text);
        let (parent, _) = unwrap_or_return!(self.open_elems.last(), ());
        let parent = parent.clone();
        self.sink.append(&parent, NodeOrText::AppendText(text));
    }

    fn append_cdata(&mut self) {
        let text = std::mem::take(&mut self.cdata_text);
        let (parent, _) = unwrap_or_return!(self.open_elems.last(), ());
        let parent = parent.clone();
        let node = self.sink.create_cdata(text);
        self.sink.append(&parent, NodeOrText::AppendNode(node));
    }

    fn comment(&mut self, text: &str) {
        if self.open_elems.is_empty() {
            debug!("discarding comment outside any stanza");
            return;
        }
        self.flush_text();
        let (parent, _) = unwrap_or_return!(self.open_elems.last(), ());
        let parent = parent.clone();
        let node = self.sink.create_comment(StrTendril::from_slice(text));
        self.sink.append(&parent, NodeOrText::AppendNode(node));
    }
}

/// Borrow `buf[start..end]` as text. The scanner has already checked
/// the bytes, so a failure here is a bug, but it is reported rather
/// than trusted.
fn text_slice(buf: &[u8], start: usize, end: usize) -> Result<&str, ParseError> {
    std::str::from_utf8(&buf[start..end])
        .map_err(|e| ParseError::new(ErrorKind::MalformedUtf8, start + e.valid_up_to()))
}

/// True when `text` is only XML whitespace.
fn is_xml_space(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

/// Produce the normalized value for one attribute span. A span the
/// scanner marked normalized is used verbatim; otherwise it is
/// re-scanned, resolving references and mapping each whitespace
/// character to a single space.
fn assemble_attribute_value(buf: &[u8], span: &AttributeSpan) -> Result<StrTendril, ParseError> {
    if span.normalized {
        return Ok(StrTendril::from_slice(text_slice(
            buf,
            span.value_start,
            span.value_end,
        )?));
    }
    let window = &buf[span.value_start..span.value_end];
    let mut out = StrTendril::new();
    let mut token = ContentToken::new();
    let mut off = 0;
    while off < window.len() {
        match tokenize_attribute_value(window, off, &mut token) {
            Scan::Token(kind) | Scan::Ambiguous(kind) => {
                match kind {
                    TokenKind::DataChars => {
                        out.push_slice(text_slice(window, off, token.token_end)?);
                    }
                    TokenKind::DataNewline | TokenKind::AttributeValueWhitespace => {
                        out.push_char(' ');
                    }
                    TokenKind::CharRef
                    | TokenKind::CharPairRef
                    | TokenKind::MagicEntityRef => out.push_char(token.ref_char),
                    _ => {
                        return Err(ParseError::new(
                            ErrorKind::InvalidToken,
                            span.value_start + off,
                        ));
                    }
                }
                off = token.token_end;
            }
            // the span was fully delimited by the tag scan, so neither
            // of these can occur on a well-formed span
            Scan::Incomplete => {
                return Err(ParseError::new(
                    ErrorKind::InvalidToken,
                    span.value_start + off,
                ));
            }
            Scan::Fatal(e) => {
                return Err(ParseError::new(e.kind, span.value_start + e.offset));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::{assemble_attribute_value, is_xml_space};
    use crate::error::ErrorKind;
    use crate::tokenizer::AttributeSpan;

    fn span(buf: &[u8], normalized: bool) -> AttributeSpan {
        AttributeSpan {
            name_start: 0,
            name_end: 0,
            value_start: 0,
            value_end: buf.len(),
            normalized,
        }
    }

    #[test]
    fn normalized_span_verbatim() {
        let buf = b"chat";
        let value = assemble_attribute_value(buf, &span(buf, true)).unwrap();
        assert_eq!(&*value, "chat");
    }

    #[test]
    fn references_resolved() {
        let buf = b"a&amp;b&#x41;";
        let value = assemble_attribute_value(buf, &span(buf, false)).unwrap();
        assert_eq!(&*value, "a&bA");
    }

    #[test]
    fn whitespace_maps_to_single_spaces() {
        let buf = b"x \t y\r\nz";
        let value = assemble_attribute_value(buf, &span(buf, false)).unwrap();
        assert_eq!(&*value, "x   y z");
    }

    #[test]
    fn named_entity_rejected() {
        let buf = b"a&nbsp;b";
        let err = assemble_attribute_value(buf, &span(buf, false)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidToken);
    }

    #[test]
    fn xml_space() {
        assert!(is_xml_space(" \t\r\n"));
        assert!(!is_xml_space(" x "));
    }
}
