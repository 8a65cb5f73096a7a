// Copyright 2025 The xmpp5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::cell::RefCell;
use std::rc::Rc;

use tendril::StrTendril;
use xmpp5ever::{
    Attribute, ErrorKind, NodeOrText, ParseError, QName, TreeSink, XmppParser,
    XmppStreamBuilderOpts,
};

type Handle = Rc<RefCell<Node>>;

struct Node {
    kind: NodeKind,
    children: Vec<Handle>,
}

enum NodeKind {
    Element { name: QName, attrs: Vec<Attribute> },
    Text(StrTendril),
    Comment(StrTendril),
    Cdata(StrTendril),
}

fn new_node(kind: NodeKind) -> Handle {
    Rc::new(RefCell::new(Node {
        kind,
        children: Vec::new(),
    }))
}

enum Event {
    StreamStart { name: QName, attrs: Vec<Attribute> },
    Stanza(Handle),
    StreamEnd,
}

#[derive(Default)]
struct RecordingSink {
    events: Vec<Event>,
}

impl TreeSink for RecordingSink {
    type Handle = Handle;

    fn create_element(&mut self, name: QName, attrs: Vec<Attribute>) -> Handle {
        new_node(NodeKind::Element { name, attrs })
    }

    fn create_comment(&mut self, text: StrTendril) -> Handle {
        new_node(NodeKind::Comment(text))
    }

    fn create_cdata(&mut self, text: StrTendril) -> Handle {
        new_node(NodeKind::Cdata(text))
    }

    fn append(&mut self, parent: &Handle, child: NodeOrText<Handle>) {
        let mut parent = parent.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => parent.children.push(node),
            NodeOrText::AppendText(text) => {
                if let Some(last) = parent.children.last() {
                    if let NodeKind::Text(existing) = &mut last.borrow_mut().kind {
                        existing.push_tendril(&text);
                        return;
                    }
                }
                parent.children.push(new_node(NodeKind::Text(text)));
            }
        }
    }

    fn stream_start(&mut self, name: QName, attrs: Vec<Attribute>) {
        self.events.push(Event::StreamStart { name, attrs });
    }

    fn stanza(&mut self, stanza: Handle) {
        self.events.push(Event::Stanza(stanza));
    }

    fn stream_end(&mut self) {
        self.events.push(Event::StreamEnd);
    }
}

fn fmt_qname(q: &QName) -> String {
    let mut s = String::new();
    if let Some(ns) = &q.ns {
        s.push('{');
        s.push_str(ns);
        s.push('}');
    }
    if let Some(prefix) = &q.prefix {
        s.push_str(prefix);
        s.push(':');
    }
    s.push_str(&q.local);
    s
}

fn fmt_attrs(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .map(|a| format!(" {}='{}'", fmt_qname(&a.name), a.value))
        .collect()
}

fn render(node: &Handle) -> String {
    let node = node.borrow();
    match &node.kind {
        NodeKind::Element { name, attrs } => {
            let name = fmt_qname(name);
            let children: String = node.children.iter().map(render).collect();
            format!("<{}{}>{}</{}>", name, fmt_attrs(attrs), children, name)
        }
        NodeKind::Text(t) => t.to_string(),
        NodeKind::Comment(t) => format!("<!--{}-->", t),
        NodeKind::Cdata(t) => format!("<![CDATA[{}]]>", t),
    }
}

fn events(sink: &RecordingSink) -> Vec<String> {
    sink.events
        .iter()
        .map(|e| match e {
            Event::StreamStart { name, attrs } => {
                format!("start {}{}", fmt_qname(name), fmt_attrs(attrs))
            }
            Event::Stanza(node) => format!("stanza {}", render(node)),
            Event::StreamEnd => "end".to_owned(),
        })
        .collect()
}

fn parse_chunks(input: &[u8], size: usize) -> Result<Vec<String>, ParseError> {
    let mut parser = XmppParser::new(RecordingSink::default());
    for chunk in input.chunks(size) {
        parser.write(chunk)?;
    }
    parser.finish()?;
    Ok(events(parser.sink()))
}

const WRAPPER: &str = "<stream:stream \
                       xmlns:stream='http://etherx.jabber.org/streams' \
                       xmlns='jabber:client'>";

#[test]
fn chunking_does_not_change_events() {
    let input = concat!(
        "<?xml version='1.0'?>",
        "<stream:stream xmlns:stream='http://etherx.jabber.org/streams' ",
        "xmlns='jabber:client' id='c2s' version='1.0'>",
        "<message to='juliet@capulet.example' from='romeo@montague.example'>",
        "<body>O R&amp;J, say &#x263A;!</body>",
        "<!--aside-->",
        "<data><![CDATA[1 < 2 && 3]]></data>",
        "</message>",
        "\n",
        "<iq type='get' id='1'><query xmlns='jabber:iq:roster'/></iq>",
        "</stream:stream>"
    )
    .as_bytes();

    let whole = parse_chunks(input, input.len()).unwrap();
    assert_eq!(whole.len(), 4);
    assert!(whole[0].starts_with("start {http://etherx.jabber.org/streams}stream:stream"));
    assert!(whole[1].contains("O R&J, say \u{263A}!"));
    assert!(whole[1].contains("<!--aside-->"));
    assert!(whole[1].contains("<![CDATA[1 < 2 && 3]]>"));
    assert!(whole[2].contains("{jabber:iq:roster}query"));
    assert_eq!(whole[3], "end");

    for size in [1, 2, 3, 7, 16] {
        assert_eq!(parse_chunks(input, size).unwrap(), whole, "chunk size {}", size);
    }
}

#[test]
fn framing_order() {
    let input = [WRAPPER, "<iq/><message/><presence/></stream:stream>"].concat();
    let got = parse_chunks(input.as_bytes(), input.len()).unwrap();
    assert_eq!(got.len(), 5);
    assert!(got[0].starts_with("start "));
    assert!(got[1].starts_with("stanza <{jabber:client}iq"));
    assert!(got[2].starts_with("stanza <{jabber:client}message"));
    assert!(got[3].starts_with("stanza <{jabber:client}presence"));
    assert_eq!(got[4], "end");
}

#[test]
fn text_coalesces_into_one_node() {
    let input = [WRAPPER, "<message><body>a&amp;b&#33;c</body></message>"].concat();
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(input.as_bytes()).unwrap();
    let got = events(parser.sink());
    assert_eq!(
        got[1],
        "stanza <{jabber:client}message><{jabber:client}body>a&b!c\
         </{jabber:client}body></{jabber:client}message>"
    );
}

#[test]
fn multibyte_char_split_across_chunks() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(WRAPPER.as_bytes()).unwrap();
    let euro = "€".as_bytes();
    parser.write(b"<message><body>ab").unwrap();
    parser.write(&euro[..1]).unwrap();
    parser.write(&euro[1..2]).unwrap();
    parser.write(&euro[2..]).unwrap();
    parser.write(b"cd</body></message>").unwrap();
    let got = events(parser.sink());
    assert!(got[1].contains(">ab€cd<"), "{}", got[1]);
}

#[test]
fn crlf_split_across_chunks_is_one_newline() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(WRAPPER.as_bytes()).unwrap();
    parser.write(b"<message><body>a\r").unwrap();
    parser.write(b"\nb</body></message>").unwrap();
    let got = events(parser.sink());
    assert!(got[1].contains(">a\nb<"), "{}", got[1]);
}

#[test]
fn lone_cr_becomes_newline() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(WRAPPER.as_bytes()).unwrap();
    parser.write(b"<message><body>a\r").unwrap();
    parser.write(b"b</body></message>").unwrap();
    let got = events(parser.sink());
    assert!(got[1].contains(">a\nb<"), "{}", got[1]);
}

#[test]
fn cdata_across_three_chunks_is_one_node() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(WRAPPER.as_bytes()).unwrap();
    parser.write(b"<message><data><![CD").unwrap();
    parser.write(b"ATA[one ]] two").unwrap();
    parser.write(b" three]]></data></message>").unwrap();
    let got = events(parser.sink());
    assert!(got[1].contains("<![CDATA[one ]] two three]]>"), "{}", got[1]);
}

#[test]
fn namespace_scoping() {
    let input = [WRAPPER, "<r xmlns='urn:a'><c xmlns:p='urn:b' p:x='1'/><d/></r>"].concat();
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(input.as_bytes()).unwrap();
    let got = events(parser.sink());
    assert!(got[1].contains("<{urn:a}r"), "{}", got[1]);
    assert!(got[1].contains("<{urn:a}c"), "{}", got[1]);
    assert!(got[1].contains("{urn:b}p:x='1'"), "{}", got[1]);
    assert!(got[1].contains("<{urn:a}d"), "{}", got[1]);

    // p went out of scope with </r>
    let err = parser.write(b"<e p:y='2'/>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnresolvedPrefix);
}

#[test]
fn duplicate_attribute_reports_absolute_offset() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(WRAPPER.as_bytes()).unwrap();
    parser.write(b"<iq x='1' ").unwrap();
    let err = parser.write(b"x='2'/>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateAttribute);
    assert_eq!(err.offset, WRAPPER.len() + "<iq x='1' ".len());
}

#[test]
fn unresolved_attr_prefix_reports_absolute_offset() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(WRAPPER.as_bytes()).unwrap();
    let err = parser.write(b"<iq foo:x='1'/>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnresolvedPrefix);
    assert_eq!(err.offset, WRAPPER.len() + "<iq ".len());
}

#[test]
fn errors_are_sticky() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(WRAPPER.as_bytes()).unwrap();
    let err = parser.write(b"<iq x='1' x='2'/>").unwrap_err();
    assert_eq!(parser.write(b"<message/>").unwrap_err(), err);
    assert_eq!(parser.finish().unwrap_err(), err);
}

#[test]
fn reset_recovers_and_restarts_offsets() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(WRAPPER.as_bytes()).unwrap();
    parser.write(b"<iq x='1' x='2'/>").unwrap_err();

    parser.reset();
    parser.sink_mut().events.clear();
    parser.write(WRAPPER.as_bytes()).unwrap();
    parser.write(b"<iq type='get'/></stream:stream>").unwrap();
    let got = events(parser.sink());
    assert_eq!(got.len(), 3);
    assert!(got[1].starts_with("stanza <{jabber:client}iq"));
    assert_eq!(got[2], "end");

    // offsets count from the reset, not the connection
    parser.reset();
    let err = parser.write(&[0xFF]).unwrap_err();
    assert_eq!(err.offset, 0);
}

#[test]
fn legacy_stanza_fallback() {
    let no_default = "<stream:stream xmlns:stream='http://etherx.jabber.org/streams'>";

    let mut strict = XmppParser::new(RecordingSink::default());
    strict.write(no_default.as_bytes()).unwrap();
    let err = strict.write(b"<iq type='get'/>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnresolvedPrefix);

    let opts = XmppStreamBuilderOpts {
        legacy_stanza_fallback: true,
    };
    let mut legacy = XmppParser::with_opts(RecordingSink::default(), opts);
    legacy.write(no_default.as_bytes()).unwrap();
    legacy.write(b"<iq type='get'/>").unwrap();
    let got = events(legacy.sink());
    assert!(got[1].starts_with("stanza <{jabber:client}iq"), "{}", got[1]);

    // the fallback is only for the three stanza names
    let err = legacy.write(b"<foo/>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnresolvedPrefix);
}

#[test]
fn attribute_value_normalization() {
    let input = [
        WRAPPER,
        "<message a='x  &amp; y' b='v\tw' c='p\r\nq' d='plain'/>",
    ]
    .concat();
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(input.as_bytes()).unwrap();
    let got = events(parser.sink());
    assert!(got[1].contains("a='x  & y'"), "{}", got[1]);
    assert!(got[1].contains("b='v w'"), "{}", got[1]);
    assert!(got[1].contains("c='p q'"), "{}", got[1]);
    assert!(got[1].contains("d='plain'"), "{}", got[1]);
}

#[test]
fn wrapper_with_undeclared_stream_prefix() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser
        .write(b"<stream:stream xmlns='jabber:client'>")
        .unwrap();
    let got = events(parser.sink());
    assert!(
        got[0].starts_with("start {http://etherx.jabber.org/streams}stream:stream"),
        "{}",
        got[0]
    );
}

#[test]
fn keep_alive_whitespace_between_stanzas() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(WRAPPER.as_bytes()).unwrap();
    parser.write(b" \n").unwrap();
    parser.write(b"<iq/>").unwrap();
    parser.write(b"\r\n \t").unwrap();
    parser.finish().unwrap();
    assert_eq!(events(parser.sink()).len(), 2);
}

#[test]
fn xml_decl_is_skipped_and_pi_is_fatal() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(b"<?xml version='1.0' encoding='UTF-8'?>").unwrap();
    parser.write(WRAPPER.as_bytes()).unwrap();
    let err = parser.write(b"<?proc data?>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidToken);
}

#[test]
fn named_entity_is_fatal() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(WRAPPER.as_bytes()).unwrap();
    let err = parser.write(b"<message><body>&nbsp;</body></message>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidToken);
}

#[test]
fn stray_cdata_close_is_fatal() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(WRAPPER.as_bytes()).unwrap();
    let err = parser.write(b"<message><body>x]]></body></message>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidToken);
}

#[test]
fn malformed_utf8_is_fatal() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(WRAPPER.as_bytes()).unwrap();
    let err = parser.write(&[0xFF]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedUtf8);
    assert_eq!(err.offset, WRAPPER.len());
}

#[test]
fn end_tag_mismatch_is_fatal() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(WRAPPER.as_bytes()).unwrap();
    let err = parser.write(b"<message><body></message>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidToken);
}

#[test]
fn first_element_must_be_the_wrapper() {
    let mut parser = XmppParser::new(RecordingSink::default());
    let err = parser.write(b"<iq type='get'/>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidToken);
    assert_eq!(err.offset, 0);
}

#[test]
fn nothing_follows_stream_end() {
    let input = [WRAPPER, "</stream:stream>"].concat();
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(input.as_bytes()).unwrap();
    parser.write(b" \n").unwrap();
    let err = parser.write(b"<iq/>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidToken);
}

#[test]
fn empty_wrapper_opens_and_closes_the_stream() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser
        .write(b"<stream:stream xmlns:stream='http://etherx.jabber.org/streams'/>")
        .unwrap();
    assert_eq!(events(parser.sink()), ["start {http://etherx.jabber.org/streams}stream:stream {http://www.w3.org/2000/xmlns/}xmlns:stream='http://etherx.jabber.org/streams'", "end"]);
}

#[test]
fn finish_resolves_trailing_lookahead() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(WRAPPER.as_bytes()).unwrap();
    parser.write(b"<iq/>\r").unwrap();
    parser.finish().unwrap();
    assert_eq!(events(parser.sink()).len(), 2);
}

#[test]
fn bad_char_ref_is_fatal() {
    let mut parser = XmppParser::new(RecordingSink::default());
    parser.write(WRAPPER.as_bytes()).unwrap();
    let err = parser.write(b"<message><body>&#xD800;</body></message>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidToken);
}
