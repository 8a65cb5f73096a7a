// Copyright 2025 The xmpp5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Types the parser hands to its consumer.

use tendril::StrTendril;

/// Well-known namespace URIs.
pub mod ns {
    /// The namespace bound to the reserved `xml` prefix.
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    /// The namespace bound to the reserved `xmlns` prefix.
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
    /// The namespace of the stream wrapper element.
    pub const STREAM: &str = "http://etherx.jabber.org/streams";
    /// The classic client-to-server content namespace.
    pub const JABBER_CLIENT: &str = "jabber:client";
}

/// A namespace-resolved name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QName {
    /// The prefix as written, kept for reserialization.
    pub prefix: Option<StrTendril>,
    /// The local part.
    pub local: StrTendril,
    /// The resolved namespace URI. `None` for an unprefixed name with
    /// no default namespace in scope (possible only for attributes;
    /// elements fall under the default declaration).
    pub ns: Option<StrTendril>,
}

impl QName {
    /// A name with no prefix.
    pub fn new(local: StrTendril, ns: Option<StrTendril>) -> QName {
        QName {
            prefix: None,
            local,
            ns,
        }
    }

    /// A prefixed name.
    pub fn prefixed(prefix: StrTendril, local: StrTendril, ns: StrTendril) -> QName {
        QName {
            prefix: Some(prefix),
            local,
            ns: Some(ns),
        }
    }
}

/// A resolved attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute name.
    pub name: QName,
    /// The normalized attribute value.
    pub value: StrTendril,
}

/// Something to append to an element: a child node or a run of text.
pub enum NodeOrText<Handle> {
    /// Append a node built by the sink.
    AppendNode(Handle),
    /// Append text, merging with a preceding text node if the sink
    /// keeps one.
    AppendText(StrTendril),
}

/// Receives parse events and owns the tree being built.
///
/// The parser drives a sink the whole life of one stream: one
/// `stream_start`, any number of `stanza` calls, then at most one
/// `stream_end`. Element and text construction happens between those
/// through the node-building methods; nodes reachable from a stanza
/// handle stay valid until the sink drops them.
pub trait TreeSink {
    /// The sink's node reference. Cheaply cloneable.
    type Handle: Clone;

    /// Build an element with its attributes already resolved.
    fn create_element(&mut self, name: QName, attrs: Vec<Attribute>) -> Self::Handle;

    /// Build a comment node.
    fn create_comment(&mut self, text: StrTendril) -> Self::Handle;

    /// Build a CDATA section node.
    fn create_cdata(&mut self, text: StrTendril) -> Self::Handle;

    /// Append a node or text to a parent element.
    fn append(&mut self, parent: &Self::Handle, child: NodeOrText<Self::Handle>);

    /// The stream wrapper's start tag arrived.
    fn stream_start(&mut self, name: QName, attrs: Vec<Attribute>);

    /// A depth-one element closed: a complete stanza.
    fn stanza(&mut self, stanza: Self::Handle);

    /// The stream wrapper's end tag arrived; no further events follow.
    fn stream_end(&mut self);
}
