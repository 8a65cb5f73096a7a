// Copyright 2025 The xmpp5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Push based streaming XML parser for XMPP streams.
//!
//! An XMPP connection is one long XML document that is never complete:
//! the `<stream:stream>` wrapper opens when the connection is set up and
//! its end tag arrives only when the connection closes. In between, each
//! depth-one child element is a complete stanza. This crate parses that
//! document incrementally: feed it byte chunks as they arrive from the
//! socket, in any partition, and it emits stream-start, stanza and
//! stream-end events through a [`TreeSink`] the moment they complete.
//!
//! The parser never blocks on input. Bytes that end mid-token are held
//! in an internal buffer and rescanned when the next chunk arrives, so
//! a multi-byte character or a `]]>` split across network packets parses
//! exactly as it would in one piece.

#![warn(missing_docs)]

pub use tendril;

pub mod buffer;
pub mod driver;
pub mod error;
pub mod interface;
pub mod namespaces;
pub mod tokenizer;
pub mod tree_builder;

pub use crate::driver::XmppParser;
pub use crate::error::{ErrorKind, ParseError};
pub use crate::interface::{Attribute, NodeOrText, QName, TreeSink};
pub use crate::tree_builder::XmppStreamBuilderOpts;
