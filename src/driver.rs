// Copyright 2025 The xmpp5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The push-mode driver tying buffer, scanner and assembler together.

use crate::buffer::BufferAggregate;
use crate::error::ParseError;
use crate::interface::TreeSink;
use crate::tokenizer::{tokenize_cdata_section, tokenize_content, ContentToken, Scan};
use crate::tree_builder::{XmppStreamBuilder, XmppStreamBuilderOpts};

/// An incremental XMPP stream parser.
///
/// Feed it the connection's bytes with [`write`](XmppParser::write) in
/// whatever chunks the transport delivers. Events reach the sink during
/// the `write` call that completes them; bytes ending mid-token are
/// buffered and consumed by a later call. Call
/// [`finish`](XmppParser::finish) when the connection closes to resolve
/// tokens that were held back waiting for lookahead.
///
/// A fatal error poisons the parser: the same error is returned from
/// every later call until [`reset`](XmppParser::reset).
pub struct XmppParser<Sink: TreeSink> {
    buffer: BufferAggregate,
    builder: XmppStreamBuilder<Sink>,
    scratch: ContentToken,
    /// Bytes dropped from the front of the buffer since the last reset.
    consumed: usize,
    failed: Option<ParseError>,
}

impl<Sink: TreeSink> XmppParser<Sink> {
    /// A parser feeding `sink`, with default options.
    pub fn new(sink: Sink) -> XmppParser<Sink> {
        XmppParser::with_opts(sink, Default::default())
    }

    /// A parser feeding `sink`.
    pub fn with_opts(sink: Sink, opts: XmppStreamBuilderOpts) -> XmppParser<Sink> {
        XmppParser {
            buffer: BufferAggregate::new(),
            builder: XmppStreamBuilder::new_with_opts(sink, opts),
            scratch: ContentToken::new(),
            consumed: 0,
            failed: None,
        }
    }

    /// Feed one chunk of stream bytes, emitting every event the chunk
    /// completes.
    ///
    /// Error offsets are absolute byte positions in the stream, however
    /// the input was chunked.
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), ParseError> {
        if let Some(e) = self.failed {
            return Err(e);
        }
        self.buffer.write(chunk);
        self.run(false)
    }

    /// Signal end of input, flushing tokens that were waiting for one
    /// byte of lookahead (a trailing `\r` or `]`).
    ///
    /// Bytes that still end mid-token are dropped without error; a cut
    /// connection routinely dies mid-stanza.
    pub fn finish(&mut self) -> Result<(), ParseError> {
        if let Some(e) = self.failed {
            return Err(e);
        }
        self.run(true)
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &Sink {
        &self.builder.sink
    }

    /// Borrow the sink mutably.
    pub fn sink_mut(&mut self) -> &mut Sink {
        &mut self.builder.sink
    }

    /// Drop the parser, keeping the sink.
    pub fn into_sink(self) -> Sink {
        self.builder.sink
    }

    /// Discard all buffered input, stream state and any sticky error.
    /// The sink keeps whatever it has built. The next write must open a
    /// fresh stream; offsets restart at zero.
    pub fn reset(&mut self) {
        self.buffer.reset();
        self.builder.reset();
        self.scratch.clear();
        self.consumed = 0;
        self.failed = None;
    }

    fn run(&mut self, is_final: bool) -> Result<(), ParseError> {
        let mut off = 0;
        let status = loop {
            let buf = self.buffer.view();
            if off >= buf.len() {
                break Ok(());
            }
            let scan = if self.builder.in_cdata() {
                tokenize_cdata_section(buf, off, &mut self.scratch)
            } else {
                tokenize_content(buf, off, &mut self.scratch)
            };
            let kind = match scan {
                Scan::Token(kind) => kind,
                Scan::Ambiguous(kind) if is_final => kind,
                Scan::Ambiguous(_) | Scan::Incomplete => break Ok(()),
                Scan::Fatal(e) => break Err(e),
            };
            if let Err(e) = self.builder.process_token(buf, off, &self.scratch, kind) {
                break Err(e);
            }
            off = self.scratch.token_end;
        };
        let status = status.map_err(|e| ParseError {
            kind: e.kind,
            offset: self.consumed + e.offset,
        });
        self.buffer.clear(off);
        self.consumed += off;
        if let Err(e) = status {
            self.failed = Some(e);
            return Err(e);
        }
        Ok(())
    }
}
