// Copyright 2025 The xmpp5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Fatal parse errors.
//!
//! Running out of input is not an error here: the parser buffers a
//! partial token and resumes on the next write. Everything in this
//! module is unrecoverable for the stream that produced it.

use thiserror::Error;

/// What kind of fatal error occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// The input does not match any XML token production.
    #[error("invalid token")]
    InvalidToken,
    /// A start tag carries two attributes with the same name.
    #[error("duplicate attribute")]
    DuplicateAttribute,
    /// A name uses a prefix with no in-scope namespace declaration.
    #[error("unresolved namespace prefix")]
    UnresolvedPrefix,
    /// The input is not well-formed UTF-8.
    #[error("malformed UTF-8")]
    MalformedUtf8,
}

/// A fatal parse error at an absolute byte position in the stream.
///
/// Once `write` returns one of these the stream is dead: every later
/// `write` on the same parser repeats the error until `reset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("{kind} at byte {offset}")]
pub struct ParseError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Byte position, counted from the start of the stream (or the last
    /// `reset`).
    pub offset: usize,
}

impl ParseError {
    pub(crate) fn new(kind: ErrorKind, offset: usize) -> ParseError {
        ParseError { kind, offset }
    }
}
