// Copyright 2025 The xmpp5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The low-level tokenizer.
//!
//! This layer is pure: it scans one token at a time out of a byte
//! window and reports spans, with no buffering, no namespace knowledge
//! and no stream state beyond "am I inside a CDATA section", which the
//! caller carries. See [`Scan`] for the resumption contract.

pub mod byteclass;
mod qname;
mod scan;
mod token;

pub use self::qname::split_qname;
pub use self::scan::{tokenize_attribute_value, tokenize_cdata_section, tokenize_content, Scan};
pub use self::token::{AttributeSpan, AttributeTable, ContentToken, TokenKind};
