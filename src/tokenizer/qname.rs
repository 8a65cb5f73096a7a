// Copyright 2025 The xmpp5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// Split a qualified name into its prefix and local part.
///
/// Names with no colon, a leading or trailing colon, or more than one
/// colon are treated as having no prefix; resolving them is the
/// caller's problem.
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.find(':') {
        Some(pos) if pos > 0 && pos < name.len() - 1 => {
            let (prefix, local) = (&name[..pos], &name[pos + 1..]);
            if local.contains(':') {
                (None, name)
            } else {
                (Some(prefix), local)
            }
        }
        _ => (None, name),
    }
}

#[cfg(test)]
mod test {
    use super::split_qname;

    #[test]
    fn splits_prefixed_names() {
        assert_eq!(split_qname("stream:stream"), (Some("stream"), "stream"));
        assert_eq!(split_qname("xmlns:p"), (Some("xmlns"), "p"));
    }

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(split_qname("iq"), (None, "iq"));
        assert_eq!(split_qname("xmlns"), (None, "xmlns"));
    }

    #[test]
    fn degenerate_colons_are_not_prefixes() {
        assert_eq!(split_qname(":stream"), (None, ":stream"));
        assert_eq!(split_qname("stream:"), (None, "stream:"));
        assert_eq!(split_qname("a:b:c"), (None, "a:b:c"));
    }
}
