// Copyright 2025 The xmpp5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Lexically scoped namespace declarations.

use std::collections::BTreeMap;

use tendril::StrTendril;

use crate::interface::ns;

/// The stack of in-scope namespace declarations.
///
/// One scope per open element, on top of a base scope holding the two
/// reserved bindings (`xml` and `xmlns`). The base scope is never
/// popped. The default namespace is stored under the empty prefix.
#[derive(Debug)]
pub struct NamespaceStack {
    scopes: Vec<BTreeMap<String, StrTendril>>,
}

impl NamespaceStack {
    /// A stack holding only the reserved bindings.
    pub fn new() -> NamespaceStack {
        let mut base = BTreeMap::new();
        base.insert("xml".to_owned(), StrTendril::from_slice(ns::XML));
        base.insert("xmlns".to_owned(), StrTendril::from_slice(ns::XMLNS));
        NamespaceStack { scopes: vec![base] }
    }

    /// Open a scope for an element's declarations.
    pub fn push_scope(&mut self) {
        self.scopes.push(BTreeMap::new());
    }

    /// Close the innermost element scope.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Bind `prefix` (the empty string for the default namespace) to
    /// `uri` in the innermost scope.
    pub fn declare(&mut self, prefix: &str, uri: StrTendril) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(prefix.to_owned(), uri);
        }
    }

    /// Resolve `prefix`, innermost declaration winning.
    pub fn lookup(&self, prefix: &str) -> Option<StrTendril> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(prefix).cloned())
    }

    /// Drop every element scope, keeping the reserved bindings.
    pub fn reset(&mut self) {
        self.scopes.truncate(1);
    }
}

impl Default for NamespaceStack {
    fn default() -> NamespaceStack {
        NamespaceStack::new()
    }
}

#[cfg(test)]
mod test {
    use super::NamespaceStack;
    use crate::interface::ns;
    use tendril::StrTendril;

    fn uri(s: &str) -> StrTendril {
        StrTendril::from_slice(s)
    }

    #[test]
    fn reserved_bindings() {
        let stack = NamespaceStack::new();
        assert_eq!(stack.lookup("xml").as_deref(), Some(ns::XML));
        assert_eq!(stack.lookup("xmlns").as_deref(), Some(ns::XMLNS));
        assert_eq!(stack.lookup(""), None);
        assert_eq!(stack.lookup("stream"), None);
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut stack = NamespaceStack::new();
        stack.push_scope();
        stack.declare("p", uri("urn:outer"));
        stack.push_scope();
        assert_eq!(stack.lookup("p").as_deref(), Some("urn:outer"));
        stack.declare("p", uri("urn:inner"));
        assert_eq!(stack.lookup("p").as_deref(), Some("urn:inner"));
        stack.pop_scope();
        assert_eq!(stack.lookup("p").as_deref(), Some("urn:outer"));
        stack.pop_scope();
        assert_eq!(stack.lookup("p"), None);
    }

    #[test]
    fn default_namespace_under_empty_prefix() {
        let mut stack = NamespaceStack::new();
        stack.push_scope();
        stack.declare("", uri("jabber:client"));
        assert_eq!(stack.lookup("").as_deref(), Some("jabber:client"));
    }

    #[test]
    fn pop_and_reset_keep_base() {
        let mut stack = NamespaceStack::new();
        stack.pop_scope();
        assert_eq!(stack.lookup("xml").as_deref(), Some(ns::XML));
        stack.push_scope();
        stack.push_scope();
        stack.declare("a", uri("urn:a"));
        stack.reset();
        assert_eq!(stack.lookup("a"), None);
        assert_eq!(stack.lookup("xmlns").as_deref(), Some(ns::XMLNS));
    }
}
