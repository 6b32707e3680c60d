//! Name handling for C++ mangled symbols.
//!
//! Function markers in the dump carry both a demangled and a mangled name. The mangled
//! name is the graph key; the demangled one is kept as an alias so users can name
//! functions the way they appear in source.

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::warn;

/// Rewrite a base-object constructor/destructor tag (`C2`/`D2`) to the complete-object
/// variant (`C1`/`D1`).
///
/// Some compiler versions name the body in the `;; Function` marker after the base-object
/// variant while call sites reference the complete-object one. The tag is located right after
/// the run of length-prefixed components following `_ZN`, e.g. `_ZN2ns3FooC2Ev`.
///
/// Only valid for classes without virtual bases, where the two variants are the same code.
/// Names using template arguments or substitutions inside the nested name are left alone.
pub fn normalize_ctor_dtor(mangled: &str) -> Cow<'_, str> {
    if !mangled.starts_with("_ZN") {
        return Cow::Borrowed(mangled);
    }

    let bytes = mangled.as_bytes();
    let mut pos = 3;
    let mut components = 0;
    loop {
        let digits = bytes[pos..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            break;
        }
        let Ok(len) = mangled[pos..pos + digits].parse::<usize>() else {
            return Cow::Borrowed(mangled);
        };
        match (pos + digits).checked_add(len) {
            Some(next) if next <= bytes.len() => pos = next,
            _ => return Cow::Borrowed(mangled),
        }
        components += 1;
    }

    if components == 0 || pos + 2 > bytes.len() {
        return Cow::Borrowed(mangled);
    }

    let replacement = match &bytes[pos..pos + 2] {
        b"C2" => "C1",
        b"D2" => "D1",
        _ => return Cow::Borrowed(mangled),
    };

    let mut fixed = String::with_capacity(mangled.len());
    fixed.push_str(&mangled[..pos]);
    fixed.push_str(replacement);
    fixed.push_str(&mangled[pos + 2..]);
    Cow::Owned(fixed)
}

/// Demangled name → mangled graph key. Last registration wins.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NameAliases {
    demangled: HashMap<String, String>,
}

impl NameAliases {
    pub fn register(&mut self, demangled: impl Into<String>, mangled: impl Into<String>) {
        self.demangled.insert(demangled.into(), mangled.into());
    }

    pub fn get(&self, demangled: &str) -> Option<&str> {
        self.demangled.get(demangled).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.demangled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.demangled.is_empty()
    }

    /// Translate a user-supplied function name into a graph key.
    ///
    /// Aliases take priority over exact key matches. Unknown names are reported and yield `None`.
    pub fn resolve(&self, name: &str, is_key: impl Fn(&str) -> bool) -> Option<String> {
        if let Some(mangled) = self.get(name) {
            return Some(mangled.to_string());
        }
        if is_key(name) {
            return Some(name.to_string());
        }
        warn!(function = name, "unknown function name, ignoring");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_ctor_becomes_complete_ctor() {
        assert_eq!(normalize_ctor_dtor("_ZN3FooC2Ev"), "_ZN3FooC1Ev");
        assert_eq!(normalize_ctor_dtor("_ZN2ns3FooC2ERKS0_"), "_ZN2ns3FooC1ERKS0_");
    }

    #[test]
    fn base_dtor_becomes_complete_dtor() {
        assert_eq!(normalize_ctor_dtor("_ZN3FooD2Ev"), "_ZN3FooD1Ev");
    }

    #[test]
    fn other_names_untouched() {
        for name in [
            "main",
            "_Z3fooi",
            "_ZN3FooC1Ev",
            "_ZN3Foo3barEv",
            "_ZN3FooD0Ev",
            "_ZN",
            "_ZN3Fo",
            "_ZN3FooC",
            "_ZN3FooIiEC2Ev",
        ] {
            assert!(matches!(normalize_ctor_dtor(name), Cow::Borrowed(n) if n == name), "{name}");
        }
    }

    #[test]
    fn method_named_like_a_tag_is_not_rewritten() {
        // `C2` here is the length-prefixed method name, not a ctor tag
        assert_eq!(normalize_ctor_dtor("_ZN3Foo2C2Ev"), "_ZN3Foo2C2Ev");
    }

    #[test]
    fn resolve_prefers_alias() {
        let mut aliases = NameAliases::default();
        aliases.register("foo()", "_Z3foov");
        assert_eq!(aliases.resolve("foo()", |_| true), Some("_Z3foov".to_string()));
        assert_eq!(aliases.resolve("main", |k| k == "main"), Some("main".to_string()));
        assert_eq!(aliases.resolve("missing", |_| false), None);
    }

    #[test]
    fn last_alias_wins() {
        let mut aliases = NameAliases::default();
        aliases.register("foo()", "_Z3foov");
        aliases.register("foo()", "_ZN1a3fooEv");
        assert_eq!(aliases.get("foo()"), Some("_ZN1a3fooEv"));
        assert_eq!(aliases.len(), 1);
    }
}
