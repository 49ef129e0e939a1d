//! Stable identities for memoized callables.
//!
//! A [`Fingerprint`] is a SHA-256 digest that names a callable for the
//! [`CacheRegistry`](crate::CacheRegistry). It is derived from the best
//! representation available at build time, falling back in order:
//!
//! 1. **Source**: the callable's source text. [`callable!`](crate::callable)
//!    captures it for closure literals via `stringify!`; callers can also
//!    supply text or a hand-picked identity token with
//!    [`Callable::with_source`]. Identical text gives an identical
//!    fingerprint wherever it lives.
//! 2. **Compiled unit**: the qualified type name of the callable and the
//!    size of its captured environment. Named functions are unique by
//!    name; nameless ones (closures, fn pointers, trait objects) also mix
//!    in the code location recorded where they were wrapped.
//! 3. **Fallback**: a nameless callable with no recorded location is
//!    identified by its type's textual form alone. This can collide and is
//!    logged at `debug`.
//!
//! Derivation never fails and never invokes the callable.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{MuninnError, Result};

/// SHA-256 identity of a callable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint of a piece of source text (or any identity token).
    pub fn of_source(source: &str) -> Self {
        Self::digest(&[source.trim().as_bytes()])
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Digest length-prefixed parts so that part boundaries matter.
    fn digest(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

impl FromStr for Fingerprint {
    type Err = MuninnError;

    fn from_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// Which derivation produced a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintMethod {
    /// Digest of source text.
    Source,
    /// Digest of the qualified type name, capture size and, for nameless
    /// callables, the wrap-site location.
    CompiledUnit,
    /// Digest of the type's textual form only.
    Fallback,
}

/// Where a callable was wrapped, captured at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLocation {
    pub module_path: &'static str,
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

/// Capture the current [`CodeLocation`].
#[macro_export]
macro_rules! code_location {
    () => {
        $crate::CodeLocation {
            module_path: ::core::module_path!(),
            file: ::core::file!(),
            line: ::core::line!(),
            column: ::core::column!(),
        }
    };
}

/// Wrap a function or closure as a [`Callable`], recording what the
/// fingerprint derivation needs.
///
/// Closure literals get their source text captured; any other expression
/// (a function path, a boxed closure, a variable) is identified by its
/// type and the location of this macro call.
///
/// ```rust
/// use muninn::callable;
///
/// fn double(x: u32) -> u32 {
///     x * 2
/// }
///
/// let by_name = callable!(double);
/// let inline = callable!(|x: u32| x * 2);
/// assert_ne!(by_name.fingerprint(), inline.fingerprint());
/// ```
#[macro_export]
macro_rules! callable {
    (move | $($rest:tt)*) => {
        $crate::callable!(@source move | $($rest)*)
    };
    (move || $($rest:tt)*) => {
        $crate::callable!(@source move || $($rest)*)
    };
    (| $($rest:tt)*) => {
        $crate::callable!(@source | $($rest)*)
    };
    (|| $($rest:tt)*) => {
        $crate::callable!(@source || $($rest)*)
    };
    (@source $($closure:tt)*) => {
        $crate::Callable::new($($closure)*)
            .with_source(::core::stringify!($($closure)*))
            .located($crate::code_location!())
    };
    ($f:expr) => {
        $crate::Callable::new($f).located($crate::code_location!())
    };
}

/// A function together with the facts its fingerprint is derived from.
pub struct Callable<F> {
    function: F,
    source: Option<Cow<'static, str>>,
    location: Option<CodeLocation>,
}

impl<F> Callable<F> {
    /// Wrap a function with no source text or location recorded.
    pub fn new(function: F) -> Self {
        Self {
            function,
            source: None,
            location: None,
        }
    }

    /// Identify the callable by this source text or identity token.
    pub fn with_source(mut self, source: impl Into<Cow<'static, str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Record where the callable was wrapped.
    pub fn located(mut self, location: CodeLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Fully qualified type name of the wrapped function.
    pub fn qualified_name(&self) -> &'static str {
        std::any::type_name::<F>()
    }

    /// Source text or identity token, if one was recorded.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Where the callable was wrapped, if recorded.
    pub fn location(&self) -> Option<CodeLocation> {
        self.location
    }

    /// The callable's fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        self.derive().0
    }

    /// Fingerprint plus the derivation path that produced it.
    pub fn derive(&self) -> (Fingerprint, FingerprintMethod) {
        if let Some(source) = self.source.as_deref().map(str::trim)
            && !source.is_empty()
        {
            return (Fingerprint::of_source(source), FingerprintMethod::Source);
        }

        let name = self.qualified_name();
        let capture_size = (std::mem::size_of::<F>() as u64).to_le_bytes();
        if !is_nameless(name) {
            let fp = Fingerprint::digest(&[name.as_bytes(), &capture_size]);
            return (fp, FingerprintMethod::CompiledUnit);
        }
        if let Some(loc) = self.location {
            let fp = Fingerprint::digest(&[
                name.as_bytes(),
                &capture_size,
                loc.module_path.as_bytes(),
                loc.file.as_bytes(),
                &loc.line.to_le_bytes(),
                &loc.column.to_le_bytes(),
            ]);
            debug!(type_name = name, fingerprint = %fp, "fingerprinted nameless callable by location");
            return (fp, FingerprintMethod::CompiledUnit);
        }

        let repr = format!("<callable {name}>");
        let fp = Fingerprint::digest(&[repr.as_bytes()]);
        debug!(type_name = name, fingerprint = %fp, "weak fingerprint for nameless callable without location");
        (fp, FingerprintMethod::Fallback)
    }

    /// Borrow the wrapped function.
    pub fn get_ref(&self) -> &F {
        &self.function
    }

    /// Unwrap the function.
    pub fn into_inner(self) -> F {
        self.function
    }
}

/// Type names that don't single out one function.
fn is_nameless(type_name: &str) -> bool {
    type_name.contains("{{closure}}")
        || type_name.starts_with("fn(")
        || type_name.starts_with("unsafe ")
        || type_name.starts_with("extern ")
        || type_name.contains("dyn ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(x: u32) -> u32 {
        x * 3
    }

    fn quadruple(x: u32) -> u32 {
        x * 4
    }

    #[test]
    fn source_text_is_trimmed() {
        assert_eq!(
            Fingerprint::of_source("  |x| x + 1\n"),
            Fingerprint::of_source("|x| x + 1")
        );
    }

    #[test]
    fn hex_round_trip() {
        let fp = Fingerprint::of_source("fn a() {}");
        let parsed: Fingerprint = fp.to_hex().parse().unwrap();
        assert_eq!(parsed, fp);
        assert_eq!(fp.to_hex().len(), 64);
    }

    #[test]
    fn bad_hex_is_rejected() {
        let err = "not-hex".parse::<Fingerprint>().unwrap_err();
        assert!(matches!(err, MuninnError::InvalidFingerprint(_)));
        assert!("abcd".parse::<Fingerprint>().is_err());
    }

    #[test]
    fn debug_shows_prefix() {
        let fp = Fingerprint::of_source("x");
        let dbg = format!("{fp:?}");
        assert!(dbg.starts_with("Fingerprint("));
        assert!(fp.to_hex().starts_with(&dbg["Fingerprint(".len()..dbg.len() - 1]));
    }

    #[test]
    fn named_functions_use_compiled_unit() {
        let (fp, method) = Callable::new(triple).derive();
        assert_eq!(method, FingerprintMethod::CompiledUnit);
        assert_eq!(fp, Callable::new(triple).fingerprint());
        assert_ne!(fp, Callable::new(quadruple).fingerprint());
    }

    #[test]
    fn named_function_ignores_wrap_site() {
        let here = Callable::new(triple).located(crate::code_location!());
        let there = Callable::new(triple).located(crate::code_location!());
        assert_eq!(here.fingerprint(), there.fingerprint());
    }

    #[test]
    fn closures_at_different_sites_differ() {
        let a = Callable::new(|x: u32| x + 1).located(crate::code_location!());
        let b = Callable::new(|x: u32| x + 1).located(crate::code_location!());
        assert_eq!(a.derive().1, FingerprintMethod::CompiledUnit);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fn_pointer_without_location_falls_back() {
        let f: fn(u32) -> u32 = triple;
        let (_, method) = Callable::new(f).derive();
        assert_eq!(method, FingerprintMethod::Fallback);
    }

    #[test]
    fn blank_source_is_ignored() {
        let (_, method) = Callable::new(triple).with_source("   ").derive();
        assert_eq!(method, FingerprintMethod::CompiledUnit);
    }

    #[test]
    fn nameless_detection() {
        assert!(is_nameless("my_crate::f::{{closure}}"));
        assert!(is_nameless("fn(u32) -> u32"));
        assert!(is_nameless("alloc::boxed::Box<dyn core::ops::function::Fn(u32) -> u32>"));
        assert!(!is_nameless("my_crate::pool::connect"));
    }
}
