//! Tests for callable fingerprinting.

use std::collections::HashSet;

use muninn::{Callable, Fingerprint, FingerprintMethod, callable, code_location};

fn add(x: i32, y: i32) -> i32 {
    x + y
}

fn sub(x: i32, y: i32) -> i32 {
    x - y
}

mod other {
    pub fn add(x: i32, y: i32) -> i32 {
        x + y
    }
}

// =========================================================================
// Derivation paths
// =========================================================================

#[test]
fn closure_literal_is_fingerprinted_by_source() {
    let c = callable!(|x: u32| x + 1);
    let (fp, method) = c.derive();

    assert_eq!(method, FingerprintMethod::Source);
    assert_eq!(Some(fp), c.source().map(Fingerprint::of_source));
    assert!(c.source().unwrap().contains("x + 1"));
    assert!(c.location().is_some());
}

#[test]
fn identical_source_text_gives_identical_fingerprints() {
    let a = callable!(|x: u32| x * 10);
    let b = callable!(|x: u32| x * 10);
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn different_source_text_gives_different_fingerprints() {
    let a = callable!(|x: u32| x * 10);
    let b = callable!(|x: u32| x * 11);
    assert_ne!(a.fingerprint(), b.fingerprint());
}

#[test]
fn move_closures_are_captured_too() {
    let offset = 3;
    let c = callable!(move |x: i32| x + offset);
    assert_eq!(c.derive().1, FingerprintMethod::Source);
    assert_eq!((c.get_ref())(1), 4);
}

#[test]
fn named_function_uses_its_path() {
    let (fp, method) = callable!(add).derive();
    assert_eq!(method, FingerprintMethod::CompiledUnit);
    assert_eq!(fp, callable!(add).fingerprint());
    assert_ne!(fp, callable!(sub).fingerprint());
    assert_ne!(fp, callable!(other::add).fingerprint());
}

#[test]
fn explicit_identity_token_wins() {
    let a = Callable::new(add).with_source("pool::connect@v2");
    let b = Callable::new(sub).with_source("pool::connect@v2");
    assert_eq!(a.derive().1, FingerprintMethod::Source);
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn boxed_closures_are_told_apart_by_location() {
    let boxed: Box<dyn Fn(i32) -> i32 + Send + Sync> = Box::new(|x| x + 1);
    let other: Box<dyn Fn(i32) -> i32 + Send + Sync> = Box::new(|x| x + 1);

    let a = callable!(boxed);
    let b = callable!(other);
    assert_eq!(a.derive().1, FingerprintMethod::CompiledUnit);
    assert_ne!(a.fingerprint(), b.fingerprint());
}

#[test]
fn unlocated_fn_pointer_falls_back_but_is_stable() {
    let f: fn(i32, i32) -> i32 = add;
    let (first, method) = Callable::new(f).derive();
    let (second, _) = Callable::new(f).derive();

    assert_eq!(method, FingerprintMethod::Fallback);
    assert_eq!(first, second);
}

#[test]
fn code_location_points_here() {
    let loc = code_location!();
    assert_eq!(loc.file, file!());
    assert!(loc.module_path.ends_with("fingerprint_test"));
    assert!(loc.line > 0);
}

// =========================================================================
// Fingerprint value
// =========================================================================

#[test]
fn renders_as_64_hex_chars() {
    let fp = callable!(add).fingerprint();
    let hex = fp.to_string();
    assert_eq!(hex.len(), 64);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(hex.parse::<Fingerprint>().unwrap(), fp);
    assert_eq!(fp.as_bytes().len(), 32);
}

#[test]
fn known_digest_is_stable() {
    let a = Fingerprint::of_source("fn a() {}");
    let b = Fingerprint::of_source("fn a() {}");
    let set: HashSet<Fingerprint> = [a, b, Fingerprint::of_source("fn b() {}")].into();
    assert_eq!(set.len(), 2);
}

#[test]
fn into_inner_returns_the_function() {
    let f = callable!(add).into_inner();
    assert_eq!(f(2, 3), 5);
}
