// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::test_util::{eval, fixture};
use tandem_script::Value;

#[test]
fn md5_known_vector() {
    let fx = fixture();
    assert_eq!(
        eval(&fx, "var h = new Hasher(\"md5\"); h.update(\"abc\"); result = h.hexDigest();"),
        Value::str("900150983cd24fb0d6963f7d28e17f72")
    );
}

#[test]
fn sha1_known_vector() {
    let fx = fixture();
    assert_eq!(
        eval(&fx, "var h = new Hasher(\"sha1\"); h.update(\"abc\"); result = h.hexDigest();"),
        Value::str("a9993e364706816aba3e25717850c26c9cd0d89d")
    );
}

#[test]
fn sha256_known_vector() {
    let fx = fixture();
    assert_eq!(
        eval(&fx, "var h = new Hasher(\"sha256\"); h.update(\"abc\"); result = h.hexDigest();"),
        Value::str("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
    );
}

#[test]
fn updates_accumulate_and_clear_resets() {
    let fx = fixture();
    assert_eq!(
        eval(
            &fx,
            "var h = new Hasher(\"md5\"); h.update(\"a\"); h.update(\"bc\"); \
             var split = h.hexDigest(); \
             var g = new Hasher(\"md5\"); g.update(\"abc\"); \
             result = split == g.hexDigest();"
        ),
        Value::Bool(true)
    );
    assert_eq!(
        eval(
            &fx,
            "var h = new Hasher(\"md5\"); h.update(\"junk\"); h.clear(); h.update(\"abc\"); \
             result = h.hexDigest();"
        ),
        Value::str("900150983cd24fb0d6963f7d28e17f72")
    );
}

#[test]
fn digest_does_not_disturb_running_state() {
    let fx = fixture();
    assert_eq!(
        eval(
            &fx,
            "var h = new Hasher(\"md5\"); h.update(\"ab\"); var early = h.hexDigest(); \
             h.update(\"c\"); \
             result = (early != h.hexDigest()) && h.hexDigest() == \"900150983cd24fb0d6963f7d28e17f72\";"
        ),
        Value::Bool(true)
    );
}

#[test]
fn hash_lengths() {
    let fx = fixture();
    assert_eq!(eval(&fx, "result = new Hasher(\"md5\").hashLength();"), Value::Int(16));
    assert_eq!(eval(&fx, "result = new Hasher(\"sha1\").hashLength();"), Value::Int(20));
    assert_eq!(eval(&fx, "result = new Hasher(\"sha256\").hashLength();"), Value::Int(32));
}

#[test]
fn unknown_algorithm_is_null() {
    let fx = fixture();
    assert_eq!(eval(&fx, "result = new Hasher(\"crc32\") === null;"), Value::Bool(true));
}
