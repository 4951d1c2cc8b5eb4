//! JSON test vector loader shared by the codec vector tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;
use std::sync::Arc;

use base64::Engine;
use serde::Deserialize;

use corona_core::codec::{Codec, CodecKind};

#[derive(Debug, Deserialize)]
pub struct TestVector {
    pub description: String,
    pub codec: CodecKind,
    pub frame: FrameData,
    #[serde(default)]
    pub expect: Option<Expect>,
    #[serde(default)]
    pub expect_error: Option<ExpectError>,
}

impl TestVector {
    pub fn codec(&self) -> Arc<dyn Codec> {
        self.codec.build()
    }
}

#[derive(Debug, Deserialize)]
pub struct Expect {
    pub tag: u8,
    /// Canonical JSON form of the decoded message.
    pub message: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct ExpectError {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct FrameData {
    pub encoding: String,
    pub data: String,
}

impl FrameData {
    pub fn decode(&self) -> Vec<u8> {
        match self.encoding.as_str() {
            "utf8" => self.data.as_bytes().to_vec(),
            "base64" => base64::engine::general_purpose::STANDARD
                .decode(&self.data)
                .expect("invalid base64 in test vector"),
            "hex" => hex::decode(&self.data).expect("invalid hex in test vector"),
            other => panic!("unsupported encoding: {other}"),
        }
    }
}

pub fn load(name: &str) -> TestVector {
    let s = fs::read_to_string(format!("tests/vectors/{name}")).unwrap();
    serde_json::from_str(&s).unwrap()
}

/// Every vector file whose name starts with `prefix`, sorted.
pub fn load_all(prefix: &str) -> Vec<(String, TestVector)> {
    let mut names: Vec<String> = fs::read_dir("tests/vectors")
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with(prefix) && n.ends_with(".json"))
        .collect();
    names.sort();
    names.into_iter().map(|n| (n.clone(), load(&n))).collect()
}

/// Decode the vector's frame and check it against the expectation.
pub fn check(name: &str, v: &TestVector) {
    let raw = v.frame.decode();
    let res = v.codec().decode(&raw);

    if let Some(err) = &v.expect_error {
        let e = res.expect_err("expected error");
        assert_eq!(e.kind().as_str(), err.code, "vector={name} ({})", v.description);
        return;
    }

    let msg = res.unwrap_or_else(|e| panic!("vector={name} ({}): {e}", v.description));
    let ex = v.expect.as_ref().expect("missing expect block");

    assert_eq!(msg.tag().as_u8(), ex.tag, "vector={name} ({})", v.description);
    assert_eq!(
        serde_json::to_value(&msg).unwrap(),
        ex.message,
        "vector={name} ({})",
        v.description
    );
}
