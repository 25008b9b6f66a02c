use std::{io::BufRead, path::{Path, PathBuf}};

use anyhow::bail;
use serde::{de::{Error, Visitor}, Deserialize};

use crate::error::ErrorKind;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TestOutput {
    Boolean(bool),
    Number(f64),
    List(Vec<TestOutput>),
    Something(String), // Implies that we don't care about the thing
}

#[derive(Debug, Clone)]
pub struct TestEvaluationResult(Result<TestOutput, ErrorKind>);

impl From<TestEvaluationResult> for Result<TestOutput, ErrorKind> {
    fn from(value: TestEvaluationResult) -> Self {
        value.0
    }
}

struct TestEvaluationResultVisitor;

impl<'de> Deserialize<'de> for TestEvaluationResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de> {

        deserializer.deserialize_map(TestEvaluationResultVisitor)
    }
}

fn error_kind(name: &str) -> Option<ErrorKind> {
    [ErrorKind::Syntax, ErrorKind::Name, ErrorKind::Evaluation]
        .into_iter()
        .find(|kind| kind.as_str() == name)
}

impl<'de> Visitor<'de> for TestEvaluationResultVisitor {
    type Value = TestEvaluationResult;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "A structure containing the boolean key 'ok'. If it's okay, contains the key 'output', otherwise the key 'type'")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::MapAccess<'de>, {

        if map.next_key::<String>()?.as_deref() != Some("ok") {
            return Err(A::Error::custom("First key should be 'ok'"))
        }

        let ok: bool = map.next_value()?;
        let second = map.next_key::<String>()?
            .ok_or_else(|| A::Error::custom("Must have two keys"))?;

        let result = if ok {
            if second != "output" {
                return Err(A::Error::custom("Second ok key should be 'output'"))
            }
            TestEvaluationResult(Ok(map.next_value()?))
        } else {
            if second != "type" {
                return Err(A::Error::custom("Second key should be 'type'"))
            }
            let name: String = map.next_value()?;
            let kind = error_kind(&name)
                .ok_or_else(|| A::Error::custom(format!("Unrecognized snek error: {}", name)))?;
            TestEvaluationResult(Err(kind))
        };

        if map.next_key::<String>()?.is_some() {
            return Err(A::Error::custom("Only two keys should be present"));
        }

        Ok(result)
    }
}

fn load_input_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<String>> {
    let source = std::fs::read(path)?;
    Ok(source.lines().collect::<Result<Vec<String>, _>>()?)
}

fn load_output_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<TestEvaluationResult>> {
    let source = std::fs::read(path)?;
    Ok(serde_json::from_slice(&source)?)
}

/// Loads `test_inputs/<n>.snek` (one form per line) alongside the expected
/// results in `test_outputs/<n>.json`
pub fn load_test_pair(testcase: usize) -> anyhow::Result<Vec<(String, TestEvaluationResult)>> {
    if !(1..=8).contains(&testcase) { bail!("Testcase out of bounds"); }

    let base_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let input = load_input_file(base_path.join("test_inputs").join(format!("{}.snek", testcase)))?;
    let output = load_output_file(base_path.join("test_outputs").join(format!("{}.json", testcase)))?;

    if input.len() != output.len() { bail!("Input and output of testcase {} does not match", testcase); }
    Ok(input.into_iter().zip(output).collect())
}

pub fn all_testcases() -> impl Iterator<Item = usize> {
    1..=8
}
