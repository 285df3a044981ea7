use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{
    lexer::match_to_closing_brace,
    matcher::{Matcher, NameMatch, first_match, group1, resolve_table_entry},
};
use crate::common::errors::{ExtractionError, ExtractionResult};

/// Entry point every extracted signature program exposes.
pub const ENTRY_FUNCTION: &str = "deobfuscate";

static TIMESTAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:signatureTimestamp|sts)[=:](\d+)").expect("static regex"));

static HELPER_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#";([A-Za-z0-9_$]{2,})(?:\.[A-Za-z0-9_$]+|\["[A-Za-z0-9_$]+"\])\("#)
        .expect("static regex")
});

static NAME_MATCHERS: LazyLock<Vec<Matcher>> = LazyLock::new(|| {
    vec![
        Matcher::new(
            "decode-uri-h",
            r"\bm=([a-zA-Z0-9$]{2,})\(decodeURIComponent\(h\.s\)\)",
            group1,
        ),
        Matcher::new(
            "decode-uri-c",
            r"\bc&&\(c=([a-zA-Z0-9$]{2,})\(decodeURIComponent\(c\)\)",
            group1,
        ),
        Matcher::new(
            "split-assign",
            r#"(?:\b|[^a-zA-Z0-9$])([a-zA-Z0-9$]{2,})\s*=\s*function\(\s*a\s*\)\s*\{\s*a\s*=\s*a\.split\(\s*""\s*\)"#,
            group1,
        ),
        Matcher::new(
            "split-any-arg",
            r#"([\w$]+)\s*=\s*function\((\w+)\)\{\s*(\w+)=\s*(\w+)\.split\(""\)\s*;"#,
            same_argument_throughout,
        ),
    ]
});

/// `f=function(x){x=x.split("")` where all three names agree.
fn same_argument_throughout(caps: &Captures<'_>) -> Option<NameMatch> {
    let arg = caps.get(2)?.as_str();
    if caps.get(3)?.as_str() != arg || caps.get(4)?.as_str() != arg {
        return None;
    }
    group1(caps)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureProgram {
    /// Name of the transform inside the player script.
    pub function_name: String,
    /// Helper object, transform and the [`ENTRY_FUNCTION`] wrapper.
    pub source: String,
}

pub fn extract_timestamp(code: &str) -> ExtractionResult<u32> {
    TIMESTAMP_RE
        .captures(code)
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| ExtractionError::malformed("no signature timestamp in player script"))
}

pub fn find_function_name(code: &str) -> ExtractionResult<String> {
    let (found, label) = first_match(&NAME_MATCHERS, code).ok_or_else(|| {
        ExtractionError::malformed("signature function: none of the known patterns matched")
    })?;
    tracing::debug!("signature function located by `{}`", label);

    match found {
        NameMatch::Direct(name) => Ok(name),
        NameMatch::Indexed { table, index } => resolve_table_entry(code, &table, index)
            .ok_or_else(|| ExtractionError::malformed(format!("no entry {index} in {table}"))),
    }
}

fn function_source(code: &str, name: &str) -> ExtractionResult<String> {
    let pattern = format!(
        r"({}=function\([a-zA-Z0-9_]+\)\{{.+?\}})",
        regex::escape(name)
    );
    if let Some(caps) = Regex::new(&pattern)?.captures(code) {
        return Ok(format!("var {};", &caps[1]));
    }

    let marker = format!("function {name}(");
    match_to_closing_brace(code, &marker)
        .map(|rest| format!("function {name}({rest};"))
        .ok_or_else(|| ExtractionError::malformed(format!("body of signature function {name}")))
}

fn helper_object(code: &str, function: &str) -> ExtractionResult<String> {
    let helper = HELPER_NAME_RE
        .captures(function)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| ExtractionError::malformed("signature helper object name"))?;

    let pattern = format!(r"(?s)(var {}=\{{.+?\}}\}};)", regex::escape(&helper));
    Regex::new(&pattern)?
        .captures(code)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| ExtractionError::malformed(format!("signature helper object {helper}")))
}

pub fn extract_program(code: &str) -> ExtractionResult<SignatureProgram> {
    let function_name = find_function_name(code)?;
    let function = function_source(code, &function_name)?;
    let helper = helper_object(code, &function)?;

    let source = format!(
        "{helper}{function}function {ENTRY_FUNCTION}(a){{return {function_name}(a);}}"
    );
    Ok(SignatureProgram {
        function_name,
        source,
    })
}
