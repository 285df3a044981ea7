//! Running extracted transforms.
//!
//! [`ScriptRunner`] is the seam; [`TransformInterpreter`] understands the
//! array-shuffling shape signature transforms have always had and nothing else,
//! so no third-party code is ever evaluated unless the `rquickjs` feature
//! provides a real engine.

use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;

use crate::common::errors::{ExtractionError, ExtractionResult};

pub trait ScriptRunner: Send + Sync {
    /// Evaluates `source`, calls `function` with the single string `argument`
    /// and returns the string it produces.
    fn run(&self, source: &str, function: &str, argument: &str) -> ExtractionResult<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Reverse,
    /// `a.splice(0,b)`: drop the first `b` characters.
    Splice,
    /// Swap the first character with the one at `b % len`.
    Swap,
}

impl Operation {
    fn classify(body: &str) -> Option<Self> {
        if body.contains("reverse") {
            Some(Self::Reverse)
        } else if body.contains("splice") {
            Some(Self::Splice)
        } else if body.contains("var c=a[0]") || body.contains("%") {
            Some(Self::Swap)
        } else {
            None
        }
    }

    fn apply(self, chars: &mut Vec<char>, operand: usize) {
        match self {
            Self::Reverse => chars.reverse(),
            Self::Splice => {
                chars.drain(..operand.min(chars.len()));
            }
            Self::Swap => {
                if !chars.is_empty() {
                    let target = operand % chars.len();
                    chars.swap(0, target);
                }
            }
        }
    }
}

static OBJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)var ([A-Za-z0-9_$]+)=\{(.+?)\}\};").expect("static regex")
});

static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"?([A-Za-z0-9_$]+)"?:function\([^)]*\)\{([^}]*)\}"#).expect("static regex")
});

static CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^([A-Za-z0-9_$]+)(?:\.([A-Za-z0-9_$]+)|\["([A-Za-z0-9_$]+)"\])\(([A-Za-z0-9_$]+),(\d+)\)$"#,
    )
    .expect("static regex")
});

static WRAPPER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"function ([A-Za-z0-9_$]+)\([A-Za-z0-9_$]+\)\{return ([A-Za-z0-9_$]+)\([A-Za-z0-9_$]+\);\}")
        .expect("static regex")
});

/// Native interpreter for signature programs made of a helper object and a
/// function that splits, shuffles and joins its argument.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransformInterpreter;

impl TransformInterpreter {
    fn helper_operations(source: &str) -> HashMap<(String, String), Operation> {
        let mut operations = HashMap::new();
        for object in OBJECT_RE.captures_iter(source) {
            // the object body lost its final `}` to the outer pattern
            let body = format!("{}}}", &object[2]);
            for method in METHOD_RE.captures_iter(&body) {
                if let Some(op) = Operation::classify(&method[2]) {
                    operations.insert((object[1].to_string(), method[1].to_string()), op);
                }
            }
        }
        operations
    }

    fn resolve_target<'a>(source: &'a str, function: &'a str) -> &'a str {
        WRAPPER_RE
            .captures_iter(source)
            .find(|caps| caps.get(1).is_some_and(|m| m.as_str() == function))
            .and_then(|caps| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or(function)
    }

    fn function_body<'a>(source: &'a str, name: &str) -> ExtractionResult<(String, &'a str)> {
        let escaped = regex::escape(name);
        let pattern = format!(
            r"(?s)(?:{escaped}=function|function {escaped})\(([A-Za-z0-9_$]+)\)\{{(.*?)\}}"
        );
        let caps = Regex::new(&pattern)?
            .captures(source)
            .ok_or_else(|| ExtractionError::deobfuscation(format!("function {name} not found")))?;
        let arg = caps[1].to_string();
        let body = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        Ok((arg, body))
    }
}

impl ScriptRunner for TransformInterpreter {
    fn run(&self, source: &str, function: &str, argument: &str) -> ExtractionResult<String> {
        let target = Self::resolve_target(source, function);
        let operations = Self::helper_operations(source);
        let (arg, body) = Self::function_body(source, target)?;

        let split = format!(r#"{arg}={arg}.split("")"#);
        let join = format!(r#"return {arg}.join("")"#);
        let mut chars: Vec<char> = argument.chars().collect();

        for statement in body.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            if statement == split {
                continue;
            }
            if statement == join {
                return Ok(chars.into_iter().collect());
            }

            let caps = CALL_RE.captures(statement).ok_or_else(|| {
                ExtractionError::deobfuscation(format!("unsupported statement `{statement}`"))
            })?;
            if caps[4] != arg {
                return Err(ExtractionError::deobfuscation(format!(
                    "statement `{statement}` does not operate on {arg}"
                )));
            }
            let object = caps[1].to_string();
            let method = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let operand: usize = caps[5]
                .parse()
                .map_err(|_| ExtractionError::deobfuscation("operand out of range"))?;

            let op = operations.get(&(object, method)).ok_or_else(|| {
                ExtractionError::deobfuscation(format!("unknown helper in `{statement}`"))
            })?;
            op.apply(&mut chars, operand);
        }

        Err(ExtractionError::deobfuscation(format!(
            "{target} never joins its result"
        )))
    }
}
