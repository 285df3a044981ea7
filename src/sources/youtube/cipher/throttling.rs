use std::sync::LazyLock;

use regex::Regex;

use super::{
    lexer::match_to_closing_brace,
    matcher::{Matcher, NameMatch, first_match, group1, group1_with_index, resolve_table_entry},
};
use crate::common::errors::{ExtractionError, ExtractionResult};

static PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[&?]n=([^&]+)").expect("static regex"));

static FIRST_ARG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^function [\w$]+\(([\w$]+)").expect("static regex"));

static NAME_MATCHERS: LazyLock<Vec<Matcher>> = LazyLock::new(|| {
    vec![
        Matcher::new(
            "get-nn",
            r#"\.get\("nn"\)\)&&\([a-zA-Z0-9$_]=([a-zA-Z0-9$_]+)(?:\[(\d+)\])?\("#,
            group1_with_index,
        ),
        Matcher::new(
            "char-code-110",
            r"String\.fromCharCode\(110\)[^;]*?\)&&\([a-zA-Z0-9$_]=([a-zA-Z0-9$_]+)(?:\[(\d+)\])?\(",
            group1_with_index,
        ),
        Matcher::new(
            "assigned-get-n",
            r#"\([a-zA-Z0-9$_]=[a-zA-Z0-9$_]\.get\("n"\)\)&&\([a-zA-Z0-9$_]=([a-zA-Z0-9$_]+)(?:\[(\d+)\])?\([a-zA-Z0-9$_]\)"#,
            group1_with_index,
        ),
        Matcher::new(
            "get-n",
            r#"\.get\("n"\)\)&&\([a-zA-Z0-9$_]=([a-zA-Z0-9$_]+)(?:\[(\d+)\])?\([a-zA-Z0-9$_]\)"#,
            group1_with_index,
        ),
        Matcher::new(
            "w8-marker",
            r#";\s*([a-zA-Z0-9_$]+)\s*=\s*function\([a-zA-Z0-9_$]+\)\{.+?"_w8_""#,
            group1,
        ),
    ]
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottlingProgram {
    pub function_name: String,
    /// A standalone `function NAME(arg){...}` declaration.
    pub source: String,
}

pub fn find_function_name(code: &str) -> ExtractionResult<String> {
    let (found, label) = first_match(&NAME_MATCHERS, code).ok_or_else(|| {
        ExtractionError::malformed("throttling function: none of the known patterns matched")
    })?;
    tracing::debug!("throttling function located by `{}`", label);

    match found {
        NameMatch::Direct(name) => Ok(name),
        NameMatch::Indexed { table, index } => resolve_table_entry(code, &table, index)
            .ok_or_else(|| ExtractionError::malformed(format!("no entry {index} in {table}"))),
    }
}

fn function_source(code: &str, name: &str) -> ExtractionResult<String> {
    if let Some(body) = match_to_closing_brace(code, &format!("{name}=function")) {
        return Ok(format!("function {name}{body}"));
    }

    let pattern = format!(
        r#"(?s){}=\s*function([\S\s]*?\}}\s*return [\w$]+?\.join\(""\)\s*;)"#,
        regex::escape(name)
    );
    Regex::new(&pattern)?
        .captures(code)
        .map(|caps| format!("function {name}{}}}", &caps[1]))
        .ok_or_else(|| ExtractionError::malformed(format!("body of throttling function {name}")))
}

/// Removes the `if(typeof x==="undefined")return arg;` guard that short-circuits
/// the function when it runs outside the full player script.
fn strip_early_return(source: &str) -> ExtractionResult<String> {
    let Some(arg) = FIRST_ARG_RE.captures(source).map(|caps| caps[1].to_string()) else {
        return Ok(source.to_string());
    };
    let pattern = format!(
        r#";\s*if\s*\(\s*typeof\s+[a-zA-Z0-9_$]+\s*===?\s*(?:"undefined"|'undefined'|[a-zA-Z0-9_$]+\[\d+\])\s*\)\s*return\s+{};"#,
        regex::escape(&arg)
    );
    Ok(Regex::new(&pattern)?.replace_all(source, ";").into_owned())
}

pub fn extract_program(code: &str) -> ExtractionResult<ThrottlingProgram> {
    let function_name = find_function_name(code)?;
    let source = strip_early_return(&function_source(code, &function_name)?)?;
    Ok(ThrottlingProgram {
        function_name,
        source,
    })
}

/// Value of the `n` query parameter, if the URL carries one.
pub fn throttling_param(url: &str) -> Option<&str> {
    PARAM_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Swaps the `n` value in place, leaving the rest of the URL untouched.
pub fn replace_throttling_param(url: &str, value: &str) -> String {
    match PARAM_RE.captures(url).and_then(|caps| caps.get(1)) {
        Some(m) => format!("{}{}{}", &url[..m.start()], value, &url[m.end()..]),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_indexed_name_through_table() {
        let code = r#"var Lq=[Uy,Mv];foo=function(){if(b=a.get("n"))&&(b=Lq[1](b),a.set("n",b))};Mv=function(a){var b=a.split("");return b.join("")};"#;
        assert_eq!(find_function_name(code).unwrap(), "Mv");
    }

    #[test]
    fn direct_name_without_index() {
        let code = r#"(b=a.get("n"))&&(b=Rk(b),a.set("n",b))"#;
        assert_eq!(find_function_name(code).unwrap(), "Rk");
    }

    #[test]
    fn extracts_body_and_strips_guard() {
        let code = r#"var x=1;Rk=function(a){var b=a.split("");if(typeof Zd==="undefined")return a;b.reverse();return b.join("")};(c=d.get("n"))&&(c=Rk(c),d.set("n",c));"#;
        let program = extract_program(code).unwrap();
        assert_eq!(program.function_name, "Rk");
        assert_eq!(
            program.source,
            r#"function Rk(a){var b=a.split("");b.reverse();return b.join("")}"#
        );
    }

    #[test]
    fn guard_with_indexed_sentinel_is_stripped() {
        let source = r#"function Rk(q){var b=q; if (typeof Zd === Ab[3]) return q;return b}"#;
        assert_eq!(
            strip_early_return(source).unwrap(),
            r#"function Rk(q){var b=q;return b}"#
        );
    }

    #[test]
    fn reads_and_replaces_param() {
        let url = "https://host/videoplayback?expire=1&n=abcDEF&sig=x";
        assert_eq!(throttling_param(url), Some("abcDEF"));
        assert_eq!(
            replace_throttling_param(url, "zzz"),
            "https://host/videoplayback?expire=1&n=zzz&sig=x"
        );
        assert_eq!(throttling_param("https://host/videoplayback?sn=1"), None);
    }

    #[test]
    fn unknown_shape_is_malformed() {
        assert!(find_function_name("var a=1;").is_err());
    }
}
