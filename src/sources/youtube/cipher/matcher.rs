use regex::{Captures, Regex};

/// What a name matcher found: either the function name itself, or a table
/// variable plus the index of the real name inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    Direct(String),
    Indexed { table: String, index: usize },
}

/// One historical shape of a call site. `extract` may reject a regex hit
/// (for shapes that need back-references the regex engine cannot express).
pub struct Matcher {
    pub label: &'static str,
    pub regex: Regex,
    pub extract: fn(&Captures<'_>) -> Option<NameMatch>,
}

impl Matcher {
    pub fn new(
        label: &'static str,
        pattern: &str,
        extract: fn(&Captures<'_>) -> Option<NameMatch>,
    ) -> Self {
        Self {
            label,
            // patterns are compile-time constants covered by tests
            regex: Regex::new(pattern).unwrap_or_else(|e| panic!("matcher {label}: {e}")),
            extract,
        }
    }
}

/// Runs matchers in order; the first one that both matches and extracts wins.
pub fn first_match(matchers: &[Matcher], code: &str) -> Option<(NameMatch, &'static str)> {
    matchers.iter().find_map(|m| {
        m.regex
            .captures_iter(code)
            .find_map(|caps| (m.extract)(&caps))
            .map(|found| (found, m.label))
    })
}

pub fn group1(caps: &Captures<'_>) -> Option<NameMatch> {
    caps.get(1).map(|m| NameMatch::Direct(m.as_str().to_string()))
}

/// Group 1 is the name; an optional group 2 is an index into a name table.
pub fn group1_with_index(caps: &Captures<'_>) -> Option<NameMatch> {
    let name = caps.get(1)?.as_str().to_string();
    match caps.get(2) {
        Some(index) => Some(NameMatch::Indexed {
            table: name,
            index: index.as_str().parse().ok()?,
        }),
        None => Some(NameMatch::Direct(name)),
    }
}

/// Reads `var <table>=[a,b,c]` and returns the entry at `index`.
pub fn resolve_table_entry(code: &str, table: &str, index: usize) -> Option<String> {
    let pattern = format!(r"var {}\s*=\s*\[(.+?)\][;,]", regex::escape(table));
    let re = Regex::new(&pattern).ok()?;
    let entries = re.captures(code)?.get(1)?.as_str();
    entries
        .split(',')
        .nth(index)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_matcher_wins() {
        let matchers = vec![
            Matcher::new("never", r"zzz(\w+)", group1),
            Matcher::new("first", r"foo=(\w+)", group1),
            Matcher::new("second", r"bar=(\w+)", group1),
        ];
        let (found, label) = first_match(&matchers, "x;bar=two;foo=one;").unwrap();
        assert_eq!(found, NameMatch::Direct("one".into()));
        assert_eq!(label, "first");
    }

    #[test]
    fn rejected_hits_fall_through() {
        fn only_b(caps: &Captures<'_>) -> Option<NameMatch> {
            let m = caps.get(1)?.as_str();
            (m == "b").then(|| NameMatch::Direct(m.to_string()))
        }
        let matchers = vec![Matcher::new("picky", r"v=(\w)", only_b)];
        let (found, _) = first_match(&matchers, "v=a;v=b;").unwrap();
        assert_eq!(found, NameMatch::Direct("b".into()));
    }

    #[test]
    fn table_entries_resolve_by_index() {
        let code = "var x=1;var Zq=[aB$,cD];var y=2;";
        assert_eq!(resolve_table_entry(code, "Zq", 0).as_deref(), Some("aB$"));
        assert_eq!(resolve_table_entry(code, "Zq", 1).as_deref(), Some("cD"));
        assert_eq!(resolve_table_entry(code, "Zq", 2), None);
    }
}
