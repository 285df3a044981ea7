//! Embedded JavaScript engine, for throttling transforms the native
//! interpreter cannot follow.

use rquickjs::{CatchResultExt, CaughtError, Context, Runtime};

use super::runner::ScriptRunner;
use crate::common::errors::{ExtractionError, ExtractionResult};

const MEMORY_LIMIT: usize = 64 * 1024 * 1024;
const MAX_STACK_SIZE: usize = 4 * 1024 * 1024;

/// Evaluates each program in a fresh runtime so nothing leaks between scripts.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuickJsRunner;

impl QuickJsRunner {
    fn caught_to_error(caught: CaughtError<'_>) -> ExtractionError {
        match caught {
            CaughtError::Exception(exc) => {
                ExtractionError::deobfuscation(exc.message().unwrap_or_default())
            }
            other => ExtractionError::deobfuscation(other.to_string()),
        }
    }
}

impl ScriptRunner for QuickJsRunner {
    fn run(&self, source: &str, function: &str, argument: &str) -> ExtractionResult<String> {
        let runtime = Runtime::new()
            .map_err(|e| ExtractionError::deobfuscation(format!("quickjs runtime: {e}")))?;
        runtime.set_memory_limit(MEMORY_LIMIT);
        runtime.set_max_stack_size(MAX_STACK_SIZE);
        let context = Context::full(&runtime)
            .map_err(|e| ExtractionError::deobfuscation(format!("quickjs context: {e}")))?;

        let call = format!("{source}\n;{function}({});", serde_json::to_string(argument)?);
        context.with(|ctx| {
            ctx.eval::<String, _>(call)
                .catch(&ctx)
                .map_err(Self::caught_to_error)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_throttling_function() {
        let source = r#"function Rk(a){var b=a.split("");b.reverse();return b.join("")}"#;
        assert_eq!(QuickJsRunner.run(source, "Rk", "abc").unwrap(), "cba");
    }

    #[test]
    fn script_errors_are_deobfuscation_failures() {
        let err = QuickJsRunner.run("function f(a){throw new Error('x')}", "f", "a").unwrap_err();
        assert!(matches!(err, ExtractionError::DeobfuscationFailed(_)));
    }
}
