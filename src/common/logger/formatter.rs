use core::fmt as core_fmt;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{
        self, FmtContext, FormattedFields,
        format::{FormatEvent, FormatFields},
    },
    registry::LookupSpan,
};

/// `[timestamp] LEVEL module [video client] > message`
///
/// The bracketed part collects the values recorded on the enclosing spans
/// (`extract{video_id}`, `client{client}`), outermost first, so every line
/// of one extraction can be grepped by video id.
pub struct ExtractFormatter {
    use_ansi: bool,
}

impl ExtractFormatter {
    pub fn new(use_ansi: bool) -> Self {
        Self { use_ansi }
    }

    fn paint(&self, code: &'static str) -> &'static str {
        if self.use_ansi { code } else { "" }
    }
}

fn level_color(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        Level::DEBUG => "\x1b[34m",
        Level::TRACE => "\x1b[35m",
    }
}

/// `tubex::sources::youtube::player` -> `youtube::player`. Foreign targets
/// are left alone.
pub fn short_target(target: &str) -> &str {
    let Some(local) = target.strip_prefix(concat!(env!("CARGO_CRATE_NAME"), "::")) else {
        return target;
    };
    local.strip_prefix("sources::").unwrap_or(local)
}

/// Values of a span's formatted `key=value` fields.
fn field_values(formatted: &str) -> impl Iterator<Item = &str> {
    formatted
        .split_whitespace()
        .map(|pair| pair.split_once('=').map_or(pair, |(_, v)| v).trim_matches('"'))
}

impl<S, N> FormatEvent<S, N> for ExtractFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: fmt::format::Writer<'_>,
        event: &Event<'_>,
    ) -> core_fmt::Result {
        let reset = self.paint("\x1b[0m");
        let dim = self.paint("\x1b[2m");

        let format = time::macros::format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
        );
        let now =
            time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
        if let Ok(timestamp) = now.format(&format) {
            write!(writer, "{dim}[{timestamp}]{reset} ")?;
        }

        let metadata = event.metadata();
        let level = metadata.level();
        write!(
            writer,
            "{}{}{: <5}{} {}",
            self.paint(level_color(level)),
            self.paint("\x1b[1m"),
            level.as_str(),
            reset,
            short_target(metadata.target())
        )?;

        let mut context = Vec::new();
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<FormattedFields<N>>() {
                    context.extend(field_values(fields.as_str()).map(str::to_string));
                }
            }
        }
        if !context.is_empty() {
            write!(writer, " {dim}[{}]{reset}", context.join(" "))?;
        }

        write!(writer, " > ")?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
