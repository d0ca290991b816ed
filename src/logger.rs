use std::{
    collections::HashMap,
    fs::OpenOptions,
    path::PathBuf,
};
use nu_ansi_term::{Color, Style};
use serde::Deserialize;
use termcolor::ColorChoice;
use tracing::{field::Visit, Level, Metadata};
use tracing_log::NormalizeEvent;
use tracing_subscriber::{
    filter::{FilterFn, LevelFilter},
    fmt::FormatEvent,
    prelude::*,
};

use crate::{prelude::*, args::Args};


#[derive(Debug, confique::Config)]
pub(crate) struct LogConfig {
    /// Specifies what log messages to emit, based on the module path and log level.
    ///
    /// This is a map where the key specifies a module path prefix, and the
    /// value specifies a minimum log level. For each log message, the map
    /// entry with the longest prefix matching the log's module path is chosen.
    /// If no such entry exists, the log is not emitted. Otherwise, that
    /// entry's level is used to check whether the log message should be
    /// emitted.
    ///
    /// Example: only allow ≥"info" logs from Libris generally, but ≥"trace"
    /// messages from the `store` module (which logs every store call). Also
    /// enable ≥"debug" messages from the PostgreSQL driver.
    ///
    ///    [log]
    ///    filters.libris = "info"
    ///    filters."libris::store" = "trace"
    ///    filters.tokio_postgres = "debug"
    #[config(default = { "libris": "debug" })]
    pub(crate) filters: Filters,

    /// If this is set, log messages are also written to this file. The string
    /// `${cmd}` in this value is replaced by the subcommand name of the Libris
    /// process, e.g. `serve` or `db`. Example: "/var/log/libris-${cmd}.log".
    pub(crate) file: Option<PathBuf>,

    /// If this is set to `false`, log messages are not written to stdout.
    #[config(default = true)]
    pub(crate) stdout: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "HashMap<String, String>")]
pub(crate) struct Filters(HashMap<String, LevelFilter>);

impl TryFrom<HashMap<String, String>> for Filters {
    type Error = String;
    fn try_from(value: HashMap<String, String>) -> Result<Self, Self::Error> {
        value.into_iter()
            .map(|(target_prefix, level)| {
                let level = parse_level_filter(&level)?;
                Ok((target_prefix, level))
            })
            .collect::<Result<_, _>>()
            .map(Self)
    }
}

impl Filters {
    fn max_level(&self) -> LevelFilter {
        self.0.values().max().copied().unwrap_or(LevelFilter::OFF)
    }

    /// The entry with the longest prefix of `target` decides. No matching
    /// entry means the event is not emitted.
    fn enabled(&self, target: &str, level: &Level) -> bool {
        self.0.iter()
            .filter(|(target_prefix, _)| target.starts_with(target_prefix.as_str()))
            .max_by_key(|(target_prefix, _)| target_prefix.len())
            .map(|(_, level_filter)| level <= level_filter)
            .unwrap_or(false)
    }
}

fn parse_level_filter(s: &str) -> Result<LevelFilter, String> {
    match s {
        "off" => Ok(LevelFilter::OFF),
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" => Ok(LevelFilter::WARN),
        "error" => Ok(LevelFilter::ERROR),
        other => Err(format!("invalid log level '{other}'")),
    }
}

/// Installs our own logger globally. Must only be called once!
pub(crate) fn init(config: &LogConfig, args: &Args, cmd: &str) -> Result<()> {
    let filter = {
        let filters = config.filters.clone();
        let max_level = filters.max_level();
        FilterFn::new(move |metadata: &Metadata<'_>| {
            filters.enabled(metadata.target(), metadata.level())
        }).with_max_level_hint(max_level)
    };

    let color = args.stdout_color();
    macro_rules! subscriber {
        ($writer:expr) => {
            tracing_subscriber::fmt::layer()
                .event_format(EventFormatter(color))
                .with_writer($writer)
        };
    }

    let stdout_output = config.stdout.then(|| subscriber!(std::io::stdout));

    let file_output = config.file.as_ref()
        .map(|path| -> Result<std::fs::File> {
            use std::io::Write;

            let new_path = path.to_str()
                .ok_or_else(|| anyhow!("log file path is not valid UTF-8"))?
                .replace("${cmd}", cmd);

            let mut file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(new_path)
                .with_context(|| format!("failed to open/create log file '{}'", path.display()))?;

            // Empty line to make process restarts visible.
            file.write_all(b"\n").context("could not write to log file")?;

            Ok(file)
        })
        .transpose()?
        .map(|file| subscriber!(file).with_ansi(color == ColorChoice::Always));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_output)
        .with(stdout_output)
        .init();

    Ok(())
}

type TracingWriter<'a> = tracing_subscriber::fmt::format::Writer<'a>;

#[derive(Clone, Copy)]
struct EventFormatter(ColorChoice);

impl<S, N> FormatEvent<S, N> for EventFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: TracingWriter<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let use_ansi = self.0 == ColorChoice::Always
            || (writer.has_ansi_escapes() && self.0 != ColorChoice::Never);
        macro_rules! wr {
            ($style:expr, $fmt:literal $($args:tt)*) => {{
                with_style(&mut writer, use_ansi, $style, |w| {
                    write!(w, $fmt $($args)*)
                })?;
            }};
        }

        // Events coming from `log` (e.g. `tokio-postgres`) carry their real
        // target in fields.
        let normalized_metadata = event.normalized_metadata();
        let metadata = normalized_metadata.as_ref().unwrap_or(event.metadata());

        let dim_style = Style::new().dimmed();
        let (level_style, body_style) = match *metadata.level() {
            Level::ERROR => (Style::new().fg(Color::Red).bold(), Style::new().fg(Color::Red)),
            Level::WARN => (Style::new().fg(Color::Yellow).bold(), Style::new().fg(Color::Yellow)),
            Level::INFO => (Style::new().fg(Color::Green), Style::new()),
            Level::DEBUG => (Style::new().fg(Color::Blue), Style::new().dimmed()),
            Level::TRACE => (Style::new().fg(Color::Magenta), Style::new().fg(Color::DarkGray)),
        };

        wr!(dim_style, "{} ", chrono::Local::now().format("%Y-%m-%d %H:%M:%S.%3f"));
        wr!(level_style, "{:5}", metadata.level());
        wr!(dim_style, " {} >  ", metadata.target());

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        // Continuation lines of multi-line messages are indented to the
        // start of the message.
        let indent = "2024-01-01 00:00:00.000 DEBUG ".len() + metadata.target().len() + 4;
        let mut lines = fields.message.lines();
        wr!(body_style, "{}", lines.next().unwrap_or(""));
        for line in lines {
            write!(writer, "\n{:indent$}", "")?;
            wr!(body_style, "{}", line);
        }

        if !fields.others.is_empty() {
            if !fields.message.is_empty() {
                wr!(level_style, " ~~");
            }
            for (name, value) in &fields.others {
                wr!(body_style.italic(), " {}", name);
                wr!(body_style, "={}", value);
            }
        }

        writeln!(writer, "{}", if use_ansi { nu_ansi_term::ansi::RESET } else { "" })
    }
}

/// Collects the message and all other fields of an event as strings.
#[derive(Default)]
struct FieldCollector {
    message: String,
    others: Vec<(&'static str, String)>,
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            name if name.starts_with("log.") => {}
            name => self.others.push((name, format!("{value:?}"))),
        }
    }
}

fn with_style(
    out: &mut TracingWriter<'_>,
    use_ansi: bool,
    style: Style,
    f: impl FnOnce(&mut TracingWriter<'_>) -> std::fmt::Result,
) -> std::fmt::Result {
    if use_ansi {
        write!(out, "{}", style.prefix())?;
    }
    f(out)?;
    if use_ansi {
        write!(out, "{}", style.suffix())?;
    }
    Ok(())
}
