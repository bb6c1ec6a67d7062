/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io::{self, IsTerminal, Write};

use chrono::Local;
use slog::{Drain, KV, Level, OwnedKVList, Record, Serializer, slog_o};
use slog_scope::GlobalLoggerGuard;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Default)]
struct KvCollector {
    pairs: Vec<(String, String)>,
}

impl Serializer for KvCollector {
    fn emit_arguments(&mut self, key: slog::Key, val: &fmt::Arguments) -> slog::Result {
        self.pairs.push((key.to_string(), val.to_string()));
        Ok(())
    }
}

/// Synchronous stderr drain, colored when stderr is a terminal.
pub struct StdErrDrain {
    append_code_position: bool,
    console: bool,
}

impl StdErrDrain {
    pub fn new(append_code_position: bool) -> Self {
        StdErrDrain {
            append_code_position,
            console: io::stderr().is_terminal(),
        }
    }

    fn write_plain<IO: Write>(
        &self,
        io: &mut IO,
        record: &Record,
        kv_pairs: &[(String, String)],
    ) -> io::Result<()> {
        write!(io, "{}", Local::now().format(TIME_FORMAT))?;
        write!(io, " {}", record.level())?;
        for (k, v) in kv_pairs {
            write!(io, " {k}: {v},")?;
        }
        write!(io, " {}", record.msg())?;
        if self.append_code_position {
            write!(io, " <{}:{}>", record.file(), record.line())?;
        }
        writeln!(io)
    }

    fn write_console<IO: Write>(
        &self,
        io: &mut IO,
        record: &Record,
        kv_pairs: &[(String, String)],
    ) -> io::Result<()> {
        use anstyle::{AnsiColor, Color, Style};

        const COLOR_MAGENTA: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Magenta)));
        const COLOR_RED: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));
        const COLOR_YELLOW: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow)));
        const COLOR_GREEN: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));
        const COLOR_CYAN: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));
        const COLOR_BLUE: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Blue)));
        const STYLE_BOLD: Style = Style::new().bold();
        const STYLE_ITALIC: Style = Style::new().italic();

        let bold_s = STYLE_BOLD.render();
        let bold_e = STYLE_BOLD.render_reset();

        write!(io, "{}", Local::now().format(TIME_FORMAT))?;
        let level_color = match record.level() {
            Level::Critical => COLOR_MAGENTA,
            Level::Error => COLOR_RED,
            Level::Warning => COLOR_YELLOW,
            Level::Info => COLOR_GREEN,
            Level::Debug => COLOR_CYAN,
            Level::Trace => COLOR_BLUE,
        };
        write!(
            io,
            " {}{}{}",
            level_color.render(),
            record.level(),
            level_color.render_reset(),
        )?;
        for (k, v) in kv_pairs {
            write!(io, " {bold_s}{k}{bold_e}={v},")?;
        }
        write!(io, " {bold_s}{}{bold_e}", record.msg())?;
        if self.append_code_position {
            write!(
                io,
                " <{}{}:{}{}>",
                STYLE_ITALIC.render(),
                record.file(),
                record.line(),
                STYLE_ITALIC.render_reset()
            )?;
        }
        writeln!(io)
    }
}

impl Drain for StdErrDrain {
    type Ok = ();
    type Err = slog::Never;

    fn log(&self, record: &Record, values: &OwnedKVList) -> Result<(), slog::Never> {
        let mut collector = KvCollector::default();
        let _ = record.kv().serialize(record, &mut collector);
        let _ = values.serialize(record, &mut collector);

        let mut buf: Vec<u8> = Vec::with_capacity(256);
        let _ = if self.console {
            self.write_console(&mut buf, record, &collector.pairs)
        } else {
            self.write_plain(&mut buf, record, &collector.pairs)
        };

        let mut stderr = io::stderr().lock();
        let _ = stderr.write_all(&buf);
        let _ = stderr.flush();
        Ok(())
    }
}

pub fn setup(verbose_level: u8) -> Result<GlobalLoggerGuard, log::SetLoggerError> {
    let drain = StdErrDrain::new(verbose_level > 1);
    let logger = slog::Logger::root(drain.fuse(), slog_o!());

    let scope_guard = slog_scope::set_global_logger(logger);

    let log_level = match verbose_level {
        0 => log::Level::Warn,
        1 => log::Level::Info,
        2 => log::Level::Debug,
        _ => log::Level::Trace,
    };

    slog_stdlog::init_with_level(log_level)?;
    Ok(scope_guard)
}
