use std::io::IsTerminal;

use anstyle::{AnsiColor, Effects, Style};
use hoist_installer::LockHeld;
use hoist_runtime::SpawnError;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputStyle {
    Plain,
    Rich,
}

pub fn current_output_style() -> OutputStyle {
    if std::env::var_os("NO_COLOR").is_some() {
        return OutputStyle::Plain;
    }
    if std::io::stdout().is_terminal() {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

/// Pure formatter; colors are applied at print time so callers can assert on
/// the rendered text.
pub fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "err" => "[ERR]",
        _ => "[..]",
    }
}

fn status_style(status: &str) -> Style {
    let color = match status {
        "ok" => AnsiColor::Green,
        "warn" => AnsiColor::Yellow,
        "err" => AnsiColor::Red,
        _ => AnsiColor::BrightBlue,
    };
    Style::new().fg_color(Some(color.into())).effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

pub fn print_status(style: OutputStyle, status: &str, message: &str) {
    match style {
        OutputStyle::Plain => println!("{message}"),
        OutputStyle::Rich => {
            let badge = colorize(status_style(status), status_badge(status));
            println!("{badge} {message}");
        }
    }
}

pub fn print_warning(style: OutputStyle, message: &str) {
    match style {
        OutputStyle::Plain => eprintln!("warning: {message}"),
        OutputStyle::Rich => {
            let badge = colorize(status_style("warn"), status_badge("warn"));
            eprintln!("{badge} {message}");
        }
    }
}

pub fn report_error(err: &anyhow::Error) {
    if err.downcast_ref::<LockHeld>().is_some() {
        eprintln!("error: {err:#}");
        eprintln!("another install is in progress; rerun with --force if it crashed");
        return;
    }
    if let Some(spawn) = err.downcast_ref::<SpawnError>() {
        eprintln!("error: {spawn}");
        return;
    }
    eprintln!("error: {err:#}");
}
