//! `:set` parsing and application against [`EditorConfig`].
//!
//! | Syntax           | Effect                        |
//! |------------------|-------------------------------|
//! | `:set option`    | Enable boolean / show numeric |
//! | `:set nooption`  | Disable boolean               |
//! | `:set option!`   | Toggle boolean                |
//! | `:set option?`   | Query current value           |
//! | `:set option=N`  | Assign numeric value          |
//! | `:set`           | Show changed options          |
//! | `:set all`       | Show all options              |
//!
//! | Full name         | Abbrev | Type    | Config field        |
//! |-------------------|--------|---------|---------------------|
//! | `number`          | `nu`   | bool    | `show_line_numbers` |
//! | `scrollbar`       | `sb`   | bool    | `show_scroll_bar`   |
//! | `shorttabnames`   | `stn`  | bool    | `short_tab_names`   |
//! | `cursorlinesolid` | `cls`  | bool    | `cursor_line_solid` |
//! | `minimal`         |        | bool    | `style`             |
//! | `tabstop`         | `ts`   | integer | `tab_width`         |
//! | `scrolloff`       | `so`   | integer | `scroll_off`        |

use thiserror::Error;

use crate::config::{EditorConfig, EditorStyle, ScrollBar};

// ---------------------------------------------------------------------------
// Directives
// ---------------------------------------------------------------------------

/// A parsed `:set` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetDirective {
    On(String),
    Off(String),
    Toggle(String),
    Query(String),
    Assign(String, String),
    ShowChanged,
    ShowAll,
}

/// Parse the whole `:set` argument string. Empty means "show changed".
#[must_use]
pub fn parse_set(args: &str) -> Vec<SetDirective> {
    let trimmed = args.trim();
    if trimmed.is_empty() {
        return vec![SetDirective::ShowChanged];
    }
    trimmed.split_whitespace().map(parse_set_arg).collect()
}

#[must_use]
pub fn parse_set_arg(arg: &str) -> SetDirective {
    if arg == "all" {
        return SetDirective::ShowAll;
    }
    if let Some((name, value)) = arg.split_once('=') {
        return SetDirective::Assign(name.to_string(), value.to_string());
    }
    if let Some(name) = arg.strip_suffix('?') {
        return SetDirective::Query(name.to_string());
    }
    if let Some(name) = arg.strip_suffix('!') {
        return SetDirective::Toggle(name.to_string());
    }
    // `number` starts with "no"; only strip it when the rest is a boolean.
    if let Some(name) = arg.strip_prefix("no") {
        if OptionName::lookup(name).is_some_and(OptionName::is_bool) {
            return SetDirective::Off(name.to_string());
        }
    }
    if OptionName::lookup(arg).is_some_and(|o| !o.is_bool()) {
        return SetDirective::Query(arg.to_string());
    }
    SetDirective::On(arg.to_string())
}

// ---------------------------------------------------------------------------
// Option table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionName {
    Number,
    ScrollBar,
    ShortTabNames,
    CursorLineSolid,
    Minimal,
    TabStop,
    ScrollOff,
}

impl OptionName {
    pub const ALL: [Self; 7] = [
        Self::Number,
        Self::ScrollBar,
        Self::ShortTabNames,
        Self::CursorLineSolid,
        Self::Minimal,
        Self::TabStop,
        Self::ScrollOff,
    ];

    /// Resolve a full name or abbreviation.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "number" | "nu" => Self::Number,
            "scrollbar" | "sb" => Self::ScrollBar,
            "shorttabnames" | "stn" => Self::ShortTabNames,
            "cursorlinesolid" | "cls" => Self::CursorLineSolid,
            "minimal" => Self::Minimal,
            "tabstop" | "ts" => Self::TabStop,
            "scrolloff" | "so" => Self::ScrollOff,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn full_name(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::ScrollBar => "scrollbar",
            Self::ShortTabNames => "shorttabnames",
            Self::CursorLineSolid => "cursorlinesolid",
            Self::Minimal => "minimal",
            Self::TabStop => "tabstop",
            Self::ScrollOff => "scrolloff",
        }
    }

    #[must_use]
    pub const fn is_bool(self) -> bool {
        !matches!(self, Self::TabStop | Self::ScrollOff)
    }

    fn get_bool(self, c: &EditorConfig) -> bool {
        match self {
            Self::Number => c.show_line_numbers,
            Self::ScrollBar => c.show_scroll_bar != ScrollBar::Off,
            Self::ShortTabNames => c.short_tab_names,
            Self::CursorLineSolid => c.cursor_line_solid,
            Self::Minimal => c.style == EditorStyle::Minimal,
            Self::TabStop | Self::ScrollOff => false,
        }
    }

    fn set_bool(self, c: &mut EditorConfig, on: bool) {
        match self {
            Self::Number => c.show_line_numbers = on,
            Self::ScrollBar => {
                c.show_scroll_bar = match (on, c.show_scroll_bar) {
                    (false, _) => ScrollBar::Off,
                    (true, ScrollBar::Off) => ScrollBar::On,
                    (true, keep) => keep,
                };
            }
            Self::ShortTabNames => c.short_tab_names = on,
            Self::CursorLineSolid => c.cursor_line_solid = on,
            Self::Minimal => {
                c.style = if on { EditorStyle::Minimal } else { EditorStyle::Normal };
            }
            Self::TabStop | Self::ScrollOff => {}
        }
    }

    fn get_number(self, c: &EditorConfig) -> usize {
        match self {
            Self::TabStop => c.tab_width,
            Self::ScrollOff => c.scroll_off,
            _ => 0,
        }
    }

    fn set_number(self, c: &mut EditorConfig, n: usize) {
        match self {
            Self::TabStop => c.tab_width = n.max(1),
            Self::ScrollOff => c.scroll_off = n,
            _ => {}
        }
    }

    /// `name`, `noname` or `name=N`.
    #[must_use]
    pub fn describe(self, c: &EditorConfig) -> String {
        let name = self.full_name();
        if self.is_bool() {
            if self.get_bool(c) {
                name.to_string()
            } else {
                format!("no{name}")
            }
        } else {
            format!("{name}={}", self.get_number(c))
        }
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("unknown option: {0}")]
    Unknown(String),
    #[error("invalid argument: {0}")]
    InvalidValue(String),
    #[error("not a boolean option: {0}")]
    NotBoolean(String),
}

/// What a `:set` line did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetReport {
    /// True if any option value changed.
    pub changed: bool,
    /// Lines to show the user (query answers, listings).
    pub messages: Vec<String>,
}

/// Parse and apply a `:set` argument string. Directives before a failing
/// one stay applied.
///
/// # Errors
///
/// The first directive naming an unknown option, assigning a non-number to
/// a numeric option, or using boolean syntax on a numeric option.
pub fn apply_set(config: &mut EditorConfig, args: &str) -> Result<SetReport, OptionError> {
    let mut report = SetReport::default();
    for directive in parse_set(args) {
        apply_one(config, &directive, &mut report)?;
    }
    Ok(report)
}

fn apply_one(
    config: &mut EditorConfig,
    directive: &SetDirective,
    report: &mut SetReport,
) -> Result<(), OptionError> {
    let resolve = |name: &str| OptionName::lookup(name).ok_or_else(|| OptionError::Unknown(name.to_string()));
    let before = config.clone();

    match directive {
        SetDirective::ShowAll => {
            report.messages.extend(OptionName::ALL.iter().map(|o| o.describe(config)));
        }
        SetDirective::ShowChanged => {
            let defaults = EditorConfig::default();
            report.messages.extend(
                OptionName::ALL
                    .iter()
                    .map(|o| o.describe(config))
                    .filter(|d| !OptionName::ALL.iter().any(|o| o.describe(&defaults) == *d)),
            );
        }
        SetDirective::Query(name) => {
            report.messages.push(resolve(name)?.describe(config));
        }
        SetDirective::On(name) | SetDirective::Off(name) | SetDirective::Toggle(name) => {
            let opt = resolve(name)?;
            if !opt.is_bool() {
                return Err(OptionError::NotBoolean(name.clone()));
            }
            let value = match directive {
                SetDirective::On(_) => true,
                SetDirective::Off(_) => false,
                _ => !opt.get_bool(config),
            };
            opt.set_bool(config, value);
        }
        SetDirective::Assign(name, value) => {
            let opt = resolve(name)?;
            if opt.is_bool() {
                return Err(OptionError::InvalidValue(format!("{name}={value}")));
            }
            let n = value
                .parse::<usize>()
                .map_err(|_| OptionError::InvalidValue(format!("{name}={value}")))?;
            opt.set_number(config, n);
        }
    }

    report.changed |= *config != before;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
