//! Editor configuration.
//!
//! [`EditorConfig`] is plain data. The core never reads files; a host that
//! wants a config file deserializes one (every field has a default, so a
//! partial file is fine) and hands the value to the editor. Live changes go
//! through `:set`, see [`options`](crate::options).

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Overall chrome density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorStyle {
    #[default]
    Normal,
    Minimal,
}

/// Scroll bar visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBar {
    Off,
    #[default]
    On,
    Always,
}

/// Tunables shared by every window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub show_scroll_bar: ScrollBar,
    pub style: EditorStyle,
    pub show_line_numbers: bool,
    pub short_tab_names: bool,
    pub show_indicator_region: bool,
    pub auto_hide_command_region: bool,
    pub cursor_line_solid: bool,
    /// Seconds the background takes to fade once fading starts.
    pub background_fade_time: f32,
    /// Seconds of no editing before the background starts to fade.
    pub background_fade_wait: f32,
    pub tab_width: usize,
    /// Half period of the cursor blink.
    pub cursor_blink_ms: u64,
    /// Lines kept visible above and below the cursor.
    pub scroll_off: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            show_scroll_bar: ScrollBar::On,
            style: EditorStyle::Normal,
            show_line_numbers: true,
            short_tab_names: true,
            show_indicator_region: true,
            auto_hide_command_region: true,
            cursor_line_solid: false,
            background_fade_time: 60.0,
            background_fade_wait: 60.0,
            tab_width: 4,
            cursor_blink_ms: 530,
            scroll_off: 0,
        }
    }
}

bitflags! {
    /// Engine-level switches fixed at construction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EditorFlags: u8 {
        /// Derive syntax spans on the calling thread instead of the pool.
        const DISABLE_THREADS = 1 << 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = EditorConfig::default();
        assert!(c.show_line_numbers);
        assert!(c.short_tab_names);
        assert!(!c.cursor_line_solid);
        assert_eq!(c.show_scroll_bar, ScrollBar::On);
        assert_eq!(c.style, EditorStyle::Normal);
        assert!((c.background_fade_wait - 60.0).abs() < f32::EPSILON);
        assert_eq!(c.tab_width, 4);
    }

    #[test]
    fn flags_default_empty() {
        assert!(!EditorFlags::default().contains(EditorFlags::DISABLE_THREADS));
    }
}
