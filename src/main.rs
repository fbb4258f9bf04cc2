// SPDX-License-Identifier: MIT
//
// kestrel: headless driver for the kestrel editing engine.
//
// Opens a file (or stdin), feeds a key script through the engine and
// reports what happened. Handy for scripted edits and for watching the
// engine from a shell:
//
//   kestrel notes.txt --keys 'dd:wq<CR>'
//   echo hello | kestrel --stdin --keys 'A world<Esc>' --print
//   kestrel src/lib.rs --keys '<C-w>v' --screen 100x30
//
// Every key flows through the same path a GUI host would use:
//
//   notation → KeyEvent → Editor::handle_key → mode → buffer/cursor
//   Editor::display → TextScreen::paint → stdout
//
// Messages the engine raises (E-codes, `:reg` listings) go to stderr.
// Logging also goes to stderr and honours RUST_LOG (default `warn`).

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use kestrel_core::editor::SCRATCH_NAME;
use kestrel_core::{Display, Editor, EditorConfig, EditorFlags, WindowFrame};
use kestrel_input::parse_keys;

// ─── Arguments ──────────────────────────────────────────────────────────────

/// Drive the kestrel editing engine from a key script
#[derive(Parser, Debug)]
#[command(name = "kestrel", version, about)]
struct Args {
    /// File to open; created on `:w` if it does not exist
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Read the initial text from stdin instead of a file
    #[arg(long, conflicts_with = "file")]
    stdin: bool,

    /// Keys in vim notation (`dw`, `<C-w>v`, `:wq<CR>`); may be repeated
    #[arg(short, long = "keys", value_name = "NOTATION")]
    keys: Vec<String>,

    /// Global mode to start in
    #[arg(long, default_value = "vim")]
    mode: String,

    /// TOML file with editor options
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Derive syntax spans on the main thread
    #[arg(long)]
    no_threads: bool,

    /// Print the active buffer to stdout when done
    #[arg(long)]
    print: bool,

    /// Dump the active tab as text, sized WIDTHxHEIGHT
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    screen: Option<(u16, u16)>,
}

fn parse_size(s: &str) -> Result<(u16, u16), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let w = w.trim().parse().map_err(|e| format!("width: {e}"))?;
    let h = h.trim().parse().map_err(|e| format!("height: {e}"))?;
    Ok((w, h))
}

// ─── Text screen ────────────────────────────────────────────────────────────

/// A character grid the engine paints into, printed row by row.
struct TextScreen {
    width: u16,
    height: u16,
    cells: Vec<char>,
}

impl TextScreen {
    fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![' '; usize::from(width) * usize::from(height)],
        }
    }

    fn put(&mut self, x: u16, y: u16, ch: char) {
        if x < self.width && y < self.height {
            let index = usize::from(y) * usize::from(self.width) + usize::from(x);
            self.cells[index] = ch;
        }
    }

    fn rows(&self) -> impl Iterator<Item = String> + '_ {
        self.cells
            .chunks(usize::from(self.width.max(1)))
            .map(|row| row.iter().collect::<String>().trim_end().to_string())
    }
}

impl Display for TextScreen {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn paint(&mut self, frame: &WindowFrame) {
        let area = frame.area;
        let right = area.x.saturating_add(area.w);
        for row in 0..area.h {
            let y = area.y + row;
            let index = usize::from(row);
            let Some(line) = frame.lines.get(index) else {
                self.put(area.x, y, '~');
                continue;
            };

            let mut x = area.x;
            if frame.gutter > 0 {
                let width = usize::from(frame.gutter - 1);
                let number = format!("{:>width$} ", frame.first_line + index + 1);
                for ch in number.chars() {
                    self.put(x, y, ch);
                    x = x.saturating_add(1);
                }
            }
            for ch in line.chars().skip(frame.left_col) {
                if x >= right {
                    break;
                }
                self.put(x, y, if ch == '\t' { ' ' } else { ch });
                x = x.saturating_add(1);
            }
        }
    }
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_line_number(true)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Feed every script to the editor, stopping early on a quit.
fn run_script(editor: &mut Editor, scripts: &[String]) -> Result<()> {
    for script in scripts {
        let keys = parse_keys(script).with_context(|| format!("bad key notation {script:?}"))?;
        for key in keys {
            let outcome = editor.handle_key(key);
            debug!(%key, ?outcome, "key");
            if editor.should_quit() {
                info!("script quit the editor");
                return Ok(());
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = load_config(args.config.as_deref())?;
    let flags = if args.no_threads {
        EditorFlags::DISABLE_THREADS
    } else {
        EditorFlags::empty()
    };
    let mut editor = Editor::new(config, flags);

    if let Some(path) = &args.file {
        editor
            .init_with_file(path)
            .with_context(|| format!("opening {}", path.display()))?;
    } else {
        let mut text = String::new();
        if args.stdin {
            io::stdin().read_to_string(&mut text).context("reading stdin")?;
        }
        editor.init_with_text(SCRATCH_NAME, &text);
    }
    editor
        .set_global_mode(&args.mode)
        .with_context(|| format!("selecting mode {:?}", args.mode))?;

    run_script(&mut editor, &args.keys)?;
    editor.tick(0.0);

    let mut out = io::stdout().lock();
    if let Some((width, height)) = args.screen {
        let mut screen = TextScreen::new(width, height);
        editor.update_size(&screen);
        editor.display(&mut screen);
        for row in screen.rows() {
            writeln!(out, "{row}")?;
        }
    }
    if args.print {
        if let Some(buf) = editor.active_buffer() {
            write!(out, "{}", buf.contents())?;
        }
    }
    out.flush()?;

    for msg in editor.take_messages() {
        eprintln!("{msg}");
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(parse_size("80x24"), Ok((80, 24)));
        assert_eq!(parse_size("100X30"), Ok((100, 30)));
        assert!(parse_size("80").is_err());
        assert!(parse_size("ax24").is_err());
    }

    #[test]
    fn script_edits_and_screen_dump() {
        let mut editor = Editor::new(EditorConfig::default(), EditorFlags::DISABLE_THREADS);
        editor.init_with_text(SCRATCH_NAME, "one\ntwo\n");
        editor.execute_command("set nonu");
        run_script(&mut editor, &["dd".to_string(), "Anew<Esc>".to_string()]).unwrap();

        let mut screen = TextScreen::new(10, 3);
        editor.update_size(&screen);
        editor.display(&mut screen);
        let rows: Vec<String> = screen.rows().collect();
        assert_eq!(rows, vec!["twonew", "", "~"]);
    }

    #[test]
    fn script_stops_at_quit() {
        let mut editor = Editor::new(EditorConfig::default(), EditorFlags::DISABLE_THREADS);
        editor.init_with_text(SCRATCH_NAME, "abc");
        run_script(&mut editor, &[":q<CR>x".to_string()]).unwrap();
        assert!(editor.should_quit());
        assert_eq!(editor.active_buffer().unwrap().contents(), "abc");
    }

    #[test]
    fn bad_notation_is_an_error() {
        let mut editor = Editor::new(EditorConfig::default(), EditorFlags::DISABLE_THREADS);
        editor.init_with_text(SCRATCH_NAME, "");
        assert!(run_script(&mut editor, &["<Bogus>".to_string()]).is_err());
    }

    #[test]
    fn config_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kestrel.toml");
        fs::write(&path, "tab_width = 8\nshow_line_numbers = false\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.tab_width, 8);
        assert!(!config.show_line_numbers);
        assert!(config.short_tab_names);

        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
