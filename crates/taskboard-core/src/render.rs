use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::aggregate::{CellView, TabView, ViewFacts};
use crate::board::CellKind;
use crate::config::Config;

/// Text renderer for the terminal front end.
#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all)]
    pub fn print_view(&self, facts: &ViewFacts) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_view(&mut out, facts)?;
        out.flush()?;
        Ok(())
    }

    pub fn print_items(&self, items: &[String]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_items(&mut out, items)?;
        Ok(())
    }

    /// Tab strip, then the grid or the `ALL` list.
    pub fn write_view<W: Write>(&self, out: &mut W, facts: &ViewFacts) -> anyhow::Result<()> {
        self.write_tab_strip(out, &facts.tabs)?;
        writeln!(out)?;
        if facts.list_view {
            self.write_items(out, &facts.items)
        } else {
            self.write_grid(out, &facts.grid)
        }
    }

    pub fn write_tab_strip<W: Write>(&self, out: &mut W, tabs: &[TabView]) -> anyhow::Result<()> {
        let mut parts = Vec::with_capacity(tabs.len());
        for tab in tabs.iter().filter(|tab| tab.selectable) {
            let name = if tab.label.is_empty() {
                tab.id.as_str()
            } else {
                tab.label.as_str()
            };
            let marker = if tab.on { "*" } else { " " };
            let text = if tab.flags.selected {
                format!("[{name}]{marker}")
            } else {
                format!(" {name} {marker}")
            };
            parts.push(if tab.on { self.paint(&text, "33") } else { text });
        }
        writeln!(out, "{}", parts.join(" ").trim_end())?;
        Ok(())
    }

    pub fn write_grid<W: Write>(&self, out: &mut W, grid: &[Vec<CellView>]) -> anyhow::Result<()> {
        let rendered: Vec<Vec<String>> = grid
            .iter()
            .map(|row| row.iter().map(|cell| self.cell_text(cell)).collect())
            .collect();

        let columns = rendered.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for row in &rendered {
            for (idx, text) in row.iter().enumerate() {
                widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(text).as_str()));
            }
        }

        for row in rendered {
            let mut line = String::new();
            for (idx, text) in row.iter().enumerate() {
                let visible = UnicodeWidthStr::width(strip_ansi(text).as_str());
                line.push_str(text);
                line.push_str(&" ".repeat(widths[idx].saturating_sub(visible) + 2));
            }
            writeln!(out, "{}", line.trim_end())?;
        }
        Ok(())
    }

    pub fn write_items<W: Write>(&self, out: &mut W, items: &[String]) -> anyhow::Result<()> {
        for item in items {
            writeln!(out, "{item}")?;
        }
        Ok(())
    }

    fn cell_text(&self, cell: &CellView) -> String {
        let text = match cell.kind {
            CellKind::Counter => format!("[- {} +] {}", cell.value.count(), cell.label),
            CellKind::Toggle => {
                let mark = if cell.on { "x" } else { " " };
                format!("[{mark}] {}", cell.label)
            }
            CellKind::RowMarker => {
                let mark = if cell.on { "#" } else { "-" };
                format!("{mark} {}", cell.label)
            }
        };
        if cell.on {
            self.paint(&text, "32")
        } else {
            text
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
