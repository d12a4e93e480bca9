//! Board layout: ordered tabs and a row-major grid of cells.
//!
//! A [`BoardModel`] is built once per `GET /board` response and swapped in
//! whole; nothing mutates it in place.

use std::collections::HashMap;

use serde::Serialize;
use taskboard_shared::BoardDto;
use tracing::debug;

/// Synthetic aggregate tab, always rendered after the real tabs.
pub const ALL_TAB: &str = "ALL";

/// Placeholder after `ALL` so the last real tab can still flare.
pub const EXTRA_TAB: &str = "EXTRA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CellKind {
    /// Decorative; never counts toward activity or totals.
    RowMarker,
    /// Non-negative integer summed across tabs.
    Counter,
    /// Boolean scoped to one tab.
    Toggle,
}

impl CellKind {
    pub fn from_id(id: &str) -> Self {
        if id.starts_with('r') {
            Self::RowMarker
        } else if id.starts_with('c') {
            Self::Counter
        } else {
            Self::Toggle
        }
    }

    pub fn is_counter(self) -> bool {
        self == Self::Counter
    }

    pub fn is_toggle(self) -> bool {
        self == Self::Toggle
    }

    pub fn is_row_marker(self) -> bool {
        self == Self::RowMarker
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tab {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub id: String,
    pub label: String,
    pub kind: CellKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardModel {
    tabs: Vec<Tab>,
    rows: Vec<Vec<Cell>>,
    // First layout position of each cell id.
    positions: HashMap<String, (usize, usize)>,
}

impl BoardModel {
    pub fn empty() -> Self {
        Self::default()
    }

    #[tracing::instrument(skip_all)]
    pub fn from_dto(dto: &BoardDto) -> Self {
        let tabs: Vec<Tab> = dto
            .tabs
            .order
            .iter()
            .map(|id| Tab {
                id: id.to_string(),
                label: dto.tabs.labels.get(id.as_str()).cloned().unwrap_or_default(),
            })
            .collect();

        let mut positions = HashMap::new();
        let rows: Vec<Vec<Cell>> = dto
            .cells
            .layout
            .iter()
            .enumerate()
            .map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .map(|(c, id)| {
                        positions.entry(id.to_string()).or_insert((r, c));
                        Cell {
                            id: id.to_string(),
                            label: dto.cells.labels.get(id.as_str()).cloned().unwrap_or_default(),
                            kind: CellKind::from_id(id.as_str()),
                        }
                    })
                    .collect()
            })
            .collect();

        debug!(
            tabs = tabs.len(),
            rows = rows.len(),
            cells = positions.len(),
            "built board model"
        );

        Self {
            tabs,
            rows,
            positions,
        }
    }

    /// Swaps in a whole new board.
    pub fn replace(&mut self, next: BoardModel) {
        *self = next;
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab(&self, id: &str) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.id == id)
    }

    pub fn has_tab(&self, id: &str) -> bool {
        self.tab(id).is_some()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cells of row `r` in column order; empty past the last row.
    pub fn cells_in_row(&self, r: usize) -> &[Cell] {
        self.rows.get(r).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cell(&self, id: &str) -> Option<&Cell> {
        let &(r, c) = self.positions.get(id)?;
        self.rows.get(r)?.get(c)
    }

    /// Every distinct cell once, in first-occurrence row-major order.
    pub fn unique_cells(&self) -> impl Iterator<Item = &Cell> {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(r, row)| row.iter().enumerate().map(move |(c, cell)| (r, c, cell)))
            .filter(|(r, c, cell)| self.positions.get(&cell.id) == Some(&(*r, *c)))
            .map(|(_, _, cell)| cell)
    }

    pub fn counters(&self) -> impl Iterator<Item = &Cell> {
        self.unique_cells().filter(|cell| cell.kind.is_counter())
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty() && self.rows.is_empty()
    }
}
