//! Per-tab cell state.
//!
//! The store is sparse: an absent entry reads exactly like `false` / `0`.

use std::collections::BTreeMap;

use serde::Serialize;
use taskboard_shared::{StateDto, WireValue};
use tracing::{debug, trace};

use crate::board::{Cell, CellKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellValue {
    Flag(bool),
    Count(u64),
}

impl CellValue {
    /// Normalizes a wire value; counts never go below zero and anything
    /// that is not a boolean or a number is dropped.
    pub fn from_wire(value: WireValue) -> Option<Self> {
        match value {
            WireValue::Flag(b) => Some(Self::Flag(b)),
            WireValue::Int(n) => Some(Self::Count(u64::try_from(n).unwrap_or(0))),
            WireValue::Float(f) if f.is_finite() => Some(Self::Count(f.max(0.0) as u64)),
            WireValue::Float(_) | WireValue::Unknown => None,
        }
    }

    pub fn to_wire(self) -> WireValue {
        match self {
            Self::Flag(b) => WireValue::Flag(b),
            Self::Count(n) => WireValue::Int(i64::try_from(n).unwrap_or(i64::MAX)),
        }
    }

    pub fn is_truthy(self) -> bool {
        match self {
            Self::Flag(b) => b,
            Self::Count(n) => n > 0,
        }
    }

    pub fn count(self) -> u64 {
        match self {
            Self::Flag(b) => u64::from(b),
            Self::Count(n) => n,
        }
    }

    /// The zero value for a cell kind.
    pub fn default_for(kind: CellKind) -> Self {
        match kind {
            CellKind::Counter => Self::Count(0),
            CellKind::Toggle | CellKind::RowMarker => Self::Flag(false),
        }
    }

    /// Re-types a stored value for the kind the board declares.
    pub fn typed(self, kind: CellKind) -> Self {
        match kind {
            CellKind::Counter => Self::Count(self.count()),
            CellKind::Toggle | CellKind::RowMarker => Self::Flag(self.is_truthy()),
        }
    }
}

pub type TabState = BTreeMap<String, CellValue>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateStore {
    tabs: BTreeMap<String, TabState>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[tracing::instrument(skip_all)]
    pub fn from_dto(dto: &StateDto) -> Self {
        let tabs: BTreeMap<String, TabState> = dto
            .iter()
            .map(|(tab_id, cells)| (tab_id.clone(), tab_state_from_wire(cells)))
            .collect();
        debug!(tabs = tabs.len(), "built state store");
        Self { tabs }
    }

    /// Raw stored value, if any.
    pub fn value(&self, tab_id: &str, cell_id: &str) -> Option<CellValue> {
        self.tabs.get(tab_id)?.get(cell_id).copied()
    }

    /// Value typed by the cell's kind; absent entries read as the kind's zero.
    pub fn get(&self, tab_id: &str, cell: &Cell) -> CellValue {
        self.value(tab_id, &cell.id)
            .map(|value| value.typed(cell.kind))
            .unwrap_or_else(|| CellValue::default_for(cell.kind))
    }

    pub fn is_truthy(&self, tab_id: &str, cell_id: &str) -> bool {
        self.value(tab_id, cell_id).is_some_and(CellValue::is_truthy)
    }

    pub fn count(&self, tab_id: &str, cell_id: &str) -> u64 {
        self.value(tab_id, cell_id).map_or(0, CellValue::count)
    }

    pub fn set(&mut self, tab_id: &str, cell_id: &str, value: CellValue) {
        trace!(tab = tab_id, cell = cell_id, ?value, "set cell state");
        self.tabs
            .entry(tab_id.to_string())
            .or_default()
            .insert(cell_id.to_string(), value);
    }

    pub fn replace_tab(&mut self, tab_id: &str, snapshot: TabState) {
        self.tabs.insert(tab_id.to_string(), snapshot);
    }

    pub fn replace_all(&mut self, snapshot: StateStore) {
        *self = snapshot;
    }

    pub fn tab_ids(&self) -> impl Iterator<Item = &str> {
        self.tabs.keys().map(String::as_str)
    }
}

pub fn tab_state_from_wire(cells: &BTreeMap<String, WireValue>) -> TabState {
    cells
        .iter()
        .filter_map(|(cell_id, value)| {
            CellValue::from_wire(*value).map(|value| (cell_id.clone(), value))
        })
        .collect()
}
