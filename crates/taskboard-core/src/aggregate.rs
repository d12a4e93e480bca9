//! Read-only view facts derived from the board, the state store and the
//! selected tab. Everything a renderer needs comes from here.

use serde::Serialize;

use crate::board::{ALL_TAB, BoardModel, CellKind, EXTRA_TAB};
use crate::state::{CellValue, StateStore};

/// Flare flags for one entry of the tab strip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TabFlags {
    /// The previous tab in order is the selected one.
    pub above_selected: bool,
    pub selected: bool,
    /// The next tab in order is the selected one.
    pub below_selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabView {
    pub id: String,
    pub label: String,
    pub on: bool,
    pub selectable: bool,
    pub flags: TabFlags,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellView {
    pub id: String,
    pub label: String,
    pub kind: CellKind,
    pub on: bool,
    pub value: CellValue,
}

/// Everything the renderer consumes for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewFacts {
    pub current_tab: String,
    pub list_view: bool,
    pub tabs: Vec<TabView>,
    pub grid: Vec<Vec<CellView>>,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    board: &'a BoardModel,
    store: &'a StateStore,
    current_tab: &'a str,
}

impl<'a> Aggregator<'a> {
    pub fn new(board: &'a BoardModel, store: &'a StateStore, current_tab: &'a str) -> Self {
        Self {
            board,
            store,
            current_tab,
        }
    }

    /// Any non-row-marker cell under the tab is truthy or non-zero.
    pub fn is_tab_active(&self, tab_id: &str) -> bool {
        self.board
            .unique_cells()
            .filter(|cell| !cell.kind.is_row_marker())
            .any(|cell| self.store.is_truthy(tab_id, &cell.id))
    }

    /// Raw truthiness of the cell under the current tab.
    pub fn is_cell_on(&self, cell_id: &str) -> bool {
        self.store.is_truthy(self.current_tab, cell_id)
    }

    /// Sum of the counter across every tab of the board.
    pub fn counter_total(&self, cell_id: &str) -> u64 {
        self.board
            .tabs()
            .iter()
            .map(|tab| self.store.count(&tab.id, cell_id))
            .sum()
    }

    /// Labels of tabs where the counter is non-zero, in tab order.
    pub fn contributing_tabs(&self, cell_id: &str) -> Vec<String> {
        self.board
            .tabs()
            .iter()
            .filter(|tab| self.store.count(&tab.id, cell_id) != 0)
            .map(|tab| tab.label.clone())
            .collect()
    }

    /// Contents of the `ALL` list: truthy toggles per tab, then one total
    /// line per counter (zero totals included).
    pub fn active_items(&self) -> Vec<String> {
        let mut items = Vec::new();
        for tab in self.board.tabs() {
            for cell in self.board.unique_cells().filter(|cell| cell.kind.is_toggle()) {
                if self.store.is_truthy(&tab.id, &cell.id) {
                    items.push(format!("{}: {}", tab.label, cell.label));
                }
            }
        }

        for counter in self.board.counters() {
            let total = self.counter_total(&counter.id);
            let mut line = format!("{}: {} total", counter.label, total);
            if total != 0 {
                line.push_str(&format!(" ({})", self.contributing_tabs(&counter.id).join(", ")));
            }
            items.push(line);
        }

        items
    }

    /// Ids of the whole strip: real tabs, `ALL`, then the `EXTRA`
    /// placeholder.
    pub fn strip_order(&self) -> Vec<&'a str> {
        self.board
            .tabs()
            .iter()
            .map(|tab| tab.id.as_str())
            .chain([ALL_TAB, EXTRA_TAB])
            .collect()
    }

    pub fn tab_adjacency(&self, tab_id: &str) -> TabFlags {
        let order = self.strip_order();
        let Some(idx) = order.iter().position(|id| *id == tab_id) else {
            return TabFlags::default();
        };
        let current = self.current_tab;
        TabFlags {
            above_selected: idx
                .checked_sub(1)
                .and_then(|prev| order.get(prev))
                .is_some_and(|prev| *prev == current),
            selected: tab_id == current,
            below_selected: order.get(idx + 1).is_some_and(|next| *next == current),
        }
    }

    pub fn tab_strip(&self) -> Vec<TabView> {
        let mut strip: Vec<TabView> = self
            .board
            .tabs()
            .iter()
            .map(|tab| TabView {
                id: tab.id.clone(),
                label: tab.label.clone(),
                on: self.is_tab_active(&tab.id),
                selectable: true,
                flags: self.tab_adjacency(&tab.id),
            })
            .collect();

        strip.push(TabView {
            id: ALL_TAB.to_string(),
            label: ALL_TAB.to_string(),
            on: false,
            selectable: true,
            flags: self.tab_adjacency(ALL_TAB),
        });
        strip.push(TabView {
            id: EXTRA_TAB.to_string(),
            label: String::new(),
            on: false,
            selectable: false,
            flags: self.tab_adjacency(EXTRA_TAB),
        });
        strip
    }

    /// Grid for the current tab, one entry per layout position.
    pub fn grid(&self) -> Vec<Vec<CellView>> {
        (0..self.board.row_count())
            .map(|r| {
                self.board
                    .cells_in_row(r)
                    .iter()
                    .map(|cell| CellView {
                        id: cell.id.clone(),
                        label: cell.label.clone(),
                        kind: cell.kind,
                        on: self.is_cell_on(&cell.id),
                        value: self.store.get(self.current_tab, cell),
                    })
                    .collect()
            })
            .collect()
    }

    pub fn facts(&self) -> ViewFacts {
        ViewFacts {
            current_tab: self.current_tab.to_string(),
            list_view: self.current_tab == ALL_TAB,
            tabs: self.tab_strip(),
            grid: self.grid(),
            items: self.active_items(),
        }
    }
}

#[cfg(test)]
mod tests {
    use taskboard_shared::{BoardDto, CellsDto, TabsDto, WireId};

    use super::*;

    fn board(tabs: &[(&str, &str)], layout: &[&[&str]], labels: &[(&str, &str)]) -> BoardModel {
        BoardModel::from_dto(&BoardDto {
            tabs: TabsDto {
                order: tabs.iter().map(|(id, _)| WireId::from(*id)).collect(),
                labels: tabs
                    .iter()
                    .map(|(id, label)| (id.to_string(), label.to_string()))
                    .collect(),
            },
            cells: CellsDto {
                layout: layout
                    .iter()
                    .map(|row| row.iter().map(|id| WireId::from(*id)).collect())
                    .collect(),
                labels: labels
                    .iter()
                    .map(|(id, label)| (id.to_string(), label.to_string()))
                    .collect(),
            },
        })
    }

    fn ward() -> BoardModel {
        board(
            &[("T1", "T1"), ("T2", "T2"), ("T3", "T3")],
            &[&["x", "y"], &["c1"], &["r1"]],
            &[("x", "Done"), ("y", "Mop needed"), ("c1", "Widgets"), ("r1", "Bed 1")],
        )
    }

    #[test]
    fn row_markers_never_activate_a_tab() {
        let board = ward();
        let mut store = StateStore::new();
        store.set("T1", "r1", CellValue::Flag(true));
        store.set("T2", "y", CellValue::Flag(true));
        store.set("T3", "c1", CellValue::Count(2));

        let agg = Aggregator::new(&board, &store, "T1");
        assert!(!agg.is_tab_active("T1"));
        assert!(agg.is_tab_active("T2"));
        assert!(agg.is_tab_active("T3"));
        assert!(!agg.is_tab_active("missing"));
    }

    #[test]
    fn cell_on_is_raw_truthiness_for_current_tab() {
        let board = ward();
        let mut store = StateStore::new();
        store.set("T1", "r1", CellValue::Flag(true));
        store.set("T2", "x", CellValue::Flag(true));

        let agg = Aggregator::new(&board, &store, "T1");
        assert!(agg.is_cell_on("r1"));
        assert!(!agg.is_cell_on("x"));
    }

    #[test]
    fn counter_totals_and_contributors_follow_tab_order() {
        let board = ward();
        let mut store = StateStore::new();
        store.set("T3", "c1", CellValue::Count(2));
        store.set("T1", "c1", CellValue::Count(5));
        store.set("T2", "c1", CellValue::Count(0));
        // Not a board tab; ignored by board-wide sums.
        store.set("ghost", "c1", CellValue::Count(9));

        let agg = Aggregator::new(&board, &store, "T1");
        assert_eq!(agg.counter_total("c1"), 7);
        assert_eq!(agg.contributing_tabs("c1"), vec!["T1", "T3"]);
        assert_eq!(agg.counter_total("unknown"), 0);
    }

    #[test]
    fn active_items_list_toggles_then_counter_totals() {
        let board = board(
            &[("T1", "T1"), ("T2", "T2")],
            &[&["x"], &["c1"]],
            &[("x", "Done"), ("c1", "Widgets")],
        );
        let mut store = StateStore::new();
        store.set("T1", "x", CellValue::Flag(true));

        let agg = Aggregator::new(&board, &store, "ALL");
        assert_eq!(agg.active_items(), vec!["T1: Done", "Widgets: 0 total"]);

        store.set("T2", "c1", CellValue::Count(3));
        store.set("T1", "c1", CellValue::Count(1));
        let agg = Aggregator::new(&board, &store, "ALL");
        assert_eq!(
            agg.active_items(),
            vec!["T1: Done", "Widgets: 4 total (T1, T2)"]
        );
    }

    #[test]
    fn active_items_skip_row_markers_and_counters() {
        let board = ward();
        let mut store = StateStore::new();
        store.set("T2", "r1", CellValue::Flag(true));
        store.set("T2", "y", CellValue::Flag(true));
        store.set("T1", "x", CellValue::Flag(true));

        let agg = Aggregator::new(&board, &store, "ALL");
        assert_eq!(
            agg.active_items(),
            vec!["T1: Done", "T2: Mop needed", "Widgets: 0 total"]
        );
    }

    #[test]
    fn grid_keeps_repeated_cells_in_place() {
        let board = board(&[("T1", "T1")], &[&["x", "y", "x"]], &[("x", "Mop")]);
        let store = StateStore::new();
        let agg = Aggregator::new(&board, &store, "T1");

        let grid = agg.grid();
        let ids: Vec<&str> = grid[0].iter().map(|cell| cell.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "x"]);
        assert_eq!(grid[0][2].label, "Mop");
    }

    #[test]
    fn adjacency_flares_around_selected_tab() {
        let board = board(&[("A", "A"), ("B", "B"), ("C", "C")], &[], &[]);
        let store = StateStore::new();
        let agg = Aggregator::new(&board, &store, "B");

        let a = agg.tab_adjacency("A");
        let b = agg.tab_adjacency("B");
        let c = agg.tab_adjacency("C");
        assert_eq!(
            a,
            TabFlags {
                below_selected: true,
                ..TabFlags::default()
            }
        );
        assert_eq!(
            b,
            TabFlags {
                selected: true,
                ..TabFlags::default()
            }
        );
        assert_eq!(
            c,
            TabFlags {
                above_selected: true,
                ..TabFlags::default()
            }
        );
    }

    #[test]
    fn last_real_tab_and_all_flare_into_placeholder() {
        let board = board(&[("A", "A"), ("B", "B")], &[], &[]);
        let store = StateStore::new();

        let agg = Aggregator::new(&board, &store, "ALL");
        assert!(agg.tab_adjacency("B").below_selected);
        assert!(agg.tab_adjacency(ALL_TAB).selected);
        assert!(agg.tab_adjacency(EXTRA_TAB).above_selected);
        assert!(!agg.tab_adjacency("A").below_selected);

        let strip = agg.tab_strip();
        let ids: Vec<&str> = strip.iter().map(|tab| tab.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "ALL", "EXTRA"]);
        assert!(!strip[3].selectable);
    }

    #[test]
    fn grid_reports_typed_values() {
        let board = ward();
        let mut store = StateStore::new();
        store.set("T2", "c1", CellValue::Count(4));
        store.set("T2", "x", CellValue::Flag(true));

        let facts = Aggregator::new(&board, &store, "T2").facts();
        assert!(!facts.list_view);
        assert_eq!(facts.grid.len(), 3);
        assert!(facts.grid[0][0].on);
        assert_eq!(facts.grid[0][1].value, CellValue::Flag(false));
        assert_eq!(facts.grid[1][0].value, CellValue::Count(4));
    }
}
