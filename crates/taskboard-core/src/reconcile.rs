//! The owned view context and every transition applied to it.
//!
//! A [`Session`] holds the board, the cell state and the selected tab.
//! Snapshots from polling replace the board or the state wholesale; user
//! actions mutate one cell optimistically and hand back the single
//! [`StateWrite`] that should go to the server. Delivery of that write is
//! fire-and-forget: a lost write is corrected by the next state poll.

use taskboard_shared::{BoardDto, StateDto, StateWrite};
use tracing::{debug, info};

use crate::aggregate::{Aggregator, ViewFacts};
use crate::board::{ALL_TAB, BoardModel};
use crate::state::{CellValue, StateStore};

/// Tab selected before the first board arrives.
pub const INITIAL_TAB: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    board: BoardModel,
    store: StateStore,
    current_tab: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_tab(INITIAL_TAB)
    }

    pub fn with_tab(tab_id: &str) -> Self {
        Self {
            board: BoardModel::empty(),
            store: StateStore::new(),
            current_tab: tab_id.to_string(),
        }
    }

    pub fn board(&self) -> &BoardModel {
        &self.board
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn current_tab(&self) -> &str {
        &self.current_tab
    }

    /// `ALL` shows the aggregate list instead of the grid.
    pub fn is_list_view(&self) -> bool {
        self.current_tab == ALL_TAB
    }

    pub fn view(&self) -> Aggregator<'_> {
        Aggregator::new(&self.board, &self.store, &self.current_tab)
    }

    pub fn facts(&self) -> ViewFacts {
        self.view().facts()
    }

    /// Swaps in a new board, falling back to `ALL` when the selected tab
    /// is gone.
    #[tracing::instrument(skip_all)]
    pub fn apply_board_snapshot(&mut self, board: BoardModel) {
        self.board.replace(board);
        if !self.board.has_tab(&self.current_tab) && !self.is_list_view() {
            info!(
                previous = %self.current_tab,
                "selected tab no longer on board; showing ALL"
            );
            self.current_tab = ALL_TAB.to_string();
        }
    }

    pub fn apply_board_dto(&mut self, dto: &BoardDto) {
        self.apply_board_snapshot(BoardModel::from_dto(dto));
    }

    #[tracing::instrument(skip_all)]
    pub fn apply_state_snapshot(&mut self, store: StateStore) {
        self.store.replace_all(store);
    }

    pub fn apply_state_dto(&mut self, dto: &StateDto) {
        self.apply_state_snapshot(StateStore::from_dto(dto));
    }

    /// Switches the displayed tab. An id that is neither `ALL` nor on the
    /// board is ignored (returns `false`) instead of selecting a tab that
    /// would render an empty grid.
    pub fn select_tab(&mut self, tab_id: &str) -> bool {
        if tab_id != ALL_TAB && !self.board.has_tab(tab_id) {
            debug!(tab = tab_id, "ignoring selection of unknown tab");
            return false;
        }
        self.current_tab = tab_id.to_string();
        true
    }

    /// Flips a toggle cell on the current tab.
    #[tracing::instrument(skip(self), fields(tab = %self.current_tab))]
    pub fn toggle_cell(&mut self, cell_id: &str) -> Option<StateWrite> {
        let tab_id = self.editable_tab()?;
        let cell = self.board.cell(cell_id).filter(|cell| cell.kind.is_toggle())?;

        let next = CellValue::Flag(!self.store.is_truthy(&tab_id, &cell.id));
        self.store.set(&tab_id, &cell.id, next);
        debug!(cell = cell_id, ?next, "toggled cell");
        Some(StateWrite::new(tab_id, cell_id, next.to_wire()))
    }

    /// Moves a counter by `delta`, clamped at zero. Returns `None` when
    /// nothing changed.
    #[tracing::instrument(skip(self), fields(tab = %self.current_tab))]
    pub fn adjust_cell(&mut self, cell_id: &str, delta: i64) -> Option<StateWrite> {
        let tab_id = self.editable_tab()?;
        let cell = self.board.cell(cell_id).filter(|cell| cell.kind.is_counter())?;

        let old = self.store.count(&tab_id, &cell.id);
        let new = if delta.is_negative() {
            old.saturating_sub(delta.unsigned_abs())
        } else {
            old.saturating_add(delta.unsigned_abs())
        };
        if new == old {
            return None;
        }

        let next = CellValue::Count(new);
        self.store.set(&tab_id, &cell.id, next);
        debug!(cell = cell_id, old, new, "adjusted counter");
        Some(StateWrite::new(tab_id, cell_id, next.to_wire()))
    }

    fn editable_tab(&self) -> Option<String> {
        if self.is_list_view() || !self.board.has_tab(&self.current_tab) {
            return None;
        }
        Some(self.current_tab.clone())
    }
}

#[cfg(test)]
mod tests {
    use taskboard_shared::{BoardDto, CellsDto, TabsDto, WireId, WireValue};

    use super::*;

    fn board_with_tabs(tabs: &[&str]) -> BoardModel {
        BoardModel::from_dto(&BoardDto {
            tabs: TabsDto {
                order: tabs.iter().map(|id| WireId::from(*id)).collect(),
                labels: tabs.iter().map(|id| (id.to_string(), format!("Tab {id}"))).collect(),
            },
            cells: CellsDto {
                layout: vec![
                    vec![WireId::from("1"), WireId::from("2")],
                    vec![WireId::from("c1")],
                    vec![WireId::from("r1")],
                ],
                labels: Default::default(),
            },
        })
    }

    fn session_on(tab: &str) -> Session {
        let mut session = Session::with_tab(tab);
        session.apply_board_snapshot(board_with_tabs(&["1", "2", "3"]));
        session
    }

    #[test]
    fn board_refresh_keeps_selection_when_tab_survives() {
        let mut session = session_on("2");
        session.apply_board_snapshot(board_with_tabs(&["2", "4"]));
        assert_eq!(session.current_tab(), "2");
    }

    #[test]
    fn board_refresh_falls_back_to_all() {
        let mut session = session_on("3");
        session.apply_board_snapshot(board_with_tabs(&["1", "2"]));
        assert_eq!(session.current_tab(), ALL_TAB);
        assert!(session.is_list_view());
    }

    #[test]
    fn initial_tab_missing_from_first_board_shows_all() {
        let mut session = Session::new();
        session.apply_board_snapshot(board_with_tabs(&["S1", "S2"]));
        assert_eq!(session.current_tab(), ALL_TAB);
    }

    #[test]
    fn state_refresh_does_not_touch_selection() {
        let mut session = session_on("2");
        let mut store = StateStore::new();
        store.set("2", "1", CellValue::Flag(true));
        session.apply_state_snapshot(store);
        assert_eq!(session.current_tab(), "2");
        assert!(session.view().is_cell_on("1"));
    }

    #[test]
    fn toggle_is_a_pure_flip() {
        let mut session = session_on("1");
        let first = session.toggle_cell("2").expect("toggle cell exists");
        assert_eq!(first, StateWrite::new("1", "2", WireValue::Flag(true)));
        assert!(session.store().is_truthy("1", "2"));

        let second = session.toggle_cell("2").expect("toggle cell exists");
        assert_eq!(second.value, WireValue::Flag(false));
        assert!(!session.store().is_truthy("1", "2"));
    }

    #[test]
    fn toggle_ignores_counters_row_markers_and_unknown_cells() {
        let mut session = session_on("1");
        assert!(session.toggle_cell("c1").is_none());
        assert!(session.toggle_cell("r1").is_none());
        assert!(session.toggle_cell("nope").is_none());
        assert_eq!(session.store(), &StateStore::new());
    }

    #[test]
    fn actions_on_all_view_are_no_ops() {
        let mut session = session_on("1");
        assert!(session.select_tab(ALL_TAB));
        assert!(session.toggle_cell("1").is_none());
        assert!(session.adjust_cell("c1", 1).is_none());
    }

    #[test]
    fn adjust_clamps_at_zero() {
        let mut session = session_on("2");
        assert!(session.adjust_cell("c1", -1).is_none());
        assert_eq!(session.store().count("2", "c1"), 0);

        session.adjust_cell("c1", 3);
        let write = session.adjust_cell("c1", -5).expect("counter moved");
        assert_eq!(write.value, WireValue::Int(0));
        assert_eq!(session.store().count("2", "c1"), 0);
        assert!(session.adjust_cell("1", 1).is_none());
    }

    #[test]
    fn adjust_sends_the_new_count() {
        let mut session = session_on("3");
        session.adjust_cell("c1", 2);
        let write = session.adjust_cell("c1", 1).expect("counter exists");
        assert_eq!(write, StateWrite::new("3", "c1", WireValue::Int(3)));
    }

    #[test]
    fn selecting_unknown_tab_is_ignored() {
        let mut session = session_on("1");
        assert!(!session.select_tab("99"));
        assert_eq!(session.current_tab(), "1");
        assert!(session.select_tab("3"));
        assert_eq!(session.current_tab(), "3");
    }

    #[test]
    fn applying_the_same_state_twice_is_idempotent() {
        let mut session = session_on("1");
        let mut dto = StateDto::new();
        dto.entry("1".to_string())
            .or_default()
            .insert("1".to_string(), WireValue::Flag(true));
        dto.entry("2".to_string())
            .or_default()
            .insert("c1".to_string(), WireValue::Int(2));

        session.apply_state_dto(&dto);
        let first = session.facts();
        session.apply_state_dto(&dto);
        assert_eq!(session.facts(), first);
    }
}
