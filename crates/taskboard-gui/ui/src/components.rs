mod board_grid;
mod cell_tile;
mod item_list;
mod tab_button;
mod tab_strip;

pub use board_grid::BoardGrid;
pub use cell_tile::CellTile;
pub use item_list::ItemList;
pub use tab_button::TabButton;
pub use tab_strip::TabStrip;
