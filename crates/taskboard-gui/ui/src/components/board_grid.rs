use taskboard_core::aggregate::CellView;
use yew::{
  Callback,
  Html,
  Properties,
  function_component,
  html
};

use super::CellTile;

#[derive(Properties, PartialEq)]
pub struct BoardGridProps {
  pub grid:      Vec<Vec<CellView>>,
  pub on_toggle: Callback<String>,
  pub on_adjust: Callback<(String, i64)>
}

#[function_component(BoardGrid)]
pub fn board_grid(
  props: &BoardGridProps
) -> Html {
  let row_height =
    100.0 / props.grid.len().max(1) as f64;

  html! {
      <div id="board" class="board-grid">
          { for props.grid.iter().enumerate().map(|(index, row)| {
              let width = 100.0 / row.len().max(1) as f64;
              html! {
                  <div
                      key={index}
                      class="board-row"
                      style={format!("height: {row_height:.3}%;")}
                  >
                      { for row.iter().enumerate().map(|(column, cell)| html! {
                          <CellTile
                              key={column}
                              cell={cell.clone()}
                              {width}
                              on_toggle={props.on_toggle.clone()}
                              on_adjust={props.on_adjust.clone()}
                          />
                      }) }
                  </div>
              }
          }) }
      </div>
  }
}
