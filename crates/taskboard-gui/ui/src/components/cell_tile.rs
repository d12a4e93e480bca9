use taskboard_core::CellKind;
use taskboard_core::aggregate::CellView;
use yew::{
  Callback,
  Html,
  MouseEvent,
  Properties,
  classes,
  function_component,
  html
};

#[derive(Properties, PartialEq)]
pub struct CellTileProps {
  pub cell:      CellView,
  /// Share of the row, in percent.
  pub width:     f64,
  pub on_toggle: Callback<String>,
  pub on_adjust: Callback<(String, i64)>
}

#[function_component(CellTile)]
pub fn cell_tile(
  props: &CellTileProps
) -> Html {
  let cell = &props.cell;
  let style = format!(
    "width: {:.3}%;",
    props.width
  );

  match cell.kind {
    | CellKind::Counter => {
      let step = |delta: i64| {
        let on_adjust =
          props.on_adjust.clone();
        let cell_id = cell.id.clone();
        Callback::from(
          move |event: MouseEvent| {
            event.stop_propagation();
            on_adjust
              .emit((cell_id.clone(), delta))
          }
        )
      };

      html! {
          <div class={classes!("cell", "counter", cell.on.then_some("on"))} {style}>
              <span class="counter-dec" onclick={step(-1)}>{ "-" }</span>
              <span class="counter-value">{ cell.value.count() }</span>
              <span class="counter-inc" onclick={step(1)}>{ "+" }</span>
              <span class="cell-label">{ cell.label.clone() }</span>
          </div>
      }
    }
    | CellKind::RowMarker => {
      html! {
          <div class="cell row-marker" {style}>
              { cell.label.clone() }
          </div>
      }
    }
    | CellKind::Toggle => {
      let on_toggle =
        props.on_toggle.clone();
      let cell_id = cell.id.clone();
      html! {
          <div
              class={classes!("cell", cell.on.then_some("on"))}
              {style}
              onclick={move |_| on_toggle.emit(cell_id.clone())}
          >
              { cell.label.clone() }
          </div>
      }
    }
  }
}
