use taskboard_core::aggregate::TabView;
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
pub struct TabButtonProps {
  pub tab:       TabView,
  pub on_select: Callback<String>
}

#[function_component(TabButton)]
pub fn tab_button(
  props: &TabButtonProps
) -> Html {
  let tab = &props.tab;
  let class = classes!(
    "tab",
    tab.on.then_some("on"),
    tab.flags.selected.then_some("selected"),
    // CSS classes say where this tab
    // sits relative to the selected one.
    tab
      .flags
      .below_selected
      .then_some("above-selected"),
    tab
      .flags
      .above_selected
      .then_some("below-selected")
  );

  let onclick = tab.selectable.then(|| {
    let on_select = props.on_select.clone();
    let tab_id = tab.id.clone();
    Callback::from(move |_: MouseEvent| {
      on_select.emit(tab_id.clone())
    })
  });

  html! {
      <div class={class} {onclick}>
          { tab.label.clone() }
      </div>
  }
}
