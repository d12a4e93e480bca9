use taskboard_core::aggregate::TabView;
use yew::{
  Callback,
  Html,
  Properties,
  function_component,
  html
};

use super::TabButton;

#[derive(Properties, PartialEq)]
pub struct TabStripProps {
  pub tabs:      Vec<TabView>,
  pub on_select: Callback<String>
}

#[function_component(TabStrip)]
pub fn tab_strip(
  props: &TabStripProps
) -> Html {
  html! {
      <div id="tablist" class="tab-strip">
          { for props.tabs.iter().map(|tab| html! {
              <TabButton
                  key={tab.id.clone()}
                  tab={tab.clone()}
                  on_select={props.on_select.clone()}
              />
          }) }
      </div>
  }
}
