use yew::{
  Html,
  Properties,
  function_component,
  html
};

#[derive(Properties, PartialEq)]
pub struct ItemListProps {
  pub items: Vec<String>
}

#[function_component(ItemList)]
pub fn item_list(
  props: &ItemListProps
) -> Html {
  if props.items.is_empty() {
    return html! {
        <div id="list" class="item-list empty">
            { "Nothing needs attention." }
        </div>
    };
  }

  html! {
      <div id="list" class="item-list">
          { for props.items.iter().map(|item| html! {
              <div class="item">{ item.clone() }</div>
          }) }
      </div>
  }
}
