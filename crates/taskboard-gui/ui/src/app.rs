use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::anyhow;
use gloo::timers::callback::Interval;
use taskboard_core::reconcile::INITIAL_TAB;
use taskboard_core::sync::{
  self,
  Snapshot,
  Stream,
  Ticket
};
use taskboard_core::{
  Session,
  SyncIntervals,
  SyncScheduler,
  ViewFacts
};
use yew::{
  Callback,
  Html,
  UseStateHandle,
  function_component,
  html,
  use_effect_with,
  use_mut_ref,
  use_state_eq
};

use crate::api;
use crate::components::{
  BoardGrid,
  ItemList,
  TabStrip
};

/// How often the scheduler is asked
/// which streams are due.
const TICK_MS: u32 = 250;

type Shared<T> = Rc<RefCell<T>>;

#[derive(Clone)]
struct Poller {
  session:   Shared<Session>,
  scheduler: Shared<SyncScheduler>,
  frame:     UseStateHandle<ViewFacts>
}

impl Poller {
  fn redraw(&self) {
    self
      .frame
      .set(self.session.borrow().facts());
  }

  fn tick(&self, started: f64) {
    let elapsed =
      (js_sys::Date::now() - started)
        .max(0.0);
    let now =
      Duration::from_millis(elapsed as u64);
    let tickets =
      self.scheduler.borrow_mut().due(now);
    for ticket in tickets {
      let poller = self.clone();
      wasm_bindgen_futures::spawn_local(
        async move {
          poller.poll(ticket).await;
        }
      );
    }
  }

  async fn poll(&self, ticket: Ticket) {
    let fetched = match ticket.stream {
      | Stream::Board => {
        api::fetch_board()
          .await
          .map(Snapshot::Board)
      }
      | Stream::State => {
        api::fetch_state()
          .await
          .map(Snapshot::State)
      }
    };

    match fetched {
      | Ok(snapshot) => {
        let changed = sync::apply_snapshot(
          &mut self.session.borrow_mut(),
          &mut self.scheduler.borrow_mut(),
          ticket,
          snapshot
        );
        if changed {
          self.redraw();
        }
      }
      | Err(err) => {
        self
          .scheduler
          .borrow_mut()
          .record_failure(
            ticket.stream,
            &anyhow!(err)
          );
      }
    }
  }

  fn flush(&self) {
    let writes = self
      .scheduler
      .borrow_mut()
      .drain_outbound();
    for write in writes {
      let scheduler =
        self.scheduler.clone();
      wasm_bindgen_futures::spawn_local(
        async move {
          if let Err(err) =
            api::send_state(&write).await
          {
            scheduler
              .borrow_mut()
              .record_write_failure(
                &write,
                &anyhow!(err)
              );
          }
        }
      );
    }
  }
}

#[function_component(App)]
pub fn app() -> Html {
  let session = use_mut_ref(|| {
    Session::with_tab(INITIAL_TAB)
  });
  let scheduler = use_mut_ref(|| {
    SyncScheduler::new(
      SyncIntervals::default()
    )
  });
  let frame = {
    let session = session.clone();
    use_state_eq(move || {
      session.borrow().facts()
    })
  };

  let poller = Poller {
    session,
    scheduler,
    frame: frame.clone()
  };

  {
    let poller = poller.clone();
    use_effect_with((), move |_| {
      let started = js_sys::Date::now();
      poller.tick(started);
      let interval =
        Interval::new(TICK_MS, move || {
          poller.tick(started)
        });
      move || drop(interval)
    });
  }

  let on_select_tab = {
    let poller = poller.clone();
    Callback::from(move |tab_id: String| {
      let selected = poller
        .session
        .borrow_mut()
        .select_tab(&tab_id);
      if selected {
        poller.redraw();
      }
    })
  };

  let on_toggle = {
    let poller = poller.clone();
    Callback::from(move |cell_id: String| {
      let write = poller
        .session
        .borrow_mut()
        .toggle_cell(&cell_id);
      if let Some(write) = write {
        poller
          .scheduler
          .borrow_mut()
          .dispatch(write);
        poller.flush();
        poller.redraw();
      }
    })
  };

  let on_adjust = {
    let poller = poller.clone();
    Callback::from(
      move |(cell_id, delta): (String, i64)| {
        let write = poller
          .session
          .borrow_mut()
          .adjust_cell(&cell_id, delta);
        if let Some(write) = write {
          poller
            .scheduler
            .borrow_mut()
            .dispatch(write);
          poller.flush();
          poller.redraw();
        }
      }
    )
  };

  let facts = (*frame).clone();
  let body = if facts.list_view {
    html! { <ItemList items={facts.items.clone()} /> }
  } else {
    html! {
        <BoardGrid
            grid={facts.grid.clone()}
            {on_toggle}
            {on_adjust}
        />
    }
  };

  html! {
      <div class="taskboard">
          <TabStrip tabs={facts.tabs} on_select={on_select_tab} />
          { body }
      </div>
  }
}
