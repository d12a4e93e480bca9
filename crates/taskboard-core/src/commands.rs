use anyhow::Context;
use taskboard_shared::StateWrite;
use tracing::{info, warn};

use crate::board::ALL_TAB;
use crate::cli::Command;
use crate::config::Config;
use crate::http::HttpTransport;
use crate::reconcile::{INITIAL_TAB, Session};
use crate::render::Renderer;
use crate::state::CellValue;
use crate::sync::{self, SyncScheduler, Transport};

#[tracing::instrument(skip_all, fields(command = ?command))]
pub async fn dispatch(cfg: &Config, command: Command) -> anyhow::Result<()> {
    let transport = HttpTransport::new(&cfg.server_url()?, cfg.http_timeout()?)?;
    let renderer = Renderer::new(cfg)?;
    info!(server = transport.base_url(), "using taskboard server");

    match command {
        Command::Watch { tab } => {
            let mut scheduler = SyncScheduler::new(cfg.intervals()?);
            watch(&transport, &renderer, &mut scheduler, tab.as_deref()).await
        }
        Command::Show { tab } => {
            let session = fetch_once(&transport, tab.as_deref().unwrap_or(ALL_TAB)).await?;
            renderer.print_view(&session.facts())
        }
        Command::List => {
            let session = fetch_once(&transport, ALL_TAB).await?;
            renderer.print_items(&session.view().active_items())
        }
        Command::Toggle { tab, cell } => {
            let mut session = fetch_once(&transport, &tab).await?;
            let write = on_tab(&session, &tab).then(|| session.toggle_cell(&cell)).flatten();
            send_and_report(&transport, &session, write).await
        }
        Command::Adjust { tab, cell, delta } => {
            let mut session = fetch_once(&transport, &tab).await?;
            let write = on_tab(&session, &tab)
                .then(|| session.adjust_cell(&cell, delta))
                .flatten();
            send_and_report(&transport, &session, write).await
        }
    }
}

async fn watch(
    transport: &HttpTransport,
    renderer: &Renderer,
    scheduler: &mut SyncScheduler,
    tab: Option<&str>,
) -> anyhow::Result<()> {
    let mut session = Session::with_tab(tab.unwrap_or(INITIAL_TAB));
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    let mut last_frame = None;
    sync::drive(
        transport,
        &mut session,
        scheduler,
        |session| {
            let facts = session.facts();
            if last_frame.as_ref() == Some(&facts) {
                return;
            }
            if let Err(err) = renderer.print_view(&facts) {
                warn!(error = %err, "failed to draw board");
            }
            println!();
            last_frame = Some(facts);
        },
        shutdown,
    )
    .await;
    Ok(())
}

/// Board then state, applied the same way the polling loop applies them.
async fn fetch_once<T: Transport>(transport: &T, tab: &str) -> anyhow::Result<Session> {
    let board = transport.fetch_board().await.context("failed to fetch board")?;
    let state = transport.fetch_state().await.context("failed to fetch state")?;

    let mut session = Session::with_tab(tab);
    session.apply_board_dto(&board);
    session.apply_state_dto(&state);
    Ok(session)
}

fn on_tab(session: &Session, tab: &str) -> bool {
    if session.current_tab() == tab {
        return true;
    }
    warn!(tab, "tab is not on the board; nothing to change");
    false
}

async fn send_and_report<T: Transport>(
    transport: &T,
    session: &Session,
    write: Option<StateWrite>,
) -> anyhow::Result<()> {
    let Some(write) = write else {
        info!("no cell changed");
        return Ok(());
    };

    if let Err(err) = transport.send_state(&write).await {
        warn!(
            tab = %write.tab_id,
            cell = %write.cell_id,
            error = %err,
            "state write dropped"
        );
    }

    let value = session
        .board()
        .cell(&write.cell_id)
        .map(|cell| session.store().get(&write.tab_id, cell))
        .unwrap_or(CellValue::Flag(false));
    match value {
        CellValue::Flag(on) => println!("{} {}", write.cell_id, if on { "on" } else { "off" }),
        CellValue::Count(n) => println!("{} {n}", write.cell_id),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use anyhow::anyhow;
    use taskboard_shared::{BoardDto, StateDto, WireValue};

    use super::*;

    /// Accepts reads but refuses every write.
    struct ReadOnlyServer {
        attempts: Cell<u32>,
    }

    impl Transport for ReadOnlyServer {
        async fn fetch_board(&self) -> anyhow::Result<BoardDto> {
            Ok(BoardDto::default())
        }

        async fn fetch_state(&self) -> anyhow::Result<StateDto> {
            Ok(StateDto::new())
        }

        async fn send_state(&self, _write: &StateWrite) -> anyhow::Result<()> {
            self.attempts.set(self.attempts.get() + 1);
            Err(anyhow!("503 service unavailable"))
        }
    }

    #[tokio::test]
    async fn failed_write_is_sent_once_and_not_fatal() {
        let server = ReadOnlyServer {
            attempts: Cell::new(0),
        };
        let session = Session::new();
        let write = StateWrite::new("1", "x", WireValue::Flag(true));

        send_and_report(&server, &session, Some(write)).await.unwrap();
        assert_eq!(server.attempts.get(), 1);
    }

    #[tokio::test]
    async fn nothing_changed_sends_nothing() {
        let server = ReadOnlyServer {
            attempts: Cell::new(0),
        };
        send_and_report(&server, &Session::new(), None).await.unwrap();
        assert_eq!(server.attempts.get(), 0);
    }
}
