use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::*;
use tracing::{info, warn};

use crate::client::SeedClient;
use crate::detail::{DetailPhase, SeedDetailView};
use crate::route::RouteParams;
use crate::store::{BrowserStore, SeedDispatch, SeedReader};
use crate::ui::{draw_ui, UiState};

const DRAW_INTERVAL: Duration = Duration::from_millis(100);
const INPUT_POLL: Duration = Duration::from_millis(50);

/// Terminal-independent state of one browsing session.
pub struct BrowserSession<C> {
    store: BrowserStore<C>,
    view: SeedDetailView,
    ui_state: UiState,
}

impl<C: SeedClient> BrowserSession<C> {
    pub fn new(client: C, params: RouteParams) -> Self {
        Self {
            store: BrowserStore::new(client),
            view: SeedDetailView::new(params),
            ui_state: UiState::default(),
        }
    }

    /// Request the lookups and mount the view.
    pub fn start(&mut self) {
        self.store.request_reference_data();
        self.view.on_mount(&mut self.store);
    }

    pub fn store(&self) -> &BrowserStore<C> {
        &self.store
    }

    pub fn view(&self) -> &SeedDetailView {
        &self.view
    }

    pub fn ui_state(&self) -> &UiState {
        &self.ui_state
    }

    pub fn push_log(&mut self, line: String) {
        self.ui_state.push_log(line);
    }

    /// Fold completed fetches into the store and let the view observe them.
    pub fn tick(&mut self) {
        if self.store.poll() {
            self.view.on_update(&self.store);
        }
        if let Some(ack) = self.store.take_acknowledged().last() {
            let mut status = format!(
                "reported {}@{} ({} report(s))",
                ack.seed_number, ack.game_version, ack.report_count
            );
            if ack.flagged {
                status.push_str(", flagged for review");
            }
            self.ui_state.set_status(status);
        }
        if self.view.is_loading() {
            self.ui_state.advance_spinner();
        }
    }

    /// Apply one key press. Returns false when the session should end.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.ui_state.show_mod_info {
            match code {
                KeyCode::Char('q') => return false,
                KeyCode::Char('?') | KeyCode::Esc => self.ui_state.show_mod_info = false,
                _ => {}
            }
            return true;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('?') => self.ui_state.show_mod_info = true,
            KeyCode::Down | KeyCode::Char('j') => self.view.select_next(self.store.snapshot()),
            KeyCode::Up | KeyCode::Char('k') => self.view.select_previous(self.store.snapshot()),
            KeyCode::Enter | KeyCode::Char(' ') => self.view.toggle_selected(self.store.snapshot()),
            KeyCode::Char('r') => self.report_current(),
            KeyCode::Char('R') => {
                if self.view.retry(&mut self.store) {
                    info!(route = %self.view.params().path(), "Retrying failed fetch");
                    self.ui_state.set_status("retrying");
                }
            }
            _ => {}
        }
        true
    }

    fn report_current(&mut self) {
        if self.view.phase() != &DetailPhase::Ready {
            return;
        }
        let Some(seed) = self.store.snapshot().seed.as_ref() else {
            return;
        };
        let (seed_number, game_version) = (seed.seed_number, seed.game_version);
        self.view
            .report_invalid(seed_number, game_version, &mut self.store);
        self.ui_state
            .set_status(format!("reporting {seed_number}@{game_version}"));
    }

    pub fn shutdown(&mut self) {
        self.store.cancel_pending();
    }
}

pub struct SeedBrowserApp<C> {
    terminal: Terminal<CrosstermBackend<std::io::Stdout>>,
    session: BrowserSession<C>,
    log_receiver: Receiver<String>,
}

impl<C: SeedClient> SeedBrowserApp<C> {
    pub fn new(session: BrowserSession<C>, log_receiver: Receiver<String>) -> Result<Self> {
        let stdout = std::io::stdout();
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        crossterm::terminal::enable_raw_mode()?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(Self {
            terminal,
            session,
            log_receiver,
        })
    }

    pub fn run(mut self) -> Result<()> {
        self.session.start();
        let mut last_draw = Instant::now()
            .checked_sub(DRAW_INTERVAL)
            .unwrap_or_else(Instant::now);

        let outcome: Result<()> = loop {
            while let Ok(line) = self.log_receiver.try_recv() {
                self.session.push_log(line);
            }

            if last_draw.elapsed() >= DRAW_INTERVAL {
                self.session.tick();
                let session = &self.session;
                if let Err(err) = self.terminal.draw(|frame| {
                    draw_ui(
                        frame,
                        session.ui_state(),
                        session.view(),
                        session.store().snapshot(),
                    )
                }) {
                    break Err(err.into());
                }
                last_draw = Instant::now();
            }

            match event::poll(INPUT_POLL) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        if !self.session.handle_key(key.code) {
                            break Ok(());
                        }
                    }
                    Ok(_) => {}
                    Err(err) => break Err(err.into()),
                },
                Ok(false) => {}
                Err(err) => break Err(err.into()),
            }
        };

        self.session.shutdown();
        if let Err(err) = self.restore_terminal() {
            warn!("Failed to restore terminal: {}", err);
        }
        outcome
    }

    fn restore_terminal(&mut self) -> Result<()> {
        self.terminal.clear()?;
        self.terminal.show_cursor()?;
        crossterm::terminal::disable_raw_mode()?;
        Ok(())
    }
}
