//! Terminal lifecycle and the main event loop.
//!
//! The loop redraws, then waits on whichever comes first:
//!
//! 1. a terminal event (key, mouse, focus), turned into an `Action`;
//! 2. a chat reply from a spawned request task;
//! 3. progress from the peer poller.
//!
//! Effects returned by `TuiApp::handle_action` are carried out here, so
//! this is the only place that spawns tasks or owns the `Poller`.

use crate::api_client::ApiClient;
use crate::app::{Action, Effect, TuiApp};
use crate::event;
use crate::poller::{PollEvent, PollUpdate, Poller};
use crate::ui;
use anyhow::{Context, Result};
use crossterm::event::{
    DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, EventStream,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use neuromesh_core::api::MeshApi;
use neuromesh_core::config::AppConfig;
use neuromesh_core::conversation::{ChatReply, ChatTicket};
use neuromesh_core::session::Page;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_stream::StreamExt;
use tracing::{debug, info};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Runs the interactive client until the user quits.
pub async fn run(config: &AppConfig, start_page: Page) -> Result<()> {
    let api = Arc::new(ApiClient::new(config)?);
    info!(chat = api.chat_url(), peers = api.peers_url(), "starting TUI");

    let mut terminal = setup_terminal().context("failed to set up terminal")?;
    install_panic_hook();

    let result = Runner::new(api, config.poll_interval())
        .run(&mut terminal, start_page)
        .await;

    restore_terminal().context("failed to restore terminal")?;
    terminal.show_cursor()?;
    result
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(
        io::stdout(),
        DisableFocusChange,
        DisableMouseCapture,
        LeaveAlternateScreen
    )
}

/// Puts the terminal back before the default panic message is printed.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        previous(info);
    }));
}

/// Owns the channels and background tasks behind one TUI session.
struct Runner<A: MeshApi> {
    api: Arc<A>,
    poll_interval: Duration,
    chat_tx: mpsc::Sender<ChatReply>,
    chat_rx: mpsc::Receiver<ChatReply>,
    poll_tx: mpsc::Sender<PollUpdate>,
    poll_rx: mpsc::Receiver<PollUpdate>,
    visible_tx: watch::Sender<bool>,
    poller: Option<Poller>,
    /// Generation given to the most recently started poller.
    poll_generation: u64,
}

impl<A: MeshApi> Runner<A> {
    fn new(api: Arc<A>, poll_interval: Duration) -> Self {
        let (chat_tx, chat_rx) = mpsc::channel(16);
        let (poll_tx, poll_rx) = mpsc::channel(16);
        let (visible_tx, _) = watch::channel(true);
        Self {
            api,
            poll_interval,
            chat_tx,
            chat_rx,
            poll_tx,
            poll_rx,
            visible_tx,
            poller: None,
            poll_generation: 0,
        }
    }

    async fn run(mut self, terminal: &mut Tui, start_page: Page) -> Result<()> {
        let mut app = TuiApp::new(start_page);
        if start_page == Page::Peers {
            self.apply(Effect::StartPolling);
        }
        let mut events = EventStream::new();

        while !app.should_quit {
            terminal.draw(|frame| ui::layout::render(frame, &mut app))?;

            let action = tokio::select! {
                maybe_event = events.next() => match maybe_event {
                    Some(Ok(event)) => event::handle_event(&event, &app),
                    Some(Err(e)) => return Err(e).context("failed to read terminal event"),
                    None => Some(Action::Quit),
                },
                Some(reply) = self.chat_rx.recv() => Some(Action::ChatReply(reply)),
                Some(update) = self.poll_rx.recv() => self.current_poll_event(update).map(Action::Poll),
            };

            if let Some(effect) = action.and_then(|action| app.handle_action(action)) {
                self.apply(effect);
            }
        }

        info!("TUI exiting");
        Ok(())
    }

    fn apply(&mut self, effect: Effect) {
        debug!(?effect, "applying effect");
        match effect {
            Effect::Chat(ticket) => self.spawn_chat(ticket),
            Effect::StartPolling => {
                self.poll_generation += 1;
                self.poller = Some(Poller::spawn(
                    Arc::clone(&self.api),
                    self.poll_interval,
                    self.poll_generation,
                    self.visible_tx.subscribe(),
                    self.poll_tx.clone(),
                ));
            }
            Effect::StopPolling => {
                if let Some(poller) = self.poller.take() {
                    poller.stop();
                }
                // Progress already queued by the stopped poller is obsolete.
                while self.poll_rx.try_recv().is_ok() {}
            }
            Effect::RetryPoll => {
                if let Some(poller) = &self.poller {
                    poller.retry();
                }
            }
            Effect::Visibility(visible) => {
                self.visible_tx.send_replace(visible);
            }
        }
    }

    /// Unwraps `update` if it came from the running poller.
    ///
    /// A stopped poller's task can finish sending after the queue was
    /// drained; those events are dropped here.
    fn current_poll_event(&self, update: PollUpdate) -> Option<PollEvent> {
        let current = self.poller.as_ref().map(Poller::generation);
        if current == Some(update.generation) {
            Some(update.event)
        } else {
            debug!(
                generation = update.generation,
                ?current,
                "dropping event from stopped poller"
            );
            None
        }
    }

    /// Issues the request for `ticket` on a separate task.
    fn spawn_chat(&self, ticket: ChatTicket) {
        let api = Arc::clone(&self.api);
        let tx = self.chat_tx.clone();
        tokio::spawn(async move {
            let result = api.send_chat(ticket.prompt()).await;
            if tx.send(ChatReply { ticket, result }).await.is_err() {
                debug!("UI gone, dropping chat reply");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neuromesh_core::api::ApiError;
    use neuromesh_core::dashboard::FetchKind;
    use neuromesh_core::types::PeerSnapshot;

    /// Backend that echoes chat messages and reports no peers.
    struct EchoApi;

    impl MeshApi for EchoApi {
        async fn send_chat(&self, message: &str) -> Result<String, ApiError> {
            Ok(format!("echo: {message}"))
        }

        async fn peer_conversations(&self) -> Result<PeerSnapshot, ApiError> {
            Ok(PeerSnapshot::new())
        }
    }

    fn runner() -> Runner<EchoApi> {
        Runner::new(Arc::new(EchoApi), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn chat_effect_delivers_reply_to_loop() {
        let mut runner = runner();
        let mut app = TuiApp::new(Page::Chat);
        for ch in "hi".chars() {
            app.handle_action(Action::InputChar(ch));
        }

        let effect = app.handle_action(Action::SendMessage).unwrap();
        runner.apply(effect);
        let reply = runner.chat_rx.recv().await.unwrap();
        app.handle_action(Action::ChatReply(reply));

        let messages = app.session.conversation.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "echo: hi");
    }

    #[tokio::test(start_paused = true)]
    async fn stop_polling_discards_queued_progress() {
        let mut runner = runner();
        runner.apply(Effect::StartPolling);

        let first = runner.poll_rx.recv().await.unwrap();
        assert!(matches!(first.event, PollEvent::Started(FetchKind::Initial)));

        runner.apply(Effect::StopPolling);
        assert!(runner.poller.is_none());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(runner.poll_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn events_from_a_replaced_poller_are_ignored() {
        let mut runner = runner();
        runner.apply(Effect::StartPolling);
        let old = runner.poll_rx.recv().await.unwrap();
        assert_eq!(old.generation, 1);

        runner.apply(Effect::StopPolling);
        assert!(runner.current_poll_event(old.clone()).is_none());

        runner.apply(Effect::StartPolling);
        assert!(runner.current_poll_event(old).is_none());

        let fresh = runner.poll_rx.recv().await.unwrap();
        assert_eq!(fresh.generation, 2);
        assert!(matches!(
            runner.current_poll_event(fresh),
            Some(PollEvent::Started(FetchKind::Initial))
        ));
    }

    #[tokio::test]
    async fn visibility_reaches_new_pollers() {
        let mut runner = runner();
        runner.apply(Effect::Visibility(false));
        assert!(!*runner.visible_tx.subscribe().borrow());
    }
}
