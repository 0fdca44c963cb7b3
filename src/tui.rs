//! Terminal setup and the interactive event loop.

use crate::error::Result;
use crate::session::{render, Controller, Event, Services};
use crossterm::{
    event::{self, Event as TermEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

/// How long to wait for a key before handling background events.
const TICK: Duration = Duration::from_millis(100);

/// Background events buffered between ticks.
const EVENT_QUEUE_CAPACITY: usize = 256;

type Term = Terminal<CrosstermBackend<Stdout>>;

fn init_terminal() -> io::Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal(terminal: &mut Term) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the interactive session until the user quits.
pub fn run(services: Services) -> Result<()> {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = init_terminal()?;
    let (tx, rx) = mpsc::sync_channel(EVENT_QUEUE_CAPACITY);
    let mut controller = Controller::new(services, tx);
    controller.start();
    tracing::info!(state = %controller.state(), "session started");

    let result = event_loop(&mut terminal, &mut controller, &rx);

    restore_terminal(&mut terminal)?;
    result
}

fn event_loop(terminal: &mut Term, controller: &mut Controller, rx: &Receiver<Event>) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, controller))?;

        if event::poll(TICK)? {
            if let TermEvent::Key(key) = event::read()? {
                controller.handle_event(Event::Key(key));
            }
        } else {
            controller.handle_event(Event::Tick);
        }

        while let Ok(event) = rx.try_recv() {
            controller.handle_event(event);
        }

        if controller.should_quit() {
            return Ok(());
        }
    }
}
