use std::error::Error;
use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    Terminal,
};

use tbscope::app::{InputTarget, View};
use tbscope::session::SessionState;
use tbscope::{logging, ui::render_ui, App};

fn main() -> Result<(), Box<dyn Error>> {
    human_panic::setup_panic!();
    logging::set_log_level();
    let _log_file = logging::init_logging()?;
    logging::log_system_info();

    let session = SessionState::load(SessionState::default_path()?);
    let mut app = App::new(session);
    if !app.start_loading_if_cached() {
        app.start_threaded_loading();
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    loop {
        app.check_loading_progress();
        terminal.draw(|f| render_ui(f, &app))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if app.input_target != InputTarget::None {
                match key.code {
                    KeyCode::Enter => app.submit_input(),
                    KeyCode::Esc => app.cancel_input(),
                    KeyCode::Backspace => app.on_backspace(),
                    KeyCode::Char(c) => app.on_key(c),
                    _ => {}
                }
                continue;
            }

            match key.code {
                KeyCode::Char('q') => break,
                KeyCode::Tab => app.next_view(),
                KeyCode::BackTab => app.prev_view(),
                KeyCode::Char('p') => app.begin_input(InputTarget::PrimaryPath),
                KeyCode::Char('f') => app.begin_input(InputTarget::ReferencePath),
                KeyCode::Char('t') => app.begin_input(InputTarget::TablePath),
                KeyCode::Char('e') => app.export_current_view(),
                KeyCode::Char('d') => app.clear_primary_file(),
                KeyCode::Char('r') => match app.view {
                    View::Checker => app.run_checker(),
                    View::Mutations => app.run_mutation_finder(),
                    View::OrganImpact => app.run_organ_impact(),
                    View::Resistance => app.run_resistance(),
                    View::Overview => {}
                },
                _ => {}
            }
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    logging::log_shutdown();
    Ok(())
}
