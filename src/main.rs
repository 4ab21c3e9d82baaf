use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::Config;
use crate::tui::EventHandler;

mod app;
mod client;
mod config;
mod handler;
#[cfg(test)]
mod test_server;
mod tui;
mod ui;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::load().unwrap_or_else(|err| {
        warn!(error = %err, "could not read config file, using defaults");
        Config::new()
    });
    info!(
        version = env!("CARGO_PKG_VERSION"),
        endpoint = config.endpoint(),
        "invictus starting"
    );

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut app = App::new(&config);
    app.spawn_health_check();

    let result = run(&mut terminal, &mut app).await;

    tui::restore()?;
    info!("invictus exiting");

    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event);

        // Settled background work surfaces within one tick
        app.poll_turn().await;
        app.poll_health().await;
    }

    Ok(())
}

/// Route logs to a file; the terminal UI owns stderr.
fn init_tracing() {
    let Some(log_dir) = dirs::config_dir().map(|dir| dir.join("invictus")) else {
        return;
    };
    if std::fs::create_dir_all(&log_dir).is_err() {
        return;
    }
    let Ok(log_file) = std::fs::File::create(log_dir.join("invictus.log")) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .try_init();
}
