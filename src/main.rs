// ============================================================================
// Benchwatch - Tableau de bord des prix des matières premières
// ============================================================================
// Programme TUI : tableau / grille des matières premières, graphique de
// détail, réglages persistés, thèmes.
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop : boucle qui gère résultats, rendering, événements, tick
// 3. Async dans sync : le worker possède son runtime tokio
// 4. Channels : l'UI ne bloque jamais pendant un chargement
// ============================================================================

use std::io;
use std::sync::mpsc;

use anyhow::{Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, error, info, warn};

use benchwatch::api::DataSource;
use benchwatch::app::App;
use benchwatch::config::AppConfig;
use benchwatch::settings::SettingsStore;
use benchwatch::ui::modal::Adjust;
use benchwatch::ui::{events, render, Event, EventHandler};
use benchwatch::worker::{spawn_worker, AppCommand, AppResult};

// ============================================================================
// Initialisation du logging
// ============================================================================
// CONCEPT : Logging dans une app TUI
// - Les println! ne fonctionnent pas une fois le TUI lancé
// - On log vers un fichier à la place, avec rotation quotidienne
// ============================================================================

/// Initialise le système de logging vers fichier
///
/// # Utilisation
/// ```bash
/// tail -f logs/benchwatch.log
/// RUST_LOG=benchwatch=trace cargo run
/// ```
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = std::path::PathBuf::from("./logs");
    std::fs::create_dir_all(&log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "benchwatch.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "benchwatch=debug,info".into()),
        )
        .init();

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    // Si l'init échoue, on affiche l'erreur et on continue quand même
    init_logging().unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    info!(version = env!("CARGO_PKG_VERSION"), "Benchwatch starting up");

    let config = AppConfig::load();

    // Pas de répertoire de données : les réglages vivent en mémoire
    let store = match config.resolved_settings_path() {
        Some(path) => SettingsStore::open(&path),
        None => {
            warn!("No data directory available, settings kept in memory");
            SettingsStore::in_memory()
        }
    };

    let source = DataSource::from_config(&config)?;
    let mut app = App::new(&config, store);

    // CONCEPT RUST : mpsc channels
    // - command_tx/rx : commandes vers le worker
    // - result_tx/rx : résultats du worker
    let (command_tx, command_rx) = mpsc::channel::<AppCommand>();
    let (result_tx, result_rx) = mpsc::channel::<AppResult>();

    info!(source = %source.describe(), "Spawning background worker thread");
    let worker = spawn_worker(source, command_rx, result_tx)?;

    // Premier chargement avant même le premier rendu
    send(&command_tx, app.request_load());

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    let events = EventHandler::new();

    info!("Starting event loop");
    let result = run(&mut terminal, &mut app, &events, &command_tx, &result_rx);

    // Restaure le terminal (même en cas d'erreur)
    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    send(&command_tx, AppCommand::Shutdown);
    if worker.join().is_err() {
        error!("Worker thread panicked");
    }

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

/// Envoie une commande au worker (un worker arrêté est seulement journalisé)
fn send(command_tx: &mpsc::Sender<AppCommand>, command: AppCommand) {
    if let Err(e) = command_tx.send(command) {
        error!(command = ?e.0, "Worker is gone, command dropped");
    }
}

// ============================================================================
// Event Loop Principal
// ============================================================================
// À chaque itération :
//   0. Résultats du worker (appliqués ou ignorés si périmés)
//   1. Rendu
//   2. Événements clavier
//   3. Tick (resynchronisation des réglages)
// ============================================================================

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
    command_tx: &mpsc::Sender<AppCommand>,
    result_rx: &mpsc::Receiver<AppResult>,
) -> Result<()> {
    let mut worker_alive = true;

    while app.is_running() {
        // ========================================
        // 0. RÉSULTATS
        // ========================================
        // CONCEPT : try_recv ne bloque pas ; on vide tout le channel
        loop {
            match result_rx.try_recv() {
                Ok(result) => {
                    app.apply_result(result);
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    if worker_alive {
                        error!("Worker thread disconnected!");
                        worker_alive = false;
                    }
                    break;
                }
            }
        }

        // ========================================
        // 1. RENDER
        // ========================================
        terminal.draw(|frame| render(frame, app))?;

        // ========================================
        // 2. INPUT
        // ========================================
        match events.next() {
            Ok(event) => handle_event(app, event, command_tx),
            Err(e) => warn!(error = ?e, "Failed to read terminal event"),
        }

        // ========================================
        // 3. TICK
        // ========================================
        app.tick();
    }

    Ok(())
}

// ============================================================================
// Gestion des événements
// ============================================================================

/// Modale ouverte : elle capture toutes les touches (focus trap)
fn handle_modal_event(app: &mut App, event: &Event) {
    if events::is_escape_event(event) {
        app.close_settings();
    } else if events::is_tab_event(event) || events::is_down_event(event) {
        app.modal.focus_next();
    } else if events::is_backtab_event(event) || events::is_up_event(event) {
        app.modal.focus_previous();
    } else if events::is_enter_event(event) || events::is_space_event(event) {
        app.adjust_focused(Adjust::Activate);
    } else if events::is_right_event(event) {
        app.adjust_focused(Adjust::Increase);
    } else if events::is_left_event(event) {
        app.adjust_focused(Adjust::Decrease);
    }
}

fn handle_event(app: &mut App, event: Event, command_tx: &mpsc::Sender<AppCommand>) {
    if !matches!(event, Event::Key(_)) {
        return;
    }

    if app.modal.is_open() {
        handle_modal_event(app, &event);
        return;
    }

    // CONCEPT : Confirmation de quit two-step
    if events::is_quit_event(&event) {
        if app.is_awaiting_quit_confirmation() {
            info!("User confirmed quit");
            app.quit();
        } else {
            info!("User requested quit (awaiting confirmation)");
            app.request_quit();
        }
        return;
    }
    if app.is_awaiting_quit_confirmation() && events::is_confirm_event(&event) {
        info!("User confirmed quit");
        app.quit();
        return;
    }

    // Toute autre touche annule la confirmation et efface le message
    app.cancel_quit();
    app.status = None;

    // Touches communes aux deux écrans
    if let Some(range) = events::range_shortcut(&event) {
        if let Some(command) = app.set_range(range) {
            send(command_tx, command);
        }
        return;
    }
    if events::is_next_range_event(&event) {
        if let Some(command) = app.next_range() {
            send(command_tx, command);
        }
        return;
    }
    if events::is_previous_range_event(&event) {
        if let Some(command) = app.previous_range() {
            send(command_tx, command);
        }
        return;
    }
    if events::is_settings_event(&event) {
        app.open_settings();
        return;
    }
    if events::is_theme_event(&event) {
        app.cycle_theme();
        return;
    }
    if events::is_market_theme_event(&event) {
        app.toggle_market_theme();
        return;
    }
    if events::is_retry_event(&event) {
        info!("User requested reload");
        send(command_tx, app.request_load());
        return;
    }

    if app.is_on_detail() {
        if events::is_escape_event(&event) || events::is_space_event(&event) {
            debug!("User returned to dashboard");
            app.show_dashboard();
        }
        return;
    }

    // Dashboard
    if events::is_up_event(&event) {
        app.navigate_up();
    } else if events::is_down_event(&event) {
        app.navigate_down();
    } else if events::is_left_event(&event) {
        app.navigate_left();
    } else if events::is_right_event(&event) {
        app.navigate_right();
    } else if events::is_enter_event(&event) {
        if let Some(commodity) = app.selected_commodity() {
            info!(commodity = %commodity.id, "User opened detail view");
        }
        app.show_detail();
    } else if events::is_view_toggle_event(&event) {
        app.toggle_view_mode();
    } else if events::is_category_event(&event) {
        send(command_tx, app.cycle_category());
    }
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("Échec de l'activation du raw mode")?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("Échec de l'initialisation du terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}
