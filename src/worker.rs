// ============================================================================
// Background Worker Thread
// ============================================================================
// CONCEPT RUST : Background async worker avec channels
// - Thread séparé qui possède un runtime tokio
// - Reçoit des AppCommand via un channel (command_rx)
// - Envoie des AppResult via un autre channel (result_tx)
// - L'UI ne bloque jamais pendant un chargement
//
// Un seul chargement en vol : une nouvelle commande annule la précédente
// (JoinHandle::abort). Chaque résultat porte la génération de sa requête,
// l'UI ignore les générations périmées.
// ============================================================================

use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::api::{DataSource, FetchRequest};
use crate::models::Commodity;

/// Commandes envoyées au worker thread
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Charger les matières premières pour une plage / catégorie
    LoadCommodities {
        request: FetchRequest,
        generation: u64,
    },

    /// Arrêter le worker (annule le chargement en cours)
    Shutdown,
}

/// Résultats renvoyés par le worker thread
#[derive(Debug)]
pub enum AppResult {
    CommoditiesLoaded {
        generation: u64,
        request: FetchRequest,
        commodities: Vec<Commodity>,
    },

    LoadFailed {
        generation: u64,
        request: FetchRequest,
        error: String,
    },
}

impl AppResult {
    pub fn generation(&self) -> u64 {
        match self {
            AppResult::CommoditiesLoaded { generation, .. } => *generation,
            AppResult::LoadFailed { generation, .. } => *generation,
        }
    }
}

/// Lance le worker thread
///
/// CONCEPT RUST : Thread + async runtime
/// - Le runtime est créé AVANT le thread : une erreur remonte avec ?
/// - std::thread::spawn() déplace (move) runtime, source et channels
/// - Les chargements sont des tâches tokio, annulables
pub fn spawn_worker(
    source: DataSource,
    command_rx: mpsc::Receiver<AppCommand>,
    result_tx: mpsc::Sender<AppResult>,
) -> Result<thread::JoinHandle<()>> {
    let runtime = Runtime::new().context("Échec de la création du runtime tokio")?;

    let handle = thread::Builder::new()
        .name("benchwatch-worker".to_string())
        .spawn(move || run_worker(runtime, source, command_rx, result_tx))
        .context("Échec du lancement du worker thread")?;

    Ok(handle)
}

/// Boucle de traitement des commandes
fn run_worker(
    runtime: Runtime,
    source: DataSource,
    command_rx: mpsc::Receiver<AppCommand>,
    result_tx: mpsc::Sender<AppResult>,
) {
    info!(source = %source.describe(), "Worker started");
    let mut in_flight: Option<JoinHandle<()>> = None;

    // CONCEPT : recv() bloque le worker, pas l'UI
    // - Err(_) : tous les Sender ont été drop, on quitte
    while let Ok(command) = command_rx.recv() {
        debug!(?command, "Worker received command");

        match command {
            AppCommand::LoadCommodities {
                request,
                generation,
            } => {
                if let Some(previous) = in_flight.take() {
                    if !previous.is_finished() {
                        info!(generation, "Aborting previous fetch");
                    }
                    previous.abort();
                }

                let source = source.clone();
                let result_tx = result_tx.clone();
                in_flight = Some(runtime.spawn(async move {
                    let result = match source.fetch_commodities(&request).await {
                        Ok(commodities) => {
                            info!(generation, range = %request.range, count = commodities.len(), "Commodities loaded");
                            AppResult::CommoditiesLoaded {
                                generation,
                                request,
                                commodities,
                            }
                        }
                        Err(e) => {
                            error!(generation, range = %request.range, error = ?e, "Failed to load commodities");
                            AppResult::LoadFailed {
                                generation,
                                request,
                                error: format!("{:#}", e),
                            }
                        }
                    };
                    let _ = result_tx.send(result);
                }));
            }

            AppCommand::Shutdown => break,
        }
    }

    if let Some(task) = in_flight.take() {
        task.abort();
    }
    info!("Worker thread exiting");
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LocalDataDir;
    use crate::models::RangeToken;
    use std::time::Duration;

    fn data_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "benchwatch-worker-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("gold.json"),
            r#"{"name": "Gold", "price": 2400.0, "category": "precious",
                "history": [{"date": "2024-01-01", "price": 2300.0},
                            {"date": "2024-03-01", "price": 2400.0}]}"#,
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_latest_generation_always_answers() {
        let source = DataSource::Local(LocalDataDir::new(data_dir("latest"), false));
        let (command_tx, command_rx) = mpsc::channel();
        let (result_tx, result_rx) = mpsc::channel();
        let handle = spawn_worker(source, command_rx, result_tx).unwrap();

        for (generation, range) in [(1, RangeToken::All), (2, RangeToken::OneWeek)] {
            command_tx
                .send(AppCommand::LoadCommodities {
                    request: FetchRequest::new(range, "all"),
                    generation,
                })
                .unwrap();
        }

        // La génération 1 a pu être annulée, la 2 doit arriver
        let mut last = None;
        while let Ok(result) = result_rx.recv_timeout(Duration::from_secs(5)) {
            let generation = result.generation();
            last = Some(result);
            if generation == 2 {
                break;
            }
        }

        match last {
            Some(AppResult::CommoditiesLoaded {
                generation,
                commodities,
                ..
            }) => {
                assert_eq!(generation, 2);
                assert_eq!(commodities.len(), 1);
                assert_eq!(commodities[0].id, "gold");
                assert_eq!(commodities[0].history.len(), 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }

        command_tx.send(AppCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }
}
