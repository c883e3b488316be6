use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber;

use cafecito_honeypot::{
    api::{ApiRoutes, ApiServer, TokenService},
    detector::SecurityMonitor,
    logging::{AttackLogger, SecurityStatsReporter},
    storage::SqliteStorage,
    ServerConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    print_banner();

    let config = ServerConfig::from_env();
    info!("Iniciando Cafecito - backend con honeypot de seguridad");

    // Initialize system components
    let storage = initialize_storage(&config).await?;
    let logger = AttackLogger::new(&config.log_dir);
    let monitor = Arc::new(SecurityMonitor::new(
        logger.clone(),
        config.rate_window_secs,
        config.rate_threshold,
    ));
    let tokens = Arc::new(TokenService::new(&config.jwt_secret, config.token_ttl_secs));
    let reporter = Arc::new(SecurityStatsReporter::new(&config.log_dir));

    info!("Monitor de seguridad activo");
    info!("   - Detección SQL Injection: Activa");
    info!("   - Detección XSS: Activa");
    info!("   - Detección Path Traversal: Activa");
    info!("   - Ventana de tasa: {} s / umbral {}", config.rate_window_secs, config.rate_threshold);

    // Start HTTP server in background
    let routes = ApiRoutes::new(storage, monitor, tokens, reporter);
    let server = ApiServer::new(routes, config.port);
    tokio::spawn(server.serve());

    print_system_info(config.port);

    // Wait for shutdown signal
    wait_for_shutdown_signal().await;

    info!("Apagando Cafecito...");
    // Drena lo que quede encolado en los logs de ataque antes de salir.
    logger.flush().await;
    Ok(())
}

/// Configure logging system
fn setup_logging() {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(false)
        .init();
}

/// Display system banner
fn print_banner() {
    println!("\n{}", "=".repeat(60));
    println!("    Cafecito - Apoya a tus creadores favoritos");
    println!("    Honeypot de seguridad activo - Logging habilitado");
    println!("{}", "=".repeat(60));
    println!();
}

/// Initialize storage layer
async fn initialize_storage(config: &ServerConfig) -> Result<Arc<SqliteStorage>> {
    info!("Inicializando almacenamiento...");

    let storage = SqliteStorage::new(&config.database_url)
        .await
        .map_err(|e| {
            error!("Error inicializando el almacenamiento: {}", e);
            e
        })?;

    info!("Almacenamiento inicializado correctamente");
    Ok(Arc::new(storage))
}

/// Display system information
fn print_system_info(port: u16) {
    println!("\nCafecito iniciado");
    println!("{}", "-".repeat(50));

    println!("API: http://localhost:{}", port);

    println!("Endpoints:");
    println!("   - Creadores: http://localhost:{}/api/creators", port);
    println!("   - Login: http://localhost:{}/api/login", port);
    println!("   - Estadísticas: http://localhost:{}/api/stats", port);
    println!(
        "   - Estadísticas de seguridad: http://localhost:{}/api/security/stats",
        port
    );

    println!("\nControl:");
    println!("   Ctrl+C para detener el servidor");

    println!("{}", "-".repeat(50));
}

/// Wait for system shutdown signal
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Error instalando el handler de Ctrl+C");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Error instalando el handler de TERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Recibida señal Ctrl+C");
        },
        _ = terminate => {
            info!("Recibida señal TERM");
        },
    }
}
