use cadastro::error::AppError;
use cadastro::pessoas::{PessoaService, SqlitePessoaRepository};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Open (and migrate) the SQLite store and wrap it in the pessoa service.
pub(crate) fn open_service(
    database: &Path,
) -> Result<Arc<PessoaService<SqlitePessoaRepository>>, AppError> {
    let repository = SqlitePessoaRepository::open(database)?;
    Ok(Arc::new(PessoaService::new(Arc::new(repository))))
}
