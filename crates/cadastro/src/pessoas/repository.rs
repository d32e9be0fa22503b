use chrono::NaiveDate;

use super::domain::{DailyCount, Pessoa, PessoaFields, PessoaId};

/// Storage abstraction so the service module can be exercised in isolation.
///
/// Implementations must enforce `cpf` uniqueness atomically (a unique index,
/// not a check-then-insert) and report violations as
/// [`RepositoryError::DuplicateCpf`].
pub trait PessoaRepository: Send + Sync {
    fn insert(
        &self,
        fields: PessoaFields,
        registered_on: NaiveDate,
    ) -> Result<Pessoa, RepositoryError>;
    fn update(&self, id: PessoaId, fields: PessoaFields) -> Result<Pessoa, RepositoryError>;
    fn delete(&self, id: PessoaId) -> Result<(), RepositoryError>;
    fn fetch(&self, id: PessoaId) -> Result<Option<Pessoa>, RepositoryError>;
    /// All records in insertion order.
    fn list(&self) -> Result<Vec<Pessoa>, RepositoryError>;
    /// Registrations per `data_registro`, ascending by date, no gap filling.
    fn daily_counts(&self) -> Result<Vec<DailyCount>, RepositoryError>;
    fn cpf_taken(&self, cpf: &str, excluding: Option<PessoaId>) -> Result<bool, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("a record with this cpf already exists")]
    DuplicateCpf,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    Schema {
        db_version: u32,
        latest_supported: u32,
    },
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}
