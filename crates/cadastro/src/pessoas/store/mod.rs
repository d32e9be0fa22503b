//! SQLite-backed [`PessoaRepository`].

pub mod migrations;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::domain::{DailyCount, Pessoa, PessoaFields, PessoaId, Sexo};
use super::repository::{PessoaRepository, RepositoryError};

const PESSOA_SELECT_SQL: &str = "SELECT
    id,
    nome,
    data_nascimento,
    sexo,
    cpf,
    email,
    celular,
    endereco,
    bairro,
    cidade,
    estado,
    data_registro
FROM pessoas";

/// Person store over a single SQLite connection.
///
/// Statements are serialized through the connection mutex; each one runs
/// with SQLite's default statement-level atomicity.
pub struct SqlitePessoaRepository {
    conn: Mutex<Connection>,
}

impl SqlitePessoaRepository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(unavailable)?;
        let repository = Self::bootstrap(conn)?;
        info!(path = %path.display(), "pessoa store opened");
        Ok(repository)
    }

    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Self::bootstrap(conn)
    }

    fn bootstrap(mut conn: Connection) -> Result<Self, RepositoryError> {
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(unavailable)?;
        migrations::apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|_| RepositoryError::Unavailable("connection mutex poisoned".to_string()))
    }
}

impl PessoaRepository for SqlitePessoaRepository {
    fn insert(
        &self,
        fields: PessoaFields,
        registered_on: NaiveDate,
    ) -> Result<Pessoa, RepositoryError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO pessoas (
                nome,
                data_nascimento,
                sexo,
                cpf,
                email,
                celular,
                endereco,
                bairro,
                cidade,
                estado,
                data_registro
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                fields.nome,
                fields.data_nascimento,
                fields.sexo.code(),
                fields.cpf,
                fields.email,
                fields.celular,
                fields.endereco,
                fields.bairro,
                fields.cidade,
                fields.estado,
                registered_on,
            ],
        )
        .map_err(map_write_error)?;

        let id = PessoaId(conn.last_insert_rowid());
        Ok(Pessoa::from_fields(id, fields, registered_on))
    }

    fn update(&self, id: PessoaId, fields: PessoaFields) -> Result<Pessoa, RepositoryError> {
        let conn = self.connection()?;
        let changed = conn
            .execute(
                "UPDATE pessoas
                 SET
                    nome = ?1,
                    data_nascimento = ?2,
                    sexo = ?3,
                    cpf = ?4,
                    email = ?5,
                    celular = ?6,
                    endereco = ?7,
                    bairro = ?8,
                    cidade = ?9,
                    estado = ?10
                 WHERE id = ?11;",
                params![
                    fields.nome,
                    fields.data_nascimento,
                    fields.sexo.code(),
                    fields.cpf,
                    fields.email,
                    fields.celular,
                    fields.endereco,
                    fields.bairro,
                    fields.cidade,
                    fields.estado,
                    id.0,
                ],
            )
            .map_err(map_write_error)?;

        if changed == 0 {
            return Err(RepositoryError::NotFound);
        }

        fetch_one(&conn, id)?.ok_or(RepositoryError::NotFound)
    }

    fn delete(&self, id: PessoaId) -> Result<(), RepositoryError> {
        let conn = self.connection()?;
        let changed = conn
            .execute("DELETE FROM pessoas WHERE id = ?1;", params![id.0])
            .map_err(unavailable)?;
        if changed == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn fetch(&self, id: PessoaId) -> Result<Option<Pessoa>, RepositoryError> {
        let conn = self.connection()?;
        fetch_one(&conn, id)
    }

    fn list(&self) -> Result<Vec<Pessoa>, RepositoryError> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!("{PESSOA_SELECT_SQL} ORDER BY id ASC;"))
            .map_err(unavailable)?;
        let rows = stmt
            .query_map([], PessoaRow::from_row)
            .map_err(unavailable)?;

        let mut pessoas = Vec::new();
        for row in rows {
            pessoas.push(row.map_err(unavailable)?.into_pessoa()?);
        }
        Ok(pessoas)
    }

    fn daily_counts(&self) -> Result<Vec<DailyCount>, RepositoryError> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT data_registro, COUNT(id)
                 FROM pessoas
                 GROUP BY data_registro
                 ORDER BY data_registro ASC;",
            )
            .map_err(unavailable)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DailyCount {
                    date: row.get(0)?,
                    count: row.get(1)?,
                })
            })
            .map_err(unavailable)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(unavailable)
    }

    fn cpf_taken(&self, cpf: &str, excluding: Option<PessoaId>) -> Result<bool, RepositoryError> {
        let conn = self.connection()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT id FROM pessoas WHERE cpf = ?1 AND (?2 IS NULL OR id <> ?2) LIMIT 1;",
                params![cpf, excluding.map(|id| id.0)],
                |row| row.get(0),
            )
            .optional()
            .map_err(unavailable)?;
        Ok(found.is_some())
    }
}

fn fetch_one(conn: &Connection, id: PessoaId) -> Result<Option<Pessoa>, RepositoryError> {
    let row = conn
        .query_row(
            &format!("{PESSOA_SELECT_SQL} WHERE id = ?1;"),
            params![id.0],
            PessoaRow::from_row,
        )
        .optional()
        .map_err(unavailable)?;

    row.map(PessoaRow::into_pessoa).transpose()
}

struct PessoaRow {
    id: i64,
    nome: String,
    data_nascimento: NaiveDate,
    sexo: String,
    cpf: String,
    email: String,
    celular: String,
    endereco: String,
    bairro: String,
    cidade: String,
    estado: String,
    data_registro: NaiveDate,
}

impl PessoaRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            nome: row.get(1)?,
            data_nascimento: row.get(2)?,
            sexo: row.get(3)?,
            cpf: row.get(4)?,
            email: row.get(5)?,
            celular: row.get(6)?,
            endereco: row.get(7)?,
            bairro: row.get(8)?,
            cidade: row.get(9)?,
            estado: row.get(10)?,
            data_registro: row.get(11)?,
        })
    }

    fn into_pessoa(self) -> Result<Pessoa, RepositoryError> {
        let sexo = Sexo::from_code(&self.sexo).ok_or_else(|| {
            RepositoryError::InvalidData(format!(
                "pessoa {} has unknown sexo code '{}'",
                self.id, self.sexo
            ))
        })?;

        Ok(Pessoa {
            id: PessoaId(self.id),
            nome: self.nome,
            data_nascimento: self.data_nascimento,
            sexo,
            cpf: self.cpf,
            email: self.email,
            celular: self.celular,
            endereco: self.endereco,
            bairro: self.bairro,
            cidade: self.cidade,
            estado: self.estado,
            data_registro: self.data_registro,
        })
    }
}

pub(crate) fn unavailable(err: rusqlite::Error) -> RepositoryError {
    RepositoryError::Unavailable(err.to_string())
}

fn map_write_error(err: rusqlite::Error) -> RepositoryError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            RepositoryError::DuplicateCpf
        }
        _ => unavailable(err),
    }
}
