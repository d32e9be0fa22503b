use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use chrono::NaiveDate;

use crate::pessoas::domain::{DailyCount, Pessoa, PessoaFields, PessoaId};
use crate::pessoas::export::{ExportError, HtmlToPdf};
use crate::pessoas::repository::{PessoaRepository, RepositoryError};
use crate::pessoas::validation::PessoaForm;
use crate::pessoas::{PessoaService, SvgBarChart};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn form(nome: &str, cpf: &str) -> PessoaForm {
    PessoaForm {
        nome: nome.to_string(),
        data_nascimento: "1990-05-12".to_string(),
        sexo: "F".to_string(),
        cpf: cpf.to_string(),
        email: "maria@example.com".to_string(),
        celular: "11912345678".to_string(),
        endereco: "Rua das Flores 10".to_string(),
        bairro: "Centro".to_string(),
        cidade: "Campinas".to_string(),
        estado: "SP".to_string(),
    }
}

/// `application/x-www-form-urlencoded` body for [`form`] values. Only
/// spaces need escaping for the fixtures used here.
pub(super) fn encode_form(form: &PessoaForm) -> String {
    crate::pessoas::schema::FIELDS
        .iter()
        .map(|spec| format!("{}={}", spec.name, form.value(spec.name).replace(' ', "+")))
        .collect::<Vec<_>>()
        .join("&")
}

pub(super) fn build_service() -> (PessoaService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = PessoaService::new(repository.clone());
    (service, repository)
}

pub(super) fn service_with_failing_converter() -> PessoaService<MemoryRepository> {
    PessoaService::with_collaborators(
        Arc::new(MemoryRepository::default()),
        Arc::new(SvgBarChart),
        Arc::new(FailingConverter),
    )
}

#[derive(Default)]
struct MemoryState {
    records: Vec<Pessoa>,
    last_id: i64,
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    pub(super) fn len(&self) -> usize {
        self.state
            .lock()
            .expect("repository mutex poisoned")
            .records
            .len()
    }
}

impl PessoaRepository for MemoryRepository {
    fn insert(
        &self,
        fields: PessoaFields,
        registered_on: NaiveDate,
    ) -> Result<Pessoa, RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        if guard.records.iter().any(|pessoa| pessoa.cpf == fields.cpf) {
            return Err(RepositoryError::DuplicateCpf);
        }
        guard.last_id += 1;
        let pessoa = Pessoa::from_fields(PessoaId(guard.last_id), fields, registered_on);
        guard.records.push(pessoa.clone());
        Ok(pessoa)
    }

    fn update(&self, id: PessoaId, fields: PessoaFields) -> Result<Pessoa, RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        if guard
            .records
            .iter()
            .any(|pessoa| pessoa.id != id && pessoa.cpf == fields.cpf)
        {
            return Err(RepositoryError::DuplicateCpf);
        }
        let record = guard
            .records
            .iter_mut()
            .find(|pessoa| pessoa.id == id)
            .ok_or(RepositoryError::NotFound)?;
        *record = Pessoa::from_fields(id, fields, record.data_registro);
        Ok(record.clone())
    }

    fn delete(&self, id: PessoaId) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        let before = guard.records.len();
        guard.records.retain(|pessoa| pessoa.id != id);
        if guard.records.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn fetch(&self, id: PessoaId) -> Result<Option<Pessoa>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        Ok(guard.records.iter().find(|pessoa| pessoa.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<Pessoa>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        Ok(guard.records.clone())
    }

    fn daily_counts(&self) -> Result<Vec<DailyCount>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        let mut counts: BTreeMap<NaiveDate, u32> = BTreeMap::new();
        for pessoa in &guard.records {
            *counts.entry(pessoa.data_registro).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect())
    }

    fn cpf_taken(&self, cpf: &str, excluding: Option<PessoaId>) -> Result<bool, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        Ok(guard
            .records
            .iter()
            .any(|pessoa| pessoa.cpf == cpf && Some(pessoa.id) != excluding))
    }
}

pub(super) struct UnavailableRepository;

impl PessoaRepository for UnavailableRepository {
    fn insert(
        &self,
        _fields: PessoaFields,
        _registered_on: NaiveDate,
    ) -> Result<Pessoa, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _id: PessoaId, _fields: PessoaFields) -> Result<Pessoa, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: PessoaId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: PessoaId) -> Result<Option<Pessoa>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<Pessoa>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn daily_counts(&self) -> Result<Vec<DailyCount>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn cpf_taken(&self, _cpf: &str, _excluding: Option<PessoaId>) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Store whose `list` blocks until the test releases it, or fails after a
/// timeout.
pub(super) struct GatedRepository {
    entered: AtomicBool,
    release: Mutex<mpsc::Receiver<()>>,
}

impl GatedRepository {
    pub(super) fn new() -> (Self, mpsc::Sender<()>) {
        let (sender, receiver) = mpsc::channel();
        let repository = Self {
            entered: AtomicBool::new(false),
            release: Mutex::new(receiver),
        };
        (repository, sender)
    }

    pub(super) fn entered(&self) -> bool {
        self.entered.load(Ordering::SeqCst)
    }
}

impl PessoaRepository for GatedRepository {
    fn insert(
        &self,
        _fields: PessoaFields,
        _registered_on: NaiveDate,
    ) -> Result<Pessoa, RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn update(&self, _id: PessoaId, _fields: PessoaFields) -> Result<Pessoa, RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn delete(&self, _id: PessoaId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn fetch(&self, _id: PessoaId) -> Result<Option<Pessoa>, RepositoryError> {
        Ok(None)
    }

    fn list(&self) -> Result<Vec<Pessoa>, RepositoryError> {
        self.entered.store(true, Ordering::SeqCst);
        let release = self.release.lock().expect("gate mutex poisoned");
        release
            .recv_timeout(Duration::from_secs(5))
            .map_err(|_| RepositoryError::Unavailable("gate never released".to_string()))?;
        Ok(Vec::new())
    }

    fn daily_counts(&self) -> Result<Vec<DailyCount>, RepositoryError> {
        Ok(Vec::new())
    }

    fn cpf_taken(&self, _cpf: &str, _excluding: Option<PessoaId>) -> Result<bool, RepositoryError> {
        Ok(false)
    }
}

/// Converter that rejects every document.
pub(super) struct FailingConverter;

impl HtmlToPdf for FailingConverter {
    fn convert(&self, _html: &str, _dest: &mut dyn Write) -> Result<(), ExportError> {
        Err(ExportError::Conversion("renderer crashed".to_string()))
    }
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_text(response: Response) -> String {
    String::from_utf8(read_body(response).await).expect("utf-8 body")
}
