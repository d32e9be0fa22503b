use std::sync::Arc;

use askama::Template;
use chrono::{Local, NaiveDate};
use tracing::{debug, info};

use super::chart::{BarChart, ChartRenderer, SvgBarChart};
use super::domain::{DailyCount, Pessoa, PessoaId};
use super::export::{
    csv_bytes, render_table_pdf, Attachment, ExportError, HtmlToPdf, PrintPdfConverter,
};
use super::repository::{PessoaRepository, RepositoryError};
use super::validation::{validate, FormErrors, FormOutcome, PessoaForm};
use super::views::ResumoPdfDocument;

/// Records plus the per-day registration counts driving the chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PessoaListing {
    pub pessoas: Vec<Pessoa>,
    pub daily_counts: Vec<DailyCount>,
}

/// Outcome of a create or update submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Saved(Pessoa),
    Rejected(FormErrors),
}

/// Service composing the store, the form validator, and the export
/// collaborators.
pub struct PessoaService<R> {
    repository: Arc<R>,
    chart: Arc<dyn ChartRenderer>,
    converter: Arc<dyn HtmlToPdf>,
}

impl<R> PessoaService<R>
where
    R: PessoaRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_collaborators(
            repository,
            Arc::new(SvgBarChart),
            Arc::new(PrintPdfConverter),
        )
    }

    pub fn with_collaborators(
        repository: Arc<R>,
        chart: Arc<dyn ChartRenderer>,
        converter: Arc<dyn HtmlToPdf>,
    ) -> Self {
        Self {
            repository,
            chart,
            converter,
        }
    }

    /// Every record in insertion order and the registrations per day,
    /// ascending by date.
    pub fn list_and_summarize(&self) -> Result<PessoaListing, PessoaServiceError> {
        let pessoas = self.repository.list()?;
        let daily_counts = self.repository.daily_counts()?;
        Ok(PessoaListing {
            pessoas,
            daily_counts,
        })
    }

    pub fn chart_markup(&self, daily_counts: &[DailyCount]) -> String {
        self.chart
            .bar_chart(&BarChart::registrations(daily_counts))
    }

    pub fn get(&self, id: PessoaId) -> Result<Pessoa, PessoaServiceError> {
        let pessoa = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(pessoa)
    }

    /// Register a new person dated today.
    pub fn create(&self, form: &PessoaForm) -> Result<Submission, PessoaServiceError> {
        self.create_on(form, Local::now().date_naive())
    }

    /// Register a new person with an explicit registration date.
    pub fn create_on(
        &self,
        form: &PessoaForm,
        registered_on: NaiveDate,
    ) -> Result<Submission, PessoaServiceError> {
        let fields = match validate(form, None, self.repository.as_ref())? {
            FormOutcome::Valid(fields) => fields,
            FormOutcome::Invalid(errors) => {
                debug!(errors = errors.len(), "pessoa create rejected");
                return Ok(Submission::Rejected(errors));
            }
        };

        match self.repository.insert(fields, registered_on) {
            Ok(pessoa) => {
                info!(pessoa_id = %pessoa.id, %registered_on, "pessoa created");
                Ok(Submission::Saved(pessoa))
            }
            Err(RepositoryError::DuplicateCpf) => {
                debug!("pessoa create lost cpf race");
                Ok(Submission::Rejected(FormErrors::duplicate_cpf()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Replace the editable fields of an existing record. `id` and
    /// `data_registro` are never touched.
    pub fn update(
        &self,
        id: PessoaId,
        form: &PessoaForm,
    ) -> Result<Submission, PessoaServiceError> {
        self.get(id)?;

        let fields = match validate(form, Some(id), self.repository.as_ref())? {
            FormOutcome::Valid(fields) => fields,
            FormOutcome::Invalid(errors) => {
                debug!(pessoa_id = %id, errors = errors.len(), "pessoa update rejected");
                return Ok(Submission::Rejected(errors));
            }
        };

        match self.repository.update(id, fields) {
            Ok(pessoa) => {
                info!(pessoa_id = %id, "pessoa updated");
                Ok(Submission::Saved(pessoa))
            }
            Err(RepositoryError::DuplicateCpf) => {
                Ok(Submission::Rejected(FormErrors::duplicate_cpf()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn delete(&self, id: PessoaId) -> Result<(), PessoaServiceError> {
        self.repository.delete(id)?;
        info!(pessoa_id = %id, "pessoa deleted");
        Ok(())
    }

    pub fn export_csv(&self) -> Result<Attachment, PessoaServiceError> {
        let pessoas = self.repository.list()?;
        let bytes = csv_bytes(&pessoas)?;
        info!(rows = pessoas.len(), "csv export generated");
        Ok(Attachment {
            filename: "cadastros.csv".to_string(),
            content_type: mime::TEXT_CSV,
            bytes,
        })
    }

    pub fn export_table_pdf(&self) -> Result<Attachment, PessoaServiceError> {
        let pessoas = self.repository.list()?;
        let bytes = render_table_pdf(&pessoas)?;
        info!(rows = pessoas.len(), "table pdf generated");
        Ok(Attachment {
            filename: "cadastros.pdf".to_string(),
            content_type: mime::APPLICATION_PDF,
            bytes,
        })
    }

    /// Single-record summary rendered through the PDF template and the
    /// HTML-to-PDF converter.
    pub fn export_summary_pdf(&self, id: PessoaId) -> Result<Attachment, PessoaServiceError> {
        let pessoa = self.get(id)?;
        let html = ResumoPdfDocument { pessoa: &pessoa }
            .render()
            .map_err(ExportError::from)?;

        let mut bytes = Vec::new();
        self.converter.convert(&html, &mut bytes)?;
        info!(pessoa_id = %id, "summary pdf generated");

        Ok(Attachment {
            filename: format!("pessoa_{id}.pdf"),
            content_type: mime::APPLICATION_PDF,
            bytes,
        })
    }
}

/// Error raised by the pessoa service.
#[derive(Debug, thiserror::Error)]
pub enum PessoaServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("blocking task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl PessoaServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Repository(RepositoryError::NotFound))
    }
}
