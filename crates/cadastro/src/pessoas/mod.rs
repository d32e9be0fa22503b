//! Person registry: records, form validation, the listing chart, and the
//! CSV/PDF exports, exposed through an axum router.

pub mod chart;
pub mod domain;
pub mod export;
pub mod repository;
pub mod router;
pub mod schema;
pub mod service;
pub mod store;
pub mod validation;
pub mod views;

#[cfg(test)]
mod tests;

pub use chart::{BarChart, ChartRenderer, SvgBarChart};
pub use domain::{DailyCount, Pessoa, PessoaFields, PessoaId, Sexo};
pub use export::{Attachment, ExportError, HtmlToPdf, PrintPdfConverter};
pub use repository::{PessoaRepository, RepositoryError};
pub use router::pessoa_router;
pub use service::{PessoaListing, PessoaService, PessoaServiceError, Submission};
pub use store::SqlitePessoaRepository;
pub use validation::{FieldError, FormErrors, PessoaForm};
