use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use tracing::error;

use super::domain::PessoaId;
use super::export::{Attachment, ExportError};
use super::repository::PessoaRepository;
use super::service::{PessoaService, PessoaServiceError, Submission};
use super::validation::{FormErrors, PessoaForm};
use super::views::{ConfirmDeletePage, FormPage, ListPage, NotFoundPage, ResumoPage};

pub const PDF_ERROR_BODY: &str = "Erro ao criar PDF";

/// Router builder exposing the registry pages and downloads.
pub fn pessoa_router<R>(service: Arc<PessoaService<R>>) -> Router
where
    R: PessoaRepository + 'static,
{
    Router::new()
        .route("/", get(list_handler::<R>))
        .route(
            "/novo/",
            get(create_form_handler).post(create_handler::<R>),
        )
        .route(
            "/editar/:id/",
            get(edit_form_handler::<R>).post(update_handler::<R>),
        )
        .route(
            "/deletar/:id/",
            get(confirm_delete_handler::<R>).post(delete_handler::<R>),
        )
        .route("/resumo/:id/", get(resumo_handler::<R>))
        .route("/pessoa/:id/pdf/", get(summary_pdf_handler::<R>))
        .route("/gerar_pdf/", get(table_pdf_handler::<R>))
        .route("/export/csv/", get(csv_handler::<R>))
        .with_state(service)
}

pub(crate) async fn list_handler<R>(State(service): State<Arc<PessoaService<R>>>) -> Response
where
    R: PessoaRepository + 'static,
{
    let page = run_blocking(&service, |service| {
        let listing = service.list_and_summarize()?;
        let chart = service.chart_markup(&listing.daily_counts);
        Ok((listing, chart))
    })
    .await;
    match page {
        Ok((listing, chart)) => render(&ListPage {
            pessoas: &listing.pessoas,
            chart,
        }),
        Err(err) => service_error(err),
    }
}

pub(crate) async fn create_form_handler() -> Response {
    render(&FormPage::new(
        "Novo cadastro",
        "/novo/",
        &PessoaForm::default(),
        &FormErrors::default(),
    ))
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<PessoaService<R>>>,
    Form(form): Form<PessoaForm>,
) -> Response
where
    R: PessoaRepository + 'static,
{
    let submitted = form.clone();
    match run_blocking(&service, move |service| service.create(&submitted)).await {
        Ok(Submission::Saved(_)) => Redirect::to("/").into_response(),
        Ok(Submission::Rejected(errors)) => {
            render(&FormPage::new("Novo cadastro", "/novo/", &form, &errors))
        }
        Err(err) => service_error(err),
    }
}

pub(crate) async fn edit_form_handler<R>(
    State(service): State<Arc<PessoaService<R>>>,
    Path(raw_id): Path<String>,
) -> Response
where
    R: PessoaRepository + 'static,
{
    let Some(id) = parse_id(&raw_id) else {
        return not_found(&raw_id);
    };
    match run_blocking(&service, move |service| service.get(id)).await {
        Ok(pessoa) => render(&FormPage::new(
            format!("Editar {pessoa}"),
            edit_action(id),
            &PessoaForm::from_pessoa(&pessoa),
            &FormErrors::default(),
        )),
        Err(err) => lookup_failure(&raw_id, err),
    }
}

pub(crate) async fn update_handler<R>(
    State(service): State<Arc<PessoaService<R>>>,
    Path(raw_id): Path<String>,
    Form(form): Form<PessoaForm>,
) -> Response
where
    R: PessoaRepository + 'static,
{
    let Some(id) = parse_id(&raw_id) else {
        return not_found(&raw_id);
    };
    let submitted = form.clone();
    match run_blocking(&service, move |service| service.update(id, &submitted)).await {
        Ok(Submission::Saved(_)) => Redirect::to("/").into_response(),
        Ok(Submission::Rejected(errors)) => render(&FormPage::new(
            "Editar cadastro",
            edit_action(id),
            &form,
            &errors,
        )),
        Err(err) => lookup_failure(&raw_id, err),
    }
}

pub(crate) async fn confirm_delete_handler<R>(
    State(service): State<Arc<PessoaService<R>>>,
    Path(raw_id): Path<String>,
) -> Response
where
    R: PessoaRepository + 'static,
{
    let Some(id) = parse_id(&raw_id) else {
        return not_found(&raw_id);
    };
    match run_blocking(&service, move |service| service.get(id)).await {
        Ok(pessoa) => render(&ConfirmDeletePage { pessoa: &pessoa }),
        Err(err) => lookup_failure(&raw_id, err),
    }
}

pub(crate) async fn delete_handler<R>(
    State(service): State<Arc<PessoaService<R>>>,
    Path(raw_id): Path<String>,
) -> Response
where
    R: PessoaRepository + 'static,
{
    let Some(id) = parse_id(&raw_id) else {
        return not_found(&raw_id);
    };
    match run_blocking(&service, move |service| service.delete(id)).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(err) => lookup_failure(&raw_id, err),
    }
}

pub(crate) async fn resumo_handler<R>(
    State(service): State<Arc<PessoaService<R>>>,
    Path(raw_id): Path<String>,
) -> Response
where
    R: PessoaRepository + 'static,
{
    let Some(id) = parse_id(&raw_id) else {
        return not_found(&raw_id);
    };
    match run_blocking(&service, move |service| service.get(id)).await {
        Ok(pessoa) => render(&ResumoPage { pessoa: &pessoa }),
        Err(err) => lookup_failure(&raw_id, err),
    }
}

pub(crate) async fn summary_pdf_handler<R>(
    State(service): State<Arc<PessoaService<R>>>,
    Path(raw_id): Path<String>,
) -> Response
where
    R: PessoaRepository + 'static,
{
    let Some(id) = parse_id(&raw_id) else {
        return not_found(&raw_id);
    };
    match run_blocking(&service, move |service| service.export_summary_pdf(id)).await {
        Ok(attachment) => attachment_response(attachment),
        Err(PessoaServiceError::Export(ExportError::Conversion(reason))) => {
            error!(pessoa_id = %id, %reason, "summary pdf conversion failed");
            (StatusCode::BAD_REQUEST, PDF_ERROR_BODY).into_response()
        }
        Err(err) => lookup_failure(&raw_id, err),
    }
}

pub(crate) async fn table_pdf_handler<R>(
    State(service): State<Arc<PessoaService<R>>>,
) -> Response
where
    R: PessoaRepository + 'static,
{
    match run_blocking(&service, |service| service.export_table_pdf()).await {
        Ok(attachment) => attachment_response(attachment),
        Err(err) => service_error(err),
    }
}

pub(crate) async fn csv_handler<R>(State(service): State<Arc<PessoaService<R>>>) -> Response
where
    R: PessoaRepository + 'static,
{
    match run_blocking(&service, |service| service.export_csv()).await {
        Ok(attachment) => attachment_response(attachment),
        Err(err) => service_error(err),
    }
}

/// Runs a service call on the blocking pool. The store and the PDF layout are
/// synchronous.
async fn run_blocking<R, T, F>(
    service: &Arc<PessoaService<R>>,
    job: F,
) -> Result<T, PessoaServiceError>
where
    R: PessoaRepository + 'static,
    T: Send + 'static,
    F: FnOnce(&PessoaService<R>) -> Result<T, PessoaServiceError> + Send + 'static,
{
    let service = Arc::clone(service);
    tokio::task::spawn_blocking(move || job(&service)).await?
}

fn parse_id(raw: &str) -> Option<PessoaId> {
    raw.parse::<i64>().ok().map(PessoaId)
}

fn edit_action(id: PessoaId) -> String {
    format!("/editar/{id}/")
}

fn render<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(body) => Html(body).into_response(),
        Err(err) => {
            error!(error = %err, "template rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Erro interno").into_response()
        }
    }
}

fn not_found(raw_id: &str) -> Response {
    let page = NotFoundPage {
        id: raw_id.to_string(),
    };
    match page.render() {
        Ok(body) => (StatusCode::NOT_FOUND, Html(body)).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn lookup_failure(raw_id: &str, err: PessoaServiceError) -> Response {
    if err.is_not_found() {
        return not_found(raw_id);
    }
    service_error(err)
}

fn service_error(err: PessoaServiceError) -> Response {
    error!(error = %err, "pessoa request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Erro interno").into_response()
}

fn attachment_response(attachment: Attachment) -> Response {
    let disposition = attachment.content_disposition();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, attachment.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        attachment.bytes,
    )
        .into_response()
}
