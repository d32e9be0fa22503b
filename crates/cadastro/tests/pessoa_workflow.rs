//! End-to-end behavior of the person registry over the SQLite store, driven
//! through the public service facade and HTTP router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use cadastro::pessoas::export::{CSV_HEADER, UTF8_BOM};
use cadastro::pessoas::validation::DUPLICATE_CPF;
use cadastro::pessoas::{
    pessoa_router, DailyCount, Pessoa, PessoaForm, PessoaRepository, PessoaService, Sexo,
    SqlitePessoaRepository, Submission,
};
use chrono::NaiveDate;
use tower::ServiceExt;

mod common {
    use super::*;

    pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    pub(super) fn form(nome: &str, cpf: &str) -> PessoaForm {
        PessoaForm {
            nome: nome.to_string(),
            data_nascimento: "12/05/1990".to_string(),
            sexo: "O".to_string(),
            cpf: cpf.to_string(),
            email: "contato@example.org".to_string(),
            celular: "41988887777".to_string(),
            endereco: "Rua XV de Novembro 100".to_string(),
            bairro: "Centro".to_string(),
            cidade: "Curitiba".to_string(),
            estado: "PR".to_string(),
        }
    }

    pub(super) fn service() -> (
        PessoaService<SqlitePessoaRepository>,
        Arc<SqlitePessoaRepository>,
    ) {
        let repository =
            Arc::new(SqlitePessoaRepository::open_in_memory().expect("in-memory store opens"));
        (PessoaService::new(repository.clone()), repository)
    }

    pub(super) fn saved(submission: Submission) -> Pessoa {
        match submission {
            Submission::Saved(pessoa) => pessoa,
            Submission::Rejected(errors) => panic!("unexpected rejection: {errors:?}"),
        }
    }

    pub(super) fn csv_rows(bytes: &[u8]) -> Vec<Vec<String>> {
        assert!(bytes.starts_with(UTF8_BOM), "csv starts with the BOM");
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_reader(&bytes[UTF8_BOM.len()..]);
        reader
            .records()
            .map(|record| {
                record
                    .expect("csv record parses")
                    .iter()
                    .map(str::to_string)
                    .collect()
            })
            .collect()
    }
}

use common::*;

#[test]
fn create_then_get_returns_the_submitted_record() {
    let (service, _) = service();
    let created = saved(
        service
            .create_on(&form("Joana Prado", "111.222.333-44"), date(2024, 6, 10))
            .expect("create succeeds"),
    );

    let fetched = service.get(created.id).expect("record exists");
    assert_eq!(fetched, created);
    assert_eq!(fetched.nome, "Joana Prado");
    assert_eq!(fetched.sexo, Sexo::Outro);
    assert_eq!(fetched.data_nascimento, date(1990, 5, 12));
    assert_eq!(fetched.data_registro, date(2024, 6, 10));
}

#[test]
fn duplicate_cpf_leaves_a_single_record() {
    let (service, repository) = service();
    saved(
        service
            .create_on(&form("Primeira", "111"), date(2024, 6, 10))
            .expect("first create"),
    );

    match service
        .create_on(&form("Segunda", "111"), date(2024, 6, 11))
        .expect("second create returns outcome")
    {
        Submission::Rejected(errors) => assert_eq!(errors.for_field("cpf"), Some(DUPLICATE_CPF)),
        other => panic!("expected rejection, got {other:?}"),
    }

    let with_cpf: Vec<Pessoa> = repository
        .list()
        .expect("list")
        .into_iter()
        .filter(|pessoa| pessoa.cpf == "111")
        .collect();
    assert_eq!(with_cpf.len(), 1);
    assert_eq!(with_cpf[0].nome, "Primeira");
}

#[tokio::test]
async fn update_ignores_submitted_id_and_registration_date() {
    let (service, _) = service();
    let original = saved(
        service
            .create_on(&form("Joana", "111"), date(2024, 6, 10))
            .expect("create"),
    );
    let service = Arc::new(service);

    let body = "id=999&data_registro=2000-01-01&nome=Joana+Prado&data_nascimento=1990-05-12&sexo=F\
         &cpf=111&email=joana%40example.org&celular=41988887777&endereco=Rua+A\
         &bairro=Centro&cidade=Curitiba&estado=PR";
    let response = pessoa_router(service.clone())
        .oneshot(
            Request::post(format!("/editar/{}/", original.id))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let updated = service.get(original.id).expect("record still exists");
    assert_eq!(updated.id, original.id);
    assert_eq!(updated.data_registro, date(2024, 6, 10));
    assert_eq!(updated.nome, "Joana Prado");
    assert_eq!(updated.sexo, Sexo::Feminino);
    assert_eq!(updated.email, "joana@example.org");
}

#[test]
fn delete_then_get_is_not_found() {
    let (service, _) = service();
    let pessoa = saved(
        service
            .create_on(&form("Joana", "111"), date(2024, 6, 10))
            .expect("create"),
    );

    service.delete(pessoa.id).expect("delete");
    assert!(service.get(pessoa.id).expect_err("deleted").is_not_found());
}

#[test]
fn csv_export_has_fixed_header_and_one_row_per_record() {
    let (service, _) = service();
    for (nome, cpf) in [("A", "1"), ("B", "2"), ("C", "3")] {
        saved(
            service
                .create_on(&form(nome, cpf), date(2024, 6, 10))
                .expect("create"),
        );
    }

    let attachment = service.export_csv().expect("csv export");
    let rows = csv_rows(&attachment.bytes);
    assert_eq!(rows[0], CSV_HEADER.map(str::to_string).to_vec());
    assert_eq!(rows.len() - 1, 3);
    assert_eq!(
        rows[1],
        vec![
            "A",
            "1",
            "41988887777",
            "contato@example.org",
            "Rua XV de Novembro 100",
            "Centro",
            "Curitiba",
            "PR",
            "2024-06-10",
        ]
    );
}

#[test]
fn exports_do_not_touch_the_store() {
    let (service, repository) = service();
    let pessoa = saved(
        service
            .create_on(&form("Joana", "111"), date(2024, 6, 10))
            .expect("create"),
    );
    let before = repository.list().expect("list");

    for _ in 0..3 {
        service.export_table_pdf().expect("table pdf");
        service.export_summary_pdf(pessoa.id).expect("summary pdf");
        service.export_csv().expect("csv");
    }

    assert_eq!(repository.list().expect("list"), before);
}

#[test]
fn same_day_registrations_aggregate_and_deletion_shrinks_the_export() {
    let (service, _) = service();
    let day = date(2024, 6, 10);
    let a = saved(service.create_on(&form("A", "111"), day).expect("create a"));
    saved(service.create_on(&form("B", "222"), day).expect("create b"));

    let listing = service.list_and_summarize().expect("listing");
    assert_eq!(
        listing.daily_counts,
        vec![DailyCount {
            date: day,
            count: 2
        }]
    );

    service.delete(a.id).expect("delete a");
    let rows = csv_rows(&service.export_csv().expect("csv").bytes);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][0], "B");
    assert_eq!(rows[1][1], "222");
}

#[test]
fn file_backed_store_survives_reopening() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("cadastro.sqlite3");

    let id = {
        let repository = Arc::new(SqlitePessoaRepository::open(&path).expect("store opens"));
        let service = PessoaService::new(repository);
        saved(
            service
                .create_on(&form("Joana", "111"), date(2024, 6, 10))
                .expect("create"),
        )
        .id
    };

    let reopened = SqlitePessoaRepository::open(&path).expect("store reopens");
    let pessoa = reopened
        .fetch(id)
        .expect("fetch")
        .expect("record persisted");
    assert_eq!(pessoa.cpf, "111");
    assert!(reopened.cpf_taken("111", None).expect("cpf lookup"));
    assert!(!reopened.cpf_taken("111", Some(id)).expect("cpf lookup"));
}
