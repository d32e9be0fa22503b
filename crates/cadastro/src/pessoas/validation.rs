use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::domain::{Pessoa, PessoaFields, PessoaId, Sexo};
use super::repository::{PessoaRepository, RepositoryError};
use super::schema::{FieldKind, FieldSpec, FIELDS};

pub const REQUIRED: &str = "Este campo é obrigatório.";
pub const INVALID_DATE: &str = "Informe uma data válida.";
pub const INVALID_EMAIL: &str = "Informe um endereço de email válido.";
pub const DUPLICATE_CPF: &str = "Pessoa com este CPF já existe.";

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// Raw form submission. Missing keys deserialize as empty strings so they
/// fail the required check instead of the extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PessoaForm {
    pub nome: String,
    pub data_nascimento: String,
    pub sexo: String,
    pub cpf: String,
    pub email: String,
    pub celular: String,
    pub endereco: String,
    pub bairro: String,
    pub cidade: String,
    pub estado: String,
}

impl PessoaForm {
    pub fn from_pessoa(pessoa: &Pessoa) -> Self {
        Self {
            nome: pessoa.nome.clone(),
            data_nascimento: pessoa.data_nascimento.format("%Y-%m-%d").to_string(),
            sexo: pessoa.sexo.code().to_string(),
            cpf: pessoa.cpf.clone(),
            email: pessoa.email.clone(),
            celular: pessoa.celular.clone(),
            endereco: pessoa.endereco.clone(),
            bairro: pessoa.bairro.clone(),
            cidade: pessoa.cidade.clone(),
            estado: pessoa.estado.clone(),
        }
    }

    /// Submitted value for a field declared in [`FIELDS`].
    pub fn value(&self, field: &str) -> &str {
        match field {
            "nome" => &self.nome,
            "data_nascimento" => &self.data_nascimento,
            "sexo" => &self.sexo,
            "cpf" => &self.cpf,
            "email" => &self.email,
            "celular" => &self.celular,
            "endereco" => &self.endereco,
            "bairro" => &self.bairro,
            "cidade" => &self.cidade,
            "estado" => &self.estado,
            _ => "",
        }
    }
}

/// One user-correctable problem with a submitted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Field errors in form order, re-displayed next to their inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    errors: Vec<FieldError>,
}

impl FormErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Error raised when the store's unique index rejects the cpf.
    pub fn duplicate_cpf() -> Self {
        let mut errors = Self::default();
        errors.push("cpf", DUPLICATE_CPF);
        errors
    }
}

/// Result of validating a submission against the field table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOutcome {
    Valid(PessoaFields),
    Invalid(FormErrors),
}

/// Validate a submission, including cpf uniqueness against every record
/// other than `current`.
///
/// User-input problems come back as [`FormOutcome::Invalid`]; only storage
/// failures are returned as `Err`.
pub fn validate<R>(
    form: &PessoaForm,
    current: Option<PessoaId>,
    repository: &R,
) -> Result<FormOutcome, RepositoryError>
where
    R: PessoaRepository + ?Sized,
{
    let mut errors = FormErrors::default();
    let cleaned = clean(form, &mut errors);

    if errors.for_field("cpf").is_none() && repository.cpf_taken(form.cpf.trim(), current)? {
        errors.push("cpf", DUPLICATE_CPF);
    }

    match cleaned {
        Some(fields) if errors.is_empty() => Ok(FormOutcome::Valid(fields)),
        _ => Ok(FormOutcome::Invalid(errors)),
    }
}

/// Field-level checks that need no storage access.
pub fn clean(form: &PessoaForm, errors: &mut FormErrors) -> Option<PessoaFields> {
    let mut data_nascimento = None;
    let mut sexo = None;

    for spec in &FIELDS {
        let value = form.value(spec.name).trim();
        if value.is_empty() {
            errors.push(spec.name, REQUIRED);
            continue;
        }

        match spec.kind {
            FieldKind::Date => match parse_date(value) {
                Some(date) => data_nascimento = Some(date),
                None => errors.push(spec.name, INVALID_DATE),
            },
            FieldKind::Choice => match Sexo::from_code(value) {
                Some(code) => sexo = Some(code),
                None => errors.push(
                    spec.name,
                    format!("Faça uma escolha válida. {value} não é uma das escolhas disponíveis."),
                ),
            },
            FieldKind::Email => {
                if !check_length(spec, value, errors) {
                    continue;
                }
                if !is_valid_email(value) {
                    errors.push(spec.name, INVALID_EMAIL);
                }
            }
            FieldKind::Text => {
                check_length(spec, value, errors);
            }
        }
    }

    if !errors.is_empty() {
        return None;
    }

    Some(PessoaFields {
        nome: form.nome.trim().to_string(),
        data_nascimento: data_nascimento?,
        sexo: sexo?,
        cpf: form.cpf.trim().to_string(),
        email: form.email.trim().to_string(),
        celular: form.celular.trim().to_string(),
        endereco: form.endereco.trim().to_string(),
        bairro: form.bairro.trim().to_string(),
        cidade: form.cidade.trim().to_string(),
        estado: form.estado.trim().to_string(),
    })
}

fn check_length(spec: &FieldSpec, value: &str, errors: &mut FormErrors) -> bool {
    let Some(max) = spec.max_length else {
        return true;
    };
    let len = value.chars().count();
    if len > max {
        errors.push(
            spec.name,
            format!(
                "Certifique-se de que o valor tenha no máximo {max} caracteres (ele possui {len})."
            ),
        );
        return false;
    }
    true
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"^[-!#$%&'*+/=?^_`{}|~0-9A-Za-z]+(\.[-!#$%&'*+/=?^_`{}|~0-9A-Za-z]+)*",
            r"@(localhost|([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63})$",
        ))
        .expect("valid email regex")
    })
}

pub fn is_valid_email(value: &str) -> bool {
    email_pattern().is_match(value)
}
