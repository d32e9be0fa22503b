use askama::Template;

use super::domain::{Pessoa, Sexo};
use super::schema::{FieldKind, FIELDS};
use super::validation::{FormErrors, PessoaForm};

#[derive(Template)]
#[template(path = "pessoa_list.html")]
pub struct ListPage<'a> {
    pub pessoas: &'a [Pessoa],
    pub chart: String,
}

#[derive(Template)]
#[template(path = "pessoa_form.html")]
pub struct FormPage {
    pub title: String,
    pub action: String,
    pub fields: Vec<FormFieldView>,
}

/// Rendering state of one input: submitted value plus its error, if any.
#[derive(Debug, Clone)]
pub struct FormFieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub input_type: &'static str,
    pub max_length: usize,
    pub value: String,
    pub has_error: bool,
    pub error: String,
    pub is_choice: bool,
    pub options: Vec<ChoiceOption>,
}

#[derive(Debug, Clone)]
pub struct ChoiceOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

impl FormPage {
    pub fn new(
        title: impl Into<String>,
        action: impl Into<String>,
        form: &PessoaForm,
        errors: &FormErrors,
    ) -> Self {
        let fields = FIELDS
            .iter()
            .map(|spec| {
                let value = form.value(spec.name).to_string();
                let error = errors.for_field(spec.name);
                let is_choice = spec.kind == FieldKind::Choice;
                let options = if is_choice {
                    Sexo::ALL
                        .into_iter()
                        .map(|sexo| ChoiceOption {
                            value: sexo.code(),
                            label: sexo.label(),
                            selected: sexo.code() == value.trim(),
                        })
                        .collect()
                } else {
                    Vec::new()
                };

                FormFieldView {
                    name: spec.name,
                    label: spec.label,
                    input_type: spec.kind.input_type(),
                    max_length: spec.max_length.unwrap_or(0),
                    value,
                    has_error: error.is_some(),
                    error: error.unwrap_or_default().to_string(),
                    is_choice,
                    options,
                }
            })
            .collect();

        Self {
            title: title.into(),
            action: action.into(),
            fields,
        }
    }
}

#[derive(Template)]
#[template(path = "pessoa_confirm_delete.html")]
pub struct ConfirmDeletePage<'a> {
    pub pessoa: &'a Pessoa,
}

#[derive(Template)]
#[template(path = "pessoa_resumo.html")]
pub struct ResumoPage<'a> {
    pub pessoa: &'a Pessoa,
}

/// Markup fed to the HTML-to-PDF converter for the single-record export.
#[derive(Template)]
#[template(path = "pessoa_resumo_pdf.html")]
pub struct ResumoPdfDocument<'a> {
    pub pessoa: &'a Pessoa,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundPage {
    pub id: String,
}
