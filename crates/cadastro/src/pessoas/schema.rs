//! Static field table shared by the form layer, the validator and the store.

/// How a field is parsed and rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Choice,
    Email,
}

impl FieldKind {
    /// HTML `input` type used when rendering the field.
    pub fn input_type(self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::Choice => "text",
            FieldKind::Date => "date",
            FieldKind::Email => "email",
        }
    }
}

/// Declared constraints for one editable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub max_length: Option<usize>,
}

const fn text(name: &'static str, label: &'static str, max_length: usize) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind: FieldKind::Text,
        max_length: Some(max_length),
    }
}

/// Editable fields in form order. `data_registro` is store-owned and absent.
pub const FIELDS: [FieldSpec; 10] = [
    text("nome", "Nome", 255),
    FieldSpec {
        name: "data_nascimento",
        label: "Data de nascimento",
        kind: FieldKind::Date,
        max_length: None,
    },
    FieldSpec {
        name: "sexo",
        label: "Sexo",
        kind: FieldKind::Choice,
        max_length: Some(1),
    },
    text("cpf", "CPF", 14),
    FieldSpec {
        name: "email",
        label: "E-mail",
        kind: FieldKind::Email,
        max_length: Some(254),
    },
    text("celular", "Celular", 15),
    text("endereco", "Endereço", 255),
    text("bairro", "Bairro", 255),
    text("cidade", "Cidade", 255),
    text("estado", "Estado", 2),
];

pub fn field(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|spec| spec.name == name)
}
