use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier assigned by the store when a person is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PessoaId(pub i64);

impl fmt::Display for PessoaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of accepted `sexo` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sexo {
    #[serde(rename = "M")]
    Masculino,
    #[serde(rename = "F")]
    Feminino,
    #[serde(rename = "O")]
    Outro,
}

impl Sexo {
    pub const ALL: [Sexo; 3] = [Sexo::Masculino, Sexo::Feminino, Sexo::Outro];

    pub fn code(self) -> &'static str {
        match self {
            Sexo::Masculino => "M",
            Sexo::Feminino => "F",
            Sexo::Outro => "O",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Sexo::Masculino => "Masculino",
            Sexo::Feminino => "Feminino",
            Sexo::Outro => "Outro",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|sexo| sexo.code() == code)
    }
}

/// Normalized, validated field values ready to be written to the store.
///
/// Carries every editable column; `id` and `data_registro` are owned by the
/// store and never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PessoaFields {
    pub nome: String,
    pub data_nascimento: NaiveDate,
    pub sexo: Sexo,
    pub cpf: String,
    pub email: String,
    pub celular: String,
    pub endereco: String,
    pub bairro: String,
    pub cidade: String,
    pub estado: String,
}

/// A stored person record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pessoa {
    pub id: PessoaId,
    pub nome: String,
    pub data_nascimento: NaiveDate,
    pub sexo: Sexo,
    pub cpf: String,
    pub email: String,
    pub celular: String,
    pub endereco: String,
    pub bairro: String,
    pub cidade: String,
    pub estado: String,
    pub data_registro: NaiveDate,
}

impl Pessoa {
    pub fn from_fields(id: PessoaId, fields: PessoaFields, data_registro: NaiveDate) -> Self {
        let PessoaFields {
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
        } = fields;

        Self {
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
            data_registro,
        }
    }
}

impl fmt::Display for Pessoa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nome)
    }
}

/// Number of people registered on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u32,
}
