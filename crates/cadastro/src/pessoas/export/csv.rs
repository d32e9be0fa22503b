use std::io::Write;

use super::ExportError;
use crate::pessoas::domain::Pessoa;

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const CSV_HEADER: [&str; 9] = [
    "Nome",
    "CPF",
    "Celular",
    "Email",
    "Endereço",
    "Bairro",
    "Cidade",
    "Estado",
    "Data de Registro",
];

/// Write the BOM-prefixed, `;`-delimited dump of `pessoas` in list order.
pub fn write_csv<W: Write>(pessoas: &[Pessoa], mut writer: W) -> Result<(), ExportError> {
    writer.write_all(UTF8_BOM)?;

    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;

    for pessoa in pessoas {
        let data_registro = pessoa.data_registro.format("%Y-%m-%d").to_string();
        csv_writer.write_record([
            pessoa.nome.as_str(),
            pessoa.cpf.as_str(),
            pessoa.celular.as_str(),
            pessoa.email.as_str(),
            pessoa.endereco.as_str(),
            pessoa.bairro.as_str(),
            pessoa.cidade.as_str(),
            pessoa.estado.as_str(),
            data_registro.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn csv_bytes(pessoas: &[Pessoa]) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    write_csv(pessoas, &mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pessoas::domain::{PessoaId, Sexo};
    use chrono::NaiveDate;

    fn pessoa(id: i64, nome: &str, endereco: &str) -> Pessoa {
        Pessoa {
            id: PessoaId(id),
            nome: nome.to_string(),
            data_nascimento: NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid"),
            sexo: Sexo::Outro,
            cpf: format!("{id:03}"),
            email: "contato@example.com".to_string(),
            celular: "11 90000-0000".to_string(),
            endereco: endereco.to_string(),
            bairro: "Centro".to_string(),
            cidade: "Recife".to_string(),
            estado: "PE".to_string(),
            data_registro: NaiveDate::from_ymd_opt(2024, 6, 30).expect("valid"),
        }
    }

    #[test]
    fn starts_with_bom_and_fixed_header() {
        let bytes = csv_bytes(&[]).expect("export succeeds");
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).expect("utf8");
        assert_eq!(
            text,
            "Nome;CPF;Celular;Email;Endereço;Bairro;Cidade;Estado;Data de Registro\n"
        );
    }

    #[test]
    fn quotes_values_containing_delimiter_or_quotes() {
        let bytes = csv_bytes(&[pessoa(1, "Ana \"Nina\" Lima", "Rua A; casa 2")])
            .expect("export succeeds");
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).expect("utf8");
        let row = text.lines().nth(1).expect("data row");
        assert_eq!(
            row,
            "\"Ana \"\"Nina\"\" Lima\";001;11 90000-0000;contato@example.com;\"Rua A; casa 2\";Centro;Recife;PE;2024-06-30"
        );
    }

    #[test]
    fn one_row_per_record_in_order() {
        let pessoas = vec![pessoa(1, "Bruno", "Rua 1"), pessoa(2, "Alice", "Rua 2")];
        let bytes = csv_bytes(&pessoas).expect("export succeeds");
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .from_reader(&bytes[UTF8_BOM.len()..]);
        let names: Vec<String> = reader
            .records()
            .map(|record| record.expect("row")[0].to_string())
            .collect();
        assert_eq!(names, vec!["Bruno", "Alice"]);
    }
}
