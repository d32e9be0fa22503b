use crate::infra::open_service;
use cadastro::config::AppConfig;
use cadastro::error::AppError;
use cadastro::pessoas::Attachment;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub(crate) enum ExportCommand {
    /// Semicolon-separated CSV with a UTF-8 BOM
    Csv(ExportArgs),
    /// Tabular PDF with name, CPF, phone and e-mail columns
    Pdf(ExportArgs),
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Destination file
    #[arg(long)]
    pub(crate) output: PathBuf,
    /// Override the configured SQLite database path
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
}

pub(crate) fn run_export(command: ExportCommand) -> Result<(), AppError> {
    let (args, attachment) = match command {
        ExportCommand::Csv(args) => {
            let service = open_service(&database_path(&args)?)?;
            let attachment = service.export_csv()?;
            (args, attachment)
        }
        ExportCommand::Pdf(args) => {
            let service = open_service(&database_path(&args)?)?;
            let attachment = service.export_table_pdf()?;
            (args, attachment)
        }
    };

    write_attachment(&attachment, &args.output)?;
    println!(
        "Wrote {} ({} bytes, {}) to {}",
        attachment.filename,
        attachment.bytes.len(),
        attachment.content_type,
        args.output.display()
    );
    Ok(())
}

fn database_path(args: &ExportArgs) -> Result<PathBuf, AppError> {
    match &args.database {
        Some(path) => Ok(path.clone()),
        None => Ok(AppConfig::load()?.database.path),
    }
}

fn write_attachment(attachment: &Attachment, output: &Path) -> Result<(), AppError> {
    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, &attachment.bytes)?;
    Ok(())
}
