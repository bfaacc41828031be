//! xlsxdoc - command-line interface
//!
//! Sheet inspection, row export to DOCX/Markdown, universal conversion and cleanup sweeps.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use xlsxdoc::{
    unique_output_path, CleanupSweeper, CommandMarkdownConverter, ExportFormat, ExportRequest,
    FillStrategy, HeaderPolicy, PreviewMode, Processor, ProcessorBuilder, SweepConfig,
    TemplateKind, TemplateSections, UniversalConverter, XlsxDocError,
};

/// xlsxdoc - extract cleaned spreadsheet rows into documents
#[derive(Parser)]
#[command(name = "xlsxdoc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the sheets of a workbook
    Sheets {
        /// Input workbook (.xlsx, .xlsm)
        file: PathBuf,
    },
    /// Show the first rows of a sheet
    Preview {
        file: PathBuf,
        #[arg(short, long)]
        sheet: String,
        /// Number of rows to return (clamped to 1..=50)
        #[arg(short, long, default_value_t = 10)]
        rows: usize,
        #[arg(long, value_enum, default_value_t = PreviewArg::LeadingBlock)]
        mode: PreviewArg,
    },
    /// Resolve the column names of a header row
    Headers {
        file: PathBuf,
        #[arg(short, long)]
        sheet: String,
        /// 1-based header row
        #[arg(long, default_value_t = 1)]
        header_row: u32,
        /// Drop blank header cells instead of naming them "Column {i}"
        #[arg(long)]
        skip_blank: bool,
    },
    /// Export selected columns as a paragraph-per-row DOCX document
    ExportDocx(ExportArgs),
    /// Export selected columns as a Markdown table
    ExportMarkdown {
        #[command(flatten)]
        export: ExportArgs,
        /// External converter program (reads the staging workbook path, writes Markdown to stdout)
        #[arg(long)]
        converter: Option<PathBuf>,
    },
    /// Convert any supported file to Markdown, optionally through a template
    Convert {
        file: PathBuf,
        #[arg(long, value_enum)]
        template: Option<TemplateArg>,
        /// JSON file with template sections
        #[arg(long, requires = "template")]
        sections: Option<PathBuf>,
        /// Custom template file with <VARIABLE> placeholders (content goes into <MAIN_CONTENT>)
        #[arg(long, conflicts_with = "template")]
        custom_template: Option<PathBuf>,
        /// Template variable (KEY=VALUE), used with --custom-template
        #[arg(long = "var", value_name = "KEY=VALUE", requires = "custom_template")]
        vars: Vec<String>,
        /// Markdown converter program
        #[arg(long, default_value = "markitdown")]
        converter: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Remove expired files from the upload and output directories
    Sweep {
        /// Directories to clean (defaults to the upload and output folders)
        #[arg(long = "dir")]
        dirs: Vec<PathBuf>,
        #[arg(long, env = "UPLOAD_FOLDER", default_value = "uploads")]
        upload_dir: PathBuf,
        #[arg(long, env = "OUTPUT_FOLDER", default_value = "outputs")]
        output_dir: PathBuf,
        /// Maximum file age in hours
        #[arg(long, env = "CLEANUP_HOURS", default_value_t = 24)]
        max_age_hours: u64,
        /// Keep sweeping every interval until stdin is closed or a line is entered
        #[arg(long)]
        watch: bool,
        #[arg(long, default_value_t = 60)]
        interval_minutes: u64,
    },
}

#[derive(Args)]
struct ExportArgs {
    file: PathBuf,
    #[arg(short, long)]
    sheet: String,
    /// Comma-separated column names, in output order
    #[arg(short, long, value_delimiter = ',', required = true)]
    columns: Vec<String>,
    #[arg(long, default_value_t = 1)]
    header_row: u32,
    #[arg(long, default_value_t = 2)]
    data_start_row: u32,
    #[arg(long)]
    data_end_row: Option<u32>,
    #[arg(long, value_enum, default_value_t = FillArg::MergeThenForward)]
    fill: FillArg,
    /// Output file (defaults to a unique name in the output directory)
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(long, env = "OUTPUT_FOLDER", default_value = "outputs")]
    output_dir: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum PreviewArg {
    Window,
    LeadingBlock,
    NonBlankRows,
}

impl From<PreviewArg> for PreviewMode {
    fn from(arg: PreviewArg) -> Self {
        match arg {
            PreviewArg::Window => PreviewMode::Window,
            PreviewArg::LeadingBlock => PreviewMode::LeadingBlock,
            PreviewArg::NonBlankRows => PreviewMode::NonBlankRows,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FillArg {
    MergeThenForward,
    MergeAware,
    ForwardFill,
}

impl From<FillArg> for FillStrategy {
    fn from(arg: FillArg) -> Self {
        match arg {
            FillArg::MergeThenForward => FillStrategy::MergeThenForward,
            FillArg::MergeAware => FillStrategy::MergeAware,
            FillArg::ForwardFill => FillStrategy::ForwardFill,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TemplateArg {
    ExcelList,
    WordDocument,
    Process,
    Policy,
}

impl From<TemplateArg> for TemplateKind {
    fn from(arg: TemplateArg) -> Self {
        match arg {
            TemplateArg::ExcelList => TemplateKind::ExcelList,
            TemplateArg::WordDocument => TemplateKind::WordDocument,
            TemplateArg::Process => TemplateKind::Process,
            TemplateArg::Policy => TemplateKind::Policy,
        }
    }
}

#[derive(Serialize)]
struct ExportSummary {
    output: PathBuf,
    rows: usize,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), XlsxDocError> {
    match command {
        Command::Sheets { file } => print_json(&xlsxdoc::list_sheets(&file)?),
        Command::Preview {
            file,
            sheet,
            rows,
            mode,
        } => {
            let processor = ProcessorBuilder::new().with_preview_mode(mode.into()).build()?;
            print_json(&processor.preview(&file, &sheet, rows)?)
        }
        Command::Headers {
            file,
            sheet,
            header_row,
            skip_blank,
        } => {
            let policy = if skip_blank {
                HeaderPolicy::Skip
            } else {
                HeaderPolicy::Placeholder
            };
            let processor = ProcessorBuilder::new().with_header_policy(policy).build()?;
            print_json(&processor.column_headers(&file, &sheet, header_row)?)
        }
        Command::ExportDocx(args) => {
            let processor = ProcessorBuilder::new()
                .with_fill_strategy(args.fill.into())
                .build()?;
            export(&processor, &args, ExportFormat::Docx)
        }
        Command::ExportMarkdown { export: args, converter } => {
            let mut builder = ProcessorBuilder::new().with_fill_strategy(args.fill.into());
            if let Some(program) = converter {
                builder = builder
                    .with_markdown_converter(Arc::new(CommandMarkdownConverter::new(program)));
            }
            export(&builder.build()?, &args, ExportFormat::Markdown)
        }
        Command::Convert {
            file,
            template,
            sections,
            custom_template,
            vars,
            converter,
            output,
        } => {
            let universal = UniversalConverter::new()?
                .with_converter(Arc::new(CommandMarkdownConverter::new(converter)));
            let markdown = match (template, custom_template) {
                (Some(kind), _) => {
                    let sections = match sections {
                        Some(path) => read_sections(&path)?,
                        None => TemplateSections::default(),
                    };
                    universal.convert_with_template(
                        &file,
                        kind.into(),
                        &sections,
                        output.as_deref(),
                    )?
                }
                (None, Some(path)) => {
                    let template = std::fs::read_to_string(&path).map_err(|e| {
                        XlsxDocError::Config(format!("Failed to read {}: {}", path.display(), e))
                    })?;
                    let variables = parse_vars(&vars)?;
                    universal.convert_with_custom_template(
                        &file,
                        &template,
                        &variables,
                        output.as_deref(),
                    )?
                }
                (None, None) => universal.convert_to_markdown(&file, output.as_deref())?,
            };
            if output.is_none() {
                println!("{markdown}");
            }
            Ok(())
        }
        Command::Sweep {
            dirs,
            upload_dir,
            output_dir,
            max_age_hours,
            watch,
            interval_minutes,
        } => {
            let directories = if dirs.is_empty() {
                vec![upload_dir, output_dir]
            } else {
                dirs
            };
            let config = SweepConfig::new(directories)
                .with_max_age(Duration::from_secs(max_age_hours * 3600))
                .with_interval(Duration::from_secs(interval_minutes * 60));

            if watch {
                let sweeper = CleanupSweeper::start(config)?;
                info!("cleanup sweeper running; press Enter or close stdin to stop");
                let mut line = String::new();
                let _ = std::io::stdin().read_line(&mut line);
                sweeper.stop();
                Ok(())
            } else {
                print_json(&xlsxdoc::sweep_all(&config))
            }
        }
    }
}

fn export(
    processor: &Processor,
    args: &ExportArgs,
    format: ExportFormat,
) -> Result<(), XlsxDocError> {
    let mut request = ExportRequest::new(
        args.sheet.as_str(),
        args.columns.iter().map(String::as_str),
        args.header_row,
        args.data_start_row,
    );
    request.window.data_end_row = args.data_end_row;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| unique_output_path(&args.output_dir, format.extension()));
    let rows = processor.export(&args.file, &output, format, &request)?;
    print_json(&ExportSummary { output, rows })
}

fn parse_vars(vars: &[String]) -> Result<BTreeMap<String, String>, XlsxDocError> {
    vars.iter()
        .map(|var| {
            var.split_once('=')
                .map(|(key, value)| (key.trim().to_string(), value.to_string()))
                .ok_or_else(|| {
                    XlsxDocError::Config(format!(
                        "Invalid variable format: '{var}'. Expected KEY=VALUE format"
                    ))
                })
        })
        .collect()
}

fn read_sections(path: &Path) -> Result<TemplateSections, XlsxDocError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| XlsxDocError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| XlsxDocError::Config(format!("Invalid sections file {}: {}", path.display(), e)))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), XlsxDocError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| XlsxDocError::Render(format!("Failed to encode JSON: {}", e)))?;
    println!("{text}");
    Ok(())
}
