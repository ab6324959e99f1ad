//! msgback: decrypt and export encrypted messenger backup files.
//!
//! Usage:
//!   msgback format  -p PASS -f xml backup.bin -o report.xml
//!   msgback extract -p PASS -o attachments/ backup.bin
//!   msgback analyse -p PASS backup.bin
//!   msgback check   -p PASS backup.bin

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use msgback_rs::export::{AttachmentExtractor, CsvExporter, RawDumper, XmlExporter};
use msgback_rs::proto::SqlStatement;
use msgback_rs::{BackupReader, Consumer, ConsumerResult, WalkStats};

#[derive(Parser, Debug)]
#[command(name = "msgback", version, about = "Decrypt and export messenger backup files")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Use PASS as the backup password
    #[arg(short, long, global = true)]
    password: Option<String>,

    /// Read the backup password from FILE
    #[arg(short = 'P', long, global = true)]
    pwdfile: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MSGBACK_LOG", default_value = "warn", global = true)]
    log: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read and transform the backup into another format
    Format {
        /// Path to the backup file
        backup: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value = "xml")]
        format: OutputFormat,
        /// Table to flatten when the format is csv
        #[arg(short, long, default_value = "sms")]
        message: String,
        /// Write the formatted output to FILE instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Retrieve attachments and avatars from the backup
    Extract {
        /// Path to the backup file
        backup: PathBuf,
        /// Output attachments to DIRECTORY
        #[arg(short, long, default_value = ".")]
        outdir: PathBuf,
    },
    /// Statistical information about the backup contents
    #[command(alias = "analyze")]
    Analyse {
        /// Path to the backup file
        backup: PathBuf,
    },
    /// Verify that the backup is readable from start to finish
    Check {
        /// Path to the backup file
        backup: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Xml,
    Csv,
    Raw,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    let password = read_password(&cli)?;

    match &cli.command {
        Command::Format {
            backup,
            format,
            message,
            output,
        } => {
            let mut reader = open(backup, &password)?;
            let mut out = open_output(output.as_deref())?;
            match format {
                OutputFormat::Xml => {
                    let mut exporter = XmlExporter::new();
                    reader.walk(&mut exporter).context("failed to format output")?;
                    exporter
                        .finish(&mut out)
                        .map_err(|e| anyhow!("failed to write XML report: {e}"))?;
                }
                OutputFormat::Csv => {
                    let mut exporter = CsvExporter::new(message, &mut out)
                        .context("failed to start CSV output")?;
                    reader.walk(&mut exporter).context("failed to format output")?;
                    exporter.finish().context("failed to flush CSV output")?;
                }
                OutputFormat::Raw => {
                    let mut dumper = RawDumper::new(&mut out);
                    reader.walk(&mut dumper).context("failed to format output")?;
                }
            }
            out.flush()?;
        }
        Command::Extract { backup, outdir } => {
            std::fs::create_dir_all(outdir).context("unable to create output directory")?;
            let mut reader = open(backup, &password)?;
            let mut extractor = AttachmentExtractor::new(outdir);
            reader
                .walk(&mut extractor)
                .context("failed to extract attachments")?;
            info!(files = extractor.written(), "extraction complete");
            eprintln!("extracted {} files to {}", extractor.written(), outdir.display());
        }
        Command::Analyse { backup } => {
            let mut reader = open(backup, &password)?;
            let mut analyser = Analyser::default();
            let stats = reader.walk(&mut analyser).context("failed to analyse backup")?;
            print_analysis(&analyser, &stats);
        }
        Command::Check { backup } => {
            let mut reader = open(backup, &password)?;
            let mut devnull = NullConsumer;
            let stats = reader.walk(&mut devnull).context("backup failed verification")?;
            eprintln!(
                "backup looks okay: {} frames, {} statements, {} attachment(s), {} avatar(s)",
                stats.frames, stats.statements, stats.attachments, stats.avatars
            );
        }
    }

    Ok(())
}

fn open(path: &Path, password: &str) -> Result<BackupReader<io::BufReader<File>>> {
    BackupReader::open(path, password).context("failed to open backup file")
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).context("unable to open output file")?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

fn read_password(cli: &Cli) -> Result<String> {
    if let Some(pass) = &cli.password {
        return Ok(pass.clone());
    }
    if let Some(path) = &cli.pwdfile {
        return std::fs::read_to_string(path).context("unable to read password file");
    }
    if !io::stdin().is_terminal() {
        let mut pass = String::new();
        io::stdin().read_to_string(&mut pass)?;
        if pass.trim().is_empty() {
            bail!("no password provided (use --password or --pwdfile)");
        }
        return Ok(pass);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    rpassword::read_password().context("unable to read password from terminal")
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

/// Consumes everything and keeps nothing; `check` only wants the walk.
struct NullConsumer;

impl<R: Read> Consumer<R> for NullConsumer {}

/// Frequency count of statement shapes, for `analyse`.
#[derive(Default)]
struct Analyser {
    counts: BTreeMap<String, u64>,
}

impl Analyser {
    fn bump(&mut self, key: String) {
        *self.counts.entry(key).or_insert(0) += 1;
    }
}

impl<R: Read> Consumer<R> for Analyser {
    fn on_statement(&mut self, statement: &SqlStatement) -> ConsumerResult {
        let sql = statement.sql();
        let key = if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            let table = rest.split_whitespace().next().unwrap_or("?");
            format!("insert_into_{table}")
        } else if sql.starts_with("CREATE TABLE") {
            "create_table".to_owned()
        } else if sql.starts_with("DROP TABLE") {
            "drop_table".to_owned()
        } else if sql.starts_with("CREATE INDEX") || sql.starts_with("CREATE UNIQUE INDEX") {
            "create_index".to_owned()
        } else if sql.starts_with("DROP INDEX") {
            "drop_index".to_owned()
        } else {
            "other_stmt".to_owned()
        };
        self.bump(key);
        Ok(())
    }
}

fn print_analysis(analyser: &Analyser, stats: &WalkStats) {
    println!(
        "frames: {}  statements: {}  preferences: {}  versions: {}  attachments: {}  avatars: {}",
        stats.frames,
        stats.statements,
        stats.preferences,
        stats.versions,
        stats.attachments,
        stats.avatars
    );
    println!("blob bytes: {}", stats.blob_bytes);
    for (key, count) in &analyser.counts {
        println!("{count:>8}  {key}");
    }
}
