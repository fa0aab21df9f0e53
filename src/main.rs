use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rowstore::{EMAIL_SIZE, Error, Row, Table, USERNAME_SIZE, persistence};
use tracing_subscriber::{EnvFilter, fmt};

/// A single-table row store with an interactive prompt
#[derive(Parser, Debug)]
#[command(name = "rowstore")]
#[command(version)]
struct Args {
    /// Database file, created on exit if missing
    #[arg(default_value = "dbone.db")]
    filename: PathBuf,
}

struct InputBuffer {
    raw: Vec<u8>,
    buffer: String,
}

enum ReadOutcome {
    Line,
    InvalidUtf8,
    Eof,
}

impl InputBuffer {
    fn new() -> Self {
        Self {
            raw: Vec::new(),
            buffer: String::new(),
        }
    }

    /// Reads one line. A line that is not UTF-8 is consumed and reported
    /// without ending the session.
    fn read_input(&mut self, input: &mut impl BufRead) -> io::Result<ReadOutcome> {
        self.raw.clear();
        self.buffer.clear();
        if input.read_until(b'\n', &mut self.raw)? == 0 {
            return Ok(ReadOutcome::Eof);
        }
        match std::str::from_utf8(&self.raw) {
            Ok(line) => {
                self.buffer.push_str(line.trim());
                Ok(ReadOutcome::Line)
            }
            Err(_) => Ok(ReadOutcome::InvalidUtf8),
        }
    }
}

// Non-SQL statements like .exit are called “meta-commands”.
enum MetaCommands {
    Exit,
    Unrecognized,
}

impl MetaCommands {
    fn parse(input: &str) -> Option<MetaCommands> {
        match input {
            ".exit" => Some(MetaCommands::Exit),
            _ => {
                if input.starts_with('.') {
                    Some(MetaCommands::Unrecognized)
                } else {
                    None
                }
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum Statement {
    Select,
    Insert(Row),
}

#[derive(Debug, PartialEq, thiserror::Error)]
enum PrepareError {
    #[error("Syntax error. Could not parse statement.")]
    Syntax,
    #[error("ID must be positive.")]
    NegativeId,
    #[error("String is too long.")]
    StringTooLong,
    #[error("Unrecognized command: {0}")]
    Unrecognized(String),
}

impl Statement {
    fn prepare(input: &str) -> Result<Statement, PrepareError> {
        let mut tokens = input.split_whitespace();
        match tokens.next() {
            Some("select") => Ok(Statement::Select),
            Some("insert") => Self::prepare_insert(tokens),
            _ => Err(PrepareError::Unrecognized(input.to_string())),
        }
    }

    fn prepare_insert<'a>(
        mut tokens: impl Iterator<Item = &'a str>,
    ) -> Result<Statement, PrepareError> {
        let (Some(id), Some(username), Some(email)) = (tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(PrepareError::Syntax);
        };

        let id: i64 = id.parse().map_err(|_| PrepareError::Syntax)?;
        if id < 0 {
            return Err(PrepareError::NegativeId);
        }
        let id = u32::try_from(id).map_err(|_| PrepareError::Syntax)?;

        // The codec truncates silently, so reject overlong input here.
        if username.len() > USERNAME_SIZE || email.len() > EMAIL_SIZE {
            return Err(PrepareError::StringTooLong);
        }

        Ok(Statement::Insert(Row::new(id, username, email)))
    }
}

enum InputType {
    Meta(MetaCommands),
    Statement(Result<Statement, PrepareError>),
}

impl InputType {
    fn parse(input: &str) -> InputType {
        if let Some(meta) = MetaCommands::parse(input) {
            InputType::Meta(meta)
        } else {
            InputType::Statement(Statement::prepare(input))
        }
    }
}

fn execute(statement: Statement, table: &mut Table) -> Result<(), Error> {
    match statement {
        Statement::Insert(row) => table.insert(&row)?,
        Statement::Select => {
            for row in table.scan() {
                println!("{row}");
            }
        }
    }
    Ok(())
}

fn print_prompt() -> io::Result<()> {
    print!("db > ");
    io::stdout().flush()
}

fn run(table: &mut Table, input: &mut impl BufRead) -> io::Result<()> {
    let mut input_buffer = InputBuffer::new();

    loop {
        print_prompt()?;
        match input_buffer.read_input(&mut *input)? {
            ReadOutcome::Line => {}
            ReadOutcome::InvalidUtf8 => {
                println!("Failed to read input: line is not valid UTF-8.");
                continue;
            }
            ReadOutcome::Eof => return Ok(()),
        }

        match InputType::parse(&input_buffer.buffer) {
            InputType::Meta(MetaCommands::Exit) => return Ok(()),
            InputType::Meta(MetaCommands::Unrecognized) => {
                println!("Unrecognized meta-command: {}", input_buffer.buffer);
            }
            InputType::Statement(Ok(statement)) => match execute(statement, table) {
                Ok(()) => println!("Executed."),
                Err(e) => println!("Error: {e}"),
            },
            InputType::Statement(Err(e)) => println!("{e}"),
        }
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut table = persistence::open_table(&args.filename);

    if let Err(e) = run(&mut table, &mut io::stdin().lock()) {
        tracing::error!("Failed to read input: {}", e);
    }

    if let Err(e) = persistence::flush_table(&args.filename, &table) {
        tracing::error!("Failed to write {}: {}", args.filename.display(), e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
