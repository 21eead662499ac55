use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use loxide as lox;

use clap::error::ErrorKind;
use clap::Parser as ClapParser;
use clap::Subcommand;

use lox::ast::ExprId;
use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Script to execute; omit it (and any subcommand) for a REPL
    filename: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes the provided input and prints one token per line
    Tokenize { filename: PathBuf },

    /// Parses the provided input and prints the AST of each statement
    Parse { filename: PathBuf },

    /// Executes the provided input (the default when only a filename is given)
    Run { filename: Option<PathBuf> },
}

/// Exit codes, following the sysexits convention the language test suites
/// expect.
const EX_USAGE: u8 = 64;
const EX_DATAERR: u8 = 65;
const EX_SOFTWARE: u8 = 70;

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();

    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,

        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = e.print();
                return Ok(ExitCode::SUCCESS);
            }

            _ => {
                let _ = e.print();
                return Ok(ExitCode::from(EX_USAGE));
            }
        },
    };

    let code = match args.command {
        Some(Commands::Tokenize { filename }) => tokenize(&read_source(&filename)?),

        Some(Commands::Parse { filename }) => parse(&read_source(&filename)?),

        Some(Commands::Run { filename }) => match filename.or(args.filename) {
            Some(filename) => run_file(&read_source(&filename)?),
            None => run_prompt()?,
        },

        None => match args.filename {
            Some(filename) => run_file(&read_source(&filename)?),
            None => run_prompt()?,
        },
    };

    Ok(code)
}

fn read_source(filename: &Path) -> anyhow::Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    let mut reader: BufReader<File> = BufReader::new(File::open(filename)?);
    reader.read_to_end(&mut buf)?;

    Ok(buf)
}

/// `tokenize`: print every token, surface every scan error, then exit 65 if
/// any error occurred.
fn tokenize(source: &[u8]) -> ExitCode {
    let scanner = Scanner::new(source);
    let mut tokenized = true;

    for token in scanner {
        match token {
            Ok(token) => println!("{}", token),

            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if tokenized {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EX_DATAERR)
    }
}

/// `parse`: print the parenthesized form of each statement, or every
/// diagnostic and exit 65.
fn parse(source: &[u8]) -> ExitCode {
    let (tokens, had_scan_error) = scan(source);

    if had_scan_error {
        return ExitCode::from(EX_DATAERR);
    }

    let mut parser = Parser::new(tokens);
    let statements = parser.parse();

    if !parser.errors().is_empty() {
        for e in parser.errors() {
            eprintln!("{}", e);
        }

        return ExitCode::from(EX_DATAERR);
    }

    for stmt in &statements {
        println!("{}", AstPrinter::print_stmt(stmt));
    }

    ExitCode::SUCCESS
}

fn run_file(source: &[u8]) -> ExitCode {
    let mut driver = Driver::new();

    driver.run(source);

    if driver.had_error {
        return ExitCode::from(EX_DATAERR);
    }

    if driver.had_runtime_error {
        return ExitCode::from(EX_SOFTWARE);
    }

    ExitCode::SUCCESS
}

/// Read-eval-print loop: one line at a time until EOF.  Interpreter state
/// (globals and the resolution table) persists across lines; the error flags
/// are cleared before each new line.
fn run_prompt() -> anyhow::Result<ExitCode> {
    let mut driver = Driver::new();

    let stdin = std::io::stdin();

    print!("> ");
    std::io::stdout().flush()?;

    for line in stdin.lock().lines() {
        let line = line?;

        driver.run(line.as_bytes());

        driver.had_error = false;
        driver.had_runtime_error = false;

        print!("> ");
        std::io::stdout().flush()?;
    }

    Ok(ExitCode::SUCCESS)
}

/// Scan the whole source, reporting errors to stderr.  Always ends with an
/// EOF token, errors or not.
fn scan(source: &[u8]) -> (Vec<Token>, bool) {
    let scanner = Scanner::new(source);

    let mut tokens: Vec<Token> = Vec::new();
    let mut had_error = false;

    for result in scanner {
        match result {
            Ok(token) => tokens.push(token),

            Err(e) => {
                had_error = true;
                eprintln!("{}", e);
            }
        }
    }

    (tokens, had_error)
}

/// Aggregates the per-stage error state the pipeline stages report by value.
struct Driver {
    interpreter: Interpreter,
    next_expr_id: ExprId,
    had_error: bool,
    had_runtime_error: bool,
}

impl Driver {
    fn new() -> Self {
        Driver {
            interpreter: Interpreter::new(),
            next_expr_id: 0,
            had_error: false,
            had_runtime_error: false,
        }
    }

    /// Full pipeline over one source buffer.  Each stage runs only if every
    /// earlier stage finished without a static error.
    fn run(&mut self, source: &[u8]) {
        let (tokens, had_scan_error) = scan(source);

        if had_scan_error {
            self.had_error = true;
            return;
        }

        let mut parser = Parser::with_id_base(tokens, self.next_expr_id);
        let statements = parser.parse();
        self.next_expr_id = parser.next_id();

        if self.report(parser.errors()) {
            return;
        }

        let mut resolver = Resolver::new(&mut self.interpreter);
        resolver.resolve(&statements);

        let resolve_errors = resolver.into_errors();
        if self.report(&resolve_errors) {
            return;
        }

        if let Err(e) = self.interpreter.interpret(&statements) {
            eprintln!("{}", e);
            self.had_runtime_error = true;
        }
    }

    /// Print a batch of static diagnostics; true if there were any.
    fn report(&mut self, errors: &[LoxError]) -> bool {
        for e in errors {
            eprintln!("{}", e);
        }

        if errors.is_empty() {
            false
        } else {
            self.had_error = true;
            true
        }
    }
}
