use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use xlang_driver::Diagnostic;
use xlang_ir::interp::{Interpreter, DEFAULT_STEP_LIMIT};
use xlang_ir::{LowerOptions, RedeclarationPolicy};
use xlang_lexer::TokenKind;

#[derive(Parser)]
#[command(
    name = "xlang",
    version = "0.1.0",
    about = "Compiler for the X language",
    long_about = "Compiles X programs to a typed IR and to native object files\nthrough Cranelift."
)]
struct Cli {
    /// Enable verbose (debug) logging; RUST_LOG overrides
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an X file to IR text or an object file
    Compile {
        /// Input X file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// What to emit
        #[arg(long, default_value = "obj")]
        emit: EmitMode,

        #[command(flatten)]
        lowering: LoweringFlags,
    },

    /// Check an X file for errors without generating code
    Check {
        /// Input X file
        input: PathBuf,

        #[command(flatten)]
        lowering: LoweringFlags,
    },

    /// Lex an X file and show tokens (debug)
    Lex {
        /// Input X file
        input: PathBuf,

        /// Show token positions
        #[arg(short, long)]
        positions: bool,
    },

    /// Parse an X file and show the AST (debug)
    Parse {
        /// Input X file
        input: PathBuf,
    },

    /// Execute a function with the IR interpreter and print its result
    Run {
        /// Input X file
        input: PathBuf,

        /// Function to call
        #[arg(long, default_value = "main")]
        entry: String,

        /// Maximum number of executed instructions
        #[arg(long, default_value_t = DEFAULT_STEP_LIMIT)]
        step_limit: u64,

        /// Integer arguments passed to the entry function
        #[arg(allow_negative_numbers = true)]
        args: Vec<i32>,

        #[command(flatten)]
        lowering: LoweringFlags,
    },
}

#[derive(Args, Clone, Copy)]
struct LoweringFlags {
    /// Allow calls to functions defined later in the file
    #[arg(long)]
    forward_decls: bool,

    /// Reject a second declaration of the same name in one scope
    #[arg(long)]
    deny_redeclaration: bool,
}

impl From<LoweringFlags> for LowerOptions {
    fn from(flags: LoweringFlags) -> Self {
        LowerOptions {
            forward_declarations: flags.forward_decls,
            redeclaration: if flags.deny_redeclaration {
                RedeclarationPolicy::Reject
            } else {
                RedeclarationPolicy::Replace
            },
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EmitMode {
    /// Emit textual IR
    Ir,
    /// Emit a native object file (default)
    Obj,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Compile {
            input,
            output,
            emit,
            lowering,
        } => compile_command(&input, output, emit, lowering.into()),
        Commands::Check { input, lowering } => check_command(&input, lowering.into()),
        Commands::Lex { input, positions } => lex_command(&input, positions),
        Commands::Parse { input } => parse_command(&input),
        Commands::Run {
            input,
            entry,
            step_limit,
            args,
            lowering,
        } => run_command(&input, &entry, step_limit, &args, lowering.into()),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn compile_command(
    input: &Path,
    output: Option<PathBuf>,
    emit: EmitMode,
    options: LowerOptions,
) -> ExitCode {
    debug!(input = %input.display(), ?emit, "compiling");

    let Some(source) = read_source_file(input) else {
        return ExitCode::FAILURE;
    };
    let filename = input.to_string_lossy().to_string();

    let module = match xlang_driver::lower(&source, options) {
        Ok(module) => module,
        Err(errors) => {
            report_all(&errors, &filename, &source);
            return ExitCode::FAILURE;
        }
    };

    match emit {
        EmitMode::Ir => {
            let text = module.to_text();
            match output {
                Some(path) => write_output(&path, text.as_bytes()),
                None => {
                    print!("{}", text);
                    ExitCode::SUCCESS
                }
            }
        }
        EmitMode::Obj => {
            let bytes = match xlang_driver::compile_object(&module) {
                Ok(bytes) => bytes,
                Err(diag) => {
                    report(&diag, &filename, &source);
                    return ExitCode::FAILURE;
                }
            };
            let path = output.unwrap_or_else(|| input.with_extension("o"));
            write_output(&path, &bytes)
        }
    }
}

fn check_command(input: &Path, options: LowerOptions) -> ExitCode {
    let Some(source) = read_source_file(input) else {
        return ExitCode::FAILURE;
    };
    let filename = input.to_string_lossy().to_string();

    match xlang_driver::lower(&source, options) {
        Ok(_) => {
            println!("Check passed!");
            ExitCode::SUCCESS
        }
        Err(errors) => {
            report_all(&errors, &filename, &source);
            ExitCode::FAILURE
        }
    }
}

fn lex_command(input: &Path, positions: bool) -> ExitCode {
    let Some(source) = read_source_file(input) else {
        return ExitCode::FAILURE;
    };
    let filename = input.to_string_lossy().to_string();

    let (tokens, errors) = xlang_driver::lex(&source);

    println!("Tokens for {}:\n", filename);
    println!("{}", "=".repeat(80));

    for (i, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Eof {
            println!("\n{:4} | {:?}", i, token.kind);
            break;
        }

        if positions {
            println!(
                "{:4} | {:20?} | {:?} | {}..{}",
                i, token.kind, token.value, token.span.start, token.span.end
            );
        } else {
            println!("{:4} | {:20?} | {:?}", i, token.kind, token.value);
        }
    }

    println!("{}", "=".repeat(80));
    println!("\nTotal tokens: {}", tokens.len());

    if !errors.is_empty() {
        println!("\nLexer errors found: {}", errors.len());
        report_all(&errors, &filename, &source);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn parse_command(input: &Path) -> ExitCode {
    let Some(source) = read_source_file(input) else {
        return ExitCode::FAILURE;
    };
    let filename = input.to_string_lossy().to_string();

    match xlang_driver::parse(&source) {
        Ok(program) => {
            println!("{:#?}", program);
            ExitCode::SUCCESS
        }
        Err(errors) => {
            report_all(&errors, &filename, &source);
            ExitCode::FAILURE
        }
    }
}

fn run_command(
    input: &Path,
    entry: &str,
    step_limit: u64,
    args: &[i32],
    options: LowerOptions,
) -> ExitCode {
    let Some(source) = read_source_file(input) else {
        return ExitCode::FAILURE;
    };
    let filename = input.to_string_lossy().to_string();

    let module = match xlang_driver::lower(&source, options) {
        Ok(module) => module,
        Err(errors) => {
            report_all(&errors, &filename, &source);
            return ExitCode::FAILURE;
        }
    };

    let mut interpreter = Interpreter::new(&module).with_step_limit(step_limit);
    let result = interpreter.call(entry, args);
    debug!(steps = interpreter.steps(), "interpreter finished");

    match result {
        Ok(Some(value)) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Runtime error: {}", err);
            ExitCode::FAILURE
        }
    }
}

// Helper functions

fn read_source_file(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(source) => Some(source),
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            None
        }
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> ExitCode {
    match fs::write(path, bytes) {
        Ok(()) => {
            debug!(output = %path.display(), bytes = bytes.len(), "wrote output");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error writing {}: {}", path.display(), e);
            ExitCode::FAILURE
        }
    }
}

fn report_all(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        report(diag, filename, source);
    }
}

fn report(diag: &Diagnostic, filename: &str, source: &str) {
    let Some(span) = diag.span else {
        eprintln!("error[{}]: {}: {}", diag.code, diag.title, diag.message);
        return;
    };

    let start = span.start.min(source.len());
    let end = span.end.clamp(start, source.len());
    let span = (filename, start..end);
    let _ = Report::build(ReportKind::Error, span.clone())
        .with_config(Config::default().with_index_type(IndexType::Byte))
        .with_code(diag.code)
        .with_message(diag.title)
        .with_label(
            Label::new(span)
                .with_message(&diag.message)
                .with_color(Color::Red),
        )
        .finish()
        .eprint((filename, Source::from(source)));
}
