//! Standalone preprocessor driver: tokenize a source file, run the
//! directive state machine, and emit the resulting token stream.
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use v32_assembler::lexer::Lexer;
use v32_assembler::preprocessor::Preprocessor;
use v32_assembler::tokens::Token;
use v32_assembler::tokens::TokenKind;

#[derive(Parser)]
#[command(name = "v32-asm-pp")]
#[command(about = "Run the V32 assembler preprocessor on a source file")]
struct Args {
    /// Assembly source file to preprocess
    input: PathBuf,

    /// Write the processed token stream here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "info" } else { "warn" }),
    )
    .init();

    let lexer = match Lexer::tokenize_file(&args.input) {
        Ok(lexer) => lexer,
        Err(error) => {
            eprintln!("{:#}", error);
            return ExitCode::FAILURE;
        }
    };

    let mut preprocessor = Preprocessor::new();
    if let Err(error) = preprocessor.preprocess(lexer) {
        for warning in preprocessor.warnings() {
            eprintln!("{}", warning);
        }
        eprintln!("{}", error);
        return ExitCode::FAILURE;
    }
    for warning in preprocessor.warnings() {
        eprintln!("{}", warning);
    }

    let tokens = preprocessor.take_processed_tokens();
    let result = match &args.output {
        Some(path) => File::create(path)
            .map(|file| BufWriter::new(file))
            .and_then(|mut writer| write_tokens(&mut writer, &tokens)),
        None => write_tokens(&mut std::io::stdout().lock(), &tokens),
    };
    if let Err(error) = result {
        eprintln!("cannot write output: {}", error);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// One output line per source line, markers omitted.
fn write_tokens(writer: &mut impl Write, tokens: &[Token]) -> std::io::Result<()> {
    let mut current_line: Option<(String, u32)> = None;
    for token in tokens {
        if matches!(token.kind, TokenKind::StartOfFile | TokenKind::EndOfFile) {
            continue;
        }
        let token_line = (token.location.file.clone(), token.location.line);
        match &current_line {
            Some(line) if *line == token_line => write!(writer, " {}", token)?,
            Some(_) => write!(writer, "\n{}", token)?,
            None => write!(writer, "{}", token)?,
        }
        current_line = Some(token_line);
    }
    writeln!(writer)
}
