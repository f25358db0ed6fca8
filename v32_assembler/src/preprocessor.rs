//! Directive preprocessor: include expansion, macro substitution and
//! conditional sections, applied to the lexer's token lines.
use std::collections::HashMap;
use std::path::PathBuf;

use log::warn;

use crate::lexer::Lexer;
use crate::tokens::SourceLocation;
use crate::tokens::Symbol;
use crate::tokens::Token;
use crate::tokens::TokenKind;

/// Preprocessing stops at the first error; the location names the
/// offending token's line.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
#[error("{file}:{line}: preprocessor error: {message}")]
pub struct PreprocessorError {
    pub file: String,
    pub line: u32,
    pub message: String,
}

/// Warnings are reported and preprocessing continues.
#[derive(Clone, Debug, PartialEq)]
pub struct PreprocessorWarning {
    pub file: String,
    pub line: u32,
    pub message: String,
}

impl std::fmt::Display for PreprocessorWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: preprocessor warning: {}",
            self.file, self.line, self.message
        )
    }
}

type PResult<T> = Result<T, PreprocessorError>;

fn error_at<T>(location: &SourceLocation, message: impl Into<String>) -> PResult<T> {
    Err(PreprocessorError {
        file: location.file.clone(),
        line: location.line,
        message: message.into(),
    })
}

// nesting limits; exceeding either points at a circular reference
const MAX_INCLUDE_DEPTH: usize = 20;
const MAX_REPLACEMENT_CYCLES: usize = 10;

/// One `%ifdef`/`%ifndef` frame.
struct IfContext {
    #[allow(dead_code)]
    starting_line: u32,
    condition_is_met: bool,
    else_was_found: bool,
}

impl IfContext {
    fn currently_met(&self) -> bool {
        if self.else_was_found {
            !self.condition_is_met
        } else {
            self.condition_is_met
        }
    }
}

/// One file being processed. Owns its cloned token lines; pushed on
/// `%include`, popped when the lines run out.
struct ProcessingContext {
    source_lines: Vec<Vec<Token>>,
    next_line: usize,
    /// Folder the file came from; relative includes resolve against it.
    reference_folder: PathBuf,
    if_stack: Vec<IfContext>,
}

impl ProcessingContext {
    fn from_lexer(lexer: Lexer) -> Self {
        Self {
            source_lines: lexer.token_lines,
            next_line: 0,
            reference_folder: lexer.input_directory,
            if_stack: Vec::new(),
        }
    }

    fn lines_have_ended(&self) -> bool {
        self.next_line >= self.source_lines.len()
    }

    fn current_line(&self) -> &[Token] {
        &self.source_lines[self.next_line]
    }

    fn advance(&mut self) {
        self.next_line += 1;
    }
}

#[derive(Default)]
pub struct Preprocessor {
    context_stack: Vec<ProcessingContext>,
    definitions: HashMap<String, Vec<Token>>,
    processed_tokens: Vec<Token>,
    warnings: Vec<PreprocessorWarning>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the whole directive state machine over a tokenized file.
    /// Prior state is discarded, so one instance can process many files.
    pub fn preprocess(&mut self, lexer: Lexer) -> PResult<()> {
        self.context_stack.clear();
        self.definitions.clear();
        self.processed_tokens.clear();
        self.warnings.clear();

        self.context_stack.push(ProcessingContext::from_lexer(lexer));
        while !self.context_stack.is_empty() {
            while !self.context_stack.last().unwrap().lines_have_ended() {
                // remember which context owned the line: processing an
                // include pushes a new one, and the pushed context must
                // not steal this context's advance
                let context_index = self.context_stack.len() - 1;
                self.process_line()?;
                self.context_stack[context_index].advance();
            }
            self.context_stack.pop();
        }
        Ok(())
    }

    pub fn processed_tokens(&self) -> &[Token] {
        &self.processed_tokens
    }

    pub fn take_processed_tokens(&mut self) -> Vec<Token> {
        std::mem::take(&mut self.processed_tokens)
    }

    pub fn warnings(&self) -> &[PreprocessorWarning] {
        &self.warnings
    }

    /// A line is live only while every frame of every stacked context's
    /// if-stack evaluates true.
    fn all_if_conditions_met(&self) -> bool {
        self.context_stack
            .iter()
            .flat_map(|context| context.if_stack.iter())
            .all(IfContext::currently_met)
    }

    fn process_line(&mut self) -> PResult<()> {
        let line: Vec<Token> = self.context_stack.last().unwrap().current_line().to_vec();
        if line.is_empty() {
            return Ok(());
        }

        // only the outermost file keeps its framing markers
        if self.context_stack.len() > 1
            && matches!(line[0].kind, TokenKind::StartOfFile | TokenKind::EndOfFile)
        {
            return Ok(());
        }

        let line_is_ignored = !self.all_if_conditions_met();
        let line_is_directive = line[0].is_symbol(Symbol::Percent);

        if !line_is_directive {
            if !line_is_ignored {
                let mut line = line;
                // keep replacing: definitions can use other definitions
                let mut cycles = 0;
                while self.replace_definitions(&mut line) {
                    cycles += 1;
                    if cycles > MAX_REPLACEMENT_CYCLES {
                        return error_at(
                            &line[0].location,
                            "definition replacement is too deep (possible circular reference)",
                        );
                    }
                }
                self.processed_tokens.extend(line);
            }
            return Ok(());
        }

        // empty directives are legal and vanish from the output
        if line.len() < 2 {
            return Ok(());
        }
        let directive = match line[1].identifier_name() {
            Some(name) => name.to_string(),
            None => return error_at(&line[1].location, "expected identifier"),
        };

        // inside a dead region only the conditional directives matter
        if line_is_ignored
            && !matches!(directive.as_str(), "ifdef" | "ifndef" | "else" | "endif")
        {
            return Ok(());
        }

        match directive.as_str() {
            "include" => {
                if self.context_stack.len() > MAX_INCLUDE_DEPTH {
                    return error_at(
                        &line[0].location,
                        "includes are too deeply nested (possible circular references)",
                    );
                }
                self.process_include(&line)
            }
            "define" => self.process_define(&line),
            "undef" => self.process_undef(&line),
            "ifdef" => self.process_if(&line, false),
            "ifndef" => self.process_if(&line, true),
            "else" => self.process_else(&line),
            "endif" => self.process_endif(&line),
            "error" => self.process_diagnostic(&line, false),
            "warning" => self.process_diagnostic(&line, true),
            other => error_at(
                &line[0].location,
                format!("unsupported preprocessor directive \"{}\"", other),
            ),
        }
    }

    /// Replaces every defined identifier in the line with a clone of its
    /// definition, rewriting locations to the use site. Returns whether
    /// anything changed; the caller iterates until stable.
    fn replace_definitions(&self, line: &mut Vec<Token>) -> bool {
        let mut replacements_made = false;
        let mut index = 0;
        while index < line.len() {
            let replacement = line[index]
                .identifier_name()
                .and_then(|name| self.definitions.get(name));
            let Some(value_tokens) = replacement else {
                index += 1;
                continue;
            };
            let location = line[index].location.clone();
            let clones: Vec<Token> = value_tokens
                .iter()
                .map(|token| token.relocated(&location))
                .collect();
            let inserted = clones.len();
            line.splice(index..index + 1, clones);
            // resume past the insertion; nested definitions get their
            // turn on the next cycle
            index += inserted;
            replacements_made = true;
        }
        replacements_made
    }

    fn process_include(&mut self, line: &[Token]) -> PResult<()> {
        let Some(path_token) = line.get(2) else {
            return error_at(&line[0].location, "include file path is missing");
        };
        let TokenKind::StringLiteral(file_path) = &path_token.kind else {
            return error_at(&path_token.location, "expected file path string");
        };
        if line.len() > 3 {
            return error_at(&line[3].location, "expected end of line");
        }

        // look for the file relative to the current reference directory
        let full_path = self
            .context_stack
            .last()
            .unwrap()
            .reference_folder
            .join(file_path);
        if !full_path.is_file() {
            return error_at(
                &path_token.location,
                format!("cannot open include file \"{}\"", file_path),
            );
        }
        let lexer = match Lexer::tokenize_file(&full_path) {
            Ok(lexer) => lexer,
            Err(error) => return error_at(&path_token.location, error.to_string()),
        };
        self.context_stack.push(ProcessingContext::from_lexer(lexer));
        Ok(())
    }

    fn process_define(&mut self, line: &[Token]) -> PResult<()> {
        let Some(name_token) = line.get(2) else {
            return error_at(&line[0].location, "definition name is missing");
        };
        let Some(name) = name_token.identifier_name() else {
            return error_at(&name_token.location, "expected identifier");
        };

        let mut value_tokens = Vec::new();
        for token in &line[3..] {
            // a definition may not name itself, nor smuggle in directives
            if token.identifier_name() == Some(name) {
                return error_at(
                    &token.location,
                    "a definition cannot contain itself (circular reference)",
                );
            }
            if token.is_symbol(Symbol::Percent) {
                return error_at(
                    &token.location,
                    "definitions cannot contain the percent symbol (%)",
                );
            }
            value_tokens.push(token.clone());
        }
        self.definitions.insert(name.to_string(), value_tokens);
        Ok(())
    }

    fn process_undef(&mut self, line: &[Token]) -> PResult<()> {
        let Some(name_token) = line.get(2) else {
            return error_at(&line[0].location, "definition name is missing");
        };
        let Some(name) = name_token.identifier_name() else {
            return error_at(&name_token.location, "expected identifier");
        };
        if line.len() > 3 {
            return error_at(&line[3].location, "expected end of line");
        }
        // removing an unknown name is fine
        self.definitions.remove(name);
        Ok(())
    }

    fn process_if(&mut self, line: &[Token], is_ifndef: bool) -> PResult<()> {
        let Some(name_token) = line.get(2) else {
            return error_at(&line[0].location, "expected an identifier");
        };
        let Some(name) = name_token.identifier_name() else {
            return error_at(&name_token.location, "expected identifier");
        };
        if line.len() > 3 {
            return error_at(&line[3].location, "expected end of line");
        }

        let definition_exists = self.definitions.contains_key(name);
        let context = self.context_stack.last_mut().unwrap();
        context.if_stack.push(IfContext {
            starting_line: line[0].location.line,
            condition_is_met: definition_exists == !is_ifndef,
            else_was_found: false,
        });
        Ok(())
    }

    fn process_else(&mut self, line: &[Token]) -> PResult<()> {
        if line.len() > 2 {
            return error_at(&line[2].location, "expected end of line");
        }
        let context = self.context_stack.last_mut().unwrap();
        let Some(frame) = context.if_stack.last_mut() else {
            return error_at(&line[0].location, "%else with no previous %if");
        };
        if frame.else_was_found {
            return error_at(&line[0].location, "%else can only be used once per %if");
        }
        frame.else_was_found = true;
        Ok(())
    }

    fn process_endif(&mut self, line: &[Token]) -> PResult<()> {
        if line.len() > 2 {
            return error_at(&line[2].location, "expected end of line");
        }
        let context = self.context_stack.last_mut().unwrap();
        if context.if_stack.pop().is_none() {
            return error_at(&line[0].location, "%endif with no previous %if");
        }
        Ok(())
    }

    fn process_diagnostic(&mut self, line: &[Token], warning_only: bool) -> PResult<()> {
        let Some(message_token) = line.get(2) else {
            return error_at(&line[1].location, "expected a string");
        };
        let TokenKind::StringLiteral(message) = &message_token.kind else {
            return error_at(&message_token.location, "expected a string");
        };
        if line.len() > 3 {
            return error_at(&line[3].location, "expected end of line");
        }

        if warning_only {
            let warning = PreprocessorWarning {
                file: line[0].location.file.clone(),
                line: line[0].location.line,
                message: message.clone(),
            };
            warn!("{}", warning);
            self.warnings.push(warning);
            Ok(())
        } else {
            error_at(&line[0].location, message.clone())
        }
    }
}
