//! Minimal line tokenizer feeding the preprocessor.
//!
//! Only the lexical shapes the preprocessor cares about are produced:
//! identifiers, numeric and string literals, the assembler's symbol set
//! and the file framing markers. Lines keep their identity; the
//! preprocessor works line by line.
use std::path::Path;
use std::path::PathBuf;
use std::str::Chars;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;

use crate::tokens::SourceLocation;
use crate::tokens::Symbol;
use crate::tokens::Token;
use crate::tokens::TokenKind;

pub struct Lexer {
    /// Token lines, framed by a start-of-file and an end-of-file line.
    pub token_lines: Vec<Vec<Token>>,
    /// Folder of the tokenized file; include paths resolve against it.
    pub input_directory: PathBuf,
    pub file_name: String,
}

impl Lexer {
    pub fn tokenize_file(path: &Path) -> Result<Lexer> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read source file {:?}", path))?;
        let file_name = path.to_string_lossy().to_string();
        let input_directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::tokenize_source(&source, &file_name, input_directory)
    }

    pub fn tokenize_source(
        source: &str,
        file_name: &str,
        input_directory: PathBuf,
    ) -> Result<Lexer> {
        let mut token_lines = Vec::new();
        token_lines.push(vec![Token {
            kind: TokenKind::StartOfFile,
            location: SourceLocation {
                file: file_name.to_string(),
                line: 1,
            },
        }]);

        let mut last_line = 1;
        for (index, line) in source.lines().enumerate() {
            let line_number = index as u32 + 1;
            last_line = line_number;
            let tokens = tokenize_line(line, file_name, line_number)?;
            if !tokens.is_empty() {
                token_lines.push(tokens);
            }
        }

        token_lines.push(vec![Token {
            kind: TokenKind::EndOfFile,
            location: SourceLocation {
                file: file_name.to_string(),
                line: last_line,
            },
        }]);

        Ok(Lexer {
            token_lines,
            input_directory,
            file_name: file_name.to_string(),
        })
    }
}

fn tokenize_line(line: &str, file: &str, line_number: u32) -> Result<Vec<Token>> {
    let location = SourceLocation {
        file: file.to_string(),
        line: line_number,
    };
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&character) = chars.peek() {
        match character {
            // a comment ends the line
            ';' => break,
            character if character.is_whitespace() => {
                chars.next();
            }
            character if character.is_ascii_alphabetic() || character == '_' => {
                tokens.push(Token {
                    kind: TokenKind::Identifier(read_identifier(&mut chars)),
                    location: location.clone(),
                });
            }
            character if character.is_ascii_digit() => {
                tokens.push(Token {
                    kind: read_number(&mut chars, &location)?,
                    location: location.clone(),
                });
            }
            '"' => {
                tokens.push(Token {
                    kind: TokenKind::StringLiteral(read_string(&mut chars, &location)?),
                    location: location.clone(),
                });
            }
            character => {
                let symbol = match character {
                    '%' => Symbol::Percent,
                    ',' => Symbol::Comma,
                    ':' => Symbol::Colon,
                    '+' => Symbol::Plus,
                    '-' => Symbol::Minus,
                    '[' => Symbol::OpenBracket,
                    ']' => Symbol::CloseBracket,
                    other => bail!("{}: invalid character '{}'", location, other),
                };
                chars.next();
                tokens.push(Token {
                    kind: TokenKind::Symbol(symbol),
                    location: location.clone(),
                });
            }
        }
    }
    Ok(tokens)
}

fn read_identifier(chars: &mut std::iter::Peekable<Chars>) -> String {
    let mut name = String::new();
    while let Some(&character) = chars.peek() {
        if character.is_ascii_alphanumeric() || character == '_' {
            name.push(character);
            chars.next();
        } else {
            break;
        }
    }
    name
}

fn read_number(
    chars: &mut std::iter::Peekable<Chars>,
    location: &SourceLocation,
) -> Result<TokenKind> {
    let mut text = String::new();
    while let Some(&character) = chars.peek() {
        if character.is_ascii_alphanumeric() || character == '.' {
            text.push(character);
            chars.next();
        } else {
            break;
        }
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        let value = u32::from_str_radix(hex, 16)
            .with_context(|| format!("{}: invalid hexadecimal literal '{}'", location, text))?;
        return Ok(TokenKind::IntegerLiteral(value as i32));
    }
    if text.contains('.') {
        let value: f32 = text
            .parse()
            .with_context(|| format!("{}: invalid float literal '{}'", location, text))?;
        return Ok(TokenKind::FloatLiteral(value));
    }
    let value: i32 = text
        .parse()
        .with_context(|| format!("{}: invalid integer literal '{}'", location, text))?;
    Ok(TokenKind::IntegerLiteral(value))
}

fn read_string(
    chars: &mut std::iter::Peekable<Chars>,
    location: &SourceLocation,
) -> Result<String> {
    chars.next(); // opening quote
    let mut value = String::new();
    loop {
        match chars.next() {
            None => bail!("{}: unterminated string literal", location),
            Some('"') => return Ok(value),
            Some('\\') => match chars.next() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(escaped @ ('"' | '\\')) => value.push(escaped),
                _ => bail!("{}: invalid escape sequence in string", location),
            },
            Some(character) => value.push(character),
        }
    }
}
