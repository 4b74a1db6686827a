use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("line {0}: unterminated block (missing `}};`)")]
    UnterminatedBlock(usize),
    #[error("line {0}: statement has no `=`")]
    NoEquals(usize),
    #[error("line {0}: unexpected `}}` outside of a block")]
    UnexpectedCloseBrace(usize),
    #[error("line {0}: `{{` is only allowed after `name = identifier`")]
    UnexpectedOpenBrace(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub key: String,
    pub value: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Assignment(Assignment),
    FilterDecl {
        name: String,
        body: Vec<Assignment>,
        line: usize,
    },
}

/// Strips `#`-to-end-of-line comments while preserving line breaks (so
/// error messages can still report accurate line numbers).
fn strip_comments(input: &str) -> String {
    input
        .lines()
        .map(|line| match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn split_assignment(stmt: &str, line: usize) -> Result<Assignment, LexError> {
    let eq = stmt.find('=').ok_or(LexError::NoEquals(line))?;
    Ok(Assignment {
        key: stmt[..eq].trim().to_string(),
        value: stmt[eq + 1..].trim().to_string(),
        line,
    })
}

/// Tokenizes the configuration file into top-level items (spec §4.5): a
/// filter declaration `name = ident { ...body... };`, or a bare
/// `key = value;` global assignment (`entry_point`, `port`, `socketfile`,
/// `log_format`, `include_explanation`).
pub fn lex(input: &str) -> Result<Vec<Item>, LexError> {
    let cleaned = strip_comments(input);
    let bytes = cleaned.as_bytes();
    let mut items = Vec::new();
    let mut pos = 0;
    let mut line = 1;

    while pos < bytes.len() {
        // Skip whitespace, tracking line numbers.
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            if bytes[pos] == b'\n' {
                line += 1;
            }
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        let stmt_start = pos;
        let stmt_start_line = line;
        let mut found = None;
        while pos < bytes.len() {
            match bytes[pos] {
                b'\n' => line += 1,
                b';' | b'{' => {
                    found = Some(bytes[pos]);
                    break;
                }
                b'}' => return Err(LexError::UnexpectedCloseBrace(line)),
                _ => {}
            }
            pos += 1;
        }

        let header = cleaned[stmt_start..pos].to_string();
        match found {
            Some(b';') => {
                pos += 1;
                items.push(Item::Assignment(split_assignment(&header, stmt_start_line)?));
            }
            Some(b'{') => {
                pos += 1;
                let assign = split_assignment(&header, stmt_start_line)?;
                if assign.key != "name" {
                    return Err(LexError::UnexpectedOpenBrace(stmt_start_line));
                }
                let mut body = Vec::new();
                loop {
                    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                        if bytes[pos] == b'\n' {
                            line += 1;
                        }
                        pos += 1;
                    }
                    if pos < bytes.len() && bytes[pos] == b'}' {
                        pos += 1;
                        if pos >= bytes.len() || bytes[pos] != b';' {
                            return Err(LexError::UnterminatedBlock(stmt_start_line));
                        }
                        pos += 1;
                        break;
                    }
                    if pos >= bytes.len() {
                        return Err(LexError::UnterminatedBlock(stmt_start_line));
                    }
                    let inner_start = pos;
                    let inner_line = line;
                    let mut inner_found = false;
                    while pos < bytes.len() {
                        match bytes[pos] {
                            b'\n' => line += 1,
                            b';' => {
                                inner_found = true;
                                break;
                            }
                            b'{' => return Err(LexError::UnexpectedOpenBrace(line)),
                            _ => {}
                        }
                        pos += 1;
                    }
                    if !inner_found {
                        return Err(LexError::UnterminatedBlock(stmt_start_line));
                    }
                    let inner = cleaned[inner_start..pos].to_string();
                    pos += 1;
                    body.push(split_assignment(&inner, inner_line)?);
                }
                items.push(Item::FilterDecl {
                    name: assign.value,
                    body,
                    line: stmt_start_line,
                });
            }
            None => {
                if header.trim().is_empty() {
                    break;
                }
                return Err(LexError::NoEquals(stmt_start_line));
            }
        }
    }

    Ok(items)
}
