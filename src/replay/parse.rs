//! Workload script parser
//!
//! One command per line. Words are separated by whitespace; double-quoted
//! strings may contain spaces and the escapes `\"`, `\\`, `\n` and `\0`.
//! `#` starts a comment outside of quotes.
//!
//! ```text
//! name  42 terminal
//! alloc 42 heap 1 100
//! alloc 42 shed 2
//! save  42 1 2 HISTORY "[\"ls\",\"pwd\"]"
//! load  42 1 2 HISTORY
//! check
//! ```

use super::errors::ParseError;
use crate::memory::Pid;

/// A parsed workload command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Name { pid: Pid, program: String },
    AllocHeap { pid: Pid, heap_id: i32, size: usize },
    AllocShed { pid: Pid, shed_id: i32 },
    Free { pid: Pid },
    Write { pid: Pid, heap_id: i32, text: String },
    Code { pid: Pid, shed_id: i32, line: String },
    Link { pid: Pid, shed_id: i32, key: String, value: String },
    Save { pid: Pid, heap_id: i32, shed_id: i32, key: String, payload: String },
    Load { pid: Pid, heap_id: i32, shed_id: i32, key: String },
    ScratchSave { component: String, key: String, payload: String },
    ScratchLoad { component: String, key: String },
    Check { pid: Option<Pid> },
}

/// A command with the script line it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub command: Command,
    pub line: usize,
    pub source: String,
}

/// Parse a whole script, skipping blank and comment-only lines
pub fn parse_script(source: &str) -> Result<Vec<Statement>, ParseError> {
    let mut statements = Vec::new();
    for (i, text) in source.lines().enumerate() {
        let line = i + 1;
        let words = tokenize(text, line)?;
        if words.is_empty() {
            continue;
        }
        let command = parse_command(&words, line)?;
        statements.push(Statement {
            command,
            line,
            source: text.trim().to_string(),
        });
    }
    Ok(statements)
}

fn parse_command(words: &[String], line: usize) -> Result<Command, ParseError> {
    let mut args = Args { words, pos: 1, line };
    let keyword = words[0].as_str();

    let command = match keyword {
        "name" => Command::Name {
            pid: args.number("pid")?,
            program: args.text("program")?,
        },
        "alloc" => {
            let pid = args.number("pid")?;
            match args.text("arena kind")?.as_str() {
                "heap" => Command::AllocHeap {
                    pid,
                    heap_id: args.number("heap id")?,
                    size: args.number("size")?,
                },
                "shed" => Command::AllocShed {
                    pid,
                    shed_id: args.number("shed id")?,
                },
                other => {
                    return Err(ParseError::new(
                        line,
                        format!("expected 'heap' or 'shed', found '{other}'"),
                    ))
                }
            }
        }
        "free" => Command::Free {
            pid: args.number("pid")?,
        },
        "write" => Command::Write {
            pid: args.number("pid")?,
            heap_id: args.number("heap id")?,
            text: args.text("text")?,
        },
        "code" => Command::Code {
            pid: args.number("pid")?,
            shed_id: args.number("shed id")?,
            line: args.text("code line")?,
        },
        "link" => Command::Link {
            pid: args.number("pid")?,
            shed_id: args.number("shed id")?,
            key: args.text("key")?,
            value: args.text("value")?,
        },
        "save" => Command::Save {
            pid: args.number("pid")?,
            heap_id: args.number("heap id")?,
            shed_id: args.number("shed id")?,
            key: args.text("key")?,
            payload: args.text("payload")?,
        },
        "load" => Command::Load {
            pid: args.number("pid")?,
            heap_id: args.number("heap id")?,
            shed_id: args.number("shed id")?,
            key: args.text("key")?,
        },
        "scratch" => match args.text("scratch action")?.as_str() {
            "save" => Command::ScratchSave {
                component: args.text("component")?,
                key: args.text("key")?,
                payload: args.text("payload")?,
            },
            "load" => Command::ScratchLoad {
                component: args.text("component")?,
                key: args.text("key")?,
            },
            other => {
                return Err(ParseError::new(
                    line,
                    format!("expected 'save' or 'load', found '{other}'"),
                ))
            }
        },
        "check" => Command::Check {
            pid: if args.remaining() > 0 {
                Some(args.number("pid")?)
            } else {
                None
            },
        },
        other => {
            return Err(ParseError::new(line, format!("unknown command '{other}'")));
        }
    };

    if args.remaining() > 0 {
        return Err(ParseError::new(
            line,
            format!("unexpected argument '{}' after {keyword}", words[args.pos]),
        ));
    }
    Ok(command)
}

struct Args<'a> {
    words: &'a [String],
    pos: usize,
    line: usize,
}

impl Args<'_> {
    fn text(&mut self, what: &str) -> Result<String, ParseError> {
        let word = self
            .words
            .get(self.pos)
            .ok_or_else(|| ParseError::new(self.line, format!("missing {what}")))?;
        self.pos += 1;
        Ok(word.clone())
    }

    fn number<T: std::str::FromStr>(&mut self, what: &str) -> Result<T, ParseError> {
        let word = self.text(what)?;
        word.parse()
            .map_err(|_| ParseError::new(self.line, format!("invalid {what} '{word}'")))
    }

    fn remaining(&self) -> usize {
        self.words.len().saturating_sub(self.pos)
    }
}

/// Split a line into words, honouring quotes and escapes
fn tokenize(text: &str, line: usize) -> Result<Vec<String>, ParseError> {
    let mut words = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '#' {
            break;
        } else if c == '"' {
            chars.next();
            let mut word = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('n') => word.push('\n'),
                        Some('0') => word.push('\0'),
                        Some(e @ ('"' | '\\')) => word.push(e),
                        Some(e) => {
                            return Err(ParseError::new(line, format!("unknown escape '\\{e}'")))
                        }
                        None => return Err(ParseError::new(line, "unterminated string")),
                    },
                    Some(c) => word.push(c),
                    None => return Err(ParseError::new(line, "unterminated string")),
                }
            }
            words.push(word);
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                word.push(c);
                chars.next();
            }
            words.push(word);
        }
    }
    Ok(words)
}
