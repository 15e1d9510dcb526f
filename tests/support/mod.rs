use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use sludge::interpreter::Interpreter;
use sludge::lexer::Lexer;
use sludge::parser::Parser;

struct SharedWriter(Rc<RefCell<Vec<u8>>>);

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Lexes, parses and interprets `source` end to end, returning everything
/// written by `print` statements. Panics (with a clear message) on lex or
/// parse errors — callers that expect those should inspect the pipeline
/// stages directly instead.
pub fn run(source: &str) -> Result<String, String> {
    let (tokens, lex_errors) = Lexer::new(source).lex();
    if !lex_errors.is_empty() {
        panic!("unexpected lex errors: {lex_errors:?}");
    }

    let (statements, parse_errors) = Parser::new(tokens).parse();
    if !parse_errors.is_empty() {
        panic!("unexpected parse errors: {parse_errors:?}");
    }

    let output = Rc::new(RefCell::new(Vec::new()));
    let mut interpreter = Interpreter::with_writer(SharedWriter(output.clone()));
    interpreter
        .interpret(&statements)
        .map_err(|err| err.to_string())?;

    Ok(String::from_utf8(output.borrow().clone()).unwrap())
}

/// Runs a program through the lexer and parser only, surfacing whether
/// either stage reported an error — for the negative scenarios that never
/// reach evaluation.
pub fn has_lex_or_parse_error(source: &str) -> bool {
    let (tokens, lex_errors) = Lexer::new(source).lex();
    if !lex_errors.is_empty() {
        return true;
    }
    let (_, parse_errors) = Parser::new(tokens).parse();
    !parse_errors.is_empty()
}
