//! Arithmetic over program parameters.
//!
//! Right-hand sides of `#n=…` / `Rn=…` assignments and the numeric arguments
//! of cycle calls are small expressions: literals, variable references and
//! the four operators with standard precedence, plus parentheses and unary
//! sign.

use std::collections::BTreeMap;

use crate::error::NcError;
use crate::state::VarKey;

/// Evaluates `text` against the parameter table.
///
/// Grammar: `expr := term (('+'|'-') term)*`, `term := factor (('*'|'/')
/// factor)*`, `factor := number | '#'n | 'R'n | '(' expr ')' | ('+'|'-')
/// factor`. Division by zero and unknown variables are interpretation
/// errors reported against `line`.
pub fn eval(text: &str, parameters: &BTreeMap<VarKey, f64>, line: i64) -> Result<f64, NcError> {
    if !text.is_ascii() {
        return Err(NcError::code_in(line, "non-ASCII text in expression", text));
    }
    let mut cursor = Cursor {
        bytes: text.as_bytes(),
        pos: 0,
        parameters,
        line,
        source: text,
    };
    let value = cursor.expr()?;
    cursor.skip_spaces();
    if cursor.pos != cursor.bytes.len() {
        return Err(NcError::code_in(
            line,
            format!("trailing input in expression at byte {}", cursor.pos),
            text,
        ));
    }
    Ok(value)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    parameters: &'a BTreeMap<VarKey, f64>,
    line: i64,
    source: &'a str,
}

impl Cursor<'_> {
    fn skip_spaces(&mut self) {
        while self.bytes.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_spaces();
        self.bytes.get(self.pos).copied()
    }

    fn error(&self, message: impl Into<String>) -> NcError {
        NcError::code_in(self.line, message, self.source)
    }

    fn expr(&mut self) -> Result<f64, NcError> {
        let mut value = self.term()?;
        while let Some(op @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == b'+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, NcError> {
        let mut value = self.factor()?;
        while let Some(op @ (b'*' | b'/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == b'*' {
                value *= rhs;
            } else {
                if rhs == 0.0 {
                    return Err(self.error("division by zero"));
                }
                value /= rhs;
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, NcError> {
        match self.peek() {
            Some(b'+') => {
                self.pos += 1;
                self.factor()
            }
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some(b'(') => {
                self.pos += 1;
                let value = self.expr()?;
                if self.peek() != Some(b')') {
                    return Err(self.error("expected `)`"));
                }
                self.pos += 1;
                Ok(value)
            }
            Some(b'#') | Some(b'R') | Some(b'r') => self.variable(),
            Some(b) if b.is_ascii_digit() || b == b'.' => self.number(),
            Some(b) => Err(self.error(format!("unexpected `{}` in expression", b as char))),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn variable(&mut self) -> Result<f64, NcError> {
        let start = self.pos;
        self.pos += 1;
        while matches!(self.bytes.get(self.pos), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        let name = &self.source[start..self.pos];
        let key = VarKey::parse(name)
            .ok_or_else(|| self.error(format!("malformed variable reference `{name}`")))?;
        self.parameters
            .get(&key)
            .copied()
            .ok_or_else(|| self.error(format!("unknown variable {key}")))
    }

    fn number(&mut self) -> Result<f64, NcError> {
        let start = self.pos;
        while matches!(self.bytes.get(self.pos), Some(b) if b.is_ascii_digit() || *b == b'.') {
            self.pos += 1;
        }
        let text = &self.source[start..self.pos];
        text.parse()
            .map_err(|_| self.error(format!("malformed number `{text}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(entries: &[(VarKey, f64)]) -> BTreeMap<VarKey, f64> {
        entries.iter().copied().collect()
    }

    #[test]
    fn literal_number() {
        assert_eq!(eval("42", &BTreeMap::new(), 0).unwrap(), 42.0);
        assert_eq!(eval("2.5", &BTreeMap::new(), 0).unwrap(), 2.5);
        assert_eq!(eval(".5", &BTreeMap::new(), 0).unwrap(), 0.5);
    }

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(eval("2+3*4", &BTreeMap::new(), 0).unwrap(), 14.0);
        assert_eq!(eval("(2+3)*4", &BTreeMap::new(), 0).unwrap(), 20.0);
        assert_eq!(eval("10-4/2", &BTreeMap::new(), 0).unwrap(), 8.0);
    }

    #[test]
    fn unary_sign() {
        assert_eq!(eval("-5", &BTreeMap::new(), 0).unwrap(), -5.0);
        assert_eq!(eval("-(2+3)", &BTreeMap::new(), 0).unwrap(), -5.0);
        assert_eq!(eval("2*-3", &BTreeMap::new(), 0).unwrap(), -6.0);
        assert_eq!(eval("+7", &BTreeMap::new(), 0).unwrap(), 7.0);
    }

    #[test]
    fn variable_references_both_spellings() {
        let p = params(&[(VarKey::Hash(1), 10.0), (VarKey::R(2), 4.0)]);
        assert_eq!(eval("#1", &p, 0).unwrap(), 10.0);
        assert_eq!(eval("R2", &p, 0).unwrap(), 4.0);
        assert_eq!(eval("#1+R2*2", &p, 0).unwrap(), 18.0);
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let err = eval("#9", &BTreeMap::new(), 5).unwrap_err();
        assert!(err.message.contains("unknown variable #9"), "{err}");
        assert_eq!(err.line, 5);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let err = eval("1/0", &BTreeMap::new(), 3).unwrap_err();
        assert!(err.message.contains("division by zero"), "{err}");
    }

    #[test]
    fn division_by_zero_valued_variable_is_an_error() {
        let p = params(&[(VarKey::R(1), 0.0)]);
        assert!(eval("5/R1", &p, 0).is_err());
    }

    #[test]
    fn trailing_garbage_is_an_error() {
        assert!(eval("1 2", &BTreeMap::new(), 0).is_err());
        assert!(eval("2+", &BTreeMap::new(), 0).is_err());
        assert!(eval("", &BTreeMap::new(), 0).is_err());
    }

    #[test]
    fn spaces_are_ignored() {
        assert_eq!(eval(" 1 + 2 * 3 ", &BTreeMap::new(), 0).unwrap(), 7.0);
    }
}
