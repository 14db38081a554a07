//! Tokenizing and expression parsing over one script line at a time
//! (spec.md §4.1): `readToken`, `readInt`, `readStr`, `readColor`,
//! `readLabel`, comma handling and the `getparam` argument queue.

use crate::vars::VariableStore;
use anyhow::{bail, Result as AResult};
use libcommon::ScriptAddress;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Command(String),
    Label(String),
    Colon,
    Newline,
    Eof,
}

/// Either a `#RRGGBB` literal or a fallback string, per `readColor`'s
/// dual-mode contract (spec.md §4.1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColorOrString {
    Color([u8; 3]),
    Str(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    And,
    Or,
}

/// FIFO of argument tokens saved by a `gosub`-with-args call so that a
/// nested `getparam` pulls from the saved list instead of the live script
/// (spec.md §4.1 "Variable queue").
#[derive(Clone, Debug, Default)]
pub struct ArgQueue {
    tokens: VecDeque<String>,
}

impl ArgQueue {
    #[must_use]
    pub fn from_raw(tokens: Vec<String>) -> Self {
        Self { tokens: tokens.into() }
    }

    fn pop(&mut self) -> Option<String> {
        self.tokens.pop_front()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A cursor over the script's text. Holds its own `Rc<str>` clone of the
/// buffer so it can be passed around independently of whoever owns the
/// [`crate::script::buffer::ScriptBuffer`] it was created from.
#[derive(Clone, Debug, Default)]
pub struct Lexer {
    text: Rc<str>,
    pos: usize,
    /// When set, `read_raw_token` pulls from here first (an active
    /// `getparam` queue) before falling back to the live script text.
    args: Option<ArgQueue>,
    trailing_comma: bool,
}

impl Lexer {
    #[must_use]
    pub fn new(text: Rc<str>, pos: ScriptAddress) -> Self {
        Self { text, pos: pos.get() as usize, args: None, trailing_comma: false }
    }

    #[must_use]
    pub fn position(&self) -> ScriptAddress {
        ScriptAddress::from(self.pos as u32)
    }

    /// True for a default-constructed `Lexer` that has never been pointed
    /// at a script buffer. Used by [`crate::engine::Engine::dispatch`] to
    /// tell whether a command handler jumped the engine's own lexer (via
    /// `Engine::goto_address`) out from under the one it was handed.
    #[must_use]
    pub(crate) fn is_unset(&self) -> bool {
        self.text.is_empty()
    }

    pub fn set_args(&mut self, args: ArgQueue) {
        self.args = Some(args);
    }

    pub fn clear_args(&mut self) {
        self.args = None;
    }

    #[must_use]
    pub fn has_more_args(&self) -> bool {
        self.trailing_comma
    }

    /// Pops one token off an active `getparam` queue, if any. Value reads
    /// (`parse_operand`, `read_str_operand`) check this before the live
    /// script text so a subroutine entered via `gosub *L,args...` draws its
    /// first reads from the caller's arguments transparently.
    fn pop_arg(&mut self) -> Option<String> {
        self.args.as_mut().and_then(ArgQueue::pop)
    }

    fn bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn skip_blanks(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn skip_blanks_and_commas(&mut self) {
        loop {
            self.skip_blanks();
            if self.peek() == Some(b',') {
                self.pos += 1;
                continue;
            }
            break;
        }
    }

    /// Consumes trailing blanks and (at most) one comma after an argument
    /// has been read, recording whether one was found so `has_more_args()`
    /// reflects it.
    fn mark_trailing_comma(&mut self) {
        self.skip_blanks();
        self.trailing_comma = self.peek() == Some(b',');
        if self.trailing_comma {
            self.pos += 1;
        }
    }

    /// Skips a `;` comment to end of line, if one starts here.
    fn skip_comment(&mut self) {
        if self.peek() == Some(b';') {
            while !matches!(self.peek(), None | Some(b'\n')) {
                self.pos += 1;
            }
        }
    }

    /// Reads the next raw identifier-ish token: letters/digits/underscore
    /// for a command name, or a punctuation character. Command-name tokens
    /// always come from the live script, even with an active `getparam`
    /// queue — only value reads (`parse_operand`, `read_str_operand`)
    /// consult it.
    fn read_raw_token(&mut self) -> AResult<Option<String>> {
        self.skip_blanks_and_commas();
        self.skip_comment();
        match self.peek() {
            None => Ok(None),
            Some(b'\n') => {
                self.pos += 1;
                Ok(Some("\n".to_string()))
            }
            Some(b':') => {
                self.pos += 1;
                Ok(Some(":".to_string()))
            }
            Some(b'~') => {
                self.pos += 1;
                Ok(Some("~".to_string()))
            }
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
                    self.pos += 1;
                }
                Ok(Some(self.text[start..self.pos].to_string()))
            }
            Some(_) => Ok(None),
        }
    }

    /// `readToken()`: the next command name (lowercased), a label, or
    /// statement punctuation.
    pub fn read_token(&mut self) -> AResult<Token> {
        if self.peek() == Some(b'*') {
            return Ok(Token::Label(self.read_label_name()?));
        }
        match self.read_raw_token()? {
            None => Ok(Token::Eof),
            Some(t) if t == ":" => Ok(Token::Colon),
            Some(t) if t == "\n" => Ok(Token::Newline),
            Some(name) => Ok(Token::Command(name.to_ascii_lowercase())),
        }
    }

    fn read_label_name(&mut self) -> AResult<String> {
        self.skip_blanks_and_commas();
        if self.advance() != Some(b'*') {
            bail!("Expected a label starting with '*'");
        }
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        if start == self.pos {
            bail!("Empty label name");
        }
        Ok(format!("*{}", &self.text[start..self.pos]))
    }

    /// `readLabel()`: `*name`, including the leading `*`.
    pub fn read_label(&mut self) -> AResult<String> {
        self.read_label_name()
    }

    /// Reads an integer-slot target, i.e. the `N` in `%N` (used by
    /// assignment-style commands that write rather than evaluate a slot).
    pub fn read_int_slot_no(&mut self) -> AResult<u32> {
        self.skip_blanks_and_commas();
        if self.advance() != Some(b'%') {
            bail!("Expected '%' before an integer slot number");
        }
        self.read_uint_literal()
    }

    /// Non-consuming peek at a destination's `%`/`$` sigil after skipping
    /// blanks and commas, for commands that disambiguate int vs. string by
    /// sigil rather than by command name (`mov`, `getparam`).
    #[must_use]
    pub fn peek_slot_sigil(&mut self) -> Option<char> {
        self.skip_blanks_and_commas();
        self.peek().map(char::from).filter(|c| matches!(c, '%' | '$'))
    }

    /// Reads a string-slot target, the `N` in `$N`.
    pub fn read_str_slot_no(&mut self) -> AResult<u32> {
        self.skip_blanks_and_commas();
        if self.advance() != Some(b'$') {
            bail!("Expected '$' before a string slot number");
        }
        self.read_uint_literal()
    }

    /// Reads an array-variable declaration target, the `N` in `?N`.
    pub fn read_array_no(&mut self) -> AResult<i32> {
        self.skip_blanks_and_commas();
        if self.advance() != Some(b'?') {
            bail!("Expected '?' before an array variable number");
        }
        Ok(self.read_uint_literal()? as i32)
    }

    /// Consumes the ASCII word `word` (case-sensitive) after skipping
    /// blanks, failing if it isn't there. Used for the `to`/`step`
    /// keywords in `for` and similar fixed-keyword grammar.
    pub fn expect_word(&mut self, word: &str) -> AResult<()> {
        self.skip_blanks();
        if self.looking_at_word(word) {
            self.pos += word.len();
            Ok(())
        } else {
            bail!("Expected keyword '{}'", word)
        }
    }

    /// Non-consuming check for `word` at the current position (after
    /// skipping blanks), for optional trailing keywords like `for`'s
    /// `step`.
    #[must_use]
    pub fn peek_word(&mut self, word: &str) -> bool {
        self.skip_blanks();
        self.looking_at_word(word)
    }

    #[must_use]
    pub fn at_eof(&self) -> bool {
        self.pos >= self.bytes().len()
    }

    /// Consumes a literal punctuation character such as `=` after skipping
    /// blanks, e.g. the `=` in `for %0 = 1 to 10`.
    pub fn expect_char(&mut self, c: char) -> AResult<()> {
        self.skip_blanks();
        if self.advance() == Some(c as u8) {
            Ok(())
        } else {
            bail!("Expected '{}'", c)
        }
    }

    /// Reads a bareword identifier (letters/digits/underscore, not starting
    /// with a digit), used by `numalias`/`intalias`/`stralias` for the name
    /// half of the binding.
    pub fn read_identifier(&mut self) -> AResult<String> {
        self.skip_blanks_and_commas();
        let start = self.pos;
        if !matches!(self.peek(), Some(c) if c.is_ascii_alphabetic() || c == b'_') {
            bail!("Expected an identifier");
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        Ok(self.text[start..self.pos].to_string())
    }

    /// Reads a `[e1][e2]...` bracketed size/subscript list, shared by array
    /// declaration (`dim`) and array element access.
    pub fn read_array_dims(&mut self, vars: &VariableStore) -> AResult<Vec<u32>> {
        self.read_array_indices(vars)
    }

    /// Discards the remainder of the current line, used by `if`/`notif`
    /// when the condition is false and the guarded command must not run.
    pub fn skip_to_eol(&mut self) {
        while !matches!(self.peek(), None | Some(b'\n')) {
            self.pos += 1;
        }
    }

    fn peek_non_blank(&self) -> Option<u8> {
        let mut pos = self.pos;
        while matches!(self.bytes().get(pos), Some(b' ' | b'\t')) {
            pos += 1;
        }
        self.bytes().get(pos).copied()
    }

    /// `readInt()`: an arithmetic expression over literals, `%N` slots,
    /// `?N[e]...` array elements, integer aliases and parentheses, with
    /// `+ - * /` and the literal operator `mod`.
    pub fn read_int(&mut self, vars: &VariableStore) -> AResult<i32> {
        self.skip_blanks_and_commas();
        let value = self.parse_add_sub(vars)?;
        self.mark_trailing_comma();
        Ok(value)
    }

    fn parse_add_sub(&mut self, vars: &VariableStore) -> AResult<i32> {
        let mut value = self.parse_mul_div(vars)?;
        loop {
            self.skip_blanks();
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    value += self.parse_mul_div(vars)?;
                }
                Some(b'-') => {
                    self.pos += 1;
                    value -= self.parse_mul_div(vars)?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn parse_mul_div(&mut self, vars: &VariableStore) -> AResult<i32> {
        let mut value = self.parse_unary(vars)?;
        loop {
            self.skip_blanks();
            if self.peek() == Some(b'*') {
                self.pos += 1;
                value *= self.parse_unary(vars)?;
            } else if self.peek() == Some(b'/') {
                self.pos += 1;
                let divisor = self.parse_unary(vars)?;
                if divisor == 0 {
                    bail!("Division by zero in integer expression");
                }
                value /= divisor;
            } else if self.looking_at_word("mod") {
                self.pos += 3;
                let divisor = self.parse_unary(vars)?;
                if divisor == 0 {
                    bail!("mod by zero in integer expression");
                }
                value %= divisor;
            } else {
                break;
            }
        }
        Ok(value)
    }

    fn looking_at_word(&self, word: &str) -> bool {
        let bytes = self.bytes();
        let start = self.pos;
        let end = start + word.len();
        bytes.get(start..end) == Some(word.as_bytes()) && !matches!(bytes.get(end), Some(c) if c.is_ascii_alphanumeric())
    }

    fn parse_unary(&mut self, vars: &VariableStore) -> AResult<i32> {
        self.skip_blanks();
        if self.peek() == Some(b'-') {
            self.pos += 1;
            return Ok(-self.parse_unary(vars)?);
        }
        self.parse_operand(vars)
    }

    fn parse_operand(&mut self, vars: &VariableStore) -> AResult<i32> {
        if let Some(token) = self.pop_arg() {
            return Lexer::new(Rc::from(token.as_str()), ScriptAddress::from(0u32)).parse_add_sub(vars);
        }
        self.skip_blanks();
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let value = self.parse_add_sub(vars)?;
                self.skip_blanks();
                if self.advance() != Some(b')') {
                    bail!("Expected ')'");
                }
                Ok(value)
            }
            Some(b'%') => {
                self.pos += 1;
                let no = self.read_uint_literal()?;
                Ok(vars.int(no))
            }
            Some(b'?') => {
                self.pos += 1;
                let no = self.read_uint_literal()? as i32;
                let indices = self.read_array_indices(vars)?;
                vars.array(no)?.get(&indices)
            }
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
                self.text[start..self.pos].parse::<i32>().map_err(Into::into)
            }
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
                    self.pos += 1;
                }
                let name = &self.text[start..self.pos];
                vars.num_alias(name).ok_or_else(|| anyhow::anyhow!("Undefined integer alias '{}'", name))
            }
            other => bail!("Unexpected character in integer expression: {:?}", other.map(char::from)),
        }
    }

    fn read_uint_literal(&mut self) -> AResult<u32> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            bail!("Expected a numeric slot index");
        }
        Ok(self.text[start..self.pos].parse()?)
    }

    fn read_array_indices(&mut self, vars: &VariableStore) -> AResult<Vec<u32>> {
        let mut indices = Vec::new();
        while self.peek() == Some(b'[') {
            self.pos += 1;
            let value = self.parse_add_sub(vars)?;
            if self.advance() != Some(b']') {
                bail!("Expected ']' in array subscript");
            }
            indices.push(u32::try_from(value).map_err(|_| anyhow::anyhow!("Negative array subscript {}", value))?);
        }
        Ok(indices)
    }

    /// `readStr()`: a (possibly-concatenated) string expression.
    pub fn read_str(&mut self, vars: &VariableStore) -> AResult<String> {
        self.skip_blanks_and_commas();
        let mut result = self.read_str_operand(vars)?;
        loop {
            self.skip_blanks();
            if self.peek() == Some(b'+') {
                self.pos += 1;
                result.push_str(&self.read_str_operand(vars)?);
            } else {
                break;
            }
        }
        self.mark_trailing_comma();
        Ok(result)
    }

    fn read_str_operand(&mut self, vars: &VariableStore) -> AResult<String> {
        if let Some(token) = self.pop_arg() {
            return Lexer::new(Rc::from(token.as_str()), ScriptAddress::from(0u32)).read_str_operand(vars);
        }
        self.skip_blanks();
        match self.peek() {
            Some(b'"') => {
                self.pos += 1;
                let start = self.pos;
                while !matches!(self.peek(), None | Some(b'"' | b'\n')) {
                    self.pos += 1;
                }
                let value = self.text[start..self.pos].to_string();
                if self.peek() == Some(b'"') {
                    self.pos += 1;
                }
                Ok(value)
            }
            Some(b'`') => {
                let start = self.pos;
                self.pos += 1;
                while !matches!(self.peek(), None | Some(b'`' | b'\n')) {
                    self.pos += 1;
                }
                if self.peek() == Some(b'`') {
                    self.pos += 1;
                }
                Ok(self.text[start..self.pos].to_string())
            }
            Some(b'#') => {
                let start = self.pos;
                self.pos += 1;
                for _ in 0..6 {
                    if !matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                        bail!("Malformed color literal");
                    }
                    self.pos += 1;
                }
                Ok(self.text[start..self.pos].to_string())
            }
            Some(b'*') => self.read_label_name(),
            Some(b'$') => {
                self.pos += 1;
                let no = self.read_uint_literal()?;
                Ok(vars.string(no))
            }
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
                    self.pos += 1;
                }
                let name = &self.text[start..self.pos];
                vars.str_alias(name).map(|slot| vars.string(slot)).ok_or_else(|| anyhow::anyhow!("Undefined string alias '{}'", name))
            }
            other => bail!("Unexpected character in string expression: {:?}", other.map(char::from)),
        }
    }

    /// `readColor()`: a `#RRGGBB` literal, or a fallback string when the
    /// next token isn't a color literal.
    pub fn read_color(&mut self, vars: &VariableStore) -> AResult<ColorOrString> {
        self.skip_blanks_and_commas();
        if self.peek_non_blank() == Some(b'#') {
            let hex = self.read_str_operand(vars)?;
            let digits = &hex[1..];
            let mut rgb = [0u8; 3];
            for (i, chunk) in digits.as_bytes().chunks(2).enumerate().take(3) {
                rgb[i] = u8::from_str_radix(std::str::from_utf8(chunk)?, 16)?;
            }
            self.mark_trailing_comma();
            Ok(ColorOrString::Color(rgb))
        } else {
            Ok(ColorOrString::Str(self.read_str(vars)?))
        }
    }

    /// `if`/`notif`'s condition grammar (spec.md §4.2): a chain of
    /// comparisons joined entirely by `&` (all must hold) or entirely by
    /// `|` (any must hold) — mixing the two combinators in one condition is
    /// fatal. Each leaf compares two int expressions, or two string
    /// expressions when either side starts with `$`/`"`/`` ` ``.
    ///
    /// `invert` is `true` for `notif`. Ported from the original engine's
    /// `ifCommand`, the inversion is applied per comparison before
    /// accumulating, not to the final result — `notif a & b` means `(!a) &&
    /// (!b)`, not `!(a && b)`.
    pub fn read_condition(&mut self, vars: &VariableStore, invert: bool) -> AResult<bool> {
        let mut combinator: Option<Combinator> = None;
        let mut accumulated = false;
        loop {
            let leaf = self.read_comparison(vars)? != invert;
            accumulated = match combinator {
                None => leaf,
                Some(Combinator::And) => accumulated && leaf,
                Some(Combinator::Or) => accumulated || leaf,
            };
            self.skip_blanks();
            match self.peek() {
                Some(b'&') => {
                    while self.peek() == Some(b'&') {
                        self.pos += 1;
                    }
                    if combinator == Some(Combinator::Or) {
                        bail!("if: using & and | at the same time is not supported.");
                    }
                    combinator = Some(Combinator::And);
                }
                Some(b'|') => {
                    while self.peek() == Some(b'|') {
                        self.pos += 1;
                    }
                    if combinator == Some(Combinator::And) {
                        bail!("if: using & and | at the same time is not supported.");
                    }
                    combinator = Some(Combinator::Or);
                }
                _ => break,
            }
        }
        Ok(accumulated)
    }

    /// One `lhs OP rhs` leaf of a condition. String comparisons only support
    /// `==`/`=`/`!=`/`<>`; ordering operators on strings are a parse error,
    /// matching the original engine's exclusive int/string comparator sets.
    fn read_comparison(&mut self, vars: &VariableStore) -> AResult<bool> {
        self.skip_blanks();
        if self.looking_at_string_operand() {
            let lhs = self.read_str_operand(vars)?;
            let comparator = self.read_comparator()?;
            let rhs = self.read_str_operand(vars)?;
            match comparator {
                Comparator::Eq => Ok(lhs == rhs),
                Comparator::Ne => Ok(lhs != rhs),
                _ => bail!("if: ordering comparisons are not supported on strings"),
            }
        } else {
            let lhs = self.parse_add_sub(vars)?;
            let comparator = self.read_comparator()?;
            let rhs = self.parse_add_sub(vars)?;
            Ok(match comparator {
                Comparator::Eq => lhs == rhs,
                Comparator::Ne => lhs != rhs,
                Comparator::Lt => lhs < rhs,
                Comparator::Le => lhs <= rhs,
                Comparator::Gt => lhs > rhs,
                Comparator::Ge => lhs >= rhs,
            })
        }
    }

    fn looking_at_string_operand(&self) -> bool {
        matches!(self.peek(), Some(b'"' | b'$' | b'`'))
    }

    fn read_comparator(&mut self) -> AResult<Comparator> {
        self.skip_blanks();
        let comparator = match self.peek() {
            Some(b'>') => {
                self.pos += 1;
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    Comparator::Ge
                } else {
                    Comparator::Gt
                }
            }
            Some(b'<') => {
                self.pos += 1;
                match self.peek() {
                    Some(b'=') => {
                        self.pos += 1;
                        Comparator::Le
                    }
                    Some(b'>') => {
                        self.pos += 1;
                        Comparator::Ne
                    }
                    _ => Comparator::Lt,
                }
            }
            Some(b'=') => {
                self.pos += 1;
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                }
                Comparator::Eq
            }
            Some(b'!') => {
                self.pos += 1;
                if self.advance() != Some(b'=') {
                    bail!("Expected '=' after '!' in a condition");
                }
                Comparator::Ne
            }
            other => bail!("Expected a comparison operator in a condition, found {:?}", other.map(char::from)),
        };
        Ok(comparator)
    }

    /// Consumes everything up to (not including) the next statement
    /// separator, returning it as a raw token list for a `gosub`'s
    /// `getparam` queue.
    pub fn read_remaining_args(&mut self) -> AResult<Vec<String>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_blanks_and_commas();
            match self.peek() {
                None | Some(b'\n' | b':') => break,
                _ => {
                    let start = self.pos;
                    while !matches!(self.peek(), None | Some(b',' | b'\n' | b':')) {
                        self.pos += 1;
                    }
                    tokens.push(self.text[start..self.pos].trim().to_string());
                }
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn lexer(text: &str) -> Lexer {
        Lexer::new(Rc::from(text), ScriptAddress::from(0u16))
    }

    #[test]
    fn reads_commands_and_separators() {
        let mut lx = lexer("mov %0, 1 : add %0, 2\n");
        assert_eq!(lx.read_token().unwrap(), Token::Command("mov".into()));
        let vars = VariableStore::default();
        assert_eq!(lx.read_int(&vars).unwrap(), 0);
    }

    #[test]
    fn arithmetic_respects_precedence() {
        let vars = VariableStore::default();
        let mut lx = lexer("2 + 3 * 4");
        assert_eq!(lx.read_int(&vars).unwrap(), 14);
        let mut lx = lexer("(2 + 3) * 4");
        assert_eq!(lx.read_int(&vars).unwrap(), 20);
        let mut lx = lexer("10 mod 3");
        assert_eq!(lx.read_int(&vars).unwrap(), 1);
    }

    #[test]
    fn reads_int_slot_and_array_element() {
        let mut vars = VariableStore::default();
        vars.set_int(0, 7);
        vars.declare_array(1, vec![4]).unwrap();
        vars.array_mut(1).unwrap().set(&[2], 9).unwrap();
        let mut lx = lexer("%0 + ?1[2]");
        assert_eq!(lx.read_int(&vars).unwrap(), 16);
    }

    #[test]
    fn reads_quoted_and_concatenated_strings() {
        let vars = VariableStore::default();
        let mut lx = lexer("\"abc\" + \"def\"");
        assert_eq!(lx.read_str(&vars).unwrap(), "abcdef");
    }

    #[test]
    fn reads_color_literal_or_falls_back_to_string() {
        let vars = VariableStore::default();
        let mut lx = lexer("#FF00AA");
        assert_eq!(lx.read_color(&vars).unwrap(), ColorOrString::Color([0xFF, 0x00, 0xAA]));
        let mut lx = lexer("\"notacolor\"");
        assert_eq!(lx.read_color(&vars).unwrap(), ColorOrString::Str("notacolor".into()));
    }

    #[test]
    fn getparam_queue_is_consumed_before_the_live_script() {
        let mut lx = lexer("mov %0, 1");
        lx.set_args(ArgQueue::from_raw(vec!["99".to_string()]));
        let vars = VariableStore::default();
        assert_eq!(lx.read_int(&vars).unwrap(), 99);
    }

    #[test]
    fn has_more_args_reflects_trailing_comma() {
        let mut lx = lexer("1, 2");
        let vars = VariableStore::default();
        assert_eq!(lx.read_int(&vars).unwrap(), 1);
        assert!(lx.has_more_args());
        assert_eq!(lx.read_int(&vars).unwrap(), 2);
    }
}
