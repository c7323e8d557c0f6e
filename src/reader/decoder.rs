//! Byte level decoding of the input
//!
//! The decoder consumes one byte at a time. Structural bytes outside of quotes are
//! returned as [`Token`]s; everything else is decoded (quotes removed, escape
//! sequences resolved) into the [`Accumulator`].

use log::trace;

use super::{accumulator::Accumulator, DecodeErrorKind, InputPosition};
use crate::{
    tree::arena::AllocError,
    utf8::{self, MAX_BYTES_PER_CODE_POINT},
};

/// Structural byte outside of quotes
#[derive(PartialEq, Eq, Clone, Copy, strum::Display, Debug)]
pub(crate) enum Token {
    /// `{`
    ObjectStart,
    /// `}`
    ObjectEnd,
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// `:`
    Colon,
    /// `,`
    Comma,
}

#[derive(PartialEq, Eq, Debug)]
pub(crate) enum DecodeFailure {
    Decode(DecodeErrorKind),
    Allocation,
}

impl From<AllocError> for DecodeFailure {
    fn from(_: AllocError) -> Self {
        DecodeFailure::Allocation
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum EscapeForm {
    /// Only the `\` has been consumed so far
    Start,
    /// `\xHH`
    Hex,
    /// `\NNN`, the first digit is part of the state
    Octal,
    /// `\uHHHH`
    ShortUnicode,
    /// `\UHHHHHHHH`
    LongUnicode,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum State {
    Plain,
    InQuotes,
    Escape {
        form: EscapeForm,
        /// Number of digits still expected
        remaining: u8,
        value: u32,
        in_quotes: bool,
    },
}

#[derive(Debug)]
pub(crate) struct Decoder {
    state: State,
    allow_c_escapes: bool,
    line: u64,
    column: u64,
    byte_pos: u64,
}

fn hex_digit(byte: u8) -> Option<u32> {
    char::from(byte).to_digit(16)
}

fn octal_digit(byte: u8) -> Option<u32> {
    match byte {
        b'0'..=b'7' => Some(u32::from(byte - b'0')),
        _ => None,
    }
}

impl Decoder {
    pub(crate) fn new(allow_c_escapes: bool) -> Self {
        Decoder {
            state: State::Plain,
            allow_c_escapes,
            line: 1,
            column: 1,
            byte_pos: 0,
        }
    }

    /// Position of the next byte to be consumed
    pub(crate) fn position(&self) -> InputPosition {
        InputPosition {
            line: self.line,
            column: self.column,
            byte_pos: self.byte_pos,
        }
    }

    /// Whether the decoder is outside of any quoted string or escape sequence
    pub(crate) fn is_idle(&self) -> bool {
        self.state == State::Plain
    }

    /// Consumes one byte
    ///
    /// Returns the token if the byte is a structural byte outside of quotes.
    pub(crate) fn feed(
        &mut self,
        byte: u8,
        acc: &mut Accumulator,
    ) -> Result<Option<Token>, DecodeFailure> {
        let result = self.decode(byte, acc);

        self.byte_pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        result
    }

    fn decode(&mut self, byte: u8, acc: &mut Accumulator) -> Result<Option<Token>, DecodeFailure> {
        match self.state {
            State::Plain => {
                let token = match byte {
                    b'{' => Token::ObjectStart,
                    b'}' => Token::ObjectEnd,
                    b'[' => Token::ArrayStart,
                    b']' => Token::ArrayEnd,
                    b':' => Token::Colon,
                    b',' => Token::Comma,
                    b'"' => {
                        acc.mark_quote();
                        self.state = State::InQuotes;
                        return Ok(None);
                    }
                    b'\\' => {
                        self.state = start_escape(false);
                        return Ok(None);
                    }
                    b' ' | b'\t' | b'\r' | b'\n' => {
                        acc.push_whitespace(byte)?;
                        return Ok(None);
                    }
                    _ => {
                        acc.push(byte)?;
                        return Ok(None);
                    }
                };
                trace!("decoder: token {token} at {}", self.position());
                Ok(Some(token))
            }
            State::InQuotes => {
                match byte {
                    b'"' => {
                        acc.mark_quote();
                        self.state = State::Plain;
                    }
                    b'\\' => self.state = start_escape(true),
                    _ => acc.push(byte)?,
                }
                Ok(None)
            }
            State::Escape {
                form,
                remaining,
                value,
                in_quotes,
            } => {
                if form == EscapeForm::Start {
                    self.start_escape_form(byte, in_quotes, acc)?;
                } else {
                    self.escape_digit(byte, form, remaining, value, in_quotes, acc)?;
                }
                Ok(None)
            }
        }
    }

    fn end_escape(&mut self, in_quotes: bool) {
        self.state = if in_quotes {
            State::InQuotes
        } else {
            State::Plain
        };
    }

    /// Handles the byte directly following the `\`
    fn start_escape_form(
        &mut self,
        byte: u8,
        in_quotes: bool,
        acc: &mut Accumulator,
    ) -> Result<(), DecodeFailure> {
        let (form, remaining, value) = match (byte, self.allow_c_escapes) {
            (b'u', _) => (EscapeForm::ShortUnicode, 4, 0),
            (b'U', true) => (EscapeForm::LongUnicode, 8, 0),
            (b'x', true) => (EscapeForm::Hex, 2, 0),
            // `\0` is checked first, so an octal escape always starts with 1 - 3
            (b'1'..=b'3', true) => (EscapeForm::Octal, 2, u32::from(byte - b'0')),
            _ => {
                let decoded = match (byte, self.allow_c_escapes) {
                    (b'n', _) => b'\n',
                    (b't', _) => b'\t',
                    (b'r', _) => b'\r',
                    (b'b', _) => 0x08,
                    (b'f', _) => 0x0C,
                    (b'a', true) => 0x07,
                    (b'v', true) => 0x0B,
                    (b'0', true) => 0x00,
                    // Covers `\"`, `\\` and `\/`
                    _ => byte,
                };
                acc.push(decoded)?;
                self.end_escape(in_quotes);
                return Ok(());
            }
        };
        self.state = State::Escape {
            form,
            remaining,
            value,
            in_quotes,
        };
        Ok(())
    }

    fn escape_digit(
        &mut self,
        byte: u8,
        form: EscapeForm,
        remaining: u8,
        value: u32,
        in_quotes: bool,
        acc: &mut Accumulator,
    ) -> Result<(), DecodeFailure> {
        let (digit, radix_bits, error_kind) = match form {
            EscapeForm::Hex => (hex_digit(byte), 4, DecodeErrorKind::InvalidHexDigit),
            EscapeForm::Octal => (octal_digit(byte), 3, DecodeErrorKind::InvalidOctalDigit),
            EscapeForm::ShortUnicode | EscapeForm::LongUnicode => {
                (hex_digit(byte), 4, DecodeErrorKind::InvalidUnicodeDigit)
            }
            EscapeForm::Start => panic!("Unexpected: Escape digit without escape form"),
        };
        let digit = digit.ok_or(DecodeFailure::Decode(error_kind))?;
        // Most significant digit first; 8 hex digits fit exactly into u32
        let value = (value << radix_bits) | digit;

        let remaining = remaining - 1;
        if remaining > 0 {
            self.state = State::Escape {
                form,
                remaining,
                value,
                in_quotes,
            };
            return Ok(());
        }

        match form {
            // Values fit into a byte: 2 hex digits, or 3 octal digits with the first one <= 3
            EscapeForm::Hex | EscapeForm::Octal => acc.push(value as u8)?,
            _ => {
                let mut buf = [0; MAX_BYTES_PER_CODE_POINT];
                let bytes = utf8::encode_code_point(value, &mut buf)
                    .ok_or(DecodeFailure::Decode(DecodeErrorKind::CodePointOutOfRange))?;
                acc.push_all(bytes)?;
            }
        }
        self.end_escape(in_quotes);
        Ok(())
    }
}

fn start_escape(in_quotes: bool) -> State {
    State::Escape {
        form: EscapeForm::Start,
        remaining: 0,
        value: 0,
        in_quotes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::accumulator::DEFAULT_CHUNK_CAPACITY;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn decode_with(
        input: &[u8],
        allow_c_escapes: bool,
    ) -> Result<(Vec<u8>, Vec<Token>), DecodeFailure> {
        let mut decoder = Decoder::new(allow_c_escapes);
        let mut acc = Accumulator::new(DEFAULT_CHUNK_CAPACITY);
        let mut tokens = Vec::new();
        for &b in input {
            if let Some(token) = decoder.feed(b, &mut acc)? {
                tokens.push(token);
            }
        }
        assert_eq!(true, decoder.is_idle(), "decoder should be idle at end of input");
        Ok((acc.take()?.into_vec(), tokens))
    }

    fn decode(input: &[u8]) -> Vec<u8> {
        match decode_with(input, true) {
            Ok((bytes, _)) => bytes,
            Err(e) => panic!("Failed decoding {input:?}: {e:?}"),
        }
    }

    fn assert_decode_error(input: &[u8], expected: DecodeErrorKind) {
        assert_eq!(
            Err(DecodeFailure::Decode(expected)),
            decode_with(input, true).map(|_| ()),
            "input: {input:?}"
        );
    }

    #[test]
    fn tokens() -> TestResult {
        let (bytes, tokens) = decode_with(br#"{"a,b":[1,2]}"#, true).map_err(|e| format!("{e:?}"))?;
        assert_eq!(
            vec![
                Token::ObjectStart,
                Token::Colon,
                Token::ArrayStart,
                Token::Comma,
                Token::ArrayEnd,
                Token::ObjectEnd
            ],
            tokens
        );
        // The accumulator was never taken, so all decoded bytes are concatenated
        assert_eq!(b"a,b12", &*bytes);
        Ok(())
    }

    #[test]
    fn simple_escapes() {
        assert_eq!(b"\n\t\r\x08\x0C", &*decode(br#""\n\t\r\b\f""#));
        assert_eq!(b"\x07\x0B\x00", &*decode(br#""\a\v\0""#));
        assert_eq!(b"\"\\/", &*decode(br#""\"\\\/""#));
        // Unknown escapes are taken literally
        assert_eq!(b"qz", &*decode(br#""\q\z""#));
        // Escapes outside of quotes
        assert_eq!(b"a\nb", &*decode(br"a\nb"));
    }

    #[test]
    fn numeric_escapes() {
        assert_eq!(b"A", &*decode(br#""\x41""#));
        assert_eq!(b"\xFF", &*decode(br#""\xfF""#));
        assert_eq!(b"A", &*decode(br#""\101""#));
        assert_eq!(b"\xFF", &*decode(br#""\377""#));
        // `\0` followed by digits is NUL and the digits
        assert_eq!(b"\x0012", &*decode(br#""\012""#));
        assert_eq!(b"A", &*decode(br#""\u0041""#));
        assert_eq!("\u{20AC}".as_bytes(), &*decode(br#""\u20AC""#));
        assert_eq!(b"\xF0\x90\x80\x80", &*decode(br#""\U00010000""#));
        assert_eq!(b"\xFD\xBF\xBF\xBF\xBF\xBF", &*decode(br#""\U7FFFFFFF""#));
        // Surrogates are not paired
        assert_eq!(b"\xED\xA0\xBD\xED\xB8\x80", &*decode(br#""\uD83D\uDE00""#));
    }

    #[test]
    fn invalid_escapes() {
        assert_decode_error(br#""\x4g""#, DecodeErrorKind::InvalidHexDigit);
        assert_decode_error(br#""\18""#, DecodeErrorKind::InvalidOctalDigit);
        assert_decode_error(br#""\1a""#, DecodeErrorKind::InvalidOctalDigit);
        assert_decode_error(br#""\u12x4""#, DecodeErrorKind::InvalidUnicodeDigit);
        assert_decode_error(br#""\U0001000""#, DecodeErrorKind::InvalidUnicodeDigit);
        assert_decode_error(br#""\U80000000""#, DecodeErrorKind::CodePointOutOfRange);
        assert_decode_error(br#""\UFFFFFFFF""#, DecodeErrorKind::CodePointOutOfRange);
    }

    #[test]
    fn c_escapes_disabled() -> TestResult {
        let (bytes, _) =
            decode_with(br#""\a\v\0\x41\101\nA""#, false).map_err(|e| format!("{e:?}"))?;
        assert_eq!(b"av0x41101\nA", &*bytes);

        let (bytes, _) = decode_with(br#""\U0041""#, false).map_err(|e| format!("{e:?}"))?;
        assert_eq!(b"U0041", &*bytes);
        Ok(())
    }

    #[test]
    fn quoted_structural_bytes() {
        assert_eq!(b"{}[]:, \n", &*decode(b"\"{}[]:, \n\""));
    }

    #[test]
    fn whitespace_handling() {
        assert_eq!(b"a b", &*decode(b"  a b \t\r\n "));
        assert_eq!(b" a ", &*decode(b"  \" a \"  "));
    }

    #[test]
    fn position() -> TestResult {
        let mut decoder = Decoder::new(true);
        let mut acc = Accumulator::new(DEFAULT_CHUNK_CAPACITY);
        assert_eq!(
            InputPosition {
                line: 1,
                column: 1,
                byte_pos: 0
            },
            decoder.position()
        );
        for &b in b"ab\ncd\n\ne" {
            decoder.feed(b, &mut acc).map_err(|e| format!("{e:?}"))?;
        }
        assert_eq!(
            InputPosition {
                line: 4,
                column: 2,
                byte_pos: 9
            },
            decoder.position()
        );
        Ok(())
    }

    #[test]
    fn unfinished_escape_is_not_idle() -> TestResult {
        let mut decoder = Decoder::new(true);
        let mut acc = Accumulator::new(DEFAULT_CHUNK_CAPACITY);
        for &b in br#""\u00"# {
            decoder.feed(b, &mut acc).map_err(|e| format!("{e:?}"))?;
        }
        assert_eq!(false, decoder.is_idle());
        Ok(())
    }
}
