//! Internal module for formatting / validating JSON numbers

/// Whether the string is a valid JSON number as defined by RFC 8259
pub(crate) fn is_valid_json_number(value: &str) -> bool {
    #[derive(PartialEq, Clone, Copy)]
    enum State {
        Start,
        Minus,
        IntZero,
        IntNonZero,
        DecimalPoint,
        DecimalDigit,
        ExpE,
        ExpSign,
        ExpDigit,
    }

    let mut state = State::Start;
    for byte in value.bytes() {
        state = match (state, byte) {
            (State::Start, b'-') => State::Minus,
            (State::ExpE, b'-' | b'+') => State::ExpSign,

            (State::Start | State::Minus, b'0') => State::IntZero,
            (State::Start | State::Minus | State::IntNonZero, b'0'..=b'9') => State::IntNonZero,
            (State::DecimalPoint | State::DecimalDigit, b'0'..=b'9') => State::DecimalDigit,
            (State::ExpE | State::ExpSign | State::ExpDigit, b'0'..=b'9') => State::ExpDigit,

            (State::IntZero | State::IntNonZero, b'.') => State::DecimalPoint,
            (State::IntZero | State::IntNonZero | State::DecimalDigit, b'e' | b'E') => State::ExpE,
            _ => return false,
        };
    }

    matches!(
        state,
        State::IntZero | State::IntNonZero | State::DecimalDigit | State::ExpDigit
    )
}

/// A number which can be written as JSON number
pub(crate) trait JsonNumber: Copy + std::fmt::Display {
    /// Whether the number can be represented in JSON; only non-finite floating point
    /// numbers cannot
    fn is_representable(self) -> bool;
}

impl JsonNumber for i64 {
    fn is_representable(self) -> bool {
        true
    }
}

impl JsonNumber for f64 {
    fn is_representable(self) -> bool {
        self.is_finite()
    }
}

/// Formats the number as JSON number string
///
/// Returns `None` if the number is not representable (NaN or infinite).
pub(crate) fn format_json_number<N: JsonNumber>(number: N) -> Option<String> {
    if !number.is_representable() {
        return None;
    }
    // `Display` of Rust floats never uses exponent notation, and prints integral
    // values without decimal point
    let string = number.to_string();
    debug_assert!(
        is_valid_json_number(&string),
        "Unexpected: Not a valid JSON number: {string}"
    );
    Some(string)
}
