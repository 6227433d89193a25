//! Parsing rule for numeric "guess" answers.
//!
//! * surrounding whitespace is ignored, an optional leading `+`/`-` is allowed
//! * commas forming strict thousands groups are separators: `1,984` is 1984,
//!   `12,345,678.5` is 12345678.5
//! * otherwise one comma and no dot is a decimal comma: `3,5` is 3.5
//! * anything else does not parse

use crate::types::InputType;

/// Parse a guess; `None` means the input is not a number under the rule above
pub fn parse_guess(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let value = parse_unsigned(unsigned)?;
    Some(if negative { -value } else { value })
}

/// Whether a stored answer is an unsigned number (thousands separators allowed)
pub fn is_numeric_answer(text: &str) -> bool {
    parse_unsigned(text.trim()).is_some()
}

/// `guess` when a stored answer is an unsigned number, thousands separators allowed
pub fn infer_input_type(answer: &str) -> InputType {
    if is_numeric_answer(answer) {
        InputType::Guess
    } else {
        InputType::Normal
    }
}

fn parse_unsigned(text: &str) -> Option<f64> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let (integer, fraction) = match text.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (text, None),
    };
    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    let integer_digits = if integer.contains(',') {
        if is_thousands_grouped(integer) {
            integer.replace(',', "")
        } else if fraction.is_none() && integer.matches(',').count() == 1 {
            // Decimal comma
            let (whole, decimals) = integer.split_once(',')?;
            if whole.is_empty() || decimals.is_empty() {
                return None;
            }
            return format!("{}.{}", whole, decimals).parse().ok();
        } else {
            return None;
        }
    } else {
        integer.to_string()
    };

    if integer_digits.is_empty() {
        return None;
    }

    match fraction {
        Some(fraction) => format!("{}.{}", integer_digits, fraction).parse().ok(),
        None => integer_digits.parse().ok(),
    }
}

/// `1,234` / `12,345,678`: a 1-3 digit head followed by groups of exactly three
fn is_thousands_grouped(integer: &str) -> bool {
    let mut groups = integer.split(',');
    let head_ok = groups
        .next()
        .is_some_and(|head| (1..=3).contains(&head.len()) && head.chars().all(|c| c.is_ascii_digit()));

    head_ok && groups.all(|group| group.len() == 3 && group.chars().all(|c| c.is_ascii_digit()))
}
