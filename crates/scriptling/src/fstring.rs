//! Format-spec handling for f-string replacement fields.
//!
//! Supports the Python-style mini-language: `[[fill]align][sign][0][width]
//! [,][.precision][type]` with alignment `< > ^`, sign `+ - <space>`,
//! thousands grouping, and the presentation types
//! `f e E g G x X o b d s %`.

use crate::{
    exception::{ExcType, Exception},
    object::{Object, format_float},
};

#[derive(Debug, Default)]
struct FormatSpec {
    fill: Option<char>,
    align: Option<char>,
    sign: Option<char>,
    zero: bool,
    width: usize,
    thousands: bool,
    precision: Option<usize>,
    ty: Option<char>,
}

fn parse_spec(spec: &str) -> Result<FormatSpec, Exception> {
    let chars: Vec<char> = spec.chars().collect();
    let mut out = FormatSpec::default();
    let mut i = 0;

    if chars.len() >= 2 && matches!(chars[1], '<' | '>' | '^') {
        out.fill = Some(chars[0]);
        out.align = Some(chars[1]);
        i = 2;
    } else if chars.first().is_some_and(|c| matches!(c, '<' | '>' | '^')) {
        out.align = Some(chars[0]);
        i = 1;
    }

    if chars.get(i).is_some_and(|c| matches!(c, '+' | '-' | ' ')) {
        out.sign = Some(chars[i]);
        i += 1;
    }

    if chars.get(i) == Some(&'0') {
        out.zero = true;
        i += 1;
    }

    while chars.get(i).is_some_and(char::is_ascii_digit) {
        out.width = out.width * 10 + chars[i].to_digit(10).unwrap_or(0) as usize;
        i += 1;
    }

    if chars.get(i) == Some(&',') {
        out.thousands = true;
        i += 1;
    }

    if chars.get(i) == Some(&'.') {
        i += 1;
        let mut precision = 0usize;
        let mut digits = 0;
        while chars.get(i).is_some_and(char::is_ascii_digit) {
            precision = precision * 10 + chars[i].to_digit(10).unwrap_or(0) as usize;
            i += 1;
            digits += 1;
        }
        if digits == 0 {
            return Err(Exception::new(
                ExcType::ValueError,
                format!("invalid format spec '{spec}': missing precision digits"),
            ));
        }
        out.precision = Some(precision);
    }

    if let Some(c) = chars.get(i) {
        if matches!(c, 'f' | 'F' | 'e' | 'E' | 'g' | 'G' | 'x' | 'X' | 'o' | 'b' | 'd' | 's' | '%') {
            out.ty = Some(*c);
            i += 1;
        }
    }

    if i != chars.len() {
        return Err(Exception::new(
            ExcType::ValueError,
            format!("invalid format spec '{spec}'"),
        ));
    }
    Ok(out)
}

/// Formats a value with a captured format spec, as in `f"{value:spec}"`.
pub(crate) fn format_with_spec(value: &Object, spec: &str) -> Result<String, Exception> {
    if spec.is_empty() {
        return Ok(value.to_string());
    }
    let spec = parse_spec(spec)?;

    let (body, negative, numeric) = render_body(value, &spec)?;
    let body = if numeric && spec.thousands {
        group_thousands(&body)
    } else {
        body
    };

    let sign = if numeric {
        if negative {
            "-"
        } else {
            match spec.sign {
                Some('+') => "+",
                Some(' ') => " ",
                _ => "",
            }
        }
    } else {
        ""
    };

    Ok(pad(&spec, sign, &body, numeric))
}

/// Produces the unsigned body text plus sign and numeric-ness flags.
fn render_body(value: &Object, spec: &FormatSpec) -> Result<(String, bool, bool), Exception> {
    let ty = spec.ty.unwrap_or(match value {
        // No explicit type: floats format generally, everything else as str().
        Object::Float(_) if spec.precision.is_some() => 'g',
        _ => '\0',
    });

    match ty {
        '\0' | 's' => {
            let mut text = value.to_string();
            if let Some(precision) = spec.precision {
                if !value.is_numeric() {
                    text.truncate_chars(precision);
                }
            }
            // A bare spec on a number still honors sign handling.
            if value.is_numeric() {
                let negative = text.starts_with('-');
                if negative {
                    text.remove(0);
                }
                return Ok((text, negative, true));
            }
            Ok((text, false, false))
        }
        'd' => {
            let n = int_operand(value, ty)?;
            Ok((n.unsigned_abs().to_string(), n < 0, true))
        }
        'b' | 'o' | 'x' | 'X' => {
            let n = int_operand(value, ty)?;
            let magnitude = n.unsigned_abs();
            let body = match ty {
                'b' => format!("{magnitude:b}"),
                'o' => format!("{magnitude:o}"),
                'x' => format!("{magnitude:x}"),
                _ => format!("{magnitude:X}"),
            };
            Ok((body, n < 0, true))
        }
        'f' | 'F' => {
            let f = float_operand(value, ty)?;
            let precision = spec.precision.unwrap_or(6);
            let abs = f.abs();
            Ok((format!("{abs:.precision$}"), f < 0.0, true))
        }
        'e' | 'E' => {
            let f = float_operand(value, ty)?;
            let precision = spec.precision.unwrap_or(6);
            let body = exponential(f.abs(), precision, ty == 'E');
            Ok((body, f < 0.0, true))
        }
        'g' | 'G' => {
            let f = float_operand(value, ty)?;
            let precision = spec.precision.unwrap_or(6).max(1);
            let body = general(f.abs(), precision, ty == 'G');
            Ok((body, f < 0.0, true))
        }
        '%' => {
            let f = float_operand(value, ty)?;
            let precision = spec.precision.unwrap_or(6);
            let scaled = f * 100.0;
            let abs = scaled.abs();
            Ok((format!("{abs:.precision$}%"), scaled < 0.0, true))
        }
        _ => Err(Exception::new(
            ExcType::ValueError,
            format!("unknown format type '{ty}'"),
        )),
    }
}

fn type_mismatch(value: &Object, ty: char) -> Exception {
    Exception::new(
        ExcType::TypeError,
        format!("cannot format {} with '{ty}'", value.type_name()),
    )
}

fn int_operand(value: &Object, ty: char) -> Result<i64, Exception> {
    match value {
        Object::Int(n) => Ok(*n),
        Object::Bool(b) => Ok(i64::from(*b)),
        other => Err(type_mismatch(other, ty)),
    }
}

fn float_operand(value: &Object, ty: char) -> Result<f64, Exception> {
    value.as_f64().ok_or_else(|| type_mismatch(value, ty))
}

/// `3.14 -> "3.140000e+00"` with a signed two-digit exponent.
fn exponential(f: f64, precision: usize, upper: bool) -> String {
    let mut exp = 0i32;
    let mut mantissa = f;
    if f != 0.0 && f.is_finite() {
        exp = f.abs().log10().floor() as i32;
        mantissa = f / 10f64.powi(exp);
        // Rounding the mantissa can push it to 10.0; renormalize.
        if format!("{mantissa:.precision$}").starts_with("10") {
            mantissa /= 10.0;
            exp += 1;
        }
    }
    let e = if upper { 'E' } else { 'e' };
    let exp_sign = if exp < 0 { '-' } else { '+' };
    let exp_abs = exp.abs();
    format!("{mantissa:.precision$}{e}{exp_sign}{exp_abs:02}")
}

/// Python `g`: fixed for moderate exponents, exponential otherwise, trailing
/// zeros stripped.
fn general(f: f64, precision: usize, upper: bool) -> String {
    if f == 0.0 {
        return "0".to_owned();
    }
    if !f.is_finite() {
        return format_float(f);
    }
    let exp = f.abs().log10().floor() as i32;
    if exp >= -4 && (exp as i64) < precision as i64 {
        let decimals = (precision as i64 - 1 - i64::from(exp)).max(0) as usize;
        let fixed = format!("{f:.decimals$}");
        strip_trailing_zeros(&fixed)
    } else {
        let body = exponential(f, precision.saturating_sub(1), upper);
        // Strip trailing zeros from the mantissa only.
        match body.split_once(['e', 'E']) {
            Some((mantissa, exponent)) => {
                let e = if upper { 'E' } else { 'e' };
                format!("{}{e}{exponent}", strip_trailing_zeros(mantissa))
            }
            None => body,
        }
    }
}

fn strip_trailing_zeros(text: &str) -> String {
    if !text.contains('.') {
        return text.to_owned();
    }
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_owned()
}

/// Inserts `,` separators into the integer part of a rendered number.
fn group_thousands(body: &str) -> String {
    let (int_part, rest) = match body.find(['.', 'e', 'E', '%']) {
        Some(pos) => body.split_at(pos),
        None => (body, ""),
    };
    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(body.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }
    grouped.push_str(rest);
    grouped
}

/// Applies width, fill, and alignment around the signed body.
fn pad(spec: &FormatSpec, sign: &str, body: &str, numeric: bool) -> String {
    let content_len = sign.chars().count() + body.chars().count();
    if spec.width <= content_len {
        return format!("{sign}{body}");
    }
    let padding = spec.width - content_len;
    let align = spec.align.unwrap_or(if numeric { '>' } else { '<' });

    // Zero-padding goes between the sign and the digits.
    if spec.zero && spec.align.is_none() && numeric {
        return format!("{sign}{}{body}", "0".repeat(padding));
    }

    let fill = spec.fill.unwrap_or(if spec.zero { '0' } else { ' ' });
    let fill_str = |n: usize| fill.to_string().repeat(n);
    match align {
        '<' => format!("{sign}{body}{}", fill_str(padding)),
        '^' => {
            let left = padding / 2;
            format!("{}{sign}{body}{}", fill_str(left), fill_str(padding - left))
        }
        _ => format!("{}{sign}{body}", fill_str(padding)),
    }
}

/// Char-aware truncation used for string precision.
trait TruncateChars {
    fn truncate_chars(&mut self, max: usize);
}

impl TruncateChars for String {
    fn truncate_chars(&mut self, max: usize) {
        if let Some((idx, _)) = self.char_indices().nth(max) {
            self.truncate(idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(value: &Object, spec: &str) -> String {
        format_with_spec(value, spec).expect("format failure")
    }

    #[test]
    fn fixed_precision() {
        assert_eq!(fmt(&Object::Float(3.14159), ".2f"), "3.14");
        assert_eq!(fmt(&Object::Float(-3.14159), ".1f"), "-3.1");
        assert_eq!(fmt(&Object::Int(2), ".3f"), "2.000");
    }

    #[test]
    fn width_and_alignment() {
        assert_eq!(fmt(&Object::str("hi"), "5"), "hi   ");
        assert_eq!(fmt(&Object::str("hi"), ">5"), "   hi");
        assert_eq!(fmt(&Object::str("hi"), "^6"), "  hi  ");
        assert_eq!(fmt(&Object::Int(42), "5"), "   42");
        assert_eq!(fmt(&Object::Int(42), "*<5"), "42***");
    }

    #[test]
    fn sign_and_zero_pad() {
        assert_eq!(fmt(&Object::Int(42), "+d"), "+42");
        assert_eq!(fmt(&Object::Int(-42), "+d"), "-42");
        assert_eq!(fmt(&Object::Int(7), "05d"), "00007");
        assert_eq!(fmt(&Object::Int(-7), "05d"), "-0007");
    }

    #[test]
    fn radix_types() {
        assert_eq!(fmt(&Object::Int(255), "x"), "ff");
        assert_eq!(fmt(&Object::Int(255), "X"), "FF");
        assert_eq!(fmt(&Object::Int(8), "o"), "10");
        assert_eq!(fmt(&Object::Int(5), "b"), "101");
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(fmt(&Object::Int(1_234_567), ","), "1,234,567");
        assert_eq!(fmt(&Object::Float(1234.5), ",.1f"), "1,234.5");
    }

    #[test]
    fn exponential_format() {
        assert_eq!(fmt(&Object::Float(3.14), ".2e"), "3.14e+00");
        assert_eq!(fmt(&Object::Float(0.00123), ".1e"), "1.2e-03");
    }

    #[test]
    fn percent_format() {
        assert_eq!(fmt(&Object::Float(0.25), ".0%"), "25%");
    }

    #[test]
    fn string_precision_truncates() {
        assert_eq!(fmt(&Object::str("hello"), ".3s"), "hel");
    }
}
