//! Minor-unit currency helpers used by installment math and reporting.

pub fn symbol_for(code: &str) -> String {
    match code {
        "USD" => "$".into(),
        "EUR" => "€".into(),
        "GBP" => "£".into(),
        "JPY" => "¥".into(),
        "CAD" => "CAD".into(),
        "AUD" => "A$".into(),
        "CHF" => "CHF".into(),
        _ => code.into(),
    }
}

pub fn minor_units_for(code: &str) -> u8 {
    match code {
        "JPY" => 0,
        "KWD" | "BHD" => 3,
        _ => 2,
    }
}

/// Converts a major-unit value to minor units, rounding half away from zero.
pub fn major_to_minor(value: f64, code: &str) -> i64 {
    let scale = 10i64.pow(minor_units_for(code) as u32) as f64;
    (value * scale).round() as i64
}

/// Converts minor units back to a major-unit value.
pub fn minor_to_major(amount_minor: i64, code: &str) -> f64 {
    let scale = 10i64.pow(minor_units_for(code) as u32) as f64;
    amount_minor as f64 / scale
}

/// Renders a minor-unit amount with the currency symbol, e.g. `€800.00`.
pub fn format_minor(amount_minor: i64, code: &str) -> String {
    let precision = minor_units_for(code) as usize;
    let scale = 10i64.pow(precision as u32);
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.abs();
    let symbol = symbol_for(code);
    if precision == 0 {
        format!("{}{}{}", sign, symbol, abs)
    } else {
        format!(
            "{}{}{}.{:0width$}",
            sign,
            symbol,
            abs / scale,
            abs % scale,
            width = precision
        )
    }
}
