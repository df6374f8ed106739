use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::DisplayConfig;

/// Quantities show at most this many decimal places.
const QUANTITY_DECIMALS: u32 = 8;

/// Insert thousands separators into a run of integer digits.
fn group_int_digits(int_part: &str) -> String {
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Pad (or cut) the fractional part to exactly `dp` digits.
fn fixed_fraction(s: &str, dp: u32) -> String {
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
    if dp == 0 {
        return int_part.to_string();
    }
    let mut frac: String = frac_part.chars().take(dp as usize).collect();
    while frac.len() < dp as usize {
        frac.push('0');
    }
    format!("{int_part}.{frac}")
}

fn group_number_string(s: &str) -> String {
    if let Some(unsigned) = s.strip_prefix('-') {
        return format!("-{}", group_number_string(unsigned));
    }
    match s.split_once('.') {
        Some((int_part, frac)) if !frac.is_empty() => {
            format!("{}.{frac}", group_int_digits(int_part))
        }
        Some((int_part, _)) => group_int_digits(int_part),
        None => group_int_digits(s),
    }
}

/// Format an amount in the reporting currency.
///
/// - `decimals`: round half away from zero and pad to exactly that many places
/// - `grouping`: thousands separators (`,`)
/// - `symbol`: optional prefix placed after any minus sign (`-$12.00`)
pub fn format_currency(
    value: Decimal,
    decimals: Option<u32>,
    grouping: bool,
    symbol: Option<&str>,
) -> String {
    let rounded = match decimals {
        Some(dp) => value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
        None => value,
    };

    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let mut s = rounded.abs().normalize().to_string();
    if let Some(dp) = decimals {
        s = fixed_fraction(&s, dp);
    }
    if grouping {
        s = group_number_string(&s);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if let Some(sym) = symbol {
        out.push_str(sym);
    }
    out.push_str(&s);
    out
}

/// Format a holding quantity: up to eight decimals, trailing zeros dropped.
pub fn format_quantity(value: Decimal, grouping: bool) -> String {
    let s = value
        .round_dp_with_strategy(QUANTITY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
        .to_string();
    if grouping {
        group_number_string(&s)
    } else {
        s
    }
}

/// Format a portfolio share as `12.34%`.
pub fn format_percent(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{}%", fixed_fraction(&rounded.normalize().to_string(), 2))
}

/// Display settings bound together, with an optional discretion mode that
/// masks amounts but keeps percentages.
#[derive(Debug, Clone)]
pub struct Formatter {
    display: DisplayConfig,
    hide_values: bool,
}

impl Formatter {
    pub fn new(display: DisplayConfig) -> Self {
        Self {
            display,
            hide_values: false,
        }
    }

    pub fn hiding_values(mut self, hide: bool) -> Self {
        self.hide_values = hide;
        self
    }

    pub fn hides_values(&self) -> bool {
        self.hide_values
    }

    pub fn width(&self) -> usize {
        self.display.width
    }

    pub fn currency(&self, value: Decimal) -> String {
        if self.hide_values {
            return self.display.placeholder.clone();
        }
        format_currency(
            value,
            self.display.currency_decimals,
            self.display.currency_grouping,
            self.display.currency_symbol.as_deref(),
        )
    }

    pub fn quantity(&self, value: Decimal) -> String {
        if self.hide_values {
            return self.display.placeholder.clone();
        }
        format_quantity(value, self.display.currency_grouping)
    }

    pub fn percent(&self, value: Decimal) -> String {
        format_percent(value)
    }
}
