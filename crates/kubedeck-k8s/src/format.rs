//! Quantity, CPU, memory and age formatting

use chrono::{DateTime, Duration, Utc};

const NANOS_PER_UNIT: i128 = 1_000_000_000;

const KIB: i64 = 1024;
const MIB: i64 = KIB * 1024;
const GIB: i64 = MIB * 1024;

/// Suffix family a quantity was written in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantityFormat {
    BinarySi,
    DecimalSi,
    DecimalExponent,
}

/// A resource quantity held exactly, in billionths of a unit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParsedQuantity {
    pub nanos: i128,
    pub format: QuantityFormat,
}

impl ParsedQuantity {
    /// Value in thousandths of a unit, rounded up (CPU millicores)
    pub fn milli_value(&self) -> i64 {
        saturate(ceil_div(self.nanos, 1_000_000))
    }

    /// Value in whole units, rounded up (bytes for memory)
    pub fn value(&self) -> i64 {
        saturate(ceil_div(self.nanos, NANOS_PER_UNIT))
    }
}

fn saturate(n: i128) -> i64 {
    i64::try_from(n).unwrap_or(if n < 0 { i64::MIN } else { i64::MAX })
}

fn ceil_div(n: i128, d: i128) -> i128 {
    let q = n / d;
    if n % d > 0 { q + 1 } else { q }
}

/// Parse a Kubernetes quantity such as `500m`, `128Mi`, `1.5`, `1e3` or `2k`
pub fn parse_quantity(s: &str) -> Option<ParsedQuantity> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (negative, body) = match s.as_bytes()[0] {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let number_end = body
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(body.len());
    let (number, suffix) = body.split_at(number_end);
    if number.is_empty() || number == "." {
        return None;
    }

    // number = digits * 10^-scale
    let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
    if frac_part.contains('.') {
        return None;
    }
    let digits_str = format!("{int_part}{frac_part}");
    let digits: i128 = digits_str.parse().ok()?;
    let scale = frac_part.len() as i32;

    let (exp10, pow2, format) = match suffix {
        "" => (0, 0, QuantityFormat::DecimalSi),
        "n" => (-9, 0, QuantityFormat::DecimalSi),
        "u" => (-6, 0, QuantityFormat::DecimalSi),
        "m" => (-3, 0, QuantityFormat::DecimalSi),
        "k" => (3, 0, QuantityFormat::DecimalSi),
        "M" => (6, 0, QuantityFormat::DecimalSi),
        "G" => (9, 0, QuantityFormat::DecimalSi),
        "T" => (12, 0, QuantityFormat::DecimalSi),
        "P" => (15, 0, QuantityFormat::DecimalSi),
        "E" => (18, 0, QuantityFormat::DecimalSi),
        "Ki" => (0, 10, QuantityFormat::BinarySi),
        "Mi" => (0, 20, QuantityFormat::BinarySi),
        "Gi" => (0, 30, QuantityFormat::BinarySi),
        "Ti" => (0, 40, QuantityFormat::BinarySi),
        "Pi" => (0, 50, QuantityFormat::BinarySi),
        "Ei" => (0, 60, QuantityFormat::BinarySi),
        other => {
            let exp = other.strip_prefix(['e', 'E'])?;
            (exp.parse::<i32>().ok()?, 0, QuantityFormat::DecimalExponent)
        }
    };

    let mut nanos = digits.checked_mul(1i128.checked_shl(pow2)?)?;
    let shift = 9i32.checked_add(exp10)?.checked_sub(scale)?;
    if shift >= 0 {
        nanos = nanos.checked_mul(10i128.checked_pow(shift.unsigned_abs())?)?;
    } else {
        // Precision below a nano rounds up to the next nano
        nanos = match 10i128.checked_pow(shift.unsigned_abs()) {
            Some(divisor) => ceil_div(nanos, divisor),
            None => i128::from(nanos > 0),
        };
    }

    Some(ParsedQuantity {
        nanos: if negative { -nanos } else { nanos },
        format,
    })
}

/// Render a quantity in its canonical form: `1000` becomes `1k`, `0.5` becomes `500m`.
/// Unparsable input is returned unchanged.
pub fn canonical_quantity(s: &str) -> String {
    match parse_quantity(s) {
        Some(q) => format_quantity(q),
        None => s.to_string(),
    }
}

fn format_quantity(q: ParsedQuantity) -> String {
    if q.nanos == 0 {
        return "0".to_string();
    }
    let sign = if q.nanos < 0 { "-" } else { "" };
    let abs = q.nanos.abs();

    if q.format == QuantityFormat::BinarySi && abs % NANOS_PER_UNIT == 0 {
        let units = abs / NANOS_PER_UNIT;
        const BINARY: [(u32, &str); 6] =
            [(60, "Ei"), (50, "Pi"), (40, "Ti"), (30, "Gi"), (20, "Mi"), (10, "Ki")];
        for (shift, suffix) in BINARY {
            let base = 1i128 << shift;
            if units >= base && units % base == 0 {
                return format!("{sign}{}{suffix}", units / base);
            }
        }
    }

    for (exp, suffix) in [
        (18, "E"),
        (15, "P"),
        (12, "T"),
        (9, "G"),
        (6, "M"),
        (3, "k"),
        (0, ""),
        (-3, "m"),
        (-6, "u"),
        (-9, "n"),
    ] {
        let base = 10i128.pow((9 + exp) as u32);
        if abs % base == 0 {
            return format!("{sign}{}{suffix}", abs / base);
        }
    }
    format!("{sign}{abs}n")
}

/// CPU quantity in millicores (0 if unparsable)
pub fn cpu_millis(quantity: &str) -> i64 {
    parse_quantity(quantity).map(|q| q.milli_value()).unwrap_or(0)
}

/// Memory quantity in bytes (0 if unparsable)
pub fn memory_bytes(quantity: &str) -> i64 {
    parse_quantity(quantity).map(|q| q.value()).unwrap_or(0)
}

/// Format millicores: `250m` below one core, `1.50` above
pub fn format_cpu(millis: i64) -> String {
    if millis < 1000 {
        format!("{millis}m")
    } else {
        format!("{:.2}", millis as f64 / 1000.0)
    }
}

/// Format bytes with 1024-based suffixes
pub fn format_memory(bytes: i64) -> String {
    if bytes < KIB {
        format!("{bytes}B")
    } else if bytes < MIB {
        format!("{:.1}Ki", bytes as f64 / KIB as f64)
    } else if bytes < GIB {
        format!("{:.1}Mi", bytes as f64 / MIB as f64)
    } else {
        format!("{:.1}Gi", bytes as f64 / GIB as f64)
    }
}

/// Human readable duration: `45s`, `5m`, `2h`, `3d`
pub fn format_age(duration: Duration) -> String {
    let secs = duration.num_seconds().max(0);
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}

/// Age of a timestamp relative to `now`, `<unknown>` when absent
pub fn age_since(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match ts {
        Some(ts) => format_age(now - ts),
        None => "<unknown>".to_string(),
    }
}

/// Usage as a percentage of a limit, when the limit is set
pub fn percent_of(usage: i64, limit: i64) -> Option<f64> {
    if limit > 0 {
        Some(usage as f64 * 100.0 / limit as f64)
    } else {
        None
    }
}
