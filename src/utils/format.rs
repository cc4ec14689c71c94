use regex::Regex;
use std::sync::LazyLock;

static UPPERCASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z])").expect("static regex"));

static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)").expect("static regex"));

const COMPACT_UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

/// Formatea un número en notación compacta (77777 -> "78K", 1234 -> "1.2K").
pub fn format_number(number: f64) -> String {
    let sign = if number < 0.0 { "-" } else { "" };
    let abs = number.abs();

    for (i, (scale, suffix)) in COMPACT_UNITS.iter().enumerate() {
        if abs < *scale {
            continue;
        }

        let rounded = round_compact(abs / scale);
        // 999_999 redondea a "1000K": subir a la unidad siguiente
        if rounded >= 1000.0 && i > 0 {
            let (next_scale, next_suffix) = COMPACT_UNITS[i - 1];
            return format!("{}{}{}", sign, round_compact(abs / next_scale), next_suffix);
        }
        return format!("{}{}{}", sign, rounded, suffix);
    }

    let rounded = round_compact(abs);
    if rounded >= 1000.0 {
        return format!("{}1K", sign);
    }
    format!("{}{}", sign, rounded)
}

/// Dos cifras significativas por debajo de 100, enteros a partir de ahí
fn round_compact(value: f64) -> f64 {
    if value < 1.0 {
        (value * 100.0).round() / 100.0
    } else if value < 10.0 {
        (value * 10.0).round() / 10.0
    } else {
        value.round()
    }
}

/// Separa las mayúsculas con espacios y pasa todo a minúsculas ("helloWorld" -> "hello world").
pub fn upper_case_to_space(text: &str) -> String {
    UPPERCASE.replace_all(text, " $1").trim().to_lowercase()
}

pub fn upper_case_to_space_all<S: AsRef<str>>(texts: &[S]) -> Vec<String> {
    texts.iter().map(|t| upper_case_to_space(t.as_ref())).collect()
}

/// Convierte segundos a `H:MM:SS` / `MM:SS`.
pub fn seconds_to_hms(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = seconds % 3600 / 60;
    let s = seconds % 60;

    let h_display = if h > 0 { format!("{}:", h) } else { String::new() };
    let m_display = if m > 0 {
        format!("{}{}:", if m < 10 && h > 0 { "0" } else { "" }, m)
    } else {
        "00:".to_string()
    };
    let s_display = if s > 0 { format!("{:02}", s) } else { "00".to_string() };

    format!("{}{}{}", h_display, m_display, s_display)
}

/// Igual que [`seconds_to_hms`] pero desde texto. Solo cuentan los dígitos
/// iniciales ("90.5" -> 90); sin dígitos devuelve "00:00:00".
pub fn seconds_to_hms_str(seconds: &str) -> String {
    LEADING_DIGITS
        .captures(seconds)
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .map(seconds_to_hms)
        .unwrap_or_else(|| "00:00:00".to_string())
}

/// 1 -> "1st", 2 -> "2nd", 11 -> "11th", 23 -> "23rd"
pub fn number_to_ordinal(n: u64) -> String {
    let v = n % 100;
    let suffix = if v >= 20 {
        match (v - 20) % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        }
    } else {
        match v {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        }
    };
    format!("{}{}", n, suffix)
}

/// Tiempo legible a partir de milisegundos ("42 sec", "3 min", "1 hr 2 min").
pub fn simple_time_format(ms: u64, include_seconds: bool) -> String {
    let s = ms / 1000;
    if s <= 59 {
        return format!("{} sec", s);
    }

    if s < 60 * 60 {
        let mins = s / 60;
        let secs = s % 60;
        return if include_seconds {
            format!("{} min {} sec", mins, secs)
        } else {
            format!("{} min", mins)
        };
    }

    let hrs = s / 3600;
    let mins = (s % 3600) / 60;
    let secs = s % 60;
    if include_seconds {
        format!("{} hr {} min {} sec", hrs, mins, secs)
    } else {
        format!("{} hr {} min", hrs, mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(1234.0), "1.2K");
        assert_eq!(format_number(77777.0), "78K");
        assert_eq!(format_number(123_456.0), "123K");
        assert_eq!(format_number(999_999.0), "1M");
        assert_eq!(format_number(1_500_000.0), "1.5M");
        assert_eq!(format_number(-1500.0), "-1.5K");
    }

    #[test]
    fn test_upper_case_to_space() {
        assert_eq!(upper_case_to_space("helloWorld"), "hello world");
        assert_eq!(upper_case_to_space("QueueEnd"), "queue end");
        assert_eq!(
            upper_case_to_space_all(&["helloWorld", "helloWorld2"]),
            vec!["hello world", "hello world2"]
        );
        assert!(upper_case_to_space_all::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_seconds_to_hms() {
        assert_eq!(seconds_to_hms(0), "00:00");
        assert_eq!(seconds_to_hms(5), "00:05");
        assert_eq!(seconds_to_hms(65), "1:05");
        assert_eq!(seconds_to_hms(3605), "1:00:05");
        assert_eq!(seconds_to_hms(3725), "1:02:05");
        assert_eq!(seconds_to_hms_str("65"), "1:05");
        assert_eq!(seconds_to_hms_str("abc"), "00:00:00");
        assert_eq!(seconds_to_hms_str("90.5"), "1:30");
        assert_eq!(seconds_to_hms_str("65abc"), "1:05");
        assert_eq!(seconds_to_hms_str(" 5"), "00:05");
        assert_eq!(seconds_to_hms_str(""), "00:00:00");
    }

    #[test]
    fn test_number_to_ordinal() {
        let got: Vec<String> = [1, 2, 3, 4, 11, 12, 13, 21, 22, 23, 100, 101, 111]
            .into_iter()
            .map(number_to_ordinal)
            .collect();
        assert_eq!(
            got,
            vec![
                "1st", "2nd", "3rd", "4th", "11th", "12th", "13th", "21st", "22nd", "23rd",
                "100th", "101st", "111th"
            ]
        );
    }

    #[test]
    fn test_simple_time_format() {
        assert_eq!(simple_time_format(42_000, false), "42 sec");
        assert_eq!(simple_time_format(185_000, false), "3 min");
        assert_eq!(simple_time_format(185_000, true), "3 min 5 sec");
        assert_eq!(simple_time_format(3_723_000, false), "1 hr 2 min");
        assert_eq!(simple_time_format(3_723_000, true), "1 hr 2 min 3 sec");
    }
}
