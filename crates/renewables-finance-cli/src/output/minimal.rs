use serde_json::Value;

use super::{format_scalar, result_of};

/// Headline fields, most important first.
const PRIORITY_KEYS: [&str; 8] = [
    "debt_amount",
    "total_debt",
    "irr",
    "equity_irr_annualised",
    "equity_irr",
    "max_gearing",
    "portfolio_gearing",
    "index",
];

/// Print just the headline value of a result.
///
/// Looks for well-known result fields in priority order, then falls back to
/// the first field. Arrays print one headline per row.
pub fn print_minimal(value: &Value) {
    match result_of(value) {
        Value::Array(rows) => {
            for row in rows {
                println!("{}", headline(row));
            }
        }
        other => println!("{}", headline(other)),
    }
}

fn headline(value: &Value) -> String {
    let Value::Object(map) = value else {
        return format_scalar(value);
    };

    for key in PRIORITY_KEYS {
        if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
            return format_scalar(val);
        }
    }

    map.iter()
        .next()
        .map(|(key, val)| format!("{key}: {}", format_scalar(val)))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_headline_prefers_debt_amount() {
        let result = json!({ "equity_irr": "0.01", "debt_amount": "39.2" });
        assert_eq!(headline(&result), "39.2");
    }

    #[test]
    fn test_headline_skips_null_priority_keys() {
        let result = json!({ "irr": null, "equity_irr_annualised": "0.11" });
        assert_eq!(headline(&result), "0.11");
    }

    #[test]
    fn test_headline_falls_back_to_first_field() {
        assert_eq!(headline(&json!({ "foo": 3 })), "foo: 3");
    }
}
