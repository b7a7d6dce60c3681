use serde_json::{Map, Value};
use std::io;

use super::{format_scalar, result_of, SERIES_KEYS};

/// Write output as CSV to stdout.
///
/// Results carrying a per-period series (equity cash flows first) are written
/// as one row per period; anything else becomes `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let written = match result_of(value) {
        Value::Array(rows) => write_rows(&mut wtr, rows),
        Value::Object(result) => match primary_series(result) {
            Some(rows) => write_rows(&mut wtr, rows),
            None => write_fields(&mut wtr, result),
        },
        other => wtr.write_record([format_scalar(other)]),
    };

    if let Err(e) = written.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        log::error!("CSV write error: {e}");
    }
}

fn primary_series(result: &Map<String, Value>) -> Option<&[Value]> {
    SERIES_KEYS
        .iter()
        .find_map(|key| match result.get(*key) {
            Some(Value::Array(rows)) if !rows.is_empty() => Some(rows.as_slice()),
            _ => None,
        })
}

fn write_fields<W: io::Write>(wtr: &mut csv::Writer<W>, map: &Map<String, Value>) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in map {
        wtr.write_record([key.as_str(), &format_scalar(val)])?;
    }
    Ok(())
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = rows.first() else {
        for row in rows {
            wtr.write_record([format_scalar(row)])?;
        }
        return Ok(());
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    wtr.write_record(&headers)?;
    for row in rows.iter().filter_map(Value::as_object) {
        let record: Vec<String> = headers
            .iter()
            .map(|h| row.get(*h).map(format_scalar).unwrap_or_default())
            .collect();
        wtr.write_record(&record)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(rows: &[Value]) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_rows(&mut wtr, rows).unwrap();
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_rows_use_first_row_headers() {
        let rows = vec![
            json!({ "period_index": 0, "net_cash_flow": "-5" }),
            json!({ "period_index": 1, "net_cash_flow": "0.4" }),
        ];
        assert_eq!(render(&rows), "net_cash_flow,period_index\n-5,0\n0.4,1\n");
    }

    #[test]
    fn test_equity_series_takes_priority() {
        let result = json!({
            "debt_service_schedule": [{ "a": 1 }],
            "equity_cash_flows": [{ "b": 2 }],
        });
        let rows = primary_series(result.as_object().unwrap()).unwrap();
        assert_eq!(rows[0], json!({ "b": 2 }));
    }
}
