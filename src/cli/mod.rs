use serde_json::Value;
use terminal_size::{terminal_size, Height, Width};

pub mod connectivity;

// Render a list response as an ASCII table.
// `key` names the array inside the response body; `preferred` picks and
// orders the columns (empty means union of keys, sorted).
// Returns true if a table was printed, false otherwise.
pub fn print_rows(val: &Value, key: &str, preferred: &[&str]) -> bool {
    // Honor env override to force JSON output
    if std::env::var("JURONET_OUTPUT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false) {
        return false;
    }
    let rows_v = match val.get(key) {
        Some(v) => v,
        None => val,
    };
    let arr = match rows_v {
        Value::Array(arr) => arr,
        _ => return false,
    };
    if arr.is_empty() {
        println!("(no rows)");
        return true;
    }

    // Determine columns: preferred keys that actually occur, else the sorted
    // union of keys across all rows.
    let mut cols: Vec<String> = Vec::new();
    if preferred.is_empty() {
        for el in arr {
            if let Value::Object(map) = el {
                for k in map.keys() {
                    if !cols.contains(k) {
                        cols.push(k.clone());
                    }
                }
            }
        }
        cols.sort();
    } else {
        for k in preferred {
            let present = arr
                .iter()
                .any(|el| matches!(el, Value::Object(map) if map.contains_key(*k)));
            if present {
                cols.push((*k).to_string());
            }
        }
    }
    if cols.is_empty() {
        return false;
    }

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(arr.len());
    for el in arr {
        match el {
            Value::Object(map) => {
                rows.push(
                    cols.iter()
                        .map(|k| to_cell_string(map.get(k).unwrap_or(&Value::Null)))
                        .collect(),
                );
            }
            x => rows.push(vec![to_cell_string(x)]),
        }
    }

    // Compute widths, capped so the table fits the terminal
    let max_col_width: usize = (get_terminal_width() / cols.len().max(1)).saturating_sub(3).max(8);
    let mut widths: Vec<usize> = cols.iter().map(|s| s.len().min(max_col_width)).collect();
    for r in &rows {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            let w = display_len(cell);
            if w > widths[i] {
                widths[i] = w.min(max_col_width);
            }
        }
    }

    let sep = build_separator(&widths);
    println!("{}", sep);
    println!("{}", build_row(&cols, &widths));
    println!("{}", sep);
    for r in &rows {
        println!("{}", build_row(r, &widths));
    }
    println!("{}", sep);
    println!("rows: {}", rows.len());
    true
}

// Render a flat JSON object as a two-column field/value table. Used for the
// dashboard and summary payloads.
pub fn print_summary(val: &Value, key: &str) -> bool {
    if std::env::var("JURONET_OUTPUT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false) {
        return false;
    }
    let obj_v = match val.get(key) {
        Some(v) => v,
        None => val,
    };
    let Value::Object(map) = obj_v else {
        return false;
    };
    let mut rows: Vec<Vec<String>> = Vec::new();
    for (k, v) in map {
        // Nested lists render better through print_rows; skip them here
        if matches!(v, Value::Array(_)) {
            continue;
        }
        rows.push(vec![k.clone(), to_cell_string(v)]);
    }
    if rows.is_empty() {
        return false;
    }
    let cols = vec!["field".to_string(), "value".to_string()];
    let value_cap = get_terminal_width().saturating_sub(24).max(16);
    let mut widths: Vec<usize> = cols.iter().map(|s| s.len()).collect();
    for r in &rows {
        for (i, cell) in r.iter().enumerate() {
            let w = display_len(cell).min(value_cap);
            if w > widths[i] {
                widths[i] = w;
            }
        }
    }
    let sep = build_separator(&widths);
    println!("{}", sep);
    println!("{}", build_row(&cols, &widths));
    println!("{}", sep);
    for r in &rows {
        println!("{}", build_row(r, &widths));
    }
    println!("{}", sep);
    true
}

fn to_cell_string(v: &Value) -> String {
    match v {
        Value::Null => String::from(""),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        // keep objects/arrays compact
        other => other.to_string(),
    }
}

fn display_len(s: &str) -> usize {
    s.chars().count()
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).cloned().unwrap_or_default();
        let (text, align_right) = (truncate(&cell, *w), is_numeric_like(&cell));
        s.push(' ');
        if align_right {
            let pad = w.saturating_sub(display_len(&text));
            s.push_str(&" ".repeat(pad));
            s.push_str(&text);
        } else {
            s.push_str(&text);
            let pad = w.saturating_sub(display_len(&text));
            s.push_str(&" ".repeat(pad));
        }
        s.push(' ');
        s.push('|');
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        return s.to_string();
    }
    if max <= 1 {
        return "…".to_string();
    }
    let take = max - 1;
    s.chars().take(take).collect::<String>() + "…"
}

fn get_terminal_width() -> usize {
    let size = terminal_size();
    if let Some((Width(w), Height(_h))) = size {
        return (w as usize).saturating_sub(4);
    }
    80
}

fn is_numeric_like(s: &str) -> bool {
    // crude detection for aligning numbers to right
    let st = s.trim();
    if st.is_empty() {
        return false;
    }
    let mut has_digit = false;
    for ch in st.chars() {
        if ch.is_ascii_digit() {
            has_digit = true;
            continue;
        }
        if ".-+eE,_".contains(ch) {
            continue;
        }
        return false;
    }
    has_digit
}
