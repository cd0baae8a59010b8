// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recursive and tabular value dumpers behind `Engine.dump_r` and friends.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use tandem_script::{ObjKind, Value};

/// `dump_r` output: one line per node, indented two spaces per depth.
pub fn dump_recursive(value: &Value) -> String {
    let mut out = String::new();
    let mut seen = HashSet::new();
    dump_value(None, value, 0, &mut seen, &mut out);
    out
}

fn dump_value(
    name: Option<&str>,
    value: &Value,
    depth: usize,
    seen: &mut HashSet<usize>,
    out: &mut String,
) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    let label = name.unwrap_or("");
    let sep = if label.is_empty() { "" } else { " = " };
    match value {
        Value::Object(obj) => {
            let tag = match obj.kind() {
                ObjKind::Array => "Array",
                ObjKind::HashList => "HashList",
                ObjKind::Native(t) => t,
                ObjKind::Plain => "Object",
            };
            let ptr = Arc::as_ptr(obj) as usize;
            if !seen.insert(ptr) {
                let _ = writeln!(out, "{}{}'[recursive {}]'", label, sep, tag);
                return;
            }
            let _ = writeln!(out, "{}{}'[object {}]'", label, sep, tag);
            for key in obj.keys() {
                if let Some(v) = obj.get_own(&key) {
                    dump_value(Some(&key), &v, depth + 1, seen, out);
                }
            }
            seen.remove(&ptr);
        }
        Value::Func(f) => {
            let _ = writeln!(out, "{}{}'[function {}()]'", label, sep, f.name());
        }
        other => {
            let _ = writeln!(out, "{}{}'{}' ({})", label, sep, other.to_display(), other.type_of());
        }
    }
}

/// `dump_t` output. Accepts the two tabular shapes: an array of row
/// objects, or an object whose properties are column arrays.
pub fn dump_table(value: &Value) -> String {
    let Some(obj) = value.as_object() else {
        return String::new();
    };
    let (columns, rows) = if obj.kind() == ObjKind::Array {
        rows_of_objects(obj)
    } else {
        object_of_columns(obj)
    };
    render_table(&columns, &rows)
}

/// Array of objects: every element contributes a row, columns are the
/// union of the row keys in first-seen order.
fn rows_of_objects(arr: &tandem_script::ObjRef) -> (Vec<String>, Vec<Vec<String>>) {
    let mut columns: Vec<String> = Vec::new();
    let mut row_objs = Vec::new();
    for i in 0..arr.length() {
        if let Some(Value::Object(row)) = arr.get_own(&i.to_string()) {
            for key in row.keys() {
                if !columns.contains(&key) {
                    columns.push(key);
                }
            }
            row_objs.push(row);
        }
    }
    let rows = row_objs
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get_own(c).map(|v| v.to_display()).unwrap_or_default())
                .collect()
        })
        .collect();
    (columns, rows)
}

/// Object of column arrays: property names are headers, the longest
/// column decides the row count.
fn object_of_columns(obj: &tandem_script::ObjRef) -> (Vec<String>, Vec<Vec<String>>) {
    let columns = obj.keys();
    let cells: Vec<Vec<String>> = columns
        .iter()
        .map(|c| match obj.get_own(c) {
            Some(Value::Object(col)) if col.kind() == ObjKind::Array => (0..col.length())
                .map(|i| col.get_own(&i.to_string()).map(|v| v.to_display()).unwrap_or_default())
                .collect(),
            Some(v) => vec![v.to_display()],
            None => Vec::new(),
        })
        .collect();
    let height = cells.iter().map(Vec::len).max().unwrap_or(0);
    let rows = (0..height)
        .map(|r| cells.iter().map(|col| col.get(r).cloned().unwrap_or_default()).collect())
        .collect();
    (columns, rows)
}

fn render_table(columns: &[String], rows: &[Vec<String>]) -> String {
    if columns.is_empty() {
        return String::new();
    }
    let mut widths: Vec<usize> = columns.iter().map(String::len).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.len());
            }
        }
    }
    let mut out = String::new();
    let mut line = String::new();
    for (i, c) in columns.iter().enumerate() {
        let _ = write!(line, "{:width$} ", c, width = widths[i]);
    }
    out.push_str(line.trim_end());
    out.push('\n');
    line.clear();
    for (i, _) in columns.iter().enumerate() {
        let _ = write!(line, "{} ", "-".repeat(widths[i]));
    }
    out.push_str(line.trim_end());
    out.push('\n');
    for row in rows {
        line.clear();
        for (i, cell) in row.iter().enumerate() {
            let _ = write!(line, "{:width$} ", cell, width = widths[i]);
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
#[path = "dump_tests.rs"]
mod tests;
