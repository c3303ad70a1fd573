use serde_json::Value;

/// Print just the key answer value from the output.
///
/// Heuristic: look for well-known result fields in order of priority,
/// descending into nested snapshot/portfolio objects, then fall back
/// to the first field in the result object.
pub fn print_minimal(value: &Value) {
    // Try to extract the "result" envelope
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        // A history result's headline number is the latest index value.
        if let Some(Value::Array(snapshots)) = map.get("snapshots") {
            if let Some(last) = snapshots.last().and_then(|s| s.get("value")) {
                println!("{}", format_minimal(last));
                return;
            }
        }

        let nested = [map.get("snapshot"), map.get("portfolio")];
        let priority_keys = [
            "index_value",
            "value",
            "new_divisor",
            "divisor",
            "sharpe_ratio",
            "total_return",
            "computed",
        ];

        for key in &priority_keys {
            let hit = map
                .get(*key)
                .or_else(|| nested.iter().flatten().find_map(|obj| obj.get(*key)));
            if let Some(val) = hit {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        // Fall back to first field
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    // Not an object, just print directly
    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
