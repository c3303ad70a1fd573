pub mod analytics;
pub mod index;

use serde::de::DeserializeOwned;

use crate::input;

/// Load a typed request from `--input` (JSON or YAML, by extension),
/// falling back to JSON piped via stdin.
pub(crate) fn read_request<T: DeserializeOwned>(
    input_path: &Option<String>,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(ref path) = input_path {
        input::file::read_document(path)
    } else if let Some(data) = input::stdin::read_stdin()? {
        Ok(serde_json::from_value(data)?)
    } else {
        Err("--input <file.json|file.yaml> or stdin required".into())
    }
}
