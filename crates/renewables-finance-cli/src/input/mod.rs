pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Load a command input from `--input` if given, otherwise from piped stdin.
pub fn load<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        log::debug!("Reading {what} from {path}");
        return file::read_input(path).map(Some);
    }
    let piped = stdin::read_stdin()?;
    if piped.is_some() {
        log::debug!("Reading {what} from stdin");
    }
    Ok(piped)
}

/// Like [`load`], but the input is mandatory.
pub fn require<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    load(path, what)?
        .ok_or_else(|| format!("--input <file.json|file.yaml> or stdin required for {what}").into())
}
