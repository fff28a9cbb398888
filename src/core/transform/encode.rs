//! CSV cell encoding

/// Encodes one cell value
///
/// Absent and empty values become `""` (an explicit empty string) unless the
/// column allows blanks, in which case the cell is left empty. Values holding
/// a line break, a double quote or a comma are quoted with inner quotes
/// doubled.
pub fn encode(value: Option<&str>, allow_blank: bool) -> String {
    match value {
        None | Some("") if allow_blank => String::new(),
        None | Some("") => "\"\"".to_string(),
        Some(text) if needs_quoting(text) => format!("\"{}\"", text.replace('"', "\"\"")),
        Some(text) => text.to_string(),
    }
}

fn needs_quoting(text: &str) -> bool {
    text.contains(['\n', '\r', '"', ','])
}

/// Joins already encoded cells into a row
pub fn join_cells<I, S>(cells: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    cells
        .into_iter()
        .map(|cell| cell.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",")
}
