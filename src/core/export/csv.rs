//! CSV output tables
//!
//! Every export writes one main table plus one table per repeating group:
//!
//! ```text
//! <exportDir>/<base>.csv
//! <exportDir>/<base>-<group>.csv
//! <exportDir>/<base>-<group>~1.csv    (second group with the same name)
//! ```

use super::lines::CsvLines;
use crate::core::model::{FormDefinition, Model, ModelId};
use crate::core::transform::encode::{encode, join_cells};
use crate::core::transform::FieldMapper;
use crate::domain::context::ResultExt;
use crate::domain::errors::SubmissionError;
use crate::domain::submission::Submission;
use crate::domain::Result;
use regex::Regex;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Which rows a table holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Main,
    Repeat(ModelId),
}

/// One output table
#[derive(Debug, Clone)]
pub struct Csv {
    fqn: String,
    kind: TableKind,
    header: Vec<String>,
    output: PathBuf,
    sort_by_date: bool,
    overwrite: bool,
}

impl Csv {
    /// Builds the main table followed by one table per repeating group
    pub fn all(
        form: &FormDefinition,
        export_dir: &Path,
        base_name: &str,
        overwrite: bool,
        split_select_multiples: bool,
    ) -> Vec<Csv> {
        let mut tables = vec![Csv::main(form, export_dir, base_name, overwrite, split_select_multiples)];
        let mut used_names: HashSet<String> = HashSet::new();
        used_names.insert(format!("{base_name}.csv"));

        for group in form.model.repeatable_fields() {
            let stem = format!("{base_name}-{}", sanitize_file_name(group.name()));
            let mut file_name = format!("{stem}.csv");
            let mut sequence = 1;
            while used_names.contains(&file_name) {
                file_name = format!("{stem}~{sequence}.csv");
                sequence += 1;
            }
            used_names.insert(file_name.clone());
            tables.push(Csv::repeat(
                group,
                export_dir.join(file_name),
                overwrite,
                split_select_multiples,
            ));
        }
        tables
    }

    pub fn main(
        form: &FormDefinition,
        export_dir: &Path,
        base_name: &str,
        overwrite: bool,
        split_select_multiples: bool,
    ) -> Csv {
        let mut header = vec!["SubmissionDate".to_string()];
        for child in form.model.root().children() {
            header.extend(child.names_with(0, split_select_multiples));
        }
        header.push("KEY".to_string());
        if form.encrypted {
            header.push("isValidated".to_string());
        }

        Csv {
            fqn: form.model.root().fqn(0),
            kind: TableKind::Main,
            header,
            output: export_dir.join(format!("{base_name}.csv")),
            sort_by_date: true,
            overwrite,
        }
    }

    pub fn repeat(
        group: Model<'_>,
        output: PathBuf,
        overwrite: bool,
        split_select_multiples: bool,
    ) -> Csv {
        let shift = group.depth();
        let mut header: Vec<String> = group
            .children()
            .iter()
            .flat_map(|child| child.names_with(shift, split_select_multiples))
            .collect();
        header.push("PARENT_KEY".to_string());
        header.push("KEY".to_string());
        header.push(format!("SET-OF-{}", group.name()));

        Csv {
            fqn: group.fqn(0),
            kind: TableKind::Repeat(group.id()),
            header,
            output,
            sort_by_date: false,
            overwrite,
        }
    }

    /// FQN of the schema node owning this table (empty for the main table)
    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Creates or truncates the file and writes the header when needed
    ///
    /// The header is written when the file is missing or empty, or when
    /// overwriting. Otherwise new rows are appended to the existing file.
    pub fn prepare(&self) -> Result<()> {
        let has_content = std::fs::metadata(&self.output)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if has_content && !self.overwrite {
            tracing::debug!(output = %self.output.display(), "Appending to existing table");
            return Ok(());
        }

        let mut file = File::create(&self.output)
            .with_context(|| format!("Failed to create {}", self.output.display()))?;
        let header = join_cells(self.header.iter().map(|name| encode(Some(name), false)));
        writeln!(file, "{header}")
            .with_context(|| format!("Failed to write header of {}", self.output.display()))?;
        Ok(())
    }

    /// Maps one submission into this table's lines
    pub fn map(
        &self,
        mapper: &FieldMapper,
        form: &FormDefinition,
        submission: &Submission,
    ) -> std::result::Result<CsvLines, SubmissionError> {
        let lines = match self.kind {
            TableKind::Main => vec![mapper.map_main(form, submission)?],
            TableKind::Repeat(group) => mapper.map_repeat(form.model.get(group), submission)?,
        };
        Ok(CsvLines::of(self.fqn.clone(), lines))
    }

    /// Appends aggregated lines; the main table is ordered by submission date
    pub fn append_lines(&self, lines: &CsvLines) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output)
            .with_context(|| format!("Failed to open {}", self.output.display()))?;
        let mut writer = BufWriter::new(file);

        let ordered: Vec<_> = if self.sort_by_date {
            lines.sorted_by_date()
        } else {
            lines.lines().iter().collect()
        };
        for line in ordered {
            writeln!(writer, "{}", line.text)
                .with_context(|| format!("Failed to write {}", self.output.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.output.display()))?;

        tracing::debug!(
            output = %self.output.display(),
            rows = lines.len(),
            "Wrote table"
        );
        Ok(())
    }
}

/// Base name of all output files: the configured name or the form name
pub fn base_file_name(form: &FormDefinition, export_filename: Option<&str>) -> String {
    let raw = export_filename
        .map(|name| name.strip_suffix(".csv").unwrap_or(name))
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(&form.name);
    sanitize_file_name(raw)
}

/// Replaces characters that are not allowed in file names
pub fn sanitize_file_name(raw: &str) -> String {
    static FORBIDDEN: OnceLock<Regex> = OnceLock::new();
    let forbidden = FORBIDDEN
        .get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).expect("valid file name pattern"));
    forbidden.replace_all(raw.trim(), "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::lines::CsvLine;
    use crate::core::model::{DataType, FormModelBuilder};
    use crate::domain::ids::FormId;
    use chrono::DateTime;
    use std::fs;
    use tempfile::TempDir;

    fn form(encrypted: bool) -> FormDefinition {
        let mut builder = FormModelBuilder::new("data");
        let root = builder.root();
        builder.add_field(root, "name", DataType::Text);
        builder.add_field(root, "where", DataType::Geopoint);
        let first = builder.add_repeat(root, "items");
        builder.add_field(first, "qty", DataType::Integer);
        let section = builder.add_group(root, "section");
        let second = builder.add_repeat(section, "items");
        builder.add_field(second, "label", DataType::Text);
        FormDefinition {
            form_id: FormId::new("f").unwrap(),
            name: "My: Form".to_string(),
            version: None,
            encrypted,
            field_encrypted: false,
            model: builder.build(),
        }
    }

    #[test]
    fn test_table_files_and_collisions() {
        let dir = Path::new("/export");
        let tables = Csv::all(&form(false), dir, "My_ Form", false, false);

        let files: Vec<String> = tables
            .iter()
            .map(|t| t.output().file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(files, vec!["My_ Form.csv", "My_ Form-items.csv", "My_ Form-items~1.csv"]);
        assert_eq!(tables[2].fqn(), "section-items");
    }

    #[test]
    fn test_headers() {
        let tables = Csv::all(&form(true), Path::new("/export"), "f", false, false);
        assert_eq!(
            tables[0].header(),
            &[
                "SubmissionDate",
                "name",
                "where-Latitude",
                "where-Longitude",
                "where-Altitude",
                "where-Accuracy",
                "SET-OF-items",
                "SET-OF-section-items",
                "KEY",
                "isValidated",
            ]
        );
        assert_eq!(tables[1].header(), &["qty", "PARENT_KEY", "KEY", "SET-OF-items"]);
        assert_eq!(tables[2].header(), &["label", "PARENT_KEY", "KEY", "SET-OF-items"]);
    }

    #[test]
    fn test_prepare_writes_header_once() {
        let temp = TempDir::new().unwrap();
        let table = Csv::main(&form(false), temp.path(), "f", false, false);

        table.prepare().unwrap();
        table.append_lines(&CsvLines::of("", vec![CsvLine::new(None, "row")])).unwrap();
        table.prepare().unwrap();

        let content = fs::read_to_string(table.output()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.starts_with("SubmissionDate,name,"));
    }

    #[test]
    fn test_prepare_overwrite_truncates() {
        let temp = TempDir::new().unwrap();
        let table = Csv::main(&form(false), temp.path(), "f", true, false);
        fs::write(table.output(), "old content\nmore\n").unwrap();

        table.prepare().unwrap();
        let content = fs::read_to_string(table.output()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(!content.contains("old content"));
    }

    #[test]
    fn test_main_table_sorted_by_date() {
        let temp = TempDir::new().unwrap();
        let table = Csv::main(&form(false), temp.path(), "f", true, false);
        table.prepare().unwrap();

        let date = |raw: &str| Some(DateTime::parse_from_rfc3339(raw).unwrap());
        let lines = CsvLines::of(
            "",
            vec![
                CsvLine::new(date("2021-01-01T00:00:00Z"), "late"),
                CsvLine::new(date("2020-01-01T00:00:00Z"), "early"),
            ],
        );
        table.append_lines(&lines).unwrap();

        let content = fs::read_to_string(table.output()).unwrap();
        let rows: Vec<&str> = content.lines().skip(1).collect();
        assert_eq!(rows, vec!["early", "late"]);
    }

    #[test]
    fn test_base_file_name() {
        let form = form(false);
        assert_eq!(base_file_name(&form, None), "My_ Form");
        assert_eq!(base_file_name(&form, Some("export.csv")), "export");
        assert_eq!(base_file_name(&form, Some("  ")), "My_ Form");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("a/b\\c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_file_name("tab\there"), "tab_here");
        assert_eq!(sanitize_file_name("plain name"), "plain name");
    }
}
