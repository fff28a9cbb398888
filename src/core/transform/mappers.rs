//! Field-to-CSV mapping
//!
//! Turns a submission into encoded cells, one schema node at a time. Every
//! node yields exactly as many cells as it has column names, whether or not
//! the submission holds a value for it.

use super::audit::{read_audit_log, AuditLines};
use super::dates::{format_date, format_date_time, format_time, format_timestamp};
use super::encode::{encode, join_cells};
use super::media::MediaStore;
use crate::core::export::lines::CsvLine;
use crate::core::model::{DataType, FormDefinition, Model, NodeKind};
use crate::domain::errors::SubmissionError;
use crate::domain::submission::{Submission, ValidationStatus};
use crate::domain::xml::XmlElement;

/// Mapping switches taken from the export configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct MappingOptions {
    /// Copy attachments into `media/` instead of exporting bare file names
    pub export_media: bool,
    /// Emit one `1`/`0` column per choice of select-multiple fields
    pub split_select_multiples: bool,
}

/// Maps submissions to table rows
///
/// Shared by all workers of an export; media copies are internally
/// synchronized.
#[derive(Debug)]
pub struct FieldMapper {
    options: MappingOptions,
    media: MediaStore,
}

impl FieldMapper {
    pub fn new(options: MappingOptions, media: MediaStore) -> Self {
        Self { options, media }
    }

    pub fn options(&self) -> MappingOptions {
        self.options
    }

    /// Builds the main table row of a submission
    pub fn map_main(
        &self,
        form: &FormDefinition,
        submission: &Submission,
    ) -> Result<CsvLine, SubmissionError> {
        let root = form.model.root();
        let key = submission.key();
        let element = submission.root();

        let mut cells = vec![encode(
            submission
                .submission_date()
                .map(|date| format_timestamp(&date))
                .as_deref(),
            true,
        )];
        for child in root.children() {
            cells.extend(self.map_model(child, element.find_element(child.name()), &key, submission)?);
        }
        cells.push(encode(Some(&key), false));
        if form.encrypted {
            let validated = submission.validation_status() == ValidationStatus::Valid;
            cells.push(validated.to_string());
        }

        Ok(CsvLine::new(submission.submission_date(), join_cells(cells)))
    }

    /// Builds one row per instance of a repeating group
    pub fn map_repeat(
        &self,
        group: Model<'_>,
        submission: &Submission,
    ) -> Result<Vec<CsvLine>, SubmissionError> {
        let relative_fqn = group.relative_fqn();
        let instances = submission.root().find_elements_path(group.name_path().as_slice());

        let mut lines = Vec::with_capacity(instances.len());
        for instance in instances {
            let parent_key = parent_key(group, instance, submission);
            let key = instance_key(group, instance, submission);

            let mut cells = Vec::new();
            for child in group.children() {
                cells.extend(self.map_model(child, instance.find_element(child.name()), &key, submission)?);
            }
            cells.push(encode(Some(&parent_key), false));
            cells.push(encode(Some(&key), false));
            cells.push(encode(Some(&format!("{parent_key}/{relative_fqn}")), true));

            lines.push(CsvLine::new(submission.submission_date(), join_cells(cells)));
        }
        Ok(lines)
    }

    /// Collects the rows of every audit log attached to a submission
    pub fn map_audit(
        &self,
        form: &FormDefinition,
        submission: &Submission,
    ) -> Result<AuditLines, SubmissionError> {
        let key = submission.key();
        let mut audit = AuditLines::empty();
        for model in form.model.root().flatten() {
            if !model.is_meta_audit() {
                continue;
            }
            let elements = submission.root().find_elements_path(model.name_path().as_slice());
            for file_name in elements.iter().filter_map(|e| e.value()) {
                audit = audit.merge(read_audit_log(
                    submission.working_dir(),
                    file_name.trim(),
                    &key,
                    submission.submission_date(),
                )?);
            }
        }
        Ok(audit)
    }

    fn map_model(
        &self,
        model: Model<'_>,
        element: Option<XmlElement<'_>>,
        row_key: &str,
        submission: &Submission,
    ) -> Result<Vec<String>, SubmissionError> {
        match model.kind() {
            NodeKind::RepeatGroup => {
                let reference = element.map(|_| format!("{row_key}/{}", model.relative_fqn()));
                Ok(vec![encode(reference.as_deref(), true)])
            }
            NodeKind::Group | NodeKind::Root if !model.children().is_empty() => {
                let mut cells = Vec::new();
                for child in model.children() {
                    let child_element = element.and_then(|e| e.find_element(child.name()));
                    cells.extend(self.map_model(child, child_element, row_key, submission)?);
                }
                Ok(cells)
            }
            NodeKind::Group | NodeKind::Root => Ok(vec![encode(
                element.and_then(|e| e.value()),
                model.allows_blank(),
            )]),
            NodeKind::Field => self.map_field(model, element.and_then(|e| e.value()), submission),
        }
    }

    fn map_field(
        &self,
        model: Model<'_>,
        value: Option<&str>,
        submission: &Submission,
    ) -> Result<Vec<String>, SubmissionError> {
        let allow_blank = model.allows_blank();
        let cells = match model.data_type() {
            DataType::Date => vec![encode(value.map(format_date).as_deref(), allow_blank)],
            DataType::Time => vec![encode(value.map(format_time).as_deref(), allow_blank)],
            DataType::DateTime => vec![encode(value.map(format_date_time).as_deref(), allow_blank)],
            DataType::Geopoint => geopoint_cells(value),
            DataType::Binary => {
                let exported = match value {
                    Some(file_name) => Some(self.map_binary(file_name.trim(), submission)?),
                    None => None,
                };
                vec![encode(exported.as_deref(), allow_blank)]
            }
            DataType::ChoiceList => {
                let mut cells = vec![encode(value, allow_blank)];
                if self.options.split_select_multiples {
                    cells.extend(split_choice_cells(model.choices(), value));
                }
                cells
            }
            DataType::Text
            | DataType::Integer
            | DataType::Decimal
            | DataType::Boolean
            | DataType::Geotrace
            | DataType::Geoshape
            | DataType::Barcode
            | DataType::Choice => vec![encode(value, allow_blank)],
        };
        Ok(cells)
    }

    fn map_binary(&self, file_name: &str, submission: &Submission) -> Result<String, SubmissionError> {
        if !self.options.export_media {
            return Ok(file_name.to_string());
        }
        self.media.copy(submission.working_dir(), file_name)
    }
}

/// Row key of one repeat instance: `<parentKey>/<relativeFqn>[<index>]`
pub fn instance_key(group: Model<'_>, instance: XmlElement<'_>, submission: &Submission) -> String {
    format!(
        "{}/{}[{}]",
        parent_key(group, instance, submission),
        group.relative_fqn(),
        instance.sibling_index()
    )
}

/// Row key of the row that owns a repeat instance
pub fn parent_key(group: Model<'_>, instance: XmlElement<'_>, submission: &Submission) -> String {
    match group.nearest_repeat_ancestor() {
        None => submission.key(),
        Some(outer) => {
            let levels_up = group.depth() - outer.depth();
            let outer_instance = (0..levels_up).try_fold(instance, |element, _| element.parent());
            match outer_instance {
                Some(outer_instance) => instance_key(outer, outer_instance, submission),
                None => submission.key(),
            }
        }
    }
}

/// Latitude, longitude, altitude and accuracy; missing parts stay empty
fn geopoint_cells(value: Option<&str>) -> Vec<String> {
    let parts: Vec<&str> = value.map(|v| v.split_whitespace().collect()).unwrap_or_default();
    (0..4)
        .map(|i| encode(parts.get(i).copied(), true))
        .collect()
}

fn split_choice_cells(choices: &[String], value: Option<&str>) -> Vec<String> {
    choices
        .iter()
        .map(|choice| {
            let flag = value.map(|v| {
                if v.split_whitespace().any(|selected| selected == choice) {
                    "1"
                } else {
                    "0"
                }
            });
            encode(flag, true)
        })
        .collect()
}
