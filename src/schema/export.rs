//! Quoted CSV rendering of collected responses.

use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::Display;
use std::path::{Path, PathBuf};

use super::resource::{Form, FormResponse};

const DATE_HEADER: &str = "Submission Date";

/// `M/D/YYYY, h:mm:ss AM` in the given zone.
pub fn format_submitted_at<Tz>(at: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.with_timezone(tz)
        .format("%-m/%-d/%Y, %-I:%M:%S %p")
        .to_string()
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

/// One header row plus one row per response, dates in local time.
pub fn export_csv(form: &Form, responses: &[FormResponse]) -> String {
    export_csv_in(form, responses, &Local)
}

pub fn export_csv_in<Tz>(form: &Form, responses: &[FormResponse], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(responses.len() + 1);
    let mut header = vec![DATE_HEADER.to_string()];
    header.extend(form.fields.fields().iter().map(|f| f.label.clone()));
    rows.push(header);

    for resp in responses {
        let mut row = vec![format_submitted_at(&resp.submitted_at, tz)];
        for field in &form.fields {
            let cell = resp
                .responses
                .get(&field.id)
                .map(|v| v.display_joined())
                .unwrap_or_default();
            row.push(cell);
        }
        rows.push(row);
    }

    rows.iter()
        .map(|row| row.iter().map(|c| quote(c)).collect::<Vec<_>>().join(","))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `<title>_responses.csv` with path separators replaced.
pub fn export_file_name(title: &str) -> String {
    let safe: String = title
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{safe}_responses.csv")
}

pub fn export_path(dir: &Path, title: &str) -> PathBuf {
    dir.join(export_file_name(title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::{FieldDefinition, FormSchema};
    use crate::schema::field_type::FieldType;
    use crate::schema::response::{ResponseMap, ResponseValue};

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, 5, 9).unwrap()
    }

    fn form(fields: Vec<FieldDefinition>) -> Form {
        Form {
            id: "form1".into(),
            title: "T".into(),
            description: String::new(),
            fields: FormSchema::from_fields(fields).unwrap(),
            created_at: at(9),
            updated_at: at(9),
            is_active: true,
        }
    }

    fn response(id: &str, h: u32, pairs: &[(&str, ResponseValue)]) -> FormResponse {
        let mut responses = ResponseMap::new();
        for (k, v) in pairs {
            responses.insert(k.to_string(), v.clone());
        }
        FormResponse {
            id: id.into(),
            form_id: "form1".into(),
            responses,
            submitted_at: at(h),
        }
    }

    #[test]
    fn date_uses_us_locale_shape() {
        assert_eq!(format_submitted_at(&at(9), &Utc), "3/1/2024, 9:05:09 AM");
        assert_eq!(format_submitted_at(&at(15), &Utc), "3/1/2024, 3:05:09 PM");
        assert_eq!(format_submitted_at(&at(0), &Utc), "3/1/2024, 12:05:09 AM");
    }

    #[test]
    fn comma_inside_value_stays_in_one_quoted_cell() {
        let f = form(vec![FieldDefinition::new("f1", FieldType::Text)
            .with_label("Name")
            .required(true)]);
        let rows = [
            response("r1", 9, &[("f1", "Smith, Jane".into())]),
            response("r2", 10, &[("f1", "Bob".into())]),
        ];
        let csv = export_csv_in(&f, &rows, &Utc);
        let lines: Vec<&str> = csv.split('\n').collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "\"Submission Date\",\"Name\"");
        assert_eq!(lines[1], "\"3/1/2024, 9:05:09 AM\",\"Smith, Jane\"");
        assert_eq!(lines[2], "\"3/1/2024, 10:05:09 AM\",\"Bob\"");
    }

    #[test]
    fn quotes_are_doubled_and_multi_values_joined() {
        let f = form(vec![
            FieldDefinition::new("q", FieldType::Textarea).with_label("Say \"hi\""),
            FieldDefinition::new("c", FieldType::Checkbox)
                .with_label("Tags")
                .with_options(["A", "B"]),
            FieldDefinition::new("missing", FieldType::Number).with_label("N"),
        ]);
        let rows = [response(
            "r1",
            9,
            &[
                ("q", "he said \"yes\"".into()),
                ("c", vec!["B".to_string(), "A".to_string()].into()),
            ],
        )];
        let csv = export_csv_in(&f, &rows, &Utc);
        let lines: Vec<&str> = csv.split('\n').collect();
        assert_eq!(lines[0], "\"Submission Date\",\"Say \"\"hi\"\"\",\"Tags\",\"N\"");
        assert_eq!(
            lines[1],
            "\"3/1/2024, 9:05:09 AM\",\"he said \"\"yes\"\"\",\"B, A\",\"\""
        );
    }

    #[test]
    fn header_and_row_counts_follow_schema_and_responses() {
        let f = form(vec![
            FieldDefinition::new("a", FieldType::Text),
            FieldDefinition::new("b", FieldType::Email),
        ]);
        let rows: Vec<FormResponse> = (0..4).map(|i| response(&format!("r{i}"), 9, &[])).collect();
        let csv = export_csv_in(&f, &rows, &Utc);
        let lines: Vec<&str> = csv.split('\n').collect();
        assert_eq!(lines.len(), rows.len() + 1);
        assert_eq!(lines[0].split("\",\"").count(), 1 + f.fields.len());
        assert_eq!(
            export_csv_in(&f, &[], &Utc),
            "\"Submission Date\",\"New text field\",\"New email field\""
        );
    }

    #[test]
    fn file_name_replaces_separators() {
        assert_eq!(export_file_name("Feedback"), "Feedback_responses.csv");
        assert_eq!(export_file_name("a/b\\c"), "a_b_c_responses.csv");
        assert_eq!(
            export_path(Path::new("/tmp/out"), "T"),
            PathBuf::from("/tmp/out/T_responses.csv")
        );
    }
}
