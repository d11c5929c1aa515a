//! Human and machine renderings of verification reports.

use colored::*;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::analysis::{Joinability, LocalConfluence, Status};
use crate::rewriting::RuleSet;

use super::report::{DomainReport, VerificationReport};

/// A report row that renders both as a table row and as a CSV record.
pub trait Formattable: Tabled {
    fn to_csv_row(&self) -> Vec<String>;

    fn csv_headers() -> Vec<&'static str>;
}

#[derive(Clone, Debug, Tabled)]
pub struct PropertyRow {
    #[tabled(rename = "Domain")]
    pub domain: String,
    #[tabled(rename = "Rule Set")]
    pub ruleset: String,
    #[tabled(rename = "Property")]
    pub property: String,
    #[tabled(rename = "Status")]
    pub status: Status,
    #[tabled(rename = "Checked")]
    pub checked: usize,
    #[tabled(rename = "Violations")]
    pub violations: usize,
    #[tabled(rename = "Note")]
    pub note: String,
}

impl Formattable for PropertyRow {
    fn to_csv_row(&self) -> Vec<String> {
        vec![
            self.domain.clone(),
            self.ruleset.clone(),
            self.property.clone(),
            self.status.to_string(),
            self.checked.to_string(),
            self.violations.to_string(),
            self.note.clone(),
        ]
    }

    fn csv_headers() -> Vec<&'static str> {
        vec!["domain", "ruleset", "property", "status", "checked", "violations", "note"]
    }
}

#[derive(Clone, Debug, Tabled)]
pub struct ViolationRow {
    #[tabled(rename = "Domain")]
    pub domain: String,
    #[tabled(rename = "Property")]
    pub property: String,
    #[tabled(rename = "Input")]
    pub input: String,
    #[tabled(rename = "Minimal")]
    pub minimal: String,
    #[tabled(rename = "Detail")]
    pub detail: String,
}

impl Formattable for ViolationRow {
    fn to_csv_row(&self) -> Vec<String> {
        vec![
            self.domain.clone(),
            self.property.clone(),
            self.input.clone(),
            self.minimal.clone(),
            self.detail.clone(),
        ]
    }

    fn csv_headers() -> Vec<&'static str> {
        vec!["domain", "property", "input", "minimal", "detail"]
    }
}

#[derive(Clone, Debug, Tabled)]
pub struct PairRow {
    #[tabled(rename = "Outer")]
    pub outer: String,
    #[tabled(rename = "Inner")]
    pub inner: String,
    #[tabled(rename = "Position")]
    pub position: String,
    #[tabled(rename = "Overlap")]
    pub overlap: String,
    #[tabled(rename = "Status")]
    pub status: Status,
    #[tabled(rename = "Detail")]
    pub detail: String,
}

impl Formattable for PairRow {
    fn to_csv_row(&self) -> Vec<String> {
        vec![
            self.outer.clone(),
            self.inner.clone(),
            self.position.clone(),
            self.overlap.clone(),
            self.status.to_string(),
            self.detail.clone(),
        ]
    }

    fn csv_headers() -> Vec<&'static str> {
        vec!["outer", "inner", "position", "overlap", "status", "detail"]
    }
}

#[derive(Clone, Debug, Tabled)]
pub struct RuleRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "From")]
    pub from: String,
    #[tabled(rename = "To")]
    pub to: String,
    #[tabled(rename = "Guard")]
    pub guard: String,
    #[tabled(rename = "Measure")]
    pub measure: String,
}

impl Formattable for RuleRow {
    fn to_csv_row(&self) -> Vec<String> {
        vec![
            self.index.to_string(),
            self.name.clone(),
            self.from.clone(),
            self.to.clone(),
            self.guard.clone(),
            self.measure.clone(),
        ]
    }

    fn csv_headers() -> Vec<&'static str> {
        vec!["index", "name", "from", "to", "guard", "measure"]
    }
}

pub fn pair_rows(local: &LocalConfluence) -> Vec<PairRow> {
    local
        .pairs
        .iter()
        .map(|verdict| PairRow {
            outer: verdict.pair.outer.clone(),
            inner: verdict.pair.inner.clone(),
            position: verdict.pair.position.to_string(),
            overlap: verdict.pair.overlap.to_string(),
            status: verdict.joinability.status(),
            detail: match &verdict.joinability {
                Joinability::Joinable { instances } => format!("{instances} instances join"),
                Joinability::NotJoinable {
                    instance,
                    outer_normal_form,
                    inner_normal_form,
                } => format!("{instance}: {outer_normal_form} vs {inner_normal_form}"),
                Joinability::Unknown { reason } => reason.clone(),
            },
        })
        .collect()
}

pub fn rule_rows(rules: &RuleSet) -> Vec<RuleRow> {
    rules
        .rules()
        .iter()
        .enumerate()
        .map(|(index, rule)| RuleRow {
            index,
            name: rule.name().to_owned(),
            from: rule.from().to_string(),
            to: rule.to().to_string(),
            guard: rule.guard().map(|guard| guard.description().to_owned()).unwrap_or_default(),
            measure: rule.measure().map(|measure| measure.name().to_owned()).unwrap_or_default(),
        })
        .collect()
}

pub fn property_rows(report: &DomainReport) -> Vec<PropertyRow> {
    report
        .properties
        .iter()
        .map(|result| PropertyRow {
            domain: report.domain.to_string(),
            ruleset: report.ruleset.clone(),
            property: result.property.to_string(),
            status: result.status,
            checked: result.checked,
            violations: result.violations.len(),
            note: result.note.clone().unwrap_or_default(),
        })
        .collect()
}

pub fn violation_rows(report: &DomainReport) -> Vec<ViolationRow> {
    report
        .properties
        .iter()
        .flat_map(|result| {
            result.violations.iter().map(move |violation| ViolationRow {
                domain: report.domain.to_string(),
                property: result.property.to_string(),
                input: violation.input.clone(),
                minimal: violation.minimal.clone().unwrap_or_default(),
                detail: violation.detail.clone(),
            })
        })
        .collect()
}

pub fn colored_status(status: Status) -> ColoredString {
    match status {
        Status::Pass => status.to_string().green().bold(),
        Status::Unknown => status.to_string().yellow().bold(),
        Status::Fail => status.to_string().red().bold(),
    }
}

/// Table formatter using the tabled library.
pub struct PrettyFormatter;

impl PrettyFormatter {
    pub fn format<T: Formattable>(items: &[T]) -> String {
        if items.is_empty() {
            return String::new();
        }

        let mut table = Table::new(items);
        table.with(Style::rounded());
        table.to_string()
    }

    pub fn format_report(report: &VerificationReport) -> String {
        let mut buffer = String::new();
        for domain in &report.domains {
            buffer.push_str(&format!(
                "\n--- {} ({}): {} ---\n\n",
                domain.domain.to_string().bold(),
                domain.ruleset,
                colored_status(domain.status())
            ));
            buffer.push_str(&Self::format(&property_rows(domain)));
            buffer.push('\n');

            let violations = violation_rows(domain);
            if !violations.is_empty() {
                buffer.push_str(&format!("\n{}\n", "Violations".bold()));
                buffer.push_str(&Self::format(&violations));
                buffer.push('\n');
            }
        }
        buffer.push_str(&format!(
            "\nseed {:#x}, overall {}\n",
            report.seed,
            colored_status(report.status())
        ));
        buffer
    }
}

pub struct CsvFormatter;

impl CsvFormatter {
    pub fn format<T: Formattable>(items: &[T]) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(T::csv_headers())?;
        for item in items {
            writer.write_record(item.to_csv_row())?;
        }
        let bytes = writer.into_inner().map_err(|error| error.into_error())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// One row per domain and property.
    pub fn format_report(report: &VerificationReport) -> Result<String, csv::Error> {
        let rows: Vec<PropertyRow> = report.domains.iter().flat_map(property_rows).collect();
        Self::format(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::{CsvFormatter, Formattable, PrettyFormatter, PropertyRow};
    use crate::analysis::Status;

    fn row(note: &str) -> PropertyRow {
        PropertyRow {
            domain: "filter".to_owned(),
            ruleset: "filter-nnf@1.0.0".to_owned(),
            property: "soundness".to_owned(),
            status: Status::Pass,
            checked: 12,
            violations: 0,
            note: note.to_owned(),
        }
    }

    #[test]
    fn csv_quotes_separators() {
        let csv = CsvFormatter::format(&[row("3 inputs undecided, 1 skipped")]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), PropertyRow::csv_headers().join(","));
        assert_eq!(
            lines.next().unwrap(),
            "filter,filter-nnf@1.0.0,soundness,pass,12,0,\"3 inputs undecided, 1 skipped\""
        );
    }

    #[test]
    fn rule_rows_follow_declaration_order() {
        let rules = crate::language::Domain::Filter.ruleset().unwrap();
        let rows = super::rule_rows(&rules);
        assert_eq!(rows.len(), rules.len());
        assert_eq!(rows[0].name, rules.rules()[0].name());
        assert!(rows.iter().enumerate().all(|(index, row)| row.index == index));
    }

    #[test]
    fn pretty_table_has_headers() {
        let table = PrettyFormatter::format(&[row("")]);
        assert!(table.contains("Property"));
        assert!(table.contains("filter-nnf@1.0.0"));
        assert!(PrettyFormatter::format::<PropertyRow>(&[]).is_empty());
    }
}
