// ********* Import reconciliation ***********

use log::{debug, info};
use snafu::ensure;

use std::collections::BTreeSet;

use crate::record::{ImportRow, Record};
use crate::schema::{Field, Schema};
use crate::{Advisory, NoDataFoundSnafu};

/// How the value of a field was found in an import row.
///
/// The tiers are tried in this order for every field; the first one that succeeds wins.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum MatchTier {
    /// A header equal, byte for byte, to the label of the field.
    ExactLabel,
    /// A header equal to the key of the field.
    ExactKey,
    /// A header equal to the label once both are trimmed and lower-cased.
    NormalizedLabel,
}

/// Counts gathered while reconciling a batch of rows.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ImportSummary {
    pub rows: usize,
    pub exact_label: usize,
    pub exact_key: usize,
    pub normalized_label: usize,
    /// Field values that defaulted to the empty string.
    pub unmatched: usize,
    /// Headers of the input columns that no field ever picked up.
    pub ignored_headers: BTreeSet<String>,
}

impl ImportSummary {
    fn count(&mut self, tier: Option<MatchTier>) {
        match tier {
            Some(MatchTier::ExactLabel) => self.exact_label += 1,
            Some(MatchTier::ExactKey) => self.exact_key += 1,
            Some(MatchTier::NormalizedLabel) => self.normalized_label += 1,
            None => self.unmatched += 1,
        }
    }
}

fn normalize_header(s: &str) -> String {
    s.trim().to_lowercase()
}

fn find_cell<'a>(row: &'a ImportRow, pred: impl Fn(&str) -> bool) -> Option<(usize, &'a str)> {
    row.cells()
        .enumerate()
        .find(|(_, (h, _))| pred(*h))
        .map(|(pos, (_, v))| (pos, v))
}

/// Finds the cell of `row` that feeds `field`, together with the tier that matched.
///
/// Returns the position of the cell in the row (so that callers can track which
/// cells were used) and its value.
pub fn match_field<'a>(field: &Field, row: &'a ImportRow) -> Option<(MatchTier, usize, &'a str)> {
    if let Some((pos, v)) = find_cell(row, |h| h == field.label) {
        return Some((MatchTier::ExactLabel, pos, v));
    }
    if let Some((pos, v)) = find_cell(row, |h| h == field.key) {
        return Some((MatchTier::ExactKey, pos, v));
    }
    let wanted = normalize_header(&field.label);
    find_cell(row, |h| normalize_header(h) == wanted)
        .map(|(pos, v)| (MatchTier::NormalizedLabel, pos, v))
}

fn reconcile_row_into(schema: &Schema, row: &ImportRow, summary: &mut ImportSummary) -> Record {
    let mut used: BTreeSet<usize> = BTreeSet::new();
    let mut values: Vec<(String, String)> = Vec::with_capacity(schema.len());
    for field in schema.fields() {
        let m = match_field(field, row);
        summary.count(m.map(|(tier, _, _)| tier));
        if let Some((tier, pos, value)) = m {
            debug!(
                "reconcile_row: {:?} <- cell {} ({:?})",
                field.key, pos, tier
            );
            used.insert(pos);
            values.push((field.key.clone(), value.to_string()));
        }
    }
    for (pos, header) in row.headers().enumerate() {
        if !used.contains(&pos) {
            summary.ignored_headers.insert(header.to_string());
        }
    }
    schema.build_record(values)
}

/// Builds the record for a single import row. Fields without a matching header are
/// left empty.
pub fn reconcile_row(schema: &Schema, row: &ImportRow) -> Record {
    reconcile_row_into(schema, row, &mut ImportSummary::default())
}

/// Reconciles every row, in order. Output record `i` comes from input row `i`.
///
/// A row that matches nothing still produces an (all-empty) record. An empty input is
/// reported as [`Advisory::NoDataFound`].
pub fn reconcile(schema: &Schema, rows: &[ImportRow]) -> Result<Vec<Record>, Advisory> {
    reconcile_with_summary(schema, rows).map(|(records, _)| records)
}

/// Same as [`reconcile`], with statistics on how the headers were matched.
pub fn reconcile_with_summary(
    schema: &Schema,
    rows: &[ImportRow],
) -> Result<(Vec<Record>, ImportSummary), Advisory> {
    ensure!(!rows.is_empty(), NoDataFoundSnafu {});
    let mut summary = ImportSummary {
        rows: rows.len(),
        ..ImportSummary::default()
    };
    let records: Vec<Record> = rows
        .iter()
        .map(|row| reconcile_row_into(schema, row, &mut summary))
        .collect();
    info!(
        "reconcile: {} rows, matched by label: {}, by key: {}, by normalized label: {}, unmatched: {}",
        summary.rows,
        summary.exact_label,
        summary.exact_key,
        summary.normalized_label,
        summary.unmatched
    );
    if !summary.ignored_headers.is_empty() {
        info!(
            "reconcile: ignored headers: {:?}",
            summary.ignored_headers
        );
    }
    Ok((records, summary))
}
