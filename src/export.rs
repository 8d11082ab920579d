use std::fs;
use std::io::Write;

use camino::Utf8Path;
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::XeroError;
use crate::models::{Annotation, GeneRecord};

pub const CSV_PREFIX: &str = "Xerophyta_gene_query_results";
pub const FASTA_PREFIX: &str = "Xerophyta_genes";

/// One gene x annotation row of the search result table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneTableRow {
    #[serde(rename = "Gene ID")]
    pub gene_id: i64,
    #[serde(rename = "Gene Name")]
    pub gene_name: String,
    #[serde(rename = "Species")]
    pub species: String,
    #[serde(rename = "Annotation Description")]
    pub annotation_description: Option<String>,
    #[serde(rename = "Annotation e-value")]
    pub annotation_e_value: Option<f64>,
    #[serde(rename = "Arab. Locus")]
    pub arabidopsis_locus: Option<String>,
    #[serde(rename = "Arab. Common Name")]
    pub arabidopsis_common_name: Option<String>,
    #[serde(rename = "GO Terms")]
    pub go_terms: Option<String>,
    #[serde(rename = "Enzyme Codes")]
    pub enzyme_codes: Option<String>,
    #[serde(rename = "InterPro IDs")]
    pub interpro_ids: Option<String>,
}

/// Flatten records into table rows. A gene without annotations still gets
/// one row; identical rows of the same gene are collapsed.
pub fn flatten(records: &[GeneRecord]) -> Vec<GeneTableRow> {
    let mut rows = Vec::new();
    for record in records {
        let locus = join_non_empty(
            record
                .homologues
                .iter()
                .map(|h| h.a_thaliana_locus.clone()),
        );
        let common_name = join_non_empty(
            record
                .homologues
                .iter()
                .filter_map(|h| h.a_thaliana_common_name.clone()),
        );
        let base = GeneTableRow {
            gene_id: record.gene.id,
            gene_name: record.gene.gene_name.clone(),
            species: record.species.clone(),
            annotation_description: None,
            annotation_e_value: None,
            arabidopsis_locus: locus,
            arabidopsis_common_name: common_name,
            go_terms: None,
            enzyme_codes: None,
            interpro_ids: None,
        };

        if record.annotations.is_empty() {
            rows.push(base);
            continue;
        }

        let mut gene_rows: Vec<GeneTableRow> = Vec::new();
        for annotation in &record.annotations {
            let row = annotation_row(&base, annotation);
            if !gene_rows.contains(&row) {
                gene_rows.push(row);
            }
        }
        rows.extend(gene_rows);
    }
    rows
}

fn annotation_row(base: &GeneTableRow, annotation: &Annotation) -> GeneTableRow {
    GeneTableRow {
        annotation_description: annotation.description.clone(),
        annotation_e_value: annotation.e_value,
        go_terms: join_non_empty(
            annotation
                .go_terms
                .iter()
                .map(|go| labelled(&go.go_id, go.go_name.as_deref())),
        ),
        enzyme_codes: join_non_empty(
            annotation
                .enzyme_codes
                .iter()
                .map(|ec| labelled(&ec.enzyme_code, ec.enzyme_name.as_deref())),
        ),
        interpro_ids: join_non_empty(
            annotation
                .interpro
                .iter()
                .map(|ipr| labelled(&ipr.interpro_id, ipr.interpro_go_name.as_deref())),
        ),
        ..base.clone()
    }
}

fn labelled(id: &str, name: Option<&str>) -> String {
    format!("{id}({})", name.unwrap_or_default())
}

fn join_non_empty(items: impl Iterator<Item = String>) -> Option<String> {
    let items: Vec<String> = items.collect();
    if items.is_empty() {
        None
    } else {
        Some(items.join("; "))
    }
}

pub fn write_csv<W: Write>(rows: &[GeneTableRow], writer: W) -> Result<(), XeroError> {
    let mut wtr = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        wtr.write_record([
            "Gene ID",
            "Gene Name",
            "Species",
            "Annotation Description",
            "Annotation e-value",
            "Arab. Locus",
            "Arab. Common Name",
            "GO Terms",
            "Enzyme Codes",
            "InterPro IDs",
        ])?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()
        .map_err(|err| XeroError::Filesystem(err.to_string()))?;
    Ok(())
}

/// FASTA text for the records: `>name description` then the coding sequence,
/// entries joined by newlines. A gene without a sequence gets an empty line.
pub fn render_fasta(records: &[GeneRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() * 2);
    for record in records {
        let description = record
            .annotations
            .first()
            .and_then(|ann| ann.description.as_deref())
            .map(str::trim)
            .filter(|desc| !desc.is_empty());
        lines.push(match description {
            Some(desc) => format!(">{} {desc}", record.gene.gene_name),
            None => format!(">{}", record.gene.gene_name),
        });
        lines.push(record.gene.coding_sequence.clone().unwrap_or_default());
    }
    lines.join("\n")
}

pub fn export_file_name(prefix: &str, extension: &str, at: DateTime<Local>) -> String {
    format!("{prefix}_{}.{extension}", at.format("%Y-%m-%d_%H-%M-%S"))
}

/// Write through a temp file in the destination directory, then rename.
pub fn write_file_atomic(dest: &Utf8Path, contents: &[u8]) -> Result<(), XeroError> {
    let parent = dest
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| XeroError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("xero-export")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| XeroError::Filesystem(err.to_string()))?;
    temp.write_all(contents)
        .map_err(|err| XeroError::Filesystem(err.to_string()))?;
    temp.persist(dest.as_std_path())
        .map_err(|err| XeroError::Filesystem(err.to_string()))?;
    Ok(())
}
