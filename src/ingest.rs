use std::collections::BTreeSet;
use std::io::Read;

use rusqlite::{Connection, ErrorCode, OptionalExtension, ffi, params};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::{Database, upsert_differential_expression};
use crate::domain::RegulationDirection;
use crate::error::XeroError;
use crate::models::{DifferentialExpression, ExpressionRow};

pub const GRN_COLUMNS: [&str; 5] = [
    "Regulatory cluster",
    "Predicted regulators",
    "Target cluster",
    "Predicted targets",
    "Direction of regulation",
];

pub const DEG_COLUMNS: [&str; 5] = ["Genes", "Re_Set", "Re_direction", "De_Set", "De_direction"];

pub const EXPRESSION_COLUMNS: [&str; 6] = [
    "gene_name",
    "treatment",
    "time",
    "replicate",
    "normalised_expression",
    "log2_expression",
];

/// One predicted regulator -> target edge of the GRN table.
#[derive(Debug, Clone, Deserialize)]
pub struct GrnRecord {
    #[serde(rename = "Regulatory cluster")]
    pub regulatory_cluster: Option<String>,
    #[serde(rename = "Predicted regulators")]
    pub regulator: String,
    #[serde(rename = "Target cluster")]
    pub target_cluster: Option<String>,
    #[serde(rename = "Predicted targets")]
    pub target: String,
    #[serde(rename = "Direction of regulation")]
    pub direction: String,
}

/// One row of a differential-expression results table.
#[derive(Debug, Clone, Deserialize)]
pub struct DegRecord {
    #[serde(rename = "Genes")]
    pub gene: String,
    #[serde(rename = "Re_Set")]
    pub re_set: Option<String>,
    #[serde(rename = "Re_direction")]
    pub re_direction: Option<String>,
    #[serde(rename = "De_Set")]
    pub de_set: Option<String>,
    #[serde(rename = "De_direction")]
    pub de_direction: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GrnImportSummary {
    pub added: usize,
    pub skipped_gene_not_found: usize,
    pub skipped_species_mismatch: usize,
    pub skipped_already_exists: usize,
    pub skipped_invalid_direction: usize,
    pub genes_not_found: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DegImportSummary {
    pub upserted: usize,
    pub genes_not_found: Vec<String>,
}

pub fn read_grn_records<R: Read>(reader: R) -> Result<Vec<GrnRecord>, XeroError> {
    read_table(reader, "GRN table", &GRN_COLUMNS)
}

pub fn read_deg_records<R: Read>(reader: R) -> Result<Vec<DegRecord>, XeroError> {
    read_table(reader, "DEG table", &DEG_COLUMNS)
}

pub fn read_expression_rows<R: Read>(reader: R) -> Result<Vec<ExpressionRow>, XeroError> {
    read_table(reader, "expression table", &EXPRESSION_COLUMNS)
}

/// Header check happens before any row is decoded, so a table with missing
/// columns never reaches the database.
fn read_table<T, R>(reader: R, source_name: &str, required: &[&str]) -> Result<Vec<T>, XeroError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let missing: Vec<String> = required
        .iter()
        .filter(|column| !headers.iter().any(|header| header == **column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(XeroError::MissingColumns {
            source_name: source_name.to_string(),
            columns: missing,
        });
    }
    let rows = rdr.deserialize().collect::<Result<Vec<T>, _>>()?;
    debug!(source = source_name, rows = rows.len(), "read table");
    Ok(rows)
}

/// Insert GRN edges, committing every `batch_size` rows.
///
/// Rows naming unknown genes, crossing species (when `species` resolves),
/// duplicating an existing edge or carrying an invalid direction are skipped
/// and counted. A UNIQUE or CHECK violation only discards its own row. Any
/// other database error aborts the import; chunks committed before it are
/// kept.
pub fn import_regulatory_interactions(
    db: &mut Database,
    records: &[GrnRecord],
    species: Option<&str>,
    batch_size: usize,
) -> Result<GrnImportSummary, XeroError> {
    let target_species = match species {
        Some(name) => match db.species_by_name(name)? {
            Some(found) => Some(found.id),
            None => {
                warn!(species = name, "species not found, importing without species filter");
                None
            }
        },
        None => None,
    };

    let mut summary = GrnImportSummary::default();
    let conn = db.connection_mut();
    for (index, chunk) in records.chunks(batch_size.max(1)).enumerate() {
        let mut tx = conn.transaction()?;
        for record in chunk {
            let regulator = gene_ref(&tx, &record.regulator)?;
            let Some((regulator_id, regulator_species)) = regulator else {
                summary.skipped_gene_not_found += 1;
                summary.genes_not_found.insert(record.regulator.clone());
                continue;
            };
            let Some((target_id, target_species_id)) = gene_ref(&tx, &record.target)? else {
                summary.skipped_gene_not_found += 1;
                summary.genes_not_found.insert(record.target.clone());
                continue;
            };

            if let Some(species_id) = target_species {
                if regulator_species != species_id || target_species_id != species_id {
                    summary.skipped_species_mismatch += 1;
                    continue;
                }
            }

            let exists = tx
                .prepare_cached(
                    "SELECT 1 FROM regulatory_interactions
                     WHERE regulator_gene_id = ?1 AND target_gene_id = ?2",
                )?
                .query_row(params![regulator_id, target_id], |_| Ok(()))
                .optional()?
                .is_some();
            if exists {
                summary.skipped_already_exists += 1;
                continue;
            }

            let direction = match record.direction.parse::<RegulationDirection>() {
                Ok(direction) => direction,
                Err(err) => {
                    warn!(regulator = %record.regulator, target = %record.target, error = %err, "skipping row");
                    summary.skipped_invalid_direction += 1;
                    continue;
                }
            };

            let sp = tx.savepoint()?;
            let inserted = sp.execute(
                "INSERT INTO regulatory_interactions
                    (regulator_gene_id, target_gene_id, regulatory_cluster, target_cluster, direction)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    regulator_id,
                    target_id,
                    record.regulatory_cluster,
                    record.target_cluster,
                    direction
                ],
            );
            match inserted {
                Ok(_) => {
                    sp.commit()?;
                    summary.added += 1;
                }
                Err(rusqlite::Error::SqliteFailure(err, message))
                    if err.code == ErrorCode::ConstraintViolation
                        && matches!(
                            err.extended_code,
                            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_CHECK
                        ) =>
                {
                    warn!(
                        regulator = %record.regulator,
                        target = %record.target,
                        error = message.as_deref().unwrap_or("constraint violation"),
                        "rolled back row"
                    );
                    if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE {
                        summary.skipped_already_exists += 1;
                    } else {
                        summary.skipped_invalid_direction += 1;
                    }
                }
                // Foreign-key, trigger and other failures abort the chunk.
                Err(err) => return Err(err.into()),
            }
        }
        tx.commit()?;
        debug!(chunk = index, added = summary.added, "committed GRN chunk");
    }

    info!(
        added = summary.added,
        gene_not_found = summary.skipped_gene_not_found,
        species_mismatch = summary.skipped_species_mismatch,
        already_exists = summary.skipped_already_exists,
        invalid_direction = summary.skipped_invalid_direction,
        unique_genes_not_found = summary.genes_not_found.len(),
        "GRN import finished"
    );
    Ok(summary)
}

/// Upsert DE results for one experiment. Unknown genes are skipped and
/// reported; an unknown experiment is an error.
pub fn import_differential_expression(
    db: &mut Database,
    records: &[DegRecord],
    experiment: &str,
) -> Result<DegImportSummary, XeroError> {
    let experiment = db
        .experiment_by_name(experiment)?
        .ok_or_else(|| XeroError::ExperimentNotFound(experiment.to_string()))?;

    let mut summary = DegImportSummary::default();
    let tx = db.connection_mut().transaction()?;
    for record in records {
        let Some((gene_id, _)) = gene_ref(&tx, &record.gene)? else {
            warn!(gene = %record.gene, "gene not found, skipping DE row");
            summary.genes_not_found.push(record.gene.clone());
            continue;
        };
        let row = DifferentialExpression {
            gene_id,
            experiment_id: experiment.id,
            re_set: none_literal(&record.re_set),
            re_direction: none_literal(&record.re_direction),
            de_set: none_literal(&record.de_set),
            de_direction: none_literal(&record.de_direction),
        };
        upsert_differential_expression(&tx, &row)?;
        summary.upserted += 1;
    }
    tx.commit()?;

    info!(
        experiment = %experiment.experiment_name,
        upserted = summary.upserted,
        skipped = summary.genes_not_found.len(),
        "DE import finished"
    );
    Ok(summary)
}

/// Load a tidy expression table into an existing experiment. An unknown gene
/// aborts the whole import.
pub fn import_expression(
    db: &mut Database,
    rows: &[ExpressionRow],
    experiment: &str,
) -> Result<usize, XeroError> {
    let written = db.add_expression_rows(experiment, rows)?;
    info!(experiment, rows = written, "expression import finished");
    Ok(written)
}

fn gene_ref(conn: &Connection, gene_name: &str) -> Result<Option<(i64, i64)>, XeroError> {
    let found = conn
        .prepare_cached("SELECT id, species_id FROM genes WHERE gene_name = ?1")?
        .query_row(params![gene_name.trim()], |row| Ok((row.get(0)?, row.get(1)?)))
        .optional()?;
    Ok(found)
}

// The upstream tables spell missing values as the literal `None`.
fn none_literal(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "None")
        .map(str::to_string)
}
