use std::collections::{HashMap, HashSet};

use rusqlite::{Connection, Transaction, params};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::db::{Database, query_in_chunks};
use crate::error::XeroError;

#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Run every statement, report the counts, then roll back.
    pub dry_run: bool,
    /// Also remove GO, enzyme, InterPro and homologue rows left without any
    /// link once the batch is gone.
    pub cleanup_orphans: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrphanCounts {
    pub go_terms: usize,
    pub enzyme_codes: usize,
    pub interpro: usize,
    pub arabidopsis_homologues: usize,
}

impl OrphanCounts {
    pub fn total(&self) -> usize {
        self.go_terms + self.enzyme_codes + self.interpro + self.arabidopsis_homologues
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub genes_deleted: usize,
    pub annotations_deleted: usize,
    pub gene_expressions_deleted: usize,
    pub differential_expressions_deleted: usize,
    pub regulatory_interactions_deleted: usize,
    pub arabidopsis_homologue_associations_removed: usize,
    pub orphans: OrphanCounts,
    pub genes_not_found: Vec<String>,
    pub dry_run: bool,
    pub success: bool,
    pub error_message: Option<String>,
}

impl DeletionReport {
    /// Same counts, ignoring the dry-run flag. Used to compare a dry run
    /// against the real deletion.
    pub fn counts_eq(&self, other: &DeletionReport) -> bool {
        self.genes_deleted == other.genes_deleted
            && self.annotations_deleted == other.annotations_deleted
            && self.gene_expressions_deleted == other.gene_expressions_deleted
            && self.differential_expressions_deleted == other.differential_expressions_deleted
            && self.regulatory_interactions_deleted == other.regulatory_interactions_deleted
            && self.arabidopsis_homologue_associations_removed
                == other.arabidopsis_homologue_associations_removed
            && self.orphans == other.orphans
            && self.genes_not_found == other.genes_not_found
    }
}

/// Delete genes by exact name together with everything hanging off them.
///
/// The batch is a single transaction. Unknown names are reported, not fatal.
/// Any database error rolls the whole batch back and is reported through
/// `success` / `error_message` rather than returned; the counts are then zero
/// and `genes_not_found` is kept.
pub fn delete_genes(db: &mut Database, names: &[String], options: DeleteOptions) -> DeletionReport {
    let mut report = DeletionReport {
        dry_run: options.dry_run,
        ..DeletionReport::default()
    };

    match run_batch(db.connection_mut(), names, options, &mut report) {
        Ok(()) => {
            report.success = true;
            info!(
                genes = report.genes_deleted,
                annotations = report.annotations_deleted,
                interactions = report.regulatory_interactions_deleted,
                not_found = report.genes_not_found.len(),
                dry_run = options.dry_run,
                "gene deletion finished"
            );
        }
        Err(err) => {
            error!(error = %err, "gene deletion rolled back");
            // Nothing was removed, but the unknown names are still worth reporting.
            report = DeletionReport {
                dry_run: options.dry_run,
                success: false,
                error_message: Some(err.to_string()),
                genes_not_found: std::mem::take(&mut report.genes_not_found),
                ..DeletionReport::default()
            };
        }
    }
    report
}

fn run_batch(
    conn: &mut Connection,
    names: &[String],
    options: DeleteOptions,
    report: &mut DeletionReport,
) -> Result<(), XeroError> {
    let mut seen = HashSet::new();
    let unique: Vec<String> = names
        .iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect();

    let tx = conn.transaction()?;

    let found: HashMap<String, i64> = query_in_chunks(
        &tx,
        "SELECT gene_name, id FROM genes WHERE gene_name IN ({ids})",
        &unique,
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
    )?
    .into_iter()
    .collect();

    report.genes_not_found = unique
        .iter()
        .filter(|name| !found.contains_key(*name))
        .cloned()
        .collect();
    if !report.genes_not_found.is_empty() {
        warn!(names = ?report.genes_not_found, "genes not found for deletion");
    }
    if found.is_empty() {
        return Ok(());
    }

    tx.execute_batch(
        "CREATE TEMP TABLE IF NOT EXISTS doomed_genes (id INTEGER PRIMARY KEY);
         CREATE TEMP TABLE IF NOT EXISTS orphan_candidates (kind TEXT NOT NULL, id INTEGER NOT NULL);
         DELETE FROM temp.doomed_genes;
         DELETE FROM temp.orphan_candidates;",
    )?;
    {
        let mut insert = tx.prepare("INSERT INTO temp.doomed_genes (id) VALUES (?1)")?;
        for id in found.values() {
            insert.execute(params![id])?;
        }
    }

    if options.cleanup_orphans {
        collect_orphan_candidates(&tx)?;
    }

    report.regulatory_interactions_deleted = tx.execute(
        "DELETE FROM regulatory_interactions
         WHERE regulator_gene_id IN (SELECT id FROM temp.doomed_genes)
            OR target_gene_id IN (SELECT id FROM temp.doomed_genes)",
        [],
    )?;
    report.differential_expressions_deleted = tx.execute(
        "DELETE FROM differential_expression WHERE gene_id IN (SELECT id FROM temp.doomed_genes)",
        [],
    )?;
    report.gene_expressions_deleted = tx.execute(
        "DELETE FROM gene_expressions WHERE gene_id IN (SELECT id FROM temp.doomed_genes)",
        [],
    )?;
    report.arabidopsis_homologue_associations_removed = tx.execute(
        "DELETE FROM gene_homologues WHERE gene_id IN (SELECT id FROM temp.doomed_genes)",
        [],
    )?;
    report.annotations_deleted = tx.execute(
        "DELETE FROM annotations WHERE gene_id IN (SELECT id FROM temp.doomed_genes)",
        [],
    )?;
    report.genes_deleted = tx.execute(
        "DELETE FROM genes WHERE id IN (SELECT id FROM temp.doomed_genes)",
        [],
    )?;

    if options.cleanup_orphans {
        report.orphans = remove_orphans(&tx)?;
    }

    tx.execute_batch("DROP TABLE temp.doomed_genes; DROP TABLE temp.orphan_candidates;")?;

    if options.dry_run {
        tx.rollback()?;
    } else {
        tx.commit()?;
    }
    Ok(())
}

// Only rows linked to the doomed genes are candidates; pre-existing orphans
// elsewhere in the database are left alone.
fn collect_orphan_candidates(tx: &Transaction<'_>) -> Result<(), XeroError> {
    tx.execute_batch(
        "INSERT INTO temp.orphan_candidates (kind, id)
         SELECT DISTINCT 'go', ag.go_id FROM annotation_go ag
         JOIN annotations a ON a.id = ag.annotation_id
         WHERE a.gene_id IN (SELECT id FROM temp.doomed_genes);

         INSERT INTO temp.orphan_candidates (kind, id)
         SELECT DISTINCT 'enzyme', ae.enzyme_code_id FROM annotation_enzyme ae
         JOIN annotations a ON a.id = ae.annotation_id
         WHERE a.gene_id IN (SELECT id FROM temp.doomed_genes);

         INSERT INTO temp.orphan_candidates (kind, id)
         SELECT DISTINCT 'interpro', ai.interpro_id FROM annotation_interpro ai
         JOIN annotations a ON a.id = ai.annotation_id
         WHERE a.gene_id IN (SELECT id FROM temp.doomed_genes);

         INSERT INTO temp.orphan_candidates (kind, id)
         SELECT DISTINCT 'homologue', gh.homologue_id FROM gene_homologues gh
         WHERE gh.gene_id IN (SELECT id FROM temp.doomed_genes);",
    )?;
    Ok(())
}

fn remove_orphans(tx: &Transaction<'_>) -> Result<OrphanCounts, XeroError> {
    let go_terms = tx.execute(
        "DELETE FROM go_terms
         WHERE id IN (SELECT id FROM temp.orphan_candidates WHERE kind = 'go')
           AND NOT EXISTS (SELECT 1 FROM annotation_go ag WHERE ag.go_id = go_terms.id)",
        [],
    )?;
    let enzyme_codes = tx.execute(
        "DELETE FROM enzyme_codes
         WHERE id IN (SELECT id FROM temp.orphan_candidates WHERE kind = 'enzyme')
           AND NOT EXISTS (
               SELECT 1 FROM annotation_enzyme ae WHERE ae.enzyme_code_id = enzyme_codes.id)",
        [],
    )?;
    let interpro = tx.execute(
        "DELETE FROM interpro
         WHERE id IN (SELECT id FROM temp.orphan_candidates WHERE kind = 'interpro')
           AND NOT EXISTS (
               SELECT 1 FROM annotation_interpro ai WHERE ai.interpro_id = interpro.id)",
        [],
    )?;
    let arabidopsis_homologues = tx.execute(
        "DELETE FROM arabidopsis_homologues
         WHERE id IN (SELECT id FROM temp.orphan_candidates WHERE kind = 'homologue')
           AND NOT EXISTS (
               SELECT 1 FROM gene_homologues gh
               WHERE gh.homologue_id = arabidopsis_homologues.id)",
        [],
    )?;
    Ok(OrphanCounts {
        go_terms,
        enzyme_codes,
        interpro,
        arabidopsis_homologues,
    })
}
