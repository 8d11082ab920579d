use std::collections::BTreeSet;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{DEFAULT_COMMIT_BATCH_SIZE, ResolvedConfig};
use crate::db::Database;
use crate::deletion::{self, DeleteOptions, DeletionReport};
use crate::domain::{DegFilter, SearchMethod, SpeciesFilter};
use crate::error::XeroError;
use crate::export::{self, GeneTableRow};
use crate::expression::{self, ExpressionTable};
use crate::ingest::{self, DegImportSummary, GrnImportSummary};
use crate::models::{Experiment, RegulatoryInteraction, Species};
use crate::query::{GeneQuery, QueryOutcome};
use crate::schema::SCHEMA_VERSION;
use crate::tokens::parse_tokens;

#[derive(Debug, Clone, Serialize)]
pub struct InitResult {
    pub database: String,
    pub schema_version: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub method: SearchMethod,
    pub species: String,
    pub tokens: Vec<String>,
    #[serde(flatten)]
    pub outcome: QueryOutcome,
}

impl SearchResult {
    pub fn rows(&self) -> Vec<GeneTableRow> {
        export::flatten(&self.outcome.genes)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub csv_path: Option<String>,
    pub fasta_path: Option<String>,
    pub rows: usize,
    pub sequences: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpressionResult {
    pub table: ExpressionTable,
    pub genes_not_found: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpressionSearchResult {
    pub matched: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    pub table: ExpressionTable,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpressionImportResult {
    pub experiment: String,
    pub rows: usize,
}

/// Entry point for every user-facing operation. Holds only the database
/// location; each operation opens its own [`Database`] and drops it on return.
#[derive(Debug, Clone)]
pub struct App {
    database_path: Utf8PathBuf,
    commit_batch_size: usize,
}

impl App {
    pub fn new(database_path: Utf8PathBuf) -> Self {
        Self {
            database_path,
            commit_batch_size: DEFAULT_COMMIT_BATCH_SIZE,
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            database_path: config.database.clone(),
            commit_batch_size: config.commit_batch_size,
        }
    }

    pub fn with_commit_batch_size(mut self, size: usize) -> Self {
        self.commit_batch_size = size.max(1);
        self
    }

    pub fn database_path(&self) -> &Utf8Path {
        &self.database_path
    }

    pub fn session(&self) -> Result<Database, XeroError> {
        Database::open(&self.database_path)
    }

    pub fn init(&self) -> Result<InitResult, XeroError> {
        let _db = self.session()?;
        info!(database = %self.database_path, "database ready");
        Ok(InitResult {
            database: self.database_path.to_string(),
            schema_version: SCHEMA_VERSION,
        })
    }

    pub fn species(&self) -> Result<Vec<Species>, XeroError> {
        self.session()?.all_species()
    }

    pub fn experiments(&self, species: &str) -> Result<Vec<Experiment>, XeroError> {
        let db = self.session()?;
        if db.species_by_name(species)?.is_none() {
            return Err(XeroError::SpeciesNotFound(species.to_string()));
        }
        db.experiments_by_species(species)
    }

    /// Get-or-create an experiment attached to an existing species.
    pub fn add_experiment(
        &self,
        name: &str,
        species: &str,
        description: Option<&str>,
    ) -> Result<Experiment, XeroError> {
        let db = self.session()?;
        let species = db
            .species_by_name(species)?
            .ok_or_else(|| XeroError::SpeciesNotFound(species.to_string()))?;
        let experiment = db.add_experiment(name, Some(species.id), description)?;
        info!(experiment = %experiment.experiment_name, species = %species.name, "experiment ready");
        Ok(experiment)
    }

    /// Parse free-text `input` into tokens and run the gene search.
    pub fn search(
        &self,
        method: SearchMethod,
        input: &str,
        species: SpeciesFilter,
    ) -> Result<SearchResult, XeroError> {
        let tokens = parse_tokens(input);
        let query = GeneQuery::build(method, &tokens, species);
        let db = self.session()?;
        let outcome = query.execute(&db)?;
        Ok(SearchResult {
            method,
            species: query.species().to_string(),
            tokens: query.tokens().to_vec(),
            outcome,
        })
    }

    /// Write the result table and/or FASTA of a search next to each other.
    pub fn export_search(
        &self,
        result: &SearchResult,
        csv_path: Option<&Utf8Path>,
        fasta_path: Option<&Utf8Path>,
    ) -> Result<ExportResult, XeroError> {
        let rows = result.rows();
        if let Some(path) = csv_path {
            let mut buffer = Vec::new();
            export::write_csv(&rows, &mut buffer)?;
            export::write_file_atomic(path, &buffer)?;
            debug!(path = %path, rows = rows.len(), "wrote CSV export");
        }
        if let Some(path) = fasta_path {
            let fasta = export::render_fasta(&result.outcome.genes);
            export::write_file_atomic(path, fasta.as_bytes())?;
            debug!(path = %path, genes = result.outcome.genes.len(), "wrote FASTA export");
        }
        Ok(ExportResult {
            csv_path: csv_path.map(ToString::to_string),
            fasta_path: fasta_path.map(ToString::to_string),
            rows: rows.len(),
            sequences: result.outcome.genes.len(),
        })
    }

    pub fn expression(
        &self,
        genes: &[String],
        experiment: &str,
        filter: DegFilter,
    ) -> Result<ExpressionResult, XeroError> {
        let db = self.session()?;
        let (present, genes_not_found) = db.partition_known_genes(genes)?;
        let table = expression::expression_data(&db, &present, experiment, filter)?;
        Ok(ExpressionResult {
            table,
            genes_not_found,
        })
    }

    /// Resolve genes through the search matcher, then fetch their expression.
    pub fn expression_for_search(
        &self,
        method: SearchMethod,
        input: &str,
        species: SpeciesFilter,
        experiment: &str,
        filter: DegFilter,
    ) -> Result<ExpressionSearchResult, XeroError> {
        let tokens = parse_tokens(input);
        let db = self.session()?;
        let outcome = GeneQuery::build(method, &tokens, species).execute(&db)?;
        let table =
            expression::expression_data(&db, &outcome.gene_names(), experiment, filter)?;
        info!(
            experiment,
            genes = outcome.genes.len(),
            rows = table.rows.len(),
            "expression lookup finished"
        );
        Ok(ExpressionSearchResult {
            matched: outcome.matched,
            missing: outcome.missing,
            table,
        })
    }

    pub fn regulatory_interactions(
        &self,
        gene: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RegulatoryInteraction>, XeroError> {
        self.session()?.regulatory_interactions(gene, limit)
    }

    pub fn delete_genes(
        &self,
        names: &[String],
        options: DeleteOptions,
    ) -> Result<DeletionReport, XeroError> {
        let mut db = self.session()?;
        Ok(deletion::delete_genes(&mut db, names, options))
    }

    pub fn import_grn(
        &self,
        path: &Utf8Path,
        species: Option<&str>,
    ) -> Result<GrnImportSummary, XeroError> {
        let records = ingest::read_grn_records(open_table(path)?)?;
        let mut db = self.session()?;
        ingest::import_regulatory_interactions(&mut db, &records, species, self.commit_batch_size)
    }

    pub fn import_deg(
        &self,
        path: &Utf8Path,
        experiment: &str,
    ) -> Result<DegImportSummary, XeroError> {
        let records = ingest::read_deg_records(open_table(path)?)?;
        let mut db = self.session()?;
        ingest::import_differential_expression(&mut db, &records, experiment)
    }

    pub fn import_expression(
        &self,
        path: &Utf8Path,
        experiment: &str,
    ) -> Result<ExpressionImportResult, XeroError> {
        let rows = ingest::read_expression_rows(open_table(path)?)?;
        let mut db = self.session()?;
        let written = ingest::import_expression(&mut db, &rows, experiment)?;
        Ok(ExpressionImportResult {
            experiment: experiment.to_string(),
            rows: written,
        })
    }
}

fn open_table(path: &Utf8Path) -> Result<fs::File, XeroError> {
    fs::File::open(path.as_std_path())
        .map_err(|err| XeroError::Filesystem(format!("open {path}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_creates_database_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("nested").join("xero.sqlite"))
            .unwrap();
        let app = App::new(path.clone());
        let init = app.init().unwrap();
        assert_eq!(init.schema_version, SCHEMA_VERSION);
        assert!(path.as_std_path().exists());
        assert!(app.species().unwrap().is_empty());
    }
}
