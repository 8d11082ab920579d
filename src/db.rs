use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use camino::Utf8Path;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tracing::debug;

use crate::domain::RegulationDirection;
use crate::error::XeroError;
use crate::models::{
    Annotation, ArabidopsisHomologue, DifferentialExpression, EnzymeCode, Experiment,
    ExpressionRow, Gene, GeneRecord, GoTerm, InterPro, NewAnnotation, NewHomologue,
    RegulatoryInteraction, Species,
};
use crate::schema;
use crate::tokens::{go_branch_of, normalize_go_term};

/// Upper bound on bound parameters per statement when expanding `IN (...)` lists.
pub(crate) const MAX_BIND: usize = 500;

pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Run `template` once per chunk of `values`, substituting `{ids}` with the
/// matching number of placeholders, and collect every mapped row.
pub(crate) fn query_in_chunks<V, T, F>(
    conn: &Connection,
    template: &str,
    values: &[V],
    mut map: F,
) -> Result<Vec<T>, XeroError>
where
    V: ToSql,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut out = Vec::new();
    for chunk in values.chunks(MAX_BIND) {
        let sql = template.replace("{ids}", &placeholders(chunk.len()));
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| map(row))?;
        for row in rows {
            out.push(row?);
        }
    }
    Ok(out)
}

/// Insert or replace the DE row keyed by (gene, experiment). Takes a bare
/// connection so importers can run it inside their own transaction.
pub(crate) fn upsert_differential_expression(
    conn: &Connection,
    row: &DifferentialExpression,
) -> Result<(), XeroError> {
    conn.prepare_cached(
        "INSERT INTO differential_expression
            (gene_id, experiment_id, re_set, re_direction, de_set, de_direction)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(gene_id, experiment_id) DO UPDATE SET
            re_set = excluded.re_set,
            re_direction = excluded.re_direction,
            de_set = excluded.de_set,
            de_direction = excluded.de_direction",
    )?
    .execute(params![
        row.gene_id,
        row.experiment_id,
        row.re_set,
        row.re_direction,
        row.de_set,
        row.de_direction
    ])?;
    Ok(())
}

/// Scoped handle on the SQLite database. Dropping it closes the connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Utf8Path) -> Result<Self, XeroError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| XeroError::Filesystem(err.to_string()))?;
        }
        debug!(path = %path, "opening database");
        let conn = Connection::open(path.as_std_path())?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, XeroError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, XeroError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        register_functions(&conn)?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn add_species(&self, name: &str) -> Result<Species, XeroError> {
        let name = name.trim();
        let id = self.conn.query_row(
            "INSERT INTO species (name) VALUES (?1)
             ON CONFLICT(name) DO UPDATE SET name = excluded.name
             RETURNING id",
            params![name],
            |row| row.get(0),
        )?;
        Ok(Species {
            id,
            name: name.to_string(),
        })
    }

    pub fn species_by_name(&self, name: &str) -> Result<Option<Species>, XeroError> {
        let species = self
            .conn
            .query_row(
                "SELECT id, name FROM species WHERE name = ?1",
                params![name],
                species_from_row,
            )
            .optional()?;
        Ok(species)
    }

    pub fn all_species(&self) -> Result<Vec<Species>, XeroError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM species ORDER BY name")?;
        let rows = stmt.query_map([], species_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Insert a gene unless one with the same name exists; the existing row
    /// is returned untouched.
    pub fn add_gene(
        &self,
        species_id: i64,
        gene_name: &str,
        coding_sequence: Option<&str>,
    ) -> Result<Gene, XeroError> {
        let gene_name = gene_name.trim();
        self.conn.execute(
            "INSERT OR IGNORE INTO genes (gene_name, species_id, coding_sequence)
             VALUES (?1, ?2, ?3)",
            params![gene_name, species_id, coding_sequence],
        )?;
        self.gene_by_name(gene_name)?
            .ok_or_else(|| XeroError::GeneNotFound(gene_name.to_string()))
    }

    pub fn gene_by_name(&self, gene_name: &str) -> Result<Option<Gene>, XeroError> {
        let gene = self
            .conn
            .query_row(
                "SELECT id, gene_name, species_id, coding_sequence FROM genes WHERE gene_name = ?1",
                params![gene_name],
                gene_from_row,
            )
            .optional()?;
        Ok(gene)
    }

    pub fn genes_in_species(&self, species_name: &str) -> Result<Vec<Gene>, XeroError> {
        let mut stmt = self.conn.prepare(
            "SELECT g.id, g.gene_name, g.species_id, g.coding_sequence
             FROM genes g JOIN species s ON s.id = g.species_id
             WHERE s.name = ?1
             ORDER BY g.gene_name",
        )?;
        let rows = stmt.query_map(params![species_name], gene_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Exact-name lookup of gene ids.
    pub fn gene_ids_by_names(&self, names: &[String]) -> Result<HashMap<String, i64>, XeroError> {
        let rows = query_in_chunks(
            &self.conn,
            "SELECT gene_name, id FROM genes WHERE gene_name IN ({ids})",
            names,
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )?;
        Ok(rows.into_iter().collect())
    }

    /// Split names into those present in the database and those that are not,
    /// keeping input order in both halves.
    pub fn partition_known_genes(
        &self,
        names: &[String],
    ) -> Result<(Vec<String>, Vec<String>), XeroError> {
        let known = self.gene_ids_by_names(names)?;
        Ok(names
            .iter()
            .cloned()
            .partition(|name| known.contains_key(name)))
    }

    /// Insert one annotation with its GO / enzyme / InterPro links. Linked
    /// vocabulary rows are created on first use and shared afterwards.
    pub fn add_annotation(&mut self, gene_id: i64, new: &NewAnnotation) -> Result<i64, XeroError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO annotations
                (gene_id, description, e_value, similarity, bit_score, alignment_length, positives)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                gene_id,
                new.description,
                new.e_value,
                new.similarity,
                new.bit_score,
                new.alignment_length,
                new.positives
            ],
        )?;
        let annotation_id = tx.last_insert_rowid();

        for (go_id, go_name) in &new.go_terms {
            let go_id = go_id.trim();
            let branch = go_branch_of(go_id).map(String::from);
            let term_id: i64 = tx.query_row(
                "INSERT INTO go_terms (go_id, go_branch, go_name) VALUES (?1, ?2, ?3)
                 ON CONFLICT(go_id) DO UPDATE SET go_name = excluded.go_name
                 RETURNING id",
                params![go_id, branch, go_name.trim()],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO annotation_go (annotation_id, go_id) VALUES (?1, ?2)",
                params![annotation_id, term_id],
            )?;
        }

        for (code, name) in &new.enzyme_codes {
            let enzyme_id: i64 = tx.query_row(
                "INSERT INTO enzyme_codes (enzyme_code, enzyme_name) VALUES (?1, ?2)
                 ON CONFLICT(enzyme_code) DO UPDATE SET enzyme_name = excluded.enzyme_name
                 RETURNING id",
                params![code.trim(), name.trim()],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO annotation_enzyme (annotation_id, enzyme_code_id)
                 VALUES (?1, ?2)",
                params![annotation_id, enzyme_id],
            )?;
        }

        for hit in &new.interpro {
            let row_id: i64 = tx.query_row(
                "INSERT INTO interpro (interpro_id, interpro_go_id, interpro_go_name)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(interpro_id) DO UPDATE SET
                    interpro_go_id = COALESCE(excluded.interpro_go_id, interpro.interpro_go_id),
                    interpro_go_name = COALESCE(excluded.interpro_go_name, interpro.interpro_go_name)
                 RETURNING id",
                params![
                    hit.interpro_id.trim(),
                    hit.interpro_go_id.as_deref().map(str::trim),
                    hit.interpro_go_name.as_deref().map(str::trim)
                ],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO annotation_interpro (annotation_id, interpro_id)
                 VALUES (?1, ?2)",
                params![annotation_id, row_id],
            )?;
        }

        tx.commit()?;
        Ok(annotation_id)
    }

    pub fn add_homologue(&self, new: &NewHomologue) -> Result<i64, XeroError> {
        let id = self.conn.query_row(
            "INSERT INTO arabidopsis_homologues
                (a_thaliana_locus, a_thaliana_common_name, e_value, similarity, bit_score,
                 alignment_length, positives)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(a_thaliana_locus) DO UPDATE SET
                a_thaliana_common_name = excluded.a_thaliana_common_name,
                e_value = excluded.e_value,
                similarity = excluded.similarity,
                bit_score = excluded.bit_score,
                alignment_length = excluded.alignment_length,
                positives = excluded.positives
             RETURNING id",
            params![
                new.a_thaliana_locus.trim(),
                new.a_thaliana_common_name,
                new.e_value,
                new.similarity,
                new.bit_score,
                new.alignment_length,
                new.positives
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn link_homologue(&self, gene_id: i64, homologue_id: i64) -> Result<(), XeroError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO gene_homologues (gene_id, homologue_id) VALUES (?1, ?2)",
            params![gene_id, homologue_id],
        )?;
        Ok(())
    }

    pub fn add_experiment(
        &self,
        experiment_name: &str,
        species_id: Option<i64>,
        description: Option<&str>,
    ) -> Result<Experiment, XeroError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO experiments (experiment_name, species_id, description)
             VALUES (?1, ?2, ?3)",
            params![experiment_name.trim(), species_id, description],
        )?;
        self.experiment_by_name(experiment_name.trim())?
            .ok_or_else(|| XeroError::ExperimentNotFound(experiment_name.to_string()))
    }

    pub fn experiment_by_name(&self, name: &str) -> Result<Option<Experiment>, XeroError> {
        let experiment = self
            .conn
            .query_row(
                "SELECT id, experiment_name, species_id, description
                 FROM experiments WHERE experiment_name = ?1",
                params![name],
                experiment_from_row,
            )
            .optional()?;
        Ok(experiment)
    }

    pub fn experiments_by_species(&self, species_name: &str) -> Result<Vec<Experiment>, XeroError> {
        let mut stmt = self.conn.prepare(
            "SELECT e.id, e.experiment_name, e.species_id, e.description
             FROM experiments e JOIN species s ON s.id = e.species_id
             WHERE s.name = ?1
             ORDER BY e.experiment_name",
        )?;
        let rows = stmt.query_map(params![species_name], experiment_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Upsert measurements for one experiment, keyed by
    /// (gene, experiment, treatment, time, replicate). An unknown gene aborts
    /// the whole call and nothing is written.
    pub fn add_expression_rows(
        &mut self,
        experiment_name: &str,
        rows: &[ExpressionRow],
    ) -> Result<usize, XeroError> {
        let experiment = self
            .experiment_by_name(experiment_name)?
            .ok_or_else(|| XeroError::ExperimentNotFound(experiment_name.to_string()))?;

        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut lookup =
                tx.prepare("SELECT id, species_id FROM genes WHERE gene_name = ?1")?;
            let mut upsert = tx.prepare(
                "INSERT INTO gene_expressions
                    (treatment, time, replicate, normalised_expression, log2_expression,
                     experiment_id, species_id, gene_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(gene_id, experiment_id, treatment, time, replicate) DO UPDATE SET
                    normalised_expression = excluded.normalised_expression,
                    log2_expression = excluded.log2_expression",
            )?;
            for row in rows {
                let (gene_id, species_id): (i64, i64) = lookup
                    .query_row(params![row.gene_name], |r| Ok((r.get(0)?, r.get(1)?)))
                    .optional()?
                    .ok_or_else(|| XeroError::GeneNotFound(row.gene_name.clone()))?;
                written += upsert.execute(params![
                    row.treatment,
                    row.time,
                    row.replicate,
                    row.normalised_expression,
                    row.log2_expression,
                    experiment.id,
                    experiment.species_id.unwrap_or(species_id),
                    gene_id
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    pub fn upsert_differential_expression(
        &self,
        row: &DifferentialExpression,
    ) -> Result<(), XeroError> {
        upsert_differential_expression(&self.conn, row)
    }

    /// GRN edges touching `gene` (as regulator or target), or all edges.
    pub fn regulatory_interactions(
        &self,
        gene: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RegulatoryInteraction>, XeroError> {
        let mut stmt = self.conn.prepare(
            "SELECT r.gene_name, t.gene_name, ri.regulatory_cluster, ri.target_cluster, ri.direction
             FROM regulatory_interactions ri
             JOIN genes r ON r.id = ri.regulator_gene_id
             JOIN genes t ON t.id = ri.target_gene_id
             WHERE ?1 IS NULL OR r.gene_name = ?1 OR t.gene_name = ?1
             ORDER BY r.gene_name, t.gene_name
             LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![gene, limit], |row| {
            Ok(RegulatoryInteraction {
                regulator_gene: row.get(0)?,
                target_gene: row.get(1)?,
                regulatory_cluster: row.get(2)?,
                target_cluster: row.get(3)?,
                direction: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Load genes with species, annotations (GO, enzyme, InterPro) and
    /// homologues, ordered by gene name.
    pub fn load_gene_records(&self, gene_ids: &[i64]) -> Result<Vec<GeneRecord>, XeroError> {
        if gene_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = &self.conn;

        let genes = query_in_chunks(
            conn,
            "SELECT g.id, g.gene_name, g.species_id, g.coding_sequence, s.name
             FROM genes g JOIN species s ON s.id = g.species_id
             WHERE g.id IN ({ids})",
            gene_ids,
            |row| Ok((gene_from_row(row)?, row.get::<_, String>(4)?)),
        )?;

        let annotations = query_in_chunks(
            conn,
            "SELECT id, gene_id, description, e_value, similarity, bit_score,
                    alignment_length, positives
             FROM annotations WHERE gene_id IN ({ids}) ORDER BY id",
            gene_ids,
            annotation_from_row,
        )?;
        let annotation_ids: Vec<i64> = annotations.iter().map(|ann| ann.id).collect();

        let mut go_by_annotation: HashMap<i64, Vec<GoTerm>> = HashMap::new();
        for (annotation_id, term) in query_in_chunks(
            conn,
            "SELECT ag.annotation_id, t.id, t.go_id, t.go_branch, t.go_name
             FROM annotation_go ag JOIN go_terms t ON t.id = ag.go_id
             WHERE ag.annotation_id IN ({ids}) ORDER BY t.go_id",
            &annotation_ids,
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    GoTerm {
                        id: row.get(1)?,
                        go_id: row.get(2)?,
                        go_branch: row.get(3)?,
                        go_name: row.get(4)?,
                    },
                ))
            },
        )? {
            go_by_annotation.entry(annotation_id).or_default().push(term);
        }

        let mut enzymes_by_annotation: HashMap<i64, Vec<EnzymeCode>> = HashMap::new();
        for (annotation_id, enzyme) in query_in_chunks(
            conn,
            "SELECT ae.annotation_id, e.id, e.enzyme_code, e.enzyme_name
             FROM annotation_enzyme ae JOIN enzyme_codes e ON e.id = ae.enzyme_code_id
             WHERE ae.annotation_id IN ({ids}) ORDER BY e.enzyme_code",
            &annotation_ids,
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    EnzymeCode {
                        id: row.get(1)?,
                        enzyme_code: row.get(2)?,
                        enzyme_name: row.get(3)?,
                    },
                ))
            },
        )? {
            enzymes_by_annotation
                .entry(annotation_id)
                .or_default()
                .push(enzyme);
        }

        let mut interpro_by_annotation: HashMap<i64, Vec<InterPro>> = HashMap::new();
        for (annotation_id, interpro) in query_in_chunks(
            conn,
            "SELECT ai.annotation_id, i.id, i.interpro_id, i.interpro_go_id, i.interpro_go_name
             FROM annotation_interpro ai JOIN interpro i ON i.id = ai.interpro_id
             WHERE ai.annotation_id IN ({ids}) ORDER BY i.interpro_id",
            &annotation_ids,
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    InterPro {
                        id: row.get(1)?,
                        interpro_id: row.get(2)?,
                        interpro_go_id: row.get(3)?,
                        interpro_go_name: row.get(4)?,
                    },
                ))
            },
        )? {
            interpro_by_annotation
                .entry(annotation_id)
                .or_default()
                .push(interpro);
        }

        let mut annotations_by_gene: HashMap<i64, Vec<Annotation>> = HashMap::new();
        for mut annotation in annotations {
            annotation.go_terms = go_by_annotation.remove(&annotation.id).unwrap_or_default();
            annotation.enzyme_codes = enzymes_by_annotation
                .remove(&annotation.id)
                .unwrap_or_default();
            annotation.interpro = interpro_by_annotation
                .remove(&annotation.id)
                .unwrap_or_default();
            annotations_by_gene
                .entry(annotation.gene_id)
                .or_default()
                .push(annotation);
        }

        let mut homologues_by_gene: HashMap<i64, Vec<ArabidopsisHomologue>> = HashMap::new();
        for (gene_id, homologue) in query_in_chunks(
            conn,
            "SELECT gh.gene_id, h.id, h.a_thaliana_locus, h.a_thaliana_common_name, h.e_value,
                    h.similarity, h.bit_score, h.alignment_length, h.positives
             FROM gene_homologues gh JOIN arabidopsis_homologues h ON h.id = gh.homologue_id
             WHERE gh.gene_id IN ({ids}) ORDER BY h.a_thaliana_locus",
            gene_ids,
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    ArabidopsisHomologue {
                        id: row.get(1)?,
                        a_thaliana_locus: row.get(2)?,
                        a_thaliana_common_name: row.get(3)?,
                        e_value: row.get(4)?,
                        similarity: row.get(5)?,
                        bit_score: row.get(6)?,
                        alignment_length: row.get(7)?,
                        positives: row.get(8)?,
                    },
                ))
            },
        )? {
            homologues_by_gene.entry(gene_id).or_default().push(homologue);
        }

        let mut records: Vec<GeneRecord> = genes
            .into_iter()
            .map(|(gene, species)| GeneRecord {
                annotations: annotations_by_gene.remove(&gene.id).unwrap_or_default(),
                homologues: homologues_by_gene.remove(&gene.id).unwrap_or_default(),
                species,
                gene,
            })
            .collect();
        records.sort_by(|a, b| a.gene.gene_name.cmp(&b.gene.gene_name));
        Ok(records)
    }
}

fn register_functions(conn: &Connection) -> Result<(), XeroError> {
    conn.create_scalar_function(
        "normalize_go",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|term| normalize_go_term(&term)))
        },
    )?;
    Ok(())
}

fn species_from_row(row: &Row<'_>) -> rusqlite::Result<Species> {
    Ok(Species {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn gene_from_row(row: &Row<'_>) -> rusqlite::Result<Gene> {
    Ok(Gene {
        id: row.get(0)?,
        gene_name: row.get(1)?,
        species_id: row.get(2)?,
        coding_sequence: row.get(3)?,
    })
}

fn experiment_from_row(row: &Row<'_>) -> rusqlite::Result<Experiment> {
    Ok(Experiment {
        id: row.get(0)?,
        experiment_name: row.get(1)?,
        species_id: row.get(2)?,
        description: row.get(3)?,
    })
}

fn annotation_from_row(row: &Row<'_>) -> rusqlite::Result<Annotation> {
    Ok(Annotation {
        id: row.get(0)?,
        gene_id: row.get(1)?,
        description: row.get(2)?,
        e_value: row.get(3)?,
        similarity: row.get(4)?,
        bit_score: row.get(5)?,
        alignment_length: row.get(6)?,
        positives: row.get(7)?,
        go_terms: Vec::new(),
        enzyme_codes: Vec::new(),
        interpro: Vec::new(),
    })
}

impl FromSql for RegulationDirection {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err: XeroError| FromSqlError::Other(err.to_string().into()))
    }
}

impl ToSql for RegulationDirection {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}
