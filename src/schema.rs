use rusqlite::Connection;
use tracing::debug;

use crate::error::XeroError;

pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS species (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS genes (
    id              INTEGER PRIMARY KEY,
    gene_name       TEXT NOT NULL UNIQUE,
    species_id      INTEGER NOT NULL REFERENCES species(id),
    coding_sequence TEXT
);

CREATE TABLE IF NOT EXISTS annotations (
    id               INTEGER PRIMARY KEY,
    gene_id          INTEGER NOT NULL REFERENCES genes(id) ON DELETE CASCADE,
    description      TEXT,
    e_value          REAL,
    similarity       REAL,
    bit_score        REAL,
    alignment_length INTEGER,
    positives        INTEGER
);

CREATE TABLE IF NOT EXISTS go_terms (
    id        INTEGER PRIMARY KEY,
    go_id     TEXT NOT NULL UNIQUE,
    go_branch TEXT,
    go_name   TEXT
);

CREATE TABLE IF NOT EXISTS enzyme_codes (
    id          INTEGER PRIMARY KEY,
    enzyme_code TEXT NOT NULL UNIQUE,
    enzyme_name TEXT
);

CREATE TABLE IF NOT EXISTS interpro (
    id               INTEGER PRIMARY KEY,
    interpro_id      TEXT NOT NULL UNIQUE,
    interpro_go_id   TEXT,
    interpro_go_name TEXT
);

CREATE TABLE IF NOT EXISTS arabidopsis_homologues (
    id                     INTEGER PRIMARY KEY,
    a_thaliana_locus       TEXT NOT NULL UNIQUE,
    a_thaliana_common_name TEXT,
    e_value                REAL,
    similarity             REAL,
    bit_score              REAL,
    alignment_length       INTEGER,
    positives              INTEGER
);

CREATE TABLE IF NOT EXISTS annotation_go (
    annotation_id INTEGER NOT NULL REFERENCES annotations(id) ON DELETE CASCADE,
    go_id         INTEGER NOT NULL REFERENCES go_terms(id) ON DELETE CASCADE,
    PRIMARY KEY (annotation_id, go_id)
);

CREATE TABLE IF NOT EXISTS annotation_enzyme (
    annotation_id  INTEGER NOT NULL REFERENCES annotations(id) ON DELETE CASCADE,
    enzyme_code_id INTEGER NOT NULL REFERENCES enzyme_codes(id) ON DELETE CASCADE,
    PRIMARY KEY (annotation_id, enzyme_code_id)
);

CREATE TABLE IF NOT EXISTS annotation_interpro (
    annotation_id INTEGER NOT NULL REFERENCES annotations(id) ON DELETE CASCADE,
    interpro_id   INTEGER NOT NULL REFERENCES interpro(id) ON DELETE CASCADE,
    PRIMARY KEY (annotation_id, interpro_id)
);

CREATE TABLE IF NOT EXISTS gene_homologues (
    gene_id      INTEGER NOT NULL REFERENCES genes(id) ON DELETE CASCADE,
    homologue_id INTEGER NOT NULL REFERENCES arabidopsis_homologues(id) ON DELETE CASCADE,
    PRIMARY KEY (gene_id, homologue_id)
);

CREATE TABLE IF NOT EXISTS experiments (
    id              INTEGER PRIMARY KEY,
    experiment_name TEXT NOT NULL UNIQUE,
    species_id      INTEGER REFERENCES species(id),
    description     TEXT
);

CREATE TABLE IF NOT EXISTS gene_expressions (
    id                    INTEGER PRIMARY KEY,
    treatment             TEXT NOT NULL,
    time                  INTEGER NOT NULL,
    replicate             TEXT NOT NULL,
    normalised_expression REAL NOT NULL,
    log2_expression       REAL NOT NULL,
    meta_data             TEXT,
    experiment_id         INTEGER NOT NULL REFERENCES experiments(id) ON DELETE CASCADE,
    species_id            INTEGER NOT NULL REFERENCES species(id),
    gene_id               INTEGER NOT NULL REFERENCES genes(id) ON DELETE CASCADE,
    UNIQUE (gene_id, experiment_id, treatment, time, replicate)
);

CREATE TABLE IF NOT EXISTS differential_expression (
    id            INTEGER PRIMARY KEY,
    gene_id       INTEGER NOT NULL REFERENCES genes(id) ON DELETE CASCADE,
    experiment_id INTEGER NOT NULL REFERENCES experiments(id) ON DELETE CASCADE,
    re_set        TEXT,
    re_direction  TEXT,
    de_set        TEXT,
    de_direction  TEXT,
    UNIQUE (gene_id, experiment_id)
);

CREATE TABLE IF NOT EXISTS regulatory_interactions (
    id                 INTEGER PRIMARY KEY,
    regulator_gene_id  INTEGER NOT NULL REFERENCES genes(id) ON DELETE CASCADE,
    target_gene_id     INTEGER NOT NULL REFERENCES genes(id) ON DELETE CASCADE,
    regulatory_cluster TEXT,
    target_cluster     TEXT,
    direction          TEXT NOT NULL
        CHECK (direction IN ('Activation', 'Repression', 'Unknown')),
    UNIQUE (regulator_gene_id, target_gene_id)
);

CREATE INDEX IF NOT EXISTS ix_genes_species_id ON genes(species_id);
CREATE INDEX IF NOT EXISTS ix_annotations_gene_id ON annotations(gene_id);
CREATE INDEX IF NOT EXISTS ix_annotation_go_go_id ON annotation_go(go_id);
CREATE INDEX IF NOT EXISTS ix_annotation_enzyme_code_id ON annotation_enzyme(enzyme_code_id);
CREATE INDEX IF NOT EXISTS ix_annotation_interpro_id ON annotation_interpro(interpro_id);
CREATE INDEX IF NOT EXISTS ix_gene_homologues_homologue ON gene_homologues(homologue_id);
CREATE INDEX IF NOT EXISTS ix_gene_expressions_experiment ON gene_expressions(experiment_id);
CREATE INDEX IF NOT EXISTS ix_differential_expression_gene_id ON differential_expression(gene_id);
CREATE INDEX IF NOT EXISTS ix_differential_expression_experiment_id ON differential_expression(experiment_id);
CREATE INDEX IF NOT EXISTS ix_regulatory_interactions_target ON regulatory_interactions(target_gene_id);
";

/// Create any missing tables and stamp the schema version.
pub fn migrate(conn: &Connection) -> Result<(), XeroError> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    conn.execute_batch(SCHEMA)?;
    if version < SCHEMA_VERSION {
        debug!(from = version, to = SCHEMA_VERSION, "stamping schema version");
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}
