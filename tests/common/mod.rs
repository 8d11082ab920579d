#![allow(dead_code)]

use rusqlite::params;

use xero_explorer::db::Database;
use xero_explorer::models::{
    DifferentialExpression, Experiment, ExpressionRow, Gene, NewAnnotation, NewHomologue,
};

pub const SPECIES: &str = "X. elegans";

pub fn memory_db() -> Database {
    Database::open_in_memory().unwrap()
}

pub fn gene(db: &Database, name: &str, sequence: Option<&str>) -> Gene {
    gene_in(db, SPECIES, name, sequence)
}

pub fn gene_in(db: &Database, species: &str, name: &str, sequence: Option<&str>) -> Gene {
    let species = db.add_species(species).unwrap();
    db.add_gene(species.id, name, sequence).unwrap()
}

pub fn annotate(
    db: &mut Database,
    gene: &Gene,
    description: &str,
    go_terms: &[(&str, &str)],
    enzymes: &[(&str, &str)],
) -> i64 {
    let new = NewAnnotation {
        description: Some(description.to_string()),
        e_value: Some(1e-50),
        go_terms: go_terms
            .iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect(),
        enzyme_codes: enzymes
            .iter()
            .map(|(code, name)| (code.to_string(), name.to_string()))
            .collect(),
        ..NewAnnotation::default()
    };
    db.add_annotation(gene.id, &new).unwrap()
}

pub fn homologue(db: &Database, gene: &Gene, locus: &str, common_name: &str) -> i64 {
    let id = db
        .add_homologue(&NewHomologue {
            a_thaliana_locus: locus.to_string(),
            a_thaliana_common_name: Some(common_name.to_string()),
            ..NewHomologue::default()
        })
        .unwrap();
    db.link_homologue(gene.id, id).unwrap();
    id
}

pub fn experiment(db: &Database, name: &str) -> Experiment {
    let species = db.add_species(SPECIES).unwrap();
    db.add_experiment(name, Some(species.id), None).unwrap()
}

pub fn expression(
    db: &mut Database,
    experiment: &str,
    gene: &str,
    treatment: &str,
    time: i64,
    replicate: &str,
    value: f64,
) {
    let row = ExpressionRow {
        gene_name: gene.to_string(),
        treatment: treatment.to_string(),
        time,
        replicate: replicate.to_string(),
        normalised_expression: value,
        log2_expression: (value + 1.0).log2(),
    };
    db.add_expression_rows(experiment, &[row]).unwrap();
}

pub fn deg(
    db: &Database,
    gene: &Gene,
    experiment: &Experiment,
    re_direction: Option<&str>,
    de_direction: Option<&str>,
) {
    db.upsert_differential_expression(&DifferentialExpression {
        gene_id: gene.id,
        experiment_id: experiment.id,
        re_set: re_direction.map(|_| "set1".to_string()),
        re_direction: re_direction.map(str::to_string),
        de_set: de_direction.map(|_| "set1".to_string()),
        de_direction: de_direction.map(str::to_string),
    })
    .unwrap();
}

pub fn interaction(db: &Database, regulator: &Gene, target: &Gene, direction: &str) {
    db.connection()
        .execute(
            "INSERT INTO regulatory_interactions
                (regulator_gene_id, target_gene_id, regulatory_cluster, target_cluster, direction)
             VALUES (?1, ?2, 'c1', 'c2', ?3)",
            params![regulator.id, target.id, direction],
        )
        .unwrap();
}

pub fn count(db: &Database, table: &str) -> i64 {
    db.connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
