use serde::{Deserialize, Serialize};

use crate::domain::RegulationDirection;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Species {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gene {
    pub id: i64,
    pub gene_name: String,
    pub species_id: i64,
    pub coding_sequence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoTerm {
    pub id: i64,
    pub go_id: String,
    pub go_branch: Option<String>,
    pub go_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnzymeCode {
    pub id: i64,
    pub enzyme_code: String,
    pub enzyme_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterPro {
    pub id: i64,
    pub interpro_id: String,
    pub interpro_go_id: Option<String>,
    pub interpro_go_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub id: i64,
    pub gene_id: i64,
    pub description: Option<String>,
    pub e_value: Option<f64>,
    pub similarity: Option<f64>,
    pub bit_score: Option<f64>,
    pub alignment_length: Option<i64>,
    pub positives: Option<i64>,
    pub go_terms: Vec<GoTerm>,
    pub enzyme_codes: Vec<EnzymeCode>,
    pub interpro: Vec<InterPro>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArabidopsisHomologue {
    pub id: i64,
    pub a_thaliana_locus: String,
    pub a_thaliana_common_name: Option<String>,
    pub e_value: Option<f64>,
    pub similarity: Option<f64>,
    pub bit_score: Option<f64>,
    pub alignment_length: Option<i64>,
    pub positives: Option<i64>,
}

/// A gene together with everything the result table shows for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneRecord {
    pub gene: Gene,
    pub species: String,
    pub annotations: Vec<Annotation>,
    pub homologues: Vec<ArabidopsisHomologue>,
}

impl GeneRecord {
    pub fn gene_name(&self) -> &str {
        &self.gene.gene_name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Experiment {
    pub id: i64,
    pub experiment_name: String,
    pub species_id: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifferentialExpression {
    pub gene_id: i64,
    pub experiment_id: i64,
    pub re_set: Option<String>,
    pub re_direction: Option<String>,
    pub de_set: Option<String>,
    pub de_direction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegulatoryInteraction {
    pub regulator_gene: String,
    pub target_gene: String,
    pub regulatory_cluster: Option<String>,
    pub target_cluster: Option<String>,
    pub direction: RegulationDirection,
}

/// Input shape for one annotation row of the functional annotation export.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAnnotation {
    pub description: Option<String>,
    pub e_value: Option<f64>,
    pub similarity: Option<f64>,
    pub bit_score: Option<f64>,
    pub alignment_length: Option<i64>,
    pub positives: Option<i64>,
    /// `(go_id, go_name)` pairs, GO ids may carry the `X:` branch prefix.
    pub go_terms: Vec<(String, String)>,
    /// `(enzyme_code, enzyme_name)` pairs.
    pub enzyme_codes: Vec<(String, String)>,
    pub interpro: Vec<NewInterPro>,
}

/// InterPro hit of an annotation, with the GO mapping InterPro gives for it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewInterPro {
    pub interpro_id: String,
    pub interpro_go_id: Option<String>,
    pub interpro_go_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewHomologue {
    pub a_thaliana_locus: String,
    pub a_thaliana_common_name: Option<String>,
    pub e_value: Option<f64>,
    pub similarity: Option<f64>,
    pub bit_score: Option<f64>,
    pub alignment_length: Option<i64>,
    pub positives: Option<i64>,
}

/// One measurement of the tidy expression table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionRow {
    pub gene_name: String,
    pub treatment: String,
    pub time: i64,
    pub replicate: String,
    pub normalised_expression: f64,
    pub log2_expression: f64,
}
