use std::collections::{BTreeSet, HashSet};

use rusqlite::params_from_iter;
use serde::Serialize;
use tracing::{debug, info};

use crate::db::{Database, MAX_BIND, placeholders};
use crate::domain::{SearchMethod, SpeciesFilter};
use crate::error::XeroError;
use crate::models::GeneRecord;
use crate::tokens::normalize_go_term;

const HOMOLOGUE_JOIN: &str = "JOIN gene_homologues gh ON gh.gene_id = g.id
     JOIN arabidopsis_homologues h ON h.id = gh.homologue_id";
const GO_JOIN: &str = "JOIN annotations a ON a.gene_id = g.id
     JOIN annotation_go ag ON ag.annotation_id = a.id
     JOIN go_terms t ON t.id = ag.go_id";
const ENZYME_JOIN: &str = "JOIN annotations a ON a.gene_id = g.id
     JOIN annotation_enzyme ae ON ae.annotation_id = a.id
     JOIN enzyme_codes e ON e.id = ae.enzyme_code_id";

/// Genes found by a search plus the per-token accounting shown to the user.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryOutcome {
    pub genes: Vec<GeneRecord>,
    pub matched: BTreeSet<String>,
    pub missing: BTreeSet<String>,
}

impl QueryOutcome {
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn gene_names(&self) -> Vec<String> {
        self.genes
            .iter()
            .map(|record| record.gene_name().to_string())
            .collect()
    }
}

/// A search over genes composed from a method, user tokens and an optional
/// species restriction.
#[derive(Debug, Clone)]
pub struct GeneQuery {
    method: SearchMethod,
    tokens: Vec<String>,
    species: SpeciesFilter,
}

impl GeneQuery {
    /// Tokens are put into the form they are compared and reported in:
    /// lower-cased for exact-id methods, normalised for GO ids, untouched
    /// otherwise. Tokens that end up empty are dropped.
    pub fn build(method: SearchMethod, tokens: &[String], species: SpeciesFilter) -> Self {
        let mut seen = HashSet::new();
        let tokens = tokens
            .iter()
            .map(|token| prepare_token(method, token))
            .filter(|token| !token.is_empty())
            .filter(|token| seen.insert(token.clone()))
            .collect();
        Self {
            method,
            tokens,
            species,
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn species(&self) -> &SpeciesFilter {
        &self.species
    }

    pub fn execute(&self, db: &Database) -> Result<QueryOutcome, XeroError> {
        if self.tokens.is_empty() {
            return Ok(QueryOutcome::default());
        }
        debug!(
            method = %self.method,
            species = %self.species,
            tokens = self.tokens.len(),
            "running gene query"
        );

        let conn = db.connection();
        let mut hits: Vec<(i64, String)> = Vec::new();
        let reserved = usize::from(self.species.name().is_some());
        for chunk in self.tokens.chunks(MAX_BIND - reserved) {
            let sql = self.sql(chunk.len());
            let mut values: Vec<&str> = chunk.iter().map(String::as_str).collect();
            if let Some(name) = self.species.name() {
                values.push(name);
            }
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                hits.push(row?);
            }
        }

        let mut matched = BTreeSet::new();
        let mut gene_ids = Vec::new();
        let mut seen_ids = HashSet::new();
        for (gene_id, value) in &hits {
            let mut any = false;
            for token in &self.tokens {
                if token_matches(self.method, token, value) {
                    matched.insert(token.clone());
                    any = true;
                }
            }
            if any && seen_ids.insert(*gene_id) {
                gene_ids.push(*gene_id);
            }
        }
        let missing = self
            .tokens
            .iter()
            .filter(|token| !matched.contains(*token))
            .cloned()
            .collect::<BTreeSet<_>>();

        let genes = db.load_gene_records(&gene_ids)?;
        info!(
            method = %self.method,
            genes = genes.len(),
            matched = matched.len(),
            missing = missing.len(),
            "gene query finished"
        );
        Ok(QueryOutcome {
            genes,
            matched,
            missing,
        })
    }

    /// `SELECT gene id, matched field` for `n` tokens; the species name, if
    /// any, is bound after the tokens.
    fn sql(&self, n: usize) -> String {
        let (join, field) = match self.method {
            SearchMethod::GeneId => ("", "g.gene_name"),
            SearchMethod::ArabidopsisLocus => (HOMOLOGUE_JOIN, "h.a_thaliana_locus"),
            SearchMethod::ArabidopsisCommonName => (HOMOLOGUE_JOIN, "h.a_thaliana_common_name"),
            SearchMethod::GoId => (GO_JOIN, "t.go_id"),
            SearchMethod::GoName => (GO_JOIN, "t.go_name"),
            SearchMethod::EnzymeCode => (ENZYME_JOIN, "e.enzyme_code"),
            SearchMethod::EnzymeName => (ENZYME_JOIN, "e.enzyme_name"),
        };

        let filter = match self.method {
            SearchMethod::GeneId | SearchMethod::ArabidopsisLocus => {
                format!("lower({field}) IN ({})", placeholders(n))
            }
            method => {
                let predicate = match method {
                    SearchMethod::GoId => format!("instr(lower(normalize_go({field})), lower(?)) > 0"),
                    SearchMethod::EnzymeCode => format!("instr({field}, ?) > 0"),
                    _ => format!("instr(lower({field}), lower(?)) > 0"),
                };
                vec![predicate; n].join(" OR ")
            }
        };

        let (species_join, species_cond) = match self.species {
            SpeciesFilter::Any => ("", ""),
            SpeciesFilter::Named(_) => ("JOIN species s ON s.id = g.species_id", " AND s.name = ?"),
        };

        format!(
            "SELECT DISTINCT g.id, {field} FROM genes g {join} {species_join}
             WHERE {field} IS NOT NULL AND ({filter}){species_cond}"
        )
    }
}

fn prepare_token(method: SearchMethod, token: &str) -> String {
    let token = token.trim();
    match method {
        SearchMethod::GeneId | SearchMethod::ArabidopsisLocus => token.to_ascii_lowercase(),
        SearchMethod::GoId => normalize_go_term(token),
        _ => token.to_string(),
    }
}

// Mirrors the SQL predicates so each token is credited only from the
// field values that were actually returned.
fn token_matches(method: SearchMethod, token: &str, value: &str) -> bool {
    match method {
        SearchMethod::GeneId | SearchMethod::ArabidopsisLocus => {
            value.to_ascii_lowercase() == token
        }
        SearchMethod::GoId => normalize_go_term(value)
            .to_ascii_lowercase()
            .contains(&token.to_ascii_lowercase()),
        SearchMethod::EnzymeCode => value.contains(token),
        _ => value
            .to_ascii_lowercase()
            .contains(&token.to_ascii_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn build_prepares_tokens_per_method() {
        let query = GeneQuery::build(
            SearchMethod::GeneId,
            &tokens(&["Xele.ptg000001l.1", "XELE.PTG000001L.1"]),
            SpeciesFilter::Any,
        );
        assert_eq!(query.tokens(), ["xele.ptg000001l.1"]);

        let query = GeneQuery::build(
            SearchMethod::GoId,
            &tokens(&["C:GO:0001939", "GO:0001939", "GO:"]),
            SpeciesFilter::Any,
        );
        assert_eq!(query.tokens(), ["0001939"]);

        let query = GeneQuery::build(
            SearchMethod::GoName,
            &tokens(&["Nucleus"]),
            SpeciesFilter::Any,
        );
        assert_eq!(query.tokens(), ["Nucleus"]);
    }

    #[test]
    fn sql_binds_species_after_tokens() {
        let query = GeneQuery::build(
            SearchMethod::EnzymeCode,
            &tokens(&["3.2.1", "1.1.1"]),
            SpeciesFilter::Named("X. elegans".to_string()),
        );
        let sql = query.sql(2);
        assert!(sql.contains("instr(e.enzyme_code, ?) > 0 OR instr(e.enzyme_code, ?) > 0"));
        assert!(sql.trim_end().ends_with("AND s.name = ?"));
    }

    #[test]
    fn token_matching_rules() {
        assert!(token_matches(SearchMethod::GeneId, "xele.1", "Xele.1"));
        assert!(!token_matches(SearchMethod::GeneId, "xele", "Xele.1"));
        assert!(token_matches(SearchMethod::GoId, "0005", "C:GO:0005634"));
        assert!(token_matches(SearchMethod::GoName, "NUCLEUS", "nucleus"));
        assert!(token_matches(SearchMethod::EnzymeCode, "3.2.1", "3.2.1.4"));
        assert!(!token_matches(SearchMethod::EnzymeCode, "ec", "EC:3.2.1.4"));
    }
}
