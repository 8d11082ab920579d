use std::cmp::Ordering;

use rusqlite::params_from_iter;
use rusqlite::types::Value;
use serde::Serialize;
use tracing::debug;

use crate::db::{Database, MAX_BIND, placeholders};
use crate::domain::DegFilter;
use crate::error::XeroError;
use crate::models::ExpressionRow;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionTable {
    pub experiment: String,
    pub filter: DegFilter,
    pub rows: Vec<ExpressionRow>,
}

impl ExpressionTable {
    fn empty(experiment: &str, filter: DegFilter) -> Self {
        Self {
            experiment: experiment.to_string(),
            filter,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct gene names in row order.
    pub fn gene_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rows.iter().map(|row| row.gene_name.as_str()).collect();
        names.dedup();
        names
    }
}

/// Expression measurements of `genes` in one experiment, optionally limited
/// to genes whose differential-expression row satisfies `filter`. Rows are
/// ordered by gene, treatment, time and replicate.
pub fn expression_data(
    db: &Database,
    genes: &[String],
    experiment: &str,
    filter: DegFilter,
) -> Result<ExpressionTable, XeroError> {
    if genes.is_empty() {
        return Ok(ExpressionTable::empty(experiment, filter));
    }

    let (deg_join, deg_cond) = match filter {
        DegFilter::ShowAll => ("", ""),
        DegFilter::ShowDeg => (
            DE_JOIN,
            " AND (de.re_direction IS NOT NULL OR de.de_direction IS NOT NULL)",
        ),
        DegFilter::ShowUp | DegFilter::ShowDown => {
            (DE_JOIN, " AND (de.re_direction = ? OR de.de_direction = ?)")
        }
    };

    let mut rows = Vec::new();
    for chunk in genes.chunks(MAX_BIND - 3) {
        let sql = format!(
            "SELECT g.gene_name, ge.treatment, ge.time, ge.replicate,
                    ge.normalised_expression, ge.log2_expression
             FROM gene_expressions ge
             JOIN genes g ON g.id = ge.gene_id
             JOIN experiments x ON x.id = ge.experiment_id
             {deg_join}
             WHERE x.experiment_name = ? AND g.gene_name IN ({}){deg_cond}",
            placeholders(chunk.len())
        );
        let mut values: Vec<Value> = Vec::with_capacity(chunk.len() + 3);
        values.push(Value::Text(experiment.to_string()));
        values.extend(chunk.iter().cloned().map(Value::Text));
        if let Some(direction) = filter.direction() {
            values.push(Value::Text(direction.to_string()));
            values.push(Value::Text(direction.to_string()));
        }

        let mut stmt = db.connection().prepare(&sql)?;
        let mapped = stmt.query_map(params_from_iter(values), |row| {
            Ok(ExpressionRow {
                gene_name: row.get(0)?,
                treatment: row.get(1)?,
                time: row.get(2)?,
                replicate: row.get(3)?,
                normalised_expression: row.get(4)?,
                log2_expression: row.get(5)?,
            })
        })?;
        for row in mapped {
            rows.push(row?);
        }
    }

    rows.sort_by(|a, b| {
        (&a.gene_name, &a.treatment, a.time)
            .cmp(&(&b.gene_name, &b.treatment, b.time))
            .then_with(|| compare_replicates(&a.replicate, &b.replicate))
    });
    debug!(
        experiment,
        filter = %filter,
        genes = genes.len(),
        rows = rows.len(),
        "fetched expression rows"
    );

    Ok(ExpressionTable {
        experiment: experiment.to_string(),
        filter,
        rows,
    })
}

/// Integer replicates sort by value and before any labelled ones; labels
/// sort as strings.
fn compare_replicates(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

const DE_JOIN: &str = "JOIN differential_expression de
     ON de.gene_id = ge.gene_id AND de.experiment_id = ge.experiment_id";
