use std::collections::BTreeSet;
use std::io::{self, Write};

use serde::Serialize;

use crate::app::{
    ExportResult, ExpressionImportResult, ExpressionResult, ExpressionSearchResult, InitResult,
    SearchResult,
};
use crate::deletion::DeletionReport;
use crate::expression::ExpressionTable;
use crate::ingest::{DegImportSummary, GrnImportSummary};
use crate::models::{Experiment, RegulatoryInteraction, Species};
use crate::tokens::tokens_to_string;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_init(result: &InitResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_species(species: &[Species]) -> io::Result<()> {
        Self::print_json(&species)
    }

    pub fn print_experiments(experiments: &[Experiment]) -> io::Result<()> {
        Self::print_json(&experiments)
    }

    pub fn print_search(result: &SearchResult, export: Option<&ExportResult>) -> io::Result<()> {
        #[derive(Serialize)]
        struct Envelope<'a> {
            #[serde(flatten)]
            result: &'a SearchResult,
            export: Option<&'a ExportResult>,
        }
        Self::print_json(&Envelope { result, export })
    }

    pub fn print_expression(result: &ExpressionResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_expression_search(result: &ExpressionSearchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_interactions(interactions: &[RegulatoryInteraction]) -> io::Result<()> {
        Self::print_json(&interactions)
    }

    pub fn print_deletion(report: &DeletionReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_grn_import(summary: &GrnImportSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    pub fn print_deg_import(summary: &DegImportSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    pub fn print_expression_import(result: &ExpressionImportResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Plain-terminal summaries, one per command.
pub struct HumanOutput;

impl HumanOutput {
    pub fn print_init(result: &InitResult) {
        println!(
            "{GREEN}Database ready at {} (schema v{}){RESET}",
            result.database, result.schema_version
        );
    }

    pub fn print_species(species: &[Species]) {
        if species.is_empty() {
            println!("{YELLOW}No species in the database{RESET}");
        }
        for sp in species {
            println!("{}", sp.name);
        }
    }

    pub fn print_experiments(experiments: &[Experiment]) {
        if experiments.is_empty() {
            println!("{YELLOW}No experiments for this species{RESET}");
        }
        for experiment in experiments {
            match &experiment.description {
                Some(desc) => println!("{}\t{desc}", experiment.experiment_name),
                None => println!("{}", experiment.experiment_name),
            }
        }
    }

    pub fn print_search(result: &SearchResult, export: Option<&ExportResult>) {
        println!(
            "{CYAN}{} search, species {}{RESET}",
            result.method.label(),
            result.species
        );
        print_token_accounting(&result.outcome.matched, &result.outcome.missing);
        println!("Found {} gene(s).", result.outcome.genes.len());
        for row in result.rows() {
            println!(
                "{}\t{}\t{}\t{}\t{}",
                row.gene_name,
                row.species,
                row.annotation_description.as_deref().unwrap_or("-"),
                row.arabidopsis_locus.as_deref().unwrap_or("-"),
                row.go_terms.as_deref().unwrap_or("-"),
            );
        }
        if let Some(export) = export {
            if let Some(path) = &export.csv_path {
                println!("{GREEN}CSV written: {path} ({} rows){RESET}", export.rows);
            }
            if let Some(path) = &export.fasta_path {
                println!(
                    "{GREEN}FASTA written: {path} ({} sequences){RESET}",
                    export.sequences
                );
            }
        }
    }

    pub fn print_expression(result: &ExpressionResult) {
        if !result.genes_not_found.is_empty() {
            println!(
                "{YELLOW}Genes not found: {}{RESET}",
                tokens_to_string(&result.genes_not_found)
            );
        }
        print_expression_table(&result.table);
    }

    pub fn print_expression_search(result: &ExpressionSearchResult) {
        print_token_accounting(&result.matched, &result.missing);
        print_expression_table(&result.table);
    }

    pub fn print_interactions(interactions: &[RegulatoryInteraction]) {
        if interactions.is_empty() {
            println!("{YELLOW}No regulatory interactions found{RESET}");
        }
        for edge in interactions {
            println!(
                "{}\t-> {}\t{}\t{} / {}",
                edge.regulator_gene,
                edge.target_gene,
                edge.direction,
                edge.regulatory_cluster.as_deref().unwrap_or("-"),
                edge.target_cluster.as_deref().unwrap_or("-"),
            );
        }
    }

    pub fn print_deletion(report: &DeletionReport) {
        if !report.success {
            println!(
                "{RED}Deletion failed and was rolled back: {}{RESET}",
                report.error_message.as_deref().unwrap_or("unknown error")
            );
            return;
        }
        let heading = if report.dry_run {
            "Dry run, nothing was deleted"
        } else {
            "Deletion complete"
        };
        println!("{CYAN}{heading}{RESET}");
        println!("  genes: {}", report.genes_deleted);
        println!("  annotations: {}", report.annotations_deleted);
        println!("  gene expressions: {}", report.gene_expressions_deleted);
        println!(
            "  differential expressions: {}",
            report.differential_expressions_deleted
        );
        println!(
            "  regulatory interactions: {}",
            report.regulatory_interactions_deleted
        );
        println!(
            "  homologue links: {}",
            report.arabidopsis_homologue_associations_removed
        );
        if report.orphans.total() > 0 {
            println!(
                "  orphans: {} GO, {} enzyme, {} InterPro, {} homologue",
                report.orphans.go_terms,
                report.orphans.enzyme_codes,
                report.orphans.interpro,
                report.orphans.arabidopsis_homologues
            );
        }
        if !report.genes_not_found.is_empty() {
            println!(
                "{YELLOW}Genes not found: {}{RESET}",
                tokens_to_string(&report.genes_not_found)
            );
        }
    }

    pub fn print_grn_import(summary: &GrnImportSummary) {
        println!("{CYAN}GRN import summary{RESET}");
        println!("{GREEN}Added: {}{RESET}", summary.added);
        println!("Skipped (gene not found): {}", summary.skipped_gene_not_found);
        println!("Skipped (species mismatch): {}", summary.skipped_species_mismatch);
        println!("Skipped (already exists): {}", summary.skipped_already_exists);
        println!(
            "Skipped (invalid direction): {}",
            summary.skipped_invalid_direction
        );
        println!("Unique genes not found: {}", summary.genes_not_found.len());
    }

    pub fn print_deg_import(summary: &DegImportSummary) {
        println!("{GREEN}Processed {} DE record(s){RESET}", summary.upserted);
        if !summary.genes_not_found.is_empty() {
            println!(
                "{YELLOW}Skipped unknown genes: {}{RESET}",
                tokens_to_string(&summary.genes_not_found)
            );
        }
    }

    pub fn print_expression_import(result: &ExpressionImportResult) {
        println!(
            "{GREEN}Loaded {} expression row(s) into {}{RESET}",
            result.rows, result.experiment
        );
    }
}

fn print_token_accounting(matched: &BTreeSet<String>, missing: &BTreeSet<String>) {
    if !matched.is_empty() {
        let matched: Vec<String> = matched.iter().cloned().collect();
        println!("{GREEN}Matched: {}{RESET}", tokens_to_string(&matched));
    }
    if !missing.is_empty() {
        let missing: Vec<String> = missing.iter().cloned().collect();
        println!("{YELLOW}Not found: {}{RESET}", tokens_to_string(&missing));
    }
}

fn print_expression_table(table: &ExpressionTable) {
    if table.is_empty() {
        println!(
            "{YELLOW}No expression data for {} ({}){RESET}",
            table.experiment, table.filter
        );
        return;
    }
    println!(
        "{CYAN}{}: {} gene(s), {}{RESET}",
        table.experiment,
        table.gene_names().len(),
        table.filter
    );
    println!("gene\ttreatment\ttime\treplicate\tnormalised\tlog2");
    for row in &table.rows {
        println!(
            "{}\t{}\t{}\t{}\t{:.3}\t{:.3}",
            row.gene_name,
            row.treatment,
            row.time,
            row.replicate,
            row.normalised_expression,
            row.log2_expression
        );
    }
}
