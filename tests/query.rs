mod common;

use std::collections::BTreeSet;

use common::{annotate, gene, gene_in, homologue, memory_db, strings};
use xero_explorer::domain::{SearchMethod, SpeciesFilter};
use xero_explorer::query::GeneQuery;
use xero_explorer::tokens::parse_tokens;

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn gene_id_reports_lowercased_tokens() {
    let db = memory_db();
    gene(&db, "Xele.1", Some("ATGC"));

    let outcome = GeneQuery::build(
        SearchMethod::GeneId,
        &parse_tokens("Xele.1, Xele.2"),
        SpeciesFilter::Any,
    )
    .execute(&db)
    .unwrap();

    assert_eq!(outcome.matched, set(&["xele.1"]));
    assert_eq!(outcome.missing, set(&["xele.2"]));
    assert_eq!(outcome.gene_names(), vec!["Xele.1"]);
    assert_eq!(
        outcome.genes[0].gene.coding_sequence.as_deref(),
        Some("ATGC")
    );
}

#[test]
fn go_id_matches_regardless_of_prefix() {
    let mut db = memory_db();
    let xele = gene(&db, "Xele.1", None);
    annotate(
        &mut db,
        &xele,
        "auxin transport",
        &[("C:GO:0001939", "female pronucleus")],
        &[],
    );

    for input in ["GO:0001939", "0001939", "P:GO:0001939", "go:0001939"] {
        let outcome = GeneQuery::build(
            SearchMethod::GoId,
            &parse_tokens(input),
            SpeciesFilter::Any,
        )
        .execute(&db)
        .unwrap();
        assert_eq!(outcome.gene_names(), vec!["Xele.1"], "input {input}");
        assert_eq!(outcome.matched, set(&["0001939"]));
        assert!(outcome.missing.is_empty());
    }
}

#[test]
fn common_name_is_a_substring_match() {
    let db = memory_db();
    let xele = gene(&db, "Xele.1", None);
    homologue(&db, &xele, "AT2G39700", "expansin A4");

    let outcome = GeneQuery::build(
        SearchMethod::ArabidopsisCommonName,
        &strings(&["expansin"]),
        SpeciesFilter::Any,
    )
    .execute(&db)
    .unwrap();

    assert_eq!(outcome.gene_names(), vec!["Xele.1"]);
    assert_eq!(outcome.matched, set(&["expansin"]));
    assert!(outcome.missing.is_empty());
}

#[test]
fn locus_match_is_exact_and_case_insensitive() {
    let db = memory_db();
    let xele = gene(&db, "Xele.1", None);
    homologue(&db, &xele, "AT2G39700", "expansin A4");

    let outcome = GeneQuery::build(
        SearchMethod::ArabidopsisLocus,
        &strings(&["at2g39700", "AT2G397"]),
        SpeciesFilter::Any,
    )
    .execute(&db)
    .unwrap();

    assert_eq!(outcome.gene_names(), vec!["Xele.1"]);
    assert_eq!(outcome.matched, set(&["at2g39700"]));
    assert_eq!(outcome.missing, set(&["at2g397"]));
}

#[test]
fn every_stored_gene_id_is_matched() {
    let db = memory_db();
    for name in ["Xele.ptg000001l.1", "Xele.ptg000002l.7", "Xsch.0042"] {
        gene(&db, name, None);
    }

    for name in ["Xele.ptg000001l.1", "XELE.PTG000002L.7", "xsch.0042"] {
        let outcome = GeneQuery::build(SearchMethod::GeneId, &strings(&[name]), SpeciesFilter::Any)
            .execute(&db)
            .unwrap();
        assert!(outcome.missing.is_empty(), "{name} reported missing");
        assert_eq!(outcome.genes.len(), 1);
    }
}

#[test]
fn matched_and_missing_partition_the_tokens() {
    let mut db = memory_db();
    let a = gene(&db, "Xele.1", None);
    let b = gene(&db, "Xele.2", None);
    annotate(&mut db, &a, "kinase", &[("F:GO:0004672", "protein kinase activity")], &[]);
    annotate(&mut db, &b, "nuclear", &[("C:GO:0005634", "nucleus")], &[]);

    let query = GeneQuery::build(
        SearchMethod::GoName,
        &strings(&["kinase", "NUCLEUS", "chloroplast"]),
        SpeciesFilter::Any,
    );
    let outcome = query.execute(&db).unwrap();

    assert_eq!(outcome.gene_names(), vec!["Xele.1", "Xele.2"]);
    assert_eq!(outcome.matched, set(&["NUCLEUS", "kinase"]));
    assert_eq!(outcome.missing, set(&["chloroplast"]));
    assert!(outcome.matched.is_disjoint(&outcome.missing));
    let all: BTreeSet<String> = outcome.matched.union(&outcome.missing).cloned().collect();
    assert_eq!(all, query.tokens().iter().cloned().collect());
}

#[test]
fn enzyme_code_is_case_sensitive_but_name_is_not() {
    let mut db = memory_db();
    let xele = gene(&db, "Xele.1", None);
    annotate(&mut db, &xele, "cellulase", &[], &[("EC:3.2.1.4", "Cellulase")]);

    let by_code = GeneQuery::build(
        SearchMethod::EnzymeCode,
        &strings(&["3.2.1", "ec:3.2.1.4"]),
        SpeciesFilter::Any,
    )
    .execute(&db)
    .unwrap();
    assert_eq!(by_code.matched, set(&["3.2.1"]));
    assert_eq!(by_code.missing, set(&["ec:3.2.1.4"]));

    let by_name = GeneQuery::build(
        SearchMethod::EnzymeName,
        &strings(&["cellulase"]),
        SpeciesFilter::Any,
    )
    .execute(&db)
    .unwrap();
    assert_eq!(by_name.gene_names(), vec!["Xele.1"]);
}

#[test]
fn species_filter_excludes_other_species() {
    let db = memory_db();
    gene(&db, "Xele.1", None);
    gene_in(&db, "X. schlechteri", "Xsch.1", None);

    let outcome = GeneQuery::build(
        SearchMethod::GeneId,
        &strings(&["Xele.1", "Xsch.1"]),
        SpeciesFilter::parse(Some("X. schlechteri")),
    )
    .execute(&db)
    .unwrap();

    assert_eq!(outcome.gene_names(), vec!["Xsch.1"]);
    assert_eq!(outcome.genes[0].species, "X. schlechteri");
    assert_eq!(outcome.missing, set(&["xele.1"]));
}

#[test]
fn empty_input_yields_empty_outcome() {
    let db = memory_db();
    gene(&db, "Xele.1", None);

    for method in SearchMethod::ALL {
        let outcome = GeneQuery::build(method, &parse_tokens(" , \n"), SpeciesFilter::Any)
            .execute(&db)
            .unwrap();
        assert!(outcome.is_empty());
        assert!(outcome.matched.is_empty());
        assert!(outcome.missing.is_empty());
    }
}

#[test]
fn results_are_ordered_and_eagerly_loaded() {
    let mut db = memory_db();
    let late = gene(&db, "Xele.9", None);
    let early = gene(&db, "Xele.1", None);
    annotate(&mut db, &late, "wax synthase", &[("P:GO:0010025", "wax biosynthetic process")], &[]);
    annotate(&mut db, &early, "wax ester", &[("P:GO:0010025", "wax biosynthetic process")], &[]);
    homologue(&db, &early, "AT5G55380", "WSD1");

    let outcome = GeneQuery::build(SearchMethod::GoName, &strings(&["wax"]), SpeciesFilter::Any)
        .execute(&db)
        .unwrap();

    assert_eq!(outcome.gene_names(), vec!["Xele.1", "Xele.9"]);
    let first = &outcome.genes[0];
    assert_eq!(first.annotations.len(), 1);
    assert_eq!(first.annotations[0].go_terms[0].go_id, "P:GO:0010025");
    assert_eq!(first.homologues[0].a_thaliana_locus, "AT5G55380");
}
