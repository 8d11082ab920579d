mod common;

use common::{annotate, count, deg, experiment, expression, gene, homologue, interaction, memory_db, strings};
use xero_explorer::db::Database;
use xero_explorer::deletion::{DeleteOptions, delete_genes};
use xero_explorer::domain::UP_REGULATED;

const EXPERIMENT: &str = "Dehydration time course";

/// One gene with 2 annotations, 3 expression rows, 1 DE row, 1 interaction
/// and 1 homologue, plus a neighbour that shares a GO term with it.
fn populated() -> Database {
    let mut db = memory_db();
    let doomed = gene(&db, "Xele.1", Some("ATGC"));
    let neighbour = gene(&db, "Xele.2", Some("GGCC"));
    let exp = experiment(&db, EXPERIMENT);

    annotate(
        &mut db,
        &doomed,
        "expansin",
        &[("C:GO:0005576", "extracellular region"), ("P:GO:0009826", "unidimensional cell growth")],
        &[("EC:3.2.1.4", "Cellulase")],
    );
    annotate(&mut db, &doomed, "expansin-like", &[("C:GO:0005576", "extracellular region")], &[]);
    annotate(&mut db, &neighbour, "secreted", &[("C:GO:0005576", "extracellular region")], &[]);

    for (time, replicate) in [(0, "1"), (24, "1"), (24, "2")] {
        expression(&mut db, EXPERIMENT, "Xele.1", "dehydration", time, replicate, 2.0);
    }
    expression(&mut db, EXPERIMENT, "Xele.2", "dehydration", 0, "1", 2.0);
    deg(&db, &doomed, &exp, Some(UP_REGULATED), None);
    interaction(&db, &doomed, &neighbour, "Activation");
    homologue(&db, &doomed, "AT2G39700", "expansin A4");
    db
}

#[test]
fn dry_run_reports_counts_and_changes_nothing() {
    let mut db = populated();

    let report = delete_genes(
        &mut db,
        &strings(&["Xele.1"]),
        DeleteOptions {
            dry_run: true,
            cleanup_orphans: false,
        },
    );

    assert!(report.success);
    assert!(report.dry_run);
    assert_eq!(report.genes_deleted, 1);
    assert_eq!(report.annotations_deleted, 2);
    assert_eq!(report.gene_expressions_deleted, 3);
    assert_eq!(report.differential_expressions_deleted, 1);
    assert_eq!(report.regulatory_interactions_deleted, 1);
    assert_eq!(report.arabidopsis_homologue_associations_removed, 1);

    assert_eq!(count(&db, "genes"), 2);
    assert_eq!(count(&db, "annotations"), 3);
    assert_eq!(count(&db, "gene_expressions"), 4);
    assert_eq!(count(&db, "regulatory_interactions"), 1);
}

#[test]
fn dry_run_matches_real_run() {
    let mut db = populated();
    let names = strings(&["Xele.1", "Xele.missing"]);
    let options = DeleteOptions {
        dry_run: false,
        cleanup_orphans: true,
    };

    let dry = delete_genes(
        &mut db,
        &names,
        DeleteOptions {
            dry_run: true,
            ..options
        },
    );
    let real = delete_genes(&mut db, &names, options);

    assert!(dry.success && real.success);
    assert!(dry.counts_eq(&real));
    assert!(!real.dry_run);
    assert_eq!(real.genes_not_found, vec!["Xele.missing"]);
    assert!(db.gene_by_name("Xele.1").unwrap().is_none());
    assert!(db.gene_by_name("Xele.2").unwrap().is_some());
}

#[test]
fn orphan_cleanup_keeps_shared_terms() {
    let mut db = populated();

    let report = delete_genes(
        &mut db,
        &strings(&["Xele.1"]),
        DeleteOptions {
            dry_run: false,
            cleanup_orphans: true,
        },
    );

    assert!(report.success);
    // GO:0009826 was only on the deleted gene; GO:0005576 is still used.
    assert_eq!(report.orphans.go_terms, 1);
    assert_eq!(report.orphans.enzyme_codes, 1);
    assert_eq!(report.orphans.arabidopsis_homologues, 1);
    assert_eq!(count(&db, "go_terms"), 1);
    assert_eq!(count(&db, "enzyme_codes"), 0);
    assert_eq!(count(&db, "arabidopsis_homologues"), 0);
}

#[test]
fn without_cleanup_vocabulary_rows_stay() {
    let mut db = populated();

    let report = delete_genes(&mut db, &strings(&["Xele.1"]), DeleteOptions::default());

    assert!(report.success);
    assert_eq!(report.orphans.total(), 0);
    assert_eq!(count(&db, "go_terms"), 2);
    assert_eq!(count(&db, "annotation_go"), 1);
    assert_eq!(count(&db, "gene_homologues"), 0);
    assert_eq!(count(&db, "arabidopsis_homologues"), 1);
}

#[test]
fn only_unknown_names_is_a_successful_no_op() {
    let mut db = populated();

    let report = delete_genes(&mut db, &strings(&["nope", "nada"]), DeleteOptions::default());

    assert!(report.success);
    assert_eq!(report.genes_deleted, 0);
    assert_eq!(report.genes_not_found, vec!["nope", "nada"]);
    assert_eq!(count(&db, "genes"), 2);
}

#[test]
fn failure_partway_rolls_back_the_whole_batch() {
    let mut db = populated();
    db.connection()
        .execute_batch(
            "CREATE TEMP TRIGGER keep_neighbour BEFORE DELETE ON genes
             WHEN old.gene_name = 'Xele.2'
             BEGIN SELECT RAISE(ABORT, 'Xele.2 is pinned'); END;",
        )
        .unwrap();

    let report = delete_genes(
        &mut db,
        &strings(&["Xele.1", "Xele.2", "Xele.missing"]),
        DeleteOptions {
            dry_run: false,
            cleanup_orphans: true,
        },
    );

    assert!(!report.success);
    assert!(report.error_message.as_deref().unwrap().contains("Xele.2 is pinned"));
    assert_eq!(report.genes_deleted, 0);
    assert_eq!(report.annotations_deleted, 0);
    assert_eq!(report.genes_not_found, vec!["Xele.missing"]);

    assert_eq!(count(&db, "genes"), 2);
    assert_eq!(count(&db, "annotations"), 3);
    assert_eq!(count(&db, "gene_expressions"), 4);
    assert_eq!(count(&db, "differential_expression"), 1);
    assert_eq!(count(&db, "regulatory_interactions"), 1);
    assert_eq!(count(&db, "gene_homologues"), 1);
    assert_eq!(count(&db, "go_terms"), 2);
}
