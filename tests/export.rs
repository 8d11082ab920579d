mod common;

use camino::Utf8PathBuf;
use common::{annotate, gene, homologue, memory_db};
use xero_explorer::app::App;
use xero_explorer::domain::{SearchMethod, SpeciesFilter};
use xero_explorer::export::{flatten, render_fasta};

#[test]
fn table_has_one_row_per_annotation() {
    let mut db = memory_db();
    let xele = gene(&db, "Xele.1", Some("ATGC"));
    annotate(
        &mut db,
        &xele,
        "expansin",
        &[("C:GO:0005576", "extracellular region"), ("P:GO:0009826", "unidimensional cell growth")],
        &[("EC:3.2.1.4", "Cellulase")],
    );
    annotate(&mut db, &xele, "expansin-like", &[], &[]);
    homologue(&db, &xele, "AT2G39700", "expansin A4");
    homologue(&db, &xele, "AT1G69530", "expansin A1");

    let records = db.load_gene_records(&[xele.id]).unwrap();
    let rows = flatten(&records);

    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0].go_terms.as_deref(),
        Some("C:GO:0005576(extracellular region); P:GO:0009826(unidimensional cell growth)")
    );
    assert_eq!(rows[0].enzyme_codes.as_deref(), Some("EC:3.2.1.4(Cellulase)"));
    assert_eq!(
        rows[0].arabidopsis_locus.as_deref(),
        Some("AT1G69530; AT2G39700")
    );
    assert_eq!(rows[1].annotation_description.as_deref(), Some("expansin-like"));
    assert!(rows[1].go_terms.is_none());
}

#[test]
fn fasta_follows_search_order() {
    let mut db = memory_db();
    let b = gene(&db, "Xele.2", None);
    let a = gene(&db, "Xele.1", Some("ATGC"));
    annotate(&mut db, &a, "expansin", &[], &[]);

    let records = db.load_gene_records(&[b.id, a.id]).unwrap();
    assert_eq!(render_fasta(&records), ">Xele.1 expansin\nATGC\n>Xele.2\n");
}

#[test]
fn app_writes_both_exports() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let app = App::new(root.join("xero.sqlite"));
    {
        let mut db = app.session().unwrap();
        let xele = gene(&db, "Xele.1", Some("ATGC"));
        annotate(&mut db, &xele, "expansin", &[("C:GO:0005576", "extracellular region")], &[]);
    }

    let result = app
        .search(SearchMethod::GeneId, "Xele.1", SpeciesFilter::Any)
        .unwrap();
    let csv_path = root.join("out").join("results.csv");
    let fasta_path = root.join("out").join("genes.fasta");
    let export = app
        .export_search(&result, Some(&csv_path), Some(&fasta_path))
        .unwrap();

    assert_eq!(export.rows, 1);
    assert_eq!(export.sequences, 1);
    let csv = std::fs::read_to_string(csv_path.as_std_path()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some(
            "Gene ID,Gene Name,Species,Annotation Description,Annotation e-value,Arab. Locus,Arab. Common Name,GO Terms,Enzyme Codes,InterPro IDs"
        )
    );
    assert!(lines.next().unwrap().contains("Xele.1,X. elegans,expansin"));
    let fasta = std::fs::read_to_string(fasta_path.as_std_path()).unwrap();
    assert_eq!(fasta, ">Xele.1 expansin\nATGC");
}
