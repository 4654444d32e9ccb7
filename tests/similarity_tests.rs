use serpsim::analyzer::TextAnalyzer;
use serpsim::similarity::{SimilarityMatrix, TfIdfVectorizer};

fn matrix(docs: &[&str]) -> SimilarityMatrix {
    let labels = (1..=docs.len()).map(|i| format!("doc {i}")).collect();
    TfIdfVectorizer::default().similarity(labels, docs)
}

fn assert_well_formed(m: &SimilarityMatrix) {
    let n = m.len();
    assert_eq!(m.labels.len(), n);
    for i in 0..n {
        assert_eq!(m.values[i].len(), n);
        assert_eq!(m.values[i][i], 1.0);
        for j in 0..n {
            let v = m.values[i][j];
            assert!((0.0..=1.0).contains(&v), "entry ({i},{j}) = {v}");
            assert_eq!(v, m.values[j][i], "asymmetric at ({i},{j})");
        }
    }
}

#[test]
fn matrix_is_square_symmetric_and_bounded() {
    let docs = [
        "Espresso is a concentrated coffee brewed under pressure.",
        "Espresso is concentrated coffee made with pressure.",
        "Tea is brewed by steeping leaves in hot water.",
        "No content available.",
    ];
    let m = matrix(&docs);
    assert_eq!(m.len(), 4);
    assert_well_formed(&m);
}

#[test]
fn similar_texts_score_higher_than_unrelated_ones() {
    let m = matrix(&[
        "espresso coffee brewed under pressure",
        "espresso coffee brewed with pressure",
        "mountain bikes for steep trails",
    ]);
    assert!(m.get(0, 1).unwrap() > 0.5);
    assert_eq!(m.get(0, 2), Some(0.0));
    assert!(m.get(0, 1).unwrap() > m.get(1, 2).unwrap());
}

#[test]
fn identical_documents_score_one() {
    let m = matrix(&["same text here", "same text here"]);
    assert!((m.values[0][1] - 1.0).abs() < 1e-9);
}

#[test]
fn single_document_is_one_by_one() {
    let m = matrix(&["x"]);
    assert_eq!(m.values, vec![vec![1.0]]);
    assert_eq!(m.mean_off_diagonal(), None);
}

#[test]
fn documents_without_terms_do_not_break_the_matrix() {
    let m = matrix(&["!!!", "coffee", "?"]);
    assert_well_formed(&m);
    assert_eq!(m.get(0, 2), Some(0.0));
}

#[test]
fn mean_off_diagonal_averages_pairs() {
    let m = matrix(&["a coffee", "a coffee", "tea time"]);
    let mean = m.mean_off_diagonal().unwrap();
    let expected = (m.values[0][1] + m.values[0][2] + m.values[1][2]) / 3.0;
    assert!((mean - expected).abs() < 1e-9);
}

#[test]
fn english_analyzer_matches_inflections() {
    let docs = ["running dogs", "the dog runs"];
    let plain = matrix(&docs);
    let english = TfIdfVectorizer::new(TextAnalyzer::english())
        .similarity(vec!["a".into(), "b".into()], &docs);
    assert_eq!(plain.get(0, 1), Some(0.0));
    assert!(english.get(0, 1).unwrap() > 0.9);
}

#[test]
fn vectors_are_unit_length() {
    let vectors = TfIdfVectorizer::default().fit_transform(&["coffee coffee beans", "tea"]);
    for v in &vectors {
        let norm: f64 = v.values().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }
}

#[test]
fn zero_documents_give_an_empty_matrix() {
    let m = TfIdfVectorizer::default().similarity(Vec::new(), &[]);
    assert!(m.is_empty());
    assert_eq!(m.mean_off_diagonal(), None);
}
