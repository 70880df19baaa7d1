//! Properties of ranking and prediction that hold for any embedding backend

use triage::{
    cosine_similarity, rank, CatalogVectorIndex, LifecycleConfig, SemanticConfig,
    SpecialtyCatalog, SpecialtyPredictor, StubEmbedder, FALLBACK_SPECIALTY,
};

const PROBLEMS: [&str; 8] = [
    "I have had a crushing chest pain since this morning",
    "my child keeps waking up crying with an earache",
    "itchy red patches on my elbows",
    "feeling hopeless and anxious for weeks",
    "blurry vision and floaters in my left eye",
    "sharp knee pain after a fall",
    "",
    "🤒🤧",
];

fn stub_predictor() -> SpecialtyPredictor {
    SpecialtyPredictor::from_semantic_config(
        SemanticConfig::fast(),
        SpecialtyCatalog::default(),
        LifecycleConfig::default(),
    )
}

#[tokio::test]
async fn predictions_are_always_catalog_names() {
    let predictor = stub_predictor();
    for problem in PROBLEMS {
        let name = predictor.predict(problem).await.unwrap();
        assert!(
            predictor.lifecycle().catalog().contains(&name),
            "'{name}' is not in the catalog"
        );
    }
}

#[tokio::test]
async fn predictions_are_deterministic() {
    let a = stub_predictor();
    let b = stub_predictor();
    for problem in PROBLEMS {
        let first = a.predict_detailed(problem).await.unwrap();
        let second = b.predict_detailed(problem).await.unwrap();
        assert_eq!(first, second);
    }
}

#[tokio::test]
async fn catalog_description_matches_itself() {
    let predictor = stub_predictor();
    for specialty in SpecialtyCatalog::default().iter() {
        let prediction = predictor
            .predict_detailed(&specialty.description)
            .await
            .unwrap();
        assert_eq!(prediction.specialty, specialty.name);
        assert!((prediction.score.unwrap() - 1.0).abs() < 1e-5);
    }
}

#[tokio::test]
async fn scores_stay_within_cosine_range() {
    let predictor = stub_predictor();
    for problem in PROBLEMS {
        let score = predictor.predict_detailed(problem).await.unwrap().score.unwrap();
        assert!((-1.0 - 1e-5..=1.0 + 1e-5).contains(&score));
    }
}

#[tokio::test]
async fn ranked_winner_scores_at_least_every_candidate() {
    let stub = StubEmbedder::new("stub", 64);
    let catalog = SpecialtyCatalog::default();
    let index = CatalogVectorIndex::from_entries(
        catalog
            .iter()
            .map(|s| (s.name.clone(), stub.make_vector(&s.description, true))),
    )
    .unwrap();

    for problem in PROBLEMS {
        let query = stub.make_vector(problem, true);
        let outcome = rank(&query, &index);
        let best = outcome.score.unwrap();
        for (_, vector) in index.iter() {
            assert!(cosine_similarity(&query, vector) <= best);
        }
    }
}

#[test]
fn empty_index_never_panics() {
    let outcome = rank(&[0.0; 4], &CatalogVectorIndex::new());
    assert_eq!(outcome.specialty, FALLBACK_SPECIALTY);
    assert!(outcome.is_fallback());
}

#[tokio::test]
async fn global_predictor_can_be_installed_once() {
    let predictor = stub_predictor();
    assert!(triage::install_predictor(predictor.clone()).is_ok());
    assert!(triage::install_predictor(predictor).is_err());

    triage::warmup().await.unwrap();
    let name = triage::predict_specialty("persistent dry cough").await.unwrap();
    assert!(SpecialtyCatalog::default().contains(&name));
}
