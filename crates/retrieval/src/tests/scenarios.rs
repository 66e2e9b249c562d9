use super::{config, orchestrator_with, sufficient_search};
use crate::fanout::CallOutcome;
use crate::gate::GateCheck;
use crate::orchestrator::{AnswerPath, AnswerRequest};
use crate::testing::{RecordingAssembler, StaticSearchClient};
use crate::types::SearchHit;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_well_covered_question_takes_direct_path() {
    let search = Arc::new(sufficient_search());
    let assembler = Arc::new(RecordingAssembler::replying("Follow 21 CFR 117 [1]."));
    let orchestrator = orchestrator_with(&config(), search.clone(), assembler.clone());

    let response = orchestrator
        .answer(AnswerRequest::new("What applies to imported sauces?"))
        .await
        .unwrap();

    assert_eq!(search.calls().len(), 7);
    assert_eq!(response.path, AnswerPath::Direct);

    let verdict = response.verdict.unwrap();
    assert!(verdict.sufficient);
    assert_eq!(verdict.result_count, 5);
    assert_eq!(verdict.distinct_partitions, 4);
    assert!((verdict.average_score - 0.72).abs() < 1e-4);

    let indices: Vec<usize> = response.citations.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    assert_eq!(response.citations[0].title, "guidance doc 1");

    let partitions: Vec<&str> = response.partitions.iter().map(|p| p.as_str()).collect();
    assert_eq!(partitions, vec!["guidance", "ecfr", "fsvp", "gras"]);

    let sent = assembler.requests();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].transcript.is_none());
    assert!(!sent[0].reduced_depth);
}

#[tokio::test]
async fn test_single_partition_is_never_sufficient() {
    let search = Arc::new(StaticSearchClient::new().with_hits("dwpe", &[0.99, 0.97, 0.95]));
    let assembler = Arc::new(RecordingAssembler::replying("answer"));
    let orchestrator = orchestrator_with(&config(), search, assembler);

    let report = orchestrator
        .retrieve(&AnswerRequest::new("Is my shipment on an import alert?"))
        .await
        .unwrap();

    assert!(!report.verdict.sufficient);
    assert_eq!(report.verdict.distinct_partitions, 1);
    assert!(report.merged.iter().all(|m| m.partition().as_str() == "dwpe"));
}

#[tokio::test]
async fn test_single_partition_fails_diversity_when_count_is_met() {
    let mut config = config();
    config.per_partition_quota = 10;
    let search = Arc::new(
        StaticSearchClient::new().with_hits("dwpe", &[0.99, 0.97, 0.95, 0.93, 0.91]),
    );
    let orchestrator = orchestrator_with(
        &config,
        search,
        Arc::new(RecordingAssembler::replying("answer")),
    );

    let report = orchestrator
        .retrieve(&AnswerRequest::new("import alert"))
        .await
        .unwrap();

    assert_eq!(report.verdict.result_count, 5);
    assert_eq!(report.verdict.failed_check, Some(GateCheck::PartitionDiversity));
}

#[tokio::test]
async fn test_slow_partition_times_out_without_failing_request() {
    let mut config = config();
    config.per_call_timeout_ms = 50;
    let search = Arc::new(
        StaticSearchClient::new()
            .with_hits("dwpe", &[0.71])
            .with_hits("ecfr", &[0.82])
            .with_hits("fsvp", &[0.77])
            .with_hits("gras", &[0.66])
            .with_hits("guidance", &[0.79])
            .with_hits("rpm", &[0.64])
            .with_delay("usc", Duration::from_secs(5), &[0.95]),
    );
    let orchestrator = orchestrator_with(
        &config,
        search,
        Arc::new(RecordingAssembler::replying("answer")),
    );

    let report = orchestrator
        .retrieve(&AnswerRequest::new("labeling"))
        .await
        .unwrap();

    let results = &report.fan_out.results;
    assert_eq!(results.len(), 7);
    assert_eq!(results.iter().filter(|r| !r.hits.is_empty()).count(), 6);

    let usc = report.fan_out.get("usc").unwrap();
    assert_eq!(usc.outcome, CallOutcome::TimedOut);
    assert!(usc.hits.is_empty());

    assert_eq!(report.merged.len(), 6);
    assert!(report.merged.iter().all(|m| m.partition().as_str() != "usc"));
}

#[tokio::test]
async fn test_missing_titles_and_urls_are_synthesized() {
    let search = Arc::new(
        StaticSearchClient::new()
            .with_raw_hits(
                "gras",
                vec![
                    SearchHit::new("gras", 0.90, "GRN 000123 sesame"),
                    SearchHit::new("gras", 0.85, "GRN 000456 rice").with_title("  ").with_url(""),
                ],
            )
            .with_raw_hits("custom", vec![SearchHit::new("custom", 0.80, "in-house notes")]),
    );
    let orchestrator = orchestrator_with(
        &config(),
        search,
        Arc::new(RecordingAssembler::replying("answer")),
    );

    let report = orchestrator
        .retrieve(&AnswerRequest::new("sesame").with_partitions(["gras", "custom"]))
        .await
        .unwrap();

    let gras_url = "https://www.fda.gov/food/generally-recognized-safe-gras/gras-notice-inventory";
    let titles: Vec<&str> = report.citations.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["GRAS Document 1", "GRAS Document 2", "CUSTOM Document 3"]);
    assert_eq!(report.citations[0].url.as_deref(), Some(gras_url));
    assert_eq!(report.citations[1].url.as_deref(), Some(gras_url));
    assert_eq!(report.citations[2].url, None);
}

#[tokio::test]
async fn test_duplicate_sources_cite_once_but_keep_both_texts() {
    let same = |partition: &str, score: f32, text: &str| {
        SearchHit::new(partition, score, text)
            .with_title("Food Allergen Labeling")
            .with_url("https://www.fda.gov/food/allergens")
    };
    let search = Arc::new(
        StaticSearchClient::new()
            .with_raw_hits("guidance", vec![same("guidance", 0.88, "guidance wording")])
            .with_raw_hits("usc", vec![same("usc", 0.81, "statute wording")]),
    );
    let assembler = Arc::new(RecordingAssembler::replying("answer"));
    let orchestrator = orchestrator_with(&config(), search, assembler.clone());

    let response = orchestrator
        .answer(AnswerRequest::new("allergen labeling"))
        .await
        .unwrap();

    assert_eq!(response.citations.len(), 1);
    assert_eq!(response.citations[0].partition.as_str(), "guidance");

    let requests = assembler.requests();
    let evidence = &requests[0].evidence;
    assert!(evidence.contains("guidance wording"));
    assert!(evidence.contains("statute wording"));
    assert_eq!(evidence.matches("[Source 1]").count(), 2);
}

#[tokio::test]
async fn test_untitled_evidence_matches_citation_names() {
    let search = Arc::new(StaticSearchClient::new().with_raw_hits(
        "gras",
        vec![
            SearchHit::new("gras", 0.90, "GRN 000123 sesame"),
            SearchHit::new("gras", 0.85, "GRN 000456 rice").with_title("  "),
        ],
    ));
    let assembler = Arc::new(RecordingAssembler::replying("answer"));
    let orchestrator = orchestrator_with(&config(), search, assembler.clone());

    let response = orchestrator
        .answer(AnswerRequest::new("sesame").with_partitions(["gras"]))
        .await
        .unwrap();

    assert_eq!(response.citations[1].title, "GRAS Document 2");
    let requests = assembler.requests();
    let evidence = &requests[0].evidence;
    assert!(evidence.contains("[Source 1] GRAS Document 1"));
    assert!(evidence.contains("[Source 2] GRAS Document 2"));
    assert!(!evidence.contains("Untitled"));
}
