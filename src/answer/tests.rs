use super::*;

fn result(id: usize, text: &str, distance: f32) -> RetrievalResult {
    RetrievalResult {
        id,
        text: text.to_string(),
        distance,
        source_tag: "First Aid Database".to_string(),
        snippet: format!("{}...", text),
    }
}

#[test]
fn empty_results_abstain() {
    let answer = AnswerPolicy::default().decide(&[]);

    assert_eq!(answer.answer, ABSTENTION_MESSAGE);
    assert!(answer.sources.is_empty());
    assert!(answer.abstained);
}

#[test]
fn distant_top_result_abstains() {
    let results = [result(0, "Cool the burn.", 0.9), result(1, "Other.", 1.2)];
    let answer = AnswerPolicy::default().decide(&results);

    assert_eq!(answer.answer, ABSTENTION_MESSAGE);
    assert!(answer.sources.is_empty());
}

#[test]
fn close_top_result_answers_with_all_sources() {
    let results = [
        result(4, "Cool the burn under running water.", 0.2),
        result(1, "Cover with cling film.", 0.5),
        result(7, "Do not pop blisters.", 1.4),
    ];
    let answer = AnswerPolicy::default().decide(&results);

    assert_eq!(
        answer.answer,
        "Based on the first aid guidelines:\n\nCool the burn under running water."
    );
    assert!(!answer.abstained);
    let ids: Vec<usize> = answer.sources.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![4, 1, 7]);
    assert_eq!(answer.sources[2].distance, 1.4);
    assert_eq!(answer.sources[0].snippet, "Cool the burn under running water....");
    assert!(answer.sources.iter().all(|s| s.source == "First Aid Database"));
}

#[test]
fn threshold_is_inclusive() {
    let policy = AnswerPolicy::default();
    assert!(!policy.decide(&[result(0, "At cutoff.", 0.7)]).abstained);
    assert!(
        policy
            .decide(&[result(0, "Just past.", 0.700_001)])
            .abstained
    );
}

#[test]
fn abstention_is_monotonic_in_distance() {
    let policy = AnswerPolicy::default();
    let distances = [0.0, 0.1, 0.35, 0.69, 0.7, 0.71, 1.0, 4.0, 100.0];

    let abstained: Vec<bool> = distances
        .iter()
        .map(|d| policy.decide(&[result(0, "unit", *d)]).abstained)
        .collect();

    assert!(abstained.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(abstained.iter().filter(|a| **a).count(), 4);
}

#[test]
fn nan_distance_abstains() {
    assert!(
        AnswerPolicy::default()
            .decide(&[result(0, "unit", f32::NAN)])
            .abstained
    );
}

#[test]
fn threshold_comes_from_config() {
    let retrieval = RetrievalConfig {
        distance_threshold: 2.0,
        ..RetrievalConfig::default()
    };
    let policy = AnswerPolicy::from_config(&retrieval);

    assert_eq!(policy.distance_threshold, 2.0);
    assert!(!policy.decide(&[result(0, "unit", 1.5)]).abstained);
}

#[test]
fn serialized_answer_has_answer_and_sources_only() {
    let answer = AnswerPolicy::default().decide(&[result(3, "Rest.", 0.1)]);
    let json = serde_json::to_value(&answer).expect("answer serializes");

    assert_eq!(json["answer"], "Based on the first aid guidelines:\n\nRest.");
    assert_eq!(json["sources"][0]["id"], 3);
    assert_eq!(json["sources"][0]["source"], "First Aid Database");
    assert_eq!(json["sources"][0]["snippet"], "Rest....");
    assert!(json.get("abstained").is_none());
}
