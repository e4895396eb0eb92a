use super::*;

#[test]
fn test_batcher_splits_evenly() {
    let batcher = Batcher::new(2);
    let items: Vec<String> = (0..5).map(|i| i.to_string()).collect();
    let batches: Vec<&[String]> = batcher.split(&items).collect();

    assert_eq!(batches.len(), 3);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(batches[2].len(), 1);
}

#[test]
fn test_batcher_zero_size_clamped() {
    let batcher = Batcher::new(0);
    let items = vec!["a".to_string()];
    assert_eq!(batcher.split(&items).count(), 1);
}

#[test]
fn test_request_omits_absent_model() {
    let request = EmbeddingRequest {
        texts: vec!["hi".to_string()],
        model: None,
        deployment: None,
    };
    let json = serde_json::to_string(&request).unwrap();
    assert!(!json.contains("model"));
    assert!(!json.contains("deployment"));

    let request = EmbeddingRequest {
        texts: vec!["hi".to_string()],
        model: Some("text-embedding-3-small".to_string()),
        deployment: None,
    };
    let json = serde_json::to_string(&request).unwrap();
    assert!(json.contains("text-embedding-3-small"));
}
