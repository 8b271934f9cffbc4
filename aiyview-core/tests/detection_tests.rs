//! Detection payload tests
//!
//! Payloads here follow what the vision device actually publishes: pixel
//! boxes divided by the 1640x922 capture size, plus the API envelope.

use aiyview_core::{AiyViewError, DetectionItem, DetectionResult, DetectionSink};

const CAPTURE_WIDTH: f64 = 1640.0;
const CAPTURE_HEIGHT: f64 = 922.0;

fn device_face_payload(bbox: (f64, f64, f64, f64), score: f64, joy: f64) -> String {
    format!(
        r#"{{"name": "webrtcHacks AIY Vision Server REST API", "version": "0.2.0", "numObjects": 1,
            "objects": [{{"name": "face", "score": {}, "joy": {}, "x": {}, "y": {}, "width": {}, "height": {}}}],
            "timeStamp": 1517100000.25, "inferenceTime": 0.07}}"#,
        score,
        joy,
        bbox.0 / CAPTURE_WIDTH,
        bbox.1 / CAPTURE_HEIGHT,
        bbox.2 / CAPTURE_WIDTH,
        bbox.3 / CAPTURE_HEIGHT,
    )
}

#[test]
fn test_device_face_payload() {
    let payload = device_face_payload((820.0, 461.0, 410.0, 230.5), 0.98, 0.5);
    let result = DetectionResult::from_json(&payload).unwrap();

    assert_eq!(result.name.as_deref(), Some("webrtcHacks AIY Vision Server REST API"));
    assert_eq!(result.num_objects, Some(1));
    assert_eq!(result.timestamp, Some(1517100000.25));

    let DetectionItem::Face(face) = &result.objects[0] else {
        panic!("expected a face item");
    };
    assert_eq!(face.bounding_box.x, 0.5);
    assert_eq!(face.bounding_box.y, 0.5);
    assert_eq!(face.bounding_box.width, 0.25);
    assert_eq!(face.bounding_box.height, 0.25);
    assert_eq!(face.joy, 0.5);
}

#[test]
fn test_class_model_payload_with_threshold() {
    let payload = r#"{"numObjects": 2, "threshold": 0.3, "objects": [
        {"name": "class", "class_name": "tabby cat", "score": 0.61},
        {"name": "class", "class_name": "tiger cat", "score": 0.32}
    ]}"#;

    let result = DetectionResult::from_json(payload).unwrap();
    assert_eq!(result.threshold, Some(0.3));
    let names: Vec<&str> = result
        .objects
        .iter()
        .map(|item| match item {
            DetectionItem::Class(class) => class.class_name.as_str(),
            _ => "",
        })
        .collect();
    assert_eq!(names, vec!["tabby cat", "tiger cat"]);
}

#[test]
fn test_empty_batch() {
    let result = DetectionResult::from_json(r#"{"objects": []}"#).unwrap();
    assert!(result.is_empty());
    assert_eq!(result.unrecognized().count(), 0);
}

#[test]
fn test_reencoded_result_parses_identically() {
    let payload = device_face_payload((100.0, 100.0, 300.0, 300.0), 0.8, 0.1);
    let result = DetectionResult::from_json(&payload).unwrap();
    let again = DetectionResult::from_json(&result.to_json().unwrap()).unwrap();
    assert_eq!(result, again);
}

#[test]
fn test_non_object_payload_rejected() {
    let err = DetectionResult::from_json("[1, 2, 3]").unwrap_err();
    assert!(matches!(err, AiyViewError::MalformedMetadata { .. }));
    assert!(err.is_recoverable());
}

#[test]
fn test_sink_receives_results_in_order() {
    let mut counts = Vec::new();
    let mut sink = |result: DetectionResult| counts.push(result.len());

    for payload in [
        r#"{"objects": []}"#,
        r#"{"objects": [{"name": "class", "class_name": "a", "score": 0.5}]}"#,
    ] {
        sink.on_detection(DetectionResult::from_json(payload).unwrap());
    }

    assert_eq!(counts, vec![0, 1]);
}
