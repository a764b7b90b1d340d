/// Orchestration tests against recording test doubles.
/// Checks call ordering, tag injection, rounding and error mapping.
mod common;

use axum::http::StatusCode;
use common::{call_log, calls, sample_payload, Call, Doubles, CLASSES};
use pocket_ml_api::config::ApiVariant;
use pocket_ml_api::errors::{AppError, MISSING_ACTIVITY_MESSAGE, MISSING_FIELDS_MESSAGE};
use pocket_ml_api::features::{FeatureValue, REQUIRED_FIELDS};
use serde_json::{json, Value};

#[test]
fn classify_then_score_calls_classifier_then_regressor_once() {
    let log = call_log();
    let orchestrator = Doubles {
        class_id: 3,
        ..Default::default()
    }
    .build(&log);

    let response = orchestrator.classify_then_score(&sample_payload()).unwrap();

    assert_eq!(response.predicted_tag, "Overspender");
    assert_eq!(
        calls(&log),
        vec![
            Call::Classifier,
            Call::Regressor(Some(FeatureValue::Number(3.0))),
        ]
    );
}

#[test]
fn regressor_receives_encoded_id_not_label() {
    let log = call_log();
    let orchestrator = Doubles {
        class_id: 4,
        ..Default::default()
    }
    .build(&log);

    orchestrator.classify_then_score(&sample_payload()).unwrap();

    let regressor_call = calls(&log)
        .into_iter()
        .find(|c| matches!(c, Call::Regressor(_)))
        .unwrap();
    assert_eq!(regressor_call, Call::Regressor(Some(FeatureValue::Number(4.0))));
    assert_ne!(
        regressor_call,
        Call::Regressor(Some(FeatureValue::Text("Top Saver".to_string())))
    );
}

#[test]
fn credit_score_is_rounded_to_two_decimals() {
    let log = call_log();
    let orchestrator = Doubles {
        score: 64.98765,
        ..Default::default()
    }
    .build(&log);

    let response = orchestrator.classify_then_score(&sample_payload()).unwrap();
    assert_eq!(response.predicted_credit_score, Some(64.99));
}

#[test]
fn missing_field_short_circuits_before_any_model() {
    for field in REQUIRED_FIELDS {
        let log = call_log();
        let orchestrator = Doubles::default().build(&log);
        let mut payload = sample_payload();
        payload.as_object_mut().unwrap().remove(field);

        let err = orchestrator.predict(&payload).unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST, "field {}", field);
        assert_eq!(err.message(), MISSING_FIELDS_MESSAGE);
        assert!(calls(&log).is_empty(), "model invoked without {}", field);
    }
}

#[test]
fn tag_variant_never_touches_a_regressor() {
    let log = call_log();
    let orchestrator = Doubles {
        variant: ApiVariant::Tag,
        class_id: 0,
        ..Default::default()
    }
    .build(&log);

    let response = orchestrator.predict(&sample_payload()).unwrap();

    assert_eq!(response.predicted_tag, "Average Saver");
    assert_eq!(response.predicted_credit_score, None);
    assert_eq!(calls(&log), vec![Call::Classifier]);
}

#[test]
fn decoded_tag_is_the_encoder_inverse_and_deterministic() {
    for (class_id, label) in CLASSES.iter().enumerate() {
        let log = call_log();
        let orchestrator = Doubles {
            class_id: class_id as u32,
            ..Default::default()
        }
        .build(&log);

        let first = orchestrator.classify_only(&sample_payload()).unwrap();
        let second = orchestrator.classify_only(&sample_payload()).unwrap();
        assert_eq!(first.predicted_tag, *label);
        assert_eq!(first, second);
    }
}

#[test]
fn unseen_class_id_is_an_inference_error_without_regression() {
    let log = call_log();
    let orchestrator = Doubles {
        class_id: 42,
        ..Default::default()
    }
    .build(&log);

    let err = orchestrator.classify_then_score(&sample_payload()).unwrap_err();

    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(err.message().contains("previously unseen labels"));
    assert_eq!(calls(&log), vec![Call::Classifier]);
}

#[test]
fn regressor_failure_exposes_no_partial_tag() {
    let log = call_log();
    let orchestrator = Doubles {
        regressor_error: Some("shapes (1,17) and (18,) not aligned".to_string()),
        ..Default::default()
    }
    .build(&log);

    let err = orchestrator.predict(&sample_payload()).unwrap_err();

    assert!(matches!(err, AppError::WithContext { .. }));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.message(), "shapes (1,17) and (18,) not aligned");
}

#[test]
fn non_finite_credit_score_is_rejected() {
    let log = call_log();
    let orchestrator = Doubles {
        score: f64::NAN,
        ..Default::default()
    }
    .build(&log);

    let err = orchestrator.predict(&sample_payload()).unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(err.message().contains("non-finite"));
}

#[test]
fn reward_requires_non_empty_activity() {
    let bodies: [Value; 3] = [json!({}), json!({ "activity": "" }), json!({ "activity": null })];
    for body in bodies {
        let log = call_log();
        let orchestrator = Doubles::default().build(&log);

        let err = orchestrator.reward_score(&body).unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST, "body {}", body);
        assert_eq!(err.message(), MISSING_ACTIVITY_MESSAGE);
        assert!(calls(&log).is_empty());
    }
}

#[test]
fn reward_scores_and_echoes_activity() {
    let log = call_log();
    let orchestrator = Doubles {
        reward: 12.3456,
        ..Default::default()
    }
    .build(&log);

    let response = orchestrator
        .reward_score(&json!({ "activity": "Read two chapters of a book" }))
        .unwrap();

    assert_eq!(response.activity, "Read two chapters of a book");
    assert_eq!(response.predicted_reward, 12.35);
    assert_eq!(
        calls(&log),
        vec![Call::Reward("Read two chapters of a book".to_string())]
    );
}

#[test]
fn reward_with_non_string_activity_is_a_server_error() {
    let log = call_log();
    let orchestrator = Doubles::default().build(&log);

    let err = orchestrator.reward_score(&json!({ "activity": 5 })).unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(calls(&log).is_empty());
}

#[test]
fn reward_and_tag_pipelines_share_no_state() {
    let log = call_log();
    let orchestrator = Doubles::default().build(&log);

    orchestrator
        .reward_score(&json!({ "activity": "Washed the dishes" }))
        .unwrap();
    orchestrator.predict(&sample_payload()).unwrap();

    let log = calls(&log);
    assert_eq!(log.len(), 3);
    assert_eq!(log[0], Call::Reward("Washed the dishes".to_string()));
    assert_eq!(log[1], Call::Classifier);
}
