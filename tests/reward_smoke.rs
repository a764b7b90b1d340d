/// Smoke test for the transformer reward model.
/// Needs real weights: REWARD_MODEL_DIR=/path/to/reward_model cargo test -- --ignored
use pocket_ml_api::config::DevicePreference;
use pocket_ml_api::inference::Predictor;
use pocket_ml_api::models::round2;
use pocket_ml_api::reward::{select_device, BertRegressor, RewardModelFiles};
use std::path::PathBuf;

#[test]
#[ignore]
fn reward_model_scores_activities() {
    let dir = PathBuf::from(
        std::env::var("REWARD_MODEL_DIR").expect("REWARD_MODEL_DIR must point at a model"),
    );
    let files = RewardModelFiles::in_dir(&dir);
    let device = select_device(DevicePreference::Cpu).unwrap();
    let model = BertRegressor::load(&files, device).unwrap();

    let helpful = model.predict("Helped my younger brother with his homework").unwrap();
    let again = model.predict("Helped my younger brother with his homework").unwrap();
    let other = model.predict("Watched TV all afternoon").unwrap();

    assert!(helpful.is_finite() && other.is_finite());
    assert_eq!(round2(helpful), round2(again));
    println!("helpful={:.2} other={:.2}", helpful, other);
}
