//! Utility to inspect the configured model artifacts without starting the server.

use pocket_ml_api::artifacts::{load_json, CLASSIFIER, LABEL_ENCODER, REGRESSOR};
use pocket_ml_api::config::Config;
use pocket_ml_api::inference::{ForestEstimator, LabelEncoder, LinearEstimator, PipelineArtifact};
use pocket_ml_api::preprocessing::ColumnTransformer;
use pocket_ml_api::reward::RewardModelFiles;

fn print_preprocessor(preprocessor: &ColumnTransformer) {
    println!("  numeric columns:");
    for col in &preprocessor.numeric {
        println!("    - {} (mean {:.4}, scale {:.4})", col.column, col.mean, col.scale);
    }
    println!("  categorical columns:");
    for col in &preprocessor.categorical {
        println!("    - {}: {:?}", col.column, col.categories);
    }
    println!("  estimator input width: {}", preprocessor.output_width());
}

/// Loads each artifact the configured variant needs and prints what it holds.
fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    println!("Variant: {}", config.variant);

    let (encoder, info) = load_json::<LabelEncoder>(LABEL_ENCODER, &config.label_encoder_path)?;
    println!("\n{} ({}, sha256 {})", LABEL_ENCODER, info.path, info.sha256);
    for (id, label) in encoder.classes().iter().enumerate() {
        println!("  {} -> {}", id, label);
    }

    let (classifier, info) =
        load_json::<PipelineArtifact<ForestEstimator>>(CLASSIFIER, &config.classifier_path)?;
    println!("\n{} ({}, sha256 {})", CLASSIFIER, info.path, info.sha256);
    print_preprocessor(&classifier.preprocessor);

    if config.variant.needs_regressor() {
        let (regressor, info) =
            load_json::<PipelineArtifact<LinearEstimator>>(REGRESSOR, &config.regressor_path)?;
        println!("\n{} ({}, sha256 {})", REGRESSOR, info.path, info.sha256);
        print_preprocessor(&regressor.preprocessor);
    }

    if config.variant.needs_reward_model() {
        println!("\nreward_model ({})", config.reward_model_dir.display());
        for path in RewardModelFiles::in_dir(&config.reward_model_dir).iter() {
            let status = if path.is_file() { "ok" } else { "MISSING" };
            println!("  - {} [{}]", path.display(), status);
        }
    }

    Ok(())
}
