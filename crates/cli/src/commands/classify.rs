//! `folio classify` — Show intent, assets and timeframe for a prompt.

use folio_config::AppConfig;
use folio_core::StaticReferenceData;
use folio_report::IntentClassifier;

pub fn run(
    config: &AppConfig,
    prompt: &str,
    existing: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let reference = StaticReferenceData::builtin();
    let classifier = IntentClassifier::new(&reference, config.report.default_symbol.as_str());
    let classification = classifier.analyze(prompt, existing);

    println!("Intent:     {}", classification.intent);
    if classification.assets.is_empty() {
        println!("Assets:     (from existing report)");
    } else {
        println!("Assets:     {}", classification.assets.join(", "));
    }
    println!("Timeframe:  {}", classification.timeframe);
    Ok(())
}
