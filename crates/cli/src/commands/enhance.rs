//! `folio enhance` — Run prompts in sequence against a fresh engine.

use folio_config::AppConfig;
use folio_report::{EnhanceRequest, EnhanceResponse, ReportEngine};

pub fn run(
    config: &AppConfig,
    conversation: &str,
    prompts: &[String],
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ReportEngine::from_config(config);

    let mut last: Option<EnhanceResponse> = None;
    for prompt in prompts {
        let response = engine.enhance(EnhanceRequest::new(conversation, prompt.as_str()))?;
        eprintln!(
            "v{} {:<40} {} operation(s), ~{} tokens",
            response.context.metadata.version,
            prompt,
            response.operations.len(),
            response.estimated_tokens
        );
        last = Some(response);
    }

    let response = last.ok_or("no prompts given")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", response.document);
    }
    Ok(())
}
