use loopgraph_core::error::{LoopgraphError, Result};
use loopgraph_core::traits::Step;
use loopgraph_core::value::{Fields, Value};

const CHUNK_SIZE: usize = 500;
const SUMMARY_PREFIX_CHARS: usize = 100;

/// Read a text field. Missing or null reads as empty.
fn text_field<'a>(fields: &'a Fields, key: &str) -> Result<&'a str> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(""),
        Some(Value::Text(s)) => Ok(s),
        Some(other) => Err(LoopgraphError::StepInput(format!(
            "field '{}' must be text, got {}",
            key,
            other.kind()
        ))),
    }
}

/// Read a list-of-text field. Missing or null reads as empty.
fn text_list_field<'a>(fields: &'a Fields, key: &str) -> Result<Vec<&'a str>> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(vec![]),
        Some(value) => value.as_text_list().ok_or_else(|| {
            LoopgraphError::StepInput(format!("field '{}' must be a list of text", key))
        }),
    }
}

fn single(key: &str, value: impl Into<Value>) -> Fields {
    let mut update = Fields::new();
    update.insert(key.to_string(), value.into());
    update
}

// ── SplitText ───────────────────────────────────────────────────

pub struct SplitText;

impl Step for SplitText {
    fn name(&self) -> &str {
        "split_text"
    }
    fn description(&self) -> &str {
        "Split `input_text` into 500-character `chunks`."
    }
    fn invoke(&self, fields: &Fields) -> Result<Fields> {
        let text: Vec<char> = text_field(fields, "input_text")?.chars().collect();
        let chunks: Vec<String> = text
            .chunks(CHUNK_SIZE)
            .map(|c| c.iter().collect())
            .collect();
        Ok(single("chunks", chunks))
    }
}

// ── GenerateSummaries ───────────────────────────────────────────

pub struct GenerateSummaries;

impl Step for GenerateSummaries {
    fn name(&self) -> &str {
        "generate_summaries"
    }
    fn description(&self) -> &str {
        "Summarize each non-blank chunk as its first 100 characters."
    }
    fn invoke(&self, fields: &Fields) -> Result<Fields> {
        let summaries: Vec<String> = text_list_field(fields, "chunks")?
            .into_iter()
            .filter(|chunk| !chunk.trim().is_empty())
            .map(|chunk| {
                let head: String = chunk.chars().take(SUMMARY_PREFIX_CHARS).collect();
                format!("{}...", head)
            })
            .collect();
        Ok(single("summaries", summaries))
    }
}

// ── MergeSummaries ──────────────────────────────────────────────

pub struct MergeSummaries;

impl Step for MergeSummaries {
    fn name(&self) -> &str {
        "merge_summaries"
    }
    fn description(&self) -> &str {
        "Join `summaries` into `merged_summary`."
    }
    fn invoke(&self, fields: &Fields) -> Result<Fields> {
        let merged = text_list_field(fields, "summaries")?.join(" ");
        Ok(single("merged_summary", merged))
    }
}

// ── RefineSummary ───────────────────────────────────────────────

pub struct RefineSummary;

impl Step for RefineSummary {
    fn name(&self) -> &str {
        "refine_summary"
    }
    fn description(&self) -> &str {
        "Trim the current summary to 90% of its length; sets `final_summary` and `length`."
    }
    fn invoke(&self, fields: &Fields) -> Result<Fields> {
        // Refine the previous pass when there is one, so loops converge.
        let source = if fields.contains_key("final_summary") {
            text_field(fields, "final_summary")?
        } else {
            text_field(fields, "merged_summary")?
        };

        let total = source.chars().count();
        let refined: String = source.chars().take(total * 9 / 10).collect();
        let length = refined.chars().count();

        let mut update = single("final_summary", refined);
        update.insert("length".into(), Value::from(length));
        Ok(update)
    }
}
