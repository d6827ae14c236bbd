//! Instruction text for the language-model cleanup step.

/// Instruction placed before the OCR'd CSV text.
///
/// The reformatted text is raw OCR output with crude comma delimiting; the
/// model is asked to fix recognition errors and return it as a table.
pub const ANALYSIS_INSTRUCTION: &str = "just convert the text errors and display it in csv";

/// Build the single prompt sent to the model: instruction, newline, content.
pub fn analysis_prompt(csv_content: &str) -> String {
    format!("{ANALYSIS_INSTRUCTION}\n{csv_content}")
}
