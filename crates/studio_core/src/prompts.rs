//! Prompt text sent to the generative service for each widget.

pub const PLATFORM_NAME: &str = "AI Investment Dashboard";

pub fn copilot_system_instruction() -> String {
    format!(
        "You are the investment co-pilot of {PLATFORM_NAME}. Answer concisely in markdown, \
         explain the reasoning behind each suggestion, and remind the user that nothing you \
         say is personal financial advice."
    )
}

pub fn insights_prompt(topic: &str) -> String {
    format!(
        "Provide strategic investment insights on: {topic}\n\
         Cover current market context, key opportunities, principal risks, and a short \
         actionable takeaway. Format the answer as markdown with headings."
    )
}

pub fn guide_prompt(topic: &str) -> String {
    format!(
        "Explain how to use the following {PLATFORM_NAME} feature to a new user: {topic}\n\
         Give numbered steps and one practical tip."
    )
}

pub fn allocation_prompt(profile: &str) -> String {
    format!(
        "Suggest a diversified portfolio asset allocation for this investor profile: {profile}\n\
         Use between 5 and 7 asset categories. Percentages must be non-negative and sum to \
         exactly 100."
    )
}

pub fn trader_analysis_prompt(trader: &str) -> String {
    format!(
        "Analyze the trading style, risk profile, and recent performance drivers of the \
         social trader \"{trader}\". Say who would be a good fit to copy this trader and why. \
         Format the answer as markdown."
    )
}
