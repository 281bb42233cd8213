//! Construction of the classification prompt.
//!
//! The prompt carries the declared total, the buyer's free text, whether a
//! partner exists, and the category catalog. The response contract it
//! describes is the one [`crate::classification::parse_classification`]
//! enforces.

use std::fmt::Write;

use crate::types::Money;

/// Inputs for [`build_classification_prompt`].
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub declared_amount: Money,
    pub description: &'a str,
    pub has_partner: bool,
    /// Category names the service may choose from.
    pub categories: &'a [String],
}

/// Build the single text prompt sent to the classification service.
pub fn build_classification_prompt(ctx: &PromptContext<'_>) -> String {
    let mut prompt = String::with_capacity(1024 + ctx.description.len());

    prompt.push_str(
        "You split a household spending description into categorized line items.\n\
         Respond with a single JSON object and nothing else, shaped exactly like:\n\
         {\"is_ambiguous\": bool, \"ambiguity_reason\": string or null, \"items\": \
         [{\"apportion_mode\": \"alone\" | \"shared\" | \"other\", \"category\": string, \
         \"amount\": number, \"description\": string}]}\n\n",
    );

    prompt.push_str("Rules:\n");
    let _ = writeln!(
        prompt,
        "- The line item amounts should add up to the declared total of {}.",
        ctx.declared_amount
    );
    prompt.push_str("- Use only the categories listed below, spelled exactly as listed.\n");
    if ctx.has_partner {
        prompt.push_str(
            "- apportion_mode \"alone\": the buyer pays everything; \"shared\": split \
             evenly with the partner; \"other\": the partner pays everything.\n",
        );
    } else {
        prompt.push_str(
            "- The buyer has no partner: every item must use apportion_mode \"alone\".\n",
        );
    }
    prompt.push_str(
        "- Set is_ambiguous to true and explain in ambiguity_reason when the \
         description does not clearly determine the split or the categories.\n\n",
    );

    prompt.push_str("Categories:\n");
    for name in ctx.categories {
        let _ = writeln!(prompt, "- {name}");
    }

    let _ = write!(
        prompt,
        "\nDeclared total: {}\nDescription: {}\n",
        ctx.declared_amount, ctx.description
    );

    prompt
}
