use applypilot_core::GenerationRequest;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// Renders a resolver request into model instructions. Truthfulness and
/// choice constraints live in the system text; the retry variant restates
/// the membership requirement after a rejected answer.
pub fn question_prompt(request: &GenerationRequest<'_>) -> RenderedPrompt {
    let mut system = String::from(
        "You answer internship application questions concisely and truthfully. \
         Never claim skills or experience that are not in the candidate's resume. ",
    );
    if request.allowed_choices.is_empty() {
        system.push_str("Keep the answer to one or two sentences.");
    } else {
        system.push_str("Reply with exactly one of the allowed choices, verbatim.");
    }
    if request.strict_retry {
        system.push_str(
            " Your previous reply was not one of the allowed choices. \
             Reply with one allowed choice, copied exactly as written.",
        );
    }

    let mut user = format!("Question: {}\n", request.prompt);
    user.push_str(&format!("Job: {} at {}\n", request.job.title, request.job.company));
    if !request.allowed_choices.is_empty() {
        user.push_str(&format!("Allowed choices: {}\n", request.allowed_choices.join(" | ")));
    }
    user.push_str(&format!("Answer length limit: {} characters\n", request.max_chars));

    RenderedPrompt { system, user }
}
