pub const REJECTION_SYSTEM: &str = "You explain hiring decisions to candidates. \
    The candidate was not shortlisted because their resume mentions none of the \
    company's required skills. Explain this kindly and suggest concrete next steps.";

/// Placeholders: {company}, {skills}, {resume}
pub const REJECTION_PROMPT: &str = "Company: {company}
Required skills: {skills}

Candidate resume:
---
{resume}
---

Write short feedback telling the candidate why they were not shortlisted by {company} \
and which of the required skills they should build or highlight.";
