// Prompt templates for the four screening tasks.
// Every template carries exactly one `{jd}` and one `{resume}` slot.

pub const JD_SLOT: &str = "{jd}";
pub const RESUME_SLOT: &str = "{resume}";

pub const EVALUATION_TEMPLATE: &str = r#"You are an experienced Technical HR Manager. Review the provided resume against the job description.
Highlight strengths, weaknesses, and alignment with the specified job requirements.

### Job Description:
{jd}

### Resume:
{resume}

Return a structured analysis with headings for:
- Strengths
- Weaknesses
- Overall Fit
"#;

pub const SKILL_IMPROVEMENT_TEMPLATE: &str = r#"As a Technical HR Manager, analyze the resume relative to the job description.
Suggest concrete skill improvements (courses, tools, projects) and areas needing development.

### Job Description:
{jd}

### Resume:
{resume}

Output in bullet points grouped by:
- Hard Skills
- Soft Skills
- Projects to Build
"#;

pub const MISSING_KEYWORDS_TEMPLATE: &str = r#"Act as an ATS scanner. Extract the most important keywords from the job description and identify which are missing or weak in the resume.

### Job Description:
{jd}

### Resume:
{resume}

Return two lists:
1. Critical Missing Keywords
2. Nice-to-have Keywords
Also include a short note on how to add them naturally.
"#;

pub const MATCH_PERCENTAGE_TEMPLATE: &str = r#"Analyze the resume vs job description and output in this strict format:

Match: <number>%

### Why this score:
- Bullet point reason 1
- Bullet point reason 2
- Bullet point reason 3

### How to Improve:
- Action 1
- Action 2
- Action 3

### Job Description:
{jd}

### Resume:
{resume}
"#;

/// Fills the `{jd}` and `{resume}` slots in a single left-to-right pass.
///
/// Inserted text is never rescanned, so slot-like text inside the inputs stays literal.
/// Braces that do not open a known slot are copied through unchanged.
pub fn fill_slots(template: &str, jd: &str, resume: &str) -> String {
    let mut out = String::with_capacity(template.len() + jd.len() + resume.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        if let Some(after) = tail.strip_prefix(JD_SLOT) {
            out.push_str(jd);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(RESUME_SLOT) {
            out.push_str(resume);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}
