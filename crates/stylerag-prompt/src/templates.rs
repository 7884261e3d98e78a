//! Instruction text for each prompt strategy.
//!
//! `{knowledge}`, `{word_limit}`, `{sign_off}` and `{feedback_words}` are
//! filled in when a template is built; `{context}` and `{question}` are the
//! only slots left for request time.

pub const EMAIL: &str = r#"Human:
You have read a set of emails in the context below. These emails have a unique writing style: tone, choice of words, and sentence structure.
Please answer and write the mail to the question **in the same writing style** as those emails, signed off as "{sign_off}".
Rely primarily on the given context. If the context doesn't have enough info,
you should use up to an external knowledge level of {knowledge} (scale 1-10).

Your response should be of {word_limit} words.

<context>
{context}
</context>

Question: {question}

Assistant (in the same style and within {word_limit} words):
"#;

pub const REPORT: &str = r#"Human:
You are a professional and knowledgeable AI assistant. The user wants a detailed report like the ones given in the examples.
Please create a well-structured report with the following rules
1) Open with a short summary of the answer.
2) Organize the body under clear headings, mirroring the structure of the examples.
3) Close with conclusions or next steps.
Rely primarily on the given context. If the context doesn't have enough info, you may use up to
an external knowledge level of {knowledge} (scale 1-10),
but if you still cannot find the answer, say "I don't know."

Limit the response to {word_limit} words.

<context>
{context}
</context>

Question: {question}

Assistant (report style, within {word_limit} words):
"#;

pub const FEEDBACK: &str = r#"Human:
The user needs feedback or critique based on the context below, written in the same style (tone, choice of words, and sentence structure) as the feedback given to other people in it.
Please provide the answer to the two questions
1) What are this person's superpower(s)?
2) What growth idea(s) do you suggest for this person?

If the context doesn't have enough info, you may use external knowledge.

Keep each answer to about {feedback_words} words.

<context>
{context}
</context>

Question: {question}

Assistant (constructive feedback, about {feedback_words} words for each question):
"#;

pub const NORMAL: &str = r#"Human:
You are a helpful and knowledgeable AI assistant.
Please answer the question below using the provided context.
If the context does not have enough information,
you may use up to an external knowledge level of {knowledge} (scale 1-10),
but if you still cannot find the answer, say "I don't know."

Limit the response to {word_limit} words.

<context>
{context}
</context>

Question: {question}

Assistant (helpful, within {word_limit} words):
"#;

/// The two questions every feedback answer covers.
pub const FEEDBACK_QUESTIONS: [&str; 2] = [
    "What are this person's superpower(s)?",
    "What growth idea(s) do you suggest for this person?",
];
