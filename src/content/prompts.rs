use crate::technique::Technique;

pub const POST_SYSTEM_PROMPT: &str = "You write short, funny social media posts for a media-literacy party game. \
    The posts deliberately use rhetorical manipulation techniques so players can learn to spot them. \
    Never be hateful, never target real people or groups, and keep it light.";

pub const ANALYST_SYSTEM_PROMPT: &str = "You are a media-literacy coach. You explain manipulation techniques \
    in plain words and rewrite manipulative texts into calm, neutral versions.";

fn technique_labels(techniques: &[Technique]) -> String {
    techniques
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn post_prompt(topic: &str, techniques: &[Technique], language: &str) -> String {
    format!(
        "Write a short post (2-3 sentences) in {language} about \"{topic}\" that uses these manipulation techniques: {labels}. \
         Humorous, not offensive. Return only the post.",
        labels = technique_labels(techniques),
    )
}

pub fn analysis_prompt(post: &str, techniques: &[Technique], language: &str) -> String {
    format!(
        r#"Manipulative post: "{post}"
The post uses these manipulation techniques: {labels}

IMPORTANT: write a complete neutral version of this post. It must be a rewrite of the same post, with the same topic and content, but without emotional manipulation, false dilemmas, personal attacks or blame shifting.

Example:
Manipulative post: "Either you study right now or you fail forever!"
Neutral version: "Studying consistently can help you succeed."

Write all texts in {language}. Return JSON only, no extra text:
{{
  "explanation": "short explanation of the manipulation techniques in the post",
  "neutralAlternative": "the complete neutral rewrite of the post",
  "manipulationLevel": 50,
  "aiCommentary": "a short witty remark"
}}"#,
        labels = technique_labels(techniques),
    )
}

pub fn neutral_rewrite_prompt(post: &str, language: &str) -> String {
    format!(
        r#"Manipulative post: "{post}"

VERY IMPORTANT: rewrite this post as a neutral version in {language}. It must be a rewrite of the same post with the same topic and content, but without emotional manipulation, false dilemmas, personal attacks or blame shifting.

Example:
Manipulative post: "You picked the couch AGAIN? Your running shoes are crying in the dark from neglect!"
Neutral version: "Regular exercise is good for your health. It is worth fitting some activity into your routine."

Return only the neutral version, without explanations, quotes or any extra text."#
    )
}

pub fn ai_guess_prompt(post: &str, make_mistake: bool, language: &str) -> String {
    let instruction = if make_mistake {
        "Add exactly one wrong technique or miss exactly one correct technique."
    } else {
        "Identify the techniques correctly."
    };
    let tags = Technique::ALL
        .iter()
        .map(|t| format!("{} ({})", t.tag(), t.label()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Post: "{post}"
You are a player in a game guessing which manipulation techniques this post uses. {instruction}
Allowed techniques: {tags}
Reply with JSON only, the analysis written in {language}: {{"techniques":["technique_tag"],"analysis":"a short comment"}}"#
    )
}
