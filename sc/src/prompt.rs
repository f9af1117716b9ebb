//! Prompt text sent to the reply model
//!
//! The reply format requested here is the grammar [`crate::plan::parse`]
//! understands, so the two must change together.

use crate::activity::NameSet;
use crate::intent::Intent;

/// Canned reply when a turn produces nothing to add or remove
pub const NO_MATCHES_REPLY: &str = "No strong subreddit matches. Try rephrasing or being more specific?";

/// System prompt for plan-producing turns
pub const SYSTEM_PROMPT: &str = r#"You are a Reddit assistant helping users manage their subreddit subscriptions.

Your task:
1. Suggest subreddit additions and removals in clearly grouped categories.
2. Use short category headers to group related subreddits, for example:
   Baking:
   Fitness:
   Gaming:
   Learning:

Formatting rules:
+ r/Subreddit - short reason (for adds)
- r/Subreddit - short reason (for removes)
= r/Subreddit - short reason (to keep an existing subscription)

3. Always group subreddits under the correct category heading.
4. Only REMOVE subreddits that clearly relate to the user's removal intent.
5. Keep explanations concise and helpful.
6. Output plain text only, no extra commentary.
7. If nothing relevant comes to mind, respond with:
   No strong subreddit matches. Try rephrasing or being more specific?"#;

/// System prompt for the model-backed intent classifier
pub const CLASSIFIER_PROMPT: &str = r#"You are an intent classifier for a Reddit assistant. Respond with ONE of the following keywords only:

- "show_subs" if they want to see current subreddit subscriptions
- "regenerate_adds" if they want more subreddit suggestions to add
- "regenerate_removes" if they want more subs to remove
- "refine_removes" if they want to remove some and keep others
- "remove_only" if they only want to prune or clean inactive subs
- "clear_removes" if they want to cancel all previous removals
- "new_prompt" if it's a completely new topic
- "none" if it's just confirmation or mild feedback

Return one keyword only. No extra text."#;

/// Build the user prompt for one turn
///
/// Removal turns quote the user and list every subscription; discovery turns
/// describe the interests and list the active subreddits.
pub fn build_prompt(input: &str, intent: &Intent, subscribed: &NameSet, active: &[String]) -> String {
    if intent.remove_mode {
        let subs: Vec<String> = subscribed.iter().map(|n| format!("r/{}", n)).collect();
        return format!(
            r#"The user said: "{}"

They want to remove subreddit topics related to that input.

Your task:
- ONLY suggest subreddit names that clearly relate to the topic the user wants removed.
- DO NOT suggest anything unrelated.
- Format removals as:
  - r/subredditname - short explanation

Their current subscriptions are:
{}
"#,
            input,
            subs.join(", ")
        );
    }

    let mut prompt = String::from("The user gave the following prompt describing their interests:\n\n");
    prompt.push_str(input);
    prompt.push_str("\n\nThe user is currently active in these subreddits:\n");
    for name in active {
        prompt.push_str(name);
        prompt.push('\n');
    }
    prompt.push_str(
        r#"
Please recommend subreddit changes using this format:
+ r/something     // to subscribe
- r/oldsubreddit  // to unsubscribe
= r/keepsubreddit // to keep if needed

Avoid commentary. Keep only subreddit suggestions in output.
"#,
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::classify;

    #[test]
    fn test_discovery_prompt_lists_active() {
        let active = vec!["r/golang".to_string(), "r/rust".to_string()];
        let prompt = build_prompt("I like baking", &classify("I like baking"), &NameSet::new(), &active);

        assert!(prompt.contains("I like baking"));
        assert!(prompt.contains("r/golang\nr/rust\n"));
        assert!(prompt.contains("+ r/something"));
    }

    #[test]
    fn test_removal_prompt_lists_subscriptions() {
        let subscribed: NameSet = ["pcgaming", "gaming", "rust"].iter().map(|s| s.to_string()).collect();
        let intent = classify("remove my gaming subs");
        let prompt = build_prompt("remove my gaming subs", &intent, &subscribed, &[]);

        assert!(prompt.starts_with("The user said: \"remove my gaming subs\""));
        assert!(prompt.contains("r/gaming, r/pcgaming, r/rust"));
    }
}
