//! Multi-turn conversations resume the previous turn's session.

mod common;

use agent_retry::{AgentOptions, Conversation, Deadline, OutcomeKind, RequestRetrier, RetryPolicy};
use common::{result_in, text, ScriptedAgent, Step};
use std::time::Duration;

fn reply(session_id: &str, answer: &str) -> Step {
    Step::Reply(vec![text(answer), result_in(session_id, answer)])
}

fn policy() -> RetryPolicy {
    RetryPolicy::new(2, Duration::from_millis(100)).unwrap()
}

fn deadline() -> Deadline {
    Deadline::after(Duration::from_secs(30))
}

fn resumes(agent: &ScriptedAgent) -> Vec<Option<String>> {
    agent.calls().into_iter().map(|call| call.resume).collect()
}

#[tokio::test(start_paused = true)]
async fn test_follow_up_turns_resume_session() {
    let agent = ScriptedAgent::new(vec![
        reply("7f3a", "The capital of France is Paris."),
        reply("7f3a", "Paris has about 2.1 million residents."),
        reply("7f3a", "The Eiffel Tower and the Louvre."),
    ]);
    let retrier = RequestRetrier::new("chat");
    let mut conversation = Conversation::new(&retrier, &agent, AgentOptions::default());

    for prompt in [
        "What's the capital of France?",
        "What's the population of that city?",
        "What are some famous landmarks there?",
    ] {
        let outcome = conversation.send(prompt, &policy(), deadline()).await;
        assert!(outcome.is_success());
    }

    assert_eq!(
        resumes(&agent),
        vec![None, Some("7f3a".to_string()), Some("7f3a".to_string())]
    );
    assert_eq!(conversation.turns(), 3);
    assert_eq!(conversation.session_id(), Some("7f3a"));
    assert_eq!(agent.calls()[1].prompt, "What's the population of that city?");
}

#[tokio::test(start_paused = true)]
async fn test_new_session_id_is_adopted() {
    let agent = ScriptedAgent::new(vec![
        reply("first", "a"),
        reply("forked", "b"),
        reply("forked", "c"),
    ]);
    let retrier = RequestRetrier::default();
    let mut conversation = Conversation::new(&retrier, &agent, AgentOptions::default());

    for prompt in ["one", "two", "three"] {
        conversation.send(prompt, &policy(), deadline()).await;
    }

    assert_eq!(
        resumes(&agent),
        vec![None, Some("first".to_string()), Some("forked".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_retries_within_a_turn_resume_same_session() {
    let agent = ScriptedAgent::new(vec![
        reply("s-1", "hello"),
        Step::Transient,
        reply("s-1", "still here"),
    ]);
    let retrier = RequestRetrier::new("chat");
    let mut conversation = Conversation::new(&retrier, &agent, AgentOptions::default());

    conversation.send("hi", &policy(), deadline()).await;
    let second = conversation.send("are you there?", &policy(), deadline()).await;

    assert!(second.is_success());
    assert_eq!(second.attempts(), 2);
    assert_eq!(
        resumes(&agent),
        vec![None, Some("s-1".to_string()), Some("s-1".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_turn_keeps_session() {
    let agent = ScriptedAgent::new(vec![
        reply("s-1", "hello"),
        Step::Missing,
        reply("s-1", "back again"),
    ]);
    let retrier = RequestRetrier::new("chat");
    let mut conversation = Conversation::new(&retrier, &agent, AgentOptions::default());

    conversation.send("hi", &policy(), deadline()).await;
    let failed = conversation.send("next", &policy(), deadline()).await;
    assert_eq!(failed.kind(), OutcomeKind::Fatal);
    assert_eq!(conversation.session_id(), Some("s-1"));
    assert_eq!(conversation.turns(), 1);

    let recovered = conversation.send("next", &policy(), deadline()).await;
    assert!(recovered.is_success());
    assert_eq!(resumes(&agent)[2].as_deref(), Some("s-1"));
    assert_eq!(conversation.turns(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_resume_existing_session() {
    let agent = ScriptedAgent::new(vec![reply("earlier", "picking up where we left off")]);
    let retrier = RequestRetrier::new("chat");
    let options = AgentOptions::builder().allowed_tools(["Read"]).build();
    let mut conversation = Conversation::new(&retrier, &agent, options).resume("earlier");

    conversation.send("continue", &policy(), deadline()).await;

    let calls = agent.calls();
    assert_eq!(calls[0].resume.as_deref(), Some("earlier"));
    assert_eq!(calls[0].allowed_tools, vec!["Read"]);
}
