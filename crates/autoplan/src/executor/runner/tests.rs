use std::time::Duration;

use super::*;
use crate::plan::parse;
use crate::tools::{tool_fn, ToolId};

fn echo(prefix: &'static str) -> Arc<dyn crate::tools::Tool> {
    tool_fn(move |args: Vec<ArgValue>| async move {
        let joined = args.iter().map(ArgValue::to_text).collect::<Vec<_>>().join("|");
        Ok(format!("{prefix}:{joined}"))
    })
}

fn sleeper(millis: u64, output: &'static str) -> Arc<dyn crate::tools::Tool> {
    tool_fn(move |_args| async move {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(output.to_string())
    })
}

async fn catalog_with(entries: Vec<(ToolId, Arc<dyn crate::tools::Tool>)>) -> ToolCatalog {
    let catalog = ToolCatalog::new();
    for (id, tool) in entries {
        catalog.register(ToolEntry::new(id, tool)).await.unwrap();
    }
    catalog
}

fn plan(text: &str) -> Vec<ParsedStep> {
    let parsed = parse(text);
    assert!(parsed.is_valid(), "{:?}", parsed.problems());
    parsed.steps
}

#[tokio::test]
async fn dependent_step_receives_upstream_output() {
    let catalog = catalog_with(vec![
        (ToolId::GetPhoneNumber, sleeper(50, "+1 555 0100")),
        (ToolId::SendSms, echo("sms")),
    ])
    .await;
    let executor = TaskExecutor::new(catalog);

    let result = executor
        .execute(&plan(
            "1. get_phone_number(\"John\")\n2. send_sms([$1], \"Meeting at 3pm\")\n3. join()<END_OF_PLAN>",
        ))
        .await;

    assert!(result.success);
    assert_eq!(result.results.len(), 2);
    assert_eq!(result.outputs[&2], "sms:+1 555 0100|Meeting at 3pm");

    let first = result.result(1).unwrap();
    let second = result.result(2).unwrap();
    assert!(second.started_at >= first.ended_at);
    assert_eq!(result.levels.len(), 2);
}

#[tokio::test]
async fn independent_steps_run_concurrently() {
    let catalog = catalog_with(vec![
        (ToolId::GetPhoneNumber, sleeper(200, "phone")),
        (ToolId::GetEmailAddress, sleeper(200, "email")),
    ])
    .await;
    let executor = TaskExecutor::new(catalog);

    let started = Instant::now();
    let result = executor
        .execute(&plan(
            "1. get_phone_number(\"John\")\n2. get_email_address(\"Jane\")\n3. join()<END_OF_PLAN>",
        ))
        .await;
    let elapsed = started.elapsed();

    assert!(result.success);
    assert_eq!(result.levels.len(), 1);
    assert!(elapsed < Duration::from_millis(380), "took {elapsed:?}");
}

#[tokio::test]
async fn parallelism_cap_serializes_calls() {
    let catalog = catalog_with(vec![
        (ToolId::GetPhoneNumber, sleeper(100, "phone")),
        (ToolId::GetEmailAddress, sleeper(100, "email")),
    ])
    .await;
    let executor = TaskExecutor::new(catalog).with_max_parallel(1);

    let started = Instant::now();
    let result = executor
        .execute(&plan(
            "1. get_phone_number(\"John\")\n2. get_email_address(\"Jane\")<END_OF_PLAN>",
        ))
        .await;

    assert!(result.success);
    assert!(started.elapsed() >= Duration::from_millis(190));
}

#[tokio::test]
async fn failure_does_not_cancel_siblings() {
    let failing = tool_fn(|_args| async { Err(ToolError::Failed("carrier offline".to_string())) });
    let catalog = catalog_with(vec![
        (ToolId::SendSms, failing),
        (ToolId::CreateNote, sleeper(50, "note created")),
    ])
    .await;
    let executor = TaskExecutor::new(catalog);

    let result = executor
        .execute(&plan(
            "1. send_sms([\"+1\"], \"hi\")\n2. create_note(\"Groceries\", \"milk\")\n3. join()<END_OF_PLAN>",
        ))
        .await;

    assert!(!result.success);
    let failed = result.result(1).unwrap();
    assert!(!failed.success);
    assert_eq!(failed.error.as_deref(), Some("carrier offline"));
    assert!(result.result(2).unwrap().success);
    assert!(!result.outputs.contains_key(&1));
}

#[tokio::test]
async fn unknown_and_disabled_tools_fail_their_step() {
    let catalog = catalog_with(vec![(ToolId::CreateNote, echo("note"))]).await;
    catalog.set_enabled(ToolId::CreateNote, false).await.unwrap();
    let executor = TaskExecutor::new(catalog);

    let result = executor
        .execute(&plan("1. launch_rocket()\n2. create_note(\"x\")<END_OF_PLAN>"))
        .await;

    assert!(!result.success);
    assert_eq!(
        result.result(1).unwrap().error.as_deref(),
        Some("unknown tool: launch_rocket")
    );
    assert_eq!(
        result.result(2).unwrap().error.as_deref(),
        Some("tool disabled: create_note")
    );
}

#[tokio::test]
async fn cyclic_steps_still_run_once() {
    let catalog = catalog_with(vec![
        (ToolId::OpenNote, echo("open")),
        (ToolId::AppendNoteContent, echo("append")),
    ])
    .await;
    let executor = TaskExecutor::new(catalog);

    let result = executor
        .execute(&plan("1. open_note($2)\n2. append_note_content($1, \"x\")<END_OF_PLAN>"))
        .await;

    assert!(result.success);
    assert_eq!(result.levels.len(), 1);
    assert!(result.levels[0].fallback);
    assert_eq!(result.outputs[&1], "open:");
    assert_eq!(result.outputs[&2], "append:|x");
}

#[tokio::test]
async fn terminal_step_is_not_executed() {
    let catalog = catalog_with(vec![(ToolId::CreateNote, echo("note"))]).await;
    let executor = TaskExecutor::new(catalog);

    let result = executor
        .execute(&plan("1. create_note(\"a\")\n2. join()<END_OF_PLAN>"))
        .await;

    assert_eq!(result.steps.len(), 1);
    assert!(result.result(2).is_none());

    let only_join = executor.execute(&plan("1. join()<END_OF_PLAN>")).await;
    assert!(only_join.success);
    assert!(only_join.results.is_empty());
}

#[tokio::test]
async fn results_follow_step_ids() {
    let catalog = catalog_with(vec![
        (ToolId::GetPhoneNumber, sleeper(80, "slow")),
        (ToolId::GetEmailAddress, sleeper(5, "fast")),
    ])
    .await;
    let executor = TaskExecutor::new(catalog);

    let result = executor
        .execute(&plan(
            "1. get_phone_number(\"A\")\n2. get_email_address(\"B\")<END_OF_PLAN>",
        ))
        .await;

    let ids: Vec<StepId> = result.results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(
        result.observations(),
        "get_phone_number(\"A\")\nObservation: slow\nget_email_address(\"B\")\nObservation: fast"
    );
}

#[tokio::test]
async fn step_events_are_published_for_runs() {
    let catalog = catalog_with(vec![(ToolId::CreateNote, echo("note"))]).await;
    let bus = Bus::new(16);
    let mut rx = bus.subscribe();
    let executor = TaskExecutor::new(catalog).with_bus(bus);

    executor
        .execute_in_run(
            Some("run-7"),
            &plan("1. create_note(\"a\")<END_OF_PLAN>"),
            &CancellationToken::new(),
        )
        .await;

    match rx.recv().await.unwrap() {
        RunEvent::StepFinished { run_id, step } => {
            assert_eq!(run_id, "run-7");
            assert_eq!(step.id, 1);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn out_of_order_ids_are_reported_by_id() {
    let catalog = catalog_with(vec![
        (ToolId::GetPhoneNumber, echo("phone")),
        (ToolId::GetEmailAddress, echo("email")),
    ])
    .await;
    let executor = TaskExecutor::new(catalog);
    let steps = vec![
        ParsedStep::new(2, "get_email_address", vec![ArgValue::Str("B".to_string())]),
        ParsedStep::new(1, "get_phone_number", vec![ArgValue::Str("A".to_string())]),
    ];

    let result = executor.execute(&steps).await;

    let ids: Vec<StepId> = result.results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(
        result.observations(),
        "get_phone_number(\"A\")\nObservation: phone:A\nget_email_address(\"B\")\nObservation: email:B"
    );
}

#[tokio::test]
async fn cancelled_token_stops_later_levels() {
    let catalog = catalog_with(vec![
        (ToolId::GetPhoneNumber, sleeper(150, "+1 555 0100")),
        (ToolId::SendSms, echo("sms")),
    ])
    .await;
    let executor = TaskExecutor::new(catalog);
    let cancel_token = CancellationToken::new();
    let trigger = cancel_token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(40)).await;
        trigger.cancel();
    });

    let result = executor
        .execute_in_run(
            None,
            &plan("1. get_phone_number(\"John\")\n2. send_sms([$1], \"hi\")<END_OF_PLAN>"),
            &cancel_token,
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.results.len(), 1);
    assert!(result.result(1).unwrap().success);
    assert!(result.result(2).is_none());
    assert_eq!(
        result.observations(),
        "get_phone_number(\"John\")\nObservation: +1 555 0100\nsend_sms([$1], \"hi\")\nObservation: Error: step did not run"
    );
}

#[tokio::test]
async fn generated_dags_respect_dependencies() {
    const TOOLS: [(ToolId, &str); 4] = [
        (ToolId::GetPhoneNumber, "get_phone_number"),
        (ToolId::GetEmailAddress, "get_email_address"),
        (ToolId::CreateNote, "create_note"),
        (ToolId::OpenNote, "open_note"),
    ];
    let catalog = catalog_with(
        TOOLS
            .iter()
            .enumerate()
            .map(|(index, (id, _))| (*id, sleeper(2 + index as u64, "ok")))
            .collect(),
    )
    .await;
    let executor = TaskExecutor::new(catalog).with_max_parallel(3);

    let mut seed = 11u64;
    let mut next = move || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        seed >> 33
    };
    for _ in 0..25 {
        let count = (next() % 7 + 2) as StepId;
        let steps: Vec<ParsedStep> = (1..=count)
            .map(|id| {
                let args = (1..id)
                    .filter(|_| next() % 3 == 0)
                    .map(ArgValue::Ref)
                    .collect();
                let tool = TOOLS[(next() % TOOLS.len() as u64) as usize].1;
                ParsedStep::new(id, tool, args)
            })
            .collect();

        let result = executor.execute(&steps).await;

        assert!(result.success);
        assert_eq!(result.results.len(), steps.len());
        for step in &steps {
            let started = result.result(step.id).unwrap().started_at;
            for &dependency in &step.dependencies {
                let upstream = result.result(dependency).unwrap();
                assert!(
                    started >= upstream.ended_at,
                    "step {} started before dependency {} ended",
                    step.id,
                    dependency
                );
            }
        }
    }
}
