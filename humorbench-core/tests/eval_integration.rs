//! End-to-end tests for transcript scoring and batch evaluation.

use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::TempDir;

use humorbench_core::EvalConfig;
use humorbench_core::dataset::JokeRecord;
use humorbench_core::eval::runs::run_file_path;
use humorbench_core::eval::{
    BatchEvaluator, EvalSource, ModelResult, NormalizationMode, ObservationMode, Task,
};

fn record(task1: &str, task2: &str) -> JokeRecord {
    let lines = task2.split("\\n").count();
    JokeRecord {
        joke: vec!["line"; lines].join("\\n"),
        task1_label: task1.to_string(),
        task2_label: task2.to_string(),
    }
}

fn task1_transcript(labels: &[&str]) -> String {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            format!(
                "=== Prompt {i} ===\nThinking about it.\n{{\"category\": \"{label}\", \"reasoning\": \"ok\"}}### END\n"
            )
        })
        .collect()
}

fn task2_transcript(answers: &[&[&str]]) -> String {
    answers
        .iter()
        .enumerate()
        .map(|(i, lines)| {
            let quoted: Vec<String> = lines.iter().map(|l| format!("\"{l}\"")).collect();
            format!("=== Prompt {i} ===\n{{\"ANSWER\":[{}]}}### END.\n", quoted.join(", "))
        })
        .collect()
}

fn write_run(completions: &Path, model: &str, stem: &str, run: usize, body: &str) {
    let prefix = completions.join(model).join(stem);
    std::fs::create_dir_all(prefix.parent().unwrap()).unwrap();
    std::fs::write(run_file_path(&prefix, run), body).unwrap();
}

fn satire_irony_source(completions: &Path) -> EvalSource {
    EvalSource::new(
        "en",
        vec![
            record("satire", "setup\\npunchline"),
            record("irony", "punchline"),
        ],
        completions,
    )
}

#[test]
fn satire_example_scores_and_confusion() {
    let dir = TempDir::new().unwrap();
    let completions = dir.path().join("completions");
    let runs = [
        ["satire", "irony"],
        ["irony", "irony"],
        ["irony", "irony"],
        ["irony", "irony"],
        ["irony", "irony"],
    ];
    for (r, labels) in runs.iter().enumerate() {
        write_run(&completions, "m", "en_task1_m", r + 1, &task1_transcript(labels));
    }

    let evaluator =
        BatchEvaluator::new(vec![satire_irony_source(&completions)], EvalConfig::default()).unwrap();
    let cm_dir = dir.path().join("cm");
    let (result, written) = evaluator
        .evaluate("m", Task::Classification, Some(&cm_dir))
        .unwrap()
        .unwrap();

    assert_eq!(result.metrics.len(), 2);
    let at1 = &result.metrics[0];
    let at5 = &result.metrics[1];
    assert_eq!((at1.k, at1.correct, at1.total), (1, 2, 2));
    assert_eq!((at5.k, at5.correct, at5.total), (5, 2, 2));
    assert!((at5.macro_f1 - 11.0 / 21.0).abs() < 1e-9);
    assert!((at5.macro_auc - 0.6).abs() < 1e-9);
    assert_eq!(written.len(), 4);

    let csv = std::fs::read_to_string(cm_dir.join("task1_confusion_matrix_m_pass@5.csv")).unwrap();
    let satire_row = csv.lines().find(|l| l.starts_with("satire,")).unwrap();
    let header: Vec<&str> = csv.lines().next().unwrap().split(',').collect();
    let cells: Vec<&str> = satire_row.split(',').collect();
    let col = |label: &str| header.iter().position(|h| *h == label).unwrap();
    assert_eq!(cells[col("satire")], "1");
    assert_eq!(cells[col("irony")], "4");
}

#[test]
fn malformed_blocks_become_placeholders() {
    let dir = TempDir::new().unwrap();
    let completions = dir.path().join("completions");
    let body = "=== Prompt 0 ===\n{\"category\": \"satire\"\n=== Prompt 1 ===\n{\"category\": \"Irony\"}\n";
    write_run(&completions, "m", "en_task1_m", 1, body);

    let config = EvalConfig {
        ks: vec![1],
        ..EvalConfig::default()
    };
    let evaluator = BatchEvaluator::new(vec![satire_irony_source(&completions)], config).unwrap();
    let (result, _) = evaluator
        .evaluate("m", Task::Classification, None)
        .unwrap()
        .unwrap();
    assert_eq!(result.metrics[0].correct, 1);
    assert_eq!(result.metrics[0].total, 2);
}

#[test]
fn task2_scores_per_line_with_compat_folding() {
    let dir = TempDir::new().unwrap();
    let completions = dir.path().join("completions");
    let answers: [&[&str]; 2] = [&["Set up", "the punch line"], &["punchline"]];
    write_run(&completions, "m", "en_task2_m", 1, &task2_transcript(&answers));

    let config = EvalConfig {
        ks: vec![1],
        ..EvalConfig::default()
    };
    let compat = BatchEvaluator::new(vec![satire_irony_source(&completions)], config.clone()).unwrap();
    let (result, _) = compat.evaluate("m", Task::LineRoles, None).unwrap().unwrap();
    assert_eq!((result.metrics[0].correct, result.metrics[0].total), (3, 3));

    let strict = BatchEvaluator::new(
        vec![satire_irony_source(&completions)],
        EvalConfig {
            normalization: NormalizationMode::Strict,
            ..config
        },
    )
    .unwrap();
    let (result, _) = strict.evaluate("m", Task::LineRoles, None).unwrap().unwrap();
    assert_eq!((result.metrics[0].correct, result.metrics[0].total), (2, 3));
}

#[test]
fn batch_skips_models_without_runs_and_writes_results() {
    let dir = TempDir::new().unwrap();
    let completions = dir.path().join("completions");
    write_run(&completions, "good", "en_task1_good", 1, &task1_transcript(&["Satire", "irony"]));
    let answers: [&[&str]; 2] = [&["setup", "punchline"], &["wrap-up"]];
    write_run(&completions, "good", "en_task2_good", 1, &task2_transcript(&answers));

    let config = EvalConfig {
        observation_mode: ObservationMode::PerUnit,
        ..EvalConfig::default()
    };
    let evaluator = BatchEvaluator::new(vec![satire_irony_source(&completions)], config).unwrap();
    let out_prefix = dir.path().join("results").join("en");
    let report = evaluator
        .run(
            &["good".to_string(), "absent".to_string()],
            &out_prefix,
            &dir.path().join("cm"),
        )
        .unwrap();

    assert_eq!(
        report.skipped,
        vec![
            ("absent".to_string(), Task::Classification),
            ("absent".to_string(), Task::LineRoles),
        ]
    );
    let task1 = std::fs::read_to_string(dir.path().join("results").join("en_task1_res.csv")).unwrap();
    let lines: Vec<&str> = task1.lines().collect();
    assert_eq!(
        lines[0],
        "model,pass@1_acc,pass@1_f1,pass@1_auc,pass@5_acc,pass@5_f1,pass@5_auc"
    );
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("good,1.0,"));

    let task2 = std::fs::read_to_string(dir.path().join("results").join("en_task2_res.csv")).unwrap();
    assert!(task2.lines().nth(1).unwrap().starts_with("good,0.6666666666666666,"));
}

#[test]
fn combined_sources_share_one_question_set() {
    let dir = TempDir::new().unwrap();
    let en_dir = dir.path().join("en");
    let es_dir = dir.path().join("es");
    write_run(&en_dir, "m", "ortho_task1_m", 1, &task1_transcript(&["dry"]));
    write_run(&es_dir, "m", "ortho_typo_task1_m", 1, &task1_transcript(&["ironía", "dark"]));

    let sources = vec![
        EvalSource::new("ortho", vec![record("dry", "punchline")], &en_dir),
        EvalSource::new(
            "ortho_typo",
            vec![record("irony", "punchline"), record("dark", "punchline")],
            &es_dir,
        ),
    ];
    let config = EvalConfig {
        ks: vec![1],
        ..EvalConfig::default()
    };
    let evaluator = BatchEvaluator::new(sources, config).unwrap();
    assert_eq!(evaluator.question_count(), 3);
    let (result, _) = evaluator
        .evaluate("m", Task::Classification, None)
        .unwrap()
        .unwrap();
    assert_eq!((result.metrics[0].correct, result.metrics[0].total), (2, 3));
}

#[test]
fn garbled_transcript_does_not_block_other_models() {
    let dir = TempDir::new().unwrap();
    let completions = dir.path().join("completions");
    let garbled = completions.join("garbled");
    std::fs::create_dir_all(&garbled).unwrap();
    std::fs::write(
        run_file_path(&garbled.join("en_task1_garbled"), 1),
        b"=== Prompt 0 ===\n\xff{\"category\": \"satire\"}\n=== Prompt 1 ===\n\xfe\xff\n".to_vec(),
    )
    .unwrap();
    write_run(&completions, "good", "en_task1_good", 1, &task1_transcript(&["satire", "irony"]));

    let config = EvalConfig {
        ks: vec![1],
        ..EvalConfig::default()
    };
    let evaluator = BatchEvaluator::new(vec![satire_irony_source(&completions)], config).unwrap();
    let out_prefix = dir.path().join("en");
    let report = evaluator
        .run(
            &["garbled".to_string(), "good".to_string()],
            &out_prefix,
            &dir.path().join("cm"),
        )
        .unwrap();

    let task1: Vec<&ModelResult> = report.for_task(Task::Classification).collect();
    assert_eq!(task1.len(), 2);
    assert_eq!((task1[0].metrics[0].correct, task1[0].metrics[0].total), (1, 2));
    assert_eq!((task1[1].metrics[0].correct, task1[1].metrics[0].total), (2, 2));

    let csv = std::fs::read_to_string(dir.path().join("en_task1_res.csv")).unwrap();
    assert!(csv.lines().any(|l| l.starts_with("good,1.0,")), "{csv}");
}

#[test]
fn failing_model_is_skipped_and_batch_continues() {
    let dir = TempDir::new().unwrap();
    let completions = dir.path().join("completions");
    write_run(&completions, "broken", "en_task1_broken", 1, &task1_transcript(&["satire", "irony"]));
    write_run(&completions, "good", "en_task1_good", 1, &task1_transcript(&["satire", "irony"]));

    // A directory where the confusion CSV should go makes the write fail.
    let cm_dir = dir.path().join("cm");
    std::fs::create_dir_all(cm_dir.join("task1_confusion_matrix_broken_pass@1.csv")).unwrap();

    let config = EvalConfig {
        ks: vec![1],
        ..EvalConfig::default()
    };
    let evaluator = BatchEvaluator::new(vec![satire_irony_source(&completions)], config).unwrap();
    let report = evaluator
        .run(
            &["broken".to_string(), "good".to_string()],
            &dir.path().join("en"),
            &cm_dir,
        )
        .unwrap();

    assert!(report.skipped.contains(&("broken".to_string(), Task::Classification)));
    let task1: Vec<&str> = report
        .for_task(Task::Classification)
        .map(|r| r.model.as_str())
        .collect();
    assert_eq!(task1, vec!["good"]);

    let csv = std::fs::read_to_string(dir.path().join("en_task1_res.csv")).unwrap();
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.lines().nth(1).unwrap().starts_with("good,1.0,"));
}
