//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use humorbench_core::config::{HumorConfig, load_config, workspace_config_path};
use humorbench_core::dataset::{read_tsv, write_tsv};
use humorbench_core::eval::{BatchEvaluator, EvalSource, Task};
use humorbench_core::{prompts, runner, segment};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Handle a CLI subcommand.
pub fn handle_command(command: Commands, workspace: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Segment { input, output } => handle_segment(&input, &output),
        Commands::Perturb {
            input,
            out_dir,
            seed,
            lang,
            no_cultural,
            lexicon,
            target_role,
        } => {
            let mut overrides = BTreeMap::new();
            if let Some(seed) = seed {
                overrides.insert("perturb.seed".to_string(), json!(seed));
            }
            if let Some(lang) = lang {
                overrides.insert("perturb.synonym_lang".to_string(), json!(lang));
            }
            if no_cultural {
                overrides.insert("perturb.include_cultural".to_string(), json!(false));
            }
            if let Some(lexicon) = lexicon {
                overrides.insert(
                    "perturb.lexicon_path".to_string(),
                    json!(lexicon.to_string_lossy()),
                );
            }
            if let Some(role) = target_role {
                overrides.insert("perturb.target_role".to_string(), json!(role));
            }
            let config = load(workspace, &overrides)?;
            handle_perturb(&input, &out_dir, &config)
        }
        Commands::Prompts {
            input,
            out_dir,
            joke_column,
            tasks,
        } => {
            let tasks: Vec<Task> = if tasks.is_empty() {
                Task::ALL.to_vec()
            } else {
                tasks.into_iter().filter_map(Task::from_number).collect()
            };
            let written = prompts::write_prompt_files(&input, &out_dir, joke_column.as_deref(), &tasks)?;
            for path in written {
                println!("{}", path.display());
            }
            Ok(())
        }
        Commands::Eval {
            sources,
            models,
            joke_column,
            out_prefix,
            confusion_dir,
            ks,
            max_runs,
            strict,
            per_unit,
        } => {
            let mut overrides = BTreeMap::new();
            if !ks.is_empty() {
                overrides.insert("eval.ks".to_string(), json!(ks));
            }
            if let Some(max_runs) = max_runs {
                overrides.insert("eval.max_runs".to_string(), json!(max_runs));
            }
            if strict {
                overrides.insert("eval.normalization".to_string(), json!("strict"));
            }
            if per_unit {
                overrides.insert("eval.observation_mode".to_string(), json!("per_unit"));
            }
            let config = load(workspace, &overrides)?;
            let models = if models.is_empty() {
                config.eval.models.clone()
            } else {
                models
            };
            if models.is_empty() {
                anyhow::bail!("No models given. Pass --model or set eval.models in the config");
            }

            let mut eval_sources = Vec::with_capacity(sources.len());
            for spec in &sources {
                let (name, dataset, completions) = parse_source(spec)?;
                eval_sources.push(EvalSource::from_tsv(
                    name,
                    &dataset,
                    joke_column.as_deref(),
                    completions,
                )?);
            }
            handle_eval(eval_sources, &config, &models, &out_prefix, &confusion_dir)
        }
        Commands::Config { action } => handle_config(action, workspace),
    }
}

fn load(
    workspace: &Path,
    overrides: &BTreeMap<String, serde_json::Value>,
) -> anyhow::Result<HumorConfig> {
    load_config(Some(workspace), overrides)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
}

fn handle_segment(input: &Path, output: &Path) -> anyhow::Result<()> {
    let table = read_tsv(input)?;
    let jokes = segment::segment_table(&table)?;
    write_tsv(output, &jokes)?;
    println!("Wrote {} jokes to {}", jokes.row_count(), output.display());
    Ok(())
}

fn handle_perturb(input: &Path, out_dir: &Path, config: &HumorConfig) -> anyhow::Result<()> {
    let perturb = &config.perturb;
    let lexicon = perturb.lexicon();
    if perturb.lexicon_path.is_some() && lexicon.is_none() {
        tracing::warn!("Lexicon could not be loaded, synonym substitution disabled");
    }
    let pipelines = perturb.build_pipelines(lexicon.as_ref());
    let options = perturb.run_options(lexicon);
    let manifest = runner::generate_outputs(input, out_dir, perturb.seed, pipelines, &options)?;

    println!(
        "Perturbed {} jokes into {}",
        manifest.row_count,
        out_dir.display()
    );
    for (column, path) in &manifest.outputs {
        println!("  {column}: {path}");
    }
    Ok(())
}

fn handle_eval(
    sources: Vec<EvalSource>,
    config: &HumorConfig,
    models: &[String],
    out_prefix: &Path,
    confusion_dir: &Path,
) -> anyhow::Result<()> {
    let evaluator = BatchEvaluator::new(sources, config.eval.clone())?;
    tracing::info!(
        questions = evaluator.question_count(),
        models = models.len(),
        "Starting evaluation"
    );
    let report = evaluator.run(models, out_prefix, confusion_dir)?;

    for result in &report.results {
        for m in &result.metrics {
            println!(
                "{} {} pass@{}: acc {:.4} ({}/{}) f1 {:.4} auc {:.4}",
                result.model,
                result.task,
                m.k,
                m.accuracy,
                m.correct,
                m.total,
                m.macro_f1,
                m.macro_auc
            );
        }
    }
    for (model, task) in &report.skipped {
        println!("{model} {task}: skipped, no transcripts");
    }
    Ok(())
}

/// Split `NAME,DATASET_TSV,COMPLETIONS_DIR`.
fn parse_source(spec: &str) -> anyhow::Result<(String, PathBuf, PathBuf)> {
    let parts: Vec<&str> = spec.splitn(3, ',').map(str::trim).collect();
    match parts.as_slice() {
        [name, dataset, completions]
            if !name.is_empty() && !dataset.is_empty() && !completions.is_empty() =>
        {
            Ok((
                name.to_string(),
                PathBuf::from(dataset),
                PathBuf::from(completions),
            ))
        }
        _ => anyhow::bail!(
            "Invalid source '{}': expected NAME,DATASET_TSV,COMPLETIONS_DIR",
            spec
        ),
    }
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if let Some(dir) = config_path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&HumorConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace, &BTreeMap::new())?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
