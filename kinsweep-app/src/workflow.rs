use crate::config::SweepPlan;
use crate::plotting::{self, ChartLabels};
use anyhow::{Context, Result};
use kinsweep_core::{
    analysis,
    grid::Grid,
    logger::TableWriter,
    simulation::{builder::SweepBuilder, network::NetworkModel, state::SweepSummary},
};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

/// Written next to the table once a sweep ends, successfully or not.
#[derive(Debug, Serialize)]
pub struct RunRecord<'a> {
    pub name: &'a str,
    pub model: String,
    pub grid_points: usize,
    pub completed: bool,
    pub error: Option<String>,
    pub table: String,
    pub dump: String,
    pub summary: &'a SweepSummary,
}

/// Runs one sweep end to end: loads the model, drives every grid point and writes the
/// report, table, dump and summary files.
pub fn run_sweep(plan: &SweepPlan) -> Result<SweepSummary> {
    let paths = &plan.paths;
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("Failed to create output directory: {}", paths.dir.display()))?;

    if let Some(request_file) = &plan.request_file {
        if let Some(file_name) = request_file.file_name() {
            // Copy the request file to the output directory for traceability
            fs::copy(request_file, paths.dir.join(file_name)).with_context(|| {
                format!("Failed to copy request file: {}", request_file.display())
            })?;
        }
    }

    let model = NetworkModel::load(&plan.model_path)
        .with_context(|| format!("Failed to load model: {}", plan.model_path.display()))?;
    let grid = Grid::from_spec(&plan.request.grid).context("Invalid sweep grid")?;
    let grid_points = grid.len();

    let mut builder = SweepBuilder::new()
        .with_model(model)
        .with_grid(grid)
        .with_time_course(plan.request.time_course.clone())
        .with_presets(plan.request.presets.clone())
        .with_report_path(&paths.report)
        .with_table_output(&paths.table)
        .with_dump_output(&paths.dump)
        .with_lead_column(plan.request.lead_column)
        .with_failure_policy(plan.request.on_failure);
    if let Some(columns) = &plan.request.columns {
        builder = builder.with_columns(columns.clone());
    }
    let mut engine = builder.build()?;

    info!(
        name = %plan.request.name,
        model = %plan.model_path.display(),
        points = grid_points,
        "running sweep"
    );
    let outcome = engine.run();

    let record = RunRecord {
        name: &plan.request.name,
        model: plan.model_path.display().to_string(),
        grid_points,
        completed: outcome.is_ok(),
        error: outcome.as_ref().err().map(|e| e.to_string()),
        table: paths.table.display().to_string(),
        dump: paths.dump.display().to_string(),
        summary: engine.summary(),
    };
    let json = serde_json::to_string_pretty(&record)?;
    fs::write(&paths.summary, json)
        .with_context(|| format!("Failed to write summary: {}", paths.summary.display()))?;

    print_summary(&record);
    outcome.with_context(|| format!("Sweep '{}' stopped early", plan.request.name))?;
    Ok(engine.summary().clone())
}

fn print_summary(record: &RunRecord) {
    println!("\n--- [Sweep Summary] {} ---", record.name);
    println!("Model: {}", record.model);
    println!(
        "Grid points: {} attempted of {}",
        record.summary.attempted, record.grid_points
    );
    println!("Rows collected: {}", record.summary.succeeded);
    if !record.summary.failures.is_empty() {
        println!("Skipped points:");
        for failure in &record.summary.failures {
            match &failure.tag {
                Some(tag) => println!("  - {} {}: {}", failure.sequence, tag, failure.reason),
                None => println!("  - {}: {}", failure.sequence, failure.reason),
            }
        }
    }
    if let Some(error) = &record.error {
        println!("Stopped: {}", error);
    }
    println!("Table: {}", record.table);
    println!("Dump: {}", record.dump);
}

/// `<dir>/<stem>_<state>.txt` next to the input table.
fn filtered_path(table: &Path, state: &str) -> PathBuf {
    let stem = table
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table");
    table.with_file_name(format!("{}_{}.txt", stem, state))
}

/// Keeps the rows whose tag contains `state` and writes them as a new table.
pub fn filter_table(table_path: &Path, state: &str, output: Option<&Path>) -> Result<PathBuf> {
    let table = analysis::read_table(table_path)
        .with_context(|| format!("Failed to read table: {}", table_path.display()))?;
    let filtered = analysis::filter_by_state(&table, state);
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| filtered_path(table_path, state));
    TableWriter::write_table(&output, &filtered)?;
    println!(
        "Kept {} of {} rows matching '{}' in {}",
        filtered.len(),
        table.len(),
        state,
        output.display()
    );
    Ok(output)
}

fn chart_path(table: &Path, suffix: &str) -> PathBuf {
    let stem = table
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table");
    table.with_file_name(format!("{}_{}.png", stem, suffix))
}

/// Line chart of column `y` against column `x`, or against the lead column.
pub fn plot_table_line(
    table_path: &Path,
    y: &str,
    x: Option<&str>,
    log_x: bool,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let table = analysis::read_table(table_path)
        .with_context(|| format!("Failed to read table: {}", table_path.display()))?;
    let points = analysis::series(&table, x, y)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| chart_path(table_path, y));

    let x_label = x.unwrap_or("sweep");
    let caption = format!("{} vs {}", y, x_label);
    plotting::plot_line(
        &output,
        &ChartLabels {
            caption: &caption,
            x: x_label,
            y,
        },
        &points,
        log_x,
    )?;
    info!(chart = %output.display(), points = points.len(), "line chart written");
    Ok(output)
}

/// Bar chart of every tagged row of one sequence index.
pub fn plot_table_bars(
    table_path: &Path,
    iteration: usize,
    column: Option<&str>,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let table = analysis::read_table(table_path)
        .with_context(|| format!("Failed to read table: {}", table_path.display()))?;
    let bars = analysis::bar_series(&table, iteration, column)?;
    let y_label = match column {
        Some(name) => name.to_string(),
        None => table
            .header()
            .and_then(|h| h.columns().last().cloned())
            .unwrap_or_default(),
    };
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| chart_path(table_path, &format!("iteration_{}", iteration)));

    let caption = format!("Iteration {}", iteration);
    plotting::plot_bars(
        &output,
        &ChartLabels {
            caption: &caption,
            x: "state",
            y: &y_label,
        },
        &bars,
    )?;
    info!(chart = %output.display(), bars = bars.len(), "bar chart written");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{concentration_plan, ConcentrationArgs, SweepOptions};
    use kinsweep_schemas::sweep::FailurePolicy;
    use tempfile::tempdir;

    const DECAY: &str = r#"
schema_version: "1.0"
network:
  name: decay
  species:
    - id: A
      initial_concentration: 1.0
    - id: B
      initial_concentration: 0.0
  reactions:
    - id: R1
      reactants: [{ species: A }]
      products: [{ species: B }]
      parameters: { k1: 0.1 }
      kinetics: { type: mass_action, rate_constant: k1 }
"#;

    #[test]
    fn concentration_sweep_writes_every_output_file() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("decay.yaml");
        fs::write(&model, DECAY).unwrap();

        let plan = concentration_plan(&ConcentrationArgs {
            model: model.clone(),
            min: 1.0,
            max: 3.0,
            iterations: 3,
            duration: 5,
            species: "A".to_string(),
            options: SweepOptions {
                output_dir: None,
                columns: None,
                on_failure: FailurePolicy::Skip,
            },
        })
        .unwrap();
        let summary = run_sweep(&plan).unwrap();
        assert_eq!(summary.succeeded, 3);

        let table = fs::read_to_string(dir.path().join("Parsed_decay_output.txt")).unwrap();
        assert_eq!(table.lines().next(), Some("time, A, B"));
        assert_eq!(table.lines().count(), 4);
        assert!(dir.path().join("decay_output.txt").exists());
        assert!(dir.path().join("Dump_decay_output.txt").exists());

        let record: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("decay_summary.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(record["completed"], true);
        assert_eq!(record["summary"]["succeeded"], 3);
    }

    #[test]
    fn unknown_species_still_leaves_a_summary() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("decay.yaml");
        fs::write(&model, DECAY).unwrap();

        let plan = concentration_plan(&ConcentrationArgs {
            model,
            min: 0.0,
            max: 1.0,
            iterations: 2,
            duration: 5,
            species: "inducer_1".to_string(),
            options: SweepOptions::default(),
        })
        .unwrap();
        assert!(run_sweep(&plan).is_err());

        let record: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("decay_summary.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(record["completed"], false);
        assert!(record["error"].as_str().unwrap().contains("inducer_1"));
    }

    #[test]
    fn filter_writes_next_to_the_input_table() {
        let dir = tempdir().unwrap();
        let table = dir.path().join("Parsed_m_output.txt");
        fs::write(
            &table,
            "time, A, B\n1 A0B0 5 0 0\n1 A1B0 5 0.5 0\n1 A1B1 5 0.5 0.5\n",
        )
        .unwrap();

        let output = filter_table(&table, "A1", None).unwrap();
        assert_eq!(output, dir.path().join("Parsed_m_output_A1.txt"));
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "time, A, B\n1 A1B0 5 0.5 0\n1 A1B1 5 0.5 0.5\n"
        );
    }
}
