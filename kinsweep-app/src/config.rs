use anyhow::{bail, Context, Result};
use clap::Args;
use kinsweep_schemas::{
    file_formats::SweepFile,
    sweep::{
        Assignment, AxisLevels, FailurePolicy, GridSpec, LeadColumn, SweepRequest, Target,
        TernaryAxis, TimeCourse,
    },
};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Flags shared by every sweep command.
#[derive(Args, Debug, Clone, Default)]
pub struct SweepOptions {
    /// Directory for the report, table, dump and summary files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Report columns to keep, by header name (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,

    /// `skip` a failed grid point or `abort` the sweep
    #[arg(long, default_value = "skip")]
    pub on_failure: FailurePolicy,
}

/// Sweeps the initial concentration of one species.
#[derive(Args, Debug, Clone)]
pub struct ConcentrationArgs {
    /// Reaction-network model (.yaml, .yml or .json)
    pub model: PathBuf,
    pub min: f64,
    pub max: f64,
    #[arg(default_value_t = 10)]
    pub iterations: usize,
    /// Simulated seconds; one report row per second
    #[arg(default_value_t = 50000)]
    pub duration: usize,
    #[arg(default_value = "inducer_1")]
    pub species: String,
    #[command(flatten)]
    pub options: SweepOptions,
}

/// Sweeps one kinetic parameter while an input species is held at a preset value.
#[derive(Args, Debug, Clone)]
pub struct ParameterArgs {
    pub model: PathBuf,
    pub min: f64,
    pub max: f64,
    pub iterations: usize,
    pub duration: usize,
    /// Reaction whose parameter is swept
    pub reaction: String,
    #[arg(default_value = "k1")]
    pub parameter: String,
    /// Species preset before the sweep starts
    #[arg(default_value = "inducer_1")]
    pub input: String,
    #[arg(default_value_t = 0.005)]
    pub input_conc: f64,
    #[command(flatten)]
    pub options: SweepOptions,
}

/// Crosses low, middle and high levels of two inputs.
#[derive(Args, Debug, Clone)]
pub struct TernaryArgs {
    pub model: PathBuf,
    pub min: f64,
    pub max: f64,
    #[arg(default_value_t = 10)]
    pub iterations: usize,
    #[arg(default_value_t = 5000)]
    pub duration: usize,
    /// Divisor placing the middle level between the low and high levels
    #[arg(default_value_t = 2.0)]
    pub ratio: f64,
    /// Axis B levels as a multiple of axis A levels
    #[arg(default_value_t = 1.0)]
    pub b_ratio: f64,
    /// Holds axis A at this concentration and sweeps axis B instead
    #[arg(long)]
    pub fixed_a: Option<f64>,
    #[arg(long, default_value = "Inducer_A")]
    pub species_a: String,
    #[arg(long, default_value = "Inducer_B")]
    pub species_b: String,
    #[command(flatten)]
    pub options: SweepOptions,
}

/// Where a sweep writes its files.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub dir: PathBuf,
    pub report: PathBuf,
    pub table: PathBuf,
    pub dump: PathBuf,
    pub summary: PathBuf,
}

impl OutputPaths {
    /// For a model `m.yaml` and suffix `_output.txt`: `m_output.txt`,
    /// `Parsed_m_output.txt`, `Dump_m_output.txt` and `m_summary.json`.
    pub fn for_model(dir: &Path, model: &Path, suffix: &str) -> Result<Self> {
        let stem = model_stem(model)?;
        let report_name = format!("{}{}", stem, suffix);
        Ok(Self {
            dir: dir.to_path_buf(),
            report: dir.join(&report_name),
            table: dir.join(format!("Parsed_{}", report_name)),
            dump: dir.join(format!("Dump_{}", report_name)),
            summary: dir.join(format!("{}_summary.json", stem)),
        })
    }
}

/// Everything needed to run one sweep.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub model_path: PathBuf,
    pub request: SweepRequest,
    pub paths: OutputPaths,
    /// The request file, copied next to the outputs when present.
    pub request_file: Option<PathBuf>,
}

fn model_stem(model: &Path) -> Result<String> {
    model
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("Model path '{}' has no file name", model.display()))
}

/// The model's own directory, or the current one for a bare file name.
fn default_output_dir(model: &Path) -> PathBuf {
    match model.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn plan(
    model: &Path,
    request: SweepRequest,
    options_dir: Option<&Path>,
    suffix: &str,
) -> Result<SweepPlan> {
    let dir = options_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_dir(model));
    Ok(SweepPlan {
        model_path: model.to_path_buf(),
        paths: OutputPaths::for_model(&dir, model, suffix)?,
        request,
        request_file: None,
    })
}

pub fn concentration_plan(args: &ConcentrationArgs) -> Result<SweepPlan> {
    let request = SweepRequest {
        name: model_stem(&args.model)?,
        model: args.model.display().to_string(),
        time_course: TimeCourse::per_second(args.duration),
        grid: GridSpec::Linear {
            target: Target::species(args.species.as_str()),
            min: args.min,
            max: args.max,
            iterations: args.iterations,
        },
        presets: Vec::new(),
        columns: args.options.columns.clone(),
        lead_column: LeadColumn::Index,
        on_failure: args.options.on_failure,
        output_dir: None,
    };
    plan(
        &args.model,
        request,
        args.options.output_dir.as_deref(),
        "_output.txt",
    )
}

pub fn parameter_plan(args: &ParameterArgs) -> Result<SweepPlan> {
    let request = SweepRequest {
        name: model_stem(&args.model)?,
        model: args.model.display().to_string(),
        time_course: TimeCourse::per_second(args.duration),
        grid: GridSpec::Linear {
            target: Target::parameter(args.reaction.as_str(), args.parameter.as_str()),
            min: args.min,
            max: args.max,
            iterations: args.iterations,
        },
        presets: vec![Assignment {
            target: Target::species(args.input.as_str()),
            value: args.input_conc,
        }],
        columns: args.options.columns.clone(),
        lead_column: LeadColumn::Value,
        on_failure: args.options.on_failure,
        output_dir: None,
    };
    plan(
        &args.model,
        request,
        args.options.output_dir.as_deref(),
        "_p_output.txt",
    )
}

pub fn ternary_plan(args: &TernaryArgs) -> Result<SweepPlan> {
    let swept = AxisLevels::Swept {
        min: args.min,
        max: args.max,
    };
    let (levels_a, levels_b) = match args.fixed_a {
        Some(value) => (AxisLevels::Fixed { value }, swept),
        None => (
            swept,
            AxisLevels::Scaled {
                factor: args.b_ratio,
            },
        ),
    };
    let request = SweepRequest {
        name: model_stem(&args.model)?,
        model: args.model.display().to_string(),
        time_course: TimeCourse::per_second(args.duration),
        grid: GridSpec::Ternary {
            iterations: args.iterations,
            ratio: args.ratio,
            axis_a: TernaryAxis {
                target: Target::species(args.species_a.as_str()),
                label: "A".to_string(),
                levels: levels_a,
            },
            axis_b: TernaryAxis {
                target: Target::species(args.species_b.as_str()),
                label: "B".to_string(),
                levels: levels_b,
            },
        },
        presets: Vec::new(),
        columns: args.options.columns.clone(),
        lead_column: LeadColumn::Index,
        on_failure: args.options.on_failure,
        output_dir: None,
    };
    plan(
        &args.model,
        request,
        args.options.output_dir.as_deref(),
        "_output.txt",
    )
}

/// Loads a sweep request file. The model path inside it is relative to the file.
///
/// The output directory is `output_dir` if given, then the request's own
/// `output_dir`, then `runs/<name>_<timestamp>`.
pub fn request_plan(path: &Path, output_dir: Option<&Path>) -> Result<SweepPlan> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file: {}", path.display()))?;
    let file: SweepFile = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse YAML from {}", path.display()))?;
    let request = file.sweep;
    if request.name.trim().is_empty() {
        bail!("Request '{}' has an empty name", path.display());
    }

    let base = default_output_dir(path);
    let model_path = base.join(&request.model);
    let dir = match (output_dir, &request.output_dir) {
        (Some(dir), _) => dir.to_path_buf(),
        (None, Some(dir)) => base.join(dir),
        (None, None) => PathBuf::from("runs").join(format!(
            "{}_{}",
            request.name,
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        )),
    };
    let suffix = match request.lead_column {
        LeadColumn::Value => "_p_output.txt",
        LeadColumn::Index => "_output.txt",
    };

    Ok(SweepPlan {
        paths: OutputPaths::for_model(&dir, &model_path, suffix)?,
        model_path,
        request,
        request_file: Some(path.to_path_buf()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[derive(Parser)]
    struct Harness<T: Args> {
        #[command(flatten)]
        args: T,
    }

    fn parse<T: Args>(argv: &[&str]) -> T {
        let argv = std::iter::once("kinsweep").chain(argv.iter().copied());
        Harness::<T>::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn concentration_defaults_follow_the_classic_script() {
        let args: ConcentrationArgs = parse(&["models/toggle.yaml", "0", "1"]);
        assert_eq!(args.iterations, 10);
        assert_eq!(args.duration, 50000);
        assert_eq!(args.species, "inducer_1");
        assert_eq!(args.options.on_failure, FailurePolicy::Skip);

        let plan = concentration_plan(&args).unwrap();
        assert_eq!(plan.request.time_course.expected_rows(), 50001);
        assert_eq!(
            plan.request.grid,
            GridSpec::Linear {
                target: Target::species("inducer_1"),
                min: 0.0,
                max: 1.0,
                iterations: 10,
            }
        );
        assert_eq!(plan.paths.report, Path::new("models/toggle_output.txt"));
        assert_eq!(plan.paths.table, Path::new("models/Parsed_toggle_output.txt"));
        assert_eq!(plan.paths.dump, Path::new("models/Dump_toggle_output.txt"));
        assert_eq!(plan.paths.summary, Path::new("models/toggle_summary.json"));
    }

    #[test]
    fn parameter_sweep_presets_its_input_and_leads_with_values() {
        let args: ParameterArgs = parse(&[
            "toggle.json",
            "0.1",
            "1",
            "4",
            "100",
            "R2",
            "--output-dir",
            "out",
            "--columns",
            "time,reporter",
            "--on-failure",
            "abort",
        ]);
        let plan = parameter_plan(&args).unwrap();

        assert_eq!(plan.request.lead_column, LeadColumn::Value);
        assert_eq!(plan.request.on_failure, FailurePolicy::Abort);
        assert_eq!(
            plan.request.columns,
            Some(vec!["time".to_string(), "reporter".to_string()])
        );
        assert_eq!(
            plan.request.presets,
            vec![Assignment {
                target: Target::species("inducer_1"),
                value: 0.005,
            }]
        );
        match &plan.request.grid {
            GridSpec::Linear { target, .. } => assert_eq!(target, &Target::parameter("R2", "k1")),
            other => panic!("expected a linear grid, got {:?}", other),
        }
        assert_eq!(plan.paths.report, Path::new("out/toggle_p_output.txt"));
        assert_eq!(plan.paths.table, Path::new("out/Parsed_toggle_p_output.txt"));
    }

    #[test]
    fn ternary_scales_axis_b_unless_axis_a_is_fixed() {
        let args: TernaryArgs = parse(&["m.yaml", "0", "2", "3", "10", "2", "0.5"]);
        let plan = ternary_plan(&args).unwrap();
        match &plan.request.grid {
            GridSpec::Ternary {
                iterations,
                axis_a,
                axis_b,
                ..
            } => {
                assert_eq!(*iterations, 3);
                assert_eq!(axis_a.levels, AxisLevels::Swept { min: 0.0, max: 2.0 });
                assert_eq!(axis_b.levels, AxisLevels::Scaled { factor: 0.5 });
                assert_eq!(axis_b.target, Target::species("Inducer_B"));
            }
            other => panic!("expected a ternary grid, got {:?}", other),
        }
        assert_eq!(plan.paths.dir, Path::new("."));

        let args: TernaryArgs = parse(&["m.yaml", "0", "2", "--fixed-a", "1.0"]);
        let plan = ternary_plan(&args).unwrap();
        match &plan.request.grid {
            GridSpec::Ternary { axis_a, axis_b, .. } => {
                assert_eq!(axis_a.levels, AxisLevels::Fixed { value: 1.0 });
                assert_eq!(axis_b.levels, AxisLevels::Swept { min: 0.0, max: 2.0 });
            }
            other => panic!("expected a ternary grid, got {:?}", other),
        }
        assert_eq!(plan.request.time_course.step_count(), 5000);
    }

    #[test]
    fn request_files_resolve_paths_next_to_themselves() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sweep.yaml");
        fs::write(
            &path,
            r#"
schema_version: "1.0"
sweep:
  name: dose
  model: models/toggle.yaml
  time_course:
    duration: 100
  grid:
    type: linear
    target: { type: initial_concentration, species: inducer_1 }
    min: 0.0
    max: 1.0
    iterations: 5
  output_dir: results
"#,
        )
        .unwrap();

        let plan = request_plan(&path, None).unwrap();
        assert_eq!(plan.model_path, dir.path().join("models/toggle.yaml"));
        assert_eq!(plan.paths.dir, dir.path().join("results"));
        assert_eq!(plan.paths.report, dir.path().join("results/toggle_output.txt"));
        assert_eq!(plan.request_file.as_deref(), Some(path.as_path()));

        let plan = request_plan(&path, Some(Path::new("elsewhere"))).unwrap();
        assert_eq!(plan.paths.dir, Path::new("elsewhere"));
    }

    #[test]
    fn request_without_output_dir_gets_a_timestamped_run_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sweep.yaml");
        fs::write(
            &path,
            r#"
schema_version: "1.0"
sweep:
  name: dose
  model: toggle.yaml
  time_course: { duration: 10 }
  grid:
    type: linear
    target: { type: reaction_parameter, reaction: R1, parameter: k1 }
    min: 0.1
    max: 1.0
    iterations: 2
  lead_column: value
"#,
        )
        .unwrap();

        let plan = request_plan(&path, None).unwrap();
        assert!(plan.paths.dir.starts_with("runs"));
        let dir_name = plan.paths.dir.file_name().unwrap().to_str().unwrap();
        assert!(dir_name.starts_with("dose_"));
        assert!(plan
            .paths
            .report
            .to_str()
            .unwrap()
            .ends_with("toggle_p_output.txt"));
    }

    #[test]
    fn malformed_request_is_reported_with_its_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "sweep: [").unwrap();
        let err = request_plan(&path, None).unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }
}
