//! DTMF test fixture generator CLI

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use tracing::{error, info};

use dtmf_testgen::{
    config::GeneratorConfig,
    interfaces::wav::{read_wav, write_wav},
    services::{PinDirectory, PlanSummary, RenderManifest, SequenceComposer, TestPlan},
    utils::setup_logging,
    Error, Result,
};

#[derive(Parser)]
#[command(name = "dtmf-testgen")]
#[command(about = "DTMF PIN test fixture generator")]
#[command(version = dtmf_testgen::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the test plan to a WAV file
    Generate {
        /// Output WAV path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Test plan file (.toml or .json), defaults to the reference plan
        #[arg(short, long)]
        plan: Option<PathBuf>,
        /// Duplicate the signal into two channels
        #[arg(long)]
        stereo: bool,
        /// Sample rate in Hz
        #[arg(long)]
        sample_rate: Option<u32>,
        /// Skip the JSON segment manifest
        #[arg(long)]
        no_manifest: bool,
    },
    /// Show the scenarios and resulting file size without rendering
    Plan {
        #[arg(short, long)]
        plan: Option<PathBuf>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Cross-check the plan against the decoder's PIN code file
    CheckPins {
        /// PIN=function file, defaults to decoder.pin_file
        #[arg(long)]
        pins: Option<PathBuf>,
        #[arg(short, long)]
        plan: Option<PathBuf>,
    },
    /// Compare an existing WAV file against a fresh render
    Verify {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        plan: Option<PathBuf>,
    },
    /// Validate configuration
    ValidateConfig,
    /// Generate default configuration
    GenerateConfig {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_configuration(&cli)?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(Commands::Generate {
        output,
        stereo,
        sample_rate,
        no_manifest,
        ..
    }) = &cli.command
    {
        if let Some(output) = output {
            config.output.path = output.display().to_string();
        }
        if *stereo {
            config.audio.channels = 2;
        }
        if let Some(rate) = sample_rate {
            config.audio.sample_rate = *rate;
        }
        if *no_manifest {
            config.output.write_manifest = false;
        }
    }

    // Held until exit so buffered file logs get flushed
    let _log_guard = setup_logging(&config.logging)?;

    info!("Starting {} v{}", dtmf_testgen::NAME, dtmf_testgen::VERSION);

    match &cli.command {
        Some(Commands::Generate { plan, .. }) => generate(&config, plan.as_deref()).map(|_| ()),
        None => generate(&config, None).map(|_| ()),
        Some(Commands::Plan { plan, json }) => show_plan(&config, plan.as_deref(), *json),
        Some(Commands::CheckPins { pins, plan }) => check_pins(&config, pins.as_deref(), plan.as_deref()),
        Some(Commands::Verify { input, plan }) => verify(&config, input, plan.as_deref()),
        Some(Commands::ValidateConfig) => validate_configuration(&config),
        Some(Commands::GenerateConfig { output }) => generate_default_config(output.clone()),
    }
}

fn load_configuration(cli: &Cli) -> Result<GeneratorConfig> {
    // A malformed DTMFGEN_* variable aborts the run rather than falling back
    let config = if let Some(config_path) = &cli.config {
        GeneratorConfig::load_from_file(config_path)?
    } else {
        GeneratorConfig::load_from_env()?
    };

    Ok(config)
}

fn load_plan(config: &GeneratorConfig, plan_path: Option<&Path>) -> Result<TestPlan> {
    let configured = config.output.plan_file.as_deref().map(Path::new);
    match plan_path.or(configured) {
        Some(path) => TestPlan::load_from_file(path),
        None => Ok(TestPlan::reference()),
    }
}

fn generate(config: &GeneratorConfig, plan_path: Option<&Path>) -> Result<PlanSummary> {
    let composer = SequenceComposer::from_config(config)?;
    let plan = load_plan(config, plan_path)?;

    info!("Generating {} scenarios into {}", plan.len(), config.output.path);
    let (audio, manifest) = composer.render_with_manifest(&plan)?;

    let output_path = Path::new(&config.output.path);
    write_wav(output_path, &audio)?;
    if config.output.write_manifest {
        manifest.write_to_file(RenderManifest::path_for(output_path))?;
    }

    let summary = composer.summarize(&plan)?;
    if summary.total_frames != audio.len() {
        return Err(Error::internal(format!(
            "rendered {} frames, expected {}",
            audio.len(),
            summary.total_frames
        )));
    }

    println!("{} Generated: {}", "✓".green(), output_path.display());
    print_summary(&summary);
    Ok(summary)
}

fn print_summary(summary: &PlanSummary) {
    println!("  Duration: {:.2} seconds", summary.duration_secs);
    println!("  Data size: {:.1} KB", summary.data_bytes as f64 / 1024.0);
    println!("  Sample rate: {} Hz", summary.sample_rate);
    println!("  Channels: {}", summary.channels);
    println!("  Test sequences: {}", summary.scenarios);
    println!("  Valid PINs: {}", summary.valid);
    println!("  Invalid PINs: {}", summary.invalid);
    println!("  Timeout tests: {}", summary.timeouts);
}

#[derive(Serialize)]
struct PlanReport<'a> {
    plan: &'a TestPlan,
    summary: PlanSummary,
}

fn show_plan(config: &GeneratorConfig, plan_path: Option<&Path>, json: bool) -> Result<()> {
    let composer = SequenceComposer::from_config(config)?;
    let plan = load_plan(config, plan_path)?;
    let summary = composer.summarize(&plan)?;

    if json {
        let report = PlanReport { plan: &plan, summary };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let sample_rate = composer.synthesizer().sample_rate() as f64;
    for (index, scenario) in plan.iter().enumerate() {
        let frames = composer.scenario_frames(scenario)?;
        println!(
            "{:>3}  {:<20} {:<8} {:>7.2}s  {}",
            index,
            scenario.outcome.to_string().cyan(),
            scenario.pin.to_string().bold(),
            frames as f64 / sample_rate,
            scenario.label
        );
    }
    println!();
    print_summary(&summary);
    Ok(())
}

fn check_pins(config: &GeneratorConfig, pins: Option<&Path>, plan_path: Option<&Path>) -> Result<()> {
    let pin_path = pins
        .map(Path::to_path_buf)
        .or_else(|| config.decoder.pin_file.as_ref().map(PathBuf::from))
        .ok_or_else(|| Error::parse("No PIN file given (use --pins or decoder.pin_file)"))?;

    let directory = PinDirectory::load_from_file(&pin_path)?;
    let plan = load_plan(config, plan_path)?;
    let issues = plan.check_against(&directory);

    if issues.is_empty() {
        println!(
            "{} {} scenarios agree with {} PIN codes in {}",
            "✓".green(),
            plan.len(),
            directory.len(),
            pin_path.display()
        );
        return Ok(());
    }

    for issue in &issues {
        println!("{} {}", "✗".red(), issue);
    }
    Err(Error::invalid_plan(format!(
        "{} scenario(s) disagree with {}",
        issues.len(),
        pin_path.display()
    )))
}

fn verify(config: &GeneratorConfig, input: &Path, plan_path: Option<&Path>) -> Result<()> {
    let recorded = read_wav(input)?;

    // Render with the file's own layout; timing still comes from config
    let mut config = config.clone();
    config.audio.sample_rate = recorded.sample_rate();
    config.audio.channels = recorded.channels();

    let composer = SequenceComposer::from_config(&config)?;
    let plan = load_plan(&config, plan_path)?;
    let expected = composer.render_test_plan(&plan)?;

    if recorded.len() != expected.len() {
        return Err(Error::configuration_mismatch(format!(
            "{} has {} frames, the plan renders {}",
            input.display(),
            recorded.len(),
            expected.len()
        )));
    }

    let mismatch = (0..expected.len()).find(|&i| recorded.frame(i) != expected.frame(i));
    if let Some(frame) = mismatch {
        return Err(Error::configuration_mismatch(format!(
            "{} differs from the plan at frame {} ({:.4}s)",
            input.display(),
            frame,
            frame as f64 / expected.sample_rate() as f64
        )));
    }

    println!(
        "{} {} matches the plan ({} frames)",
        "✓".green(),
        input.display(),
        expected.len()
    );
    Ok(())
}

fn validate_configuration(config: &GeneratorConfig) -> Result<()> {
    info!("Validating configuration...");

    config.validate()?;

    println!("✓ Configuration is valid");
    println!("  Sample rate: {} Hz", config.audio.sample_rate);
    println!("  Channels: {}", config.audio.channels);
    println!("  Inter-digit timeout: {} ms", config.decoder.inter_digit_timeout_ms);
    println!("  Entry timeout: {} ms", config.decoder.entry_timeout_ms);
    println!("  Output: {}", config.output.path);

    Ok(())
}

fn generate_default_config(output_path: Option<PathBuf>) -> Result<()> {
    let config = GeneratorConfig::default_config();
    let toml_content = toml::to_string_pretty(&config)
        .map_err(|e| Error::internal(format!("Failed to serialize config: {}", e)))?;

    match output_path {
        Some(path) => {
            std::fs::write(&path, toml_content)?;
            println!("✓ Default configuration written to: {}", path.display());
        }
        None => {
            println!("{}", toml_content);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> GeneratorConfig {
        let mut config = GeneratorConfig::default_config();
        config.output.path = dir.path().join("test_dtmf.wav").display().to_string();
        config
    }

    #[test]
    fn test_default_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dtmf-testgen.toml");

        generate_default_config(Some(path.clone())).unwrap();
        let loaded = GeneratorConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, GeneratorConfig::default_config());
    }

    #[test]
    fn test_bad_environment_config_aborts() {
        let cli = Cli {
            command: None,
            config: None,
            log_level: None,
        };

        std::env::set_var("DTMFGEN_AUDIO__SAMPLE_RATE", "abc");
        let result = load_configuration(&cli);
        std::env::remove_var("DTMFGEN_AUDIO__SAMPLE_RATE");

        assert!(matches!(result, Err(Error::Config(_))));
        assert_eq!(load_configuration(&cli).unwrap().audio.sample_rate, 8000);
    }

    #[test]
    fn test_config_validation() {
        let config = GeneratorConfig::default_config();
        assert!(validate_configuration(&config).is_ok());
    }

    #[test]
    fn test_generate_then_verify() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);

        let summary = generate(&config, None).unwrap();
        assert_eq!(summary.total_frames, 731_200);

        let wav_path = PathBuf::from(&config.output.path);
        let recorded = read_wav(&wav_path).unwrap();
        assert_eq!(recorded.len(), 731_200);
        assert!(RenderManifest::path_for(&wav_path).exists());

        assert!(verify(&config, &wav_path, None).is_ok());
    }

    #[test]
    fn test_verify_detects_wrong_plan() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);
        generate(&config, None).unwrap();

        let plan_path = temp_dir.path().join("short.toml");
        std::fs::write(
            &plan_path,
            "[[scenarios]]\npin = \"1234\"\nlabel = \"open_door\"\noutcome = \"valid\"\n",
        )
        .unwrap();

        let wav_path = PathBuf::from(&config.output.path);
        assert!(matches!(
            verify(&config, &wav_path, Some(plan_path.as_path())),
            Err(Error::ConfigurationMismatch(_))
        ));
    }

    #[test]
    fn test_check_pins_reports_conflicts() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);
        let pins = temp_dir.path().join("codes.pin");
        std::fs::write(&pins, "1234=open_door\n").unwrap();

        assert!(matches!(
            check_pins(&config, Some(pins.as_path()), None),
            Err(Error::InvalidPlan(_))
        ));
        assert!(check_pins(&config, None, None).is_err());
    }
}
