use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use channel_calibrator::analysis::{analyze_recording, rms_db, SpectrumAnalyzer};
use channel_calibrator::config::SETTINGS_FILE;
use channel_calibrator::{
    CalibrationSession, CaptureSession, CpalCaptureSession, FrequencyTicks, Localizer, Settings,
    StringTable, SyntheticCaptureSession,
};
use clap::{Parser, Subcommand};

#[path = "calibrator/report.rs"]
mod report;
use report::{
    channel_payload, status_lines, AnalyzePayload, DevicesPayload, ErrorPayload, OutcomePayload,
    TestAllPayload,
};

#[derive(Parser, Debug)]
#[command(
    name = "calibrator",
    about = "Match speaker channel levels by playing white noise and recording it back"
)]
struct Cli {
    /// Settings file (created on --save-settings)
    #[arg(long, global = true, default_value = SETTINGS_FILE)]
    settings: PathBuf,
    /// Use a simulated loopback instead of audio hardware
    #[arg(long, global = true)]
    synthetic: bool,
    /// Output channels of the simulated device
    #[arg(long, global = true, default_value_t = 2)]
    channels: usize,
    /// Comma-separated per-channel gains of the simulated device
    #[arg(long, global = true)]
    gains: Option<String>,
    /// Sample rate of the simulated device
    #[arg(long, global = true, default_value_t = 48000)]
    sample_rate: u32,
    /// Comma-separated frequency ticks in Hz (overrides settings)
    #[arg(long, global = true)]
    ticks: Option<String>,
    /// Stimulus duration in seconds (overrides settings)
    #[arg(long, global = true)]
    duration: Option<f64>,
    /// Write the session settings back after the command
    #[arg(long, global = true)]
    save_settings: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List input and output devices
    Devices,
    /// Test a single channel and print its level and verdicts
    Test {
        /// Zero-based output channel index
        #[arg(long)]
        channel: usize,
    },
    /// Test every channel in order, skipping channels that fail
    TestAll,
    /// Print the frequency response of a mono WAV recording
    /// (8/16/24/32-bit PCM or 32-bit float)
    Analyze {
        #[arg(long)]
        wav: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let settings = Settings::load_from_file(&cli.settings);
    let localizer = StringTable::for_setting(&settings.language);
    let session = CalibrationSession::new(build_capture(&cli)?, settings);

    if let Some(ticks) = &cli.ticks {
        session
            .apply_frequency_ticks(ticks)
            .map_err(|err| anyhow!(localizer.calibration_error_text(&err)))?;
    }
    if let Some(duration) = cli.duration {
        session.set_test_duration(duration)?;
    }

    let code = match &cli.command {
        Commands::Devices => run_devices(&session)?,
        Commands::Test { channel } => run_test(&session, *channel, &localizer)?,
        Commands::TestAll => run_test_all(&session, &localizer)?,
        Commands::Analyze { wav } => run_analyze(wav, &session.frequency_ticks()?)?,
    };

    if cli.save_settings {
        session
            .settings()?
            .save_to_file(&cli.settings)
            .with_context(|| format!("writing {}", cli.settings.display()))?;
    }

    Ok(code)
}

fn build_capture(cli: &Cli) -> Result<Arc<dyn CaptureSession>> {
    if !cli.synthetic {
        return Ok(Arc::new(CpalCaptureSession::new()));
    }

    let gains = match &cli.gains {
        Some(list) => parse_gains(list)?,
        None => vec![1.0; cli.channels],
    };
    Ok(Arc::new(
        SyntheticCaptureSession::new(gains.len(), cli.sample_rate).with_gains(gains),
    ))
}

fn parse_gains(list: &str) -> Result<Vec<f32>> {
    list.split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .with_context(|| format!("invalid gain {:?}", part))
        })
        .collect()
}

fn run_devices(session: &CalibrationSession) -> Result<ExitCode> {
    let inputs = session.input_devices()?;
    let outputs = session.output_devices()?;
    let layout = if outputs.is_empty() {
        Vec::new()
    } else {
        let settings = session.settings()?;
        session.select_devices(settings.input_device_index, settings.output_device_index)?
    };

    print_json(&DevicesPayload {
        inputs,
        outputs,
        layout,
    })?;
    Ok(ExitCode::from(0))
}

fn run_test(
    session: &CalibrationSession,
    channel: usize,
    localizer: &dyn Localizer,
) -> Result<ExitCode> {
    let report = match session.test_channel(channel) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("{}", serde_json::to_string_pretty(&ErrorPayload::new(&err, localizer))?);
            return Ok(ExitCode::from(2));
        }
    };

    let response = if session.settings()?.auto_show_fr {
        Some(session.channel_response(channel)?)
    } else {
        None
    };
    let layout = session.channel_layout()?;

    print_json(&channel_payload(&report, &layout, localizer, response))?;
    Ok(ExitCode::from(0))
}

fn run_test_all(session: &CalibrationSession, localizer: &dyn Localizer) -> Result<ExitCode> {
    let cancel = AtomicBool::new(false);
    let outcomes = session.test_all_channels(&cancel)?;

    let statuses = session.channel_statuses()?;
    let layout = session.channel_layout()?;
    let payload = TestAllPayload {
        outcomes: outcomes
            .iter()
            .map(|outcome| OutcomePayload::new(outcome, localizer))
            .collect(),
        status_lines: status_lines(&statuses, &layout, localizer),
        statuses,
        overall: session.overall_response().ok(),
    };

    print_json(&payload)?;
    Ok(ExitCode::from(0))
}

fn run_analyze(path: &Path, ticks: &FrequencyTicks) -> Result<ExitCode> {
    let (samples, sample_rate) = read_wav(path)?;
    if samples.is_empty() {
        bail!("{} contains no samples", path.display());
    }

    let response = analyze_recording(&SpectrumAnalyzer::new(), &samples, sample_rate, ticks);
    let file = path.display().to_string();
    print_json(&AnalyzePayload {
        file: &file,
        sample_rate,
        samples: samples.len(),
        rms_db: rms_db(&samples),
        response,
    })?;
    Ok(ExitCode::from(0))
}

fn print_json<T: serde::Serialize>(payload: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}

/// Mono WAV as normalized f32 samples
fn read_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let wav_spec = reader.spec();
    if wav_spec.channels != 1 {
        bail!(
            "{} must be mono (found {} channels)",
            path.display(),
            wav_spec.channels
        );
    }

    let samples = match wav_spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| anyhow!(err)))
            .collect::<Result<Vec<f32>>>()?,
        hound::SampleFormat::Int => {
            let max = ((1i64 << (wav_spec.bits_per_sample - 1)) - 1) as f32;
            match wav_spec.bits_per_sample {
                8 => reader
                    .samples::<i8>()
                    .map(|sample| sample.map(|v| v as f32 / max).map_err(|err| anyhow!(err)))
                    .collect::<Result<Vec<f32>>>()?,
                16 => reader
                    .samples::<i16>()
                    .map(|sample| sample.map(|v| v as f32 / max).map_err(|err| anyhow!(err)))
                    .collect::<Result<Vec<f32>>>()?,
                24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|v| v as f32 / max).map_err(|err| anyhow!(err)))
                    .collect::<Result<Vec<f32>>>()?,
                other => bail!(
                    "Unsupported bits per sample {} in {}",
                    other,
                    path.display()
                ),
            }
        }
    };

    Ok((samples, wav_spec.sample_rate))
}
