use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ekg_lib::{
    config::ServiceConfig,
    context::{medical_context, PatientInfo},
    detectors::{AnnotatedPeaks, BeatDetector, PanTompkins},
    io::text as text_io,
    metrics::extract_features,
    pipeline::{AnalysisResponse, Analyzer},
    plot::{figure_from_ecg, PlotBackend, PngBackend},
    signal::{RPeakSet, TimeSeries},
};
use log::info;
use serde_json::json;
use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "ekg",
    version,
    about = "EKG: single-lead ECG rhythm analysis tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the waveform comes from and how to read it.
#[derive(Args, Clone)]
struct WaveformArgs {
    /// CSV table with a lead column; stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,
    /// TOML service configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// Sampling rate override (Hz)
    #[arg(long)]
    fs: Option<f64>,
    /// Lead column override (exact header text)
    #[arg(long)]
    column: Option<String>,
    /// Newline-delimited R-peak indices used instead of detection
    #[arg(long)]
    annotations: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect R-peaks in the lead column and print their sample indices
    EcgFindRpeaks {
        #[command(flatten)]
        waveform: WaveformArgs,
        #[arg(long)]
        min_rr_s: Option<f64>,
    },
    /// Print the 8-field RR-interval feature vector
    RrFeatures {
        #[command(flatten)]
        waveform: WaveformArgs,
    },
    /// Full pipeline: features → classification → annotated image, printed as response JSON
    Analyze {
        #[command(flatten)]
        waveform: WaveformArgs,
        /// Pre-trained model bundle (JSON); overrides `model_path` from the config
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long)]
        artifact_dir: Option<PathBuf>,
        #[arg(long)]
        artifact_url_prefix: Option<String>,
    },
    /// Render the waveform with R-peak markers to a PNG
    PlotEcg {
        #[command(flatten)]
        waveform: WaveformArgs,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 1600)]
        width: u32,
        #[arg(long, default_value_t = 400)]
        height: u32,
    },
    /// Render the patient summary text, optionally with an ECG label
    MedicalContext {
        /// Patient record (JSON)
        #[arg(long)]
        patient: PathBuf,
        #[arg(long)]
        ecg_label: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::EcgFindRpeaks { waveform, min_rr_s } => {
            cmd_ecg_find_rpeaks(&waveform, min_rr_s)?
        }
        Commands::RrFeatures { waveform } => cmd_rr_features(&waveform)?,
        Commands::Analyze {
            waveform,
            model,
            artifact_dir,
            artifact_url_prefix,
        } => cmd_analyze(&waveform, model, artifact_dir, artifact_url_prefix)?,
        Commands::PlotEcg {
            waveform,
            out,
            width,
            height,
        } => cmd_plot_ecg(&waveform, &out, (width, height))?,
        Commands::MedicalContext { patient, ecg_label } => {
            cmd_medical_context(&patient, ecg_label.as_deref())?
        }
    }
    Ok(())
}

fn load_config(args: &WaveformArgs) -> Result<ServiceConfig> {
    let mut cfg = match &args.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(fs) = args.fs {
        cfg.sampling_rate_hz = fs;
    }
    if let Some(column) = &args.column {
        cfg.lead_column = column.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn read_table(input: Option<&Path>) -> Result<Vec<u8>> {
    match input {
        Some(path) => {
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn load_time_series(args: &WaveformArgs, cfg: &ServiceConfig) -> Result<TimeSeries> {
    let ingestor = cfg.ingestor();
    let ts = match &args.input {
        Some(path) => ingestor.read_path(path)?,
        None => ingestor.read_bytes(&read_table(None)?)?,
    };
    Ok(ts)
}

fn detector_for(args: &WaveformArgs, cfg: &ServiceConfig) -> Result<Box<dyn BeatDetector>> {
    let detector: Box<dyn BeatDetector> = match &args.annotations {
        Some(path) => Box::new(AnnotatedPeaks::new(text_io::read_peak_indices(path)?)),
        None => Box::new(PanTompkins::new(cfg.detector)),
    };
    Ok(detector)
}

fn find_peaks(args: &WaveformArgs, cfg: &ServiceConfig, ts: &TimeSeries) -> Result<RPeakSet> {
    Ok(detector_for(args, cfg)?.detect(ts)?)
}

fn cmd_ecg_find_rpeaks(args: &WaveformArgs, min_rr_s: Option<f64>) -> Result<()> {
    let mut cfg = load_config(args)?;
    if let Some(min_rr_s) = min_rr_s {
        cfg.detector.min_rr_s = min_rr_s;
    }
    let ts = load_time_series(args, &cfg)?;
    let peaks = find_peaks(args, &cfg, &ts)?;
    println!("{}", serde_json::to_string(&peaks)?);
    Ok(())
}

fn cmd_rr_features(args: &WaveformArgs) -> Result<()> {
    let cfg = load_config(args)?;
    let ts = load_time_series(args, &cfg)?;
    let peaks = find_peaks(args, &cfg, &ts)?;
    let features = extract_features(&ts, &peaks);
    let out = json!({
        "fs": ts.fs(),
        "sample_count": ts.len(),
        "beats": peaks.len(),
        "features": features,
    });
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn cmd_analyze(
    args: &WaveformArgs,
    model: Option<PathBuf>,
    artifact_dir: Option<PathBuf>,
    artifact_url_prefix: Option<String>,
) -> Result<()> {
    let mut cfg = load_config(args)?;
    if let Some(model) = model {
        cfg.model_path = Some(model);
    }
    if let Some(dir) = artifact_dir {
        cfg.artifact_dir = dir;
    }
    if let Some(prefix) = artifact_url_prefix {
        cfg.artifact_url_prefix = prefix;
    }

    let result = Analyzer::from_config(&cfg).and_then(|analyzer| {
        let analyzer = match &args.annotations {
            Some(_) => analyzer.with_detector(detector_for(args, &cfg).map_err(|err| {
                ekg_lib::AnalysisError::MalformedInput(format!("{:#}", err))
            })?),
            None => analyzer,
        };
        let table = read_table(args.input.as_deref())
            .map_err(|err| ekg_lib::AnalysisError::MalformedInput(format!("{:#}", err)))?;
        analyzer.analyze_bytes(&table)
    });
    let (status, body) = AnalysisResponse::from_result(&result);
    println!("{}", serde_json::to_string(&body)?);
    if status != 200 {
        bail!("analysis failed with status {}", status);
    }
    Ok(())
}

fn cmd_plot_ecg(args: &WaveformArgs, out: &Path, size: (u32, u32)) -> Result<()> {
    let cfg = load_config(args)?;
    let ts = load_time_series(args, &cfg)?;
    let peaks = find_peaks(args, &cfg, &ts)?;
    let fig = figure_from_ecg(&ts, &peaks, cfg.max_plot_points);
    PngBackend::new(out, size).draw(&fig)?;
    info!("wrote {} ({} beats marked)", out.display(), peaks.len());
    Ok(())
}

fn cmd_medical_context(patient: &Path, ecg_label: Option<&str>) -> Result<()> {
    let text = fs::read_to_string(patient)
        .with_context(|| format!("failed to read {}", patient.display()))?;
    let info: PatientInfo = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", patient.display()))?;
    print!("{}", medical_context(&info, ecg_label));
    Ok(())
}
