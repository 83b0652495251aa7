// Analysis module - offline DSP for one captured recording
//
// Pipeline: SpectrumAnalyzer → SpectrumSmoother → FrequencyResponse
//
// Everything here is synchronous and free of device state: the input is a
// mono recording plus its sample rate, the output is plot-ready data.

pub mod axis;
pub mod level;
mod polyfit;
pub mod response;
pub mod smoothing;
pub mod spectrum;

pub use axis::{map_frequencies, FrequencyTicks};
pub use level::rms_db;
pub use response::FrequencyResponse;
pub use smoothing::{SmoothedSpectrum, SpectrumSmoother};
pub use spectrum::{SpectrumAnalyzer, SpectrumCurve};

/// Spectrum, both smoothing stages and axis mapping in one call
pub fn analyze_recording(
    analyzer: &SpectrumAnalyzer,
    samples: &[f32],
    sample_rate: u32,
    ticks: &FrequencyTicks,
) -> FrequencyResponse {
    let raw = analyzer.compute(samples, sample_rate);
    let spectrum = SpectrumSmoother::new().process(raw);
    log::debug!(
        "[Analysis] {} samples @ {} Hz -> {} bins",
        samples.len(),
        sample_rate,
        spectrum.raw.len()
    );
    FrequencyResponse::from_spectrum(&spectrum, ticks)
}
