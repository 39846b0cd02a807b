//! Realtime output glue over cpal (behind the `realtime` feature).
//!
//! The CLI stays thin: it parses flags, builds an [`Engine`], and hands it to
//! [`build_stream`]. Rendering happens a block at a time into a mono scratch
//! buffer that is only resized when the host serves a larger buffer than
//! we've seen, so the steady state does no allocation. The mono block is then
//! interleaved to however many channels the device wants.

use crate::sources::{Engine, Generator};
use cpal::traits::{DeviceTrait, HostTrait};
use std::error::Error;

/// Names of every output device on the default host.
pub fn output_device_names() -> Result<Vec<String>, Box<dyn Error>> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    for dev in host.output_devices()? {
        names.push(dev.name()?);
    }
    Ok(names)
}

/// The named output device, or the host default when `name` is `None`.
pub fn pick_device(name: Option<&str>) -> Result<cpal::Device, Box<dyn Error>> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for d in host.output_devices()? {
            if d.name()? == name {
                return Ok(d);
            }
        }
        return Err(format!("requested device not found: {name}").into());
    }
    host.default_output_device()
        .ok_or_else(|| "no default output device".into())
}

/// Choose a concrete stream config honoring the requested rate and channel
/// count as closely as the device allows.
pub fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> Result<cpal::SupportedStreamConfig, Box<dyn Error>> {
    // If nothing requested, default is already concrete.
    if req_sr.is_none() && req_ch.is_none() {
        return Ok(device.default_output_config()?);
    }

    // Pick a SupportedStreamConfigRange first. A sample-rate miss weighs far
    // more than a channel-count miss.
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs()? {
        let ch = range.channels();
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;

        let ch_pen = match req_ch {
            Some(c) => (i64::from(ch) - i64::from(c)).unsigned_abs(),
            None => 0,
        };
        let sr_pen = match req_sr {
            Some(sr) => {
                if (sr_min..=sr_max).contains(&sr) {
                    0
                } else {
                    u64::from(sr_min.abs_diff(sr).min(sr_max.abs_diff(sr)))
                }
            }
            None => 0,
        };

        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or_else(|| "no supported output configs".to_string())?;

    // Choose a concrete sample rate and convert the range into a concrete config.
    let pick_sr = match req_sr {
        Some(sr) => {
            let lo = range.min_sample_rate().0;
            let hi = range.max_sample_rate().0;
            cpal::SampleRate(sr.clamp(lo, hi))
        }
        None => range.max_sample_rate(),
    };

    Ok(range.with_sample_rate(pick_sr))
}

/// Build an output stream that drains the engine.
///
/// The engine moves into the audio callback; parameter changes after this
/// point go through whatever control channel the caller set up beforehand.
/// A naive peak meter prints to stderr roughly once per second.
pub fn build_stream<T, G>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut engine: Engine<G>,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, Box<dyn Error>>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
    G: Generator + Send + 'static,
{
    let sr = cfg.sample_rate.0 as f32;
    let channels = (cfg.channels as usize).max(1);

    // ~1 second meter at the negotiated rate
    let meter_interval = (cfg.sample_rate.0).max(1) as usize;
    let mut meter_count: usize = 0;
    let mut meter_peak: f32 = 0.0;

    let mut scratch = vec![0.0f32; 8192];

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            let frames = output.len() / channels;
            if scratch.len() < frames {
                scratch.resize(frames, 0.0);
            }
            engine.render_block(&mut scratch[..frames], sr);

            for (frame, &mono) in output.chunks_mut(channels).zip(scratch.iter()) {
                let mut s = mono;
                if s > 1.0 {
                    s = 1.0;
                }
                if s < -1.0 {
                    s = -1.0;
                }

                let v: T = T::from_sample(s);
                for ch in frame.iter_mut() {
                    *ch = v;
                }

                let a = if s >= 0.0 { s } else { -s };
                if a > meter_peak {
                    meter_peak = a;
                }
                meter_count += 1;
                if meter_count >= meter_interval {
                    eprintln!("[meter] peak ~ {:.3}", meter_peak);
                    meter_peak = 0.0;
                    meter_count = 0;
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
