//! RoomFX CLI — real-time player for the room reverberator.

use cpal::traits::{DeviceTrait, StreamTrait};
use roomfx_core::dsp::lin_mix;
use roomfx_engine::audio;
use roomfx_engine::effect::Effect;
use roomfx_engine::reverb::{Reverb, RoomShape};
use roomfx_engine::sources::{Engine, Generator, ImpulseTrain, NoiseBurst, Pluck};
use std::error::Error;
use std::time::Duration;

#[derive(Debug, Default)]
struct Args {
    list_devices: bool,
    device_name: Option<String>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    duration_sec: Option<u64>,
    source: Option<String>,
    gain: Option<f32>,
    time_ms: Option<f32>,
    damping: Option<f32>,
    room_size: Option<f32>,
    room_shape: Option<String>,
    absorption: Option<f32>,
    combs: Option<usize>,
    pre_apf: Option<usize>,
    post_apf: Option<usize>,
    mix: Option<f32>,
}

fn parse_args() -> Args {
    let mut a = Args::default();
    for s in std::env::args().skip(1) {
        if s == "--list-devices" { a.list_devices = true; continue; }
        if let Some(rest) = s.strip_prefix("--device=")      { a.device_name  = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--sample-rate=") { a.sample_rate  = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--channels=")    { a.channels     = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--duration=")    { a.duration_sec = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--source=")      { a.source       = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--gain=")        { a.gain         = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--time=")        { a.time_ms      = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--damping=")     { a.damping      = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--room-size=")   { a.room_size    = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--room-shape=")  { a.room_shape   = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--absorption=")  { a.absorption   = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--combs=")       { a.combs        = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--pre-apf=")     { a.pre_apf      = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--post-apf=")    { a.post_apf     = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--mix=")         { a.mix          = rest.parse().ok();      continue; }
        eprintln!("[warn] unknown arg: {s}");
    }
    a
}

/// Static dispatch over the demo sources.
enum Source {
    Pluck(Pluck),
    Noise(NoiseBurst),
    Impulse(ImpulseTrain),
}

impl Generator for Source {
    fn reset(&mut self, sr: f32) {
        match self {
            Source::Pluck(s) => s.reset(sr),
            Source::Noise(s) => s.reset(sr),
            Source::Impulse(s) => s.reset(sr),
        }
    }

    fn next(&mut self) -> f32 {
        match self {
            Source::Pluck(s) => s.next(),
            Source::Noise(s) => s.next(),
            Source::Impulse(s) => s.next(),
        }
    }
}

fn make_source(name: Option<&str>) -> Source {
    match name.unwrap_or("pluck").to_ascii_lowercase().as_str() {
        "noise" => Source::Noise(NoiseBurst::new(750.0, 120.0, 17)),
        "impulse" => Source::Impulse(ImpulseTrain::new(1500.0)),
        _ => Source::Pluck(Pluck::new(220.0, 17)),
    }
}

fn parse_shape(name: Option<&str>) -> RoomShape {
    match name.unwrap_or("sphere").to_ascii_lowercase().as_str() {
        "cube" => RoomShape::Cube,
        _ => RoomShape::Sphere,
    }
}

/// Wet/dry wrapper so the mix knob lives outside the reverberator itself.
struct ReverbMix {
    rev: Reverb,
    mix: f32,
}

impl Effect for ReverbMix {
    fn is_enabled(&self) -> bool {
        self.rev.is_enabled()
    }

    fn set_enabled(&mut self, on: bool) {
        self.rev.set_enabled(on);
    }

    fn process_sample(&mut self, x: f32) -> f32 {
        let wet = self.rev.process_sample(x);
        lin_mix(x, wet, self.mix)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args();

    if args.list_devices {
        println!("Available output devices:");
        for name in audio::output_device_names()? {
            println!("- {name}");
        }
        return Ok(());
    }

    println!("roomfx-cli — room reverberator player\n");

    let device = audio::pick_device(args.device_name.as_deref())?;
    let sup_cfg = audio::choose_config(&device, args.sample_rate, args.channels)?;
    let sample_format = sup_cfg.sample_format();
    let mut cfg = sup_cfg.config();

    if let Some(sr) = args.sample_rate { cfg.sample_rate = cpal::SampleRate(sr); }
    if let Some(ch) = args.channels    { cfg.channels    = ch; }

    let sr = cfg.sample_rate.0 as f32;

    // defaults sit inside the bank's stability region: the phase-inverted
    // combs require g2 < 1 - |g1|, which long decays plus heavy damping break
    let time_ms = args.time_ms.unwrap_or(30.0);
    let damping = args.damping.unwrap_or(0.1);
    let length = args.room_size.unwrap_or(2.0);
    let shape = parse_shape(args.room_shape.as_deref());
    let absorption = args.absorption.unwrap_or(0.75);
    let mix = args.mix.unwrap_or(0.4).clamp(0.0, 1.0);
    let gain = args.gain.unwrap_or(0.35);

    let mut rev = Reverb::new(
        sr,
        args.combs.unwrap_or(4),
        args.pre_apf.unwrap_or(1),
        args.post_apf.unwrap_or(1),
    );
    rev.set_params(time_ms, damping, length, shape, absorption);
    rev.set_enabled(true);
    let rt60 = rev.rt60_seconds();

    let mut engine = Engine::new(make_source(args.source.as_deref()), sr);
    engine.set_gain(gain);
    engine.chain_mut().push(Box::new(ReverbMix { rev, mix }));

    println!("Using device: {}", device.name()?);
    println!("Stream config: {:?} (sample_format: {:?})", cfg, sample_format);
    println!(
        "Source: {}  | Gain: {:.2}  | Wet mix: {:.2}",
        args.source.as_deref().unwrap_or("pluck"),
        gain,
        mix
    );
    println!(
        "Room: {:.1} m {:?}, absorption {:.2}  ->  RT60 ~ {:.2} s (pre-delay {:.1} ms, damping {:.2})",
        length, shape, absorption, rt60, time_ms, damping
    );
    if let Some(d) = args.duration_sec { println!("Auto-stop after {d} seconds"); }
    println!("Press Ctrl+C to stop…\n");

    let err_fn = |e: cpal::StreamError| eprintln!("[cpal] stream error: {e}");

    let stream = match sample_format {
        cpal::SampleFormat::F32 => audio::build_stream::<f32, _>(&device, &cfg, engine, err_fn)?,
        cpal::SampleFormat::I16 => audio::build_stream::<i16, _>(&device, &cfg, engine, err_fn)?,
        cpal::SampleFormat::U16 => audio::build_stream::<u16, _>(&device, &cfg, engine, err_fn)?,
        other => return Err(format!("unsupported device sample format: {other:?}").into()),
    };

    stream.play()?;

    if let Some(d) = args.duration_sec {
        std::thread::sleep(Duration::from_secs(d));
        return Ok(());
    }

    loop { std::thread::sleep(Duration::from_millis(500)); }
}
