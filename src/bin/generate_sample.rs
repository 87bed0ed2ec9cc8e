use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{
    ArrayRef, FixedSizeListArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
    UInt16Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use astro_cuts::store::{Compression, Store};

const N_PIXELS: i32 = 64;
const N_OBS: i32 = 3;
const EVENTS_PER_OBS: i64 = 400;
const TELESCOPES: [u16; 2] = [1, 2];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One telescope event: shower parameters plus its camera image.
struct TelEvent {
    obs_id: i32,
    event_id: i64,
    intensity: f64,
    width: f64,
    length: f64,
    leakage: f32,
    cog: [f64; 2],
    image: Vec<f32>,
}

fn simulate(rng: &mut SimpleRng, obs_id: i32, event_id: i64) -> TelEvent {
    let intensity = 10f64.powf(rng.gauss(2.5, 0.6));
    let width = rng.gauss(0.05, 0.02).abs();
    let length = width + rng.gauss(0.1, 0.05).abs();
    let leakage = rng.next_f64().powi(3) as f32;
    let cog = [rng.gauss(0.0, 0.5), rng.gauss(0.0, 0.5)];
    let image = (0..N_PIXELS)
        .map(|_| (rng.gauss(0.0, 1.0) + intensity / N_PIXELS as f64) as f32)
        .collect();
    TelEvent {
        obs_id,
        event_id,
        intensity,
        width,
        length,
        leakage,
        cog,
        image,
    }
}

fn fixed_list_f32(values: Vec<f32>, size: i32) -> Result<ArrayRef> {
    let item = Arc::new(Field::new("item", DataType::Float32, false));
    let array = FixedSizeListArray::try_new(item, size, Arc::new(Float32Array::from(values)), None)?;
    Ok(Arc::new(array))
}

fn fixed_list_f64(values: Vec<f64>, size: i32) -> Result<ArrayRef> {
    let item = Arc::new(Field::new("item", DataType::Float64, false));
    let array = FixedSizeListArray::try_new(item, size, Arc::new(Float64Array::from(values)), None)?;
    Ok(Arc::new(array))
}

fn write(store: &Store, key: &str, batch: RecordBatch) -> Result<()> {
    let props = Compression::default().writer_properties()?;
    let mut sink = store.create_table(key, batch.schema(), props)?;
    sink.append(&batch)?;
    let rows = sink.finish()?;
    println!("  {key}: {rows} rows");
    Ok(())
}

fn key_fields() -> Vec<Field> {
    vec![
        Field::new("obs_id", DataType::Int32, false),
        Field::new("event_id", DataType::Int64, false),
    ]
}

fn main() -> Result<()> {
    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_store"));
    let store = Store::create(&output).context("creating output store")?;
    let mut rng = SimpleRng::new(42);

    println!("Writing sample store to {}", output.display());

    let mut trigger_obs = Vec::new();
    let mut trigger_event = Vec::new();
    let mut trigger_time = Vec::new();

    for obs_id in 1..=N_OBS {
        for event_id in 1..=EVENTS_PER_OBS {
            trigger_obs.push(obs_id);
            trigger_event.push(event_id);
            trigger_time.push(obs_id as f64 * 1e4 + event_id as f64 * 0.1);
        }
    }

    for tel_id in TELESCOPES {
        // each telescope sees roughly two thirds of the events
        let mut events = Vec::new();
        for (&obs, &evt) in trigger_obs.iter().zip(&trigger_event) {
            if rng.next_f64() < 0.66 {
                events.push(simulate(&mut rng, obs, evt));
            }
        }

        let obs: ArrayRef = Arc::new(Int32Array::from_iter_values(events.iter().map(|e| e.obs_id)));
        let evt: ArrayRef = Arc::new(Int64Array::from_iter_values(events.iter().map(|e| e.event_id)));

        let mut fields = key_fields();
        fields.extend([
            Field::new("tel_id", DataType::UInt16, false),
            Field::new("intensity", DataType::Float64, false),
            Field::new("width", DataType::Float64, false),
            Field::new("length", DataType::Float64, false),
            Field::new("leakage_intensity_width_2", DataType::Float32, false),
            Field::new(
                "cog",
                DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float64, false)), 2),
                false,
            ),
        ]);
        let parameters = RecordBatch::try_new(
            Arc::new(Schema::new(fields)),
            vec![
                obs.clone(),
                evt.clone(),
                Arc::new(UInt16Array::from(vec![tel_id; events.len()])),
                Arc::new(Float64Array::from_iter_values(events.iter().map(|e| e.intensity))),
                Arc::new(Float64Array::from_iter_values(events.iter().map(|e| e.width))),
                Arc::new(Float64Array::from_iter_values(events.iter().map(|e| e.length))),
                Arc::new(Float32Array::from_iter_values(events.iter().map(|e| e.leakage))),
                fixed_list_f64(events.iter().flat_map(|e| e.cog).collect(), 2)?,
            ],
        )?;
        write(
            &store,
            &format!("dl1/event/telescope/parameters/tel_{tel_id:03}"),
            parameters,
        )?;

        let mut fields = key_fields();
        fields.push(Field::new(
            "image",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, false)), N_PIXELS),
            false,
        ));
        let images = RecordBatch::try_new(
            Arc::new(Schema::new(fields)),
            vec![
                obs,
                evt,
                fixed_list_f32(events.iter().flat_map(|e| e.image.iter().copied()).collect(), N_PIXELS)?,
            ],
        )?;
        write(
            &store,
            &format!("dl1/event/telescope/images/tel_{tel_id:03}"),
            images,
        )?;
    }

    let mut fields = key_fields();
    fields.push(Field::new("time", DataType::Float64, false));
    let trigger = RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        vec![
            Arc::new(Int32Array::from(trigger_obs)),
            Arc::new(Int64Array::from(trigger_event)),
            Arc::new(Float64Array::from(trigger_time)),
        ],
    )?;
    write(&store, "dl1/event/subarray/trigger", trigger)?;

    let telescopes = RecordBatch::try_new(
        Arc::new(Schema::new(vec![
            Field::new("tel_id", DataType::UInt16, false),
            Field::new("name", DataType::Utf8, false),
            Field::new("focal_length", DataType::Float64, false),
        ])),
        vec![
            Arc::new(UInt16Array::from(TELESCOPES.to_vec())),
            Arc::new(StringArray::from(vec!["LST", "MST"])),
            Arc::new(Float64Array::from(vec![28.0, 16.0])),
        ],
    )?;
    write(&store, "configuration/instrument/telescopes", telescopes)?;

    Ok(())
}
